use crate::config::LabelsConfig;
use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelsError {
    #[error("Failed to read labels: {0}")]
    Io(#[from] io::Error),
    #[error("Blank label on line {0}")]
    BlankLabel(usize),
    #[error("Labels file contains no labels")]
    Empty,
}

/// Class index to label mapping, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    labels: Vec<String>,
}

impl CategoryTable {
    pub fn new(labels_cfg: &LabelsConfig) -> Result<Self, LabelsError> {
        let labels = load_labels(&labels_cfg.get_path())?;
        tracing::info!("Loaded {} class labels", labels.len());
        Ok(Self { labels })
    }

    pub fn from_labels(labels: Vec<String>) -> Result<Self, LabelsError> {
        if labels.is_empty() {
            return Err(LabelsError::Empty);
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

/// Reads one label per line. Line order is class index order.
pub fn load_labels(filepath: &Path) -> Result<Vec<String>, LabelsError> {
    let file = File::open(filepath)?;
    read_labels(io::BufReader::new(file))
}

fn read_labels(reader: impl BufRead) -> Result<Vec<String>, LabelsError> {
    let mut labels = Vec::new();
    for (line_number, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let label = line.trim();
        if label.is_empty() {
            return Err(LabelsError::BlankLabel(line_number + 1));
        }
        labels.push(label.to_string());
    }

    if labels.is_empty() {
        return Err(LabelsError::Empty);
    }
    Ok(labels)
}
