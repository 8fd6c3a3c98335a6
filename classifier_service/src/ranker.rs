use crate::labels::CategoryTable;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RankError {
    #[error("Model produced {scores} scores for {labels} labels")]
    LengthMismatch { scores: usize, labels: usize },
    #[error("Score for class {0} is NaN")]
    NonFiniteScore(usize),
}

/// Indices of the `k` highest scores, best first. Equal scores keep ascending index order.
pub fn top_k(scores: &[f32], k: usize) -> Result<Vec<usize>, RankError> {
    if let Some(index) = scores.iter().position(|score| score.is_nan()) {
        return Err(RankError::NonFiniteScore(index));
    }

    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));
    indices.truncate(k);

    Ok(indices)
}

pub fn rank(scores: &[f32], categories: &CategoryTable, k: usize) -> Result<Vec<String>, RankError> {
    if scores.len() != categories.len() {
        return Err(RankError::LengthMismatch {
            scores: scores.len(),
            labels: categories.len(),
        });
    }

    let labels = top_k(scores, k)?
        .into_iter()
        .filter_map(|index| categories.label(index))
        .map(str::to_string)
        .collect();

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(n: usize) -> CategoryTable {
        CategoryTable::from_labels((0..n).map(|i| format!("class{i}")).collect()).unwrap()
    }

    #[test]
    fn test_top_k_descending() {
        let scores = [0.1, 2.5, -1.0, 7.0, 3.3, 0.0];

        assert_eq!(top_k(&scores, 3).unwrap(), vec![3, 4, 1]);
    }

    #[test]
    fn test_top_k_ties_prefer_lower_index() {
        let scores = [1.0, 5.0, 5.0, 0.5, 5.0];

        assert_eq!(top_k(&scores, 4).unwrap(), vec![1, 2, 4, 0]);
    }

    #[test]
    fn test_top_k_larger_than_scores_returns_all() {
        let scores = [0.2, 0.9];

        assert_eq!(top_k(&scores, 5).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_top_k_matches_brute_force() {
        let scores: Vec<f32> = (0..1000)
            .map(|i| ((i * 7919) % 1013) as f32 * 0.01 - 3.0)
            .collect();

        let got = top_k(&scores, 5).unwrap();

        let mut expected: Vec<usize> = (0..scores.len()).collect();
        expected.sort_by(|a, b| {
            scores[*b]
                .partial_cmp(&scores[*a])
                .unwrap()
                .then(a.cmp(b))
        });
        assert_eq!(got, expected[..5]);
        assert!(got.windows(2).all(|w| scores[w[0]] >= scores[w[1]]));
    }

    #[test]
    fn test_top_k_rejects_nan() {
        let scores = [0.1, f32::NAN, 0.3];

        assert_eq!(top_k(&scores, 2), Err(RankError::NonFiniteScore(1)));
    }

    #[test]
    fn test_rank_maps_labels() {
        let scores = [0.1, 0.7, 0.2];

        let labels = rank(&scores, &categories(3), 2).unwrap();

        assert_eq!(labels, vec!["class1", "class2"]);
    }

    #[test]
    fn test_rank_length_mismatch() {
        let result = rank(&[0.1, 0.2], &categories(3), 1);

        assert_eq!(
            result,
            Err(RankError::LengthMismatch {
                scores: 2,
                labels: 3
            })
        );
    }
}
