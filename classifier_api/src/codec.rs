use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("image payload is empty")]
    Empty,
    #[error("image payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

pub fn encode_payload(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

pub fn decode_payload(payload: &str) -> Result<Vec<u8>, CodecError> {
    let payload = payload.trim_ascii();
    if payload.is_empty() {
        return Err(CodecError::Empty);
    }

    Ok(general_purpose::STANDARD.decode(payload)?)
}
