pub mod codec;
mod schema;

pub use schema::{round_to_millis, ErrorKind, ErrorResponse, InferRequest, InferResponse};
