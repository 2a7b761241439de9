use std::collections::TryReserveError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Growing the body, node, parent or scratch arrays failed.
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
}
