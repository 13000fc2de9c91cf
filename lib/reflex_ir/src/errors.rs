//! IR errors definition.

use thiserror::Error;

pub type IrResult<T> = Result<T, IrError>;

#[derive(Debug, Error)]
pub enum IrError {
    #[error("invalid type descriptor: {0:?}")]
    InvalidDescriptor(String),
}
