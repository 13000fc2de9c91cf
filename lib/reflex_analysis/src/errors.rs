//! Analysis errors definition.

use reflex_ir::Addr;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("the method has no implementation")]
    NoCode,

    #[error("branch target {0} is not an instruction address")]
    InvalidBranchTarget(Addr),
}
