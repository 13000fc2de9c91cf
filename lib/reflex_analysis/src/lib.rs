//! This crate provides the reflection usage analysis of the `reflex`
//! project: an intraprocedural forward dataflow analysis that tracks, for
//! every program point of a method body, which registers may hold
//! reflective entities.

pub mod controlflow;
pub mod dataflow;
pub mod errors;
pub mod reflection;

use crate::errors::AnalysisResult;
use crate::reflection::ReflectionAnalysis;
use reflex_ir::methods::Method;
use reflex_ir::SymbolPool;

/// Runs the reflection analysis over the given method.
///
/// # Errors
///
/// This function may generate errors when the method body is malformed
/// (invalid branch target). A missing body is not an error.
pub fn analyze_reflection<'a>(
    method: &'a Method,
    pool: &'a SymbolPool,
) -> AnalysisResult<ReflectionAnalysis<'a>> {
    ReflectionAnalysis::run(method, pool)
}
