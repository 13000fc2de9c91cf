//! Interned string identifiers.

use serde::Serialize;
use std::fmt;

/// The identity of an interned string literal.
///
/// Ids are handed out by a [`SymbolPool`](crate::SymbolPool); two ids
/// obtained from the same pool are equal exactly when the literals are. Ids
/// are cheap to copy and never own the literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StringId(pub(crate) u32);

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "s#{}", self.0)
    }
}

impl StringId {
    pub(crate) fn as_usize(self) -> usize {
        self.0 as usize
    }
}
