//! Code address representation.

use serde::Serialize;
use std::fmt;

/// The label of an instruction inside a method body.
///
/// Instructions are labeled consecutively from the start of the body, so the
/// address of the instruction following `a` is always `a.next()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Addr(pub usize);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Addr {
    /// Returns the address of the first instruction of a method body.
    #[inline]
    #[must_use]
    pub const fn entry() -> Self {
        Self(0)
    }

    /// Returns the address of the following instruction.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the address at the given relative offset.
    #[must_use]
    pub const fn offset(self, offset: i32) -> Self {
        if offset.is_negative() {
            Self(self.0 - offset.unsigned_abs() as usize)
        } else {
            Self(self.0 + offset.unsigned_abs() as usize)
        }
    }
}
