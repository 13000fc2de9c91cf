//! Types definitions to address method registers.
//!
//! The analyzed IR is register based: every method body declares a fixed
//! number of registers, addressed by nonnegative slot numbers. On top of
//! those, a distinguished [result register](Reg::RESULT) holds the outcome of
//! the most recent call or array creation until it is consumed by a
//! `move-result` pseudo instruction.

use serde::Serialize;
use std::fmt;

/// The register type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Reg(u32);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_result() {
            write!(f, "res")
        } else {
            write!(f, "v{}", self.0)
        }
    }
}

impl From<u16> for Reg {
    fn from(r: u16) -> Self {
        Self(u32::from(r))
    }
}

impl From<u32> for Reg {
    fn from(r: u32) -> Self {
        Self(r)
    }
}

impl Reg {
    /// The implicit register written by calls and array creations, consumed
    /// by the following `move-result` pseudo instruction.
    ///
    /// It compares greater than every plain register, so register maps
    /// ordered by slot number list it last.
    pub const RESULT: Self = Self(u32::MAX);

    /// Returns the wrapped register slot number.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Checks whether this is the implicit result register.
    #[inline]
    #[must_use]
    pub const fn is_result(self) -> bool {
        self.0 == u32::MAX
    }

    /// Returns the following register.
    ///
    /// This function is used to address register pairs without manipulating
    /// slot numbers directly.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// An explicit list of registers, used for invoke arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RegList(Vec<Reg>);

impl fmt::Display for RegList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for i in 0..self.0.len() {
            write!(f, "{}", self.0[i])?;
            if i < self.0.len() - 1 {
                write!(f, ", ")?;
            }
        }
        write!(f, "}}")
    }
}

impl<T> From<Vec<T>> for RegList
where
    Reg: From<T>,
{
    fn from(args: Vec<T>) -> Self {
        Self(args.into_iter().map(Reg::from).collect())
    }
}

impl RegList {
    /// Checks if the list contains no register.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of registers in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the `i`th register of the list, if any.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<Reg> {
        self.0.get(i).copied()
    }

    /// Returns a new iterator over the registers list.
    pub fn iter(&self) -> impl Iterator<Item = Reg> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_register_orders_last() {
        assert!(Reg::from(0u32) < Reg::RESULT);
        assert!(Reg::from(u32::MAX - 1) < Reg::RESULT);
        assert!(Reg::RESULT.is_result());
        assert!(!Reg::from(41u32).is_result());
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Reg::from(3u16)), "v3");
        assert_eq!(format!("{}", Reg::RESULT), "res");
        let args = RegList::from(vec![0u16, 1, 2]);
        assert_eq!(format!("{args}"), "{v0, v1, v2}");
    }
}
