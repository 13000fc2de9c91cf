//! Interned field references.

use crate::strings::StringId;
use crate::types::TypeId;
use serde::Serialize;
use std::fmt;

/// The identity of an interned field reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FieldId(pub(crate) u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "f#{}", self.0)
    }
}

impl FieldId {
    pub(crate) fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A fully resolved field reference: owner class, name and declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: TypeId,
    pub name: StringId,
    pub type_: TypeId,
}
