//! Method references, method handles and their IR bodies.

use crate::instrs::{Instr, LabeledInstr};
use crate::strings::StringId;
use crate::types::TypeId;
use crate::Addr;
use bitflags::bitflags;
use serde::Serialize;
use std::fmt;

/// The identity of an interned method reference.
///
/// Two ids obtained from the same pool are equal exactly when owner, name
/// and prototype are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MethodId(pub(crate) u32);

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "m#{}", self.0)
    }
}

impl MethodId {
    pub(crate) fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A fully qualified method signature: owner class, selector name,
/// parameter types and return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSig {
    pub owner: TypeId,
    pub name: StringId,
    pub parameters: Vec<TypeId>,
    pub return_type: TypeId,
}

bitflags! {
    pub struct MethodFlags: u32 {
        const ACC_PUBLIC      = 0x00001;
        const ACC_PRIVATE     = 0x00002;
        const ACC_PROTECTED   = 0x00004;
        const ACC_STATIC      = 0x00008;
        const ACC_FINAL       = 0x00010;
        const ACC_SYNTHETIC   = 0x01000;
        const ACC_CONSTRUCTOR = 0x10000;
    }
}

/// The IR body of a method: a register file size and the in-order
/// instruction sequence, labeled with consecutive addresses.
#[derive(Debug, Clone)]
pub struct MethodBody {
    registers_size: u32,
    instrs: Vec<LabeledInstr>,
}

impl MethodBody {
    /// Labels the given instruction sequence and wraps it into a body.
    #[must_use]
    pub fn new(registers_size: u32, instrs: Vec<Instr>) -> Self {
        let instrs = instrs
            .into_iter()
            .enumerate()
            .map(|(i, instr)| LabeledInstr::new(Addr(i), instr))
            .collect();
        Self {
            registers_size,
            instrs,
        }
    }

    /// Returns the number of registers declared by the body.
    #[inline]
    #[must_use]
    pub const fn registers_size(&self) -> u32 {
        self.registers_size
    }

    /// Checks if the body contains no instruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Returns an iterator over the labeled instructions, in program order.
    pub fn iter_instructions(&self) -> impl Iterator<Item = &LabeledInstr> {
        self.instrs.iter()
    }

    /// Returns the instruction at the given address, if any.
    #[must_use]
    pub fn instruction_at(&self, addr: Addr) -> Option<&LabeledInstr> {
        self.instrs.get(addr.0)
    }
}

/// A method handle: identity, signature, access flags and optional IR body.
///
/// Abstract and native methods carry no body; analyses are expected to
/// handle the absence gracefully.
#[derive(Debug, Clone)]
pub struct Method {
    class: TypeId,
    name: StringId,
    parameters: Vec<TypeId>,
    return_type: TypeId,
    flags: MethodFlags,
    body: Option<MethodBody>,
}

impl Method {
    #[must_use]
    pub fn new(
        class: TypeId,
        name: StringId,
        parameters: Vec<TypeId>,
        return_type: TypeId,
        flags: MethodFlags,
        body: Option<MethodBody>,
    ) -> Self {
        Self {
            class,
            name,
            parameters,
            return_type,
            flags,
            body,
        }
    }

    /// Returns the owning class of the method.
    #[inline]
    #[must_use]
    pub const fn class(&self) -> TypeId {
        self.class
    }

    /// Returns the selector name of the method.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> StringId {
        self.name
    }

    /// Returns the ordered parameter types of the method, `this` excluded.
    #[inline]
    pub fn parameters_types(&self) -> &[TypeId] {
        &self.parameters
    }

    /// Returns the return type of the method.
    #[inline]
    #[must_use]
    pub const fn return_type(&self) -> TypeId {
        self.return_type
    }

    #[inline]
    #[must_use]
    pub const fn flags(&self) -> MethodFlags {
        self.flags
    }

    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::ACC_STATIC)
    }

    #[inline]
    #[must_use]
    pub const fn is_public(&self) -> bool {
        self.flags.contains(MethodFlags::ACC_PUBLIC)
    }

    #[inline]
    #[must_use]
    pub const fn is_constructor(&self) -> bool {
        self.flags.contains(MethodFlags::ACC_CONSTRUCTOR)
    }

    /// Returns the IR body of the method, if it has one.
    #[must_use]
    pub fn body(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_labels_instructions_consecutively() {
        let body = MethodBody::new(2, vec![Instr::Nop, Instr::ReturnVoid]);
        let addrs: Vec<Addr> = body.iter_instructions().map(LabeledInstr::addr).collect();
        assert_eq!(addrs, vec![Addr(0), Addr(1)]);
        assert!(matches!(
            body.instruction_at(Addr(1)).map(LabeledInstr::instr),
            Some(Instr::ReturnVoid)
        ));
        assert!(body.instruction_at(Addr(2)).is_none());
    }
}
