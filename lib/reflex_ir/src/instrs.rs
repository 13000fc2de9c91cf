//! IR instructions definitions.
//!
//! The instruction set mirrors Dalvik bytecode after IR lowering: operations
//! that produce a value through the implicit result register are followed by
//! a `move-result` (or `move-result-pseudo`) instruction that copies the
//! result into a plain register. [`Instr::has_move_result`] tells whether an
//! instruction writes the result register this way.

use crate::fields::FieldId;
use crate::methods::MethodId;
use crate::registers::{Reg, RegList};
use crate::strings::StringId;
use crate::types::TypeId;
use crate::{Addr, PrettyPrint, SymbolPool};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    /// Waste cycles.
    Nop,

    /// Bind the next non-object method parameter to the given register.
    ///
    /// Parameter pseudo instructions only appear as the prefix of a method
    /// body and describe its formal parameters; anywhere else is invalid.
    LoadParam(Reg),

    /// Bind the next wide (64-bit) method parameter to the given register
    /// pair.
    LoadParamWide(Reg),

    /// Bind the next object method parameter to the given register. For
    /// instance methods the first occurrence binds `this`.
    LoadParamObject(Reg),

    /// Move the contents of one non-object register to another.
    Move(Reg, Reg),

    /// Move the contents of one register pair to another.
    MoveWide(Reg, Reg),

    /// Move the contents of one object-bearing register to another.
    MoveObject(Reg, Reg),

    /// Move the single-word non-object result of the most recent invoke into
    /// the indicated register.
    MoveResult(Reg),

    /// Move the double-word result of the most recent invoke into the
    /// indicated register pair.
    MoveResultWide(Reg),

    /// Move the object result of the most recent invoke or
    /// `filled-new-array` into the indicated register.
    MoveResultObject(Reg),

    /// Move the object result of the immediately preceding result-producing
    /// instruction (constant load, allocation, field or array read, cast)
    /// into the indicated register.
    MoveResultPseudoObject(Reg),

    /// Load the given 32-bit literal into the given register.
    Const(Reg, i32),

    /// Load the given 64-bit literal into the given register pair.
    ConstWide(Reg, i64),

    /// Load a reference to the given interned string into the result
    /// register.
    ConstString(StringId),

    /// Load a reference to the class object of the given type into the
    /// result register.
    ConstClass(TypeId),

    /// Throw if the reference in the given register cannot be cast to the
    /// given type; otherwise make the narrowed reference available through
    /// the result register.
    CheckCast(Reg, TypeId),

    /// Allocate an instance of the given class, available through the result
    /// register.
    NewInstance(TypeId),

    /// Allocate an array of the given type, with the size taken from the
    /// given register, available through the result register.
    NewArray(Reg, TypeId),

    /// Allocate an array of the given type filled with the contents of the
    /// given registers, available through the result register.
    FilledNewArray(RegList, TypeId),

    /// Read the object element at index (second register) of the array
    /// (first register), available through the result register.
    AgetObject(Reg, Reg),

    /// Store the object in the first register at index (third register) of
    /// the array (second register).
    AputObject(Reg, Reg, Reg),

    /// Read the given instance field of the object in the given register,
    /// available through the result register.
    IgetObject(Reg, FieldId),

    /// Store the object in the first register into the given instance field
    /// of the object in the second register.
    IputObject(Reg, Reg, FieldId),

    /// Read the given static field, available through the result register.
    SgetObject(FieldId),

    /// Store the object in the given register into the given static field.
    SputObject(Reg, FieldId),

    /// Call the given method with virtual dispatch; the first argument
    /// register is the receiver.
    InvokeVirtual(RegList, MethodId),

    /// Call the given method of the immediate superclass.
    InvokeSuper(RegList, MethodId),

    /// Call the given non-overridable instance method (private method or
    /// constructor); the first argument register is the receiver.
    InvokeDirect(RegList, MethodId),

    /// Call the given static method.
    InvokeStatic(RegList, MethodId),

    /// Call the given interface method; the first argument register is the
    /// receiver.
    InvokeInterface(RegList, MethodId),

    /// Jump to the instruction at the given relative offset.
    Goto(i32),

    /// Jump to the given relative offset if the given register is zero.
    IfEqz(Reg, i32),

    /// Jump to the given relative offset if the given register is nonzero.
    IfNez(Reg, i32),

    /// Return from a `void` method.
    ReturnVoid,

    /// Return the non-object value in the given register.
    Return(Reg),

    /// Return the object reference in the given register.
    ReturnObject(Reg),

    /// Throw the exception object in the given register.
    Throw(Reg),

    /// Add the two source registers into the destination register.
    AddInt(Reg, Reg, Reg),

    /// Negate the source register into the destination register.
    NegInt(Reg, Reg),
}

impl Instr {
    /// Returns the mnemonic of the instruction.
    #[must_use]
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::LoadParam(_) => "load-param",
            Self::LoadParamWide(_) => "load-param-wide",
            Self::LoadParamObject(_) => "load-param-object",
            Self::Move(_, _) => "move",
            Self::MoveWide(_, _) => "move-wide",
            Self::MoveObject(_, _) => "move-object",
            Self::MoveResult(_) => "move-result",
            Self::MoveResultWide(_) => "move-result-wide",
            Self::MoveResultObject(_) => "move-result-object",
            Self::MoveResultPseudoObject(_) => "move-result-pseudo-object",
            Self::Const(_, _) => "const",
            Self::ConstWide(_, _) => "const-wide",
            Self::ConstString(_) => "const-string",
            Self::ConstClass(_) => "const-class",
            Self::CheckCast(_, _) => "check-cast",
            Self::NewInstance(_) => "new-instance",
            Self::NewArray(_, _) => "new-array",
            Self::FilledNewArray(_, _) => "filled-new-array",
            Self::AgetObject(_, _) => "aget-object",
            Self::AputObject(_, _, _) => "aput-object",
            Self::IgetObject(_, _) => "iget-object",
            Self::IputObject(_, _, _) => "iput-object",
            Self::SgetObject(_) => "sget-object",
            Self::SputObject(_, _) => "sput-object",
            Self::InvokeVirtual(_, _) => "invoke-virtual",
            Self::InvokeSuper(_, _) => "invoke-super",
            Self::InvokeDirect(_, _) => "invoke-direct",
            Self::InvokeStatic(_, _) => "invoke-static",
            Self::InvokeInterface(_, _) => "invoke-interface",
            Self::Goto(_) => "goto",
            Self::IfEqz(_, _) => "if-eqz",
            Self::IfNez(_, _) => "if-nez",
            Self::ReturnVoid => "return-void",
            Self::Return(_) => "return",
            Self::ReturnObject(_) => "return-object",
            Self::Throw(_) => "throw",
            Self::AddInt(_, _, _) => "add-int",
            Self::NegInt(_, _) => "neg-int",
        }
    }

    /// Returns the destination register of the instruction, if it writes one
    /// directly (as opposed to writing the result register).
    #[must_use]
    pub const fn dest(&self) -> Option<Reg> {
        match self {
            Self::LoadParam(dst)
            | Self::LoadParamWide(dst)
            | Self::LoadParamObject(dst)
            | Self::Move(dst, _)
            | Self::MoveWide(dst, _)
            | Self::MoveObject(dst, _)
            | Self::MoveResult(dst)
            | Self::MoveResultWide(dst)
            | Self::MoveResultObject(dst)
            | Self::MoveResultPseudoObject(dst)
            | Self::Const(dst, _)
            | Self::ConstWide(dst, _)
            | Self::AddInt(dst, _, _)
            | Self::NegInt(dst, _) => Some(*dst),
            _ => None,
        }
    }

    /// Checks whether the destination is a register pair.
    #[must_use]
    pub const fn dest_is_wide(&self) -> bool {
        matches!(
            self,
            Self::LoadParamWide(_)
                | Self::MoveWide(_, _)
                | Self::MoveResultWide(_)
                | Self::ConstWide(_, _)
        )
    }

    /// Checks whether the instruction writes the result register, to be
    /// consumed by a following `move-result` pseudo instruction.
    #[must_use]
    pub const fn has_move_result(&self) -> bool {
        matches!(
            self,
            Self::ConstString(_)
                | Self::ConstClass(_)
                | Self::CheckCast(_, _)
                | Self::NewInstance(_)
                | Self::NewArray(_, _)
                | Self::FilledNewArray(_, _)
                | Self::AgetObject(_, _)
                | Self::IgetObject(_, _)
                | Self::SgetObject(_)
                | Self::InvokeVirtual(_, _)
                | Self::InvokeSuper(_, _)
                | Self::InvokeDirect(_, _)
                | Self::InvokeStatic(_, _)
                | Self::InvokeInterface(_, _)
        )
    }

    /// Returns the argument register list of an invoke or
    /// `filled-new-array` instruction.
    #[must_use]
    pub const fn args(&self) -> Option<&RegList> {
        match self {
            Self::FilledNewArray(args, _)
            | Self::InvokeVirtual(args, _)
            | Self::InvokeSuper(args, _)
            | Self::InvokeDirect(args, _)
            | Self::InvokeStatic(args, _)
            | Self::InvokeInterface(args, _) => Some(args),
            _ => None,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())?;
        match self {
            Self::Nop | Self::ReturnVoid => Ok(()),
            Self::LoadParam(r)
            | Self::LoadParamWide(r)
            | Self::LoadParamObject(r)
            | Self::MoveResult(r)
            | Self::MoveResultWide(r)
            | Self::MoveResultObject(r)
            | Self::MoveResultPseudoObject(r)
            | Self::Return(r)
            | Self::ReturnObject(r)
            | Self::Throw(r) => write!(f, " {r}"),
            Self::Move(a, b)
            | Self::MoveWide(a, b)
            | Self::MoveObject(a, b)
            | Self::AgetObject(a, b)
            | Self::NegInt(a, b) => write!(f, " {a}, {b}"),
            Self::AputObject(a, b, c) | Self::AddInt(a, b, c) => write!(f, " {a}, {b}, {c}"),
            Self::Const(r, v) => write!(f, " {r}, #{v}"),
            Self::ConstWide(r, v) => write!(f, " {r}, #{v}"),
            Self::ConstString(s) => write!(f, " {s}"),
            Self::ConstClass(t) => write!(f, " {t}"),
            Self::CheckCast(r, t) => write!(f, " {r}, {t}"),
            Self::NewInstance(t) => write!(f, " {t}"),
            Self::NewArray(r, t) => write!(f, " {r}, {t}"),
            Self::FilledNewArray(args, t) => write!(f, " {args}, {t}"),
            Self::IgetObject(r, fld) => write!(f, " {r}, {fld}"),
            Self::IputObject(a, b, fld) => write!(f, " {a}, {b}, {fld}"),
            Self::SgetObject(fld) => write!(f, " {fld}"),
            Self::SputObject(r, fld) => write!(f, " {r}, {fld}"),
            Self::InvokeVirtual(args, m)
            | Self::InvokeSuper(args, m)
            | Self::InvokeDirect(args, m)
            | Self::InvokeStatic(args, m)
            | Self::InvokeInterface(args, m) => write!(f, " {args}, {m}"),
            Self::Goto(off) => write!(f, " {off:+}"),
            Self::IfEqz(r, off) | Self::IfNez(r, off) => write!(f, " {r}, {off:+}"),
        }
    }
}

impl PrettyPrint for Instr {
    fn pp(&self, f: &mut fmt::Formatter, pool: &SymbolPool) -> fmt::Result {
        match self {
            Self::ConstString(s) => {
                write!(f, "{} {:?}", self.mnemonic(), pool.string(*s))
            }
            Self::ConstClass(t) | Self::NewInstance(t) => {
                write!(f, "{} {}", self.mnemonic(), pool.type_descriptor(*t))
            }
            Self::CheckCast(r, t) => {
                write!(f, "{} {r}, {}", self.mnemonic(), pool.type_descriptor(*t))
            }
            Self::NewArray(r, t) => {
                write!(f, "{} {r}, {}", self.mnemonic(), pool.type_descriptor(*t))
            }
            Self::FilledNewArray(args, t) => {
                write!(f, "{} {args}, {}", self.mnemonic(), pool.type_descriptor(*t))
            }
            Self::IgetObject(r, fld) => {
                let field = pool.field(*fld);
                write!(
                    f,
                    "{} {r}, {}->{}",
                    self.mnemonic(),
                    pool.type_descriptor(field.owner),
                    pool.string(field.name)
                )
            }
            Self::IputObject(a, b, fld) => {
                let field = pool.field(*fld);
                write!(
                    f,
                    "{} {a}, {b}, {}->{}",
                    self.mnemonic(),
                    pool.type_descriptor(field.owner),
                    pool.string(field.name)
                )
            }
            Self::SgetObject(fld) => {
                let field = pool.field(*fld);
                write!(
                    f,
                    "{} {}->{}",
                    self.mnemonic(),
                    pool.type_descriptor(field.owner),
                    pool.string(field.name)
                )
            }
            Self::SputObject(r, fld) => {
                let field = pool.field(*fld);
                write!(
                    f,
                    "{} {r}, {}->{}",
                    self.mnemonic(),
                    pool.type_descriptor(field.owner),
                    pool.string(field.name)
                )
            }
            Self::InvokeVirtual(args, m)
            | Self::InvokeSuper(args, m)
            | Self::InvokeDirect(args, m)
            | Self::InvokeStatic(args, m)
            | Self::InvokeInterface(args, m) => {
                write!(
                    f,
                    "{} {args}, {}->{}",
                    self.mnemonic(),
                    pool.type_descriptor(pool.method_owner(*m)),
                    pool.string(pool.method_name(*m))
                )
            }
            _ => write!(f, "{self}"),
        }
    }
}

/// An instruction labeled with its address inside the method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledInstr {
    addr: Addr,
    instr: Instr,
}

impl LabeledInstr {
    pub(crate) const fn new(addr: Addr, instr: Instr) -> Self {
        Self { addr, instr }
    }

    #[inline]
    #[must_use]
    pub const fn addr(&self) -> Addr {
        self.addr
    }

    #[inline]
    #[must_use]
    pub const fn instr(&self) -> &Instr {
        &self.instr
    }

    #[inline]
    #[must_use]
    pub const fn next_addr(&self) -> Addr {
        self.addr.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_producers_have_move_result() {
        let pool = SymbolPool::new();
        let class = pool.make_type("Ljava/lang/Class;").unwrap();
        assert!(Instr::ConstClass(class).has_move_result());
        assert!(Instr::ConstClass(class).dest().is_none());
        assert!(!Instr::MoveResultPseudoObject(Reg::from(0u32)).has_move_result());
        assert_eq!(
            Instr::MoveResultPseudoObject(Reg::from(0u32)).dest(),
            Some(Reg::from(0u32))
        );
    }

    #[test]
    fn wide_destinations() {
        let v0 = Reg::from(0u32);
        assert!(Instr::ConstWide(v0, 1).dest_is_wide());
        assert!(!Instr::Const(v0, 1).dest_is_wide());
    }

    #[test]
    fn display_raw_operands() {
        let v0 = Reg::from(0u32);
        let v1 = Reg::from(1u32);
        assert_eq!(format!("{}", Instr::MoveObject(v0, v1)), "move-object v0, v1");
        assert_eq!(format!("{}", Instr::IfEqz(v0, 4)), "if-eqz v0, +4");
        assert_eq!(format!("{}", Instr::Goto(-3)), "goto -3");
    }
}
