//! This crate provides the IR surface consumed by the `reflex` analyses:
//! interned symbol identifiers, registers, instructions and method handles.
//!
//! Symbols (strings, types, fields, method references) are interned through
//! a [`SymbolPool`] and identified by cheap `Copy` tokens whose equality is
//! interned identity. The pool is safe for concurrent lookup and insertion,
//! so analyzer instances working on different methods may share one pool.

mod addr;

pub mod errors;
pub mod fields;
pub mod instrs;
pub mod methods;
pub mod registers;
pub mod strings;
pub mod types;

pub use crate::addr::Addr;

use crate::errors::{IrError, IrResult};
use crate::fields::{FieldId, FieldRef};
use crate::methods::{MethodId, MethodSig};
use crate::strings::StringId;
use crate::types::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Descriptor of `java.lang.Object`.
pub const OBJECT_DESCRIPTOR: &str = "Ljava/lang/Object;";
/// Descriptor of `java.lang.Class`.
pub const CLASS_DESCRIPTOR: &str = "Ljava/lang/Class;";
/// Descriptor of `java.lang.String`.
pub const STRING_DESCRIPTOR: &str = "Ljava/lang/String;";

/// The host symbol table.
///
/// Owns every interned string, type descriptor, field and method reference,
/// and resolves the identifier tokens it handed out. All operations take
/// `&self`; interior locking makes concurrent lookup and insertion safe.
#[derive(Debug, Default)]
pub struct SymbolPool {
    inner: RwLock<PoolInner>,
}

#[derive(Debug, Default)]
struct PoolInner {
    strings: Vec<Arc<str>>,
    string_ids: HashMap<Arc<str>, StringId>,
    types: Vec<Arc<str>>,
    type_ids: HashMap<Arc<str>, TypeId>,
    fields: Vec<FieldRef>,
    field_ids: HashMap<FieldRef, FieldId>,
    methods: Vec<Arc<MethodSig>>,
    method_ids: HashMap<Arc<MethodSig>, MethodId>,
}

impl SymbolPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns the given string literal.
    pub fn make_string(&self, literal: &str) -> StringId {
        if let Some(id) = self.get_string(literal) {
            return id;
        }
        let mut inner = self.inner.write().unwrap();
        if let Some(id) = inner.string_ids.get(literal) {
            return *id;
        }
        let id = StringId(inner.strings.len() as u32);
        let literal: Arc<str> = Arc::from(literal);
        inner.strings.push(literal.clone());
        inner.string_ids.insert(literal, id);
        id
    }

    /// Returns the id of the given string literal if it has already been
    /// interned.
    #[must_use]
    pub fn get_string(&self, literal: &str) -> Option<StringId> {
        self.inner.read().unwrap().string_ids.get(literal).copied()
    }

    /// Resolves a string id back to its literal.
    #[must_use]
    pub fn string(&self, id: StringId) -> Arc<str> {
        self.inner.read().unwrap().strings[id.as_usize()].clone()
    }

    /// Interns the given type descriptor.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidDescriptor` error if the string is not a
    /// well-formed internal type descriptor.
    pub fn make_type(&self, descriptor: &str) -> IrResult<TypeId> {
        if !types::is_valid_descriptor(descriptor) {
            return Err(IrError::InvalidDescriptor(descriptor.to_string()));
        }
        if let Some(id) = self.inner.read().unwrap().type_ids.get(descriptor) {
            return Ok(*id);
        }
        let mut inner = self.inner.write().unwrap();
        if let Some(id) = inner.type_ids.get(descriptor) {
            return Ok(*id);
        }
        let id = TypeId(inner.types.len() as u32);
        let descriptor: Arc<str> = Arc::from(descriptor);
        inner.types.push(descriptor.clone());
        inner.type_ids.insert(descriptor, id);
        Ok(id)
    }

    /// Resolves a type id back to its descriptor.
    #[must_use]
    pub fn type_descriptor(&self, id: TypeId) -> Arc<str> {
        self.inner.read().unwrap().types[id.as_usize()].clone()
    }

    /// Interns the given field reference.
    pub fn make_field(&self, owner: TypeId, name: StringId, type_: TypeId) -> FieldId {
        let field = FieldRef { owner, name, type_ };
        if let Some(id) = self.inner.read().unwrap().field_ids.get(&field) {
            return *id;
        }
        let mut inner = self.inner.write().unwrap();
        if let Some(id) = inner.field_ids.get(&field) {
            return *id;
        }
        let id = FieldId(inner.fields.len() as u32);
        inner.fields.push(field);
        inner.field_ids.insert(field, id);
        id
    }

    /// Resolves a field id back to its reference.
    #[must_use]
    pub fn field(&self, id: FieldId) -> FieldRef {
        self.inner.read().unwrap().fields[id.as_usize()]
    }

    /// Returns the declared type of the given field.
    #[must_use]
    pub fn field_type(&self, id: FieldId) -> TypeId {
        self.field(id).type_
    }

    /// Interns the given method reference.
    pub fn make_method(
        &self,
        owner: TypeId,
        name: StringId,
        parameters: Vec<TypeId>,
        return_type: TypeId,
    ) -> MethodId {
        let sig = MethodSig {
            owner,
            name,
            parameters,
            return_type,
        };
        if let Some(id) = self.inner.read().unwrap().method_ids.get(&sig) {
            return *id;
        }
        let mut inner = self.inner.write().unwrap();
        if let Some(id) = inner.method_ids.get(&sig) {
            return *id;
        }
        let id = MethodId(inner.methods.len() as u32);
        let sig = Arc::new(sig);
        inner.methods.push(sig.clone());
        inner.method_ids.insert(sig, id);
        id
    }

    /// Resolves a method id back to its full signature.
    #[must_use]
    pub fn method_sig(&self, id: MethodId) -> Arc<MethodSig> {
        self.inner.read().unwrap().methods[id.as_usize()].clone()
    }

    /// Returns the owner class of the given method reference.
    #[must_use]
    pub fn method_owner(&self, id: MethodId) -> TypeId {
        self.inner.read().unwrap().methods[id.as_usize()].owner
    }

    /// Returns the selector name of the given method reference.
    #[must_use]
    pub fn method_name(&self, id: MethodId) -> StringId {
        self.inner.read().unwrap().methods[id.as_usize()].name
    }

    /// Returns the return type of the given method reference.
    #[must_use]
    pub fn method_return_type(&self, id: MethodId) -> TypeId {
        self.inner.read().unwrap().methods[id.as_usize()].return_type
    }

    /// Returns the interned id of `java.lang.Object`.
    #[must_use]
    pub fn object_type(&self) -> TypeId {
        self.make_type(OBJECT_DESCRIPTOR).unwrap()
    }

    /// Returns the interned id of `java.lang.Class`.
    #[must_use]
    pub fn class_type(&self) -> TypeId {
        self.make_type(CLASS_DESCRIPTOR).unwrap()
    }

    /// Returns the interned id of `java.lang.String`.
    #[must_use]
    pub fn string_type(&self) -> TypeId {
        self.make_type(STRING_DESCRIPTOR).unwrap()
    }

    /// Checks whether the given type is `void`.
    #[must_use]
    pub fn is_void(&self, id: TypeId) -> bool {
        types::is_void_descriptor(&self.type_descriptor(id))
    }

    /// Checks whether the given type is primitive.
    #[must_use]
    pub fn is_primitive(&self, id: TypeId) -> bool {
        types::is_primitive_descriptor(&self.type_descriptor(id))
    }

    /// Checks whether the given type is an object type (class or array).
    #[must_use]
    pub fn is_object(&self, id: TypeId) -> bool {
        types::is_object_descriptor(&self.type_descriptor(id))
    }

    /// Checks whether the given type is an array type.
    #[must_use]
    pub fn is_array(&self, id: TypeId) -> bool {
        types::is_array_descriptor(&self.type_descriptor(id))
    }

    /// Checks whether values of the given type occupy a register pair.
    #[must_use]
    pub fn is_wide(&self, id: TypeId) -> bool {
        types::is_wide_descriptor(&self.type_descriptor(id))
    }

    /// Returns the component type of an array type, stripping one dimension.
    #[must_use]
    pub fn array_component_type(&self, id: TypeId) -> Option<TypeId> {
        let descriptor = self.type_descriptor(id);
        let component = types::array_component_descriptor(&descriptor)?;
        self.make_type(component).ok()
    }
}

/// Resolution of interned identifiers for human consumption.
///
/// Identifier tokens display as opaque `t#n`/`s#n` forms on their own; a
/// [`PrettyPrinter`] pairs a value with the pool that can resolve it.
pub trait PrettyPrint {
    fn pp(&self, f: &mut fmt::Formatter, pool: &SymbolPool) -> fmt::Result;
}

pub struct PrettyPrinter<'a, T>(pub &'a T, pub &'a SymbolPool);

impl<'a, T: PrettyPrint> fmt::Display for PrettyPrinter<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.pp(f, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_identity() {
        let pool = SymbolPool::new();
        let a = pool.make_string("bar");
        let b = pool.make_string("bar");
        let c = pool.make_string("baz");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.get_string("bar"), Some(a));
        assert_eq!(pool.get_string("quux"), None);
        assert_eq!(&*pool.string(a), "bar");
    }

    #[test]
    fn type_interning_and_predicates() {
        let pool = SymbolPool::new();
        let string = pool.make_type(STRING_DESCRIPTOR).unwrap();
        assert_eq!(string, pool.string_type());
        assert!(pool.is_object(string));
        assert!(!pool.is_array(string));

        let long = pool.make_type("J").unwrap();
        assert!(pool.is_primitive(long));
        assert!(pool.is_wide(long));

        let matrix = pool.make_type("[[I").unwrap();
        let row = pool.array_component_type(matrix).unwrap();
        assert_eq!(&*pool.type_descriptor(row), "[I");
        let elem = pool.array_component_type(row).unwrap();
        assert_eq!(&*pool.type_descriptor(elem), "I");
        assert_eq!(pool.array_component_type(elem), None);

        assert!(pool.make_type("not a descriptor").is_err());
    }

    #[test]
    fn method_interning_by_full_signature() {
        let pool = SymbolPool::new();
        let class = pool.class_type();
        let string = pool.string_type();
        let name = pool.make_string("forName");
        let a = pool.make_method(class, name, vec![string], class);
        let b = pool.make_method(class, name, vec![string], class);
        assert_eq!(a, b);
        let c = pool.make_method(class, name, vec![], class);
        assert_ne!(a, c);
        assert_eq!(pool.method_owner(a), class);
        assert_eq!(pool.method_name(a), name);
        assert_eq!(pool.method_return_type(a), class);
        assert_eq!(pool.method_sig(a).parameters, vec![string]);
    }

    #[test]
    fn field_interning() {
        let pool = SymbolPool::new();
        let owner = pool.make_type("La/B;").unwrap();
        let name = pool.make_string("handler");
        let type_ = pool.object_type();
        let a = pool.make_field(owner, name, type_);
        let b = pool.make_field(owner, name, type_);
        assert_eq!(a, b);
        assert_eq!(pool.field_type(a), type_);
        assert_eq!(pool.field(a).owner, owner);
    }

    #[test]
    fn concurrent_interning_yields_one_identity() {
        let pool = std::sync::Arc::new(SymbolPool::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || pool.make_string("<init>"))
            })
            .collect();
        let ids: Vec<StringId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }
}
