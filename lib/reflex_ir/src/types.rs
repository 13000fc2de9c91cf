//! Typing identifiers and descriptor helpers.
//!
//! Types are identified by their Dalvik descriptor in internal form:
//! single-letter primitives (`I`, `J`, ...), classes as `La/b/C;`, arrays
//! with one leading `[` per dimension. The pool interns descriptors and
//! hands out [`TypeId`] identity tokens; everything the analyses need to
//! know about a type is answered from its descriptor.

use serde::Serialize;
use std::fmt;

/// The identity of an interned type descriptor.
///
/// Same contract as [`StringId`](crate::strings::StringId): equality is
/// interned identity within one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TypeId(pub(crate) u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "t#{}", self.0)
    }
}

impl TypeId {
    pub(crate) fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Checks that the given string is a well-formed type descriptor.
pub(crate) fn is_valid_descriptor(descriptor: &str) -> bool {
    let base = descriptor.trim_start_matches('[');
    if descriptor.len() - base.len() > 255 {
        return false;
    }
    match base.as_bytes() {
        [b'V'] => base.len() == descriptor.len(),
        [b'Z' | b'B' | b'S' | b'C' | b'I' | b'J' | b'F' | b'D'] => true,
        [b'L', .., b';'] => base.len() > 2,
        _ => false,
    }
}

/// Checks whether the descriptor denotes the `void` type.
#[must_use]
pub fn is_void_descriptor(descriptor: &str) -> bool {
    descriptor == "V"
}

/// Checks whether the descriptor denotes a primitive type.
#[must_use]
pub fn is_primitive_descriptor(descriptor: &str) -> bool {
    matches!(
        descriptor,
        "Z" | "B" | "S" | "C" | "I" | "J" | "F" | "D"
    )
}

/// Checks whether the descriptor denotes an object type, i.e. a class or an
/// array.
#[must_use]
pub fn is_object_descriptor(descriptor: &str) -> bool {
    matches!(descriptor.as_bytes().first(), Some(b'L' | b'['))
}

/// Checks whether the descriptor denotes an array type.
#[must_use]
pub fn is_array_descriptor(descriptor: &str) -> bool {
    descriptor.starts_with('[')
}

/// Checks whether the descriptor denotes a value stored in a register pair.
#[must_use]
pub fn is_wide_descriptor(descriptor: &str) -> bool {
    matches!(descriptor, "J" | "D")
}

/// Returns the component descriptor of an array descriptor, stripping one
/// dimension.
#[must_use]
pub fn array_component_descriptor(descriptor: &str) -> Option<&str> {
    descriptor.strip_prefix('[')
}

/// Converts a Java external class name to its internal descriptor form.
///
/// `a.b.C` becomes `La/b/C;`. Array names keep their leading `[`
/// dimensions, and names that already are descriptors (internal class forms
/// and single-letter primitives) come out unchanged, so internal-form
/// strings are fixed points of the conversion.
#[must_use]
pub fn external_to_internal(external: &str) -> String {
    if let Some(component) = external.strip_prefix('[') {
        return format!("[{}", external_to_internal(component));
    }
    if external.len() == 1 && is_primitive_descriptor(external) {
        return external.to_string();
    }
    if external.starts_with('L') && external.ends_with(';') {
        return external.replace('.', "/");
    }
    format!("L{};", external.replace('.', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_validity() {
        assert!(is_valid_descriptor("I"));
        assert!(is_valid_descriptor("V"));
        assert!(is_valid_descriptor("Ljava/lang/String;"));
        assert!(is_valid_descriptor("[[J"));
        assert!(is_valid_descriptor("[Ljava/lang/Class;"));
        assert!(!is_valid_descriptor(""));
        assert!(!is_valid_descriptor("java/lang/String"));
        assert!(!is_valid_descriptor("L;"));
        assert!(!is_valid_descriptor("[V"));
    }

    #[test]
    fn descriptor_predicates() {
        assert!(is_void_descriptor("V"));
        assert!(is_primitive_descriptor("J"));
        assert!(is_wide_descriptor("D"));
        assert!(!is_wide_descriptor("I"));
        assert!(is_object_descriptor("Ljava/lang/Object;"));
        assert!(is_object_descriptor("[I"));
        assert!(!is_object_descriptor("I"));
        assert_eq!(array_component_descriptor("[[I"), Some("[I"));
        assert_eq!(array_component_descriptor("I"), None);
    }

    #[test]
    fn external_to_internal_classes() {
        assert_eq!(external_to_internal("a.b.C"), "La/b/C;");
        assert_eq!(external_to_internal("Singleton"), "LSingleton;");
        assert_eq!(
            external_to_internal("java.lang.String"),
            "Ljava/lang/String;"
        );
    }

    #[test]
    fn external_to_internal_arrays() {
        assert_eq!(
            external_to_internal("[Ljava.lang.String;"),
            "[Ljava/lang/String;"
        );
        assert_eq!(external_to_internal("[[I"), "[[I");
    }

    #[test]
    fn external_to_internal_fixed_points() {
        for internal in ["La/b/C;", "[La/b/C;", "I", "[[J", "Ljava/lang/Class;"] {
            assert_eq!(external_to_internal(internal), internal);
            let converted = external_to_internal(&external_to_internal(internal));
            assert_eq!(converted, internal);
        }
    }
}
