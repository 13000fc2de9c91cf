//! Abstract objects, their flat lattice and the register environment.

use reflex_ir::registers::Reg;
use reflex_ir::strings::StringId;
use reflex_ir::types::TypeId;
use reflex_ir::{PrettyPrint, SymbolPool};
use std::collections::BTreeMap;
use std::fmt;

/// How a class object entered a register.
///
/// A class value observed through reflection machinery (`const-class`,
/// `Class.forName`, `getClass`) is a reflection output; one merely passed
/// around as data (parameter, field content, unknown return value) is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassObjectSource {
    Reflection,
    NonReflection,
}

/// A symbolic summary of a runtime value relevant to reflection tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractObject {
    /// A runtime instance whose static type is known.
    Object { type_: TypeId },
    /// A specific interned string constant.
    String { value: StringId },
    /// A class object, optionally with the class it denotes, tagged with
    /// how it entered the register.
    Class {
        type_: Option<TypeId>,
        source: ClassObjectSource,
    },
    /// A reflective field descriptor.
    Field { owner: TypeId, name: StringId },
    /// A reflective method or constructor descriptor.
    Method { owner: TypeId, name: StringId },
}

impl AbstractObject {
    /// Checks whether this value makes the holding register a reflection
    /// site: field and method descriptors always do, class objects only
    /// when they were produced by reflection.
    #[must_use]
    pub const fn is_reflection_output(&self) -> bool {
        matches!(
            self,
            Self::Field { .. }
                | Self::Method { .. }
                | Self::Class {
                    source: ClassObjectSource::Reflection,
                    ..
                }
        )
    }
}

impl fmt::Display for AbstractObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Object { type_ } => write!(f, "OBJECT{{{type_}}}"),
            Self::String { value } => write!(f, "\"{value}\""),
            Self::Class { type_, source } => {
                let tag = match source {
                    ClassObjectSource::Reflection => "CLASS_REFLECT",
                    ClassObjectSource::NonReflection => "CLASS",
                };
                match type_ {
                    Some(type_) => write!(f, "{tag}{{{type_}}}"),
                    None => write!(f, "{tag}{{_}}"),
                }
            }
            Self::Field { owner, name } => write!(f, "FIELD{{{owner}:{name}}}"),
            Self::Method { owner, name } => write!(f, "METHOD{{{owner}:{name}}}"),
        }
    }
}

impl PrettyPrint for AbstractObject {
    fn pp(&self, f: &mut fmt::Formatter, pool: &SymbolPool) -> fmt::Result {
        match self {
            Self::Object { type_ } => write!(f, "OBJECT{{{}}}", pool.type_descriptor(*type_)),
            Self::String { value } => write!(f, "{:?}", pool.string(*value)),
            Self::Class { type_, source } => {
                let tag = match source {
                    ClassObjectSource::Reflection => "CLASS_REFLECT",
                    ClassObjectSource::NonReflection => "CLASS",
                };
                match type_ {
                    Some(type_) => write!(f, "{tag}{{{}}}", pool.type_descriptor(*type_)),
                    None => write!(f, "{tag}{{_}}"),
                }
            }
            Self::Field { owner, name } => write!(
                f,
                "FIELD{{{}:{}}}",
                pool.type_descriptor(*owner),
                pool.string(*name)
            ),
            Self::Method { owner, name } => write!(
                f,
                "METHOD{{{}:{}}}",
                pool.type_descriptor(*owner),
                pool.string(*name)
            ),
        }
    }
}

/// The flat constant lattice over [`AbstractObject`]: ⊥, one level of
/// incomparable constants, ⊤.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbstractObjectDomain {
    Bottom,
    Constant(AbstractObject),
    Top,
}

impl AbstractObjectDomain {
    #[inline]
    #[must_use]
    pub const fn top() -> Self {
        Self::Top
    }

    #[inline]
    #[must_use]
    pub const fn bottom() -> Self {
        Self::Bottom
    }

    #[inline]
    #[must_use]
    pub const fn constant(object: AbstractObject) -> Self {
        Self::Constant(object)
    }

    /// Returns the unique object iff the value is a constant.
    #[must_use]
    pub const fn get_constant(&self) -> Option<AbstractObject> {
        match self {
            Self::Constant(object) => Some(*object),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_top(&self) -> bool {
        matches!(self, Self::Top)
    }

    #[inline]
    #[must_use]
    pub const fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    #[must_use]
    pub fn join(self, other: Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x,
            (x, y) if x == y => x,
            _ => Self::Top,
        }
    }

    #[must_use]
    pub fn meet(self, other: Self) -> Self {
        match (self, other) {
            (Self::Top, x) | (x, Self::Top) => x,
            (x, y) if x == y => x,
            _ => Self::Bottom,
        }
    }

    #[must_use]
    pub fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Top) => true,
            (x, y) => x == y,
        }
    }
}

impl fmt::Display for AbstractObjectDomain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bottom => write!(f, "⊥"),
            Self::Top => write!(f, "⊤"),
            Self::Constant(object) => write!(f, "{object}"),
        }
    }
}

/// A total map from register to lattice element.
///
/// Unbound registers read as ⊤, so the empty binding map is the ⊤
/// environment; a dedicated variant is the absorbing ⊥ environment. Only
/// non-⊤ bindings are stored, which keeps structural equality independent of
/// the assignment history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbstractObjectEnvironment {
    Bottom,
    Bindings(BTreeMap<Reg, AbstractObjectDomain>),
}

impl AbstractObjectEnvironment {
    #[must_use]
    pub fn top() -> Self {
        Self::Bindings(BTreeMap::new())
    }

    #[inline]
    #[must_use]
    pub const fn bottom() -> Self {
        Self::Bottom
    }

    #[inline]
    #[must_use]
    pub const fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    /// Returns the lattice value of the given register.
    #[must_use]
    pub fn get(&self, reg: Reg) -> AbstractObjectDomain {
        match self {
            Self::Bottom => AbstractObjectDomain::bottom(),
            Self::Bindings(map) => map
                .get(&reg)
                .copied()
                .unwrap_or_else(AbstractObjectDomain::top),
        }
    }

    /// Binds the given register to the given lattice value.
    ///
    /// Binding ⊥ collapses the whole environment to ⊥; the ⊥ environment
    /// absorbs every update.
    pub fn set(&mut self, reg: Reg, value: AbstractObjectDomain) {
        if value.is_bottom() {
            *self = Self::Bottom;
            return;
        }
        match self {
            Self::Bottom => {}
            Self::Bindings(map) => {
                if value.is_top() {
                    map.remove(&reg);
                } else {
                    map.insert(reg, value);
                }
            }
        }
    }

    /// Joins the other environment into this one, pointwise.
    pub fn join_with(&mut self, other: &Self) {
        match (self, other) {
            (_, Self::Bottom) => {}
            (this @ Self::Bottom, _) => *this = other.clone(),
            (Self::Bindings(lhs), Self::Bindings(rhs)) => {
                let bound: Vec<Reg> = lhs.keys().copied().collect();
                for reg in bound {
                    let joined = lhs[&reg].join(
                        rhs.get(&reg)
                            .copied()
                            .unwrap_or_else(AbstractObjectDomain::top),
                    );
                    if joined.is_top() {
                        lhs.remove(&reg);
                    } else {
                        lhs.insert(reg, joined);
                    }
                }
            }
        }
    }

    /// Checks the pointwise lattice order against the other environment.
    #[must_use]
    pub fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) => true,
            (Self::Bindings(_), Self::Bottom) => false,
            (Self::Bindings(_), Self::Bindings(rhs)) => rhs
                .iter()
                .all(|(reg, value)| self.get(*reg).leq(value)),
        }
    }
}

impl fmt::Display for AbstractObjectEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bottom => write!(f, "⊥"),
            Self::Bindings(map) if map.is_empty() => write!(f, "⊤"),
            Self::Bindings(map) => {
                write!(f, "[")?;
                for (i, (reg, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{reg}: {value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(pool: &SymbolPool) -> Vec<AbstractObjectDomain> {
        let t1 = pool.make_type("La/A;").unwrap();
        let t2 = pool.make_type("La/B;").unwrap();
        let s = pool.make_string("name");
        vec![
            AbstractObjectDomain::bottom(),
            AbstractObjectDomain::top(),
            AbstractObjectDomain::constant(AbstractObject::Object { type_: t1 }),
            AbstractObjectDomain::constant(AbstractObject::Object { type_: t2 }),
            AbstractObjectDomain::constant(AbstractObject::String { value: s }),
            AbstractObjectDomain::constant(AbstractObject::Class {
                type_: Some(t1),
                source: ClassObjectSource::Reflection,
            }),
            AbstractObjectDomain::constant(AbstractObject::Class {
                type_: Some(t1),
                source: ClassObjectSource::NonReflection,
            }),
            AbstractObjectDomain::constant(AbstractObject::Field { owner: t1, name: s }),
            AbstractObjectDomain::constant(AbstractObject::Method { owner: t1, name: s }),
        ]
    }

    #[test]
    fn join_is_commutative_and_associative() {
        let pool = SymbolPool::new();
        let elems = samples(&pool);
        for &a in &elems {
            for &b in &elems {
                assert_eq!(a.join(b), b.join(a));
                for &c in &elems {
                    assert_eq!(a.join(b).join(c), a.join(b.join(c)));
                }
            }
        }
    }

    #[test]
    fn join_is_an_upper_bound() {
        let pool = SymbolPool::new();
        let elems = samples(&pool);
        for &a in &elems {
            assert_eq!(a.join(AbstractObjectDomain::bottom()), a);
            assert!(a.join(AbstractObjectDomain::top()).is_top());
            assert_eq!(a.join(a), a);
            for &b in &elems {
                let ab = a.join(b);
                assert!(a.leq(&ab));
                assert!(b.leq(&ab));
            }
        }
    }

    #[test]
    fn meet_is_dual() {
        let pool = SymbolPool::new();
        let elems = samples(&pool);
        for &a in &elems {
            assert_eq!(a.meet(AbstractObjectDomain::top()), a);
            assert!(a.meet(AbstractObjectDomain::bottom()).is_bottom());
            for &b in &elems {
                assert_eq!(a.meet(b), b.meet(a));
                assert!(a.meet(b).leq(&a));
            }
        }
    }

    #[test]
    fn class_source_participates_in_equality() {
        let pool = SymbolPool::new();
        let t = pool.make_type("La/A;").unwrap();
        let refl = AbstractObjectDomain::constant(AbstractObject::Class {
            type_: Some(t),
            source: ClassObjectSource::Reflection,
        });
        let plain = AbstractObjectDomain::constant(AbstractObject::Class {
            type_: Some(t),
            source: ClassObjectSource::NonReflection,
        });
        assert_ne!(refl, plain);
        assert!(refl.join(plain).is_top());
    }

    #[test]
    fn environment_defaults_to_top() {
        let env = AbstractObjectEnvironment::top();
        assert!(env.get(Reg::from(7u32)).is_top());
        assert!(env.get(Reg::RESULT).is_top());
    }

    #[test]
    fn environment_set_get_and_normalization() {
        let pool = SymbolPool::new();
        let t = pool.make_type("La/A;").unwrap();
        let obj = AbstractObjectDomain::constant(AbstractObject::Object { type_: t });
        let mut env = AbstractObjectEnvironment::top();
        env.set(Reg::from(0u32), obj);
        assert_eq!(env.get(Reg::from(0u32)), obj);
        // rebinding to ⊤ leaves no trace of the assignment history
        env.set(Reg::from(0u32), AbstractObjectDomain::top());
        assert_eq!(env, AbstractObjectEnvironment::top());
    }

    #[test]
    fn environment_bottom_is_absorbing() {
        let pool = SymbolPool::new();
        let t = pool.make_type("La/A;").unwrap();
        let obj = AbstractObjectDomain::constant(AbstractObject::Object { type_: t });
        let mut env = AbstractObjectEnvironment::bottom();
        env.set(Reg::from(0u32), obj);
        assert!(env.is_bottom());

        let mut env = AbstractObjectEnvironment::top();
        env.set(Reg::from(0u32), AbstractObjectDomain::bottom());
        assert!(env.is_bottom());

        let mut bot = AbstractObjectEnvironment::bottom();
        let mut other = AbstractObjectEnvironment::top();
        other.set(Reg::from(1u32), obj);
        bot.join_with(&other);
        assert_eq!(bot, other);
        other.join_with(&AbstractObjectEnvironment::bottom());
        assert_eq!(bot, other);
    }

    #[test]
    fn environment_join_collapses_distinct_constants() {
        let pool = SymbolPool::new();
        let t1 = pool.make_type("La/A;").unwrap();
        let t2 = pool.make_type("La/B;").unwrap();
        let v0 = Reg::from(0u32);
        let v1 = Reg::from(1u32);

        let mut left = AbstractObjectEnvironment::top();
        left.set(v0, AbstractObjectDomain::constant(AbstractObject::Object { type_: t1 }));
        left.set(v1, AbstractObjectDomain::constant(AbstractObject::Object { type_: t1 }));
        let mut right = AbstractObjectEnvironment::top();
        right.set(v0, AbstractObjectDomain::constant(AbstractObject::Object { type_: t2 }));
        right.set(v1, AbstractObjectDomain::constant(AbstractObject::Object { type_: t1 }));

        left.join_with(&right);
        assert!(left.get(v0).is_top());
        assert_eq!(
            left.get(v1).get_constant(),
            Some(AbstractObject::Object { type_: t1 })
        );
        assert!(right.leq(&left));
    }

    #[test]
    fn environment_order() {
        let pool = SymbolPool::new();
        let t = pool.make_type("La/A;").unwrap();
        let v0 = Reg::from(0u32);
        let mut env = AbstractObjectEnvironment::top();
        env.set(v0, AbstractObjectDomain::constant(AbstractObject::Object { type_: t }));
        assert!(env.leq(&AbstractObjectEnvironment::top()));
        assert!(!AbstractObjectEnvironment::top().leq(&env));
        assert!(AbstractObjectEnvironment::bottom().leq(&env));
        assert!(!env.leq(&AbstractObjectEnvironment::bottom()));
    }
}
