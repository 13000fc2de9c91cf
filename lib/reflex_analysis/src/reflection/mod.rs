//! Reflection usage analysis.
//!
//! Given one method body, computes for every program point an
//! over-approximation of the registers that may hold reflective entities
//! (class objects, method and field descriptors, interned string constants)
//! and exposes the instructions observing such values. A whole-program
//! client uses this map to keep reflectively referenced classes, methods and
//! fields reachable.

mod forward;
mod objects;

pub use objects::{
    AbstractObject, AbstractObjectDomain, AbstractObjectEnvironment, ClassObjectSource,
};

use crate::dataflow::{self, Dataflow};
use crate::errors::AnalysisResult;
use reflex_ir::methods::{Method, MethodId};
use reflex_ir::registers::Reg;
use reflex_ir::strings::StringId;
use reflex_ir::types::TypeId;
use reflex_ir::{Addr, PrettyPrinter, SymbolPool};
use std::collections::{BTreeMap, BTreeSet};

/// For each instruction holding reflective values in its entry state, the
/// concerned registers and their symbolic objects, ordered by register with
/// the result register last. Instructions appear in program order.
pub type ReflectionSites = Vec<(Addr, BTreeMap<Reg, AbstractObject>)>;

/// The reflection API method references recognized by the transfer function,
/// resolved once per analysis through the host pool.
#[derive(Debug)]
pub(crate) struct ReflectionApi {
    pub(crate) get_class: MethodId,
    pub(crate) for_name: MethodId,
    pub(crate) get_method: MethodId,
    pub(crate) get_declared_method: MethodId,
    pub(crate) ctor_lookup: BTreeSet<MethodId>,
    pub(crate) get_field: MethodId,
    pub(crate) get_declared_field: MethodId,
    pub(crate) method_get_name: MethodId,
    pub(crate) field_get_name: MethodId,
    pub(crate) init_name: StringId,
    pub(crate) class_type: TypeId,
    pub(crate) string_type: TypeId,
}

impl ReflectionApi {
    fn new(pool: &SymbolPool) -> Self {
        let object = pool.object_type();
        let class = pool.class_type();
        let string = pool.string_type();
        let class_array = pool.make_type("[Ljava/lang/Class;").unwrap();
        let method = pool.make_type("Ljava/lang/reflect/Method;").unwrap();
        let field = pool.make_type("Ljava/lang/reflect/Field;").unwrap();
        let ctor = pool.make_type("Ljava/lang/reflect/Constructor;").unwrap();
        let ctors = pool.make_type("[Ljava/lang/reflect/Constructor;").unwrap();

        let get_constructor =
            pool.make_method(class, pool.make_string("getConstructor"), vec![class_array], ctor);
        let get_declared_constructor = pool.make_method(
            class,
            pool.make_string("getDeclaredConstructor"),
            vec![class_array],
            ctor,
        );
        let get_constructors =
            pool.make_method(class, pool.make_string("getConstructors"), vec![], ctors);
        let get_declared_constructors = pool.make_method(
            class,
            pool.make_string("getDeclaredConstructors"),
            vec![],
            ctors,
        );

        Self {
            get_class: pool.make_method(object, pool.make_string("getClass"), vec![], class),
            for_name: pool.make_method(class, pool.make_string("forName"), vec![string], class),
            get_method: pool.make_method(
                class,
                pool.make_string("getMethod"),
                vec![string, class_array],
                method,
            ),
            get_declared_method: pool.make_method(
                class,
                pool.make_string("getDeclaredMethod"),
                vec![string, class_array],
                method,
            ),
            ctor_lookup: BTreeSet::from([
                get_constructor,
                get_declared_constructor,
                get_constructors,
                get_declared_constructors,
            ]),
            get_field: pool.make_method(class, pool.make_string("getField"), vec![string], field),
            get_declared_field: pool.make_method(
                class,
                pool.make_string("getDeclaredField"),
                vec![string],
                field,
            ),
            method_get_name: pool.make_method(
                method,
                pool.make_string("getName"),
                vec![],
                string,
            ),
            field_get_name: pool.make_method(field, pool.make_string("getName"), vec![], string),
            init_name: pool.make_string("<init>"),
            class_type: class,
            string_type: string,
        }
    }
}

/// The context shared by the transfer function across one analysis run.
pub struct ReflectionContext<'a> {
    pub(crate) pool: &'a SymbolPool,
    pub(crate) api: ReflectionApi,
}

impl<'a> ReflectionContext<'a> {
    #[must_use]
    pub fn new(pool: &'a SymbolPool) -> Self {
        Self {
            pool,
            api: ReflectionApi::new(pool),
        }
    }
}

/// The reflection analysis of one method, ready for queries.
///
/// A fresh instance is built per method; instances are independent and may
/// run in parallel over a shared [`SymbolPool`].
pub struct ReflectionAnalysis<'a> {
    method: &'a Method,
    pool: &'a SymbolPool,
    entries: BTreeMap<Addr, AbstractObjectEnvironment>,
}

impl<'a> ReflectionAnalysis<'a> {
    /// Runs the analysis to fixpoint over the method body.
    ///
    /// A method without a body (or with an empty one) is not an error: the
    /// analysis is built all the same and every query returns nothing.
    ///
    /// # Errors
    ///
    /// This function may generate errors when the control flow graph cannot
    /// be built from the method body (invalid branch target).
    pub fn run(method: &'a Method, pool: &'a SymbolPool) -> AnalysisResult<Self> {
        let entries = match method.body() {
            Some(body) if !body.is_empty() => {
                let context = ReflectionContext::new(pool);
                let flow: Dataflow<AbstractObjectEnvironment> =
                    dataflow::forward(method, &context)?;
                flow.entries
            }
            _ => BTreeMap::new(),
        };
        Ok(Self {
            method,
            pool,
            entries,
        })
    }

    /// Returns the symbolic object held by the given register in the entry
    /// state of the instruction at the given address, if that value is a
    /// single constant.
    #[must_use]
    pub fn get_abstract_object(&self, reg: Reg, addr: Addr) -> Option<AbstractObject> {
        self.entries.get(&addr)?.get(reg).get_constant()
    }

    /// Returns every instruction observing reflective values, in program
    /// order, with the concerned registers.
    #[must_use]
    pub fn get_reflection_sites(&self) -> ReflectionSites {
        let mut sites = Vec::new();
        let Some(body) = self.method.body() else {
            return sites;
        };
        let reg_size = body.registers_size();
        for linstr in body.iter_instructions() {
            let mut objects = BTreeMap::new();
            for reg in 0..reg_size {
                self.get_reflection_site(Reg::from(reg), linstr.addr(), &mut objects);
            }
            self.get_reflection_site(Reg::RESULT, linstr.addr(), &mut objects);
            if !objects.is_empty() {
                sites.push((linstr.addr(), objects));
            }
        }
        sites
    }

    /// Checks whether the method observes any reflective value at all.
    #[must_use]
    pub fn has_found_reflection(&self) -> bool {
        !self.get_reflection_sites().is_empty()
    }

    fn get_reflection_site(
        &self,
        reg: Reg,
        addr: Addr,
        objects: &mut BTreeMap<Reg, AbstractObject>,
    ) {
        let Some(object) = self.get_abstract_object(reg, addr) else {
            return;
        };
        if object.is_reflection_output() {
            log::trace!(
                "reflection site @{addr}: {reg} {}",
                PrettyPrinter(&object, self.pool)
            );
            objects.insert(reg, object);
        }
    }
}
