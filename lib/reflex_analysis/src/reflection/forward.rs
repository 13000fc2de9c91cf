use crate::dataflow::AbstractForwardState;
use crate::reflection::objects::{
    AbstractObject, AbstractObjectDomain, AbstractObjectEnvironment, ClassObjectSource,
};
use crate::reflection::ReflectionContext;
use reflex_ir::instrs::Instr;
use reflex_ir::methods::{Method, MethodId};
use reflex_ir::registers::{Reg, RegList};
use reflex_ir::strings::StringId;
use reflex_ir::types::{external_to_internal, TypeId};

impl<'a> AbstractForwardState<'a> for AbstractObjectEnvironment {
    type Context<'c> = ReflectionContext<'c>;

    fn init(method: &Method, ctx: &ReflectionContext) -> Self {
        // The load-param pseudo instructions form the prefix of the entry
        // block and describe the formal parameters; they are interpreted
        // against the method signature once, before the fixpoint iteration.
        //
        // Parameters are never inferred as string constants: only the static
        // type is known here, not the literal. Likewise the exact class
        // behind a Class-typed parameter is unknown.
        let mut state = Self::top();
        let body = method.body().unwrap();
        let mut signature = method.parameters_types().iter();
        let mut first_param = true;
        for linstr in body.iter_instructions() {
            let instr = linstr.instr();
            match instr {
                Instr::LoadParamObject(dst) => {
                    if first_param && !method.is_static() {
                        // the first object parameter of an instance method
                        // is `this`
                        first_param = false;
                        state.set(
                            *dst,
                            AbstractObjectDomain::constant(AbstractObject::Object {
                                type_: method.class(),
                            }),
                        );
                    } else {
                        let type_ = signature
                            .next()
                            .expect("parameter type list shorter than the load-param prefix");
                        update_non_string_input(&mut state, instr, *type_, ctx);
                    }
                }
                Instr::LoadParam(_) | Instr::LoadParamWide(_) => {
                    default_semantics(instr, &mut state);
                }
                _ => break,
            }
        }
        state
    }

    fn join(&mut self, other: &Self, _ctx: &ReflectionContext) {
        self.join_with(other);
    }

    fn transfer_instr(&mut self, instr: &Instr, ctx: &ReflectionContext) {
        match instr {
            Instr::LoadParam(_) | Instr::LoadParamWide(_) | Instr::LoadParamObject(_) => {
                // interpreted before the fixpoint iteration
            }

            Instr::MoveObject(dst, src) => {
                let value = self.get(*src);
                self.set(*dst, value);
            }

            Instr::MoveResultObject(dst) | Instr::MoveResultPseudoObject(dst) => {
                let value = self.get(Reg::RESULT);
                self.set(*dst, value);
            }

            Instr::ConstString(value) => {
                self.set(
                    Reg::RESULT,
                    AbstractObjectDomain::constant(AbstractObject::String { value: *value }),
                );
            }

            Instr::ConstClass(type_) => {
                self.set(
                    Reg::RESULT,
                    AbstractObjectDomain::constant(AbstractObject::Class {
                        type_: Some(*type_),
                        source: ClassObjectSource::Reflection,
                    }),
                );
            }

            Instr::CheckCast(src, _) => {
                // Narrowing is skipped. If the cast fails, the point after
                // the instruction is unreachable, i.e. ⊥, and any state is a
                // sound approximation of ⊥.
                let value = self.get(*src);
                self.set(Reg::RESULT, value);
            }

            Instr::AgetObject(arr, _) => {
                let component = match self.get(*arr).get_constant() {
                    Some(AbstractObject::Object { type_ }) => ctx.pool.array_component_type(type_),
                    _ => None,
                };
                match component {
                    Some(type_) => update_non_string_input(self, instr, type_, ctx),
                    None => default_semantics(instr, self),
                }
            }

            Instr::IgetObject(_, field) | Instr::SgetObject(field) => {
                update_non_string_input(self, instr, ctx.pool.field_type(*field), ctx);
            }

            Instr::NewInstance(type_)
            | Instr::NewArray(_, type_)
            | Instr::FilledNewArray(_, type_) => {
                self.set(
                    Reg::RESULT,
                    AbstractObjectDomain::constant(AbstractObject::Object { type_: *type_ }),
                );
            }

            Instr::InvokeVirtual(args, callee) => {
                let receiver = args.get(0).and_then(|reg| self.get(reg).get_constant());
                match receiver {
                    Some(receiver) => {
                        process_virtual_call(self, instr, args, *callee, receiver, ctx);
                    }
                    None => update_return_object(self, instr, *callee, ctx),
                }
            }

            Instr::InvokeStatic(args, callee) => {
                if *callee == ctx.api.for_name {
                    if let Some(name) = string_operand(self, args, 0) {
                        let internal = external_to_internal(&ctx.pool.string(name));
                        if let Ok(type_) = ctx.pool.make_type(&internal) {
                            self.set(
                                Reg::RESULT,
                                AbstractObjectDomain::constant(AbstractObject::Class {
                                    type_: Some(type_),
                                    source: ClassObjectSource::Reflection,
                                }),
                            );
                            return;
                        }
                    }
                }
                update_return_object(self, instr, *callee, ctx);
            }

            Instr::InvokeInterface(_, callee)
            | Instr::InvokeSuper(_, callee)
            | Instr::InvokeDirect(_, callee) => {
                update_return_object(self, instr, *callee, ctx);
            }

            _ => default_semantics(instr, self),
        }
    }
}

/// Binds the destination of the given instruction to the symbolic object of
/// an incoming value of the given static type.
fn update_non_string_input(
    state: &mut AbstractObjectEnvironment,
    instr: &Instr,
    type_: TypeId,
    ctx: &ReflectionContext,
) {
    let dest = if instr.has_move_result() {
        Reg::RESULT
    } else {
        instr.dest().expect("instruction without destination register")
    };
    let object = if type_ == ctx.api.class_type {
        // the exact class the object refers to is not known here
        AbstractObject::Class {
            type_: None,
            source: ClassObjectSource::NonReflection,
        }
    } else {
        AbstractObject::Object { type_ }
    };
    state.set(dest, AbstractObjectDomain::constant(object));
}

/// Models an unknown call through its declared return type.
fn update_return_object(
    state: &mut AbstractObjectEnvironment,
    instr: &Instr,
    callee: MethodId,
    ctx: &ReflectionContext,
) {
    let return_type = ctx.pool.method_return_type(callee);
    if ctx.pool.is_void(return_type) || !ctx.pool.is_object(return_type) {
        return;
    }
    update_non_string_input(state, instr, return_type, ctx);
}

/// Clobbers the registers written by an instruction that is transparent to
/// this analysis.
///
/// This also covers the `move-result` instructions following operations that
/// are not modeled here, since those read ⊤ back from the result register.
fn default_semantics(instr: &Instr, state: &mut AbstractObjectEnvironment) {
    if let Some(dest) = instr.dest() {
        state.set(dest, AbstractObjectDomain::top());
        if instr.dest_is_wide() {
            state.set(dest.next(), AbstractObjectDomain::top());
        }
    }
    if instr.has_move_result() {
        state.set(Reg::RESULT, AbstractObjectDomain::top());
    }
}

/// Reads the string constant held by the argument register at the given
/// index, if any.
fn string_operand(
    state: &AbstractObjectEnvironment,
    args: &RegList,
    index: usize,
) -> Option<StringId> {
    match args.get(index).map(|reg| state.get(reg).get_constant()) {
        Some(Some(AbstractObject::String { value })) => Some(value),
        _ => None,
    }
}

fn process_virtual_call(
    state: &mut AbstractObjectEnvironment,
    instr: &Instr,
    args: &RegList,
    callee: MethodId,
    receiver: AbstractObject,
    ctx: &ReflectionContext,
) {
    let api = &ctx.api;
    match receiver {
        AbstractObject::Object { type_ } => {
            if callee == api.get_class {
                state.set(
                    Reg::RESULT,
                    AbstractObjectDomain::constant(AbstractObject::Class {
                        type_: Some(type_),
                        source: ClassObjectSource::Reflection,
                    }),
                );
                return;
            }
        }
        AbstractObject::String { .. } => {
            if callee == api.get_class {
                state.set(
                    Reg::RESULT,
                    AbstractObjectDomain::constant(AbstractObject::Class {
                        type_: Some(api.string_type),
                        source: ClassObjectSource::Reflection,
                    }),
                );
                return;
            }
        }
        AbstractObject::Class { .. } => {
            // The owner recorded in the synthesized descriptor is the class
            // declaring the reflection API method, i.e. java.lang.Class, not
            // the class denoted by the receiver.
            let descriptor = if callee == api.get_method || callee == api.get_declared_method {
                string_operand(state, args, 1).map(|name| AbstractObject::Method {
                    owner: ctx.pool.method_owner(callee),
                    name,
                })
            } else if api.ctor_lookup.contains(&callee) {
                // constructor lookups behave like a method lookup on the
                // hard-coded <init> selector
                Some(AbstractObject::Method {
                    owner: ctx.pool.method_owner(callee),
                    name: api.init_name,
                })
            } else if callee == api.get_field || callee == api.get_declared_field {
                string_operand(state, args, 1).map(|name| AbstractObject::Field {
                    owner: ctx.pool.method_owner(callee),
                    name,
                })
            } else {
                None
            };
            if let Some(descriptor) = descriptor {
                state.set(Reg::RESULT, AbstractObjectDomain::constant(descriptor));
                return;
            }
        }
        AbstractObject::Field { name, .. } => {
            if callee == api.field_get_name {
                state.set(
                    Reg::RESULT,
                    AbstractObjectDomain::constant(AbstractObject::String { value: name }),
                );
                return;
            }
        }
        AbstractObject::Method { name, .. } => {
            if callee == api.method_get_name {
                state.set(
                    Reg::RESULT,
                    AbstractObjectDomain::constant(AbstractObject::String { value: name }),
                );
                return;
            }
        }
    }
    update_return_object(state, instr, callee, ctx);
}
