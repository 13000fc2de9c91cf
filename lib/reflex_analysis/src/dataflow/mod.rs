//! Dataflow analysis framework.

use reflex_ir::Addr;
use std::collections::BTreeMap;

mod forward;

pub use forward::{forward, AbstractForwardState};

/// Dataflow analysis result object.
///
/// Contains the entry and exit abstract states of every instruction of the
/// analyzed method, after reaching fixpoint. Keeping the per-instruction
/// entry states around is what makes later per-site queries cheap.
#[derive(Debug, Clone)]
pub struct Dataflow<S> {
    pub entries: BTreeMap<Addr, S>,
    pub exits: BTreeMap<Addr, S>,
}
