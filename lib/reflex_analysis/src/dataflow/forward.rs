use crate::controlflow::Cfg;
use crate::dataflow::Dataflow;
use crate::errors::{AnalysisError, AnalysisResult};
use petgraph::graph::NodeIndex;
use petgraph::visit::{DfsPostOrder, EdgeRef};
use petgraph::Direction;
use reflex_ir::instrs::Instr;
use reflex_ir::methods::Method;
use reflex_ir::Addr;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// The abstract state that is carried along the control flow graph during
/// forward dataflow analysis.
///
/// The transfer function must be monotone and the state lattice of finite
/// height for the fixpoint iteration to terminate. All imprecision is
/// expressed inside the state itself (by widening to a top value), so the
/// state operations are infallible.
pub trait AbstractForwardState<'a>: Clone + Eq + Sized + fmt::Display {
    type Context<'c>;

    /// The state initialization function, run once for the method entry.
    fn init(method: &Method, ctx: &Self::Context<'a>) -> Self;

    /// The state join operation, applied at block boundaries.
    fn join(&mut self, other: &Self, ctx: &Self::Context<'a>);

    /// The instruction transfer function.
    fn transfer_instr(&mut self, instr: &Instr, ctx: &Self::Context<'a>);
}

/// Performs a forward dataflow analysis over the method's control flow
/// graph.
///
/// Blocks are scheduled in reverse postorder and re-queued while their
/// predecessors' exit states keep changing. Per-instruction entry and exit
/// states are recorded on every visit; the values left by the final visit of
/// each block are the converged ones.
///
/// # Errors
///
/// This function may generate errors when the control flow graph cannot be
/// built from the method body (absent or empty body, invalid branch
/// target).
pub fn forward<'a, S>(method: &Method, context: &S::Context<'a>) -> AnalysisResult<Dataflow<S>>
where
    S: AbstractForwardState<'a>,
{
    let body = method.body().ok_or(AnalysisError::NoCode)?;
    let cfg = Cfg::build(body)?;
    let cfgraph = &cfg.inner;

    let mut block_exits: BTreeMap<NodeIndex, S> = BTreeMap::new();
    let mut entries: BTreeMap<Addr, S> = BTreeMap::new();
    let mut exits: BTreeMap<Addr, S> = BTreeMap::new();

    // For forward dataflow, optimal order is reverse postorder. The
    // postorder here is reversed when we pop_back from the deque.
    let mut worklist: VecDeque<NodeIndex> = VecDeque::new();
    let mut postorder = DfsPostOrder::new(cfgraph, cfg.start_index());
    while let Some(id) = postorder.next(cfgraph) {
        worklist.push_back(id);
    }

    while let Some(id) = worklist.pop_back() {
        let block = &cfgraph[id];
        log::debug!("    ---- block@{}", block.start_addr());

        // retrieve list of already computed predecessors
        let preds: Vec<_> = cfgraph
            .edges_directed(id, Direction::Incoming)
            .filter(|edge| block_exits.contains_key(&edge.source()))
            .collect();

        // recompose new_state from exit states of predecessor blocks:
        // the entry block always starts from the initial state (joined with
        // back-edge predecessors, if any); any other block joins the exits
        // of its computed predecessors. Reverse postorder guarantees that a
        // reachable non-entry block has at least one of those.
        let mut new_state = if id == cfg.start_index() {
            let mut entry = S::init(method, context);
            for edge in &preds {
                entry.join(block_exits.get(&edge.source()).unwrap(), context);
            }
            entry
        } else {
            let mut entry: S = block_exits.get(&preds[0].source()).unwrap().clone();
            for edge in preds.iter().skip(1) {
                entry.join(block_exits.get(&edge.source()).unwrap(), context);
            }
            entry
        };

        log::debug!("    -- ENTRY STATE: {new_state}");

        // then apply transfer function for each instruction of the block
        // while saving intermediate states
        for linstr in block.instructions() {
            entries.insert(linstr.addr(), new_state.clone());
            log::trace!("transfer_instr( {} )", linstr.instr());
            log::trace!("    before: {new_state}");
            new_state.transfer_instr(linstr.instr(), context);
            log::trace!("    after:  {new_state}");
            exits.insert(linstr.addr(), new_state.clone());
        }
        log::debug!("    -- EXIT STATE: {new_state}");

        // checking if need to treat again successors: the first computation
        // of a block counts as a change too, so that a loop head popped
        // before its back-edge predecessor gets requeued
        let changed = match block_exits.get(&id) {
            Some(old_state) => &new_state != old_state,
            None => true,
        };
        if changed {
            cfgraph
                .edges_directed(id, Direction::Outgoing)
                .for_each(|edge| {
                    if !worklist.contains(&edge.target()) {
                        worklist.push_front(edge.target());
                    }
                });
        }

        block_exits.insert(id, new_state);
    }

    Ok(Dataflow { entries, exits })
}
