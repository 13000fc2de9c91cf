//! Control flow graph representation.

use crate::errors::{AnalysisError, AnalysisResult};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use reflex_ir::instrs::{Instr, LabeledInstr};
use reflex_ir::methods::MethodBody;
use reflex_ir::Addr;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fmt::Write;

/// A basic block: a maximal run of instructions with a single entry point.
#[derive(Debug)]
pub struct Block {
    instrs: Vec<LabeledInstr>,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for linstr in &self.instrs {
            writeln!(f, "{:5}: {}", linstr.addr(), linstr.instr())?;
        }
        Ok(())
    }
}

impl Block {
    fn new(instrs: Vec<LabeledInstr>) -> Self {
        Self { instrs }
    }

    #[inline]
    pub fn instructions(&self) -> impl Iterator<Item = &LabeledInstr> {
        self.instrs.iter()
    }

    #[must_use]
    pub fn start_addr(&self) -> Addr {
        self.instrs.first().unwrap().addr()
    }
}

/// Edge labels of the control flow graph.
#[derive(Debug, Clone, Copy)]
pub enum Branch {
    IfTrue,
    IfFalse,
    Jmp,
    Sequence,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::IfTrue => write!(f, "<true>"),
            Self::IfFalse => write!(f, "<false>"),
            Self::Jmp => write!(f, "<jmp>"),
            Self::Sequence => write!(f, "<seq>"),
        }
    }
}

/// The control flow graph of one method body.
#[derive(Debug)]
pub struct Cfg {
    pub(crate) inner: DiGraph<Block, Branch>,
    node_ids: BTreeMap<Addr, NodeIndex>,
}

impl Cfg {
    /// Builds the control flow graph of the given method body.
    ///
    /// # Errors
    ///
    /// Returns `NoCode` for an empty body, and `InvalidBranchTarget` if a
    /// branch offset does not land on an instruction of the body.
    pub fn build(body: &MethodBody) -> AnalysisResult<Self> {
        if body.is_empty() {
            return Err(AnalysisError::NoCode);
        }

        let mut cfgraph = DiGraph::new();
        let mut node_ids = BTreeMap::new();

        let leaders = compute_block_leaders(body);
        for block in split_into_blocks(body, leaders) {
            node_ids.insert(block.start_addr(), cfgraph.add_node(block));
        }

        let breakers: Vec<LabeledInstr> = cfgraph
            .node_indices()
            .map(|id| cfgraph[id].instrs.last().unwrap().clone())
            .collect();
        for linstr in breakers {
            let src_id = node_ids[&block_leader_of(&node_ids, linstr.addr())];
            let branching = instruction_branching(&linstr);
            if branching.is_empty() && !instruction_ends_flow(linstr.instr()) {
                if let Some(dst_id) = node_ids.get(&linstr.next_addr()) {
                    cfgraph.add_edge(src_id, *dst_id, Branch::Sequence);
                }
                continue;
            }
            for (branch, dst) in branching {
                let dst_id = node_ids
                    .get(&dst)
                    .ok_or(AnalysisError::InvalidBranchTarget(dst))?;
                cfgraph.add_edge(src_id, *dst_id, branch);
            }
        }

        Ok(Self {
            inner: cfgraph,
            node_ids,
        })
    }

    pub(crate) fn start_index(&self) -> NodeIndex {
        *self.node_ids.get(&Addr::entry()).unwrap()
    }

    /// Returns the blocks of the graph ordered by start address.
    pub fn iter_ordered_blocks(&self) -> impl Iterator<Item = &Block> {
        self.node_ids.values().map(move |id| &self.inner[*id])
    }

    /// Renders the graph in Graphviz dot format.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut res = String::new();
        res.push_str("digraph {\n");
        write!(
            res,
            "{}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::GraphContentOnly, Config::EdgeNoLabel],
                &|_, edge| {
                    let color = match edge.weight() {
                        Branch::IfTrue => "green",
                        Branch::IfFalse => "red",
                        Branch::Jmp => "blue",
                        Branch::Sequence => "black",
                    };
                    format!("color={},xlabel=\"{}\"", color, edge.weight())
                },
                &|_, _| String::from("shape=box"),
            )
        )
        .unwrap();
        res.push('}');
        res
    }
}

// Block leaders are block first instructions addresses:
//   - target address of a branching instruction is a leader
//   - address following a branching or flow-ending instruction is a leader
fn compute_block_leaders(body: &MethodBody) -> BTreeSet<Addr> {
    let mut leaders = BTreeSet::new();
    for linstr in body.iter_instructions() {
        let branching = instruction_branching(linstr);
        if !branching.is_empty() || instruction_ends_flow(linstr.instr()) {
            leaders.insert(linstr.next_addr());
        }
        for (_, dst) in branching {
            leaders.insert(dst);
        }
    }
    leaders
}

fn split_into_blocks(body: &MethodBody, mut leaders: BTreeSet<Addr>) -> Vec<Block> {
    let mut instrs = Vec::new();
    let mut blocks = Vec::new();

    // remove 0 so we don't split at the beginning and don't create an empty
    // block
    leaders.remove(&Addr::entry());
    // the address following the last instruction is not a block
    leaders.remove(&Addr(body.iter_instructions().count()));

    for linstr in body.iter_instructions() {
        if leaders.contains(&linstr.addr()) {
            blocks.push(Block::new(instrs));
            instrs = Vec::new();
        }
        instrs.push(linstr.clone());
    }
    blocks.push(Block::new(instrs));

    blocks
}

fn block_leader_of(node_ids: &BTreeMap<Addr, NodeIndex>, addr: Addr) -> Addr {
    *node_ids.range(..=addr).next_back().unwrap().0
}

fn instruction_branching(linstr: &LabeledInstr) -> Vec<(Branch, Addr)> {
    match linstr.instr() {
        Instr::Goto(off) => vec![(Branch::Jmp, linstr.addr().offset(*off))],
        Instr::IfEqz(_, off) | Instr::IfNez(_, off) => vec![
            (Branch::IfTrue, linstr.addr().offset(*off)),
            (Branch::IfFalse, linstr.next_addr()),
        ],
        _ => vec![],
    }
}

fn instruction_ends_flow(instr: &Instr) -> bool {
    matches!(
        instr,
        Instr::ReturnVoid | Instr::Return(_) | Instr::ReturnObject(_) | Instr::Throw(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_ir::registers::Reg;

    fn v(r: u32) -> Reg {
        Reg::from(r)
    }

    #[test]
    fn straight_line_is_one_block() {
        let body = MethodBody::new(1, vec![Instr::Nop, Instr::Nop, Instr::ReturnVoid]);
        let cfg = Cfg::build(&body).unwrap();
        assert_eq!(cfg.inner.node_count(), 1);
        assert_eq!(cfg.inner.edge_count(), 0);
        assert_eq!(cfg.iter_ordered_blocks().next().unwrap().start_addr(), Addr(0));
    }

    #[test]
    fn diamond_shape() {
        // 0: if-eqz v0, +3   -> 3
        // 1: nop
        // 2: goto +2         -> 4
        // 3: nop
        // 4: return-void
        let body = MethodBody::new(
            1,
            vec![
                Instr::IfEqz(v(0), 3),
                Instr::Nop,
                Instr::Goto(2),
                Instr::Nop,
                Instr::ReturnVoid,
            ],
        );
        let cfg = Cfg::build(&body).unwrap();
        assert_eq!(cfg.inner.node_count(), 4);
        assert_eq!(cfg.inner.edge_count(), 4);
        let starts: Vec<Addr> = cfg.iter_ordered_blocks().map(Block::start_addr).collect();
        assert_eq!(starts, vec![Addr(0), Addr(1), Addr(3), Addr(4)]);
    }

    #[test]
    fn loop_back_edge() {
        // 0: nop
        // 1: if-eqz v0, +2   -> 3
        // 2: goto -1         -> 1
        // 3: return-void
        let body = MethodBody::new(
            1,
            vec![
                Instr::Nop,
                Instr::IfEqz(v(0), 2),
                Instr::Goto(-1),
                Instr::ReturnVoid,
            ],
        );
        let cfg = Cfg::build(&body).unwrap();
        assert_eq!(cfg.inner.node_count(), 4);
        assert_eq!(cfg.inner.edge_count(), 4);
    }

    #[test]
    fn empty_body_is_no_code() {
        let body = MethodBody::new(0, vec![]);
        assert!(matches!(Cfg::build(&body), Err(AnalysisError::NoCode)));
    }

    #[test]
    fn bogus_branch_target_is_rejected() {
        let body = MethodBody::new(1, vec![Instr::Goto(10), Instr::ReturnVoid]);
        assert!(matches!(
            Cfg::build(&body),
            Err(AnalysisError::InvalidBranchTarget(Addr(10)))
        ));
    }

    #[test]
    fn dot_export_mentions_blocks() {
        let body = MethodBody::new(1, vec![Instr::Nop, Instr::ReturnVoid]);
        let cfg = Cfg::build(&body).unwrap();
        let dot = cfg.to_dot();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("return-void"));
    }
}
