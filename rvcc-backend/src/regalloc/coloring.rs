//! Greedy graph colouring
//!
//! Nodes are visited in order of first appearance and take the first pool
//! register none of their coloured neighbours holds. Values live across a
//! call only look at callee-saved registers. A node with no candidate left
//! is spilled.

use super::liveness::InterferenceGraph;
use log::trace;
use rvcc_codegen::{CallingConvention, Reg};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct Coloring {
    pub assigned: HashMap<String, Reg>,
    pub spilled: Vec<String>,
}

pub fn color(graph: &InterferenceGraph) -> Coloring {
    color_with(graph, &CallingConvention::allocatable())
}

pub fn color_with(graph: &InterferenceGraph, pool: &[Reg]) -> Coloring {
    let mut coloring = Coloring::default();

    for name in &graph.nodes {
        let taken: HashSet<Reg> = graph
            .neighbours(name)
            .filter_map(|n| coloring.assigned.get(n))
            .copied()
            .collect();
        let across_call = graph.across_call.contains(name);

        let choice = pool
            .iter()
            .copied()
            .filter(|r| !across_call || CallingConvention::is_callee_saved(*r))
            .find(|r| !taken.contains(r));

        match choice {
            Some(reg) => {
                trace!("{} -> {}", name, reg);
                coloring.assigned.insert(name.clone(), reg);
            }
            None => {
                trace!("{} -> spill", name);
                coloring.spilled.push(name.clone());
            }
        }
    }

    coloring
}
