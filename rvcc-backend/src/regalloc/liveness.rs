//! Liveness analysis and interference
//!
//! Backward dataflow over block successors:
//!
//! ```text
//! live_out[b] = U live_in[s] for s in succs(b)
//! live_in[b]  = use[b] U (live_out[b] - def[b])
//! ```
//!
//! iterated to a fixed point. Only virtual registers take part; machine
//! registers are never allocated.

use crate::function::Function;
use log::trace;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct Liveness {
    pub live_in: Vec<HashSet<String>>,
    pub live_out: Vec<HashSet<String>>,
}

pub fn analyze(func: &Function) -> Liveness {
    let n = func.blocks.len();
    let mut uses: Vec<HashSet<String>> = vec![HashSet::new(); n];
    let mut defs: Vec<HashSet<String>> = vec![HashSet::new(); n];

    for (i, block) in func.blocks.iter().enumerate() {
        for inst in &block.insts {
            for name in inst.uses().into_iter().filter_map(|r| r.as_virtual()) {
                if !defs[i].contains(name) {
                    uses[i].insert(name.to_string());
                }
            }
            if let Some(name) = inst.def().and_then(|r| r.as_virtual()) {
                defs[i].insert(name.to_string());
            }
        }
    }

    let mut live = Liveness {
        live_in: vec![HashSet::new(); n],
        live_out: vec![HashSet::new(); n],
    };

    let mut changed = true;
    let mut rounds = 0;
    while changed {
        changed = false;
        rounds += 1;
        for i in (0..n).rev() {
            let mut out = HashSet::new();
            for &s in &func.blocks[i].succs {
                out.extend(live.live_in[s].iter().cloned());
            }

            let mut inn = uses[i].clone();
            inn.extend(out.difference(&defs[i]).cloned());

            if inn != live.live_in[i] || out != live.live_out[i] {
                live.live_in[i] = inn;
                live.live_out[i] = out;
                changed = true;
            }
        }
    }
    trace!("'{}': liveness converged after {} rounds", func.name, rounds);

    live
}

/// Which virtual registers may not share a machine register
#[derive(Debug, Clone, Default)]
pub struct InterferenceGraph {
    /// Every virtual register, in order of first appearance
    pub nodes: Vec<String>,

    edges: HashMap<String, HashSet<String>>,

    /// Live at some call site
    pub across_call: HashSet<String>,
}

impl InterferenceGraph {
    fn add_edge(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.edges.entry(a.to_string()).or_default().insert(b.to_string());
        self.edges.entry(b.to_string()).or_default().insert(a.to_string());
    }

    pub fn interferes(&self, a: &str, b: &str) -> bool {
        self.edges.get(a).is_some_and(|n| n.contains(b))
    }

    pub fn neighbours<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a String> + 'a {
        self.edges.get(name).into_iter().flat_map(|n| n.iter())
    }
}

/// Walk every block backward from its live-out set. A definition
/// interferes with everything live after it; a call marks everything live
/// after it.
pub fn build_interference(func: &Function, liveness: &Liveness) -> InterferenceGraph {
    let mut graph = InterferenceGraph {
        nodes: super::virtual_regs_in_order(func),
        ..Default::default()
    };

    for (i, block) in func.blocks.iter().enumerate() {
        let mut live = liveness.live_out[i].clone();
        for inst in block.insts.iter().rev() {
            if inst.is_call() {
                graph.across_call.extend(live.iter().cloned());
            }
            if let Some(def) = inst.def().and_then(|r| r.as_virtual()) {
                for other in &live {
                    graph.add_edge(def, other);
                }
                live.remove(def);
            }
            for name in inst.uses().into_iter().filter_map(|r| r.as_virtual()) {
                live.insert(name.to_string());
            }
        }
    }

    graph
}
