//! Worker placement: how many nodes, how many workers per node.

use granite_result::{Error, Result};

#[derive(Debug, Clone)]
pub struct Topology {
    /// Worker count per node; index is the node id.
    nodes: Vec<usize>,
}

impl Topology {
    pub fn new(node_count: usize, workers_per_node: usize) -> Result<Topology> {
        if node_count == 0 || workers_per_node == 0 {
            return Err(Error::contract_violation(
                "Topology::new",
                "need at least one node and one worker per node",
            ));
        }
        Ok(Topology {
            nodes: vec![workers_per_node; node_count],
        })
    }

    pub fn single_node(worker_count: usize) -> Result<Topology> {
        Topology::new(1, worker_count)
    }

    /// One node, one worker per available hardware thread.
    pub fn default_for_host() -> Topology {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Topology {
            nodes: vec![workers],
        }
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn total_workers(&self) -> usize {
        self.nodes.iter().sum()
    }
}
