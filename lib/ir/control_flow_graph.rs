use crate::error::*;
use crate::ir::*;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::DfsPostOrder;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::convert::TryFrom;
use std::fmt;

/// A graph of blocks of quads with a single entry block.
///
/// Analyses see the graph at quad granularity through
/// [`ControlFlowGraph::locations`]: the first quad of the entry block has
/// [`Neighbor::Entry`] as a predecessor, the last quad of a block without
/// successors has [`Neighbor::Exit`] as a successor, and empty blocks are
/// looked through.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(try_from = "SerializedGraph", into = "SerializedGraph")]
pub struct ControlFlowGraph {
    graph: DiGraphMap<usize, ()>,
    blocks: BTreeMap<usize, Block>,
    quads: BTreeMap<QuadId, usize>,
    entry: Option<usize>,
}

impl ControlFlowGraph {
    pub fn new() -> ControlFlowGraph {
        ControlFlowGraph {
            graph: DiGraphMap::new(),
            blocks: BTreeMap::new(),
            quads: BTreeMap::new(),
            entry: None,
        }
    }

    /// A graph of one entry block, 0, holding the given quads in order.
    pub fn from_quads(quads: Vec<Quad>) -> Result<ControlFlowGraph> {
        let mut control_flow_graph = ControlFlowGraph::new();
        control_flow_graph.insert_block(Block::with_quads(0, quads))?;
        control_flow_graph.set_entry(0)?;
        Ok(control_flow_graph)
    }

    pub fn insert_block(&mut self, block: Block) -> Result<()> {
        if self.blocks.contains_key(&block.index()) {
            bail!(ErrorKind::Graph(format!(
                "duplicate block 0x{:x}",
                block.index()
            )));
        }
        let mut ids = HashSet::new();
        for quad in block.quads() {
            if self.quads.contains_key(&quad.id()) || !ids.insert(quad.id()) {
                bail!(ErrorKind::Graph(format!("duplicate quad {}", quad.id())));
            }
        }
        for quad in block.quads() {
            self.quads.insert(quad.id(), block.index());
        }
        self.graph.add_node(block.index());
        self.blocks.insert(block.index(), block);
        Ok(())
    }

    pub fn insert_edge(&mut self, head: usize, tail: usize) -> Result<()> {
        self.block(head)?;
        self.block(tail)?;
        self.graph.add_edge(head, tail, ());
        Ok(())
    }

    pub fn set_entry(&mut self, index: usize) -> Result<()> {
        self.block(index)?;
        self.entry = Some(index);
        Ok(())
    }

    pub fn entry(&self) -> Option<usize> {
        self.entry
    }

    pub fn block(&self, index: usize) -> Result<&Block> {
        self.blocks
            .get(&index)
            .ok_or_else(|| ErrorKind::UnknownBlock(index).into())
    }
    pub fn blocks(&self) -> Vec<&Block> {
        self.blocks.values().collect()
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.graph
            .all_edges()
            .map(|(head, tail, _)| Edge::new(head, tail))
            .collect()
    }

    pub fn quad(&self, id: QuadId) -> Result<&Quad> {
        let index = self.quads.get(&id).ok_or(ErrorKind::UnknownQuad(id))?;
        self.block(*index)?
            .quad(id)
            .ok_or_else(|| ErrorKind::UnknownQuad(id).into())
    }

    /// Every quad, in block index order.
    pub fn quads(&self) -> impl Iterator<Item = &Quad> {
        self.blocks
            .values()
            .flat_map(|block| block.quads().iter())
    }

    pub fn max_quad_id(&self) -> Option<QuadId> {
        self.quads.keys().next_back().cloned()
    }

    /// Removes a quad from its block. The block stays in the graph even if
    /// it becomes empty.
    pub fn remove_quad(&mut self, id: QuadId) -> Result<Quad> {
        let index = self.quads.remove(&id).ok_or(ErrorKind::UnknownQuad(id))?;
        self.blocks
            .get_mut(&index)
            .and_then(|block| block.remove_quad(id))
            .ok_or_else(|| ErrorKind::UnknownQuad(id).into())
    }

    /// Block indices in reverse post order from the entry, followed by
    /// unreachable blocks in index order.
    pub fn block_order(&self) -> Vec<usize> {
        let mut order = Vec::new();
        if let Some(entry) = self.entry {
            let mut dfs = DfsPostOrder::new(&self.graph, entry);
            while let Some(index) = dfs.next(&self.graph) {
                order.push(index);
            }
            order.reverse();
        }
        let reached: HashSet<usize> = order.iter().cloned().collect();
        order.extend(
            self.blocks
                .keys()
                .filter(|index| !reached.contains(index))
                .cloned(),
        );
        order
    }

    pub fn predecessors(&self, id: QuadId) -> Result<Vec<Neighbor>> {
        let (index, position) = self.position(id)?;
        if position > 0 {
            let previous = self.block(index)?.quads()[position - 1].id();
            return Ok(vec![Neighbor::Quad(previous)]);
        }
        Ok(self.entry_neighbors(index))
    }

    pub fn successors(&self, id: QuadId) -> Result<Vec<Neighbor>> {
        let (index, position) = self.position(id)?;
        let quads = self.block(index)?.quads();
        if position + 1 < quads.len() {
            return Ok(vec![Neighbor::Quad(quads[position + 1].id())]);
        }
        Ok(self.exit_neighbors(index))
    }

    /// Every quad with its neighbors, in forward traversal order.
    pub fn locations(&self) -> Result<Vec<QuadLocation>> {
        if self.blocks.is_empty() {
            return Ok(Vec::new());
        }
        if self.entry.is_none() {
            bail!(ErrorKind::Graph("no entry block".to_string()));
        }

        let mut locations = Vec::with_capacity(self.quads.len());
        for index in self.block_order() {
            let quads = self.block(index)?.quads();
            for (position, quad) in quads.iter().enumerate() {
                let predecessors = if position == 0 {
                    self.entry_neighbors(index)
                } else {
                    vec![Neighbor::Quad(quads[position - 1].id())]
                };
                let successors = if position + 1 == quads.len() {
                    self.exit_neighbors(index)
                } else {
                    vec![Neighbor::Quad(quads[position + 1].id())]
                };
                locations.push(QuadLocation::new(quad, predecessors, successors));
            }
        }
        Ok(locations)
    }

    fn position(&self, id: QuadId) -> Result<(usize, usize)> {
        let index = *self.quads.get(&id).ok_or(ErrorKind::UnknownQuad(id))?;
        let position = self
            .block(index)?
            .quads()
            .iter()
            .position(|quad| quad.id() == id)
            .ok_or(ErrorKind::UnknownQuad(id))?;
        Ok((index, position))
    }

    fn entry_neighbors(&self, index: usize) -> Vec<Neighbor> {
        let mut neighbors = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(index);
        self.block_predecessors(index, &mut visited, &mut neighbors);
        neighbors
    }

    fn exit_neighbors(&self, index: usize) -> Vec<Neighbor> {
        let mut neighbors = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(index);
        self.block_successors(index, &mut visited, &mut neighbors);
        neighbors
    }

    fn block_predecessors(
        &self,
        index: usize,
        visited: &mut HashSet<usize>,
        neighbors: &mut Vec<Neighbor>,
    ) {
        if self.entry == Some(index) {
            push_unique(neighbors, Neighbor::Entry);
        }
        for predecessor in self.graph.neighbors_directed(index, Direction::Incoming) {
            match self.blocks.get(&predecessor).and_then(|block| block.last()) {
                Some(quad) => push_unique(neighbors, Neighbor::Quad(quad.id())),
                None => {
                    if visited.insert(predecessor) {
                        self.block_predecessors(predecessor, visited, neighbors);
                    }
                }
            }
        }
    }

    fn block_successors(
        &self,
        index: usize,
        visited: &mut HashSet<usize>,
        neighbors: &mut Vec<Neighbor>,
    ) {
        let successors: Vec<usize> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .collect();
        if successors.is_empty() {
            push_unique(neighbors, Neighbor::Exit);
        }
        for successor in successors {
            match self.blocks.get(&successor).and_then(|block| block.first()) {
                Some(quad) => push_unique(neighbors, Neighbor::Quad(quad.id())),
                None => {
                    if visited.insert(successor) {
                        self.block_successors(successor, visited, neighbors);
                    }
                }
            }
        }
    }
}

fn push_unique(neighbors: &mut Vec<Neighbor>, neighbor: Neighbor) {
    if !neighbors.contains(&neighbor) {
        neighbors.push(neighbor);
    }
}

impl Default for ControlFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for block in self.blocks() {
            write!(f, "{}", block)?;
        }
        for edge in self.edges() {
            writeln!(f, "{}", edge)?;
        }
        Ok(())
    }
}

/// The on-disk form of a control flow graph.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SerializedGraph {
    entry: Option<usize>,
    blocks: Vec<Block>,
    edges: Vec<Edge>,
}

impl TryFrom<SerializedGraph> for ControlFlowGraph {
    type Error = Error;

    fn try_from(serialized: SerializedGraph) -> Result<ControlFlowGraph> {
        let mut control_flow_graph = ControlFlowGraph::new();
        for block in serialized.blocks {
            control_flow_graph.insert_block(block)?;
        }
        for edge in serialized.edges {
            control_flow_graph.insert_edge(edge.head(), edge.tail())?;
        }
        if let Some(entry) = serialized.entry {
            control_flow_graph.set_entry(entry)?;
        }
        Ok(control_flow_graph)
    }
}

impl From<ControlFlowGraph> for SerializedGraph {
    fn from(control_flow_graph: ControlFlowGraph) -> SerializedGraph {
        SerializedGraph {
            entry: control_flow_graph.entry,
            edges: control_flow_graph.edges(),
            blocks: control_flow_graph.blocks.into_iter().map(|(_, block)| block).collect(),
        }
    }
}
