//! Node and socket storage.
//!
//! The [`Graph`] owns every node and socket of a workspace, together with the
//! connections between sockets. Connections are directed edges from an
//! output socket to the input socket it feeds; a socket has at most one peer.
//!
//! Nothing in this module knows how types are assigned. It only answers
//! topological questions: which sockets are connected, which sockets share a
//! connected component, and whether a new connection would close a cycle.

use std::{
    collections::{BTreeSet, HashSet, VecDeque},
    sync::Arc,
};

use petgraph::{
    algo::{has_path_connecting, toposort},
    graphmap::DiGraphMap,
    stable_graph::{NodeIndex, StableDiGraph},
};

use crate::{
    error::{Dangling, TypeError},
    ty::Ty,
};

pub mod kind;

pub use kind::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(NodeIndex);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketRole {
    /// The input at the given position, counting from zero.
    Input(usize),
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketState {
    /// Not connected to anything.
    Unbound,
    /// Connected, with a type consistent with its peer.
    Bound,
    /// The socket's type could not be made consistent.
    Invalid(TypeError),
}

impl SocketState {
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, SocketState::Invalid(_))
    }
}

#[derive(Debug, Clone)]
pub struct Socket {
    pub node: NodeId,
    pub role: SocketRole,
    /// The current, fully dereferenced type of this socket.
    pub ty: Arc<Ty>,
    pub state: SocketState,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    /// The generalized signature this node was last derived with.
    pub(crate) signature: Option<Arc<Ty>>,
    /// Why a signature could not be derived, if it could not.
    pub(crate) untyped: Option<TypeError>,
    pub(crate) inputs: Vec<SocketId>,
    pub(crate) output: SocketId,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn signature(&self) -> Option<&Arc<Ty>> {
        self.signature.as_ref()
    }

    pub fn untyped(&self) -> Option<&TypeError> {
        self.untyped.as_ref()
    }

    pub fn inputs(&self) -> &[SocketId] {
        &self.inputs
    }

    pub fn output(&self) -> SocketId {
        self.output
    }

    pub fn sockets(&self) -> impl Iterator<Item = SocketId> + '_ {
        self.inputs.iter().copied().chain(std::iter::once(self.output))
    }
}

/// The sockets and nodes reachable from some seed sockets, through
/// connections and through sibling sockets on the same node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    pub nodes: BTreeSet<NodeId>,
    pub sockets: BTreeSet<SocketId>,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
    sockets: StableDiGraph<Socket, ()>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.sockets.clear();
    }

    /// Inserts a node with an output socket and no inputs.
    pub fn insert_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let output = self.insert_socket(id, SocketRole::Output);

        self.nodes.push(Some(Node {
            kind,
            signature: None,
            untyped: None,
            inputs: Vec::new(),
            output,
        }));

        id
    }

    /// Removes a node and its sockets, returning the node and the sockets
    /// that were connected to it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(Node, Vec<SocketId>), Dangling> {
        let node = self
            .nodes
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(Dangling::Node(id))?;

        let mut peers = Vec::new();
        for socket in node.sockets() {
            peers.extend(self.peer(socket));
            self.sockets.remove_node(socket.0);
        }

        Ok((node, peers))
    }

    pub fn add_input(&mut self, id: NodeId) -> Result<SocketId, Dangling> {
        let position = self.node(id)?.inputs.len();
        let socket = self.insert_socket(id, SocketRole::Input(position));
        self.node_mut(id)?.inputs.push(socket);
        Ok(socket)
    }

    /// Removes the last input of a node, returning the removed socket and the
    /// output it was connected to.
    pub fn pop_input(
        &mut self,
        id: NodeId,
    ) -> Result<Option<(SocketId, Option<SocketId>)>, Dangling> {
        let Some(socket) = self.node_mut(id)?.inputs.pop() else {
            return Ok(None);
        };

        let peer = self.peer(socket);
        self.sockets.remove_node(socket.0);
        Ok(Some((socket, peer)))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, Dangling> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(Dangling::Node(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, Dangling> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(Dangling::Node(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| Some((NodeId(index as u32), node.as_ref()?)))
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(|(id, _)| id).collect()
    }

    pub fn socket(&self, id: SocketId) -> Result<&Socket, Dangling> {
        self.sockets.node_weight(id.0).ok_or(Dangling::Socket(id))
    }

    pub fn socket_mut(&mut self, id: SocketId) -> Result<&mut Socket, Dangling> {
        self.sockets.node_weight_mut(id.0).ok_or(Dangling::Socket(id))
    }

    /// The socket connected to `id`, if any.
    pub fn peer(&self, id: SocketId) -> Option<SocketId> {
        self.sockets.neighbors_undirected(id.0).next().map(SocketId)
    }

    pub fn wire(&mut self, output: SocketId, input: SocketId) {
        self.sockets.add_edge(output.0, input.0, ());
    }

    /// Removes the connection from `output` to `input`, returning `false` if
    /// there was none.
    pub fn unwire(&mut self, output: SocketId, input: SocketId) -> bool {
        match self.sockets.find_edge(output.0, input.0) {
            Some(edge) => self.sockets.remove_edge(edge).is_some(),
            None => false,
        }
    }

    /// Every connection, as `(output, input)` pairs.
    pub fn wires(&self) -> Vec<(SocketId, SocketId)> {
        self.sockets
            .edge_indices()
            .filter_map(|edge| self.sockets.edge_endpoints(edge))
            .map(|(output, input)| (SocketId(output), SocketId(input)))
            .collect()
    }

    /// Collects everything reachable from `seeds` by a breadth-first walk
    /// over connections and sibling sockets. Unknown seeds are ignored.
    pub fn component(&self, seeds: impl IntoIterator<Item = SocketId>) -> Component {
        let mut component = Component::default();
        let mut queue: VecDeque<SocketId> = seeds.into_iter().collect();

        while let Some(id) = queue.pop_front() {
            let Ok(socket) = self.socket(id) else {
                continue;
            };

            if !component.sockets.insert(id) {
                continue;
            }

            if component.nodes.insert(socket.node) {
                if let Ok(node) = self.node(socket.node) {
                    queue.extend(node.sockets());
                }
            }

            queue.extend(self.sockets.neighbors_undirected(id.0).map(SocketId));
        }

        component
    }

    /// Returns `true` if feeding an output of `producer` into an input of
    /// `consumer` would make some node depend on itself.
    pub fn would_cycle(&self, producer: NodeId, consumer: NodeId) -> bool {
        producer == consumer || has_path_connecting(&self.dependencies(None), consumer, producer, None)
    }

    /// Orders `nodes` so that every producer precedes its consumers.
    pub fn topological_order(&self, nodes: &BTreeSet<NodeId>) -> Result<Vec<NodeId>, Dangling> {
        toposort(&self.dependencies(Some(nodes)), None)
            .map_err(|cycle| Dangling::Cycle(cycle.node_id()))
    }

    /// The producer-to-consumer graph over nodes, optionally restricted to a
    /// subset of them.
    fn dependencies(&self, within: Option<&BTreeSet<NodeId>>) -> DiGraphMap<NodeId, ()> {
        let included = |id: &NodeId| within.is_none_or(|set| set.contains(id));
        let mut deps = DiGraphMap::new();

        for (id, _) in self.nodes() {
            if included(&id) {
                deps.add_node(id);
            }
        }

        for (output, input) in self.wires() {
            let (Ok(output), Ok(input)) = (self.socket(output), self.socket(input)) else {
                continue;
            };

            if included(&output.node) && included(&input.node) {
                deps.add_edge(output.node, input.node, ());
            }
        }

        deps
    }

    fn insert_socket(&mut self, node: NodeId, role: SocketRole) -> SocketId {
        SocketId(self.sockets.add_node(Socket {
            node,
            role,
            ty: Ty::var(),
            state: SocketState::Unbound,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str) -> NodeKind {
        NodeKind::Function { name: name.into() }
    }

    /// Builds `a -> b -> c`, wiring each output into the next node's input.
    fn chain(graph: &mut Graph) -> [NodeId; 3] {
        let a = graph.insert_node(function("a"));
        let b = graph.insert_node(function("b"));
        let c = graph.insert_node(function("c"));

        let b_in = graph.add_input(b).unwrap();
        let c_in = graph.add_input(c).unwrap();
        graph.wire(graph.node(a).unwrap().output(), b_in);
        graph.wire(graph.node(b).unwrap().output(), c_in);

        [a, b, c]
    }

    #[test]
    fn peers_and_wires() {
        let mut graph = Graph::new();
        let [a, b, _] = chain(&mut graph);

        let a_out = graph.node(a).unwrap().output();
        let b_in = graph.node(b).unwrap().inputs()[0];

        assert_eq!(graph.peer(a_out), Some(b_in));
        assert_eq!(graph.peer(b_in), Some(a_out));
        assert_eq!(graph.wires().len(), 2);

        assert!(graph.unwire(a_out, b_in));
        assert!(!graph.unwire(a_out, b_in));
        assert_eq!(graph.peer(b_in), None);
    }

    #[test]
    fn components_follow_wires_and_siblings() {
        let mut graph = Graph::new();
        let [a, b, c] = chain(&mut graph);
        let lonely = graph.insert_node(function("d"));

        let a_out = graph.node(a).unwrap().output();
        let component = graph.component([a_out]);

        assert_eq!(component.nodes, BTreeSet::from([a, b, c]));
        assert_eq!(component.sockets.len(), 5);
        assert!(!component.nodes.contains(&lonely));
    }

    #[test]
    fn cycles_are_detected() {
        let mut graph = Graph::new();
        let [a, b, c] = chain(&mut graph);

        assert!(graph.would_cycle(c, a));
        assert!(graph.would_cycle(b, b));
        assert!(!graph.would_cycle(a, c));

        let order = graph.topological_order(&BTreeSet::from([a, b, c])).unwrap();
        assert_eq!(order, vec![a, b, c]);

        // a malformed workspace can still contain a cycle
        let a_in = graph.add_input(a).unwrap();
        graph.wire(graph.node(c).unwrap().output(), a_in);
        assert!(matches!(
            graph.topological_order(&BTreeSet::from([a, b, c])),
            Err(Dangling::Cycle(_))
        ));
    }

    #[test]
    fn removal_reports_peers() {
        let mut graph = Graph::new();
        let [a, b, c] = chain(&mut graph);

        let a_out = graph.node(a).unwrap().output();
        let c_in = graph.node(c).unwrap().inputs()[0];

        let (node, peers) = graph.remove_node(b).unwrap();
        assert_eq!(node.inputs().len(), 1);
        assert_eq!(BTreeSet::from_iter(peers), BTreeSet::from([a_out, c_in]));

        assert_eq!(graph.peer(a_out), None);
        assert!(graph.node(b).is_err());
        assert!(graph.socket(node.output()).is_err());
        assert!(matches!(graph.remove_node(b), Err(Dangling::Node(_))));
    }

    #[test]
    fn popping_inputs() {
        let mut graph = Graph::new();
        let [a, b, _] = chain(&mut graph);

        let a_out = graph.node(a).unwrap().output();
        let (removed, peer) = graph.pop_input(b).unwrap().unwrap();

        assert_eq!(peer, Some(a_out));
        assert!(graph.socket(removed).is_err());
        assert_eq!(graph.pop_input(b).unwrap(), None);
    }
}
