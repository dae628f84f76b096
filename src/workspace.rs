//! The editor-facing facade over the graph and the registry.
//!
//! A [`Workspace`] is what an editor talks to. It owns the node graph and the
//! type registry, and keeps every socket's type consistent with the
//! connections between them as nodes are created, connected, disconnected,
//! resized and removed.
//!
//! # Socket Types
//! Every node is given a fresh instance of its signature, so two uses of the
//! same function never constrain each other. A socket's stored type is
//! always fully dereferenced: connecting two sockets unifies their types and
//! applies the result to every socket in the affected component before the
//! call returns. Edits that remove constraints instead rebuild the affected
//! components from scratch; see the [`propagate`] module.
//!
//! # Errors
//! A rejected edit returns an [`Error`] and leaves the workspace exactly as
//! it was. Edits that rebuild components cannot be rejected by the type
//! system; they return the type errors they found, and the sockets involved
//! are marked [`SocketState::Invalid`].

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use tracing::{debug, warn};

use crate::{
    error::{Error, Result, TypeError},
    expr::{Built, ExprBuilder},
    graph::{Graph, Node, NodeId, NodeKind, SocketId, SocketRole, SocketState},
    registry::Registry,
    solve::Solver,
    symbol::StringInterner,
    ty::{Ty, instantiate},
};

pub mod cascade;
pub mod propagate;
pub mod scope;


#[derive(Debug, Clone)]
pub struct Workspace {
    graph: Graph,
    registry: Registry,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// Returns an empty workspace whose registry holds the prelude.
    pub fn new() -> Self {
        Self::with_registry(Registry::with_prelude())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            graph: Graph::new(),
            registry,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Removes every node and resets the registry.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.registry.clear();
        debug!("cleared the workspace");
    }

    // NODE LIFECYCLE

    /// Adds a node with a fresh instance of its signature. A node whose
    /// signature cannot be derived is still added, with every socket marked
    /// invalid.
    pub fn add_node(&mut self, kind: NodeKind) -> Result<NodeId> {
        let id = self.graph.insert_node(kind);
        self.install_signature(id)?;

        let node = self.graph.node(id)?;
        let output = node.output();
        match node.untyped() {
            Some(error) => warn!(?id, %error, "added an untyped node"),
            None => debug!(?id, kind = %node.kind().label(), "added a node"),
        }

        self.recompute([output]);
        Ok(id)
    }

    /// Removes a node, rebuilding the components it was connected to.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<TypeError>> {
        let (_, peers) = self.graph.remove_node(id)?;
        debug!(?id, "removed a node");
        Ok(self.recompute(peers))
    }

    // QUERIES

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        Ok(self.graph.node(id)?)
    }

    pub fn inputs(&self, id: NodeId) -> Result<&[SocketId]> {
        Ok(self.graph.node(id)?.inputs())
    }

    pub fn output(&self, id: NodeId) -> Result<SocketId> {
        Ok(self.graph.node(id)?.output())
    }

    pub fn peer(&self, socket: SocketId) -> Option<SocketId> {
        self.graph.peer(socket)
    }

    /// The current, fully dereferenced type of a socket.
    pub fn type_of(&self, socket: SocketId) -> Result<Arc<Ty>> {
        Ok(self.graph.socket(socket)?.ty.clone())
    }

    pub fn socket_state(&self, socket: SocketId) -> Result<&SocketState> {
        Ok(&self.graph.socket(socket)?.state)
    }

    /// Every invalid socket, with the error that invalidated it.
    pub fn invalid_sockets(&self) -> Vec<(SocketId, &TypeError)> {
        self.graph
            .nodes()
            .flat_map(|(_, node)| node.sockets())
            .filter_map(|id| match &self.graph.socket(id).ok()?.state {
                SocketState::Invalid(error) => Some((id, error)),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` if `output` could be connected to `input` right now.
    pub fn is_connectable(&self, output: SocketId, input: SocketId) -> bool {
        self.check_link(output, input, true).is_ok() && self.solve_link(output, input).is_ok()
    }

    /// Checks the whole workspace from scratch without changing it.
    ///
    /// Every signature is re-derived from the registry and freshly
    /// instantiated, and the connections of each component are solved in
    /// dependency order. A cyclic component is reported and skipped.
    pub fn validate_graph(&self) -> Vec<TypeError> {
        let mut errors = Vec::new();
        let mut types = HashMap::new();

        for (id, node) in self.graph.nodes() {
            let (params, mut result) = match node.kind().derive_signature(&self.registry) {
                Ok(Some(signature)) => {
                    if signature.arity() != node.inputs().len() {
                        errors.push(TypeError::InvalidSignature(
                            format!(
                                "{} takes {} arguments but node {id:?} has {} inputs",
                                node.kind().label(),
                                signature.arity(),
                                node.inputs().len()
                            )
                            .into(),
                        ));
                    }

                    instantiate(&signature).uncurry()
                }
                Ok(None) => match node.kind() {
                    NodeKind::Literal { ty, .. } => (Vec::new(), instantiate(ty)),
                    _ => (Vec::new(), Ty::var()),
                },
                Err(error) => {
                    errors.push(error);
                    (Vec::new(), Ty::var())
                }
            };

            if let NodeKind::Local { name } = node.kind() {
                match self.binding(id, None) {
                    Some(bound) => result = bound,
                    None => errors.push(TypeError::unbound(name)),
                }
            }

            for (position, &input) in node.inputs().iter().enumerate() {
                types.insert(input, params.get(position).cloned().unwrap_or_else(Ty::var));
            }

            types.insert(node.output(), result);
        }

        let mut covered = BTreeSet::new();
        let mut solver = Solver::new();

        for id in self.graph.node_ids() {
            if covered.contains(&id) {
                continue;
            }

            let Ok(output) = self.output(id) else {
                continue;
            };

            let component = self.graph.component([output]);
            covered.extend(component.nodes.iter().copied());

            let order = match self.graph.topological_order(&component.nodes) {
                Ok(order) => order,
                Err(cycle) => {
                    errors.push(cycle.into());
                    continue;
                }
            };

            for id in order {
                let Ok(node) = self.graph.node(id) else {
                    continue;
                };

                for &input in node.inputs() {
                    let Some(output) = self.graph.peer(input) else {
                        continue;
                    };

                    if let (Some(lhs), Some(rhs)) = (types.get(&output), types.get(&input)) {
                        if let Err(error) = solver.constrain(lhs, rhs) {
                            errors.push(error);
                        }
                    }
                }
            }
        }

        errors
    }

    // BULK LOADING

    /// Connects two sockets without checking their types or looking for
    /// cycles. Call [`Workspace::resolve_all`] once every connection is in
    /// place.
    pub fn attach(&mut self, output: SocketId, input: SocketId) -> Result {
        self.check_link(output, input, false)?;
        self.graph.wire(output, input);
        Ok(())
    }

    /// Rebuilds every component, returning all the type errors found.
    pub fn resolve_all(&mut self) -> Vec<TypeError> {
        let mut covered = BTreeSet::new();
        let mut errors = Vec::new();

        for id in self.graph.node_ids() {
            if covered.contains(&id) {
                continue;
            }

            let Ok(output) = self.output(id) else {
                continue;
            };

            covered.extend(self.graph.component([output]).nodes);
            errors.extend(self.recompute([output]));
        }

        errors
    }

    // EXPRESSIONS

    /// Builds the expression tree produced at the output socket `root`.
    pub fn build_expression(&self, root: SocketId, interner: &mut StringInterner) -> Built {
        ExprBuilder::new(&self.graph, &self.registry, interner).build(root)
    }

    // UTILITY FUNCTIONS

    /// Checks that `output` may feed `input`, ignoring types.
    fn check_link(&self, output: SocketId, input: SocketId, acyclic: bool) -> Result {
        let producer = self.graph.socket(output)?;
        if producer.role != SocketRole::Output {
            return Err(Error::ExpectedOutput(output));
        }

        let consumer = self.graph.socket(input)?;
        if !matches!(consumer.role, SocketRole::Input(_)) {
            return Err(Error::ExpectedInput(input));
        }

        if self.graph.peer(input).is_some() {
            return Err(Error::Occupied(input));
        }

        if self.graph.peer(output).is_some() {
            return Err(Error::Occupied(output));
        }

        if acyclic && self.graph.would_cycle(producer.node, consumer.node) {
            return Err(crate::error::Dangling::Cycle(producer.node).into());
        }

        Ok(())
    }
}
