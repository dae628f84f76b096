//! Keeping socket types consistent with connections.
//!
//! Adding a connection only ever adds a constraint, so [`Workspace::connect`]
//! unifies the two socket types and pushes the resulting substitution across
//! the component. Removing a constraint cannot be undone by substitution;
//! instead the affected components are rebuilt: every node gets a fresh
//! instance of its signature and every remaining connection is solved again
//! in dependency order.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use super::Workspace;
use crate::{
    doc::VarNames,
    error::{Dangling, Error, Result, TypeError},
    graph::{Component, NodeId, NodeKind, SocketId, SocketState},
    solve::Solver,
    ty::{Substitution, Ty, instantiate, unify},
};

impl Workspace {
    /// Connects `output` to `input`.
    ///
    /// The socket types are unified and the result is applied to every
    /// socket in the combined component. If the types do not unify, the
    /// connection is refused and nothing changes.
    pub fn connect(&mut self, output: SocketId, input: SocketId) -> Result {
        self.check_link(output, input, true)?;

        let (substitution, component) = self.solve_link(output, input).inspect_err(|error| {
            debug!(?output, ?input, %error, "refused a connection");
        })?;

        for &id in &component.sockets {
            let socket = self.graph.socket_mut(id)?;
            socket.ty = substitution.apply(&socket.ty);
        }

        self.graph.wire(output, input);
        for id in [output, input] {
            let state = self.settled_state(id);
            self.graph.socket_mut(id)?.state = state;
        }

        debug!(?output, ?input, "connected");
        trace!(bindings = substitution.len(), sockets = component.sockets.len());
        Ok(())
    }

    /// Unifies the types at both ends of a prospective connection, along with
    /// the variables it would bring into the scope of a case branch.
    pub(super) fn solve_link(&self, output: SocketId, input: SocketId) -> Result<(Substitution, Component)> {
        let produced = self.type_of(output)?;
        let expected = self.type_of(input)?;
        let mut substitution = unify(&produced, &expected)?;

        let component = self.graph.component([output, input]);
        for (local, bound) in self.scope_constraints(&component.nodes, Some((output, input))) {
            substitution.unify_in_place(&self.type_of(local)?, &bound)?;
        }

        Ok((substitution, component))
    }

    /// Removes the connection from `output` to `input` and rebuilds both
    /// sides. Returns the type errors found while rebuilding.
    pub fn disconnect(&mut self, output: SocketId, input: SocketId) -> Result<Vec<TypeError>> {
        if !self.graph.unwire(output, input) {
            return Err(Error::NotConnected(output, input));
        }

        debug!(?output, ?input, "disconnected");
        Ok(self.recompute([output, input]))
    }

    /// Sets the number of items of a list node. Inputs beyond the new count
    /// are removed along with their connections.
    pub fn set_arity(&mut self, id: NodeId, items: usize) -> Result<Vec<TypeError>> {
        match &mut self.graph.node_mut(id)?.kind {
            NodeKind::List { items: current } => *current = items,
            _ => return Err(Error::FixedArity(id)),
        }

        let displaced = self.install_signature(id)?;
        let output = self.output(id)?;

        debug!(?id, items, displaced = displaced.len(), "resized a list");
        Ok(self.recompute(displaced.into_iter().chain([output])))
    }

    /// Derives the signature of a node from the registry and resizes its
    /// inputs to match. Returns the outputs that fed removed inputs.
    ///
    /// A node whose signature cannot be derived keeps its inputs and is
    /// marked untyped. Socket types are left alone; callers recompute the
    /// affected components afterwards.
    pub(super) fn install_signature(&mut self, id: NodeId) -> std::result::Result<Vec<SocketId>, Dangling> {
        let node = self.graph.node_mut(id)?;

        let arity = match node.kind.derive_signature(&self.registry) {
            Ok(Some(signature)) => {
                let arity = signature.arity();
                node.signature = Some(signature);
                node.untyped = None;
                arity
            }
            Ok(None) => {
                node.signature = None;
                node.untyped = None;
                0
            }
            Err(error) => {
                warn!(?id, %error, "could not derive a signature");
                node.signature = None;
                node.untyped = Some(error);
                node.inputs.len()
            }
        };

        let mut displaced = Vec::new();
        while self.graph.node(id)?.inputs().len() > arity {
            if let Some((_, peer)) = self.graph.pop_input(id)? {
                displaced.extend(peer);
            }
        }

        while self.graph.node(id)?.inputs().len() < arity {
            self.graph.add_input(id)?;
        }

        self.sync_binders(id)?;
        Ok(displaced)
    }

    /// Gives each socket of a node a fresh instance of the node's signature.
    fn fresh_instance(&mut self, id: NodeId) -> std::result::Result<(), Dangling> {
        let node = self.graph.node(id)?;

        let (params, result) = match (node.signature(), node.kind()) {
            (_, NodeKind::Local { .. }) => (Vec::new(), self.binding(id, None).unwrap_or_else(Ty::var)),
            (Some(signature), _) => instantiate(signature).uncurry(),
            (None, NodeKind::Literal { ty, .. }) if node.untyped().is_none() => {
                (Vec::new(), instantiate(ty))
            }
            _ => (Vec::new(), Ty::var()),
        };

        let inputs = node.inputs().to_vec();
        let output = node.output();

        for (position, input) in inputs.into_iter().enumerate() {
            self.graph.socket_mut(input)?.ty = params.get(position).cloned().unwrap_or_else(Ty::var);
        }

        self.graph.socket_mut(output)?.ty = result;
        Ok(())
    }

    /// Rebuilds the components containing `seeds` from scratch, returning
    /// the type errors found.
    pub(super) fn recompute(&mut self, seeds: impl IntoIterator<Item = SocketId>) -> Vec<TypeError> {
        let component = self.graph.component(seeds);
        let mut errors = Vec::new();

        if component.nodes.is_empty() {
            return errors;
        }

        trace!(nodes = component.nodes.len(), "recomputing a component");

        for &id in &component.nodes {
            if let Err(dangling) = self.fresh_instance(id) {
                errors.push(dangling.into());
            }

            if let Some(untyped) = self.graph.node(id).ok().and_then(|node| node.untyped()) {
                errors.push(untyped.clone());
            }
        }

        let order = match self.graph.topological_order(&component.nodes) {
            Ok(order) => order,
            Err(cycle) => {
                let error = TypeError::from(cycle);
                warn!(%error, "the component is cyclic");

                for &id in &component.sockets {
                    if let Ok(socket) = self.graph.socket_mut(id) {
                        socket.state = SocketState::Invalid(error.clone());
                    }
                }

                errors.push(error);
                return errors;
            }
        };

        let mut solver = Solver::new();
        let mut failures: HashMap<SocketId, TypeError> = HashMap::new();

        for id in order {
            let Ok(node) = self.graph.node(id) else {
                continue;
            };

            for &input in node.inputs() {
                let Some(output) = self.graph.peer(input) else {
                    continue;
                };

                let (Ok(produced), Ok(expected)) = (self.graph.socket(output), self.graph.socket(input))
                else {
                    continue;
                };

                if let Err(error) = solver.constrain(&produced.ty, &expected.ty) {
                    warn!(?output, ?input, %error, "a connection no longer type checks");
                    failures.insert(output, error.clone());
                    failures.insert(input, error.clone());
                    errors.push(error);
                }
            }
        }

        for &id in &component.sockets {
            let state = match failures.remove(&id) {
                Some(error) => SocketState::Invalid(error),
                None => self.settled_state(id),
            };

            if let Ok(socket) = self.graph.socket_mut(id) {
                socket.ty = solver.zonk(&socket.ty);
                socket.state = state;
            }
        }

        errors
    }

    /// The state of a socket whose type is known to be consistent.
    pub(super) fn settled_state(&self, id: SocketId) -> SocketState {
        let untyped = self
            .graph
            .socket(id)
            .ok()
            .and_then(|socket| self.graph.node(socket.node).ok())
            .and_then(|node| node.untyped());

        match (untyped, self.graph.peer(id)) {
            (Some(error), _) => SocketState::Invalid(error.clone()),
            (None, Some(_)) => SocketState::Bound,
            (None, None) => SocketState::Unbound,
        }
    }

    /// Gives a case node one binder list per variant and one binder per
    /// field, keeping the names that already exist. New binders take the
    /// first name not already bound in their branch.
    fn sync_binders(&mut self, id: NodeId) -> std::result::Result<(), Dangling> {
        let registry = &self.registry;
        let node = self.graph.node_mut(id)?;

        let NodeKind::Case { type_name, binders } = &mut node.kind else {
            return Ok(());
        };

        let Some(ty) = registry.user_type(type_name) else {
            return Ok(());
        };

        binders.resize_with(ty.variants.len(), Vec::new);
        for (names, variant) in binders.iter_mut().zip(&ty.variants) {
            names.truncate(variant.fields.len());

            while names.len() < variant.fields.len() {
                let Some(name) = (0..).map(VarNames::nth_name).find(|name| !names.contains(name)) else {
                    break;
                };

                names.push(name);
            }
        }

        Ok(())
    }
}
