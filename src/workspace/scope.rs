//! Resolving pattern variables to the case branches that bind them.
//!
//! A [`NodeKind::Local`] node uses a variable bound by the pattern of an
//! enclosing case branch. Its scope is found by following its output
//! downstream: an output feeds at most one input, so the walk is a single
//! path that ends at the nearest case branch binding the name, or at an
//! output with no consumer.

use std::{collections::HashSet, sync::Arc};

use super::Workspace;
use crate::{
    graph::{NodeId, NodeKind, SocketId, SocketRole},
    ty::{Ty, instantiate},
};

/// A connection from an output to an input that has not been made yet.
pub(super) type Pending = Option<(SocketId, SocketId)>;

impl Workspace {
    /// The type bound to the variable used by the local node `id`, or `None`
    /// if no enclosing case branch binds it. An unset field yields a fresh
    /// variable.
    pub(super) fn binding(&self, id: NodeId, pending: Pending) -> Option<Arc<Ty>> {
        let node = self.graph.node(id).ok()?;
        let NodeKind::Local { name } = node.kind() else {
            return None;
        };

        let mut output = node.output();
        let mut seen = HashSet::new();

        while seen.insert(output) {
            let input = match pending {
                Some((from, to)) if from == output => to,
                _ => self.graph.peer(output)?,
            };

            let socket = self.graph.socket(input).ok()?;
            let consumer = self.graph.node(socket.node).ok()?;

            if let (NodeKind::Case { type_name, binders }, SocketRole::Input(position)) =
                (consumer.kind(), socket.role)
            {
                // input 0 is the scrutinee
                let bound = position.checked_sub(1).and_then(|branch| {
                    let field = binders.get(branch)?.iter().position(|binder| binder == name)?;
                    Some((branch, field))
                });

                if let Some((branch, field)) = bound {
                    let ty = self
                        .registry
                        .user_type(type_name)
                        .and_then(|ty| ty.variants.get(branch))
                        .and_then(|variant| variant.fields.get(field).cloned().flatten());

                    return Some(ty.map_or_else(Ty::var, |ty| instantiate(&ty)));
                }
            }

            output = consumer.output();
        }

        None
    }

    /// Pairs the output of every bound local node among `nodes` with the
    /// type of its binder.
    pub(super) fn scope_constraints<'a>(
        &self,
        nodes: impl IntoIterator<Item = &'a NodeId>,
        pending: Pending,
    ) -> Vec<(SocketId, Arc<Ty>)> {
        nodes
            .into_iter()
            .filter_map(|&id| {
                let node = self.graph.node(id).ok()?;
                let NodeKind::Local { .. } = node.kind() else {
                    return None;
                };

                Some((node.output(), self.binding(id, pending)?))
            })
            .collect()
    }
}
