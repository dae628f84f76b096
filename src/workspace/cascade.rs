//! Registry edits and their effect on existing nodes.
//!
//! Renames rewrite names in place and leave every connection and every
//! socket type as it was, apart from the renamed literal. Structural edits,
//! such as changing the variants or fields of a type, re-derive the
//! signatures of the dependent nodes and rebuild their components.

use std::{collections::BTreeSet, sync::Arc};

use tracing::{debug, info};

use super::Workspace;
use crate::{
    error::{Error, Result, TypeError},
    graph::{NodeId, NodeKind},
    registry::Variant,
    ty::Ty,
};

impl Workspace {
    /// Defines a user type and retries every untyped node, since some of
    /// them may have been waiting for it. Returns the final type name.
    pub fn define_user_type(&mut self, candidate: &str, variants: Vec<Variant>) -> Result<Box<str>> {
        let name = self.registry.define_type(candidate, variants)?;
        self.retry_untyped();
        Ok(name)
    }

    /// Adds a function to the signature table, or replaces its signature.
    /// Nodes applying the function are rebuilt against the new signature,
    /// and untyped nodes are retried.
    pub fn define_function(&mut self, name: &str, signature: Arc<Ty>) -> Result<Vec<TypeError>> {
        self.registry.define_function(name, signature)?;

        let affected: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|(_, node)| {
                node.untyped().is_some()
                    || matches!(node.kind(), NodeKind::Function { name: applied } if applied.as_ref() == name)
            })
            .map(|(id, _)| id)
            .collect();

        Ok(self.rebuild(affected))
    }

    /// Renames a user type everywhere it appears. Returns the final name.
    pub fn rename_user_type(&mut self, old: &str, candidate: &str) -> Result<Box<str>> {
        let new = self.registry.rename_type(old, candidate)?;
        if new.as_ref() == old {
            return Ok(new);
        }

        let mut sockets = Vec::new();
        for id in self.graph.node_ids() {
            let node = self.graph.node_mut(id)?;

            match &mut node.kind {
                NodeKind::Case { type_name, .. } if type_name.as_ref() == old => *type_name = new.clone(),
                NodeKind::Literal { ty, .. } => *ty = ty.rename_literal(old, &new),
                _ => (),
            }

            node.signature = node.signature.as_ref().map(|sig| sig.rename_literal(old, &new));
            sockets.extend(node.sockets());
        }

        for id in sockets {
            let socket = self.graph.socket_mut(id)?;
            socket.ty = socket.ty.rename_literal(old, &new);
        }

        info!(old, %new, "renamed a user type");
        self.retry_untyped();
        Ok(new)
    }

    /// Renames a constructor and every node that applies it. Returns the
    /// final name.
    pub fn rename_constructor(&mut self, old: &str, candidate: &str) -> Result<Box<str>> {
        let new = self.registry.rename_constructor(old, candidate)?;

        for id in self.graph.node_ids() {
            if let NodeKind::Constructor { name } = &mut self.graph.node_mut(id)?.kind {
                if name.as_ref() == old {
                    *name = new.clone();
                }
            }
        }

        info!(old, %new, "renamed a constructor");
        Ok(new)
    }

    /// Deletes a user type. Nodes that depended on it are kept but become
    /// untyped; their ids are returned.
    pub fn delete_user_type(&mut self, name: &str) -> Result<Vec<NodeId>> {
        // types with a field of the deleted type lose that field's type
        let referrers: Vec<Box<str>> = self
            .registry
            .user_types()
            .iter()
            .filter(|ty| ty.name.as_ref() != name)
            .filter(|ty| {
                ty.variants
                    .iter()
                    .flat_map(|variant| variant.fields.iter().flatten())
                    .any(|field| field.mentions(name))
            })
            .map(|ty| ty.name.clone())
            .collect();

        let dependents = self.dependents_of(name);
        let mut affected: BTreeSet<NodeId> = dependents.iter().copied().collect();
        for referrer in &referrers {
            affected.extend(self.dependents_of(referrer));
        }

        self.registry.delete_type(name)?;
        self.rebuild(affected);

        let invalidated: Vec<NodeId> = dependents
            .into_iter()
            .filter(|&id| self.graph.node(id).is_ok_and(|node| node.untyped().is_some()))
            .collect();

        info!(name, invalidated = invalidated.len(), "deleted a user type");
        Ok(invalidated)
    }

    /// Sets the number of variants of a user type. Constructor nodes of
    /// removed variants become untyped.
    pub fn set_variant_count(&mut self, type_name: &str, count: usize) -> Result<Vec<TypeError>> {
        let dependents = self.dependents_of(type_name);
        let removed = self.registry.set_variant_count(type_name, count)?;

        debug!(type_name, count, removed = removed.len(), "changed the variants of a type");
        Ok(self.rebuild(dependents))
    }

    pub fn set_field_count(&mut self, type_name: &str, variant: usize, count: usize) -> Result<Vec<TypeError>> {
        let dependents = self.dependents_of(type_name);
        self.registry.set_field_count(type_name, variant, count)?;
        Ok(self.rebuild(dependents))
    }

    /// Sets the type of a field, or unsets it with `None`.
    pub fn set_field_type(
        &mut self,
        type_name: &str,
        variant: usize,
        field: usize,
        ty: Option<Arc<Ty>>,
    ) -> Result<Vec<TypeError>> {
        if let Some(unknown) = ty
            .iter()
            .flat_map(|ty| ty.literal_names())
            .find(|name| !self.registry.is_known_type(name))
        {
            return Err(Error::UnknownType(unknown.into()));
        }

        let dependents = self.dependents_of(type_name);
        self.registry.set_field_type(type_name, variant, field, ty)?;
        Ok(self.rebuild(dependents))
    }

    /// Renames the variable bound by a field pattern of a case node, then
    /// rebuilds the node's component since local nodes may now resolve to
    /// a different field.
    pub fn rename_binder(
        &mut self,
        id: NodeId,
        branch: usize,
        field: usize,
        candidate: &str,
    ) -> Result<Box<str>> {
        let node = self.graph.node_mut(id)?;
        let output = node.output();
        let NodeKind::Case { type_name, binders } = &mut node.kind else {
            return Err(Error::WrongKind(id));
        };

        let names = binders.get_mut(branch).ok_or_else(|| Error::UnknownVariant {
            type_name: type_name.clone(),
            index: branch,
        })?;

        if field >= names.len() {
            return Err(Error::UnknownField {
                type_name: type_name.clone(),
                variant: branch,
                field,
            });
        }

        let mut chars = candidate.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid {
            return Err(Error::InvalidName(candidate.into()));
        }

        // binders within a branch stay distinct
        if names
            .iter()
            .enumerate()
            .any(|(other, name)| other != field && name.as_ref() == candidate)
        {
            return Err(Error::BinderTaken(candidate.into()));
        }

        names[field] = candidate.into();
        debug!(?id, branch, field, name = candidate, "renamed a binder");

        self.recompute([output]);
        Ok(candidate.into())
    }

    // UTILITY FUNCTIONS

    /// Re-derives the signature of every untyped node.
    pub(super) fn retry_untyped(&mut self) -> Vec<TypeError> {
        let untyped: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|(_, node)| node.untyped().is_some())
            .map(|(id, _)| id)
            .collect();

        self.rebuild(untyped)
    }

    /// Nodes whose signature depends on the user type `type_name`.
    fn dependents_of(&self, type_name: &str) -> Vec<NodeId> {
        self.graph
            .nodes()
            .filter(|(_, node)| node.kind().depends_on(type_name, &self.registry))
            .map(|(id, _)| id)
            .collect()
    }

    /// Re-derives the signatures of `ids` and rebuilds their components.
    fn rebuild(&mut self, ids: impl IntoIterator<Item = NodeId>) -> Vec<TypeError> {
        let mut seeds = Vec::new();
        let mut errors = Vec::new();

        for id in ids {
            match self.install_signature(id) {
                Ok(displaced) => seeds.extend(displaced),
                Err(dangling) => {
                    errors.push(dangling.into());
                    continue;
                }
            }

            seeds.extend(self.output(id).ok());
        }

        if seeds.is_empty() {
            return errors;
        }

        errors.extend(self.recompute(seeds));
        errors
    }
}
