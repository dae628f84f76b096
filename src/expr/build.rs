//! Turning a connected subgraph into an expression tree.
//!
//! The builder walks from a root output socket towards the inputs that feed
//! it. Holes never abort a build: an unconnected input, a socket that no
//! longer exists or a connection cycle all become the [`UNDEF`] placeholder,
//! tagged with the socket where the hole was found. Dangling references are
//! also collected so that the caller can report them, as are pattern
//! variables used outside every branch that binds them.

use std::{collections::HashSet, sync::Arc};

use tracing::{trace, warn};

use super::{Expr, LIST, Tagged, UNDEF};
use crate::{
    error::{Dangling, TypeError},
    graph::{Graph, NodeId, NodeKind, SocketId},
    registry::{BRANCH, EVALUATE, Registry, SCRUTINEE},
    symbol::StringInterner,
    ty::Ty,
};

/// The result of building an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Built {
    pub expr: Tagged<Expr>,
    pub errors: Vec<TypeError>,
}

pub struct ExprBuilder<'a> {
    graph: &'a Graph,
    registry: &'a Registry,
    interner: &'a mut StringInterner,
    /// Nodes on the path from the root to the node being built.
    active: HashSet<NodeId>,
    /// Binders of the case branches enclosing the node being built.
    scopes: Vec<&'a [Box<str>]>,
    errors: Vec<TypeError>,
}

impl<'a> ExprBuilder<'a> {
    pub fn new(graph: &'a Graph, registry: &'a Registry, interner: &'a mut StringInterner) -> Self {
        Self {
            graph,
            registry,
            interner,
            active: HashSet::new(),
            scopes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn build(mut self, root: SocketId) -> Built {
        let expr = self.output_expr(root);
        Built {
            expr,
            errors: self.errors,
        }
    }

    fn output_expr(&mut self, output: SocketId) -> Tagged<Expr> {
        let graph = self.graph;
        let node_id = match graph.socket(output) {
            Ok(socket) => socket.node,
            Err(dangling) => return self.dangling(dangling, output),
        };

        let node = match graph.node(node_id) {
            Ok(node) => node,
            Err(dangling) => return self.dangling(dangling, output),
        };

        if !self.active.insert(node_id) {
            return self.dangling(Dangling::Cycle(node_id), output);
        }

        trace!(?node_id, kind = %node.kind().label(), "building");
        let tag = Some(output);
        let expr = match node.kind() {
            NodeKind::Literal { value, .. } => Tagged::new(Expr::Lit(self.interner.intern(value)), tag),
            NodeKind::Function { name } | NodeKind::Constructor { name } => {
                let func = Tagged::new(Expr::Var(self.interner.intern(name)), tag);
                self.apply_inputs(node.inputs(), func)
            }
            NodeKind::List { .. } => {
                let func = Tagged::new(Expr::Var(self.interner.intern_static(LIST)), tag);
                self.apply_inputs(node.inputs(), func)
            }
            NodeKind::Local { name } if self.scopes.iter().any(|names| names.contains(name)) => {
                Tagged::new(Expr::Var(self.interner.intern(name)), tag)
            }
            NodeKind::Local { name } => {
                warn!(%name, "substituting a placeholder for an unbound variable");
                self.errors.push(TypeError::unbound(name));
                self.undef(output)
            }
            NodeKind::Case { type_name, binders } => {
                self.case_expr(type_name, binders, node.inputs(), output)
            }
        };

        self.active.remove(&node_id);
        expr.retag(tag)
    }

    fn input_expr(&mut self, input: SocketId) -> Tagged<Expr> {
        match self.graph.peer(input) {
            Some(output) => self.output_expr(output).retag(Some(input)),
            None => self.undef(input),
        }
    }

    fn apply_inputs(&mut self, inputs: &[SocketId], func: Tagged<Expr>) -> Tagged<Expr> {
        let args: Vec<_> = inputs.iter().map(|&input| self.input_expr(input)).collect();
        Expr::app_func(args, func)
    }

    /// `1ev (1const scrutinee T) (# branch_0 (# branch_1 ... branch_n))`,
    /// where each connected branch is wrapped in the bindings of its
    /// pattern.
    fn case_expr(
        &mut self,
        type_name: &str,
        binders: &'a [Vec<Box<str>>],
        inputs: &[SocketId],
        output: SocketId,
    ) -> Tagged<Expr> {
        let tag = Some(output);
        let type_lit = Tagged::new(Expr::Lit(self.interner.intern(type_name)), tag);

        let Some((&scrutinee, branches)) = inputs.split_first() else {
            return self.undef(output);
        };

        let scrutinee = match self.graph.peer(scrutinee) {
            Some(_) => {
                let tagger = Tagged::new(Expr::Var(self.interner.intern_static(SCRUTINEE)), tag);
                let value = self.input_expr(scrutinee);
                Expr::app_func([value, type_lit], tagger)
            }
            None => type_lit,
        };

        let fields: Vec<Vec<Option<Arc<Ty>>>> = self
            .registry
            .user_type(type_name)
            .map(|ty| ty.variants.iter().map(|variant| variant.fields.clone()).collect())
            .unwrap_or_else(Vec::new);

        let mut arms = Vec::with_capacity(branches.len());
        for (index, &branch) in branches.iter().enumerate() {
            if self.graph.peer(branch).is_none() {
                arms.push(self.undef(branch));
                continue;
            }

            let names = binders.get(index).map(Vec::as_slice).unwrap_or_default();
            let types = fields.get(index).map(Vec::as_slice).unwrap_or_default();

            self.scopes.push(names);
            let mut body = self.input_expr(branch);
            self.scopes.pop();

            // the first field ends up innermost
            for (position, name) in names.iter().enumerate() {
                let annotation = types.get(position).cloned().flatten().unwrap_or_else(Ty::var);
                let tag = body.tag();
                body = Tagged::new(
                    Expr::Let {
                        name: self.interner.intern(name),
                        annotation,
                        body: Box::new(body),
                    },
                    tag,
                );
            }

            arms.push(body);
        }

        let branch = self.interner.intern_static(BRANCH);
        let combined = arms
            .into_iter()
            .rev()
            .reduce(|rest, arm| Expr::app_func([arm, rest], Tagged::new(Expr::Var(branch), tag)));

        let combined = match combined {
            Some(combined) => combined,
            None => self.undef(output),
        };

        let evaluate = Tagged::new(Expr::Var(self.interner.intern_static(EVALUATE)), tag);
        Expr::app_func([scrutinee, combined], evaluate)
    }

    fn undef(&mut self, at: SocketId) -> Tagged<Expr> {
        Tagged::new(Expr::Var(self.interner.intern_static(UNDEF)), Some(at))
    }

    fn dangling(&mut self, dangling: Dangling, at: SocketId) -> Tagged<Expr> {
        warn!(%dangling, "substituting a placeholder");
        self.errors.push(dangling.into());
        self.undef(at)
    }
}
