//! Type inference for block-based visual programs.
//!
//! A program is a graph of nodes whose sockets are joined by connections.
//! Every socket carries a type expression, and the [`workspace::Workspace`]
//! keeps those types consistent by Hindley-Milner style unification as the
//! graph is edited. User-defined sum types live in a [`registry::Registry`],
//! and a connected subgraph can be turned into an [`expr::Expr`] tree for
//! later evaluation.

pub mod config;
pub mod doc;
pub mod error;
pub mod expr;
pub mod graph;
pub mod registry;
pub mod solve;
pub mod symbol;
pub mod ty;
pub mod workspace;
