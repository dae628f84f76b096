//! Error types shared by the type algebra, the registry and the workspace.
//!
//! [`TypeError`] covers failures of the type system proper: unification,
//! signature derivation, naming and graph references. [`Error`] is what an
//! editor-facing operation returns; it wraps a [`TypeError`] and adds misuse
//! of the graph topology and failed registry lookups.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    graph::{NodeId, SocketId},
    ty::{Ty, TyVar},
};

/// The result type of editor-facing operations.
pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("the type variable {var:?} occurs in {ty}")]
    OccursCheck { var: TyVar, ty: Arc<Ty> },
    #[error("{kind}: expected {expected} but found {found}")]
    NameMismatch {
        expected: Arc<Ty>,
        found: Arc<Ty>,
        kind: Mismatch,
    },
    #[error("invalid signature: {0}")]
    InvalidSignature(Box<str>),
    #[error("could not find a free name for {candidate:?} after {attempts} attempts")]
    NameCollision { candidate: Box<str>, attempts: usize },
    #[error("dangling reference: {0}")]
    DanglingReference(Dangling),
}

/// The way two literal types disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    /// The literal names differ.
    Name,
    /// The argument counts differ.
    Arity,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mismatch::Name => write!(f, "type mismatch"),
            Mismatch::Arity => write!(f, "wrong number of arguments"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Dangling {
    #[error("the node {0:?} does not exist")]
    Node(NodeId),
    #[error("the socket {0:?} does not exist")]
    Socket(SocketId),
    #[error("the connections through {0:?} form a cycle")]
    Cycle(NodeId),
}

impl TypeError {
    pub(crate) fn mismatch(expected: &Arc<Ty>, found: &Arc<Ty>, kind: Mismatch) -> Self {
        Self::NameMismatch {
            expected: expected.clone(),
            found: found.clone(),
            kind,
        }
    }

    /// A pattern variable used outside every case branch that binds it.
    pub(crate) fn unbound(name: &str) -> Self {
        Self::InvalidSignature(format!("the variable {name} is not bound by an enclosing case branch").into())
    }
}

impl From<Dangling> for TypeError {
    fn from(value: Dangling) -> Self {
        Self::DanglingReference(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error("the socket {0:?} is not an output")]
    ExpectedOutput(SocketId),
    #[error("the socket {0:?} is not an input")]
    ExpectedInput(SocketId),
    #[error("the input {0:?} is already connected")]
    Occupied(SocketId),
    #[error("the sockets {0:?} and {1:?} are not connected")]
    NotConnected(SocketId, SocketId),
    #[error("the node {0:?} has a fixed number of inputs")]
    FixedArity(NodeId),
    #[error("unknown user type {0:?}")]
    UnknownType(Box<str>),
    #[error("unknown constructor {0:?}")]
    UnknownConstructor(Box<str>),
    #[error("the type {type_name:?} has no variant {index}")]
    UnknownVariant { type_name: Box<str>, index: usize },
    #[error("variant {variant} of {type_name:?} has no field {field}")]
    UnknownField {
        type_name: Box<str>,
        variant: usize,
        field: usize,
    },
    #[error("the node {0:?} does not support this edit")]
    WrongKind(NodeId),
    #[error("{0:?} is not a valid name")]
    InvalidName(Box<str>),
    #[error("{0:?} is already bound in this branch")]
    BinderTaken(Box<str>),
}

impl From<Dangling> for Error {
    fn from(value: Dangling) -> Self {
        Self::Type(value.into())
    }
}
