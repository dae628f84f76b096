//! Syntactic unification.

use std::sync::Arc;

use super::{Substitution, Ty};
use crate::error::TypeError;

/// Computes the most general unifier of `lhs` and `rhs`.
///
/// Literal arguments are unified left to right, each pair against the
/// bindings produced by the pairs before it. A function arrow only unifies
/// with another arrow; against a literal it fails with an arity mismatch.
pub fn unify(lhs: &Arc<Ty>, rhs: &Arc<Ty>) -> Result<Substitution, TypeError> {
    let mut sub = Substitution::new();
    sub.unify_in_place(lhs, rhs)?;
    Ok(sub)
}

/// Returns `true` if `lhs` and `rhs` have a unifier.
pub fn unifiable(lhs: &Arc<Ty>, rhs: &Arc<Ty>) -> bool {
    unify(lhs, rhs).is_ok()
}
