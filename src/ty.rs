//! Type expressions.
//!
//! A [`Ty`] is either a type variable, a named literal type applied to zero
//! or more arguments, or a function arrow. Curried signatures are right-nested
//! arrow chains built with [`Ty::from_list`]: the last element is the result
//! type and every preceding element is an argument type.
//!
//! Types are immutable and shared through [`Arc`], so narrowing a type never
//! mutates it in place; a [`Substitution`] produces a new type instead.
//!
//! # Variable Identity
//! Type variables are identified by a [`TyVar`], which is unique by
//! construction: ids are handed out by a process-wide counter and never
//! reused. Two variables are the same variable if and only if their ids are
//! equal, so names only appear when a type is printed.

use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use crate::error::TypeError;

pub mod persist;
pub mod subst;
pub mod syntax;
pub mod unify;

pub use subst::{Substitution, instantiate};
pub use unify::unify;

static COUNTER: AtomicU32 = AtomicU32::new(1);

/// A type variable.
#[derive(Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TyVar(NonZeroU32);

impl std::fmt::Debug for TyVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "?{}", self.0)
    }
}

impl TyVar {
    /// Returns a variable that no other live type refers to.
    pub fn fresh() -> TyVar {
        let raw_id = COUNTER.fetch_add(1, Ordering::Relaxed);

        // the counter starts at 1 and only wraps after 2^32 allocations
        match NonZeroU32::new(raw_id) {
            Some(id) => TyVar(id),
            None => TyVar::fresh(),
        }
    }
}

/// A type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    /// A type variable, to be resolved by unification.
    Var(TyVar),
    /// A named type applied to zero or more arguments.
    Lit {
        name: Box<str>,
        args: Box<[Arc<Ty>]>,
    },
    /// A single function arrow.
    Fn {
        domain: Arc<Ty>,
        codomain: Arc<Ty>,
    },
}

impl Ty {
    /// Returns a fresh type variable.
    pub fn var() -> Arc<Self> {
        Arc::new(Ty::Var(TyVar::fresh()))
    }

    /// Returns the literal type `name` with no arguments.
    pub fn lit(name: impl Into<Box<str>>) -> Arc<Self> {
        Self::lit_with(name, std::iter::empty())
    }

    pub fn lit_with(
        name: impl Into<Box<str>>,
        args: impl IntoIterator<Item = Arc<Ty>>,
    ) -> Arc<Self> {
        Arc::new(Ty::Lit {
            name: name.into(),
            args: args.into_iter().collect(),
        })
    }

    pub fn func(domain: Arc<Ty>, codomain: Arc<Ty>) -> Arc<Self> {
        Arc::new(Ty::Fn { domain, codomain })
    }

    /// Builds the arrow chain `t0 -> t1 -> ... -> tn` from `[t0, ..., tn]`.
    ///
    /// A single element is returned unchanged (a signature with no
    /// arguments). An empty list is not a signature, since it lacks a result
    /// type.
    pub fn from_list(
        tys: impl IntoIterator<Item = Arc<Ty>>,
    ) -> Result<Arc<Self>, TypeError> {
        let mut tys: Vec<_> = tys.into_iter().collect();
        let result = tys.pop().ok_or_else(|| {
            TypeError::InvalidSignature("an arrow chain needs a result type".into())
        })?;

        Ok(Self::curried(tys, result))
    }

    /// Builds `params[0] -> ... -> params[n - 1] -> result`.
    pub fn curried(params: Vec<Arc<Ty>>, result: Arc<Ty>) -> Arc<Self> {
        params
            .into_iter()
            .rev()
            .fold(result, |codomain, domain| Ty::func(domain, codomain))
    }

    /// Splits an arrow chain into its argument types and its result type.
    pub fn uncurry(self: &Arc<Self>) -> (Vec<Arc<Ty>>, Arc<Ty>) {
        let mut params = Vec::new();
        let mut current = self.clone();

        while let Ty::Fn { domain, codomain } = current.as_ref() {
            params.push(domain.clone());
            let next = codomain.clone();
            current = next;
        }

        (params, current)
    }

    /// The number of arguments in an arrow chain.
    pub fn arity(&self) -> usize {
        match self {
            Ty::Fn { codomain, .. } => 1 + codomain.arity(),
            _ => 0,
        }
    }

    /// Returns the distinct variables in `self` in order of first appearance.
    pub fn vars(&self) -> Vec<TyVar> {
        fn rec(ty: &Ty, vars: &mut Vec<TyVar>) {
            match ty {
                Ty::Var(var) => {
                    if !vars.contains(var) {
                        vars.push(*var);
                    }
                }
                Ty::Lit { args, .. } => args.iter().for_each(|arg| rec(arg, vars)),
                Ty::Fn { domain, codomain } => {
                    rec(domain, vars);
                    rec(codomain, vars);
                }
            }
        }

        let mut vars = Vec::new();
        rec(self, &mut vars);
        vars
    }

    /// Returns `true` if and only if `var` occurs in `self`.
    pub fn occurs(&self, var: TyVar) -> bool {
        match self {
            Ty::Var(v) => *v == var,
            Ty::Lit { args, .. } => args.iter().any(|arg| arg.occurs(var)),
            Ty::Fn { domain, codomain } => {
                domain.occurs(var) || codomain.occurs(var)
            }
        }
    }

    /// Returns `true` if `self` contains no type variables.
    pub fn is_concrete(&self) -> bool {
        match self {
            Ty::Var(_) => false,
            Ty::Lit { args, .. } => args.iter().all(|arg| arg.is_concrete()),
            Ty::Fn { domain, codomain } => {
                domain.is_concrete() && codomain.is_concrete()
            }
        }
    }

    pub fn as_var(&self) -> Option<TyVar> {
        match self {
            Ty::Var(var) => Some(*var),
            _ => None,
        }
    }

    /// The outermost literal name, if `self` is a literal type.
    pub fn literal_name(&self) -> Option<&str> {
        match self {
            Ty::Lit { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Every literal name in `self`, outermost first.
    pub fn literal_names(&self) -> impl Iterator<Item = &str> {
        fn rec<'a>(ty: &'a Ty, names: &mut Vec<&'a str>) {
            match ty {
                Ty::Var(_) => (),
                Ty::Lit { name, args } => {
                    names.push(name);
                    args.iter().for_each(|arg| rec(arg, names));
                }
                Ty::Fn { domain, codomain } => {
                    rec(domain, names);
                    rec(codomain, names);
                }
            }
        }

        let mut names = Vec::new();
        rec(self, &mut names);
        names.into_iter()
    }

    /// Returns `true` if the literal `name` appears anywhere in `self`.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Ty::Var(_) => false,
            Ty::Lit { name: n, args } => {
                n.as_ref() == name || args.iter().any(|arg| arg.mentions(name))
            }
            Ty::Fn { domain, codomain } => {
                domain.mentions(name) || codomain.mentions(name)
            }
        }
    }

    /// Replaces every literal named `old` with `new`, sharing untouched
    /// subtrees with `self`.
    pub fn rename_literal(self: &Arc<Self>, old: &str, new: &str) -> Arc<Self> {
        if !self.mentions(old) {
            return self.clone();
        }

        match self.as_ref() {
            Ty::Var(_) => self.clone(),
            Ty::Lit { name, args } => {
                let name: Box<str> = match name.as_ref() == old {
                    true => new.into(),
                    false => name.clone(),
                };

                Ty::lit_with(name, args.iter().map(|arg| arg.rename_literal(old, new)))
            }
            Ty::Fn { domain, codomain } => Ty::func(
                domain.rename_literal(old, new),
                codomain.rename_literal(old, new),
            ),
        }
    }

    /// Structural equality up to a consistent renaming of variables.
    pub fn alpha_eq(&self, other: &Ty) -> bool {
        fn rec(
            lhs: &Ty,
            rhs: &Ty,
            forward: &mut HashMap<TyVar, TyVar>,
            backward: &mut HashMap<TyVar, TyVar>,
        ) -> bool {
            match (lhs, rhs) {
                (Ty::Var(l), Ty::Var(r)) => {
                    let l_ok = *forward.entry(*l).or_insert(*r) == *r;
                    let r_ok = *backward.entry(*r).or_insert(*l) == *l;
                    l_ok && r_ok
                }
                (
                    Ty::Lit { name: n1, args: a1 },
                    Ty::Lit { name: n2, args: a2 },
                ) => {
                    n1 == n2
                        && a1.len() == a2.len()
                        && a1
                            .iter()
                            .zip(a2.iter())
                            .all(|(l, r)| rec(l, r, forward, backward))
                }
                (
                    Ty::Fn {
                        domain: d1,
                        codomain: c1,
                    },
                    Ty::Fn {
                        domain: d2,
                        codomain: c2,
                    },
                ) => rec(d1, d2, forward, backward) && rec(c1, c2, forward, backward),
                _ => false,
            }
        }

        rec(self, other, &mut HashMap::new(), &mut HashMap::new())
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use crate::doc::{ToDoc, VarNames};

        let doc = self.to_doc(&mut VarNames::default());
        write!(f, "{}", doc.pretty(80))
    }
}
