//! Substitutions over type variables.
//!
//! A [`Substitution`] is kept in fully dereferenced form: no type in its
//! range mentions a variable in its domain. Every binding passes through an
//! occurs check, so chains are acyclic and applying a substitution twice is
//! the same as applying it once.

use std::{collections::HashMap, sync::Arc};

use super::{Ty, TyVar};
use crate::error::{Mismatch, TypeError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution(HashMap<TyVar, Arc<Ty>>);

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the substitution `[var := ty]`.
    pub fn singleton(var: TyVar, ty: Arc<Ty>) -> Result<Self, TypeError> {
        let mut sub = Self::new();
        sub.bind(var, ty)?;
        Ok(sub)
    }

    pub fn get(&self, var: TyVar) -> Option<&Arc<Ty>> {
        self.0.get(&var)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TyVar, &Arc<Ty>)> {
        self.0.iter().map(|(var, ty)| (*var, ty))
    }

    /// Replaces every bound variable in `ty`, following bindings to a fixed
    /// point. Subtrees that contain no bound variables are shared with `ty`.
    pub fn apply(&self, ty: &Arc<Ty>) -> Arc<Ty> {
        if self.0.is_empty() {
            return ty.clone();
        }

        match ty.as_ref() {
            Ty::Var(var) => match self.0.get(var) {
                Some(bound) => self.apply(bound),
                None => ty.clone(),
            },
            Ty::Lit { name, args } => {
                let new_args: Vec<_> = args.iter().map(|arg| self.apply(arg)).collect();
                let unchanged = new_args
                    .iter()
                    .zip(args.iter())
                    .all(|(new, old)| Arc::ptr_eq(new, old));

                match unchanged {
                    true => ty.clone(),
                    false => Ty::lit_with(name.clone(), new_args),
                }
            }
            Ty::Fn { domain, codomain } => {
                let new_domain = self.apply(domain);
                let new_codomain = self.apply(codomain);

                match Arc::ptr_eq(&new_domain, domain) && Arc::ptr_eq(&new_codomain, codomain) {
                    true => ty.clone(),
                    false => Ty::func(new_domain, new_codomain),
                }
            }
        }
    }

    /// Adds the binding `var := ty`.
    ///
    /// If `var` is already bound, its current binding is unified with `ty`
    /// instead of being overwritten. On failure `self` is left unchanged.
    pub fn bind(&mut self, var: TyVar, ty: Arc<Ty>) -> Result<(), TypeError> {
        self.unify_in_place(&Arc::new(Ty::Var(var)), &ty)
    }

    /// Returns the substitution that applies `other` after `self`.
    ///
    /// `self` is applied to the range of `other` before the two are merged.
    /// A variable bound by both is unified, so incompatible bindings fail
    /// here rather than one silently shadowing the other.
    pub fn compose(&self, other: &Substitution) -> Result<Substitution, TypeError> {
        let mut composed = self.clone();
        for (var, ty) in other.iter() {
            composed.bind(var, ty.clone())?;
        }

        Ok(composed)
    }

    /// Extends `self` with the most general unifier of `lhs` and `rhs` under
    /// the bindings `self` already holds. On failure `self` is left
    /// unchanged.
    pub fn unify_in_place(&mut self, lhs: &Arc<Ty>, rhs: &Arc<Ty>) -> Result<(), TypeError> {
        let mut scratch = self.clone();
        scratch.unify_into(lhs, rhs)?;
        *self = scratch;
        Ok(())
    }

    fn unify_into(&mut self, lhs: &Arc<Ty>, rhs: &Arc<Ty>) -> Result<(), TypeError> {
        let lhs = self.apply(lhs);
        let rhs = self.apply(rhs);

        match (lhs.as_ref(), rhs.as_ref()) {
            (Ty::Var(l), Ty::Var(r)) if l == r => Ok(()),
            (Ty::Var(var), _) => self.insert(*var, rhs.clone()),
            (_, Ty::Var(var)) => self.insert(*var, lhs.clone()),
            (
                Ty::Lit {
                    name: lhs_name,
                    args: lhs_args,
                },
                Ty::Lit {
                    name: rhs_name,
                    args: rhs_args,
                },
            ) => {
                if lhs_name != rhs_name {
                    return Err(TypeError::mismatch(&lhs, &rhs, Mismatch::Name));
                }

                if lhs_args.len() != rhs_args.len() {
                    return Err(TypeError::mismatch(&lhs, &rhs, Mismatch::Arity));
                }

                // each pair is unified against the bindings of the previous ones
                for (l, r) in lhs_args.iter().zip(rhs_args.iter()) {
                    self.unify_into(l, r)?;
                }

                Ok(())
            }
            (
                Ty::Fn {
                    domain: lhs_domain,
                    codomain: lhs_codomain,
                },
                Ty::Fn {
                    domain: rhs_domain,
                    codomain: rhs_codomain,
                },
            ) => {
                self.unify_into(lhs_domain, rhs_domain)?;
                self.unify_into(lhs_codomain, rhs_codomain)
            }
            _ => Err(TypeError::mismatch(&lhs, &rhs, Mismatch::Arity)),
        }
    }

    /// Binds an unbound `var` to a dereferenced `ty`, then rewrites the rest
    /// of the range so that it stays dereferenced.
    fn insert(&mut self, var: TyVar, ty: Arc<Ty>) -> Result<(), TypeError> {
        if ty.occurs(var) {
            return Err(TypeError::OccursCheck { var, ty });
        }

        let single = Substitution(HashMap::from([(var, ty.clone())]));
        for bound in self.0.values_mut() {
            *bound = single.apply(bound);
        }

        self.0.insert(var, ty);
        Ok(())
    }
}

/// Replaces every variable in `signature` with a fresh one, consistently.
pub fn instantiate(signature: &Arc<Ty>) -> Arc<Ty> {
    renaming(signature).apply(signature)
}

/// Returns a substitution mapping every variable in `ty` to a fresh variable.
pub fn renaming(ty: &Ty) -> Substitution {
    Substitution(
        ty.vars()
            .into_iter()
            .map(|var| (var, Ty::var()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::unify;

    #[test]
    fn apply_follows_bindings() {
        let (a, b) = (TyVar::fresh(), TyVar::fresh());

        let mut sub = Substitution::singleton(a, Arc::new(Ty::Var(b))).unwrap();
        sub.bind(b, Ty::lit("Number")).unwrap();

        let ty = Ty::lit_with("List", [Arc::new(Ty::Var(a))]);
        assert_eq!(sub.apply(&ty), Ty::lit_with("List", [Ty::lit("Number")]));

        // the range stays dereferenced
        assert_eq!(sub.get(a), Some(&Ty::lit("Number")));
    }

    #[test]
    fn apply_is_idempotent() {
        let (a, b) = (Ty::var(), Ty::var());
        let lhs = Ty::from_list([a.clone(), Ty::lit("Picture")]).unwrap();
        let rhs = Ty::from_list([Ty::lit_with("List", [b.clone()]), b.clone()]).unwrap();

        let sub = unify(&lhs, &rhs).unwrap();
        let once = sub.apply(&lhs);
        assert_eq!(sub.apply(&once), once);
        assert_eq!(once.to_string(), "List Picture -> Picture");
    }

    #[test]
    fn untouched_types_are_shared() {
        let sub = Substitution::singleton(TyVar::fresh(), Ty::lit("Text")).unwrap();
        let ty = Ty::from_list([Ty::lit("Number"), Ty::var()]).unwrap();
        assert!(Arc::ptr_eq(&ty, &sub.apply(&ty)));
    }

    #[test]
    fn bind_rejects_cycles() {
        let a = TyVar::fresh();
        let list_a = Ty::lit_with("List", [Arc::new(Ty::Var(a))]);

        let mut sub = Substitution::new();
        assert!(matches!(
            sub.bind(a, list_a),
            Err(TypeError::OccursCheck { .. })
        ));
        assert!(sub.is_empty());
    }

    #[test]
    fn compose_unifies_shared_variables() {
        let a = TyVar::fresh();
        let b = Ty::var();

        let first = Substitution::singleton(a, Ty::lit_with("List", [b.clone()])).unwrap();
        let second =
            Substitution::singleton(a, Ty::lit_with("List", [Ty::lit("Color")])).unwrap();

        let composed = first.compose(&second).unwrap();
        assert_eq!(composed.apply(&b), Ty::lit("Color"));

        let clash = Substitution::singleton(a, Ty::lit("Text")).unwrap();
        assert!(matches!(
            first.compose(&clash),
            Err(TypeError::NameMismatch { .. })
        ));
    }

    #[test]
    fn compose_applies_to_the_range() {
        let (a, b) = (TyVar::fresh(), TyVar::fresh());

        let first = Substitution::singleton(a, Ty::lit("Number")).unwrap();
        let second = Substitution::singleton(b, Ty::lit_with("List", [Arc::new(Ty::Var(a))])).unwrap();

        let composed = first.compose(&second).unwrap();
        assert_eq!(
            composed.get(b),
            Some(&Ty::lit_with("List", [Ty::lit("Number")]))
        );
    }

    #[test]
    fn failed_unification_leaves_bindings_alone() {
        let a = Ty::var();
        let mut sub = Substitution::new();

        let lhs = Ty::from_list([a.clone(), Ty::lit("Number")]).unwrap();
        let rhs = Ty::from_list([Ty::lit("Text"), Ty::lit("Bool")]).unwrap();
        assert!(sub.unify_in_place(&lhs, &rhs).is_err());
        assert!(sub.is_empty());
    }

    #[test]
    fn instantiation_is_fresh() {
        let (a, b) = (Ty::var(), Ty::var());
        let signature = Ty::from_list([a.clone(), b, a]).unwrap();

        let first = instantiate(&signature);
        let second = instantiate(&signature);

        assert!(first.alpha_eq(&signature));
        assert!(second.alpha_eq(&signature));
        assert!(first.vars().iter().all(|var| !second.occurs(*var)));
        assert!(first.vars().iter().all(|var| !signature.occurs(*var)));

        // using the two instances at different types does not cross-constrain
        let mut sub = unify(&first.uncurry().0[0], &Ty::lit("Number")).unwrap();
        sub.unify_in_place(&second.uncurry().0[0], &Ty::lit("Text"))
            .unwrap();

        assert_eq!(sub.apply(&first.uncurry().1).to_string(), "Number");
        assert_eq!(sub.apply(&second.uncurry().1).to_string(), "Text");
    }

    #[test]
    fn instantiation_keeps_literals() {
        let signature = Ty::from_list([Ty::lit("Number"), Ty::lit("Shape")]).unwrap();
        assert_eq!(instantiate(&signature), signature);
    }
}
