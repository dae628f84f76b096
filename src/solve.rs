//! Batch constraint solving over a union-find table.
//!
//! A [`Solver`] accumulates equality constraints between types one at a
//! time. Each call to [`Solver::constrain`] is transactional: if the
//! constraint cannot be satisfied, every union and assignment it made is
//! rolled back and the solver is exactly as it was before the call. This
//! lets a whole component of the graph be re-solved at once while still
//! attributing each failure to the connection that caused it.

use std::{collections::HashMap, sync::Arc};

use ena::unify::{InPlace, UnificationTable, UnifyKey};

use crate::{
    error::{Mismatch, TypeError},
    ty::{Ty, TyVar},
};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SolverKey(u32);

impl UnifyKey for SolverKey {
    type Value = ();

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        Self(u)
    }

    fn tag() -> &'static str {
        "SolverKey"
    }
}

#[derive(Debug)]
pub struct Solver {
    table: UnificationTable<InPlace<SolverKey>>,
    keys: HashMap<TyVar, SolverKey>,
    /// The variable each key was created for, indexed by key.
    vars: Vec<TyVar>,
    /// Assignments, keyed by the representative of each equivalence class.
    assignments: HashMap<SolverKey, Arc<Ty>>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    pub fn new() -> Self {
        Self {
            table: UnificationTable::new(),
            keys: HashMap::new(),
            vars: Vec::new(),
            assignments: HashMap::new(),
        }
    }

    /// Requires `lhs` and `rhs` to be equal. On failure nothing changes.
    pub fn constrain(&mut self, lhs: &Arc<Ty>, rhs: &Arc<Ty>) -> Result<(), TypeError> {
        let snapshot = self.table.snapshot();
        let assignments = self.assignments.clone();
        let var_count = self.vars.len();

        match self.unify(lhs.clone(), rhs.clone()) {
            Ok(()) => {
                self.table.commit(snapshot);
                Ok(())
            }
            Err(error) => {
                self.table.rollback_to(snapshot);
                self.assignments = assignments;

                for var in self.vars.drain(var_count..) {
                    self.keys.remove(&var);
                }

                Err(error)
            }
        }
    }

    /// Replaces every variable in `ty` with its current solution. Unsolved
    /// variables are replaced with the representative of their class.
    pub fn zonk(&mut self, ty: &Arc<Ty>) -> Arc<Ty> {
        match ty.as_ref() {
            Ty::Var(var) => {
                let Some(&key) = self.keys.get(var) else {
                    return ty.clone();
                };

                let repr = self.table.find(key);
                match self.assignments.get(&repr).cloned() {
                    Some(assigned) => self.zonk(&assigned),
                    None => {
                        let repr_var = self.vars[repr.index() as usize];
                        match repr_var == *var {
                            true => ty.clone(),
                            false => Arc::new(Ty::Var(repr_var)),
                        }
                    }
                }
            }
            Ty::Lit { args, .. } if args.is_empty() => ty.clone(),
            Ty::Lit { name, args } => {
                let args: Vec<_> = args.iter().map(|arg| self.zonk(arg)).collect();
                Ty::lit_with(name.clone(), args)
            }
            Ty::Fn { domain, codomain } => {
                let domain = self.zonk(domain);
                Ty::func(domain, self.zonk(codomain))
            }
        }
    }

    fn unify(&mut self, lhs: Arc<Ty>, rhs: Arc<Ty>) -> Result<(), TypeError> {
        let lhs = self.shallow_resolve(lhs);
        let rhs = self.shallow_resolve(rhs);

        match (lhs.as_ref(), rhs.as_ref()) {
            // variable-variable
            (Ty::Var(v1), Ty::Var(v2)) => {
                let (k1, k2) = (self.key(*v1), self.key(*v2));
                self.table.union(k1, k2);
                Ok(())
            }

            // value-variable & variable-value
            (_, Ty::Var(var)) => self.unify_var_value(*var, lhs.clone()),
            (Ty::Var(var), _) => self.unify_var_value(*var, rhs.clone()),

            // literal-literal
            (
                Ty::Lit {
                    name: n1,
                    args: a1,
                },
                Ty::Lit {
                    name: n2,
                    args: a2,
                },
            ) => {
                if n1 != n2 {
                    return Err(self.mismatch(&lhs, &rhs, Mismatch::Name));
                }

                if a1.len() != a2.len() {
                    return Err(self.mismatch(&lhs, &rhs, Mismatch::Arity));
                }

                for (l, r) in a1.iter().zip(a2.iter()) {
                    self.unify(l.clone(), r.clone())?;
                }

                Ok(())
            }

            // function-function
            (
                Ty::Fn {
                    domain: d1,
                    codomain: c1,
                },
                Ty::Fn {
                    domain: d2,
                    codomain: c2,
                },
            ) => {
                self.unify(d1.clone(), d2.clone())?;
                self.unify(c1.clone(), c2.clone())
            }

            _ => Err(self.mismatch(&lhs, &rhs, Mismatch::Arity)),
        }
    }

    fn unify_var_value(&mut self, var: TyVar, value: Arc<Ty>) -> Result<(), TypeError> {
        let key = self.key(var);
        let repr = self.table.find(key);
        let value = self.zonk(&value);

        for other in value.vars() {
            if let Some(&other_key) = self.keys.get(&other) {
                if self.table.find(other_key) == repr {
                    return Err(TypeError::OccursCheck { var, ty: value });
                }
            }
        }

        self.assignments.insert(repr, value);
        Ok(())
    }

    /// Follows the assignment of a variable's class, without descending into
    /// the assigned type.
    fn shallow_resolve(&mut self, ty: Arc<Ty>) -> Arc<Ty> {
        let Ty::Var(var) = ty.as_ref() else {
            return ty;
        };

        match self.keys.get(var).copied() {
            Some(key) => {
                let repr = self.table.find(key);
                match self.assignments.get(&repr).cloned() {
                    Some(assigned) => self.shallow_resolve(assigned),
                    None => ty,
                }
            }
            None => ty,
        }
    }

    fn mismatch(&mut self, lhs: &Arc<Ty>, rhs: &Arc<Ty>, kind: Mismatch) -> TypeError {
        let expected = self.zonk(lhs);
        let found = self.zonk(rhs);
        TypeError::mismatch(&expected, &found, kind)
    }

    fn key(&mut self, var: TyVar) -> SolverKey {
        match self.keys.get(&var) {
            Some(&key) => key,
            None => {
                let key = self.table.new_key(());
                self.keys.insert(var, key);
                self.vars.push(var);
                key
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::syntax::parse_ty;

    #[test]
    fn classes_share_assignments() {
        let (a, b) = (Ty::var(), Ty::var());
        let mut solver = Solver::new();

        solver.constrain(&a, &b).unwrap();
        solver.constrain(&b, &Ty::lit("Picture")).unwrap();

        assert_eq!(solver.zonk(&a), Ty::lit("Picture"));
        assert_eq!(solver.zonk(&b), Ty::lit("Picture"));
    }

    #[test]
    fn unsolved_variables_collapse_to_one() {
        let (a, b, c) = (Ty::var(), Ty::var(), Ty::var());
        let mut solver = Solver::new();

        solver.constrain(&a, &b).unwrap();
        solver.constrain(&c, &b).unwrap();

        let zonked = solver.zonk(&Ty::from_list([a, b, c]).unwrap());
        let (params, result) = zonked.uncurry();
        assert_eq!(params[0], params[1]);
        assert_eq!(params[1], result);
    }

    #[test]
    fn failed_constraints_roll_back() {
        let a = Ty::var();
        let b = Ty::var();
        let pair = Ty::lit_with("Pair", [a.clone(), b.clone()]);
        let mut solver = Solver::new();

        // the first argument would bind `a` before the second fails
        let bad = parse_ty("Pair Number (List Text)").unwrap();
        solver.constrain(&b, &Ty::lit("Text")).unwrap();
        assert!(solver.constrain(&pair, &bad).is_err());

        assert_eq!(solver.zonk(&a), a);
        assert_eq!(solver.zonk(&b), Ty::lit("Text"));

        // and the solver is still usable afterwards
        solver.constrain(&a, &Ty::lit("Color")).unwrap();
        assert_eq!(solver.zonk(&pair).to_string(), "Pair Color Text");
    }

    #[test]
    fn occurs_check_sees_through_classes() {
        let (a, b) = (Ty::var(), Ty::var());
        let mut solver = Solver::new();

        solver.constrain(&a, &b).unwrap();
        let error = solver
            .constrain(&a, &Ty::lit_with("List", [b.clone()]))
            .unwrap_err();

        assert!(matches!(error, TypeError::OccursCheck { .. }));
        assert_eq!(solver.zonk(&a), solver.zonk(&b));
    }

    #[test]
    fn mismatches_report_solved_types() {
        let a = Ty::var();
        let mut solver = Solver::new();

        solver.constrain(&a, &Ty::lit("Number")).unwrap();
        let error = solver.constrain(&a, &Ty::lit("Text")).unwrap_err();

        assert_eq!(
            error,
            TypeError::mismatch(&Ty::lit("Number"), &Ty::lit("Text"), Mismatch::Name)
        );
    }
}
