//! Structured, serializable form of type expressions.
//!
//! A literal is a node with a `name` and its argument nodes, and a variable
//! is a node with a `var` name. Arrows are encoded as the literal `->` with
//! exactly two arguments, so a saved definition never depends on how the
//! in-memory representation spells function types.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use super::Ty;
use crate::{doc::VarNames, error::TypeError};

pub const ARROW: &str = "->";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeNode {
    Var {
        var: Box<str>,
    },
    Lit {
        name: Box<str>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeNode>,
    },
}

impl TypeNode {
    /// Serializes `ty`, naming its variables `a`, `b`, ... in order of first
    /// appearance.
    pub fn from_ty(ty: &Ty) -> Self {
        Self::from_ty_with(ty, &mut VarNames::default())
    }

    fn from_ty_with(ty: &Ty, names: &mut VarNames) -> Self {
        match ty {
            Ty::Var(var) => TypeNode::Var {
                var: names.name(*var),
            },
            Ty::Lit { name, args } => TypeNode::Lit {
                name: name.clone(),
                args: args
                    .iter()
                    .map(|arg| Self::from_ty_with(arg, names))
                    .collect(),
            },
            Ty::Fn { domain, codomain } => TypeNode::Lit {
                name: ARROW.into(),
                args: vec![
                    Self::from_ty_with(domain, names),
                    Self::from_ty_with(codomain, names),
                ],
            },
        }
    }

    /// Rebuilds the denoted type. Equal variable names map to the same fresh
    /// variable.
    pub fn to_ty(&self) -> Result<Arc<Ty>, TypeError> {
        self.to_ty_with(&mut HashMap::new())
    }

    fn to_ty_with<'a>(
        &'a self,
        vars: &mut HashMap<&'a str, Arc<Ty>>,
    ) -> Result<Arc<Ty>, TypeError> {
        match self {
            TypeNode::Var { var } => Ok(vars.entry(var).or_insert_with(Ty::var).clone()),
            TypeNode::Lit { name, args } if name.as_ref() == ARROW => match args.as_slice() {
                [domain, codomain] => {
                    let domain = domain.to_ty_with(vars)?;
                    Ok(Ty::func(domain, codomain.to_ty_with(vars)?))
                }
                _ => Err(TypeError::InvalidSignature(
                    format!("an arrow takes 2 arguments, but {} were given", args.len())
                        .into(),
                )),
            },
            TypeNode::Lit { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| arg.to_ty_with(vars))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Ty::lit_with(name.clone(), args))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::syntax::parse_ty;

    #[test]
    fn structure_of_saved_types() {
        let ty = parse_ty("List a -> Number").unwrap();
        let node = TypeNode::from_ty(&ty);

        assert_eq!(
            node,
            TypeNode::Lit {
                name: "->".into(),
                args: vec![
                    TypeNode::Lit {
                        name: "List".into(),
                        args: vec![TypeNode::Var { var: "a".into() }],
                    },
                    TypeNode::Lit {
                        name: "Number".into(),
                        args: vec![],
                    },
                ],
            }
        );
    }

    #[test]
    fn toml_round_trip() {
        let sources = [
            "Number",
            "a",
            "Pair a (List b) -> b -> a",
            "(a -> b) -> List a -> List b",
        ];

        for src in sources {
            let ty = parse_ty(src).unwrap();

            let saved = toml::to_string(&TypeNode::from_ty(&ty)).unwrap();
            let loaded: TypeNode = toml::from_str(&saved).unwrap();
            let reloaded = loaded.to_ty().unwrap();

            assert!(reloaded.alpha_eq(&ty), "{src} reloaded as {reloaded}");
            assert_eq!(TypeNode::from_ty(&reloaded), loaded);
        }
    }

    #[test]
    fn reading_hand_written_nodes() {
        let src = r#"
        name = "Pair"
        args = [{ var = "x" }, { name = "Maybe", args = [{ var = "x" }] }]
        "#;

        let node: TypeNode = toml::from_str(src).unwrap();
        let ty = node.to_ty().unwrap();
        assert_eq!(ty.to_string(), "Pair a (Maybe a)");
    }

    #[test]
    fn malformed_arrows() {
        let node = TypeNode::Lit {
            name: ARROW.into(),
            args: vec![TypeNode::Var { var: "a".into() }],
        };

        assert!(matches!(
            node.to_ty(),
            Err(TypeError::InvalidSignature(_))
        ));
    }
}
