//! The closed set of node kinds.

use std::sync::Arc;

use crate::{error::TypeError, registry::Registry, ty::Ty};

/// The type constructor produced by list builder nodes.
pub const LIST_TYPE: &str = "List";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A constant with a fixed type, such as a number or a piece of text.
    Literal { ty: Arc<Ty>, value: Box<str> },
    /// An application of a function from the signature table.
    Function { name: Box<str> },
    /// An application of a user-defined constructor.
    Constructor { name: Box<str> },
    /// Case analysis over a user-defined type, with the names bound by each
    /// branch's pattern.
    Case {
        type_name: Box<str>,
        binders: Vec<Vec<Box<str>>>,
    },
    /// A list of `items` elements of a common type.
    List { items: usize },
    /// A use of a variable bound by an enclosing case branch.
    Local { name: Box<str> },
}

impl NodeKind {
    pub fn case(type_name: impl Into<Box<str>>) -> Self {
        NodeKind::Case {
            type_name: type_name.into(),
            binders: Vec::new(),
        }
    }

    /// Derives the generalized signature of this kind of node.
    ///
    /// Literals have no signature: their output type is fixed. Every other
    /// kind yields an arrow chain whose arguments are the node's inputs.
    pub fn derive_signature(&self, registry: &Registry) -> Result<Option<Arc<Ty>>, TypeError> {
        match self {
            NodeKind::Literal { ty, .. } => match ty.literal_names().find(|name| !registry.is_known_type(name)) {
                Some(unknown) => Err(TypeError::InvalidSignature(
                    format!("unknown type {unknown}").into(),
                )),
                None => Ok(None),
            },
            NodeKind::Function { name } => {
                let signature = registry
                    .function(name)
                    .ok_or_else(|| TypeError::InvalidSignature(format!("unknown function {name}").into()))?;

                match signature.literal_names().find(|ty| !registry.is_known_type(ty)) {
                    Some(unknown) => Err(TypeError::InvalidSignature(
                        format!("{name} mentions the unknown type {unknown}").into(),
                    )),
                    None => Ok(Some(signature.clone())),
                }
            }
            NodeKind::Constructor { name } => registry
                .constructor_signature(name)
                .map(Some)
                .ok_or_else(|| TypeError::InvalidSignature(format!("unknown constructor {name}").into())),
            NodeKind::Case { type_name, .. } => registry
                .case_signature(type_name)
                .map(Some)
                .ok_or_else(|| TypeError::InvalidSignature(format!("unknown type {type_name}").into())),
            NodeKind::List { items } => Ok(Some(list_signature(*items))),
            NodeKind::Local { .. } => Ok(Some(Ty::var())),
        }
    }

    /// The name shown on the node.
    pub fn label(&self) -> String {
        match self {
            NodeKind::Literal { value, .. } => value.to_string(),
            NodeKind::Function { name } | NodeKind::Constructor { name } | NodeKind::Local { name } => {
                name.to_string()
            }
            NodeKind::Case { type_name, .. } => format!("case {type_name}"),
            NodeKind::List { items } => format!("list/{items}"),
        }
    }

    /// Returns `true` if this node's signature depends on the user type
    /// `type_name`.
    pub fn depends_on(&self, type_name: &str, registry: &Registry) -> bool {
        match self {
            NodeKind::Literal { ty, .. } => ty.mentions(type_name),
            NodeKind::Constructor { name } => registry
                .constructor(name)
                .is_some_and(|(owner, _)| owner.name.as_ref() == type_name),
            NodeKind::Case { type_name: scrutinee, .. } => scrutinee.as_ref() == type_name,
            NodeKind::Function { name } => registry
                .function(name)
                .is_some_and(|signature| signature.mentions(type_name)),
            NodeKind::List { .. } | NodeKind::Local { .. } => false,
        }
    }
}

/// `a -> ... -> a -> List a`, with one argument per item.
pub fn list_signature(items: usize) -> Arc<Ty> {
    let elem = Ty::var();
    let params = std::iter::repeat_n(elem.clone(), items).collect();
    Ty::curried(params, Ty::lit_with(LIST_TYPE, [elem]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Variant;

    #[test]
    fn list_signatures_share_one_variable() {
        assert_eq!(list_signature(0).to_string(), "List a");
        assert_eq!(list_signature(3).to_string(), "a -> a -> a -> List a");
    }

    #[test]
    fn signatures_come_from_the_registry() {
        let mut registry = Registry::with_prelude();
        registry
            .define_type(
                "Shape",
                vec![Variant::new("Circle", [Some(Ty::lit("Number"))])],
            )
            .unwrap();

        let circle = NodeKind::Constructor {
            name: "Circle".into(),
        };
        let sig = circle.derive_signature(&registry).unwrap().unwrap();
        assert_eq!(sig.to_string(), "Number -> Shape");

        let case = NodeKind::case("Shape");
        let sig = case.derive_signature(&registry).unwrap().unwrap();
        assert_eq!(sig.to_string(), "Shape -> a -> a");

        assert!(circle.depends_on("Shape", &registry));
        assert!(!circle.depends_on("Number", &registry));
    }

    #[test]
    fn functions_depend_on_the_types_they_mention() {
        let mut registry = Registry::with_prelude();
        registry
            .define_type("Shape", vec![Variant::new("Dot", Vec::new())])
            .unwrap();
        registry
            .define_function("area", Ty::func(Ty::lit("Shape"), Ty::lit("Number")))
            .unwrap();

        let area = NodeKind::Function { name: "area".into() };
        assert!(area.depends_on("Shape", &registry));
        assert!(!area.depends_on("Text", &registry));
        assert!(area.derive_signature(&registry).is_ok());

        registry.delete_type("Shape").unwrap();
        assert!(matches!(
            area.derive_signature(&registry),
            Err(TypeError::InvalidSignature(message)) if message.contains("Shape")
        ));
    }

    #[test]
    fn unknown_names_leave_nodes_untyped() {
        let registry = Registry::with_prelude();

        let kinds = [
            NodeKind::Function { name: "nope".into() },
            NodeKind::Constructor { name: "Nope".into() },
            NodeKind::case("Nope"),
            NodeKind::Literal {
                ty: Ty::lit("Nope"),
                value: "?".into(),
            },
        ];

        for kind in kinds {
            assert!(matches!(
                kind.derive_signature(&registry),
                Err(TypeError::InvalidSignature(_))
            ));
        }
    }

    #[test]
    fn literals_have_no_signature() {
        let registry = Registry::with_prelude();
        let five = NodeKind::Literal {
            ty: Ty::lit("Number"),
            value: "5".into(),
        };

        assert_eq!(five.derive_signature(&registry), Ok(None));
        assert_eq!(five.label(), "5");
    }
}
