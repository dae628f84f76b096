//! Workspace descriptions parsed from `.toml` files.
//!
//! A description lists extra function signatures, user types, named nodes
//! and the links between them. Building a description is a bulk load: links
//! are attached without type checking, every component is solved once, and
//! the type errors of the result are returned next to the workspace rather
//! than aborting the load.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    error::{self, TypeError},
    graph::{NodeId, NodeKind},
    registry::Variant,
    ty::{
        Ty,
        persist::TypeNode,
        syntax::{SyntaxError, parse_ty},
    },
    workspace::Workspace,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceFile {
    /// Extra signature table entries, by function name.
    #[serde(default)]
    pub functions: BTreeMap<Box<str>, Box<str>>,
    #[serde(default)]
    pub types: Vec<TypeSpec>,
    #[serde(default)]
    pub nodes: BTreeMap<Box<str>, NodeSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: Box<str>,
    #[serde(default)]
    pub variants: Vec<VariantSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSpec {
    pub constructor: Box<str>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// A field type, written either as text or in structured form. An empty
/// string leaves the field unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Text(Box<str>),
    Structured(TypeNode),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeSpec {
    Literal {
        #[serde(rename = "type")]
        ty: Box<str>,
        value: Box<str>,
    },
    Function {
        name: Box<str>,
    },
    Constructor {
        name: Box<str>,
    },
    Case {
        #[serde(rename = "type")]
        type_name: Box<str>,
        /// Binder names per branch; missing names keep their defaults.
        #[serde(default)]
        binders: Vec<Vec<Box<str>>>,
    },
    List {
        items: usize,
    },
    Local {
        name: Box<str>,
    },
}

/// Feeds the output of `from` into input `input` of `to`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub from: Box<str>,
    pub to: Box<str>,
    pub input: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("in {context}: {source}")]
    Syntax {
        context: Box<str>,
        source: SyntaxError,
    },
    #[error("in {context}: {source}")]
    Type {
        context: Box<str>,
        source: TypeError,
    },
    #[error(transparent)]
    Edit(#[from] error::Error),
    #[error("the type name {0:?} is already taken")]
    NameTaken(Box<str>),
    #[error("unknown node {0:?}")]
    UnknownNode(Box<str>),
    #[error("the node {node:?} has no input {input}")]
    MissingInput { node: Box<str>, input: usize },
}

/// A workspace built from a description.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub workspace: Workspace,
    /// The node created for each named node of the description.
    pub nodes: BTreeMap<Box<str>, NodeId>,
    pub errors: Vec<TypeError>,
}

impl WorkspaceFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let file_contents = std::fs::read_to_string(&path)?;
        Self::from_toml(&file_contents)
    }

    pub fn from_toml(source: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(source)?)
    }

    pub fn build(&self) -> Result<Loaded, LoadError> {
        let mut workspace = Workspace::new();

        for spec in &self.types {
            let variants = spec
                .variants
                .iter()
                .map(|variant| variant.resolve(&spec.name))
                .collect::<Result<Vec<_>, _>>()?;

            let name = workspace.define_user_type(&spec.name, variants)?;
            if name != spec.name {
                return Err(LoadError::NameTaken(spec.name.clone()));
            }
        }

        for (name, signature) in &self.functions {
            let signature = parse(signature, name)?;
            workspace.define_function(name, signature)?;
        }

        let mut nodes = BTreeMap::new();
        for (name, spec) in &self.nodes {
            let id = workspace.add_node(spec.kind(name)?)?;

            if let NodeSpec::Case { binders, .. } = spec {
                for (branch, names) in binders.iter().enumerate() {
                    for (field, binder) in names.iter().enumerate() {
                        workspace.rename_binder(id, branch, field, binder)?;
                    }
                }
            }

            nodes.insert(name.clone(), id);
        }

        for link in &self.links {
            let lookup = |name: &str| {
                nodes
                    .get(name)
                    .copied()
                    .ok_or_else(|| LoadError::UnknownNode(name.into()))
            };

            let (from, to) = (lookup(&*link.from)?, lookup(&*link.to)?);
            let output = workspace.output(from)?;
            let input = workspace
                .inputs(to)?
                .get(link.input)
                .copied()
                .ok_or_else(|| LoadError::MissingInput {
                    node: link.to.clone(),
                    input: link.input,
                })?;

            workspace.attach(output, input)?;
            debug!(from = %link.from, to = %link.to, input = link.input, "attached a link");
        }

        workspace.resolve_all();
        let errors = workspace.validate_graph();

        info!(nodes = nodes.len(), links = self.links.len(), errors = errors.len(), "loaded a workspace");
        Ok(Loaded {
            workspace,
            nodes,
            errors,
        })
    }
}

impl VariantSpec {
    fn resolve(&self, type_name: &str) -> Result<Variant, LoadError> {
        let context = format!("{type_name}.{}", self.constructor);
        let fields = self
            .fields
            .iter()
            .map(|field| field.resolve(&context))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Variant::new(self.constructor.clone(), fields))
    }
}

impl FieldSpec {
    fn resolve(&self, context: &str) -> Result<Option<Arc<Ty>>, LoadError> {
        match self {
            FieldSpec::Text(text) if text.trim().is_empty() => Ok(None),
            FieldSpec::Text(text) => parse(text, context).map(Some),
            FieldSpec::Structured(node) => node.to_ty().map(Some).map_err(|source| LoadError::Type {
                context: context.into(),
                source,
            }),
        }
    }
}

impl NodeSpec {
    fn kind(&self, node: &str) -> Result<NodeKind, LoadError> {
        Ok(match self {
            NodeSpec::Literal { ty, value } => NodeKind::Literal {
                ty: parse(ty, node)?,
                value: value.clone(),
            },
            NodeSpec::Function { name } => NodeKind::Function { name: name.clone() },
            NodeSpec::Constructor { name } => NodeKind::Constructor { name: name.clone() },
            NodeSpec::Case { type_name, .. } => NodeKind::case(type_name.clone()),
            NodeSpec::List { items } => NodeKind::List { items: *items },
            NodeSpec::Local { name } => NodeKind::Local { name: name.clone() },
        })
    }
}

fn parse(source: &str, context: &str) -> Result<Arc<Ty>, LoadError> {
    parse_ty(source).map_err(|source| LoadError::Syntax {
        context: context.into(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SocketState;

    const SHAPES: &str = r#"
        [functions]
        if = "Bool -> a -> a -> a"
        area = "Shape -> Number"

        [[types]]
        name = "Shape"
        variants = [
            { constructor = "Circle", fields = ["Number"] },
            { constructor = "Square", fields = ["Number"] },
        ]

        [nodes.five]
        kind = "literal"
        type = "Number"
        value = "5"

        [nodes.c]
        kind = "constructor"
        name = "Circle"

        [nodes.measure]
        kind = "function"
        name = "area"

        [nodes.split]
        kind = "case"
        type = "Shape"
        binders = [["radius"]]

        [[links]]
        from = "five"
        to = "c"
        input = 0

        [[links]]
        from = "c"
        to = "measure"
        input = 0
        "#;

    #[test]
    fn shapes_from_toml() {
        let file = WorkspaceFile::from_toml(SHAPES).unwrap();
        assert_eq!(file.functions.len(), 2);
        assert_eq!(file.types[0].variants.len(), 2);
        assert!(matches!(file.nodes.get("split"), Some(NodeSpec::Case { .. })));

        let Loaded {
            workspace,
            nodes,
            errors,
        } = file.build().unwrap();

        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(nodes.len(), 4);

        let c = workspace.output(nodes["c"]).unwrap();
        let measure = workspace.inputs(nodes["measure"]).unwrap()[0];
        assert_eq!(workspace.type_of(c).unwrap().to_string(), "Shape");
        assert_eq!(workspace.peer(measure), Some(c));
        assert_eq!(workspace.socket_state(measure).unwrap(), &SocketState::Bound);

        let NodeKind::Case { binders, .. } = workspace.node(nodes["split"]).unwrap().kind() else {
            panic!("expected a case node");
        };

        assert_eq!(binders[0][0].as_ref(), "radius");
        assert_eq!(binders[1][0].as_ref(), "a");
    }

    #[test]
    fn type_errors_are_data() {
        let source = r#"
            [functions]
            show = "Number -> Text"

            [nodes.greeting]
            kind = "literal"
            type = "Text"
            value = "hello"

            [nodes.shown]
            kind = "function"
            name = "show"

            [[links]]
            from = "greeting"
            to = "shown"
            input = 0
            "#;

        let loaded = WorkspaceFile::from_toml(source).unwrap().build().unwrap();
        assert_eq!(loaded.errors.len(), 1);
        assert!(matches!(loaded.errors[0], TypeError::NameMismatch { .. }));
        assert_eq!(loaded.workspace.invalid_sockets().len(), 2);
    }

    #[test]
    fn structured_and_unset_fields() {
        let source = r#"
            [[types]]
            name = "Bag"
            variants = [
                { constructor = "Full", fields = [{ name = "List", args = [{ var = "a" }] }, ""] },
                { constructor = "Empty" },
            ]
            "#;

        let loaded = WorkspaceFile::from_toml(source).unwrap().build().unwrap();
        let registry = loaded.workspace.registry();
        let bag = registry.user_type("Bag").unwrap();

        assert_eq!(bag.variants[0].fields.len(), 2);
        assert!(bag.variants[0].fields[1].is_none());
        assert_eq!(
            registry.constructor_signature("Full").unwrap().to_string(),
            "List a -> b -> Bag"
        );
        assert_eq!(registry.constructor_signature("Empty").unwrap().to_string(), "Bag");
    }

    #[test]
    fn broken_descriptions_are_rejected() {
        let unknown = r#"
            [nodes.one]
            kind = "list"
            items = 1

            [[links]]
            from = "nowhere"
            to = "one"
            input = 0
            "#;

        let error = WorkspaceFile::from_toml(unknown).unwrap().build().unwrap_err();
        assert!(matches!(error, LoadError::UnknownNode(name) if name.as_ref() == "nowhere"));

        let missing = r#"
            [nodes.one]
            kind = "list"
            items = 1

            [nodes.two]
            kind = "list"
            items = 1

            [[links]]
            from = "one"
            to = "two"
            input = 3
            "#;

        let error = WorkspaceFile::from_toml(missing).unwrap().build().unwrap_err();
        assert!(matches!(error, LoadError::MissingInput { input: 3, .. }));

        let syntax = r#"
            [functions]
            broken = "Number -> -> Text"
            "#;

        let error = WorkspaceFile::from_toml(syntax).unwrap().build().unwrap_err();
        assert!(matches!(error, LoadError::Syntax { context, .. } if context.as_ref() == "broken"));

        assert!(matches!(
            WorkspaceFile::from_toml("nodes = 3"),
            Err(LoadError::Toml(_))
        ));
    }
}
