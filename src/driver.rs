//! Central plumbing between CLI commands and library functions.

use std::{fmt::Write, path::Path, sync::Arc};

use blockty::{
    config::{LoadError, Loaded, WorkspaceFile},
    doc::ToDoc,
    graph::{SocketRole, SocketState},
    symbol::StringInterner,
    ty::Ty,
    workspace::Workspace,
};
use thiserror::Error;

/// The width that printed expressions are wrapped to.
const LINE_WIDTH: usize = 80;

/// The public result type of the [`driver`] module.
///
/// [`driver`]: self
pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
    #[error("the workspace has no node named {0:?}")]
    UnknownRoot(Box<str>),
}

pub fn check(input: &Path) -> Result {
    let loaded = WorkspaceFile::load(input)?.build()?;
    print!("{}", render_check(&loaded)?);
    Ok(())
}

pub fn build(input: &Path, root: &str) -> Result {
    let loaded = WorkspaceFile::load(input)?.build()?;
    print!("{}", render_build(&loaded, root)?);
    Ok(())
}

pub fn types(input: &Path) -> Result {
    let loaded = WorkspaceFile::load(input)?.build()?;
    print!("{}", render_types(&loaded.workspace)?);
    Ok(())
}

fn render_check(loaded: &Loaded) -> Result<String> {
    let workspace = &loaded.workspace;
    let mut out = String::new();

    for (name, &id) in &loaded.nodes {
        let node = workspace.node(id).map_err(LoadError::from)?;
        writeln!(out, "{name} ({})", node.kind().label())?;

        for socket in node.sockets() {
            let ty = workspace.type_of(socket).map_err(LoadError::from)?;
            let role = match workspace.graph().socket(socket).map(|socket| socket.role) {
                Ok(SocketRole::Input(position)) => format!("in {position}"),
                _ => String::from("out"),
            };

            match workspace.socket_state(socket).map_err(LoadError::from)? {
                SocketState::Invalid(error) => writeln!(out, "  {role}: {ty} (invalid: {error})")?,
                _ => writeln!(out, "  {role}: {ty}")?,
            }
        }
    }

    for error in &loaded.errors {
        writeln!(out, "error: {error}")?;
    }

    Ok(out)
}

fn render_build(loaded: &Loaded, root: &str) -> Result<String> {
    let id = loaded
        .nodes
        .get(root)
        .copied()
        .ok_or_else(|| Error::UnknownRoot(root.into()))?;

    let workspace = &loaded.workspace;
    let output = workspace.output(id).map_err(LoadError::from)?;

    let mut interner = StringInterner::new();
    let built = workspace.build_expression(output, &mut interner);

    let mut out = String::new();
    writeln!(out, "{}", built.expr.to_doc(&mut interner).pretty(LINE_WIDTH))?;
    for error in &built.errors {
        writeln!(out, "error: {error}")?;
    }

    Ok(out)
}

fn render_types(workspace: &Workspace) -> Result<String> {
    let registry = workspace.registry();
    let mut out = String::new();

    for ty in registry.user_types() {
        let variants: Vec<String> = ty
            .variants
            .iter()
            .map(|variant| {
                std::iter::once(variant.constructor.to_string())
                    .chain(variant.fields.iter().map(|field| match field.as_deref() {
                        Some(Ty::Lit { args, .. }) if !args.is_empty() => format!("({})", field_text(field)),
                        Some(Ty::Fn { .. }) => format!("({})", field_text(field)),
                        _ => field_text(field),
                    }))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        writeln!(out, "type {} = {}", ty.name, variants.join(" | "))?;
    }

    for info in registry.constructors() {
        if let Some(signature) = registry.constructor_signature(&info.name) {
            writeln!(out, "{} : {signature}", info.name)?;
        }
    }

    for name in registry.type_names() {
        if let Some(signature) = registry.case_signature(name) {
            writeln!(out, "case {name} : {signature}")?;
        }
    }

    Ok(out)
}

fn field_text(field: &Option<Arc<Ty>>) -> String {
    match field {
        Some(ty) => ty.to_string(),
        None => String::from("_"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
        [[types]]
        name = "Shape"
        variants = [
            { constructor = "Circle", fields = ["Number"] },
            { constructor = "Blank" },
        ]

        [nodes.one]
        kind = "literal"
        type = "Number"
        value = "1"

        [nodes.c]
        kind = "constructor"
        name = "Circle"

        [[links]]
        from = "one"
        to = "c"
        input = 0
        "#;

    fn loaded() -> Loaded {
        WorkspaceFile::from_toml(SOURCE).unwrap().build().unwrap()
    }

    #[test]
    fn check_lists_every_socket() {
        let text = render_check(&loaded()).unwrap();
        assert_eq!(text, "c (Circle)\n  in 0: Number\n  out: Shape\none (1)\n  out: Number\n");
    }

    #[test]
    fn build_prints_the_expression() {
        let loaded = loaded();
        assert_eq!(render_build(&loaded, "c").unwrap(), "Circle 1\n");
        assert!(matches!(
            render_build(&loaded, "missing"),
            Err(Error::UnknownRoot(name)) if name.as_ref() == "missing"
        ));
    }

    #[test]
    fn types_lists_the_registry() {
        let text = render_types(&loaded().workspace).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines,
            [
                "type Shape = Circle Number | Blank",
                "Circle : Number -> Shape",
                "Blank : Shape",
                "case Shape : Shape -> a -> a -> a",
            ]
        );
    }
}
