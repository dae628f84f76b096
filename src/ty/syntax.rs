//! Concrete syntax for type expressions.
//!
//! ```text
//! ty   := app ("->" ty)?
//! app  := NAME atom* | atom
//! atom := VAR | NAME | "(" ty ")"
//! ```
//!
//! A `NAME` begins with an uppercase letter or an underscore, and a `VAR`
//! begins with a lowercase letter. Every occurrence of the same variable
//! name within one call to [`parse_ty`] denotes the same fresh [`TyVar`].
//!
//! [`TyVar`]: super::TyVar

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use winnow::{
    PResult, Parser,
    ascii::multispace0,
    combinator::{alt, cut_err, delimited, opt, preceded, repeat, terminated},
    error::{StrContext, StrContextValue},
    token::take_while,
};

use super::Ty;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at offset {offset} in {input:?})")]
pub struct SyntaxError {
    input: Box<str>,
    offset: usize,
    message: String,
}

impl SyntaxError {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Parses a type expression, giving each distinct variable name a fresh
/// variable.
pub fn parse_ty(input: &str) -> Result<Arc<Ty>, SyntaxError> {
    let mut parser = terminated(ty, multispace0);

    match parser.parse(input) {
        Ok(ast) => Ok(ast.lower(&mut HashMap::new())),
        Err(error) => {
            let raw_message = error.inner().to_string();
            let message = match raw_message.split_once('\n') {
                Some((lhs, _)) => String::from(lhs),
                None if raw_message.is_empty() => String::from("invalid type"),
                None => raw_message,
            };

            Err(SyntaxError {
                input: input.into(),
                offset: error.offset(),
                message,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TyAst<'s> {
    Var(&'s str),
    Lit(&'s str, Vec<TyAst<'s>>),
    Fn(Box<TyAst<'s>>, Box<TyAst<'s>>),
}

impl<'s> TyAst<'s> {
    fn lower(self, vars: &mut HashMap<&'s str, Arc<Ty>>) -> Arc<Ty> {
        match self {
            TyAst::Var(name) => vars.entry(name).or_insert_with(Ty::var).clone(),
            TyAst::Lit(name, args) => {
                let args: Vec<_> = args.into_iter().map(|arg| arg.lower(vars)).collect();
                Ty::lit_with(name, args)
            }
            TyAst::Fn(domain, codomain) => {
                let domain = domain.lower(vars);
                Ty::func(domain, codomain.lower(vars))
            }
        }
    }
}

fn ty<'s>(input: &mut &'s str) -> PResult<TyAst<'s>> {
    let head = app.parse_next(input)?;
    let tail = opt(preceded((multispace0, "->"), cut_err(ty))).parse_next(input)?;

    Ok(match tail {
        Some(codomain) => TyAst::Fn(Box::new(head), Box::new(codomain)),
        None => head,
    })
}

fn app<'s>(input: &mut &'s str) -> PResult<TyAst<'s>> {
    alt((applied, atom)).parse_next(input)
}

fn applied<'s>(input: &mut &'s str) -> PResult<TyAst<'s>> {
    (name, repeat(0.., atom))
        .map(|(name, args): (&'s str, Vec<TyAst<'s>>)| TyAst::Lit(name, args))
        .parse_next(input)
}

fn atom<'s>(input: &mut &'s str) -> PResult<TyAst<'s>> {
    alt((
        var.map(TyAst::Var),
        name.map(|name| TyAst::Lit(name, Vec::new())),
        delimited(
            (multispace0, "("),
            cut_err(ty),
            cut_err((multispace0, ")"))
                .context(StrContext::Expected(StrContextValue::CharLiteral(')'))),
        ),
    ))
    .context(StrContext::Label("type"))
    .parse_next(input)
}

fn name<'s>(input: &mut &'s str) -> PResult<&'s str> {
    ident
        .verify(|s: &str| s.starts_with(|c: char| c.is_uppercase() || c == '_'))
        .parse_next(input)
}

fn var<'s>(input: &mut &'s str) -> PResult<&'s str> {
    ident
        .verify(|s: &str| s.starts_with(char::is_lowercase))
        .parse_next(input)
}

fn ident<'s>(input: &mut &'s str) -> PResult<&'s str> {
    preceded(
        multispace0,
        take_while(1.., |c: char| c.is_alphanumeric() || c == '_'),
    )
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ast_shapes() {
        let mut input = "List (Maybe a) -> b";
        let ast = ty(&mut input).unwrap();

        assert_eq!(
            ast,
            TyAst::Fn(
                Box::new(TyAst::Lit(
                    "List",
                    vec![TyAst::Lit("Maybe", vec![TyAst::Var("a")])]
                )),
                Box::new(TyAst::Var("b")),
            )
        );
        assert!(input.is_empty());
    }

    #[test]
    fn arrows_associate_to_the_right() {
        let ty = parse_ty("a -> b -> c").unwrap();
        assert_eq!(ty.arity(), 2);

        let ty = parse_ty("(a -> b) -> c").unwrap();
        assert_eq!(ty.arity(), 1);
        assert_eq!(ty.to_string(), "(a -> b) -> c");
    }

    #[test]
    fn variable_names_are_shared() {
        let ty = parse_ty("a -> b -> a").unwrap();
        let (params, result) = ty.uncurry();

        assert_eq!(params[0], result);
        assert_ne!(params[0], params[1]);

        // separate parses never share variables
        let other = parse_ty("a").unwrap();
        assert!(!ty.occurs(other.as_var().unwrap()));
    }

    #[test]
    fn printing_round_trips() {
        let sources = [
            "Number",
            "Bool -> a -> a -> a",
            "List (Pair a Text) -> Maybe a",
            "(a -> b) -> List a -> List b",
            "_Hidden",
        ];

        for src in sources {
            let parsed = parse_ty(src).unwrap();
            assert_eq!(parsed.to_string(), src);
            assert!(parse_ty(&parsed.to_string()).unwrap().alpha_eq(&parsed));
        }
    }

    #[test]
    fn whitespace_is_insignificant() {
        let spaced = parse_ty("  List   a->Number  ").unwrap();
        assert_eq!(spaced.to_string(), "List a -> Number");
    }

    #[test]
    fn malformed_types() {
        assert!(parse_ty("").is_err());
        assert!(parse_ty("Number ->").is_err());
        assert!(parse_ty("(Number").is_err());
        assert!(parse_ty("Number)").is_err());
        assert!(parse_ty("-> Number").is_err());

        let error = parse_ty("Number -> ").unwrap_err();
        assert!(error.offset() >= 9);
    }
}
