//! Pretty-printing.

use std::collections::HashMap;

use pretty::RcDoc;

use crate::{
    symbol::{StringInterner, Symbol},
    ty::{Ty, TyVar},
};

pub trait ToDoc {
    /// Whatever is needed to turn identifiers back into text.
    type Context;

    fn to_doc(&self, cx: &mut Self::Context) -> RcDoc<'static, ()>;
}

impl ToDoc for Symbol {
    type Context = StringInterner;

    fn to_doc(&self, interner: &mut StringInterner) -> RcDoc<'static, ()> {
        match interner.resolve(*self) {
            Some(str) => RcDoc::as_string(str),
            None => RcDoc::text("<?>"),
        }
    }
}

/// Display names for type variables, assigned in order of first use.
///
/// The first 26 variables are named `a` through `z`, after which the letters
/// repeat with a numeric suffix (`a1`, `b1`, ...).
#[derive(Debug, Clone, Default)]
pub struct VarNames {
    names: HashMap<TyVar, Box<str>>,
}

impl VarNames {
    pub fn name(&mut self, var: TyVar) -> Box<str> {
        let next = self.names.len();
        self.names
            .entry(var)
            .or_insert_with(|| Self::nth_name(next))
            .clone()
    }

    pub fn nth_name(n: usize) -> Box<str> {
        let letter = char::from(b'a' + (n % 26) as u8);
        match n / 26 {
            0 => letter.to_string().into(),
            round => format!("{letter}{round}").into(),
        }
    }
}

impl ToDoc for Ty {
    type Context = VarNames;

    fn to_doc(&self, names: &mut VarNames) -> RcDoc<'static, ()> {
        match self {
            Ty::Var(var) => RcDoc::as_string(names.name(*var)),
            Ty::Lit { name, args } if args.is_empty() => {
                RcDoc::as_string(name.to_string())
            }
            Ty::Lit { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| match arg.as_ref() {
                        Ty::Var(_) => arg.to_doc(names),
                        Ty::Lit { args, .. } if args.is_empty() => arg.to_doc(names),
                        _ => parens(arg.to_doc(names)),
                    })
                    .collect::<Vec<_>>();

                RcDoc::as_string(name.to_string())
                    .append(RcDoc::space())
                    .append(RcDoc::intersperse(args, RcDoc::space()))
            }
            Ty::Fn { domain, codomain } => {
                let domain = match domain.as_ref() {
                    Ty::Fn { .. } => parens(domain.to_doc(names)),
                    _ => domain.to_doc(names),
                };

                domain
                    .append(RcDoc::text(" ->"))
                    .append(RcDoc::line())
                    .append(codomain.to_doc(names))
                    .group()
            }
        }
    }
}

fn parens(doc: RcDoc<'static, ()>) -> RcDoc<'static, ()> {
    RcDoc::text("(").append(doc).append(RcDoc::text(")"))
}
