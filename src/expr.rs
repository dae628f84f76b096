//! Typed expression trees built from connected nodes.
//!
//! Every expression carries a [`Tagged`] back-reference to the socket it was
//! derived from. Tags are only used to attribute diagnostics to a place in
//! the graph; an expression never owns or keeps alive the socket it names.

use std::sync::Arc;

use pretty::RcDoc;
use recursion::{Collapsible, CollapsibleExt, MappableFrame, PartiallyApplied};

use crate::{
    doc::{ToDoc, VarNames},
    graph::SocketId,
    symbol::{StringInterner, Symbol},
    ty::Ty,
};

pub mod build;

pub use build::{Built, ExprBuilder};

/// The placeholder for a missing subexpression.
pub const UNDEF: &str = "undef";
/// The combinator applied to the items of a list builder.
pub const LIST: &str = "list";

/// A value annotated with the socket it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagged<T> {
    item: T,
    tag: Option<SocketId>,
}

impl<T> Tagged<T> {
    pub fn new(item: T, tag: Option<SocketId>) -> Self {
        Self { item, tag }
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn tag(&self) -> Option<SocketId> {
        self.tag
    }

    pub fn unwrap(self) -> T {
        self.item
    }

    pub fn as_ref(&self) -> Tagged<&T> {
        Tagged {
            item: &self.item,
            tag: self.tag,
        }
    }

    pub fn retag(self, tag: Option<SocketId>) -> Self {
        Self { tag, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Var(Symbol),
    Lit(Symbol),
    App(Box<Tagged<Expr>>, Box<Tagged<Expr>>),
    /// Binds a pattern variable of the given type in `body`.
    Let {
        name: Symbol,
        annotation: Arc<Ty>,
        body: Box<Tagged<Expr>>,
    },
}

impl Expr {
    /// Applies `func` to each of `args` in turn, giving `func a0 a1 ... an`.
    /// The intermediate applications carry the tag of `func`.
    pub fn app_func(args: impl IntoIterator<Item = Tagged<Expr>>, func: Tagged<Expr>) -> Tagged<Expr> {
        args.into_iter().fold(func, |callee, arg| {
            let tag = callee.tag;
            Tagged::new(Expr::App(Box::new(callee), Box::new(arg)), tag)
        })
    }

    /// Returns `true` if this is the placeholder for a missing expression.
    pub fn is_undef(&self, interner: &StringInterner) -> bool {
        matches!(self, Expr::Var(sym) if interner.resolve(*sym) == Some(UNDEF))
    }
}

impl Tagged<Expr> {
    /// Calls `f` on every node of the tree, parents before children.
    pub fn visit(&self, f: &mut impl FnMut(&Tagged<Expr>)) {
        f(self);
        match &self.item {
            Expr::Var(_) | Expr::Lit(_) => (),
            Expr::App(callee, arg) => {
                callee.visit(f);
                arg.visit(f);
            }
            Expr::Let { body, .. } => body.visit(f),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprFrame<A> {
    Var(Symbol),
    Lit(Symbol),
    App(A, A),
    Let {
        name: Symbol,
        annotation: Arc<Ty>,
        body: A,
    },
}

impl MappableFrame for ExprFrame<PartiallyApplied> {
    type Frame<X> = ExprFrame<X>;

    fn map_frame<A, B>(input: Self::Frame<A>, mut f: impl FnMut(A) -> B) -> Self::Frame<B> {
        match input {
            ExprFrame::Var(sym) => ExprFrame::Var(sym),
            ExprFrame::Lit(sym) => ExprFrame::Lit(sym),
            ExprFrame::App(callee, arg) => {
                let callee = f(callee);
                ExprFrame::App(callee, f(arg))
            }
            ExprFrame::Let {
                name,
                annotation,
                body,
            } => ExprFrame::Let {
                name,
                annotation,
                body: f(body),
            },
        }
    }
}

impl<'a> Collapsible for &'a Tagged<Expr> {
    type FrameToken = ExprFrame<PartiallyApplied>;

    fn into_frame(self) -> <Self::FrameToken as MappableFrame>::Frame<Self> {
        match &self.item {
            Expr::Var(sym) => ExprFrame::Var(*sym),
            Expr::Lit(sym) => ExprFrame::Lit(*sym),
            Expr::App(callee, arg) => ExprFrame::App(&**callee, &**arg),
            Expr::Let {
                name,
                annotation,
                body,
            } => ExprFrame::Let {
                name: *name,
                annotation: annotation.clone(),
                body: &**body,
            },
        }
    }
}

/// How tightly a printed expression binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prec {
    Atom,
    App,
    Let,
}

type PrecDoc = (RcDoc<'static, ()>, Prec);

impl ExprFrame<PrecDoc> {
    fn into_doc(self, interner: &mut StringInterner, names: &mut VarNames) -> PrecDoc {
        match self {
            ExprFrame::Var(sym) | ExprFrame::Lit(sym) => (sym.to_doc(interner), Prec::Atom),
            ExprFrame::App((callee, callee_prec), (arg, arg_prec)) => {
                let callee = match callee_prec {
                    Prec::Let => parens(callee),
                    _ => callee,
                };

                let arg = match arg_prec {
                    Prec::Atom => arg,
                    _ => parens(arg),
                };

                let doc = callee.append(RcDoc::line()).append(arg).nest(2).group();
                (doc, Prec::App)
            }
            ExprFrame::Let {
                name,
                annotation,
                body: (body, _),
            } => {
                let doc = RcDoc::text("let")
                    .append(RcDoc::space())
                    .append(name.to_doc(interner))
                    .append(RcDoc::text(" : "))
                    .append(annotation.to_doc(names))
                    .append(RcDoc::text(" in"))
                    .append(RcDoc::line())
                    .append(body)
                    .group();

                (doc, Prec::Let)
            }
        }
    }
}

fn parens(doc: RcDoc<'static, ()>) -> RcDoc<'static, ()> {
    RcDoc::text("(").append(doc).append(RcDoc::text(")"))
}

impl ToDoc for Tagged<Expr> {
    type Context = StringInterner;

    fn to_doc(&self, interner: &mut StringInterner) -> RcDoc<'static, ()> {
        let mut names = VarNames::default();
        let (doc, _) = self.collapse_frames(|frame| frame.into_doc(interner, &mut names));
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(interner: &mut StringInterner, name: &str) -> Tagged<Expr> {
        Tagged::new(Expr::Var(interner.intern(name)), None)
    }

    fn print(expr: &Tagged<Expr>, interner: &mut StringInterner) -> String {
        expr.to_doc(interner).pretty(80).to_string()
    }

    #[test]
    fn applications_associate_to_the_left() {
        let mut interner = StringInterner::new();
        let f = var(&mut interner, "f");
        let x = var(&mut interner, "x");
        let y = var(&mut interner, "y");

        let expr = Expr::app_func([x, y], f);
        assert!(matches!(expr.item(), Expr::App(callee, _) if matches!(callee.item(), Expr::App(..))));
        assert_eq!(print(&expr, &mut interner), "f x y");
    }

    #[test]
    fn nested_arguments_are_parenthesized() {
        let mut interner = StringInterner::new();
        let g = var(&mut interner, "g");
        let x = var(&mut interner, "x");
        let f = var(&mut interner, "f");

        let inner = Expr::app_func([x], g);
        let expr = Expr::app_func([inner], f);
        assert_eq!(print(&expr, &mut interner), "f (g x)");
    }

    #[test]
    fn let_bindings() {
        let mut interner = StringInterner::new();
        let a = interner.intern("a");
        let body = var(&mut interner, "a");
        let f = var(&mut interner, "f");

        let binding = Tagged::new(
            Expr::Let {
                name: a,
                annotation: Ty::lit("Number"),
                body: Box::new(body),
            },
            None,
        );

        assert_eq!(print(&binding, &mut interner), "let a : Number in a");

        let expr = Expr::app_func([binding], f);
        assert_eq!(print(&expr, &mut interner), "f (let a : Number in a)");
    }

    #[test]
    fn tags_survive_application() {
        let mut interner = StringInterner::new();
        let f = var(&mut interner, "f");
        let x = var(&mut interner, "x");
        let expr = Expr::app_func([x], f.clone());
        assert_eq!(expr.tag(), f.tag());

        let mut count = 0;
        expr.visit(&mut |_| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn undef_placeholders() {
        let mut interner = StringInterner::new();
        let hole = var(&mut interner, UNDEF);
        let other = var(&mut interner, "x");

        assert!(hole.item().is_undef(&interner));
        assert!(!other.item().is_undef(&interner));
    }
}
