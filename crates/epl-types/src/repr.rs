//! One-line concrete-syntax rendering of expressions.

use crate::ast::{Expr, Literal, Procedure};
use std::fmt;

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc ({}) {}", self.params.join(", "), self.body)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Op { op, args } => {
                write!(f, "{op}(")?;
                write_list(f, args, ", ")?;
                write!(f, ")")
            }
            Expr::Tuple(items) => {
                write!(f, "tuple(")?;
                write_list(f, items, ", ")?;
                write!(f, ")")
            }
            Expr::IsZero(inner) => write!(f, "isz({inner})"),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "if {cond} then {then_branch} else {else_branch}"),
            Expr::Let { bindings, body } => {
                write!(f, "let")?;
                for (name, value) in bindings {
                    write!(f, " {name} = {value}")?;
                }
                write!(f, " in {body}")
            }
            Expr::LetRec { procs, body } => {
                write!(f, "letrec")?;
                for (name, proc) in procs {
                    write!(f, " {name}({}) = {}", proc.params.join(", "), proc.body)?;
                }
                write!(f, " in {body}")
            }
            Expr::Proc(proc) => write!(f, "{proc}"),
            Expr::Call { operator, args } => {
                write!(f, "({operator}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
            Expr::NewRef(inner) => write!(f, "newref({inner})"),
            Expr::RefVar(name) => write!(f, "ref {name}"),
            Expr::Deref(inner) => write!(f, "deref({inner})"),
            Expr::SetRef { target, value } => write!(f, "setref({target}, {value})"),
            Expr::Block(exprs) => {
                write!(f, "begin ")?;
                write_list(f, exprs, "; ")?;
                write!(f, " end")
            }
            Expr::Assign { name, value } => write!(f, "set {name} = {value}"),
            Expr::Lazy(inner) => write!(f, "lazy({inner})"),
            Expr::Force(inner) => write!(f, "force({inner})"),
            Expr::Try { body, var, handler } => write!(f, "try {body} catch ({var}) {handler}"),
            Expr::Raise(inner) => write!(f, "raise {inner}"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arithmetic() {
        let inner = Expr::op("-", ["x".into(), Expr::int(3)]);
        let e = Expr::op("-", [inner, Expr::var("v")]);
        assert_eq!(e.to_string(), "-(-(x, 3), v)");
    }

    #[test]
    fn test_let_and_if() {
        let e = Expr::let_in(
            [("x", Expr::int(5))],
            Expr::if_then_else(Expr::is_zero("x"), true, false),
        );
        assert_eq!(e.to_string(), "let x = 5 in if isz(x) then true else false");
    }

    #[test]
    fn test_procedures_and_calls() {
        let e = Expr::letrec(
            [("f", Procedure::new(["x", "y"], Expr::op("-", ["x", "y"])))],
            Expr::call("f", [1, 2]),
        );
        assert_eq!(e.to_string(), "letrec f(x, y) = -(x, y) in (f 1 2)");
        assert_eq!(Expr::proc(["z"], 11).to_string(), "proc (z) 11");
    }

    #[test]
    fn test_state_forms() {
        let e = Expr::block([
            Expr::setref("r", Expr::deref("r")),
            Expr::assign("x", Expr::newref(0)),
            Expr::call("swap", [Expr::ref_var("a"), Expr::ref_var("b")]),
        ]);
        assert_eq!(
            e.to_string(),
            "begin setref(r, deref(r)); set x = newref(0); (swap ref a ref b) end"
        );
    }

    #[test]
    fn test_lazy_and_exceptions() {
        assert_eq!(
            Expr::force(Expr::lazy(Expr::tuple([1, 2]))).to_string(),
            "force(lazy(tuple(1, 2)))"
        );
        assert_eq!(
            Expr::try_catch(Expr::raise(5), "e", "e").to_string(),
            "try raise 5 catch (e) e"
        );
    }
}
