//! Indented debug rendering of expression trees.
//!
//! A [`Printable`] is a small tree of text leaves, each carrying an indent
//! relative to its parent. Flattening it produces one line per leaf. The
//! evaluator never looks at this; it exists for diagnostics only.

use crate::ast::{Expr, Literal};

const INDENT: &str = "  ";

/// A renderable tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Printable {
    /// A single line of text, indented `indent` levels past its parent.
    Leaf { indent: usize, text: String },
    /// A sequence of children, all shifted `indent` levels past the parent.
    Group { indent: usize, children: Vec<Printable> },
}

impl Printable {
    pub fn leaf(indent: usize, text: impl Into<String>) -> Self {
        Printable::Leaf {
            indent,
            text: text.into(),
        }
    }

    pub fn group(indent: usize, children: Vec<Printable>) -> Self {
        Printable::Group { indent, children }
    }

    /// Shift this node `by` additional levels.
    pub fn indented(mut self, by: usize) -> Self {
        match &mut self {
            Printable::Leaf { indent, .. } | Printable::Group { indent, .. } => *indent += by,
        }
        self
    }

    /// Flatten into indented lines.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect(0, &mut out);
        out
    }

    /// Flatten into a single newline-separated string.
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }

    fn collect(&self, depth: usize, out: &mut Vec<String>) {
        match self {
            Printable::Leaf { indent, text } => {
                out.push(format!("{}{text}", INDENT.repeat(depth + indent)));
            }
            Printable::Group { indent, children } => {
                for child in children {
                    child.collect(depth + indent, out);
                }
            }
        }
    }
}

impl Expr {
    /// Build the debug tree for this expression.
    pub fn printable(&self) -> Printable {
        use Printable as P;
        match self {
            Expr::Literal(lit) => P::leaf(0, literal_label(lit)),
            Expr::Var(name) => P::leaf(0, format!("var {name}")),
            Expr::Op { op, args } => {
                let mut children = vec![P::leaf(0, format!("Op<{op}>"))];
                children.extend(args.iter().map(|a| a.printable().indented(1)));
                P::group(0, children)
            }
            Expr::Tuple(items) => {
                let mut children = vec![P::leaf(0, "Tuple")];
                children.extend(items.iter().map(|a| a.printable().indented(1)));
                P::group(0, children)
            }
            Expr::IsZero(inner) => P::group(
                0,
                vec![P::leaf(0, "IsZero:"), inner.printable().indented(1)],
            ),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => P::group(
                0,
                vec![
                    P::leaf(0, "If:"),
                    P::leaf(1, "Cond"),
                    cond.printable().indented(2),
                    P::leaf(1, "Then"),
                    then_branch.printable().indented(2),
                    P::leaf(1, "Else"),
                    else_branch.printable().indented(2),
                ],
            ),
            Expr::Let { bindings, body } => {
                let mut children = vec![P::leaf(0, "Let:")];
                for (name, value) in bindings {
                    children.push(P::leaf(1, format!("{name} =")));
                    children.push(value.printable().indented(2));
                }
                children.push(P::leaf(1, "in:"));
                children.push(body.printable().indented(2));
                P::group(0, children)
            }
            Expr::LetRec { procs, body } => {
                let mut children = vec![P::leaf(0, "LetRec:")];
                for (name, proc) in procs {
                    let header = format!("{name} ({}) =", proc.params.join(", "));
                    children.push(P::leaf(1, header));
                    children.push(proc.body.printable().indented(2));
                }
                children.push(P::leaf(1, "in:"));
                children.push(body.printable().indented(2));
                P::group(0, children)
            }
            Expr::Proc(proc) => {
                let header = match &proc.name {
                    Some(name) => format!("Proc {name} ({}) =", proc.params.join(", ")),
                    None => format!("Proc ({}) =", proc.params.join(", ")),
                };
                P::group(
                    0,
                    vec![P::leaf(0, header), proc.body.printable().indented(1)],
                )
            }
            Expr::Call { operator, args } => {
                let mut children = vec![
                    P::leaf(0, "Call"),
                    P::leaf(1, "Operator"),
                    operator.printable().indented(2),
                    P::leaf(1, "Args"),
                ];
                children.extend(args.iter().map(|a| a.printable().indented(2)));
                P::group(0, children)
            }
            Expr::NewRef(inner) => P::group(
                0,
                vec![P::leaf(0, "NewRef:"), inner.printable().indented(1)],
            ),
            Expr::RefVar(name) => P::leaf(0, format!("RefVar: {name}")),
            Expr::Deref(inner) => P::group(
                0,
                vec![P::leaf(0, "DeRef:"), inner.printable().indented(1)],
            ),
            Expr::SetRef { target, value } => P::group(
                0,
                vec![
                    P::leaf(0, "SetRef:"),
                    P::leaf(1, "Ref:"),
                    target.printable().indented(2),
                    P::leaf(1, "Value:"),
                    value.printable().indented(2),
                ],
            ),
            Expr::Block(exprs) => {
                let mut children = vec![P::leaf(0, "Begin:")];
                children.extend(exprs.iter().map(|e| e.printable().indented(1)));
                P::group(0, children)
            }
            Expr::Assign { name, value } => P::group(
                0,
                vec![
                    P::leaf(0, format!("Assign: {name} =")),
                    value.printable().indented(1),
                ],
            ),
            Expr::Lazy(inner) => P::group(
                0,
                vec![P::leaf(0, "Lazy:"), inner.printable().indented(1)],
            ),
            Expr::Force(inner) => P::group(
                0,
                vec![P::leaf(0, "Force:"), inner.printable().indented(1)],
            ),
            Expr::Try { body, var, handler } => P::group(
                0,
                vec![
                    P::leaf(0, "Try:"),
                    body.printable().indented(1),
                    P::leaf(1, format!("Catch ({var}):")),
                    handler.printable().indented(2),
                ],
            ),
            Expr::Raise(inner) => P::group(
                0,
                vec![P::leaf(0, "Raise:"), inner.printable().indented(1)],
            ),
        }
    }
}

fn literal_label(lit: &Literal) -> String {
    match lit {
        Literal::Int(n) => format!("Lit {n}"),
        Literal::Bool(b) => format!("Lit {b}"),
    }
}
