//! Predicate tree model for WHERE clauses handed to the router planner.
//!
//! The tree is a closed sum type: column references, constants, bind
//! parameters, operator calls and boolean combinations. Nothing in this
//! crate mutates a tree; the helpers in [`clauses`] only inspect it.


pub mod clauses;

use common::{ColumnId, RangeTableIndex};
use serde::{Deserialize, Serialize};
use std::fmt;
use types::Value;

pub use clauses::{contains_false_clause, make_ands_implicit};

/// Reference to a column of a range-table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Range-table slot the column belongs to.
    pub slot: RangeTableIndex,
    /// Ordinal of the column in that table's schema.
    pub column: ColumnId,
}

impl ColumnRef {
    pub fn new(slot: RangeTableIndex, column: ColumnId) -> Self {
        Self { slot, column }
    }
}

/// Literal operand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub value: Value,
}

impl Constant {
    /// True for a non-null boolean `false`, the only constant that makes an
    /// implicit-AND list unsatisfiable on its own.
    pub fn is_false(&self) -> bool {
        self.value.as_bool() == Some(false)
    }

    /// True for a non-null boolean `true`.
    pub fn is_true(&self) -> bool {
        self.value.as_bool() == Some(true)
    }
}

/// Bind parameter of a prepared statement (`$1`, `$2`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamRef {
    pub id: u32,
}

/// Operator or function identity of an [`OpExpr`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    Like,
    /// Any other operator or function, identified by name.
    Named(String),
}

impl Operator {
    /// Whether the operator is the equality member of its operator family.
    pub fn implements_equality(&self) -> bool {
        matches!(self, Operator::Eq)
    }

    fn symbol(&self) -> Option<&'static str> {
        Some(match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Concat => "||",
            Operator::Like => "LIKE",
            Operator::Named(_) => return None,
        })
    }
}

/// How stable an operator's result is across calls with equal inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Volatility {
    /// Same inputs always give the same output.
    #[default]
    Immutable,
    /// Stable within a single statement (e.g. `now()`).
    Stable,
    /// May change between calls or have side effects (e.g. `random()`).
    Volatile,
}

/// Operator or function call with its arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpExpr {
    pub op: Operator,
    pub args: Vec<Expr>,
    pub volatility: Volatility,
}

impl OpExpr {
    pub fn is_volatile(&self) -> bool {
        self.volatility == Volatility::Volatile
    }
}

/// Boolean connective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

/// Boolean combination of child predicates. `Not` has exactly one child.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoolExpr {
    pub op: BoolOp,
    pub args: Vec<Expr>,
}

/// Predicate tree node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Column(ColumnRef),
    Const(Constant),
    Param(ParamRef),
    Op(OpExpr),
    Bool(BoolExpr),
}

impl Expr {
    pub fn column(slot: RangeTableIndex, column: ColumnId) -> Self {
        Expr::Column(ColumnRef::new(slot, column))
    }

    pub fn literal(value: Value) -> Self {
        Expr::Const(Constant { value })
    }

    pub fn param(id: u32) -> Self {
        Expr::Param(ParamRef { id })
    }

    /// Immutable binary operator call.
    pub fn binary(left: Expr, op: Operator, right: Expr) -> Self {
        Expr::Op(OpExpr {
            op,
            args: vec![left, right],
            volatility: Volatility::Immutable,
        })
    }

    /// Call of an arbitrary named function.
    pub fn call(name: &str, args: Vec<Expr>, volatility: Volatility) -> Self {
        Expr::Op(OpExpr {
            op: Operator::Named(name.to_string()),
            args,
            volatility,
        })
    }

    pub fn and(args: Vec<Expr>) -> Self {
        Expr::Bool(BoolExpr {
            op: BoolOp::And,
            args,
        })
    }

    pub fn or(args: Vec<Expr>) -> Self {
        Expr::Bool(BoolExpr {
            op: BoolOp::Or,
            args,
        })
    }

    pub fn not(arg: Expr) -> Self {
        Expr::Bool(BoolExpr {
            op: BoolOp::Not,
            args: vec![arg],
        })
    }

    /// Direct children of this node, in argument order.
    pub fn children(&self) -> &[Expr] {
        match self {
            Expr::Op(op) => &op.args,
            Expr::Bool(b) => &b.args,
            Expr::Column(_) | Expr::Const(_) | Expr::Param(_) => &[],
        }
    }

    /// Pre-order iterator over every node of the tree, this one included.
    ///
    /// Uses an explicit stack, so arbitrarily deep trees are walked without
    /// recursion.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes { stack: vec![self] }
    }

    /// Every column reference in the tree, in pre-order, duplicates kept.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnRef> {
        self.nodes().filter_map(|node| match node {
            Expr::Column(col) => Some(col),
            _ => None,
        })
    }

    /// True if the tree references no columns and calls nothing volatile,
    /// i.e. it evaluates to one value for the whole statement.
    pub fn is_pseudo_constant(&self) -> bool {
        self.nodes().all(|node| match node {
            Expr::Column(_) => false,
            Expr::Op(op) => !op.is_volatile(),
            Expr::Const(_) | Expr::Param(_) | Expr::Bool(_) => true,
        })
    }
}

/// Iterator returned by [`Expr::nodes`].
pub struct Nodes<'a> {
    stack: Vec<&'a Expr>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Expr;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "r{}.c{}", c.slot.0, c.column),
            Expr::Const(c) => write!(f, "{}", c.value),
            Expr::Param(p) => write!(f, "${}", p.id),
            Expr::Op(op) => match (op.op.symbol(), op.args.as_slice()) {
                (Some(sym), [l, r]) => write!(f, "({l} {sym} {r})"),
                (sym, args) => {
                    let name = match (&op.op, sym) {
                        (Operator::Named(name), _) => name.as_str(),
                        (_, Some(sym)) => sym,
                        (_, None) => "?",
                    };
                    write!(f, "{name}({})", join(args, ", "))
                }
            },
            Expr::Bool(b) => match b.op {
                BoolOp::And => write!(f, "({})", join(&b.args, " AND ")),
                BoolOp::Or => write!(f, "({})", join(&b.args, " OR ")),
                BoolOp::Not => write!(f, "NOT {}", join(&b.args, ", ")),
            },
        }
    }
}

fn join(args: &[Expr], sep: &str) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}
