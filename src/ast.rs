//! Syntax tree of graph scripts.
//!
//! A script is a list of statements: `let` bindings naming intermediate
//! nodes and `output` statements selecting the node a shader stage returns.

use std::ops::Range;

use crate::builder::Stage;
use crate::nodes::Op;

pub type Span = Range<usize>;

#[derive(Debug, Clone)]
pub struct Script {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum Statement {
    /// `let name = value;`
    Let { name: String, value: Expr, span: Span },
    /// `output fragment = value;`
    Output { stage: Stage, value: Expr, span: Span },
    /// Expression evaluated for its side effects, e.g. `acc.addAssign(1.0);`
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Number(f64),
    Bool(bool),
    String(String),
    Ident(String),
    /// `object.name`; `name` may be numeric (`m.2`).
    Member { object: Box<Expr>, name: String },
    /// `callee(args)`; the callee is an identifier or a member.
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Equal,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    /// Precedence level (higher binds tighter).
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Equal => 3,
            BinOp::Less | BinOp::Greater | BinOp::LessEqual | BinOp::GreaterEqual => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 6,
        }
    }

    /// Graph operator the binary expression builds.
    pub fn op(self) -> Op {
        match self {
            BinOp::Or => Op::Or,
            BinOp::And => Op::And,
            BinOp::Equal => Op::Equal,
            BinOp::Less => Op::Less,
            BinOp::Greater => Op::Greater,
            BinOp::LessEqual => Op::LessEqual,
            BinOp::GreaterEqual => Op::GreaterEqual,
            BinOp::Add => Op::Add,
            BinOp::Sub => Op::Sub,
            BinOp::Mul => Op::Mul,
            BinOp::Div => Op::Div,
            BinOp::Rem => Op::Rem,
        }
    }
}
