//! Typed intermediate representation.
//!
//! Mirrors `ast`'s shape, but every expression carries its resolved `Type`,
//! every name its resolved `Entity`, implicit conversions are made explicit
//! nodes, and aggregates are expanded to per-component assignments. This is
//! what `codegen` lowers to textual low-level IR.

use crate::ast::{BinOp, ParamMode, UnOp};
use crate::lexer::Span;
use crate::types::{Entity, Type};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Unit {
    pub name: String,
    pub kind: UnitKind,
}

#[derive(Debug, Clone)]
pub enum UnitKind {
    Package { elaboration: Vec<Stmt> },
    Subprogram(Subprogram),
}

#[derive(Debug, Clone)]
pub struct Subprogram {
    pub name: String,
    pub mangled_name: String,
    pub params: Vec<IrParam>,
    pub result: Option<Type>,
    pub body: Vec<Stmt>,
    pub is_entry: bool,
}

#[derive(Debug, Clone)]
pub struct IrParam {
    pub name: String,
    pub ty: Type,
    pub mode: ParamMode,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Assign {
        target: Expr,
        value: Expr,
    },
    If {
        arms: Vec<(Expr, Vec<Stmt>)>,
        else_branch: Vec<Stmt>,
    },
    Case {
        selector: Expr,
        arms: Vec<(Vec<i128>, Vec<Stmt>)>,
        others: Option<Vec<Stmt>>,
    },
    Loop {
        label: Option<String>,
        kind: LoopKind,
        body: Vec<Stmt>,
    },
    Exit {
        label: Option<String>,
        when: Option<Expr>,
    },
    Return {
        value: Option<Expr>,
    },
    Raise {
        exception_identity: u64,
    },
    Reraise,
    Block {
        locals: Vec<LocalDecl>,
        body: Vec<Stmt>,
        handlers: Vec<Handler>,
    },
    Call {
        target: Rc<Entity>,
        args: Vec<Expr>,
    },
    EntryCall {
        task: String,
        entry_id: u32,
        args: Vec<Expr>,
    },
    Accept {
        entry_id: u32,
        params: Vec<IrParam>,
        body: Vec<Stmt>,
    },
    Select {
        arms: Vec<SelectArm>,
        else_branch: Option<Vec<Stmt>>,
    },
    Delay {
        seconds: Expr,
    },
    Goto(String),
    Label(String),
    Null,
}

#[derive(Debug, Clone)]
pub enum LoopKind {
    Plain,
    While(Expr),
    For { var: String, lo: Expr, hi: Expr, reverse: bool },
}

#[derive(Debug, Clone)]
pub struct SelectArm {
    pub guard: Option<Expr>,
    pub entry_id: u32,
    pub params: Vec<IrParam>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub name: String,
    pub ty: Type,
    pub init: Option<Expr>,
    /// Whether this declaration requires secondary-stack allocation: true
    /// for unconstrained-array objects sized by their initializer.
    pub on_secondary_stack: bool,
}

#[derive(Debug, Clone)]
pub struct Handler {
    pub identities: Vec<u64>,
    pub body: Vec<Stmt>,
}

/// A checked operation, tagged with the check it implies so codegen can
/// suppress it under `pragma Suppress` without re-deriving which check a
/// given IR node represents.
///
/// `Range` and `Discriminant` carry the static bounds/value the check
/// compares against — both are known at type-check time from the target
/// type or variant arm. `Index` and `Overflow` carry none: codegen derives
/// an index check's bounds from the `Indexed` node's own `base` (statically
/// for a constrained array, from the fat pointer's bounds block otherwise),
/// and an overflow check's operands from the `Binary`/`Unary` node's own
/// already-lowered operands and result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Range { lo: i128, hi: i128 },
    Index,
    Null,
    Division,
    Overflow,
    Discriminant { expected: i128 },
}

#[derive(Debug, Clone)]
pub enum Expr {
    IntLiteral { value: i128, ty: Type },
    RealLiteral { value: f64, ty: Type },
    StringLiteral { value: String, ty: Type },
    EnumLiteral { position: i128, ty: Type },
    Local { name: String, ty: Type },
    Global { mangled_name: String, ty: Type },
    Selected {
        base: Box<Expr>,
        offset: u32,
        ty: Type,
    },
    Indexed {
        base: Box<Expr>,
        index: Box<Expr>,
        ty: Type,
        checks: Vec<Check>,
    },
    Call {
        target: Rc<Entity>,
        args: Vec<Expr>,
        ty: Type,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: Type,
        checks: Vec<Check>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        ty: Type,
        checks: Vec<Check>,
    },
    /// An implicit or explicit conversion made visible in the IR: numeric
    /// widening/narrowing, universal-type narrowing, derived-type view
    /// conversion.
    Convert {
        expr: Box<Expr>,
        from: Type,
        to: Type,
        checks: Vec<Check>,
    },
    Aggregate {
        /// Fully expanded: one entry per component/element in storage order.
        components: Vec<Expr>,
        ty: Type,
    },
    Attribute {
        kind: AttributeKind,
        operand: Box<Expr>,
        ty: Type,
    },
    Allocator {
        ty: Type,
        init: Option<Box<Expr>>,
    },
    Null { ty: Type },
    /// `if Cond then A else B` as an expression: codegen evaluates both
    /// arms into a shared temporary selected by `Cond`.
    Select(Box<Expr>, Box<Expr>, Box<Expr>, Type),
    /// A node that failed semantic analysis; codegen never sees one of
    /// these reach emission because a unit with `Error` nodes is not
    /// codegen'd, but it exists so earlier passes can keep walking.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    First,
    Last,
    Length,
    Pos,
    Val,
    Pred,
    Succ,
    Image,
    Value,
    Size,
}

impl Expr {
    pub fn ty(&self) -> Type {
        match self {
            Expr::IntLiteral { ty, .. }
            | Expr::RealLiteral { ty, .. }
            | Expr::StringLiteral { ty, .. }
            | Expr::EnumLiteral { ty, .. }
            | Expr::Local { ty, .. }
            | Expr::Global { ty, .. }
            | Expr::Selected { ty, .. }
            | Expr::Indexed { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Aggregate { ty, .. }
            | Expr::Attribute { ty, .. }
            | Expr::Null { ty } => ty.clone(),
            Expr::Select(_, _, _, ty) => ty.clone(),
            Expr::Convert { to, .. } => to.clone(),
            Expr::Allocator { ty, .. } => Type::Access {
                designated: Box::new(ty.clone()),
                lifetime: crate::types::AccessLifetime::Anonymous,
            },
            Expr::Error => Type::Error,
        }
    }
}

/// Carries a source span alongside a value during lowering, discarded once
/// the IR is handed to codegen (diagnostics are reported against the AST
/// span, not re-derived from the IR).
#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}
