//! Untyped abstract syntax tree.
//!
//! Produced by the parser; carries source spans but no resolved types or
//! entities. Every expression and statement form of the language surface
//! is represented here; the typed IR (`ir.rs`) mirrors this shape with
//! types and resolved entities attached.

use crate::lexer::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub kind: UnitKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitKind {
    PackageSpec(PackageSpec),
    PackageBody(PackageBody),
    SubprogramSpec(SubprogramSpec),
    SubprogramBody(SubprogramBody),
    GenericDecl(GenericDecl),
    GenericInstantiation(GenericInstantiation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithClause {
    pub unit_name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageSpec {
    pub name: String,
    pub with_clauses: Vec<WithClause>,
    pub decls: Vec<Decl>,
    pub private_decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageBody {
    pub name: String,
    pub with_clauses: Vec<WithClause>,
    pub decls: Vec<Decl>,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub mode: ParamMode,
    pub ty: TypeRef,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    In,
    InOut,
    Out,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubprogramSpec {
    pub name: String,
    pub params: Vec<Param>,
    /// `Some` for a function, `None` for a procedure.
    pub result: Option<TypeRef>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubprogramBody {
    pub spec: SubprogramSpec,
    pub with_clauses: Vec<WithClause>,
    pub decls: Vec<Decl>,
    pub statements: Vec<Stmt>,
    pub handlers: Vec<ExceptionHandler>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericDecl {
    pub name: String,
    pub formals: Vec<GenericFormal>,
    pub unit: Box<UnitKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenericFormal {
    Type(String),
    Object { name: String, ty: TypeRef },
    Subprogram { name: String, spec: SubprogramSpec },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericInstantiation {
    pub new_name: String,
    pub generic_name: String,
    pub actuals: Vec<GenericActual>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenericActual {
    Type(TypeRef),
    Expr(Expr),
    Name(String),
}

/// A reference to a type in source syntax, before resolution: either a
/// plain name or an inline definition (for anonymous array/access types).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Name(String),
    Def(Box<TypeDef>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    /// `range lo .. hi`
    IntegerRange { lo: Expr, hi: Expr },
    /// `mod modulus`
    Modular { modulus: Expr },
    /// `digits n [range lo..hi]`
    Floating { digits: Expr, range: Option<(Expr, Expr)> },
    /// `delta d range lo..hi`
    FixedPoint { delta: Expr, lo: Expr, hi: Expr },
    Enumeration { literals: Vec<String> },
    Array {
        index_ranges: Vec<ArrayIndex>,
        element: TypeRef,
    },
    Record {
        discriminants: Vec<Param>,
        components: Vec<RecordComponent>,
        variant: Option<VariantPart>,
    },
    Access { designated: TypeRef },
    Derived { parent: TypeRef },
    Private { limited: bool },
    Subtype { base: TypeRef, constraint: Option<(Expr, Expr)> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayIndex {
    Constrained { lo: Expr, hi: Expr },
    /// `Index_Type range <>` — unconstrained dimension.
    Unconstrained { index_type: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordComponent {
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantPart {
    pub discriminant: String,
    pub arms: Vec<VariantArm>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantArm {
    /// `when <choices> =>`; `None` denotes `others`.
    pub choices: Option<Vec<Expr>>,
    pub components: Vec<RecordComponent>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Object {
        names: Vec<String>,
        ty: TypeRef,
        constant: bool,
        init: Option<Expr>,
        span: Span,
    },
    Type {
        name: String,
        def: TypeDef,
        span: Span,
    },
    Subtype {
        name: String,
        base: TypeRef,
        constraint: Option<(Expr, Expr)>,
        span: Span,
    },
    Subprogram(SubprogramDeclOrBody),
    NestedPackage(Box<UnitKind>),
    Exception {
        name: String,
        span: Span,
    },
    Task {
        name: String,
        entries: Vec<SubprogramSpec>,
        span: Span,
    },
    Renaming {
        name: String,
        target: Expr,
        span: Span,
    },
    Use {
        name: String,
        span: Span,
    },
    Pragma {
        name: String,
        args: Vec<String>,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubprogramDeclOrBody {
    Spec(SubprogramSpec),
    Body(SubprogramBody),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHandler {
    pub names: Vec<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { target: Expr, value: Expr, span: Span },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        elsifs: Vec<(Expr, Vec<Stmt>)>,
        else_branch: Option<Vec<Stmt>>,
        span: Span,
    },
    Case {
        selector: Expr,
        arms: Vec<CaseArm>,
        span: Span,
    },
    Loop {
        label: Option<String>,
        kind: LoopKind,
        body: Vec<Stmt>,
        span: Span,
    },
    Exit {
        label: Option<String>,
        when: Option<Expr>,
        span: Span,
    },
    Return { value: Option<Expr>, span: Span },
    Raise { exception: Option<String>, span: Span },
    Block {
        decls: Vec<Decl>,
        body: Vec<Stmt>,
        handlers: Vec<ExceptionHandler>,
        span: Span,
    },
    Call { name: String, args: Vec<Expr>, span: Span },
    EntryCall { target: String, entry: String, args: Vec<Expr>, span: Span },
    Accept {
        entry: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        span: Span,
    },
    Select {
        arms: Vec<SelectArm>,
        else_branch: Option<Vec<Stmt>>,
        span: Span,
    },
    Delay { amount: Expr, span: Span },
    Goto { label: String, span: Span },
    Labeled { label: String, stmt: Box<Stmt>, span: Span },
    Null { span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopKind {
    Plain,
    While(Expr),
    For { var: String, range: Expr, reverse: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    /// `None` denotes `others`.
    pub choices: Option<Vec<Expr>>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectArm {
    pub guard: Option<Expr>,
    pub entry: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub delay: Option<Expr>,
    pub terminate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral { value: i128, span: Span },
    RealLiteral { value: f64, span: Span },
    CharLiteral { value: char, span: Span },
    StringLiteral { value: String, span: Span },
    Name { name: String, span: Span },
    Selected { base: Box<Expr>, field: String, span: Span },
    Indexed { base: Box<Expr>, indices: Vec<Expr>, span: Span },
    Qualified { ty: String, expr: Box<Expr>, span: Span },
    Aggregate { components: Vec<AggregateComponent>, span: Span },
    Attribute { base: Box<Expr>, name: String, args: Vec<Expr>, span: Span },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, span: Span },
    Unary { op: UnOp, operand: Box<Expr>, span: Span },
    Call { name: String, args: Vec<Expr>, span: Span },
    Conversion { ty: String, expr: Box<Expr>, span: Span },
    Allocator { ty: TypeRef, init: Option<Box<Expr>>, span: Span },
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateComponent {
    Positional(Expr),
    Named { choices: Vec<String>, value: Expr },
    Others(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Pow,
    Mul,
    Div,
    Mod,
    Rem,
    Add,
    Sub,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    AndThen,
    OrElse,
    And,
    Or,
    Xor,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,
    Minus,
    Not,
    Abs,
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::IntLiteral { span, .. }
            | Expr::RealLiteral { span, .. }
            | Expr::CharLiteral { span, .. }
            | Expr::StringLiteral { span, .. }
            | Expr::Name { span, .. }
            | Expr::Selected { span, .. }
            | Expr::Indexed { span, .. }
            | Expr::Qualified { span, .. }
            | Expr::Aggregate { span, .. }
            | Expr::Attribute { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Call { span, .. }
            | Expr::Conversion { span, .. }
            | Expr::Allocator { span, .. }
            | Expr::If { span, .. } => span,
        }
    }
}

/// A whole program as handed to semantic analysis: the compilation units in
/// source order, not yet elaboration-ordered (that is `elaboration::order`'s
/// job, which consumes `with_clauses`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub units: Vec<CompilationUnit>,
}

impl Program {
    pub fn new() -> Self {
        Program { units: Vec::new() }
    }

    /// Name of the library unit a compilation unit declares, used to key
    /// the elaboration-order graph.
    pub fn unit_name(unit: &CompilationUnit) -> &str {
        match &unit.kind {
            UnitKind::PackageSpec(p) => &p.name,
            UnitKind::PackageBody(p) => &p.name,
            UnitKind::SubprogramSpec(s) => &s.name,
            UnitKind::SubprogramBody(s) => &s.spec.name,
            UnitKind::GenericDecl(g) => &g.name,
            UnitKind::GenericInstantiation(g) => &g.new_name,
        }
    }

    pub fn with_clauses(unit: &CompilationUnit) -> &[WithClause] {
        match &unit.kind {
            UnitKind::PackageSpec(p) => &p.with_clauses,
            UnitKind::PackageBody(p) => &p.with_clauses,
            UnitKind::SubprogramBody(s) => &s.with_clauses,
            _ => &[],
        }
    }

    /// True if `unit` is a body (package body or subprogram body) rather
    /// than a spec — used by elaboration ordering to link a body after its
    /// own spec.
    pub fn is_body(unit: &CompilationUnit) -> bool {
        matches!(
            unit.kind,
            UnitKind::PackageBody(_) | UnitKind::SubprogramBody(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        Span::new(crate::lexer::FileId(0), 0, 0, 0, 0)
    }

    #[test]
    fn unit_name_extracts_package_name() {
        let unit = CompilationUnit {
            kind: UnitKind::PackageSpec(PackageSpec {
                name: "Counters".to_string(),
                with_clauses: vec![],
                decls: vec![],
                private_decls: vec![],
            }),
            span: dummy_span(),
        };
        assert_eq!(Program::unit_name(&unit), "Counters");
    }

    #[test]
    fn is_body_distinguishes_spec_from_body() {
        let spec = CompilationUnit {
            kind: UnitKind::PackageSpec(PackageSpec {
                name: "P".to_string(),
                with_clauses: vec![],
                decls: vec![],
                private_decls: vec![],
            }),
            span: dummy_span(),
        };
        let body = CompilationUnit {
            kind: UnitKind::PackageBody(PackageBody {
                name: "P".to_string(),
                with_clauses: vec![],
                decls: vec![],
                statements: vec![],
            }),
            span: dummy_span(),
        };
        assert!(!Program::is_body(&spec));
        assert!(Program::is_body(&body));
    }
}
