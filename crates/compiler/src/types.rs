//! Semantic type system, symbol entities, and scopes.
//!
//! Distinct from `ast::TypeDef` (the unresolved, textual type syntax): a
//! `Type` here is the materialized result of semantic analysis — what §3
//! calls the "semantic" type, interned by the compilation environment for
//! the lifetime of the compilation.

use std::collections::HashMap;
use std::rc::Rc;

/// A scalar/composite/access type, or one of the three compile-time-only
/// universal types used before a literal's context narrows it (§3, §9).
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Integer {
        lo: i128,
        hi: i128,
    },
    Enumeration {
        name: String,
        literals: Vec<String>,
    },
    Floating {
        digits: u32,
    },
    Fixed {
        delta: f64,
        small: f64,
        lo: i128,
        hi: i128,
    },
    Array {
        element: Box<Type>,
        index: Vec<IndexConstraint>,
    },
    Record {
        name: String,
        components: Vec<Component>,
        discriminants: Vec<Component>,
        variant: Option<VariantPart>,
    },
    Access {
        designated: Box<Type>,
        lifetime: AccessLifetime,
    },
    Task {
        name: String,
        entries: Vec<EntryProfile>,
    },
    /// A private type's public face; `full` is filled in once the
    /// completion is seen (§9, recursive-type fix-up strategy).
    Private {
        name: String,
        full: Option<Box<Type>>,
    },
    /// A named subtype: a base type plus an additional range constraint.
    /// Operations look through to `base`; assignment/parameter passing
    /// constraint-check against `constraint`.
    Subtype {
        base: Box<Type>,
        constraint: Option<(i128, i128)>,
    },
    UniversalInteger,
    UniversalReal,
    UniversalFixed,
    UniversalAccess,
    /// Placeholder for a type whose full definition hasn't been seen yet
    /// (forward reference inside a package spec, §4.3 step 1).
    Incomplete {
        name: String,
    },
    /// Sentinel assigned to an ill-typed node so that one semantic error
    /// does not cascade into spurious follow-on errors (§7 policy).
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexConstraint {
    Constrained { lo: i128, hi: i128 },
    Unconstrained { index_type: Box<Type> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub ty: Type,
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantPart {
    pub discriminant: String,
    pub arms: Vec<(Vec<i128>, Vec<Component>)>,
    pub others: Option<Vec<Component>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLifetime {
    Library,
    Block,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryProfile {
    pub name: String,
    pub params: Vec<Type>,
}

impl Type {
    /// Follow `Subtype` wrappers down to the underlying base type.
    pub fn base(&self) -> &Type {
        match self {
            Type::Subtype { base, .. } => base.base(),
            other => other,
        }
    }

    pub fn is_universal(&self) -> bool {
        matches!(
            self,
            Type::UniversalInteger | Type::UniversalReal | Type::UniversalFixed | Type::UniversalAccess
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_discrete(&self) -> bool {
        matches!(
            self.base(),
            Type::Integer { .. } | Type::Enumeration { .. } | Type::UniversalInteger
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.base(),
            Type::Integer { .. }
                | Type::Floating { .. }
                | Type::Fixed { .. }
                | Type::UniversalInteger
                | Type::UniversalReal
                | Type::UniversalFixed
        )
    }

    /// Bit width of the smallest representation covering the declared range,
    /// never less than 32 (§4.4.1).
    pub fn integer_bits(lo: i128, hi: i128) -> u32 {
        for bits in [32u32, 64] {
            let half = 1i128 << (bits - 1);
            if lo >= -half && hi <= half - 1 {
                return bits;
            }
        }
        128
    }

    /// Structural-identity equality used by the typechecker: two named
    /// composite types are the same type only if they are literally the
    /// same declaration (§9: "compares by id, not structure").
    pub fn same_type(&self, other: &Type) -> bool {
        match (self.base(), other.base()) {
            (Type::Error, _) | (_, Type::Error) => true, // suppress cascades
            (Type::Integer { lo: l1, hi: h1 }, Type::Integer { lo: l2, hi: h2 }) => {
                l1 == l2 && h1 == h2
            }
            (Type::Enumeration { name: n1, .. }, Type::Enumeration { name: n2, .. }) => n1 == n2,
            (Type::Floating { digits: d1 }, Type::Floating { digits: d2 }) => d1 == d2,
            (Type::Fixed { delta: d1, .. }, Type::Fixed { delta: d2, .. }) => {
                (d1 - d2).abs() < f64::EPSILON
            }
            (Type::Array { element: e1, index: i1 }, Type::Array { element: e2, index: i2 }) => {
                e1.same_type(e2) && i1 == i2
            }
            (Type::Record { name: n1, .. }, Type::Record { name: n2, .. }) => n1 == n2,
            (Type::Access { designated: d1, .. }, Type::Access { designated: d2, .. }) => {
                d1.same_type(d2)
            }
            (Type::Task { name: n1, .. }, Type::Task { name: n2, .. }) => n1 == n2,
            (Type::Private { name: n1, .. }, Type::Private { name: n2, .. }) => n1 == n2,
            (Type::Incomplete { name: n1 }, Type::Incomplete { name: n2 }) => n1 == n2,
            (Type::UniversalInteger, Type::UniversalInteger) => true,
            (Type::UniversalReal, Type::UniversalReal) => true,
            (Type::UniversalFixed, Type::UniversalFixed) => true,
            (Type::UniversalAccess, Type::UniversalAccess) => true,
            _ => false,
        }
    }

    /// Static `(lo, hi)` bounds for a discrete/fixed scalar type, used to
    /// build a range check without a runtime bounds lookup. `None` for
    /// composite/access/universal types, which carry no such check.
    pub fn scalar_bounds(&self) -> Option<(i128, i128)> {
        match self.base() {
            Type::Integer { lo, hi } => Some((*lo, *hi)),
            Type::Fixed { lo, hi, .. } => Some((*lo, *hi)),
            Type::Enumeration { literals, .. } => Some((0, literals.len() as i128 - 1)),
            _ => None,
        }
    }

    /// Whether a value of `self` may be assigned/passed where `target` is
    /// expected, accounting for universal-type narrowing (§4.3 step 5).
    pub fn compatible_with(&self, target: &Type) -> bool {
        if self.is_error() || target.is_error() {
            return true;
        }
        if self.same_type(target) {
            return true;
        }
        match (self, target) {
            (Type::UniversalInteger, t) if t.is_discrete() || matches!(t.base(), Type::Floating { .. } | Type::Fixed { .. }) => true,
            (Type::UniversalReal, t) if matches!(t.base(), Type::Floating { .. }) => true,
            (Type::UniversalFixed, t) if matches!(t.base(), Type::Fixed { .. }) => true,
            (Type::UniversalAccess, t) if matches!(t.base(), Type::Access { .. }) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Integer { lo, hi } => write!(f, "range {}..{}", lo, hi),
            Type::Enumeration { name, .. } => write!(f, "{}", name),
            Type::Floating { digits } => write!(f, "digits {}", digits),
            Type::Fixed { delta, .. } => write!(f, "delta {}", delta),
            Type::Array { element, .. } => write!(f, "array of {}", element),
            Type::Record { name, .. } => write!(f, "{}", name),
            Type::Access { designated, .. } => write!(f, "access {}", designated),
            Type::Task { name, .. } => write!(f, "task {}", name),
            Type::Private { name, .. } => write!(f, "{}", name),
            Type::Subtype { base, .. } => write!(f, "{}", base),
            Type::Incomplete { name } => write!(f, "{} (incomplete)", name),
            Type::UniversalInteger => write!(f, "universal_integer"),
            Type::UniversalReal => write!(f, "universal_real"),
            Type::UniversalFixed => write!(f, "universal_fixed"),
            Type::UniversalAccess => write!(f, "universal_access"),
            Type::Error => write!(f, "<error type>"),
        }
    }
}

/// Well-known identities for the five standard exceptions (§3, §7). Fixed
/// and process-wide so the runtime and generated code agree on them without
/// a lookup table.
pub const EXC_CONSTRAINT_ERROR: u64 = 1;
pub const EXC_NUMERIC_ERROR: u64 = 2;
pub const EXC_PROGRAM_ERROR: u64 = 3;
pub const EXC_STORAGE_ERROR: u64 = 4;
pub const EXC_TASKING_ERROR: u64 = 5;

/// What kind of thing a name denotes.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Object { constant: bool },
    TypeDecl,
    SubtypeDecl,
    Subprogram { params: Vec<ParamProfile>, result: Option<Type> },
    EnumerationLiteral { position: i128 },
    Package,
    Generic,
    Label,
    LoopParameter,
    Exception { identity: u64 },
    Task,
    Entry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamProfile {
    pub name: String,
    pub ty: Type,
    pub mode: ParamMode,
    pub has_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    In,
    InOut,
    Out,
}

/// A resolved symbol: kind, owning scope, type, and (if statically
/// determinable) its compile-time value.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub canonical: String,
    pub kind: EntityKind,
    pub ty: Type,
    pub static_value: Option<StaticValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StaticValue {
    Integer(i128),
    Real(f64),
    Enum(i128),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    PackageSpec,
    PackageBody,
    Subprogram,
    Block,
    Loop,
    Generic,
}

/// An ordered declaration list plus a hash index, per §3. `use`-visible
/// entities live in a separate overlay searched only after direct
/// visibility fails (§4.3 step 3).
///
/// Cloning a `Scope` is cheap: every stored entity is behind an `Rc`, so a
/// clone shares the underlying declarations rather than copying them. This
/// lets semantic analysis build a throwaway scope that merges an enclosing
/// scope with a block/loop-local overlay without threading lifetimes.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<Rc<Scope>>,
    entities: HashMap<String, Vec<Rc<Entity>>>,
    order: Vec<Rc<Entity>>,
    use_visible: HashMap<String, Vec<Rc<Entity>>>,
}

impl Scope {
    pub fn new(kind: ScopeKind, parent: Option<Rc<Scope>>) -> Self {
        Scope {
            kind,
            parent,
            entities: HashMap::new(),
            order: Vec::new(),
            use_visible: HashMap::new(),
        }
    }

    /// Register an entity in declaration order. Overloading is permitted
    /// for subprograms, enumeration literals, and operators: declaring the
    /// same canonical name twice just adds another candidate.
    pub fn declare(&mut self, entity: Entity) -> Rc<Entity> {
        let rc = Rc::new(entity);
        self.entities
            .entry(rc.canonical.clone())
            .or_default()
            .push(rc.clone());
        self.order.push(rc.clone());
        rc
    }

    /// Registers an already-shared entity, e.g. one carried over from an
    /// enclosing scope when building a block/loop overlay.
    pub fn declare_rc(&mut self, entity: Rc<Entity>) {
        self.entities
            .entry(entity.canonical.clone())
            .or_default()
            .push(entity.clone());
        self.order.push(entity);
    }

    pub fn add_use_visible(&mut self, entity: Rc<Entity>) {
        self.use_visible
            .entry(entity.canonical.clone())
            .or_default()
            .push(entity);
    }

    pub fn declared_order(&self) -> &[Rc<Entity>] {
        &self.order
    }

    /// Collect *all* overload candidates visible for `canonical` in this
    /// scope alone (no parent walk) — direct declarations first, then the
    /// `use`-visible overlay (§4.3 step 3).
    fn candidates_here(&self, canonical: &str) -> Vec<Rc<Entity>> {
        let mut out = self.entities.get(canonical).cloned().unwrap_or_default();
        if out.is_empty() {
            out = self.use_visible.get(canonical).cloned().unwrap_or_default();
        }
        out
    }

    /// Walk current scope → enclosing scopes → use-visible set, collecting
    /// all overload candidates (§4.3 step 3). Returns as soon as some scope
    /// yields a non-empty candidate set — inner declarations hide outer ones
    /// of the same name.
    pub fn resolve(&self, canonical: &str) -> Vec<Rc<Entity>> {
        let here = self.candidates_here(canonical);
        if !here.is_empty() {
            return here;
        }
        match &self.parent {
            Some(parent) => parent.resolve(canonical),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_entity(name: &str) -> Entity {
        Entity {
            name: name.to_string(),
            canonical: name.to_ascii_lowercase(),
            kind: EntityKind::Object { constant: false },
            ty: Type::Integer { lo: 0, hi: 100 },
            static_value: None,
        }
    }

    #[test]
    fn resolve_walks_parent_chain() {
        let mut outer = Scope::new(ScopeKind::PackageSpec, None);
        outer.declare(int_entity("x"));
        let outer_rc = Rc::new(outer);
        let inner = Scope::new(ScopeKind::Block, Some(outer_rc));
        let found = inner.resolve("x");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn inner_declaration_shadows_outer() {
        let mut outer = Scope::new(ScopeKind::PackageSpec, None);
        outer.declare(int_entity("x"));
        let outer_rc = Rc::new(outer);
        let mut inner = Scope::new(ScopeKind::Block, Some(outer_rc));
        let mut shadow = int_entity("x");
        shadow.ty = Type::Floating { digits: 6 };
        inner.declare(shadow);
        let found = inner.resolve("x");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ty, Type::Floating { digits: 6 });
    }

    #[test]
    fn overloaded_subprograms_collect_all_candidates() {
        let mut scope = Scope::new(ScopeKind::PackageSpec, None);
        scope.declare(Entity {
            name: "F".to_string(),
            canonical: "f".to_string(),
            kind: EntityKind::Subprogram {
                params: vec![],
                result: Some(Type::Integer { lo: 0, hi: 1 }),
            },
            ty: Type::Integer { lo: 0, hi: 1 },
            static_value: None,
        });
        scope.declare(Entity {
            name: "F".to_string(),
            canonical: "f".to_string(),
            kind: EntityKind::Subprogram {
                params: vec![],
                result: Some(Type::Floating { digits: 6 }),
            },
            ty: Type::Floating { digits: 6 },
            static_value: None,
        });
        assert_eq!(scope.resolve("f").len(), 2);
    }

    #[test]
    fn case_insensitive_resolution() {
        let mut scope = Scope::new(ScopeKind::PackageSpec, None);
        scope.declare(int_entity("Counter"));
        assert_eq!(scope.resolve("counter").len(), 1);
        assert_eq!(scope.resolve("COUNTER").len(), 1);
    }

    #[test]
    fn integer_bit_width_covers_range() {
        assert_eq!(Type::integer_bits(0, 100), 32);
        assert_eq!(Type::integer_bits(-(1i128 << 40), 1i128 << 40), 64);
    }

    #[test]
    fn universal_integer_compatible_with_any_numeric_subtype() {
        let target = Type::Floating { digits: 6 };
        assert!(Type::UniversalInteger.compatible_with(&target));
    }

    #[test]
    fn distinct_named_records_are_not_same_type() {
        let a = Type::Record {
            name: "A".to_string(),
            components: vec![],
            discriminants: vec![],
            variant: None,
        };
        let b = Type::Record {
            name: "B".to_string(),
            components: vec![],
            discriminants: vec![],
            variant: None,
        };
        assert!(!a.same_type(&b));
    }
}
