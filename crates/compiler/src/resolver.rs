//! Scope construction and name resolution.
//!
//! Builds the symbol table: the predefined `Standard` package, one `Scope`
//! per compilation unit (and nested package/block/subprogram scopes within
//! it), and resolves `with`/`use` visibility between them. Declarations are
//! entered in source order (§4.3 step 1) before any expression within the
//! same unit is type-checked, so mutually-referencing declarations within
//! one package spec are visible to one another.

use crate::ast::{CompilationUnit, Decl, Program, TypeDef, UnitKind};
use crate::lexer::Span;
use crate::types::{Entity, EntityKind, Scope, ScopeKind, Type};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticError {
    pub message: String,
    pub span: Span,
}

impl SemanticError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        SemanticError {
            message: message.into(),
            span,
        }
    }
}

/// The symbol environment threaded through semantic analysis: the
/// predefined scope, and one library-level scope per compilation unit
/// keyed by unit name.
pub struct Environment {
    pub standard: Rc<Scope>,
    pub units: HashMap<String, Rc<Scope>>,
}

pub fn build_environment(program: &Program) -> (Environment, Vec<SemanticError>) {
    let mut errors = Vec::new();
    let standard = Rc::new(standard_package());

    let mut units = HashMap::new();
    for unit in &program.units {
        let name = Program::unit_name(unit);
        let scope = build_unit_scope(unit, standard.clone(), &units, &mut errors);
        units.insert(name.to_string(), Rc::new(scope));
    }

    (Environment { standard, units }, errors)
}

/// The predefined environment (§3, "Standard" package): `Integer`,
/// `Float`, `Boolean`, `Character`, `String`, and the five standard
/// exceptions, all declared in a scope with no parent.
fn standard_package() -> Scope {
    let mut scope = Scope::new(ScopeKind::PackageSpec, None);

    scope.declare(type_entity("Integer", Type::Integer { lo: -(1i128 << 31), hi: (1i128 << 31) - 1 }));
    scope.declare(type_entity("Float", Type::Floating { digits: 6 }));
    scope.declare(type_entity(
        "Boolean",
        Type::Enumeration {
            name: "Boolean".to_string(),
            literals: vec!["False".to_string(), "True".to_string()],
        },
    ));
    scope.declare(type_entity(
        "Character",
        Type::Enumeration {
            name: "Character".to_string(),
            literals: (0u32..256).filter_map(char::from_u32).map(|c| c.to_string()).collect(),
        },
    ));
    scope.declare(type_entity(
        "String",
        Type::Array {
            element: Box::new(Type::Enumeration {
                name: "Character".to_string(),
                literals: Vec::new(),
            }),
            index: vec![crate::types::IndexConstraint::Unconstrained {
                index_type: Box::new(Type::Integer { lo: 1, hi: i128::MAX }),
            }],
        },
    ));

    for (name, identity) in [
        ("Constraint_Error", crate::types::EXC_CONSTRAINT_ERROR),
        ("Numeric_Error", crate::types::EXC_NUMERIC_ERROR),
        ("Program_Error", crate::types::EXC_PROGRAM_ERROR),
        ("Storage_Error", crate::types::EXC_STORAGE_ERROR),
        ("Tasking_Error", crate::types::EXC_TASKING_ERROR),
    ] {
        scope.declare(Entity {
            name: name.to_string(),
            canonical: name.to_ascii_lowercase(),
            kind: EntityKind::Exception { identity },
            ty: Type::Error,
            static_value: None,
        });
    }

    // Boolean literals are also bound at top level so `True`/`False` resolve
    // without qualification.
    scope.declare(Entity {
        name: "False".to_string(),
        canonical: "false".to_string(),
        kind: EntityKind::EnumerationLiteral { position: 0 },
        ty: Type::Enumeration {
            name: "Boolean".to_string(),
            literals: vec!["False".to_string(), "True".to_string()],
        },
        static_value: None,
    });
    scope.declare(Entity {
        name: "True".to_string(),
        canonical: "true".to_string(),
        kind: EntityKind::EnumerationLiteral { position: 1 },
        ty: Type::Enumeration {
            name: "Boolean".to_string(),
            literals: vec!["False".to_string(), "True".to_string()],
        },
        static_value: None,
    });

    scope
}

fn type_entity(name: &str, ty: Type) -> Entity {
    Entity {
        name: name.to_string(),
        canonical: name.to_ascii_lowercase(),
        kind: EntityKind::TypeDecl,
        ty,
        static_value: None,
    }
}

/// Builds the top-level scope for one compilation unit: starts from
/// `Standard`, layers in `use`-visibility for `with`'d units already
/// resolved (elaboration order guarantees dependencies are processed
/// first), then declares the unit's own top-level names.
fn build_unit_scope(
    unit: &CompilationUnit,
    standard: Rc<Scope>,
    units_so_far: &HashMap<String, Rc<Scope>>,
    errors: &mut Vec<SemanticError>,
) -> Scope {
    let mut scope = Scope::new(ScopeKind::PackageSpec, Some(standard));

    for with in Program::with_clauses(unit) {
        if let Some(dep) = units_so_far.get(with.unit_name.as_str()) {
            for entity in dep.declared_order() {
                scope.add_use_visible(entity.clone());
            }
        } else {
            errors.push(SemanticError::new(
                format!("unknown library unit '{}' in with clause", with.unit_name),
                with.span.clone(),
            ));
        }
    }

    let decls: &[Decl] = match &unit.kind {
        UnitKind::PackageSpec(p) => &p.decls,
        UnitKind::PackageBody(p) => &p.decls,
        UnitKind::SubprogramBody(s) => &s.decls,
        _ => &[],
    };
    declare_decls(decls, &mut scope, errors);
    scope
}

/// Enters every declaration in `decls` into `scope`, in source order. Type
/// and object declarations get a best-effort `Type` (incomplete types are
/// resolved properly by the typechecker's fixed-point pass; here we only
/// need enough shape for name lookup to succeed).
pub fn declare_decls(decls: &[Decl], scope: &mut Scope, errors: &mut Vec<SemanticError>) {
    for decl in decls {
        match decl {
            Decl::Type { name, def, span } => {
                let ty = shallow_type_of(name, def);
                scope.declare(Entity {
                    name: name.clone(),
                    canonical: name.to_ascii_lowercase(),
                    kind: EntityKind::TypeDecl,
                    ty: ty.clone(),
                    static_value: None,
                });
                if let TypeDef::Enumeration { literals } = def {
                    for (i, lit) in literals.iter().enumerate() {
                        scope.declare(Entity {
                            name: lit.clone(),
                            canonical: lit.to_ascii_lowercase(),
                            kind: EntityKind::EnumerationLiteral { position: i as i128 },
                            ty: ty.clone(),
                            static_value: None,
                        });
                    }
                }
                let _ = span;
            }
            Decl::Subtype { name, span, .. } => {
                scope.declare(Entity {
                    name: name.clone(),
                    canonical: name.to_ascii_lowercase(),
                    kind: EntityKind::SubtypeDecl,
                    ty: Type::Incomplete { name: name.clone() },
                    static_value: None,
                });
                let _ = span;
            }
            Decl::Object { names, constant, .. } => {
                for n in names {
                    scope.declare(Entity {
                        name: n.clone(),
                        canonical: n.to_ascii_lowercase(),
                        kind: EntityKind::Object { constant: *constant },
                        ty: Type::Incomplete { name: n.clone() },
                        static_value: None,
                    });
                }
            }
            Decl::Subprogram(sb) => {
                let spec = match sb {
                    crate::ast::SubprogramDeclOrBody::Spec(s) => s,
                    crate::ast::SubprogramDeclOrBody::Body(b) => &b.spec,
                };
                scope.declare(Entity {
                    name: spec.name.clone(),
                    canonical: spec.name.to_ascii_lowercase(),
                    kind: EntityKind::Subprogram {
                        params: Vec::new(),
                        result: None,
                    },
                    ty: Type::Incomplete { name: spec.name.clone() },
                    static_value: None,
                });
            }
            Decl::Exception { name, .. } => {
                scope.declare(Entity {
                    name: name.clone(),
                    canonical: name.to_ascii_lowercase(),
                    kind: EntityKind::Exception {
                        identity: stable_exception_identity(name),
                    },
                    ty: Type::Error,
                    static_value: None,
                });
            }
            Decl::Task { name, .. } => {
                scope.declare(Entity {
                    name: name.clone(),
                    canonical: name.to_ascii_lowercase(),
                    kind: EntityKind::Task,
                    ty: Type::Task { name: name.clone(), entries: Vec::new() },
                    static_value: None,
                });
            }
            Decl::NestedPackage(kind) => {
                let name = match kind.as_ref() {
                    UnitKind::PackageSpec(p) => p.name.clone(),
                    UnitKind::PackageBody(p) => p.name.clone(),
                    _ => continue,
                };
                scope.declare(Entity {
                    name: name.clone(),
                    canonical: name.to_ascii_lowercase(),
                    kind: EntityKind::Package,
                    ty: Type::Error,
                    static_value: None,
                });
            }
            Decl::Renaming { name, .. } => {
                scope.declare(Entity {
                    name: name.clone(),
                    canonical: name.to_ascii_lowercase(),
                    kind: EntityKind::Object { constant: false },
                    ty: Type::Incomplete { name: name.clone() },
                    static_value: None,
                });
            }
            Decl::Use { .. } | Decl::Pragma { .. } => {}
        }
    }
}

/// Deterministic per-program exception identity derived from the name,
/// distinct from the five reserved standard-exception codes. Collisions
/// are astronomically unlikely for the identifier counts a single
/// compilation unit can declare and are not guarded against, matching the
/// non-goal of exhaustive hash-collision handling.
fn stable_exception_identity(name: &str) -> u64 {
    let mut hash: u64 = 1469598103934665603; // FNV offset basis
    for byte in name.to_ascii_lowercase().bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    100 + (hash % 1_000_000)
}

/// A first pass at a declared type's shape, good enough for name
/// resolution; the typechecker refines ranges/discriminants once
/// expressions can be statically evaluated.
fn shallow_type_of(name: &str, def: &TypeDef) -> Type {
    match def {
        TypeDef::Enumeration { literals } => Type::Enumeration {
            name: name.to_string(),
            literals: literals.clone(),
        },
        TypeDef::Record { .. } => Type::Record {
            name: name.to_string(),
            components: Vec::new(),
            discriminants: Vec::new(),
            variant: None,
        },
        TypeDef::Private { .. } => Type::Private { name: name.to_string(), full: None },
        _ => Type::Incomplete { name: name.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{FileId, Lexer};
    use crate::parser::Parser;

    fn parse(src: &str) -> Program {
        let (tokens, _) = Lexer::new(FileId(0), src).tokenize();
        Parser::new(FileId(0), &tokens).parse_program().0
    }

    #[test]
    fn standard_package_declares_integer() {
        let scope = standard_package();
        assert_eq!(scope.resolve("integer").len(), 1);
        assert_eq!(scope.resolve("true").len(), 1);
    }

    #[test]
    fn package_declares_its_own_type() {
        let program = parse("package P is type Color is (Red, Green, Blue); end P;");
        let (env, errors) = build_environment(&program);
        assert!(errors.is_empty());
        let scope = env.units.get("P").unwrap();
        assert_eq!(scope.resolve("color").len(), 1);
        assert_eq!(scope.resolve("red").len(), 1);
    }

    #[test]
    fn with_clause_makes_dependency_use_visible() {
        let program = parse(
            "package A is X : Integer; end A; with A; package B is Y : Integer; end B;",
        );
        let (env, errors) = build_environment(&program);
        assert!(errors.is_empty(), "{:?}", errors);
        let b = env.units.get("B").unwrap();
        assert_eq!(b.resolve("x").len(), 1);
    }

    #[test]
    fn unknown_with_clause_reports_error() {
        let program = parse("with Nonexistent; package B is end B;");
        let (_, errors) = build_environment(&program);
        assert_eq!(errors.len(), 1);
    }
}
