//! Value representation (§4.4.1): maps a semantic `Type` to the textual
//! low-level IR type used to store and pass values of it.

use crate::types::Type;

/// The low-level IR type for a value of `ty`, per the value-representation
/// table: integers get the smallest of i32/i64/i128 covering their range,
/// enumerations are their underlying integer, floats are `double`,
/// fixed-point is its scaled-integer representation, unconstrained arrays
/// are fat pointers (`{ptr, ptr}`: data plus a pointer to a bounds pair),
/// constrained arrays/records are inline aggregates, and access types are
/// raw pointers.
pub fn llvm_type(ty: &Type) -> String {
    match ty.base() {
        Type::Integer { lo, hi } => format!("i{}", Type::integer_bits(*lo, *hi)),
        Type::Enumeration { literals, .. } => {
            let hi = literals.len().max(1) as i128 - 1;
            format!("i{}", Type::integer_bits(0, hi))
        }
        Type::Floating { .. } => "double".to_string(),
        Type::Fixed { lo, hi, .. } => format!("i{}", Type::integer_bits(*lo, *hi)),
        Type::Array { index, element } => {
            if index.iter().any(|i| matches!(i, crate::types::IndexConstraint::Unconstrained { .. })) {
                "{ ptr, ptr }".to_string()
            } else {
                let len = array_length(index);
                format!("[{} x {}]", len, llvm_type(element))
            }
        }
        Type::Record { components, .. } => {
            let fields: Vec<String> = components.iter().map(|c| llvm_type(&c.ty)).collect();
            format!("{{ {} }}", fields.join(", "))
        }
        Type::Access { .. } => "ptr".to_string(),
        Type::Task { .. } => "ptr".to_string(),
        Type::Private { full: Some(full), .. } => llvm_type(full),
        Type::Private { .. } => "ptr".to_string(),
        Type::UniversalInteger => "i64".to_string(),
        Type::UniversalReal => "double".to_string(),
        Type::UniversalFixed => "i64".to_string(),
        Type::UniversalAccess => "ptr".to_string(),
        Type::Incomplete { .. } => "ptr".to_string(),
        Type::Error => "i64".to_string(),
        Type::Subtype { .. } => unreachable!("base() strips Subtype"),
    }
}

/// Size in bytes of a value of `ty`, for `'Size`/`'Storage_Size` and for
/// sizing `new` allocator expressions. Every type this compiler hands to an
/// allocator has a size known at compile time — unconstrained arrays are
/// only ever held behind a fat pointer, never allocated by value — so this
/// is a constant fold, not a runtime call.
pub fn size_of(ty: &Type) -> u64 {
    match ty.base() {
        Type::Integer { lo, hi } => Type::integer_bits(*lo, *hi) as u64 / 8,
        Type::Enumeration { literals, .. } => {
            let hi = literals.len().max(1) as i128 - 1;
            Type::integer_bits(0, hi) as u64 / 8
        }
        Type::Floating { .. } => 8,
        Type::Fixed { lo, hi, .. } => Type::integer_bits(*lo, *hi) as u64 / 8,
        Type::Array { index, element } => {
            if index.iter().any(|i| matches!(i, crate::types::IndexConstraint::Unconstrained { .. })) {
                16
            } else {
                array_length(index) as u64 * size_of(element)
            }
        }
        Type::Record { components, .. } => components.iter().map(|c| size_of(&c.ty)).sum(),
        Type::Access { .. } | Type::Task { .. } | Type::UniversalAccess | Type::Incomplete { .. } => 8,
        Type::Private { full: Some(full), .. } => size_of(full),
        Type::Private { .. } => 8,
        Type::UniversalInteger | Type::UniversalFixed | Type::Error => 8,
        Type::UniversalReal => 8,
        Type::Subtype { .. } => unreachable!("base() strips Subtype"),
    }
}

fn array_length(index: &[crate::types::IndexConstraint]) -> i128 {
    index
        .iter()
        .map(|i| match i {
            crate::types::IndexConstraint::Constrained { lo, hi } => (hi - lo + 1).max(0),
            crate::types::IndexConstraint::Unconstrained { .. } => 0,
        })
        .product()
}

/// True when a value of `ty` fits in a machine register and may be copied
/// by value rather than passed by reference — everything except
/// unconstrained arrays and records larger than a register pair (§4.4.2:
/// calling convention passes scalars by value, composites by reference).
pub fn is_scalar(ty: &Type) -> bool {
    matches!(
        ty.base(),
        Type::Integer { .. }
            | Type::Enumeration { .. }
            | Type::Floating { .. }
            | Type::Fixed { .. }
            | Type::Access { .. }
            | Type::Task { .. }
            | Type::UniversalInteger
            | Type::UniversalReal
            | Type::UniversalFixed
            | Type::UniversalAccess
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integer_range_gets_i32() {
        let ty = Type::Integer { lo: 0, hi: 100 };
        assert_eq!(llvm_type(&ty), "i32");
    }

    #[test]
    fn wide_integer_range_gets_i64() {
        let ty = Type::Integer { lo: -(1i128 << 40), hi: 1i128 << 40 };
        assert_eq!(llvm_type(&ty), "i64");
    }

    #[test]
    fn float_is_double() {
        assert_eq!(llvm_type(&Type::Floating { digits: 6 }), "double");
    }

    #[test]
    fn unconstrained_array_is_fat_pointer() {
        let ty = Type::Array {
            element: Box::new(Type::Integer { lo: 0, hi: 9 }),
            index: vec![crate::types::IndexConstraint::Unconstrained {
                index_type: Box::new(Type::Integer { lo: 1, hi: i128::MAX }),
            }],
        };
        assert_eq!(llvm_type(&ty), "{ ptr, ptr }");
    }

    #[test]
    fn constrained_array_is_inline_aggregate() {
        let ty = Type::Array {
            element: Box::new(Type::Integer { lo: 0, hi: 9 }),
            index: vec![crate::types::IndexConstraint::Constrained { lo: 1, hi: 10 }],
        };
        assert_eq!(llvm_type(&ty), "[10 x i32]");
    }

    #[test]
    fn size_of_small_integer_is_four_bytes() {
        assert_eq!(size_of(&Type::Integer { lo: 0, hi: 100 }), 4);
    }

    #[test]
    fn size_of_constrained_array_is_element_size_times_length() {
        let ty = Type::Array {
            element: Box::new(Type::Integer { lo: 0, hi: 9 }),
            index: vec![crate::types::IndexConstraint::Constrained { lo: 1, hi: 10 }],
        };
        assert_eq!(size_of(&ty), 40);
    }
}
