//! Runtime ABI function declarations for the generated low-level IR.
//!
//! Every symbol the code generator calls into the `ada_rt` runtime crate is
//! declared here in one data-driven table, so the declaration list and the
//! call sites can never drift out of sync with each other.

use std::sync::LazyLock;

pub struct RuntimeDecl {
    /// Textual `declare` line, exactly as emitted at the top of the module.
    pub decl: &'static str,
    pub category: Option<&'static str>,
}

pub static RUNTIME_DECLARATIONS: LazyLock<Vec<RuntimeDecl>> = LazyLock::new(|| {
    vec![
        RuntimeDecl {
            decl: "declare ptr @ada_rt_sec_stack_mark()",
            category: Some("; Secondary stack"),
        },
        RuntimeDecl {
            decl: "declare ptr @ada_rt_sec_stack_alloc(i64)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_sec_stack_release(ptr)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare ptr @ada_rt_frame_push()",
            category: Some("; Exception frames"),
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_frame_pop(ptr)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_raise(i64)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_reraise()",
            category: None,
        },
        RuntimeDecl {
            decl: "declare i64 @ada_rt_current_exception()",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_check_range(i64, i64, i64)",
            category: Some("; Checks"),
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_check_index(i64, i64, i64)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_check_null(ptr)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_check_division(i64)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_check_overflow_add(i64, i64, i64)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_check_discriminant(i64, i64)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_finalize_push(ptr, ptr)",
            category: Some("; Finalization"),
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_finalize_all(ptr)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare ptr @ada_rt_task_start(ptr, ptr)",
            category: Some("; Tasking"),
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_task_abort(ptr)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_delay(double)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_entry_call(ptr, i32, ptr)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare i32 @ada_rt_accept_wait(i32)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare i32 @ada_rt_accept_try(i32)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare ptr @ada_rt_accept_args(i32)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_accept_complete(i32)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_put_string(ptr, i64)",
            category: Some("; Text I/O"),
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_put_int(i64)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_put_float(double)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare void @ada_rt_new_line()",
            category: None,
        },
        RuntimeDecl {
            decl: "declare { ptr, ptr } @ada_rt_image_int(i64)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare i64 @ada_rt_value_int(ptr)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare i64 @ada_rt_pow_int(i64, i64)",
            category: Some("; Arithmetic and array bounds"),
        },
        RuntimeDecl {
            decl: "declare i64 @ada_rt_abs(i64)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare ptr @ada_rt_alloc(i64)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare i64 @ada_rt_array_first(ptr)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare i64 @ada_rt_array_last(ptr)",
            category: None,
        },
        RuntimeDecl {
            decl: "declare i64 @ada_rt_array_length(ptr)",
            category: None,
        },
    ]
});

/// Renders the full declaration block, one `declare` per line with blank
/// lines separating categories, matching the layout clang-emitted modules
/// use for forward declarations.
pub fn render_declarations() -> String {
    let mut out = String::new();
    for entry in RUNTIME_DECLARATIONS.iter() {
        if let Some(cat) = entry.category {
            out.push('\n');
            out.push_str(cat);
            out.push('\n');
        }
        out.push_str(entry.decl);
        out.push('\n');
    }
    out
}

/// Maps a checked operation's codegen hook name to the runtime symbol that
/// implements it, used so `control_flow`/`statements` never hardcode a
/// symbol string at more than one call site.
pub fn check_symbol(check_name: &str) -> &'static str {
    match check_name {
        "range" => "ada_rt_check_range",
        "index" => "ada_rt_check_index",
        "null" => "ada_rt_check_null",
        "division" => "ada_rt_check_division",
        "overflow" => "ada_rt_check_overflow_add",
        "discriminant" => "ada_rt_check_discriminant",
        other => panic!("no runtime symbol for check '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_declarations_includes_every_entry() {
        let rendered = render_declarations();
        for entry in RUNTIME_DECLARATIONS.iter() {
            assert!(rendered.contains(entry.decl));
        }
    }

    #[test]
    fn check_symbol_maps_known_checks() {
        assert_eq!(check_symbol("range"), "ada_rt_check_range");
        assert_eq!(check_symbol("division"), "ada_rt_check_division");
    }
}
