//! Low-level textual IR code generation.
//!
//! Walks the typed IR (`crate::ir`) produced by the type checker and emits a
//! single textual module: runtime declarations, one global per interned
//! string literal, an elaboration function per package, and one function per
//! subprogram body. The emitted text is the contract described in §4.4/§4.5
//! of the runtime ABI — it is handed to an external toolchain (clang, in
//! practice) to assemble and link against `ada_rt`, not interpreted here.
//!
//! # Module structure
//!
//! - `state.rs`: per-function mutable bookkeeping (temporaries, labels, locals)
//! - `globals.rs`: string-literal interning
//! - `runtime.rs`: the runtime ABI's `declare` table
//! - `types.rs`: semantic `Type` to textual IR type mapping
//! - `platform.rs`: host target triple for the linker invocation
//! - `statements.rs`: expression lowering and simple statement emission
//! - `control_flow.rs`: if/case/loop/select/block emission
//! - `program.rs`: per-unit and whole-program emission, driven by elaboration order
//! - `error.rs`: `CodeGenError`

mod control_flow;
mod error;
mod globals;
mod platform;
mod program;
mod runtime;
mod state;
mod statements;
mod types;

pub use error::CodeGenError;
pub use platform::host_target_triple;
pub use program::emit_program;
pub use runtime::render_declarations;

use globals::Globals;
use state::CodegenState;
use std::collections::HashMap;

/// The loop context stack frame used to resolve `exit`/`exit when` targets:
/// an optional loop label plus the label to branch to on exit.
struct LoopCtx {
    label: Option<String>,
    exit_label: String,
}

/// Per-function (and, transiently, per-elaboration-block) code generator.
/// One `CodeGen` is used for the lifetime of a single subprogram body or
/// package elaboration sequence; a fresh one is created per unit by
/// `program.rs`.
pub(crate) struct CodeGen<'a> {
    state: CodegenState,
    globals: &'a mut Globals,
    loop_stack: Vec<LoopCtx>,
    /// Maps a mangled subprogram name to its declared parameter/result
    /// textual types, so call sites don't need to re-derive them.
    signatures: &'a HashMap<String, (Vec<String>, String)>,
}

impl<'a> CodeGen<'a> {
    pub(crate) fn new(
        globals: &'a mut Globals,
        signatures: &'a HashMap<String, (Vec<String>, String)>,
    ) -> Self {
        CodeGen {
            state: CodegenState::new(),
            globals,
            loop_stack: Vec::new(),
            signatures,
        }
    }

    pub(crate) fn into_output(self) -> String {
        self.state.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrParam, Subprogram, Unit, UnitKind};
    use crate::types::Type;

    #[test]
    fn emits_runtime_declarations_and_a_function_per_subprogram() {
        let unit = Unit {
            name: "greet".to_string(),
            kind: UnitKind::Subprogram(Subprogram {
                name: "greet".to_string(),
                mangled_name: "_ada_greet".to_string(),
                params: vec![IrParam {
                    name: "N".to_string(),
                    ty: Type::Integer { lo: 0, hi: 100 },
                    mode: crate::ast::ParamMode::In,
                }],
                result: None,
                body: vec![],
                is_entry: false,
            }),
        };
        let ir = emit_program(&[unit]);
        assert!(ir.contains("declare ptr @ada_rt_sec_stack_mark"));
        assert!(ir.contains("define void @_ada_greet(i32 %N)"));
    }
}
