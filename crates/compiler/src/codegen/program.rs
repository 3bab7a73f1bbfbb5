//! Whole-module emission: declares the runtime ABI, lays down one function
//! per subprogram body and one elaboration function per package, in the
//! order the units were already placed (callers are expected to have run
//! them through `crate::elaboration::order` first).

use super::globals::Globals;
use super::types::llvm_type;
use super::CodeGen;
use crate::ir::{Unit, UnitKind};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Emits the full textual module for a sequence of already-elaboration-ordered
/// units.
pub fn emit_program(units: &[Unit]) -> String {
    let signatures = collect_signatures(units);
    let mut globals = Globals::new();
    let mut body = String::new();

    for unit in units {
        match &unit.kind {
            UnitKind::Subprogram(sub) => {
                let mut gen = CodeGen::new(&mut globals, &signatures);
                let params_text = sub
                    .params
                    .iter()
                    .map(|p| format!("{} %{}", llvm_type(&p.ty), p.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                let ret_text = sub
                    .result
                    .as_ref()
                    .map(llvm_type)
                    .unwrap_or_else(|| "void".to_string());
                let _ = writeln!(
                    gen.state_mut().out,
                    "define {} @{}({}) {{",
                    ret_text,
                    sub.mangled_name,
                    params_text
                );
                gen.state_mut().emit_label("entry");
                for p in &sub.params {
                    let addr = format!("%{}.addr", p.name);
                    gen.state_mut()
                        .emit(format!("{} = alloca {}", addr, llvm_type(&p.ty)));
                    gen.state_mut().emit(format!(
                        "store {} %{}, ptr {}",
                        llvm_type(&p.ty),
                        p.name,
                        addr
                    ));
                    gen.state_mut().bind_local(&p.name, addr, p.ty.clone());
                }
                let mut fell_through = true;
                for stmt in &sub.body {
                    match gen.lower_stmt(stmt) {
                        Ok(cont) => {
                            if !cont {
                                fell_through = false;
                                break;
                            }
                        }
                        Err(e) => {
                            gen.state_mut().emit(format!("; codegen error: {e}"));
                            fell_through = false;
                            break;
                        }
                    }
                }
                if fell_through {
                    gen.state_mut().emit_raw(if sub.result.is_some() {
                        "  unreachable"
                    } else {
                        "  ret void"
                    });
                }
                gen.state_mut().emit_raw("}");
                body.push_str(&gen.into_output());
                body.push('\n');
            }
            UnitKind::Package { elaboration } => {
                let mut gen = CodeGen::new(&mut globals, &signatures);
                let fn_name = format!("_ada_elab__{}", mangle_unit_name(&unit.name));
                let _ = writeln!(gen.state_mut().out, "define void @{}() {{", fn_name);
                gen.state_mut().emit_label("entry");
                for stmt in elaboration {
                    let _ = gen.lower_stmt(stmt);
                }
                gen.state_mut().emit_raw("  ret void");
                gen.state_mut().emit_raw("}");
                body.push_str(&gen.into_output());
                body.push('\n');
            }
        }
    }

    let mut module = String::new();
    module.push_str(&super::render_declarations());
    module.push('\n');
    module.push_str(&globals.decls);
    module.push('\n');
    module.push_str(&body);
    module
}

fn mangle_unit_name(name: &str) -> String {
    name.to_lowercase().replace('.', "__")
}

fn collect_signatures(units: &[Unit]) -> HashMap<String, (Vec<String>, String)> {
    let mut map = HashMap::new();
    for unit in units {
        if let UnitKind::Subprogram(sub) = &unit.kind {
            let params = sub.params.iter().map(|p| llvm_type(&p.ty)).collect();
            let ret = sub
                .result
                .as_ref()
                .map(llvm_type)
                .unwrap_or_else(|| "void".to_string());
            map.insert(sub.mangled_name.clone(), (params, ret));
        }
    }
    map
}

impl<'a> CodeGen<'a> {
    fn state_mut(&mut self) -> &mut super::state::CodegenState {
        &mut self.state
    }
}
