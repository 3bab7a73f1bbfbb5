//! Expression lowering and emission of the statement forms that don't
//! involve branching: assignment, calls, returns, raises, declare blocks.

use super::types::{llvm_type, size_of};
use super::{CodeGen, CodeGenError};
use crate::ir::{AttributeKind, Check, Expr, Handler, LocalDecl, Stmt};

impl<'a> CodeGen<'a> {
    /// Lowers an expression to a value register, emitting whatever
    /// instructions are needed to compute it, and returns that register.
    pub(super) fn lower_expr(&mut self, expr: &Expr) -> Result<String, CodeGenError> {
        match expr {
            Expr::IntLiteral { value, .. } => Ok(value.to_string()),
            Expr::RealLiteral { value, .. } => Ok(format!("{:e}", value)),
            Expr::EnumLiteral { position, .. } => Ok(position.to_string()),
            Expr::StringLiteral { value, .. } => {
                let global = self.globals.intern(value);
                let bounds_global = self.globals.intern_bounds(1, value.chars().count() as i64);
                let temp = self.state.fresh_temp();
                self.state.emit(format!(
                    "{} = insertvalue {{ ptr, ptr }} undef, ptr {}, 0",
                    temp, global
                ));
                let bounds = self.state.fresh_temp();
                self.state.emit(format!(
                    "{} = insertvalue {{ ptr, ptr }} {}, ptr {}, 1",
                    bounds, temp, bounds_global
                ));
                Ok(bounds)
            }
            Expr::Local { name, .. } => {
                let (addr, ty) = self
                    .state
                    .local(name)
                    .cloned_pair()
                    .ok_or_else(|| CodeGenError::Logic(format!("unbound local '{name}'")))?;
                let temp = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = load {}, ptr {}", temp, llvm_type(&ty), addr));
                Ok(temp)
            }
            Expr::Global { mangled_name, ty } => {
                let temp = self.state.fresh_temp();
                self.state.emit(format!(
                    "{} = load {}, ptr @{}",
                    temp,
                    llvm_type(ty),
                    mangled_name
                ));
                Ok(temp)
            }
            Expr::Selected { base, offset, ty } => {
                let base_reg = self.lower_expr(base)?;
                let gep = self.state.fresh_temp();
                self.state.emit(format!(
                    "{} = getelementptr inbounds {}, ptr {}, i32 0, i32 {}",
                    gep,
                    llvm_type(&base.ty()),
                    base_reg,
                    offset
                ));
                let temp = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = load {}, ptr {}", temp, llvm_type(ty), gep));
                Ok(temp)
            }
            Expr::Indexed { base, index, ty, checks } => {
                let index_reg = self.lower_expr(index)?;
                let gep = self.lower_array_element_ptr(base, &index_reg, ty, checks)?;
                let temp = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = load {}, ptr {}", temp, llvm_type(ty), gep));
                Ok(temp)
            }
            Expr::Call { target, args, ty } => {
                let mut arg_regs = Vec::with_capacity(args.len());
                for arg in args {
                    arg_regs.push((self.lower_expr(arg)?, llvm_type(&arg.ty())));
                }
                let args_text = arg_regs
                    .iter()
                    .map(|(reg, t)| format!("{} {}", t, reg))
                    .collect::<Vec<_>>()
                    .join(", ");
                let callee = format!("@{}", mangle_call_target(&target.name));
                if matches!(ty, crate::types::Type::Error) {
                    self.state.emit(format!("call void {}({})", callee, args_text));
                    return Ok("0".to_string());
                }
                let temp = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = call {} {}({})", temp, llvm_type(ty), callee, args_text));
                Ok(temp)
            }
            Expr::Binary { op, lhs, rhs, ty, checks } => {
                let l = self.lower_expr(lhs)?;
                let r = self.lower_expr(rhs)?;
                let opname = binop_instr(*op);
                if checks.iter().any(|c| matches!(c, Check::Division)) {
                    let symbol = super::runtime::check_symbol("division");
                    self.state.emit(format!("call void @{symbol}(i64 {r})"));
                }
                let temp = self.state.fresh_temp();
                self.state.emit(format!(
                    "{} = {} {} {}, {}",
                    temp,
                    opname,
                    llvm_type(&lhs.ty()),
                    l,
                    r
                ));
                if checks.iter().any(|c| matches!(c, Check::Overflow)) {
                    let symbol = super::runtime::check_symbol("overflow");
                    self.state
                        .emit(format!("call void @{symbol}(i64 {l}, i64 {r}, i64 {temp})"));
                }
                let _ = ty;
                Ok(temp)
            }
            Expr::Unary { op, operand, checks, .. } => {
                let v = self.lower_expr(operand)?;
                match op {
                    crate::ast::UnOp::Minus => {
                        let temp = self.state.fresh_temp();
                        self.state.emit(format!(
                            "{} = sub {} 0, {}",
                            temp,
                            llvm_type(&operand.ty()),
                            v
                        ));
                        if checks.iter().any(|c| matches!(c, Check::Overflow)) {
                            let symbol = super::runtime::check_symbol("overflow");
                            // Negation only overflows at the minimum
                            // representable value, where v + (-v) != 0.
                            self.state
                                .emit(format!("call void @{symbol}(i64 {v}, i64 {temp}, i64 0)"));
                        }
                        Ok(temp)
                    }
                    crate::ast::UnOp::Plus => Ok(v),
                    crate::ast::UnOp::Not => {
                        let temp = self.state.fresh_temp();
                        self.state.emit(format!("{} = xor i1 {}, 1", temp, v));
                        Ok(temp)
                    }
                    crate::ast::UnOp::Abs => {
                        let temp = self.state.fresh_temp();
                        self.state.emit(format!(
                            "{} = call {} @ada_rt_abs({} {})",
                            temp,
                            llvm_type(&operand.ty()),
                            llvm_type(&operand.ty()),
                            v
                        ));
                        Ok(temp)
                    }
                }
            }
            Expr::Convert { expr, from, to, checks } => {
                let v = self.lower_expr(expr)?;
                for check in checks {
                    if let Check::Range { lo, hi } = check {
                        let symbol = super::runtime::check_symbol("range");
                        self.state
                            .emit(format!("call void @{symbol}(i64 {v}, i64 {lo}, i64 {hi})"));
                    }
                }
                if llvm_type(from) == llvm_type(to) {
                    return Ok(v);
                }
                let temp = self.state.fresh_temp();
                self.state.emit(format!(
                    "{} = sext {} {} to {}",
                    temp,
                    llvm_type(from),
                    v,
                    llvm_type(to)
                ));
                Ok(temp)
            }
            Expr::Aggregate { components, ty } => {
                let mut agg = "undef".to_string();
                let llty = llvm_type(ty);
                for (i, comp) in components.iter().enumerate() {
                    let v = self.lower_expr(comp)?;
                    let next = self.state.fresh_temp();
                    self.state.emit(format!(
                        "{} = insertvalue {} {}, {} {}, {}",
                        next,
                        llty,
                        agg,
                        llvm_type(&comp.ty()),
                        v,
                        i
                    ));
                    agg = next;
                }
                Ok(agg)
            }
            Expr::Attribute { kind, operand, ty } => self.lower_attribute(*kind, operand, ty),
            Expr::Allocator { ty, init } => {
                let temp = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = call ptr @ada_rt_alloc(i64 {})", temp, size_of(ty)));
                if let Some(init) = init {
                    let v = self.lower_expr(init)?;
                    self.state
                        .emit(format!("store {} {}, ptr {}", llvm_type(ty), v, temp));
                }
                Ok(temp)
            }
            Expr::Null { .. } => Ok("null".to_string()),
            Expr::Select(cond, then_e, else_e, ty) => {
                let c = self.lower_expr(cond)?;
                let t_label = self.state.fresh_label("sel.then");
                let e_label = self.state.fresh_label("sel.else");
                let merge = self.state.fresh_label("sel.end");
                self.state
                    .emit(format!("br i1 {}, label %{}, label %{}", c, t_label, e_label));
                self.state.emit_label(&t_label);
                let t_val = self.lower_expr(then_e)?;
                self.state.emit(format!("br label %{}", merge));
                self.state.emit_label(&e_label);
                let e_val = self.lower_expr(else_e)?;
                self.state.emit(format!("br label %{}", merge));
                self.state.emit_label(&merge);
                let temp = self.state.fresh_temp();
                self.state.emit(format!(
                    "{} = phi {} [ {}, %{} ], [ {}, %{} ]",
                    temp,
                    llvm_type(ty),
                    t_val,
                    t_label,
                    e_val,
                    e_label
                ));
                Ok(temp)
            }
            Expr::Error => Err(CodeGenError::Logic(
                "attempted to codegen an Error node".to_string(),
            )),
        }
    }

    fn lower_attribute(
        &mut self,
        kind: AttributeKind,
        operand: &Expr,
        ty: &crate::types::Type,
    ) -> Result<String, CodeGenError> {
        let base = operand.ty();
        match kind {
            AttributeKind::First => match base.base() {
                crate::types::Type::Integer { lo, .. } => Ok(lo.to_string()),
                crate::types::Type::Array { index, .. } => match &index[0] {
                    crate::types::IndexConstraint::Constrained { lo, .. } => Ok(lo.to_string()),
                    crate::types::IndexConstraint::Unconstrained { .. } => {
                        let bounds = self.lower_bounds_ptr(operand)?;
                        let temp = self.state.fresh_temp();
                        self.state.emit(format!(
                            "{} = call i64 @ada_rt_array_first(ptr {})",
                            temp, bounds
                        ));
                        Ok(temp)
                    }
                },
                _ => Err(CodeGenError::Logic("'First on unsupported type".to_string())),
            },
            AttributeKind::Last => match base.base() {
                crate::types::Type::Integer { hi, .. } => Ok(hi.to_string()),
                crate::types::Type::Array { index, .. } => match &index[0] {
                    crate::types::IndexConstraint::Constrained { hi, .. } => Ok(hi.to_string()),
                    crate::types::IndexConstraint::Unconstrained { .. } => {
                        let bounds = self.lower_bounds_ptr(operand)?;
                        let temp = self.state.fresh_temp();
                        self.state.emit(format!(
                            "{} = call i64 @ada_rt_array_last(ptr {})",
                            temp, bounds
                        ));
                        Ok(temp)
                    }
                },
                _ => Err(CodeGenError::Logic("'Last on unsupported type".to_string())),
            },
            AttributeKind::Length => {
                let bounds = self.lower_bounds_ptr(operand)?;
                let temp = self.state.fresh_temp();
                self.state.emit(format!(
                    "{} = call i64 @ada_rt_array_length(ptr {})",
                    temp, bounds
                ));
                Ok(temp)
            }
            AttributeKind::Pos | AttributeKind::Val => self.lower_expr(operand),
            AttributeKind::Pred => {
                let v = self.lower_expr(operand)?;
                let temp = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = sub {} {}, 1", temp, llvm_type(&base), v));
                Ok(temp)
            }
            AttributeKind::Succ => {
                let v = self.lower_expr(operand)?;
                let temp = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = add {} {}, 1", temp, llvm_type(&base), v));
                Ok(temp)
            }
            AttributeKind::Image => {
                let v = self.lower_expr(operand)?;
                let temp = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = call {{ ptr, ptr }} @ada_rt_image_int({} {})", temp, llvm_type(&base), v));
                Ok(temp)
            }
            AttributeKind::Value => {
                let v = self.lower_expr(operand)?;
                let temp = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = call {} @ada_rt_value_int(ptr {})", temp, llvm_type(ty), v));
                Ok(temp)
            }
            AttributeKind::Size => Ok(size_of(&base).to_string()),
        }
    }

    /// Extracts the bounds-block pointer (fat pointer word 1) from an
    /// unconstrained array/string rvalue, for the `'First`/`'Last`/`'Length`
    /// attributes and for indexing.
    fn lower_bounds_ptr(&mut self, operand: &Expr) -> Result<String, CodeGenError> {
        let fat = self.lower_expr(operand)?;
        let bounds = self.state.fresh_temp();
        self.state
            .emit(format!("{} = extractvalue {{ ptr, ptr }} {}, 1", bounds, fat));
        Ok(bounds)
    }

    /// Computes the address of `base[index]`, emitting the index check
    /// (against the array's real bounds) and subtracting the low bound so
    /// the `getelementptr` is zero-based.
    ///
    /// For a constrained array, `lo`/`hi` are static and `base`'s own
    /// address is indexed directly. For an unconstrained array/string, the
    /// fat pointer's data-pointer and bounds-block words are split apart
    /// with `extractvalue`, and `lo`/`hi` are read from the bounds block at
    /// run time.
    fn lower_array_element_ptr(
        &mut self,
        base: &Expr,
        index_reg: &str,
        elem_ty: &crate::types::Type,
        checks: &[Check],
    ) -> Result<String, CodeGenError> {
        let base_ty = base.ty();
        let index_constraint = match base_ty.base() {
            crate::types::Type::Array { index, .. } => &index[0],
            other => {
                return Err(CodeGenError::Logic(format!(
                    "indexing a non-array type {other:?}"
                )))
            }
        };
        let (data_ptr, lo_reg, hi_reg) = match index_constraint {
            crate::types::IndexConstraint::Constrained { lo, hi } => {
                let addr = self.lower_lvalue(base)?;
                (addr, lo.to_string(), hi.to_string())
            }
            crate::types::IndexConstraint::Unconstrained { .. } => {
                let fat = self.lower_expr(base)?;
                let data = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = extractvalue {{ ptr, ptr }} {}, 0", data, fat));
                let bounds = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = extractvalue {{ ptr, ptr }} {}, 1", bounds, fat));
                let lo = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = call i64 @ada_rt_array_first(ptr {})", lo, bounds));
                let hi = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = call i64 @ada_rt_array_last(ptr {})", hi, bounds));
                (data, lo, hi)
            }
        };
        if checks.iter().any(|c| matches!(c, Check::Index)) {
            let symbol = super::runtime::check_symbol("index");
            self.state.emit(format!(
                "call void @{symbol}(i64 {index_reg}, i64 {lo_reg}, i64 {hi_reg})"
            ));
        }
        let offset = self.state.fresh_temp();
        self.state
            .emit(format!("{} = sub i64 {}, {}", offset, index_reg, lo_reg));
        let gep = self.state.fresh_temp();
        self.state.emit(format!(
            "{} = getelementptr inbounds {}, ptr {}, i64 {}",
            gep,
            llvm_type(elem_ty),
            data_ptr,
            offset
        ));
        Ok(gep)
    }

    pub(super) fn lower_local_decl(&mut self, decl: &LocalDecl) -> Result<(), CodeGenError> {
        let llty = llvm_type(&decl.ty);
        let addr = self.state.fresh_temp();
        if decl.on_secondary_stack {
            self.state
                .emit(format!("{} = call ptr @ada_rt_sec_stack_alloc(i64 sizeof({}))", addr, llty));
        } else {
            self.state.emit(format!("{} = alloca {}", addr, llty));
        }
        if let Some(init) = &decl.init {
            let v = self.lower_expr(init)?;
            self.state.emit(format!("store {} {}, ptr {}", llty, v, addr));
        }
        self.state.bind_local(&decl.name, addr, decl.ty.clone());
        Ok(())
    }

    /// Lowers one statement, returning whether control falls through to the
    /// next statement (false after a `return`/`raise`/`goto`/`exit`).
    pub(super) fn lower_stmt(&mut self, stmt: &Stmt) -> Result<bool, CodeGenError> {
        match stmt {
            Stmt::Assign { target, value } => {
                let v = self.lower_expr(value)?;
                let addr = self.lower_lvalue(target)?;
                self.state
                    .emit(format!("store {} {}, ptr {}", llvm_type(&target.ty()), v, addr));
                Ok(true)
            }
            Stmt::Call { target, args } => {
                let mut arg_regs = Vec::with_capacity(args.len());
                for arg in args {
                    arg_regs.push((self.lower_expr(arg)?, llvm_type(&arg.ty())));
                }
                let args_text = arg_regs
                    .iter()
                    .map(|(reg, t)| format!("{} {}", t, reg))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.state.emit(format!(
                    "call void @{}({})",
                    mangle_call_target(&target.name),
                    args_text
                ));
                Ok(true)
            }
            Stmt::Return { value } => {
                match value {
                    Some(expr) => {
                        let v = self.lower_expr(expr)?;
                        self.state
                            .emit(format!("ret {} {}", llvm_type(&expr.ty()), v));
                    }
                    None => self.state.emit("ret void"),
                }
                Ok(false)
            }
            Stmt::Raise { exception_identity } => {
                self.state
                    .emit(format!("call void @ada_rt_raise(i64 {})", exception_identity));
                self.state.emit("unreachable");
                Ok(false)
            }
            Stmt::Reraise => {
                self.state.emit("call void @ada_rt_reraise()");
                self.state.emit("unreachable");
                Ok(false)
            }
            Stmt::Delay { seconds } => {
                let v = self.lower_expr(seconds)?;
                self.state
                    .emit(format!("call void @ada_rt_delay(double {})", v));
                Ok(true)
            }
            Stmt::Goto(label) => {
                self.state.emit(format!("br label %{}", label));
                Ok(false)
            }
            Stmt::Label(label) => {
                self.state.emit_label(label);
                Ok(true)
            }
            Stmt::Null => Ok(true),
            Stmt::Block { locals, body, handlers } => self.lower_block(locals, body, handlers),
            other => self.lower_control_flow(other),
        }
    }

    pub(super) fn lower_block(
        &mut self,
        locals: &[LocalDecl],
        body: &[Stmt],
        handlers: &[Handler],
    ) -> Result<bool, CodeGenError> {
        let frame = if handlers.is_empty() {
            None
        } else {
            let f = self.state.fresh_temp();
            self.state.emit(format!("{} = call ptr @ada_rt_frame_push()", f));
            Some(f)
        };
        for decl in locals {
            self.lower_local_decl(decl)?;
        }
        let mut fell_through = true;
        for s in body {
            if !self.lower_stmt(s)? {
                fell_through = false;
                break;
            }
        }
        for decl in locals {
            self.state.unbind_local(&decl.name);
        }
        if let Some(frame) = frame {
            self.state.emit(format!("call void @ada_rt_frame_pop(ptr {})", frame));
            if !handlers.is_empty() {
                let handled = self.state.fresh_label("handler");
                let done = self.state.fresh_label("handled.end");
                let exc = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = call i64 @ada_rt_current_exception()", exc));
                self.state.emit(format!(
                    "br i1 icmp ne (i64 {}, i64 0), label %{}, label %{}",
                    exc, handled, done
                ));
                self.state.emit_label(&handled);
                for handler in handlers {
                    for s in &handler.body {
                        self.lower_stmt(s)?;
                    }
                }
                self.state.emit(format!("br label %{}", done));
                self.state.emit_label(&done);
            }
        }
        Ok(fell_through)
    }

    fn lower_lvalue(&mut self, expr: &Expr) -> Result<String, CodeGenError> {
        match expr {
            Expr::Local { name, .. } => self
                .state
                .local(name)
                .map(|(addr, _)| addr.clone())
                .ok_or_else(|| CodeGenError::Logic(format!("unbound local '{name}'"))),
            Expr::Global { mangled_name, .. } => Ok(format!("@{}", mangled_name)),
            Expr::Selected { base, offset, .. } => {
                let base_reg = self.lower_lvalue(base)?;
                let gep = self.state.fresh_temp();
                self.state.emit(format!(
                    "{} = getelementptr inbounds {}, ptr {}, i32 0, i32 {}",
                    gep,
                    llvm_type(&base.ty()),
                    base_reg,
                    offset
                ));
                Ok(gep)
            }
            Expr::Indexed { base, index, ty, checks } => {
                let index_reg = self.lower_expr(index)?;
                self.lower_array_element_ptr(base, &index_reg, ty, checks)
            }
            other => Err(CodeGenError::Logic(format!(
                "expression is not an assignable location: {other:?}"
            ))),
        }
    }
}

fn mangle_call_target(name: &str) -> String {
    format!("_ada_{}", name.to_lowercase().replace('.', "__"))
}

fn binop_instr(op: crate::ast::BinOp) -> &'static str {
    use crate::ast::BinOp::*;
    match op {
        Add => "add",
        Sub => "sub",
        Mul => "mul",
        Div => "sdiv",
        Mod => "srem",
        Rem => "srem",
        Pow => "call_pow",
        Eq => "icmp eq",
        Neq => "icmp ne",
        Lt => "icmp slt",
        Lte => "icmp sle",
        Gt => "icmp sgt",
        Gte => "icmp sge",
        And | AndThen => "and",
        Or | OrElse => "or",
        Xor => "xor",
        Concat => "call_concat",
    }
}

trait ClonedPair {
    fn cloned_pair(&self) -> Option<(String, crate::types::Type)>;
}

impl ClonedPair for Option<&(String, crate::types::Type)> {
    fn cloned_pair(&self) -> Option<(String, crate::types::Type)> {
        self.map(|(s, t)| (s.clone(), t.clone()))
    }
}
