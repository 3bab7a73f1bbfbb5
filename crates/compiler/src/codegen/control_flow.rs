//! Branching statement forms: if/case/loop/exit, and the tasking
//! rendezvous forms (accept/select/entry call).

use super::{CodeGen, CodeGenError, LoopCtx};
use crate::ir::{LoopKind, Stmt};

impl<'a> CodeGen<'a> {
    pub(super) fn lower_control_flow(&mut self, stmt: &Stmt) -> Result<bool, CodeGenError> {
        match stmt {
            Stmt::If { arms, else_branch } => self.lower_if(arms, else_branch),
            Stmt::Case { selector, arms, others } => self.lower_case(selector, arms, others),
            Stmt::Loop { label, kind, body } => self.lower_loop(label.clone(), kind, body),
            Stmt::Exit { label, when } => self.lower_exit(label.as_deref(), when.as_ref()),
            Stmt::EntryCall { task, entry_id, args } => {
                let task_reg = self
                    .state
                    .local(task)
                    .map(|(addr, _)| addr.clone())
                    .unwrap_or_else(|| format!("@{}", task));
                let mut arg_regs = Vec::with_capacity(args.len());
                for arg in args {
                    arg_regs.push(self.lower_expr(arg)?);
                }
                let packed = self.pack_args(&arg_regs);
                self.state.emit(format!(
                    "call void @ada_rt_entry_call(ptr {}, i32 {}, ptr {})",
                    task_reg, entry_id, packed
                ));
                Ok(true)
            }
            Stmt::Accept { entry_id, params, body } => {
                let slot = self.state.fresh_temp();
                self.state
                    .emit(format!("{} = call i32 @ada_rt_accept_wait(i32 {})", slot, entry_id));
                self.bind_entry_params(&slot, params);
                let fell_through = {
                    let mut ft = true;
                    for s in body {
                        if !self.lower_stmt(s)? {
                            ft = false;
                            break;
                        }
                    }
                    ft
                };
                self.unbind_entry_params(params);
                self.state
                    .emit(format!("call void @ada_rt_accept_complete(i32 {})", slot));
                Ok(fell_through)
            }
            Stmt::Select { arms, else_branch } => self.lower_select(arms, else_branch.as_deref()),
            other => unreachable!("not a control-flow statement: {other:?}"),
        }
    }

    fn lower_if(
        &mut self,
        arms: &[(crate::ir::Expr, Vec<Stmt>)],
        else_branch: &[Stmt],
    ) -> Result<bool, CodeGenError> {
        let merge = self.state.fresh_label("if.end");
        let mut any_fallthrough = false;
        for (cond, body) in arms {
            let c = self.lower_expr(cond)?;
            let then_label = self.state.fresh_label("if.then");
            let next_label = self.state.fresh_label("if.next");
            self.state
                .emit(format!("br i1 {}, label %{}, label %{}", c, then_label, next_label));
            self.state.emit_label(&then_label);
            let mut ft = true;
            for s in body {
                if !self.lower_stmt(s)? {
                    ft = false;
                    break;
                }
            }
            if ft {
                any_fallthrough = true;
                self.state.emit(format!("br label %{}", merge));
            }
            self.state.emit_label(&next_label);
        }
        let mut ft = true;
        for s in else_branch {
            if !self.lower_stmt(s)? {
                ft = false;
                break;
            }
        }
        if ft {
            any_fallthrough = true;
            self.state.emit(format!("br label %{}", merge));
        }
        if any_fallthrough {
            self.state.emit_label(&merge);
        }
        Ok(any_fallthrough)
    }

    fn lower_case(
        &mut self,
        selector: &crate::ir::Expr,
        arms: &[(Vec<i128>, Vec<Stmt>)],
        others: &Option<Vec<Stmt>>,
    ) -> Result<bool, CodeGenError> {
        let sel = self.lower_expr(selector)?;
        let merge = self.state.fresh_label("case.end");
        let default_label = self.state.fresh_label("case.others");
        let mut labels = Vec::with_capacity(arms.len());
        for _ in arms {
            labels.push(self.state.fresh_label("case.arm"));
        }
        let targets = arms
            .iter()
            .zip(labels.iter())
            .flat_map(|((choices, _), label)| {
                choices
                    .iter()
                    .map(move |c| format!("i64 {}, label %{}", c, label))
            })
            .collect::<Vec<_>>()
            .join(" ");
        self.state.emit(format!(
            "switch i64 {} , label %{} [ {} ]",
            sel, default_label, targets
        ));
        let mut any_fallthrough = false;
        for ((_, body), label) in arms.iter().zip(labels.iter()) {
            self.state.emit_label(label);
            let mut ft = true;
            for s in body {
                if !self.lower_stmt(s)? {
                    ft = false;
                    break;
                }
            }
            if ft {
                any_fallthrough = true;
                self.state.emit(format!("br label %{}", merge));
            }
        }
        self.state.emit_label(&default_label);
        let mut ft = true;
        if let Some(body) = others {
            for s in body {
                if !self.lower_stmt(s)? {
                    ft = false;
                    break;
                }
            }
        } else {
            self.state.emit("unreachable");
            ft = false;
        }
        if ft {
            any_fallthrough = true;
            self.state.emit(format!("br label %{}", merge));
        }
        if any_fallthrough {
            self.state.emit_label(&merge);
        }
        Ok(any_fallthrough)
    }

    fn lower_loop(
        &mut self,
        label: Option<String>,
        kind: &LoopKind,
        body: &[Stmt],
    ) -> Result<bool, CodeGenError> {
        let head = self.state.fresh_label("loop.head");
        let exit = self.state.fresh_label("loop.end");
        self.loop_stack.push(LoopCtx {
            label,
            exit_label: exit.clone(),
        });

        match kind {
            LoopKind::Plain => {
                self.state.emit(format!("br label %{}", head));
                self.state.emit_label(&head);
            }
            LoopKind::While(cond) => {
                self.state.emit(format!("br label %{}", head));
                self.state.emit_label(&head);
                let c = self.lower_expr(cond)?;
                let body_label = self.state.fresh_label("loop.body");
                self.state
                    .emit(format!("br i1 {}, label %{}, label %{}", c, body_label, exit));
                self.state.emit_label(&body_label);
            }
            LoopKind::For { var, lo, hi, reverse } => {
                let lo_v = self.lower_expr(lo)?;
                let hi_v = self.lower_expr(hi)?;
                let slot = self.state.fresh_temp();
                self.state.emit(format!("{} = alloca i64", slot));
                let start = if *reverse { &hi_v } else { &lo_v };
                self.state
                    .emit(format!("store i64 {}, ptr {}", start, slot));
                self.state
                    .bind_local(var, slot.clone(), crate::types::Type::UniversalInteger);
                self.state.emit(format!("br label %{}", head));
                self.state.emit_label(&head);
                let cur = self.state.fresh_temp();
                self.state.emit(format!("{} = load i64, ptr {}", cur, slot));
                let cond = self.state.fresh_temp();
                if *reverse {
                    self.state
                        .emit(format!("{} = icmp sge i64 {}, {}", cond, cur, lo_v));
                } else {
                    self.state
                        .emit(format!("{} = icmp sle i64 {}, {}", cond, cur, hi_v));
                }
                let body_label = self.state.fresh_label("loop.body");
                self.state.emit(format!(
                    "br i1 {}, label %{}, label %{}",
                    cond, body_label, exit
                ));
                self.state.emit_label(&body_label);
            }
        }

        let mut ft = true;
        for s in body {
            if !self.lower_stmt(s)? {
                ft = false;
                break;
            }
        }

        if ft {
            if let LoopKind::For { var, reverse, .. } = kind {
                let (addr, _) = self.state.local(var).unwrap().clone();
                let cur = self.state.fresh_temp();
                self.state.emit(format!("{} = load i64, ptr {}", cur, addr));
                let next = self.state.fresh_temp();
                if *reverse {
                    self.state.emit(format!("{} = sub i64 {}, 1", next, cur));
                } else {
                    self.state.emit(format!("{} = add i64 {}, 1", next, cur));
                }
                self.state.emit(format!("store i64 {}, ptr {}", next, addr));
            }
            self.state.emit(format!("br label %{}", head));
        }
        self.state.emit_label(&exit);
        if let LoopKind::For { var, .. } = kind {
            self.state.unbind_local(var);
        }
        self.loop_stack.pop();
        Ok(true)
    }

    fn lower_exit(
        &mut self,
        label: Option<&str>,
        when: Option<&crate::ir::Expr>,
    ) -> Result<bool, CodeGenError> {
        let target = match label {
            Some(name) => self
                .loop_stack
                .iter()
                .rev()
                .find(|ctx| ctx.label.as_deref() == Some(name))
                .map(|ctx| ctx.exit_label.clone()),
            None => self.loop_stack.last().map(|ctx| ctx.exit_label.clone()),
        }
        .ok_or_else(|| CodeGenError::Logic("exit outside a loop".to_string()))?;

        match when {
            Some(cond) => {
                let c = self.lower_expr(cond)?;
                let cont = self.state.fresh_label("exit.cont");
                self.state
                    .emit(format!("br i1 {}, label %{}, label %{}", c, target, cont));
                self.state.emit_label(&cont);
                Ok(true)
            }
            None => {
                self.state.emit(format!("br label %{}", target));
                Ok(false)
            }
        }
    }

    /// Probes each arm's entry in turn: a guarded arm that evaluates false
    /// is skipped entirely (its entry is closed for this `select`, so it's
    /// never even tried), otherwise a non-blocking `accept_try` decides
    /// whether that arm fires. The first open, non-empty entry wins; if
    /// none has a pending call, the `else` part runs (or the `select`
    /// falls through if there isn't one — callers of a `select` with no
    /// `else` are required to guarantee some arm is always eventually
    /// ready, same as Ada's `Program_Error` requirement we don't enforce
    /// here).
    fn lower_select(
        &mut self,
        arms: &[crate::ir::SelectArm],
        else_branch: Option<&[Stmt]>,
    ) -> Result<bool, CodeGenError> {
        let merge = self.state.fresh_label("select.end");
        let else_label = self.state.fresh_label("select.else");

        let mut check_labels = Vec::with_capacity(arms.len());
        let mut probe_labels = Vec::with_capacity(arms.len());
        let mut arm_labels = Vec::with_capacity(arms.len());
        for _ in arms {
            check_labels.push(self.state.fresh_label("select.check"));
            probe_labels.push(self.state.fresh_label("select.probe"));
            arm_labels.push(self.state.fresh_label("select.arm"));
        }

        self.state.emit(format!("br label %{}", check_labels[0]));

        for (i, arm) in arms.iter().enumerate() {
            let next = check_labels.get(i + 1).unwrap_or(&else_label);
            self.state.emit_label(&check_labels[i]);
            match &arm.guard {
                Some(guard) => {
                    let cond = self.lower_expr(guard)?;
                    self.state.emit(format!(
                        "br i1 {}, label %{}, label %{}",
                        cond, probe_labels[i], next
                    ));
                }
                None => self.state.emit(format!("br label %{}", probe_labels[i])),
            }

            self.state.emit_label(&probe_labels[i]);
            let token = self.state.fresh_temp();
            self.state
                .emit(format!("{} = call i32 @ada_rt_accept_try(i32 {})", token, arm.entry_id));
            let open = self.state.fresh_temp();
            self.state
                .emit(format!("{} = icmp ne i32 {}, 0", open, token));
            self.state
                .emit(format!("br i1 {}, label %{}, label %{}", open, arm_labels[i], next));

            self.state.emit_label(&arm_labels[i]);
            self.bind_entry_params(&token, &arm.params);
            for s in &arm.body {
                self.lower_stmt(s)?;
            }
            self.unbind_entry_params(&arm.params);
            self.state
                .emit(format!("call void @ada_rt_accept_complete(i32 {})", token));
            self.state.emit(format!("br label %{}", merge));
        }

        self.state.emit_label(&else_label);
        if let Some(body) = else_branch {
            for s in body {
                self.lower_stmt(s)?;
            }
        }
        self.state.emit(format!("br label %{}", merge));
        self.state.emit_label(&merge);
        Ok(true)
    }

    /// Fetches entry `token`'s argument buffer and binds each formal
    /// parameter to a pointer into it, so the accept/select arm body can
    /// read and write them like any other local.
    fn bind_entry_params(&mut self, token: &str, params: &[crate::ir::IrParam]) -> String {
        let args_ptr = self.state.fresh_temp();
        self.state
            .emit(format!("{} = call ptr @ada_rt_accept_args(i32 {})", args_ptr, token));
        for (i, param) in params.iter().enumerate() {
            let slot = self.state.fresh_temp();
            self.state.emit(format!(
                "{} = getelementptr i64, ptr {}, i32 {}",
                slot, args_ptr, i
            ));
            self.state.bind_local(param.name.clone(), slot, param.ty.clone());
        }
        args_ptr
    }

    fn unbind_entry_params(&mut self, params: &[crate::ir::IrParam]) {
        for param in params {
            self.state.unbind_local(&param.name);
        }
    }

    /// Packs entry-call arguments into a single buffer the runtime copies
    /// into the accepting task's parameter locals.
    fn pack_args(&mut self, arg_regs: &[String]) -> String {
        if arg_regs.is_empty() {
            return "null".to_string();
        }
        let slot = self.state.fresh_temp();
        self.state
            .emit(format!("{} = alloca [{} x i64]", slot, arg_regs.len()));
        for (i, reg) in arg_regs.iter().enumerate() {
            let gep = self.state.fresh_temp();
            self.state.emit(format!(
                "{} = getelementptr [{} x i64], ptr {}, i32 0, i32 {}",
                gep,
                arg_regs.len(),
                slot,
                i
            ));
            self.state.emit(format!("store i64 {}, ptr {}", reg, gep));
        }
        slot
    }
}
