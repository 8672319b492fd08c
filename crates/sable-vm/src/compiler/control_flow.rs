//! Branching statements: if, switch, loops, try, break and continue
//!
//! Jump offsets are relative. `Jump` and the conditional jumps skip that
//! many instructions after their own; `JumpBack` lands exactly that many
//! instructions before itself.

use super::context::{Branch, BranchKind};
use super::Compiler;
use crate::bytecode::Address;
use crate::error::CompileError;
use crate::opcode::OpCode;
use sable_parser::ast::{Block, Case, Expr, ForKind, ForStmt, Stmt, SwitchStmt, TryStmt};
use sable_parser::Pos;
use sable_types::Value;

/// `TestJump` modes
pub(crate) const JUMP_IF_TRUE: i32 = 0;
pub(crate) const JUMP_IF_FALSE: i32 = 1;
pub(crate) const JUMP_IF_NOT_NIL: i32 = 2;

impl Compiler {
    pub(crate) fn in_try(&self) -> bool {
        self.branches.iter().any(|b| b.kind == BranchKind::Try)
    }

    fn open_branch(&mut self, kind: BranchKind, label: Option<&str>) {
        self.branches.push(Branch::new(kind, label.map(str::to_string)));
    }

    /// Pops the innermost branch and patches its pending jumps now that
    /// `break_pc` is known.
    fn close_branch(&mut self, break_pc: usize) {
        let branch = match self.branches.pop() {
            Some(b) => b,
            None => return,
        };

        for pc in branch.breaks {
            let offset = break_pc.saturating_sub(pc + 1) as i32;
            self.instr_mut(pc).a = Address::imm(offset);
        }
        for pc in branch.continues {
            let offset = pc.saturating_sub(branch.continue_pc) as i32;
            self.instr_mut(pc).a = Address::imm(offset);
        }
    }

    fn set_continue_pc(&mut self, pc: usize) {
        if let Some(b) = self.branches.last_mut() {
            b.continue_pc = pc;
        }
    }

    fn check_exit(&self, pos: Pos) -> Result<(), CompileError> {
        if self.branches.is_empty() {
            return Err(self.error("Unexpected exit", pos));
        }
        for b in self.branches.iter().rev() {
            if b.kind != BranchKind::Try {
                return Ok(());
            }
            if b.in_finally {
                return Err(self.error("Control cannot leave the body of a finally clause", pos));
            }
        }
        Ok(())
    }

    /// Leaves every try block between the innermost branch and `target`.
    fn compile_branch_exit(&mut self, target: usize, pos: Pos) {
        let tries = self.branches[target..]
            .iter()
            .filter(|b| b.kind == BranchKind::Try)
            .count();
        for _ in 0..tries {
            self.emit(OpCode::TryExit, Address::VOID, Address::VOID, Address::VOID, pos);
        }
    }

    pub(crate) fn compile_break(&mut self, label: Option<&str>, pos: Pos) -> Result<(), CompileError> {
        self.check_exit(pos)?;

        let target = self
            .branches
            .iter()
            .rposition(|b| b.kind != BranchKind::Try && b.accepts(label))
            .ok_or_else(|| self.error("Invalid break", pos))?;

        self.compile_branch_exit(target, pos);
        let pc = self.emit(OpCode::Jump, Address::VOID, Address::VOID, Address::VOID, pos);
        self.branches[target].breaks.push(pc);
        Ok(())
    }

    pub(crate) fn compile_continue(&mut self, label: Option<&str>, pos: Pos) -> Result<(), CompileError> {
        self.check_exit(pos)?;

        let target = self
            .branches
            .iter()
            .rposition(|b| b.kind == BranchKind::Loop && b.accepts(label))
            .ok_or_else(|| self.error("Invalid continue", pos))?;

        self.compile_branch_exit(target, pos);
        let pc = self.emit(OpCode::JumpBack, Address::VOID, Address::VOID, Address::VOID, pos);
        self.branches[target].continues.push(pc);
        Ok(())
    }

    pub(crate) fn compile_if(
        &mut self,
        branches: &[(Expr, Block)],
        else_block: Option<&Block>,
        pos: Pos,
    ) -> Result<(), CompileError> {
        if let ([(cond, body)], None) = (branches, else_block) {
            // no else: a single conditional jump over the body
            let r = self.compile_expr(cond, Address::VOID)?;
            let jump = self.emit(OpCode::TestJump, r, Address::imm(1), Address::imm(JUMP_IF_FALSE), pos);
            let body_start = self.pc();
            self.compile_block(body)?;
            let len = (self.pc() - body_start) as i32;
            self.instr_mut(jump).b = Address::imm(len);
            return Ok(());
        }

        let mut exits = Vec::new();
        for (cond, body) in branches {
            let r = self.compile_expr(cond, Address::VOID)?;

            // when true skip the jump to the next branch
            self.emit(OpCode::TestJump, r, Address::imm(1), Address::imm(JUMP_IF_TRUE), cond.pos());
            let next = self.emit(OpCode::Jump, Address::VOID, Address::VOID, Address::VOID, Pos::default());

            let body_start = self.pc();
            self.compile_block(body)?;
            exits.push(self.emit(OpCode::Jump, Address::VOID, Address::VOID, Address::VOID, Pos::default()));

            let len = (self.pc() - body_start) as i32;
            self.instr_mut(next).a = Address::imm(len);
        }

        if let Some(block) = else_block {
            self.compile_block(block)?;
        }

        let end = self.pc();
        for pc in exits {
            self.instr_mut(pc).a = Address::imm((end - pc - 1) as i32);
        }
        Ok(())
    }

    pub(crate) fn compile_switch(&mut self, s: &SwitchStmt) -> Result<(), CompileError> {
        check_duplicate_cases(self, &s.cases)?;

        self.open_branch(BranchKind::Switch, s.label.as_deref());

        let a = self.compile_expr(&s.value, Address::VOID)?;

        // empty cases fall through to the body of the next non empty one
        let mut fall_throughs: Vec<usize> = Vec::new();

        for case in &s.cases {
            let b = self.compile_expr(&case.value, Address::VOID)?;

            if case.stmts.is_empty() {
                fall_throughs.push(self.emit(OpCode::JumpIfEqual, a, b, Address::VOID, case.pos));
                continue;
            }

            let jump = self.emit(OpCode::JumpIfNotEqual, a, b, Address::VOID, case.pos);

            let body_start = self.pc();
            for pc in fall_throughs.drain(..) {
                self.instr_mut(pc).c = Address::imm((body_start - pc - 1) as i32);
            }

            self.compile_block(&case.stmts)?;
            let len = (self.pc() - body_start) as i32;
            self.instr_mut(jump).c = Address::imm(len);
        }

        if let Some(default) = &s.default {
            let body_start = self.pc();
            for pc in fall_throughs.drain(..) {
                self.instr_mut(pc).c = Address::imm((body_start - pc - 1) as i32);
            }
            self.compile_block(default)?;
        }

        let end = self.pc();
        for pc in fall_throughs {
            self.instr_mut(pc).c = Address::imm((end - pc - 1) as i32);
        }

        self.close_branch(end);
        Ok(())
    }

    pub(crate) fn compile_while(
        &mut self,
        label: Option<&str>,
        cond: &Expr,
        body: &Block,
        pos: Pos,
    ) -> Result<(), CompileError> {
        self.open_branch(BranchKind::Loop, label);
        self.open_scope();

        let loop_start = self.pc();
        self.set_continue_pc(loop_start);

        let r = self.compile_expr(cond, Address::VOID)?;
        let body_start = self.pc();
        let brk = self.emit(OpCode::TestJump, r, Address::VOID, Address::imm(JUMP_IF_FALSE), pos);

        self.compile_block(body)?;

        let steps = (self.pc() - loop_start) as i32;
        self.emit(OpCode::JumpBack, Address::imm(steps), Address::VOID, Address::VOID, Pos::default());

        let body_end = self.pc();
        self.instr_mut(brk).b = Address::imm((body_end - body_start - 1) as i32);

        self.close_scope();
        self.close_branch(body_end);
        Ok(())
    }

    pub(crate) fn compile_for(&mut self, s: &ForStmt) -> Result<(), CompileError> {
        match &s.kind {
            ForKind::In { name, expr } => self.compile_for_in_of(s, name, expr, true),
            ForKind::Of { name, expr } => self.compile_for_in_of(s, name, expr, false),
            ForKind::Step {
                init: None,
                cond: None,
                step: None,
            } => self.compile_endless_for(s),
            ForKind::Step { init, cond, step } => {
                self.compile_step_for(s, init.as_deref(), cond.as_ref(), step.as_deref())
            }
        }
    }

    /// `for (let k in items)` walks keys, `for (let v of items)` values.
    fn compile_for_in_of(&mut self, s: &ForStmt, name: &str, expr: &Expr, keys: bool) -> Result<(), CompileError> {
        self.open_branch(BranchKind::Loop, s.label.as_deref());
        self.open_scope();

        let rng = self.compile_expr(expr, Address::VOID)?;

        let key = self.new_register(name, false, None);
        let items = self.new_temp_register();
        let op = if keys { OpCode::Keys } else { OpCode::Values };
        self.emit(op, items, rng, Address::VOID, s.pos);

        let len = self.new_temp_register();
        self.emit(OpCode::Length, len, items, Address::VOID, Pos::default());

        let counter = self.new_temp_register();
        let zero = self.add_constant(Value::Int(0));
        self.emit(OpCode::LoadConstant, counter, zero, Address::VOID, Pos::default());

        let is_less = self.new_temp_register();

        // skip the first increment
        self.emit(OpCode::Jump, Address::imm(1), Address::VOID, Address::VOID, Pos::default());

        let loop_start = self.pc();
        self.set_continue_pc(loop_start);
        self.emit(OpCode::Inc, counter, Address::VOID, Address::VOID, Pos::default());
        self.emit(OpCode::Less, is_less, counter, len, Pos::default());

        let body_start = self.pc();
        let brk = self.emit(OpCode::TestJump, is_less, Address::VOID, Address::imm(JUMP_IF_FALSE), Pos::default());
        self.emit(OpCode::GetIndexOrKey, key, items, counter, Pos::default());

        self.compile_block(&s.body)?;

        let steps = (self.pc() - loop_start) as i32;
        self.emit(OpCode::JumpBack, Address::imm(steps), Address::VOID, Address::VOID, Pos::default());

        let body_end = self.pc();
        self.instr_mut(brk).b = Address::imm((body_end - body_start - 1) as i32);

        self.close_scope();
        self.close_branch(body_end);
        Ok(())
    }

    fn compile_step_for(
        &mut self,
        s: &ForStmt,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        step: Option<&Stmt>,
    ) -> Result<(), CompileError> {
        self.open_branch(BranchKind::Loop, s.label.as_deref());
        self.open_scope();

        if let Some(init) = init {
            self.compile_stmt(init)?;
        }

        // skip the step on the first pass
        let first = self.emit(OpCode::Jump, Address::VOID, Address::VOID, Address::VOID, Pos::default());

        let loop_start = self.pc();
        self.set_continue_pc(loop_start);

        if let Some(step) = step {
            self.compile_stmt(step)?;
        }
        let skip = (self.pc() - loop_start) as i32;
        self.instr_mut(first).a = Address::imm(skip);

        let mut brk = None;
        if let Some(cond) = cond {
            let r = self.compile_expr(cond, Address::VOID)?;
            brk = Some((
                self.pc(),
                self.emit(OpCode::TestJump, r, Address::VOID, Address::imm(JUMP_IF_FALSE), s.pos),
            ));
        }

        self.compile_block(&s.body)?;

        let steps = (self.pc() - loop_start) as i32;
        self.emit(OpCode::JumpBack, Address::imm(steps), Address::VOID, Address::VOID, Pos::default());

        let body_end = self.pc();
        if let Some((test_pc, jump)) = brk {
            self.instr_mut(jump).b = Address::imm((body_end - test_pc - 1) as i32);
        }

        self.close_scope();
        self.close_branch(body_end);
        Ok(())
    }

    /// `for (;;)`
    fn compile_endless_for(&mut self, s: &ForStmt) -> Result<(), CompileError> {
        self.open_branch(BranchKind::Loop, s.label.as_deref());

        let body_start = self.pc();
        self.set_continue_pc(body_start);

        self.compile_block(&s.body)?;

        let steps = (self.pc() - body_start) as i32;
        self.emit(OpCode::JumpBack, Address::imm(steps), Address::VOID, Address::VOID, Pos::default());

        let end = self.pc();
        self.close_branch(end);
        Ok(())
    }

    /// `Try` holds the catch pc (A), the error register (B) and the finally
    /// pc (C), all absolute.
    pub(crate) fn compile_try(&mut self, t: &TryStmt) -> Result<(), CompileError> {
        let try_pc = self.emit(OpCode::Try, Address::VOID, Address::VOID, Address::VOID, t.pos);

        self.open_scope();
        self.open_branch(BranchKind::Try, None);

        self.compile_block(&t.body)?;

        if t.finally.is_none() {
            self.emit(OpCode::TryEnd, Address::VOID, Address::VOID, Address::VOID, Pos::default());
        }

        // skips the catch block when nothing was thrown
        let jump = self.emit(OpCode::Jump, Address::VOID, Address::VOID, Address::VOID, Pos::default());
        let start = self.pc();

        if let Some(ident) = &t.catch_ident {
            let r = self.new_register(ident, true, None);
            // visible from the start so the handler can write it
            if let Some(reg) = self.func_mut().registers.last_mut() {
                reg.start_pc = 0;
            }
            self.instr_mut(try_pc).b = r;
        }

        if let Some(catch) = &t.catch {
            self.instr_mut(try_pc).a = Address::imm(start as i32);
            self.compile_block(catch)?;
            if t.finally.is_none() {
                self.emit(OpCode::CatchEnd, Address::VOID, Address::VOID, Address::VOID, Pos::default());
            }
        }

        let skip = (self.pc() - start) as i32;
        self.instr_mut(jump).a = Address::imm(skip);

        if let Some(finally) = &t.finally {
            if let Some(b) = self.branches.last_mut() {
                b.in_finally = true;
            }
            let finally_pc = self.pc() as i32;
            self.instr_mut(try_pc).c = Address::imm(finally_pc);

            self.compile_block(finally)?;
            self.emit(OpCode::FinallyEnd, Address::VOID, Address::VOID, Address::VOID, Pos::default());

            if let Some(b) = self.branches.last_mut() {
                b.in_finally = false;
            }
        }

        let end = self.pc();
        self.close_branch(end);
        self.close_scope();
        Ok(())
    }
}

/// Two cases with the same literal value.
fn check_duplicate_cases(c: &Compiler, cases: &[Case]) -> Result<(), CompileError> {
    for (i, case) in cases.iter().enumerate() {
        if let Expr::Constant { value, .. } = &case.value {
            let duplicated = cases[..i].iter().any(|prev| match &prev.value {
                Expr::Constant { value: v, .. } => v == value,
                _ => false,
            });
            if duplicated {
                return Err(c.error("Duplicate case", case.pos));
            }
        }
    }
    Ok(())
}
