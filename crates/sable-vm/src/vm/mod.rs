//! Virtual Machine implementation
//!
//! A register machine over a compiled [`Program`]. Every call pushes a
//! [`Frame`] holding the registers of the function; frame 0 runs the global
//! function and keeps the globals once the program is initialized.
//!
//! Each instruction reports how the loop continues (see
//! [`ExecutionResult`]). Errors returned by a handler are routed through the
//! active `try` regions and only leave the loop when nothing catches them.

use crate::bytecode::{Address, AddressKind, Function, Instruction, Program};
use crate::error::VmError;
use crate::opcode::OpCode;
use sable_types::sync::{Arc, Mutex};
use sable_types::{ClosureCell, Object, ScriptError, TraceLine, Value};
use std::backtrace::Backtrace;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, trace, warn};

// Module structure
mod config;
mod eval;
mod execution;
mod finalizer;
mod frame;
mod ops;
mod result;

pub use config::VmConfig;
pub use finalizer::Finalizer;

use frame::{Frame, FrameCache, TryCatch};
use result::ExecutionResult;

/// Where `print` and `println` write.
pub type Output = Arc<Mutex<Box<dyn Write + Send>>>;

/// Virtual Machine
pub struct Vm {
    program: Arc<Program>,
    config: VmConfig,

    /// Call stack. Frame 0 is the global frame and is never popped.
    frames: Vec<Frame>,
    /// Active try regions, innermost last.
    tries: Vec<TryCatch>,
    cache: FrameCache,

    steps: u64,
    allocations: u64,
    initialized: bool,

    /// Value of the last `return` that left the loop.
    ret_value: Value,
    /// Value returned by the global function.
    global_value: Value,
    /// Unhandled error that stopped the loop.
    error: Option<VmError>,

    /// Armed by `SetRegister`: how far a short-circuited chain jumps and
    /// the register that receives null.
    opt_skip: i32,
    opt_dest: Address,

    output: Output,
    no_cells: Arc<[ClosureCell]>,
}

impl Vm {
    /// Create a new VM with zeroed globals
    pub fn new(program: Arc<Program>) -> Self {
        Self::with_config(program, VmConfig::default())
    }

    pub fn with_config(program: Arc<Program>, config: VmConfig) -> Self {
        let size = program.functions.first().map(|g| g.max_reg).unwrap_or(0);
        let mut cache = FrameCache::default();
        let global = Frame::new(0, cache.take(size), Arc::from(Vec::new()));

        Self {
            program,
            config,
            frames: vec![global],
            tries: Vec::new(),
            cache,
            steps: 0,
            allocations: 0,
            initialized: false,
            ret_value: Value::Null,
            global_value: Value::Null,
            error: None,
            opt_skip: 0,
            opt_dest: Address::VOID,
            output: Arc::new(Mutex::new(Box::new(std::io::stdout()))),
            no_cells: Arc::from(Vec::new()),
        }
    }

    /// A VM whose global function already ran. `globals` usually comes from
    /// [`Vm::globals`] of another VM over the same program.
    pub fn with_globals(program: Arc<Program>, globals: Vec<Value>, config: VmConfig) -> Result<Self, VmError> {
        let size = program.functions.first().map(|g| g.max_reg).unwrap_or(0);
        if globals.len() != size {
            return Err(VmError::new("invalid globals size"));
        }

        let mut vm = Self::with_config(program, config);
        vm.frames[0] = Frame::new(0, sable_types::sync::shared(globals), Arc::from(Vec::new()));
        vm.initialized = true;
        Ok(vm)
    }

    /// A VM over the same program with a copy of the globals. Arrays and
    /// maps held by globals are shared with this VM.
    pub fn fork(&self) -> Self {
        let mut vm = Self::with_config(Arc::clone(&self.program), self.config);
        vm.frames[0] = Frame::new(0, sable_types::sync::shared(self.globals()), Arc::from(Vec::new()));
        vm.initialized = self.initialized;
        vm.global_value = self.global_value.clone();
        vm.output = Arc::clone(&self.output);
        vm
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn config(&self) -> VmConfig {
        self.config
    }

    pub fn set_config(&mut self, config: VmConfig) {
        self.config = config;
    }

    pub fn set_output(&mut self, output: Box<dyn Write + Send>) {
        self.output = Arc::new(Mutex::new(output));
    }

    /// Shares the writer of another VM or of the host.
    pub fn set_shared_output(&mut self, output: Output) {
        self.output = output;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn reset_steps(&mut self) {
        self.steps = 0;
    }

    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// A copy of the global registers.
    pub fn globals(&self) -> Vec<Value> {
        self.frames[0].values.read().clone()
    }

    // ===== Entry points =====

    /// Runs the global function: declarations, top level statements and
    /// the `init` functions of every module.
    pub fn initialize(&mut self) -> Result<(), VmError> {
        debug!("initializing globals");
        self.frames.truncate(1);
        self.frames[0].pc = 0;
        self.frames[0].exit = true;

        match self.execute_frames(0) {
            Ok(value) => {
                self.global_value = value;
                self.initialized = true;
                Ok(())
            }
            Err(err) => {
                self.finalize_globals();
                Err(err)
            }
        }
    }

    /// Initializes the program if needed and calls `main` when there is
    /// one. Without `main` the value returned by the top level code is the
    /// result. Global finalizers run before returning.
    pub fn run(&mut self, args: &[Value]) -> Result<Value, VmError> {
        self.error = None;

        if !self.initialized {
            self.initialize()?;
        }

        let main = self.program.function("main").map(|f| f.index);
        match main {
            Some(index) => {
                let cells = Arc::clone(&self.no_cells);
                self.run_function(index, None, cells, args, true)
            }
            None => {
                self.finalize_globals();
                Ok(self.global_value.clone())
            }
        }
    }

    /// Calls a top level function by name.
    pub fn run_func(&mut self, name: &str, args: &[Value]) -> Result<Value, VmError> {
        let index = self
            .program
            .function(name)
            .map(|f| f.index)
            .ok_or_else(|| VmError::new(format!("{}: function does not exist", name)))?;
        self.run_func_index(index, args)
    }

    pub fn run_func_index(&mut self, index: usize, args: &[Value]) -> Result<Value, VmError> {
        let cells = Arc::clone(&self.no_cells);
        self.run_function(index, None, cells, args, false)
    }

    pub fn run_closure(&mut self, closure: &sable_types::Closure, args: &[Value]) -> Result<Value, VmError> {
        self.run_function(closure.func, None, Arc::clone(&closure.cells), args, false)
    }

    /// Calls method `func` with `this` bound to `this`.
    pub fn run_method(&mut self, this: Value, func: usize, args: &[Value]) -> Result<Value, VmError> {
        let cells = Arc::clone(&self.no_cells);
        self.run_function(func, Some(this), cells, args, false)
    }

    /// Calls any callable value: functions, closures, bound methods and
    /// natives.
    pub fn invoke(&mut self, callee: &Value, args: &[Value]) -> Result<Value, VmError> {
        match callee {
            Value::Function(i) => self.run_func_index(*i, args),
            Value::NativeFunction(i) => self.call_native(*i, &Value::Null, args),
            Value::Object(Object::Closure(c)) => self.run_closure(c, args),
            Value::Object(Object::Method { this, func }) => self.run_method((**this).clone(), *func, args),
            Value::Object(Object::NativePrototype { this, func }) => {
                let this = (**this).clone();
                self.call_native(*func, &this, args)
            }
            Value::Object(Object::HostMethod { host, name }) => Ok(host.call_method(name, args)?),
            other => Err(VmError::new(format!(
                "Invalid value. Expected a function, got {}",
                other.type_name()
            ))),
        }
    }

    fn run_function(
        &mut self,
        index: usize,
        this: Option<Value>,
        closures: Arc<[ClosureCell]>,
        args: &[Value],
        finalize_globals: bool,
    ) -> Result<Value, VmError> {
        let f = self.function(index)?;
        if this.is_none() && f.is_class {
            return Err(VmError::new("can't call a method directly"));
        }
        if !f.variadic && f.arguments < args.len() {
            return Err(VmError::new(format!(
                "function '{}' expects only {} parameters, got {}",
                f.name,
                f.arguments,
                args.len()
            )));
        }
        check_min_arguments(f, args.len())?;

        let saved_tries = std::mem::take(&mut self.tries);
        let base = self.frames.len();
        if let Some(caller) = self.frames.last_mut() {
            caller.ret_address = Address::VOID;
        }

        let pushed = self.push_frame(index, this, closures, args.to_vec());
        let result = match pushed {
            Ok(()) => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.exit = true;
                }
                self.execute_frames(base)
            }
            Err(err) => Err(err),
        };

        self.tries = saved_tries;
        if finalize_globals {
            self.finalize_globals();
        }
        result
    }

    /// Runs the loop until the frame at `base` returns or an error is left
    /// unhandled. Frames above `base` are cleaned up on errors.
    fn execute_frames(&mut self, base: usize) -> Result<Value, VmError> {
        self.error = None;
        let tries_base = self.tries.len();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_loop()));
        if let Err(payload) = outcome {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            let pc = self.frames.last().map(|f| f.pc).unwrap_or(0);
            warn!(pc, %message, "recovered from a panic in the run loop");

            let trace = self.stack_trace();
            let mut text = format!("PANIC: [{}] {}", pc, message);
            for line in &trace {
                text.push_str(&format!("\n[script] -> {} {}", line.function, line));
            }
            text.push_str(&format!("\n[host]\n{}", Backtrace::force_capture()));
            self.error = Some(ScriptError::new(text).with_trace(trace).into());
        }

        match self.error.take() {
            Some(err) => {
                self.cleanup_frames(base.max(1));
                self.tries.truncate(tries_base);
                Err(err)
            }
            None => Ok(std::mem::take(&mut self.ret_value)),
        }
    }

    fn run_loop(&mut self) {
        loop {
            self.steps += 1;
            if self.config.max_steps > 0 && self.steps > self.config.max_steps {
                warn!(max_steps = self.config.max_steps, "step limit reached");
                let err = VmError::new(format!("Step limit reached: {}", self.config.max_steps));
                if self.raise(err) {
                    continue;
                }
                return;
            }

            let fp = self.frames.len() - 1;
            let result = match self.fetch() {
                Ok(instr) => self.execute_instruction(instr),
                Err(err) => Err(err),
            };

            let result = match result {
                Ok(r) => r,
                Err(err) => {
                    if self.raise(err) {
                        ExecutionResult::Continue
                    } else {
                        ExecutionResult::Exit
                    }
                }
            };

            match result {
                ExecutionResult::Next => {
                    if let Some(frame) = self.frames.get_mut(fp) {
                        frame.pc += 1;
                    }
                }
                ExecutionResult::Continue => {}
                ExecutionResult::Exit => return,
            }
        }
    }

    fn fetch(&self) -> Result<Instruction, VmError> {
        let frame = self.current_frame()?;
        self.function(frame.func)?
            .instructions
            .get(frame.pc)
            .copied()
            .ok_or_else(|| VmError::new(format!("Invalid pc: {}", frame.pc)))
    }

    /// Execute a single instruction
    fn execute_instruction(&mut self, instr: Instruction) -> Result<ExecutionResult, VmError> {
        match instr.opcode {
            // Registers and constants
            OpCode::LoadConstant
            | OpCode::Move
            | OpCode::MoveAndTest
            | OpCode::SetRegister
            | OpCode::ReadNativeProperty => self.execute_variables(instr),

            // Arithmetic operations
            OpCode::Add
            | OpCode::Subtract
            | OpCode::Multiply
            | OpCode::Divide
            | OpCode::Modulo
            | OpCode::Exponentiate
            | OpCode::BinaryOr
            | OpCode::And
            | OpCode::Xor
            | OpCode::LeftShift
            | OpCode::RightShift
            | OpCode::Inc
            | OpCode::Dec
            | OpCode::Unm
            | OpCode::Not
            | OpCode::BitwiseNot => self.execute_arithmetic(instr),

            // Comparison operations
            OpCode::Equal
            | OpCode::NotEqual
            | OpCode::StrictEqual
            | OpCode::StrictNotEqual
            | OpCode::Less
            | OpCode::LessOrEqual => self.execute_comparison(instr),

            // Control flow
            OpCode::Jump
            | OpCode::JumpBack
            | OpCode::JumpIfEqual
            | OpCode::JumpIfNotEqual
            | OpCode::TestJump
            | OpCode::Return => self.execute_control(instr),

            // Functions, closures and classes
            OpCode::Call
            | OpCode::CallOptChain
            | OpCode::CallSingleArg
            | OpCode::CallOptChainSingleArg
            | OpCode::CreateClosure
            | OpCode::NewInstance
            | OpCode::NewInstanceSingleArg => self.execute_functions(instr),

            // Collections
            OpCode::NewArray
            | OpCode::NewMap
            | OpCode::Keys
            | OpCode::Values
            | OpCode::Length
            | OpCode::GetEnumValue
            | OpCode::Spread
            | OpCode::DeleteProperty => self.execute_collections(instr),

            // Property access
            OpCode::GetIndexOrKey | OpCode::GetOptChain | OpCode::SetIndexOrKey => {
                self.execute_properties(instr)
            }

            // Exceptions
            OpCode::Throw
            | OpCode::Try
            | OpCode::TryEnd
            | OpCode::CatchEnd
            | OpCode::FinallyEnd
            | OpCode::TryExit => self.execute_exceptions(instr),
        }
    }

    // ===== Helper methods =====

    pub(crate) fn current_frame(&self) -> Result<&Frame, VmError> {
        self.frames.last().ok_or_else(|| VmError::new("call stack is empty"))
    }

    pub(crate) fn current_frame_mut(&mut self) -> Result<&mut Frame, VmError> {
        self.frames
            .last_mut()
            .ok_or_else(|| VmError::new("call stack is empty"))
    }

    pub(crate) fn function(&self, index: usize) -> Result<&Function, VmError> {
        self.program
            .functions
            .get(index)
            .ok_or_else(|| VmError::new(format!("Invalid function: {}", index)))
    }

    /// The function run by the top frame.
    pub(crate) fn current_function(&self) -> Result<&Function, VmError> {
        self.function(self.current_frame()?.func)
    }

    pub(crate) fn set_pc(&mut self, pc: usize) -> Result<(), VmError> {
        self.current_frame_mut()?.pc = pc;
        Ok(())
    }

    pub(crate) fn inc_pc(&mut self, offset: i32) -> Result<(), VmError> {
        let frame = self.current_frame_mut()?;
        let pc = frame.pc as i64 + offset as i64;
        frame.pc = usize::try_from(pc).map_err(|_| VmError::new(format!("Invalid pc: {}", pc)))?;
        Ok(())
    }

    /// Read the value an operand points to
    pub(crate) fn get(&self, addr: Address) -> Result<Value, VmError> {
        match addr.kind {
            AddressKind::Local => self.current_frame()?.get(addr.index()),
            AddressKind::Global => self.frames[0].get(addr.index()),
            AddressKind::Constant => self
                .program
                .constants
                .get(addr.index())
                .cloned()
                .ok_or_else(|| VmError::new(format!("Invalid constant: {}", addr))),
            AddressKind::Closure => Ok(self.closure_cell(addr)?.get()),
            AddressKind::Function => Ok(Value::Function(addr.index())),
            AddressKind::NativeFunction => Ok(Value::NativeFunction(addr.index())),
            AddressKind::Enum => Ok(Value::Enum(addr.index())),
            AddressKind::Immediate => Ok(Value::Int(addr.value as i64)),
            AddressKind::Void => Ok(Value::Null),
            AddressKind::Class => Err(VmError::new("invalid value: Class")),
            AddressKind::Unresolved => Err(VmError::new(format!("Unresolved address: {}", addr))),
        }
    }

    /// Write a register. Every write counts against the allocation limit.
    pub(crate) fn set(&mut self, addr: Address, value: Value) -> Result<(), VmError> {
        self.add_allocations(value.size())?;

        match addr.kind {
            AddressKind::Local => self.current_frame()?.set(addr.index(), value),
            AddressKind::Global => self.frames[0].set(addr.index(), value),
            AddressKind::Closure => {
                self.closure_cell(addr)?.set(value);
                Ok(())
            }
            AddressKind::Void => Ok(()),
            AddressKind::Constant => Err(VmError::new(format!("can't modify a constant: {}", addr))),
            _ => Err(VmError::new(format!("Invalid register address: {}", addr))),
        }
    }

    fn closure_cell(&self, addr: Address) -> Result<&ClosureCell, VmError> {
        self.current_frame()?
            .closures
            .get(addr.index())
            .ok_or_else(|| VmError::new(format!("Invalid closure: {}", addr)))
    }

    pub fn add_allocations(&mut self, size: usize) -> Result<(), VmError> {
        self.allocations += size as u64;
        if self.config.max_allocations > 0 && self.allocations > self.config.max_allocations {
            warn!(max_allocations = self.config.max_allocations, "allocation limit reached");
            return Err(VmError::new(format!(
                "Max allocations reached: {}",
                self.config.max_allocations
            )));
        }
        Ok(())
    }

    pub fn write_output(&mut self, text: &str) -> Result<(), VmError> {
        let mut out = self.output.lock();
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| VmError::new(format!("write error: {}", e)))
    }

    /// True when the program or the running function holds `name`.
    pub fn has_permission(&self, name: &str) -> bool {
        if self.program.has_permission(name) {
            return true;
        }
        self.current_function()
            .map(|f| f.has_permission(name))
            .unwrap_or(false)
    }

    /// Value of a named register of the running function, or of a global.
    pub fn register_value(&self, name: &str) -> Option<Value> {
        if self.frames.len() > 1 {
            if let Ok(frame) = self.current_frame() {
                let found = self
                    .function(frame.func)
                    .ok()
                    .and_then(|f| f.registers.iter().rev().find(|r| r.name == name))
                    .map(|r| r.index);
                if let Some(index) = found {
                    return frame.get(index).ok();
                }
            }
        }

        let index = self.program.global_register(name)?;
        self.frames[0].get(index).ok()
    }

    // ===== Finalizers =====

    /// Registers a finalizer on the running function. It runs when the
    /// function returns or is unwound.
    pub fn add_finalizer(&mut self, finalizer: Box<dyn Finalizer>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.finalizers.push(finalizer);
        }
    }

    /// Registers a finalizer that runs at the end of [`Vm::run`].
    pub fn add_global_finalizer(&mut self, finalizer: Box<dyn Finalizer>) {
        self.frames[0].finalizers.push(finalizer);
    }

    /// Runs the global finalizers once.
    pub fn finalize_globals(&mut self) {
        let finalizers = std::mem::take(&mut self.frames[0].finalizers);
        if let Err(err) = run_finalizers(finalizers) {
            warn!(error = %err, "global finalizer failed");
        }
    }

    /// Pops every frame above `keep`, most recent first, running their
    /// finalizers.
    fn cleanup_frames(&mut self, keep: usize) {
        while self.frames.len() > keep {
            if let Some(mut frame) = self.frames.pop() {
                let finalizers = std::mem::take(&mut frame.finalizers);
                if let Err(err) = run_finalizers(finalizers) {
                    warn!(error = %err, "finalizer failed while unwinding");
                }
                trace!(function = frame.func, "frame discarded");
            }
        }
    }

    // ===== Errors =====

    /// Adds the current trace to errors raised without one and lets the
    /// try regions handle it.
    fn raise(&mut self, err: VmError) -> bool {
        let err = self.wrap_error(err);
        self.handle(err)
    }

    pub(crate) fn wrap_error(&self, err: VmError) -> VmError {
        match err {
            VmError::Script(e) if e.trace.is_empty() => {
                ScriptError::clone(&e).with_trace(self.stack_trace()).into()
            }
            other => other,
        }
    }

    /// One line per source line of the active frames, innermost first.
    pub fn stack_trace(&self) -> Vec<TraceLine> {
        let mut trace: Vec<TraceLine> = Vec::new();
        let top = self.frames.len().saturating_sub(1);

        for (i, frame) in self.frames.iter().enumerate().rev() {
            let Ok(f) = self.function(frame.func) else {
                continue;
            };
            // the global function has ended
            if f.is_global && self.initialized && i != top {
                continue;
            }

            let pc = if i == top || frame.pc == 0 { frame.pc } else { frame.pc - 1 };
            let line = self.program.to_trace_line(frame.func, pc);
            if trace.last() == Some(&line) {
                continue;
            }
            trace.push(line);
        }
        trace
    }

    /// The value stored in a catch register.
    fn error_value(err: &VmError) -> Value {
        match err {
            VmError::Script(e) => Value::Object(Object::Error(Arc::clone(e))),
            other => Value::error(ScriptError::new(other.to_string())),
        }
    }
}

/// Runs `finalizers` most recent first. Returns the first failure after
/// running all of them.
fn run_finalizers(finalizers: Vec<Box<dyn Finalizer>>) -> Result<(), VmError> {
    let mut first = None;
    for mut f in finalizers.into_iter().rev() {
        if let Err(err) = f.close() {
            first.get_or_insert(err);
        }
    }
    match first {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn check_min_arguments(f: &Function, count: usize) -> Result<(), VmError> {
    let min = f
        .arguments
        .saturating_sub(f.optional_arguments)
        .saturating_sub(f.variadic as usize);
    if count >= min {
        return Ok(());
    }

    let message = if f.optional_arguments == 0 {
        format!("function '{}' expects {} parameters, got {}", f.name, min, count)
    } else {
        format!("function '{}' expects at least {} parameters, got {}", f.name, min, count)
    };
    Err(VmError::new(message))
}
