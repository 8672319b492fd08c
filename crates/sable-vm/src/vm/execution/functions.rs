//! Function call instruction execution

use crate::bytecode::{Address, AddressKind, Instruction};
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::frame::Frame;
use crate::vm::result::ExecutionResult;
use crate::vm::{check_min_arguments, Vm};
use sable_types::sync::{shared, Arc};
use sable_types::{Closure, ClosureCell, Instance, Object, Value};
use std::collections::HashMap;
use tracing::trace;

const CONSTRUCTOR: &str = "constructor";

impl Vm {
    /// Execute call, closure and instantiation instructions
    pub(crate) fn execute_functions(&mut self, instr: Instruction) -> Result<ExecutionResult, VmError> {
        let Instruction { opcode, a, b, c } = instr;

        match opcode {
            OpCode::Call | OpCode::CallOptChain => {
                let args = self.call_arguments(c)?;
                self.call(a, b, args, opcode == OpCode::CallOptChain)
            }

            OpCode::CallSingleArg | OpCode::CallOptChainSingleArg => {
                let arg = self.get(c)?;
                self.call(a, b, vec![arg], opcode == OpCode::CallOptChainSingleArg)
            }

            OpCode::CreateClosure => {
                let frame = self.current_frame()?;
                let slots: Vec<usize> = self.function(frame.func)?.closure_slots().collect();
                let cells: Vec<ClosureCell> = frame
                    .closures
                    .iter()
                    .cloned()
                    .chain(slots.into_iter().map(|slot| ClosureCell::new(frame.values.clone(), slot)))
                    .collect();

                let closure = Closure {
                    func: b.index(),
                    cells: Arc::from(cells),
                };
                self.set(a, Value::Object(Object::Closure(closure)))?;
                Ok(ExecutionResult::Next)
            }

            OpCode::NewInstance => {
                let args = self.call_arguments(c)?;
                self.new_instance(a, b, args)
            }

            OpCode::NewInstanceSingleArg => {
                let arg = self.get(c)?;
                self.new_instance(a, b, vec![arg])
            }

            _ => unreachable!("Non-function opcode in function handler"),
        }
    }

    // ===== Helper methods =====

    /// The arguments array built by the compiler, or none.
    fn call_arguments(&self, addr: Address) -> Result<Vec<Value>, VmError> {
        if addr.is_void() {
            return Ok(Vec::new());
        }
        match self.get(addr)? {
            Value::Array(items) => Ok(items.read().clone()),
            other => Err(VmError::new(format!("Expected an arguments array, got {}", other.type_name()))),
        }
    }

    fn call(&mut self, callee: Address, dest: Address, args: Vec<Value>, optional: bool) -> Result<ExecutionResult, VmError> {
        let value = self.get(callee)?;

        match value {
            Value::Function(index) => {
                // a function calling itself by name runs with its own cells
                let frame = self.current_frame()?;
                let cells = if frame.func == index {
                    Arc::clone(&frame.closures)
                } else {
                    Arc::clone(&self.no_cells)
                };
                self.call_program_function(index, dest, args, None, cells)
            }

            Value::Object(Object::Closure(closure)) => {
                self.call_program_function(closure.func, dest, args, None, closure.cells)
            }

            Value::Object(Object::Method { this, func }) => {
                let cells = Arc::clone(&self.no_cells);
                self.call_program_function(func, dest, args, Some(*this), cells)
            }

            Value::NativeFunction(index) => {
                let result = self.call_native(index, &Value::Null, &args)?;
                self.set(dest, result)?;
                Ok(ExecutionResult::Next)
            }

            Value::Object(Object::NativePrototype { this, func }) => {
                let result = self.call_native(func, &this, &args)?;
                self.set(dest, result)?;
                Ok(ExecutionResult::Next)
            }

            Value::Object(Object::HostMethod { host, name }) => {
                let result = host.call_method(&name, &args)?;
                self.set(dest, result)?;
                Ok(ExecutionResult::Next)
            }

            _ if optional => self.short_circuit(),

            other => Err(VmError::new(format!(
                "Invalid value. Expected a function, got {}",
                other.type_name()
            ))),
        }
    }

    /// Ends an optional chain early: its register gets null and the pc
    /// moves past the chain.
    pub(crate) fn short_circuit(&mut self) -> Result<ExecutionResult, VmError> {
        let dest = std::mem::replace(&mut self.opt_dest, Address::VOID);
        if !dest.is_void() {
            self.set(dest, Value::Null)?;
        }
        let skip = std::mem::take(&mut self.opt_skip);
        self.inc_pc(skip)?;
        Ok(ExecutionResult::Continue)
    }

    fn call_program_function(
        &mut self,
        index: usize,
        dest: Address,
        args: Vec<Value>,
        this: Option<Value>,
        closures: Arc<[ClosureCell]>,
    ) -> Result<ExecutionResult, VmError> {
        check_min_arguments(self.function(index)?, args.len())?;
        self.current_frame_mut()?.ret_address = dest;
        self.push_frame(index, this, closures, args)?;
        Ok(ExecutionResult::Next)
    }

    /// Pushes a frame for function `index` with its parameters in place.
    /// Extra arguments are dropped unless the function is variadic.
    pub(crate) fn push_frame(
        &mut self,
        index: usize,
        this: Option<Value>,
        closures: Arc<[ClosureCell]>,
        mut args: Vec<Value>,
    ) -> Result<(), VmError> {
        if self.config.max_frames > 0 && self.frames.len() > self.config.max_frames {
            return Err(VmError::new(format!("Max stack frames reached: {}", self.config.max_frames)));
        }

        let f = self.function(index)?;
        let (arguments, variadic, size) = (f.arguments, f.variadic, f.max_reg);

        let fixed = if variadic { arguments.saturating_sub(1) } else { arguments };
        let rest = if variadic && args.len() > fixed {
            args.split_off(fixed)
        } else {
            Vec::new()
        };
        args.truncate(fixed);

        let size = size.max(arguments + this.is_some() as usize);
        self.add_allocations(args.iter().chain(rest.iter()).map(|v| v.size()).sum())?;

        let values = self.cache.take(size);
        {
            let mut regs = values.write();
            for (slot, arg) in regs.iter_mut().zip(args) {
                *slot = arg;
            }
            if variadic {
                regs[fixed] = Value::array(rest);
            }
            if let Some(this) = this {
                regs[arguments] = this;
            }
        }

        self.frames.push(Frame::new(index, values, closures));
        trace!(function = index, depth = self.frames.len(), "call");
        Ok(())
    }

    /// Calls a native function after checking its arity and permissions.
    pub(crate) fn call_native(&mut self, index: usize, this: &Value, args: &[Value]) -> Result<Value, VmError> {
        let function = {
            let native = self
                .program
                .natives
                .get(index)
                .ok_or_else(|| VmError::new(format!("Invalid native function: {}", index)))?;

            if native.arguments >= 0 && native.arguments as usize != args.len() {
                return Err(VmError::new(format!(
                    "function '{}' expects {} parameters, got {}",
                    native.name,
                    native.arguments,
                    args.len()
                )));
            }
            if !native.permissions.iter().all(|p| self.has_permission(p)) {
                return Err(VmError::new("unauthorized"));
            }
            native.function
        };

        function(self, this, args)
    }

    fn new_instance(&mut self, class: Address, dest: Address, args: Vec<Value>) -> Result<ExecutionResult, VmError> {
        if class.kind != AddressKind::Class {
            return Err(VmError::new(format!("Invalid class: {}", class)));
        }
        let index = class.index();
        let constructor = self
            .program
            .classes
            .get(index)
            .ok_or_else(|| VmError::new(format!("Invalid class: {}", class)))?
            .functions
            .iter()
            .copied()
            .find(|&f| self.program.functions.get(f).is_some_and(|f| f.name == CONSTRUCTOR));

        let instance = Value::Object(Object::Instance(shared(Instance {
            class: index,
            fields: HashMap::new(),
        })));
        self.set(dest, instance.clone())?;

        match constructor {
            Some(f) => {
                let cells = Arc::clone(&self.no_cells);
                self.call_program_function(f, Address::VOID, args, Some(instance), cells)
            }
            None => Ok(ExecutionResult::Next),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::Program;
    use crate::builtins::NativeRegistry;
    use crate::vm::Vm;
    use sable_types::sync::Arc;
    use sable_types::Value;

    #[test]
    fn test_unknown_native_index() {
        let mut vm = Vm::new(Arc::new(Program::new(Arc::new(NativeRegistry::new()))));
        let err = vm.call_native(3, &Value::Null, &[]).unwrap_err();
        assert_eq!(err.message(), "Invalid native function: 3");
    }
}
