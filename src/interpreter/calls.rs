//! Function calls and returns
//!
//! A call statement takes two steps. The first evaluates the arguments in the
//! caller's frame, pushes the callee's frame and jumps to its first
//! instruction. When the callee returns, the program counter comes back to the
//! same `Call` instruction with the returned value pending, and the second step
//! delivers that value to the call's target.
//!
//! # Parameter passing
//!
//! - By value: the argument is copied into fresh callee slots. Arrays copy
//!   element-wise; `Box`/`Vec` handles are copied shallowly.
//! - By reference: the parameter aliases the caller's slot(s) of the referenced
//!   place. References into the heap are passed as pointer values.

use tracing::debug;

use crate::interpreter::engine::{Flow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::places::Location;
use crate::memory::slot::SlotId;
use crate::memory::value::{Target, Value};
use crate::parser::ast::*;

/// An evaluated argument, ready to bind in the callee's frame
enum Argument {
    Alias(Vec<SlotId>),
    Value(Value),
}

impl Interpreter {
    pub(crate) fn execute_call(
        &mut self,
        function: &str,
        args: &[Expr],
        target: &CallTarget,
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        if let Some(value) = self.pending_return.take() {
            return self.complete_call(value, target, location);
        }

        let params = self
            .program
            .function(function)
            .map(|f| f.params.clone())
            .ok_or_else(|| RuntimeError::UnknownFunction {
                name: function.to_string(),
                location,
            })?;

        if params.len() != args.len() {
            return Err(RuntimeError::ArgumentCountMismatch {
                function: function.to_string(),
                expected: params.len(),
                got: args.len(),
                location,
            });
        }

        let limit = self.config.max_call_depth;
        if self.memory.stack().depth() >= limit {
            return Err(RuntimeError::StackOverflow { limit, location });
        }

        let mut bound = Vec::with_capacity(args.len());
        for (param, arg) in params.iter().zip(args) {
            let argument = match param.mode {
                PassMode::ByValue => Argument::Value(self.eval(arg)?),
                PassMode::ByReference => self.reference_argument(arg, location)?,
            };
            bound.push(argument);
        }

        self.memory.push_frame(function);
        for (param, argument) in params.into_iter().zip(bound) {
            let result = match argument {
                Argument::Alias(slots) => self.memory.alias(&param.name, param.ty, slots),
                Argument::Value(value) => {
                    let ty = self.binding_type(Some(&param.ty), &value);
                    self.memory.declare(&param.name, ty, value).map(|_| ())
                }
            };
            result.map_err(|e| e.at(location))?;
        }

        self.pc.call(function);
        debug!(function, depth = self.memory.stack().depth(), "call");
        Ok(Flow::Continue)
    }

    /// Evaluate an argument for a reference parameter
    fn reference_argument(&mut self, arg: &Expr, location: SourceLocation) -> Result<Argument, RuntimeError> {
        if let Expr::Reference { target, .. } = arg {
            return match self.resolve_place(target, location)? {
                Location::Cell(id) => Ok(Argument::Alias(vec![id])),
                Location::Cells(ids) => Ok(Argument::Alias(ids)),
                _ => Ok(Argument::Value(self.reference_to(target, location)?.0)),
            };
        }

        match self.eval(arg)? {
            Value::Pointer(Target::Stack(id)) => Ok(Argument::Alias(vec![id])),
            Value::Pointer(Target::Array { first, len }) => {
                if !self.memory.slots().is_live(first) {
                    return Err(self.dead_slot(first, location));
                }
                (0..len as i64)
                    .map(|i| self.memory.offset_cell(first, i))
                    .collect::<Option<Vec<_>>>()
                    .map(Argument::Alias)
                    .ok_or_else(|| self.dead_slot(first, location))
            }
            pointer @ Value::Pointer(_) => Ok(Argument::Value(pointer)),
            other => Err(RuntimeError::type_mismatch("reference", other.kind_name(), location)),
        }
    }

    /// Pop the current frame and hand `value` back to the caller.
    ///
    /// Heap blocks only the popped frame could reach stay allocated (leaked).
    /// Returning from `main` empties the stack and finishes the run.
    pub(crate) fn return_from_function(
        &mut self,
        value: Value,
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        let before = self.memory.reachable_blocks();
        let frame = self.memory.pop_frame();
        let after = self.memory.reachable_blocks();
        let returned = value.heap_addresses();

        for address in before.difference(&after) {
            let still_live = self
                .memory
                .heap()
                .get(*address)
                .is_some_and(|block| block.is_live());
            if still_live && !returned.contains(address) {
                debug!(
                    function = frame.as_ref().map_or("", |f| f.function.as_str()),
                    address = format_args!("0x{:x}", address),
                    "heap block leaked on return"
                );
            }
        }

        if self.pc.call_depth() == 0 {
            debug!(line = location.line, "main returned");
            return Ok(Flow::Finished);
        }

        self.pc.return_to_caller();
        debug!(function = %self.pc.function, "return");
        self.pending_return = Some(value);
        Ok(Flow::Continue)
    }

    /// Second step of a call: deliver the returned value
    fn complete_call(
        &mut self,
        value: Value,
        target: &CallTarget,
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        match target {
            CallTarget::Discard => {}
            CallTarget::Declare { name, ty, .. } => {
                let ty = self.binding_type(ty.as_ref(), &value);
                self.declare(name, ty, value, location)?;
            }
            CallTarget::Assign { place, op } => {
                self.assign(place, *op, value, location)?;
            }
            CallTarget::Return => return self.return_from_function(value, location),
        }

        self.pc.advance();
        Ok(Flow::Continue)
    }
}
