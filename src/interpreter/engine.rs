// Execution engine: owns one run and advances it one instruction per step

use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::interpreter::builtins::SeededRng;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::pc::ProgramCounter;
use crate::memory::value::Value;
use crate::memory::Memory;
use crate::parser::ast::*;
use crate::snapshot::{MockTerminal, Snapshot};

/// Why a run stopped
#[derive(Debug, Clone, PartialEq)]
pub enum HaltReason {
    /// `main` returned
    Finished,
    Error(RuntimeError),
}

/// Lifecycle of a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    /// Inside `step()`
    Running,
    /// Between steps, ready for the next one
    AwaitingStep,
    Halted(HaltReason),
}

/// Result of one `step()`
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Continued,
    Halted(HaltReason),
}

/// What an executed instruction asks the engine to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Settle the program counter and wait for the next step
    Continue,
    /// The last frame returned
    Finished,
}

/// The interpreter: one program, one memory model, one program counter
pub struct Interpreter {
    pub(crate) program: Program,
    pub(crate) config: RunConfig,
    pub(crate) memory: Memory,
    pub(crate) pc: ProgramCounter,
    pub(crate) state: RunState,
    pub(crate) terminal: MockTerminal,
    pub(crate) rng: SeededRng,
    /// Value returned by a callee, waiting for its `Call` instruction to complete
    pub(crate) pending_return: Option<Value>,
    steps: usize,
}

impl Interpreter {
    /// Create an interpreter positioned on the first instruction of `main`
    pub fn new(program: Program, config: RunConfig) -> Self {
        let rng = SeededRng::new(config.seed);
        let memory = Memory::with_limit(config.max_alloc_cells);
        let mut interpreter = Interpreter {
            program,
            config,
            memory,
            pc: ProgramCounter::at_entry("main"),
            state: RunState::AwaitingStep,
            terminal: MockTerminal::new(),
            rng,
            pending_return: None,
            steps: 0,
        };
        interpreter.reset();
        interpreter
    }

    /// Restart the same program from scratch: fresh memory, fresh heap
    /// addresses, reseeded `rand_int`.
    pub fn reset(&mut self) -> &Program {
        self.memory = Memory::with_limit(self.config.max_alloc_cells);
        self.pc = ProgramCounter::at_entry("main");
        self.terminal = MockTerminal::new();
        self.rng = SeededRng::new(self.config.seed);
        self.pending_return = None;
        self.steps = 0;
        self.state = RunState::AwaitingStep;

        self.memory.push_frame("main");
        if let Some(main) = self.program.main() {
            if !main.params.is_empty() {
                self.state = RunState::Halted(HaltReason::Error(
                    RuntimeError::ArgumentCountMismatch {
                        function: "main".to_string(),
                        expected: main.params.len(),
                        got: 0,
                        location: main.location,
                    },
                ));
            }
        }
        self.settle();

        debug!("reset to start of main");
        &self.program
    }

    /// Execute exactly one instruction.
    ///
    /// On error the memory model is rolled back to its state before the
    /// instruction and the run halts. A halted run keeps returning the same
    /// outcome.
    pub fn step(&mut self) -> StepOutcome {
        if let RunState::Halted(reason) = &self.state {
            return StepOutcome::Halted(reason.clone());
        }

        let checkpoint_memory = self.memory.clone();
        let checkpoint_terminal = self.terminal.clone();
        let checkpoint_pc = self.pc.clone();
        let checkpoint_pending = self.pending_return.clone();

        self.state = RunState::Running;
        match self.execute_step() {
            Ok(Flow::Continue) => {
                self.steps += 1;
                self.settle();
                self.state = RunState::AwaitingStep;
                StepOutcome::Continued
            }
            Ok(Flow::Finished) => {
                self.steps += 1;
                info!(steps = self.steps, "program finished");
                self.state = RunState::Halted(HaltReason::Finished);
                StepOutcome::Halted(HaltReason::Finished)
            }
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "run halted");
                self.memory = checkpoint_memory;
                self.terminal = checkpoint_terminal;
                self.pc = checkpoint_pc;
                self.pending_return = checkpoint_pending;

                let reason = HaltReason::Error(err);
                self.state = RunState::Halted(reason.clone());
                StepOutcome::Halted(reason)
            }
        }
    }

    /// Step until the run halts or `max_steps` steps have been taken
    pub fn run_to_end(&mut self, max_steps: usize) -> StepOutcome {
        for _ in 0..max_steps {
            if let StepOutcome::Halted(reason) = self.step() {
                return StepOutcome::Halted(reason);
            }
        }
        match &self.state {
            RunState::Halted(reason) => StepOutcome::Halted(reason.clone()),
            _ => StepOutcome::Continued,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, RunState::Halted(_))
    }

    /// Function name and source line of the next step, `None` once halted
    pub fn current_instruction(&self) -> Option<(&str, usize)> {
        if self.is_finished() {
            return None;
        }
        let location = self.pc.location(&self.program)?;
        Some((self.pc.function.as_str(), location.line))
    }

    /// Read-only projection of the current state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn pc(&self) -> &ProgramCounter {
        &self.pc
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn output(&self) -> &MockTerminal {
        &self.terminal
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Number of successfully executed steps since the last reset
    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    fn execute_step(&mut self) -> Result<Flow, RuntimeError> {
        match self.pc.instruction(&self.program).cloned() {
            Some(instruction) => {
                debug!(
                    function = %self.pc.function,
                    line = instruction.location().line,
                    kind = instruction.kind(),
                    "step"
                );
                self.execute_instruction(&instruction)
            }
            None => {
                let location = self
                    .program
                    .function(&self.pc.function)
                    .map(|f| f.end_location)
                    .unwrap_or_default();
                debug!(function = %self.pc.function, line = location.line, "implicit return");
                self.return_from_function(Value::Unit, location)
            }
        }
    }

    /// Close every body that has run out of instructions
    pub(crate) fn settle(&mut self) {
        while self.pc.at_block_end(&self.program) {
            self.pc.leave_block();
            self.memory.pop_scope();
        }
    }
}
