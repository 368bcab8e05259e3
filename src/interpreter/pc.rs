//! Program counter
//!
//! The program counter names the next instruction to execute as a path into the
//! (immutable) program: a function, a chain of [`BlockCursor`]s for the `if` and
//! `while` bodies currently open, and an index into the innermost body. Calls
//! save that path in a [`ReturnPoint`] so the caller resumes exactly where it
//! left off, on the `Call` instruction that is still waiting for its result.

use crate::parser::ast::{Instruction, Program, SourceLocation};

/// Which body of a compound instruction is being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Then,
    Else,
    Loop,
}

/// An open `if`/`while` body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCursor {
    /// Index of the owning instruction in the enclosing body
    pub owner: usize,
    pub branch: Branch,
    /// Index to continue at in the enclosing body once this one ends
    pub resume: usize,
}

/// Where a caller continues after its callee returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnPoint {
    pub function: String,
    pub index: usize,
    pub blocks: Vec<BlockCursor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramCounter {
    pub function: String,
    pub index: usize,
    pub blocks: Vec<BlockCursor>,
    pub returns: Vec<ReturnPoint>,
}

impl ProgramCounter {
    /// First instruction of `function`, with no callers
    pub fn at_entry(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            index: 0,
            blocks: Vec::new(),
            returns: Vec::new(),
        }
    }

    /// The instruction list the counter currently indexes into
    pub fn body<'p>(&self, program: &'p Program) -> Option<&'p [Instruction]> {
        let mut body: &[Instruction] = &program.function(&self.function)?.body;

        for cursor in &self.blocks {
            body = match (body.get(cursor.owner)?, cursor.branch) {
                (Instruction::If { then_body, .. }, Branch::Then) => then_body,
                (
                    Instruction::If {
                        else_body: Some(else_body),
                        ..
                    },
                    Branch::Else,
                ) => else_body,
                (Instruction::While { body, .. }, Branch::Loop) => body,
                _ => return None,
            };
        }

        Some(body)
    }

    /// The next instruction, or `None` at the end of the current body
    pub fn instruction<'p>(&self, program: &'p Program) -> Option<&'p Instruction> {
        self.body(program)?.get(self.index)
    }

    /// `true` when the next step is the implicit return at the closing brace
    pub fn at_function_end(&self, program: &Program) -> bool {
        self.blocks.is_empty() && self.instruction(program).is_none()
    }

    /// `true` when the innermost open block has run out of instructions
    pub fn at_block_end(&self, program: &Program) -> bool {
        !self.blocks.is_empty() && self.instruction(program).is_none()
    }

    /// Source location of the next step
    pub fn location(&self, program: &Program) -> Option<SourceLocation> {
        match self.instruction(program) {
            Some(instruction) => Some(instruction.location()),
            None => program.function(&self.function).map(|f| f.end_location),
        }
    }

    pub fn advance(&mut self) {
        self.index += 1;
    }

    /// Enter a body of the current instruction
    pub fn enter(&mut self, branch: Branch, resume: usize) {
        self.blocks.push(BlockCursor {
            owner: self.index,
            branch,
            resume,
        });
        self.index = 0;
    }

    /// Close the innermost body and continue in the enclosing one
    pub fn leave_block(&mut self) -> Option<BlockCursor> {
        let cursor = self.blocks.pop()?;
        self.index = cursor.resume;
        Some(cursor)
    }

    /// Jump to the start of `callee`, remembering the current position
    pub fn call(&mut self, callee: &str) {
        self.returns.push(ReturnPoint {
            function: std::mem::replace(&mut self.function, callee.to_string()),
            index: self.index,
            blocks: std::mem::take(&mut self.blocks),
        });
        self.index = 0;
    }

    /// Resume the most recent caller; `false` when there is none
    pub fn return_to_caller(&mut self) -> bool {
        match self.returns.pop() {
            Some(point) => {
                self.function = point.function;
                self.index = point.index;
                self.blocks = point.blocks;
                true
            }
            None => false,
        }
    }

    /// Number of active calls above `main`
    pub fn call_depth(&self) -> usize {
        self.returns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const SOURCE: &str = "fn main() {
    let x = 1;
    if x == 1 {
        x = 2;
    }
    helper();
}
fn helper() {
    return;
}";

    #[test]
    fn test_enter_and_leave_block() {
        let program = parse(SOURCE).unwrap();
        let mut pc = ProgramCounter::at_entry("main");

        pc.advance();
        assert!(matches!(pc.instruction(&program), Some(Instruction::If { .. })));
        pc.enter(Branch::Then, pc.index + 1);
        assert!(matches!(pc.instruction(&program), Some(Instruction::Assign { .. })));

        pc.advance();
        assert!(pc.at_block_end(&program));
        pc.leave_block();
        assert!(matches!(pc.instruction(&program), Some(Instruction::Call { .. })));
    }

    #[test]
    fn test_call_and_return_restore_position() {
        let program = parse(SOURCE).unwrap();
        let mut pc = ProgramCounter::at_entry("main");
        pc.index = 2;

        pc.call("helper");
        assert_eq!(pc.function, "helper");
        assert_eq!(pc.call_depth(), 1);
        assert!(matches!(pc.instruction(&program), Some(Instruction::Return { .. })));

        assert!(pc.return_to_caller());
        assert_eq!(pc.function, "main");
        assert_eq!(pc.index, 2);
        assert!(!pc.return_to_caller());
    }

    #[test]
    fn test_function_end_location_is_closing_brace() {
        let program = parse(SOURCE).unwrap();
        let mut pc = ProgramCounter::at_entry("main");
        pc.index = 3;

        assert!(pc.at_function_end(&program));
        assert_eq!(pc.location(&program), Some(SourceLocation::new(7, 1)));
    }
}
