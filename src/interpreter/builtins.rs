//! Built-in function implementations
//!
//! This module provides the pieces of the language that are handled by the
//! interpreter rather than defined in user code.
//!
//! # Supported Built-ins
//!
//! - `print!(format, ...)` / `println!(format, ...)`: formatted output to the terminal
//! - `rand_int(lo, hi)`: integer in `lo..=hi` from a seeded generator
//!
//! `drop(x)` is an instruction of its own and lives with the other statements.
//!
//! # Implementation Notes
//!
//! - Format strings support `{}` (next positional argument) and `{name}`
//!   (inline capture); format specs after `:` are accepted and ignored
//! - Values print the way `{:?}` would in Rust for arrays and vectors, and
//!   references and boxes print what they point at
//! - `rand_int` uses xorshift64*, so a seed always yields the same sequence

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::ast::{Expr, FormatPiece, SourceLocation};

/// Deterministic generator behind `rand_int`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        // xorshift must never hold an all-zero state
        let state = seed ^ 0x9E37_79B9_7F4A_7C15;
        SeededRng {
            state: if state == 0 { 0x9E37_79B9_7F4A_7C15 } else { state },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform-enough integer in `low..=high`; callers guarantee `low <= high`
    pub fn range_inclusive(&mut self, low: i32, high: i32) -> i32 {
        let span = (i64::from(high) - i64::from(low) + 1) as u64;
        let offset = self.next_u64() % span;
        (i64::from(low) + offset as i64) as i32
    }
}

impl Interpreter {
    /// Render a `print!`/`println!` format string
    pub(crate) fn format_print(
        &mut self,
        format: &[FormatPiece],
        args: &[Expr],
        location: SourceLocation,
    ) -> Result<String, RuntimeError> {
        let mut output = String::new();
        let mut positional = args.iter();

        for piece in format {
            match piece {
                FormatPiece::Text(text) => output.push_str(text),
                FormatPiece::Next => {
                    let expr = positional.next().ok_or_else(|| {
                        RuntimeError::type_mismatch("format argument", "nothing", location)
                    })?;
                    let value = self.eval(expr)?;
                    output.push_str(&self.display_value(&value, location)?);
                }
                FormatPiece::Named(name) => {
                    let value = self.eval(&Expr::Variable(name.clone(), location))?;
                    output.push_str(&self.display_value(&value, location)?);
                }
            }
        }

        Ok(output)
    }

    /// Text a value prints as
    pub(crate) fn display_value(&self, value: &Value, location: SourceLocation) -> Result<String, RuntimeError> {
        match value {
            Value::Int(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Unit => Ok("()".to_string()),
            Value::Uninit => Ok("<uninit>".to_string()),
            Value::Array(values) => {
                let items = values
                    .iter()
                    .map(|v| self.display_value(v, location))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("[{}]", items.join(", ")))
            }
            pointer @ Value::Pointer(_) => {
                let place = self.pointer_location(pointer, location)?;
                let referent = self.read_location(&place, location)?;
                self.display_value(&referent, location)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        let first: Vec<u64> = (0..5).map(|_| a.next_u64()).collect();
        let second: Vec<u64> = (0..5).map(|_| b.next_u64()).collect();
        assert_eq!(first, second);
        assert_ne!(SeededRng::new(43).next_u64(), first[0]);
    }

    #[test]
    fn test_range_is_inclusive_and_bounded() {
        let mut rng = SeededRng::new(7);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let n = rng.range_inclusive(1, 3);
            assert!((1..=3).contains(&n));
            seen[(n - 1) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_full_i32_range_does_not_overflow() {
        let mut rng = SeededRng::new(0);
        for _ in 0..10 {
            rng.range_inclusive(i32::MIN, i32::MAX);
        }
        assert_eq!(rng.range_inclusive(5, 5), 5);
    }
}
