// Snapshots: read-only projections of a run, and the history the TUI walks back through

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::interpreter::engine::{HaltReason, Interpreter, RunState};
use crate::memory::heap::BlockKind;
use crate::memory::slot::{FrameId, SlotId};
use crate::memory::value::{Address, Target, Value};
use crate::memory::Memory;
use crate::parser::ast::SourceLocation;

/// Mock terminal for capturing `print!`/`println!` output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockTerminal {
    pub lines: Vec<TerminalLine>,
    /// The last line has not been terminated yet
    open: bool,
}

impl MockTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text`, ending the line when `newline` is set
    pub fn print(&mut self, text: &str, newline: bool, location: SourceLocation) {
        match self.lines.last_mut() {
            Some(last) if self.open => last.text.push_str(text),
            _ => self.lines.push(TerminalLine {
                text: text.to_string(),
                location,
            }),
        }
        self.open = !newline;
    }

    /// Get all lines as a vector of strings
    pub fn get_output(&self) -> Vec<String> {
        self.lines
            .iter()
            .flat_map(|tl| tl.text.split('\n').map(str::to_string))
            .collect()
    }
}

/// A line of terminal output with the source location that started it
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalLine {
    pub text: String,
    pub location: SourceLocation,
}

/// Run status as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Status {
    Ready,
    Finished,
    Error {
        kind: String,
        message: String,
        line: usize,
    },
}

/// The next step's position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Current {
    pub function: String,
    pub line: usize,
}

/// How a value is displayed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueView {
    Int(i32),
    Bool(bool),
    /// Reference to a stack variable, `function::name`
    Ref { target: String, live: bool },
    /// `Box`/`Vec` handle
    Heap { address: Address, live: bool },
    /// Reference to one element of a heap block
    HeapElement { address: Address, index: usize },
    Array(Vec<ValueView>),
    Unit,
    Uninit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarView {
    pub name: String,
    pub ty: String,
    pub value: ValueView,
    /// By-reference parameter sharing the caller's storage
    pub aliased: bool,
    pub live: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameView {
    pub function: String,
    pub vars: Vec<VarView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockView {
    pub kind: BlockKind,
    pub elements: Vec<ValueView>,
    pub capacity: usize,
    pub length: usize,
    pub live: bool,
    /// Reachable from a live variable; a live, unreachable block has leaked
    pub reachable: bool,
}

impl BlockView {
    pub fn is_leaked(&self) -> bool {
        self.live && !self.reachable
    }
}

/// Snapshot of execution state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub status: Status,
    pub current: Option<Current>,
    /// Bottom (`main`) first
    pub stack: Vec<FrameView>,
    pub heap: BTreeMap<Address, BlockView>,
    pub output: Vec<String>,
    pub steps: usize,
}

impl Snapshot {
    pub fn capture(interpreter: &Interpreter) -> Self {
        let memory = interpreter.memory();
        let projector = Projector::new(memory);

        let status = match interpreter.state() {
            RunState::Running | RunState::AwaitingStep => Status::Ready,
            RunState::Halted(HaltReason::Finished) => Status::Finished,
            RunState::Halted(HaltReason::Error(err)) => Status::Error {
                kind: err.kind().to_string(),
                message: err.to_string(),
                line: err.location().line,
            },
        };

        let current = interpreter
            .current_instruction()
            .map(|(function, line)| Current {
                function: function.to_string(),
                line,
            });

        let stack = memory
            .stack()
            .frames()
            .iter()
            .map(|frame| FrameView {
                function: frame.function.clone(),
                vars: frame
                    .bindings()
                    .iter()
                    .map(|binding| projector.binding(binding))
                    .collect(),
            })
            .collect();

        let reachable = memory.reachable_blocks();
        let heap = memory
            .heap()
            .blocks()
            .map(|block| {
                let view = BlockView {
                    kind: block.kind,
                    elements: block.elements().iter().map(|v| projector.value(v)).collect(),
                    capacity: block.capacity(),
                    length: block.len(),
                    live: block.is_live(),
                    reachable: reachable.contains(&block.address),
                };
                (block.address, view)
            })
            .collect();

        Snapshot {
            status,
            current,
            stack,
            heap,
            output: interpreter.output().get_output(),
            steps: interpreter.steps_taken(),
        }
    }

    /// Variable `name` in the innermost frame that has one
    pub fn var(&self, name: &str) -> Option<&VarView> {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| frame.vars.iter().rev().find(|v| v.name == name))
    }

    /// Live blocks nothing can reach any more
    pub fn leaked_blocks(&self) -> impl Iterator<Item = (&Address, &BlockView)> {
        self.heap.iter().filter(|(_, block)| block.is_leaked())
    }

    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        // Rough: 64 bytes per variable, 16 per heap element, 50 per output line
        let vars: usize = self.stack.iter().map(|f| f.vars.len()).sum();
        let elements: usize = self.heap.values().map(|b| b.elements.len().max(1)).sum();
        vars * 64 + elements * 16 + self.output.len() * 50
    }
}

/// Turns memory model values into display values
struct Projector<'m> {
    memory: &'m Memory,
    functions: FxHashMap<FrameId, &'m str>,
}

impl<'m> Projector<'m> {
    fn new(memory: &'m Memory) -> Self {
        let functions = memory
            .stack()
            .frames()
            .iter()
            .map(|frame| (frame.id, frame.function.as_str()))
            .collect();
        Projector { memory, functions }
    }

    fn binding(&self, binding: &crate::memory::stack::Binding) -> VarView {
        let value = match (binding.aliased, binding.first_slot()) {
            (true, Some(first)) if binding.is_array() => self.value(&Value::Pointer(Target::Array {
                first,
                len: binding.slots.len(),
            })),
            (true, Some(first)) => self.value(&Value::Pointer(Target::Stack(first))),
            (false, _) if binding.is_array() => {
                ValueView::Array(binding.slots.iter().map(|&id| self.cell(id)).collect())
            }
            (false, Some(first)) => self.cell(first),
            (_, None) => ValueView::Uninit,
        };

        let live = binding
            .slots
            .iter()
            .all(|&id| self.memory.slots().is_live(id));

        VarView {
            name: binding.name.clone(),
            ty: binding.ty.to_string(),
            value,
            aliased: binding.aliased,
            live,
        }
    }

    fn cell(&self, id: SlotId) -> ValueView {
        self.memory
            .slots()
            .get(id)
            .map_or(ValueView::Uninit, |slot| self.value(&slot.value))
    }

    fn value(&self, value: &Value) -> ValueView {
        match value {
            Value::Int(n) => ValueView::Int(*n),
            Value::Bool(b) => ValueView::Bool(*b),
            Value::Unit => ValueView::Unit,
            Value::Uninit => ValueView::Uninit,
            Value::Array(values) => ValueView::Array(values.iter().map(|v| self.value(v)).collect()),
            Value::Pointer(Target::Stack(id)) => self.stack_ref(*id, false),
            Value::Pointer(Target::Array { first, .. }) => self.stack_ref(*first, true),
            Value::Pointer(Target::Heap(address)) => ValueView::Heap {
                address: *address,
                live: self.memory.heap().block(*address).is_ok(),
            },
            Value::Pointer(Target::HeapElement { address, index }) => ValueView::HeapElement {
                address: *address,
                index: *index,
            },
        }
    }

    fn stack_ref(&self, id: SlotId, whole_array: bool) -> ValueView {
        let Some(slot) = self.memory.slots().get(id) else {
            return ValueView::Ref {
                target: id.to_string(),
                live: false,
            };
        };

        let label = if whole_array {
            slot.label.split('[').next().unwrap_or(&slot.label)
        } else {
            slot.label.as_str()
        };
        let target = match self.functions.get(&slot.frame) {
            Some(function) if slot.live => format!("{}::{}", function, label),
            _ => label.to_string(),
        };

        ValueView::Ref {
            target,
            live: slot.live,
        }
    }
}

/// Default memory budget for [`SnapshotHistory`], in estimated bytes
pub const DEFAULT_HISTORY_LIMIT: usize = 64 * 1024 * 1024;

/// Snapshots kept for stepping backwards, oldest evicted first once the
/// memory budget is exceeded
#[derive(Debug)]
pub struct SnapshotHistory {
    snapshots: VecDeque<Snapshot>,
    max_memory: usize,
    current_memory: usize,
    /// Snapshots dropped from the front since the last `clear`
    evicted: usize,
}

impl SnapshotHistory {
    pub fn new(max_memory: usize) -> Self {
        SnapshotHistory {
            snapshots: VecDeque::new(),
            max_memory,
            current_memory: 0,
            evicted: 0,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) {
        self.current_memory += snapshot.estimated_size();
        self.snapshots.push_back(snapshot);

        while self.current_memory > self.max_memory && self.snapshots.len() > 1 {
            if let Some(old) = self.snapshots.pop_front() {
                self.current_memory -= old.estimated_size();
                self.evicted += 1;
            }
        }
    }

    /// Get a snapshot by index (0 = oldest still held)
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.current_memory = 0;
        self.evicted = 0;
    }

    /// Number of snapshots that fell off the front
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    /// Get current memory usage
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Get max memory limit
    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}
