//! This module defines the core data structures and types shared by every stage of the
//! encoding chain: symbols and states, head directions, transitions, step outcomes,
//! diagnostic snapshots and the crate-wide error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Rule;

/// An atomic tape or word token. Multi-character symbols such as `"1>"` are allowed.
pub type Symbol = String;
/// An atomic control-state label.
pub type State = String;

/// A special input symbol used in definitions and tape literals to represent the blank symbol.
pub const INPUT_BLANK_SYMBOL: &str = "_";
/// The state name that halts a machine loaded from a definition file.
pub const DEFAULT_HALT_STATE: &str = "-";
/// Marks the head position inside a tape literal. The head sits on the cell right of the marker.
pub const HEAD_MARKER: &str = "^";
/// The number of steps `run_with_budget` callers use when they have no better estimate.
pub const DEFAULT_STEP_BUDGET: usize = 10_000_000;
/// The largest tape or word, in cells, the pipeline starts by default.
pub const DEFAULT_MAX_CELLS: u128 = 1 << 26;
/// The maximum allowed size for a machine definition in bytes.
pub const MAX_DEFINITION_SIZE: usize = 1 << 20; // 1MB

/// Represents the possible directions a head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// Parses the single-letter form used in definition files (`L`, `R`, `-`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "L" => Some(Direction::Left),
            "R" => Some(Direction::Right),
            "-" => Some(Direction::Stay),
            _ => None,
        }
    }

    /// The single-letter form used in definition files.
    pub fn code(&self) -> &'static str {
        match self {
            Direction::Left => "L",
            Direction::Right => "R",
            Direction::Stay => "-",
        }
    }
}

/// The right-hand side of a transition entry `(state, symbol) -> (next_state, write, direction)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The next state the machine transitions to.
    pub next_state: State,
    /// The symbol written over the cell under the head.
    pub write: Symbol,
    /// The direction the head moves after writing.
    pub direction: Direction,
}

impl Transition {
    pub fn new(next_state: impl Into<State>, write: impl Into<Symbol>, direction: Direction) -> Self {
        Self {
            next_state: next_state.into(),
            write: write.into(),
            direction,
        }
    }
}

/// Represents the outcome of a single execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The step was performed and execution may continue.
    Continue,
    /// The machine (or word) has reached its halting condition.
    Halt,
}

/// A point-in-time copy of a machine's observable state, attached to errors for reproduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: State,
    pub tape: Vec<Symbol>,
    pub head: usize,
    pub steps: usize,
}

/// Represents the errors that can occur while building, running, encoding or decoding machines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    /// A structural problem detected when a definition or tape is constructed.
    #[error("Malformed definition: {0}")]
    MalformedDefinition(String),
    /// No transition exists for the current state and the symbol under the head.
    #[error("No transition defined for state {state} and symbol {symbol:?} after {steps} steps", steps = .snapshot.steps)]
    UndefinedTransition {
        state: State,
        symbol: Symbol,
        snapshot: Box<Snapshot>,
    },
    /// A transform was invoked on input that does not satisfy its documented precondition.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),
    /// A tag word dropped below two symbols without the halt symbol in front.
    #[error("Tag word starved after {steps} steps: {word:?}")]
    StarvedWord { word: Vec<Symbol>, steps: usize },
    /// A tag word's leading symbol has no production and is not the halt symbol.
    #[error("No production for symbol {symbol:?} after {steps} steps")]
    UnknownSymbol { symbol: Symbol, steps: usize },
    /// A decoder met data that does not match its code table.
    #[error("Decode consistency error: {0}")]
    DecodeConsistency(String),
    /// A budgeted run did not halt within the allowed number of steps.
    #[error("Step budget of {budget} exhausted before halting")]
    StepBudgetExhausted { budget: usize },
    /// Indicates an error during the parsing of a definition.
    #[error("Definition parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
}
