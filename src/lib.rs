//! This crate runs single-tape Turing machines and carries them through a chain of
//! behavior-preserving encodings: alphabet binarization, the Cocke–Minsky construction of a
//! two-tag system, and a tape layout for a fixed universal machine. Every stage can be
//! decoded back so the results of all stages can be compared.

pub mod analyzer;
pub mod binarizer;
pub mod estimate;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod pipeline;
pub mod tag_encoder;
pub mod tag_system;
pub mod tape;
pub mod types;
pub mod utm;
pub mod utm_codec;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the `analyze` function and `AnalysisError` enum from the analyzer module.
pub use analyzer::{analyze, AnalysisError};
/// Re-exports the binarization entry points and their decode context.
pub use binarizer::{binarize, binarize_definition, BinarizationContext, SubStateArena};
/// Re-exports resource planning.
pub use estimate::{plan, ResourceEstimate};
/// Re-exports the `DefinitionLoader` struct and its options from the loader module.
pub use loader::{DefinitionLoader, LoaderOptions};
/// Re-exports the machine definition and the machine that runs it.
pub use machine::{MachineDefinition, TapeMachine, TransitionTable};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports end-to-end verification.
pub use pipeline::{verify, PipelineOptions, PipelineReport};
/// Re-exports the Cocke–Minsky construction.
pub use tag_encoder::{decode_counts, TapeCounts};
/// Re-exports the two-tag system.
pub use tag_system::{TagProductionTable, TagSystem, DEFAULT_HALT_SYMBOL};
/// Re-exports the tape and its input forms.
pub use tape::{Tape, TapeInput};
/// Re-exports various types shared by every stage from the types module.
pub use types::{
    Direction, MachineError, Snapshot, State, Step, Symbol, Transition, DEFAULT_HALT_STATE,
    DEFAULT_MAX_CELLS, DEFAULT_STEP_BUDGET, INPUT_BLANK_SYMBOL, MAX_DEFINITION_SIZE,
};
/// Re-exports the universal machine.
pub use utm::{universal_definition, UniversalMachine};
/// Re-exports the universal machine tape codec.
pub use utm_codec::{SymbolCodeTable, UtmEncoding};
