//! This module holds the universal machine: a fixed 11-state program that simulates any
//! two-tag system laid out by `utm_codec`, and `UniversalMachine`, the read-mostly surface
//! consumers use to load, run and inspect it.
//!
//! The program is embedded at compile time and parsed once per process.

use std::sync::Arc;

use lazy_static::lazy_static;
use log::debug;

use crate::binarizer::BinarizationContext;
use crate::loader::{DefinitionLoader, LoaderOptions};
use crate::machine::{MachineDefinition, TapeMachine, TransitionTable};
use crate::tag_encoder::{decode_counts, TapeCounts};
use crate::tag_system::TagSystem;
use crate::tape::{Tape, TapeInput};
use crate::types::{MachineError, Step, Symbol, DEFAULT_HALT_STATE};
use crate::utm_codec::{self, SymbolCodeTable, UtmEncoding, UTM_BLANK};

/// The embedded universal program.
pub const UNIVERSAL_PROGRAM: &str = include_str!("../programs/universal.tsv");

lazy_static! {
    static ref UNIVERSAL: Result<Arc<MachineDefinition>, MachineError> =
        DefinitionLoader::load_definition_from_string(UNIVERSAL_PROGRAM, &universal_options())
            .map(Arc::new);
}

/// The options the universal program is parsed with.
pub fn universal_options() -> LoaderOptions {
    LoaderOptions {
        blank: UTM_BLANK.to_string(),
        halting_states: vec![DEFAULT_HALT_STATE.to_string()],
    }
}

/// Returns the process-wide universal machine definition. Every `UniversalMachine` holds
/// a handle to this one table.
pub fn universal_definition() -> Result<Arc<MachineDefinition>, MachineError> {
    UNIVERSAL.as_ref().map(Arc::clone).map_err(Clone::clone)
}

/// The universal machine loaded with a tape.
///
/// The definition is shared and never changes; only the tape, head and control state move.
/// When the tape came from a tag system, the code table is kept so the final tape can be
/// decoded.
#[derive(Debug, Clone)]
pub struct UniversalMachine {
    machine: TapeMachine,
    codes: Option<SymbolCodeTable>,
}

impl UniversalMachine {
    /// Creates a universal machine on an arbitrary tape, without a code table.
    pub fn new(input: TapeInput) -> Result<Self, MachineError> {
        let machine = TapeMachine::new(universal_definition()?, input)?;
        Ok(Self {
            machine,
            codes: None,
        })
    }

    /// Encodes the current word of `system` and loads it.
    pub fn from_tag_system(system: &TagSystem) -> Result<Self, MachineError> {
        Self::from_encoding(utm_codec::encode_system(system)?)
    }

    /// Loads an existing encoding.
    pub fn from_encoding(encoding: UtmEncoding) -> Result<Self, MachineError> {
        let tape = Tape::new(encoding.tape, encoding.head, UTM_BLANK)?;
        let machine = TapeMachine::with_tape(universal_definition()?, tape);

        debug!(
            "Universal machine loaded: {} cells, head at {}",
            machine.tape().len(),
            machine.head()
        );

        Ok(Self {
            machine,
            codes: Some(encoding.codes),
        })
    }

    /// Replaces the tape with `cells`, which must contain exactly one `^` marker, and
    /// restarts from the initial state. The code table, if any, is kept.
    pub fn set_tape_literal(&mut self, cells: &[Symbol]) -> Result<(), MachineError> {
        self.machine.set_tape(TapeInput::from_marked_cells(cells)?)
    }

    /// Writes a tape back without touching the control state or step count.
    pub fn overwrite_tape(&mut self, cells: Vec<Symbol>, head: usize) -> Result<(), MachineError> {
        self.machine
            .overwrite_tape(TapeInput::StructuredDefinition { cells, head })
    }

    pub fn step(&mut self) -> Result<Step, MachineError> {
        self.machine.step()
    }

    /// Runs to halting. A word that starves leaves the universal machine without a
    /// transition, which surfaces as `MachineError::UndefinedTransition`.
    pub fn run(&mut self) -> Result<usize, MachineError> {
        self.machine.run()
    }

    pub fn run_with_budget(&mut self, budget: usize) -> Result<usize, MachineError> {
        self.machine.run_with_budget(budget)
    }

    pub fn tape(&self) -> &[Symbol] {
        self.machine.tape().cells()
    }

    pub fn head(&self) -> usize {
        self.machine.head()
    }

    pub fn transitions(&self) -> &TransitionTable {
        self.machine.transitions()
    }

    pub fn state(&self) -> &str {
        self.machine.state()
    }

    pub fn steps(&self) -> usize {
        self.machine.steps()
    }

    pub fn is_halted(&self) -> bool {
        self.machine.is_halted()
    }

    pub fn codes(&self) -> Option<&SymbolCodeTable> {
        self.codes.as_ref()
    }

    /// Decodes the tag word left on the tape of a halted machine.
    ///
    /// # Returns
    ///
    /// * `Err(MachineError::PreconditionViolation)` if the machine has not halted or was
    ///   not loaded from a tag system.
    /// * `Err(MachineError::DecodeConsistency)` if the tape does not match the code table.
    pub fn decode_tag_word(&self) -> Result<Vec<Symbol>, MachineError> {
        if !self.is_halted() {
            return Err(MachineError::PreconditionViolation(format!(
                "Universal machine has not halted (state {}, {} steps)",
                self.state(),
                self.steps()
            )));
        }

        let codes = self.codes.as_ref().ok_or_else(|| {
            MachineError::PreconditionViolation(
                "Universal machine was not loaded from a tag system".to_string(),
            )
        })?;

        utm_codec::decode(self.tape(), codes)
    }

    /// Decodes the tag word and recovers the Cocke–Minsky counters from it.
    pub fn decode_counts(&self) -> Result<TapeCounts, MachineError> {
        decode_counts(&self.decode_tag_word()?)
    }

    /// Decodes all the way back to the stripped tape of the machine that was binarized with
    /// `context`. The cell under the head is lost in the tag word and comes back as blank.
    pub fn decode_original(
        &self,
        context: &BinarizationContext,
    ) -> Result<Vec<Symbol>, MachineError> {
        self.decode_counts()?.decode_original(context)
    }
}
