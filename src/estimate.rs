//! Resource planning for the pipeline.
//!
//! Each stage can blow a small input up by a large factor: binarization multiplies the state
//! count, the tag word is unary in the value of the binary tape and the universal machine
//! tape is unary in the symbol codes. `plan` works these sizes out from the definition and
//! the tape alone, so a caller can refuse a run before it exhausts memory.

use std::collections::BTreeMap;

use log::debug;

use crate::binarizer::binarize;
use crate::machine::TapeMachine;
use crate::tag_encoder::{self, word_symbol, SEPARATOR};
use crate::tag_system::DEFAULT_HALT_SYMBOL;
use crate::types::{Direction, MachineError, Symbol};
use crate::utm_codec;

/// Productions generated for a right-moving transition.
pub const RIGHT_TEMPLATE_PRODUCTIONS: usize = 16;
/// Productions generated for a left-moving transition.
pub const LEFT_TEMPLATE_PRODUCTIONS: usize = 22;

/// Sizes of every pipeline stage for one machine and tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEstimate {
    /// Bits per original symbol.
    pub bit_depth: usize,
    /// States with outgoing transitions in the binarized machine.
    pub binarized_states: usize,
    pub binarized_transitions: usize,
    /// Cells of the encoded binary tape.
    pub binary_tape_len: usize,
    pub tag_productions: usize,
    /// Symbols of the initial tag word.
    pub tag_word_len: u128,
    /// Tag steps needed to simulate one machine step, about one sweep of the word.
    pub tag_steps_per_step: u128,
    /// Cells of the initial universal machine tape.
    pub utm_tape_len: u128,
}

impl ResourceEstimate {
    /// The largest number of cells or symbols any stage starts with.
    pub fn peak_cells(&self) -> u128 {
        [
            self.binary_tape_len as u128,
            self.tag_word_len,
            self.utm_tape_len,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// The largest number of cells the binary and tag stages start with.
    pub fn peak_tag_cells(&self) -> u128 {
        self.tag_word_len.max(self.binary_tape_len as u128)
    }

    /// Rejects a plan whose largest stage exceeds `limit` cells.
    pub fn ensure_within(&self, limit: u128) -> Result<(), MachineError> {
        check_peak(self.peak_cells(), limit)
    }

    /// Like `ensure_within`, for a run that stops at the tag system.
    pub fn ensure_tag_within(&self, limit: u128) -> Result<(), MachineError> {
        check_peak(self.peak_tag_cells(), limit)
    }
}

fn check_peak(peak: u128, limit: u128) -> Result<(), MachineError> {
    if peak > limit {
        return Err(MachineError::PreconditionViolation(format!(
            "Pipeline needs {} cells, over the limit of {}",
            peak, limit
        )));
    }
    Ok(())
}

/// Computes the size of every stage for `machine` without running anything.
///
/// # Returns
///
/// * `Ok(ResourceEstimate)` if the machine can go through the whole pipeline.
/// * `Err(MachineError::PreconditionViolation)` if a stage would reject it, for example
///   because the head is not at position 0 or a transition does not move.
pub fn plan(machine: &TapeMachine) -> Result<ResourceEstimate, MachineError> {
    let (binary, context) = binarize(machine)?;
    tag_encoder::check_binary(&binary)?;

    let definition = binary.definition();
    let binarized_transitions = definition.transitions().len();

    let tag_productions = RIGHT_TEMPLATE_PRODUCTIONS
        + definition
            .transitions()
            .values()
            .map(|transition| match transition.direction {
                Direction::Left => LEFT_TEMPLATE_PRODUCTIONS,
                _ => RIGHT_TEMPLATE_PRODUCTIONS,
            })
            .sum::<usize>();

    let n = u128::from(tag_encoder::tape_value(binary.tape().cells())?);
    let tag_word_len = 4 + 2 * n;

    let (productions, entry) = tag_encoder::encode_productions(definition, binary.state())?;
    let mut word_counts: BTreeMap<Symbol, u128> = BTreeMap::new();
    word_counts.insert(word_symbol('A', &entry), 1);
    word_counts.insert(word_symbol('B', &entry), 1);
    word_counts.insert(SEPARATOR.to_string(), 2 + n);
    if n > 0 {
        word_counts.insert(word_symbol('b', &entry), n);
    }
    let utm_tape_len = utm_codec::tape_len(&productions, &word_counts, DEFAULT_HALT_SYMBOL)?;

    let estimate = ResourceEstimate {
        bit_depth: context.bit_depth(),
        binarized_states: definition.source_states().len(),
        binarized_transitions,
        binary_tape_len: binary.tape().len(),
        tag_productions,
        tag_word_len,
        tag_steps_per_step: tag_word_len,
        utm_tape_len,
    };

    debug!("Resource estimate: {:?}", estimate);
    Ok(estimate)
}
