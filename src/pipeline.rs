//! End-to-end verification: run a machine directly and through every encoding stage, then
//! decode each stage and check that they all agree.

use log::info;

use crate::binarizer::binarize;
use crate::estimate::plan;
use crate::machine::TapeMachine;
use crate::tag_encoder::{self, decode_counts, TapeCounts};
use crate::types::{MachineError, Symbol, DEFAULT_MAX_CELLS, DEFAULT_STEP_BUDGET};
use crate::utm::UniversalMachine;

/// Settings for `verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// The step budget of each stage.
    pub step_budget: usize,
    /// Also run the tag system on the universal machine. This is slow for anything but
    /// the smallest machines.
    pub run_universal: bool,
    /// Refuse to start if any stage that will run would need more cells than this.
    pub max_cells: Option<u128>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
            run_universal: false,
            max_cells: Some(DEFAULT_MAX_CELLS),
        }
    }
}

/// Steps taken by each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageSteps {
    pub machine: usize,
    pub binarized: usize,
    pub tag: usize,
    pub universal: Option<usize>,
}

/// What every stage produced, decoded back to a comparable form.
///
/// The machine stages are compared as stripped tapes over the original alphabet. The tag
/// and universal stages only keep the two Cocke–Minsky counters of the binary tape, so they
/// are compared with the counters of the binarized machine's final tape. Their counters
/// are also decoded back to original symbols, with the head cell read as blank bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub original: Vec<Symbol>,
    pub binarized: Vec<Symbol>,
    pub binary_counts: TapeCounts,
    pub tag_counts: TapeCounts,
    pub tag_decoded: Vec<Symbol>,
    pub universal_counts: Option<TapeCounts>,
    pub universal_decoded: Option<Vec<Symbol>>,
    pub steps: StageSteps,
}

impl PipelineReport {
    /// True when every stage agrees with the one before it.
    pub fn is_consistent(&self) -> bool {
        self.original == self.binarized
            && self.binary_counts == self.tag_counts
            && self
                .universal_counts
                .map_or(true, |counts| counts == self.tag_counts)
            && self
                .universal_decoded
                .as_ref()
                .map_or(true, |decoded| *decoded == self.tag_decoded)
    }
}

/// Runs `machine` through every stage.
///
/// The machine is cloned, so the caller's copy is left untouched. Its head must be at
/// position 0 and every transition must move the head.
///
/// # Returns
///
/// * `Ok(PipelineReport)` with the decoded output of every stage, consistent or not.
/// * `Err(MachineError)` if a stage cannot be built, fails while running or runs out of
///   its step budget.
pub fn verify(machine: &TapeMachine, options: &PipelineOptions) -> Result<PipelineReport, MachineError> {
    if let Some(max_cells) = options.max_cells {
        let estimate = plan(machine)?;
        if options.run_universal {
            estimate.ensure_within(max_cells)?;
        } else {
            estimate.ensure_tag_within(max_cells)?;
        }
    }

    let mut direct = machine.clone();
    let machine_steps = direct.run_with_budget(options.step_budget)?;
    let original = direct.stripped_tape();
    info!("Machine halted after {} steps", machine_steps);

    let (binary, context) = binarize(machine)?;
    let mut binary_run = binary.clone();
    let binarized_steps = binary_run.run_with_budget(options.step_budget)?;
    let binarized = context.decode_stripped(binary_run.tape().cells(), binary_run.head())?;
    let binary_counts = TapeCounts::from_tape(binary_run.tape().cells(), binary_run.head())?;
    info!(
        "Binarized machine halted after {} steps at bit depth {}",
        binarized_steps,
        context.bit_depth()
    );

    let tag = tag_encoder::encode_system(&binary)?;
    let mut tag_run = tag.clone();
    let tag_steps = tag_run.run_with_budget(options.step_budget)?;
    let tag_counts = decode_counts(&tag_run.word())?;
    let tag_decoded = tag_counts.decode_original(&context)?;
    info!("Tag system halted after {} steps", tag_steps);

    let (universal_counts, universal_decoded, universal_steps) = if options.run_universal {
        let mut universal = UniversalMachine::from_tag_system(&tag)?;
        let steps = universal.run_with_budget(options.step_budget)?;
        info!("Universal machine halted after {} steps", steps);
        let counts = universal.decode_counts()?;
        (
            Some(counts),
            Some(counts.decode_original(&context)?),
            Some(steps),
        )
    } else {
        (None, None, None)
    };

    Ok(PipelineReport {
        original,
        binarized,
        binary_counts,
        tag_counts,
        tag_decoded,
        universal_counts,
        universal_decoded,
        steps: StageSteps {
            machine: machine_steps,
            binarized: binarized_steps,
            tag: tag_steps,
            universal: universal_steps,
        },
    })
}
