//! This module provides functions for analyzing machine definitions to detect structural
//! problems before execution. This includes checks for a usable blank symbol, well-formed
//! state and symbol labels, a valid start state and halting states that never execute.

use crate::machine::MachineDefinition;
use crate::types::{MachineError, HEAD_MARKER};
use std::collections::BTreeSet;

/// Represents the problems that can be found during the analysis of a definition.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalysisError {
    /// The blank symbol is empty, contains whitespace or collides with the head marker.
    InvalidBlank(String),
    /// States or symbols that are empty or contain whitespace.
    InvalidLabels(Vec<String>),
    /// The initial state is neither halting nor the source of any transition.
    InvalidStartState(String),
    /// Halting states that still have outgoing transitions, which could never fire.
    HaltingStateTransitions(Vec<String>),
}

impl From<AnalysisError> for MachineError {
    /// Converts an `AnalysisError` into a `MachineError::MalformedDefinition`.
    fn from(error: AnalysisError) -> Self {
        match error {
            AnalysisError::InvalidBlank(blank) => {
                MachineError::MalformedDefinition(format!("Invalid blank symbol: {:?}", blank))
            }
            AnalysisError::InvalidLabels(labels) => MachineError::MalformedDefinition(format!(
                "Empty or whitespace-containing labels: {:?}",
                labels
            )),
            AnalysisError::InvalidStartState(state) => MachineError::MalformedDefinition(format!(
                "No transition starts from the initial state: {}",
                state
            )),
            AnalysisError::HaltingStateTransitions(states) => MachineError::MalformedDefinition(
                format!("Halting states have outgoing transitions: {:?}", states),
            ),
        }
    }
}

/// Analyzes a `MachineDefinition` for structural errors.
///
/// # Arguments
///
/// * `definition` - A reference to the definition to be analyzed.
///
/// # Returns
///
/// * `Ok(())` if no errors are found.
/// * `Err(MachineError::MalformedDefinition)` for the first violated check.
pub fn analyze(definition: &MachineDefinition) -> Result<(), MachineError> {
    let first_error = [
        check_blank,
        check_labels,
        check_valid_start_state,
        check_halting_states,
    ]
    .iter()
    .find_map(|f| f(definition).err());

    match first_error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && !label.chars().any(char::is_whitespace)
}

fn check_blank(definition: &MachineDefinition) -> Result<(), AnalysisError> {
    let blank = definition.blank();
    if !is_valid_label(blank) || blank == HEAD_MARKER {
        return Err(AnalysisError::InvalidBlank(blank.to_string()));
    }

    Ok(())
}

/// Checks that every state and symbol mentioned by a transition is a usable label.
fn check_labels(definition: &MachineDefinition) -> Result<(), AnalysisError> {
    let mut invalid: BTreeSet<String> = BTreeSet::new();

    for ((state, read), transition) in definition.transitions() {
        for label in [state, read, &transition.next_state, &transition.write] {
            if !is_valid_label(label) {
                invalid.insert(label.clone());
            }
        }
    }

    if !is_valid_label(definition.initial_state()) {
        invalid.insert(definition.initial_state().to_string());
    }

    if !invalid.is_empty() {
        return Err(AnalysisError::InvalidLabels(invalid.into_iter().collect()));
    }

    Ok(())
}

/// Checks whether the initial state can do anything at all.
///
/// A halting initial state is accepted: such a machine simply halts before its first step.
fn check_valid_start_state(definition: &MachineDefinition) -> Result<(), AnalysisError> {
    let initial = definition.initial_state();
    let has_transition = definition
        .transitions()
        .keys()
        .any(|(state, _)| state == initial);

    if !has_transition && !definition.is_halting(initial) {
        return Err(AnalysisError::InvalidStartState(initial.to_string()));
    }

    Ok(())
}

fn check_halting_states(definition: &MachineDefinition) -> Result<(), AnalysisError> {
    let offending: BTreeSet<String> = definition
        .transitions()
        .keys()
        .filter(|(state, _)| definition.is_halting(state))
        .map(|(state, _)| state.clone())
        .collect();

    if !offending.is_empty() {
        return Err(AnalysisError::HaltingStateTransitions(
            offending.into_iter().collect(),
        ));
    }

    Ok(())
}

/// Finds source states that cannot be reached from the initial state.
///
/// Performs a depth-first traversal over the transition graph. Unreachable states are not
/// an error, since generated machines and hand-written tables may carry spare states, but
/// callers may want to report them.
pub fn unreachable_states(definition: &MachineDefinition) -> Vec<String> {
    let mut visited = BTreeSet::new();
    let mut queue = vec![definition.initial_state().to_string()];

    while let Some(state) = queue.pop() {
        if !visited.insert(state.clone()) {
            continue;
        }

        for ((source, _), transition) in definition.transitions() {
            if *source == state && !visited.contains(&transition.next_state) {
                queue.push(transition.next_state.clone());
            }
        }
    }

    definition
        .source_states()
        .into_iter()
        .filter(|state| !visited.contains(state))
        .collect()
}
