//! This module defines `MachineDefinition`, the immutable description of a single-tape
//! Turing machine, and `TapeMachine`, which executes a definition against a tape.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::{debug, trace};

use crate::analyzer::analyze;
use crate::tape::{Tape, TapeInput};
use crate::types::{
    Direction, MachineError, Snapshot, State, Step, Symbol, Transition, INPUT_BLANK_SYMBOL,
};

/// The transition function: a partial map from `(state, read symbol)` to its action.
///
/// Ordered so that every transform iterating over it is deterministic.
pub type TransitionTable = BTreeMap<(State, Symbol), Transition>;

/// Transition table, initial state, halting states and blank symbol of a machine.
///
/// Construction runs the analyzer, so a value of this type is always structurally valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineDefinition {
    transitions: TransitionTable,
    initial_state: State,
    halting_states: BTreeSet<State>,
    blank: Symbol,
}

impl MachineDefinition {
    /// Creates and validates a definition.
    ///
    /// # Returns
    ///
    /// * `Ok(MachineDefinition)` if the definition passes analysis.
    /// * `Err(MachineError::MalformedDefinition)` otherwise.
    pub fn new<I, S>(
        transitions: TransitionTable,
        initial_state: impl Into<State>,
        halting_states: I,
        blank: impl Into<Symbol>,
    ) -> Result<Self, MachineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<State>,
    {
        let definition = Self {
            transitions,
            initial_state: initial_state.into(),
            halting_states: halting_states.into_iter().map(Into::into).collect(),
            blank: blank.into(),
        };

        analyze(&definition)?;

        Ok(definition)
    }

    /// Creates a definition from `(state, read, write, direction, next_state)` rows.
    ///
    /// `_` in a symbol position stands for `blank`. A repeated `(state, read)` key is rejected.
    pub fn from_rules<'a, R, H>(
        rules: R,
        initial_state: &str,
        halting_states: H,
        blank: &str,
    ) -> Result<Self, MachineError>
    where
        R: IntoIterator<Item = (&'a str, &'a str, &'a str, Direction, &'a str)>,
        H: IntoIterator<Item = &'a str>,
    {
        let resolve = |symbol: &str| {
            if symbol == INPUT_BLANK_SYMBOL {
                blank.to_string()
            } else {
                symbol.to_string()
            }
        };

        let mut transitions = TransitionTable::new();
        for (state, read, write, direction, next_state) in rules {
            let key = (state.to_string(), resolve(read));
            if transitions.contains_key(&key) {
                return Err(MachineError::MalformedDefinition(format!(
                    "Duplicate transition for state {} and symbol {:?}",
                    key.0, key.1
                )));
            }
            transitions.insert(key, Transition::new(next_state, resolve(write), direction));
        }

        Self::new(transitions, initial_state, halting_states, blank)
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Looks up the transition for `state` reading `symbol`.
    pub fn transition(&self, state: &str, symbol: &str) -> Option<&Transition> {
        self.transitions.get(&(state.to_string(), symbol.to_string()))
    }

    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    pub fn halting_states(&self) -> &BTreeSet<State> {
        &self.halting_states
    }

    pub fn is_halting(&self, state: &str) -> bool {
        self.halting_states.contains(state)
    }

    pub fn blank(&self) -> &str {
        &self.blank
    }

    /// Every symbol read or written by a transition, plus the blank.
    pub fn alphabet(&self) -> BTreeSet<Symbol> {
        let mut alphabet: BTreeSet<Symbol> = self
            .transitions
            .iter()
            .flat_map(|((_, read), transition)| [read.clone(), transition.write.clone()])
            .collect();
        alphabet.insert(self.blank.clone());
        alphabet
    }

    /// States that have at least one outgoing transition.
    pub fn source_states(&self) -> BTreeSet<State> {
        self.transitions
            .keys()
            .map(|(state, _)| state.clone())
            .collect()
    }

    /// Every state mentioned anywhere in the definition.
    pub fn states(&self) -> BTreeSet<State> {
        let mut states = self.source_states();
        states.extend(self.transitions.values().map(|t| t.next_state.clone()));
        states.extend(self.halting_states.iter().cloned());
        states.insert(self.initial_state.clone());
        states
    }
}

/// Executes a `MachineDefinition` on a single growable tape.
///
/// The machine exclusively owns its tape. The definition is shared: clones of a machine,
/// and machines built from the same `Arc`, point at one table. A failed step leaves the
/// machine exactly as it was at the moment of failure, available for inspection.
#[derive(Debug, Clone)]
pub struct TapeMachine {
    definition: Arc<MachineDefinition>,
    state: State,
    tape: Tape,
    initial_tape: Tape,
    steps: usize,
}

impl TapeMachine {
    /// Creates a new machine in the definition's initial state on the given tape.
    ///
    /// # Arguments
    ///
    /// * `definition` - The validated machine definition, owned or already shared.
    /// * `input` - The initial tape, either a raw literal or explicit cells and head.
    pub fn new(
        definition: impl Into<Arc<MachineDefinition>>,
        input: TapeInput,
    ) -> Result<Self, MachineError> {
        let definition = definition.into();
        let tape = Tape::from_input(input, definition.blank())?;
        Ok(Self::with_tape(definition, tape))
    }

    /// Creates a new machine on an already resolved tape.
    ///
    /// The tape keeps its own cells and head, but growth uses the definition's blank.
    pub fn with_tape(definition: impl Into<Arc<MachineDefinition>>, tape: Tape) -> Self {
        let definition = definition.into();
        let tape = if tape.blank_symbol() == definition.blank() {
            tape
        } else {
            // Rebuilding with a valid head and a non-empty cell list cannot fail.
            Tape::new(tape.cells().to_vec(), tape.head(), definition.blank())
                .unwrap_or_else(|_| Tape::blank(definition.blank()))
        };

        debug!(
            "Machine created: {} transitions, initial state {}, tape {}",
            definition.transitions().len(),
            definition.initial_state(),
            tape
        );

        Self {
            state: definition.initial_state().to_string(),
            initial_tape: tape.clone(),
            tape,
            definition,
            steps: 0,
        }
    }

    /// Executes a single step.
    ///
    /// A machine already in a halting state does nothing and reports `Step::Halt`.
    ///
    /// # Returns
    ///
    /// * `Ok(Step::Halt)` if the state entered by this step is a halting state.
    /// * `Ok(Step::Continue)` otherwise.
    /// * `Err(MachineError::UndefinedTransition)` if no transition matches the current
    ///   state and the symbol under the head. The machine is left untouched.
    pub fn step(&mut self) -> Result<Step, MachineError> {
        if self.is_halted() {
            return Ok(Step::Halt);
        }

        let transition = match self.definition.transition(&self.state, self.tape.read()) {
            Some(transition) => transition.clone(),
            None => {
                return Err(MachineError::UndefinedTransition {
                    state: self.state.clone(),
                    symbol: self.tape.read().to_string(),
                    snapshot: Box::new(self.snapshot()),
                })
            }
        };

        trace!(
            "step {}: ({}, {}) -> ({}, {}, {:?})",
            self.steps,
            self.state,
            self.tape.read(),
            transition.next_state,
            transition.write,
            transition.direction
        );

        self.tape.write(transition.write);
        self.tape.shift(transition.direction);
        self.state = transition.next_state;
        self.steps += 1;

        Ok(if self.is_halted() {
            Step::Halt
        } else {
            Step::Continue
        })
    }

    /// Runs until a halting state is reached and returns the total step count.
    ///
    /// This loop is unbounded; use `run_with_budget` when the machine may not halt.
    pub fn run(&mut self) -> Result<usize, MachineError> {
        while self.step()? == Step::Continue {}

        debug!("Machine halted in state {} after {} steps", self.state, self.steps);
        Ok(self.steps)
    }

    /// Runs for at most `budget` further steps.
    ///
    /// # Returns
    ///
    /// * `Ok(steps)` with the total step count if the machine halted.
    /// * `Err(MachineError::StepBudgetExhausted)` if it was still running after `budget` steps.
    pub fn run_with_budget(&mut self, budget: usize) -> Result<usize, MachineError> {
        for _ in 0..budget {
            if self.step()? == Step::Halt {
                debug!("Machine halted in state {} after {} steps", self.state, self.steps);
                return Ok(self.steps);
            }
        }

        if self.is_halted() {
            Ok(self.steps)
        } else {
            Err(MachineError::StepBudgetExhausted { budget })
        }
    }

    /// Replaces the tape and returns the machine to its initial state with a zero step count.
    pub fn set_tape(&mut self, input: TapeInput) -> Result<(), MachineError> {
        let tape = Tape::from_input(input, self.definition.blank())?;
        self.initial_tape = tape.clone();
        self.tape = tape;
        self.state = self.definition.initial_state().to_string();
        self.steps = 0;
        Ok(())
    }

    /// Replaces the tape in place, keeping the current state and step count.
    pub fn overwrite_tape(&mut self, input: TapeInput) -> Result<(), MachineError> {
        self.tape = Tape::from_input(input, self.definition.blank())?;
        Ok(())
    }

    /// Resets the state, tape and step count to the initial configuration.
    pub fn reset(&mut self) {
        self.state = self.definition.initial_state().to_string();
        self.tape = self.initial_tape.clone();
        self.steps = 0;
    }

    pub fn definition(&self) -> &MachineDefinition {
        &self.definition
    }

    /// The shared handle to the definition.
    pub fn shared_definition(&self) -> &Arc<MachineDefinition> {
        &self.definition
    }

    pub fn transitions(&self) -> &TransitionTable {
        self.definition.transitions()
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn head(&self) -> usize {
        self.tape.head()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Checks if the machine is currently in a halting state.
    pub fn is_halted(&self) -> bool {
        self.definition.is_halting(&self.state)
    }

    /// Returns the tape with leading and trailing blanks removed.
    pub fn stripped_tape(&self) -> Vec<Symbol> {
        self.tape.stripped()
    }

    /// Captures the current state, tape, head and step count.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            tape: self.tape.cells().to_vec(),
            head: self.tape.head(),
            steps: self.steps,
        }
    }
}
