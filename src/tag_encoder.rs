//! This module translates a binary Turing machine into a two-tag system using the
//! Cocke–Minsky construction.
//!
//! The tape is held as two numbers: `m`, the bits left of the head read as a binary value
//! with the nearest bit least significant, and `n`, the bits right of the head with the
//! nearest bit least significant. The bit under the head is folded into the control state,
//! so every machine state `q` becomes two adapted states `q_0` and `q_1`. A configuration is
//! the word
//!
//! ```text
//! A_q x (a_q x)^m B_q x (b_q x)^n
//! ```
//!
//! Each transition instantiates one of two fixed templates, filled by structured
//! substitution of the source state and the two possible target states.

use std::collections::BTreeSet;

use log::debug;

use crate::binarizer::BinarizationContext;
use crate::machine::{MachineDefinition, TapeMachine};
use crate::tag_system::{TagProductionTable, TagSystem, DEFAULT_HALT_SYMBOL};
use crate::types::{Direction, MachineError, State, Symbol};

/// The filler symbol paired with every decorated symbol of the word.
pub const SEPARATOR: &str = "x";

const BLANK_BIT: &str = "0";
const ONE_BIT: &str = "1";
const SYNTHETIC_START: &str = "q_init";

/// The state a template symbol is decorated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The adapted source state of the transition.
    SelfState,
    /// The adapted target state, entered when the next bit under the head is 0.
    TargetOnRead0,
    /// The adapted target state, entered when the next bit under the head is 1.
    TargetOnRead1,
}

/// One symbol of a production template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSymbol {
    Separator,
    Decorated {
        letter: char,
        slot: Slot,
        branch: Option<u8>,
    },
}

use TemplateSymbol::Separator as X;

const fn own(letter: char) -> TemplateSymbol {
    TemplateSymbol::Decorated {
        letter,
        slot: Slot::SelfState,
        branch: None,
    }
}

const fn own_branch(letter: char, branch: u8) -> TemplateSymbol {
    TemplateSymbol::Decorated {
        letter,
        slot: Slot::SelfState,
        branch: Some(branch),
    }
}

const fn target(letter: char, bit: u8) -> TemplateSymbol {
    TemplateSymbol::Decorated {
        letter,
        slot: if bit == 0 {
            Slot::TargetOnRead0
        } else {
            Slot::TargetOnRead1
        },
        branch: None,
    }
}

type TemplateRule = (TemplateSymbol, &'static [TemplateSymbol]);

/// A production template for one head direction.
pub struct Template {
    /// The letter whose production writes the new bit.
    write_letter: char,
    rules: &'static [TemplateRule],
}

const WRITE_ZERO: &[TemplateSymbol] = &[own('C'), X];
const WRITE_ONE: &[TemplateSymbol] = &[own('C'), X, own('c'), X];

/// Doubles `m` with the written bit, halves `n` and picks the target by the parity of `n`.
pub static RIGHT_TEMPLATE: Template = Template {
    write_letter: 'A',
    rules: &[
        (own('a'), &[own('c'), X, own('c'), X]),
        (own('B'), &[own('S')]),
        (own('b'), &[own('s')]),
        (own('C'), &[own_branch('D', 1), own_branch('D', 0)]),
        (own('c'), &[own_branch('d', 1), own_branch('d', 0)]),
        (own('S'), &[own_branch('T', 1), own_branch('T', 0)]),
        (own('s'), &[own_branch('t', 1), own_branch('t', 0)]),
        (own_branch('D', 1), &[target('A', 1), X]),
        (own_branch('d', 1), &[target('a', 1), X]),
        (own_branch('T', 1), &[target('B', 1), X]),
        (own_branch('t', 1), &[target('b', 1), X]),
        (own_branch('D', 0), &[X, target('A', 0), X]),
        (own_branch('d', 0), &[target('a', 0), X]),
        (own_branch('T', 0), &[target('B', 0), X]),
        (own_branch('t', 0), &[target('b', 0), X]),
    ],
};

/// The mirror image of `RIGHT_TEMPLATE`: the counters swap roles through the `Z` and `Y`
/// relabeling symbols.
pub static LEFT_TEMPLATE: Template = Template {
    write_letter: 'B',
    rules: &[
        (own('A'), &[own('Z'), X]),
        (own('a'), &[own('z'), X]),
        (own('Z'), &[own('S')]),
        (own('z'), &[own('s')]),
        (own('b'), &[own('c'), X, own('c'), X]),
        (own('C'), &[own_branch('D', 1), own_branch('D', 0)]),
        (own('c'), &[own_branch('d', 1), own_branch('d', 0)]),
        (own('S'), &[own_branch('T', 1), own_branch('T', 0)]),
        (own('s'), &[own_branch('t', 1), own_branch('t', 0)]),
        (own_branch('D', 1), &[own_branch('Y', 1), X]),
        (own_branch('d', 1), &[own_branch('y', 1), X]),
        (own_branch('T', 1), &[target('A', 1), X]),
        (own_branch('t', 1), &[target('a', 1), X]),
        (own_branch('D', 0), &[X, own_branch('Y', 0), X]),
        (own_branch('d', 0), &[own_branch('y', 0), X]),
        (own_branch('T', 0), &[target('A', 0), X]),
        (own_branch('t', 0), &[target('a', 0), X]),
        (own_branch('Y', 0), &[target('B', 0), X]),
        (own_branch('y', 0), &[target('b', 0), X]),
        (own_branch('Y', 1), &[target('B', 1), X]),
        (own_branch('y', 1), &[target('b', 1), X]),
    ],
};

impl Template {
    fn for_direction(direction: Direction) -> Result<&'static Template, MachineError> {
        match direction {
            Direction::Right => Ok(&RIGHT_TEMPLATE),
            Direction::Left => Ok(&LEFT_TEMPLATE),
            Direction::Stay => Err(MachineError::PreconditionViolation(
                "The tag construction needs every transition to move the head".to_string(),
            )),
        }
    }

    /// Every production of this template, with the write rule first.
    fn productions(&self, write_bit: &str) -> impl Iterator<Item = (TemplateSymbol, &'static [TemplateSymbol])> + '_ {
        let write = if write_bit == ONE_BIT { WRITE_ONE } else { WRITE_ZERO };
        std::iter::once((own(self.write_letter), write)).chain(self.rules.iter().copied())
    }
}

/// The concrete states a template is filled with. `None` marks a halting target.
struct Binding<'a> {
    source: &'a str,
    on_read_0: Option<&'a str>,
    on_read_1: Option<&'a str>,
}

impl Binding<'_> {
    fn render(&self, symbol: TemplateSymbol) -> Symbol {
        let (letter, slot, branch) = match symbol {
            TemplateSymbol::Separator => return SEPARATOR.to_string(),
            TemplateSymbol::Decorated {
                letter,
                slot,
                branch,
            } => (letter, slot, branch),
        };

        let name = match slot {
            Slot::SelfState => Some(self.source),
            Slot::TargetOnRead0 => self.on_read_0,
            Slot::TargetOnRead1 => self.on_read_1,
        };

        match (name, branch) {
            // A halting target ends the run: its leading symbol is the halt symbol itself
            (None, _) if letter == 'A' => DEFAULT_HALT_SYMBOL.to_string(),
            (None, _) => format!("{}_{}", letter, DEFAULT_HALT_SYMBOL),
            (Some(name), None) => format!("{}_{}", letter, name),
            (Some(name), Some(bit)) => format!("{}_{}_{}", letter, name, bit),
        }
    }
}

/// Returns the name of `state` while the head reads `bit`.
fn adapted(state: &str, bit: &str) -> State {
    format!("{}_{}", state, bit)
}

/// Builds the tag system that simulates `machine` from its current state and tape.
///
/// # Returns
///
/// * `Ok((productions, word))` with the production table and the initial word.
/// * `Err(MachineError::PreconditionViolation)` if the machine is not binary with blank `0`,
///   its head is not at position 0, a transition does not move the head or the tape is too
///   wide to be held as a count.
pub fn encode(machine: &TapeMachine) -> Result<(TagProductionTable, Vec<Symbol>), MachineError> {
    check_binary(machine)?;

    let (productions, entry) = encode_productions(machine.definition(), machine.state())?;

    let n = tape_value(machine.tape().cells())?;
    let word = initial_word(&entry, n)?;

    debug!(
        "Tag encoding: {} productions, initial word of {} symbols (n = {})",
        productions.len(),
        word.len(),
        n
    );

    Ok((productions, word))
}

/// Builds the production table for `definition` started in `start_state`.
///
/// Returns the table and the adapted synthetic start state that decorates the initial word.
pub fn encode_productions(
    definition: &MachineDefinition,
    start_state: &str,
) -> Result<(TagProductionTable, State), MachineError> {
    let entry = adapted(&synthetic_start(definition), BLANK_BIT);
    let mut productions = TagProductionTable::new();

    // The synthetic start reads a virtual cell left of the tape and steps onto cell 0
    add_transition(
        &mut productions,
        definition,
        &entry,
        BLANK_BIT,
        Direction::Right,
        start_state,
    )?;

    for ((state, read), transition) in definition.transitions() {
        add_transition(
            &mut productions,
            definition,
            &adapted(state, read),
            &transition.write,
            transition.direction,
            &transition.next_state,
        )?;
    }

    Ok((productions, entry))
}

/// The word `A x B x (b x)^n` for the adapted start state `entry`.
///
/// # Returns
///
/// * `Err(MachineError::PreconditionViolation)` if a word of `4 + 2n` symbols cannot be
///   allocated.
pub fn initial_word(entry: &str, n: u64) -> Result<Vec<Symbol>, MachineError> {
    let too_long = || {
        MachineError::PreconditionViolation(format!(
            "Tag word for tape value {} does not fit in memory",
            n
        ))
    };
    let len = n
        .checked_mul(2)
        .and_then(|pairs| pairs.checked_add(4))
        .and_then(|len| usize::try_from(len).ok())
        .ok_or_else(too_long)?;

    let mut word = Vec::new();
    word.try_reserve_exact(len).map_err(|_| too_long())?;
    word.push(word_symbol('A', entry));
    word.push(SEPARATOR.to_string());
    word.push(word_symbol('B', entry));
    word.push(SEPARATOR.to_string());
    for _ in 0..n {
        word.push(word_symbol('b', entry));
        word.push(SEPARATOR.to_string());
    }
    Ok(word)
}

pub(crate) fn word_symbol(letter: char, entry: &str) -> Symbol {
    format!("{}_{}", letter, entry)
}

/// Builds the tag system for `machine`, ready to run.
pub fn encode_system(machine: &TapeMachine) -> Result<TagSystem, MachineError> {
    let (productions, word) = encode(machine)?;
    Ok(TagSystem::new(productions, word, DEFAULT_HALT_SYMBOL))
}

pub(crate) fn check_binary(machine: &TapeMachine) -> Result<(), MachineError> {
    let definition = machine.definition();

    if definition.blank() != BLANK_BIT {
        return Err(MachineError::PreconditionViolation(format!(
            "The tag construction needs blank {:?}, found {:?}",
            BLANK_BIT,
            definition.blank()
        )));
    }

    let is_bit = |symbol: &str| symbol == BLANK_BIT || symbol == ONE_BIT;
    if let Some(symbol) = definition
        .alphabet()
        .iter()
        .chain(machine.tape().cells())
        .find(|symbol| !is_bit(symbol))
    {
        return Err(MachineError::PreconditionViolation(format!(
            "The tag construction needs a binary machine, found symbol {:?}",
            symbol
        )));
    }

    if machine.head() != 0 {
        return Err(MachineError::PreconditionViolation(format!(
            "The tag construction needs the head at position 0, found {}",
            machine.head()
        )));
    }

    Ok(())
}

/// A base name for the start state that no state of `definition` uses.
fn synthetic_start(definition: &MachineDefinition) -> State {
    let states = definition.states();
    let mut name = SYNTHETIC_START.to_string();
    while states.contains(&name) {
        name.push('\'');
    }
    name
}

fn add_transition(
    productions: &mut TagProductionTable,
    definition: &MachineDefinition,
    source: &str,
    write: &str,
    direction: Direction,
    next_state: &str,
) -> Result<(), MachineError> {
    let template = Template::for_direction(direction)?;

    let halting = definition.is_halting(next_state);
    let on_read_0 = (!halting).then(|| adapted(next_state, BLANK_BIT));
    let on_read_1 = (!halting).then(|| adapted(next_state, ONE_BIT));
    let binding = Binding {
        source,
        on_read_0: on_read_0.as_deref(),
        on_read_1: on_read_1.as_deref(),
    };

    for (lhs, rhs) in template.productions(write) {
        let key = binding.render(lhs);
        let production = rhs.iter().map(|symbol| binding.render(*symbol)).collect();
        if productions.insert(key.clone(), production).is_some() {
            return Err(MachineError::MalformedDefinition(format!(
                "Tag production {:?} generated twice",
                key
            )));
        }
    }

    Ok(())
}

/// Reads the cells as a binary number, cell 0 least significant.
pub(crate) fn tape_value(cells: &[Symbol]) -> Result<u64, MachineError> {
    let mut value = 0u64;
    for (i, cell) in cells.iter().enumerate() {
        if cell != ONE_BIT {
            continue;
        }
        if i >= 64 {
            return Err(MachineError::PreconditionViolation(format!(
                "Tape of {} cells is too wide for the tag construction",
                cells.len()
            )));
        }
        value |= 1 << i;
    }
    Ok(value)
}

/// The two counters of a Cocke–Minsky configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TapeCounts {
    /// Bits left of the head, nearest bit least significant.
    pub left: u64,
    /// Bits right of the head, nearest bit least significant.
    pub right: u64,
}

impl TapeCounts {
    /// Computes the counters of a binary tape. The cell under the head is not part of either.
    ///
    /// # Returns
    ///
    /// * `Err(MachineError::DecodeConsistency)` if a cell is not a bit.
    /// * `Err(MachineError::PreconditionViolation)` if either side holds more than 64
    ///   significant bits.
    pub fn from_tape(cells: &[Symbol], head: usize) -> Result<Self, MachineError> {
        if let Some(cell) = cells.iter().find(|c| *c != BLANK_BIT && *c != ONE_BIT) {
            return Err(MachineError::DecodeConsistency(format!(
                "Binary tape contains non-bit symbol {:?}",
                cell
            )));
        }

        let left: Vec<Symbol> = cells.iter().take(head).rev().cloned().collect();
        let right: &[Symbol] = cells.get(head + 1..).unwrap_or(&[]);

        Ok(Self {
            left: tape_value(&left)?,
            right: tape_value(right)?,
        })
    }

    /// Rebuilds a binary tape: `m` in binary, the head cell, then `n` in binary reversed.
    ///
    /// The head cell is always `0`, since the bit it held was absorbed into the halted
    /// control state.
    pub fn to_tape(&self) -> (Vec<Symbol>, usize) {
        let mut cells: Vec<Symbol> = Vec::new();
        let mut left = self.left;
        while left > 0 {
            cells.push(bit(left & 1));
            left >>= 1;
        }
        cells.reverse();

        let head = cells.len();
        cells.push(BLANK_BIT.to_string());

        let mut right = self.right;
        while right > 0 {
            cells.push(bit(right & 1));
            right >>= 1;
        }

        (cells, head)
    }

    /// Rebuilds the original machine's stripped tape through the binarization that produced
    /// the binary machine.
    ///
    /// The head cell comes back as `0`, so an original symbol whose code starts with a 1
    /// bit is lost when the head rests on it.
    pub fn decode_original(&self, context: &BinarizationContext) -> Result<Vec<Symbol>, MachineError> {
        let (cells, head) = self.to_tape();
        context.decode_stripped(&cells, head)
    }
}

fn bit(value: u64) -> Symbol {
    if value == 0 { BLANK_BIT } else { ONE_BIT }.to_string()
}

/// Recovers the counters from a word at a configuration boundary, usually a halted word.
///
/// # Returns
///
/// * `Ok(TapeCounts)` if the word has the shape `A x (a x)* B x (b x)*`, where the leading
///   symbol may also be the halt symbol.
/// * `Err(MachineError::DecodeConsistency)` otherwise.
pub fn decode_counts(word: &[Symbol]) -> Result<TapeCounts, MachineError> {
    let malformed = |at: usize, reason: String| {
        MachineError::DecodeConsistency(format!(
            "Word is not a tag configuration at position {}: {}",
            at, reason
        ))
    };

    let mut symbols = Vec::with_capacity(word.len() / 2);
    for (i, pair) in word.chunks(2).enumerate() {
        match pair {
            [symbol, separator] if separator == SEPARATOR => symbols.push(symbol.as_str()),
            _ => return Err(malformed(2 * i, format!("expected a symbol and {:?}", SEPARATOR))),
        }
    }

    let mut symbols = symbols.into_iter().enumerate();
    match symbols.next() {
        Some((_, head)) if head == DEFAULT_HALT_SYMBOL || head.starts_with("A_") => {}
        _ => return Err(malformed(0, "missing leading state symbol".to_string())),
    }

    let mut counts = TapeCounts::default();
    loop {
        match symbols.next() {
            Some((_, symbol)) if symbol.starts_with("a_") => counts.left += 1,
            Some((_, symbol)) if symbol.starts_with("B_") => break,
            Some((i, symbol)) => {
                return Err(malformed(2 * i, format!("unexpected symbol {:?}", symbol)))
            }
            None => return Err(malformed(word.len(), "missing right counter marker".to_string())),
        }
    }

    for (i, symbol) in symbols {
        if !symbol.starts_with("b_") {
            return Err(malformed(2 * i, format!("unexpected symbol {:?}", symbol)));
        }
        counts.right += 1;
    }

    Ok(counts)
}

/// Every adapted state name the construction gives `definition`, for diagnostics.
pub fn adapted_states(definition: &MachineDefinition) -> BTreeSet<State> {
    definition
        .transitions()
        .keys()
        .map(|(state, read)| adapted(state, read))
        .collect()
}
