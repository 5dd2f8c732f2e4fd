//! This module rewrites a machine over an arbitrary alphabet into an equivalent machine over
//! `{0, 1}`.
//!
//! Every symbol is given a fixed-width binary code with the blank at code 0. Each original
//! state `s` owns a block of generated sub-states:
//!
//! * a binary read tree (`2^b - 1` internal nodes, `2^b` leaves), walked while moving right;
//! * for every transition out of `s`, a chain that backtracks over the code it read,
//!   writes the new code, backtracks again and finally shifts a whole code width in the
//!   transition's direction, entering sub-state 0 of the target.
//!
//! Sub-states live in a `SubStateArena` keyed by `(original_state, offset)`. Offsets are
//! computed from the symbol code and the position in the chain, so building a block does not
//! depend on the order transitions are visited in.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::machine::{MachineDefinition, TapeMachine, TransitionTable};
use crate::tape::{strip_blanks, Tape, TapeInput};
use crate::types::{Direction, MachineError, State, Symbol, Transition};

/// The blank of every binarized machine.
pub const BINARY_BLANK: &str = "0";
/// The only other symbol of a binarized machine.
pub const BINARY_ONE: &str = "1";

/// Generated sub-states, keyed by the original state they belong to and their offset in that
/// state's block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubStateArena {
    names: BTreeMap<(State, usize), State>,
}

impl SubStateArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the name of sub-state `offset` of `origin`, creating it on first use.
    ///
    /// Repeated calls with the same key return the same name.
    pub fn sub_state(&mut self, origin: &str, offset: usize) -> State {
        self.names
            .entry((origin.to_string(), offset))
            .or_insert_with(|| format!("{}_{}", origin, offset))
            .clone()
    }

    /// Looks up an existing sub-state without creating it.
    pub fn get(&self, origin: &str, offset: usize) -> Option<&State> {
        self.names.get(&(origin.to_string(), offset))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over `((original_state, offset), name)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&(State, usize), &State)> {
        self.names.iter()
    }
}

/// Offset arithmetic for the block of sub-states owned by one original state.
#[derive(Debug, Clone, Copy)]
struct BlockLayout {
    bit_depth: usize,
}

impl BlockLayout {
    fn internal_nodes(&self) -> usize {
        (1 << self.bit_depth) - 1
    }

    /// The read-tree leaf reached after reading `code`.
    fn leaf(&self, code: usize) -> usize {
        self.internal_nodes() + code
    }

    /// States generated per transition after its leaf.
    fn chain_len(&self) -> usize {
        4 * self.bit_depth - 1
    }

    /// Sub-state `phase` of the chain that handles reading `code`.
    fn chain(&self, code: usize, phase: usize) -> usize {
        2 * self.internal_nodes() + 1 + code * self.chain_len() + phase
    }
}

/// Everything needed to translate tapes between an original machine and its binarized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarizationContext {
    bit_depth: usize,
    alphabet: Vec<Symbol>,
    original_blank: Symbol,
    identity: bool,
}

impl BinarizationContext {
    /// Number of bits per encoded symbol.
    pub fn bit_depth(&self) -> usize {
        self.bit_depth
    }

    /// The original alphabet ordered by code. The blank is always first.
    pub fn alphabet(&self) -> &[Symbol] {
        &self.alphabet
    }

    pub fn original_blank(&self) -> &str {
        &self.original_blank
    }

    /// True when the input was already binary and binarization returned it unchanged.
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Returns the numeric code of an original symbol.
    pub fn code(&self, symbol: &str) -> Option<usize> {
        self.alphabet.iter().position(|s| s == symbol)
    }

    /// Returns the `bit_depth` bits encoding `symbol`, most significant first.
    pub fn encode_symbol(&self, symbol: &str) -> Result<Vec<Symbol>, MachineError> {
        if self.identity {
            return Ok(vec![symbol.to_string()]);
        }

        let code = self.code(symbol).ok_or_else(|| {
            MachineError::PreconditionViolation(format!(
                "Symbol {:?} is not part of the binarized alphabet",
                symbol
            ))
        })?;

        Ok(bits(code, self.bit_depth)
            .into_iter()
            .map(|bit| bit_symbol(bit).to_string())
            .collect())
    }

    /// Encodes an original tape, returning the binary cells and the scaled head index.
    pub fn encode_tape(&self, cells: &[Symbol], head: usize) -> Result<(Vec<Symbol>, usize), MachineError> {
        let mut encoded = Vec::with_capacity(cells.len() * self.bit_depth);
        for cell in cells {
            encoded.extend(self.encode_symbol(cell)?);
        }

        let scale = if self.identity { 1 } else { self.bit_depth };
        Ok((encoded, head * scale))
    }

    /// Decodes a binary tape back to original symbols.
    ///
    /// The head is assumed to rest on the first bit of a code, which holds whenever the
    /// binarized machine is between two original steps. The bit string is padded with zeros
    /// on both ends until the head and the length are multiples of the bit depth.
    ///
    /// # Returns
    ///
    /// * `Err(MachineError::DecodeConsistency)` if a cell is not a bit or a code is unused.
    pub fn decode(&self, cells: &[Symbol], head: usize) -> Result<Vec<Symbol>, MachineError> {
        if self.identity {
            return Ok(cells.to_vec());
        }

        let b = self.bit_depth;
        let lead = (b - head % b) % b;
        let mut padded: Vec<&str> = std::iter::repeat(BINARY_BLANK).take(lead).collect();
        padded.extend(cells.iter().map(String::as_str));
        while padded.len() % b != 0 {
            padded.push(BINARY_BLANK);
        }

        padded
            .chunks(b)
            .map(|group| {
                let mut code = 0usize;
                for bit in group {
                    code = code * 2
                        + match *bit {
                            BINARY_BLANK => 0,
                            BINARY_ONE => 1,
                            other => {
                                return Err(MachineError::DecodeConsistency(format!(
                                    "Binary tape contains non-bit symbol {:?}",
                                    other
                                )))
                            }
                        };
                }

                self.alphabet.get(code).cloned().ok_or_else(|| {
                    MachineError::DecodeConsistency(format!(
                        "Code {} does not belong to any symbol of a {}-symbol alphabet",
                        code,
                        self.alphabet.len()
                    ))
                })
            })
            .collect()
    }

    /// Decodes a binarized machine's tape.
    pub fn decode_tape(&self, tape: &Tape) -> Result<Vec<Symbol>, MachineError> {
        self.decode(tape.cells(), tape.head())
    }

    /// Decodes and strips original blanks from both ends.
    pub fn decode_stripped(&self, cells: &[Symbol], head: usize) -> Result<Vec<Symbol>, MachineError> {
        Ok(strip_blanks(&self.decode(cells, head)?, &self.original_blank))
    }
}

/// Binarizes a machine, including its current tape.
///
/// The returned machine starts in its initial state on the encoded tape, with the head
/// index scaled by the bit depth.
///
/// # Returns
///
/// * `Ok((machine, context))` with the binary machine and its decode context.
/// * `Err(MachineError::PreconditionViolation)` if a transition uses `Direction::Stay`.
pub fn binarize(machine: &TapeMachine) -> Result<(TapeMachine, BinarizationContext), MachineError> {
    let (definition, context) = binarize_with_symbols(machine.definition(), machine.tape().cells())?;
    let (cells, head) = context.encode_tape(machine.tape().cells(), machine.head())?;

    let binary = TapeMachine::new(definition, TapeInput::StructuredDefinition { cells, head })?;
    Ok((binary, context))
}

/// Binarizes a definition on its own.
pub fn binarize_definition(
    definition: &MachineDefinition,
) -> Result<(MachineDefinition, BinarizationContext), MachineError> {
    binarize_with_symbols(definition, &[])
}

fn binarize_with_symbols(
    definition: &MachineDefinition,
    tape_symbols: &[Symbol],
) -> Result<(MachineDefinition, BinarizationContext), MachineError> {
    let mut symbols = definition.alphabet();
    symbols.extend(tape_symbols.iter().cloned());

    let blank = definition.blank().to_string();
    if blank == BINARY_BLANK && symbols.iter().all(|s| s == BINARY_BLANK || s == BINARY_ONE) {
        debug!("Definition is already binary, binarization is a no-op");
        let context = BinarizationContext {
            bit_depth: 1,
            alphabet: vec![BINARY_BLANK.to_string(), BINARY_ONE.to_string()],
            original_blank: blank,
            identity: true,
        };
        return Ok((definition.clone(), context));
    }

    // The blank gets code 0
    symbols.remove(&blank);
    let alphabet: Vec<Symbol> = std::iter::once(blank.clone()).chain(symbols).collect();

    let mut bit_depth = 1;
    while (1usize << bit_depth) < alphabet.len() {
        bit_depth += 1;
    }

    let context = BinarizationContext {
        bit_depth,
        alphabet,
        original_blank: blank,
        identity: false,
    };

    let mut arena = SubStateArena::new();
    let transitions = build_transitions(definition, &context, &mut arena)?;

    check_name_collisions(definition, &arena)?;

    let initial_state = entry_state(definition, &mut arena, definition.initial_state());

    debug!(
        "Binarized {} symbols at bit depth {}: {} transitions, {} sub-states",
        context.alphabet.len(),
        bit_depth,
        transitions.len(),
        arena.len()
    );

    let binary = MachineDefinition::new(
        transitions,
        initial_state,
        definition.halting_states().iter().cloned(),
        BINARY_BLANK,
    )?;

    Ok((binary, context))
}

/// The state a transition into `state` should enter: halting states keep their name, every
/// other state is entered through sub-state 0 of its block.
fn entry_state(definition: &MachineDefinition, arena: &mut SubStateArena, state: &str) -> State {
    if definition.is_halting(state) {
        state.to_string()
    } else {
        arena.sub_state(state, 0)
    }
}

fn build_transitions(
    definition: &MachineDefinition,
    context: &BinarizationContext,
    arena: &mut SubStateArena,
) -> Result<TransitionTable, MachineError> {
    let layout = BlockLayout {
        bit_depth: context.bit_depth,
    };
    let mut table = TransitionTable::new();

    for state in definition.source_states() {
        add_read_tree(&mut table, arena, &state, layout);
    }

    for ((state, read), transition) in definition.transitions() {
        if transition.direction == Direction::Stay {
            return Err(MachineError::PreconditionViolation(format!(
                "Transition ({}, {:?}) does not move the head; binarization needs L or R",
                state, read
            )));
        }

        let code = context.code(read).ok_or_else(|| {
            MachineError::DecodeConsistency(format!("Symbol {:?} has no binary code", read))
        })?;
        let write_code = context.code(&transition.write).ok_or_else(|| {
            MachineError::DecodeConsistency(format!(
                "Symbol {:?} has no binary code",
                transition.write
            ))
        })?;

        let target = entry_state(definition, arena, &transition.next_state);
        add_chain(&mut table, arena, state, code, write_code, transition.direction, target, layout);
    }

    Ok(table)
}

/// Adds the read tree of `state`: node `i` moves right to node `2i + 1` on 0 and `2i + 2` on 1.
fn add_read_tree(table: &mut TransitionTable, arena: &mut SubStateArena, state: &str, layout: BlockLayout) {
    for node in 0..layout.internal_nodes() {
        let from = arena.sub_state(state, node);
        for bit in [0, 1] {
            let to = arena.sub_state(state, 2 * node + 1 + bit);
            table.insert(
                (from.clone(), bit_symbol(bit).to_string()),
                Transition::new(to, bit_symbol(bit), Direction::Right),
            );
        }
    }
}

/// Adds the backtrack, write, backtrack and shift chain for one original transition.
#[allow(clippy::too_many_arguments)]
fn add_chain(
    table: &mut TransitionTable,
    arena: &mut SubStateArena,
    state: &str,
    code: usize,
    write_code: usize,
    direction: Direction,
    target: State,
    layout: BlockLayout,
) {
    let b = layout.bit_depth;
    let write_bits = bits(write_code, b);

    // Every step of the chain, as (bit to write or None to keep, direction)
    let mut moves: Vec<(Option<usize>, Direction)> = Vec::with_capacity(4 * b);
    moves.extend(std::iter::repeat((None, Direction::Left)).take(b));
    moves.extend(write_bits.iter().map(|&bit| (Some(bit), Direction::Right)));
    moves.extend(std::iter::repeat((None, Direction::Left)).take(b));
    moves.extend(std::iter::repeat((None, direction)).take(b));

    let mut from = arena.sub_state(state, layout.leaf(code));
    let last = moves.len() - 1;
    for (phase, (write, move_direction)) in moves.into_iter().enumerate() {
        let to = if phase == last {
            target.clone()
        } else {
            arena.sub_state(state, layout.chain(code, phase))
        };

        for bit in [0, 1] {
            let written = write.unwrap_or(bit);
            table.insert(
                (from.clone(), bit_symbol(bit).to_string()),
                Transition::new(to.clone(), bit_symbol(written), move_direction),
            );
        }

        from = to;
    }
}

/// Generated names must not shadow the halting states that keep their original names.
fn check_name_collisions(definition: &MachineDefinition, arena: &SubStateArena) -> Result<(), MachineError> {
    let generated: BTreeSet<&State> = arena.iter().map(|(_, name)| name).collect();
    match definition
        .halting_states()
        .iter()
        .find(|state| generated.contains(state))
    {
        Some(state) => Err(MachineError::PreconditionViolation(format!(
            "Halting state {} collides with a generated sub-state name",
            state
        ))),
        None => Ok(()),
    }
}

/// The `width` bits of `value`, most significant first.
fn bits(value: usize, width: usize) -> Vec<usize> {
    (0..width).rev().map(|i| (value >> i) & 1).collect()
}

fn bit_symbol(bit: usize) -> &'static str {
    if bit == 0 {
        BINARY_BLANK
    } else {
        BINARY_ONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction::{Left, Right, Stay};

    fn symbols(cells: &[&str]) -> Vec<Symbol> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn unary_adder() -> MachineDefinition {
        MachineDefinition::from_rules(
            [
                ("q0", "1", "1", Right, "q0"),
                ("q0", "x", "x", Right, "q1"),
                ("q1", "_", "_", Left, "qend"),
                ("q1", "1", "x", Left, "q2"),
                ("q2", "x", "1", Right, "q0"),
            ],
            "q0",
            ["qend"],
            "_",
        )
        .unwrap()
    }

    #[test]
    fn test_arena_is_keyed_by_origin_and_offset() {
        let mut arena = SubStateArena::new();

        let first = arena.sub_state("q0", 3);
        let again = arena.sub_state("q0", 3);
        let other = arena.sub_state("q1", 3);

        assert_eq!(first, "q0_3");
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get("q1", 3), Some(&"q1_3".to_string()));
        assert_eq!(arena.get("q1", 4), None);
    }

    #[test]
    fn test_block_layout_offsets_do_not_overlap() {
        let layout = BlockLayout { bit_depth: 2 };

        assert_eq!(layout.internal_nodes(), 3);
        assert_eq!(layout.leaf(0), 3);
        assert_eq!(layout.leaf(3), 6);
        assert_eq!(layout.chain(0, 0), 7);
        assert_eq!(layout.chain(1, 0), 7 + layout.chain_len());
    }

    #[test]
    fn test_unary_adder_binarized() {
        let machine = TapeMachine::new(unary_adder(), "^111x11".into()).unwrap();
        let (mut binary, context) = binarize(&machine).unwrap();

        assert_eq!(context.bit_depth(), 2);
        assert_eq!(context.alphabet(), symbols(&["_", "1", "x"]).as_slice());
        assert!(binary
            .definition()
            .alphabet()
            .iter()
            .all(|s| s == BINARY_BLANK || s == BINARY_ONE));

        binary.run().unwrap();

        assert_eq!(
            context.decode_stripped(binary.tape().cells(), binary.head()).unwrap(),
            symbols(&["1", "1", "1", "1", "1", "x"])
        );
    }

    #[test]
    fn test_binary_definition_is_left_unchanged() {
        let definition = MachineDefinition::from_rules(
            [("q0", "1", "1", Right, "q0"), ("q0", "0", "1", Right, "qend")],
            "q0",
            ["qend"],
            "0",
        )
        .unwrap();

        let (binary, context) = binarize_definition(&definition).unwrap();

        assert!(context.is_identity());
        assert_eq!(binary, definition);
        assert_eq!(context.decode(&symbols(&["1", "0"]), 1).unwrap(), symbols(&["1", "0"]));
    }

    #[test]
    fn test_two_symbol_alphabet_other_than_bits_is_renamed() {
        let definition = MachineDefinition::from_rules(
            [("q0", "_", "a", Right, "qend")],
            "q0",
            ["qend"],
            "_",
        )
        .unwrap();

        let (binary, context) = binarize_definition(&definition).unwrap();

        assert!(!context.is_identity());
        assert_eq!(context.bit_depth(), 1);
        assert_eq!(binary.blank(), BINARY_BLANK);
        assert_eq!(binary.initial_state(), "q0_0");
    }

    #[test]
    fn test_left_growth_realigns_on_decode() {
        let definition = MachineDefinition::from_rules(
            [
                ("q0", "x", "x", Left, "q1"),
                ("q1", "_", "y", Left, "q2"),
                ("q2", "_", "z", Right, "qend"),
            ],
            "q0",
            ["qend"],
            "_",
        )
        .unwrap();
        let mut direct = TapeMachine::new(definition, "^x".into()).unwrap();
        let (mut binary, context) = binarize(&direct).unwrap();

        direct.run().unwrap();
        binary.run().unwrap();

        let decoded = context
            .decode_stripped(binary.tape().cells(), binary.head())
            .unwrap();
        assert_eq!(direct.stripped_tape(), symbols(&["z", "y", "x"]));
        assert_eq!(decoded, direct.stripped_tape());
    }

    #[test]
    fn test_head_is_scaled_by_bit_depth() {
        let machine = TapeMachine::new(unary_adder(), "11^1x11".into()).unwrap();
        let (binary, context) = binarize(&machine).unwrap();

        assert_eq!(binary.head(), 2 * context.bit_depth());
        assert_eq!(binary.tape().len(), 6 * context.bit_depth());
    }

    #[test]
    fn test_decode_pads_unaligned_tapes() {
        let definition =
            MachineDefinition::from_rules([("q0", "a", "b", Right, "h")], "q0", ["h"], "_").unwrap();
        let (_, context) = binarize_definition(&definition).unwrap();

        // alphabet: _ = 00, a = 01, b = 10; head on the second bit string "10"
        let decoded = context.decode(&symbols(&["1", "1", "0", "0"]), 1).unwrap();
        assert_eq!(decoded, symbols(&["a", "b", "_"]));
    }

    #[test]
    fn test_decode_rejects_unknown_codes_and_symbols() {
        let definition =
            MachineDefinition::from_rules([("q0", "a", "b", Right, "h")], "q0", ["h"], "_").unwrap();
        let (_, context) = binarize_definition(&definition).unwrap();

        assert!(matches!(
            context.decode(&symbols(&["1", "1"]), 0),
            Err(MachineError::DecodeConsistency(_))
        ));
        assert!(matches!(
            context.decode(&symbols(&["1", "x"]), 0),
            Err(MachineError::DecodeConsistency(_))
        ));
        assert!(matches!(
            context.encode_symbol("c"),
            Err(MachineError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_stay_is_rejected() {
        let definition =
            MachineDefinition::from_rules([("q0", "a", "b", Stay, "h")], "q0", ["h"], "_").unwrap();

        assert!(matches!(
            binarize_definition(&definition),
            Err(MachineError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_undefined_transition_survives_binarization() {
        let machine = TapeMachine::new(unary_adder(), "^1y".into()).unwrap();
        let (mut binary, _) = binarize(&machine).unwrap();

        assert!(matches!(
            binary.run(),
            Err(MachineError::UndefinedTransition { .. })
        ));
    }
}
