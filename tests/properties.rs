//! Property-based tests for the machine and its encodings.
//!
//! Random machines are kept tiny and their runs short: every encoding stage multiplies the
//! work of the one before it.

use proptest::prelude::*;
use tur_chain::tag_encoder::{decode_counts, encode_system, TapeCounts};
use tur_chain::{
    binarize, Direction, MachineDefinition, MachineError, Step, TagProductionTable, TagSystem,
    Tape, TapeInput, TapeMachine, UniversalMachine, DEFAULT_HALT_SYMBOL,
};

const HALT: &str = "qend";

/// Step budget for the universal machine on the small tag systems generated below.
const UNIVERSAL_BUDGET: usize = 2_000_000;

/// One generated row: read symbol index, write symbol index, direction, next state index.
/// A next state index equal to the state count means the halting state.
type Row = (usize, usize, Direction, usize);

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Left), Just(Direction::Right)]
}

/// A total table over `symbols` for 1 to 3 states.
fn rows(symbols: usize) -> impl Strategy<Value = (usize, Vec<Row>)> {
    (1usize..=3).prop_flat_map(move |states| {
        let row = (0..symbols, direction(), 0..=states);
        (
            Just(states),
            prop::collection::vec(row, states * symbols).prop_map(move |cells| {
                cells
                    .into_iter()
                    .enumerate()
                    .map(|(i, (write, direction, next))| (i % symbols, write, direction, next))
                    .collect()
            }),
        )
    })
}

fn build(states: usize, rows: &[Row], alphabet: &[&str], blank: &str) -> MachineDefinition {
    let name = |index: usize| {
        if index == states {
            HALT.to_string()
        } else {
            format!("q{}", index)
        }
    };

    let owned: Vec<(String, String, String, Direction, String)> = rows
        .iter()
        .enumerate()
        .map(|(i, (read, write, direction, next))| {
            (
                name(i / alphabet.len()),
                alphabet[*read].to_string(),
                alphabet[*write].to_string(),
                *direction,
                name(*next),
            )
        })
        .collect();

    MachineDefinition::from_rules(
        owned
            .iter()
            .map(|(s, r, w, d, n)| (s.as_str(), r.as_str(), w.as_str(), *d, n.as_str())),
        "q0",
        [HALT],
        blank,
    )
    .unwrap()
}

// =============================================================================
// Tape Properties
// =============================================================================

proptest! {
    /// A shift grows the tape by at most one blank and keeps the head on a cell.
    #[test]
    fn prop_shift_grows_by_at_most_one(
        cells in prop::collection::vec("[ab.]", 0..6),
        head_seed in any::<usize>(),
        direction in prop_oneof![Just(Direction::Left), Just(Direction::Right), Just(Direction::Stay)],
    ) {
        let head = head_seed % (cells.len() + 1);
        let mut tape = Tape::new(cells, head, ".").unwrap();
        let before = tape.cells().to_vec();
        let head_before = tape.head();

        tape.shift(direction);

        prop_assert!(tape.head() < tape.len());
        prop_assert!(tape.len() - before.len() <= 1);
        match direction {
            Direction::Left if head_before == 0 => {
                prop_assert_eq!(tape.head(), 0);
                prop_assert_eq!(tape.cells()[0].as_str(), ".");
                prop_assert_eq!(&tape.cells()[1..], &before[..]);
            }
            Direction::Left => prop_assert_eq!(tape.head(), head_before - 1),
            Direction::Right if head_before + 1 == before.len() => {
                prop_assert_eq!(tape.head(), before.len());
                prop_assert_eq!(tape.cells()[before.len()].as_str(), ".");
            }
            Direction::Right => prop_assert_eq!(tape.head(), head_before + 1),
            Direction::Stay => prop_assert_eq!(tape.cells(), &before[..]),
        }
    }
}

// =============================================================================
// Machine Properties
// =============================================================================

proptest! {
    /// Each performed step raises the count by one, and a halted machine stays put.
    #[test]
    fn prop_steps_are_monotonic((states, rows) in rows(3), tape in "[ab.]{0,4}") {
        let definition = build(states, &rows, &[".", "a", "b"], ".");
        let mut machine = TapeMachine::new(definition, TapeInput::cells(tape.chars().map(String::from), 0)).unwrap();

        for expected in 1..=20 {
            match machine.step().unwrap() {
                Step::Continue => prop_assert_eq!(machine.steps(), expected),
                Step::Halt => {
                    prop_assert_eq!(machine.steps(), expected);
                    let snapshot = machine.snapshot();
                    prop_assert_eq!(machine.step().unwrap(), Step::Halt);
                    prop_assert_eq!(machine.snapshot(), snapshot);
                    break;
                }
            }
        }
    }

    /// A binarized machine leaves the same tape as the machine it came from.
    #[test]
    fn prop_binarization_preserves_output(
        (states, rows) in rows(3),
        tape in "[ab.]{0,4}",
        head_seed in any::<usize>(),
    ) {
        let definition = build(states, &rows, &[".", "a", "b"], ".");
        let cells: Vec<String> = tape.chars().map(String::from).collect();
        let head = head_seed % (cells.len() + 1);
        let machine = TapeMachine::new(definition, TapeInput::cells(cells, head)).unwrap();

        let mut direct = machine.clone();
        match direct.run_with_budget(12) {
            Ok(_) => {}
            Err(MachineError::StepBudgetExhausted { .. }) => return Ok(()),
            Err(error) => return Err(TestCaseError::fail(error.to_string())),
        }

        let (mut binary, context) = binarize(&machine).unwrap();
        binary.run_with_budget(10_000).unwrap();

        prop_assert_eq!(context.bit_depth(), 2);
        prop_assert_eq!(
            context.decode_stripped(binary.tape().cells(), binary.head()).unwrap(),
            direct.stripped_tape()
        );
    }
}

// =============================================================================
// Tag System Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The tag system of a binary machine halts with the counters of the machine's tape.
    #[test]
    fn prop_tag_system_tracks_binary_machine((states, rows) in rows(2), tape in "[01]{0,3}") {
        let definition = build(states, &rows, &["0", "1"], "0");
        let machine = TapeMachine::new(definition, TapeInput::cells(tape.chars().map(String::from), 0)).unwrap();

        let mut direct = machine.clone();
        match direct.run_with_budget(8) {
            Ok(_) => {}
            Err(MachineError::StepBudgetExhausted { .. }) => return Ok(()),
            Err(error) => return Err(TestCaseError::fail(error.to_string())),
        }
        let expected = TapeCounts::from_tape(direct.tape().cells(), direct.head()).unwrap();

        let mut tag = encode_system(&machine).unwrap();
        tag.run().unwrap();

        prop_assert!(tag.is_halted());
        prop_assert_eq!(decode_counts(&tag.word()).unwrap(), expected);
    }
}

// =============================================================================
// Universal Machine Properties
// =============================================================================

/// Productions of one to three symbols for `a` and `b`, over `a`, `b` and the halt symbol.
fn tag_productions() -> impl Strategy<Value = TagProductionTable> {
    let production = prop::collection::vec(prop_oneof![Just("a"), Just("b"), Just("#")], 1..=3);
    (production.clone(), production).prop_map(|(a, b)| {
        TagProductionTable::from_rules([("a", &a[..]), ("b", &b[..])])
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// The universal machine leaves the same word as running the tag system directly.
    #[test]
    fn prop_universal_machine_tracks_tag_system(
        productions in tag_productions(),
        word in "[ab]{2,4}#",
    ) {
        let system = TagSystem::from_literal(productions, &word, DEFAULT_HALT_SYMBOL);

        let mut direct = system.clone();
        match direct.run_with_budget(6) {
            Ok(_) => {}
            Err(MachineError::StepBudgetExhausted { .. } | MachineError::StarvedWord { .. }) => {
                return Ok(())
            }
            Err(error) => return Err(TestCaseError::fail(error.to_string())),
        }

        let mut universal = UniversalMachine::from_tag_system(&system).unwrap();
        universal.run_with_budget(UNIVERSAL_BUDGET).unwrap();

        prop_assert!(universal.is_halted());
        prop_assert_eq!(universal.decode_tag_word().unwrap(), direct.word());
    }
}
