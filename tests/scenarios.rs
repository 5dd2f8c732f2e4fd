use std::fs;

use tempfile::tempdir;
use tur_chain::tag_encoder::{decode_counts, encode_system};
use tur_chain::{
    binarize, plan, verify, DefinitionLoader, LoaderOptions, MachineError, PipelineOptions, Symbol,
    TagProductionTable, TagSystem, TapeCounts, TapeInput, TapeMachine, UniversalMachine,
    DEFAULT_HALT_SYMBOL,
};

const UNARY_ADDER: &str = "\
# Adds two unary numbers separated by x
q0\t1\t1\tR\tq0
q0\tx\tx\tR\tq1
q1\t_\t_\tL\t-
q1\t1\tx\tL\tq2
q2\tx\t1\tR\tq0
";

const WRITE_ONE: &str = "q0\t0\t1\tR\t-\nq0\t1\t1\tR\t-\n";

const WRITE_ONE_TWO: &str = "\
q0\t0\t1\tR\tq1
q0\t1\t1\tR\tq1
q1\t0\t2\tR\t-
q1\t1\t2\tR\t-
";

fn symbols(cells: &[&str]) -> Vec<Symbol> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn binary_options() -> LoaderOptions {
    LoaderOptions {
        blank: "0".to_string(),
        ..LoaderOptions::default()
    }
}

#[test]
fn test_unary_adder_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("adder.tm");
    fs::write(&path, UNARY_ADDER).unwrap();

    let definition = DefinitionLoader::load_definition(&path, &LoaderOptions::default()).unwrap();
    let machine = TapeMachine::new(definition, "^11x1".into()).unwrap();

    let report = verify(&machine, &PipelineOptions::default()).unwrap();

    assert!(report.is_consistent());
    assert_eq!(report.original, symbols(&["1", "1", "1", "x"]));
    assert_eq!(report.steps.machine, 7);
}

#[test]
fn test_directory_of_definitions() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("adder.tm"), UNARY_ADDER).unwrap();
    fs::write(dir.path().join("write_one.tm"), WRITE_ONE).unwrap();
    fs::write(dir.path().join("broken.tm"), "q0\t1\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a definition").unwrap();

    let results = DefinitionLoader::load_definitions(dir.path(), &LoaderOptions::default());

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(MachineError::FileError(_))));
    assert!(matches!(&results[2], Ok((path, _)) if path.ends_with("write_one.tm")));
}

#[test]
fn test_write_one_on_any_tape() {
    let definition =
        DefinitionLoader::load_definition_from_string(WRITE_ONE, &binary_options()).unwrap();

    for (tape, stripped, expected) in [
        ("^011", &["1", "1", "1"][..], TapeCounts { left: 1, right: 1 }),
        ("^0", &["1"][..], TapeCounts { left: 1, right: 0 }),
        ("^", &["1"][..], TapeCounts { left: 1, right: 0 }),
    ] {
        let machine = TapeMachine::new(definition.clone(), tape.into()).unwrap();

        let report = verify(&machine, &PipelineOptions::default()).unwrap();

        assert!(report.is_consistent(), "tape {}", tape);
        assert_eq!(report.original, symbols(stripped), "tape {}", tape);
        assert_eq!(report.tag_counts, expected, "tape {}", tape);
    }
}

#[test]
fn test_cut_in_half_through_universal_machine() {
    let productions = TagProductionTable::from_rules([("X", &["X"][..]), (":", &["i"][..])]);
    let system = TagSystem::from_literal(productions, "XXXX#", DEFAULT_HALT_SYMBOL);

    let mut direct = system.clone();
    direct.run().unwrap();

    let mut universal = UniversalMachine::from_tag_system(&system).unwrap();
    universal.run().unwrap();

    assert_eq!(direct.word(), symbols(&["#", "X", "X"]));
    assert_eq!(universal.decode_tag_word().unwrap(), direct.word());
}

#[test]
fn test_plan_before_running() {
    let definition =
        DefinitionLoader::load_definition_from_string(UNARY_ADDER, &LoaderOptions::default())
            .unwrap();
    let machine = TapeMachine::new(definition, "^1x1".into()).unwrap();

    let estimate = plan(&machine).unwrap();
    let system = encode_system(&binarize(&machine).unwrap().0).unwrap();

    assert_eq!(estimate.tag_productions, system.productions().len());
    assert_eq!(estimate.tag_word_len, system.word_len() as u128);
    assert!(estimate.utm_tape_len > estimate.tag_word_len);
}

#[test]
fn test_structured_tape_with_multi_character_symbols() {
    let definition = DefinitionLoader::load_definition_from_string(
        "start\tone\tone\tR\tstart\n\
         start\tplus\tone\tR\tend\n\
         end\tone\tone\tR\tend\n\
         end\tblank\tblank\tL\terase\n\
         erase\tone\tblank\tL\t-\n",
        &LoaderOptions {
            blank: "blank".to_string(),
            ..LoaderOptions::default()
        },
    )
    .unwrap();
    let machine = TapeMachine::new(
        definition,
        TapeInput::cells(["one", "plus", "one", "one"], 0),
    )
    .unwrap();

    let report = verify(&machine, &PipelineOptions::default()).unwrap();

    assert!(report.is_consistent());
    assert_eq!(report.original, symbols(&["one", "one", "one"]));
    assert_eq!(report.steps.machine, 6);
}

#[test]
fn test_tag_word_of_halted_binary_machine() {
    let definition =
        DefinitionLoader::load_definition_from_string(WRITE_ONE, &binary_options()).unwrap();
    let machine = TapeMachine::new(definition, "^1".into()).unwrap();

    let mut system = encode_system(&machine).unwrap();
    system.run().unwrap();

    assert_eq!(decode_counts(&system.word()).unwrap(), TapeCounts { left: 1, right: 0 });
}

#[test]
fn test_write_one_two_decodes_to_original_symbols() {
    let definition =
        DefinitionLoader::load_definition_from_string(WRITE_ONE_TWO, &binary_options()).unwrap();
    let machine = TapeMachine::new(definition, "^0".into()).unwrap();

    let report = verify(&machine, &PipelineOptions::default()).unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.original, symbols(&["1", "2"]));
    assert_eq!(report.tag_decoded, symbols(&["1", "2"]));

    let (binary, context) = binarize(&machine).unwrap();
    let mut system = encode_system(&binary).unwrap();
    system.run().unwrap();
    let counts = decode_counts(&system.word()).unwrap();

    assert_eq!(counts, report.tag_counts);
    assert_eq!(counts.decode_original(&context).unwrap(), symbols(&["1", "2"]));
}
