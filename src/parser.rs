//! This module provides the parser for tab-separated machine definitions, utilizing the
//! `pest` crate. Each line reads `old_state old_symbol new_symbol head_dir new_state`.

use crate::{
    loader::LoaderOptions,
    machine::{MachineDefinition, TransitionTable},
    types::{Direction, MachineError, State, Symbol, Transition, INPUT_BLANK_SYMBOL},
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;

/// Derives a `PestParser` for the definition grammar in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct DefinitionParser;

/// A parsed line before it is folded into a transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedRule {
    state: State,
    read: Symbol,
    write: Symbol,
    direction: Direction,
    next_state: State,
}

/// Parses a definition into a validated `MachineDefinition`.
///
/// The source state of the first transition becomes the initial state, `_` is replaced
/// by the configured blank and the configured halting states are attached.
///
/// # Arguments
///
/// * `input` - The definition text.
/// * `options` - Blank symbol and halting states to apply.
///
/// # Returns
///
/// * `Ok(MachineDefinition)` if the input parses and passes analysis.
/// * `Err(MachineError::ParseError)` on syntax errors or duplicate `(state, symbol)` keys.
/// * `Err(MachineError::MalformedDefinition)` if the definition is empty or fails analysis.
pub fn parse(input: &str, options: &LoaderOptions) -> Result<MachineDefinition, MachineError> {
    let root = DefinitionParser::parse(Rule::definition, input)
        .map_err(|e| MachineError::ParseError(Box::new(e)))?
        .next()
        .ok_or_else(|| MachineError::MalformedDefinition("Empty parse tree".to_string()))?;

    let mut transitions = TransitionTable::new();
    let mut initial_state: Option<State> = None;

    for pair in root.into_inner() {
        if pair.as_rule() != Rule::transition {
            continue;
        }

        let span = pair.as_span();
        let rule = parse_transition(pair, options)?;

        // The first rule defines the initial state
        if initial_state.is_none() {
            initial_state = Some(rule.state.clone());
        }

        let key = (rule.state, rule.read);
        if transitions.contains_key(&key) {
            return Err(parse_error(
                &format!("Duplicate transition for state {} and symbol {}", key.0, key.1),
                span,
            ));
        }

        transitions.insert(key, Transition::new(rule.next_state, rule.write, rule.direction));
    }

    let initial_state = initial_state.ok_or_else(|| {
        MachineError::MalformedDefinition("Definition contains no transitions".to_string())
    })?;

    MachineDefinition::new(
        transitions,
        initial_state,
        options.halting_states.iter().cloned(),
        options.blank.clone(),
    )
}

/// Parses one `Rule::transition` line.
fn parse_transition(pair: Pair<Rule>, options: &LoaderOptions) -> Result<ParsedRule, MachineError> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();

    let state = next_str(&mut inner, span)?.to_string();
    let read = resolve_symbol(next_str(&mut inner, span)?, options);
    let write = resolve_symbol(next_str(&mut inner, span)?, options);
    let direction = parse_direction(next_pair(&mut inner, span)?)?;
    let next_state = next_str(&mut inner, span)?.to_string();

    Ok(ParsedRule {
        state,
        read,
        write,
        direction,
        next_state,
    })
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, span: Span<'i>) -> Result<Pair<'i, Rule>, MachineError> {
    pairs
        .next()
        .ok_or_else(|| parse_error("Transition has fewer than five fields", span))
}

fn next_str<'i>(pairs: &mut Pairs<'i, Rule>, span: Span<'i>) -> Result<&'i str, MachineError> {
    next_pair(pairs, span).map(|pair| pair.as_str())
}

/// Parses `L`, `R` or `-` into a `Direction`.
fn parse_direction(pair: Pair<Rule>) -> Result<Direction, MachineError> {
    Direction::from_code(pair.as_str()).ok_or_else(|| {
        parse_error(
            &format!("Unsupported direction: {}", pair.as_str()),
            pair.as_span(),
        )
    })
}

/// Rewrites the input blank `_` to the configured blank symbol.
fn resolve_symbol(symbol: &str, options: &LoaderOptions) -> Symbol {
    if symbol == INPUT_BLANK_SYMBOL {
        options.blank.clone()
    } else {
        symbol.to_string()
    }
}

/// Creates a `MachineError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> MachineError {
    MachineError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}
