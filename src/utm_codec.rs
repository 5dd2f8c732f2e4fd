//! This module lays a two-tag system out on the tape of the universal machine, and reads the
//! resulting word back once the universal machine halts.
//!
//! Every symbol gets a unary code. The tape holds two boundary cells, one program block per
//! non-halt symbol (in reverse code order), the head position and finally the data region,
//! where each word symbol is written as its code in `1` cells followed by a `c` cell.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::tag_system::{TagProductionTable, TagSystem};
use crate::tag_encoder::SEPARATOR;
use crate::types::{MachineError, Symbol};

/// The blank of the universal machine.
pub const UTM_BLANK: &str = "1<";
/// The two cells marking the left end of the program region.
pub const LEFT_BOUNDARY: &str = "c1<";
/// One unit of a unary code.
pub const UNARY: &str = "1";
/// Separates program blocks and the codes inside them.
pub const BLOCK_SEPARATOR: &str = "b";
/// Ends a symbol in the data region.
pub const DATA_SEPARATOR: &str = "c";

/// The unary code of every symbol of an encoded tag system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolCodeTable {
    entries: Vec<(Symbol, usize)>,
    codes: BTreeMap<Symbol, usize>,
    halt_symbol: Symbol,
}

impl SymbolCodeTable {
    /// Assigns codes in `order`. Each code exceeds the previous one by the length of the
    /// previous symbol's production plus one, the first code is 1.
    fn assign(order: Vec<Symbol>, productions: &TagProductionTable, halt_symbol: &str) -> Self {
        let mut entries = Vec::with_capacity(order.len());
        let mut next = 1;
        for symbol in order {
            let width = if symbol == halt_symbol {
                0
            } else {
                productions.get(&symbol).map_or(0, <[Symbol]>::len)
            };
            entries.push((symbol, next));
            next += width + 1;
        }

        Self {
            codes: entries.iter().cloned().collect(),
            entries,
            halt_symbol: halt_symbol.to_string(),
        }
    }

    pub fn code(&self, symbol: &str) -> Option<usize> {
        self.codes.get(symbol).copied()
    }

    /// Looks a symbol up by its code.
    pub fn symbol(&self, code: usize) -> Option<&str> {
        // Codes grow with the order
        self.entries
            .binary_search_by_key(&code, |(_, code)| *code)
            .ok()
            .map(|index| self.entries[index].0.as_str())
    }

    /// Symbols in code order. The halt symbol is always last.
    pub fn symbols(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.entries.iter().map(|(symbol, _)| symbol.as_str())
    }

    pub fn halt_symbol(&self) -> &str {
        &self.halt_symbol
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(symbol, code)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries
            .iter()
            .map(|(symbol, code)| (symbol.as_str(), *code))
    }
}

/// A tag system written out for the universal machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtmEncoding {
    pub tape: Vec<Symbol>,
    pub head: usize,
    pub codes: SymbolCodeTable,
    /// The productions actually encoded, including synthesized identity productions.
    pub productions: TagProductionTable,
}

/// Encodes a tag system as a universal machine tape.
///
/// Every non-halt symbol without a production gets the identity production `s -> [s]`, so
/// the universal machine never looks up a missing block.
///
/// # Arguments
///
/// * `productions` - The production table of the tag system.
/// * `word` - The initial word.
/// * `halt_symbol` - The symbol that stops the tag system.
///
/// # Returns
///
/// * `Ok(UtmEncoding)` with the tape, head position and code table.
/// * `Err(MachineError::PreconditionViolation)` if a production is empty.
pub fn encode(
    productions: &TagProductionTable,
    word: &[Symbol],
    halt_symbol: &str,
) -> Result<UtmEncoding, MachineError> {
    let (productions, codes) = prepare(productions, word.iter(), halt_symbol)?;

    let mut tape: Vec<Symbol> = vec![LEFT_BOUNDARY.to_string(), LEFT_BOUNDARY.to_string()];
    for symbol in codes.symbols().rev() {
        if symbol == halt_symbol {
            continue;
        }
        tape.extend(program_block(&codes, productions.get(symbol).unwrap_or_default())?);
    }

    tape.push(BLOCK_SEPARATOR.to_string());
    let head = tape.len();
    tape.push(BLOCK_SEPARATOR.to_string());

    for symbol in word {
        let code = codes.code(symbol).ok_or_else(|| unknown_code(symbol))?;
        tape.extend(std::iter::repeat(UNARY.to_string()).take(code));
        tape.push(DATA_SEPARATOR.to_string());
    }

    debug!(
        "UTM encoding: {} symbols, {} productions, tape of {} cells, head at {}",
        codes.len(),
        productions.len(),
        tape.len(),
        head
    );

    Ok(UtmEncoding {
        tape,
        head,
        codes,
        productions,
    })
}

/// Computes the length `encode` would produce for a word with the given symbol counts,
/// without building the tape.
pub fn tape_len(
    productions: &TagProductionTable,
    word_counts: &BTreeMap<Symbol, u128>,
    halt_symbol: &str,
) -> Result<u128, MachineError> {
    let (productions, codes) = prepare(productions, word_counts.keys(), halt_symbol)?;

    // Boundary cells, then the two separators around the head
    let mut len: u128 = 4;
    for symbol in codes.symbols() {
        if symbol == halt_symbol {
            continue;
        }
        let production = productions.get(symbol).unwrap_or_default();
        len += 2 + 2 * (production.len() as u128).saturating_sub(1);
        for item in production {
            len += codes.code(item).ok_or_else(|| unknown_code(item))? as u128;
        }
    }

    for (symbol, count) in word_counts {
        let code = codes.code(symbol).ok_or_else(|| unknown_code(symbol))? as u128;
        len = len.saturating_add((code + 1).saturating_mul(*count));
    }

    Ok(len)
}

/// Completes the production table with identity productions and assigns the codes.
fn prepare<'a>(
    productions: &TagProductionTable,
    word_symbols: impl Iterator<Item = &'a Symbol>,
    halt_symbol: &str,
) -> Result<(TagProductionTable, SymbolCodeTable), MachineError> {
    let mut symbols: BTreeSet<Symbol> = productions.symbols();
    symbols.extend(word_symbols.cloned());
    symbols.remove(halt_symbol);

    let mut productions = productions.clone();
    for symbol in &symbols {
        match productions.get(symbol) {
            Some([]) => {
                return Err(MachineError::PreconditionViolation(format!(
                    "Production of {:?} is empty",
                    symbol
                )))
            }
            Some(_) => {}
            None => {
                warn!("Symbol {:?} has no production, using the identity production", symbol);
                productions.insert(symbol.clone(), vec![symbol.clone()]);
            }
        }
    }

    // The separator is the most frequent symbol and gets the shortest code
    let separator = symbols.take(SEPARATOR);
    let order: Vec<Symbol> = separator
        .into_iter()
        .chain(symbols)
        .chain(std::iter::once(halt_symbol.to_string()))
        .collect();

    let codes = SymbolCodeTable::assign(order, &productions, halt_symbol);
    Ok((productions, codes))
}

/// Encodes the current word of `system`.
pub fn encode_system(system: &TagSystem) -> Result<UtmEncoding, MachineError> {
    encode(system.productions(), &system.word(), system.halt_symbol())
}

/// Writes one program block: two separators, then the production's codes last symbol first,
/// joined by a unit and a separator.
fn program_block(codes: &SymbolCodeTable, production: &[Symbol]) -> Result<Vec<Symbol>, MachineError> {
    let mut block = vec![BLOCK_SEPARATOR.to_string(), BLOCK_SEPARATOR.to_string()];
    for (i, symbol) in production.iter().rev().enumerate() {
        if i > 0 {
            block.push(UNARY.to_string());
            block.push(BLOCK_SEPARATOR.to_string());
        }
        let code = codes.code(symbol).ok_or_else(|| unknown_code(symbol))?;
        block.extend(std::iter::repeat(UNARY.to_string()).take(code));
    }
    Ok(block)
}

fn unknown_code(symbol: &str) -> MachineError {
    MachineError::DecodeConsistency(format!("Symbol {:?} has no code", symbol))
}

/// Reads the word left on a halted universal machine tape.
///
/// Runs of unmarked `1` cells closed by a `c` cell are mapped back through the code table.
/// The halt symbol is prepended, since the universal machine only halts after reading it.
///
/// # Returns
///
/// * `Err(MachineError::DecodeConsistency)` if a run has no matching code or is never closed.
pub fn decode(tape: &[Symbol], codes: &SymbolCodeTable) -> Result<Vec<Symbol>, MachineError> {
    let mut word = vec![codes.halt_symbol().to_string()];
    let mut run = 0;

    for cell in tape {
        if cell == UNARY {
            run += 1;
        } else if cell == DATA_SEPARATOR && run > 0 {
            let symbol = codes.symbol(run).ok_or_else(|| {
                MachineError::DecodeConsistency(format!("Unary run of {} matches no symbol", run))
            })?;
            word.push(symbol.to_string());
            run = 0;
        }
    }

    if run > 0 {
        return Err(MachineError::DecodeConsistency(format!(
            "Unary run of {} is not closed by a separator",
            run
        )));
    }

    Ok(word)
}
