//! This module provides the growable single tape used by every machine in the crate, along
//! with `TapeInput`, the tagged form a tape is supplied in before it is resolved into cells.

use std::fmt;

use crate::types::{Direction, MachineError, Symbol, HEAD_MARKER, INPUT_BLANK_SYMBOL};

/// The two ways a tape can be supplied. The variant is resolved once, when a `Tape` is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapeInput {
    /// A flat literal with one cell per character and a single `^` immediately left of the
    /// head cell, e.g. `"11^x1"`. `_` stands for the blank symbol.
    RawTapeLiteral(String),
    /// Explicit cells (multi-character symbols allowed) and a head index.
    StructuredDefinition { cells: Vec<Symbol>, head: usize },
}

impl TapeInput {
    /// Builds a structured input from any iterator of symbol-like values.
    pub fn cells<I, S>(cells: I, head: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        TapeInput::StructuredDefinition {
            cells: cells.into_iter().map(Into::into).collect(),
            head,
        }
    }

    /// Builds a structured input from cells containing exactly one `^` element.
    ///
    /// The marker is removed and the head is placed on the cell that followed it.
    pub fn from_marked_cells(cells: &[Symbol]) -> Result<Self, MachineError> {
        let head = single_marker_position(cells.iter().map(String::as_str))?;

        Ok(TapeInput::StructuredDefinition {
            cells: cells
                .iter()
                .filter(|cell| cell.as_str() != HEAD_MARKER)
                .cloned()
                .collect(),
            head,
        })
    }
}

impl From<&str> for TapeInput {
    fn from(literal: &str) -> Self {
        TapeInput::RawTapeLiteral(literal.to_string())
    }
}

/// Finds the index of the only head marker, failing on zero or several markers.
fn single_marker_position<'a>(cells: impl Iterator<Item = &'a str>) -> Result<usize, MachineError> {
    let markers: Vec<usize> = cells
        .enumerate()
        .filter(|(_, cell)| *cell == HEAD_MARKER)
        .map(|(i, _)| i)
        .collect();

    match markers.as_slice() {
        [position] => Ok(*position),
        _ => Err(MachineError::MalformedDefinition(format!(
            "Tape literal must contain exactly one '{}' marker, found {}",
            HEAD_MARKER,
            markers.len()
        ))),
    }
}

/// A single tape with a head. The head index is always a valid cell index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<Symbol>,
    head: usize,
    blank: Symbol,
}

impl Tape {
    /// Creates a tape from explicit cells.
    ///
    /// An empty cell list becomes a single blank cell, a head sitting exactly one past the
    /// end gains a blank cell, and `_` cells are rewritten to the blank symbol.
    ///
    /// # Returns
    ///
    /// * `Err(MachineError::MalformedDefinition)` if the head lies further outside the tape.
    pub fn new(cells: Vec<Symbol>, head: usize, blank: impl Into<Symbol>) -> Result<Self, MachineError> {
        let blank = blank.into();
        if head > cells.len() {
            return Err(MachineError::MalformedDefinition(format!(
                "Head position {} is outside a tape of {} cells",
                head,
                cells.len()
            )));
        }

        let mut cells: Vec<Symbol> = cells
            .into_iter()
            .map(|cell| {
                if cell == INPUT_BLANK_SYMBOL {
                    blank.clone()
                } else {
                    cell
                }
            })
            .collect();

        if head == cells.len() {
            cells.push(blank.clone());
        }

        Ok(Self { cells, head, blank })
    }

    /// Creates a tape holding a single blank cell.
    pub fn blank(blank: impl Into<Symbol>) -> Self {
        let blank = blank.into();
        Self {
            cells: vec![blank.clone()],
            head: 0,
            blank,
        }
    }

    /// Resolves a `TapeInput` into a tape.
    pub fn from_input(input: TapeInput, blank: impl Into<Symbol>) -> Result<Self, MachineError> {
        match input {
            TapeInput::RawTapeLiteral(literal) => {
                let chars: Vec<String> = literal.chars().map(String::from).collect();
                let head = single_marker_position(chars.iter().map(String::as_str))?;
                let cells = chars.into_iter().filter(|c| c != HEAD_MARKER).collect();
                Self::new(cells, head, blank)
            }
            TapeInput::StructuredDefinition { cells, head } => Self::new(cells, head, blank),
        }
    }

    /// Returns the symbol under the head.
    pub fn read(&self) -> &str {
        &self.cells[self.head]
    }

    /// Overwrites the symbol under the head.
    pub fn write(&mut self, symbol: impl Into<Symbol>) {
        self.cells[self.head] = symbol.into();
    }

    /// Moves the head one cell, growing the tape by one blank at whichever end was overrun.
    pub fn shift(&mut self, direction: Direction) {
        match direction {
            Direction::Left => {
                if self.head == 0 {
                    // Extend tape to the left
                    self.cells.insert(0, self.blank.clone());
                } else {
                    self.head -= 1;
                }
            }
            Direction::Right => {
                self.head += 1;
                if self.head >= self.cells.len() {
                    self.cells.push(self.blank.clone());
                }
            }
            Direction::Stay => {}
        }
    }

    pub fn cells(&self) -> &[Symbol] {
        &self.cells
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn blank_symbol(&self) -> &str {
        &self.blank
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// A tape always holds at least one cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the cells with leading and trailing blanks removed.
    pub fn stripped(&self) -> Vec<Symbol> {
        strip_blanks(&self.cells, &self.blank)
    }
}

impl fmt::Display for Tape {
    /// Renders the tape as a literal, with `^` in front of the head cell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            if i == self.head {
                f.write_str(HEAD_MARKER)?;
            }
            f.write_str(cell)?;
        }
        Ok(())
    }
}

/// Removes every occurrence of `blank` from both ends of `cells`.
pub fn strip_blanks(cells: &[Symbol], blank: &str) -> Vec<Symbol> {
    let start = cells.iter().position(|c| c != blank);
    let end = cells.iter().rposition(|c| c != blank);

    match (start, end) {
        (Some(start), Some(end)) => cells[start..=end].to_vec(),
        _ => Vec::new(),
    }
}
