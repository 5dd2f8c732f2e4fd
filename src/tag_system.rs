//! This module provides the two-tag rewriting system: a production table keyed by symbol and
//! a word that is rewritten by deleting its first two symbols and appending the production of
//! the first one.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::{debug, trace};

use crate::types::{MachineError, Step, Symbol};

/// The halt symbol used by words generated in this crate.
pub const DEFAULT_HALT_SYMBOL: &str = "#";

/// Maps a symbol to the ordered sequence of symbols appended when it leads the word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagProductionTable {
    rules: BTreeMap<Symbol, Vec<Symbol>>,
}

impl TagProductionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table from `(symbol, production)` pairs of string slices.
    pub fn from_rules<'a, R>(rules: R) -> Self
    where
        R: IntoIterator<Item = (&'a str, &'a [&'a str])>,
    {
        rules
            .into_iter()
            .map(|(symbol, production)| {
                (
                    symbol.to_string(),
                    production.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    }

    /// Adds or replaces a production, returning the previous one.
    pub fn insert(&mut self, symbol: impl Into<Symbol>, production: Vec<Symbol>) -> Option<Vec<Symbol>> {
        self.rules.insert(symbol.into(), production)
    }

    pub fn get(&self, symbol: &str) -> Option<&[Symbol]> {
        self.rules.get(symbol).map(Vec::as_slice)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.rules.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates over productions in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Vec<Symbol>)> {
        self.rules.iter()
    }

    /// Every symbol appearing as a key or inside a production.
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        self.rules
            .iter()
            .flat_map(|(symbol, production)| std::iter::once(symbol).chain(production))
            .cloned()
            .collect()
    }
}

impl FromIterator<(Symbol, Vec<Symbol>)> for TagProductionTable {
    fn from_iter<I: IntoIterator<Item = (Symbol, Vec<Symbol>)>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// A running two-tag system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSystem {
    productions: TagProductionTable,
    word: VecDeque<Symbol>,
    halt_symbol: Symbol,
    steps: usize,
}

impl TagSystem {
    /// Creates a tag system over `word`.
    ///
    /// # Arguments
    ///
    /// * `productions` - The production table.
    /// * `word` - The initial word.
    /// * `halt_symbol` - The symbol that stops the system when it leads the word.
    pub fn new<I, S>(productions: TagProductionTable, word: I, halt_symbol: impl Into<Symbol>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Self {
            productions,
            word: word.into_iter().map(Into::into).collect(),
            halt_symbol: halt_symbol.into(),
            steps: 0,
        }
    }

    /// Creates a tag system whose initial word has one symbol per character of `literal`.
    pub fn from_literal(productions: TagProductionTable, literal: &str, halt_symbol: impl Into<Symbol>) -> Self {
        Self::new(productions, literal.chars().map(String::from), halt_symbol)
    }

    /// Performs one rewrite.
    ///
    /// The production is looked up before anything is removed, so a failed step leaves the
    /// word untouched.
    ///
    /// # Returns
    ///
    /// * `Ok(Step::Halt)` if the halt symbol leads the word afterwards (or already did).
    /// * `Ok(Step::Continue)` otherwise.
    /// * `Err(MachineError::StarvedWord)` if fewer than two symbols are left.
    /// * `Err(MachineError::UnknownSymbol)` if the leading symbol has no production.
    pub fn step(&mut self) -> Result<Step, MachineError> {
        if self.is_halted() {
            return Ok(Step::Halt);
        }

        if self.word.len() < 2 {
            return Err(MachineError::StarvedWord {
                word: self.word(),
                steps: self.steps,
            });
        }

        let first = &self.word[0];
        let production = self
            .productions
            .get(first)
            .ok_or_else(|| MachineError::UnknownSymbol {
                symbol: first.clone(),
                steps: self.steps,
            })?
            .to_vec();

        trace!("step {}: {} -> {:?}", self.steps, first, production);

        self.word.drain(..2);
        self.word.extend(production);
        self.steps += 1;

        Ok(if self.is_halted() {
            Step::Halt
        } else {
            Step::Continue
        })
    }

    /// Rewrites until the halt symbol leads the word and returns the total step count.
    ///
    /// This loop is unbounded; use `run_with_budget` for systems that may not halt.
    pub fn run(&mut self) -> Result<usize, MachineError> {
        while self.step()? == Step::Continue {}

        debug!("Tag system halted after {} steps", self.steps);
        Ok(self.steps)
    }

    /// Rewrites for at most `budget` further steps.
    pub fn run_with_budget(&mut self, budget: usize) -> Result<usize, MachineError> {
        for _ in 0..budget {
            if self.step()? == Step::Halt {
                debug!("Tag system halted after {} steps", self.steps);
                return Ok(self.steps);
            }
        }

        if self.is_halted() {
            Ok(self.steps)
        } else {
            Err(MachineError::StepBudgetExhausted { budget })
        }
    }

    /// Replaces the word and resets the step count.
    pub fn set_word<I, S>(&mut self, word: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        self.word = word.into_iter().map(Into::into).collect();
        self.steps = 0;
    }

    /// True when the halt symbol leads the word.
    pub fn is_halted(&self) -> bool {
        self.word.front() == Some(&self.halt_symbol)
    }

    /// Returns a copy of the current word.
    pub fn word(&self) -> Vec<Symbol> {
        self.word.iter().cloned().collect()
    }

    pub fn word_len(&self) -> usize {
        self.word.len()
    }

    pub fn productions(&self) -> &TagProductionTable {
        &self.productions
    }

    pub fn halt_symbol(&self) -> &str {
        &self.halt_symbol
    }

    pub fn steps(&self) -> usize {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(cells: &[&str]) -> Vec<Symbol> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn cut_in_half() -> TagProductionTable {
        TagProductionTable::from_rules([("X", &["X"][..]), (":", &["i"][..])])
    }

    fn collatz() -> TagProductionTable {
        TagProductionTable::from_rules([
            ("a", &["b", "c"][..]),
            ("b", &["a"][..]),
            ("c", &["a", "a", "a"][..]),
        ])
    }

    fn run_literal(productions: TagProductionTable, literal: &str) -> Vec<Symbol> {
        let mut system = TagSystem::from_literal(productions, literal, DEFAULT_HALT_SYMBOL);
        system.run().unwrap();
        system.word()
    }

    #[test]
    fn test_cut_in_half() {
        assert_eq!(run_literal(cut_in_half(), "XXXXXXXX#"), symbols(&["#", "X", "X", "X", "X"]));
        assert_eq!(run_literal(cut_in_half(), "X:X:X:X:#"), symbols(&["#", "X", "X", "X", "X"]));
        assert_eq!(run_literal(cut_in_half(), "XX::XX::#"), symbols(&["#", "X", "i", "X", "i"]));
        assert_eq!(
            run_literal(cut_in_half(), "XX::XX::XX::#"),
            symbols(&["#", "X", "i", "X", "i", "X", "i"])
        );
    }

    #[test]
    fn test_step_counts() {
        let mut system = TagSystem::from_literal(cut_in_half(), "XXXX#", "#");

        assert_eq!(system.step().unwrap(), Step::Continue);
        assert_eq!(system.step().unwrap(), Step::Halt);
        assert_eq!(system.steps(), 2);

        // Halted systems do not rewrite further
        assert_eq!(system.step().unwrap(), Step::Halt);
        assert_eq!(system.steps(), 2);
        assert_eq!(system.word(), symbols(&["#", "X", "X"]));
    }

    #[test]
    fn test_collatz_starves() {
        let mut system = TagSystem::from_literal(collatz(), "aaa", "#");

        match system.run() {
            Err(MachineError::StarvedWord { word, steps }) => {
                assert_eq!(word, symbols(&["a"]));
                assert_eq!(steps, system.steps());
            }
            other => panic!("Expected StarvedWord, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_symbol_leaves_word_untouched() {
        let mut system = TagSystem::from_literal(cut_in_half(), "XQQX#", "#");

        assert_eq!(system.step().unwrap(), Step::Continue);
        let before = system.word();

        match system.step() {
            Err(MachineError::UnknownSymbol { symbol, steps }) => {
                assert_eq!(symbol, "Q");
                assert_eq!(steps, 1);
            }
            other => panic!("Expected UnknownSymbol, got {:?}", other),
        }
        assert_eq!(system.word(), before);
    }

    #[test]
    fn test_run_with_budget() {
        let looping = TagProductionTable::from_rules([("a", &["a", "a"][..])]);
        let mut system = TagSystem::new(looping, ["a", "a"], "#");

        assert_eq!(
            system.run_with_budget(100),
            Err(MachineError::StepBudgetExhausted { budget: 100 })
        );
        assert_eq!(system.steps(), 100);
    }

    #[test]
    fn test_manually_converted_machine() {
        let rules: [(&str, &[&str]); 48] = [
            ("A_q_init_0", &["C_q_init_0", "x"]),
            ("C_q_init_0", &["D_q_init_0_1", "D_q_init_0_0"]),
            ("D_q_init_0_0", &["x", "A_q0_0", "x"]),
            ("D_q_init_0_1", &["A_q0_1", "x"]),
            ("B_q_init_0", &["S_q_init_0"]),
            ("S_q_init_0", &["T_q_init_0_1", "T_q_init_0_0"]),
            ("T_q_init_0_0", &["B_q0_0", "x"]),
            ("T_q_init_0_1", &["B_q0_1", "x"]),
            ("A_q0_0", &["C_q0_0", "x", "c_q0_0", "x"]),
            ("A_q0_1", &["C_q0_1", "x", "c_q0_1", "x"]),
            ("C_q0_0", &["D_q0_0_1", "D_q0_0_0"]),
            ("C_q0_1", &["D_q0_1_1", "D_q0_1_0"]),
            ("c_q0_0", &["d_q0_0_1", "d_q0_0_0"]),
            ("c_q0_1", &["d_q0_1_1", "d_q0_1_0"]),
            ("D_q0_0_0", &["x", "#", "x"]),
            ("D_q0_0_1", &["#", "x"]),
            ("D_q0_1_0", &["x", "#", "x"]),
            ("D_q0_1_1", &["#", "x"]),
            ("d_q0_0_0", &["a_#", "x"]),
            ("d_q0_0_1", &["a_#", "x"]),
            ("d_q0_1_0", &["a_#", "x"]),
            ("d_q0_1_1", &["a_#", "x"]),
            ("B_q0_0", &["S_q0_0"]),
            ("B_q0_1", &["S_q0_1"]),
            ("S_q0_0", &["T_q0_0_1", "T_q0_0_0"]),
            ("S_q0_1", &["T_q0_1_1", "T_q0_1_0"]),
            ("T_q0_0_0", &["B_#", "x"]),
            ("T_q0_0_1", &["B_#", "x"]),
            ("T_q0_1_0", &["B_#", "x"]),
            ("T_q0_1_1", &["B_#", "x"]),
            ("a_q_init_0", &["c_q_init_0", "x", "c_q_init_0", "x"]),
            ("c_q_init_0", &["d_q_init_0_1", "d_q_init_0_0"]),
            ("d_q_init_0_0", &["a_q0_0", "x"]),
            ("d_q_init_0_1", &["a_q0_1", "x"]),
            ("a_q0_0", &["c_q0_0", "x", "c_q0_0", "x"]),
            ("a_q0_1", &["c_q0_1", "x", "c_q0_1", "x"]),
            ("b_q_init_0", &["s_q_init_0"]),
            ("s_q_init_0", &["t_q_init_0_1", "t_q_init_0_0"]),
            ("t_q_init_0_0", &["b_q0_0", "x"]),
            ("t_q_init_0_1", &["b_q0_1", "x"]),
            ("b_q0_0", &["s_q0_0"]),
            ("b_q0_1", &["s_q0_1"]),
            ("s_q0_0", &["t_q0_0_1", "t_q0_0_0"]),
            ("s_q0_1", &["t_q0_1_1", "t_q0_1_0"]),
            ("t_q0_0_0", &["b_#", "x"]),
            ("t_q0_0_1", &["b_#", "x"]),
            ("t_q0_1_0", &["b_#", "x"]),
            ("t_q0_1_1", &["b_#", "x"]),
        ];
        let productions = TagProductionTable::from_rules(rules);
        let mut system = TagSystem::new(productions, ["A_q_init_0", "x", "B_q_init_0", "x"], "#");

        system.run().unwrap();

        assert_eq!(system.word(), symbols(&["#", "x", "a_#", "x", "B_#", "x"]));
    }

    #[test]
    fn test_table_symbols() {
        let table = cut_in_half();

        assert_eq!(table.len(), 2);
        assert!(table.contains(":"));
        assert_eq!(table.get("X"), Some(&symbols(&["X"])[..]));
        assert_eq!(
            table.symbols().into_iter().collect::<Vec<_>>(),
            symbols(&[":", "X", "i"])
        );
    }
}
