//! This module provides the `DefinitionLoader` struct, responsible for loading machine
//! definitions from files, strings and directories, and the `LoaderOptions` applied while
//! doing so.

use crate::analyzer::unreachable_states;
use crate::machine::MachineDefinition;
use crate::parser::parse;
use crate::types::{
    MachineError, State, Symbol, DEFAULT_HALT_STATE, INPUT_BLANK_SYMBOL, MAX_DEFINITION_SIZE,
};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// The file extension scanned for by `DefinitionLoader::load_definitions`.
pub const DEFINITION_EXTENSION: &str = "tm";

/// Settings applied to every definition a loader reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// The blank symbol. `_` in a definition is rewritten to it.
    pub blank: Symbol,
    /// States that halt the machine when entered.
    pub halting_states: Vec<State>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            blank: INPUT_BLANK_SYMBOL.to_string(),
            halting_states: vec![DEFAULT_HALT_STATE.to_string()],
        }
    }
}

/// `DefinitionLoader` is a utility struct for loading machine definitions.
/// It provides methods to load definitions from individual files, from string content,
/// and to discover and load all `.tm` files within a specified directory.
pub struct DefinitionLoader;

impl DefinitionLoader {
    /// Loads a single definition from the specified file path.
    ///
    /// # Arguments
    ///
    /// * `path` - A reference to the `Path` of the file to load.
    /// * `options` - Blank symbol and halting states to apply.
    ///
    /// # Returns
    ///
    /// * `Ok(MachineDefinition)` if the file is successfully read and parsed.
    /// * `Err(MachineError::FileError)` if the file cannot be read or is too large.
    /// * `Err(MachineError::ParseError)` if the file content is not a valid definition.
    pub fn load_definition(
        path: &Path,
        options: &LoaderOptions,
    ) -> Result<MachineDefinition, MachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            MachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        if content.len() > MAX_DEFINITION_SIZE {
            return Err(MachineError::FileError(format!(
                "File {} exceeds the maximum definition size of {} bytes",
                path.display(),
                MAX_DEFINITION_SIZE
            )));
        }

        debug!("Loading definition from {}", path.display());
        Self::load_definition_from_string(&content, options)
    }

    /// Loads a single definition from the provided string content.
    ///
    /// Unreachable states are reported through the `log` facade but do not fail the load.
    pub fn load_definition_from_string(
        content: &str,
        options: &LoaderOptions,
    ) -> Result<MachineDefinition, MachineError> {
        let definition = parse(content, options)?;

        let unreachable = unreachable_states(&definition);
        if !unreachable.is_empty() {
            warn!("Definition has unreachable states: {:?}", unreachable);
        }

        Ok(definition)
    }

    /// Loads all definition files (`.tm` extension) from a given directory.
    ///
    /// Directories and files with other extensions are skipped. The results are sorted by
    /// path so the order does not depend on the file system.
    ///
    /// # Returns
    ///
    /// * `Vec<Result<(PathBuf, MachineDefinition), MachineError>>` - one entry per candidate
    ///   file, or a single error if the directory itself cannot be read.
    pub fn load_definitions(
        directory: &Path,
        options: &LoaderOptions,
    ) -> Vec<Result<(PathBuf, MachineDefinition), MachineError>> {
        if !directory.exists() {
            return vec![Err(MachineError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(MachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut paths = Vec::new();
        let mut errors: Vec<Result<(PathBuf, MachineDefinition), MachineError>> = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file()
                        && path.extension().is_some_and(|ext| ext == DEFINITION_EXTENSION)
                    {
                        paths.push(path);
                    }
                }
                Err(e) => errors.push(Err(MachineError::FileError(format!(
                    "Failed to read directory entry: {}",
                    e
                )))),
            }
        }
        paths.sort();

        paths
            .into_iter()
            .map(|path| match Self::load_definition(&path, options) {
                Ok(definition) => Ok((path, definition)),
                Err(e) => Err(MachineError::FileError(format!(
                    "Failed to load definition from {}: {}",
                    path.display(),
                    e
                ))),
            })
            .chain(errors)
            .collect()
    }
}
