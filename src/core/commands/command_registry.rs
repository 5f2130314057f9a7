// The command registry: the explicit, reloadable set of declared commands.
//
// Generic over the handler type so the core never sees Discord types. The
// Discord layer plugs in its own handler objects.

use super::command_models::{content_hash, CommandDefinition};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("command `{entry}` is missing required field `{field}`")]
    MissingField { entry: String, field: &'static str },

    #[error("command `{name}` from `{entry}` is already declared by `{first}`")]
    Duplicate {
        name: String,
        entry: String,
        first: String,
    },

    #[error("command `{entry}` is invalid: {reason}")]
    Invalid { entry: String, reason: String },
}

impl LoadError {
    /// The entry (file, module, or command name) the error refers to.
    pub fn entry(&self) -> &str {
        match self {
            LoadError::MissingField { entry, .. } => entry,
            LoadError::Duplicate { entry, .. } => entry,
            LoadError::Invalid { entry, .. } => entry,
        }
    }
}

// ============================================================================
// SOURCE TRAIT (PORT)
// ============================================================================

/// One item yielded by a definition source.
pub struct DeclaredCommand<H> {
    /// Where the definition came from, used in error messages.
    pub origin: String,
    pub definition: CommandDefinition,
    pub handler: H,
}

/// Anything that can enumerate declared commands.
///
/// Entries that could not even be read are returned as `Err` so the registry
/// can report them alongside its own validation failures.
pub trait CommandSource<H> {
    fn discover(&self) -> Vec<Result<DeclaredCommand<H>, LoadError>>;
}

/// Chains several sources; order is preserved, earlier sources win on duplicates.
impl<H> CommandSource<H> for Vec<Box<dyn CommandSource<H> + Send + Sync>> {
    fn discover(&self) -> Vec<Result<DeclaredCommand<H>, LoadError>> {
        self.iter().flat_map(|source| source.discover()).collect()
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// A declared command together with its content hash and handler.
#[derive(Debug)]
pub struct RegisteredCommand<H> {
    pub definition: CommandDefinition,
    pub content_hash: String,
    pub origin: String,
    pub handler: H,
}

#[derive(Debug)]
pub struct CommandRegistry<H> {
    commands: Vec<RegisteredCommand<H>>,
    index: HashMap<String, usize>,
}

impl<H> Default for CommandRegistry<H> {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<H> CommandRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registry contents with what `source` declares.
    ///
    /// Bad entries are skipped and returned; the rest still load. A name that
    /// was already declared earlier in the same load is rejected.
    pub fn load(&mut self, source: &impl CommandSource<H>) -> Vec<LoadError> {
        self.commands.clear();
        self.index.clear();

        let mut errors = Vec::new();
        for item in source.discover() {
            let declared = match item {
                Ok(declared) => declared,
                Err(err) => {
                    tracing::warn!(entry = err.entry(), "Skipping command: {}", err);
                    errors.push(err);
                    continue;
                }
            };

            if let Err(err) = self.insert(declared) {
                tracing::warn!(entry = err.entry(), "Skipping command: {}", err);
                errors.push(err);
            }
        }

        tracing::info!(
            loaded = self.commands.len(),
            rejected = errors.len(),
            "Command registry loaded"
        );
        errors
    }

    /// Convenience constructor: a fresh registry loaded from `source`.
    pub fn from_source(source: &impl CommandSource<H>) -> (Self, Vec<LoadError>) {
        let mut registry = Self::new();
        let errors = registry.load(source);
        (registry, errors)
    }

    fn insert(&mut self, declared: DeclaredCommand<H>) -> Result<(), LoadError> {
        let DeclaredCommand {
            origin,
            definition,
            handler,
        } = declared;

        if let Some(field) = definition.missing_field() {
            let entry = if definition.name.trim().is_empty() {
                origin
            } else {
                definition.name.clone()
            };
            return Err(LoadError::MissingField { entry, field });
        }

        definition
            .validate()
            .map_err(|reason| LoadError::Invalid {
                entry: definition.name.clone(),
                reason,
            })?;

        if let Some(&existing) = self.index.get(&definition.name) {
            return Err(LoadError::Duplicate {
                name: definition.name.clone(),
                entry: origin,
                first: self.commands[existing].origin.clone(),
            });
        }

        let content_hash = content_hash(&definition).map_err(|e| LoadError::Invalid {
            entry: definition.name.clone(),
            reason: e.to_string(),
        })?;

        self.index
            .insert(definition.name.clone(), self.commands.len());
        self.commands.push(RegisteredCommand {
            definition,
            content_hash,
            origin,
            handler,
        });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&RegisteredCommand<H>> {
        self.index.get(name).map(|&i| &self.commands[i])
    }

    /// Commands in declaration order.
    pub fn commands(&self) -> impl Iterator<Item = &RegisteredCommand<H>> {
        self.commands.iter()
    }

    #[cfg(test)]
    pub fn definitions(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.commands.iter().map(|c| &c.definition)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.definition.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
