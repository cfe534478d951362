//! Name-based lookup of rule definitions.

use super::{builtin, plugins, RuleDefinition, RuleTemplate, SqlTemplateEngine};
use crate::error::{Result, SentinelError};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A plugin registration function.
pub type RegistrationFn = fn() -> Vec<RuleDefinition>;

static GLOBAL_REGISTRY: Lazy<RuleRegistry> = Lazy::new(|| {
    let mut registry = RuleRegistry::builtin_only();
    for definition in plugins::bundled() {
        registry
            .plugins
            .insert(definition.key(), Arc::new(definition));
    }
    registry
});

/// Resolves rules by name from the built-in set, then the plugin set.
///
/// A registry is immutable once built, so a shared reference can be read from
/// any number of threads.
///
/// # Examples
///
/// ```rust
/// use sentinel_guard::rules::RuleRegistry;
///
/// let registry = RuleRegistry::global();
/// let rule = registry.resolve("NOT_NULL").unwrap();
/// assert_eq!(rule.name(), "not_null");
/// assert!(registry.resolve("no_such_rule").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    builtins: BTreeMap<String, Arc<RuleDefinition>>,
    plugins: BTreeMap<String, Arc<RuleDefinition>>,
}

impl RuleRegistry {
    /// Starts building a registry with the built-in rules.
    pub fn builder() -> RuleRegistryBuilder {
        RuleRegistryBuilder::default()
    }

    /// A registry with built-in rules and no plugins.
    pub fn builtin_only() -> Self {
        let builtins = builtin::definitions()
            .into_iter()
            .map(|definition| (definition.key(), definition))
            .collect();
        Self {
            builtins,
            plugins: BTreeMap::new(),
        }
    }

    /// The process-wide registry: built-ins plus the bundled plugins.
    pub fn global() -> &'static RuleRegistry {
        &GLOBAL_REGISTRY
    }

    /// Resolves `name` case-insensitively, built-ins first.
    pub fn resolve(&self, name: &str) -> Result<RuleTemplate> {
        let key = name.trim().to_lowercase();
        self.builtins
            .get(&key)
            .or_else(|| self.plugins.get(&key))
            .map(|definition| RuleTemplate::new(Arc::clone(definition)))
            .ok_or_else(|| SentinelError::RuleNotFound {
                name: name.to_string(),
            })
    }

    /// Returns true when `name` resolves.
    pub fn contains(&self, name: &str) -> bool {
        let key = name.trim().to_lowercase();
        self.builtins.contains_key(&key) || self.plugins.contains_key(&key)
    }

    /// Every rule, keyed by lower-case name.
    pub fn list(&self) -> BTreeMap<String, Arc<RuleDefinition>> {
        self.builtins
            .iter()
            .chain(self.plugins.iter())
            .map(|(key, definition)| (key.clone(), Arc::clone(definition)))
            .collect()
    }

    /// Number of plugin rules.
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin_only()
    }
}

/// A rule descriptor file holds one definition or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorFile {
    Many(Vec<RuleDefinition>),
    One(RuleDefinition),
}

/// Builder for [`RuleRegistry`].
///
/// Plugin sources are only read in [`build`](Self::build); any failure there
/// aborts construction.
#[derive(Debug, Default)]
pub struct RuleRegistryBuilder {
    registrations: Vec<RegistrationFn>,
    directories: Vec<PathBuf>,
    definitions: Vec<RuleDefinition>,
}

impl RuleRegistryBuilder {
    /// Adds a registration function.
    pub fn register(mut self, registration: RegistrationFn) -> Self {
        self.registrations.push(registration);
        self
    }

    /// Adds a directory of `*.json` rule descriptors.
    pub fn rule_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directories.push(path.into());
        self
    }

    /// Adds a single definition.
    pub fn definition(mut self, definition: RuleDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Loads every plugin source and builds the registry.
    pub fn build(self) -> Result<RuleRegistry> {
        let engine = SqlTemplateEngine::new();
        let mut registry = RuleRegistry::builtin_only();

        let mut discovered = Vec::new();
        for registration in &self.registrations {
            discovered.extend(registration());
        }
        for directory in &self.directories {
            discovered.extend(load_directory(directory)?);
        }
        discovered.extend(self.definitions);

        for definition in discovered {
            definition.validate(&engine)?;
            let key = definition.key();
            if registry.builtins.contains_key(&key) {
                return Err(SentinelError::invalid_rule(
                    &definition.name,
                    "name collides with a built-in rule",
                ));
            }
            if registry.plugins.contains_key(&key) {
                return Err(SentinelError::invalid_rule(
                    &definition.name,
                    "name registered by more than one plugin",
                ));
            }
            debug!(rule.name = %definition.name, "Registered plugin rule");
            registry.plugins.insert(key, Arc::new(definition));
        }

        info!(
            registry.builtins = registry.builtins.len(),
            registry.plugins = registry.plugins.len(),
            "Rule registry built"
        );
        Ok(registry)
    }
}

fn load_directory(directory: &Path) -> Result<Vec<RuleDefinition>> {
    if !directory.is_dir() {
        return Err(SentinelError::Configuration(format!(
            "Rule directory '{}' is not a readable directory",
            directory.display()
        )));
    }

    let directory_str = directory.to_str().ok_or_else(|| {
        SentinelError::Configuration(format!(
            "Rule directory path '{}' is not valid UTF-8",
            directory.display()
        ))
    })?;
    // Metacharacters in the directory name must match literally.
    let pattern = format!(
        "{}{}*.json",
        glob::Pattern::escape(directory_str.trim_end_matches(std::path::MAIN_SEPARATOR)),
        std::path::MAIN_SEPARATOR
    );

    let entries = glob::glob(&pattern)
        .map_err(|e| SentinelError::Configuration(format!("Invalid rule directory: {e}")))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path =
            entry.map_err(|e| SentinelError::Configuration(format!("Unreadable rule file: {e}")))?;
        paths.push(path);
    }
    paths.sort();

    let mut definitions = Vec::new();
    for path in paths {
        let content = std::fs::read_to_string(&path)?;
        let descriptor: DescriptorFile = serde_json::from_str(&content).map_err(|e| {
            SentinelError::Configuration(format!(
                "Failed to parse rule file '{}': {e}",
                path.display()
            ))
        })?;
        match descriptor {
            DescriptorFile::Many(many) => definitions.extend(many),
            DescriptorFile::One(one) => definitions.push(one),
        }
        debug!(rule.file = %path.display(), "Loaded rule descriptor");
    }
    Ok(definitions)
}
