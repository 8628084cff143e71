use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::parser::FieldLocators;
use crate::source::session::Controls;
use crate::source::{Locator, Scope, SourceError};

const DEFAULTS: &str = include_str!("../config/default.toml");

/// Optional settings file picked up from the working directory.
const LOCAL_FILE: &str = "pokedex";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub source: SourceSettings,
    pub sink: SinkSettings,
    pub locators: LocatorSettings,
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    pub base_url: String,
    pub entry_slug: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl SourceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// SQLite table, one committed row per record
    Relational,
    /// CSV file written once at the end of the run
    Tabular,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertMode {
    /// Plain insert; re-runs duplicate rows.
    #[default]
    Insert,
    /// Replace rows keyed by (catalog_index, variant_label).
    Upsert,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkSettings {
    pub kind: SinkKind,
    pub relational: RelationalSettings,
    pub tabular: TabularSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationalSettings {
    pub path: PathBuf,
    #[serde(default)]
    pub mode: InsertMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabularSettings {
    pub path: PathBuf,
}

/// Plain-text copy of the log, truncated at the start of every run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSettings {
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSettings {
    /// Stop after this many pages. Unlimited when unset.
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocatorSpec {
    pub selector: String,
    #[serde(default)]
    pub scope: Scope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlSettings {
    pub tab_list: String,
    pub tab: String,
    pub panel_list: String,
    pub panel: String,
    pub next: String,
}

/// Versioned field → selector map. Bump `version` when the page layout
/// changes and the selectors are rewritten.
#[derive(Debug, Clone, Deserialize)]
pub struct LocatorSettings {
    pub version: u32,
    pub controls: ControlSettings,
    pub fields: BTreeMap<String, LocatorSpec>,
}

impl Settings {
    /// Built-in settings only.
    #[cfg(test)]
    pub fn defaults() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Built-in settings, then `path` (or `./pokedex.toml` if present), then
    /// `POKEDEX_*` environment variables with `__` between nested keys.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let user_file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(LOCAL_FILE).required(false),
        };
        Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(user_file)
            .add_source(
                Environment::with_prefix("POKEDEX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl LocatorSettings {
    fn field(&self, name: &str) -> Result<Locator, SourceError> {
        let spec = self.fields.get(name).ok_or_else(|| SourceError::Selector {
            name: name.to_string(),
            reason: "no locator configured".to_string(),
        })?;
        Locator::parse(name, &spec.selector, spec.scope)
    }

    pub fn compile_fields(&self) -> Result<FieldLocators, SourceError> {
        Ok(FieldLocators {
            name: self.field("name")?,
            index: self.field("index")?,
            types: self.field("types")?,
            species: self.field("species")?,
            height: self.field("height")?,
            weight: self.field("weight")?,
            abilities: self.field("abilities")?,
            hp: self.field("hp")?,
            attack: self.field("attack")?,
            defence: self.field("defence")?,
            sp_attack: self.field("sp_attack")?,
            sp_defence: self.field("sp_defence")?,
            speed: self.field("speed")?,
            total: self.field("total")?,
            generation: self
                .fields
                .contains_key("generation")
                .then(|| self.field("generation"))
                .transpose()?,
        })
    }

    pub fn compile_controls(&self) -> Result<Controls, SourceError> {
        let c = &self.controls;
        Ok(Controls {
            tab_list: Locator::page("tab_list", &c.tab_list)?,
            tab: Locator::page("tab", &c.tab)?,
            panel_list: Locator::page("panel_list", &c.panel_list)?,
            panel: Locator::page("panel", &c.panel)?,
            next: Locator::page("next", &c.next)?,
        })
    }
}
