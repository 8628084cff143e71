//! Document source: the rendered-page capabilities the catalog walk relies on.
//!
//! The engine only needs to load a page, read trimmed text at a structural
//! location, list and activate tab controls, and follow the "next entity"
//! control. Anything that can do those (a static-HTML session, a browser
//! driver) plugs in through [`DocumentSource`].

pub mod render;
pub mod session;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use scraper::Selector;
use serde::Deserialize;
use thiserror::Error;

pub use session::{HttpFetcher, Session};

#[derive(Debug, Error)]
pub enum SourceError {
    /// Expected element or control is absent from the current rendering.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed to load {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("invalid selector for {name}: {reason}")]
    Selector { name: String, reason: String },
    #[error("no page loaded")]
    NoPage,
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }
}

/// Where a locator is evaluated: the whole page, or the active tab panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Page,
    #[default]
    Panel,
}

/// A compiled CSS locator for one field or control.
#[derive(Debug, Clone)]
pub struct Locator {
    pub name: String,
    pub raw: String,
    pub scope: Scope,
    selector: Selector,
}

impl Locator {
    pub fn parse(name: &str, raw: &str, scope: Scope) -> Result<Self, SourceError> {
        let selector = Selector::parse(raw).map_err(|e| SourceError::Selector {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Locator {
            name: name.to_string(),
            raw: raw.to_string(),
            scope,
            selector,
        })
    }

    pub fn page(name: &str, raw: &str) -> Result<Self, SourceError> {
        Self::parse(name, raw, Scope::Page)
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// One tab control, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub index: usize,
    pub label: String,
}

/// Rendered-document capabilities. Tab activation mutates the single current
/// rendering; every read after `activate_tab` sees the newly active panel.
#[async_trait(?Send)]
pub trait DocumentSource {
    /// Load `url` as the current page, resetting the active tab to the first.
    async fn load(&mut self, url: &str) -> Result<(), SourceError>;

    fn current_url(&self) -> Option<&str>;

    /// Trimmed text of the first element matching `locator`, one line per
    /// rendered line break.
    async fn text(&self, locator: &Locator) -> Result<String, SourceError>;

    /// Tabs in the first tab list; empty when the page has no tab list.
    async fn tabs(&self) -> Result<Vec<Tab>, SourceError>;

    async fn activate_tab(&mut self, index: usize) -> Result<(), SourceError>;

    /// Activate the "next entity" control. `NotFound` when the page has none.
    async fn click_next(&mut self) -> Result<(), SourceError>;
}
