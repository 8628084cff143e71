use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::render::{inline_text, inner_text};
use super::{DocumentSource, Locator, Scope, SourceError, Tab};

/// Page-structure controls shared by every field lookup.
#[derive(Debug, Clone)]
pub struct Controls {
    pub tab_list: Locator,
    pub tab: Locator,
    pub panel_list: Locator,
    pub panel: Locator,
    pub next: Locator,
}

/// Raw page retrieval. The network lives behind this so tests can serve
/// fixtures from memory.
#[async_trait(?Send)]
pub trait Fetch {
    async fn fetch(&self, url: &Url) -> Result<String, SourceError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SourceError::Fetch {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, SourceError> {
        let fail = |reason: String| SourceError::Fetch {
            url: url.to_string(),
            reason,
        };
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {status}")));
        }
        response.text().await.map_err(|e| fail(e.to_string()))
    }
}

struct LoadedPage {
    url: Url,
    document: Html,
    active_panel: usize,
}

/// A static-HTML rendering session. Holds exactly one loaded document and one
/// active-panel slot; tab activation switches the slot in place.
pub struct Session<F> {
    fetcher: F,
    controls: Controls,
    page: Option<LoadedPage>,
}

impl<F: Fetch> Session<F> {
    pub fn new(fetcher: F, controls: Controls) -> Self {
        Session {
            fetcher,
            controls,
            page: None,
        }
    }

    fn page(&self) -> Result<&LoadedPage, SourceError> {
        self.page.as_ref().ok_or(SourceError::NoPage)
    }

    /// Direct children of the first panel list that match the panel control.
    fn panels<'a>(&self, page: &'a LoadedPage) -> Vec<ElementRef<'a>> {
        let Some(list) = page.document.select(self.controls.panel_list.selector()).next() else {
            return Vec::new();
        };
        list.children()
            .filter_map(ElementRef::wrap)
            .filter(|el| self.controls.panel.selector().matches(el))
            .collect()
    }

    /// Root for panel-scoped lookups. Pages without a panel list fall back to
    /// the whole document.
    fn scope_root<'a>(&self, page: &'a LoadedPage, scope: Scope) -> Result<ElementRef<'a>, SourceError> {
        match scope {
            Scope::Page => Ok(page.document.root_element()),
            Scope::Panel => {
                let panels = self.panels(page);
                if panels.is_empty() {
                    return Ok(page.document.root_element());
                }
                panels
                    .get(page.active_panel)
                    .copied()
                    .ok_or_else(|| SourceError::NotFound(format!("tab panel {}", page.active_panel + 1)))
            }
        }
    }

    fn first_match<'a>(root: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
        root.select(selector).next()
    }
}

#[async_trait(?Send)]
impl<F: Fetch> DocumentSource for Session<F> {
    async fn load(&mut self, url: &str) -> Result<(), SourceError> {
        let parsed = Url::parse(url).map_err(|e| SourceError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        debug!("Loading {}", parsed);
        let body = self.fetcher.fetch(&parsed).await?;
        self.page = Some(LoadedPage {
            url: parsed,
            document: Html::parse_document(&body),
            active_panel: 0,
        });
        Ok(())
    }

    fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(|p| p.url.as_str())
    }

    async fn text(&self, locator: &Locator) -> Result<String, SourceError> {
        let page = self.page()?;
        let root = self.scope_root(page, locator.scope)?;
        Self::first_match(root, locator.selector())
            .map(inner_text)
            .ok_or_else(|| SourceError::NotFound(format!("{} ({})", locator.name, locator.raw)))
    }

    async fn tabs(&self) -> Result<Vec<Tab>, SourceError> {
        let page = self.page()?;
        let Some(list) = page.document.select(self.controls.tab_list.selector()).next() else {
            return Ok(Vec::new());
        };
        Ok(list
            .select(self.controls.tab.selector())
            .enumerate()
            .map(|(index, el)| Tab {
                index,
                label: inline_text(el),
            })
            .collect())
    }

    async fn activate_tab(&mut self, index: usize) -> Result<(), SourceError> {
        let page = self.page()?;
        let count = self.panels(page).len();
        if index >= count.max(1) {
            return Err(SourceError::NotFound(format!("tab panel {}", index + 1)));
        }
        if let Some(page) = self.page.as_mut() {
            page.active_panel = index;
        }
        Ok(())
    }

    async fn click_next(&mut self) -> Result<(), SourceError> {
        let page = self.page()?;
        let next = &self.controls.next;
        let href = page
            .document
            .select(next.selector())
            .next()
            .and_then(|el| el.value().attr("href"))
            .ok_or_else(|| SourceError::NotFound(next.name.clone()))?;
        let target = page.url.join(href).map_err(|e| SourceError::Fetch {
            url: href.to_string(),
            reason: e.to_string(),
        })?;
        self.load(target.as_str()).await
    }
}
