use tracing::{debug, info};

use crate::source::{DocumentSource, SourceError};

/// The currently loaded catalog page. Owns the document session; downstream
/// stages only ever borrow it for the length of one call.
pub struct PageContext<S> {
    source: S,
    url: String,
    slug: String,
    page_number: usize,
}

impl<S: DocumentSource> PageContext<S> {
    fn new(source: S, page_number: usize) -> Self {
        let url = source.current_url().unwrap_or_default().to_string();
        let slug = slug_from_url(&url).to_string();
        PageContext {
            source,
            url,
            slug,
            page_number,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// 1-based position of this page in the walk.
    pub fn page_number(&self) -> usize {
        self.page_number
    }
}

pub enum Advance<S> {
    Page(PageContext<S>),
    /// No "next" control on the last page, or the page limit was reached.
    Terminal,
}

/// Walks the catalog one entity page at a time.
pub struct Navigator {
    entry_url: String,
    max_pages: Option<usize>,
}

impl Navigator {
    pub fn new(entry_url: &str, max_pages: Option<usize>) -> Self {
        Navigator {
            entry_url: entry_url.to_string(),
            max_pages,
        }
    }

    /// Build the entry URL from a catalog base and the first entity's slug.
    pub fn from_slug(base_url: &str, slug: &str, max_pages: Option<usize>) -> Self {
        let base = base_url.trim_end_matches('/');
        Self::new(&format!("{}/{}", base, slug), max_pages)
    }

    pub fn entry_url(&self) -> &str {
        &self.entry_url
    }

    pub async fn open<S: DocumentSource>(&self, mut source: S) -> Result<PageContext<S>, SourceError> {
        info!("Opening catalog at {}", self.entry_url);
        source.load(&self.entry_url).await?;
        Ok(PageContext::new(source, 1))
    }

    /// Follow the "next" control. Its absence ends the walk; any other
    /// failure is returned as-is.
    pub async fn advance<S: DocumentSource>(
        &self,
        mut page: PageContext<S>,
    ) -> Result<Advance<S>, SourceError> {
        if self.max_pages.is_some_and(|max| page.page_number >= max) {
            info!("Page limit reached after {}", page.slug);
            return Ok(Advance::Terminal);
        }
        match page.source.click_next().await {
            Ok(()) => {
                let next = PageContext::new(page.source, page.page_number + 1);
                debug!("Advanced to {}", next.url);
                Ok(Advance::Page(next))
            }
            Err(e) if e.is_not_found() => {
                info!("No next entry after {}; catalog exhausted", page.slug);
                Ok(Advance::Terminal)
            }
            Err(e) => Err(e),
        }
    }
}

fn slug_from_url(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}
