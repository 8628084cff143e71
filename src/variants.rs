use std::vec;

use tracing::debug;

use crate::navigator::PageContext;
use crate::source::{DocumentSource, SourceError};

/// One step of variant iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Page without alternate forms: read the primary rendering as-is.
    Primary,
    /// Click tab `index`, then read; `label` is the tab's own text.
    Tab { index: usize, label: String },
}

/// A view over the page after one activation. Borrowed from the page, so it
/// cannot outlive the next activation.
pub struct VariantContext<'p, S> {
    page: &'p PageContext<S>,
    ordinal: u32,
    label: Option<String>,
}

impl<'p, S: DocumentSource> VariantContext<'p, S> {
    pub fn source(&self) -> &'p S {
        self.page.source()
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Remaining activations for one page. Consumed once; there is no rewind.
pub struct Variants<'p, S> {
    page: &'p mut PageContext<S>,
    plan: vec::IntoIter<Activation>,
    total: usize,
}

impl<'p, S: DocumentSource> Variants<'p, S> {
    /// Number of variants planned for the page, consumed or not.
    pub fn planned(&self) -> usize {
        self.total
    }

    /// Perform the next activation and hand back a view over the re-rendered
    /// page, stamped with `ordinal`.
    pub async fn next_variant(
        &mut self,
        ordinal: u32,
    ) -> Option<Result<VariantContext<'_, S>, SourceError>> {
        let step = self.plan.next()?;
        let label = match step {
            Activation::Primary => None,
            Activation::Tab { index, label } => {
                debug!("Activating tab {} ({}) on {}", index + 1, label, self.page.slug());
                if let Err(e) = self.page.source_mut().activate_tab(index).await {
                    return Some(Err(e));
                }
                Some(label)
            }
        };
        Some(Ok(VariantContext {
            page: &*self.page,
            ordinal,
            label,
        }))
    }
}

pub struct VariantEnumerator;

impl VariantEnumerator {
    /// Plan the variants of the current page: one primary rendering when the
    /// page has zero or one tab, otherwise one activation per tab in document
    /// order.
    pub async fn plan<S: DocumentSource>(page: &PageContext<S>) -> Result<Vec<Activation>, SourceError> {
        let tabs = page.source().tabs().await?;
        if tabs.len() <= 1 {
            return Ok(vec![Activation::Primary]);
        }
        Ok(tabs
            .into_iter()
            .map(|t| Activation::Tab {
                index: t.index,
                label: t.label.trim().to_string(),
            })
            .collect())
    }

    pub async fn enumerate<S: DocumentSource>(
        page: &mut PageContext<S>,
    ) -> Result<Variants<'_, S>, SourceError> {
        let plan = Self::plan(page).await?;
        Ok(Variants {
            total: plan.len(),
            plan: plan.into_iter(),
            page,
        })
    }
}
