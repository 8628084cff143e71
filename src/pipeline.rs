use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::navigator::{Advance, Navigator, PageContext};
use crate::parser::{ExtractError, FieldExtractor};
use crate::sink::{Sink, SinkError};
use crate::source::{DocumentSource, SourceError};
use crate::variants::VariantEnumerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    PageLoaded,
    VariantsExtracted,
    Advancing,
    Done,
    Aborted,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("navigation failed: {0}")]
    Navigation(#[from] SourceError),
    #[error("extraction failed on {page}: {source}")]
    Extract {
        page: String,
        #[source]
        source: ExtractError,
    },
    #[error("persistence failed: {0}")]
    Persistence(#[from] SinkError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub pages: usize,
    pub records: usize,
    pub recovered_fields: usize,
    pub elapsed: Duration,
}

/// Drives one full catalog walk: open, enumerate and extract each page's
/// variants, persist each record, advance until the last page.
pub struct Pipeline<K> {
    navigator: Navigator,
    extractor: FieldExtractor,
    sink: K,
    progress: ProgressBar,
    state: State,
    ordinal: u32,
    #[cfg(test)]
    transitions: Vec<State>,
}

impl<K: Sink> Pipeline<K> {
    pub fn new(navigator: Navigator, extractor: FieldExtractor, sink: K) -> Self {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} records {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Pipeline {
            navigator,
            extractor,
            sink,
            progress,
            state: State::Init,
            ordinal: 0,
            #[cfg(test)]
            transitions: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> State {
        self.state
    }

    #[cfg(test)]
    pub fn sink(&self) -> &K {
        &self.sink
    }

    fn enter(&mut self, next: State) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
        #[cfg(test)]
        self.transitions.push(next);
    }

    pub async fn run<S: DocumentSource>(&mut self, source: S) -> Result<RunSummary, PipelineError> {
        let t0 = Instant::now();
        #[cfg(test)]
        self.transitions.clear();
        self.enter(State::Init);
        self.ordinal = 0;
        self.progress.enable_steady_tick(Duration::from_millis(120));

        let mut summary = RunSummary::default();
        match self.walk(source, &mut summary).await {
            Ok(()) => {
                self.enter(State::Done);
                summary.elapsed = t0.elapsed();
                self.progress.finish_and_clear();
                info!(
                    "Run complete: {} pages, {} records, {} recovered fields",
                    summary.pages, summary.records, summary.recovered_fields
                );
                Ok(summary)
            }
            Err(e) => {
                self.enter(State::Aborted);
                self.progress.abandon();
                error!(
                    "Run aborted after {} pages and {} records: {}",
                    summary.pages, summary.records, e
                );
                Err(e)
            }
        }
    }

    async fn walk<S: DocumentSource>(
        &mut self,
        source: S,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let mut page = self.navigator.open(source).await?;
        loop {
            self.enter(State::PageLoaded);
            summary.pages += 1;
            debug!("Page {} loaded: {}", page.page_number(), page.url());
            self.extract_page(&mut page, summary).await?;
            self.enter(State::VariantsExtracted);

            self.enter(State::Advancing);
            match self.navigator.advance(page).await? {
                Advance::Page(next) => page = next,
                Advance::Terminal => break,
            }
        }
        self.sink.finish()?;
        Ok(())
    }

    async fn extract_page<S: DocumentSource>(
        &mut self,
        page: &mut PageContext<S>,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let slug = page.slug().to_string();
        let mut variants = VariantEnumerator::enumerate(page).await?;
        debug!("{}: {} variant(s)", slug, variants.planned());
        while let Some(variant) = variants.next_variant(self.ordinal).await {
            let variant = variant?;
            let extraction = self
                .extractor
                .extract(&variant)
                .await
                .map_err(|source| PipelineError::Extract {
                    page: slug.clone(),
                    source,
                })?;

            let record = extraction.record;
            if !record.total_matches() {
                warn!(
                    "{:04} {}: printed total {} differs from stat sum {}",
                    record.catalog_index,
                    record.display_form(),
                    record.total,
                    record.stat_sum()
                );
            }
            self.progress.set_message(record.display_form().to_string());
            self.sink.persist(record)?;

            summary.records += 1;
            summary.recovered_fields += extraction.recovered.len();
            self.ordinal += 1;
            self.progress.inc(1);
        }
        Ok(())
    }
}
