pub mod db;
pub mod export;

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::record::Record;
use crate::settings::{SinkKind, SinkSettings};

pub use db::SqliteSink;
pub use export::CsvExport;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database write failed: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("export write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for completed records. Every record is handed over exactly
/// once, in ordinal order.
pub trait Sink {
    fn persist(&mut self, record: Record) -> Result<(), SinkError>;

    /// Called once after the last page. Not called when the run aborts.
    fn finish(&mut self) -> Result<(), SinkError>;

    /// Short human-readable target, e.g. `sqlite data/pokemon.sqlite`.
    fn describe(&self) -> String;
}

impl<T: Sink + ?Sized> Sink for Box<T> {
    fn persist(&mut self, record: Record) -> Result<(), SinkError> {
        (**self).persist(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Open the configured sink, creating parent directories as needed.
pub fn open(settings: &SinkSettings) -> Result<Box<dyn Sink>, SinkError> {
    let sink: Box<dyn Sink> = match settings.kind {
        SinkKind::Relational => {
            let path = &settings.relational.path;
            ensure_parent(path)?;
            Box::new(SqliteSink::open(path, settings.relational.mode)?)
        }
        SinkKind::Tabular => {
            let path = &settings.tabular.path;
            ensure_parent(path)?;
            Box::new(CsvExport::new(path))
        }
    };
    info!("Writing records to {}", sink.describe());
    Ok(sink)
}

pub fn ensure_parent(path: &Path) -> Result<(), SinkError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir).map_err(|source| SinkError::Io {
            path: dir.display().to_string(),
            source,
        }),
        _ => Ok(()),
    }
}
