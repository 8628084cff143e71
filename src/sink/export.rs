use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{Sink, SinkError};
use crate::record::{Record, COLUMNS};

/// Buffered tabular sink. Nothing touches the file until `finish`; an
/// aborted run leaves any previous export untouched. The buffer is drained
/// by `finish`, so the same sink can serve another run.
pub struct CsvExport {
    path: PathBuf,
    buffer: Vec<Record>,
}

impl CsvExport {
    pub fn new(path: &Path) -> Self {
        CsvExport {
            path: path.to_path_buf(),
            buffer: Vec::new(),
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Header row, then every buffered record ordered by ordinal.
    pub fn write_to<W: Write>(&self, out: W) -> Result<(), SinkError> {
        let mut rows: Vec<&Record> = self.buffer.iter().collect();
        rows.sort_by_key(|r| r.ordinal);

        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(out);
        wtr.write_record(COLUMNS)?;
        for r in rows {
            wtr.serialize(r)?;
        }
        wtr.flush().map_err(|source| SinkError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

impl Sink for CsvExport {
    fn persist(&mut self, record: Record) -> Result<(), SinkError> {
        self.buffer.push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let file = fs::File::create(&self.path).map_err(|source| SinkError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        self.write_to(file)?;
        info!("Exported {} records to {}", self.buffered(), self.path.display());
        self.buffer.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("csv {}", self.path.display())
    }
}
