//! CSV persistence for record snapshots.
//!
//! Both the raw and the filtered dataset use the same layout:
//!
//! ```text
//! Title,Description,Link
//! Budget passed,Lawmakers approve spending.,https://www.dawn.com/news/1
//! Live scores,,https://www.bbc.com/sport
//! ```
//!
//! An empty `Description` cell is the absent marker and reloads as `None`.
//!
//! Writes go to a temporary sibling file that is renamed over the target, so
//! a reader never observes a half-written snapshot.

use crate::errors::PipelineError;
use crate::models::Record;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Column names, in order.
pub const HEADER: [&str; 3] = ["Title", "Description", "Link"];

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
    move |source| PipelineError::DatasetIo {
        path: path.to_path_buf(),
        source,
    }
}

fn format_err(path: &Path) -> impl FnOnce(csv::Error) -> PipelineError + '_ {
    move |source| PipelineError::DatasetFormat {
        path: path.to_path_buf(),
        source,
    }
}

/// Serialize records to CSV bytes, header first.
pub fn to_csv_bytes(records: &[Record]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    // Written explicitly so an empty dataset still carries its header.
    writer.write_record(HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Parse CSV bytes produced by [`to_csv_bytes`].
pub fn from_csv_bytes(bytes: &[u8]) -> Result<Vec<Record>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    reader.deserialize::<Record>().collect()
}

/// Write `records` to `path`, replacing any existing file.
///
/// Parent directories are created when missing.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_records(path: &Path, records: &[Record]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err(parent))?;
    }

    let bytes = to_csv_bytes(records).map_err(format_err(path))?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, &bytes).await.map_err(io_err(&tmp_path))?;
    fs::rename(&tmp_path, path).await.map_err(io_err(path))?;

    info!("Wrote dataset");
    Ok(())
}

/// Load every record from the dataset at `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_records(path: &Path) -> Result<Vec<Record>, PipelineError> {
    let bytes = fs::read(path).await.map_err(io_err(path))?;
    let records = from_csv_bytes(&bytes).map_err(format_err(path))?;
    info!(count = records.len(), "Loaded dataset");
    Ok(records)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
