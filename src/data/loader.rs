use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrow::array::Array;
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;

use super::error::{DataError, Result};
use super::fetch;
use super::model::{Dataset, Record};
use super::schema::{ColumnMap, TimestampPolicy};

// ---------------------------------------------------------------------------
// Sources and options
// ---------------------------------------------------------------------------

/// Where a discrete summary comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    /// Interpret user input: `http://` / `https://` are URLs, anything else a path.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::File(PathBuf::from(trimmed))
        }
    }

    /// Lower-cased extension of the path (URLs: ignoring query and fragment).
    fn extension(&self) -> String {
        let name = match self {
            DataSource::File(path) => path.to_string_lossy().into_owned(),
            // Ignore query string and fragment when sniffing the extension.
            DataSource::Url(url) => url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
    }

    /// Format implied by the extension, if it is one we read.
    fn format_hint(&self) -> Option<Format> {
        match self.extension().as_str() {
            "csv" => Some(Format::Csv),
            "parquet" | "pq" => Some(Format::Parquet),
            _ => None,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Parquet,
}

impl Format {
    /// Parquet files start with the `PAR1` magic; anything else is read as CSV.
    fn sniff(body: &[u8]) -> Self {
        if body.starts_with(b"PAR1") {
            Format::Parquet
        } else {
            Format::Csv
        }
    }
}

/// Knobs for a single load.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub timestamps: TimestampPolicy,
    pub http_timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timestamps: TimestampPolicy::default(),
            http_timeout: fetch::DEFAULT_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a discrete summary.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row followed by one bottle per row (recommended)
/// * `.parquet` – flat columns with the same names as the CSV header
///
/// URLs without a known extension (API endpoints) are sniffed from the body.
pub fn load(source: &DataSource, options: &LoadOptions) -> Result<Dataset> {
    let origin = source.to_string();

    let dataset = match source {
        DataSource::File(path) => {
            let format = source.format_hint().ok_or_else(|| {
                DataError::load(
                    &origin,
                    format!("unsupported file extension: .{}", source.extension()),
                )
            })?;
            let file = std::fs::File::open(path).map_err(|e| DataError::load(&origin, e))?;
            match format {
                Format::Csv => read_csv(file, &origin, options.timestamps)?,
                Format::Parquet => read_parquet(file, &origin, options.timestamps)?,
            }
        }
        DataSource::Url(url) => {
            let body = fetch::fetch_bytes(url, options.http_timeout)?;
            let format = source.format_hint().unwrap_or_else(|| {
                let sniffed = Format::sniff(&body);
                log::debug!("No extension in {url}, body looks like {sniffed:?}");
                sniffed
            });
            match format {
                Format::Csv => read_csv(body.as_ref(), &origin, options.timestamps)?,
                Format::Parquet => read_parquet(body, &origin, options.timestamps)?,
            }
        }
    };

    log::info!(
        "Loaded {} records from {} ({} columns)",
        dataset.len(),
        dataset.origin,
        dataset.columns.len()
    );
    log::debug!("Columns: {:?}", dataset.columns);
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// Parse CSV text: header row, then one bottle per row.  The header is
/// checked against the schema before any row is read.
pub fn read_csv<R: Read>(input: R, origin: &str, policy: TimestampPolicy) -> Result<Dataset> {
    let csv_err = |source| DataError::Csv {
        origin: origin.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let columns = ColumnMap::resolve(&headers, origin)?;

    let mut records = Vec::new();
    let mut coerced = 0usize;

    for (row_no, result) in reader.records().enumerate() {
        let row = result.map_err(csv_err)?;
        let built = columns.build(row_no, |i| row.get(i), policy)?;
        coerced += usize::from(built.coerced_timestamp);
        records.push(built.record);
    }

    warn_coerced(coerced, origin);
    Ok(Dataset::new(records, headers, origin))
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Read a flat Parquet table.  Every cell is rendered to text and goes
/// through the same conversion as CSV, so both formats agree on semantics.
pub fn read_parquet<T>(input: T, origin: &str, policy: TimestampPolicy) -> Result<Dataset>
where
    T: ChunkReader + 'static,
{
    let builder = ParquetRecordBatchReaderBuilder::try_new(input)
        .map_err(|e| DataError::load(origin, format!("reading parquet metadata: {e}")))?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let columns = ColumnMap::resolve(&headers, origin)?;

    let reader = builder
        .build()
        .map_err(|e| DataError::load(origin, format!("building parquet reader: {e}")))?;

    let mut records: Vec<Record> = Vec::new();
    let mut coerced = 0usize;

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| DataError::load(origin, format!("reading parquet record batch: {e}")))?;

        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| {
                    if col.is_null(row) {
                        return Ok(None);
                    }
                    array_value_to_string(col, row).map(Some)
                })
                .collect::<std::result::Result<Vec<Option<String>>, _>>()
                .map_err(|e| DataError::load(origin, format!("row {}: {e}", records.len())))?;

            let built = columns.build(
                records.len(),
                |i| cells.get(i).and_then(|c| c.as_deref()),
                policy,
            )?;
            coerced += usize::from(built.coerced_timestamp);
            records.push(built.record);
        }
    }

    warn_coerced(coerced, origin);
    Ok(Dataset::new(records, headers, origin))
}

fn warn_coerced(coerced: usize, origin: &str) {
    if coerced > 0 {
        log::warn!("{coerced} unparseable closure times in {origin} treated as missing");
    }
}
