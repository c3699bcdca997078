use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::model::{Dataset, Record};
use super::schema::Field;

/// Write `dataset` as CSV: the known columns in schema order, flags as their
/// code or raw text, timestamps as RFC 3339, missing values as blank cells.
pub fn write_csv<W: Write>(dataset: &Dataset, out: W) -> Result<()> {
    let fields = Field::all();
    let mut writer = csv::Writer::from_writer(out);

    writer
        .write_record(fields.iter().map(|f| f.column()))
        .context("writing CSV header")?;

    for record in &dataset.records {
        let cells = fields.iter().map(|f| cell(record, *f).unwrap_or_default());
        writer
            .write_record(cells)
            .with_context(|| format!("writing CSV row {}", record.row))?;
    }

    writer.flush().context("flushing CSV output")?;
    Ok(())
}

/// Export to a file on disk.
pub fn export_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(dataset, file)?;
    log::info!("Exported {} records to {}", dataset.len(), path.display());
    Ok(())
}

fn cell(record: &Record, field: Field) -> Option<String> {
    match field {
        Field::ClosureTime => record.timestamp.map(|ts| ts.to_rfc3339()),
        Field::Depth => record.depth.map(|v| v.to_string()),
        Field::Latitude => record.latitude.map(|v| v.to_string()),
        Field::Longitude => record.longitude.map(|v| v.to_string()),
        Field::Category(c) => record.category(c).map(str::to_string),
        Field::Measurement(v) => record.measurement(v).map(|v| v.to_string()),
        Field::Flag(t) => record.flag(t).to_cell(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;
    use crate::data::model::{FlagValue, TrackedVariable, Variable};
    use crate::data::qc::{QcConfig, normalize_flags};
    use crate::data::schema::TimestampPolicy;

    const CSV: &str = "\
Cruise,CTD Bottle Closure Time [UTC],CTD Depth [m],Discrete Oxygen [mL/L],Discrete Oxygen Flag,Discrete Salinity [psu],Discrete Salinity Flag,Discrete Nitrate [uM],Discrete Nitrite [uM],Discrete Silicate [uM],Discrete Nutrients Flag
AR-1,2019-06-13T04:00:00Z,5,6.1,*0000000000000100,33.0,*1111111111111111,1,0.1,4,
";

    #[test]
    fn exported_flags_reload_as_normalized() {
        let loaded = read_csv(CSV.as_bytes(), "mem", TimestampPolicy::Strict).unwrap();
        let (normalized, _) = normalize_flags(loaded, &QcConfig::default());

        let mut buf = Vec::new();
        write_csv(&normalized, &mut buf).unwrap();

        let reloaded = read_csv(buf.as_slice(), "export", TimestampPolicy::Strict).unwrap();
        let record = &reloaded.records[0];
        assert_eq!(record.flag(TrackedVariable::Oxygen), &FlagValue::Code(1));
        assert_eq!(
            record.flag(TrackedVariable::Salinity),
            &FlagValue::Raw("*1111111111111111".to_string())
        );
        assert_eq!(record.flag(TrackedVariable::Nutrients), &FlagValue::Missing);
        assert_eq!(record.measurement(Variable::Oxygen), Some(6.1));
        assert_eq!(record.timestamp, normalized.records[0].timestamp);
        assert_eq!(record.cruise.as_deref(), Some("AR-1"));

        let (again, _) = normalize_flags(reloaded.clone(), &QcConfig::default());
        assert_eq!(again.records, reloaded.records);
    }

    #[test]
    fn export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accepted.csv");
        let loaded = read_csv(CSV.as_bytes(), "mem", TimestampPolicy::Strict).unwrap();
        export_csv(&loaded, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Cruise,Station,Target Asset,CTD Bottle Closure Time [UTC]"));
        assert_eq!(text.lines().count(), 2);
    }
}
