use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{DataError, Result};
use super::model::{Category, FlagValue, Record, TrackedVariable, Variable};

/// Fill value used by the discrete summaries for "no data".
pub const FILL_VALUE: f64 = -9_999_999.0;

pub const CLOSURE_TIME: &str = "CTD Bottle Closure Time [UTC]";
pub const DEPTH: &str = "CTD Depth [m]";
pub const LATITUDE: &str = "CTD Latitude [deg]";
pub const LONGITUDE: &str = "CTD Longitude [deg]";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

// ---------------------------------------------------------------------------
// Field table
// ---------------------------------------------------------------------------

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Timestamp,
    Numeric,
    Flag,
    Text,
}

/// A column the loader knows how to place into a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ClosureTime,
    Depth,
    Latitude,
    Longitude,
    Category(Category),
    Measurement(Variable),
    Flag(TrackedVariable),
}

impl Field {
    /// Every known field, in export order.
    pub fn all() -> Vec<Field> {
        let mut fields: Vec<Field> = Category::ALL.into_iter().map(Field::Category).collect();
        fields.extend([
            Field::ClosureTime,
            Field::Depth,
            Field::Latitude,
            Field::Longitude,
        ]);
        for variable in Variable::ALL {
            fields.push(Field::Measurement(variable));
        }
        fields.extend(TrackedVariable::ALL.into_iter().map(Field::Flag));
        fields
    }

    pub fn column(self) -> &'static str {
        match self {
            Field::ClosureTime => CLOSURE_TIME,
            Field::Depth => DEPTH,
            Field::Latitude => LATITUDE,
            Field::Longitude => LONGITUDE,
            Field::Category(c) => c.column(),
            Field::Measurement(v) => v.column(),
            Field::Flag(t) => t.flag_column(),
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::ClosureTime => FieldKind::Timestamp,
            Field::Depth | Field::Latitude | Field::Longitude | Field::Measurement(_) => {
                FieldKind::Numeric
            }
            Field::Category(_) => FieldKind::Text,
            Field::Flag(_) => FieldKind::Flag,
        }
    }

    pub fn required(self) -> bool {
        match self {
            Field::ClosureTime | Field::Depth | Field::Flag(_) => true,
            Field::Measurement(v) => v.required(),
            Field::Latitude | Field::Longitude | Field::Category(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp policy
// ---------------------------------------------------------------------------

/// What to do with a closure time that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    /// Abort the load with [`DataError::Parse`].
    #[default]
    Strict,
    /// Treat the timestamp as missing and keep the record.
    Coerce,
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Positions of the known fields within one source header.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    positions: Vec<(Field, Option<usize>)>,
}

/// A built record plus whether its timestamp had to be coerced.
#[derive(Debug)]
pub struct BuiltRecord {
    pub record: Record,
    pub coerced_timestamp: bool,
}

impl ColumnMap {
    /// Match `headers` against the field table, failing on the first
    /// required column that is absent.
    pub fn resolve(headers: &[String], origin: &str) -> Result<Self> {
        let mut positions = Vec::new();
        for field in Field::all() {
            let pos = headers.iter().position(|h| h.trim() == field.column());
            if pos.is_none() && field.required() {
                return Err(DataError::Schema {
                    column: field.column().to_string(),
                    origin: origin.to_string(),
                });
            }
            positions.push((field, pos));
        }
        Ok(ColumnMap { positions })
    }

    /// Convert one row into a [`Record`]. `cell(i)` yields the text of
    /// column `i`, or `None` for a null cell.
    pub fn build<'a, F>(&self, row: usize, cell: F, policy: TimestampPolicy) -> Result<BuiltRecord>
    where
        F: Fn(usize) -> Option<&'a str>,
    {
        let mut record = Record {
            row,
            ..Record::default()
        };
        let mut coerced_timestamp = false;

        for &(field, pos) in &self.positions {
            let Some(raw) = pos.and_then(&cell) else {
                continue;
            };
            if is_missing(raw) {
                continue;
            }
            let text = raw.trim();
            match field {
                Field::ClosureTime => match parse_timestamp(text) {
                    Some(ts) => record.timestamp = Some(ts),
                    None if policy == TimestampPolicy::Coerce => coerced_timestamp = true,
                    None => return Err(parse_error(row, field, text)),
                },
                Field::Depth => record.depth = parse_number(row, field, text)?,
                Field::Latitude => record.latitude = parse_number(row, field, text)?,
                Field::Longitude => record.longitude = parse_number(row, field, text)?,
                Field::Measurement(variable) => {
                    if let Some(value) = parse_number(row, field, text)? {
                        record.measurements.insert(variable, value);
                    }
                }
                Field::Flag(tracked) => {
                    record.flags.insert(tracked, parse_flag(text));
                }
                Field::Category(Category::Cruise) => record.cruise = Some(text.to_string()),
                Field::Category(Category::Station) => record.station = Some(text.to_string()),
                Field::Category(Category::TargetAsset) => {
                    record.target_asset = Some(text.to_string())
                }
            }
        }

        Ok(BuiltRecord {
            record,
            coerced_timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// Cell conversion
// ---------------------------------------------------------------------------

/// Blank cells, `NaN`, and the fill value all read as missing.
pub fn is_missing(cell: &str) -> bool {
    let t = cell.trim();
    t.is_empty()
        || t.eq_ignore_ascii_case("nan")
        || t.parse::<f64>().is_ok_and(|v| v == FILL_VALUE)
}

/// RFC 3339, or a naive date-time taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Integers become [`FlagValue::Code`]; anything else stays raw.
pub fn parse_flag(text: &str) -> FlagValue {
    match text.parse::<i64>() {
        Ok(code) => FlagValue::Code(code),
        Err(_) => FlagValue::Raw(text.to_string()),
    }
}

fn parse_number(row: usize, field: Field, text: &str) -> Result<Option<f64>> {
    let value: f64 = text
        .parse()
        .map_err(|_| parse_error(row, field, text))?;
    Ok((!value.is_nan()).then_some(value))
}

fn parse_error(row: usize, field: Field, text: &str) -> DataError {
    let expected = match field.kind() {
        FieldKind::Timestamp => "timestamp",
        FieldKind::Numeric => "number",
        FieldKind::Flag => "flag",
        FieldKind::Text => "text",
    };
    DataError::Parse {
        row,
        column: field.column().to_string(),
        value: text.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn full_header() -> Vec<String> {
        Field::all().iter().map(|f| f.column().to_string()).collect()
    }

    #[test]
    fn resolve_reports_first_missing_required_column() {
        let headers: Vec<String> = full_header()
            .into_iter()
            .filter(|h| h != "Discrete Salinity Flag")
            .collect();
        let err = ColumnMap::resolve(&headers, "bottles.csv").unwrap_err();
        match err {
            DataError::Schema { column, origin } => {
                assert_eq!(column, "Discrete Salinity Flag");
                assert_eq!(origin, "bottles.csv");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let headers: Vec<String> = Field::all()
            .into_iter()
            .filter(|f| f.required())
            .map(|f| f.column().to_string())
            .collect();
        assert!(ColumnMap::resolve(&headers, "x").is_ok());
    }

    #[test]
    fn missing_markers() {
        assert!(is_missing(""));
        assert!(is_missing("   "));
        assert!(is_missing("-9999999"));
        assert!(is_missing("-9999999.0"));
        assert!(is_missing("NaN"));
        assert!(!is_missing("0"));
        assert!(!is_missing("*0000000000000100"));
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive() {
        let expected = Utc.with_ymd_and_hms(2019, 6, 13, 4, 12, 42).unwrap();
        assert_eq!(parse_timestamp("2019-06-13T04:12:42.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2019-06-13T04:12:42+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2019-06-13T04:12:42"), Some(expected));
        assert_eq!(parse_timestamp("2019-06-13 04:12:42"), Some(expected));
        assert_eq!(parse_timestamp("June 13th"), None);
    }

    #[test]
    fn flags_keep_raw_text() {
        assert_eq!(
            parse_flag("*0000000000000100"),
            FlagValue::Raw("*0000000000000100".to_string())
        );
        assert_eq!(parse_flag("1"), FlagValue::Code(1));
        assert_eq!(parse_flag("0"), FlagValue::Code(0));
    }

    #[test]
    fn build_applies_timestamp_policy() {
        let headers = full_header();
        let map = ColumnMap::resolve(&headers, "x").unwrap();
        let ts_idx = headers.iter().position(|h| h == CLOSURE_TIME).unwrap();
        let cell = |i: usize| if i == ts_idx { Some("not a time") } else { None };

        let err = map.build(7, cell, TimestampPolicy::Strict).unwrap_err();
        assert!(matches!(err, DataError::Parse { row: 7, expected: "timestamp", .. }));

        let built = map.build(7, cell, TimestampPolicy::Coerce).unwrap();
        assert!(built.coerced_timestamp);
        assert_eq!(built.record.timestamp, None);
    }

    #[test]
    fn build_rejects_bad_numbers() {
        let headers = full_header();
        let map = ColumnMap::resolve(&headers, "x").unwrap();
        let depth_idx = headers.iter().position(|h| h == DEPTH).unwrap();
        let cell = |i: usize| if i == depth_idx { Some("deep") } else { None };
        let err = map.build(0, cell, TimestampPolicy::Strict).unwrap_err();
        assert!(matches!(err, DataError::Parse { expected: "number", .. }));
    }
}
