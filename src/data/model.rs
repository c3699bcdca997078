use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Variables – measured quantities and the QC groups they belong to
// ---------------------------------------------------------------------------

/// A measured quantity of a discrete water sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variable {
    Oxygen,
    Salinity,
    Nitrate,
    Nitrite,
    Silicate,
    Phosphate,
    Ammonium,
}

impl Variable {
    pub const ALL: [Variable; 7] = [
        Variable::Oxygen,
        Variable::Salinity,
        Variable::Nitrate,
        Variable::Nitrite,
        Variable::Silicate,
        Variable::Phosphate,
        Variable::Ammonium,
    ];

    /// Source column holding the measured value.
    pub fn column(self) -> &'static str {
        match self {
            Variable::Oxygen => "Discrete Oxygen [mL/L]",
            Variable::Salinity => "Discrete Salinity [psu]",
            Variable::Nitrate => "Discrete Nitrate [uM]",
            Variable::Nitrite => "Discrete Nitrite [uM]",
            Variable::Silicate => "Discrete Silicate [uM]",
            Variable::Phosphate => "Discrete Phosphate [uM]",
            Variable::Ammonium => "Discrete Ammonium [uM]",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Variable::Oxygen => "Oxygen",
            Variable::Salinity => "Salinity",
            Variable::Nitrate => "Nitrate",
            Variable::Nitrite => "Nitrite",
            Variable::Silicate => "Silicate",
            Variable::Phosphate => "Phosphate",
            Variable::Ammonium => "Ammonium",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Variable::Oxygen => "mL/L",
            Variable::Salinity => "psu",
            _ => "µM",
        }
    }

    /// Whether the loader refuses a file lacking this column.
    pub fn required(self) -> bool {
        !matches!(self, Variable::Phosphate | Variable::Ammonium)
    }

    /// The QC flag that covers this variable.
    pub fn tracked(self) -> TrackedVariable {
        match self {
            Variable::Oxygen => TrackedVariable::Oxygen,
            Variable::Salinity => TrackedVariable::Salinity,
            _ => TrackedVariable::Nutrients,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.label(), self.unit())
    }
}

/// A variable group carrying its own QC flag column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TrackedVariable {
    Oxygen,
    Salinity,
    Nutrients,
}

impl TrackedVariable {
    pub const ALL: [TrackedVariable; 3] = [
        TrackedVariable::Oxygen,
        TrackedVariable::Salinity,
        TrackedVariable::Nutrients,
    ];

    pub fn flag_column(self) -> &'static str {
        match self {
            TrackedVariable::Oxygen => "Discrete Oxygen Flag",
            TrackedVariable::Salinity => "Discrete Salinity Flag",
            TrackedVariable::Nutrients => "Discrete Nutrients Flag",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrackedVariable::Oxygen => "Oxygen",
            TrackedVariable::Salinity => "Salinity",
            TrackedVariable::Nutrients => "Nutrients",
        }
    }
}

/// Text columns usable for categorical selection and colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Cruise,
    Station,
    TargetAsset,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Cruise, Category::Station, Category::TargetAsset];

    pub fn column(self) -> &'static str {
        match self {
            Category::Cruise => "Cruise",
            Category::Station => "Station",
            Category::TargetAsset => "Target Asset",
        }
    }
}

// ---------------------------------------------------------------------------
// FlagValue – a single QC flag cell
// ---------------------------------------------------------------------------

/// A QC flag as read from the source, possibly normalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FlagValue {
    #[default]
    Missing,
    /// Integer code; `1` means acceptable.
    Code(i64),
    /// Opaque raw code, usually a 17-character bit string like `*0000000000000100`.
    Raw(String),
}

static MISSING_FLAG: FlagValue = FlagValue::Missing;

impl FlagValue {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FlagValue::Code(1))
    }

    /// Text written back to a CSV cell (`None` for missing).
    pub fn to_cell(&self) -> Option<String> {
        match self {
            FlagValue::Missing => None,
            FlagValue::Code(c) => Some(c.to_string()),
            FlagValue::Raw(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Missing => write!(f, "<missing>"),
            FlagValue::Code(c) => write!(f, "{c}"),
            FlagValue::Raw(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one bottle sample (one row of the source table)
// ---------------------------------------------------------------------------

/// A single discrete water-sample observation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// 0-based data row in the source file.
    pub row: usize,
    /// Bottle closure time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Sample depth in metres.
    pub depth: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub cruise: Option<String>,
    pub station: Option<String>,
    pub target_asset: Option<String>,
    /// Present values only; an absent key is a missing measurement.
    pub measurements: BTreeMap<Variable, f64>,
    pub flags: BTreeMap<TrackedVariable, FlagValue>,
}

impl Record {
    pub fn measurement(&self, variable: Variable) -> Option<f64> {
        self.measurements.get(&variable).copied()
    }

    pub fn flag(&self, tracked: TrackedVariable) -> &FlagValue {
        self.flags.get(&tracked).unwrap_or(&MISSING_FLAG)
    }

    pub fn category(&self, category: Category) -> Option<&str> {
        match category {
            Category::Cruise => self.cruise.as_deref(),
            Category::Station => self.station.as_deref(),
            Category::TargetAsset => self.target_asset.as_deref(),
        }
    }

    /// True when any of the given flags is the acceptable code.
    pub fn is_accepted_by(&self, tracked: &[TrackedVariable]) -> bool {
        tracked.iter().any(|t| self.flag(*t).is_accepted())
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// An ordered sequence of records in file row order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub records: Vec<Record>,
    /// Header of the source, in file order (including unknown columns).
    pub columns: Vec<String>,
    /// Path or URL the records came from.
    pub origin: String,
}

impl Dataset {
    pub fn new(records: Vec<Record>, columns: Vec<String>, origin: impl Into<String>) -> Self {
        Dataset {
            records,
            columns,
            origin: origin.into(),
        }
    }

    /// A derived dataset over `records`, keeping this one's header and origin.
    pub fn derive(&self, records: Vec<Record>) -> Self {
        Dataset {
            records,
            columns: self.columns.clone(),
            origin: self.origin.clone(),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted distinct values of a text column (`None` = blank cell).
    pub fn unique_values(&self, category: Category) -> BTreeSet<Option<String>> {
        self.records
            .iter()
            .map(|r| r.category(category).map(str::to_string))
            .collect()
    }

    /// Shallowest and deepest sample depth.
    pub fn depth_range(&self) -> Option<(f64, f64)> {
        self.records
            .iter()
            .filter_map(|r| r.depth)
            .fold(None, |acc, d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nutrients_share_one_flag() {
        for v in [
            Variable::Nitrate,
            Variable::Nitrite,
            Variable::Silicate,
            Variable::Phosphate,
            Variable::Ammonium,
        ] {
            assert_eq!(v.tracked(), TrackedVariable::Nutrients);
        }
        assert_eq!(Variable::Oxygen.tracked(), TrackedVariable::Oxygen);
    }

    #[test]
    fn absent_flag_reads_as_missing() {
        let record = Record::default();
        assert_eq!(record.flag(TrackedVariable::Salinity), &FlagValue::Missing);
        assert!(!record.is_accepted_by(&TrackedVariable::ALL));
    }

    #[test]
    fn only_code_one_is_accepted() {
        assert!(FlagValue::Code(1).is_accepted());
        assert!(!FlagValue::Code(0).is_accepted());
        assert!(!FlagValue::Raw("1".to_string()).is_accepted());
        assert!(!FlagValue::Missing.is_accepted());
    }

    #[test]
    fn depth_range_skips_missing() {
        let records = [Some(12.0), None, Some(3.5), Some(80.0)]
            .into_iter()
            .enumerate()
            .map(|(row, depth)| Record {
                row,
                depth,
                ..Record::default()
            })
            .collect();
        let ds = Dataset::new(records, Vec::new(), "test");
        assert_eq!(ds.depth_range(), Some((3.5, 80.0)));
        assert_eq!(Dataset::default().depth_range(), None);
    }

    #[test]
    fn tracked_variable_serializes_lowercase() {
        let json = serde_json::to_string(&TrackedVariable::Nutrients).unwrap();
        assert_eq!(json, "\"nutrients\"");
    }
}
