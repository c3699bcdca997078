use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::model::{Dataset, FlagValue, TrackedVariable};

/// Raw codes the discrete summaries use for an acceptable sample.  They
/// differ only in the last bit.
pub const ACCEPTABLE_CODES: [&str; 2] = ["*0000000000000100", "*0000000000000101"];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What happens to a raw flag that matches no acceptable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Leave the raw value as it was.
    #[default]
    Keep,
    /// Replace it with `0`, giving a strictly binary column.
    Zero,
}

/// Acceptable raw codes per tracked variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// Variables left out of a settings file keep the default codes.
    #[serde(deserialize_with = "over_default_codes")]
    pub acceptable: BTreeMap<TrackedVariable, BTreeSet<String>>,
    pub unmatched: UnmatchedPolicy,
}

fn over_default_codes<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<TrackedVariable, BTreeSet<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut acceptable = QcConfig::default().acceptable;
    acceptable.extend(BTreeMap::<TrackedVariable, BTreeSet<String>>::deserialize(
        deserializer,
    )?);
    Ok(acceptable)
}

impl Default for QcConfig {
    fn default() -> Self {
        let codes: BTreeSet<String> = ACCEPTABLE_CODES.iter().map(|c| c.to_string()).collect();
        Self {
            acceptable: TrackedVariable::ALL
                .into_iter()
                .map(|t| (t, codes.clone()))
                .collect(),
            unmatched: UnmatchedPolicy::Keep,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Per-variable outcome of one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagTally {
    /// Raw codes relabeled to `1`.
    pub accepted: usize,
    /// Raw codes with no acceptable match.
    pub unmatched: usize,
    /// Blank cells, left as they are.
    pub missing: usize,
    /// Cells that were already integer codes.
    pub coded: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub tallies: BTreeMap<TrackedVariable, FlagTally>,
}

impl NormalizationReport {
    pub fn tally(&self, tracked: TrackedVariable) -> FlagTally {
        self.tallies.get(&tracked).copied().unwrap_or_default()
    }

    pub fn total_accepted(&self) -> usize {
        self.tallies.values().map(|t| t.accepted).sum()
    }
}

impl fmt::Display for NormalizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = TrackedVariable::ALL
            .iter()
            .map(|t| {
                let tally = self.tally(*t);
                format!(
                    "{}: {} accepted, {} unmatched, {} missing",
                    t.label(),
                    tally.accepted,
                    tally.unmatched,
                    tally.missing
                )
            })
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Normalize a single flag cell.
///
/// Only raw strings are candidates: missing cells and integer codes pass
/// through untouched, which is what makes repeated passes a no-op.
pub fn normalize_flag(
    value: &FlagValue,
    acceptable: &BTreeSet<String>,
    unmatched: UnmatchedPolicy,
) -> FlagValue {
    match value {
        FlagValue::Raw(raw) if acceptable.contains(raw) => FlagValue::Code(1),
        FlagValue::Raw(_) if unmatched == UnmatchedPolicy::Zero => FlagValue::Code(0),
        other => other.clone(),
    }
}

/// Relabel acceptable raw flags as `1` across the whole dataset.
///
/// Takes the dataset by value and hands back the derived one; measurements,
/// row order and flags of untracked columns are untouched.
pub fn normalize_flags(mut dataset: Dataset, config: &QcConfig) -> (Dataset, NormalizationReport) {
    let empty = BTreeSet::new();
    let mut report = NormalizationReport::default();

    for record in &mut dataset.records {
        for tracked in TrackedVariable::ALL {
            let acceptable = config.acceptable.get(&tracked).unwrap_or(&empty);
            let tally = report.tallies.entry(tracked).or_default();

            let Some(flag) = record.flags.get_mut(&tracked) else {
                tally.missing += 1;
                continue;
            };
            match flag {
                FlagValue::Missing => tally.missing += 1,
                FlagValue::Code(_) => tally.coded += 1,
                FlagValue::Raw(raw) if acceptable.contains(raw.as_str()) => tally.accepted += 1,
                FlagValue::Raw(_) => tally.unmatched += 1,
            }
            *flag = normalize_flag(flag, acceptable, config.unmatched);
        }
    }

    log::info!("Normalized QC flags of {} records: {report}", dataset.len());
    (dataset, report)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data::model::Record;

    fn raw(s: &str) -> FlagValue {
        FlagValue::Raw(s.to_string())
    }

    fn dataset_with_oxygen(flags: Vec<FlagValue>) -> Dataset {
        let records = flags
            .into_iter()
            .enumerate()
            .map(|(row, flag)| {
                let mut record = Record {
                    row,
                    ..Record::default()
                };
                record.flags.insert(TrackedVariable::Oxygen, flag);
                record
            })
            .collect();
        Dataset::new(records, Vec::new(), "test")
    }

    fn oxygen_flags(ds: &Dataset) -> Vec<FlagValue> {
        ds.records
            .iter()
            .map(|r| r.flag(TrackedVariable::Oxygen).clone())
            .collect()
    }

    #[test]
    fn acceptable_codes_become_one() {
        let ds = dataset_with_oxygen(vec![
            raw("*0000000000000100"),
            raw("*0000000000000101"),
            raw("*1111111111111111"),
        ]);
        let (normalized, report) = normalize_flags(ds, &QcConfig::default());
        assert_eq!(
            oxygen_flags(&normalized),
            vec![FlagValue::Code(1), FlagValue::Code(1), raw("*1111111111111111")]
        );
        let tally = report.tally(TrackedVariable::Oxygen);
        assert_eq!(tally.accepted, 2);
        assert_eq!(tally.unmatched, 1);
    }

    #[test]
    fn missing_flags_stay_missing() {
        let ds = dataset_with_oxygen(vec![FlagValue::Missing]);
        let config = QcConfig {
            unmatched: UnmatchedPolicy::Zero,
            ..QcConfig::default()
        };
        let (normalized, _) = normalize_flags(ds, &config);
        assert_eq!(oxygen_flags(&normalized), vec![FlagValue::Missing]);
    }

    #[test]
    fn zero_policy_collapses_unmatched_raw_codes() {
        let ds = dataset_with_oxygen(vec![raw("*0000000000000100"), raw("*0000000000001000")]);
        let config = QcConfig {
            unmatched: UnmatchedPolicy::Zero,
            ..QcConfig::default()
        };
        let (normalized, _) = normalize_flags(ds, &config);
        assert_eq!(
            oxygen_flags(&normalized),
            vec![FlagValue::Code(1), FlagValue::Code(0)]
        );
    }

    #[test]
    fn measurements_are_untouched() {
        let mut ds = dataset_with_oxygen(vec![raw("*0000000000000100")]);
        ds.records[0]
            .measurements
            .insert(crate::data::model::Variable::Oxygen, 6.25);
        let before = ds.records[0].measurements.clone();
        let (normalized, _) = normalize_flags(ds, &QcConfig::default());
        assert_eq!(normalized.records[0].measurements, before);
    }

    #[test]
    fn empty_dataset_normalizes_to_empty() {
        let (normalized, report) = normalize_flags(Dataset::default(), &QcConfig::default());
        assert!(normalized.is_empty());
        assert_eq!(report.total_accepted(), 0);
    }

    #[test]
    fn per_variable_codes_are_independent() {
        let mut config = QcConfig::default();
        config
            .acceptable
            .insert(TrackedVariable::Oxygen, BTreeSet::from(["*A".to_string()]));
        let ds = dataset_with_oxygen(vec![raw("*A"), raw("*0000000000000100")]);
        let (normalized, _) = normalize_flags(ds, &config);
        assert_eq!(
            oxygen_flags(&normalized),
            vec![FlagValue::Code(1), raw("*0000000000000100")]
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let json = serde_json::to_string(&QcConfig::default()).unwrap();
        assert!(json.contains("\"oxygen\""));
        let partial: QcConfig = serde_json::from_str(r#"{"unmatched":"zero"}"#).unwrap();
        assert_eq!(partial.unmatched, UnmatchedPolicy::Zero);
        assert_eq!(partial.acceptable, QcConfig::default().acceptable);
    }

    #[test]
    fn codes_for_one_variable_keep_the_others_default() {
        let config: QcConfig =
            serde_json::from_str(r#"{"acceptable":{"oxygen":["*0000000000000100"]}}"#).unwrap();
        assert_eq!(
            config.acceptable[&TrackedVariable::Oxygen],
            BTreeSet::from(["*0000000000000100".to_string()])
        );
        let defaults = QcConfig::default().acceptable;
        assert_eq!(
            config.acceptable[&TrackedVariable::Salinity],
            defaults[&TrackedVariable::Salinity]
        );
        assert_eq!(
            config.acceptable[&TrackedVariable::Nutrients],
            defaults[&TrackedVariable::Nutrients]
        );

        let ds = dataset_with_oxygen(vec![raw("*0000000000000101")]);
        let (normalized, _) = normalize_flags(ds, &config);
        assert_eq!(oxygen_flags(&normalized), vec![raw("*0000000000000101")]);
    }

    fn flag_strategy() -> impl Strategy<Value = FlagValue> {
        prop_oneof![
            Just(FlagValue::Missing),
            (-2i64..3).prop_map(FlagValue::Code),
            Just(raw(ACCEPTABLE_CODES[0])),
            Just(raw(ACCEPTABLE_CODES[1])),
            "\\*[01]{16}".prop_map(FlagValue::Raw),
        ]
    }

    fn policy_strategy() -> impl Strategy<Value = UnmatchedPolicy> {
        prop_oneof![Just(UnmatchedPolicy::Keep), Just(UnmatchedPolicy::Zero)]
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(
            flags in prop::collection::vec(flag_strategy(), 0..40),
            unmatched in policy_strategy()
        ) {
            let config = QcConfig { unmatched, ..QcConfig::default() };
            let (once, _) = normalize_flags(dataset_with_oxygen(flags), &config);
            let (twice, _) = normalize_flags(once.clone(), &config);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn flags_become_one_or_stay_unchanged(
            flags in prop::collection::vec(flag_strategy(), 0..40)
        ) {
            let (normalized, _) =
                normalize_flags(dataset_with_oxygen(flags.clone()), &QcConfig::default());
            for (before, after) in flags.iter().zip(oxygen_flags(&normalized)) {
                prop_assert!(after == FlagValue::Code(1) || &after == before);
            }
        }
    }
}
