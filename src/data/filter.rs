use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::model::{Category, Dataset, TrackedVariable};

// ---------------------------------------------------------------------------
// QC filter: keep records with at least one acceptable tracked flag
// ---------------------------------------------------------------------------

/// Result of the QC filter: the kept records plus the size of the input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QcFilterOutcome {
    /// Accepted records, in their original relative order.
    pub accepted: Dataset,
    /// Positions of the accepted records within the filtered input.
    pub indices: Vec<usize>,
    pub input_len: usize,
}

impl QcFilterOutcome {
    pub fn kept(&self) -> usize {
        self.accepted.len()
    }

    pub fn removed(&self) -> usize {
        self.input_len - self.kept()
    }
}

impl fmt::Display for QcFilterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.input_len, self.kept())
    }
}

/// Indices of records where ANY of the `tracked` flags equals `1`.
pub fn accepted_indices(dataset: &Dataset, tracked: &[TrackedVariable]) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.is_accepted_by(tracked))
        .map(|(i, _)| i)
        .collect()
}

/// Select the records judged acceptable by at least one tracked flag.
///
/// The input is only read; the outcome is a derived dataset.
pub fn filter_accepted(dataset: &Dataset, tracked: &[TrackedVariable]) -> QcFilterOutcome {
    let indices = accepted_indices(dataset, tracked);
    let records = indices.iter().map(|&i| dataset.records[i].clone()).collect();
    let outcome = QcFilterOutcome {
        accepted: dataset.derive(records),
        indices,
        input_len: dataset.len(),
    };

    log::info!(
        "QC filter on {:?}: {} records ({} removed)",
        tracked,
        outcome,
        outcome.removed()
    );
    if outcome.kept() == 0 && !dataset.is_empty() {
        log::warn!("No record in {} has an acceptable QC flag", dataset.origin);
    }
    outcome
}

// ---------------------------------------------------------------------------
// Categorical selection: which values are shown per text column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps category → set of selected values.
/// If a category is absent it means "no filter" (show all); an empty set
/// hides everything.
pub type FilterState = BTreeMap<Category, BTreeSet<Option<String>>>;

/// Initialise a [`FilterState`] with all values selected (i.e., show everything).
pub fn init_filter_state(dataset: &Dataset) -> FilterState {
    Category::ALL
        .into_iter()
        .map(|c| (c, dataset.unique_values(c)))
        .collect()
}

/// Carry selections over to a re-processed dataset.  Categories already in
/// `previous` keep those of their values that still occur; the rest start
/// with everything selected.
pub fn carry_filter_state(previous: &FilterState, dataset: &Dataset) -> FilterState {
    init_filter_state(dataset)
        .into_iter()
        .map(|(category, values)| {
            let selected = match previous.get(&category) {
                Some(kept) => values.intersection(kept).cloned().collect(),
                None => values,
            };
            (category, selected)
        })
        .collect()
}

/// Return those of `candidates` (indices into `dataset`) whose category
/// values are all selected.
pub fn selected_indices(
    dataset: &Dataset,
    candidates: &[usize],
    filters: &FilterState,
) -> Vec<usize> {
    candidates
        .iter()
        .copied()
        .filter(|&i| {
            let record = &dataset.records[i];
            filters.iter().all(|(category, selected)| {
                let value = record.category(*category).map(str::to_string);
                selected.contains(&value)
            })
        })
        .collect()
}
