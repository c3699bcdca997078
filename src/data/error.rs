use thiserror::Error;

/// Errors raised while turning a source file into a [`Dataset`].
///
/// None of these are retried; they surface immediately to the caller.
///
/// [`Dataset`]: super::model::Dataset
#[derive(Debug, Error)]
pub enum DataError {
    /// Source missing, unreadable, unreachable, or in an unsupported format.
    #[error("failed to load {origin}: {reason}")]
    Load { origin: String, reason: String },

    /// A required column is absent from the header.
    #[error("required column '{column}' not found in {origin}")]
    Schema { column: String, origin: String },

    /// A cell could not be converted to its schema type.
    #[error("row {row}: cannot parse '{value}' in column '{column}' as {expected}")]
    Parse {
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },

    /// Malformed CSV structure (ragged rows, bad quoting, ...).
    #[error("malformed CSV in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },
}

impl DataError {
    pub(crate) fn load(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::Load {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for data-layer operations.
pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_the_column() {
        let err = DataError::Schema {
            column: "Discrete Oxygen Flag".to_string(),
            origin: "cruise.csv".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "required column 'Discrete Oxygen Flag' not found in cruise.csv"
        );
    }

    #[test]
    fn parse_error_display() {
        let err = DataError::Parse {
            row: 3,
            column: "CTD Depth [m]".to_string(),
            value: "deep".to_string(),
            expected: "number",
        };
        assert_eq!(
            err.to_string(),
            "row 3: cannot parse 'deep' in column 'CTD Depth [m]' as number"
        );
    }
}
