use super::filter::{QcFilterOutcome, filter_accepted};
use super::model::{Dataset, TrackedVariable};
use super::qc::{NormalizationReport, QcConfig, normalize_flags};

/// Everything the viewer needs after one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// All loaded records, with flags normalized.
    pub normalized: Dataset,
    pub report: NormalizationReport,
    /// Records accepted by at least one tracked flag.
    pub qc: QcFilterOutcome,
}

/// Run the QC stages on a loaded dataset.
pub fn process(dataset: Dataset, config: &QcConfig, tracked: &[TrackedVariable]) -> PipelineOutput {
    let (normalized, report) = normalize_flags(dataset, config);
    let qc = filter_accepted(&normalized, tracked);
    PipelineOutput {
        normalized,
        report,
        qc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;
    use crate::data::model::FlagValue;
    use crate::data::schema::TimestampPolicy;

    const CSV: &str = "\
CTD Bottle Closure Time [UTC],CTD Depth [m],Discrete Oxygen [mL/L],Discrete Oxygen Flag,Discrete Salinity [psu],Discrete Salinity Flag,Discrete Nitrate [uM],Discrete Nitrite [uM],Discrete Silicate [uM],Discrete Nutrients Flag
2019-06-13T04:00:00Z,5,6.1,*0000000000000100,33.0,*1111111111111111,1,0.1,4,*1111111111111111
2019-06-13T04:10:00Z,50,5.2,*1111111111111111,33.5,*1111111111111111,2,0.2,8,*1111111111111111
2019-06-13T04:20:00Z,150,3.9,*1111111111111111,34.0,*1111111111111111,9,0.3,20,*0000000000000101
";

    #[test]
    fn stages_chain_without_shared_state() {
        let dataset = read_csv(CSV.as_bytes(), "mem", TimestampPolicy::Strict).unwrap();
        let output = process(dataset, &QcConfig::default(), &TrackedVariable::ALL);

        assert_eq!(output.normalized.len(), 3);
        assert_eq!(
            output.normalized.records[0].flag(TrackedVariable::Oxygen),
            &FlagValue::Code(1)
        );
        assert_eq!(output.report.total_accepted(), 2);
        assert_eq!(output.qc.indices, vec![0, 2]);
        assert_eq!(output.qc.to_string(), "3 → 2");
    }

    #[test]
    fn restricting_tracked_variables_changes_only_the_filter() {
        let dataset = read_csv(CSV.as_bytes(), "mem", TimestampPolicy::Strict).unwrap();
        let output = process(dataset, &QcConfig::default(), &[TrackedVariable::Salinity]);
        assert_eq!(output.report.total_accepted(), 2);
        assert_eq!(output.qc.kept(), 0);
    }
}
