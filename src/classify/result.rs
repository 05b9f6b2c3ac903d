//! Data structures for representing the prediction results.

use std::io::Write;

use itertools::Itertools as _;

/// Class probabilities as produced by the model.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct ClassProbabilities {
    /// Probability of BRCA1-type HRD.
    pub p_brca1: f64,
    /// Probability of BRCA2-type HRD.
    pub p_brca2: f64,
}

impl ClassProbabilities {
    /// Probability of HRD of either type.
    pub fn p_hrd(&self) -> f64 {
        self.p_brca1 + self.p_brca2
    }
}

/// Homologous recombination status.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
pub enum HrStatus {
    /// HR deficient.
    #[serde(rename = "HR_deficient")]
    #[strum(serialize = "HR_deficient")]
    Hrd,
    /// HR proficient.
    #[serde(rename = "HR_proficient")]
    #[strum(serialize = "HR_proficient")]
    HrProficient,
    /// Too little evidence, or confounded by MSI.
    #[serde(rename = "cannot_be_determined")]
    #[strum(serialize = "cannot_be_determined")]
    CannotBeDetermined,
}

/// Subtype of HR deficiency.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
pub enum HrdType {
    /// BRCA1-type HRD.
    #[serde(rename = "BRCA1_type")]
    #[strum(serialize = "BRCA1_type")]
    Brca1,
    /// BRCA2-type HRD.
    #[serde(rename = "BRCA2_type")]
    #[strum(serialize = "BRCA2_type")]
    Brca2,
    /// Not HR deficient.
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    None,
    /// HR deficient but too few SVs to tell the subtype.
    #[serde(rename = "cannot_be_determined")]
    #[strum(serialize = "cannot_be_determined")]
    CannotBeDetermined,
}

/// Remarks on insufficient or confounded evidence.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
)]
pub enum Remark {
    /// Fewer indels than required.
    #[serde(rename = "<50 indels")]
    #[strum(serialize = "<50 indels")]
    FewIndels,
    /// Microsatellite instability.
    #[serde(rename = "Has MSI (>14000 indel.rep)")]
    #[strum(serialize = "Has MSI (>14000 indel.rep)")]
    Msi,
    /// Fewer SVs than required for the subtype.
    #[serde(rename = "<30 SVs")]
    #[strum(serialize = "<30 SVs")]
    FewSvs,
}

/// 5%, 50% and 95% quantiles.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct Quantiles {
    /// 5% quantile.
    pub q5: f64,
    /// Median.
    pub q50: f64,
    /// 95% quantile.
    pub q95: f64,
}

/// Bootstrap quantiles of each probability.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct BootstrapQuantiles {
    /// Quantiles of `p_hrd`.
    pub p_hrd: Quantiles,
    /// Quantiles of `p_BRCA1`.
    pub p_brca1: Quantiles,
    /// Quantiles of `p_BRCA2`.
    pub p_brca2: Quantiles,
}

/// Final prediction of one sample.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PredictionResult {
    /// Sample identifier.
    pub sample: String,
    /// Probability of HRD.
    pub p_hrd: f64,
    /// Probability of BRCA1-type HRD.
    #[serde(rename = "p_BRCA1")]
    pub p_brca1: f64,
    /// Probability of BRCA2-type HRD.
    #[serde(rename = "p_BRCA2")]
    pub p_brca2: f64,
    /// HR status.
    pub hr_status: HrStatus,
    /// HRD subtype.
    pub hrd_type: HrdType,
    /// Remarks, in order of evaluation.
    pub remarks: Vec<Remark>,
    /// Bootstrap quantiles, if requested.
    pub bootstrap: Option<BootstrapQuantiles>,
}

/// Column names of the prediction table.
const COLUMNS: [&str; 7] = [
    "sample",
    "p_hrd",
    "p_BRCA1",
    "p_BRCA2",
    "hr_status",
    "hrd_type",
    "remarks",
];

/// Column names of the bootstrap quantiles.
const BOOTSTRAP_COLUMNS: [&str; 9] = [
    "p_hrd.q5",
    "p_hrd.q50",
    "p_hrd.q95",
    "p_BRCA1.q5",
    "p_BRCA1.q50",
    "p_BRCA1.q95",
    "p_BRCA2.q5",
    "p_BRCA2.q50",
    "p_BRCA2.q95",
];

fn format_prob(value: f64) -> String {
    format!("{:.3}", value)
}

impl PredictionResult {
    /// Remarks joined for the prediction table.
    pub fn remarks_string(&self) -> String {
        self.remarks.iter().join(";")
    }

    fn to_record(&self, with_bootstrap: bool) -> Vec<String> {
        let mut record = vec![
            self.sample.clone(),
            format_prob(self.p_hrd),
            format_prob(self.p_brca1),
            format_prob(self.p_brca2),
            self.hr_status.to_string(),
            self.hrd_type.to_string(),
            self.remarks_string(),
        ];
        if with_bootstrap {
            let quantiles = self.bootstrap.unwrap_or_default();
            for q in [quantiles.p_hrd, quantiles.p_brca1, quantiles.p_brca2] {
                record.extend([q.q5, q.q50, q.q95].into_iter().map(format_prob));
            }
        }
        record
    }
}

/// Write the prediction table.
///
/// Bootstrap columns are written if any result carries bootstrap quantiles.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn write_tsv<W: Write>(results: &[PredictionResult], writer: W) -> Result<(), anyhow::Error> {
    let with_bootstrap = results.iter().any(|result| result.bootstrap.is_some());
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    let mut header = COLUMNS.to_vec();
    if with_bootstrap {
        header.extend(BOOTSTRAP_COLUMNS);
    }
    csv_writer.write_record(&header)?;
    for result in results {
        csv_writer.write_record(result.to_record(with_bootstrap))?;
    }
    csv_writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn result(bootstrap: Option<BootstrapQuantiles>) -> PredictionResult {
        PredictionResult {
            sample: "s1".into(),
            p_hrd: 0.8,
            p_brca1: 0.7,
            p_brca2: 0.1,
            hr_status: HrStatus::Hrd,
            hrd_type: HrdType::CannotBeDetermined,
            remarks: vec![Remark::FewSvs],
            bootstrap,
        }
    }

    #[test]
    fn display_values() {
        assert_eq!(HrStatus::Hrd.to_string(), "HR_deficient");
        assert_eq!(HrStatus::CannotBeDetermined.to_string(), "cannot_be_determined");
        assert_eq!(HrdType::Brca2.to_string(), "BRCA2_type");
        assert_eq!(Remark::Msi.to_string(), "Has MSI (>14000 indel.rep)");
        assert_eq!("HR_proficient".parse::<HrStatus>().ok(), Some(HrStatus::HrProficient));
    }

    #[test]
    fn remarks_joined() {
        let mut result = result(None);
        result.remarks = vec![Remark::FewIndels, Remark::Msi];

        assert_eq!(result.remarks_string(), "<50 indels;Has MSI (>14000 indel.rep)");
    }

    #[test]
    fn write_tsv_plain() -> Result<(), anyhow::Error> {
        let mut buf = Vec::new();
        write_tsv(&[result(None)], &mut buf)?;

        assert_eq!(
            String::from_utf8(buf)?,
            "sample\tp_hrd\tp_BRCA1\tp_BRCA2\thr_status\thrd_type\tremarks\n\
             s1\t0.800\t0.700\t0.100\tHR_deficient\tcannot_be_determined\t<30 SVs\n"
        );

        Ok(())
    }

    #[test]
    fn write_tsv_bootstrap() -> Result<(), anyhow::Error> {
        let q = Quantiles {
            q5: 0.1,
            q50: 0.5,
            q95: 0.9,
        };
        let quantiles = BootstrapQuantiles {
            p_hrd: q,
            p_brca1: q,
            p_brca2: q,
        };
        let mut buf = Vec::new();
        write_tsv(&[result(Some(quantiles))], &mut buf)?;

        let text = String::from_utf8(buf)?;
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("\tp_BRCA2.q5\tp_BRCA2.q50\tp_BRCA2.q95"));
        assert_eq!(lines[1].split('\t').count(), 16);
        assert!(lines[1].ends_with("\t0.100\t0.500\t0.900"));

        Ok(())
    }

    #[test]
    fn serialize_json() -> Result<(), anyhow::Error> {
        let json = serde_json::to_value(result(None))?;

        assert_eq!(json["hr_status"], "HR_deficient");
        assert_eq!(json["p_BRCA1"], 0.7);
        assert_eq!(json["remarks"][0], "<30 SVs");
        assert!(json.get("bootstrap").is_none());

        Ok(())
    }
}
