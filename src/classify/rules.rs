//! Decision rules turning raw class probabilities into the final call.

use crate::contexts::{schema::Family, ContextVector};

use super::result::{
    BootstrapQuantiles, ClassProbabilities, HrStatus, HrdType, PredictionResult, Remark,
};

/// Minimal number of indels for a confident HR status.
pub const MIN_INDELS: u64 = 50;
/// Maximal number of repeat indels before assuming MSI.
pub const MAX_INDEL_REP: u64 = 14_000;
/// Minimal number of SVs for a confident HRD subtype.
pub const MIN_SVS: u64 = 30;
/// Minimal `p_hrd` for calling HR deficiency.
pub const HRD_CUTOFF: f64 = 0.5;

/// Mutation counts that the decision rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Evidence {
    /// Number of indels.
    pub indels: u64,
    /// Number of indels in repeat context.
    pub indel_rep: u64,
    /// Number of structural variants.
    pub svs: u64,
}

impl From<&ContextVector> for Evidence {
    fn from(contexts: &ContextVector) -> Self {
        Self {
            indels: contexts.family_total(Family::Indel),
            indel_rep: contexts.indel_rep_total(),
            svs: contexts.family_total(Family::Sv),
        }
    }
}

/// Apply the decision rules.
///
/// # Arguments
///
/// * `sample` - Sample identifier.
/// * `probs` - Raw class probabilities from the model.
/// * `evidence` - The sample's mutation counts.
/// * `bootstrap` - Bootstrap quantiles, passed through to the result.
///
/// # Returns
///
/// The final prediction; `hrd_type` is only a subtype if `hr_status` is HRD.
pub fn evaluate(
    sample: &str,
    probs: ClassProbabilities,
    evidence: &Evidence,
    bootstrap: Option<BootstrapQuantiles>,
) -> PredictionResult {
    let p_hrd = probs.p_hrd();
    let mut hr_status = if p_hrd >= HRD_CUTOFF {
        HrStatus::Hrd
    } else {
        HrStatus::HrProficient
    };
    let mut remarks = Vec::new();

    if evidence.indels < MIN_INDELS {
        hr_status = HrStatus::CannotBeDetermined;
        remarks.push(Remark::FewIndels);
    }
    if evidence.indel_rep > MAX_INDEL_REP {
        hr_status = HrStatus::CannotBeDetermined;
        remarks.push(Remark::Msi);
    }

    let hrd_type = if hr_status != HrStatus::Hrd {
        HrdType::None
    } else if evidence.svs < MIN_SVS {
        remarks.push(Remark::FewSvs);
        HrdType::CannotBeDetermined
    } else if probs.p_brca1 >= probs.p_brca2 {
        HrdType::Brca1
    } else {
        HrdType::Brca2
    };

    tracing::debug!(
        "{}: p_hrd={:.3} {:?} -> {} / {} {:?}",
        sample,
        p_hrd,
        evidence,
        hr_status,
        hrd_type,
        &remarks
    );

    PredictionResult {
        sample: sample.to_string(),
        p_hrd,
        p_brca1: probs.p_brca1,
        p_brca2: probs.p_brca2,
        hr_status,
        hrd_type,
        remarks,
        bootstrap,
    }
}
