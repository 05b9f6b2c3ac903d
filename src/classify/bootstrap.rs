//! Bootstrap estimation of the prediction uncertainty.
//!
//! The mutations of each family are resampled with replacement and the model
//! is rerun on each resample.  The spread of the resulting probabilities is
//! reported as 5%, 50% and 95% quantiles.

use rand::{
    distributions::{Distribution as _, WeightedIndex},
    rngs::StdRng,
    SeedableRng as _,
};
use rayon::prelude::*;
use strum::IntoEnumIterator as _;

use crate::contexts::{schema::Family, ContextVector};

use super::{
    model::Model,
    result::{BootstrapQuantiles, ClassProbabilities, Quantiles},
};

/// Default number of bootstrap iterations.
pub const DEFAULT_ITERATIONS: usize = 20;

/// Configuration of the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Number of resamples.
    pub iterations: usize,
    /// Seed of the first iteration; iteration `i` uses `seed + i`.
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: 0,
        }
    }
}

/// Resample the mutations of each family with replacement.
///
/// Each family keeps its total; families without mutations stay empty.
///
/// # Errors
///
/// If the sampling distribution cannot be constructed.
pub fn resample(
    contexts: &ContextVector,
    rng: &mut StdRng,
) -> Result<ContextVector, anyhow::Error> {
    let counts = contexts.counts();
    let mut result = vec![0; counts.len()];
    for family in Family::iter() {
        let total = contexts.family_total(family);
        if total == 0 {
            continue;
        }
        let range = family.range();
        let dist = WeightedIndex::new(&counts[range.clone()])
            .map_err(|e| anyhow::anyhow!("cannot resample {:?} contexts: {}", family, e))?;
        for _ in 0..total {
            result[range.start + dist.sample(&mut *rng)] += 1;
        }
    }
    Ok(ContextVector::from_counts(result)?)
}

/// Quantile of sorted values, interpolating linearly between order statistics.
///
/// This is the default method (type 7) of R's `quantile()`.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = std::cmp::min(lo + 1, sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

fn quantiles(mut values: Vec<f64>) -> Quantiles {
    values.sort_by(f64::total_cmp);
    Quantiles {
        q5: quantile(&values, 0.05),
        q50: quantile(&values, 0.5),
        q95: quantile(&values, 0.95),
    }
}

/// Run the bootstrap for one sample.
///
/// # Arguments
///
/// * `model` - The model to rerun on each resample.
/// * `contexts` - The sample's context counts.
/// * `config` - Bootstrap configuration.
///
/// # Returns
///
/// The quantiles of each probability; identical for identical seeds.
///
/// # Errors
///
/// If the number of iterations is zero or resampling fails.
pub fn run(
    model: &Model,
    contexts: &ContextVector,
    config: &BootstrapConfig,
) -> Result<BootstrapQuantiles, anyhow::Error> {
    if config.iterations == 0 {
        anyhow::bail!("number of bootstrap iterations must be positive");
    }

    let probs = (0..config.iterations)
        .into_par_iter()
        .map(|iteration| -> Result<ClassProbabilities, anyhow::Error> {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(iteration as u64));
            let resampled = resample(contexts, &mut rng)?;
            Ok(model.predict(&resampled))
        })
        .collect::<Result<Vec<_>, anyhow::Error>>()?;
    tracing::trace!("bootstrap probabilities: {:?}", &probs);

    Ok(BootstrapQuantiles {
        p_hrd: quantiles(probs.iter().map(ClassProbabilities::p_hrd).collect()),
        p_brca1: quantiles(probs.iter().map(|p| p.p_brca1).collect()),
        p_brca2: quantiles(probs.iter().map(|p| p.p_brca2).collect()),
    })
}
