//! Classification of samples into HRD status and subtype.

pub mod bootstrap;
pub mod model;
pub mod result;
pub mod rules;

use std::{
    io::BufWriter,
    path::{Path, PathBuf},
};

use clap::Parser;
use rayon::prelude::*;

use crate::features::{FeatureMatrix, SampleFeatureRow};

use self::{
    bootstrap::BootstrapConfig,
    model::Model,
    result::{HrStatus, PredictionResult},
    rules::Evidence,
};

/// Bootstrap options, shared by the `predict` and `run` commands.
#[derive(Parser, Debug, Clone)]
pub struct BootstrapArgs {
    /// Report bootstrap quantiles of the probabilities.
    #[clap(long)]
    pub bootstrap: bool,
    /// Number of bootstrap iterations.
    #[clap(long, default_value_t = bootstrap::DEFAULT_ITERATIONS)]
    pub bootstrap_iterations: usize,
    /// Seed for the bootstrap resampling.
    #[clap(long, default_value_t = 0)]
    pub seed: u64,
}

impl BootstrapArgs {
    /// The bootstrap configuration, if enabled.
    pub fn config(&self) -> Option<BootstrapConfig> {
        self.bootstrap.then_some(BootstrapConfig {
            iterations: self.bootstrap_iterations,
            seed: self.seed,
        })
    }
}

/// Command line arguments for `predict` command.
#[derive(Parser, Debug)]
#[command(about = "Predict HRD status from a feature matrix", long_about = None)]
pub struct Args {
    /// Path to the random forest model JSON.
    #[clap(long)]
    pub path_model: PathBuf,
    /// Path to the feature matrix TSV.
    #[clap(long)]
    pub path_features: PathBuf,
    /// Path to the output prediction TSV.
    #[clap(long)]
    pub path_output: PathBuf,
    /// Bootstrap options.
    #[command(flatten)]
    pub bootstrap: BootstrapArgs,
}

/// Classification of feature rows.
///
/// This is mainly used to encapsulate the functionality.  Creating new such
/// objects is very straightforward and cheap.
pub struct Classifier<'a> {
    /// The random forest model.
    model: &'a Model,
    /// Bootstrap configuration, bootstrapping is disabled if `None`.
    bootstrap: Option<BootstrapConfig>,
}

impl<'a> Classifier<'a> {
    /// Create a new `Classifier`.
    pub fn new(model: &'a Model, bootstrap: Option<BootstrapConfig>) -> Self {
        Self { model, bootstrap }
    }

    /// Classify one sample.
    ///
    /// # Errors
    ///
    /// If the bootstrap fails.
    pub fn classify(&self, row: &SampleFeatureRow) -> Result<PredictionResult, anyhow::Error> {
        let probs = self.model.predict(&row.contexts);
        let quantiles = self
            .bootstrap
            .as_ref()
            .map(|config| bootstrap::run(self.model, &row.contexts, config))
            .transpose()
            .map_err(|e| e.context(format!("problem bootstrapping sample {}", &row.sample)))?;
        Ok(rules::evaluate(
            &row.sample,
            probs,
            &Evidence::from(&row.contexts),
            quantiles,
        ))
    }

    /// Classify all samples of the matrix, in parallel.
    ///
    /// # Returns
    ///
    /// One result per row, in row order.
    ///
    /// # Errors
    ///
    /// If anything goes wrong, it returns a generic `anyhow::Error`.
    pub fn classify_all(
        &self,
        matrix: &FeatureMatrix,
    ) -> Result<Vec<PredictionResult>, anyhow::Error> {
        tracing::info!("Classifying {} sample(s) ...", matrix.rows().len());
        let before_classification = std::time::Instant::now();
        let results = matrix
            .rows()
            .par_iter()
            .map(|row| self.classify(row))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(
            "... done classifying in {:?}; {} of {} HR deficient",
            before_classification.elapsed(),
            results
                .iter()
                .filter(|result| result.hr_status == HrStatus::Hrd)
                .count(),
            results.len()
        );
        Ok(results)
    }
}

/// Write the prediction TSV file.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn save_results<P>(results: &[PredictionResult], path: P) -> Result<(), anyhow::Error>
where
    P: AsRef<Path>,
{
    let writer = std::fs::File::create(path.as_ref())
        .map_err(|e| anyhow::anyhow!("problem creating {}: {}", path.as_ref().display(), e))
        .map(BufWriter::new)?;
    result::write_tsv(results, writer)?;
    tracing::info!("Wrote predictions to {}", path.as_ref().display());
    Ok(())
}

/// Main entry point for the `predict` command.
///
/// # Arguments
///
/// * `common_args` - Commonly used command line arguments.
/// * `args` - Command line arguments specific to `predict` command.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("  running command `predict`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let model = Model::load(&args.path_model)?;
    let matrix = FeatureMatrix::load(&args.path_features)?;
    let results = Classifier::new(&model, args.bootstrap.config()).classify_all(&matrix)?;
    save_results(&results, &args.path_output)?;

    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{
        bootstrap::BootstrapConfig,
        model::{test::toy_model, Model},
        result::{HrStatus, HrdType, Remark},
        BootstrapArgs, Classifier,
    };
    use crate::features::FeatureMatrix;

    #[rstest::rstest]
    fn classify_all(toy_model: Model) -> Result<(), anyhow::Error> {
        let matrix = FeatureMatrix::load("tests/data/features/matrix.tsv")?;

        let results = Classifier::new(&toy_model, None).classify_all(&matrix)?;

        assert_eq!(results.len(), 2);
        let hrd = &results[0];
        assert_eq!(hrd.sample, "hrd_sample");
        assert_eq!(hrd.p_hrd, 1.0);
        assert_eq!(hrd.hr_status, HrStatus::Hrd);
        assert_eq!(hrd.hrd_type, HrdType::Brca1);
        assert!(hrd.remarks.is_empty());
        assert!(hrd.bootstrap.is_none());
        let proficient = &results[1];
        assert_eq!(proficient.sample, "proficient");
        assert_eq!(proficient.p_hrd, 0.0);
        assert_eq!(proficient.hr_status, HrStatus::HrProficient);
        assert_eq!(proficient.hrd_type, HrdType::None);

        Ok(())
    }

    #[rstest::rstest]
    fn classify_all_bootstrap(toy_model: Model) -> Result<(), anyhow::Error> {
        let matrix = FeatureMatrix::load("tests/data/features/matrix.tsv")?;

        let results =
            Classifier::new(&toy_model, Some(BootstrapConfig::default())).classify_all(&matrix)?;

        for result in &results {
            let quantiles = result.bootstrap.expect("bootstrap requested");
            assert!(quantiles.p_hrd.q5 <= quantiles.p_hrd.q50);
            assert!(quantiles.p_hrd.q50 <= quantiles.p_hrd.q95);
        }

        Ok(())
    }

    #[rstest::rstest]
    fn classify_empty_sample(toy_model: Model) -> Result<(), anyhow::Error> {
        let row = crate::features::SampleFeatureRow {
            sample: "empty".into(),
            contexts: crate::contexts::ContextVector::zeros(),
        };

        let result = Classifier::new(&toy_model, None).classify(&row)?;

        assert_eq!(result.hr_status, HrStatus::CannotBeDetermined);
        assert_eq!(result.remarks, vec![Remark::FewIndels]);

        Ok(())
    }

    #[test]
    fn bootstrap_args_config() {
        let mut args = BootstrapArgs {
            bootstrap: false,
            bootstrap_iterations: 20,
            seed: 3,
        };
        assert_eq!(args.config(), None);

        args.bootstrap = true;
        assert_eq!(
            args.config(),
            Some(BootstrapConfig {
                iterations: 20,
                seed: 3
            })
        );
    }

    #[test]
    fn run_smoke() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::tempdir()?;
        let common = crate::common::Args {
            verbose: clap_verbosity_flag::Verbosity::new(1, 0),
        };
        let args = super::Args {
            path_model: "tests/data/model/toy_forest.json".into(),
            path_features: "tests/data/features/matrix.tsv".into(),
            path_output: tmp_dir.path().join("predictions.tsv"),
            bootstrap: BootstrapArgs {
                bootstrap: true,
                bootstrap_iterations: 5,
                seed: 0,
            },
        };

        super::run(&common, &args)?;

        let text = std::fs::read_to_string(&args.path_output)?;
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("sample\tp_hrd\tp_BRCA1\tp_BRCA2"));
        assert!(lines[1].starts_with("hrd_sample\t1.000\t0.750\t0.250\tHR_deficient\tBRCA1_type\t"));

        Ok(())
    }
}
