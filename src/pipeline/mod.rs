//! Extraction and prediction in one go.

use std::path::PathBuf;

use clap::Parser;

use crate::{
    classify::{self, model::Model, BootstrapArgs, Classifier},
    contexts::{self, InputArgs},
};

/// Command line arguments for `run` command.
#[derive(Parser, Debug)]
#[command(about = "Extract contexts and predict HRD status", long_about = None)]
pub struct Args {
    /// Variant inputs and reference.
    #[command(flatten)]
    pub input: InputArgs,
    /// Path to the random forest model JSON.
    #[clap(long)]
    pub path_model: PathBuf,
    /// Path to the output feature matrix TSV.
    #[clap(long)]
    pub path_output_features: PathBuf,
    /// Path to the output prediction TSV.
    #[clap(long)]
    pub path_output: PathBuf,
    /// Bootstrap options.
    #[command(flatten)]
    pub bootstrap: BootstrapArgs,
}

/// Main entry point for the `run` command.
///
/// # Arguments
///
/// * `common_args` - Commonly used command line arguments.
/// * `args` - Command line arguments specific to `run` command.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("  running command `run`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    // Load the model first so a broken model fails before the extraction.
    let model = Model::load(&args.path_model)?;

    let matrix = contexts::extract_samples(&args.input)?;
    matrix.save(&args.path_output_features)?;
    tracing::info!(
        "Wrote feature matrix to {}",
        args.path_output_features.display()
    );

    let results = Classifier::new(&model, args.bootstrap.config()).classify_all(&matrix)?;
    classify::save_results(&results, &args.path_output)?;

    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::classify::BootstrapArgs;
    use crate::contexts::InputArgs;
    use crate::features::FeatureMatrix;

    fn args(tmp_dir: &std::path::Path, path_model: &str) -> super::Args {
        super::Args {
            input: InputArgs {
                path_sample_sheet: Some("tests/data/variants/samples.tsv".into()),
                sample: None,
                path_small_variants: None,
                path_structural_variants: None,
                path_reference: "tests/data/genome/toy.fa".into(),
                assembly: None,
            },
            path_model: path_model.into(),
            path_output_features: tmp_dir.join("features.tsv"),
            path_output: tmp_dir.join("predictions.tsv"),
            bootstrap: BootstrapArgs {
                bootstrap: false,
                bootstrap_iterations: 20,
                seed: 0,
            },
        }
    }

    #[tracing_test::traced_test]
    #[test]
    fn run_smoke() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::tempdir()?;
        let common = crate::common::Args {
            verbose: clap_verbosity_flag::Verbosity::new(1, 0),
        };
        let args = args(tmp_dir.path(), "tests/data/model/toy_forest.json");

        super::run(&common, &args)?;

        let matrix = FeatureMatrix::load(&args.path_output_features)?;
        assert_eq!(matrix.rows().len(), 2);
        let text = std::fs::read_to_string(&args.path_output)?;
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "sample\tp_hrd\tp_BRCA1\tp_BRCA2\thr_status\thrd_type\tremarks",
                "sample_a\t0.250\t0.000\t0.250\tcannot_be_determined\tnone\t<50 indels",
                "sample_b\t0.250\t0.000\t0.250\tcannot_be_determined\tnone\t<50 indels",
            ]
        );

        Ok(())
    }

    #[test]
    fn run_invalid_model() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::tempdir()?;
        let common = crate::common::Args {
            verbose: clap_verbosity_flag::Verbosity::new(1, 0),
        };
        let args = args(tmp_dir.path(), "tests/data/features/matrix.tsv");

        assert!(super::run(&common, &args).is_err());
        assert!(!args.path_output_features.exists());

        Ok(())
    }
}
