//! Extraction of mutation contexts from somatic variants.

pub mod extract;
pub mod indel;
pub mod schema;
pub mod seq;

use std::path::PathBuf;

use clap::Parser;
use rayon::prelude::*;

use crate::{
    common::{Assembly, Error},
    features::{FeatureMatrix, SampleFeatureRow},
    variants::{self, SampleInput},
};

use self::{
    extract::{ExtractConfig, Extractor},
    schema::{Family, IndelContext, CONTEXTS, N_CONTEXTS},
    seq::IndexedFasta,
};

/// Counts of mutation contexts of one sample, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct ContextVector {
    /// One count per category of [`schema::CONTEXTS`].
    counts: Vec<u64>,
}

impl ContextVector {
    /// All-zero vector of full schema length.
    pub fn zeros() -> Self {
        Self {
            counts: vec![0; N_CONTEXTS],
        }
    }

    /// Construct from counts in schema order.
    ///
    /// # Errors
    ///
    /// If the number of counts does not match the schema.
    pub fn from_counts(counts: Vec<u64>) -> Result<Self, Error> {
        if counts.len() != N_CONTEXTS {
            return Err(Error::SchemaMismatch(format!(
                "expected {} context counts, got {}",
                N_CONTEXTS,
                counts.len()
            )));
        }
        Ok(Self { counts })
    }

    /// The counts in schema order.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Count of the category with the given name.
    pub fn get(&self, name: &str) -> Option<u64> {
        schema::index_of(name).map(|idx| self.counts[idx])
    }

    /// Pairs of category name and count, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        CONTEXTS.iter().copied().zip(self.counts.iter().copied())
    }

    /// Sum of the counts of a family.
    pub fn family_total(&self, family: Family) -> u64 {
        self.counts[family.range()].iter().sum()
    }

    /// Number of indels in a repeat context (`indel.rep`).
    pub fn indel_rep_total(&self) -> u64 {
        self.counts[IndelContext::DelRep.index()] + self.counts[IndelContext::InsRep.index()]
    }

    pub(crate) fn increment(&mut self, idx: usize) {
        self.counts[idx] += 1;
    }
}

impl TryFrom<Vec<u64>> for ContextVector {
    type Error = Error;

    fn try_from(value: Vec<u64>) -> Result<Self, Self::Error> {
        Self::from_counts(value)
    }
}

impl From<ContextVector> for Vec<u64> {
    fn from(value: ContextVector) -> Self {
        value.counts
    }
}

/// Variant inputs and reference, shared by the `extract` and `run` commands.
#[derive(Parser, Debug, Clone)]
pub struct InputArgs {
    /// Path to sample sheet TSV with columns `sample`, `snv_indel`, `sv`.
    #[clap(long, conflicts_with = "sample")]
    pub path_sample_sheet: Option<PathBuf>,
    /// Sample identifier when processing a single sample.
    #[clap(long)]
    pub sample: Option<String>,
    /// Path to SNV/indel TSV of the single sample.
    #[clap(long)]
    pub path_small_variants: Option<PathBuf>,
    /// Path to SV TSV of the single sample.
    #[clap(long)]
    pub path_structural_variants: Option<PathBuf>,
    /// Path to the reference FASTA file, must be indexed with `samtools faidx`.
    #[clap(long)]
    pub path_reference: PathBuf,
    /// Assembly of the reference; variant contig names are adjusted to it.
    #[clap(long, value_enum)]
    pub assembly: Option<Assembly>,
}

impl InputArgs {
    /// The samples to process.
    ///
    /// # Errors
    ///
    /// If neither a sample sheet nor a complete single sample is given, or
    /// the sample sheet cannot be loaded.
    pub fn sample_inputs(&self) -> Result<Vec<SampleInput>, anyhow::Error> {
        match (
            &self.path_sample_sheet,
            &self.sample,
            &self.path_small_variants,
            &self.path_structural_variants,
        ) {
            (Some(path), None, None, None) => variants::load_sample_sheet(path),
            (None, Some(sample), Some(path_small), Some(path_structural)) => {
                Ok(vec![SampleInput {
                    sample: sample.clone(),
                    path_small_variants: path_small.clone(),
                    path_structural_variants: path_structural.clone(),
                }])
            }
            _ => anyhow::bail!(
                "either give --path-sample-sheet or all of --sample, \
                 --path-small-variants, --path-structural-variants"
            ),
        }
    }

    /// The extraction configuration.
    pub fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            assembly: self.assembly,
        }
    }
}

/// Command line arguments for `extract` command.
#[derive(Parser, Debug)]
#[command(about = "Extract mutation context counts into a feature matrix", long_about = None)]
pub struct Args {
    /// Variant inputs and reference.
    #[command(flatten)]
    pub input: InputArgs,
    /// Path to the output feature matrix TSV.
    #[clap(long)]
    pub path_output: PathBuf,
}

/// Load and extract the context vectors of all samples, in parallel.
///
/// # Errors
///
/// Fails on the first sample that cannot be loaded or extracted.
pub fn extract_samples(input: &InputArgs) -> Result<FeatureMatrix, anyhow::Error> {
    let sample_inputs = input.sample_inputs()?;
    tracing::info!("Using reference {}", input.path_reference.display());
    // Open once up front so that a broken reference fails before any sample.
    IndexedFasta::from_path(&input.path_reference)?;
    let config = input.extract_config();

    tracing::info!("Extracting contexts of {} sample(s) ...", sample_inputs.len());
    let before_extraction = std::time::Instant::now();
    let rows = sample_inputs
        .par_iter()
        .map_init(
            || IndexedFasta::from_path(&input.path_reference),
            |provider, sample_input| -> Result<SampleFeatureRow, anyhow::Error> {
                let provider = provider
                    .as_ref()
                    .map_err(|e| anyhow::anyhow!("problem opening reference: {:#}", e))?;
                extract_sample(provider, config, sample_input)
            },
        )
        .collect::<Result<Vec<_>, anyhow::Error>>()?;
    tracing::info!("... done extracting in {:?}", before_extraction.elapsed());

    FeatureMatrix::from_rows(rows)
}

fn extract_sample(
    provider: &IndexedFasta,
    config: ExtractConfig,
    sample_input: &SampleInput,
) -> Result<SampleFeatureRow, anyhow::Error> {
    let variants = sample_input.load()?;
    let contexts = Extractor::new(provider, config)
        .extract(&variants.small, &variants.structural)
        .map_err(|e| e.context(format!("problem with sample {}", &variants.sample)))?;
    tracing::debug!(
        "  {}: {} SNVs, {} indels, {} SVs",
        &variants.sample,
        contexts.family_total(Family::Snv),
        contexts.family_total(Family::Indel),
        contexts.family_total(Family::Sv)
    );
    Ok(SampleFeatureRow {
        sample: variants.sample,
        contexts,
    })
}

/// Main entry point for the `extract` command.
///
/// # Arguments
///
/// * `common_args` - Commonly used command line arguments.
/// * `args` - Command line arguments specific to `extract` command.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("  running command `extract`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let matrix = extract_samples(&args.input)?;
    matrix.save(&args.path_output)?;
    tracing::info!("Wrote feature matrix to {}", args.path_output.display());

    Ok(())
}
