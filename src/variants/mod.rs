//! Loading of per-sample somatic variants.

pub mod ds;
pub mod io;

use std::{
    io::BufReader,
    path::{Path, PathBuf},
};

use self::ds::{SmallVariant, StructuralVariant};

/// All variants of one sample.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleVariants {
    /// Sample identifier.
    pub sample: String,
    /// SNVs and indels.
    pub small: Vec<SmallVariant>,
    /// Structural variants.
    pub structural: Vec<StructuralVariant>,
}

/// Input files of one sample.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SampleInput {
    /// Sample identifier.
    pub sample: String,
    /// Path to the SNV/indel TSV file.
    #[serde(alias = "snv_indel")]
    pub path_small_variants: PathBuf,
    /// Path to the SV TSV file.
    #[serde(alias = "sv")]
    pub path_structural_variants: PathBuf,
}

impl SampleInput {
    /// Load the variants of the sample.
    ///
    /// # Errors
    ///
    /// If anything goes wrong, it returns a generic `anyhow::Error`.
    pub fn load(&self) -> Result<SampleVariants, anyhow::Error> {
        tracing::debug!("loading variants of sample {}", &self.sample);
        Ok(SampleVariants {
            sample: self.sample.clone(),
            small: io::load_small_variants(&self.path_small_variants)?,
            structural: io::load_structural_variants(&self.path_structural_variants)?,
        })
    }
}

/// Load a sample sheet.
///
/// The sample sheet is a TSV file with the header `sample`, `snv_indel`,
/// `sv`.  Relative paths are interpreted relative to the directory of the
/// sample sheet.
///
/// # Arguments
///
/// * `path` - Path to the sample sheet.
///
/// # Returns
///
/// The sample inputs in sheet order.
///
/// # Errors
///
/// If the file cannot be read, a row is malformed, or a sample identifier
/// occurs twice.
pub fn load_sample_sheet<P>(path: P) -> Result<Vec<SampleInput>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let base_dir = path
        .as_ref()
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let reader = std::fs::File::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("problem opening file: {}", e))
        .map(BufReader::new)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);
    let mut result: Vec<SampleInput> = Vec::new();
    for record in csv_reader.deserialize() {
        let record: SampleInput =
            record.map_err(|e| anyhow::anyhow!("problem parsing record: {}", e))?;
        if result.iter().any(|other| other.sample == record.sample) {
            anyhow::bail!("duplicate sample {:?} in sample sheet", &record.sample);
        }
        result.push(SampleInput {
            path_small_variants: base_dir.join(&record.path_small_variants),
            path_structural_variants: base_dir.join(&record.path_structural_variants),
            ..record
        });
    }

    Ok(result)
}
