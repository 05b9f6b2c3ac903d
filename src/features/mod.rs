//! The per-sample feature matrix.
//!
//! One row per sample, one column per context category.  The TSV
//! representation has the header `sample` followed by the category names in
//! schema order.

use std::{
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use strum::IntoEnumIterator as _;

use crate::{
    common::Error,
    contexts::{
        schema::{Family, CONTEXTS, N_CONTEXTS},
        ContextVector,
    },
};

/// Context counts of one sample.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SampleFeatureRow {
    /// Sample identifier.
    pub sample: String,
    /// The sample's context counts.
    pub contexts: ContextVector,
}

/// Transformation of the counts into classifier input.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureTransform {
    /// Use the raw counts.
    #[default]
    Counts,
    /// Divide each count by the total of its family.
    Relative,
}

impl FeatureTransform {
    /// Apply the transformation.
    ///
    /// Families without any variant stay all-zero.
    pub fn apply(&self, contexts: &ContextVector) -> Vec<f64> {
        let counts = contexts.counts();
        match self {
            FeatureTransform::Counts => counts.iter().map(|count| *count as f64).collect(),
            FeatureTransform::Relative => {
                let mut result = vec![0.0; N_CONTEXTS];
                for family in Family::iter() {
                    let total = contexts.family_total(family);
                    if total == 0 {
                        continue;
                    }
                    for idx in family.range() {
                        result[idx] = counts[idx] as f64 / total as f64;
                    }
                }
                result
            }
        }
    }
}

/// Stack of sample rows sharing the context schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureMatrix {
    /// The rows, in input order.
    rows: Vec<SampleFeatureRow>,
}

impl FeatureMatrix {
    /// Construct from rows.
    ///
    /// # Errors
    ///
    /// If a sample identifier occurs twice.
    pub fn from_rows(rows: Vec<SampleFeatureRow>) -> Result<Self, anyhow::Error> {
        let mut seen = rustc_hash::FxHashSet::default();
        for row in &rows {
            if !seen.insert(row.sample.as_str()) {
                anyhow::bail!("duplicate sample {:?} in feature matrix", &row.sample);
            }
        }
        Ok(Self { rows })
    }

    /// The rows of the matrix.
    pub fn rows(&self) -> &[SampleFeatureRow] {
        &self.rows
    }

    /// The header of the TSV representation.
    pub fn header() -> Vec<&'static str> {
        std::iter::once("sample").chain(CONTEXTS).collect()
    }

    /// Write as TSV.
    ///
    /// # Errors
    ///
    /// If anything goes wrong, it returns a generic `anyhow::Error`.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), anyhow::Error> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        csv_writer.write_record(Self::header())?;
        for row in &self.rows {
            csv_writer.write_record(
                std::iter::once(row.sample.clone())
                    .chain(row.contexts.counts().iter().map(|count| count.to_string())),
            )?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Read from TSV.
    ///
    /// # Errors
    ///
    /// Header that does not match the context schema, missing or
    /// non-integer counts, duplicate samples.
    pub fn read_tsv<R: Read>(reader: R, source_name: &str) -> Result<Self, anyhow::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header = csv_reader
            .headers()
            .map_err(|e| anyhow::anyhow!("problem reading header of {}: {}", source_name, e))?;
        let expected = Self::header();
        if header.iter().collect::<Vec<_>>() != expected {
            let differing = header
                .iter()
                .zip(expected.iter())
                .position(|(actual, expected)| actual != *expected);
            let message = match differing {
                Some(idx) => format!(
                    "column {} of {} is {:?}, expected {:?}",
                    idx + 1,
                    source_name,
                    &header[idx],
                    expected[idx]
                ),
                None => format!(
                    "{} has {} columns, expected {}",
                    source_name,
                    header.len(),
                    expected.len()
                ),
            };
            return Err(Error::SchemaMismatch(message).into());
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|e| anyhow::anyhow!("problem reading record: {}", e))?;
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            let malformed = |message: String| Error::MalformedInput {
                source_name: source_name.to_string(),
                line,
                message,
            };
            if record.len() != expected.len() {
                return Err(malformed(format!(
                    "expected {} columns, found {}",
                    expected.len(),
                    record.len()
                ))
                .into());
            }
            let counts = record
                .iter()
                .skip(1)
                .zip(CONTEXTS)
                .map(|(value, name)| {
                    value
                        .trim()
                        .parse::<u64>()
                        .map_err(|e| malformed(format!("invalid count {value:?} for {name}: {e}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(SampleFeatureRow {
                sample: record[0].to_string(),
                contexts: ContextVector::from_counts(counts)?,
            });
        }

        Self::from_rows(rows)
    }

    /// Write TSV file.
    ///
    /// # Errors
    ///
    /// If anything goes wrong, it returns a generic `anyhow::Error`.
    pub fn save<P>(&self, path: P) -> Result<(), anyhow::Error>
    where
        P: AsRef<Path>,
    {
        let writer = std::fs::File::create(path.as_ref())
            .map_err(|e| anyhow::anyhow!("problem creating {}: {}", path.as_ref().display(), e))
            .map(BufWriter::new)?;
        self.write_tsv(writer)
    }

    /// Load TSV file.
    ///
    /// # Errors
    ///
    /// If anything goes wrong, it returns a generic `anyhow::Error`.
    pub fn load<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        let source_name = format!("{}", path.as_ref().display());
        let reader = std::fs::File::open(path.as_ref())
            .map_err(|e| anyhow::anyhow!("problem opening file {}: {}", &source_name, e))
            .map(BufReader::new)?;
        Self::read_tsv(reader, &source_name)
    }
}
