//! Domain errors raised while loading variants, extracting contexts and
//! classifying samples.

use thiserror::Error;

/// Errors that must stop processing instead of silently corrupting the
/// context vectors or the predictions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Missing or unparsable column in a tabular input.
    #[error("malformed input {source_name}, line {line}: {message}")]
    MalformedInput {
        /// Name of the input (usually the file path).
        source_name: String,
        /// 1-based line number.
        line: u64,
        /// What went wrong.
        message: String,
    },
    /// SV type outside of DEL, DUP, INV, TRA.
    #[error("unsupported SV type {0:?}, expected one of DEL, DUP, INV, TRA")]
    UnsupportedSvType(String),
    /// Length-binned SV without a length.
    #[error("SV of type {0} has no length")]
    MissingSvLength(String),
    /// Allele that cannot be interpreted as DNA.
    #[error("invalid allele {allele:?} at {chrom}:{pos}")]
    InvalidAllele {
        /// Chromosome of the variant.
        chrom: String,
        /// 1-based position of the variant.
        pos: u64,
        /// The offending allele.
        allele: String,
    },
    /// Position that lies outside of the reference contig.
    #[error("position {chrom}:{pos} is outside of the reference contig")]
    PositionOutOfRange {
        /// Contig name as used for the reference.
        chrom: String,
        /// 1-based position.
        pos: u64,
    },
    /// Feature columns do not match the context schema expected by the model.
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),
    /// Inconsistent model artifact.
    #[error("invalid model: {0}")]
    InvalidModel(String),
}
