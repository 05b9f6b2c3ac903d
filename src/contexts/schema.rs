//! The versioned mutation context schema.
//!
//! The order of [`CONTEXTS`] is the column order of the feature matrix and
//! the feature order the classifier was trained on.  Any change to the
//! categories or their order must bump [`SCHEMA_VERSION`].

use std::ops::Range;

use crate::variants::ds::SvType;

/// Version of the context schema.
pub const SCHEMA_VERSION: &str = "chord-contexts/v1";

/// Number of context categories.
pub const N_CONTEXTS: usize = 32;

/// Names of the context categories, in schema order.
pub const CONTEXTS: [&str; N_CONTEXTS] = [
    // SNV substitution types, pyrimidine reference.
    "snv.C>A",
    "snv.C>G",
    "snv.C>T",
    "snv.T>A",
    "snv.T>C",
    "snv.T>G",
    // Indels by flanking sequence context.
    "del.rep",
    "ins.rep",
    "del.mh.bimh.1",
    "del.mh.bimh.2.5",
    "ins.mh",
    "del.none",
    "ins.none",
    // Structural variants by type and length.
    "DEL_0e00_1e03_bp",
    "DEL_1e03_1e04_bp",
    "DEL_1e04_1e05_bp",
    "DEL_1e05_1e06_bp",
    "DEL_1e06_1e07_bp",
    "DEL_1e07_Inf_bp",
    "DUP_0e00_1e03_bp",
    "DUP_1e03_1e04_bp",
    "DUP_1e04_1e05_bp",
    "DUP_1e05_1e06_bp",
    "DUP_1e06_1e07_bp",
    "DUP_1e07_Inf_bp",
    "INV_0e00_1e03_bp",
    "INV_1e03_1e04_bp",
    "INV_1e04_1e05_bp",
    "INV_1e05_1e06_bp",
    "INV_1e06_1e07_bp",
    "INV_1e07_Inf_bp",
    "TRA",
];

/// Mutation type families; each occupies a contiguous range of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Family {
    /// Single nucleotide variants.
    Snv,
    /// Small insertions and deletions.
    Indel,
    /// Structural variants.
    Sv,
}

impl Family {
    /// Range of the family's categories in the schema.
    pub fn range(&self) -> Range<usize> {
        match self {
            Family::Snv => 0..6,
            Family::Indel => 6..13,
            Family::Sv => 13..N_CONTEXTS,
        }
    }
}

/// Pyrimidine-normalised SNV substitution type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum SnvType {
    /// C>A (and G>T).
    CA,
    /// C>G (and G>C).
    CG,
    /// C>T (and G>A).
    CT,
    /// T>A (and A>T).
    TA,
    /// T>C (and A>G).
    TC,
    /// T>G (and A>C).
    TG,
}

impl SnvType {
    /// Classify a substitution; `None` if either base is not ACGT or the
    /// bases are equal.
    pub fn from_bases(ref_base: u8, alt_base: u8) -> Option<Self> {
        let (ref_base, alt_base) = match ref_base.to_ascii_uppercase() {
            b'A' | b'G' => (
                complement(ref_base.to_ascii_uppercase())?,
                complement(alt_base.to_ascii_uppercase())?,
            ),
            _ => (ref_base.to_ascii_uppercase(), alt_base.to_ascii_uppercase()),
        };
        match (ref_base, alt_base) {
            (b'C', b'A') => Some(SnvType::CA),
            (b'C', b'G') => Some(SnvType::CG),
            (b'C', b'T') => Some(SnvType::CT),
            (b'T', b'A') => Some(SnvType::TA),
            (b'T', b'C') => Some(SnvType::TC),
            (b'T', b'G') => Some(SnvType::TG),
            _ => None,
        }
    }

    /// Index in the schema.
    pub fn index(&self) -> usize {
        Family::Snv.range().start + *self as usize
    }
}

fn complement(base: u8) -> Option<u8> {
    match base {
        b'A' => Some(b'T'),
        b'C' => Some(b'G'),
        b'G' => Some(b'C'),
        b'T' => Some(b'A'),
        _ => None,
    }
}

/// Indel context category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum IndelContext {
    /// Deletion within a repeat.
    DelRep,
    /// Insertion within a repeat.
    InsRep,
    /// Deletion with 1bp flanking microhomology.
    DelMh1,
    /// Deletion with 2bp or more flanking microhomology.
    DelMh2To5,
    /// Insertion with flanking microhomology.
    InsMh,
    /// Deletion without repeat or microhomology.
    DelNone,
    /// Insertion without repeat or microhomology.
    InsNone,
}

impl IndelContext {
    /// Index in the schema.
    pub fn index(&self) -> usize {
        Family::Indel.range().start + *self as usize
    }

    /// Whether the context is a microhomology category.
    pub fn is_microhomology(&self) -> bool {
        matches!(
            self,
            IndelContext::DelMh1 | IndelContext::DelMh2To5 | IndelContext::InsMh
        )
    }

    /// Whether the context is a repeat category (`indel.rep`).
    pub fn is_repeat(&self) -> bool {
        matches!(self, IndelContext::DelRep | IndelContext::InsRep)
    }
}

/// Lower bounds of the SV length bins, the first bin starts at 0.
const SV_LEN_BOUNDS: [u64; 5] = [1_000, 10_000, 100_000, 1_000_000, 10_000_000];

/// Number of length bins for length-binned SV types.
const N_SV_LEN_BINS: usize = SV_LEN_BOUNDS.len() + 1;

/// Index of the length bin of an SV with the given absolute length.
fn sv_len_bin(len: u64) -> usize {
    SV_LEN_BOUNDS.iter().filter(|bound| **bound <= len).count()
}

/// Index of an SV in the schema.
///
/// # Arguments
///
/// * `sv_type` - The SV type.
/// * `sv_len` - The SV length, ignored for translocations.
///
/// # Returns
///
/// The schema index, `None` if a length-binned SV lacks a length.
pub fn sv_index(sv_type: SvType, sv_len: Option<i64>) -> Option<usize> {
    let start = Family::Sv.range().start;
    let offset = match sv_type {
        SvType::Del => 0,
        SvType::Dup => N_SV_LEN_BINS,
        SvType::Inv => 2 * N_SV_LEN_BINS,
        SvType::Tra => return Some(start + 3 * N_SV_LEN_BINS),
    };
    sv_len.map(|len| start + offset + sv_len_bin(len.unsigned_abs()))
}

/// Index of the category with the given name.
pub fn index_of(name: &str) -> Option<usize> {
    CONTEXTS.iter().position(|context| *context == name)
}
