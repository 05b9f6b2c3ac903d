//! Canonical variant records.

use crate::common::Error;

/// Enumeration for SV type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum SvType {
    /// Deletion.
    Del,
    /// Tandem duplication.
    Dup,
    /// Inversion.
    Inv,
    /// Translocation, length is meaningless.
    Tra,
}

impl std::str::FromStr for SvType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEL" => Ok(SvType::Del),
            "DUP" => Ok(SvType::Dup),
            "INV" => Ok(SvType::Inv),
            "TRA" => Ok(SvType::Tra),
            _ => Err(Error::UnsupportedSvType(s.to_string())),
        }
    }
}

/// Representation of a structural variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct StructuralVariant {
    /// SV type.
    pub sv_type: SvType,
    /// SV length; callers disagree on the sign of deletion lengths so only
    /// the absolute value is meaningful.  Absent for translocations.
    pub sv_len: Option<i64>,
}

impl StructuralVariant {
    /// Construct a new structural variant.
    pub fn new(sv_type: SvType, sv_len: Option<i64>) -> Self {
        Self { sv_type, sv_len }
    }
}

/// Kind of a small variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmallVariantKind {
    /// Single nucleotide variant.
    Snv,
    /// Deletion of bases after the anchor base.
    Deletion,
    /// Insertion of bases after the anchor base.
    Insertion,
    /// Multi-nucleotide substitution or complex indel, not counted.
    Other,
}

/// Representation of a SNV or indel in VCF convention (indels carry the
/// preceding anchor base in both alleles).
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SmallVariant {
    /// Chromosome.
    pub chrom: String,
    /// 1-based position.
    pub pos: u64,
    /// Reference allele.
    pub ref_allele: String,
    /// Alternative allele.
    pub alt_allele: String,
}

impl SmallVariant {
    /// Construct a new small variant, alleles are upper-cased.
    pub fn new(chrom: &str, pos: u64, ref_allele: &str, alt_allele: &str) -> Self {
        Self {
            chrom: chrom.to_string(),
            pos,
            ref_allele: ref_allele.to_ascii_uppercase(),
            alt_allele: alt_allele.to_ascii_uppercase(),
        }
    }

    /// Return the kind of the variant, based on the allele lengths.
    ///
    /// Indels must be a single anchor base on one side, shared with the first
    /// base of the other allele.  Anything else is `Other`.
    pub fn kind(&self) -> SmallVariantKind {
        let (ref_len, alt_len) = (self.ref_allele.len(), self.alt_allele.len());
        let shares_anchor =
            self.ref_allele.as_bytes().first() == self.alt_allele.as_bytes().first();
        match ref_len.cmp(&alt_len) {
            std::cmp::Ordering::Equal if ref_len == 1 => SmallVariantKind::Snv,
            std::cmp::Ordering::Equal => SmallVariantKind::Other,
            _ if std::cmp::min(ref_len, alt_len) != 1 || !shares_anchor => {
                SmallVariantKind::Other
            }
            std::cmp::Ordering::Greater => SmallVariantKind::Deletion,
            std::cmp::Ordering::Less => SmallVariantKind::Insertion,
        }
    }

    /// Inserted or deleted sequence, i.e., the longer allele without the
    /// anchor base.  `None` for non-indels.
    pub fn indel_seq(&self) -> Option<&str> {
        match self.kind() {
            SmallVariantKind::Deletion => Some(&self.ref_allele[1..]),
            SmallVariantKind::Insertion => Some(&self.alt_allele[1..]),
            _ => None,
        }
    }
}
