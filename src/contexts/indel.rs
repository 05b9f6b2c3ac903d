//! Classification of indels by their flanking sequence.
//!
//! An indel is a *repeat* if the indel sequence occurs again directly 3' of
//! the breakpoint.  Otherwise, indels of 2bp or more are checked for
//! *microhomology*: the longest prefix of the indel sequence matching the 3'
//! flank or the longest suffix matching the 5' flank.  Everything else is
//! classified as *none*.

use crate::{
    common::Error,
    variants::ds::{SmallVariant, SmallVariantKind},
};

use super::{schema::IndelContext, seq::SequenceProvider};

/// Flanking sequence context of one indel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndelFlanks {
    /// Whether this is a deletion (else insertion).
    pub is_deletion: bool,
    /// The inserted/deleted sequence.
    pub seq: Vec<u8>,
    /// Up to `seq.len()` bases 5' of the breakpoint, ending with the anchor base.
    pub five_prime: Vec<u8>,
    /// Up to `seq.len()` bases 3' of the breakpoint.
    pub three_prime: Vec<u8>,
}

impl IndelFlanks {
    /// Fetch the flanks of the given indel.
    ///
    /// # Arguments
    ///
    /// * `variant` - The indel, in VCF anchor base convention.
    /// * `contig` - Name of the contig in the reference.
    /// * `provider` - Access to the reference sequence.
    ///
    /// # Errors
    ///
    /// If `variant` is not an indel or the reference lookup fails, with
    /// `Error::PositionOutOfRange` if the flanks lie beyond the contig.
    pub fn fetch(
        variant: &SmallVariant,
        contig: &str,
        provider: &dyn SequenceProvider,
    ) -> Result<Self, anyhow::Error> {
        let is_deletion = match variant.kind() {
            SmallVariantKind::Deletion => true,
            SmallVariantKind::Insertion => false,
            _ => anyhow::bail!("not an indel: {:?}", variant),
        };
        let seq = variant
            .indel_seq()
            .map(|seq| seq.as_bytes().to_vec())
            .unwrap_or_default();
        let len = seq.len() as u64;
        let pos = variant.pos;

        let out_of_range = || Error::PositionOutOfRange {
            chrom: contig.to_string(),
            pos,
        };
        let after_anchor = pos.checked_add(1).ok_or_else(out_of_range)?;
        let three_prime_start = if is_deletion {
            after_anchor.checked_add(len).ok_or_else(out_of_range)?
        } else {
            after_anchor
        };
        let three_prime = provider.fetch(contig, three_prime_start, len)?;
        let five_prime_start = std::cmp::max(1, after_anchor.saturating_sub(len));
        let five_prime = provider.fetch(contig, five_prime_start, after_anchor - five_prime_start)?;

        Ok(Self {
            is_deletion,
            seq,
            five_prime,
            three_prime,
        })
    }

    /// Whether the indel sequence is repeated directly 3' of the breakpoint.
    pub fn is_repeat(&self) -> bool {
        self.three_prime == self.seq
    }

    /// Number of bases of flanking microhomology.
    pub fn microhomology_len(&self) -> usize {
        let forward = self
            .seq
            .iter()
            .zip(self.three_prime.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let backward = self
            .seq
            .iter()
            .rev()
            .zip(self.five_prime.iter().rev())
            .take_while(|(a, b)| a == b)
            .count();
        std::cmp::max(forward, backward)
    }

    /// Derive the indel context category.
    pub fn context(&self) -> IndelContext {
        if self.is_repeat() {
            return if self.is_deletion {
                IndelContext::DelRep
            } else {
                IndelContext::InsRep
            };
        }

        // A 1bp indel cannot have partial homology, only a repeat.
        let mh_len = if self.seq.len() >= 2 {
            self.microhomology_len()
        } else {
            0
        };
        match (self.is_deletion, mh_len) {
            (true, 0) => IndelContext::DelNone,
            (true, 1) => IndelContext::DelMh1,
            (true, _) => IndelContext::DelMh2To5,
            (false, 0) => IndelContext::InsNone,
            (false, _) => IndelContext::InsMh,
        }
    }
}

/// Classify one indel.
///
/// # Errors
///
/// If `variant` is not an indel or the reference lookup fails.
pub fn classify(
    variant: &SmallVariant,
    contig: &str,
    provider: &dyn SequenceProvider,
) -> Result<IndelContext, anyhow::Error> {
    let flanks = IndelFlanks::fetch(variant, contig, provider)?;
    let context = flanks.context();
    tracing::trace!(
        "{}:{} {}>{} -> {:?}",
        &variant.chrom,
        variant.pos,
        &variant.ref_allele,
        &variant.alt_allele,
        context
    );
    Ok(context)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{classify, IndelFlanks};
    use crate::common::Error;
    use crate::contexts::{schema::IndelContext, seq::InMemoryGenome};
    use crate::variants::ds::SmallVariant;

    fn genome(seq: &str) -> InMemoryGenome {
        let mut genome = InMemoryGenome::new();
        genome.insert("1", seq.as_bytes());
        genome
    }

    #[rstest::rstest]
    // CAG deleted, followed by CAG
    #[case("TTCAGCAGCAGTT", 2, "TCAG", "T", IndelContext::DelRep)]
    // 1bp deletion in homopolymer
    #[case("ACCT", 1, "AC", "A", IndelContext::DelRep)]
    // ACGTT deleted, 3' flank ACGGG shares ACG
    #[case("GGACGTTACGGG", 2, "GACGTT", "G", IndelContext::DelMh2To5)]
    // AGC deleted, 3' flank ATT shares A
    #[case("GGAGCATT", 2, "GAGC", "G", IndelContext::DelMh1)]
    // TCA deleted, 5' flank GCA shares CA
    #[case("GCATCAGGG", 3, "ATCA", "A", IndelContext::DelMh2To5)]
    // ACG deleted, no shared bases
    #[case("TTACGCCC", 2, "TACG", "T", IndelContext::DelNone)]
    // 1bp deletion, no repeat
    #[case("ACGT", 1, "AC", "A", IndelContext::DelNone)]
    // CAG inserted before CAG
    #[case("GCAGCAT", 1, "G", "GCAG", IndelContext::InsRep)]
    // CAG inserted before CAT
    #[case("GCATTT", 1, "G", "GCAG", IndelContext::InsMh)]
    // CA inserted before TT
    #[case("GTTT", 1, "G", "GCA", IndelContext::InsNone)]
    fn classify_indel(
        #[case] seq: &str,
        #[case] pos: u64,
        #[case] ref_allele: &str,
        #[case] alt_allele: &str,
        #[case] expected: IndelContext,
    ) -> Result<(), anyhow::Error> {
        let genome = genome(seq);
        let variant = SmallVariant::new("1", pos, ref_allele, alt_allele);

        assert_eq!(classify(&variant, "1", &genome)?, expected);

        Ok(())
    }

    #[test]
    fn flanks_of_deletion() -> Result<(), anyhow::Error> {
        let genome = genome("GGACGTTACGGG");
        let variant = SmallVariant::new("1", 2, "GACGTT", "G");

        let flanks = IndelFlanks::fetch(&variant, "1", &genome)?;

        assert_eq!(
            flanks,
            IndelFlanks {
                is_deletion: true,
                seq: b"ACGTT".to_vec(),
                five_prime: b"GG".to_vec(),
                three_prime: b"ACGGG".to_vec(),
            }
        );
        assert_eq!(flanks.microhomology_len(), 3);

        Ok(())
    }

    #[test]
    fn flanks_at_contig_end() -> Result<(), anyhow::Error> {
        let genome = genome("AACG");
        let variant = SmallVariant::new("1", 2, "ACG", "A");

        let flanks = IndelFlanks::fetch(&variant, "1", &genome)?;

        assert!(flanks.three_prime.is_empty());
        assert_eq!(flanks.context(), IndelContext::DelNone);

        Ok(())
    }

    #[rstest::rstest]
    #[case(u64::MAX, "AC", "A")]
    #[case(u64::MAX, "A", "AC")]
    #[case(u64::MAX - 1, "ACG", "A")]
    fn classify_position_overflow(
        #[case] pos: u64,
        #[case] ref_allele: &str,
        #[case] alt_allele: &str,
    ) {
        let genome = genome("ACGT");
        let variant = SmallVariant::new("1", pos, ref_allele, alt_allele);

        let err = classify(&variant, "1", &genome).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::PositionOutOfRange { .. })
        ));
    }

    #[test]
    fn classify_complex_indel() {
        let genome = genome("GACGCGTT");
        let variant = SmallVariant::new("1", 2, "ACG", "AT");

        assert!(classify(&variant, "1", &genome).is_err());
    }

    #[test]
    fn classify_not_an_indel() {
        let genome = genome("ACGT");
        let variant = SmallVariant::new("1", 1, "A", "C");

        assert!(classify(&variant, "1", &genome).is_err());
    }

    #[test]
    fn classify_unknown_contig() {
        let genome = genome("ACGT");
        let variant = SmallVariant::new("2", 1, "AC", "A");

        assert!(classify(&variant, "2", &genome).is_err());
    }
}
