//! Extraction of the mutation context vector of one sample.

use crate::{
    common::{Assembly, Error},
    variants::ds::{SmallVariant, SmallVariantKind, StructuralVariant},
};

use super::{
    indel,
    schema::{self, SnvType},
    seq::SequenceProvider,
    ContextVector,
};

/// Configuration of the context extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractConfig {
    /// Assembly of the reference; contig names of the variants are renamed
    /// to its convention.  Contig names are used as-is if `None`.
    pub assembly: Option<Assembly>,
}

/// Extraction of context vectors.
///
/// This is mainly used to encapsulate the functionality.  Creating new such
/// objects is very straightforward and cheap.
pub struct Extractor<'a> {
    /// Access to the reference sequence.
    provider: &'a dyn SequenceProvider,
    /// The configuration.
    config: ExtractConfig,
}

impl<'a> Extractor<'a> {
    /// Create a new `Extractor`.
    pub fn new(provider: &'a dyn SequenceProvider, config: ExtractConfig) -> Self {
        Self { provider, config }
    }

    /// Count the mutation contexts of one sample.
    ///
    /// # Arguments
    ///
    /// * `small` - SNVs and indels of the sample.
    /// * `structural` - Structural variants of the sample.
    ///
    /// # Returns
    ///
    /// The context vector; all-zero if there are no variants.
    ///
    /// # Errors
    ///
    /// Invalid SNV bases, length-binned SVs without length, and reference
    /// lookup failures.  No partial result is returned.
    pub fn extract(
        &self,
        small: &[SmallVariant],
        structural: &[StructuralVariant],
    ) -> Result<ContextVector, anyhow::Error> {
        let mut result = ContextVector::zeros();

        let mut n_skipped = 0;
        for variant in small {
            match variant.kind() {
                SmallVariantKind::Snv => result.increment(Self::snv_index(variant)?),
                SmallVariantKind::Deletion | SmallVariantKind::Insertion => {
                    let contig = self.contig_name(&variant.chrom);
                    let context =
                        indel::classify(variant, &contig, self.provider).map_err(|e| {
                            e.context(format!(
                                "problem classifying indel {}:{} {}>{}",
                                &variant.chrom,
                                variant.pos,
                                &variant.ref_allele,
                                &variant.alt_allele
                            ))
                        })?;
                    result.increment(context.index());
                }
                SmallVariantKind::Other => {
                    tracing::debug!("skipping multi-nucleotide or complex variant {:?}", variant);
                    n_skipped += 1;
                }
            }
        }
        if n_skipped > 0 {
            tracing::debug!("skipped {} multi-nucleotide or complex variants", n_skipped);
        }

        for variant in structural {
            let idx = schema::sv_index(variant.sv_type, variant.sv_len)
                .ok_or_else(|| Error::MissingSvLength(variant.sv_type.to_string()))?;
            result.increment(idx);
        }

        Ok(result)
    }

    fn contig_name(&self, chrom: &str) -> String {
        match self.config.assembly {
            Some(assembly) => assembly.contig_name(chrom),
            None => chrom.to_string(),
        }
    }

    fn snv_index(variant: &SmallVariant) -> Result<usize, Error> {
        let ref_base = variant.ref_allele.as_bytes()[0];
        let alt_base = variant.alt_allele.as_bytes()[0];
        SnvType::from_bases(ref_base, alt_base)
            .map(|snv_type| snv_type.index())
            .ok_or_else(|| Error::InvalidAllele {
                chrom: variant.chrom.clone(),
                pos: variant.pos,
                allele: format!("{}>{}", &variant.ref_allele, &variant.alt_allele),
            })
    }
}
