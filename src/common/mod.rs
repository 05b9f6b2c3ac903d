//! Commonly used code.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod error;

pub use self::error::Error;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

/// Assembly to be passed on the command line.
///
/// Determines the contig naming convention used when talking to the
/// reference sequence.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    clap::ValueEnum,
    serde::Deserialize,
    serde::Serialize,
)]
pub enum Assembly {
    /// GRCh37, contigs without `chr` prefix, mitochondrion is `MT`.
    Grch37,
    /// GRCh38, contigs with `chr` prefix, mitochondrion is `chrM`.
    Grch38,
}

impl Assembly {
    /// Rename the given contig to the convention of the assembly.
    ///
    /// # Arguments
    ///
    /// * `chrom` - Contig name as found in the variant input.
    ///
    /// # Returns
    ///
    /// The contig name as used by the reference of this assembly.
    pub fn contig_name(&self, chrom: &str) -> String {
        let bare = chrom.strip_prefix("chr").unwrap_or(chrom);
        match self {
            Assembly::Grch37 => match bare {
                "M" => "MT".to_string(),
                _ => bare.to_string(),
            },
            Assembly::Grch38 => match bare {
                "MT" | "M" => "chrM".to_string(),
                _ => format!("chr{bare}"),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::Assembly;

    #[rstest::rstest]
    #[case(Assembly::Grch37, "1", "1")]
    #[case(Assembly::Grch37, "chr1", "1")]
    #[case(Assembly::Grch37, "chrM", "MT")]
    #[case(Assembly::Grch37, "chrX", "X")]
    #[case(Assembly::Grch38, "1", "chr1")]
    #[case(Assembly::Grch38, "chr1", "chr1")]
    #[case(Assembly::Grch38, "MT", "chrM")]
    fn contig_name(#[case] assembly: Assembly, #[case] chrom: &str, #[case] expected: &str) {
        assert_eq!(assembly.contig_name(chrom), expected);
    }
}
