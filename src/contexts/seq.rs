//! Access to the reference sequence flanking a variant.

use std::{path::Path, sync::Mutex};

use crate::common::Error;

/// Lookup of reference bases.
///
/// Implementations must be shareable between worker threads; extraction of
/// different samples runs in parallel.
pub trait SequenceProvider: Sync {
    /// Fetch up to `len` upper-case reference bases starting at the 1-based
    /// position `start`.
    ///
    /// Returns fewer than `len` bases if the range extends beyond the end of
    /// the contig.
    ///
    /// # Errors
    ///
    /// Unknown contig, or `Error::PositionOutOfRange` if `start` is beyond
    /// the contig end.
    fn fetch(&self, chrom: &str, start: u64, len: u64) -> Result<Vec<u8>, anyhow::Error>;
}

/// Clamp the 1-based range `start, len` to a contig of length `contig_len`
/// and return the 0-based half-open range.
fn clamp_range(
    chrom: &str,
    start: u64,
    len: u64,
    contig_len: u64,
) -> Result<std::ops::Range<u64>, anyhow::Error> {
    if start == 0 || start > contig_len + 1 {
        return Err(Error::PositionOutOfRange {
            chrom: chrom.to_string(),
            pos: start,
        }
        .into());
    }
    let begin = start - 1;
    Ok(begin..std::cmp::min(begin.saturating_add(len), contig_len))
}

/// Reference sequences held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGenome {
    /// Mapping from contig name to upper-case sequence.
    seqs: rustc_hash::FxHashMap<String, Vec<u8>>,
}

impl InMemoryGenome {
    /// Create an empty genome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a contig.
    pub fn insert(&mut self, chrom: &str, seq: &[u8]) {
        self.seqs
            .insert(chrom.to_string(), seq.to_ascii_uppercase());
    }

    /// Read all sequences of a FASTA file into memory.
    ///
    /// # Errors
    ///
    /// If anything goes wrong, it returns a generic `anyhow::Error`.
    pub fn from_fasta<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        let reader = bio::io::fasta::Reader::from_file(path.as_ref())
            .map_err(|e| anyhow::anyhow!("problem opening FASTA file: {}", e))?;
        let mut result = Self::new();
        for record in reader.records() {
            let record = record.map_err(|e| anyhow::anyhow!("problem reading FASTA: {}", e))?;
            result.insert(record.id(), record.seq());
        }
        Ok(result)
    }
}

impl SequenceProvider for InMemoryGenome {
    fn fetch(&self, chrom: &str, start: u64, len: u64) -> Result<Vec<u8>, anyhow::Error> {
        let seq = self
            .seqs
            .get(chrom)
            .ok_or_else(|| anyhow::anyhow!("unknown contig {:?}", chrom))?;
        let range = clamp_range(chrom, start, len, seq.len() as u64)?;
        Ok(seq[range.start as usize..range.end as usize].to_vec())
    }
}

/// Reference sequences read on demand from an indexed FASTA file.
pub struct IndexedFasta {
    /// The reader, guarded as fetching moves the file cursor.
    reader: Mutex<bio::io::fasta::IndexedReader<std::fs::File>>,
    /// Mapping from contig name to length.
    contig_lens: rustc_hash::FxHashMap<String, u64>,
}

impl IndexedFasta {
    /// Open a FASTA file with accompanying `.fai` index.
    ///
    /// # Errors
    ///
    /// If anything goes wrong, it returns a generic `anyhow::Error`.
    pub fn from_path<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        tracing::debug!("Opening reference {}", path.as_ref().display());
        let reader = bio::io::fasta::IndexedReader::from_file(&path.as_ref())
            .map_err(|e| anyhow::anyhow!("problem opening indexed FASTA: {}", e))?;
        let contig_lens = reader
            .index
            .sequences()
            .into_iter()
            .map(|seq| (seq.name, seq.len))
            .collect();
        Ok(Self {
            reader: Mutex::new(reader),
            contig_lens,
        })
    }
}

impl SequenceProvider for IndexedFasta {
    fn fetch(&self, chrom: &str, start: u64, len: u64) -> Result<Vec<u8>, anyhow::Error> {
        let contig_len = *self
            .contig_lens
            .get(chrom)
            .ok_or_else(|| anyhow::anyhow!("unknown contig {:?}", chrom))?;
        let range = clamp_range(chrom, start, len, contig_len)?;

        let mut seq = Vec::with_capacity((range.end - range.start) as usize);
        if range.is_empty() {
            return Ok(seq);
        }
        let mut reader = self
            .reader
            .lock()
            .map_err(|e| anyhow::anyhow!("reference reader is poisoned: {}", e))?;
        reader
            .fetch(chrom, range.start, range.end)
            .map_err(|e| anyhow::anyhow!("problem fetching {}:{:?}: {}", chrom, &range, e))?;
        reader
            .read(&mut seq)
            .map_err(|e| anyhow::anyhow!("problem reading {}:{:?}: {}", chrom, &range, e))?;
        seq.make_ascii_uppercase();
        Ok(seq)
    }
}

#[cfg(test)]
mod test {
    use super::{InMemoryGenome, IndexedFasta, SequenceProvider};
    use crate::common::Error;

    #[rstest::rstest]
    #[case(1, 4, "ACGT")]
    #[case(5, 3, "TAC")]
    #[case(14, 10, "GTA")]
    #[case(17, 3, "")]
    fn in_memory_fetch(
        #[case] start: u64,
        #[case] len: u64,
        #[case] expected: &str,
    ) -> Result<(), anyhow::Error> {
        let mut genome = InMemoryGenome::new();
        genome.insert("1", b"acgttacgatcgagta");

        assert_eq!(genome.fetch("1", start, len)?, expected.as_bytes());

        Ok(())
    }

    #[test]
    fn in_memory_fetch_errors() {
        let mut genome = InMemoryGenome::new();
        genome.insert("1", b"ACGT");

        assert!(genome.fetch("2", 1, 1).is_err());
        assert!(genome.fetch("1", 0, 1).is_err());
        assert!(genome.fetch("1", 6, 1).is_err());
        assert!(matches!(
            genome.fetch("1", 6, 1).unwrap_err().downcast_ref::<Error>(),
            Some(Error::PositionOutOfRange { pos: 6, .. })
        ));
    }

    #[test]
    fn indexed_fasta_agrees_with_in_memory() -> Result<(), anyhow::Error> {
        let path = "tests/data/genome/toy.fa";
        let indexed = IndexedFasta::from_path(path)?;
        let in_memory = InMemoryGenome::from_fasta(path)?;

        for (start, len) in [(1, 10), (55, 7), (118, 10), (120, 1)] {
            assert_eq!(
                indexed.fetch("1", start, len)?,
                in_memory.fetch("1", start, len)?,
                "start={} len={}",
                start,
                len
            );
        }
        assert!(indexed.fetch("chr1", 1, 1).is_err());

        Ok(())
    }
}
