//! Loading of tab-separated variant tables.
//!
//! Columns are matched by position, their names are ignored.  Small variants
//! are `(chrom, pos, ref, alt)`, structural variants are `(sv_type, sv_len)`.
//! Extra columns are ignored.

use std::{
    io::{BufReader, Read},
    path::Path,
};

use crate::common::Error;

use super::ds::{SmallVariant, StructuralVariant, SvType};

/// Values accepted as "no length" in the `sv_len` column.
const MISSING_VALUES: &[&str] = &["", ".", "NA", "NaN"];

/// Build the TSV reader used for all variant tables.
fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader)
}

/// Access the column `idx` of `record` or fail with a descriptive error.
fn column<'a>(
    record: &'a csv::StringRecord,
    idx: usize,
    name: &str,
    source_name: &str,
) -> Result<&'a str, Error> {
    record.get(idx).map(str::trim).ok_or_else(|| Error::MalformedInput {
        source_name: source_name.to_string(),
        line: line_of(record),
        message: format!(
            "missing column {} ({}), found {} columns",
            idx + 1,
            name,
            record.len()
        ),
    })
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or_default()
}

fn malformed(record: &csv::StringRecord, source_name: &str, message: String) -> Error {
    Error::MalformedInput {
        source_name: source_name.to_string(),
        line: line_of(record),
        message,
    }
}

/// Read small variants from a TSV stream.
///
/// # Arguments
///
/// * `reader` - Stream with a header line and `(chrom, pos, ref, alt)` rows.
/// * `source_name` - Name of the stream, used in error messages.
///
/// # Returns
///
/// The small variants in input order.
///
/// # Errors
///
/// Fails on the first row with missing columns, non-numeric position, or
/// alleles that are not DNA letters.
pub fn read_small_variants<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<SmallVariant>, anyhow::Error> {
    let mut csv_reader = tsv_reader(reader);
    let mut result = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| anyhow::anyhow!("problem reading record: {}", e))?;
        let chrom = column(&record, 0, "chrom", source_name)?;
        let pos = column(&record, 1, "pos", source_name)?;
        let ref_allele = column(&record, 2, "ref", source_name)?;
        let alt_allele = column(&record, 3, "alt", source_name)?;

        if chrom.is_empty() {
            return Err(malformed(&record, source_name, "empty chromosome".into()).into());
        }
        let pos: u64 = pos.parse().map_err(|e| {
            malformed(&record, source_name, format!("invalid position {pos:?}: {e}"))
        })?;
        if pos == 0 {
            return Err(malformed(&record, source_name, "position must be 1-based".into()).into());
        }
        for allele in [ref_allele, alt_allele] {
            if allele.is_empty() || !allele.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(malformed(
                    &record,
                    source_name,
                    format!("invalid allele {allele:?}"),
                )
                .into());
            }
        }

        result.push(SmallVariant::new(chrom, pos, ref_allele, alt_allele));
    }

    tracing::debug!("read {} small variants from {}", result.len(), source_name);
    Ok(result)
}

/// Read structural variants from a TSV stream.
///
/// # Arguments
///
/// * `reader` - Stream with a header line and `(sv_type, sv_len)` rows.
/// * `source_name` - Name of the stream, used in error messages.
///
/// # Returns
///
/// The structural variants in input order.
///
/// # Errors
///
/// Fails on the first row with missing columns, an SV type outside of
/// DEL/DUP/INV/TRA, or an unparsable length.
pub fn read_structural_variants<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<StructuralVariant>, anyhow::Error> {
    let mut csv_reader = tsv_reader(reader);
    let mut result = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| anyhow::anyhow!("problem reading record: {}", e))?;
        let sv_type = column(&record, 0, "sv_type", source_name)?;
        let sv_len = column(&record, 1, "sv_len", source_name)?;

        let sv_type: SvType = sv_type.parse().map_err(|e: Error| {
            anyhow::Error::new(e).context(format!(
                "problem parsing {}, line {}",
                source_name,
                line_of(&record)
            ))
        })?;
        let sv_len = if MISSING_VALUES.contains(&sv_len) {
            None
        } else {
            // Some callers write lengths as floats, e.g., `-1234.0`.
            let value: f64 = sv_len.parse().map_err(|e| {
                malformed(&record, source_name, format!("invalid SV length {sv_len:?}: {e}"))
            })?;
            if !value.is_finite() {
                return Err(malformed(
                    &record,
                    source_name,
                    format!("invalid SV length {sv_len:?}"),
                )
                .into());
            }
            Some(value.round() as i64)
        };

        result.push(StructuralVariant::new(sv_type, sv_len));
    }

    tracing::debug!("read {} structural variants from {}", result.len(), source_name);
    Ok(result)
}

/// Load small variants from a TSV file.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn load_small_variants<P>(path: P) -> Result<Vec<SmallVariant>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let source_name = format!("{}", path.as_ref().display());
    let reader = std::fs::File::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("problem opening file {}: {}", &source_name, e))
        .map(BufReader::new)?;
    read_small_variants(reader, &source_name)
}

/// Load structural variants from a TSV file.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn load_structural_variants<P>(path: P) -> Result<Vec<StructuralVariant>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let source_name = format!("{}", path.as_ref().display());
    let reader = std::fs::File::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("problem opening file {}: {}", &source_name, e))
        .map(BufReader::new)?;
    read_structural_variants(reader, &source_name)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::Error;

    #[test]
    fn read_small_variants_ok() -> Result<(), anyhow::Error> {
        let data = "chrom\tpos\tref\talt\textra\n\
                    1\t100\tA\tC\tfoo\n\
                    chr2\t200\tacg\ta\tbar\n\
                    X\t300\tT\tTTA\tbaz\n";
        let vars = read_small_variants(data.as_bytes(), "test")?;

        assert_eq!(
            vars,
            vec![
                SmallVariant::new("1", 100, "A", "C"),
                SmallVariant::new("chr2", 200, "ACG", "A"),
                SmallVariant::new("X", 300, "T", "TTA"),
            ]
        );

        Ok(())
    }

    #[test]
    fn read_small_variants_header_names_ignored() -> Result<(), anyhow::Error> {
        let data = "a\tb\tc\td\n1\t100\tA\tC\n";
        let vars = read_small_variants(data.as_bytes(), "test")?;
        assert_eq!(vars.len(), 1);

        Ok(())
    }

    #[test]
    fn read_small_variants_missing_column() {
        let data = "chrom\tpos\tref\talt\n1\t100\tA\tC\n1\t101\tA\n";
        let err = read_small_variants(data.as_bytes(), "test").unwrap_err();

        match err.downcast_ref::<Error>() {
            Some(Error::MalformedInput { line, message, .. }) => {
                assert_eq!(*line, 3);
                assert!(message.contains("alt"), "{}", message);
            }
            _ => panic!("unexpected error: {:?}", err),
        }
    }

    #[rstest::rstest]
    #[case("1\tabc\tA\tC\n")]
    #[case("1\t0\tA\tC\n")]
    #[case("1\t100\t\tC\n")]
    #[case("1\t100\tA\t<DEL>\n")]
    #[case("\t100\tA\tC\n")]
    fn read_small_variants_malformed(#[case] row: &str) {
        let data = format!("chrom\tpos\tref\talt\n{row}");
        let err = read_small_variants(data.as_bytes(), "test").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MalformedInput { .. })
        ));
    }

    #[test]
    fn read_structural_variants_ok() -> Result<(), anyhow::Error> {
        let data = "sv_type\tsv_len\n\
                    DEL\t-1500\n\
                    DUP\t25000.0\n\
                    INV\t300\n\
                    TRA\tNA\n\
                    TRA\t\n\
                    TRA\t5000\n";
        let vars = read_structural_variants(data.as_bytes(), "test")?;

        assert_eq!(
            vars,
            vec![
                StructuralVariant::new(SvType::Del, Some(-1500)),
                StructuralVariant::new(SvType::Dup, Some(25000)),
                StructuralVariant::new(SvType::Inv, Some(300)),
                StructuralVariant::new(SvType::Tra, None),
                StructuralVariant::new(SvType::Tra, None),
                StructuralVariant::new(SvType::Tra, Some(5000)),
            ]
        );

        Ok(())
    }

    #[test]
    fn read_structural_variants_unsupported_type() {
        let data = "sv_type\tsv_len\nDEL\t100\nBND\t\n";
        let err = read_structural_variants(data.as_bytes(), "test").unwrap_err();

        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::UnsupportedSvType("BND".into()))
        );
        assert!(format!("{:#}", err).contains("line 3"), "{:#}", err);
    }

    #[test]
    fn read_structural_variants_missing_column() {
        let data = "sv_type\tsv_len\nDEL\n";
        let err = read_structural_variants(data.as_bytes(), "test").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MalformedInput { .. })
        ));
    }

    #[test]
    fn read_structural_variants_bad_length() {
        let data = "sv_type\tsv_len\nDEL\tlong\n";
        let err = read_structural_variants(data.as_bytes(), "test").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MalformedInput { .. })
        ));
    }

    #[test]
    fn load_files() -> Result<(), anyhow::Error> {
        let small = load_small_variants("tests/data/variants/sample_a.snv_indel.tsv")?;
        let structural = load_structural_variants("tests/data/variants/sample_a.sv.tsv")?;

        assert_eq!(small.len(), 12);
        assert_eq!(structural.len(), 6);

        Ok(())
    }

    #[test]
    fn load_missing_file() {
        assert!(load_small_variants("tests/data/variants/does-not-exist.tsv").is_err());
    }
}
