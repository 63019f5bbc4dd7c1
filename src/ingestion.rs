//! Delimited-text decoding into a [`RawTable`].
//!
//! Spreadsheet decoders live outside the crate and build a `RawTable`
//! directly through [`RawTable::new`].

use crate::error::{Result, SalesReportError};
use crate::schema::{CellValue, RawTable};
use log::{debug, info};
use std::io::Read;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    /// Field delimiter; sniffed from the header line when `None`.
    pub delimiter: Option<u8>,
}

/// Decodes UTF-8 (with or without BOM) or BOM-marked UTF-16 into text.
pub fn decode_text(bytes: &[u8]) -> Result<String> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return utf8(rest);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        return utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        return utf16(rest, u16::from_be_bytes);
    }
    utf8(bytes)
}

fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| SalesReportError::Encoding(e.to_string()))
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(SalesReportError::Encoding(
            "UTF-16 input has an odd number of bytes".to_string(),
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| SalesReportError::Encoding(e.to_string()))
}

/// Picks the candidate delimiter occurring most often outside quotes on the
/// first line; commas win ties and empty headers.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;

    for byte in header.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(pos) = CANDIDATE_DELIMITERS.iter().position(|d| *d == byte) {
            counts[pos] += 1;
        }
    }

    let mut best = 0;
    for (pos, count) in counts.iter().enumerate() {
        if *count > counts[best] {
            best = pos;
        }
    }
    CANDIDATE_DELIMITERS[best]
}

pub fn decode_csv_bytes(bytes: &[u8], options: &CsvOptions) -> Result<RawTable> {
    let text = decode_text(bytes)?;
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| sniff_delimiter(&text));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SalesReportError::EmptyTable);
    }

    let mut rows = Vec::new();
    let mut skipped_blank = 0usize;
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            skipped_blank += 1;
            continue;
        }
        rows.push(record.iter().map(CellValue::from_text).collect());
    }

    debug!(
        "Decoded CSV with delimiter {:?}: {} columns, {} rows, {} blank lines skipped",
        delimiter as char,
        headers.len(),
        rows.len(),
        skipped_blank
    );

    Ok(RawTable::new(headers, rows))
}

pub fn read_csv<R: Read>(mut reader: R, options: &CsvOptions) -> Result<RawTable> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_csv_bytes(&bytes, options)
}

pub fn read_csv_file<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<RawTable> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let table = read_csv(file, options)?;
    info!("Loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
date,product_id,revenue,profit
2024-01-05,P1,\"1,000\",200
2024-01-20,P1,500,100
,,,
2024-02-10,P2,\"2,000\",300
";

    #[test]
    fn test_load_sample_csv() {
        let table = decode_csv_bytes(SAMPLE_CSV.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(table.headers(), &["date", "product_id", "revenue", "profit"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, 2), &CellValue::Text("1,000".to_string()));
    }

    #[test]
    fn test_utf8_bom_and_utf16_decode_identically() {
        let plain = decode_csv_bytes(SAMPLE_CSV.as_bytes(), &CsvOptions::default()).unwrap();

        let mut with_bom = UTF8_BOM.to_vec();
        with_bom.extend_from_slice(SAMPLE_CSV.as_bytes());
        let bom = decode_csv_bytes(&with_bom, &CsvOptions::default()).unwrap();
        assert_eq!(bom, plain);

        let mut le = UTF16_LE_BOM.to_vec();
        le.extend(SAMPLE_CSV.encode_utf16().flat_map(|u| u.to_le_bytes()));
        assert_eq!(decode_csv_bytes(&le, &CsvOptions::default()).unwrap(), plain);

        let mut be = UTF16_BE_BOM.to_vec();
        be.extend(SAMPLE_CSV.encode_utf16().flat_map(|u| u.to_be_bytes()));
        assert_eq!(decode_csv_bytes(&be, &CsvOptions::default()).unwrap(), plain);
    }

    #[test]
    fn test_invalid_utf8_is_an_encoding_error() {
        let err = decode_text(&[b'a', 0xC3, 0x28]).unwrap_err();
        assert!(matches!(err, SalesReportError::Encoding(_)));

        let odd = [0xFF, 0xFE, b'a'];
        assert!(matches!(
            decode_text(&odd),
            Err(SalesReportError::Encoding(_))
        ));
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("date;product;revenue;profit\n1;2;3;4"), b';');
        assert_eq!(sniff_delimiter("date\tsku\tsales\tprofit"), b'\t');
        assert_eq!(sniff_delimiter("\"a;b\",c,d"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_semicolon_file_with_ragged_rows() {
        let csv = "Ngày;Mã SP;Doanh thu;Lợi nhuận\n05/01/2024;A;1 000\n06/01/2024;B;200;20;extra\n";
        let table = decode_csv_bytes(csv.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(table.headers()[0], "Ngày");
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 3), &CellValue::Blank);
        assert_eq!(table.cell(1, 4), &CellValue::Text("extra".to_string()));
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let err = decode_csv_bytes(b"", &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, SalesReportError::EmptyTable));
    }

    #[test]
    fn test_read_csv_file_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "sales_kpi_report_ingestion_{}.csv",
            std::process::id()
        ));
        std::fs::write(&path, SAMPLE_CSV).unwrap();
        let loaded = read_csv_file(&path, &CsvOptions::default());
        std::fs::remove_file(&path).unwrap();

        let table = loaded.unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.headers()[2], "revenue");

        let missing = read_csv_file(
            std::env::temp_dir().join("sales_kpi_report_no_such_upload.csv"),
            &CsvOptions::default(),
        );
        assert!(matches!(missing, Err(SalesReportError::IoError(_))));
    }

    #[test]
    fn test_header_only_table() {
        let table = decode_csv_bytes(b"date,sku,sales,profit\n", &CsvOptions::default()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers().len(), 4);
    }
}
