// Delimited-text intake and export

use std::io::{Read, Write};
use std::path::Path;

use prooflens_engine::model::JoinedRow;
use prooflens_engine::RawTable;

use crate::error::IoError;

/// Fixed name of the downloadable export.
pub const EXPORT_FILE_NAME: &str = "filtered_data.csv";

const UTF8_BOM: &str = "\u{feff}";

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// Read one export into a raw table: decode, sniff the delimiter, parse.
pub fn read_table(path: &Path) -> Result<RawTable, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    parse_table(&content, delimiter)
}

/// Read file bytes and convert to UTF-8 if needed. Publishing-house exports
/// are commonly Excel-saved Shift_JIS, so that is the fallback decoding.
/// A UTF-8 BOM is stripped.
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| IoError::Read(format!("cannot open {}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| IoError::Read(format!("cannot read {}: {e}", path.display())))?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::SHIFT_JIS.decode(&bytes);
            decoded.into_owned()
        }
    };

    Ok(content
        .strip_prefix(UTF8_BOM)
        .map(str::to_string)
        .unwrap_or(content))
}

/// Detect the most likely field delimiter by checking consistency across the
/// first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line.
/// The delimiter that produces the most consistent field count (>1 field)
/// wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (number of lines with same field count as line 1) * field_count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Parse delimited content into a header row plus string records.
pub fn parse_table(content: &str, delimiter: u8) -> Result<RawTable, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IoError::Parse(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IoError::Parse(e.to_string()))?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, records })
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write the filtered joined view as CSV, prefixed with a UTF-8 BOM so
/// spreadsheet applications pick the right encoding.
pub fn write_filtered_csv(
    columns: &[String],
    rows: &[JoinedRow],
    path: &Path,
) -> Result<(), IoError> {
    let mut file = std::fs::File::create(path)
        .map_err(|e| IoError::Write(format!("cannot create {}: {e}", path.display())))?;
    file.write_all(UTF8_BOM.as_bytes())
        .map_err(|e| IoError::Write(e.to_string()))?;

    let mut writer = csv::WriterBuilder::new().from_writer(file);
    writer
        .write_record(columns)
        .map_err(|e| IoError::Write(e.to_string()))?;

    for row in rows {
        let record: Vec<&str> = columns
            .iter()
            .map(|c| row.raw_fields.get(c).map(String::as_str).unwrap_or(""))
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| IoError::Write(e.to_string()))?;
    }

    writer.flush().map_err(|e| IoError::Write(e.to_string()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
