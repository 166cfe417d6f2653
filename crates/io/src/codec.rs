// Measurement table CSV codec
//
// Wire format: every field quoted, header
//   group,sample,timestamp,result,defectType,<items sorted case-insensitively>

use std::fs;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::IoError;
use crate::model::{fold, ItemValues, MeasurementRow};
use crate::table::{item_schema, MeasurementTable};

pub const COL_GROUP: &str = "group";
pub const COL_SAMPLE: &str = "sample";
pub const COL_TIMESTAMP: &str = "timestamp";
pub const COL_RESULT: &str = "result";
pub const COL_DEFECT_TYPE: &str = "defectType";

/// Identity columns, always written first and in this order.
pub const FIXED_COLUMNS: [&str; 5] = [COL_GROUP, COL_SAMPLE, COL_TIMESTAMP, COL_RESULT, COL_DEFECT_TYPE];

fn is_fixed_column(name: &str) -> bool {
    FIXED_COLUMNS.iter().any(|f| name.eq_ignore_ascii_case(f))
}

/// Item names must be non-blank and distinct from every identity column
/// (in any casing), or the value could not be read back.
pub fn check_item_name(name: &str) -> Result<(), IoError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || is_fixed_column(trimmed) {
        return Err(IoError::ReservedItemName { item: name.to_string() });
    }
    Ok(())
}

fn checked_item_schema(rows: &[MeasurementRow]) -> Result<Vec<String>, IoError> {
    let items = item_schema(rows);
    for item in &items {
        check_item_name(item)?;
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// Write rows to `path` (atomic: write `.tmp` then rename).
/// Parent directories are created as needed. A reserved item name fails
/// before anything touches the disk.
pub fn write_table(rows: &[MeasurementRow], path: &Path) -> Result<(), IoError> {
    let items = checked_item_schema(rows)?;
    let persistence = |source: std::io::Error| IoError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(persistence)?;
        }
    }

    let tmp_path = temp_path_for(path);
    let written = fs::File::create(&tmp_path)
        .and_then(|file| encode(rows, &items, BufWriter::new(file)))
        .and_then(|_| fs::rename(&tmp_path, path));

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(persistence(e));
    }

    log::info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Serialize rows to any writer. A reserved item name is `InvalidInput`.
pub fn write_table_to<W: Write>(rows: &[MeasurementRow], writer: W) -> std::io::Result<()> {
    let items = checked_item_schema(rows).map_err(|e| std::io::Error::new(ErrorKind::InvalidInput, e))?;
    encode(rows, &items, writer)
}

fn encode<W: Write>(rows: &[MeasurementRow], items: &[String], writer: W) -> std::io::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    let header: Vec<&str> = FIXED_COLUMNS
        .iter()
        .copied()
        .chain(items.iter().map(String::as_str))
        .collect();
    csv_writer.write_record(&header)?;

    for row in rows {
        let mut record: Vec<&str> = Vec::with_capacity(header.len());
        record.push(&row.group);
        record.push(&row.sample);
        record.push(&row.timestamp);
        record.push(row.result_label());
        record.push(&row.defect_type);
        for item in items {
            record.push(row.value(item));
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// A data line that was skipped while reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub table: MeasurementTable,
    pub skipped: Vec<SkippedRow>,
}

/// Read a table from disk. An absent file is `IoError::MissingFile`;
/// an empty file is an empty table.
pub fn read_table(path: &Path) -> Result<ReadOutcome, IoError> {
    let content = read_file_as_utf8(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => IoError::MissingFile { path: path.to_path_buf() },
        _ => IoError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;
    read_table_from_str(&content, &path.display().to_string())
}

/// Read file and convert to UTF-8 if needed (station exports are often Windows-1252)
fn read_file_as_utf8(path: &Path) -> std::io::Result<String> {
    let file = fs::File::open(path)?;
    read_as_utf8(file, &path.display().to_string())
}

fn read_as_utf8<R: Read>(mut reader: R, origin: &str) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            log::warn!("{origin}: not valid UTF-8, decoded as Windows-1252");
            Ok(decoded.into_owned())
        }
    }
}

/// Read a table from any reader, with the same decoding as `read_table`.
pub fn read_table_from<R: Read>(reader: R, origin: &str) -> Result<ReadOutcome, IoError> {
    let content = read_as_utf8(reader, origin).map_err(|source| IoError::Read {
        path: PathBuf::from(origin),
        source,
    })?;
    read_table_from_str(&content, origin)
}

/// Resolved header positions.
struct Columns {
    group: usize,
    sample: usize,
    result: usize,
    timestamp: Option<usize>,
    defect_type: Option<usize>,
    items: Vec<(usize, String)>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, origin: &str) -> Result<Self, IoError> {
        let cells: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();

        let find = |name: &str| cells.iter().position(|c| c.eq_ignore_ascii_case(name));
        let require = |name: &str| {
            find(name).ok_or_else(|| IoError::MissingColumn {
                origin: origin.to_string(),
                column: name.to_string(),
            })
        };

        let group = require(COL_GROUP)?;
        let sample = require(COL_SAMPLE)?;
        let result = require(COL_RESULT)?;
        let timestamp = find(COL_TIMESTAMP);
        let defect_type = find(COL_DEFECT_TYPE);

        let fixed = [Some(group), Some(sample), Some(result), timestamp, defect_type];
        for (i, c) in cells.iter().enumerate() {
            if is_fixed_column(c) && !fixed.contains(&Some(i)) {
                log::warn!("{origin}: duplicate '{c}' column at position {} ignored", i + 1);
            }
        }

        let items = cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty() && !is_fixed_column(c))
            .map(|(i, c)| (i, c.clone()))
            .collect();

        Ok(Self { group, sample, result, timestamp, defect_type, items })
    }
}

fn parse_result(cell: &str) -> Option<bool> {
    let cell = cell.trim();
    if cell.eq_ignore_ascii_case("OK") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("NG") {
        Some(false)
    } else {
        None
    }
}

/// Parse table content. `origin` names the source in errors and logs.
pub fn read_table_from_str(content: &str, origin: &str) -> Result<ReadOutcome, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| IoError::Header {
            origin: origin.to_string(),
            message: e.to_string(),
        })?
        .clone();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Ok(ReadOutcome {
            table: MeasurementTable::default(),
            skipped: Vec::new(),
        });
    }

    let columns = Columns::resolve(&headers, origin)?;
    let mut item_columns: Vec<String> = Vec::new();
    for (_, name) in &columns.items {
        if !item_columns.iter().any(|c| fold(c) == fold(name)) {
            item_columns.push(name.clone());
        }
    }

    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                log::warn!("{origin}: skipping malformed line {line}: {e}");
                skipped.push(SkippedRow { line, reason: e.to_string() });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let cell = |i: usize| record.get(i).unwrap_or("");

        let Some(ok) = parse_result(cell(columns.result)) else {
            let reason = format!("result must be OK or NG, found {:?}", cell(columns.result));
            log::warn!("{origin}: skipping malformed line {line}: {reason}");
            skipped.push(SkippedRow { line, reason });
            continue;
        };

        let mut values = ItemValues::new();
        for (i, name) in &columns.items {
            values.insert(name.as_str(), cell(*i));
        }

        let row = MeasurementRow {
            group: cell(columns.group).trim().to_string(),
            sample: cell(columns.sample).trim().to_string(),
            timestamp: columns.timestamp.map(cell).unwrap_or("").to_string(),
            ok,
            defect_type: columns.defect_type.map(cell).unwrap_or("").to_string(),
            values,
        };

        if row.key().is_none() {
            log::debug!("{origin}: discarding line {line} with blank sample key");
            skipped.push(SkippedRow { line, reason: "blank sample key".into() });
            continue;
        }

        rows.push(row);
    }

    log::debug!(
        "{origin}: read {} rows, {} item columns, {} skipped",
        rows.len(),
        item_columns.len(),
        skipped.len()
    );

    Ok(ReadOutcome {
        table: MeasurementTable::from_parts(item_columns, rows),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(group: &str, sample: &str, ok: bool, defect: &str, items: &[(&str, &str)]) -> MeasurementRow {
        MeasurementRow {
            group: group.into(),
            sample: sample.into(),
            timestamp: "2026-03-02 10:00:00.000".into(),
            ok,
            defect_type: defect.into(),
            values: items.iter().map(|(n, v)| (*n, *v)).collect(),
        }
    }

    fn to_string(rows: &[MeasurementRow]) -> String {
        let mut buf = Vec::new();
        write_table_to(rows, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_has_fixed_prefix_and_sorted_items() {
        let rows = vec![
            row("G1", "1", true, "", &[("width", "1.5"), ("Area", "20")]),
            row("G1", "2", false, "Scratch", &[("depth", "0.2")]),
        ];
        let text = to_string(&rows);
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            r#""group","sample","timestamp","result","defectType","Area","depth","width""#
        );
        let second = text.lines().nth(2).unwrap();
        assert!(second.contains(r#""NG","Scratch","","0.2","""#));
    }

    #[test]
    fn quotes_are_doubled() {
        let rows = vec![row("G \"A\"", "1", false, "say \"hi\", twice", &[])];
        let text = to_string(&rows);
        assert!(text.contains(r#""G ""A""""#));
        let back = read_table_from_str(&text, "mem").unwrap();
        assert_eq!(back.table.rows()[0].group, "G \"A\"");
        assert_eq!(back.table.rows()[0].defect_type, "say \"hi\", twice");
    }

    #[test]
    fn round_trip_preserves_keyed_values() {
        let rows = vec![
            row("G1", "1", true, "", &[("temp", "10.00"), ("label", "x,y")]),
            row("G1", "2", false, "Dent", &[("temp", "9.5")]),
        ];
        let back = read_table_from_str(&to_string(&rows), "mem").unwrap();
        assert!(back.skipped.is_empty());
        assert_eq!(back.table.len(), 2);
        let keyed = back.table.keyed();
        let first = keyed.values().next().unwrap();
        assert_eq!(first.value("temp"), "10.00");
        assert_eq!(first.value("label"), "x,y");
        let second = keyed.values().nth(1).unwrap();
        assert!(!second.ok);
        assert_eq!(second.defect_type, "Dent");
        assert_eq!(second.value("label"), "");
    }

    #[test]
    fn header_lookup_is_case_insensitive_and_ignores_blank_cells() {
        let content = "\
GROUP,Sample,RESULT,,Temp
G1,1,ok,,10
G1,2,Ng,,11
";
        let out = read_table_from_str(content, "mem").unwrap();
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.table.item_columns(), &["Temp"]);
        assert!(out.table.rows()[0].ok);
        assert!(!out.table.rows()[1].ok);
        assert_eq!(out.table.rows()[0].timestamp, "");
    }

    #[test]
    fn malformed_and_blank_rows_are_skipped() {
        let content = "\
group,sample,timestamp,result,defectType,temp
G1,1,t,OK,,10

G1,2,t,MAYBE,,11
 , ,t,OK,,12
,,,,,
G1,3,t,NG,Crack,13
";
        let out = read_table_from_str(content, "mem").unwrap();
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.skipped.len(), 2);
        assert!(out.skipped[0].line > 2);
        assert!(out.skipped[0].reason.contains("MAYBE"));
        assert_eq!(out.skipped[1].reason, "blank sample key");
    }

    #[test]
    fn missing_required_column_is_error() {
        let err = read_table_from_str("group,result\nG1,OK\n", "ref.csv").unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { ref column, .. } if column == "sample"));
        assert!(err.to_string().contains("ref.csv"));
    }

    #[test]
    fn empty_content_is_empty_table() {
        let out = read_table_from_str("", "mem").unwrap();
        assert!(out.table.is_empty());
    }

    #[test]
    fn absent_file_is_distinct_error() {
        let dir = tempdir().unwrap();
        let err = read_table(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, IoError::MissingFile { .. }));

        let empty = dir.path().join("empty.csv");
        fs::write(&empty, "").unwrap();
        assert!(read_table(&empty).unwrap().table.is_empty());
    }

    #[test]
    fn unreadable_path_is_not_reported_as_missing() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("baseline.csv");
        fs::write(&file, "group,sample,result\n").unwrap();

        // A path through a regular file fails with something other than NotFound
        let err = read_table(&file.join("nested.csv")).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }), "got {err:?}");
    }

    #[test]
    fn reserved_item_names_are_rejected() {
        for name in ["Timestamp", "result", "Group", "SAMPLE", "defecttype", "", "  "] {
            let rows = vec![row("G1", "1", true, "", &[("temp", "1"), (name, "42")])];
            let err = checked_item_schema(&rows).unwrap_err();
            assert!(matches!(err, IoError::ReservedItemName { ref item } if item == name.trim()), "{name:?}");

            let mut buf = Vec::new();
            let err = write_table_to(&rows, &mut buf).unwrap_err();
            assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
            assert!(buf.is_empty());
        }
        assert!(check_item_name("timestamp_ms").is_ok());
        assert!(check_item_name("Result2").is_ok());
    }

    #[test]
    fn reserved_item_name_leaves_no_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let rows = vec![row("G1", "1", true, "", &[("Timestamp", "42")])];
        let err = write_table(&rows, &path).unwrap_err();
        assert!(matches!(err, IoError::ReservedItemName { .. }));
        assert!(!path.exists());
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn duplicate_identity_header_keeps_first_column() {
        let content = "group,sample,result,Result,temp\nG1,1,OK,NG,3\n";
        let out = read_table_from_str(content, "mem").unwrap();
        assert!(out.table.rows()[0].ok);
        assert_eq!(out.table.item_columns(), &["temp"]);
    }

    #[test]
    fn write_creates_directories_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runs/baseline/reference.csv");
        write_table(&[row("G1", "1", true, "", &[("temp", "1")])], &path).unwrap();

        assert!(path.exists());
        assert!(!temp_path_for(&path).exists());
        let out = read_table(&path).unwrap();
        assert_eq!(out.table.len(), 1);
    }

    #[test]
    fn reader_input_matches_str_input() {
        let rows = vec![row("G1", "1", false, "Dent", &[("temp", "3")])];
        let text = to_string(&rows);
        let from_reader = read_table_from(text.as_bytes(), "mem").unwrap();
        let from_str = read_table_from_str(&text, "mem").unwrap();
        assert_eq!(from_reader.table.rows(), from_str.table.rows());

        let latin: &[u8] = b"group,sample,result,defectType\nG1,1,NG,Kratzer \xE4\n";
        let out = read_table_from(latin, "station").unwrap();
        assert_eq!(out.table.rows()[0].defect_type, "Kratzer ä");
    }

    #[test]
    fn windows_1252_content_is_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Kratzer ä" with 0xE4 for 'ä'
        let mut bytes = b"group,sample,result,defectType\nG1,1,NG,Kratzer ".to_vec();
        bytes.push(0xE4);
        bytes.push(b'\n');
        fs::write(&path, bytes).unwrap();

        let out = read_table(&path).unwrap();
        assert_eq!(out.table.rows()[0].defect_type, "Kratzer ä");
    }
}
