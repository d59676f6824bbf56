use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::{EtlError, EtlResult};
use crate::model::table::RecordTable;

/// Write `table` as CSV to `output_dir/output_name`, creating missing
/// directories and overwriting any existing file.
pub fn load(table: &RecordTable, output_dir: &Path, output_name: &str) -> EtlResult<PathBuf> {
    if table.is_empty() {
        info!("No rows extracted, writing header only");
    }
    write_csv(table, output_dir, output_name)
        .inspect(|output| info!("File saved to {} ({} rows)", output.display(), table.len()))
        .inspect_err(|err| error!("Failed to save extraction ({}): {err}", err.category()))
}

fn write_csv(table: &RecordTable, output_dir: &Path, output_name: &str) -> EtlResult<PathBuf> {
    if let Some(row) = table.first_ragged_row() {
        return Err(EtlError::Serialization(format!(
            "row {row} has {} cells, expected {}",
            table.rows[row].len(),
            table.columns.len()
        )));
    }

    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir).map_err(|e| EtlError::from_io(output_dir, e))?;
    }

    let output = output_dir.join(output_name);
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(&output)
        .map_err(|e| csv_error(&output, e))?;

    writer
        .write_record(&table.columns)
        .map_err(|e| csv_error(&output, e))?;
    for row in &table.rows {
        writer.write_record(row).map_err(|e| csv_error(&output, e))?;
    }
    writer.flush().map_err(|e| EtlError::from_io(&output, e))?;

    Ok(output)
}

fn csv_error(path: &Path, err: csv::Error) -> EtlError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => EtlError::from_io(path, source),
        _ => EtlError::Serialization(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::issue::FlatRow;

    fn table(columns: &[&str], rows: &[&[&str]]) -> RecordTable {
        RecordTable::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn header_matches_flat_row_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = load(&RecordTable::from_rows(&[]), dir.path(), "out.csv").unwrap();

        let contents = std::fs::read_to_string(path).unwrap();
        let first = contents.lines().next().unwrap();
        assert_eq!(first, FlatRow::COLUMNS.join(","));
        assert!(first.starts_with("Issue Key,Summary,Priority,Labels"));
        assert!(first.ends_with("Worklog Time Spent,Worklog Time Spent Seconds"));
    }

    #[test]
    fn creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");

        let path = load(&table(&["x"], &[&["1"]]), &nested, "out.csv").unwrap();

        assert_eq!(path, nested.join("out.csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "x\n1\n");
    }

    #[test]
    fn existing_directory_and_file_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("out.csv"), "stale contents\nmore\nlines\n").unwrap();

        let path = load(&table(&["x", "y"], &[&["1", "2"]]), dir.path(), "out.csv").unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "x,y\n1,2\n");
    }

    #[test]
    fn cells_with_delimiters_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let t = table(
            &["Labels", "Description"],
            &[&["['a', 'b']", "line one\nline \"two\""]],
        );

        let path = load(&t, dir.path(), "out.csv").unwrap();

        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            contents,
            "Labels,Description\n\"['a', 'b']\",\"line one\nline \"\"two\"\"\"\n"
        );
    }

    #[test]
    fn ragged_rows_are_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let t = table(&["x", "y"], &[&["1", "2"], &["3"]]);

        let err = load(&t, dir.path(), "out.csv").unwrap_err();

        assert!(matches!(err, EtlError::Serialization(_)));
        assert!(!dir.path().join("out.csv").exists());
    }

    #[test]
    fn directory_in_place_of_file_is_an_os_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("out.csv")).unwrap();

        let err = load(&table(&["x"], &[]), dir.path(), "out.csv").unwrap_err();

        assert!(matches!(
            err,
            EtlError::Io { .. } | EtlError::PermissionDenied { .. }
        ));
    }

    #[test]
    fn file_in_place_of_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let err = load(&table(&["x"], &[]), &blocker.join("sub"), "out.csv").unwrap_err();

        assert!(matches!(
            err,
            EtlError::Io { .. } | EtlError::PathNotFound { .. }
        ));
    }
}
