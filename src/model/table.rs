use super::issue::FlatRow;

/// Column-ordered rows of text cells, the shape handed from extraction to
/// the transform and load stages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RecordTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn from_rows(rows: &[FlatRow]) -> Self {
        Self {
            columns: FlatRow::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: rows.iter().map(FlatRow::to_record).collect(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of the first row whose width differs from the header.
    pub fn first_ragged_row(&self) -> Option<usize> {
        self.rows.iter().position(|r| r.len() != self.columns.len())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> RecordTable {
        RecordTable::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn empty_extraction_still_has_every_column() {
        let t = RecordTable::from_rows(&[]);
        assert!(t.is_empty());
        assert_eq!(t.columns.len(), FlatRow::COLUMNS.len());
        assert_eq!(t.column_index("Worklog Started"), Some(24));
    }

    #[test]
    fn ragged_rows_are_located() {
        let t = table(&["a", "b"], &[&["1", "2"], &["3"]]);
        assert_eq!(t.first_ragged_row(), Some(1));
        assert_eq!(t.len(), 2);

        let t = table(&["a", "b"], &[&["1", "2"]]);
        assert_eq!(t.first_ragged_row(), None);
    }
}
