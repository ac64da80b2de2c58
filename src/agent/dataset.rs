//! Tabular dataset snapshot
//!
//! Parses an uploaded CSV payload into a header row plus string cells, and
//! serializes it back to delimited text for prompt embedding. All cells are
//! kept as strings; numeric interpretation happens in the command evaluator.

use crate::error::AppError;

/// Number of rows included in an upload preview
pub const PREVIEW_ROWS: usize = 5;

/// A parsed tabular snapshot of an uploaded CSV file
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Parse delimited text into a dataset
    ///
    /// The first line is the header. Fields may be double-quoted; a doubled
    /// quote inside a quoted field is an escaped quote. Every data row must
    /// have the same number of fields as the header.
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| AppError::Validation("CSV file is empty".to_string()))?;
        let columns = split_fields(header);
        if columns.iter().all(|c| c.trim().is_empty()) {
            return Err(AppError::Validation("CSV header row is empty".to_string()));
        }

        let mut rows = Vec::new();
        for (line_no, line) in lines.enumerate() {
            let fields = split_fields(line);
            if fields.len() != columns.len() {
                return Err(AppError::Validation(format!(
                    "CSV row {} has {} fields, expected {}",
                    line_no + 2,
                    fields.len(),
                    columns.len()
                )));
            }
            rows.push(fields);
        }

        Ok(Self { columns, rows })
    }

    /// Column names, in file order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows, in file order
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by name, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cell values of one column, by index
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |r| r[index].as_str())
    }

    /// The first rows of the dataset, for upload previews
    pub fn preview(&self) -> &[Vec<String>] {
        &self.rows[..self.rows.len().min(PREVIEW_ROWS)]
    }

    /// Serialize the whole dataset back to delimited text
    ///
    /// Used to embed the snapshot into a prompt. Fields containing commas,
    /// quotes, or newlines are quoted.
    pub fn to_delimited(&self) -> String {
        let mut out = String::new();
        out.push_str(&join_fields(&self.columns));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&join_fields(row));
            out.push('\n');
        }
        out
    }
}

/// Split one CSV line into fields, honoring double quotes
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Escaped quote
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Join fields into one CSV line, quoting where needed
fn join_fields(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| {
            if f.contains(',') || f.contains('"') || f.contains('\n') {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "name,city,price\namy,oslo,10\nbob,kyiv,20\nzoe,lima,30\n";

    #[test]
    fn test_parse_basic() {
        let ds = Dataset::parse(SAMPLE).unwrap();
        assert_eq!(ds.columns(), &["name", "city", "price"]);
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.rows()[1], vec!["bob", "kyiv", "20"]);
    }

    #[test]
    fn test_parse_quoted_fields() {
        let ds = Dataset::parse("title,note\n\"a, b\",\"say \"\"hi\"\"\"\n").unwrap();
        assert_eq!(ds.rows()[0][0], "a, b");
        assert_eq!(ds.rows()[0][1], "say \"hi\"");
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(Dataset::parse("").is_err());
        assert!(Dataset::parse("\n\n").is_err());
    }

    #[test]
    fn test_parse_ragged_row_rejected() {
        let result = Dataset::parse("a,b\n1,2\n3\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("row 3"));
    }

    #[test]
    fn test_to_delimited_round_trip() {
        let ds = Dataset::parse(SAMPLE).unwrap();
        let text = ds.to_delimited();
        let reparsed = Dataset::parse(&text).unwrap();
        assert_eq!(reparsed.columns(), ds.columns());
        assert_eq!(reparsed.rows(), ds.rows());
    }

    #[test]
    fn test_to_delimited_quotes_special_fields() {
        let ds = Dataset::parse("title,note\n\"a, b\",plain\n").unwrap();
        let text = ds.to_delimited();
        assert!(text.contains("\"a, b\""));
    }

    #[test]
    fn test_preview_truncates() {
        let mut text = String::from("n\n");
        for i in 0..10 {
            text.push_str(&format!("{}\n", i));
        }
        let ds = Dataset::parse(&text).unwrap();
        assert_eq!(ds.preview().len(), PREVIEW_ROWS);
        assert_eq!(ds.row_count(), 10);
    }

    #[test]
    fn test_column_lookup() {
        let ds = Dataset::parse(SAMPLE).unwrap();
        assert_eq!(ds.column_index("price"), Some(2));
        assert_eq!(ds.column_index("missing"), None);
        let values: Vec<&str> = ds.column_values(2).collect();
        assert_eq!(values, vec!["10", "20", "30"]);
    }
}
