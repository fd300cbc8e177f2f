use std::fmt;

/// A single cell, keeping enough of its type to tell text from everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Dates, durations and error cells, kept in their displayed form.
    Other(String),
    Empty,
}

impl CellValue {
    pub fn text<S: Into<String>>(value: S) -> Self {
        CellValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// True for empty cells and text made only of whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Text(_) => "text",
            CellValue::Number(_) => "number",
            CellValue::Bool(_) => "boolean",
            CellValue::Other(_) => "non-text",
            CellValue::Empty => "empty",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) | CellValue::Other(text) => write!(f, "{}", text),
            CellValue::Number(number) => write!(f, "{}", number),
            CellValue::Bool(flag) => write!(f, "{}", flag),
            CellValue::Empty => Ok(()),
        }
    }
}

/// One data row, cells in header order.
#[derive(Debug, Clone)]
pub struct SourceRow {
    /// Zero-based position among the data rows; the header is not counted.
    pub index: usize,
    pub cells: Vec<(String, CellValue)>,
}

impl SourceRow {
    /// Value under `column`. With repeated headers the leftmost column wins.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(header, _)| header == column)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<SourceRow>,
}

impl SourceTable {
    /// Builds a table from a header row and positional data rows.
    /// Headers are trimmed; short rows are padded with empty cells.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, values)| {
                let mut values = values.into_iter();
                let cells = headers
                    .iter()
                    .map(|header| (header.clone(), values.next().unwrap_or(CellValue::Empty)))
                    .collect();
                SourceRow { index, cells }
            })
            .collect();

        Self { headers, rows }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|header| header == column)
    }

    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|column| !self.has_column(column))
            .map(|column| column.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
