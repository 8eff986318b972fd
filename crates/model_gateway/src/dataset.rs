//! Uploaded CSV dataset.
//!
//! The upload is written to a named temporary file for the lifetime of
//! the [`Dataset`]; the file is removed when the dataset is dropped, on
//! success and error paths alike. The file is parsed with `csv` into a
//! frame of string cells. The agent's context carries a summary of every
//! column computed over all rows, followed by a bounded sample.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::Path;

use csv_agent_core::{Error, Result};
use tempfile::NamedTempFile;

const BOM: char = '\u{feff}';

/// Type inferred from a column's non-empty values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    /// Every value is empty.
    Empty,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
}

impl NumericStats {
    fn from_values(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        let (min, max, sum) = values
            .iter()
            .fold((first, first, 0.0), |(min, max, sum), &v| (min.min(v), max.max(v), sum + v));
        Some(Self {
            min,
            max,
            mean: sum / values.len() as f64,
            sum,
        })
    }
}

/// Statistics over every value of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    /// Empty or whitespace-only cells.
    pub nulls: usize,
    pub distinct: usize,
    /// Present for integer and float columns.
    pub stats: Option<NumericStats>,
}

impl ColumnSummary {
    fn from_column(name: &str, rows: &[Vec<String>], index: usize) -> Self {
        let mut nulls = 0;
        let mut distinct = BTreeSet::new();
        let mut numbers = Vec::new();
        let mut numeric = true;
        let mut integer = true;

        for value in rows.iter().map(|row| row.get(index).map_or("", |v| v.trim())) {
            if value.is_empty() {
                nulls += 1;
                continue;
            }
            distinct.insert(value);
            if numeric {
                match value.parse::<f64>() {
                    Ok(n) if n.is_finite() => {
                        integer &= value.parse::<i64>().is_ok();
                        numbers.push(n);
                    }
                    _ => numeric = false,
                }
            }
        }

        let kind = match (distinct.is_empty(), numeric, integer) {
            (true, _, _) => ColumnKind::Empty,
            (false, false, _) => ColumnKind::Text,
            (false, true, true) => ColumnKind::Integer,
            (false, true, false) => ColumnKind::Float,
        };
        let stats = if numeric {
            NumericStats::from_values(&numbers)
        } else {
            None
        };

        Self {
            name: name.to_string(),
            kind,
            nulls,
            distinct: distinct.len(),
            stats,
        }
    }
}

impl fmt::Display for ColumnSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, {} nulls, {} distinct",
            self.name,
            self.kind.as_str(),
            self.nulls,
            self.distinct
        )?;
        if let Some(stats) = &self.stats {
            write!(
                f,
                ", min {}, max {}, mean {}, sum {}",
                format_stat(stats.min),
                format_stat(stats.max),
                format_stat(stats.mean),
                format_stat(stats.sum)
            )?;
        }
        Ok(())
    }
}

fn format_stat(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let s = format!("{n:.4}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug)]
pub struct Dataset {
    name: String,
    file: NamedTempFile,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    sample_len: usize,
    columns: Vec<ColumnSummary>,
    preview: String,
}

impl Dataset {
    /// Store `bytes` in a temporary file and parse it.
    ///
    /// At most `preview_rows` data rows are quoted verbatim in the prompt
    /// context; column summaries always cover every row. Empty uploads,
    /// non-UTF-8 content and rows whose width differs from the header are
    /// rejected.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8], preview_rows: usize) -> Result<Self> {
        let name = name.into();
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::dataset(format!("`{name}` is not valid UTF-8: {e}")))?;
        if text.trim().is_empty() {
            return Err(Error::dataset(format!("`{name}` is empty")));
        }

        let mut file = tempfile::Builder::new()
            .prefix("csv-agent-")
            .suffix(".csv")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file.reopen()?);

        let header: Vec<String> = reader
            .headers()
            .map_err(|e| invalid_csv(&name, e))?
            .iter()
            .enumerate()
            .map(|(i, h)| (if i == 0 { h.trim_start_matches(BOM) } else { h }).to_string())
            .collect();
        if header.iter().all(|h| h.trim().is_empty()) {
            return Err(Error::dataset(format!("`{name}` has no header row")));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| invalid_csv(&name, e))?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let columns = header
            .iter()
            .enumerate()
            .map(|(i, column)| ColumnSummary::from_column(column, &rows, i))
            .collect();
        let sample_len = rows.len().min(preview_rows);
        let preview = encode_csv(&header, &rows[..sample_len])?;

        tracing::info!(
            dataset = %name,
            path = %file.path().display(),
            rows = rows.len(),
            columns = header.len(),
            "Dataset stored"
        );

        Ok(Self {
            name,
            file,
            header,
            rows,
            sample_len,
            columns,
            preview,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the temporary copy. Valid while `self` is alive.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Column names, without BOM.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data records after the header. Quoted fields may span lines.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The leading rows quoted in the model context.
    pub fn sample(&self) -> &[Vec<String>] {
        &self.rows[..self.sample_len]
    }

    pub fn columns(&self) -> &[ColumnSummary] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether every data row fits in the sample.
    pub fn is_complete(&self) -> bool {
        self.sample_len == self.rows.len()
    }

    /// Dataset context handed to the chat model ahead of the prompt.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "You are analyzing the CSV dataset `{}` with {} data rows and {} columns.\n\n\
             Column summary over all {} rows:\n",
            self.name,
            self.row_count(),
            self.header.len(),
            self.row_count()
        );
        for column in &self.columns {
            out.push_str(&format!("- {column}\n"));
        }

        if self.is_complete() {
            out.push_str("\nThe full dataset follows.\n\n");
        } else {
            out.push_str(&format!(
                "\nThe header and the first {} of {} rows follow.\n\n",
                self.sample_len,
                self.row_count()
            ));
        }
        out.push_str("```csv\n");
        out.push_str(&self.preview);
        out.push_str("```");
        out
    }
}

fn invalid_csv(name: &str, err: csv::Error) -> Error {
    Error::dataset(format!("`{name}` is not a valid CSV: {err}"))
}

/// Re-encode `header` and `rows` as CSV text, quoting where needed.
fn encode_csv(header: &[String], rows: &[Vec<String>]) -> Result<String> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer
            .write_record(header)
            .map_err(|e| Error::dataset(format!("failed to encode preview: {e}")))?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| Error::dataset(format!("failed to encode preview: {e}")))?;
        }
        writer.flush()?;
    }
    String::from_utf8(buf).map_err(|e| Error::dataset(format!("failed to encode preview: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOKS: &str = "title,ratings_count\nGilead,361\nSpider's Web,5164\nHousekeeping,1200\n";

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parses_header_and_rows() {
        let dataset = Dataset::from_bytes("books.csv", BOOKS.as_bytes(), 10).unwrap();

        assert_eq!(dataset.name(), "books.csv");
        assert_eq!(dataset.header(), strings(&["title", "ratings_count"]).as_slice());
        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.sample().len(), 3);
        assert!(dataset.is_complete());
        assert_eq!(std::fs::read_to_string(dataset.path()).unwrap(), BOOKS);
    }

    #[test]
    fn test_sample_is_bounded() {
        let dataset = Dataset::from_bytes("books.csv", BOOKS.as_bytes(), 2).unwrap();

        assert_eq!(dataset.row_count(), 3);
        assert_eq!(
            dataset.sample(),
            &[strings(&["Gilead", "361"]), strings(&["Spider's Web", "5164"])]
        );
        assert!(!dataset.is_complete());
        assert!(dataset.describe().contains("first 2 of 3 rows"));
    }

    #[test]
    fn test_quoted_newline_stays_in_one_record() {
        let raw = "title,review\nGilead,\"great\nbook\"\nHousekeeping,ok\n";
        let dataset = Dataset::from_bytes("reviews.csv", raw.as_bytes(), 10).unwrap();

        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.rows()[0], strings(&["Gilead", "great\nbook"]));
        assert!(dataset.describe().contains("Gilead,\"great\nbook\"\nHousekeeping,ok\n"));
    }

    #[test]
    fn test_summary_covers_rows_outside_sample() {
        let mut raw = String::from("id,value\n");
        for i in 0..1000 {
            raw.push_str(&format!("{i},{}\n", i * 10));
        }
        let dataset = Dataset::from_bytes("big.csv", raw.as_bytes(), 20).unwrap();

        let value = dataset.column("value").unwrap();
        assert_eq!(value.kind, ColumnKind::Integer);
        let stats = value.stats.unwrap();
        assert_eq!(stats.max, 9990.0);
        assert_eq!(stats.sum, 4_995_000.0);

        let context = dataset.describe();
        assert!(context.contains("first 20 of 1000 rows"));
        assert!(context.contains("- value: integer, 0 nulls, 1000 distinct, min 0, max 9990, mean 4995, sum 4995000"));
        assert!(!context.contains("999,9990"));
    }

    #[test]
    fn test_column_kinds_and_nulls() {
        let raw = "a,b,c,d\n1,1.5,x,\n2,,y,\n";
        let dataset = Dataset::from_bytes("kinds.csv", raw.as_bytes(), 10).unwrap();
        let kind = |name: &str| dataset.column(name).unwrap().kind;

        assert_eq!(kind("a"), ColumnKind::Integer);
        assert_eq!(kind("b"), ColumnKind::Float);
        assert_eq!(kind("c"), ColumnKind::Text);
        assert_eq!(kind("d"), ColumnKind::Empty);
        assert_eq!(dataset.column("b").unwrap().nulls, 1);
        assert_eq!(dataset.column("d").unwrap().nulls, 2);
        assert!(dataset.column("c").unwrap().stats.is_none());
    }

    #[test]
    fn test_nan_is_text() {
        let dataset = Dataset::from_bytes("x.csv", b"v\n1\nNaN\n", 10).unwrap();
        assert_eq!(dataset.column("v").unwrap().kind, ColumnKind::Text);
    }

    #[test]
    fn test_strips_bom_crlf_and_blank_lines() {
        let raw = "\u{feff}a,b\r\n1,2\r\n\r\n3,4\r\n";
        let dataset = Dataset::from_bytes("x.csv", raw.as_bytes(), 10).unwrap();

        assert_eq!(dataset.header(), strings(&["a", "b"]).as_slice());
        assert_eq!(dataset.sample(), &[strings(&["1", "2"]), strings(&["3", "4"])]);
    }

    #[test]
    fn test_describe_contains_summary_and_data() {
        let dataset = Dataset::from_bytes("books.csv", BOOKS.as_bytes(), 10).unwrap();
        let context = dataset.describe();

        assert!(context.contains("`books.csv` with 3 data rows and 2 columns"));
        assert!(context.contains("- title: text, 0 nulls, 3 distinct\n"));
        assert!(context.contains("- ratings_count: integer, 0 nulls, 3 distinct, min 361, max 5164"));
        assert!(context.contains("The full dataset follows"));
        assert!(context.contains("```csv\ntitle,ratings_count\nGilead,361\n"));
        assert!(context.ends_with("```"));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Dataset::from_bytes("ragged.csv", b"a,b\n1\n", 10).unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
        assert!(err.to_string().contains("not a valid CSV"));
    }

    #[test]
    fn test_temp_file_removed_on_drop() {
        let dataset = Dataset::from_bytes("books.csv", BOOKS.as_bytes(), 10).unwrap();
        let path = dataset.path().to_path_buf();
        assert!(path.exists());

        drop(dataset);

        assert!(!path.exists());
    }

    #[test]
    fn test_rejects_empty_upload() {
        let err = Dataset::from_bytes("empty.csv", b"  \n", 10).unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }

    #[test]
    fn test_rejects_non_utf8() {
        let err = Dataset::from_bytes("bin.csv", &[0xff, 0xfe, 0x00], 10).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }
}
