use crate::error::{AnalysisError, Result};
use crate::structs::{
    Column, ColumnData, DatasetFormat, DatasetSource, InlineSource, PathSource, Table,
};
use csv::ReaderBuilder;
use log::{debug, warn};
use std::path::Path;

/// Cell contents treated as missing in addition to the empty string
const NA_TOKENS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

impl DatasetSource for PathSource {
    fn name(&self) -> &str {
        &self.display
    }

    fn read_text(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(AnalysisError::DatasetNotFound(self.display.clone()));
        }
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

impl DatasetSource for InlineSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_text(&self) -> Result<String> {
        Ok(self.content.clone())
    }
}

impl DatasetFormat {
    /// Pick the format from a file name extension
    ///
    /// # Errors
    /// Returns `UnsupportedFormat` for anything but csv, tsv or txt
    pub fn from_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "txt" => Ok(Self::Txt),
            _ => Err(AnalysisError::UnsupportedFormat(name.to_string())),
        }
    }

    /// Field delimiter; `.txt` uses tab when the first line contains one
    #[must_use]
    pub fn delimiter(self, text: &str) -> u8 {
        match self {
            Self::Csv => b',',
            Self::Tsv => b'\t',
            Self::Txt => {
                let first_line = text.lines().next().unwrap_or_default();
                if first_line.contains('\t') {
                    b'\t'
                } else {
                    b','
                }
            }
        }
    }
}

impl Table {
    /// Load a dataset from any source
    ///
    /// # Errors
    /// Returns error if the source cannot be read, has an unsupported
    /// extension, or is not valid delimited text
    pub fn load(source: &dyn DatasetSource) -> Result<Self> {
        let text = source.read_text()?;
        let format = DatasetFormat::from_name(source.name())?;
        let table = Self::parse(&text, format.delimiter(&text))?;
        debug!(
            "Loaded {} rows x {} columns from {}",
            table.row_count(),
            table.col_count(),
            source.name()
        );
        debug!("Columns: {:?}", table.headers());
        Ok(table)
    }

    /// Parse delimited text with the first row as header
    ///
    /// # Errors
    /// Returns error if the text is not valid delimited data
    pub fn parse(text: &str, delimiter: u8) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = unique_headers(reader.headers()?.iter().map(str::trim));
        let width = headers.len();

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); width];
        let mut n_rows = 0usize;
        for result in reader.records() {
            let record = result?;
            if record.len() > width {
                warn!(
                    "Row {} has {} fields, expected {width}; extra fields ignored",
                    n_rows + 1,
                    record.len()
                );
            }
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(record.get(i).map(str::trim).unwrap_or_default().to_string());
            }
            n_rows += 1;
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| {
                let data = type_column(&cells);
                Column { name, cells, data }
            })
            .collect();

        Ok(Self { columns, n_rows })
    }
}

/// Whether a raw cell counts as missing
fn is_missing(cell: &str) -> bool {
    cell.is_empty() || NA_TOKENS.contains(&cell)
}

fn parse_cell(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Decide numeric vs categorical and convert
///
/// Numeric if at least 50% of non-missing cells parse as numbers; cells that
/// fail to parse become missing entries.
#[allow(clippy::cast_precision_loss)]
fn type_column(cells: &[String]) -> ColumnData {
    let present: Vec<&String> = cells.iter().filter(|c| !is_missing(c)).collect();
    let numeric_count = present.iter().filter(|c| c.parse::<f64>().is_ok()).count();

    if present.is_empty() || numeric_count as f64 / present.len() as f64 >= 0.5 {
        ColumnData::Numeric(cells.iter().map(|c| parse_cell(c)).collect())
    } else {
        ColumnData::Categorical
    }
}

/// Make header names unique by suffixing `.1`, `.2`, ... on repeats
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for name in raw {
        let mut candidate = name.to_string();
        let mut suffix = 1;
        while headers.contains(&candidate) {
            candidate = format!("{name}.{suffix}");
            suffix += 1;
        }
        headers.push(candidate);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn create_test_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_csv() {
        let file = create_test_file(
            ".csv",
            "name,value,count\nalpha,1.5,10\nbeta,2.5,20\ngamma,3.5,30",
        );

        let table = Table::load(&PathSource::new(file.path())).unwrap();

        assert_eq!(table.headers(), vec!["name", "value", "count"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.col_count(), 3);
    }

    #[test]
    fn test_numeric_columns() {
        let source = InlineSource::new("data.csv", "name,value,count\nalpha,1.5,10\nbeta,2.5,20");
        let table = Table::load(&source).unwrap();

        assert_eq!(table.numeric_column_names(), vec!["value", "count"]);
        assert!(!table.columns[0].is_numeric());
    }

    #[test]
    fn test_missing_cells_are_not_zero() {
        let source = InlineSource::new("data.csv", "id,x\na,1.0\nb,\nc,NA\nd,oops\ne,5");
        let table = Table::load(&source).unwrap();
        let x = table.column("x").unwrap();

        assert_eq!(
            x.values().unwrap(),
            &[Some(1.0), None, None, None, Some(5.0)]
        );
        assert_eq!(x.missing_count(), 3);
        assert_eq!(x.present_values(), vec![1.0, 5.0]);
    }

    #[test]
    fn test_tsv_and_txt_sniffing() {
        let tsv = Table::load(&InlineSource::new("a.TSV", "a\tb\n1\t2")).unwrap();
        assert_eq!(tsv.headers(), vec!["a", "b"]);

        let tabbed = Table::load(&InlineSource::new("a.txt", "a\tb\n1\t2")).unwrap();
        assert_eq!(tabbed.headers(), vec!["a", "b"]);

        let commas = Table::load(&InlineSource::new("a.txt", "a,b\n1,2")).unwrap();
        assert_eq!(commas.headers(), vec!["a", "b"]);
    }

    #[test]
    fn test_unsupported_format() {
        let err = Table::load(&InlineSource::new("data.xlsx", "a,b\n1,2")).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_path() {
        let err = Table::load(&PathSource::new("/nonexistent/dir/data.csv")).unwrap_err();
        assert!(matches!(err, AnalysisError::DatasetNotFound(_)));
    }

    #[test]
    fn test_duplicate_headers_and_short_rows() {
        let table = Table::load(&InlineSource::new("d.csv", "a,a,b\n1,2\n3,4,5")).unwrap();

        assert_eq!(table.headers(), vec!["a", "a.1", "b"]);
        assert_eq!(table.column("b").unwrap().values().unwrap(), &[None, Some(5.0)]);
    }
}
