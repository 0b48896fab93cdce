//! CSV row parser
//!
//! Turns raw upload bytes into a lazy sequence of `Result<SalesRecord, RowError>`.
//! The header is read and validated eagerly in [`RowParser::new`]; a bad header
//! fails the whole file before any row is produced. Data rows are read one
//! line at a time and a malformed row only affects itself.
//!
//! Line handling:
//! - blank lines between data rows are rejected as `EmptyLine`
//! - blank lines at the end of the file are ignored
//! - invalid UTF-8 rejects the affected row only
//! - CRLF and LF endings are both accepted, a leading BOM is tolerated

use std::io::BufRead;
use std::str::FromStr;

use rust_decimal::Decimal;
use salesdash_common::config::CsvConfig;
use thiserror::Error;

use crate::models::SalesRecord;

/// File-level header failure; nothing from the file is usable
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("CSV header is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("CSV header lists column '{0}' more than once")]
    DuplicateColumn(String),

    #[error("CSV header is not valid UTF-8")]
    InvalidHeaderEncoding,

    #[error("CSV header could not be parsed: {0}")]
    MalformedHeader(String),

    #[error("failed to read CSV header: {0}")]
    Read(String),
}

/// Rejection of a single data row; the parser moves on to the next line
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("line {line}: empty line")]
    EmptyLine { line: usize },

    #[error("line {line}: invalid UTF-8 ({reason})")]
    InvalidEncoding { line: usize, reason: String },

    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: invalid {column} '{value}': {reason}")]
    InvalidField {
        line: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error("line {line}: malformed row: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("line {line}: read failed: {reason}")]
    Read { line: usize, reason: String },
}

impl RowError {
    /// 1-based line number the error was found on
    pub fn line(&self) -> usize {
        match self {
            RowError::EmptyLine { line }
            | RowError::InvalidEncoding { line, .. }
            | RowError::FieldCount { line, .. }
            | RowError::InvalidField { line, .. }
            | RowError::Malformed { line, .. }
            | RowError::Read { line, .. } => *line,
        }
    }
}

/// Expected header layout and delimiter
///
/// Quantity and unit price columns are required. The product column is
/// optional; rows get an empty product name when it is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSchema {
    pub delimiter: u8,
    pub product_column: String,
    pub quantity_column: String,
    pub unit_price_column: String,
}

impl Default for CsvSchema {
    fn default() -> Self {
        let config = CsvConfig::default();
        Self {
            delimiter: b',',
            product_column: config.product_column,
            quantity_column: config.quantity_column,
            unit_price_column: config.unit_price_column,
        }
    }
}

impl CsvSchema {
    /// Validate the `[csv]` config section
    pub fn from_config(config: &CsvConfig) -> salesdash_common::Result<Self> {
        if !config.delimiter.is_ascii() || config.delimiter.is_ascii_alphanumeric() {
            return Err(salesdash_common::Error::Config(format!(
                "CSV delimiter must be a single ASCII punctuation or whitespace character, got {:?}",
                config.delimiter
            )));
        }
        if matches!(config.delimiter, '"' | '\r' | '\n') {
            return Err(salesdash_common::Error::Config(format!(
                "CSV delimiter {:?} is reserved",
                config.delimiter
            )));
        }

        let names = [
            &config.product_column,
            &config.quantity_column,
            &config.unit_price_column,
        ];
        for (i, name) in names.iter().enumerate() {
            if normalize_column(name).is_empty() {
                return Err(salesdash_common::Error::Config(
                    "CSV column names must not be empty".to_string(),
                ));
            }
            if names[..i]
                .iter()
                .any(|other| normalize_column(other) == normalize_column(name))
            {
                return Err(salesdash_common::Error::Config(format!(
                    "CSV column '{}' is configured twice",
                    name
                )));
            }
        }

        Ok(Self {
            delimiter: config.delimiter as u8,
            product_column: config.product_column.clone(),
            quantity_column: config.quantity_column.clone(),
            unit_price_column: config.unit_price_column.clone(),
        })
    }
}

/// Header names compare case-insensitively, ignoring spaces, `_` and `-`
fn normalize_column(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Field positions resolved from the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    product: Option<usize>,
    quantity: usize,
    unit_price: usize,
    width: usize,
}

impl ColumnIndex {
    fn resolve(header: &[String], schema: &CsvSchema) -> Result<Self, SchemaError> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_column(h)).collect();

        let find = |wanted: &str| -> Result<Option<usize>, SchemaError> {
            let key = normalize_column(wanted);
            let mut hits = normalized.iter().enumerate().filter(|(_, h)| **h == key);
            let first = hits.next().map(|(i, _)| i);
            if hits.next().is_some() {
                return Err(SchemaError::DuplicateColumn(wanted.to_string()));
            }
            Ok(first)
        };

        let product = find(&schema.product_column)?;
        let quantity = find(&schema.quantity_column)?;
        let unit_price = find(&schema.unit_price_column)?;

        match (quantity, unit_price) {
            (Some(quantity), Some(unit_price)) => Ok(Self {
                product,
                quantity,
                unit_price,
                width: header.len(),
            }),
            _ => {
                let mut missing = Vec::new();
                if quantity.is_none() {
                    missing.push(schema.quantity_column.clone());
                }
                if unit_price.is_none() {
                    missing.push(schema.unit_price_column.clone());
                }
                Err(SchemaError::MissingColumns(missing))
            }
        }
    }
}

/// Lazy, single-pass iterator over the data rows of one CSV upload
pub struct RowParser<R> {
    lines: std::io::Split<R>,
    delimiter: u8,
    /// `None` when the input had no header at all
    columns: Option<ColumnIndex>,
    line_no: usize,
    /// Run of blank lines since the last data row as `(first_line, count)`;
    /// rejected only if another row follows
    blank_run: Option<(usize, usize)>,
    /// Row read after a blank run, returned once the run is drained
    held: Option<Result<SalesRecord, RowError>>,
    finished: bool,
}

impl<'a> RowParser<&'a [u8]> {
    /// Parse an in-memory upload
    pub fn from_slice(bytes: &'a [u8], schema: &CsvSchema) -> Result<Self, SchemaError> {
        Self::new(bytes, schema)
    }
}

impl<R: BufRead> RowParser<R> {
    /// Read and validate the header line
    ///
    /// Leading blank lines are skipped. Input without any non-blank line
    /// produces a parser that yields nothing.
    pub fn new(reader: R, schema: &CsvSchema) -> Result<Self, SchemaError> {
        let mut lines = reader.split(b'\n');
        let mut line_no = 0;
        let mut columns = None;

        for line in lines.by_ref() {
            let bytes = line.map_err(|e| SchemaError::Read(e.to_string()))?;
            line_no += 1;

            let bytes = trim_line_end(&bytes);
            if is_blank(bytes) {
                continue;
            }

            let text = std::str::from_utf8(bytes).map_err(|_| SchemaError::InvalidHeaderEncoding)?;
            let text = text.strip_prefix('\u{feff}').unwrap_or(text);
            let header: Vec<String> = split_fields(text, schema.delimiter)
                .map_err(|e| SchemaError::MalformedHeader(e.to_string()))?
                .iter()
                .map(str::to_string)
                .collect();

            columns = Some(ColumnIndex::resolve(&header, schema)?);
            break;
        }

        Ok(Self {
            lines,
            delimiter: schema.delimiter,
            columns,
            line_no,
            blank_run: None,
            held: None,
            finished: columns.is_none(),
        })
    }

    /// Whether a header was found (false only for blank input)
    pub fn has_header(&self) -> bool {
        self.columns.is_some()
    }
}

impl<R: BufRead> Iterator for RowParser<R> {
    type Item = Result<SalesRecord, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.held.is_some() {
                if let Some((first, count)) = self.blank_run {
                    self.blank_run = (count > 1).then_some((first + 1, count - 1));
                    return Some(Err(RowError::EmptyLine { line: first }));
                }
                return self.held.take();
            }
            if self.finished {
                return None;
            }
            let columns = self.columns?;

            match self.lines.next() {
                None => {
                    // Trailing blank lines are not rejections
                    self.blank_run = None;
                    self.finished = true;
                }
                Some(Err(e)) => {
                    self.line_no += 1;
                    self.finished = true;
                    return Some(Err(RowError::Read {
                        line: self.line_no,
                        reason: e.to_string(),
                    }));
                }
                Some(Ok(bytes)) => {
                    self.line_no += 1;
                    let line = self.line_no;
                    let bytes = trim_line_end(&bytes);

                    if is_blank(bytes) {
                        self.blank_run = Some(match self.blank_run {
                            Some((first, count)) => (first, count + 1),
                            None => (line, 1),
                        });
                        continue;
                    }

                    let row = match std::str::from_utf8(bytes) {
                        Ok(text) => parse_row(line, text, self.delimiter, columns),
                        Err(e) => Err(RowError::InvalidEncoding {
                            line,
                            reason: e.to_string(),
                        }),
                    };
                    if self.blank_run.is_none() {
                        return Some(row);
                    }
                    self.held = Some(row);
                }
            }
        }
    }
}

fn trim_line_end(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Split one line into trimmed fields, honouring quotes within the line
fn split_fields(line: &str, delimiter: u8) -> Result<csv::StringRecord, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .buffer_capacity(line.len() + 1)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record)
}

fn parse_row(
    line: usize,
    text: &str,
    delimiter: u8,
    columns: ColumnIndex,
) -> Result<SalesRecord, RowError> {
    let fields = split_fields(text, delimiter).map_err(|e| RowError::Malformed {
        line,
        reason: e.to_string(),
    })?;

    if fields.len() != columns.width {
        return Err(RowError::FieldCount {
            line,
            expected: columns.width,
            found: fields.len(),
        });
    }

    let quantity = parse_quantity(&fields[columns.quantity]).map_err(|reason| {
        RowError::InvalidField {
            line,
            column: "quantity".to_string(),
            value: fields[columns.quantity].to_string(),
            reason,
        }
    })?;

    let unit_price = parse_unit_price(&fields[columns.unit_price]).map_err(|reason| {
        RowError::InvalidField {
            line,
            column: "unit price".to_string(),
            value: fields[columns.unit_price].to_string(),
            reason,
        }
    })?;

    let product_name = columns
        .product
        .map(|i| fields[i].to_string())
        .unwrap_or_default();

    Ok(SalesRecord {
        product_name,
        quantity,
        unit_price,
    })
}

fn parse_quantity(value: &str) -> Result<u64, String> {
    if value.starts_with('-') {
        return Err("must not be negative".to_string());
    }
    u64::from_str(value).map_err(|e| e.to_string())
}

/// Most decimal places accepted in a unit price
pub const MAX_PRICE_SCALE: u32 = 10;

fn parse_unit_price(value: &str) -> Result<Decimal, String> {
    let places = value
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.bytes().filter(u8::is_ascii_digit).count());
    if places > MAX_PRICE_SCALE as usize {
        return Err(format!("more than {} decimal places", MAX_PRICE_SCALE));
    }

    let price = Decimal::from_str(value).map_err(|e| e.to_string())?;
    // `from_str` rounds away digits it cannot hold
    if price.scale() as usize != places {
        return Err("too many significant digits".to_string());
    }
    if price.is_sign_negative() && !price.is_zero() {
        return Err("must not be negative".to_string());
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn parse_all(input: &[u8]) -> Vec<Result<SalesRecord, RowError>> {
        RowParser::from_slice(input, &CsvSchema::default())
            .unwrap()
            .collect()
    }

    #[test]
    fn test_parses_well_formed_rows() {
        let rows = parse_all(b"productName,quantity,pricePerUnit\nWidget,3,10.00\nGadget,2,5.50\n");

        assert_eq!(
            rows,
            vec![
                Ok(SalesRecord {
                    product_name: "Widget".to_string(),
                    quantity: 3,
                    unit_price: dec("10.00"),
                }),
                Ok(SalesRecord {
                    product_name: "Gadget".to_string(),
                    quantity: 2,
                    unit_price: dec("5.50"),
                }),
            ]
        );
    }

    #[test]
    fn test_header_matching_is_loose_and_order_independent() {
        let rows = parse_all(b"Price Per Unit,QUANTITY,product_name,region\n2.5,4,Bolt,EU\n");

        assert_eq!(
            rows,
            vec![Ok(SalesRecord {
                product_name: "Bolt".to_string(),
                quantity: 4,
                unit_price: dec("2.5"),
            })]
        );
    }

    #[test]
    fn test_missing_columns_is_schema_error() {
        let result = RowParser::from_slice(b"productName,quantity\nWidget,3\n", &CsvSchema::default());

        assert_eq!(
            result.err(),
            Some(SchemaError::MissingColumns(vec!["pricePerUnit".to_string()]))
        );
    }

    #[test]
    fn test_duplicate_column_is_schema_error() {
        let result = RowParser::from_slice(
            b"quantity,pricePerUnit,Quantity\n1,2,3\n",
            &CsvSchema::default(),
        );

        assert_eq!(
            result.err(),
            Some(SchemaError::DuplicateColumn("quantity".to_string()))
        );
    }

    #[test]
    fn test_invalid_header_encoding() {
        let result = RowParser::from_slice(b"qu\xffantity,pricePerUnit\n", &CsvSchema::default());
        assert_eq!(result.err(), Some(SchemaError::InvalidHeaderEncoding));
    }

    #[test]
    fn test_product_column_is_optional() {
        let rows = parse_all(b"quantity,pricePerUnit\n7,1.25\n");
        assert_eq!(
            rows,
            vec![Ok(SalesRecord {
                product_name: String::new(),
                quantity: 7,
                unit_price: dec("1.25"),
            })]
        );
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let parser = RowParser::from_slice(b"", &CsvSchema::default()).unwrap();
        assert!(!parser.has_header());
        assert_eq!(parser.count(), 0);

        let parser = RowParser::from_slice(b"\n  \r\n", &CsvSchema::default()).unwrap();
        assert!(!parser.has_header());
        assert_eq!(parser.count(), 0);
    }

    #[test]
    fn test_header_only_yields_nothing() {
        let parser = RowParser::from_slice(b"productName,quantity,pricePerUnit\n", &CsvSchema::default())
            .unwrap();
        assert!(parser.has_header());
        assert_eq!(parser.count(), 0);
    }

    #[test]
    fn test_malformed_row_does_not_stop_parsing() {
        let rows = parse_all(b"productName,quantity,pricePerUnit\nA,1,1.00\nB,many,2.00\nC,2,3.00\n");

        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        assert!(matches!(
            &rows[1],
            Err(RowError::InvalidField { line: 3, column, value, .. })
                if column == "quantity" && value == "many"
        ));
        assert!(rows[2].is_ok());
    }

    #[test]
    fn test_wrong_field_count() {
        let rows = parse_all(b"productName,quantity,pricePerUnit\nA,1\nB,1,2,3\n");
        assert_eq!(
            rows,
            vec![
                Err(RowError::FieldCount {
                    line: 2,
                    expected: 3,
                    found: 2
                }),
                Err(RowError::FieldCount {
                    line: 3,
                    expected: 3,
                    found: 4
                }),
            ]
        );
    }

    #[test]
    fn test_negative_values_rejected() {
        let rows = parse_all(b"productName,quantity,pricePerUnit\nA,-1,1.00\nB,1,-0.50\n");
        assert!(matches!(&rows[0], Err(RowError::InvalidField { line: 2, .. })));
        assert!(matches!(&rows[1], Err(RowError::InvalidField { line: 3, .. })));
    }

    #[test]
    fn test_price_precision_is_bounded() {
        let rows = parse_all(
            b"productName,quantity,pricePerUnit\n\
              A,1,0.0000000001\n\
              B,1,0.00000000001\n\
              C,1,123456789012345678901234567.891\n",
        );

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].as_ref().unwrap().unit_price, Decimal::new(1, 10));
        assert!(matches!(
            &rows[1],
            Err(RowError::InvalidField { line: 3, reason, .. }) if reason.contains("decimal places")
        ));
        assert!(matches!(&rows[2], Err(RowError::InvalidField { line: 4, .. })));
    }

    #[test]
    fn test_interior_blank_line_rejected_trailing_ignored() {
        let rows = parse_all(b"productName,quantity,pricePerUnit\nA,1,1.00\n\nB,1,1.00\n\n\r\n\n");

        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        assert_eq!(rows[1], Err(RowError::EmptyLine { line: 3 }));
        assert!(rows[2].is_ok());
    }

    #[test]
    fn test_blank_run_is_drained_one_row_at_a_time() {
        let mut input = b"productName,quantity,pricePerUnit\n".to_vec();
        input.extend(std::iter::repeat(b'\n').take(1_000_000));
        input.extend_from_slice(b"A,1,1.00\n");

        let mut parser = RowParser::from_slice(&input, &CsvSchema::default()).unwrap();
        assert_eq!(parser.next(), Some(Err(RowError::EmptyLine { line: 2 })));

        // Only the run bounds and the following row are held
        assert_eq!(parser.blank_run, Some((3, 999_999)));
        assert!(matches!(parser.held, Some(Ok(_))));

        assert_eq!(parser.next(), Some(Err(RowError::EmptyLine { line: 3 })));
        let rest: Vec<_> = parser.by_ref().skip(999_998).collect();
        assert_eq!(
            rest,
            vec![Ok(SalesRecord {
                product_name: "A".to_string(),
                quantity: 1,
                unit_price: dec("1.00"),
            })]
        );
        assert_eq!(parser.next(), None);
    }

    #[test]
    fn test_separate_blank_runs_keep_line_numbers() {
        let rows = parse_all(b"productName,quantity,pricePerUnit\n\nA,1,1.00\n\n\nB,2,2.00\n");

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], Err(RowError::EmptyLine { line: 2 }));
        assert!(rows[1].is_ok());
        assert_eq!(rows[2], Err(RowError::EmptyLine { line: 4 }));
        assert_eq!(rows[3], Err(RowError::EmptyLine { line: 5 }));
        assert!(rows[4].is_ok());
    }

    #[test]
    fn test_invalid_utf8_rejects_only_that_row() {
        let rows = parse_all(b"productName,quantity,pricePerUnit\nCaf\xe9,1,1.00\nTea,2,2.00\n");

        assert_eq!(rows.len(), 2);
        assert!(matches!(&rows[0], Err(RowError::InvalidEncoding { line: 2, .. })));
        assert!(rows[1].is_ok());
    }

    #[test]
    fn test_crlf_bom_and_quoted_fields() {
        let rows = parse_all(
            b"\xef\xbb\xbfproductName,quantity,pricePerUnit\r\n\"Widget, large\", 2 , 4.00 \r\n",
        );

        assert_eq!(
            rows,
            vec![Ok(SalesRecord {
                product_name: "Widget, large".to_string(),
                quantity: 2,
                unit_price: dec("4.00"),
            })]
        );
    }

    #[test]
    fn test_custom_delimiter() {
        let schema = CsvSchema::from_config(&CsvConfig {
            delimiter: ';',
            ..CsvConfig::default()
        })
        .unwrap();
        let rows: Vec<_> = RowParser::from_slice(b"productName;quantity;pricePerUnit\nA;2;3.5\n", &schema)
            .unwrap()
            .collect();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_ref().unwrap().quantity, 2);
    }

    #[test]
    fn test_schema_config_validation() {
        let bad_delimiter = CsvConfig {
            delimiter: 'x',
            ..CsvConfig::default()
        };
        assert!(CsvSchema::from_config(&bad_delimiter).is_err());

        let duplicate = CsvConfig {
            unit_price_column: "Quantity".to_string(),
            ..CsvConfig::default()
        };
        assert!(CsvSchema::from_config(&duplicate).is_err());

        let empty = CsvConfig {
            quantity_column: "  ".to_string(),
            ..CsvConfig::default()
        };
        assert!(CsvSchema::from_config(&empty).is_err());
    }

    #[test]
    fn test_row_error_line_accessor() {
        let err = RowError::FieldCount {
            line: 9,
            expected: 3,
            found: 1,
        };
        assert_eq!(err.line(), 9);
        assert_eq!(err.to_string(), "line 9: expected 3 fields, found 1");
    }
}
