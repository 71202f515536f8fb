use std::io::Write;

use crate::data::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("unsupported format specifier '{spec}'")]
    UnsupportedSpec { spec: String },
    #[error("format '{spec}' for column '{column}' cannot render a {kind} value")]
    KindMismatch {
        spec: String,
        column: String,
        kind: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatKind {
    Str,
    Int,
    Fixed(usize),
    Scientific(usize),
}

/// A printf-style cell format: `%s`, `%d`, `%i`, `%f`, `%e`, `%.Nf`, `%.Ne`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFormat {
    spec: String,
    kind: FormatKind,
}

impl ColumnFormat {
    pub fn parse(spec: &str) -> Result<ColumnFormat, FormatError> {
        let unsupported = || FormatError::UnsupportedSpec {
            spec: spec.to_string(),
        };

        let body = spec.strip_prefix('%').ok_or_else(unsupported)?;
        let kind = match body {
            "s" => FormatKind::Str,
            "d" | "i" => FormatKind::Int,
            // Bare %f and %e carry printf's implicit 6-digit precision.
            "f" => FormatKind::Fixed(6),
            "e" => FormatKind::Scientific(6),
            _ => {
                let (precision, conv) = body.split_at(body.len().saturating_sub(1));
                let digits = precision.strip_prefix('.').ok_or_else(unsupported)?;
                let digits: usize = digits.parse().map_err(|_| unsupported())?;
                match conv {
                    "f" => FormatKind::Fixed(digits),
                    "e" => FormatKind::Scientific(digits),
                    _ => return Err(unsupported()),
                }
            }
        };

        Ok(ColumnFormat {
            spec: spec.to_string(),
            kind,
        })
    }

    /// The fallback for float columns with no explicit override.
    pub fn default_float() -> ColumnFormat {
        ColumnFormat {
            spec: "%.4f".to_string(),
            kind: FormatKind::Fixed(4),
        }
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    fn mismatch(&self, column: &str, value: &Value) -> FormatError {
        FormatError::KindMismatch {
            spec: self.spec.clone(),
            column: column.to_string(),
            kind: value.kind_name(),
        }
    }

    /// Renders one cell. Nulls and NaN floats print as `nan` regardless of
    /// the numeric format.
    pub fn render(&self, column: &str, value: &Value) -> Result<String, FormatError> {
        if value.is_null() {
            return Ok("nan".to_string());
        }

        let rendered = match (self.kind, value) {
            (FormatKind::Str, Value::Str(v)) => v.clone(),
            (FormatKind::Int, Value::Int(v)) => format!("{}", v),
            (FormatKind::Fixed(digits), Value::Float(v)) => format!("{:.*}", digits, v),
            (FormatKind::Scientific(digits), Value::Float(v)) => format!("{:.*e}", digits, v),
            // Ints are acceptable wherever a float format is configured.
            (FormatKind::Fixed(digits), Value::Int(v)) => format!("{:.*}", digits, *v as f64),
            (FormatKind::Scientific(digits), Value::Int(v)) => format!("{:.*e}", digits, *v as f64),
            _ => return Err(self.mismatch(column, value)),
        };

        Ok(rendered)
    }
}

/// Streams formatted catalog text: one `#`-prefixed header line, then one
/// delimited line per surviving row.
pub struct CatalogWriter<W: Write> {
    sink: W,
    delimiter: String,
    columns: Vec<String>,
    formats: Vec<ColumnFormat>,
}

impl<W: Write> CatalogWriter<W> {
    pub fn new(
        sink: W,
        delimiter: impl Into<String>,
        columns: Vec<String>,
        formats: Vec<ColumnFormat>,
    ) -> CatalogWriter<W> {
        assert_eq!(columns.len(), formats.len());
        CatalogWriter {
            sink,
            delimiter: delimiter.into(),
            columns,
            formats,
        }
    }

    pub fn write_header(&mut self) -> Result<(), WriteError> {
        writeln!(self.sink, "#{}", self.columns.join(&self.delimiter))?;
        Ok(())
    }

    pub fn write_row(&mut self, row: &[Value]) -> Result<(), WriteError> {
        debug_assert_eq!(row.len(), self.columns.len());

        let mut line = String::new();
        for (index, value) in row.iter().enumerate() {
            if index > 0 {
                line.push_str(&self.delimiter);
            }
            line.push_str(&self.formats[index].render(&self.columns[index], value)?);
        }
        writeln!(self.sink, "{}", line)?;

        Ok(())
    }

    pub fn finish(mut self) -> Result<W, WriteError> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}
