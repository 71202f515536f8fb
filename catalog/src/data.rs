use std::any::Any;
use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Per-row scalar value.
///
/// `Float(NaN)` is the null sentinel for floating-point columns: a data source
/// that has no value for a row stores NaN, and a `Null` default broadcast into
/// a float column also materializes as NaN.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(left), Value::Int(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => left.to_bits() == right.to_bits(),
            (Value::Str(left), Value::Str(right)) => left == right,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "nan"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
        }
    }
}

/// One column of a chunk.
///
/// The first three variants hold one value per row. `Shared` holds a
/// chunk-independent payload produced by a per-lifetime getter (a loaded
/// bandpass table, for example) that downstream getters downcast with
/// [`ColumnData::as_shared`].
#[derive(Clone, Debug)]
pub enum ColumnData {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Str(Vec<String>),
    Shared(Arc<dyn Any + Send + Sync>),
}

impl ColumnData {
    /// Row count, or `None` for chunk-independent `Shared` payloads.
    pub fn len(&self) -> Option<usize> {
        match self {
            ColumnData::Float(values) => Some(values.len()),
            ColumnData::Int(values) => Some(values.len()),
            ColumnData::Str(values) => Some(values.len()),
            ColumnData::Shared(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    pub fn shared<T: Any + Send + Sync>(value: T) -> ColumnData {
        ColumnData::Shared(Arc::new(value))
    }

    pub fn as_floats(&self) -> &[f64] {
        match self {
            ColumnData::Float(values) => values,
            _ => panic!("Column is not a float column"),
        }
    }

    pub fn as_ints(&self) -> &[i64] {
        match self {
            ColumnData::Int(values) => values,
            _ => panic!("Column is not an int column"),
        }
    }

    pub fn as_strs(&self) -> &[String] {
        match self {
            ColumnData::Str(values) => values,
            _ => panic!("Column is not a string column"),
        }
    }

    pub fn as_shared<T: Any + Send + Sync>(&self) -> &T {
        match self {
            ColumnData::Shared(data) => data
                .downcast_ref::<T>()
                .expect("Shared column payload type mismatch"),
            _ => panic!("Column is not a shared context column"),
        }
    }

    pub fn value_at(&self, row: usize) -> Value {
        match self {
            ColumnData::Float(values) => Value::Float(values[row]),
            ColumnData::Int(values) => Value::Int(values[row]),
            ColumnData::Str(values) => Value::Str(values[row].clone()),
            ColumnData::Shared(_) => panic!("Shared context column has no per-row values"),
        }
    }

    pub fn is_null_at(&self, row: usize) -> bool {
        match self {
            ColumnData::Float(values) => values[row].is_nan(),
            _ => false,
        }
    }

    /// Repeats a scalar default over every row of a chunk.
    /// A `Null` default materializes as a float column of NaN.
    pub fn broadcast(value: &Value, rows: usize) -> ColumnData {
        match value {
            Value::Null => ColumnData::Float(vec![f64::NAN; rows]),
            Value::Float(v) => ColumnData::Float(vec![*v; rows]),
            Value::Int(v) => ColumnData::Int(vec![*v; rows]),
            Value::Str(v) => ColumnData::Str(vec![v.clone(); rows]),
        }
    }
}

impl From<Vec<f64>> for ColumnData {
    fn from(values: Vec<f64>) -> Self {
        ColumnData::Float(values)
    }
}

impl From<Vec<i64>> for ColumnData {
    fn from(values: Vec<i64>) -> Self {
        ColumnData::Int(values)
    }
}

impl From<Vec<String>> for ColumnData {
    fn from(values: Vec<String>) -> Self {
        ColumnData::Str(values)
    }
}
