use std::any::Any;
use std::cell::RefCell;

use hashbrown::HashMap;

use crate::data::ColumnData;
use crate::evaluator::EvalError;
use crate::obs::ObservationMetadata;

/// Working set of columns for one batch of rows.
///
/// Starts from the native columns the plan pulled out of the data source and
/// grows as getters run; a column inserted here is final for the chunk.
#[derive(Debug, Default)]
pub struct Chunk {
    columns: HashMap<String, ColumnData>,
    rows: usize,
}

impl Chunk {
    pub fn new(rows: usize) -> Chunk {
        Chunk {
            columns: HashMap::new(),
            rows,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn insert(&mut self, name: impl Into<String>, data: ColumnData) {
        if let Some(len) = data.len() {
            assert_eq!(len, self.rows, "chunk column length mismatch");
        }
        self.columns.insert(name.into(), data);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }
}

/// What a getter body sees while it runs: the chunk so far plus the
/// observation context. Every column access goes through
/// [`column_by_name`](GetterContext::column_by_name) and is recorded, so the
/// evaluator can check the access set against the getter's declared
/// requirements.
pub struct GetterContext<'a> {
    chunk: &'a Chunk,
    obs: &'a ObservationMetadata,
    requested: RefCell<Vec<String>>,
}

impl<'a> GetterContext<'a> {
    pub fn new(chunk: &'a Chunk, obs: &'a ObservationMetadata) -> GetterContext<'a> {
        GetterContext {
            chunk,
            obs,
            requested: RefCell::new(Vec::new()),
        }
    }

    pub fn rows(&self) -> usize {
        self.chunk.rows()
    }

    pub fn obs(&self) -> &'a ObservationMetadata {
        self.obs
    }

    /// A column by name, recorded as an access. The returned borrow is tied
    /// to the chunk, so a getter can hold several columns at once.
    pub fn column_by_name(&self, name: &str) -> Result<&'a ColumnData, EvalError> {
        self.requested.borrow_mut().push(name.to_string());
        self.chunk
            .column(name)
            .ok_or_else(|| EvalError::MissingColumn {
                column: name.to_string(),
            })
    }

    pub fn floats(&self, name: &str) -> Result<&'a [f64], EvalError> {
        Ok(self.column_by_name(name)?.as_floats())
    }

    pub fn strs(&self, name: &str) -> Result<&'a [String], EvalError> {
        Ok(self.column_by_name(name)?.as_strs())
    }

    pub fn shared<T: Any + Send + Sync>(&self, name: &str) -> Result<&'a T, EvalError> {
        Ok(self.column_by_name(name)?.as_shared::<T>())
    }

    /// Columns the body actually read, in access order.
    pub fn accessed(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}
