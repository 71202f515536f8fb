use std::sync::Arc;

use hashbrown::HashMap;

use crate::chunk::GetterContext;
use crate::data::ColumnData;
use crate::evaluator::EvalError;

/// How long a getter's outputs stay valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// Recomputed for every chunk. Outputs are per-row columns.
    PerChunk,
    /// Computed once per catalog lifetime and reused for every chunk.
    /// Outputs must be chunk-independent [`ColumnData::Shared`] payloads.
    PerLifetime,
}

pub type GetterFn =
    Arc<dyn Fn(&GetterContext) -> Result<Vec<ColumnData>, EvalError> + Send + Sync>;

/// A derived-column producer.
///
/// One invocation fills every column in `outputs` at once; a getter with two
/// or more outputs is a compound getter and its siblings are inseparable.
/// `requires` declares the exact set of columns the body reads through
/// [`GetterContext::column_by_name`].
#[derive(Clone)]
pub struct Getter {
    pub name: String,
    pub outputs: Vec<String>,
    pub requires: Vec<String>,
    pub cache: CachePolicy,
    pub func: GetterFn,
}

impl Getter {
    pub fn new<F>(
        name: impl Into<String>,
        outputs: &[&str],
        requires: &[&str],
        func: F,
    ) -> Getter
    where
        F: Fn(&GetterContext) -> Result<Vec<ColumnData>, EvalError> + Send + Sync + 'static,
    {
        Getter {
            name: name.into(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            requires: requires.iter().map(|s| s.to_string()).collect(),
            cache: CachePolicy::PerChunk,
            func: Arc::new(func),
        }
    }

    /// A getter evaluated once per catalog lifetime.
    pub fn once<F>(
        name: impl Into<String>,
        outputs: &[&str],
        requires: &[&str],
        func: F,
    ) -> Getter
    where
        F: Fn(&GetterContext) -> Result<Vec<ColumnData>, EvalError> + Send + Sync + 'static,
    {
        Getter {
            cache: CachePolicy::PerLifetime,
            ..Getter::new(name, outputs, requires, func)
        }
    }

    pub fn is_compound(&self) -> bool {
        self.outputs.len() > 1
    }
}

impl std::fmt::Debug for Getter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Getter")
            .field("name", &self.name)
            .field("outputs", &self.outputs)
            .field("requires", &self.requires)
            .field("cache", &self.cache)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("column '{column}' is claimed by both getter '{existing}' and getter '{incoming}'")]
    DuplicateColumn {
        column: String,
        existing: String,
        incoming: String,
    },
    #[error("getter '{name}' declares no output columns")]
    NoOutputs { name: String },
}

/// Who fills a column: the data source, or a registered getter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Producer {
    Native,
    Derived(usize),
}

/// All getters a catalog knows about, with a claim map from column name to
/// the getter that fills it. A column claimed by a getter is derived even
/// when the data source also carries a column of the same name.
#[derive(Default)]
pub struct ColumnRegistry {
    getters: Vec<Getter>,
    claims: HashMap<String, usize>,
}

impl ColumnRegistry {
    pub fn new() -> ColumnRegistry {
        ColumnRegistry::default()
    }

    pub fn add(&mut self, getter: Getter) -> Result<(), RegistryError> {
        if getter.outputs.is_empty() {
            return Err(RegistryError::NoOutputs { name: getter.name });
        }

        let index = self.getters.len();
        for output in getter.outputs.iter() {
            if let Some(&existing) = self.claims.get(output) {
                return Err(RegistryError::DuplicateColumn {
                    column: output.clone(),
                    existing: self.getters[existing].name.clone(),
                    incoming: getter.name,
                });
            }
        }
        for output in getter.outputs.iter() {
            self.claims.insert(output.clone(), index);
        }
        self.getters.push(getter);

        Ok(())
    }

    /// Derived if any getter claims the name, otherwise native.
    pub fn producer_of(&self, column: &str) -> Producer {
        match self.claims.get(column) {
            Some(&index) => Producer::Derived(index),
            None => Producer::Native,
        }
    }

    pub fn getter(&self, index: usize) -> &Getter {
        &self.getters[index]
    }

    pub fn getters(&self) -> &[Getter] {
        &self.getters
    }
}

/// A named bundle of getters, registered as a unit when a catalog is
/// assembled. Catalog types compose by listing the capabilities they carry.
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn register(&self, registry: &mut ColumnRegistry) -> Result<(), RegistryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(outputs: &[&str]) -> Getter {
        Getter::new(format!("noop_{}", outputs.join("_")), outputs, &[], |_| {
            Ok(vec![])
        })
    }

    #[test]
    fn claims_map_columns_to_getters() {
        let mut registry = ColumnRegistry::new();
        registry.add(noop(&["a"])).unwrap();
        registry.add(noop(&["b", "c"])).unwrap();

        assert_eq!(registry.producer_of("a"), Producer::Derived(0));
        assert_eq!(registry.producer_of("b"), Producer::Derived(1));
        assert_eq!(registry.producer_of("c"), Producer::Derived(1));
        assert_eq!(registry.producer_of("raJ2000"), Producer::Native);
    }

    #[test]
    fn duplicate_claim_is_rejected() {
        let mut registry = ColumnRegistry::new();
        registry.add(noop(&["a", "b"])).unwrap();

        let err = registry.add(noop(&["b"])).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateColumn {
                column: "b".to_string(),
                existing: "noop_a_b".to_string(),
                incoming: "noop_b".to_string(),
            }
        );

        // The failed add leaves no partial claims behind.
        assert_eq!(registry.getters().len(), 1);
    }

    #[test]
    fn empty_outputs_rejected() {
        let mut registry = ColumnRegistry::new();
        let err = registry.add(noop(&[])).unwrap_err();
        assert!(matches!(err, RegistryError::NoOutputs { .. }));
    }

    #[test]
    fn compound_detection() {
        assert!(!noop(&["a"]).is_compound());
        assert!(noop(&["a", "b"]).is_compound());
    }
}
