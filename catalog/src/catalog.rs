use std::io::Write;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use common::FileFormat;

use crate::data::{ColumnData, Value};
use crate::evaluator::{ChunkEvaluator, ChunkOutput, EvalError};
use crate::obs::ObservationMetadata;
use crate::registry::{Capability, ColumnRegistry, RegistryError};
use crate::resolver::{resolve, EvalPlan, ResolveError};
use crate::source::DataSource;
use crate::writer::{CatalogWriter, ColumnFormat, FormatError, WriteError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("catalog '{name}' lists no output columns")]
    NoOutputColumns { name: String },
    #[error("catalog '{name}' has a chunk size of 0; streaming needs at least one row per chunk")]
    ZeroChunkSize { name: String },
    #[error("catalog type '{name}' is already registered")]
    DuplicateCatalogType { name: String },
    #[error("unknown catalog type '{name}'")]
    UnknownCatalogType { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("data source failed: {0}")]
    Source(#[from] anyhow::Error),
}

fn default_delimiter() -> String {
    ", ".to_string()
}

fn default_float_format() -> String {
    "%.4f".to_string()
}

fn default_chunk_size() -> usize {
    1000
}

/// Declarative description of one catalog: which columns it emits and how
/// they are rendered. Loadable from YAML or JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogDef {
    pub name: String,
    /// Columns written out, in order.
    pub column_outputs: Vec<String>,
    /// Columns that must be non-null for a row to survive. Computed even
    /// when not written.
    #[serde(default)]
    pub cannot_be_null: Vec<String>,
    /// Fallback values for native columns the data source does not carry.
    #[serde(default)]
    pub default_columns: HashMap<String, Value>,
    /// Per-column printf-style format overrides.
    #[serde(default)]
    pub format_overrides: HashMap<String, String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_float_format")]
    pub default_float_format: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl CatalogDef {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let format = FileFormat::from_file_name(path)?;
        let serialized = std::fs::read_to_string(path)?;
        Ok(common::deserialize(&serialized, format)?)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(common::deserialize(yaml, FileFormat::Yaml)?)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(common::serialize(self, FileFormat::Yaml)?)
    }
}

/// A catalog bound to its observation context, with the evaluation plan
/// resolved up front. Construction fails fast on duplicate column claims,
/// dependency cycles, and bad format specifiers; evaluation never revisits
/// those checks.
pub struct Catalog {
    def: CatalogDef,
    obs: ObservationMetadata,
    registry: ColumnRegistry,
    plan: EvalPlan,
    formats: Vec<ColumnFormat>,
    lifetime_cache: HashMap<usize, Vec<ColumnData>>,
    invocation_log: Vec<String>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("def", &self.def)
            .field("plan", &self.plan)
            .field("cached_getters", &self.lifetime_cache.len())
            .field("invocations", &self.invocation_log.len())
            .finish()
    }
}

impl Catalog {
    pub fn new(
        def: CatalogDef,
        capabilities: &[Arc<dyn Capability>],
        obs: ObservationMetadata,
    ) -> Result<Catalog, ConfigError> {
        if def.column_outputs.is_empty() {
            return Err(ConfigError::NoOutputColumns { name: def.name });
        }
        if def.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize { name: def.name });
        }

        let mut registry = ColumnRegistry::new();
        for capability in capabilities {
            capability.register(&mut registry)?;
        }

        // Null guards participate in resolution even when not written out.
        let mut requested = def.column_outputs.clone();
        for name in def.cannot_be_null.iter() {
            if !requested.contains(name) {
                requested.push(name.clone());
            }
        }
        let plan = resolve(&registry, &requested)?;

        let default_format = ColumnFormat::parse(&def.default_float_format)?;
        let mut formats = Vec::with_capacity(def.column_outputs.len());
        for column in def.column_outputs.iter() {
            let format = match def.format_overrides.get(column) {
                Some(spec) => ColumnFormat::parse(spec)?,
                None => default_format.clone(),
            };
            formats.push(format);
        }

        info!(
            catalog = %def.name,
            getters = plan.invocations.len(),
            natives = plan.native_columns.len(),
            "resolved catalog evaluation plan"
        );

        Ok(Catalog {
            def,
            obs,
            registry,
            plan,
            formats,
            lifetime_cache: HashMap::new(),
            invocation_log: Vec::new(),
        })
    }

    pub fn def(&self) -> &CatalogDef {
        &self.def
    }

    pub fn obs(&self) -> &ObservationMetadata {
        &self.obs
    }

    pub fn plan(&self) -> &EvalPlan {
        &self.plan
    }

    /// Names of getters actually invoked so far, in invocation order.
    /// Cache reuse adds no entries.
    pub fn invocation_log(&self) -> &[String] {
        &self.invocation_log
    }

    pub fn evaluate_chunk(
        &mut self,
        batch: &crate::source::RecordBatch,
    ) -> Result<ChunkOutput, EvalError> {
        let evaluator = ChunkEvaluator {
            registry: &self.registry,
            plan: &self.plan,
            obs: &self.obs,
            output_columns: &self.def.column_outputs,
            cannot_be_null: &self.def.cannot_be_null,
            defaults: &self.def.default_columns,
        };
        evaluator.evaluate(batch, &mut self.lifetime_cache, &mut self.invocation_log)
    }

    /// Streams the whole source through the plan into `sink` as formatted
    /// text: header first, then surviving rows chunk by chunk.
    pub fn write_catalog<S: DataSource, W: Write>(
        &mut self,
        source: &mut S,
        sink: W,
    ) -> Result<(), CatalogError> {
        let mut writer = CatalogWriter::new(
            sink,
            self.def.delimiter.clone(),
            self.def.column_outputs.clone(),
            self.formats.clone(),
        );
        writer.write_header()?;

        let mut written = 0usize;
        let mut dropped = 0usize;
        while let Some(batch) = source.next_chunk(self.def.chunk_size)? {
            if batch.rows() == 0 {
                break;
            }
            let output = self.evaluate_chunk(&batch)?;
            for row in output.rows.iter() {
                writer.write_row(row)?;
            }
            written += output.rows.len();
            dropped += output.dropped;
        }
        writer.finish()?;

        info!(
            catalog = %self.def.name,
            written,
            dropped,
            "catalog written"
        );

        Ok(())
    }
}

type CapabilitySet = Vec<Arc<dyn Capability>>;

/// Named catalog types: a registered name maps to the capability set its
/// catalogs carry. Registration rejects duplicate names; instantiation
/// rejects unknown ones.
#[derive(Default)]
pub struct CatalogTypeRegistry {
    types: HashMap<String, CapabilitySet>,
}

impl CatalogTypeRegistry {
    pub fn new() -> CatalogTypeRegistry {
        CatalogTypeRegistry::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        capabilities: CapabilitySet,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if self.types.contains_key(&name) {
            return Err(ConfigError::DuplicateCatalogType { name });
        }
        self.types.insert(name, capabilities);
        Ok(())
    }

    pub fn instantiate(
        &self,
        type_name: &str,
        def: CatalogDef,
        obs: ObservationMetadata,
    ) -> Result<Catalog, ConfigError> {
        let capabilities =
            self.types
                .get(type_name)
                .ok_or_else(|| ConfigError::UnknownCatalogType {
                    name: type_name.to_string(),
                })?;
        Catalog::new(def, capabilities, obs)
    }
}
