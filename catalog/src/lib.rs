pub mod band;
pub mod catalog;
pub mod chunk;
pub mod data;
pub mod evaluator;
pub mod mixins;
pub mod obs;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod writer;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use crate::band::Band;
    pub use crate::catalog::{Catalog, CatalogDef, CatalogError, CatalogTypeRegistry, ConfigError};
    pub use crate::chunk::{Chunk, GetterContext};
    pub use crate::data::{ColumnData, Value};
    pub use crate::evaluator::{ChunkOutput, EvalError, EvalResult};
    pub use crate::obs::ObservationMetadata;
    pub use crate::registry::{CachePolicy, Capability, ColumnRegistry, Getter, Producer};
    pub use crate::resolver::{resolve, EvalPlan, ResolveError};
    pub use crate::source::{DataSource, MemorySource, RecordBatch};
    pub use crate::writer::{CatalogWriter, ColumnFormat};
}
