use hashbrown::HashMap;
use tracing::debug;

use crate::chunk::{Chunk, GetterContext};
use crate::data::{ColumnData, Value};
use crate::obs::{MissingDepth, ObservationMetadata};
use crate::registry::{CachePolicy, ColumnRegistry};
use crate::resolver::EvalPlan;
use crate::source::RecordBatch;

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("column '{column}' is not present in the chunk")]
    MissingColumn { column: String },
    #[error("data source supplies no column '{column}' and no default is configured")]
    MissingNativeColumn { column: String },
    #[error(transparent)]
    MissingDepth(#[from] MissingDepth),
    #[error("getter '{getter}' produced {actual} columns, declared {expected}")]
    OutputArity {
        getter: String,
        expected: usize,
        actual: usize,
    },
    #[error("getter '{getter}' output '{column}' has {actual} rows, chunk has {expected}")]
    OutputLength {
        getter: String,
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error(
        "lifetime-cached getter '{getter}' output '{column}' must be a shared payload, not a per-row column"
    )]
    LifetimeOutputNotShared { getter: String, column: String },
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Final rows for one chunk, in output-column order, with null-carrying rows
/// already filtered out.
#[derive(Debug, Default)]
pub struct ChunkOutput {
    pub rows: Vec<Vec<Value>>,
    pub dropped: usize,
}

/// Runs one resolved plan over one batch of rows.
///
/// Per-lifetime getter results live in `lifetime_cache` across chunks, keyed
/// by getter index; `invocation_log` records every actual getter invocation
/// (cache reuse leaves no entry).
pub struct ChunkEvaluator<'a> {
    pub registry: &'a ColumnRegistry,
    pub plan: &'a EvalPlan,
    pub obs: &'a ObservationMetadata,
    pub output_columns: &'a [String],
    pub cannot_be_null: &'a [String],
    pub defaults: &'a HashMap<String, Value>,
}

impl ChunkEvaluator<'_> {
    pub fn evaluate(
        &self,
        batch: &RecordBatch,
        lifetime_cache: &mut HashMap<usize, Vec<ColumnData>>,
        invocation_log: &mut Vec<String>,
    ) -> EvalResult<ChunkOutput> {
        let mut chunk = Chunk::new(batch.rows());

        for name in self.plan.native_columns.iter() {
            let data = match batch.column(name) {
                Some(data) => data.clone(),
                None => match self.defaults.get(name) {
                    Some(default) => ColumnData::broadcast(default, batch.rows()),
                    None => {
                        return Err(EvalError::MissingNativeColumn {
                            column: name.clone(),
                        });
                    }
                },
            };
            chunk.insert(name.clone(), data);
        }

        for &index in self.plan.invocations.iter() {
            let getter = self.registry.getter(index);

            if getter.cache == CachePolicy::PerLifetime {
                if let Some(cached) = lifetime_cache.get(&index) {
                    for (name, data) in getter.outputs.iter().zip(cached.iter()) {
                        chunk.insert(name.clone(), data.clone());
                    }
                    continue;
                }
            }

            let outputs = {
                let ctx = GetterContext::new(&chunk, self.obs);
                let outputs = (getter.func)(&ctx)?;

                #[cfg(debug_assertions)]
                for accessed in ctx.accessed() {
                    debug_assert!(
                        getter.requires.iter().any(|r| *r == accessed),
                        "getter '{}' read column '{}' it does not declare",
                        getter.name,
                        accessed
                    );
                }

                outputs
            };

            if outputs.len() != getter.outputs.len() {
                return Err(EvalError::OutputArity {
                    getter: getter.name.clone(),
                    expected: getter.outputs.len(),
                    actual: outputs.len(),
                });
            }
            for (name, data) in getter.outputs.iter().zip(outputs.iter()) {
                match (getter.cache, data.len()) {
                    // Cached results outlive the chunk, so they cannot carry
                    // per-row data.
                    (CachePolicy::PerLifetime, Some(_)) => {
                        return Err(EvalError::LifetimeOutputNotShared {
                            getter: getter.name.clone(),
                            column: name.clone(),
                        });
                    }
                    (CachePolicy::PerChunk, Some(len)) if len != chunk.rows() => {
                        return Err(EvalError::OutputLength {
                            getter: getter.name.clone(),
                            column: name.clone(),
                            expected: chunk.rows(),
                            actual: len,
                        });
                    }
                    _ => {}
                }
            }

            if getter.cache == CachePolicy::PerLifetime {
                lifetime_cache.insert(index, outputs.clone());
            }
            // All outputs of a compound getter land together.
            for (name, data) in getter.outputs.iter().zip(outputs.into_iter()) {
                chunk.insert(name.clone(), data);
            }
            invocation_log.push(getter.name.clone());
        }

        self.collect_rows(&chunk)
    }

    fn collect_rows(&self, chunk: &Chunk) -> EvalResult<ChunkOutput> {
        let mut guarded = Vec::with_capacity(self.cannot_be_null.len());
        for name in self.cannot_be_null.iter() {
            let data = chunk
                .column(name)
                .ok_or_else(|| EvalError::MissingColumn {
                    column: name.clone(),
                })?;
            guarded.push(data);
        }

        let mut selected = Vec::with_capacity(self.output_columns.len());
        for name in self.output_columns.iter() {
            let data = chunk
                .column(name)
                .ok_or_else(|| EvalError::MissingColumn {
                    column: name.clone(),
                })?;
            selected.push(data);
        }

        let mut output = ChunkOutput::default();
        for row in 0..chunk.rows() {
            if guarded.iter().any(|data| data.is_null_at(row)) {
                output.dropped += 1;
                continue;
            }
            output
                .rows
                .push(selected.iter().map(|data| data.value_at(row)).collect());
        }

        if output.dropped > 0 {
            debug!(
                dropped = output.dropped,
                kept = output.rows.len(),
                "dropped rows with null values in guarded columns"
            );
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use crate::band::Band;
    use crate::registry::Getter;
    use crate::resolver::resolve;

    use super::*;

    fn sample_obs() -> ObservationMetadata {
        ObservationMetadata {
            pointing_ra_deg: 0.0,
            pointing_dec_deg: 0.0,
            mjd: 52000.0,
            bands: vec![Band::U],
            m5: HashMap::new(),
            time_bounds: None,
        }
    }

    fn batch(columns: &[(&str, ColumnData)]) -> RecordBatch {
        let rows = columns[0].1.len().unwrap();
        let mut batch = RecordBatch::new(rows);
        for (name, data) in columns {
            batch.insert(*name, data.clone());
        }
        batch
    }

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn natives_flow_through_unchanged() {
        let registry = ColumnRegistry::new();
        let outputs = names(&["ra"]);
        let plan = resolve(&registry, &outputs).unwrap();
        let obs = sample_obs();
        let defaults = HashMap::new();

        let evaluator = ChunkEvaluator {
            registry: &registry,
            plan: &plan,
            obs: &obs,
            output_columns: &outputs,
            cannot_be_null: &[],
            defaults: &defaults,
        };

        let mut cache = HashMap::new();
        let mut log = Vec::new();
        let result = evaluator
            .evaluate(
                &batch(&[("ra", ColumnData::Float(vec![1.5, 2.5]))]),
                &mut cache,
                &mut log,
            )
            .unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0], vec![Value::Float(1.5)]);
        assert!(log.is_empty());
    }

    #[test]
    fn derived_column_shadows_native_of_same_name() {
        let mut registry = ColumnRegistry::new();
        registry
            .add(Getter::new("shadow", &["ra"], &[], |ctx| {
                Ok(vec![ColumnData::Float(vec![0.0; ctx.rows()])])
            }))
            .unwrap();

        let outputs = names(&["ra"]);
        let plan = resolve(&registry, &outputs).unwrap();
        let obs = sample_obs();
        let defaults = HashMap::new();

        let evaluator = ChunkEvaluator {
            registry: &registry,
            plan: &plan,
            obs: &obs,
            output_columns: &outputs,
            cannot_be_null: &[],
            defaults: &defaults,
        };

        let mut cache = HashMap::new();
        let mut log = Vec::new();
        let result = evaluator
            .evaluate(
                &batch(&[("ra", ColumnData::Float(vec![9.0]))]),
                &mut cache,
                &mut log,
            )
            .unwrap();

        assert_eq!(result.rows[0], vec![Value::Float(0.0)]);
        assert_eq!(log, vec!["shadow".to_string()]);
    }

    #[test]
    fn missing_native_falls_back_to_default_then_errors() {
        let registry = ColumnRegistry::new();
        let outputs = names(&["parallax"]);
        let plan = resolve(&registry, &outputs).unwrap();
        let obs = sample_obs();

        let mut defaults = HashMap::new();
        defaults.insert("parallax".to_string(), Value::Float(0.00045));

        let evaluator = ChunkEvaluator {
            registry: &registry,
            plan: &plan,
            obs: &obs,
            output_columns: &outputs,
            cannot_be_null: &[],
            defaults: &defaults,
        };

        let mut cache = HashMap::new();
        let mut log = Vec::new();
        let result = evaluator
            .evaluate(
                &batch(&[("ra", ColumnData::Float(vec![1.0, 2.0]))]),
                &mut cache,
                &mut log,
            )
            .unwrap();
        assert_eq!(result.rows[0], vec![Value::Float(0.00045)]);

        let empty = HashMap::new();
        let strict = ChunkEvaluator {
            defaults: &empty,
            ..evaluator
        };
        let err = strict
            .evaluate(
                &batch(&[("ra", ColumnData::Float(vec![1.0]))]),
                &mut cache,
                &mut log,
            )
            .unwrap_err();
        assert!(matches!(err, EvalError::MissingNativeColumn { .. }));
    }

    #[test]
    fn null_rows_are_dropped() {
        let registry = ColumnRegistry::new();
        let outputs = names(&["mag"]);
        let guarded = names(&["mag"]);
        let plan = resolve(&registry, &outputs).unwrap();
        let obs = sample_obs();
        let defaults = HashMap::new();

        let evaluator = ChunkEvaluator {
            registry: &registry,
            plan: &plan,
            obs: &obs,
            output_columns: &outputs,
            cannot_be_null: &guarded,
            defaults: &defaults,
        };

        let mut cache = HashMap::new();
        let mut log = Vec::new();
        let result = evaluator
            .evaluate(
                &batch(&[("mag", ColumnData::Float(vec![17.0, f64::NAN, 19.0]))]),
                &mut cache,
                &mut log,
            )
            .unwrap();

        assert_eq!(result.dropped, 1);
        assert_eq!(
            result.rows,
            vec![vec![Value::Float(17.0)], vec![Value::Float(19.0)]]
        );
    }

    #[test]
    fn per_lifetime_getter_runs_once_across_chunks() {
        let mut registry = ColumnRegistry::new();
        registry
            .add(Getter::once("load_table", &["table"], &[], |_| {
                Ok(vec![ColumnData::shared(vec![1.0, 2.0, 3.0])])
            }))
            .unwrap();
        registry
            .add(Getter::new("uses_table", &["scaled"], &["table", "x"], |ctx| {
                let table = ctx.shared::<Vec<f64>>("table")?;
                let x = ctx.floats("x")?;
                Ok(vec![ColumnData::Float(
                    x.iter().map(|v| v * table[0]).collect(),
                )])
            }))
            .unwrap();

        let outputs = names(&["scaled"]);
        let plan = resolve(&registry, &outputs).unwrap();
        let obs = sample_obs();
        let defaults = HashMap::new();

        let evaluator = ChunkEvaluator {
            registry: &registry,
            plan: &plan,
            obs: &obs,
            output_columns: &outputs,
            cannot_be_null: &[],
            defaults: &defaults,
        };

        let mut cache = HashMap::new();
        let mut log = Vec::new();
        for _ in 0..3 {
            evaluator
                .evaluate(
                    &batch(&[("x", ColumnData::Float(vec![2.0]))]),
                    &mut cache,
                    &mut log,
                )
                .unwrap();
        }

        let loads = log.iter().filter(|name| *name == "load_table").count();
        assert_eq!(loads, 1);
        let uses = log.iter().filter(|name| *name == "uses_table").count();
        assert_eq!(uses, 3);
    }

    #[test]
    fn per_lifetime_getter_cannot_output_per_row_columns() {
        let mut registry = ColumnRegistry::new();
        registry
            .add(Getter::once("bad_cache", &["table"], &[], |ctx| {
                Ok(vec![ColumnData::Float(vec![0.0; ctx.rows()])])
            }))
            .unwrap();

        let outputs = names(&["table"]);
        let plan = resolve(&registry, &outputs).unwrap();
        let obs = sample_obs();
        let defaults = HashMap::new();

        let evaluator = ChunkEvaluator {
            registry: &registry,
            plan: &plan,
            obs: &obs,
            output_columns: &outputs,
            cannot_be_null: &[],
            defaults: &defaults,
        };

        let mut cache = HashMap::new();
        let mut log = Vec::new();
        let err = evaluator
            .evaluate(
                &batch(&[("x", ColumnData::Float(vec![0.0, 1.0]))]),
                &mut cache,
                &mut log,
            )
            .unwrap_err();
        assert!(matches!(err, EvalError::LifetimeOutputNotShared { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn output_arity_mismatch_is_an_error() {
        let mut registry = ColumnRegistry::new();
        registry
            .add(Getter::new("broken", &["a", "b"], &[], |ctx| {
                Ok(vec![ColumnData::Float(vec![0.0; ctx.rows()])])
            }))
            .unwrap();

        let outputs = names(&["a"]);
        let plan = resolve(&registry, &outputs).unwrap();
        let obs = sample_obs();
        let defaults = HashMap::new();

        let evaluator = ChunkEvaluator {
            registry: &registry,
            plan: &plan,
            obs: &obs,
            output_columns: &outputs,
            cannot_be_null: &[],
            defaults: &defaults,
        };

        let mut cache = HashMap::new();
        let mut log = Vec::new();
        let err = evaluator
            .evaluate(
                &batch(&[("x", ColumnData::Float(vec![0.0]))]),
                &mut cache,
                &mut log,
            )
            .unwrap_err();
        assert!(matches!(err, EvalError::OutputArity { .. }));
    }

    #[test]
    fn output_length_mismatch_is_an_error() {
        let mut registry = ColumnRegistry::new();
        registry
            .add(Getter::new("short", &["a"], &[], |_| {
                Ok(vec![ColumnData::Float(vec![0.0])])
            }))
            .unwrap();

        let outputs = names(&["a"]);
        let plan = resolve(&registry, &outputs).unwrap();
        let obs = sample_obs();
        let defaults = HashMap::new();

        let evaluator = ChunkEvaluator {
            registry: &registry,
            plan: &plan,
            obs: &obs,
            output_columns: &outputs,
            cannot_be_null: &[],
            defaults: &defaults,
        };

        let mut cache = HashMap::new();
        let mut log = Vec::new();
        let err = evaluator
            .evaluate(
                &batch(&[("x", ColumnData::Float(vec![0.0, 1.0]))]),
                &mut cache,
                &mut log,
            )
            .unwrap_err();
        assert!(matches!(err, EvalError::OutputLength { .. }));
    }
}
