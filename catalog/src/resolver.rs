use hashbrown::HashMap;

use crate::registry::{ColumnRegistry, Producer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("circular column dependency: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Evaluation order for one set of requested columns, resolved once at
/// catalog construction and reused for every chunk.
///
/// `invocations` lists getter indices with every getter's requirements
/// ordered before it. `native_columns` is the exact set of columns the data
/// source must supply, in first-discovery order. Together they are the
/// transitive closure of the request and nothing more.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalPlan {
    pub invocations: Vec<usize>,
    pub native_columns: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Done,
}

struct Resolver<'a> {
    registry: &'a ColumnRegistry,
    states: HashMap<String, VisitState>,
    scheduled: Vec<bool>,
    plan: EvalPlan,
}

/// Walks the dependency graph below `requested` depth-first, scheduling each
/// getter exactly once after its requirements and collecting every native
/// leaf. Fails on a dependency cycle, reporting the offending path.
pub fn resolve(registry: &ColumnRegistry, requested: &[String]) -> Result<EvalPlan, ResolveError> {
    let mut resolver = Resolver {
        registry,
        states: HashMap::new(),
        scheduled: vec![false; registry.getters().len()],
        plan: EvalPlan::default(),
    };

    for column in requested {
        resolver.visit(column, &mut Vec::new())?;
    }

    Ok(resolver.plan)
}

impl Resolver<'_> {
    fn visit(&mut self, column: &str, path: &mut Vec<String>) -> Result<(), ResolveError> {
        match self.states.get(column) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::Visiting) => {
                let start = path.iter().position(|name| name == column).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].to_vec();
                cycle.push(column.to_string());
                return Err(ResolveError::Cycle { path: cycle });
            }
            None => {}
        }

        self.states.insert(column.to_string(), VisitState::Visiting);
        path.push(column.to_string());

        match self.registry.producer_of(column) {
            Producer::Native => {
                self.plan.native_columns.push(column.to_string());
            }
            Producer::Derived(index) => {
                let requires = self.registry.getter(index).requires.clone();
                for dep in requires.iter() {
                    self.visit(dep, path)?;
                }
                // Compound siblings share one invocation.
                if !self.scheduled[index] {
                    self.scheduled[index] = true;
                    self.plan.invocations.push(index);
                }
            }
        }

        path.pop();
        self.states.insert(column.to_string(), VisitState::Done);

        Ok(())
    }
}
