//! Task registry: name -> definition.
//!
//! Registration order is free. Duplicate names and invalid per-task retry
//! policies are rejected at `register` time; dependency references are checked when a task is first
//! used (`validate_closure`, called on enqueue) or for the whole graph with
//! `validate`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::{TaskDefinition, TaskName};
use crate::error::{ConfigError, RegistryError};
use crate::handler::TaskFn;

#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskName, Arc<TaskDefinition>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Register a task.
    ///
    /// Dependencies may name tasks that are registered later.
    pub fn register<I, D>(
        &mut self,
        name: impl Into<TaskName>,
        handler: Arc<dyn TaskFn>,
        priority: i32,
        dependencies: I,
    ) -> Result<Arc<TaskDefinition>, RegistryError>
    where
        I: IntoIterator<Item = D>,
        D: Into<TaskName>,
    {
        self.register_definition(TaskDefinition::new(name, handler, priority, dependencies))
    }

    pub fn register_definition(
        &mut self,
        definition: TaskDefinition,
    ) -> Result<Arc<TaskDefinition>, RegistryError> {
        if self.tasks.contains_key(definition.name()) {
            return Err(RegistryError::DuplicateTask(definition.name().clone()));
        }
        if let Some(policy) = definition.retry() {
            policy
                .validate()
                .map_err(|err| RegistryError::InvalidRetryPolicy {
                    task: definition.name().clone(),
                    reason: match err {
                        ConfigError::Invalid(reason) => reason,
                        other => other.to_string(),
                    },
                })?;
        }
        let definition = Arc::new(definition);
        tracing::debug!(
            task = %definition.name(),
            priority = definition.priority(),
            dependencies = ?definition.dependencies(),
            "task registered"
        );
        self.tasks
            .insert(definition.name().clone(), Arc::clone(&definition));
        Ok(definition)
    }

    pub fn lookup(&self, name: &TaskName) -> Result<&Arc<TaskDefinition>, RegistryError> {
        self.tasks
            .get(name)
            .ok_or_else(|| RegistryError::TaskNotFound(name.clone()))
    }

    pub fn get(&self, name: &TaskName) -> Option<&Arc<TaskDefinition>> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &TaskName) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<TaskName> {
        let mut names: Vec<TaskName> = self.tasks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check that `name` and everything it transitively depends on is
    /// registered and acyclic.
    pub fn validate_closure(&self, name: &TaskName) -> Result<(), RegistryError> {
        self.lookup(name)?;
        self.walk(name, &mut Vec::new(), &mut HashSet::new())
    }

    /// Check the whole graph. Names are visited in sorted order so the
    /// reported error is deterministic.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut done = HashSet::new();
        for name in self.names() {
            self.walk(&name, &mut Vec::new(), &mut done)?;
        }
        Ok(())
    }

    /// Names from `expected` that are not registered, in input order.
    pub fn missing<'a, I>(&self, expected: I) -> Vec<TaskName>
    where
        I: IntoIterator<Item = &'a TaskName>,
    {
        expected
            .into_iter()
            .filter(|name| !self.contains(name))
            .cloned()
            .collect()
    }

    /// Depth-first walk over dependency edges.
    /// `path` holds the current chain (gray nodes), `done` the fully explored ones.
    fn walk(
        &self,
        name: &TaskName,
        path: &mut Vec<TaskName>,
        done: &mut HashSet<TaskName>,
    ) -> Result<(), RegistryError> {
        if done.contains(name) {
            return Ok(());
        }
        if let Some(pos) = path.iter().position(|n| n == name) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(name.clone());
            return Err(RegistryError::DependencyCycle(cycle));
        }

        let definition = self.lookup(name)?;
        path.push(name.clone());
        for dep in definition.dependencies() {
            if !self.contains(dep) {
                return Err(RegistryError::UnknownDependency {
                    task: name.clone(),
                    dependency: dep.clone(),
                });
            }
            self.walk(dep, path, done)?;
        }
        path.pop();
        done.insert(name.clone());
        Ok(())
    }
}
