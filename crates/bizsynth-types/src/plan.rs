use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

pub type TaskId = String;

/// One unit of work bound to a single agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub agent_id: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    #[serde(default)]
    pub depends_on: BTreeSet<TaskId>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, agent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            inputs: BTreeMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    pub fn with_dependency(mut self, task_id: impl Into<TaskId>) -> Self {
        self.depends_on.insert(task_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    Sequential,
    Parallel,
    Mixed,
}

impl ExecutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural problems detected while building a plan
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("plan has no tasks")]
    Empty,
    #[error("duplicate task id '{0}'")]
    DuplicateTask(TaskId),
    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: TaskId, dependency: TaskId },
    #[error("task '{0}' depends on itself")]
    SelfDependency(TaskId),
    #[error("dependency cycle between tasks: {}", .0.join(", "))]
    Cycle(Vec<TaskId>),
    #[error("task '{task}' references unknown agent '{agent}'")]
    UnknownAgent { task: TaskId, agent: String },
}

/// Validated set of tasks for one request
///
/// Only constructible through [`ExecutionPlan::new`], so every plan in
/// circulation has unique ids, resolvable edges and no cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlanRepr")]
pub struct ExecutionPlan {
    tasks: Vec<Task>,
    execution_type: ExecutionType,
}

#[derive(Deserialize)]
struct PlanRepr {
    tasks: Vec<Task>,
}

impl TryFrom<PlanRepr> for ExecutionPlan {
    type Error = PlanError;

    fn try_from(repr: PlanRepr) -> Result<Self, Self::Error> {
        ExecutionPlan::new(repr.tasks)
    }
}

impl ExecutionPlan {
    pub fn new(tasks: Vec<Task>) -> Result<Self, PlanError> {
        if tasks.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut seen = BTreeSet::new();
        for task in &tasks {
            if !seen.insert(task.id.as_str()) {
                return Err(PlanError::DuplicateTask(task.id.clone()));
            }
        }

        for task in &tasks {
            for dep in &task.depends_on {
                if dep == &task.id {
                    return Err(PlanError::SelfDependency(task.id.clone()));
                }
                if !seen.contains(dep.as_str()) {
                    return Err(PlanError::UnknownDependency {
                        task: task.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let levels = compute_levels(&tasks)?;
        let execution_type = classify(&tasks, &levels);

        Ok(Self { tasks, execution_type })
    }

    /// Tasks in declaration order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn execution_type(&self) -> ExecutionType {
        self.execution_type
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Agent ids in task declaration order
    pub fn agent_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.agent_id.clone()).collect()
    }

    /// Tasks that list `id` as a dependency, in declaration order
    pub fn dependents(&self, id: &str) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.depends_on.contains(id)).collect()
    }

    /// Tasks grouped by the length of their longest dependency chain
    pub fn tiers(&self) -> Vec<Vec<&Task>> {
        // Validated at construction, so this cannot fail.
        let levels = compute_levels(&self.tasks).unwrap_or_default();
        let depth = levels.values().copied().max().map(|d| d + 1).unwrap_or(0);
        let mut tiers: Vec<Vec<&Task>> = vec![Vec::new(); depth];
        for task in &self.tasks {
            if let Some(level) = levels.get(task.id.as_str()) {
                tiers[*level].push(task);
            }
        }
        tiers
    }
}

/// Longest-path level of every task; fails on cycles (Kahn's algorithm)
fn compute_levels(tasks: &[Task]) -> Result<HashMap<&str, usize>, PlanError> {
    let mut pending: HashMap<&str, usize> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.depends_on.len()))
        .collect();
    let mut levels: HashMap<&str, usize> = HashMap::new();
    let mut queue: VecDeque<&Task> = tasks.iter().filter(|t| t.depends_on.is_empty()).collect();

    while let Some(task) = queue.pop_front() {
        let level = task
            .depends_on
            .iter()
            .filter_map(|d| levels.get(d.as_str()))
            .map(|l| l + 1)
            .max()
            .unwrap_or(0);
        levels.insert(task.id.as_str(), level);

        for dependent in tasks.iter().filter(|t| t.depends_on.contains(&task.id)) {
            if let Some(count) = pending.get_mut(dependent.id.as_str()) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if levels.len() < tasks.len() {
        let stuck = tasks
            .iter()
            .filter(|t| !levels.contains_key(t.id.as_str()))
            .map(|t| t.id.clone())
            .collect();
        return Err(PlanError::Cycle(stuck));
    }

    Ok(levels)
}

fn classify(tasks: &[Task], levels: &HashMap<&str, usize>) -> ExecutionType {
    if tasks.iter().all(|t| t.depends_on.is_empty()) {
        return ExecutionType::Parallel;
    }

    let mut per_level: BTreeMap<usize, usize> = BTreeMap::new();
    for level in levels.values() {
        *per_level.entry(*level).or_insert(0) += 1;
    }

    if per_level.len() >= 2 && per_level.values().all(|count| *count == 1) {
        ExecutionType::Sequential
    } else {
        ExecutionType::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn task(id: &str, deps: &[&str]) -> Task {
        deps.iter()
            .fold(Task::new(id, format!("agent_{}", id)), |t, d| t.with_dependency(*d))
    }

    #[test]
    fn test_independent_tasks_are_parallel() {
        let plan = ExecutionPlan::new(vec![task("a", &[]), task("b", &[]), task("c", &[])]).unwrap();
        assert_eq!(plan.execution_type(), ExecutionType::Parallel);
        assert_eq!(plan.tiers().len(), 1);
    }

    #[test]
    fn test_single_task_is_parallel() {
        let plan = ExecutionPlan::new(vec![task("a", &[])]).unwrap();
        assert_eq!(plan.execution_type(), ExecutionType::Parallel);
    }

    #[test]
    fn test_chain_is_sequential() {
        let plan = ExecutionPlan::new(vec![task("a", &[]), task("b", &["a"]), task("c", &["b"])]).unwrap();
        assert_eq!(plan.execution_type(), ExecutionType::Sequential);
        assert_eq!(plan.tiers().len(), 3);
    }

    #[test]
    fn test_fan_in_is_mixed() {
        let plan = ExecutionPlan::new(vec![task("a", &[]), task("b", &[]), task("c", &["a", "b"])]).unwrap();
        assert_eq!(plan.execution_type(), ExecutionType::Mixed);

        let tiers: Vec<Vec<&str>> = plan
            .tiers()
            .iter()
            .map(|tier| tier.iter().map(|t| t.id.as_str()).collect())
            .collect();
        assert_eq!(tiers, vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn test_chain_plus_independent_task_is_mixed() {
        let plan = ExecutionPlan::new(vec![task("a", &[]), task("b", &["a"]), task("c", &[])]).unwrap();
        assert_eq!(plan.execution_type(), ExecutionType::Mixed);
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert_eq!(ExecutionPlan::new(vec![]), Err(PlanError::Empty));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = ExecutionPlan::new(vec![task("a", &[]), task("a", &[])]).unwrap_err();
        assert_eq!(err, PlanError::DuplicateTask("a".to_string()));
    }

    #[test]
    fn test_dangling_dependency_rejected() {
        let err = ExecutionPlan::new(vec![task("a", &["ghost"])]).unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownDependency {
                task: "a".to_string(),
                dependency: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_self_dependency_rejected() {
        let err = ExecutionPlan::new(vec![task("a", &["a"])]).unwrap_err();
        assert_eq!(err, PlanError::SelfDependency("a".to_string()));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = ExecutionPlan::new(vec![task("a", &["c"]), task("b", &["a"]), task("c", &["b"]), task("d", &[])])
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::Cycle(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_deserialization_revalidates() {
        let json = serde_json::json!({
            "tasks": [
                { "id": "a", "agent_id": "x", "depends_on": ["b"] },
                { "id": "b", "agent_id": "y", "depends_on": ["a"] }
            ],
            "execution_type": "parallel"
        });
        assert!(serde_json::from_value::<ExecutionPlan>(json).is_err());

        let json = serde_json::json!({
            "tasks": [
                { "id": "a", "agent_id": "x" },
                { "id": "b", "agent_id": "y", "depends_on": ["a"] }
            ],
            "execution_type": "parallel"
        });
        let plan: ExecutionPlan = serde_json::from_value(json).unwrap();
        assert_eq!(plan.execution_type(), ExecutionType::Sequential);
    }

    #[test]
    fn test_dependents_follow_declaration_order() {
        let plan = ExecutionPlan::new(vec![task("a", &[]), task("c", &["a"]), task("b", &["a"])]).unwrap();
        let ids: Vec<&str> = plan.dependents("a").iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }
}
