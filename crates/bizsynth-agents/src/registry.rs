use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::agent_config::AgentDefinition;
use crate::embedded_configs::get_embedded_registry;

/// Registry document versions this build understands
pub const SUPPORTED_REGISTRY_VERSION: u32 = 1;

/// Startup failures while loading agent definitions
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read agent registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed agent registry: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported agent registry version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("agent registry contains no agents")]
    Empty,

    #[error("duplicate agent id '{0}'")]
    DuplicateId(String),

    #[error("invalid agent '{id}': {reason}")]
    InvalidAgent { id: String, reason: String },

    #[error("more than one fallback agent: {}", .0.join(", "))]
    MultipleFallbacks(Vec<String>),

    #[error("agents depend on each other in a cycle: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("agent '{0}' not found")]
    NotFound(String),
}

#[derive(Deserialize)]
struct RegistryDocument {
    version: u32,
    agents: Vec<AgentDefinition>,
}

/// Read-only set of agent definitions, in declaration order
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<AgentDefinition>,
    index: HashMap<String, usize>,
    fallback: usize,
}

impl AgentRegistry {
    /// Validate and index a list of definitions
    pub fn new(agents: Vec<AgentDefinition>) -> Result<Self, RegistryError> {
        if agents.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut index = HashMap::with_capacity(agents.len());
        for (position, agent) in agents.iter().enumerate() {
            agent.validate().map_err(|reason| RegistryError::InvalidAgent {
                id: agent.id.clone(),
                reason,
            })?;
            if index.insert(agent.id.clone(), position).is_some() {
                return Err(RegistryError::DuplicateId(agent.id.clone()));
            }
        }

        let fallbacks: Vec<usize> = agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.fallback)
            .map(|(i, _)| i)
            .collect();
        if fallbacks.len() > 1 {
            return Err(RegistryError::MultipleFallbacks(
                fallbacks.iter().map(|&i| agents[i].id.clone()).collect(),
            ));
        }
        check_dependency_cycles(&agents)?;

        // First declared agent stands in when none is marked
        let fallback = fallbacks.first().copied().unwrap_or(0);

        Ok(Self {
            agents,
            index,
            fallback,
        })
    }

    /// Parse a versioned registry document
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let document: RegistryDocument = serde_json::from_str(json)?;
        if document.version != SUPPORTED_REGISTRY_VERSION {
            return Err(RegistryError::UnsupportedVersion {
                found: document.version,
                expected: SUPPORTED_REGISTRY_VERSION,
            });
        }
        Self::new(document.agents)
    }

    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json(&json)?;
        log::info!("Loaded {} agent definitions from {}", registry.len(), path.display());
        Ok(registry)
    }

    /// Registry compiled into the binary
    pub fn embedded() -> Result<Self, RegistryError> {
        Self::from_json(get_embedded_registry())
    }

    pub fn get(&self, agent_id: &str) -> Result<&AgentDefinition, RegistryError> {
        self.index
            .get(agent_id)
            .map(|&i| &self.agents[i])
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.index.contains_key(agent_id)
    }

    /// All definitions in declaration order
    pub fn all(&self) -> &[AgentDefinition] {
        &self.agents
    }

    pub fn fallback_agent(&self) -> &AgentDefinition {
        &self.agents[self.fallback]
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Reject registries whose `depends_on_skills` edges form a cycle (Kahn's algorithm).
/// Any plan selecting all agents of such a cycle could never be built.
fn check_dependency_cycles(agents: &[AgentDefinition]) -> Result<(), RegistryError> {
    let mut pending: Vec<usize> = agents
        .iter()
        .map(|agent| agents.iter().filter(|producer| agent.depends_on(producer)).count())
        .collect();
    let mut queue: VecDeque<usize> = (0..agents.len()).filter(|&i| pending[i] == 0).collect();
    let mut resolved = 0;

    while let Some(producer) = queue.pop_front() {
        resolved += 1;
        for (consumer, agent) in agents.iter().enumerate() {
            if agent.depends_on(&agents[producer]) {
                pending[consumer] -= 1;
                if pending[consumer] == 0 {
                    queue.push_back(consumer);
                }
            }
        }
    }

    if resolved == agents.len() {
        return Ok(());
    }
    let stuck = agents
        .iter()
        .zip(&pending)
        .filter(|(_, &count)| count > 0)
        .map(|(agent, _)| agent.id.clone())
        .collect();
    Err(RegistryError::DependencyCycle(stuck))
}
