//! Replica registry: which relations are replicated, and where to.

use std::collections::HashMap;

use crate::config::{ConfigError, ReplicaConfig};

pub const DEFAULT_NAMESPACE: &str = "public";
pub const DEFAULT_PRIVACY_NAMESPACE: &str = "anonymized";
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Where anonymized rows of a privacy-tagged replica are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privacy {
    /// Schema of the anonymized views
    pub namespace: String,
    pub anonymized_table: String,
    /// Column present in both the source row and the anonymized view
    pub pivot: String,
}

/// A replicated relation with every default resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    pub relation: String,
    /// Schema the relation is expected in. Rows are matched by relation
    /// name alone; a row from another schema is still applied and only
    /// noted in the debug log.
    pub namespace: String,
    pub index: String,
    pub primary_key: String,
    pub privacy: Option<Privacy>,
}

impl Replica {
    /// A replica with default namespace, index and primary key.
    pub fn new(relation: impl Into<String>) -> Self {
        let relation = relation.into();
        Self {
            index: relation.clone(),
            relation,
            namespace: DEFAULT_NAMESPACE.to_string(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            privacy: None,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn with_privacy(mut self, privacy: Privacy) -> Self {
        self.privacy = Some(privacy);
        self
    }

    /// Resolve a config entry, filling in defaults.
    pub fn from_config(relation: &str, config: &ReplicaConfig) -> Result<Self, ConfigError> {
        let privacy = if config.privacy_enabled() {
            let p = config.privacy.as_ref().cloned().unwrap_or_default();
            if p.pivot.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "replica '{relation}' has privacy rules but no pivot column"
                )));
            }
            Some(Privacy {
                namespace: non_empty_or(p.namespace, DEFAULT_PRIVACY_NAMESPACE),
                anonymized_table: p.anonymized_table,
                pivot: p.pivot,
            })
        } else {
            None
        };

        Ok(Self {
            relation: relation.to_string(),
            namespace: non_empty_or(config.namespace.clone(), DEFAULT_NAMESPACE),
            index: non_empty_or(config.index.clone(), relation),
            primary_key: non_empty_or(config.primary_key.clone(), DEFAULT_PRIMARY_KEY),
            privacy,
        })
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Read-only lookup from relation name to replica.
///
/// Shared between workers behind an `Arc`; never mutated after load.
#[derive(Debug, Clone, Default)]
pub struct ReplicaRegistry {
    replicas: HashMap<String, Replica>,
}

impl ReplicaRegistry {
    pub fn new(replicas: impl IntoIterator<Item = Replica>) -> Self {
        Self {
            replicas: replicas
                .into_iter()
                .map(|r| (r.relation.clone(), r))
                .collect(),
        }
    }

    pub fn from_config(replicas: &HashMap<String, ReplicaConfig>) -> Result<Self, ConfigError> {
        let resolved = replicas
            .iter()
            .map(|(relation, config)| Replica::from_config(relation, config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(resolved))
    }

    /// `None` means the relation is not replicated.
    pub fn lookup(&self, relation: &str) -> Option<&Replica> {
        self.replicas.get(relation)
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Replicas sorted by relation name.
    pub fn replicas(&self) -> Vec<&Replica> {
        let mut replicas: Vec<_> = self.replicas.values().collect();
        replicas.sort_by(|a, b| a.relation.cmp(&b.relation));
        replicas
    }
}
