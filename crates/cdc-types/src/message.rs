//! Replication envelope as produced by the CDC publisher.

use crate::values::{Field, FieldValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Error type for envelope decoding.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload is not a valid envelope
    #[error("Failed to parse replication message: {0}")]
    Json(#[from] serde_json::Error),

    /// The flag requires a command but none was sent
    #[error("Replication message with flag '{0}' has no command")]
    MissingCommand(ReplicationFlag),
}

/// Which replication mode produced the message.
///
/// Full-table replication is framed by a begin and an end marker with one
/// `FullRow` message per row in between. Streaming messages stand alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicationFlag {
    #[serde(rename = "full_begin", alias = "FULL_REPLICATION_BEGIN")]
    FullBegin,
    #[serde(rename = "full_row", alias = "FULL_REPLICATION")]
    FullRow,
    #[serde(rename = "full_end", alias = "FULL_REPLICATION_END")]
    FullEnd,
    #[serde(rename = "streaming", alias = "STREAM_REPLICATION")]
    Streaming,
}

impl ReplicationFlag {
    /// Whether a message with this flag must carry a command.
    pub fn requires_command(self) -> bool {
        matches!(self, Self::FullRow | Self::Streaming)
    }
}

impl fmt::Display for ReplicationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullBegin => write!(f, "full_begin"),
            Self::FullRow => write!(f, "full_row"),
            Self::FullEnd => write!(f, "full_end"),
            Self::Streaming => write!(f, "streaming"),
        }
    }
}

/// DML command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    #[serde(alias = "INSERT")]
    Insert,
    #[serde(alias = "UPDATE")]
    Update,
    #[serde(alias = "DELETE")]
    Delete,
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One row touched by a change.
///
/// Field keys are fully qualified: `namespace.relation.column`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRow {
    pub namespace: String,
    pub rel_name: String,
    #[serde(default)]
    pub fields: HashMap<String, Field>,
}

impl ChangeRow {
    /// Create an empty row for a relation.
    pub fn new(namespace: impl Into<String>, rel_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            rel_name: rel_name.into(),
            fields: HashMap::new(),
        }
    }

    /// Builder-style helper that inserts a column under its qualified name.
    pub fn with_column(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        let key = self.qualified_name(column);
        self.fields.insert(key, Field::new(value));
        self
    }

    /// `namespace.relation.column` for a column of this row.
    pub fn qualified_name(&self, column: &str) -> String {
        qualified_name(&self.namespace, &self.rel_name, column)
    }

    /// Look up a column by its unqualified name.
    pub fn column(&self, column: &str) -> Option<&Field> {
        self.fields.get(&self.qualified_name(column))
    }
}

/// Build a fully qualified field name.
pub fn qualified_name(namespace: &str, relation: &str, column: &str) -> String {
    format!("{namespace}.{relation}.{column}")
}

/// A DML command and the row it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmlCommand {
    pub cmd_type: CommandType,
    pub data: ChangeRow,
}

/// Top-level replication message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationMessage {
    pub replication_flag: ReplicationFlag,
    #[serde(default)]
    pub command: Option<DmlCommand>,
}

impl ReplicationMessage {
    /// Decode and validate a raw payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, DecodeError> {
        let message: Self = serde_json::from_slice(payload)?;
        if message.replication_flag.requires_command() && message.command.is_none() {
            return Err(DecodeError::MissingCommand(message.replication_flag));
        }
        Ok(message)
    }

    pub fn full_begin() -> Self {
        Self {
            replication_flag: ReplicationFlag::FullBegin,
            command: None,
        }
    }

    pub fn full_row(row: ChangeRow) -> Self {
        Self {
            replication_flag: ReplicationFlag::FullRow,
            command: Some(DmlCommand {
                cmd_type: CommandType::Insert,
                data: row,
            }),
        }
    }

    pub fn full_end() -> Self {
        Self {
            replication_flag: ReplicationFlag::FullEnd,
            command: None,
        }
    }

    pub fn streaming(cmd_type: CommandType, row: ChangeRow) -> Self {
        Self {
            replication_flag: ReplicationFlag::Streaming,
            command: Some(DmlCommand {
                cmd_type,
                data: row,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELETE_ORDER: &str = r#"{
        "replicationFlag": "streaming",
        "command": {
            "cmdType": "delete",
            "data": {
                "namespace": "public",
                "relName": "orders",
                "fields": { "public.orders.id": { "content": 42.0 } }
            }
        }
    }"#;

    #[test]
    fn test_decode_streaming_delete() {
        let message = ReplicationMessage::from_slice(DELETE_ORDER.as_bytes()).unwrap();
        assert_eq!(message.replication_flag, ReplicationFlag::Streaming);

        let command = message.command.unwrap();
        assert_eq!(command.cmd_type, CommandType::Delete);
        assert_eq!(command.data.rel_name, "orders");
        assert_eq!(
            command.data.column("id").map(|f| &f.content),
            Some(&FieldValue::Number(42.0))
        );
    }

    #[test]
    fn test_decode_upper_case_aliases() {
        let payload = r#"{"replicationFlag": "FULL_REPLICATION_BEGIN"}"#;
        let message = ReplicationMessage::from_slice(payload.as_bytes()).unwrap();
        assert_eq!(message.replication_flag, ReplicationFlag::FullBegin);
        assert!(message.command.is_none());

        let payload = r#"{
            "replicationFlag": "STREAM_REPLICATION",
            "command": {"cmdType": "UPDATE", "data": {"namespace": "public", "relName": "t"}}
        }"#;
        let message = ReplicationMessage::from_slice(payload.as_bytes()).unwrap();
        assert_eq!(message.command.unwrap().cmd_type, CommandType::Update);
    }

    #[test]
    fn test_decode_row_without_command_fails() {
        let payload = r#"{"replicationFlag": "full_row"}"#;
        let err = ReplicationMessage::from_slice(payload.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MissingCommand(ReplicationFlag::FullRow)
        ));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = ReplicationMessage::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));

        let payload = r#"{"replicationFlag": "sideways"}"#;
        assert!(ReplicationMessage::from_slice(payload.as_bytes()).is_err());
    }

    #[test]
    fn test_with_column_qualifies_keys() {
        let row = ChangeRow::new("public", "users").with_column("name", "ada");
        assert!(row.fields.contains_key("public.users.name"));
        assert_eq!(row.qualified_name("id"), "public.users.id");
    }
}
