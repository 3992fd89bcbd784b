//! Privacy projection.
//!
//! Relations tagged with privacy rules are never indexed as received.
//! Instead the matching rows of an anonymized view are read back from
//! PostgreSQL and those are indexed in place of the raw row.

use async_trait::async_trait;
use cdc_types::{canonical_number, flatten, ChangeRow, Document, FieldValue};
use tokio_postgres::SimpleQueryMessage;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::registry::{Privacy, Replica};

/// Read access to the anonymized views.
#[async_trait]
pub trait AnonymizedSource: Send + Sync {
    /// Run a query and return every row as a document.
    async fn query_documents(&self, sql: &str) -> anyhow::Result<Vec<Document>>;
}

#[async_trait]
impl AnonymizedSource for tokio_postgres::Client {
    async fn query_documents(&self, sql: &str) -> anyhow::Result<Vec<Document>> {
        let messages = self.simple_query(sql).await?;

        let mut documents = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let mut doc = Document::new();
                for (i, column) in row.columns().iter().enumerate() {
                    let value = row.get(i).unwrap_or_default();
                    doc.insert(column.name().to_string(), FieldValue::Text(value.to_string()));
                }
                documents.push(doc);
            }
        }
        Ok(documents)
    }
}

/// Source used when no replica has privacy rules and no database is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDatabase;

#[async_trait]
impl AnonymizedSource for NoDatabase {
    async fn query_documents(&self, _sql: &str) -> anyhow::Result<Vec<Document>> {
        anyhow::bail!("No database configured for anonymized views")
    }
}

/// Quote an identifier for PostgreSQL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Render a value as an SQL literal.
pub fn quote_literal(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "NULL".to_string(),
        FieldValue::Bool(true) => "TRUE".to_string(),
        FieldValue::Bool(false) => "FALSE".to_string(),
        FieldValue::Number(n) => canonical_number(*n),
        FieldValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Build the lookup of the anonymized rows matching `pivot_value`.
pub fn build_query(privacy: &Privacy, relation: &str, pivot_value: &FieldValue) -> String {
    let condition = if pivot_value.is_null() {
        "IS NULL".to_string()
    } else {
        format!("= {}", quote_literal(pivot_value))
    };
    format!(
        "SELECT * FROM {}.{} WHERE {} {condition}",
        quote_ident(&privacy.namespace),
        quote_ident(relation),
        quote_ident(&privacy.pivot),
    )
}

/// Maps change rows to the documents that get indexed for them.
pub struct PrivacyProjector<A> {
    source: A,
}

impl<A: AnonymizedSource> PrivacyProjector<A> {
    pub fn new(source: A) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &A {
        &self.source
    }

    /// Documents to index for `row`: the flattened row itself, or for
    /// privacy-tagged replicas the anonymized projection.
    pub async fn documents_for(&self, replica: &Replica, row: &ChangeRow) -> Result<Vec<Document>> {
        match &replica.privacy {
            None => Ok(vec![flatten(row)]),
            Some(privacy) => self.project(privacy, replica, row).await,
        }
    }

    /// Read the anonymized rows matching `row` on the pivot column.
    ///
    /// An empty result is not an error; the row simply has no anonymized
    /// counterpart yet.
    pub async fn project(
        &self,
        privacy: &Privacy,
        replica: &Replica,
        row: &ChangeRow,
    ) -> Result<Vec<Document>> {
        let field = row.qualified_name(&privacy.pivot);
        let pivot = row
            .fields
            .get(&field)
            .ok_or(SyncError::MissingField { field })?;

        let sql = build_query(privacy, &replica.relation, &pivot.content);
        debug!("Projecting {} through: {sql}", replica.relation);

        self.source
            .query_documents(&sql)
            .await
            .map_err(|e| SyncError::Transport(e.context(format!("querying {}", privacy.namespace))))
    }
}
