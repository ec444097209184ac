use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppResult, state::AppState};

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub action: &'static str,
    pub resource: &'static str,
    pub resource_id: Option<Uuid>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: &'static str, resource: &'static str, resource_id: Uuid) -> Self {
        Self {
            action,
            resource,
            resource_id: Some(resource_id),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

pub async fn log_audit(pool: &PgPool, entry: &AuditEntry) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, action, resource, resource_id, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.action)
    .bind(entry.resource)
    .bind(entry.resource_id)
    .bind(entry.metadata.clone())
    .bind(entry.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Best-effort write; a failed audit never fails the operation that caused it.
pub async fn record(state: &AppState, entry: AuditEntry) {
    let action = entry.action;
    if let Err(err) = state.store.record_audit(entry).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
