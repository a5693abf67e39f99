use serde_json::Value;

use crate::error::AppError;
use crate::models::AccessGrant;
use crate::services::store::DocumentStore;

/// Append-only ordered list of batch-edit operations, shared by the
/// reconciler and the transplanter and submitted exactly once. Order is
/// load-bearing: later operations reference object ids created earlier in
/// the same list, and update-mode deletions must precede all insertions.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    operations: Vec<Value>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        BatchBuilder::default()
    }

    pub fn push(&mut self, operation: Value) {
        self.operations.push(operation);
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn operations(&self) -> &[Value] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Value> {
        self.operations
    }
}

/// Submits the whole operation list as one atomic edit. A no-op when the
/// list is empty; any store failure propagates untouched (the store applies
/// batches atomically, so nothing partial is assumed).
pub async fn commit(
    store: &dyn DocumentStore,
    presentation_id: &str,
    batch: BatchBuilder,
) -> Result<(), AppError> {
    if batch.is_empty() {
        tracing::info!("no operations queued, skipping batch submit");
        return Ok(());
    }
    tracing::info!(operations = batch.len(), "submitting batch update");
    store
        .batch_update(presentation_id, batch.into_operations())
        .await?;
    Ok(())
}

/// Post-commit sharing for freshly created decks: named account gets writer
/// access with a notification, otherwise the deck goes public read-only.
pub async fn share(
    store: &dyn DocumentStore,
    presentation_id: &str,
    share_with: Option<&str>,
) -> Result<(), AppError> {
    let grant = match share_with {
        Some(email) => AccessGrant::Writer {
            email: email.to_string(),
        },
        None => AccessGrant::PublicReader,
    };
    store.grant_access(presentation_id, &grant).await?;
    Ok(())
}
