use crate::error::ApplyError;
use async_trait::async_trait;
use std::path::Path;

/// Persists new file text; implemented by the host editor.
///
/// The host is expected to republish the file afterwards, so the session
/// reparses the text it handed over once this returns `Ok`.
#[async_trait]
pub trait ModificationSink: Send + Sync {
    async fn apply_modifications(&self, file_path: &Path, file_content: String)
    -> Result<(), ApplyError>;
}
