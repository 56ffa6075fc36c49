use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::UpstreamError;
use crate::domain::models::ServiceKind;

/// Source of precomputed analyses
///
/// Implementations issue a single request per call and never retry; the
/// caller owns the retry policy and the job deadline.
#[async_trait]
pub trait AnalysisSource: Send + Sync {
    /// Fetch the latest raw payload for `kind`
    async fn fetch(&self, kind: ServiceKind) -> Result<Value, UpstreamError>;
}
