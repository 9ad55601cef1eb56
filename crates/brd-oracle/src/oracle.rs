//! Structuring oracle trait

use crate::contract::OracleRequest;
use crate::error::OracleError;
use async_trait::async_trait;
use std::sync::Arc;

/// External phrasing capability bound by the no-new-vocabulary contract
///
/// Implementations return the raw reply text. Interpretation belongs to the
/// caller, which parses it with
/// [`OracleResponse::parse_strict`](crate::OracleResponse::parse_strict) and
/// validates vocabulary containment.
///
/// Calls are awaited one at a time by a pipeline run and carry no ordering
/// dependency on other documents. Implementations must not retry internally.
#[async_trait]
pub trait StructuringOracle: Send + Sync + std::fmt::Debug {
    /// Submit one cluster's fragment texts
    async fn structure(&self, request: &OracleRequest) -> Result<String, OracleError>;

    /// Oracle name (for logging and audit)
    fn name(&self) -> &str;
}

/// Shared oracle handle injected into pipelines
pub type SharedOracle = Arc<dyn StructuringOracle>;
