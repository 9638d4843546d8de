//! The ranking oracle seam.

use argus_core::{QueryCandidate, Signal};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::OracleError;

/// What the oracle is asked to rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRequest {
    /// Present signals only.
    pub signals: Vec<Signal>,
    pub candidates: Vec<QueryCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfidence {
    pub source_id: String,
    /// Relevance in `0.0..=1.0`.
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingResponse {
    pub ranking: Vec<SourceConfidence>,
}

/// External relevance opinion on candidate sources.
///
/// Implementations need not be reliable; any error is treated as
/// "no opinion".
#[async_trait]
pub trait RankingOracle: Send + Sync {
    /// # Errors
    ///
    /// Returns [`OracleError`] when no ranking can be produced.
    async fn rank(&self, request: &RankingRequest) -> Result<RankingResponse, OracleError>;
}
