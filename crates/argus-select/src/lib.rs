//! # argus-select
//!
//! Turns a signal set and a catalog snapshot into a ranked, de-duplicated,
//! bounded list of query candidates.
//!
//! Ranking is deterministic: match tiers, then source priority, then catalog
//! order, then signal order. A [`RankingOracle`] may re-score candidates;
//! when it fails, times out, or answers nonsense, the deterministic order is
//! used unchanged and the reason is recorded in the [`Selection`].

mod error;
mod http_oracle;
mod oracle;
mod selector;

pub use error::OracleError;
pub use http_oracle::HttpRankingOracle;
pub use oracle::{RankingOracle, RankingRequest, RankingResponse, SourceConfidence};
pub use selector::{Selection, SelectorOptions, select, select_ranked, select_with};
