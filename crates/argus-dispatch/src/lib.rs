//! # argus-dispatch
//!
//! Issues the selected queries against their sources and records one
//! [`CallOutcome`](argus_core::CallOutcome) per candidate.
//!
//! Calls run concurrently up to a configurable bound, each with its own
//! timeout. Transient failures (timeouts, network errors, 5xx) are retried
//! with exponential backoff. HTTP 429 puts the source into a cooldown that
//! later candidates respect. A run-wide deadline skips work that has not
//! started in time. A failing source never aborts the run.

pub mod cooldown;
pub mod dispatcher;
pub mod error;
pub mod policy;
pub mod request;
pub mod response;
pub mod secrets;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use error::{CallError, DispatchError};
pub use policy::DispatchPolicy;
pub use secrets::{EnvSecretResolver, SecretResolver, StaticSecrets};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
