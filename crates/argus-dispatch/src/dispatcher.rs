//! Concurrent dispatch of query candidates.
//!
//! Candidates start in the order given (the selector's priority order),
//! bounded by a semaphore. Each call gets a per-attempt timeout, retries
//! with capped exponential backoff for transient failures, and honors
//! provider rate limits through a per-source cooldown. Every candidate
//! yields exactly one [`CallOutcome`], returned in candidate order.

use std::sync::Arc;
use std::time::Duration;

use argus_config::DispatchConfig;
use argus_core::{
    CallOutcome, Catalog, FailureKind, QueryCandidate, SkipReason, SourceDescriptor,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::cooldown::CooldownTable;
use crate::error::{CallError, DispatchError};
use crate::policy::DispatchPolicy;
use crate::request::build_request;
use crate::response::classify;
use crate::secrets::{EnvSecretResolver, SecretResolver};
use crate::transport::{ReqwestTransport, Transport};

/// Shared state handed to each call task.
struct CallContext {
    transport: Arc<dyn Transport>,
    secrets: Arc<dyn SecretResolver>,
    policy: DispatchPolicy,
    cooldowns: Arc<CooldownTable>,
    deadline: Option<Instant>,
}

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    secrets: Arc<dyn SecretResolver>,
    policy: DispatchPolicy,
    cooldowns: Arc<CooldownTable>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        secrets: Arc<dyn SecretResolver>,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            transport,
            secrets,
            policy,
            cooldowns: Arc::new(CooldownTable::new()),
        }
    }

    /// Production dispatcher: `reqwest` transport, secrets from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Client`] if the HTTP client cannot be built.
    pub fn from_config(config: &DispatchConfig) -> Result<Self, DispatchError> {
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(EnvSecretResolver),
            DispatchPolicy::from(config),
        ))
    }

    #[must_use]
    pub const fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Remaining rate-limit cooldown for a source, if any.
    #[must_use]
    pub fn cooldown_remaining(&self, source_id: &str) -> Option<Duration> {
        self.cooldowns.remaining(source_id)
    }

    /// Dispatch every candidate and return one outcome per candidate, in
    /// candidate order.
    pub async fn dispatch(
        &self,
        catalog: Arc<Catalog>,
        candidates: Vec<QueryCandidate>,
    ) -> Vec<CallOutcome> {
        let started = Instant::now();
        let ctx = Arc::new(CallContext {
            transport: Arc::clone(&self.transport),
            secrets: Arc::clone(&self.secrets),
            policy: self.policy.clone(),
            cooldowns: Arc::clone(&self.cooldowns),
            deadline: self.policy.run_deadline.map(|d| started + d),
        });
        let sem = Arc::new(Semaphore::new(self.policy.max_concurrency));
        let mut slots: Vec<Option<CallOutcome>> = vec![None; candidates.len()];
        let mut set = JoinSet::new();

        for (idx, candidate) in candidates.iter().enumerate() {
            let Some(source) = catalog.get(&candidate.source_id).cloned() else {
                slots[idx] = Some(CallOutcome::failure(
                    candidate,
                    FailureKind::Request,
                    format!("unknown source '{}'", candidate.source_id),
                    None,
                    0,
                    0,
                ));
                continue;
            };

            let permit = match acquire(&sem, ctx.deadline).await {
                Acquired::Permit(permit) => permit,
                Acquired::DeadlinePassed => {
                    slots[idx] = Some(CallOutcome::skipped(candidate, SkipReason::Timeout));
                    continue;
                }
                Acquired::Closed => {
                    slots[idx] = Some(CallOutcome::failure(
                        candidate,
                        FailureKind::Request,
                        "dispatcher shut down",
                        None,
                        0,
                        0,
                    ));
                    continue;
                }
            };

            if ctx.cooldowns.is_cooling(&source.id) {
                tracing::debug!(source = %source.id, "source cooling down; skipping call");
                slots[idx] = Some(CallOutcome::skipped(candidate, SkipReason::Cooldown));
                continue;
            }

            let ctx = Arc::clone(&ctx);
            let candidate = candidate.clone();
            set.spawn(async move {
                let _permit = permit;
                let outcome = run_call(&ctx, &source, &candidate).await;
                (idx, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => tracing::warn!(%e, "call task failed to complete"),
            }
        }

        let outcomes: Vec<CallOutcome> = slots
            .into_iter()
            .zip(&candidates)
            .map(|(slot, candidate)| {
                slot.unwrap_or_else(|| {
                    CallOutcome::failure(
                        candidate,
                        FailureKind::Request,
                        "call task aborted",
                        None,
                        0,
                        0,
                    )
                })
            })
            .collect();

        tracing::info!(
            calls = outcomes.len(),
            succeeded = outcomes.iter().filter(|o| o.is_success()).count(),
            failed = outcomes.iter().filter(|o| o.is_failure()).count(),
            skipped = outcomes.iter().filter(|o| o.is_skipped()).count(),
            elapsed_ms = millis(started.elapsed()),
            "dispatch finished"
        );
        outcomes
    }
}

enum Acquired {
    Permit(OwnedSemaphorePermit),
    DeadlinePassed,
    Closed,
}

async fn acquire(sem: &Arc<Semaphore>, deadline: Option<Instant>) -> Acquired {
    let fut = Arc::clone(sem).acquire_owned();
    let result = match deadline {
        Some(deadline) => {
            if Instant::now() >= deadline {
                return Acquired::DeadlinePassed;
            }
            match tokio::time::timeout_at(deadline, fut).await {
                Ok(result) => result,
                Err(_) => return Acquired::DeadlinePassed,
            }
        }
        None => fut.await,
    };
    result.map_or(Acquired::Closed, Acquired::Permit)
}

/// Run one candidate to completion, retries included.
async fn run_call(
    ctx: &CallContext,
    source: &SourceDescriptor,
    candidate: &QueryCandidate,
) -> CallOutcome {
    let started = Instant::now();
    let request = match build_request(source, candidate, ctx.secrets.as_ref()) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(
                source = %source.id,
                kind = %e.kind,
                "cannot build request: {}",
                e.message
            );
            return CallOutcome::failure(candidate, e.kind, e.message, None, 1, 0);
        }
    };

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let result = match tokio::time::timeout(
            ctx.policy.timeout,
            ctx.transport.send(request.clone()),
        )
        .await
        {
            Ok(Ok(resp)) => {
                let status = resp.status;
                classify(resp).map(|payload| (status, payload))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CallError::timeout(ctx.policy.timeout)),
        };

        let err = match result {
            Ok((status, payload)) => {
                tracing::debug!(source = %source.id, status, attempts, "call succeeded");
                return CallOutcome::success(
                    candidate,
                    payload,
                    status,
                    attempts,
                    millis(started.elapsed()),
                );
            }
            Err(err) => err,
        };

        match retry_wait(ctx, &source.id, &err, attempts) {
            Some(wait) => {
                tracing::debug!(
                    source = %source.id,
                    kind = %err.kind,
                    attempts,
                    wait_ms = millis(wait),
                    "retrying call"
                );
                tokio::time::sleep(wait).await;
            }
            None => {
                tracing::warn!(
                    source = %source.id,
                    kind = %err.kind,
                    attempts,
                    "call failed: {}",
                    err.message
                );
                return CallOutcome::failure(
                    candidate,
                    err.kind,
                    err.message,
                    err.http_status,
                    attempts,
                    millis(started.elapsed()),
                );
            }
        }
    }
}

/// How long to wait before retrying, or `None` to give up.
///
/// Rate limits always start a source cooldown; the call itself only waits
/// it out when the cooldown fits `max_cooldown_wait`. No retry may sleep
/// past the run deadline.
fn retry_wait(
    ctx: &CallContext,
    source_id: &str,
    err: &CallError,
    attempts: u32,
) -> Option<Duration> {
    let retries_used = attempts.saturating_sub(1);
    let can_retry = retries_used < ctx.policy.max_retries;

    let wait = if err.kind == FailureKind::RateLimited {
        let cooldown = err.retry_after.unwrap_or(ctx.policy.default_retry_after);
        ctx.cooldowns.start(source_id, cooldown);
        if !can_retry || cooldown > ctx.policy.max_cooldown_wait {
            return None;
        }
        cooldown
    } else if err.kind.is_transient() && can_retry {
        ctx.policy.backoff(retries_used)
    } else {
        return None;
    };

    match ctx.deadline {
        Some(deadline) if Instant::now() + wait >= deadline => None,
        _ => Some(wait),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
