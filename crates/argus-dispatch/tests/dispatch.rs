//! Dispatcher behaviour against a scripted transport, on paused tokio time.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use argus_core::enums::{Attribute, DataType, EntityType, HttpMethod, SignalKind};
use argus_core::{
    AuthDescriptor, CallStatus, Catalog, Category, FailureKind, ParamBinding, QueryCandidate,
    ResponseHint, SkipReason, SourceDescriptor,
};
use argus_dispatch::{
    CallError, DispatchPolicy, Dispatcher, StaticSecrets, Transport, TransportRequest,
    TransportResponse,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

enum Step {
    Respond(TransportResponse),
    Delay(Duration, TransportResponse),
    Hang,
}

#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    fn on(self, url: &str, steps: Vec<Step>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), steps.into());
        self
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, CallError> {
        self.calls.lock().unwrap().push(request.url.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let step = self
            .script
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front);
        let resp = match step {
            Some(Step::Respond(resp)) => resp,
            Some(Step::Delay(wait, resp)) => {
                tokio::time::sleep(wait).await;
                resp
            }
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                TransportResponse::new(200, "{}")
            }
            None => TransportResponse::new(200, "{}"),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(resp)
    }
}

fn source(id: &str, auth: AuthDescriptor) -> SourceDescriptor {
    SourceDescriptor {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        category: Category::new(DataType::Text, EntityType::Person, Attribute::Email),
        endpoint_template: format!("https://{id}.test/{{q}}"),
        http_method: HttpMethod::Get,
        auth,
        param_mapping: vec![ParamBinding {
            param: "q".to_string(),
            signal: SignalKind::Email,
            required: true,
        }],
        static_params: BTreeMap::new(),
        headers: BTreeMap::new(),
        response_hint: ResponseHint::default(),
        priority: 0,
    }
}

fn catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::new(vec![
            source("hunter", AuthDescriptor::None),
            source("emailrep", AuthDescriptor::None),
            source(
                "locked",
                AuthDescriptor::Bearer {
                    secret: "LOCKED_TOKEN".to_string(),
                },
            ),
        ])
        .unwrap(),
    )
}

fn candidate(source_id: &str, value: &str) -> QueryCandidate {
    QueryCandidate {
        source_id: source_id.to_string(),
        signal: SignalKind::Email,
        bound_params: BTreeMap::from([("q".to_string(), value.to_string())]),
        match_tiers: 3,
        priority_score: 3.0,
    }
}

fn policy() -> DispatchPolicy {
    DispatchPolicy {
        timeout: Duration::from_secs(10),
        max_retries: 2,
        max_concurrency: 4,
        backoff_base: Duration::from_millis(250),
        backoff_max: Duration::from_secs(5),
        run_deadline: None,
        max_cooldown_wait: Duration::from_secs(5),
        default_retry_after: Duration::from_secs(60),
    }
}

fn dispatcher(transport: &Arc<ScriptedTransport>, policy: DispatchPolicy) -> Dispatcher {
    Dispatcher::new(
        Arc::clone(transport) as Arc<dyn Transport>,
        Arc::new(StaticSecrets::new()),
        policy,
    )
}

#[tokio::test(start_paused = true)]
async fn hanging_source_times_out_after_all_retries() {
    let transport = Arc::new(
        ScriptedTransport::default()
            .on("https://hunter.test/a", vec![Step::Hang, Step::Hang, Step::Hang]),
    );
    let outcomes = dispatcher(&transport, policy())
        .dispatch(catalog(), vec![candidate("hunter", "a")])
        .await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].attempts, 3);
    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Timeout));
    assert!(outcomes[0].raw_payload.is_none());
    assert_eq!(transport.calls_to("https://hunter.test/a"), 3);
}

#[tokio::test(start_paused = true)]
async fn server_error_is_retried_then_succeeds() {
    let transport = Arc::new(ScriptedTransport::default().on(
        "https://hunter.test/a",
        vec![
            Step::Respond(TransportResponse::new(503, "busy")),
            Step::Respond(TransportResponse::new(200, r#"{"ok": true}"#)),
        ],
    ));
    let outcomes = dispatcher(&transport, policy())
        .dispatch(catalog(), vec![candidate("hunter", "a")])
        .await;

    assert_eq!(outcomes[0].status, CallStatus::Success);
    assert_eq!(outcomes[0].attempts, 2);
    assert_eq!(outcomes[0].http_status, Some(200));
    assert_eq!(outcomes[0].raw_payload, Some(json!({"ok": true})));
}

#[tokio::test(start_paused = true)]
async fn client_error_is_not_retried() {
    let transport = Arc::new(ScriptedTransport::default().on(
        "https://hunter.test/a",
        vec![Step::Respond(TransportResponse::new(404, "no such person"))],
    ));
    let outcomes = dispatcher(&transport, policy())
        .dispatch(catalog(), vec![candidate("hunter", "a")])
        .await;

    assert_eq!(outcomes[0].attempts, 1);
    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::ClientError));
    assert_eq!(outcomes[0].http_status, Some(404));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_beyond_wait_budget_cools_the_source() {
    let transport = Arc::new(ScriptedTransport::default().on(
        "https://hunter.test/a",
        vec![Step::Respond(
            TransportResponse::new(429, "").with_retry_after(Duration::from_secs(30)),
        )],
    ));
    let dispatcher = dispatcher(
        &transport,
        DispatchPolicy {
            max_concurrency: 1,
            ..policy()
        },
    );
    let outcomes = dispatcher
        .dispatch(
            catalog(),
            vec![
                candidate("hunter", "a"),
                candidate("hunter", "b"),
                candidate("emailrep", "a"),
            ],
        )
        .await;

    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::RateLimited));
    assert_eq!(outcomes[0].attempts, 1);
    assert_eq!(
        outcomes[1].status,
        CallStatus::Skipped {
            reason: SkipReason::Cooldown
        }
    );
    assert_eq!(outcomes[1].attempts, 0);
    assert!(outcomes[2].is_success());
    assert_eq!(transport.calls_to("https://hunter.test/b"), 0);
    assert!(dispatcher.cooldown_remaining("hunter").is_some());
}

#[tokio::test(start_paused = true)]
async fn short_rate_limit_is_waited_out() {
    let transport = Arc::new(ScriptedTransport::default().on(
        "https://hunter.test/a",
        vec![
            Step::Respond(TransportResponse::new(429, "").with_retry_after(Duration::from_secs(2))),
            Step::Respond(TransportResponse::new(200, "[]")),
        ],
    ));
    let outcomes = dispatcher(&transport, policy())
        .dispatch(catalog(), vec![candidate("hunter", "a")])
        .await;

    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[0].attempts, 2);
    assert!(outcomes[0].latency_ms >= 2_000);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_without_header_uses_default_cooldown() {
    let transport = Arc::new(ScriptedTransport::default().on(
        "https://hunter.test/a",
        vec![Step::Respond(TransportResponse::new(429, ""))],
    ));
    let dispatcher = dispatcher(&transport, policy());
    let outcomes = dispatcher
        .dispatch(catalog(), vec![candidate("hunter", "a")])
        .await;

    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::RateLimited));
    let remaining = dispatcher.cooldown_remaining("hunter").unwrap();
    assert!(remaining > Duration::from_secs(55));
}

#[tokio::test(start_paused = true)]
async fn deadline_skips_unstarted_candidates() {
    let slow = || Step::Delay(Duration::from_secs(10), TransportResponse::new(200, "{}"));
    let transport = Arc::new(
        ScriptedTransport::default()
            .on("https://hunter.test/a", vec![slow()])
            .on("https://hunter.test/b", vec![slow()])
            .on("https://hunter.test/c", vec![slow()]),
    );
    let outcomes = dispatcher(
        &transport,
        DispatchPolicy {
            timeout: Duration::from_secs(30),
            max_concurrency: 1,
            run_deadline: Some(Duration::from_secs(15)),
            ..policy()
        },
    )
    .dispatch(
        catalog(),
        vec![
            candidate("hunter", "a"),
            candidate("hunter", "b"),
            candidate("hunter", "c"),
        ],
    )
    .await;

    assert!(outcomes[0].is_success());
    assert!(outcomes[1].is_success());
    assert_eq!(
        outcomes[2].status,
        CallStatus::Skipped {
            reason: SkipReason::Timeout
        }
    );
    assert_eq!(transport.calls_to("https://hunter.test/c"), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrency_is_bounded_and_order_preserved() {
    let mut transport = ScriptedTransport::default();
    let values = ["a", "b", "c", "d", "e", "f"];
    for (i, v) in values.iter().enumerate() {
        let wait = Duration::from_secs(u64::try_from(values.len() - i).unwrap());
        transport = transport.on(
            &format!("https://hunter.test/{v}"),
            vec![Step::Delay(wait, TransportResponse::new(200, format!("\"{v}\"")))],
        );
    }
    let transport = Arc::new(transport);
    let candidates: Vec<_> = values.iter().map(|v| candidate("hunter", v)).collect();
    let outcomes = dispatcher(
        &transport,
        DispatchPolicy {
            max_concurrency: 2,
            ..policy()
        },
    )
    .dispatch(catalog(), candidates)
    .await;

    assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 2);
    let payloads: Vec<_> = outcomes
        .iter()
        .map(|o| o.raw_payload.clone().unwrap())
        .collect();
    assert_eq!(
        payloads,
        values.iter().map(|v| json!(v)).collect::<Vec<_>>()
    );
}

#[tokio::test(start_paused = true)]
async fn missing_secret_fails_without_calling() {
    let transport = Arc::new(ScriptedTransport::default());
    let outcomes = dispatcher(&transport, policy())
        .dispatch(catalog(), vec![candidate("locked", "a")])
        .await;

    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Auth));
    assert_eq!(outcomes[0].attempts, 1);
    assert!(transport.calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unknown_source_is_a_request_failure() {
    let transport = Arc::new(ScriptedTransport::default());
    let outcomes = dispatcher(&transport, policy())
        .dispatch(
            catalog(),
            vec![candidate("ghost", "a"), candidate("emailrep", "a")],
        )
        .await;

    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Request));
    assert_eq!(outcomes[0].attempts, 0);
    assert!(outcomes[1].is_success());
}

#[tokio::test]
async fn no_candidates_no_outcomes() {
    let transport = Arc::new(ScriptedTransport::default());
    let outcomes = dispatcher(&transport, policy())
        .dispatch(catalog(), Vec::new())
        .await;
    assert!(outcomes.is_empty());
}
