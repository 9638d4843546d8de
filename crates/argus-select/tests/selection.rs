//! Selection properties and oracle fallback behaviour.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use argus_core::enums::{Attribute, DataType, EntityType, HttpMethod, SignalKind};
use argus_core::{
    AuthDescriptor, Catalog, Category, ExclusionReason, ParamBinding, RankingSource,
    ResponseHint, Signal, SignalSet, SourceDescriptor,
};
use argus_select::{
    OracleError, RankingOracle, RankingRequest, RankingResponse, SelectorOptions,
    SourceConfidence, select, select_ranked,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rstest::rstest;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn source(id: &str, category: Category, binds: &[(&str, SignalKind)], priority: i32) -> SourceDescriptor {
    SourceDescriptor {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        category,
        endpoint_template: format!("https://{id}.example.test/api"),
        http_method: HttpMethod::Get,
        auth: AuthDescriptor::None,
        param_mapping: binds
            .iter()
            .map(|(param, signal)| ParamBinding {
                param: (*param).to_string(),
                signal: *signal,
                required: true,
            })
            .collect(),
        static_params: BTreeMap::new(),
        headers: BTreeMap::new(),
        response_hint: ResponseHint::default(),
        priority,
    }
}

fn cat(data_type: DataType, entity_type: EntityType, attribute: Attribute) -> Category {
    Category::new(data_type, entity_type, attribute)
}

/// Name and email sources of varying fit, plus one network source.
fn catalog() -> Catalog {
    Catalog::new(vec![
        source(
            "people-search",
            cat(DataType::Text, EntityType::Person, Attribute::Name),
            &[("name", SignalKind::Name)],
            0,
        ),
        source(
            "emailrep",
            cat(DataType::Text, EntityType::Person, Attribute::Email),
            &[("email", SignalKind::Email)],
            0,
        ),
        source(
            "hunter",
            cat(DataType::Text, EntityType::Person, Attribute::Email),
            &[("email", SignalKind::Email)],
            5,
        ),
        source(
            "corp-registry",
            cat(DataType::Text, EntityType::Organization, Attribute::Name),
            &[("q", SignalKind::Name)],
            0,
        ),
        source(
            "shodan",
            cat(DataType::Network, EntityType::Device, Attribute::Ip),
            &[("ip", SignalKind::FreeText)],
            0,
        ),
    ])
    .unwrap()
}

fn signals(items: &[(SignalKind, &str)]) -> SignalSet {
    SignalSet::new(
        items
            .iter()
            .map(|(kind, value)| Signal::present(*kind, *value))
            .collect(),
    )
}

fn ids(selection: &argus_select::Selection) -> Vec<&str> {
    selection
        .candidates
        .iter()
        .map(|c| c.source_id.as_str())
        .collect()
}

// ---------------------------------------------------------------------------
// Deterministic selection
// ---------------------------------------------------------------------------

#[test]
fn name_selects_person_name_source_only_from_two() {
    let catalog = Catalog::new(vec![
        source(
            "people-search",
            cat(DataType::Text, EntityType::Person, Attribute::Name),
            &[("name", SignalKind::Name)],
            0,
        ),
        source(
            "shodan",
            cat(DataType::Network, EntityType::Device, Attribute::Ip),
            &[("ip", SignalKind::FreeText)],
            0,
        ),
    ])
    .unwrap();
    let selection = select(&signals(&[(SignalKind::Name, "Jane Doe")]), &catalog, 10);
    assert_eq!(ids(&selection), vec!["people-search"]);
    assert!(selection.exclusions.is_empty());
    assert_eq!(selection.ranking, RankingSource::Deterministic);
}

#[test]
fn empty_signal_set_is_empty_selection() {
    let selection = select(&SignalSet::default(), &catalog(), 10);
    assert!(selection.candidates.is_empty());
    assert!(selection.exclusions.is_empty());
    assert_eq!(selection.truncated, 0);
}

#[test]
fn absent_signals_do_not_select() {
    let set = SignalSet::new(vec![Signal::absent(SignalKind::Email, "not-an-email")]);
    assert!(select(&set, &catalog(), 10).candidates.is_empty());
}

#[test]
fn ranked_by_tiers_then_priority_then_catalog_order() {
    let set = signals(&[(SignalKind::Name, "Jane Doe"), (SignalKind::Email, "jane@example.com")]);
    let selection = select(&set, &catalog(), 10);
    // 3-tier matches first; hunter outranks emailrep on priority.
    assert_eq!(
        ids(&selection),
        vec!["hunter", "people-search", "emailrep", "corp-registry"]
    );
    let tiers: Vec<u8> = selection.candidates.iter().map(|c| c.match_tiers).collect();
    assert_eq!(tiers, vec![3, 3, 3, 2]);
}

#[test]
fn matching_source_without_binding_is_excluded() {
    let set = signals(&[(SignalKind::Name, "Jane Doe")]);
    let selection = select(&set, &catalog(), 10);
    let excluded: Vec<(&str, &ExclusionReason)> = selection
        .exclusions
        .iter()
        .map(|e| (e.source_id.as_str(), &e.reason))
        .collect();
    assert_eq!(
        excluded,
        vec![
            ("emailrep", &ExclusionReason::NoParamForSignal),
            ("hunter", &ExclusionReason::NoParamForSignal),
        ]
    );
    assert!(selection.exclusions.iter().all(|e| e.signal == SignalKind::Name));
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(10)]
fn limit_bounds_candidates(#[case] limit: usize) {
    let set = signals(&[(SignalKind::Name, "Jane Doe"), (SignalKind::Email, "jane@example.com")]);
    let full = select(&set, &catalog(), usize::MAX);
    let selection = select(&set, &catalog(), limit);
    assert!(selection.candidates.len() <= limit);
    assert_eq!(selection.truncated, full.candidates.len().saturating_sub(limit));
    assert_eq!(
        selection.candidates[..],
        full.candidates[..selection.candidates.len()]
    );
}

#[test]
fn selection_is_idempotent() {
    let set = signals(&[
        (SignalKind::Email, "a@example.com"),
        (SignalKind::Email, "b@example.com"),
        (SignalKind::Name, "Jane Doe"),
    ]);
    let first = select(&set, &catalog(), 10);
    let second = select(&set, &catalog(), 10);
    assert_eq!(first, second);
}

#[test]
fn one_candidate_per_present_value() {
    let set = signals(&[
        (SignalKind::Email, "a@example.com"),
        (SignalKind::Email, "b@example.com"),
    ]);
    let selection = select(&set, &catalog(), 10);
    let emailrep: Vec<&str> = selection
        .candidates
        .iter()
        .filter(|c| c.source_id == "emailrep")
        .map(|c| c.bound_params["email"].as_str())
        .collect();
    assert_eq!(emailrep, vec!["a@example.com", "b@example.com"]);
}

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

struct FixedOracle(Result<RankingResponse, fn() -> OracleError>, AtomicUsize);

impl FixedOracle {
    fn ok(ranking: &[(&str, f64)]) -> Self {
        Self(
            Ok(RankingResponse {
                ranking: ranking
                    .iter()
                    .map(|(id, confidence)| SourceConfidence {
                        source_id: (*id).to_string(),
                        confidence: *confidence,
                    })
                    .collect(),
            }),
            AtomicUsize::new(0),
        )
    }

    fn failing() -> Self {
        Self(
            Err(|| OracleError::Api {
                status: 500,
                message: "boom".to_string(),
            }),
            AtomicUsize::new(0),
        )
    }
}

#[async_trait]
impl RankingOracle for FixedOracle {
    async fn rank(&self, _request: &RankingRequest) -> Result<RankingResponse, OracleError> {
        self.1.fetch_add(1, Ordering::SeqCst);
        match &self.0 {
            Ok(response) => Ok(response.clone()),
            Err(make) => Err(make()),
        }
    }
}

struct SlowOracle;

#[async_trait]
impl RankingOracle for SlowOracle {
    async fn rank(&self, _request: &RankingRequest) -> Result<RankingResponse, OracleError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(RankingResponse::default())
    }
}

fn name_and_email() -> SignalSet {
    signals(&[(SignalKind::Name, "Jane Doe"), (SignalKind::Email, "jane@example.com")])
}

#[tokio::test]
async fn oracle_reorders_within_tier_weighting() {
    let oracle = FixedOracle::ok(&[("emailrep", 1.0), ("hunter", 0.0), ("corp-registry", 1.0)]);
    let options = SelectorOptions::new(10);
    let selection = select_ranked(&name_and_email(), &catalog(), &options, Some(&oracle)).await;

    assert_eq!(selection.ranking, RankingSource::Oracle);
    // w = 0.5: emailrep 3.0, people-search 2.25 (unranked 0.5), corp-registry 2.0, hunter 1.5
    assert_eq!(
        ids(&selection),
        vec!["emailrep", "people-search", "corp-registry", "hunter"]
    );
    assert!((selection.candidates[0].priority_score - 3.0).abs() < 1e-9);
    assert_eq!(oracle.1.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_weight_oracle_keeps_deterministic_order() {
    let oracle = FixedOracle::ok(&[("corp-registry", 1.0)]);
    let options = SelectorOptions {
        oracle_weight: 0.0,
        ..SelectorOptions::new(10)
    };
    let ranked = select_ranked(&name_and_email(), &catalog(), &options, Some(&oracle)).await;
    let plain = select(&name_and_email(), &catalog(), 10);
    assert_eq!(ids(&ranked), ids(&plain));
}

#[rstest]
#[case::error(FixedOracle::failing())]
#[case::out_of_range(FixedOracle::ok(&[("emailrep", 1.7)]))]
#[case::not_a_number(FixedOracle::ok(&[("emailrep", f64::NAN)]))]
#[case::duplicate(FixedOracle::ok(&[("emailrep", 0.2), ("emailrep", 0.9)]))]
#[case::empty(FixedOracle::ok(&[]))]
#[tokio::test]
async fn unusable_oracle_yields_deterministic_order(#[case] oracle: FixedOracle) {
    let options = SelectorOptions::new(3);
    let ranked = select_ranked(&name_and_email(), &catalog(), &options, Some(&oracle)).await;
    let plain = select(&name_and_email(), &catalog(), 3);

    assert_eq!(ranked.candidates, plain.candidates);
    assert_eq!(ranked.truncated, plain.truncated);
    assert!(ranked.ranking.is_fallback(), "{:?}", ranked.ranking);
}

#[tokio::test(start_paused = true)]
async fn oracle_timeout_falls_back() {
    let options = SelectorOptions::new(10).with_oracle_timeout(Duration::from_millis(250));
    let ranked = select_ranked(&name_and_email(), &catalog(), &options, Some(&SlowOracle)).await;
    let plain = select(&name_and_email(), &catalog(), 10);

    assert_eq!(ranked.candidates, plain.candidates);
    match ranked.ranking {
        RankingSource::Fallback { reason } => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("expected fallback, got {other:?}"),
    }
}

#[tokio::test]
async fn no_oracle_is_deterministic() {
    let options = SelectorOptions::new(10);
    let ranked = select_ranked(&name_and_email(), &catalog(), &options, None).await;
    assert_eq!(ranked, select(&name_and_email(), &catalog(), 10));
}
