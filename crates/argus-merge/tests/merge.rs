//! Merging outcomes from several sources into report sections.

use std::collections::BTreeMap;

use argus_core::enums::{Attribute, DataType, EntityType, SignalKind, VisualizationKind};
use argus_core::{
    AuthDescriptor, CallOutcome, Catalog, Category, FactKind, FactValue, FailureKind, FieldHint,
    ParamBinding, QueryCandidate, ResponseHint, SkipReason, SourceDescriptor, Topic,
};
use argus_merge::{Merger, NO_DATA_TITLE};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn source(id: &str, category: Category, fields: Vec<(&str, &str, FactKind)>) -> SourceDescriptor {
    SourceDescriptor {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        category,
        endpoint_template: format!("https://{id}.test/{{q}}"),
        http_method: argus_core::enums::HttpMethod::Get,
        auth: AuthDescriptor::None,
        param_mapping: vec![ParamBinding {
            param: "q".to_string(),
            signal: SignalKind::Email,
            required: true,
        }],
        static_params: BTreeMap::new(),
        headers: BTreeMap::new(),
        response_hint: ResponseHint {
            root: None,
            fields: fields
                .into_iter()
                .map(|(pointer, label, kind)| FieldHint {
                    pointer: pointer.to_string(),
                    label: label.to_string(),
                    kind,
                    unit: None,
                })
                .collect(),
        },
        priority: 0,
    }
}

fn catalog() -> Catalog {
    let person_email = Category::new(DataType::Text, EntityType::Person, Attribute::Email);
    let person_handle = Category::new(DataType::Text, EntityType::Person, Attribute::Username);
    Catalog::new(vec![
        source(
            "clearbit",
            person_email,
            vec![
                ("/employment/name", "employer", FactKind::Text),
                ("/geo", "location", FactKind::Coordinates),
            ],
        ),
        source(
            "github",
            person_handle,
            vec![
                ("/company", "employer", FactKind::Text),
                ("/name", "full name", FactKind::Text),
            ],
        ),
        source(
            "gitlab",
            person_handle,
            vec![("/name", "full name", FactKind::Text)],
        ),
        source(
            "emailrep",
            person_email,
            vec![("/profiles", "profile", FactKind::Category)],
        ),
        source(
            "geo",
            Category::new(DataType::Location, EntityType::Address, Attribute::Coordinates),
            vec![("", "location", FactKind::Coordinates)],
        ),
    ])
    .unwrap()
}

fn candidate(source_id: &str) -> QueryCandidate {
    QueryCandidate {
        source_id: source_id.to_string(),
        signal: SignalKind::Email,
        bound_params: BTreeMap::from([("q".to_string(), "x".to_string())]),
        match_tiers: 2,
        priority_score: 2.0,
    }
}

fn ok(source_id: &str, payload: Value) -> CallOutcome {
    CallOutcome::success(&candidate(source_id), payload, 200, 1, 10)
}

#[test]
fn same_fact_from_two_sources_is_emitted_once() {
    let outcomes = vec![
        ok("github", json!({"company": "Acme Corp", "name": "Jane Doe"})),
        ok("gitlab", json!({"name": "jane  doe"})),
    ];
    let sections = Merger::default().merge(&catalog(), &outcomes);

    assert_eq!(sections.len(), 1);
    let identity = &sections[0];
    assert_eq!(identity.topic, Topic::Identity);
    assert_eq!(identity.facts.len(), 2);

    let name = identity
        .facts
        .iter()
        .find(|f| f.fact.label == "full name")
        .unwrap();
    assert_eq!(name.corroboration, 2);
    assert_eq!(name.sources, vec!["github", "gitlab"]);
    assert_eq!(name.fact.value, FactValue::Text("Jane Doe".to_string()));
}

#[test]
fn corroboration_counts_sources_not_calls() {
    let outcomes = vec![
        ok("gitlab", json!({"name": "Jane Doe"})),
        ok("gitlab", json!({"name": "Jane Doe"})),
    ];
    let sections = Merger::default().merge(&catalog(), &outcomes);
    assert_eq!(sections[0].facts[0].corroboration, 1);
}

#[test]
fn sections_follow_topic_order() {
    let outcomes = vec![
        ok("geo", json!([{"lat": "52.52", "lon": "13.40"}])),
        ok("github", json!({"company": "Acme Corp"})),
        ok("clearbit", json!({"employment": {"name": "Acme Corp"}})),
    ];
    let sections = Merger::default().merge(&catalog(), &outcomes);
    let topics: Vec<Topic> = sections.iter().map(|s| s.topic).collect();
    assert_eq!(topics, vec![Topic::Identity, Topic::Contact, Topic::Location]);

    let location = &sections[2];
    let viz = location.visualization.as_ref().unwrap();
    assert_eq!(viz.kind, VisualizationKind::Map);
    assert_eq!(viz.payload["locations"][0]["lat"], 52.52);
}

#[test]
fn failures_and_skips_do_not_contribute() {
    let outcomes = vec![
        CallOutcome::failure(&candidate("github"), FailureKind::Timeout, "slow", None, 3, 30_000),
        CallOutcome::skipped(&candidate("gitlab"), SkipReason::Cooldown),
        ok("emailrep", json!({"profiles": ["twitter", "github"]})),
    ];
    let sections = Merger::default().merge(&catalog(), &outcomes);

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].sources, vec!["emailrep"]);
    assert_eq!(
        sections[0].visualization.as_ref().unwrap().kind,
        VisualizationKind::PieChart
    );
}

#[test]
fn unnormalizable_response_degrades_its_section() {
    let outcomes = vec![
        ok("clearbit", json!({"employment": {"name": "Acme"}, "geo": "somewhere"})),
        ok("emailrep", json!({"profiles": ["twitter"]})),
    ];
    let sections = Merger::default().merge(&catalog(), &outcomes);

    assert_eq!(sections.len(), 1);
    let contact = &sections[0];
    assert!(contact.degraded);
    assert_eq!(contact.sources, vec!["clearbit", "emailrep"]);
    assert_eq!(contact.facts.len(), 1);

    let viz = contact.visualization.as_ref().unwrap();
    assert_eq!(viz.kind, VisualizationKind::BulletList);
    let items: Vec<&str> = viz.payload["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(items[0], "profile: twitter");
    assert!(items[1].starts_with("clearbit (raw): "));
    assert!(items[1].contains("somewhere"));
}

#[test]
fn no_success_yields_single_no_data_section() {
    let outcomes = vec![CallOutcome::failure(
        &candidate("github"),
        FailureKind::ClientError,
        "HTTP 404: not found",
        Some(404),
        1,
        40,
    )];
    let sections = Merger::default().merge(&catalog(), &outcomes);

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].title, NO_DATA_TITLE);
    assert!(sections[0].facts.is_empty());
    assert!(sections[0].content.contains("None of the 1 queried source"));

    let empty = Merger::default().merge(&catalog(), &[]);
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].title, NO_DATA_TITLE);
}

#[test]
fn unknown_source_is_flattened_under_general() {
    let outcomes = vec![ok("retired", json!({"note": "hello"}))];
    let sections = Merger::default().merge(&catalog(), &outcomes);
    assert_eq!(sections[0].topic, Topic::General);
    assert_eq!(sections[0].facts[0].fact.label, "note");
}

#[test]
fn merge_is_deterministic() {
    let outcomes = vec![
        ok("github", json!({"company": "Acme Corp", "name": "Jane Doe"})),
        ok("emailrep", json!({"profiles": ["a", "b", "c"]})),
        ok("geo", json!([{"lat": 1.0, "lon": 2.0}])),
    ];
    let merger = Merger::default();
    assert_eq!(
        merger.merge(&catalog(), &outcomes),
        merger.merge(&catalog(), &outcomes)
    );
}

#[test]
fn fact_seen_in_two_topics_lives_with_first_reporter() {
    let outcomes = vec![
        ok("github", json!({"company": "Acme Corp"})),
        ok("clearbit", json!({"employment": {"name": "ACME corp"}})),
    ];
    let sections = Merger::default().merge(&catalog(), &outcomes);

    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].topic, Topic::Identity);
    assert_eq!(sections[0].facts.len(), 1);
    assert_eq!(sections[0].facts[0].corroboration, 2);
    assert_eq!(sections[0].facts[0].sources, vec!["github", "clearbit"]);

    assert_eq!(sections[1].topic, Topic::Contact);
    assert!(sections[1].facts.is_empty());
    assert_eq!(sections[1].sources, vec!["clearbit"]);
}
