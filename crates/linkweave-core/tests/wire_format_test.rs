//! JSON shapes shared with the HTTP and WebSocket clients.

use linkweave_core::{
    AnalysisConfig, Category, EventEnvelope, JobRecord, JobStatus, LinkingRule, RuleTable,
    ServerEvent, StopwordLanguage,
};
use serde_json::json;
use uuid::Uuid;

#[test]
fn test_rules_document_is_nested_by_category() {
    let mut rules = RuleTable::new();
    rules
        .set_rule(Category::Blog, Category::Produit, LinkingRule::new(1, 3))
        .unwrap();
    rules
        .set_rule(Category::from("faq"), Category::Blog, LinkingRule::new(0, 2))
        .unwrap();

    let value = serde_json::to_value(rules.to_document()).unwrap();
    assert_eq!(
        value,
        json!({
            "blog": {"produit": {"min_links": 1, "max_links": 3}},
            "faq": {"blog": {"min_links": 0, "max_links": 2}},
        })
    );

    let parsed = RuleTable::from_json(&value.to_string()).unwrap();
    assert_eq!(parsed, rules);
}

#[test]
fn test_default_rules_document_covers_three_segments() {
    let doc = RuleTable::default_rules().to_document();
    assert_eq!(
        doc.sources().collect::<Vec<_>>(),
        vec!["blog", "categorie", "produit"]
    );
    assert_eq!(doc.iter().count(), 9);
    assert!(doc.iter().all(|(_, _, r)| r.min_links <= r.max_links));
    assert_eq!(doc.get("categorie", "produit"), Some(&LinkingRule::new(1, 2)));
}

#[test]
fn test_analysis_config_partial_json() {
    let config: AnalysisConfig = serde_json::from_value(json!({"anchor_suggestions": 5})).unwrap();
    assert_eq!(config.anchor_suggestions, 5);
    assert!((config.min_similarity - 0.2).abs() < 1e-6);
    assert_eq!(config.stopword_language, StopwordLanguage::French);
    assert!(config.linking_rules.is_none());
}

#[test]
fn test_job_record_json() {
    let id = Uuid::nil();
    let record = JobRecord::new(id);
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["id"], "00000000-0000-0000-0000-000000000000");
    assert_eq!(value["status"], "queued");
    assert_eq!(value["progress"], 0);
    assert!(value["result_file"].is_null());
    assert_eq!(record.status, JobStatus::Queued);
}

#[test]
fn test_progress_envelope_json() {
    let job_id = Uuid::new_v4();
    let envelope = EventEnvelope::new(ServerEvent::JobProgress {
        job_id,
        progress: 40,
        message: Some("Generating embeddings (32/80 pages)".into()),
    });
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["event_type"], "job.progress");
    assert_eq!(value["entity_type"], "job");
    assert_eq!(value["entity_id"], job_id.to_string());
    assert_eq!(value["payload_version"], 1);
    assert_eq!(value["payload"]["type"], "JobProgress");
    assert_eq!(value["payload"]["progress"], 40);
}

#[test]
fn test_completed_event_omits_missing_duration() {
    let value = serde_json::to_value(ServerEvent::JobCompleted {
        job_id: Uuid::nil(),
        result_file: "results/out.csv".into(),
        suggestion_count: 12,
        duration_ms: None,
    })
    .unwrap();
    assert!(value.get("duration_ms").is_none());
    assert_eq!(value["suggestion_count"], 12);
}
