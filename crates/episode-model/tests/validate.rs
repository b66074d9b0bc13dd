use episode_model::{
    decode_episode, validate_episode, ApiAction, Episode, Source, Step, ValidationIssue,
    WebObservation,
};
use serde_json::json;

fn goal_episode() -> Episode {
    Episode::new("ep-1")
        .with_step(Step::text("book a flight", Source::User))
        .with_step(Step::ApiAction(
            ApiAction::new("click").with_argument("bid", "12"),
        ))
}

#[test]
fn accepts_well_formed_episode() {
    let value = serde_json::to_value(goal_episode()).unwrap();
    let episode = decode_episode(&value).expect("valid episode");
    assert_eq!(episode.id, "ep-1");
    assert_eq!(episode.steps.len(), 2);
    assert_eq!(episode.action_count(), 1);
}

#[test]
fn rejects_empty_steps() {
    let err = decode_episode(&json!({"id": "ep-2", "steps": []})).unwrap_err();
    assert_eq!(err.episode_id, "ep-2");
    assert_eq!(err.issues, vec![ValidationIssue::EmptySteps]);
}

#[test]
fn reports_unknown_tag_with_index() {
    let err = decode_episode(&json!({
        "id": "ep-3",
        "steps": [
            {"type": "text_observation", "content": "goal", "source": "user"},
            {"type": "teleport", "where": "moon"}
        ]
    }))
    .unwrap_err();
    assert!(err.has_unknown_variant());
    assert_eq!(
        err.issues,
        vec![ValidationIssue::UnknownTag {
            index: 1,
            tag: "teleport".to_string()
        }]
    );
}

#[test]
fn collects_every_violation() {
    let err = decode_episode(&json!({
        "steps": [
            {"content": "no tag"},
            {"type": "api_action"}
        ]
    }))
    .unwrap_err();
    let labels: Vec<_> = err.issues.iter().map(ValidationIssue::label).collect();
    assert_eq!(labels, vec!["missing_id", "missing_tag", "malformed_step"]);
}

#[test]
fn non_object_input_is_rejected() {
    let err = decode_episode(&json!([1, 2, 3])).unwrap_err();
    assert_eq!(err.issues, vec![ValidationIssue::NotAnObject]);
}

#[test]
fn web_observation_needs_content() {
    let episode = Episode::new("ep-4").with_step(Step::WebObservation(WebObservation {
        viewport: Some((0, 720)),
        ..WebObservation::default()
    }));
    let err = validate_episode(&episode).unwrap_err();
    assert_eq!(
        err.issues,
        vec![
            ValidationIssue::EmptyWebObservation { index: 0 },
            ValidationIssue::InvalidViewport {
                index: 0,
                width: 0,
                height: 720
            }
        ]
    );
}

#[test]
fn empty_function_name_is_reported() {
    let episode = Episode::new("ep-5").with_step(Step::ApiAction(ApiAction::new("  ")));
    let err = validate_episode(&episode).unwrap_err();
    assert_eq!(err.issues[0].label(), "empty_field");
    assert!(err.to_string().contains("function"));
}
