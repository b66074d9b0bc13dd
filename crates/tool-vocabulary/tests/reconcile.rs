use episode_model::ApiAction;
use serde_json::json;
use tool_vocabulary::{
    ApiRenderMode, Convention, CustomApi, CustomCatalog, ToolDeclaration, ToolManifest,
    ToolVocabulary, VocabularyError,
};

fn custom(entries: &[(&str, &[&str], &[&str])]) -> CustomCatalog {
    CustomCatalog::from_entries(entries.iter().map(|(name, required, optional)| CustomApi {
        name: name.to_string(),
        required: required.iter().map(|s| s.to_string()).collect(),
        optional: optional.iter().map(|s| s.to_string()).collect(),
        description: None,
    }))
    .unwrap()
}

fn manifest() -> ToolManifest {
    ToolManifest::from_declarations([ToolDeclaration {
        name: "get_weather".into(),
        description: "Weather by city".into(),
        parameters: json!({
            "type": "object",
            "properties": {"city": {"type": "string"}, "bid": {"type": "string"}},
            "required": ["city"]
        }),
    }])
    .unwrap()
}

#[test]
fn builtin_tool_wins_outside_custom_catalog() {
    let vocabulary = ToolVocabulary::default();
    let action = ApiAction::new("execute_bash").with_argument("command", "ls");
    let reconciled = vocabulary.reconcile(&action, true).unwrap();
    assert_eq!(reconciled.convention, Convention::Builtin);
    assert_eq!(reconciled.function, "execute_bash");
}

#[test]
fn custom_catalog_shadows_builtin() {
    let vocabulary = ToolVocabulary::new(
        custom(&[("think", &["topic"], &[])]),
        ToolManifest::default(),
        ApiRenderMode::Wrapped,
    );
    let action = ApiAction::new("think").with_argument("topic", "plans");
    let reconciled = vocabulary.reconcile(&action, false).unwrap();
    assert_eq!(reconciled.convention, Convention::CustomApi { wrapped: true });
}

#[test]
fn elementless_primitive_in_web_context() {
    let vocabulary = ToolVocabulary::default();
    let action = ApiAction::new("navigate").with_argument("url", "https://example.com");
    let reconciled = vocabulary.reconcile(&action, true).unwrap();
    assert_eq!(reconciled.convention, Convention::BrowserPrimitive);
    assert_eq!(reconciled.function, "goto");
}

#[test]
fn primitive_outside_web_context_is_unknown() {
    let vocabulary = ToolVocabulary::default();
    let action = ApiAction::new("click").with_argument("bid", "12");
    let err = vocabulary.reconcile(&action, false).unwrap_err();
    assert_eq!(err.label(), "unknown_function");
}

#[test]
fn manifest_applies_without_element_reference() {
    let vocabulary =
        ToolVocabulary::new(CustomCatalog::default(), manifest(), ApiRenderMode::Wrapped);
    let action = ApiAction::new("get_weather").with_argument("city", "Oslo");
    let reconciled = vocabulary.reconcile(&action, true).unwrap();
    assert_eq!(reconciled.convention, Convention::Manifest);
    assert!(!reconciled.convention.is_builtin());
}

#[test]
fn manifest_skipped_for_element_reference_in_web_context() {
    let vocabulary =
        ToolVocabulary::new(CustomCatalog::default(), manifest(), ApiRenderMode::Wrapped);
    let action = ApiAction::new("get_weather")
        .with_argument("city", "Oslo")
        .with_argument("bid", "4");
    let err = vocabulary.reconcile(&action, true).unwrap_err();
    assert!(matches!(err, VocabularyError::UnknownFunction { web: true, .. }));

    let offline = vocabulary.reconcile(&action, false).unwrap();
    assert_eq!(offline.convention, Convention::Manifest);
}

#[test]
fn direct_mode_leaves_custom_api_unwrapped() {
    let vocabulary = ToolVocabulary::new(
        custom(&[("search_flights", &["origin", "destination"], &["date"])]),
        ToolManifest::default(),
        ApiRenderMode::Direct,
    );
    let action = ApiAction::new("search_flights")
        .with_argument("origin", "OSL")
        .with_argument("destination", "SFO");
    let reconciled = vocabulary.reconcile(&action, false).unwrap();
    assert_eq!(reconciled.convention, Convention::CustomApi { wrapped: false });
    assert_eq!(reconciled.convention.wrapper(), None);
}

#[test]
fn element_primitive_normalizes_aliases() {
    let vocabulary = ToolVocabulary::default();
    let action = ApiAction::new("type")
        .with_argument("element_id", "7")
        .with_argument("text", "hello");
    let reconciled = vocabulary.reconcile(&action, true).unwrap();
    assert_eq!(reconciled.convention, Convention::BrowserElement);
    assert_eq!(reconciled.function, "fill");
    assert_eq!(reconciled.arguments.get("bid"), Some(&json!("7")));
    assert_eq!(reconciled.arguments.get("value"), Some(&json!("hello")));
    assert_eq!(reconciled.pending_locator, None);
}

#[test]
fn xpath_alias_becomes_pending_locator() {
    let vocabulary = ToolVocabulary::default();
    let action = ApiAction::new("click").with_argument("xpath", "/html/body/button");
    let reconciled = vocabulary.reconcile(&action, true).unwrap();
    assert_eq!(reconciled.pending_locator.as_deref(), Some("/html/body/button"));
}

#[test]
fn extra_argument_is_a_mismatch() {
    let vocabulary = ToolVocabulary::default();
    let action = ApiAction::new("click")
        .with_argument("bid", "12")
        .with_argument("force", true);
    let err = vocabulary.reconcile(&action, true).unwrap_err();
    let text = err.to_string();
    assert_eq!(err.label(), "argument_mismatch");
    assert!(text.contains("click"));
    assert!(text.contains("force"));
}

#[test]
fn missing_required_builtin_argument_is_a_mismatch() {
    let vocabulary = ToolVocabulary::default();
    let action = ApiAction::new("str_replace_editor").with_argument("command", "view");
    let err = vocabulary.reconcile(&action, false).unwrap_err();
    assert!(matches!(err, VocabularyError::ArgumentMismatch { convention: "builtin", .. }));
}

#[test]
fn builtin_mismatch_falls_through_to_manifest() {
    let manifest = ToolManifest::from_declarations([ToolDeclaration {
        name: "execute_bash".into(),
        description: "Remote shell".into(),
        parameters: json!({
            "type": "object",
            "properties": {"cmd": {"type": "string"}},
            "required": ["cmd"]
        }),
    }])
    .unwrap();
    let vocabulary = ToolVocabulary::new(CustomCatalog::default(), manifest, ApiRenderMode::Wrapped);

    let remote = ApiAction::new("execute_bash").with_argument("cmd", "ls");
    let reconciled = vocabulary.reconcile(&remote, false).unwrap();
    assert_eq!(reconciled.convention, Convention::Manifest);
    assert_eq!(reconciled.arguments.get("cmd"), Some(&json!("ls")));

    let local = ApiAction::new("execute_bash").with_argument("command", "ls");
    assert_eq!(vocabulary.reconcile(&local, false).unwrap().convention, Convention::Builtin);
}

#[test]
fn custom_api_mismatch_falls_through_to_element_primitive() {
    let vocabulary = ToolVocabulary::new(
        custom(&[("click", &["selector"], &[])]),
        ToolManifest::default(),
        ApiRenderMode::Wrapped,
    );
    let by_selector = ApiAction::new("click").with_argument("selector", "#go");
    assert_eq!(
        vocabulary.reconcile(&by_selector, true).unwrap().convention,
        Convention::CustomApi { wrapped: true }
    );

    let by_bid = ApiAction::new("click").with_argument("bid", "12");
    let reconciled = vocabulary.reconcile(&by_bid, true).unwrap();
    assert_eq!(reconciled.convention, Convention::BrowserElement);
}

#[test]
fn mismatch_everywhere_reports_highest_priority_convention() {
    let manifest = ToolManifest::from_declarations([ToolDeclaration {
        name: "execute_bash".into(),
        description: String::new(),
        parameters: json!({"type": "object", "properties": {"cmd": {}}, "required": ["cmd"]}),
    }])
    .unwrap();
    let vocabulary = ToolVocabulary::new(CustomCatalog::default(), manifest, ApiRenderMode::Wrapped);
    let action = ApiAction::new("execute_bash").with_argument("script", "ls");
    let err = vocabulary.reconcile(&action, false).unwrap_err();
    assert!(matches!(err, VocabularyError::ArgumentMismatch { convention: "builtin", .. }));
}

#[test]
fn builtin_names_include_primitive_aliases() {
    let vocabulary = ToolVocabulary::default();
    assert!(vocabulary.is_builtin_name("execute_ipython_cell"));
    assert!(vocabulary.is_builtin_name("type"));
    assert!(!vocabulary.is_builtin_name("search_flights"));
}
