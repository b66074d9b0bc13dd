use std::sync::Arc;

use conversation_render::{ConversationRenderer, RenderOptions};
use element_resolver::{DisabledRenderer, ErrorSink};
use serde_json::{json, Value};
use soul_episodes::{RenderPipeline, RunSummary};
use tool_vocabulary::ToolVocabulary;

fn pipeline(sink: Arc<ErrorSink>) -> RenderPipeline {
    let renderer = ConversationRenderer::new(
        Arc::new(ToolVocabulary::default()),
        RenderOptions {
            web: None,
            tool_description: String::new(),
        },
    );
    RenderPipeline::new(
        Arc::new(renderer),
        Arc::new(DisabledRenderer),
        sink,
        "system",
        3,
    )
}

fn bash_episode(id: &str, argument: &str) -> Value {
    let mut arguments = serde_json::Map::new();
    arguments.insert(argument.to_string(), json!("ls"));
    json!({
        "id": id,
        "steps": [
            {"type": "text_observation", "content": "list files", "source": "user"},
            {"type": "api_action", "function": "execute_bash", "arguments": arguments},
            {"type": "text_observation", "content": "file.txt"}
        ]
    })
}

#[tokio::test]
async fn mismatch_fails_exactly_one_episode() {
    let input = format!(
        "{}\n{}\n{}\n",
        bash_episode("a", "command"),
        bash_episode("b", "cmd"),
        bash_episode("c", "command")
    );
    let (summary, output) = pipeline(Arc::new(ErrorSink::new()))
        .run(input.as_bytes(), Vec::new())
        .await
        .unwrap();

    assert_eq!(
        summary,
        RunSummary {
            rendered: 2,
            skipped: 0,
            failed: 1,
            resolver_misses: 0,
            page_build_failures: 0
        }
    );
    let mut ids: Vec<String> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn malformed_lines_and_unknown_tags_are_counted() {
    let unknown = json!({"id": "u", "steps": [{"type": "mystery_action"}]});
    let input = format!("{{broken\n\n{unknown}\n");
    let (summary, output) = pipeline(Arc::new(ErrorSink::new()))
        .run(input.as_bytes(), Vec::new())
        .await
        .unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.rendered, 0);
    assert!(output.is_empty());
}

#[tokio::test]
async fn resolver_misses_are_reported() {
    let episode = json!({
        "id": "web",
        "steps": [
            {"type": "text_observation", "content": "open", "source": "user"},
            {"type": "web_observation", "html": "<html></html>", "url": "https://a.example"},
            {"type": "api_action", "function": "click", "arguments": {"xpath": "/html/body/a"}}
        ]
    });
    let sink = Arc::new(ErrorSink::new());
    let (summary, output) = pipeline(Arc::clone(&sink))
        .run(format!("{episode}\n").as_bytes(), Vec::new())
        .await
        .unwrap();

    assert_eq!(summary.rendered, 1);
    assert_eq!(summary.resolver_misses, 1);
    assert_eq!(summary.page_build_failures, 1);
    let record: Value = serde_json::from_slice(&output).unwrap();
    let call = record["conversations"][2]["value"].as_str().unwrap();
    assert!(call.contains("click(bid=None)"));
}

#[tokio::test]
async fn recorded_trees_never_reach_the_page_renderer() {
    let page = |n: u32| {
        json!({
            "type": "web_observation",
            "html": format!("<html><body>page {n}</body></html>"),
            "axtree": format!("[1] button 'Next {n}'"),
            "url": format!("https://a.example/{n}")
        })
    };
    let click = json!({"type": "api_action", "function": "click", "arguments": {"bid": "1"}});
    let episode = json!({
        "id": "trees",
        "steps": [
            {"type": "text_observation", "content": "page through", "source": "user"},
            page(1), click.clone(), page(2), click.clone(), page(3), click
        ]
    });
    let sink = Arc::new(ErrorSink::new());
    let (summary, _) = pipeline(Arc::clone(&sink))
        .run(format!("{episode}\n").as_bytes(), Vec::new())
        .await
        .unwrap();

    assert_eq!(summary.rendered, 1);
    assert_eq!(summary.resolver_misses, 0);
    assert_eq!(summary.page_build_failures, 0);
    assert!(sink.is_empty());
}
