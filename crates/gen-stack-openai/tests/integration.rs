//! `OpenAI` provider tests against a local mock server.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gen_stack::error::ErrorKind;
use gen_stack::health::HealthRegistry;
use gen_stack::test_helpers::{collect_stream, collect_stream_results};
use gen_stack::tool::{ToolRegistry, tool_fn};
use gen_stack::{
    Credits, GenerationError, GenerationRequest, GenerationService, Message, Provider,
    ProviderEvent, ResponseRequest, StreamEvent, ToolDefinition,
};
use gen_stack_openai::{OpenAiConfig, OpenAiProvider, openai_catalog};

fn provider_for(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new(OpenAiConfig {
        api_key: "sk-test".into(),
        model: "gpt-4o-mini".into(),
        base_url: server.uri(),
        ..Default::default()
    })
}

fn service_for(server: &MockServer) -> (GenerationService, Arc<HealthRegistry>) {
    let health = Arc::new(HealthRegistry::new());
    let service = GenerationService::new(
        Arc::new(provider_for(server)),
        Arc::new(openai_catalog()),
    )
    .with_service_registry(health.clone());
    (service, health)
}

/// Renders events as an SSE body.
fn sse(events: &[Value]) -> String {
    events
        .iter()
        .map(|event| format!("event: {}\ndata: {event}\n\n", event["type"].as_str().unwrap_or("")))
        .collect()
}

fn sse_response(events: &[Value]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse(events), "text/event-stream")
}

fn created(id: &str) -> Value {
    json!({"type": "response.created", "response": {"id": id, "status": "in_progress"}})
}

fn delta(text: &str) -> Value {
    json!({"type": "response.output_text.delta", "item_id": "msg_1", "delta": text})
}

fn completed(id: &str, input_tokens: u64, output_tokens: u64) -> Value {
    json!({
        "type": "response.completed",
        "response": {
            "id": id,
            "status": "completed",
            "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens}
        }
    })
}

fn function_call(call_id: &str, name: &str, arguments: &str) -> Value {
    json!({
        "type": "response.output_item.done",
        "item": {
            "type": "function_call",
            "id": format!("fc_{call_id}"),
            "call_id": call_id,
            "name": name,
            "arguments": arguments,
            "status": "completed"
        }
    })
}

#[tokio::test]
async fn test_provider_streams_text_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": true,
            "input": [{"type": "message", "role": "user", "content": "hi"}]
        })))
        .respond_with(sse_response(&[
            created("resp_1"),
            delta("Hel"),
            delta("lo"),
            completed("resp_1", 8, 2),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let request = ResponseRequest {
        model: "gpt-4o-mini".into(),
        input: vec![gen_stack::ContextItem::Message {
            role: "user".into(),
            content: "hi".into(),
        }],
        ..Default::default()
    };
    let events: Vec<ProviderEvent> = provider
        .stream(&request)
        .await
        .unwrap()
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(events.len(), 4);
    assert!(matches!(&events[0], ProviderEvent::Created { response_id } if response_id == "resp_1"));
    assert!(matches!(&events[1], ProviderEvent::TextDelta(t) if t == "Hel"));
    let ProviderEvent::Completed { usage } = &events[3] else {
        panic!("expected completion, got {:?}", events[3]);
    };
    assert_eq!(usage.input_tokens, 8);
    assert_eq!(usage.output_tokens, 2);
}

#[tokio::test]
async fn test_chained_tool_loop_over_two_turns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(body_partial_json(json!({
            "previous_response_id": "resp_0",
            "input": [{"type": "message", "role": "user", "content": "1 + 2?"}]
        })))
        .respond_with(sse_response(&[
            created("resp_1"),
            function_call("call_1", "add", r#"{"a":1,"b":2}"#),
            completed("resp_1", 20, 5),
        ]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(body_string_contains("function_call_output"))
        .and(body_partial_json(json!({
            "previous_response_id": "resp_1",
            "input": [{"type": "function_call_output", "call_id": "call_1", "output": "3"}]
        })))
        .respond_with(sse_response(&[
            created("resp_2"),
            delta("It is 3."),
            completed("resp_2", 30, 4),
        ]))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    let mut tools = ToolRegistry::new();
    tools.register(tool_fn(
        ToolDefinition::new(
            "add",
            "Adds two integers",
            json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                "required": ["a", "b"]
            }),
        ),
        |input: Value| async move {
            let sum = input["a"].as_i64().unwrap_or(0) + input["b"].as_i64().unwrap_or(0);
            Ok(json!(sum))
        },
    ));
    let (service, _) = service_for(&server);
    let service = service.with_tools(Arc::new(tools));

    let request = GenerationRequest {
        previous_response_id: Some("resp_0".into()),
        ..GenerationRequest::new(vec![
            Message::user("hello"),
            Message::assistant("hi"),
            Message::user("1 + 2?"),
        ])
    };
    let events = collect_stream(service.generate_response_streaming(request)).await;

    // gpt-4o-mini: 15 cents/M input, 60 cents/M output.
    let expected = Credits::new(20 * 15 + 5 * 60 + 30 * 15 + 4 * 60);
    assert_eq!(
        events,
        vec![
            StreamEvent::text("It is 3."),
            StreamEvent::Done { cost: expected }
        ]
    );
}

#[tokio::test]
async fn test_unauthorized_marks_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    let (service, health) = service_for(&server);
    let results = collect_stream_results(
        service.generate_response_streaming(GenerationRequest::new(vec![Message::user("hi")])),
    )
    .await;

    assert_eq!(results.len(), 1);
    let Err(err) = &results[0] else {
        panic!("expected an error");
    };
    assert!(matches!(err, GenerationError::Auth(_)));
    assert_eq!(service.error_kind(err), ErrorKind::Authentication);

    let state = health.health("openai");
    assert_eq!(state.last_error, Some(ErrorKind::Authentication));
    assert!(!state.available);
}

#[tokio::test]
async fn test_quota_exhaustion_is_a_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "message": "You exceeded your current quota",
                "type": "insufficient_quota",
                "code": "insufficient_quota"
            }
        })))
        .mount(&server)
        .await;

    let (service, health) = service_for(&server);
    let results = collect_stream_results(
        service.generate_response_streaming(GenerationRequest::new(vec![Message::user("hi")])),
    )
    .await;

    let [Err(err)] = &results[..] else {
        panic!("expected a single error, got {results:?}");
    };
    assert_eq!(service.error_kind(err), ErrorKind::RateLimit);
    assert!(!health.is_available("openai"));
}

#[tokio::test]
async fn test_context_overflow_event_is_an_invalid_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(sse_response(&[
            created("resp_1"),
            json!({
                "type": "error",
                "code": "context_length_exceeded",
                "message": "Your input exceeds the context window of this model."
            }),
        ]))
        .mount(&server)
        .await;

    let (service, health) = service_for(&server);
    let results = collect_stream_results(
        service.generate_response_streaming(GenerationRequest::new(vec![Message::user("hi")])),
    )
    .await;

    let [Err(err)] = &results[..] else {
        panic!("expected a single error, got {results:?}");
    };
    assert_eq!(service.error_kind(err), ErrorKind::InvalidRequest);
    assert_eq!(
        health.health("openai").last_error,
        Some(ErrorKind::InvalidRequest)
    );
    assert!(health.is_available("openai"));
}

#[tokio::test]
async fn test_codeless_error_event_fails_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(sse_response(&[
            created("resp_1"),
            delta("par"),
            json!({"type": "error", "message": "upstream reset"}),
        ]))
        .mount(&server)
        .await;

    let (service, _) = service_for(&server);
    let results = collect_stream_results(
        service.generate_response_streaming(GenerationRequest::new(vec![Message::user("hi")])),
    )
    .await;

    assert_eq!(results.len(), 2);
    assert!(matches!(&results[0], Ok(StreamEvent::Text { content }) if content == "par"));
    let Err(err) = &results[1] else {
        panic!("expected an error");
    };
    assert_eq!(err.to_string(), "Generation failed: upstream reset");
}

#[tokio::test]
async fn test_moderation_flags_unsafe_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/moderations"))
        .and(body_partial_json(json!({
            "model": "omni-moderation-latest",
            "input": "something nasty"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "modr-1",
            "model": "omni-moderation-latest",
            "results": [{
                "flagged": true,
                "categories": {"violence": true, "harassment": true, "self-harm": false},
                "category_scores": {"violence": 0.91, "harassment": 0.7, "self-harm": 0.01}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _) = service_for(&server);
    let verdict = service.safe_input_check("something nasty").await.unwrap();

    assert!(!verdict.is_safe);
    assert_eq!(verdict.cost, Credits::ZERO);
    assert_eq!(verdict.flagged_categories, vec!["harassment", "violence"]);
}

#[tokio::test]
async fn test_moderation_passes_safe_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/moderations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"flagged": false, "categories": {"violence": false}}]
        })))
        .mount(&server)
        .await;

    let (service, _) = service_for(&server);
    let verdict = service.safe_input_check("good morning").await.unwrap();

    assert!(verdict.is_safe);
    assert!(verdict.flagged_categories.is_empty());
}
