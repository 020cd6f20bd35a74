mod harness;

use axon_llm::{
    GenerationCall, Invoker, LlmError, ModelTarget, Provider,
    transport::Offload,
    types::{ContentBlock, Message, Role},
};
use harness::config::ConfigBuilder;
use harness::fixtures;
use harness::mock_transport::MockBedrock;
use serde_json::json;

fn call_for(provider: Provider, model_id: &str) -> GenerationCall {
    if provider == Provider::Anthropic && model_id.contains("claude-3") {
        GenerationCall::messages(vec![Message::user("hi")])
    } else {
        GenerationCall::prompt("hi")
    }
}

#[test]
fn every_family_parses_text() {
    for (model_id, body) in fixtures::complete_bodies() {
        let invoker = Invoker::new(MockBedrock::responding(body), ModelTarget::new(model_id)).unwrap();
        let call = call_for(invoker.provider(), model_id);

        let response = invoker.invoke(&call).unwrap();
        assert_eq!(response.text, "Hello", "{model_id}");
    }
}

#[test]
fn usage_comes_from_headers() {
    let transport = MockBedrock::responding(json!({"generation": "Hello", "stop_reason": "stop"})).with_token_headers(9, 1);
    let invoker = Invoker::new(transport, ModelTarget::new("meta.llama3-8b-instruct-v1:0")).unwrap();

    let response = invoker.invoke(&GenerationCall::prompt("hi")).unwrap();
    assert_eq!(response.usage.prompt_tokens, 9);
    assert_eq!(response.usage.completion_tokens, 1);
    assert_eq!(response.usage.total_tokens, 10);
    assert_eq!(response.stop_reason.as_deref(), Some("stop"));
}

#[test]
fn claude_response_blocks() {
    let body = json!({
        "content": [
            {"type": "thinking", "thinking": "Look it up.", "signature": "sig"},
            {"type": "text", "text": "Let me check."},
            {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "Paris"}}
        ],
        "stop_reason": "tool_use"
    });
    let invoker = Invoker::new(
        MockBedrock::responding(body),
        ModelTarget::new("anthropic.claude-3-7-sonnet-20250219-v1:0"),
    )
    .unwrap();

    let response = invoker
        .invoke(&GenerationCall::messages(vec![Message::user("Weather?")]))
        .unwrap();
    assert_eq!(response.text, "Let me check.");
    assert_eq!(response.thinking.unwrap().text, "Look it up.");
    assert_eq!(response.tool_calls[0].args, json!({"city": "Paris"}));
    assert_eq!(response.stop_reason.as_deref(), Some("tool_use"));
}

#[test]
fn legacy_claude_prompt_is_alternated() {
    let invoker = Invoker::new(
        MockBedrock::responding(json!({"completion": " Paris", "stop_reason": "stop_sequence"})),
        ModelTarget::new("anthropic.claude-v2:1"),
    )
    .unwrap();

    invoker.invoke(&GenerationCall::prompt("Capital of France?")).unwrap();

    let body = invoker.transport().last_body();
    assert_eq!(body["prompt"], "\n\nHuman: Capital of France?\n\nAssistant:");
    assert_eq!(body["max_tokens_to_sample"], 1024);
}

#[test]
fn titan_request_shape() {
    let config = ConfigBuilder::new("amazon.titan-text-express-v1")
        .with_model_line("temperature = 0.2")
        .with_model_line("max_tokens = 256")
        .build();
    let invoker = Invoker::from_config(
        MockBedrock::responding(json!({"results": [{"outputText": "Hello"}]})),
        &config.model,
        &config.guardrails,
    )
    .unwrap();

    invoker.invoke(&GenerationCall::prompt("hi")).unwrap();

    assert_eq!(
        invoker.transport().last_body(),
        json!({
            "inputText": "hi",
            "textGenerationConfig": {"maxTokenCount": 256, "temperature": 0.2}
        })
    );
}

#[test]
fn configured_kwargs_reach_the_body() {
    let config = ConfigBuilder::new("mistral.mistral-7b-instruct-v0:2")
        .with_model_line("kwargs = { top_p = 0.9, max_tokens = 64 }")
        .build();
    let invoker = Invoker::from_config(
        MockBedrock::responding(json!({"outputs": [{"text": "Hello"}]})),
        &config.model,
        &config.guardrails,
    )
    .unwrap();

    invoker.invoke(&GenerationCall::prompt("hi")).unwrap();

    let body = invoker.transport().last_body();
    assert_eq!(body["top_p"], 0.9);
    assert_eq!(body["max_tokens"], 64);
    assert_eq!(body["prompt"], "hi");
}

#[test]
fn stop_sequences_truncate_complete_text() {
    let invoker = Invoker::new(
        MockBedrock::responding(json!({"generations": [{"text": "Paris.\nUser: and Spain?"}]})),
        ModelTarget::new("cohere.command-text-v14"),
    )
    .unwrap();

    let response = invoker
        .invoke(&GenerationCall::prompt("Capital of France?").with_stop(vec!["\nUser:".to_owned()]))
        .unwrap();
    assert_eq!(response.text, "Paris.");
}

#[test]
fn thinking_moves_first_in_history() {
    let invoker = Invoker::new(
        MockBedrock::responding(json!({"content": [{"type": "text", "text": "ok"}]})),
        ModelTarget::new("anthropic.claude-3-7-sonnet-20250219-v1:0"),
    )
    .unwrap();
    let history = vec![
        Message::user("first"),
        Message::with_blocks(
            Role::Assistant,
            vec![
                ContentBlock::Text {
                    text: "answer".to_owned(),
                },
                ContentBlock::Thinking {
                    thinking: "reasoning".to_owned(),
                    signature: "sig".to_owned(),
                },
            ],
        ),
        Message::user("second"),
    ];
    let call = GenerationCall::messages(history).with_kwargs(
        json!({"thinking": {"type": "enabled", "budget_tokens": 1024}})
            .as_object()
            .cloned()
            .unwrap(),
    );

    invoker.invoke(&call).unwrap();

    let body = invoker.transport().last_body();
    assert_eq!(body["messages"][1]["content"][0]["type"], "thinking");
    assert_eq!(body["messages"][1]["content"][1]["type"], "text");
    assert_eq!(body["thinking"]["budget_tokens"], 1024);
}

#[test]
fn chat_messages_rejected_for_completion_families() {
    let invoker = Invoker::new(
        MockBedrock::responding(json!({})),
        ModelTarget::new("meta.llama3-8b-instruct-v1:0"),
    )
    .unwrap();

    let err = invoker
        .invoke(&GenerationCall::messages(vec![Message::user("hi")]))
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(invoker.transport().request_count(), 0);
}

#[test]
fn unknown_provider_is_rejected_up_front() {
    let result = Invoker::new(MockBedrock::default(), ModelTarget::new("acme.model-v1"));
    assert!(matches!(result, Err(LlmError::UnknownProvider { .. })));
}

#[tokio::test]
async fn async_invoke_matches_blocking() {
    for (model_id, body) in fixtures::complete_bodies() {
        let blocking = Invoker::new(MockBedrock::responding(body.clone()), ModelTarget::new(model_id)).unwrap();
        let offloaded =
            Invoker::new(Offload::new(MockBedrock::responding(body)), ModelTarget::new(model_id)).unwrap();
        let call = call_for(blocking.provider(), model_id);

        let expected = blocking.invoke(&call).unwrap();
        let actual = offloaded.invoke_async(&call).await.unwrap();
        assert_eq!(expected, actual, "{model_id}");
        assert_eq!(
            blocking.transport().last_request(),
            offloaded.transport().inner().last_request(),
            "{model_id}"
        );
    }
}
