//! Recorded stream transcripts and response bodies, one per model family

use serde_json::{Value, json};

/// A model id together with the events it streams for the prompt "hi"
pub struct Transcript {
    pub model_id: &'static str,
    pub events: Vec<Value>,
    /// Text the events decode to
    pub text: &'static str,
    /// Whether the transcript ends with a usage chunk
    pub reports_usage: bool,
}

fn metrics(input: u64, output: u64) -> Value {
    json!({
        "inputTokenCount": input,
        "outputTokenCount": output,
        "invocationLatency": 310,
        "firstByteLatency": 120
    })
}

pub fn claude_messages() -> Transcript {
    Transcript {
        model_id: "anthropic.claude-3-haiku-20240307-v1:0",
        events: vec![
            json!({"type": "message_start", "message": {"id": "msg_1", "role": "assistant"}}),
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hello"}}),
            json!({"type": "ping"}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": " there"}}),
            json!({"type": "content_block_stop", "index": 0}),
            json!({"type": "message_delta", "delta": {"stop_reason": "end_turn", "stop_sequence": null}}),
            json!({"type": "message_stop", "amazon-bedrock-invocationMetrics": metrics(12, 3)}),
        ],
        text: "Hello there",
        reports_usage: true,
    }
}

pub fn claude_tool_use() -> Vec<Value> {
    vec![
        json!({"type": "message_start", "message": {"id": "msg_2"}}),
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Checking."}}),
        json!({"type": "content_block_stop", "index": 0}),
        json!({
            "type": "content_block_start",
            "index": 1,
            "content_block": {"type": "tool_use", "id": "toolu_01", "name": "get_weather", "input": {}}
        }),
        json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": ""}}),
        json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "{\"city\": "}}),
        json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "\"Paris\"}"}}),
        json!({"type": "content_block_stop", "index": 1}),
        json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"}}),
        json!({"type": "message_stop", "amazon-bedrock-invocationMetrics": metrics(40, 22)}),
    ]
}

pub fn titan() -> Transcript {
    Transcript {
        model_id: "amazon.titan-text-express-v1",
        events: vec![
            json!({"outputText": "Hel", "index": 0, "totalOutputTextTokenCount": 1, "completionReason": null}),
            json!({
                "outputText": "lo",
                "index": 0,
                "totalOutputTextTokenCount": 2,
                "completionReason": "FINISH",
                "amazon-bedrock-invocationMetrics": metrics(5, 2)
            }),
        ],
        text: "Hello",
        reports_usage: false,
    }
}

pub fn cohere() -> Transcript {
    Transcript {
        model_id: "cohere.command-text-v14",
        events: vec![
            json!({"text": "Hel", "is_finished": false}),
            json!({"text": "lo", "is_finished": false}),
            json!({"is_finished": true, "finish_reason": "COMPLETE", "text": ""}),
        ],
        text: "Hello",
        reports_usage: false,
    }
}

pub fn llama() -> Transcript {
    Transcript {
        model_id: "us.meta.llama3-2-3b-instruct-v1:0",
        events: vec![
            json!({"generation": "Hel", "prompt_token_count": 5, "generation_token_count": 1, "stop_reason": null}),
            json!({
                "generation": "lo",
                "prompt_token_count": null,
                "generation_token_count": 2,
                "stop_reason": "stop",
                "amazon-bedrock-invocationMetrics": metrics(5, 2)
            }),
            json!({"generation": "ignored", "stop_reason": null}),
        ],
        text: "Hello",
        reports_usage: true,
    }
}

pub fn mistral() -> Transcript {
    Transcript {
        model_id: "mistral.mistral-7b-instruct-v0:2",
        events: vec![
            json!({"outputs": [{"text": "Hel", "stop_reason": null}]}),
            json!({
                "outputs": [{"text": "lo", "stop_reason": "stop"}],
                "amazon-bedrock-invocationMetrics": metrics(6, 2)
            }),
        ],
        text: "Hello",
        reports_usage: true,
    }
}

pub fn deepseek() -> Transcript {
    Transcript {
        model_id: "us.deepseek.r1-v1:0",
        events: vec![
            json!({"choices": [{"text": "Hel", "stop_reason": null}]}),
            json!({"choices": [{"text": "lo", "stop_reason": "length"}]}),
        ],
        text: "Hello",
        reports_usage: true,
    }
}

pub fn writer() -> Transcript {
    Transcript {
        model_id: "us.writer.palmyra-x5-v1:0",
        events: vec![
            json!({"choices": [{"index": 0, "text": "Hel"}]}),
            json!({"choices": [{"index": 0, "text": "lo"}]}),
            json!("[DONE]"),
        ],
        text: "Hello",
        reports_usage: false,
    }
}

/// Every streamable model family
pub fn all_transcripts() -> Vec<Transcript> {
    vec![claude_messages(), titan(), cohere(), llama(), mistral(), deepseek(), writer()]
}

/// Complete response bodies that decode to "Hello", keyed by model id
pub fn complete_bodies() -> Vec<(&'static str, Value)> {
    vec![
        (
            "anthropic.claude-3-haiku-20240307-v1:0",
            json!({
                "id": "msg_1",
                "type": "message",
                "content": [{"type": "text", "text": "Hello"}],
                "stop_reason": "end_turn"
            }),
        ),
        ("anthropic.claude-v2:1", json!({"completion": "Hello", "stop_reason": "stop_sequence"})),
        (
            "amazon.titan-text-express-v1",
            json!({"inputTextTokenCount": 3, "results": [{"outputText": "Hello", "completionReason": "FINISH"}]}),
        ),
        ("ai21.j2-ultra-v1", json!({"completions": [{"data": {"text": "Hello"}}]})),
        ("cohere.command-text-v14", json!({"generations": [{"text": "Hello"}]})),
        ("meta.llama3-8b-instruct-v1:0", json!({"generation": "Hello", "stop_reason": "stop"})),
        (
            "mistral.mistral-7b-instruct-v0:2",
            json!({"outputs": [{"text": "Hello", "stop_reason": "stop"}]}),
        ),
        ("us.deepseek.r1-v1:0", json!({"choices": [{"text": "Hello", "stop_reason": "stop"}]})),
        ("us.writer.palmyra-x5-v1:0", json!({"choices": [{"text": "Hello"}]})),
    ]
}
