//! Invocation glue: build, send, parse or decode, report
//!
//! [`Invoker`] ties a [`ModelTarget`] and a transport together. Blocking
//! methods are available when the transport implements [`Transport`], async
//! ones when it implements [`AsyncTransport`]. Both paths build identical
//! requests and decode identically.

use std::sync::Arc;

use axon_config::{GuardrailsConfig, ModelConfig};
use futures_util::{Stream, StreamExt};
use serde_json::{Map, Value};

use crate::{
    convert::{
        build_request_body, enforce_stop_tokens, insert_stop_sequences, parse_response, thinking_first_in_history,
    },
    error::LlmError,
    guardrail::GuardrailSignal,
    provider::Provider,
    stream::{ChunkStream, DecodeOptions, StreamDecoder},
    target::ModelTarget,
    transport::{AsyncTransport, GuardrailTarget, InvokeOutput, InvokeRequest, Transport},
    types::{CanonicalRequest, CanonicalResponse, GenerationInput, Message, ModelParams, StreamChunk, ToolSpec},
};

/// Hook notified of failures and guardrail interventions
pub trait InvocationObserver: Send + Sync {
    /// Called before an error is returned to the caller
    fn on_error(&self, _error: &LlmError) {}

    /// Called when a traced guardrail intervened
    fn on_guardrail(&self, _signal: &GuardrailSignal) {}
}

/// Inputs of one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationCall {
    pub input: GenerationInput,
    pub system: Option<String>,
    pub tools: Option<Vec<ToolSpec>>,
    /// Stop sequences; sent to the provider when streaming, enforced on the
    /// returned text otherwise
    pub stop: Vec<String>,
    /// Per-call fields layered over the model defaults
    pub kwargs: Map<String, Value>,
}

impl GenerationCall {
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self::new(GenerationInput::Prompt(prompt.into()))
    }

    pub fn messages(messages: Vec<Message>) -> Self {
        Self::new(GenerationInput::Messages(messages))
    }

    fn new(input: GenerationInput) -> Self {
        Self {
            input,
            system: None,
            tools: None,
            stop: Vec::new(),
            kwargs: Map::new(),
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    #[must_use]
    pub fn with_kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }
}

/// Request ready to hand to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedInvocation {
    pub request: InvokeRequest,
    /// Decoded request body, for logging and rendering
    pub body: Value,
    /// How a stream for this request is decoded
    pub decode: DecodeOptions,
}

#[derive(Clone)]
struct Reporter {
    observer: Option<Arc<dyn InvocationObserver>>,
    guardrail_trace: bool,
}

impl Reporter {
    fn error(&self, error: &LlmError) {
        tracing::error!(error = %error, "bedrock invocation failed");
        if let Some(observer) = &self.observer {
            observer.on_error(error);
        }
    }

    fn guardrail(&self, body: &Map<String, Value>) {
        if !self.guardrail_trace {
            return;
        }
        let signal = GuardrailSignal::inspect(body);
        if signal.intervened {
            tracing::warn!(reason = ?signal.reason, "guardrail intervened");
            if let Some(observer) = &self.observer {
                observer.on_guardrail(&signal);
            }
        }
    }

    fn chunk(&self, item: &Result<StreamChunk, LlmError>) {
        match item {
            Ok(StreamChunk::Metadata(metadata)) => self.guardrail(metadata),
            Ok(_) => {}
            Err(error) => self.error(error),
        }
    }
}

/// Sends canonical generation calls to one model
pub struct Invoker<T> {
    transport: T,
    target: ModelTarget,
    provider: Provider,
    defaults: ModelParams,
    guardrails: GuardrailsConfig,
    observer: Option<Arc<dyn InvocationObserver>>,
}

impl<T> Invoker<T> {
    /// Create an invoker, resolving the provider once
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the provider cannot be resolved
    pub fn new(transport: T, target: ModelTarget) -> Result<Self, LlmError> {
        let provider = target.provider()?;
        Ok(Self {
            transport,
            target,
            provider,
            defaults: ModelParams::default(),
            guardrails: GuardrailsConfig::default(),
            observer: None,
        })
    }

    /// Create an invoker from the model and guardrail configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the provider cannot be resolved
    pub fn from_config(transport: T, model: &ModelConfig, guardrails: &GuardrailsConfig) -> Result<Self, LlmError> {
        Ok(Self::new(transport, ModelTarget::from(model))?
            .with_params(ModelParams::new(
                model.temperature,
                model.max_tokens,
                model.kwargs.clone(),
            ))
            .with_guardrails(guardrails.clone()))
    }

    #[must_use]
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.defaults = params;
        self
    }

    #[must_use]
    pub fn with_guardrails(mut self, guardrails: GuardrailsConfig) -> Self {
        self.guardrails = guardrails;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn InvocationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub const fn provider(&self) -> Provider {
        self.provider
    }

    pub const fn target(&self) -> &ModelTarget {
        &self.target
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the transport request for a call without sending it
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the call cannot be expressed for
    /// this provider
    pub fn prepare(&self, call: &GenerationCall, streaming: bool) -> Result<PreparedInvocation, LlmError> {
        let params = self.defaults.merged(&call.kwargs);
        let claude = self.target.is_claude();

        let input = match &call.input {
            GenerationInput::Messages(messages) if claude && params.thinking_enabled() => {
                GenerationInput::Messages(thinking_first_in_history(messages))
            }
            input => input.clone(),
        };
        let messages_api = self.provider.profile().messages_protocol && matches!(input, GenerationInput::Messages(_));

        let tools_in_play = call.tools.as_ref().is_some_and(|tools| !tools.is_empty()) || params.tools_requested();
        let coerce_to_text = !(claude && (tools_in_play || params.thinking_enabled()));

        let mut request = CanonicalRequest {
            provider: self.provider,
            params,
            input,
            system: call.system.clone(),
            tools: call.tools.clone(),
        };

        let decode = if messages_api {
            DecodeOptions::messages(coerce_to_text)
        } else {
            DecodeOptions::completion()
        };

        if streaming {
            decode.check(self.provider)?;
            insert_stop_sequences(&mut request, &call.stop)?;
            if self.provider == Provider::Cohere {
                request.params.extra.insert("stream".to_owned(), Value::Bool(true));
            }
        }

        let body = build_request_body(&request)?;
        let bytes = serde_json::to_vec(&body).map_err(LlmError::Encode)?;

        tracing::debug!(
            provider = %self.provider,
            model = %self.target.model_id,
            streaming,
            body = %body,
            "prepared bedrock request"
        );

        let mut invoke = InvokeRequest::json(self.target.model_id.clone(), bytes);
        invoke.guardrail = self.guardrail_target();

        Ok(PreparedInvocation {
            request: invoke,
            body,
            decode,
        })
    }

    fn guardrail_target(&self) -> Option<GuardrailTarget> {
        self.guardrails
            .target()
            .map(|(identifier, version)| GuardrailTarget {
                identifier: identifier.to_owned(),
                version: version.to_owned(),
                trace: self.guardrails.trace,
            })
    }

    fn reporter(&self) -> Reporter {
        Reporter {
            observer: self.observer.clone(),
            guardrail_trace: self.guardrails.trace_enabled(),
        }
    }

    /// Parse a complete response, enforce stop sequences and check guardrails
    fn complete(&self, output: &InvokeOutput, stop: &[String]) -> Result<CanonicalResponse, LlmError> {
        let mut response = parse_response(self.provider, &output.body, &output.headers)?;
        if !stop.is_empty() {
            response.text = enforce_stop_tokens(&response.text, stop)?;
        }
        if let Value::Object(body) = &response.raw_body {
            self.reporter().guardrail(body);
        }
        Ok(response)
    }

    fn reported<R>(&self, result: Result<R, LlmError>) -> Result<R, LlmError> {
        if let Err(error) = &result {
            self.reporter().error(error);
        }
        result
    }
}

impl<T> Invoker<T>
where
    T: Transport,
{
    /// Send one call and wait for the complete response
    ///
    /// # Errors
    ///
    /// Configuration errors are returned before any I/O. Transport and
    /// decode failures are reported to the observer, then returned.
    pub fn invoke(&self, call: &GenerationCall) -> Result<CanonicalResponse, LlmError> {
        let prepared = self.prepare(call, false)?;
        tracing::info!(provider = %self.provider, model = %self.target.model_id, "invoking bedrock model");

        let result = self
            .transport
            .invoke_model(&prepared.request)
            .map_err(LlmError::from)
            .and_then(|output| self.complete(&output, &call.stop));
        self.reported(result)
    }

    /// Open a response stream and decode it lazily
    ///
    /// # Errors
    ///
    /// Configuration errors are returned before the stream is opened.
    /// Failing to open the stream is reported to the observer, then returned.
    pub fn stream(
        &self,
        call: &GenerationCall,
    ) -> Result<impl Iterator<Item = Result<StreamChunk, LlmError>> + Send + use<T>, LlmError> {
        let prepared = self.prepare(call, true)?;
        tracing::info!(provider = %self.provider, model = %self.target.model_id, "streaming bedrock model");

        let events = self.reported(
            self.transport
                .invoke_model_stream(&prepared.request)
                .map_err(LlmError::from),
        )?;
        let decoder = StreamDecoder::new(self.provider, prepared.decode, events)?;

        let reporter = self.reporter();
        Ok(decoder.inspect(move |item| reporter.chunk(item)))
    }
}

impl<T> Invoker<T>
where
    T: AsyncTransport,
{
    /// Async counterpart of [`Invoker::invoke`]
    ///
    /// # Errors
    ///
    /// Same as [`Invoker::invoke`]
    pub async fn invoke_async(&self, call: &GenerationCall) -> Result<CanonicalResponse, LlmError> {
        let prepared = self.prepare(call, false)?;
        tracing::info!(provider = %self.provider, model = %self.target.model_id, "invoking bedrock model");

        let result = match self.transport.invoke_model(&prepared.request).await {
            Ok(output) => self.complete(&output, &call.stop),
            Err(e) => Err(LlmError::from(e)),
        };
        self.reported(result)
    }

    /// Async counterpart of [`Invoker::stream`]
    ///
    /// # Errors
    ///
    /// Same as [`Invoker::stream`]
    pub async fn stream_async(
        &self,
        call: &GenerationCall,
    ) -> Result<impl Stream<Item = Result<StreamChunk, LlmError>> + Send, LlmError> {
        let prepared = self.prepare(call, true)?;
        tracing::info!(provider = %self.provider, model = %self.target.model_id, "streaming bedrock model");

        let events = self.reported(
            self.transport
                .invoke_model_stream(&prepared.request)
                .await
                .map_err(LlmError::from),
        )?;
        let decoder = ChunkStream::new(self.provider, prepared.decode, events)?;

        let reporter = self.reporter();
        Ok(decoder.inspect(move |item| reporter.chunk(item)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::{HeaderMap, HeaderValue};
    use serde_json::json;

    use super::*;
    use crate::transport::{BlockingEvents, EventEnvelope, TransportError};

    #[derive(Default)]
    struct Canned {
        body: Value,
        headers: HeaderMap,
        events: Vec<Value>,
        fail: bool,
        sent: Mutex<Vec<InvokeRequest>>,
    }

    impl Transport for Canned {
        fn invoke_model(&self, request: &InvokeRequest) -> Result<InvokeOutput, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(TransportError::Request("throttled".to_owned()));
            }
            Ok(InvokeOutput {
                body: serde_json::to_vec(&self.body).unwrap(),
                headers: self.headers.clone(),
            })
        }

        fn invoke_model_stream(&self, request: &InvokeRequest) -> Result<BlockingEvents, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(TransportError::Request("throttled".to_owned()));
            }
            let events: Vec<_> = self
                .events
                .iter()
                .map(|event| Ok(EventEnvelope::chunk(serde_json::to_vec(event).unwrap())))
                .collect();
            Ok(Box::new(events.into_iter()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        errors: Mutex<Vec<String>>,
        guardrails: Mutex<Vec<GuardrailSignal>>,
    }

    impl InvocationObserver for Recorder {
        fn on_error(&self, error: &LlmError) {
            self.errors.lock().unwrap().push(error.to_string());
        }

        fn on_guardrail(&self, signal: &GuardrailSignal) {
            self.guardrails.lock().unwrap().push(signal.clone());
        }
    }

    fn traced_guardrails() -> GuardrailsConfig {
        GuardrailsConfig {
            identifier: Some("gr-1".to_owned()),
            version: Some("1".to_owned()),
            trace: true,
        }
    }

    fn sent_body(transport: &Canned) -> Value {
        serde_json::from_slice(&transport.sent.lock().unwrap()[0].body).unwrap()
    }

    #[test]
    fn invoke_enforces_stop_tokens() {
        let transport = Canned {
            body: json!({"generation": "Paris.\nQuestion: next"}),
            ..Canned::default()
        };
        let invoker = Invoker::new(transport, ModelTarget::new("meta.llama3-8b-instruct-v1:0")).unwrap();
        let call = GenerationCall::prompt("Capital of France?").with_stop(vec!["\nQuestion:".to_owned()]);

        let response = invoker.invoke(&call).unwrap();
        assert_eq!(response.text, "Paris.");
        // not sent for non-streaming calls
        assert!(sent_body(invoker.transport()).get("stop_sequences").is_none());
    }

    #[test]
    fn invoke_reads_header_usage() {
        let mut headers = HeaderMap::new();
        headers.insert("x-amzn-bedrock-input-token-count", HeaderValue::from_static("11"));
        headers.insert("x-amzn-bedrock-output-token-count", HeaderValue::from_static("4"));
        let transport = Canned {
            body: json!({"content": [{"type": "text", "text": "hi"}], "stop_reason": "end_turn"}),
            headers,
            ..Canned::default()
        };
        let invoker = Invoker::new(transport, ModelTarget::new("anthropic.claude-3-haiku-20240307-v1:0")).unwrap();

        let response = invoker.invoke(&GenerationCall::messages(vec![Message::user("hello")])).unwrap();
        assert_eq!(response.usage.total_tokens, 15);
        assert_eq!(sent_body(invoker.transport())["anthropic_version"], "bedrock-2023-05-31");
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stream_decode_error_logged_once() {
        let recorder = Arc::new(Recorder::default());
        let transport = Canned {
            events: vec![json!({"generation": "a", "stop_reason": null}), json!({"unexpected": 1})],
            ..Canned::default()
        };
        let invoker = Invoker::new(transport, ModelTarget::new("meta.llama3-8b-instruct-v1:0"))
            .unwrap()
            .with_observer(recorder.clone());

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .finish();

        let results: Vec<_> = tracing::subscriber::with_default(subscriber, || {
            invoker.stream(&GenerationCall::prompt("hi")).unwrap().collect()
        });

        assert!(matches!(results.last(), Some(Err(LlmError::Decode(_)))));
        assert_eq!(recorder.errors.lock().unwrap().len(), 1);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.lines().filter(|line| line.contains("ERROR")).count(), 1);
    }

    #[test]
    fn upstream_errors_reach_observer() {
        let recorder = Arc::new(Recorder::default());
        let transport = Canned {
            fail: true,
            ..Canned::default()
        };
        let invoker = Invoker::new(transport, ModelTarget::new("amazon.titan-text-express-v1"))
            .unwrap()
            .with_observer(recorder.clone());

        let err = invoker.invoke(&GenerationCall::prompt("hi")).unwrap_err();
        assert!(matches!(err, LlmError::Upstream(_)));
        assert_eq!(recorder.errors.lock().unwrap().len(), 1);

        assert!(invoker.stream(&GenerationCall::prompt("hi")).is_err());
        assert_eq!(recorder.errors.lock().unwrap().len(), 2);
    }

    #[test]
    fn configuration_errors_skip_transport() {
        let invoker = Invoker::new(Canned::default(), ModelTarget::new("meta.llama3-8b-instruct-v1:0")).unwrap();
        let call = GenerationCall::prompt("hi").with_stop(vec!["x".to_owned()]);

        assert!(invoker.stream(&call).err().unwrap().is_configuration());
        assert!(invoker.transport().sent.lock().unwrap().is_empty());
    }

    #[test]
    fn unstreamable_provider_fails_before_io() {
        let invoker = Invoker::new(Canned::default(), ModelTarget::new("ai21.j2-ultra-v1")).unwrap();
        assert!(invoker.stream(&GenerationCall::prompt("hi")).err().unwrap().is_configuration());
        assert!(invoker.transport().sent.lock().unwrap().is_empty());
    }

    #[test]
    fn guardrail_intervention_reported_when_traced() {
        let recorder = Arc::new(Recorder::default());
        let transport = Canned {
            body: json!({
                "results": [{"outputText": "blocked"}],
                "amazon-bedrock-guardrailAction": "INTERVENED",
                "amazon-bedrock-trace": {"guardrail": {}}
            }),
            ..Canned::default()
        };
        let invoker = Invoker::new(transport, ModelTarget::new("amazon.titan-text-express-v1"))
            .unwrap()
            .with_guardrails(traced_guardrails())
            .with_observer(recorder.clone());

        invoker.invoke(&GenerationCall::prompt("hi")).unwrap();
        let signals = recorder.guardrails.lock().unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].trace, Some(json!({"guardrail": {}})));

        let sent = &invoker.transport().sent.lock().unwrap()[0];
        assert_eq!(
            sent.guardrail,
            Some(GuardrailTarget {
                identifier: "gr-1".to_owned(),
                version: "1".to_owned(),
                trace: true,
            })
        );
    }

    #[test]
    fn untraced_guardrail_is_silent() {
        let recorder = Arc::new(Recorder::default());
        let transport = Canned {
            body: json!({"results": [{"outputText": "x"}], "amazon-bedrock-guardrailAction": "INTERVENED"}),
            ..Canned::default()
        };
        let guardrails = GuardrailsConfig {
            trace: false,
            ..traced_guardrails()
        };
        let invoker = Invoker::new(transport, ModelTarget::new("amazon.titan-text-express-v1"))
            .unwrap()
            .with_guardrails(guardrails)
            .with_observer(recorder.clone());

        invoker.invoke(&GenerationCall::prompt("hi")).unwrap();
        assert!(recorder.guardrails.lock().unwrap().is_empty());
    }

    #[test]
    fn stream_injects_stop_sequences() {
        let transport = Canned {
            events: vec![json!({"text": "a", "is_finished": false}), json!({"text": "", "is_finished": true})],
            ..Canned::default()
        };
        let invoker = Invoker::new(transport, ModelTarget::new("cohere.command-text-v14")).unwrap();
        let call = GenerationCall::prompt("hi").with_stop(vec!["END".to_owned()]);

        let texts: Vec<_> = invoker
            .stream(&call)
            .unwrap()
            .filter_map(|chunk| chunk.unwrap().text().map(str::to_owned))
            .collect();
        assert_eq!(texts, vec!["a".to_owned()]);

        let body = sent_body(invoker.transport());
        assert_eq!(body["stop_sequences"], json!(["END"]));
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn claude_tools_disable_text_coercion() {
        let invoker = Invoker::new(Canned::default(), ModelTarget::new("anthropic.claude-3-5-sonnet-20240620-v1:0")).unwrap();
        let tool = ToolSpec {
            name: "calc".to_owned(),
            description: None,
            input_schema: json!({"type": "object"}),
        };

        let plain = invoker
            .prepare(&GenerationCall::messages(vec![Message::user("hi")]), true)
            .unwrap();
        assert_eq!(plain.decode, DecodeOptions::messages(true));

        let with_tools = invoker
            .prepare(&GenerationCall::messages(vec![Message::user("hi")]).with_tools(vec![tool]), true)
            .unwrap();
        assert_eq!(with_tools.decode, DecodeOptions::messages(false));

        let legacy = invoker.prepare(&GenerationCall::prompt("hi"), true).unwrap();
        assert_eq!(legacy.decode, DecodeOptions::completion());
    }

    #[test]
    fn kwargs_layer_over_defaults() {
        let invoker = Invoker::new(Canned::default(), ModelTarget::new("mistral.mistral-7b-instruct-v0:2"))
            .unwrap()
            .with_params(ModelParams::new(
                Some(0.3),
                Some(100),
                json!({"top_p": 0.5}).as_object().cloned().unwrap(),
            ));
        let call = GenerationCall::prompt("hi").with_kwargs(json!({"top_p": 0.9}).as_object().cloned().unwrap());

        let prepared = invoker.prepare(&call, false).unwrap();
        assert_eq!(prepared.body["top_p"], 0.9);
        assert_eq!(prepared.body["max_tokens"], 100);
        assert_eq!(prepared.body["temperature"], 0.3);
        assert_eq!(prepared.request.model_id, "mistral.mistral-7b-instruct-v0:2");
        assert!(prepared.request.guardrail.is_none());
    }
}
