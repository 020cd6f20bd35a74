//! Bedrock runtime transport over `InvokeModel` and `InvokeModelWithResponseStream`

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_sdk_bedrockruntime::{
    Client as BedrockClient,
    primitives::Blob,
    types::{ResponseStream, Trace},
};
use aws_smithy_runtime_api::{
    box_error::BoxError,
    client::{
        interceptors::{Intercept, context::BeforeDeserializationInterceptorContextRef},
        runtime_components::RuntimeComponents,
    },
};
use aws_smithy_types::{config_bag::ConfigBag, error::display::DisplayErrorContext};
use axon_config::AwsConfig;
use http::{HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;

use super::{AsyncTransport, EventEnvelope, EventStream, InvokeOutput, InvokeRequest, TransportError};

/// Async transport backed by the AWS SDK Bedrock runtime client
#[derive(Debug, Clone)]
pub struct BedrockRuntimeTransport {
    client: BedrockClient,
}

impl BedrockRuntimeTransport {
    pub const fn new(client: BedrockClient) -> Self {
        Self { client }
    }

    /// Build a client from configuration, falling back to the default
    /// region and credential chains for anything not set
    pub async fn from_config(config: &AwsConfig) -> Self {
        Self::new(build_bedrock_client(config).await)
    }
}

/// Build a Bedrock runtime client from configuration
async fn build_bedrock_client(config: &AwsConfig) -> BedrockClient {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

    if let Some(region) = &config.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }

    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }

    if let Some(endpoint) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint.as_str());
    }

    // Explicit credentials, otherwise the default chain
    if let (Some(access_key), Some(secret_key)) = (&config.access_key_id, &config.secret_access_key) {
        let credentials = aws_credential_types::Credentials::new(
            access_key.expose_secret(),
            secret_key.expose_secret(),
            config.session_token.as_ref().map(|token| token.expose_secret().to_owned()),
            None,
            "axon-config",
        );
        loader = loader.credentials_provider(credentials);
    }

    let sdk_config = loader.load().await;
    BedrockClient::new(&sdk_config)
}

/// Copies the raw HTTP response headers, which the SDK output type drops
#[derive(Debug, Default, Clone)]
struct HeaderCapture {
    headers: Arc<Mutex<HeaderMap>>,
}

impl HeaderCapture {
    fn take(&self) -> HeaderMap {
        self.headers
            .lock()
            .map(|mut headers| std::mem::take(&mut *headers))
            .unwrap_or_default()
    }
}

impl Intercept for HeaderCapture {
    fn name(&self) -> &'static str {
        "HeaderCapture"
    }

    fn read_before_deserialization(
        &self,
        context: &BeforeDeserializationInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let mut captured = HeaderMap::new();
        for (name, value) in context.response().headers().iter() {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::from_str(value)) {
                captured.append(name, value);
            }
        }

        if let Ok(mut headers) = self.headers.lock() {
            *headers = captured;
        }
        Ok(())
    }
}

#[async_trait]
impl AsyncTransport for BedrockRuntimeTransport {
    async fn invoke_model(&self, request: &InvokeRequest) -> Result<InvokeOutput, TransportError> {
        let mut call = self
            .client
            .invoke_model()
            .model_id(&request.model_id)
            .body(Blob::new(request.body.clone()))
            .content_type(&request.content_type)
            .accept(&request.accept);

        if let Some(guardrail) = &request.guardrail {
            call = call
                .guardrail_identifier(&guardrail.identifier)
                .guardrail_version(&guardrail.version);
            if guardrail.trace {
                call = call.trace(Trace::Enabled);
            }
        }

        let capture = HeaderCapture::default();
        let output = call
            .customize()
            .interceptor(capture.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(model = %request.model_id, error = %DisplayErrorContext(&e), "invoke_model failed");
                TransportError::Request(DisplayErrorContext(&e).to_string())
            })?;

        Ok(InvokeOutput {
            body: output.body.into_inner(),
            headers: capture.take(),
        })
    }

    async fn invoke_model_stream(&self, request: &InvokeRequest) -> Result<EventStream, TransportError> {
        let mut call = self
            .client
            .invoke_model_with_response_stream()
            .model_id(&request.model_id)
            .body(Blob::new(request.body.clone()))
            .content_type(&request.content_type)
            .accept(&request.accept);

        if let Some(guardrail) = &request.guardrail {
            call = call
                .guardrail_identifier(&guardrail.identifier)
                .guardrail_version(&guardrail.version);
            if guardrail.trace {
                call = call.trace(Trace::Enabled);
            }
        }

        let output = call.send().await.map_err(|e| {
            tracing::error!(
                model = %request.model_id,
                error = %DisplayErrorContext(&e),
                "invoke_model_with_response_stream failed"
            );
            TransportError::Request(DisplayErrorContext(&e).to_string())
        })?;

        // Convert the EventReceiver into a futures::Stream using unfold
        let stream = futures_util::stream::unfold(Some(output.body), |receiver| async move {
            let mut receiver = receiver?;
            match receiver.recv().await {
                Ok(Some(ResponseStream::Chunk(part))) => {
                    let event = part
                        .bytes
                        .map_or_else(EventEnvelope::empty, |bytes| EventEnvelope::chunk(bytes.into_inner()));
                    Some((Ok(event), Some(receiver)))
                }
                // Unknown event kinds carry no payload
                Ok(Some(_)) => Some((Ok(EventEnvelope::empty()), Some(receiver))),
                Ok(None) => None,
                Err(e) => Some((Err(TransportError::Stream(DisplayErrorContext(&e).to_string())), None)),
            }
        });

        Ok(Box::pin(stream))
    }
}
