#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::{
    fs,
    io::{self, BufRead, BufReader, Write},
};

use anyhow::Context;
use args::{Args, Command, InputArgs};
use axon_config::Config;
use axon_llm::{
    DecodeOptions, GenerationCall, Invoker, ModelTarget, StreamChunk, StreamDecoder, UsageAggregator,
    transport::{BedrockRuntimeTransport, EventEnvelope, TransportError},
    types::Message,
};
use clap::Parser;
use futures_util::StreamExt;
use serde_json::{Map, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    axon_telemetry::init(&config.telemetry)?;

    tracing::debug!(config_path = %args.config.display(), model = %config.model.id, "configuration loaded");

    match args.command {
        Command::Render { input, stream } => render(&config, &input, stream),
        Command::Invoke { input } => invoke(&config, &input).await,
        Command::Stream { input } => stream(&config, &input).await,
        Command::Decode {
            events,
            messages,
            structured,
        } => {
            let options = if messages {
                DecodeOptions::messages(!structured)
            } else {
                DecodeOptions::completion()
            };
            let file = fs::File::open(&events).with_context(|| format!("failed to open {}", events.display()))?;
            decode(&config, options, BufReader::new(file))
        }
    }
}

fn generation_call(input: &InputArgs) -> anyhow::Result<GenerationCall> {
    let mut call = if let Some(path) = &input.messages {
        let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let messages: Vec<Message> = serde_json::from_str(&raw).context("messages file is not a list of messages")?;
        GenerationCall::messages(messages)
    } else {
        GenerationCall::prompt(input.prompt.clone().unwrap_or_default())
    };

    if let Some(system) = &input.system {
        call = call.with_system(system.clone());
    }
    if let Some(kwargs) = &input.kwargs {
        let kwargs: Map<String, Value> = serde_json::from_str(kwargs).context("--kwargs must be a JSON object")?;
        call = call.with_kwargs(kwargs);
    }

    Ok(call.with_stop(input.stop.clone()))
}

fn render(config: &Config, input: &InputArgs, stream: bool) -> anyhow::Result<()> {
    let invoker = Invoker::from_config((), &config.model, &config.guardrails)?;
    let prepared = invoker.prepare(&generation_call(input)?, stream)?;

    println!("{}", serde_json::to_string_pretty(&prepared.body)?);
    Ok(())
}

async fn invoke(config: &Config, input: &InputArgs) -> anyhow::Result<()> {
    let transport = BedrockRuntimeTransport::from_config(&config.aws).await;
    let invoker = Invoker::from_config(transport, &config.model, &config.guardrails)?;

    let call = generation_call(input)?;
    let response = invoker.invoke_async(&call).await?;

    tracing::info!(
        prompt_tokens = response.usage.prompt_tokens,
        completion_tokens = response.usage.completion_tokens,
        stop_reason = ?response.stop_reason,
        "invocation complete"
    );
    println!("{}", response.text);
    for call in &response.tool_calls {
        println!("{}", serde_json::to_string(call)?);
    }
    Ok(())
}

async fn stream(config: &Config, input: &InputArgs) -> anyhow::Result<()> {
    let transport = BedrockRuntimeTransport::from_config(&config.aws).await;
    let invoker = Invoker::from_config(transport, &config.model, &config.guardrails)?;
    let stop_reason_field = invoker.provider().profile().stop_reason_field;

    let call = generation_call(input)?;
    let mut chunks = std::pin::pin!(invoker.stream_async(&call).await?);
    let mut usage = UsageAggregator::new(stop_reason_field);
    let mut stdout = io::stdout().lock();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        print_chunk(&mut stdout, &chunk)?;
        usage.observe(&chunk);
    }
    writeln!(stdout)?;

    let combined = usage.finish();
    tracing::info!(
        prompt_tokens = combined.usage.prompt_tokens,
        completion_tokens = combined.usage.completion_tokens,
        stop_reason = ?combined.stop_reason,
        "stream complete"
    );
    Ok(())
}

fn decode(config: &Config, options: DecodeOptions, events: impl BufRead) -> anyhow::Result<()> {
    let provider = ModelTarget::from(&config.model).provider()?;

    let mut payloads: Vec<Result<EventEnvelope, TransportError>> = Vec::new();
    for line in events.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            payloads.push(Ok(EventEnvelope::chunk(line.into_bytes())));
        }
    }

    let decoder = StreamDecoder::new(provider, options, payloads.into_iter())?;
    let mut usage = UsageAggregator::new(provider.profile().stop_reason_field);
    let mut stdout = io::stdout().lock();

    for chunk in decoder {
        let chunk = chunk?;
        writeln!(stdout, "{}", serde_json::to_string(&chunk)?)?;
        usage.observe(&chunk);
    }

    let combined = usage.finish();
    tracing::info!(
        total_tokens = combined.usage.total_tokens,
        stop_reason = ?combined.stop_reason,
        "decoded recorded stream"
    );
    Ok(())
}

fn print_chunk(out: &mut impl Write, chunk: &StreamChunk) -> io::Result<()> {
    match chunk {
        StreamChunk::Text(text) => {
            write!(out, "{text}")?;
            out.flush()
        }
        StreamChunk::Content(_) | StreamChunk::ToolCall(_) => {
            let line = serde_json::to_string(chunk).map_err(io::Error::other)?;
            writeln!(out, "\n{line}")
        }
        StreamChunk::Metadata(_) | StreamChunk::Usage(_) => Ok(()),
    }
}
