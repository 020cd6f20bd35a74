//! Decoding of live event streams into canonical chunks
//!
//! [`StreamDecoder`] is a pull-based iterator over a blocking event source and
//! [`ChunkStream`] is its async counterpart. Both share the per-event
//! decoding and the `Idle -> Streaming -> Terminated` state machine: once a
//! terminal event or an error is seen, no further event is read and nothing
//! more is yielded.

mod event;

use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll, ready},
};

use futures_util::{Stream, StreamExt};

pub use event::WireFormat;
use event::EventDecoder;

use crate::{
    error::LlmError,
    provider::Provider,
    transport::{EventEnvelope, TransportError},
    types::StreamChunk,
};

/// Decoder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No payload seen yet
    Idle,
    /// At least one payload decoded
    Streaming,
    /// Finished; buffered chunks may still be drained
    Terminated,
}

/// How events are decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub format: WireFormat,
    /// Emit plain text chunks instead of tagged content blocks for text
    pub coerce_to_text: bool,
}

impl DecodeOptions {
    pub const fn messages(coerce_to_text: bool) -> Self {
        Self {
            format: WireFormat::Messages,
            coerce_to_text,
        }
    }

    pub const fn completion() -> Self {
        Self {
            format: WireFormat::Completion,
            coerce_to_text: true,
        }
    }

    /// Fail if `provider` cannot be decoded with these options
    pub fn check(self, provider: Provider) -> Result<(), LlmError> {
        EventDecoder::new(provider, self.format, self.coerce_to_text)?;
        Ok(())
    }
}

enum Pull {
    Yield(Result<StreamChunk, LlmError>),
    Done,
    NeedEvent,
}

/// State shared by the blocking and async decoders
#[derive(Debug)]
struct Machine {
    decoder: EventDecoder,
    pending: VecDeque<StreamChunk>,
    state: DecoderState,
}

impl Machine {
    fn new(provider: Provider, options: DecodeOptions) -> Result<Self, LlmError> {
        Ok(Self {
            decoder: EventDecoder::new(provider, options.format, options.coerce_to_text)?,
            pending: VecDeque::new(),
            state: DecoderState::Idle,
        })
    }

    fn pull(&mut self) -> Pull {
        if let Some(chunk) = self.pending.pop_front() {
            return Pull::Yield(Ok(chunk));
        }
        if self.state == DecoderState::Terminated {
            return Pull::Done;
        }
        Pull::NeedEvent
    }

    /// Feed the next transport item; returns an error to yield, if any
    fn feed(&mut self, item: Option<Result<EventEnvelope, TransportError>>) -> Option<LlmError> {
        let envelope = match item {
            None => {
                self.state = DecoderState::Terminated;
                return None;
            }
            Some(Err(e)) => {
                self.state = DecoderState::Terminated;
                return Some(LlmError::Upstream(e));
            }
            Some(Ok(envelope)) => envelope,
        };

        let payload = envelope.payload?;

        self.state = DecoderState::Streaming;
        match self.decoder.decode(&payload) {
            Ok(decoded) => {
                self.pending.extend(decoded.chunks);
                if decoded.terminal {
                    self.state = DecoderState::Terminated;
                }
                None
            }
            Err(e) => {
                self.state = DecoderState::Terminated;
                self.pending.clear();
                Some(e)
            }
        }
    }
}

/// Lazy, single-pass decoder over a blocking event source
///
/// Stopping iteration early abandons the rest of the stream.
#[derive(Debug)]
pub struct StreamDecoder<I> {
    events: I,
    machine: Machine,
}

impl<I> StreamDecoder<I>
where
    I: Iterator<Item = Result<EventEnvelope, TransportError>>,
{
    /// Create a decoder; fails before reading any event if the provider
    /// cannot be decoded in the requested format
    pub fn new(provider: Provider, options: DecodeOptions, events: I) -> Result<Self, LlmError> {
        Ok(Self {
            events,
            machine: Machine::new(provider, options)?,
        })
    }

    /// Create a decoder for a provider id
    pub fn for_provider(provider: &str, options: DecodeOptions, events: I) -> Result<Self, LlmError> {
        Self::new(Provider::resolve(provider)?, options, events)
    }

    pub const fn state(&self) -> DecoderState {
        self.machine.state
    }
}

impl<I> Iterator for StreamDecoder<I>
where
    I: Iterator<Item = Result<EventEnvelope, TransportError>>,
{
    type Item = Result<StreamChunk, LlmError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.machine.pull() {
                Pull::Yield(item) => return Some(item),
                Pull::Done => return None,
                Pull::NeedEvent => {
                    let item = self.events.next();
                    if let Some(error) = self.machine.feed(item) {
                        return Some(Err(error));
                    }
                }
            }
        }
    }
}

impl<I> std::iter::FusedIterator for StreamDecoder<I> where I: Iterator<Item = Result<EventEnvelope, TransportError>> {}

/// Async decoder over an event stream
#[derive(Debug)]
pub struct ChunkStream<S> {
    events: S,
    machine: Machine,
}

impl<S> ChunkStream<S>
where
    S: Stream<Item = Result<EventEnvelope, TransportError>> + Unpin,
{
    /// Create a decoder; fails before polling any event if the provider
    /// cannot be decoded in the requested format
    pub fn new(provider: Provider, options: DecodeOptions, events: S) -> Result<Self, LlmError> {
        Ok(Self {
            events,
            machine: Machine::new(provider, options)?,
        })
    }

    pub const fn state(&self) -> DecoderState {
        self.machine.state
    }
}

impl<S> Stream for ChunkStream<S>
where
    S: Stream<Item = Result<EventEnvelope, TransportError>> + Unpin,
{
    type Item = Result<StreamChunk, LlmError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            match this.machine.pull() {
                Pull::Yield(item) => return Poll::Ready(Some(item)),
                Pull::Done => return Poll::Ready(None),
                Pull::NeedEvent => {
                    let item = ready!(this.events.poll_next_unpin(cx));
                    if let Some(error) = this.machine.feed(item) {
                        return Poll::Ready(Some(Err(error)));
                    }
                }
            }
        }
    }
}
