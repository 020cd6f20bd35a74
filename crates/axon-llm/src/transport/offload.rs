use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;

use super::{AsyncTransport, BlockingEvents, EventStream, InvokeOutput, InvokeRequest, Transport, TransportError};

/// Runs a blocking [`Transport`] on tokio's blocking pool
///
/// Opening the stream and every later pull happen on the blocking pool, one
/// at a time, so events keep their arrival order.
#[derive(Debug)]
pub struct Offload<T> {
    inner: Arc<T>,
}

impl<T> Offload<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(transport),
        }
    }

    /// The wrapped blocking transport
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> Clone for Offload<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn join_error(error: &tokio::task::JoinError) -> TransportError {
    TransportError::Join(error.to_string())
}

#[async_trait]
impl<T> AsyncTransport for Offload<T>
where
    T: Transport + 'static,
{
    async fn invoke_model(&self, request: &InvokeRequest) -> Result<InvokeOutput, TransportError> {
        let transport = Arc::clone(&self.inner);
        let request = request.clone();
        tokio::task::spawn_blocking(move || transport.invoke_model(&request))
            .await
            .map_err(|e| join_error(&e))?
    }

    async fn invoke_model_stream(&self, request: &InvokeRequest) -> Result<EventStream, TransportError> {
        let transport = Arc::clone(&self.inner);
        let request = request.clone();
        let events = tokio::task::spawn_blocking(move || transport.invoke_model_stream(&request))
            .await
            .map_err(|e| join_error(&e))??;
        Ok(pull_on_blocking_pool(events))
    }
}

/// Turn a blocking event iterator into a stream, pulling on the blocking pool
fn pull_on_blocking_pool(events: BlockingEvents) -> EventStream {
    futures_util::stream::unfold(Some(events), |state| async move {
        let mut events = state?;
        match tokio::task::spawn_blocking(move || {
            let next = events.next();
            (next, events)
        })
        .await
        {
            Ok((Some(item), events)) => Some((item, Some(events))),
            Ok((None, _)) => None,
            Err(e) => Some((Err(join_error(&e)), None)),
        }
    })
    .boxed()
}
