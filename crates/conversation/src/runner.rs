//! Runs chat requests off the UI thread.
//!
//! One Tokio runtime lives for the whole app so the transport's HTTP client
//! and session can be reused between requests. Each request reports back over
//! an `mpsc` channel that the UI polls once per frame, and can be stopped or
//! time out.

use crate::controller::PendingRequest;
use futures::future::{AbortHandle, Abortable};
use providers::{ChatTransport, TransportError};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

pub struct RequestRunner {
    runtime: tokio::runtime::Runtime,
    transport: Arc<dyn ChatTransport>,
    timeout: Option<Duration>,
}

impl RequestRunner {
    pub fn new(transport: Arc<dyn ChatTransport>, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("chat-request")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            transport,
            timeout,
        })
    }

    /// Start sending `request`; the returned handle yields exactly one result.
    pub fn dispatch(&self, request: PendingRequest) -> RequestHandle {
        let (tx, rx) = mpsc::channel();
        let (abort, abort_reg) = AbortHandle::new_pair();
        let transport = Arc::clone(&self.transport);
        let timeout = self.timeout;

        self.runtime.spawn(async move {
            let call = async {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, transport.send_message(&request.text))
                        .await
                        .unwrap_or(Err(TransportError::TimedOut(limit))),
                    None => transport.send_message(&request.text).await,
                }
            };
            let result = match Abortable::new(call, abort_reg).await {
                Ok(result) => result,
                Err(_aborted) => Err(TransportError::Cancelled),
            };
            let _ = tx.send(result);
        });

        RequestHandle { rx, abort }
    }
}

/// Receiving end of one dispatched request.
pub struct RequestHandle {
    rx: Receiver<Result<String, TransportError>>,
    abort: AbortHandle,
}

impl RequestHandle {
    /// Non-blocking check for the result.
    pub fn poll(&self) -> Option<Result<String, TransportError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TransportError::Other(
                "request worker stopped unexpectedly".to_string(),
            ))),
        }
    }

    /// Block until the result arrives or `limit` passes.
    pub fn wait(&self, limit: Duration) -> Option<Result<String, TransportError>> {
        self.rx.recv_timeout(limit).ok()
    }

    /// Stop the request; it settles as [`TransportError::Cancelled`].
    pub fn cancel(&self) {
        self.abort.abort();
    }
}
