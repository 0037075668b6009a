//! One-shot delivery of a camera event from the background waiter.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::traits::{CameraError, CameraEvent, Result};

/// Receiving end of a single event wait.
///
/// Resolves exactly once. Await it from async code or call
/// [`EventReceiver::blocking_recv`] from a plain thread.
#[derive(Debug)]
pub struct EventReceiver {
    rx: oneshot::Receiver<Result<CameraEvent>>,
}

impl EventReceiver {
    pub(crate) fn channel() -> (oneshot::Sender<Result<CameraEvent>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Block the current thread until the event arrives.
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_recv(self) -> Result<CameraEvent> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(CameraError::EventWaitAbandoned))
    }

    /// Take the event if it has already arrived.
    pub fn try_recv(&mut self) -> Option<Result<CameraEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(CameraError::EventWaitAbandoned)),
        }
    }
}

impl Future for EventReceiver {
    type Output = Result<CameraEvent>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CameraError::EventWaitAbandoned)))
    }
}
