// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cross-thread request queues
//!
//! Two queues carry work from the emulation thread to the render thread:
//!
//! - the **service queue** marshals work that must run on the render thread
//!   (currently only resize). The sender blocks for the reply.
//! - the **feature queue** carries fire-and-forget requests. It never blocks;
//!   when it is full the request is dropped and counted.
//!
//! Both optionally call a [`Waker`] after queueing so an idle render loop can
//! be woken early.

use crate::core::error::{GuiError, Result};
use crate::core::specification::Specification;
use crossbeam_channel::{bounded, select, Receiver, SendTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Callback that wakes the render loop
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Default time to wait for the render thread to service a request
pub const SERVICE_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Work marshalled onto the render thread
pub enum ServiceRequest {
    /// Reallocate the screen for a new geometry
    Resize {
        spec: &'static Specification,
        top: usize,
        bottom: usize,
        /// Set by whichever side settles the request first: the render
        /// thread taking it, or the requester giving up on it
        claim: Arc<AtomicBool>,
        reply: Sender<Result<()>>,
    },
}

impl ServiceRequest {
    /// Take ownership of the request for the render thread
    ///
    /// Returns `false` if the requester already gave up on it, in which case
    /// it must not be applied.
    fn take(&self) -> bool {
        match self {
            ServiceRequest::Resize { claim, .. } => !claim.swap(true, Ordering::AcqRel),
        }
    }
}

impl std::fmt::Debug for ServiceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceRequest::Resize {
                spec, top, bottom, ..
            } => f
                .debug_struct("Resize")
                .field("spec", &spec.id)
                .field("top", top)
                .field("bottom", bottom)
                .finish(),
        }
    }
}

/// Emulation-thread end of the service queue
#[derive(Clone)]
pub struct ServiceSender {
    tx: Sender<ServiceRequest>,
    waker: Option<Waker>,
}

/// Render-thread end of the service queue
#[derive(Debug)]
pub struct ServiceReceiver {
    rx: Receiver<ServiceRequest>,
}

/// Create a service queue holding at most `capacity` outstanding requests
pub fn service_queue(capacity: usize, waker: Option<Waker>) -> (ServiceSender, ServiceReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (ServiceSender { tx, waker }, ServiceReceiver { rx })
}

impl ServiceSender {
    /// Ask the render thread to resize the screen and wait for the result
    ///
    /// # Arguments
    ///
    /// * `spec` - Television specification
    /// * `top` - First visible scanline
    /// * `bottom` - Scanline after the last visible one
    /// * `shutdown` - Receiver that disconnects when the render side shuts down
    /// * `timeout` - How long to wait for the queue slot and again for the reply
    ///
    /// # Errors
    ///
    /// - [`GuiError::ServiceDisconnected`] if the render side has gone away
    /// - [`GuiError::ServiceTimeout`] if the render thread did not answer
    /// - [`GuiError::ShutDown`] if shutdown started while waiting
    /// - whatever error the render thread reported applying the change
    ///
    /// A request that ends in a timeout or shutdown is withdrawn: it is
    /// never applied later. If the render thread took it first, its reply is
    /// awaited instead.
    pub fn request_resize(
        &self,
        spec: &'static Specification,
        top: usize,
        bottom: usize,
        shutdown: &Receiver<()>,
        timeout: Duration,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        let claim = Arc::new(AtomicBool::new(false));
        let request = ServiceRequest::Resize {
            spec,
            top,
            bottom,
            claim: Arc::clone(&claim),
            reply: reply_tx,
        };
        self.submit("resize", request, timeout)?;

        select! {
            recv(reply_rx) -> res => res.unwrap_or(Err(GuiError::ServiceDisconnected)),
            recv(shutdown) -> _ => withdraw(&claim, &reply_rx, GuiError::ShutDown),
            default(timeout) => withdraw(&claim, &reply_rx, GuiError::ServiceTimeout { op: "resize" }),
        }
    }

    fn submit(&self, op: &'static str, request: ServiceRequest, timeout: Duration) -> Result<()> {
        match self.tx.send_timeout(request, timeout) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => return Err(GuiError::ServiceTimeout { op }),
            Err(SendTimeoutError::Disconnected(_)) => return Err(GuiError::ServiceDisconnected),
        }
        if let Some(waker) = &self.waker {
            waker();
        }
        Ok(())
    }
}

/// Give up on a submitted request unless the render thread already took it
fn withdraw(claim: &AtomicBool, reply_rx: &Receiver<Result<()>>, err: GuiError) -> Result<()> {
    if !claim.swap(true, Ordering::AcqRel) {
        return Err(err);
    }
    // being applied right now; the reply follows without blocking on anything
    reply_rx.recv().unwrap_or(Err(GuiError::ServiceDisconnected))
}

impl ServiceReceiver {
    /// Take the next live request without blocking
    ///
    /// Requests their sender has withdrawn are discarded.
    pub fn try_next(&self) -> Option<ServiceRequest> {
        while let Ok(request) = self.rx.try_recv() {
            if request.take() {
                return Some(request);
            }
            log::debug!("Discarding withdrawn {:?}", request);
        }
        None
    }

    /// Whether a request is waiting
    pub fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    pub(crate) fn receiver(&self) -> &Receiver<ServiceRequest> {
        &self.rx
    }
}

/// Sending end of a feature queue
pub struct FeatureSender<T> {
    tx: Sender<T>,
    overflow: Arc<AtomicU64>,
    waker: Option<Waker>,
}

impl<T> Clone for FeatureSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            overflow: Arc::clone(&self.overflow),
            waker: self.waker.clone(),
        }
    }
}

/// Receiving end of a feature queue
pub struct FeatureReceiver<T> {
    rx: Receiver<T>,
    overflow: Arc<AtomicU64>,
}

/// Create a bounded, non-blocking feature queue
///
/// # Example
///
/// ```
/// use vcsgui::frontend::service::feature_queue;
///
/// let (tx, rx) = feature_queue::<u32>(1, None);
/// assert!(tx.send(1));
/// assert!(!tx.send(2)); // full, dropped
/// assert_eq!(rx.overflow_count(), 1);
/// assert_eq!(rx.drain().collect::<Vec<_>>(), vec![1]);
/// ```
pub fn feature_queue<T>(capacity: usize, waker: Option<Waker>) -> (FeatureSender<T>, FeatureReceiver<T>) {
    let (tx, rx) = bounded(capacity.max(1));
    let overflow = Arc::new(AtomicU64::new(0));
    (
        FeatureSender {
            tx,
            overflow: Arc::clone(&overflow),
            waker,
        },
        FeatureReceiver { rx, overflow },
    )
}

impl<T> FeatureSender<T> {
    /// Queue a request without blocking
    ///
    /// Returns `false` if the request was dropped, either because the queue
    /// was full (counted as overflow) or the receiver is gone.
    pub fn send(&self, request: T) -> bool {
        match self.tx.try_send(request) {
            Ok(()) => {
                if let Some(waker) = &self.waker {
                    waker();
                }
                true
            }
            Err(TrySendError::Full(_)) => {
                let dropped = self.overflow.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!("Feature queue full, dropped request ({} total)", dropped);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("Feature queue receiver gone, request dropped");
                false
            }
        }
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }
}

impl<T> FeatureReceiver<T> {
    /// Take every queued request without blocking
    pub fn drain(&self) -> crossbeam_channel::TryIter<'_, T> {
        self.rx.try_iter()
    }

    pub fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Requests dropped because the queue was full
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    pub(crate) fn receiver(&self) -> &Receiver<T> {
        &self.rx
    }
}
