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

//! Emulation/render rendezvous
//!
//! When the emulation thread laps the render thread it parks here until the
//! render thread has moved on. The handshake is two channels: a zero-capacity
//! `wait` channel the emulation thread sends on, and a single-slot `ack`
//! channel the render thread answers on. The render thread only ever polls,
//! so it can never be blocked by the emulation thread.
//!
//! A third channel carries no messages. Dropping its sender wakes an
//! emulation thread parked at either step so shutdown cannot hang.

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How a wait at the rendezvous ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The render thread acknowledged; plotting may continue
    Released,
    /// The render side is gone
    ShutDown,
}

/// Emulation-thread end of the rendezvous
#[derive(Debug, Clone)]
pub struct ProducerGate {
    wait_tx: Sender<()>,
    ack_rx: Receiver<()>,
    shutdown_rx: Receiver<()>,
    parked: Arc<AtomicUsize>,
}

/// Render-thread end of the rendezvous
#[derive(Debug)]
pub struct ConsumerGate {
    wait_rx: Receiver<()>,
    ack_tx: Sender<()>,
    shutdown_tx: Option<Sender<()>>,
    /// Emulation threads currently offering on `wait`
    parked: Arc<AtomicUsize>,
}

/// Create a connected pair of gates
///
/// # Example
///
/// ```
/// use std::thread;
/// use vcsgui::frontend::rendezvous::{rendezvous, GateOutcome};
///
/// let (producer, consumer) = rendezvous();
/// let emu = thread::spawn(move || producer.wait_for_consumer());
///
/// while !consumer.release_pending() {
///     thread::yield_now();
/// }
/// assert_eq!(emu.join().unwrap(), GateOutcome::Released);
/// ```
pub fn rendezvous() -> (ProducerGate, ConsumerGate) {
    let (wait_tx, wait_rx) = bounded(0);
    let (ack_tx, ack_rx) = bounded(1);
    let (shutdown_tx, shutdown_rx) = bounded(0);
    let parked = Arc::new(AtomicUsize::new(0));
    (
        ProducerGate {
            wait_tx,
            ack_rx,
            shutdown_rx,
            parked: Arc::clone(&parked),
        },
        ConsumerGate {
            wait_rx,
            ack_tx,
            shutdown_tx: Some(shutdown_tx),
            parked,
        },
    )
}

impl ProducerGate {
    /// Block until the render thread acknowledges, or shutdown
    ///
    /// Must be called without holding the screen lock.
    pub fn wait_for_consumer(&self) -> GateOutcome {
        // a stale ack left by a wait that ended in shutdown must not release us early
        while self.ack_rx.try_recv().is_ok() {}

        self.parked.fetch_add(1, Ordering::AcqRel);
        let offered = select! {
            send(self.wait_tx, ()) -> res => res.is_ok(),
            recv(self.shutdown_rx) -> _ => false,
        };
        self.parked.fetch_sub(1, Ordering::AcqRel);
        if !offered {
            return GateOutcome::ShutDown;
        }

        select! {
            recv(self.ack_rx) -> res => match res {
                Ok(()) => GateOutcome::Released,
                Err(_) => GateOutcome::ShutDown,
            },
            recv(self.shutdown_rx) -> _ => GateOutcome::ShutDown,
        }
    }

    /// Receiver that becomes disconnected on shutdown
    ///
    /// Other blocking waits on the emulation thread select on it as well.
    pub fn shutdown_signal(&self) -> &Receiver<()> {
        &self.shutdown_rx
    }

    /// Whether the render side has shut down
    pub fn is_shut_down(&self) -> bool {
        matches!(
            self.shutdown_rx.try_recv(),
            Err(TryRecvError::Disconnected)
        )
    }
}

impl ConsumerGate {
    /// Accept a waiting emulation thread and acknowledge it, without blocking
    ///
    /// Returns `true` if an emulation thread was released.
    pub fn release_pending(&self) -> bool {
        match self.wait_rx.try_recv() {
            Ok(()) => {
                if self.ack_tx.try_send(()).is_err() {
                    log::warn!("Rendezvous acknowledgement slot already full");
                }
                log::trace!("Released emulation thread from rendezvous");
                true
            }
            Err(_) => false,
        }
    }

    /// Wake any parked emulation thread and refuse further waits
    pub fn shutdown(&mut self) {
        if self.shutdown_tx.take().is_some() {
            log::debug!("Rendezvous shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_tx.is_none()
    }

    /// Whether an emulation thread is parked waiting to be released
    pub fn has_waiter(&self) -> bool {
        self.parked.load(Ordering::Acquire) > 0
    }

    pub(crate) fn wait_receiver(&self) -> &Receiver<()> {
        &self.wait_rx
    }
}

impl Drop for ConsumerGate {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_release_without_waiter_is_noop() {
        let (_producer, consumer) = rendezvous();
        assert!(!consumer.has_waiter());
        assert!(!consumer.release_pending());
    }

    #[test]
    fn test_parked_waiter_is_visible_before_release() {
        let (producer, consumer) = rendezvous();
        let emu = thread::spawn(move || producer.wait_for_consumer());

        let mut seen = false;
        for _ in 0..1000 {
            if consumer.has_waiter() {
                seen = true;
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(seen);

        while !consumer.release_pending() {
            thread::yield_now();
        }
        assert_eq!(emu.join().unwrap(), GateOutcome::Released);
        assert!(!consumer.has_waiter());
    }

    #[test]
    fn test_waiter_released() {
        let (producer, consumer) = rendezvous();
        let emu = thread::spawn(move || producer.wait_for_consumer());

        let mut released = false;
        for _ in 0..1000 {
            if consumer.release_pending() {
                released = true;
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(released);
        assert_eq!(emu.join().unwrap(), GateOutcome::Released);
    }

    #[test]
    fn test_waiter_stays_blocked_until_released() {
        let (producer, consumer) = rendezvous();
        let emu = thread::spawn(move || producer.wait_for_consumer());

        thread::sleep(Duration::from_millis(30));
        assert!(!emu.is_finished());

        while !consumer.release_pending() {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(emu.join().unwrap(), GateOutcome::Released);
    }

    #[test]
    fn test_shutdown_wakes_waiter() {
        let (producer, mut consumer) = rendezvous();
        let emu = thread::spawn(move || producer.wait_for_consumer());

        thread::sleep(Duration::from_millis(20));
        consumer.shutdown();
        assert!(consumer.is_shut_down());
        assert_eq!(emu.join().unwrap(), GateOutcome::ShutDown);
    }

    #[test]
    fn test_dropped_consumer_does_not_block() {
        let (producer, consumer) = rendezvous();
        drop(consumer);
        assert!(producer.is_shut_down());
        assert_eq!(producer.wait_for_consumer(), GateOutcome::ShutDown);
    }
}
