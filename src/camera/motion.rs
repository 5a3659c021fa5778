//! Background motion polling.
//!
//! A [`MotionMonitor`] turns point-in-time `GetMdState` polls into a stream of
//! [`MotionEvent`]s. Poll failures are delivered as events and never end the
//! loop; only [`MotionMonitor::destroy`] does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::camera::client::{CameraApi, MotionState};
use crate::error::CameraError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum MotionEvent {
    Data(MotionState),
    Error(CameraError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Created,
    Running,
    Stopped,
}

/// Source of the client used for each poll.
pub trait ClientProvider: Send + Sync {
    fn current_client(&self) -> Arc<dyn CameraApi>;
}

impl ClientProvider for Arc<dyn CameraApi> {
    fn current_client(&self) -> Arc<dyn CameraApi> {
        Arc::clone(self)
    }
}

struct Shared {
    provider: Arc<dyn ClientProvider>,
    motion_detected: Arc<AtomicBool>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<MotionEvent>>>,
    state: Mutex<MonitorState>,
    stop: watch::Sender<bool>,
    poll_interval: Duration,
}

impl Shared {
    fn emit(&self, event: MotionEvent) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_state(&self, state: MonitorState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// Handle to a motion polling loop. Clones share the same loop.
#[derive(Clone)]
pub struct MotionMonitor {
    shared: Arc<Shared>,
}

impl MotionMonitor {
    pub fn new(provider: Arc<dyn ClientProvider>, motion_detected: Arc<AtomicBool>) -> Self {
        Self::with_poll_interval(provider, motion_detected, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(
        provider: Arc<dyn ClientProvider>,
        motion_detected: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> Self {
        let (stop, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                provider,
                motion_detected,
                listeners: Mutex::new(Vec::new()),
                state: Mutex::new(MonitorState::Created),
                stop,
                poll_interval,
            }),
        }
    }

    /// Registers a listener. Events emitted before this call are not replayed.
    /// On a destroyed monitor the returned receiver is already closed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<MotionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        // Held across the push so `destroy` cannot clear the list in between.
        let state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != MonitorState::Stopped {
            self.shared
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(tx);
        }
        drop(state);

        rx
    }

    /// Spawns the polling loop. Only the first call on a fresh monitor has
    /// an effect.
    pub fn start(&self) {
        {
            let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != MonitorState::Created {
                tracing::debug!("Motion monitor already {:?}, not starting", *state);
                return;
            }
            *state = MonitorState::Running;
        }

        let shared = Arc::clone(&self.shared);
        let stop = self.shared.stop.subscribe();
        tokio::spawn(run(shared, stop));
    }

    /// Requests the loop to stop. An in-flight poll is allowed to finish but
    /// its result is dropped.
    pub fn destroy(&self) {
        let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == MonitorState::Stopped {
            return;
        }
        *state = MonitorState::Stopped;
        self.shared.stop.send_replace(true);

        // Closes every subscriber's channel.
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::info!("Motion monitor destroyed");
    }

    /// Spawns a task that logs every event under `label` until the monitor
    /// is destroyed.
    pub fn log_events(&self, label: impl Into<String>) -> JoinHandle<()> {
        let label = label.into();
        let mut events = self.subscribe();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    MotionEvent::Data(state) => {
                        tracing::debug!("Camera {} motion: {}", label, state.detected)
                    }
                    MotionEvent::Error(e) => {
                        tracing::warn!("Camera {} motion poll failed: {}", label, e)
                    }
                }
            }
            tracing::debug!("Motion event stream for {} closed", label);
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn state(&self) -> MonitorState {
        *self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn motion_detected(&self) -> bool {
        self.shared.motion_detected.load(Ordering::SeqCst)
    }
}

async fn run(shared: Arc<Shared>, mut stop: watch::Receiver<bool>) {
    tracing::info!("Motion monitor started");

    loop {
        if *stop.borrow() {
            break;
        }

        let client = shared.provider.current_client();
        let result = client.get_motion_state().await;

        if *stop.borrow() {
            break;
        }

        match result {
            Ok(state) => {
                shared.motion_detected.store(state.detected, Ordering::SeqCst);
                shared.emit(MotionEvent::Data(state));
            }
            Err(e) => {
                tracing::warn!("Motion poll failed: {}", e);
                shared.emit(MotionEvent::Error(e));
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(shared.poll_interval) => {}
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    shared.set_state(MonitorState::Stopped);
    tracing::debug!("Motion monitor loop exited");
}
