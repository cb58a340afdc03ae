//! Capture engine: lifecycle control plus the dedicated capture loop.
//!
//! The engine owns the interface handle for the duration of a session. One
//! thread runs the capture loop; lifecycle commands synchronize through the
//! session mutex and the state machine, so concurrent commands serialize and
//! exactly one transition wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{error, info, trace};

use spejare_capture::{parser, CaptureSource, SourceProvider};
use spejare_config::SpejareConfig;
use spejare_core::{
    CaptureError, CaptureState, CaptureStatus, PacketStore, QueryFilter, QueryResult, StateMachine,
    StreamBroker, StreamEvent, SubscriberId, Subscription,
};
use spejare_telemetry::MetricsRecorder;

struct Session {
    terminate: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

pub struct CaptureEngine {
    provider: Arc<dyn SourceProvider>,
    state: Arc<StateMachine>,
    store: Arc<PacketStore>,
    broker: Arc<StreamBroker>,
    metrics: Arc<MetricsRecorder>,
    session: Mutex<Option<Session>>,
}

impl CaptureEngine {
    pub fn new(
        config: &SpejareConfig,
        provider: Arc<dyn SourceProvider>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            provider,
            state: Arc::new(StateMachine::new()),
            store: Arc::new(PacketStore::with_capacity(config.store.capacity)),
            broker: Arc::new(StreamBroker::with_queue_capacity(
                config.stream.queue_capacity,
            )),
            metrics,
            session: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &PacketStore {
        &self.store
    }

    pub fn status(&self) -> CaptureStatus {
        self.state.snapshot()
    }

    /// Opens the capture source and spawns the capture loop.
    ///
    /// Fails with `PermissionDenied` or `InterfaceUnavailable` before any
    /// state change. A no-op returning the current status when a session is
    /// already capturing; a paused session must be resumed, not restarted.
    pub fn start(&self) -> Result<CaptureStatus, CaptureError> {
        let mut session = self.session.lock();
        if session.is_some() {
            match self.state.state() {
                CaptureState::Capturing => return Ok(self.state.snapshot()),
                CaptureState::Paused => {
                    return Err(CaptureError::InvalidTransition {
                        action: "start",
                        state: CaptureState::Paused,
                    })
                }
                // The loop already stopped itself after a source failure;
                // reap the finished thread and start a fresh session.
                _ => {
                    if let Some(Session { terminate, handle }) = session.take() {
                        terminate.store(true, Ordering::Relaxed);
                        if handle.join().is_err() {
                            error!("capture thread panicked during shutdown");
                        }
                    }
                }
            }
        }

        let source = self.provider.open()?;
        let status = self.state.start()?;

        let terminate = Arc::new(AtomicBool::new(false));
        let handle = {
            let state = self.state.clone();
            let store = self.store.clone();
            let broker = self.broker.clone();
            let metrics = self.metrics.clone();
            let terminate = terminate.clone();
            thread::Builder::new()
                .name("spejare-capture".into())
                .spawn(move || capture_loop(source, state, store, broker, metrics, terminate))
                .map_err(|e| {
                    self.state.stop();
                    CaptureError::Source(format!("failed to spawn capture thread: {e}"))
                })?
        };
        *session = Some(Session { terminate, handle });

        info!("capture started");
        self.broker.publish(StreamEvent::Status(status.clone()));
        Ok(status)
    }

    /// Signals the capture loop, joins it, and closes the source handle.
    /// Returns only after the loop has fully exited; no append or publish
    /// happens afterwards. A no-op when nothing is running.
    pub fn stop(&self) -> CaptureStatus {
        let mut session = self.session.lock();
        if let Some(Session { terminate, handle }) = session.take() {
            terminate.store(true, Ordering::Relaxed);
            if handle.join().is_err() {
                error!("capture thread panicked during shutdown");
            }
        }
        // The loop may have stopped the state machine itself on a source
        // failure; only an actual transition gets logged and published.
        let was_active = matches!(
            self.state.state(),
            CaptureState::Capturing | CaptureState::Paused
        );
        let status = self.state.stop();
        if was_active {
            info!(packets = status.packets_captured, "capture stopped");
            self.broker.publish(StreamEvent::Status(status.clone()));
        }
        status
    }

    /// Stops persisting and publishing frames without tearing down the
    /// handle; the loop keeps draining the interface and discards.
    pub fn pause(&self) -> Result<CaptureStatus, CaptureError> {
        let status = self.state.pause()?;
        info!("capture paused");
        self.broker.publish(StreamEvent::Status(status.clone()));
        Ok(status)
    }

    pub fn resume(&self) -> Result<CaptureStatus, CaptureError> {
        let status = self.state.resume()?;
        info!("capture resumed");
        self.broker.publish(StreamEvent::Status(status.clone()));
        Ok(status)
    }

    /// Filtered historical query, newest first.
    pub fn query(&self, filter: &QueryFilter, limit: usize) -> QueryResult {
        self.store.query(filter, limit)
    }

    /// Empties the packet history. The lifecycle counter is unaffected.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Registers a live observer. The subscription is seeded with the
    /// current status so consumers start from a known state; the seed is
    /// guaranteed to precede any packet event.
    pub fn subscribe(&self) -> Subscription {
        self.broker
            .subscribe_with(StreamEvent::Status(self.state.snapshot()))
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.broker.unsubscribe(id);
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(
    mut source: Box<dyn CaptureSource>,
    state: Arc<StateMachine>,
    store: Arc<PacketStore>,
    broker: Arc<StreamBroker>,
    metrics: Arc<MetricsRecorder>,
    terminate: Arc<AtomicBool>,
) {
    let link = source.link();
    info!("capture loop started");
    while !terminate.load(Ordering::Relaxed) {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            // Poll window elapsed without traffic; re-check the stop flag.
            Ok(None) => continue,
            Err(e) => {
                // The session is dead; move the state machine to Stopped and
                // tell subscribers, so status never claims a live capture.
                error!("capture source failed: {e}");
                let status = state.stop();
                broker.publish(StreamEvent::Status(status));
                break;
            }
        };

        // Paused: keep draining the handle so the kernel buffer cannot
        // overflow, but discard without counting, storing, or publishing.
        if state.state() != CaptureState::Capturing {
            continue;
        }

        let Some(record) = parser::parse_frame(link, &frame, Utc::now()) else {
            metrics.parse_drops.inc();
            trace!(len = frame.len(), "unparseable frame skipped");
            continue;
        };
        let record = Arc::new(record);

        // Counter and store before broadcast, so status and history are
        // always at least as fresh as anything a subscriber has seen.
        state.record_accepted();
        metrics.packets_captured.inc();
        store.append(record.clone());
        let dropped = broker.publish(StreamEvent::Packet(record));
        if dropped > 0 {
            metrics.subscriber_drops.inc_by(dropped as f64);
        }
    }
    info!("capture loop exited");
}
