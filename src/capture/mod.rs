//! Session capture
//!
//! Input sources push [`InputSignal`]s into one channel; a single consumer
//! turns them into events, so the session log has exactly one writer.
//!
//! ```text
//! pointer source  ─┐
//!                  ├─► mpsc ─► CaptureController::handle ─► emit ─► SessionStore::save
//! keyboard source ─┘                                         └─► ScreenCapture (click, press_special)
//! ```
//!
//! `emit` is also guarded by the session mutex, so callers outside the loop
//! (tests, other threads) cannot interleave writes either.

pub mod mock;

#[cfg(feature = "desktop")]
pub mod desktop;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::event_log::{Action, Event};
use crate::session::SessionStore;

/// Raw input as delivered by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSignal {
    Pointer {
        x: i32,
        y: i32,
        button: String,
        pressed: bool,
    },
    Key(Key),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Printable character
    Char(char),
    Enter,
    /// Ends the session
    Escape,
    /// Anything else (shift, arrows, ...), ignored
    Other(String),
}

/// Sending half handed to an [`InputSource`]
///
/// The subscription is over once every clone is dropped.
#[derive(Debug, Clone)]
pub struct SignalSink {
    tx: mpsc::UnboundedSender<InputSignal>,
}

impl SignalSink {
    /// Returns false once the controller stopped listening
    pub fn send(&self, signal: InputSignal) -> bool {
        self.tx.send(signal).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Something that delivers input signals (OS hook, script, ...)
pub trait InputSource: Send + Sync {
    fn name(&self) -> &str;

    /// Start delivering to `sink`. May send from any thread.
    fn subscribe(&self, sink: SignalSink) -> Result<()>;

    /// Stop delivering and drop the sink. Must be idempotent.
    fn unsubscribe(&self);
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("screen capture failed: {0}")]
    Backend(String),

    #[error("failed to write screenshot: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes a PNG of the current screen to `path`
pub trait ScreenCapture: Send + Sync {
    fn capture_to(&self, path: &Path) -> std::result::Result<(), CaptureError>;
}

/// Owns one recording session at a time
///
/// Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct CaptureController {
    store: SessionStore,
    screen: Arc<dyn ScreenCapture>,
    pointer: Arc<dyn InputSource>,
    keyboard: Arc<dyn InputSource>,
    events: Arc<Mutex<Vec<Event>>>,
    active: Arc<AtomicBool>,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl CaptureController {
    pub fn new(
        store: SessionStore,
        screen: Arc<dyn ScreenCapture>,
        pointer: Arc<dyn InputSource>,
        keyboard: Arc<dyn InputSource>,
    ) -> Self {
        Self {
            store,
            screen,
            pointer,
            keyboard,
            events: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Events recorded in the current (or last) session
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Record until both sources end or [`stop`](Self::stop) is called
    ///
    /// Returns the finalized session.
    pub async fn start(&self) -> Result<Vec<Event>> {
        // A stop() from here on ends this run, setup included
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();

        self.store.ensure_dirs()?;
        {
            let mut events = self.events.lock();
            events.clear();
            self.store.save(&events)?;
        }

        if token.is_cancelled() {
            tracing::info!("Stop requested during startup");
            return Ok(self.events());
        }
        self.active.store(true, Ordering::SeqCst);

        let (tx, mut rx) = mpsc::unbounded_channel();
        for source in [&self.pointer, &self.keyboard] {
            if let Err(e) = source.subscribe(SignalSink { tx: tx.clone() }) {
                tracing::error!(source = source.name(), error = %e, "Failed to subscribe input source");
                self.stop();
                return Err(e);
            }
        }
        drop(tx);

        tracing::info!(dir = %self.store.dir().display(), "Recording started");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                signal = rx.recv() => match signal {
                    Some(signal) => {
                        let this = self.clone();
                        if let Err(e) = tokio::task::spawn_blocking(move || this.handle(signal)).await {
                            tracing::error!(error = %e, "Input handler panicked");
                        }
                    }
                    None => break,
                },
            }
        }

        self.stop();
        Ok(self.events())
    }

    /// End the session. Safe to call at any time, any number of times.
    pub fn stop(&self) {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        self.cancel.lock().cancel();
        self.pointer.unsubscribe();
        self.keyboard.unsubscribe();

        if was_active {
            tracing::info!(events = self.events.lock().len(), "Recording stopped");
        }
    }

    fn handle(&self, signal: InputSignal) {
        match signal {
            InputSignal::Pointer {
                x,
                y,
                button,
                pressed,
            } => self.on_pointer_action(x, y, &button, pressed),
            InputSignal::Key(key) => self.on_key_action(key),
        }
    }

    /// Presses become `click` events; releases are ignored
    pub fn on_pointer_action(&self, x: i32, y: i32, button: &str, pressed: bool) {
        if pressed {
            self.emit_logged(Action::click(x, y, button));
        }
    }

    pub fn on_key_action(&self, key: Key) {
        match key {
            Key::Char(c) if !c.is_control() => self.emit_logged(Action::Press { key: c }),
            Key::Enter => self.emit_logged(Action::PressSpecial {
                key: "enter".to_string(),
            }),
            Key::Escape => {
                tracing::info!("Escape pressed, stopping");
                self.stop();
            }
            other => tracing::trace!(key = ?other, "Ignoring key"),
        }
    }

    fn emit_logged(&self, action: Action) {
        if let Err(e) = self.emit(action) {
            tracing::error!(error = %e, "Failed to persist event");
        }
    }

    /// Append one event and rewrite the log
    ///
    /// Returns `Ok(None)` when capture is not active. The event stays in
    /// memory even if the write fails; the next successful write includes it.
    pub fn emit(&self, action: Action) -> Result<Option<Event>> {
        let mut events = self.events.lock();
        if !self.is_active() {
            return Ok(None);
        }

        let now = Local::now();
        let clock_ms = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        // Wall clock may step back; ids may not
        let id = events.last().map_or(clock_ms, |last| clock_ms.max(last.id));

        let screenshot = if action.event_type().is_qualifying() {
            self.take_screenshot(id)
        } else {
            None
        };

        let event = Event {
            id,
            timestamp: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            action,
            screenshot,
        };
        tracing::info!(id, kind = %event.event_type(), details = ?event.action, "Logged event");

        events.push(event.clone());
        self.store.save(&events)?;
        Ok(Some(event))
    }

    fn take_screenshot(&self, id: u64) -> Option<PathBuf> {
        let path = self.store.screenshot_path(id);
        match self.screen.capture_to(&path) {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(id, error = %e, "Error saving screenshot");
                None
            }
        }
    }
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("dir", &self.store.dir())
            .field("active", &self.is_active())
            .field("events", &self.events.lock().len())
            .finish()
    }
}
