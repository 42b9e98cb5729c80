//! Scripted input and fake screens for tests
//!
//! Clones share state, so a test can keep a handle for assertions.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::Engine;
use parking_lot::Mutex;

use super::{CaptureError, InputSignal, InputSource, ScreenCapture, SignalSink};
use crate::error::{Result, StepdocError};

/// 1x1 transparent PNG
const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Replays a fixed list of signals on every subscribe
#[derive(Clone)]
pub struct ScriptedInput {
    name: String,
    script: Vec<InputSignal>,
    /// Keep the sink until `unsubscribe` instead of ending after the script
    hold_open: bool,
    refuse: bool,
    held: Arc<Mutex<Option<SignalSink>>>,
    unsubscribes: Arc<AtomicUsize>,
}

impl ScriptedInput {
    pub fn new(name: impl Into<String>, script: Vec<InputSignal>) -> Self {
        Self {
            name: name.into(),
            script,
            hold_open: false,
            refuse: false,
            held: Arc::new(Mutex::new(None)),
            unsubscribes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Fail every subscribe, like a hook without OS permission
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

impl InputSource for ScriptedInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self, sink: SignalSink) -> Result<()> {
        if self.refuse {
            return Err(StepdocError::Capture {
                reason: format!("{} refused subscription", self.name),
            });
        }
        for signal in &self.script {
            if !sink.send(signal.clone()) {
                break;
            }
        }
        if self.hold_open {
            *self.held.lock() = Some(sink);
        }
        Ok(())
    }

    fn unsubscribe(&self) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        self.held.lock().take();
    }
}

/// Writes the same tiny PNG for every capture
#[derive(Clone, Default)]
pub struct StaticScreen {
    captures: Arc<AtomicUsize>,
}

impl StaticScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

impl ScreenCapture for StaticScreen {
    fn capture_to(&self, path: &Path) -> std::result::Result<(), CaptureError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(TINY_PNG_BASE64)
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        std::fs::write(path, bytes)?;
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Always fails, like a screen grab without permission
#[derive(Clone, Copy, Default)]
pub struct FailingScreen;

impl ScreenCapture for FailingScreen {
    fn capture_to(&self, _path: &Path) -> std::result::Result<(), CaptureError> {
        Err(CaptureError::Backend("screen recording not permitted".to_string()))
    }
}
