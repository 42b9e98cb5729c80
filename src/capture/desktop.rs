//! OS-level capture: `rdev` global hook for input, `xcap` for the screen
//!
//! `rdev::listen` blocks its thread for the life of the process and cannot be
//! cancelled, so one hook thread is started on first subscribe and fans out
//! to whichever sinks are currently registered. Unsubscribing just drops the
//! sink.

use std::path::Path;
use std::sync::{Once, OnceLock};

use parking_lot::Mutex;
use rdev::{listen, Button, EventType};

use super::{CaptureError, InputSignal, InputSource, Key, ScreenCapture, SignalSink};
use crate::error::{Result, StepdocError};

#[derive(Default)]
struct Hook {
    pointer: Option<SignalSink>,
    keyboard: Option<SignalSink>,
    /// Button events carry no position; track the last move
    last_pos: (f64, f64),
}

static HOOK: OnceLock<Mutex<Hook>> = OnceLock::new();
static LISTENING: Once = Once::new();

fn hook() -> &'static Mutex<Hook> {
    HOOK.get_or_init(|| Mutex::new(Hook::default()))
}

fn ensure_listening() -> Result<()> {
    let mut spawn_error = None;
    LISTENING.call_once(|| {
        let spawned = std::thread::Builder::new()
            .name("stepdoc-input-hook".to_string())
            .spawn(|| {
                if let Err(e) = listen(dispatch) {
                    tracing::error!(error = ?e, "Input hook terminated");
                }
            });
        if let Err(e) = spawned {
            spawn_error = Some(e);
        }
    });

    match spawn_error {
        Some(e) => Err(StepdocError::Capture {
            reason: format!("failed to start input hook: {}", e),
        }),
        None => Ok(()),
    }
}

fn dispatch(event: rdev::Event) {
    let mut hook = hook().lock();
    match event.event_type {
        EventType::MouseMove { x, y } => hook.last_pos = (x, y),
        EventType::ButtonPress(button) | EventType::ButtonRelease(button) => {
            let pressed = matches!(event.event_type, EventType::ButtonPress(_));
            let (x, y) = hook.last_pos;
            if let Some(sink) = &hook.pointer {
                sink.send(InputSignal::Pointer {
                    x: x.round() as i32,
                    y: y.round() as i32,
                    button: button_name(button),
                    pressed,
                });
            }
        }
        EventType::KeyPress(key) => {
            if let Some(sink) = &hook.keyboard {
                sink.send(InputSignal::Key(map_key(key, event.name.as_deref())));
            }
        }
        _ => {}
    }
}

fn button_name(button: Button) -> String {
    match button {
        Button::Left => "left".to_string(),
        Button::Right => "right".to_string(),
        Button::Middle => "middle".to_string(),
        Button::Unknown(code) => format!("button{}", code),
    }
}

fn map_key(key: rdev::Key, name: Option<&str>) -> Key {
    match key {
        rdev::Key::Return | rdev::Key::KpReturn => Key::Enter,
        rdev::Key::Escape => Key::Escape,
        _ => {
            let mut chars = name.unwrap_or_default().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if !c.is_control() => Key::Char(c),
                _ => Key::Other(format!("{:?}", key)),
            }
        }
    }
}

/// Mouse buttons from the global hook
#[derive(Debug, Default, Clone, Copy)]
pub struct RdevPointer;

impl InputSource for RdevPointer {
    fn name(&self) -> &str {
        "pointer"
    }

    fn subscribe(&self, sink: SignalSink) -> Result<()> {
        hook().lock().pointer = Some(sink);
        ensure_listening()
    }

    fn unsubscribe(&self) {
        hook().lock().pointer = None;
    }
}

/// Key presses from the global hook
#[derive(Debug, Default, Clone, Copy)]
pub struct RdevKeyboard;

impl InputSource for RdevKeyboard {
    fn name(&self) -> &str {
        "keyboard"
    }

    fn subscribe(&self, sink: SignalSink) -> Result<()> {
        hook().lock().keyboard = Some(sink);
        ensure_listening()
    }

    fn unsubscribe(&self) {
        hook().lock().keyboard = None;
    }
}

/// Full primary-monitor grab saved as PNG
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapScreen;

impl ScreenCapture for XcapScreen {
    fn capture_to(&self, path: &Path) -> std::result::Result<(), CaptureError> {
        let monitors = xcap::Monitor::all().map_err(|e| CaptureError::Backend(e.to_string()))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary())
            .or_else(|| monitors.first())
            .ok_or_else(|| CaptureError::Backend("no monitor found".to_string()))?;

        let frame = monitor
            .capture_image()
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        frame
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        Ok(())
    }
}
