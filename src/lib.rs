//! Stepdoc - record a desktop session, then turn it into step-by-step docs

pub mod capture;
pub mod config;
pub mod describe;
pub mod error;
pub mod event_log;
pub mod provider;
pub mod report;
pub mod session;

pub use capture::{CaptureController, InputSignal, InputSource, Key, ScreenCapture};
pub use config::StepdocConfig;
pub use describe::{Describer, Description};
pub use error::{FixSuggestion, StepdocError};
pub use event_log::{Action, Event, EventType};
pub use provider::{create_provider, VisionProvider};
pub use report::{ReportSummary, ReportSynthesizer};
pub use session::SessionStore;
