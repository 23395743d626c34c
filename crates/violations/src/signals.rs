//! Browser/DOM signal rules

use serde::{Deserialize, Serialize};

use crate::config::EvaluatorConfig;
use crate::types::{BlockedKey, Finding, ViolationType};

/// A key press as reported by the host page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyStroke {
    /// `KeyboardEvent.key` value, e.g. "Escape", "F5", "c"
    pub key: String,
    pub ctrl: bool,
    /// Cmd on macOS
    pub meta: bool,
    pub shift: bool,
}

impl KeyStroke {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Signals the host page forwards while monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowserSignal {
    /// The window lost focus
    WindowBlur,
    /// `visibilitychange`, carrying `document.hidden`
    VisibilityChange { hidden: bool },
    /// `fullscreenchange`, carrying whether an element is fullscreen
    FullscreenChange { active: bool },
    KeyDown(KeyStroke),
    ContextMenu,
}

/// Outcome of evaluating one signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalVerdict {
    Violation(Finding),
    /// Show a message but do not count it
    Notice(String),
    Ignored,
}

/// Which blocked shortcut family a key press belongs to, if any.
///
/// The host listener calls this to decide whether to suppress the key's
/// default action.
pub fn classify_key(stroke: &KeyStroke) -> Option<BlockedKey> {
    let key = stroke.key.as_str();
    match key {
        "Escape" => return Some(BlockedKey::Escape),
        "F5" => return Some(BlockedKey::Refresh),
        "F12" => return Some(BlockedKey::DevTools),
        _ => {}
    }

    if !stroke.command() {
        return None;
    }
    if stroke.shift && key.eq_ignore_ascii_case("i") {
        return Some(BlockedKey::DevTools);
    }
    if key.eq_ignore_ascii_case("r") {
        return Some(BlockedKey::Refresh);
    }
    if ["c", "v", "x"].iter().any(|k| key.eq_ignore_ascii_case(k)) {
        return Some(BlockedKey::CopyPaste);
    }
    None
}

/// Classify one browser signal
pub fn evaluate_signal(signal: &BrowserSignal, config: &EvaluatorConfig) -> SignalVerdict {
    match signal {
        BrowserSignal::WindowBlur => {
            SignalVerdict::Violation(Finding::standard(ViolationType::TabBlur))
        }
        BrowserSignal::VisibilityChange { hidden: true } => {
            SignalVerdict::Violation(Finding::standard(ViolationType::VisibilityHidden))
        }
        BrowserSignal::VisibilityChange { hidden: false } => SignalVerdict::Ignored,
        BrowserSignal::FullscreenChange { active: false } => {
            SignalVerdict::Violation(Finding::standard(ViolationType::FullscreenExited))
        }
        BrowserSignal::FullscreenChange { active: true } => SignalVerdict::Ignored,
        BrowserSignal::KeyDown(stroke) if config.block_keys => match classify_key(stroke) {
            Some(family) => {
                SignalVerdict::Violation(Finding::standard(ViolationType::BlockedKey(family)))
            }
            None => SignalVerdict::Ignored,
        },
        BrowserSignal::KeyDown(_) => SignalVerdict::Ignored,
        BrowserSignal::ContextMenu => {
            let finding = Finding::standard(ViolationType::BlockedContextMenu);
            if config.context_menu_is_violation {
                SignalVerdict::Violation(finding)
            } else {
                SignalVerdict::Notice(finding.message)
            }
        }
    }
}
