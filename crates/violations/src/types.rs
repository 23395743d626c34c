//! Violation taxonomy

use serde::{Serialize, Serializer};
use std::fmt;

/// Keyboard shortcut family blocked during the exam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockedKey {
    /// Escape (leaves fullscreen)
    Escape,
    /// F5, Ctrl/Cmd+R
    Refresh,
    /// Ctrl/Cmd+C, V, X
    CopyPaste,
    /// F12, Ctrl/Cmd+Shift+I
    DevTools,
}

/// A classified cheating signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationType {
    NoFace,
    MultipleFaces,
    FaceTooFar,
    LookingAway,
    ForbiddenObject,
    TabBlur,
    VisibilityHidden,
    FullscreenExited,
    LoudAudio,
    Shouting,
    /// Each shortcut family debounces independently
    BlockedKey(BlockedKey),
    BlockedContextMenu,
}

impl ViolationType {
    /// Wire name used in proctor event reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::NoFace => "no-face",
            ViolationType::MultipleFaces => "multiple-faces",
            ViolationType::FaceTooFar => "face-too-far",
            ViolationType::LookingAway => "looking-away",
            ViolationType::ForbiddenObject => "forbidden-object-detected",
            ViolationType::TabBlur => "tab-blur",
            ViolationType::VisibilityHidden => "visibility-hidden",
            ViolationType::FullscreenExited => "fullscreen-exited",
            ViolationType::LoudAudio => "loud-audio",
            ViolationType::Shouting => "shouting",
            ViolationType::BlockedKey(_) => "blocked-function-key",
            ViolationType::BlockedContextMenu => "blocked-context-menu",
        }
    }

    /// Short human description, used in termination reasons
    pub fn description(&self) -> &'static str {
        match self {
            ViolationType::NoFace => "no face detected",
            ViolationType::MultipleFaces => "multiple faces detected",
            ViolationType::FaceTooFar => "face too small or too far",
            ViolationType::LookingAway => "looking away from the screen",
            ViolationType::ForbiddenObject => "forbidden object detected",
            ViolationType::TabBlur => "window lost focus",
            ViolationType::VisibilityHidden => "tab hidden",
            ViolationType::FullscreenExited => "fullscreen exited",
            ViolationType::LoudAudio => "loud talking",
            ViolationType::Shouting => "shouting",
            ViolationType::BlockedKey(BlockedKey::Escape) => "escape key pressed",
            ViolationType::BlockedKey(BlockedKey::Refresh) => "page refresh attempted",
            ViolationType::BlockedKey(BlockedKey::CopyPaste) => "copy/paste attempted",
            ViolationType::BlockedKey(BlockedKey::DevTools) => "developer tools requested",
            ViolationType::BlockedContextMenu => "context menu requested",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ViolationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A violation together with the message shown to the candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub violation: ViolationType,
    pub message: String,
}

impl Finding {
    pub fn new(violation: ViolationType, message: impl Into<String>) -> Self {
        Self {
            violation,
            message: message.into(),
        }
    }

    /// Finding with the default message for its type
    pub fn standard(violation: ViolationType) -> Self {
        let message = match violation {
            ViolationType::NoFace => "Face not visible! Please stay in front of the camera.",
            ViolationType::MultipleFaces => "Multiple faces detected! Only you should be visible.",
            ViolationType::FaceTooFar => {
                "Face too small or too far! Please move closer to the camera."
            }
            ViolationType::LookingAway => {
                "Looking away detected! Please keep your eyes on the screen."
            }
            ViolationType::ForbiddenObject => "Suspicious item detected!",
            ViolationType::TabBlur => "Tab/window switch detected!",
            ViolationType::VisibilityHidden => "Tab switch detected!",
            ViolationType::FullscreenExited => "Fullscreen mode exited!",
            ViolationType::LoudAudio => "Loud talking detected! Please keep quiet during the exam.",
            ViolationType::Shouting => "Shouting detected!",
            ViolationType::BlockedKey(BlockedKey::Escape) => {
                "Escape key is disabled during the exam"
            }
            ViolationType::BlockedKey(BlockedKey::Refresh) => {
                "Page refresh is disabled during the exam"
            }
            ViolationType::BlockedKey(BlockedKey::CopyPaste) => {
                "Copy/paste operations are disabled"
            }
            ViolationType::BlockedKey(BlockedKey::DevTools) => "Developer tools are disabled",
            ViolationType::BlockedContextMenu => "Right-click is disabled",
        };
        Self::new(violation, message)
    }
}
