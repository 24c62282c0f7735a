//! Value types exchanged with bridge backends

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;

/// How a touch or key press is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressType {
    Down,
    Up,
    #[default]
    DownAndUp,
}

impl FromStr for PressType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "down" => Ok(Self::Down),
            "up" => Ok(Self::Up),
            "downandup" => Ok(Self::DownAndUp),
            _ => Err(BridgeError::Parse(format!("Invalid press type: {}", s))),
        }
    }
}

/// Hardware buttons addressable without a key code name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalButton {
    Home,
    Search,
    Menu,
    Back,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    DpadCenter,
    Enter,
}

impl PhysicalButton {
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::Home => "KEYCODE_HOME",
            Self::Search => "KEYCODE_SEARCH",
            Self::Menu => "KEYCODE_MENU",
            Self::Back => "KEYCODE_BACK",
            Self::DpadUp => "KEYCODE_DPAD_UP",
            Self::DpadDown => "KEYCODE_DPAD_DOWN",
            Self::DpadLeft => "KEYCODE_DPAD_LEFT",
            Self::DpadRight => "KEYCODE_DPAD_RIGHT",
            Self::DpadCenter => "KEYCODE_DPAD_CENTER",
            Self::Enter => "KEYCODE_ENTER",
        }
    }
}

/// An intent to broadcast or to start an activity with.
///
/// Extras keep their JSON type so the backend can pick the matching
/// typed flag (string, int, bool, float).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub uri: Option<String>,
    pub action: Option<String>,
    pub data: Option<String>,
    pub mime_type: Option<String>,
    pub categories: Vec<String>,
    pub extras: Map<String, Value>,
    pub component: Option<String>,
    pub flags: i32,
}

impl Intent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_flags(mut self, flags: i32) -> Self {
        self.flags = flags;
        self
    }
}

/// One pixel split into 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argb {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Argb {
    pub fn from_packed(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    pub fn to_packed(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

impl From<image::Rgba<u8>> for Argb {
    fn from(px: image::Rgba<u8>) -> Self {
        let [r, g, b, a] = px.0;
        Self { a, r, g, b }
    }
}

impl fmt::Display for Argb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.to_packed())
    }
}
