use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::palette::Color;

const DEFAULT_SENTINEL: &str = "default";

/// Payload of the `active-editor-changed` event. `path` is `None` when no
/// document is focused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusChangedPayload {
    #[serde(default)]
    pub path: Option<String>,
}

/// Value written to a tab color key: either a palette color or the host's
/// own default styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabColor {
    Custom(Color),
    Default,
}

impl fmt::Display for TabColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabColor::Custom(color) => fmt::Display::fmt(color, f),
            TabColor::Default => f.write_str(DEFAULT_SENTINEL),
        }
    }
}

impl Serialize for TabColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TabColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == DEFAULT_SENTINEL {
            return Ok(TabColor::Default);
        }
        raw.parse()
            .map(TabColor::Custom)
            .map_err(serde::de::Error::custom)
    }
}

/// The `workbench.colorCustomizations` section managed by this extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCustomizations {
    #[serde(rename = "editorGroupHeader.tabsBorder")]
    pub tabs_border: TabColor,
    #[serde(rename = "tab.selectedBorderTop")]
    pub selected_border_top: TabColor,
}

impl ColorCustomizations {
    pub fn uniform(color: TabColor) -> Self {
        Self {
            tabs_border: color,
            selected_border_top: color,
        }
    }

    pub fn reset() -> Self {
        Self::uniform(TabColor::Default)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationStatus {
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPreview {
    pub path: String,
    pub index: usize,
    pub color: Color,
}
