//! Display details stored alongside a group.

use serde::{Deserialize, Serialize};

/// How a group is presented: expansion state, color, icon and description.
///
/// The engine never reads these; they are carried so a tree written back out
/// keeps what it was loaded with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDetails {
    pub expanded: bool,
    /// RGBA, e.g. `0x8a8a8aff`
    #[serde(default)]
    pub color: Option<u32>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for GroupDetails {
    fn default() -> Self {
        Self {
            expanded: true,
            color: None,
            icon: None,
            description: None,
        }
    }
}

impl GroupDetails {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_color(mut self, rgba: u32) -> Self {
        self.color = Some(rgba);
        self
    }

    /// An empty icon name means no icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into()).filter(|icon| !icon.is_empty());
        self
    }

    /// An empty description means no description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into()).filter(|text| !text.is_empty());
        self
    }

    pub fn collapsed(mut self) -> Self {
        self.expanded = false;
        self
    }
}

/// Parse `0xRRGGBBAA`, `#RRGGBBAA` or the opaque `0xRRGGBB` / `#RRGGBB` forms.
pub fn parse_color(text: &str) -> Option<u32> {
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('#'))?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    match hex.len() {
        8 => Some(value),
        6 => Some(value << 8 | 0xff),
        _ => None,
    }
}

pub fn format_color(rgba: u32) -> String {
    format!("0x{:08x}", rgba)
}

/// Whether a run of field tokens opens with `expanded;color;...`.
///
/// Explicit groups list member keys after their context, so details are told
/// apart from keys by the shape of the first two tokens.
pub(crate) fn starts_with_details<S: AsRef<str>>(tokens: &[S]) -> bool {
    match tokens {
        [expanded, color, _, _, ..] => {
            matches!(expanded.as_ref(), "0" | "1")
                && (color.as_ref().is_empty() || parse_color(color.as_ref()).is_some())
        }
        _ => false,
    }
}
