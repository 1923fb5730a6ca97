use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    // Degenerate rectangles (zero or negative extent) are filtered out of
    // the element list.
    pub fn is_well_formed(&self) -> bool {
        self.right > self.left && self.bottom > self.top
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.left, self.top, self.right, self.bottom)
    }
}

// Field names follow the device-facing JSON convention consumed by the
// agent layer (resourceId, className, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UiElement {
    pub index: usize,
    pub resource_id: String,
    pub class_name: String,
    pub text: String,
    pub bounds: Bounds,
    // Reserved; the normalized model is flat.
    pub children: Vec<UiElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub elements: Vec<UiElement>,
    pub formatted_text: String,
    pub focused_text: String,
    pub phone_state: serde_json::Value,
    pub screen_width: i32,
    pub screen_height: i32,
    pub use_normalized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawUiTree {
    pub layout: serde_json::Value,
    pub phone_state: serde_json::Value,
    pub screen_width: i32,
    pub screen_height: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppEntry {
    pub package: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HdcInfo {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_bounds() {
        assert!(Bounds::new(0, 0, 100, 50).is_well_formed());
        assert!(!Bounds::new(0, 0, 0, 50).is_well_formed());
        assert!(!Bounds::new(10, 10, 10, 10).is_well_formed());
        assert!(!Bounds::new(100, 0, 0, 50).is_well_formed());
    }

    #[test]
    fn renders_bounds_as_quartet() {
        assert_eq!(Bounds::new(0, 0, 100, 50).to_string(), "0,0,100,50");
        assert_eq!(Bounds::new(-5, -2, 10, 20).to_string(), "-5,-2,10,20");
    }

    #[test]
    fn serializes_element_with_camel_case_keys() {
        let element = UiElement {
            index: 1,
            resource_id: "submit".to_string(),
            class_name: "Button".to_string(),
            text: "OK".to_string(),
            bounds: Bounds::new(0, 0, 100, 50),
            children: Vec::new(),
        };
        let json = serde_json::to_value(&element).expect("serialize");
        assert_eq!(json["resourceId"], "submit");
        assert_eq!(json["className"], "Button");
        assert_eq!(json["bounds"]["right"], 100);
    }
}
