use regex::Regex;
use serde_json::{Map, Value};

use crate::models::Bounds;

// Dump dialects disagree on field names; each semantic attribute resolves
// through an ordered alias list, first present non-empty value wins. New
// dialects are additive here.
pub const CHILD_KEYS: [&str; 7] = [
    "children",
    "child",
    "nodes",
    "elements",
    "componentTree",
    "components",
    "subNodes",
];
pub const TEXT_KEYS: [&str; 7] = [
    "text",
    "label",
    "content",
    "description",
    "value",
    "hint",
    "title",
];
pub const TYPE_KEYS: [&str; 5] = ["type", "className", "componentType", "widgetType", "name"];
pub const ID_KEYS: [&str; 5] = ["id", "resourceId", "componentId", "identifier", "key"];

const STRING_BOUNDS_KEYS: [&str; 3] = ["bounds", "bound", "frame"];

fn value_to_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(num) => {
            if let Some(int) = num.as_i64() {
                i32::try_from(int).ok()
            } else {
                num.as_f64().map(|f| f.trunc() as i32)
            }
        }
        Value::String(text) => text.trim().parse::<i32>().ok(),
        _ => None,
    }
}

fn field_i32(map: &Map<String, Value>, key: &str) -> Option<i32> {
    map.get(key).and_then(value_to_i32)
}

// One rectangle out of at least four dump encodings, tried in order.
pub fn extract_bounds(node: &Map<String, Value>) -> Option<Bounds> {
    // Format 1: bounds mapping {left, top, right, bottom}.
    if let Some(Value::Object(bounds)) = node.get("bounds") {
        if ["left", "top", "right", "bottom"]
            .iter()
            .all(|key| bounds.contains_key(*key))
        {
            if let (Some(left), Some(top), Some(right), Some(bottom)) = (
                field_i32(bounds, "left"),
                field_i32(bounds, "top"),
                field_i32(bounds, "right"),
                field_i32(bounds, "bottom"),
            ) {
                return Some(Bounds::new(left, top, right, bottom));
            }
        }
    }

    // Format 2: rect mapping {left, top, width, height}.
    if let Some(Value::Object(rect)) = node.get("rect") {
        if rect.contains_key("left") && rect.contains_key("top") {
            let left = field_i32(rect, "left")?;
            let top = field_i32(rect, "top")?;
            let width = field_i32(rect, "width").unwrap_or(0);
            let height = field_i32(rect, "height").unwrap_or(0);
            return Some(Bounds::new(left, top, left + width, top + height));
        }
    }

    // Format 3: string "x1,y1,x2,y2" or "[x1,y1][x2,y2]".
    if let Some(raw) = STRING_BOUNDS_KEYS
        .iter()
        .find_map(|key| node.get(*key).and_then(Value::as_str))
    {
        if let Some(bounds) = parse_bounds_string(raw) {
            return Some(bounds);
        }
    }

    // Format 4: discrete scalar x/y/width/height fields.
    if ["x", "y", "width", "height"]
        .iter()
        .all(|key| node.contains_key(*key))
    {
        let x = field_i32(node, "x")?;
        let y = field_i32(node, "y")?;
        let width = field_i32(node, "width")?;
        let height = field_i32(node, "height")?;
        return Some(Bounds::new(x, y, x + width, y + height));
    }

    None
}

fn parse_bounds_string(raw: &str) -> Option<Bounds> {
    let Ok(re) = Regex::new(r"-?\d+") else {
        return None;
    };
    let nums: Vec<i32> = re
        .find_iter(raw)
        .take(4)
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .collect();
    if nums.len() < 4 {
        return None;
    }
    let (x1, y1, x2, y2) = (nums[0], nums[1], nums[2], nums[3]);
    if x2 < x1 || y2 < y1 {
        return None;
    }
    Some(Bounds::new(x1, y1, x2, y2))
}

// First present, non-empty, stringified value over an alias list.
pub fn extract_first(node: &Map<String, Value>, keys: &[&str]) -> String {
    for key in keys {
        match node.get(*key) {
            Some(Value::String(text)) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
            Some(Value::Number(num)) => return num.to_string(),
            Some(Value::Bool(flag)) => return flag.to_string(),
            _ => continue,
        }
    }
    String::new()
}

pub fn leaf_class_name(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_string()
}
