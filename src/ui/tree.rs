use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::models::{Bounds, UiElement};
use crate::ui::extract::{
    extract_bounds, extract_first, leaf_class_name, CHILD_KEYS, ID_KEYS, TEXT_KEYS, TYPE_KEYS,
};

type Signature = (i32, i32, i32, i32, String, String);

#[derive(Default)]
struct Walker {
    elements: Vec<UiElement>,
    seen: HashSet<Signature>,
}

impl Walker {
    fn visit(&mut self, value: &Value) {
        match value {
            Value::Object(node) => {
                self.collect(node);
                // Structural children first, so nested metadata fields that
                // happen to embed rectangles cannot shadow real elements.
                for key in CHILD_KEYS {
                    if let Some(child) = node.get(key) {
                        self.visit(child);
                    }
                }
                for (key, child) in node {
                    if !CHILD_KEYS.contains(&key.as_str()) {
                        self.visit(child);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            _ => {}
        }
    }

    fn collect(&mut self, node: &Map<String, Value>) {
        let Some(bounds) = extract_bounds(node) else {
            return;
        };
        if !bounds.is_well_formed() {
            return;
        }

        let raw_class = extract_first(node, &TYPE_KEYS);
        let class_name = if raw_class.is_empty() {
            raw_class
        } else {
            leaf_class_name(&raw_class)
        };
        let resource_id = extract_first(node, &ID_KEYS);
        let text = extract_first(node, &TEXT_KEYS);

        // Nodes carrying no identity at all are layout noise.
        if class_name.is_empty() && resource_id.is_empty() && text.is_empty() {
            return;
        }

        let signature = (
            bounds.left,
            bounds.top,
            bounds.right,
            bounds.bottom,
            class_name.clone(),
            text.clone(),
        );
        if !self.seen.insert(signature) {
            return;
        }

        let display_text = if !text.is_empty() {
            text
        } else if !resource_id.is_empty() {
            resource_id.clone()
        } else {
            class_name.clone()
        };

        self.elements.push(UiElement {
            index: self.elements.len() + 1,
            resource_id,
            class_name,
            text: display_text,
            bounds,
            children: Vec::new(),
        });
    }
}

pub fn parse_layout(layout: &Value) -> Vec<UiElement> {
    let mut walker = Walker::default();
    walker.visit(layout);
    walker.elements
}

// Max right/bottom over every rectangle in the raw document, retained or
// not; (0, 0) when no rectangle is found anywhere.
pub fn scan_layout_extent(layout: &Value) -> (i32, i32) {
    fn scan(value: &Value, max_right: &mut i32, max_bottom: &mut i32) {
        match value {
            Value::Object(node) => {
                if let Some(Bounds { right, bottom, .. }) = extract_bounds(node) {
                    *max_right = (*max_right).max(right);
                    *max_bottom = (*max_bottom).max(bottom);
                }
                for child in node.values() {
                    scan(child, max_right, max_bottom);
                }
            }
            Value::Array(items) => {
                for item in items {
                    scan(item, max_right, max_bottom);
                }
            }
            _ => {}
        }
    }

    let mut max_right = 0;
    let mut max_bottom = 0;
    scan(layout, &mut max_right, &mut max_bottom);
    (max_right, max_bottom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_single_node_layout() {
        let layout = json!({
            "children": [
                {"bounds": {"left": 0, "top": 0, "right": 100, "bottom": 50}, "text": "OK"}
            ]
        });
        let elements = parse_layout(&layout);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].index, 1);
        assert_eq!(elements[0].text, "OK");
        assert_eq!(elements[0].bounds.to_string(), "0,0,100,50");
        assert!(elements[0].class_name.is_empty());
        assert!(elements[0].resource_id.is_empty());
    }

    #[test]
    fn filters_degenerate_and_noise_nodes() {
        let layout = json!({
            "nodes": [
                {"bounds": {"left": 0, "top": 0, "right": 0, "bottom": 50}, "text": "flat"},
                {"bounds": {"left": 0, "top": 0, "right": 10, "bottom": 10}},
                {"bounds": {"left": 0, "top": 0, "right": 10, "bottom": 10}, "text": "kept"}
            ]
        });
        let elements = parse_layout(&layout);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].text, "kept");
    }

    #[test]
    fn dedups_by_signature_ignoring_resource_id() {
        let layout = json!({
            "children": [
                {"bounds": "0,0,50,50", "type": "Button", "text": "Go", "id": "first"},
                {"bounds": "0,0,50,50", "type": "Button", "text": "Go", "id": "second"},
                {"bounds": "0,0,50,50", "type": "Button", "text": "Stop"}
            ]
        });
        let elements = parse_layout(&layout);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].resource_id, "first");
        assert_eq!(elements[1].text, "Stop");
    }

    #[test]
    fn indices_stay_contiguous_after_filtering() {
        let layout = json!({
            "elements": [
                {"bounds": "0,0,10,10", "text": "a"},
                {"note": "no bounds"},
                {"bounds": "0,0,0,0", "text": "degenerate"},
                {"bounds": "0,0,20,20", "text": "b"},
                {"bounds": "0,0,10,10", "text": "a"},
                {"bounds": "0,0,30,30", "text": "c"}
            ]
        });
        let elements = parse_layout(&layout);
        let indices: Vec<usize> = elements.iter().map(|el| el.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn visits_child_aliases_before_sibling_metadata() {
        let layout = json!({
            "attributes": {
                "decor": {"bounds": "0,0,40,40", "text": "decor"}
            },
            "children": [
                {"bounds": "0,0,40,40", "text": "real", "type": "Button"}
            ]
        });
        let elements = parse_layout(&layout);
        assert_eq!(elements[0].text, "real");
    }

    #[test]
    fn resolves_display_text_from_resource_id_then_class() {
        let layout = json!({
            "children": [
                {"bounds": "0,0,10,10", "id": "menu_button"},
                {"bounds": "20,0,30,10", "type": "ohos.widget.Toggle"}
            ]
        });
        let elements = parse_layout(&layout);
        assert_eq!(elements[0].text, "menu_button");
        assert_eq!(elements[1].text, "Toggle");
        assert_eq!(elements[1].class_name, "Toggle");
    }

    #[test]
    fn scans_extent_over_all_rectangles() {
        let layout = json!({
            "children": [
                {"bounds": "0,0,1200,2000"},
                {"bounds": "0,0,600,900", "text": "kept"}
            ]
        });
        assert_eq!(scan_layout_extent(&layout), (1200, 2000));
        assert_eq!(scan_layout_extent(&json!({"no": "bounds"})), (0, 0));
    }
}
