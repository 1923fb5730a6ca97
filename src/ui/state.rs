use crate::config::ScreenSettings;
use crate::models::{RawUiTree, UiElement, UiState};
use crate::ui::tree::parse_layout;

const RENDER_HEADER: &str = "Current Clickable UI elements:";
const RENDER_SCHEMA: &str = "'index. className: resourceId, text - bounds(x1,y1,x2,y2)'";

// Reported size when positive, else element extent, else configured fallback.
pub fn resolve_screen_size(
    reported_width: i32,
    reported_height: i32,
    elements: &[UiElement],
    screen: &ScreenSettings,
) -> (i32, i32) {
    if reported_width > 0 && reported_height > 0 {
        return (reported_width, reported_height);
    }
    let (max_right, max_bottom) = elements.iter().fold((0, 0), |(right, bottom), el| {
        (right.max(el.bounds.right), bottom.max(el.bounds.bottom))
    });
    (
        if max_right > 0 {
            max_right
        } else {
            screen.fallback_width
        },
        if max_bottom > 0 {
            max_bottom
        } else {
            screen.fallback_height
        },
    )
}

// Deterministic fixed-format rendering; the output may be diffed or fed
// verbatim to a language model, so it must be byte-stable per element list.
pub fn format_elements(elements: &[UiElement]) -> String {
    if elements.is_empty() {
        return format!("{RENDER_HEADER}\n{RENDER_SCHEMA}:\nNo UI elements found");
    }

    let mut lines = vec![format!("{RENDER_HEADER}\n{RENDER_SCHEMA}:")];
    for el in elements {
        let mut details: Vec<String> = Vec::new();
        if !el.resource_id.is_empty() {
            details.push(format!("\"{}\"", el.resource_id));
        }
        if !el.text.is_empty() && el.text != el.resource_id {
            details.push(format!("\"{}\"", el.text));
        }

        let mut parts = vec![format!("{}.", el.index), format!("{}:", el.class_name)];
        if !details.is_empty() {
            parts.push(details.join(", "));
        }
        parts.push(format!("- ({})", el.bounds));
        lines.push(parts.join(" "));
    }
    lines.join("\n")
}

fn focused_element_text(phone_state: &serde_json::Value) -> String {
    phone_state
        .get("focusedElement")
        .and_then(|focused| focused.get("text"))
        .and_then(|text| text.as_str())
        .unwrap_or("")
        .to_string()
}

pub fn build_ui_state(raw: RawUiTree, screen: &ScreenSettings) -> UiState {
    let elements = parse_layout(&raw.layout);
    let (screen_width, screen_height) =
        resolve_screen_size(raw.screen_width, raw.screen_height, &elements, screen);
    let focused_text = focused_element_text(&raw.phone_state);
    let formatted_text = format_elements(&elements);

    UiState {
        elements,
        formatted_text,
        focused_text,
        phone_state: raw.phone_state,
        screen_width,
        screen_height,
        use_normalized: screen.use_normalized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bounds;
    use serde_json::json;

    fn element(index: usize, class: &str, id: &str, text: &str, bounds: Bounds) -> UiElement {
        UiElement {
            index,
            resource_id: id.to_string(),
            class_name: class.to_string(),
            text: text.to_string(),
            bounds,
            children: Vec::new(),
        }
    }

    #[test]
    fn renders_fixed_schema_lines() {
        let elements = vec![
            element(1, "Button", "submit", "OK", Bounds::new(0, 0, 100, 50)),
            element(2, "Text", "", "Hello", Bounds::new(0, 60, 100, 110)),
            element(3, "Image", "logo", "logo", Bounds::new(0, 120, 50, 170)),
        ];
        let rendered = format_elements(&elements);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Current Clickable UI elements:");
        assert_eq!(
            lines[1],
            "'index. className: resourceId, text - bounds(x1,y1,x2,y2)':"
        );
        assert_eq!(lines[2], "1. Button: \"submit\", \"OK\" - (0,0,100,50)");
        assert_eq!(lines[3], "2. Text: \"Hello\" - (0,60,100,110)");
        // Text equal to resourceId is not repeated.
        assert_eq!(lines[4], "3. Image: \"logo\" - (0,120,50,170)");
    }

    #[test]
    fn renders_empty_class_and_placeholder_for_no_elements() {
        let elements = vec![element(1, "", "", "OK", Bounds::new(0, 0, 100, 50))];
        let rendered = format_elements(&elements);
        assert!(rendered.contains("1. : \"OK\" - (0,0,100,50)"));

        let empty = format_elements(&[]);
        assert!(empty.ends_with("No UI elements found"));
        assert!(empty.starts_with("Current Clickable UI elements:"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let elements = vec![element(1, "Button", "a", "b", Bounds::new(1, 2, 3, 4))];
        assert_eq!(format_elements(&elements), format_elements(&elements));
    }

    #[test]
    fn screen_size_prefers_reported_then_extent_then_fallback() {
        let screen = ScreenSettings::default();
        let elements = vec![element(1, "", "", "x", Bounds::new(0, 0, 1200, 2000))];
        assert_eq!(
            resolve_screen_size(720, 1280, &elements, &screen),
            (720, 1280)
        );
        assert_eq!(resolve_screen_size(0, 0, &elements, &screen), (1200, 2000));
        assert_eq!(resolve_screen_size(0, 0, &[], &screen), (1080, 2400));
    }

    #[test]
    fn builds_state_from_raw_tree() {
        let raw = RawUiTree {
            layout: json!({
                "children": [
                    {"bounds": {"left": 0, "top": 0, "right": 100, "bottom": 50}, "text": "OK"}
                ]
            }),
            phone_state: json!({
                "currentApp": "Unknown",
                "focusedElement": {"text": "OK"}
            }),
            screen_width: 0,
            screen_height: 0,
        };
        let state = build_ui_state(raw, &ScreenSettings::default());
        assert_eq!(state.elements.len(), 1);
        assert_eq!(state.elements[0].index, 1);
        assert_eq!(state.focused_text, "OK");
        assert_eq!((state.screen_width, state.screen_height), (100, 50));
        assert!(state
            .formatted_text
            .contains("1. : \"OK\" - (0,0,100,50)"));
        assert!(!state.use_normalized);
    }
}
