use regex::Regex;
use serde_json::Value;

use crate::models::AppEntry;

const SYSTEM_BUNDLE_PREFIXES: [&str; 3] = ["com.ohos.", "ohos.", "com.huawei."];

// `hdc list targets` mixes serials with status noise; keep only serial lines.
pub fn parse_hdc_targets(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('['))
        .filter(|line| !line.to_lowercase().starts_with("empty"))
        .filter(|line| !line.to_lowercase().contains("usb:"))
        .map(|line| line.to_string())
        .collect()
}

// First balanced top-level `{...}` substring, string- and escape-aware.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn wrap_non_object(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        other => serde_json::json!({ "root": other }),
    }
}

// Layout dumps sometimes arrive wrapped in command-line noise; a totally
// unparseable payload degrades to an empty document rather than an error.
pub fn parse_layout_payload(payload: &str) -> Value {
    let text = payload.trim();
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return wrap_non_object(value);
    }
    if let Some(candidate) = extract_json_object(text) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return wrap_non_object(value);
        }
    }
    Value::Object(serde_json::Map::new())
}

pub fn parse_bundle_names(output: &str) -> Vec<String> {
    let Ok(quoted) = Regex::new(r#"(?i)"(?:bundleName|name)"\s*:\s*"([A-Za-z0-9_.]+)""#) else {
        return Vec::new();
    };
    let mut names: Vec<String> = quoted
        .captures_iter(output)
        .map(|caps| caps[1].to_string())
        .collect();
    if names.is_empty() {
        // Looser fallback: package-shaped dotted identifiers.
        let Ok(dotted) = Regex::new(r"\b[A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+){2,}\b") else {
            return Vec::new();
        };
        names = dotted
            .find_iter(output)
            .map(|m| m.as_str().to_string())
            .collect();
    }
    let mut deduped = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if seen.insert(name.clone()) {
            deduped.push(name);
        }
    }
    deduped
}

// Labels appear in the same order as bundle entries in `bm dump -a -l`;
// align positionally and fall back to the package name.
pub fn parse_app_entries(output: &str) -> Vec<AppEntry> {
    let packages = parse_bundle_names(output);
    if packages.is_empty() {
        return Vec::new();
    }
    let labels: Vec<String> = match Regex::new(r#"(?i)"label"\s*:\s*"([^"]*)""#) {
        Ok(re) => re
            .captures_iter(output)
            .map(|caps| caps[1].to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    packages
        .into_iter()
        .enumerate()
        .map(|(idx, package)| {
            let label = labels
                .get(idx)
                .filter(|label| !label.is_empty())
                .cloned()
                .unwrap_or_else(|| package.clone());
            AppEntry { package, label }
        })
        .collect()
}

pub fn is_system_bundle(package: &str) -> bool {
    SYSTEM_BUNDLE_PREFIXES
        .iter()
        .any(|prefix| package.starts_with(prefix))
}

pub fn looks_like_start_success(output: &str) -> bool {
    let text = output.to_lowercase();
    text.contains("start ability successfully") || text.contains("start ability for result ok")
}

// (module, ability) from `bm dump -n <pkg>` metadata.
pub fn parse_launch_ability(dump: &str) -> (Option<String>, Option<String>) {
    fn quoted_field(dump: &str, field: &str) -> Option<String> {
        let pattern = format!(r#""{field}"\s*:\s*"([^"]+)""#);
        let re = Regex::new(&pattern).ok()?;
        re.captures(dump)
            .map(|caps| caps[1].trim().to_string())
            .filter(|value| !value.is_empty())
    }

    let module_name = quoted_field(dump, "mainEntry");
    let mut ability_name = quoted_field(dump, "mainAbility");
    if ability_name.is_none() {
        ability_name = quoted_field(dump, "mainElementName");
    }
    if ability_name.is_none() {
        // Fall back to the first ability entry.
        if let Ok(re) = Regex::new(r#"(?s)"abilityInfos"\s*:\s*\[\s*\{.*?"name"\s*:\s*"([^"]+)""#)
        {
            ability_name = re
                .captures(dump)
                .map(|caps| caps[1].trim().to_string())
                .filter(|value| !value.is_empty());
        }
    }
    (module_name, ability_name)
}
