//! Normalization of raw model output into a canonical [`UIReport`].
//!
//! `normalize` never fails: unparseable candidates go through a repair pass,
//! and anything still unusable degrades to an empty object whose
//! normalization is the built-in default report. The result always satisfies
//! the report invariants: six mandatory screens exactly once each, in
//! canonical order, and a non-empty component set.

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::report::{LayoutSection, Screen, StyleSheet, UIReport};

/// Screen names guaranteed to exist in every report, in canonical order.
pub const MANDATORY_SCREENS: [&str; 6] = ["Home", "Login", "Product", "Category", "Cart", "Checkout"];

/// Validate and repair a candidate JSON string into a canonical report.
///
/// Deterministic: the same candidate always yields the same report.
pub fn normalize(candidate: &str) -> UIReport {
    let fields = parse_candidate(candidate);

    let project_name = string_field(&fields, "project_name");
    let summary = string_field(&fields, "summary");
    let proposed = fields.get("screens").map(coerce_screens).unwrap_or_default();
    let screens = reconcile_screens(proposed);
    let styles = reconcile_styles(fields.get("styles"), &screens);

    UIReport {
        project_name,
        summary,
        screens,
        styles,
    }
}

// ---------------------------------------------------------------------------
// Step 1: parse, with a single repair attempt
// ---------------------------------------------------------------------------

fn parse_candidate(candidate: &str) -> Map<String, Value> {
    let trimmed = candidate.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return map;
    }

    let repaired = repair(trimmed);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Repair pass for the usual model damage: markdown fences, trailing commas,
/// unmatched closing braces after the object.
fn repair(candidate: &str) -> String {
    let without_fences = strip_code_fences(candidate);
    let without_commas = strip_trailing_commas(&without_fences);
    truncate_to_balanced(&without_commas)
}

fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop commas whose next non-whitespace character closes an object or array.
/// The scan is string-aware so commas inside values are untouched.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().copied().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Truncate at the point where the first top-level object closes, discarding
/// unmatched closing braces (or any other trailing noise) after it. Input
/// with no balanced object is returned unchanged and fails the re-parse.
fn truncate_to_balanced(text: &str) -> String {
    let Some(start) = text.find('{') else {
        return text.to_string();
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return text[start..start + i + c.len_utf8()].to_string();
                }
            }
            _ => {}
        }
    }
    text.to_string()
}

// ---------------------------------------------------------------------------
// Step 2: field coercion
// ---------------------------------------------------------------------------

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn coerce_screens(value: &Value) -> Vec<Screen> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(coerce_screen).collect())
        .unwrap_or_default()
}

fn coerce_screen(value: &Value) -> Option<Screen> {
    let obj = value.as_object()?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    Some(Screen {
        name,
        layout: coerce_layout(obj.get("layout")),
        description: string_field(obj, "description"),
    })
}

/// Models emit `layout` either as the canonical section array or wrapped as
/// `{"sections": [...]}`; both are accepted.
fn coerce_layout(value: Option<&Value>) -> Vec<LayoutSection> {
    let sections = match value {
        Some(Value::Array(items)) => Some(items),
        Some(Value::Object(map)) => map.get("sections").and_then(Value::as_array),
        _ => None,
    };
    sections
        .map(|items| items.iter().filter_map(coerce_section).collect())
        .unwrap_or_default()
}

fn coerce_section(value: &Value) -> Option<LayoutSection> {
    let obj = value.as_object()?;
    let component = obj.get("component")?.as_str()?.trim();
    if component.is_empty() {
        return None;
    }
    let attributes: BTreeMap<String, Value> = obj
        .iter()
        .filter(|(key, _)| *key != "component")
        .map(|(key, val)| (key.clone(), val.clone()))
        .collect();
    Some(LayoutSection {
        component: component.to_string(),
        attributes,
    })
}

// ---------------------------------------------------------------------------
// Step 3: screen reconciliation
// ---------------------------------------------------------------------------

/// Merge the model's screens with the canonical defaults: mandatory screens
/// first in fixed order (first case-insensitive name match wins, default
/// template when absent), then the remaining model screens in emission order,
/// dropping empty and duplicate names.
fn reconcile_screens(proposed: Vec<Screen>) -> Vec<Screen> {
    let mut consumed = vec![false; proposed.len()];
    let mut screens = Vec::with_capacity(MANDATORY_SCREENS.len() + proposed.len());

    for name in MANDATORY_SCREENS {
        let matched = proposed
            .iter()
            .enumerate()
            .find(|(i, screen)| !consumed[*i] && screen.name.eq_ignore_ascii_case(name));
        match matched {
            Some((i, screen)) => {
                consumed[i] = true;
                screens.push(screen.clone());
            }
            None => screens.push(default_screen(name)),
        }
    }

    let mut seen: Vec<String> = screens
        .iter()
        .map(|screen| screen.name.to_ascii_lowercase())
        .collect();
    for (i, screen) in proposed.into_iter().enumerate() {
        if consumed[i] || screen.name.is_empty() {
            continue;
        }
        let key = screen.name.to_ascii_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        screens.push(screen);
    }

    screens
}

fn default_screen(name: &str) -> Screen {
    Screen {
        name: name.to_string(),
        layout: default_layout(name),
        description: format!("Default layout for the {name} screen."),
    }
}

fn default_layout(name: &str) -> Vec<LayoutSection> {
    match name {
        "Home" => vec![
            LayoutSection::new("gradient_banner").with_attribute("title", json!("Welcome")),
            LayoutSection::new("filter_chips")
                .with_attribute("items", json!(["Featured", "New", "Popular"])),
            LayoutSection::new("event_cards").with_attribute("grid_columns", json!(2)),
        ],
        "Login" => vec![
            LayoutSection::new("section_heading").with_attribute("title", json!("Sign In")),
            LayoutSection::new("rounded_card")
                .with_attribute("fields", json!(["email", "password"])),
        ],
        "Product" => vec![
            LayoutSection::new("gradient_banner").with_attribute("title", json!("Product")),
            LayoutSection::new("event_cards").with_attribute("grid_columns", json!(1)),
            LayoutSection::new("floating_action_button").with_attribute("icon", json!("cart")),
        ],
        "Category" => vec![
            LayoutSection::new("filter_chips")
                .with_attribute("items", json!(["All", "Sale", "Top Rated"])),
            LayoutSection::new("event_cards").with_attribute("grid_columns", json!(2)),
        ],
        "Cart" => vec![
            LayoutSection::new("section_heading").with_attribute("title", json!("Your Cart")),
            LayoutSection::new("rounded_card").with_attribute("list", json!("cart_items")),
            LayoutSection::new("elevated_container").with_attribute("title", json!("Order Summary")),
        ],
        "Checkout" => vec![
            LayoutSection::new("section_heading").with_attribute("title", json!("Checkout")),
            LayoutSection::new("rounded_card")
                .with_attribute("fields", json!(["address", "payment"])),
            LayoutSection::new("floating_action_button").with_attribute("icon", json!("confirm")),
        ],
        _ => vec![LayoutSection::new("section_heading").with_attribute("title", json!(name))],
    }
}

// ---------------------------------------------------------------------------
// Step 4: style reconciliation
// ---------------------------------------------------------------------------

fn reconcile_styles(value: Option<&Value>, screens: &[Screen]) -> StyleSheet {
    let obj = value.and_then(Value::as_object);

    let colors = obj
        .and_then(|map| map.get("colors"))
        .map(coerce_string_map)
        .filter(|map| !map.is_empty())
        .unwrap_or_else(default_colors);
    let typography = obj
        .and_then(|map| map.get("typography"))
        .map(coerce_string_map)
        .filter(|map| !map.is_empty())
        .unwrap_or_else(default_typography);
    let components = obj
        .and_then(|map| map.get("components"))
        .map(coerce_string_vec)
        .filter(|list| !list.is_empty())
        .unwrap_or_else(|| derive_components(screens));

    StyleSheet {
        colors,
        typography,
        components,
    }
}

fn coerce_string_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(key, val)| val.as_str().map(|s| (key.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn coerce_string_vec(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Set of every `component` value across all screens, first-seen order.
/// Mandatory defaults guarantee this is non-empty; the guard covers the
/// degenerate case where the model supplied all six screens with no sections.
fn derive_components(screens: &[Screen]) -> Vec<String> {
    let mut components = Vec::new();
    for screen in screens {
        for section in &screen.layout {
            if !components.contains(&section.component) {
                components.push(section.component.clone());
            }
        }
    }
    if components.is_empty() {
        for name in MANDATORY_SCREENS {
            for section in default_layout(name) {
                if !components.contains(&section.component) {
                    components.push(section.component);
                }
            }
        }
    }
    components
}

fn default_colors() -> BTreeMap<String, String> {
    [
        ("primary", "#0055FF"),
        ("secondary", "#FFFFFF"),
        ("accent", "#111111"),
        ("background", "#F8F9FA"),
        ("surface", "#FFFFFF"),
    ]
    .into_iter()
    .map(|(role, hex)| (role.to_string(), hex.to_string()))
    .collect()
}

fn default_typography() -> BTreeMap<String, String> {
    [
        ("heading", "Inter 700"),
        ("body", "Inter 400"),
        ("caption", "Inter 300"),
    ]
    .into_iter()
    .map(|(role, font)| (role.to_string(), font.to_string()))
    .collect()
}
