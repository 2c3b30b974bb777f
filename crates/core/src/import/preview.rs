//! Server-returned rows held for review, and their display helpers.
//!
//! Nothing here mutates a row. Column order, labels and "empty" detection
//! are presentation concerns derived on demand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::ImportKind;

/// Placeholder some sheets use for a blank cell.
pub const EMPTY_SENTINEL: &str = "\u{2014}";

/// Columns shown first for student previews, in this order.
const STUDENT_PRIORITY_COLUMNS: &[&str] = &["ID", "Name", "Branch", "Batch"];

/// Display labels for field keys the backend is known to send.
const KNOWN_LABELS: &[(&str, &str)] = &[
    ("rollNo", "Roll No."),
    ("idNo", "ID No."),
    ("gmail", "Email Address"),
    ("name", "Name"),
    ("gender", "Gender"),
    ("branch", "Branch"),
    ("batch", "Batch"),
    ("phone", "Phone Number"),
    ("dob", "Date of Birth"),
    ("department", "Department"),
    ("designation", "Designation"),
];

/// One record pending import, keys in server order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewRow(Map<String, Value>);

impl PreviewRow {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Build a row from a JSON value; non-objects are rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for PreviewRow {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Source of truth for the review screen. Holds no network state.
#[derive(Debug, Clone)]
pub struct PreviewStore {
    kind: ImportKind,
    rows: Vec<PreviewRow>,
}

impl PreviewStore {
    pub fn new(kind: ImportKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
        }
    }

    pub fn set_rows(&mut self, rows: Vec<PreviewRow>) {
        self.rows = rows;
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn rows(&self) -> &[PreviewRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column keys in display order.
    ///
    /// Keys are collected across all rows in first-seen order. Student
    /// previews pull the priority columns to the front.
    pub fn columns(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }

        if self.kind != ImportKind::Student {
            return keys;
        }

        let mut ordered = Vec::with_capacity(keys.len());
        for wanted in STUDENT_PRIORITY_COLUMNS {
            if let Some(pos) = keys.iter().position(|k| same_column(k, wanted)) {
                ordered.push(keys.remove(pos));
            }
        }
        ordered.extend(keys);
        ordered
    }

    /// Header label for a field key.
    pub fn label(key: &str) -> String {
        KNOWN_LABELS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| title_case(key))
    }

    /// Cell text, or `None` when the value counts as empty.
    pub fn display_value(value: Option<&Value>) -> Option<String> {
        match value? {
            Value::Null => None,
            Value::String(s) if is_blank(s) => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

fn is_blank(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.is_empty() || trimmed == EMPTY_SENTINEL
}

/// Case- and separator-insensitive key comparison.
fn same_column(key: &str, wanted: &str) -> bool {
    let normalize = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    };
    normalize(key) == normalize(wanted)
}

/// `rollNo` -> `Roll No`, `year_sem` -> `Year Sem`, `ID` -> `ID`.
fn title_case(raw: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in raw.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
