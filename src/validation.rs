//! Field-level input validation.
//!
//! Input structs collect every problem into [`FieldErrors`] instead of
//! stopping at the first one, so a form can highlight all bad fields at once.

use std::collections::BTreeMap;

use serde::Serialize;

pub const NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// First message overall, used as the problem `detail`.
    pub fn summary(&self) -> String {
        self.0
            .values()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "One or more validation errors occurred.".to_string())
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Required text with an upper bound on characters. Checks the trimmed value.
    pub fn require_text(&mut self, field: &str, label: &str, value: &str, max: usize) {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, format!("{label} is required"));
        } else if value.chars().count() > max {
            self.add(field, format!("{label} cannot exceed {max} characters"));
        }
    }

    /// Required text with both bounds.
    pub fn require_text_between(
        &mut self,
        field: &str,
        label: &str,
        value: &str,
        min: usize,
        max: usize,
    ) {
        let value = value.trim();
        let len = value.chars().count();
        if value.is_empty() {
            self.add(field, format!("{label} is required"));
        } else if len < min || len > max {
            self.add(
                field,
                format!("{label} must be between {min} and {max} characters"),
            );
        }
    }

    pub fn optional_text(&mut self, field: &str, label: &str, value: Option<&str>, max: usize) {
        if let Some(v) = value {
            if v.trim().chars().count() > max {
                self.add(field, format!("{label} cannot exceed {max} characters"));
            }
        }
    }

    pub fn require<T>(&mut self, field: &str, label: &str, value: Option<&T>) -> bool {
        if value.is_none() {
            self.add(field, format!("{label} is required"));
            return false;
        }
        true
    }

    pub fn require_range(&mut self, field: &str, label: &str, value: Option<i64>, min: i64, max: i64) {
        match value {
            None => self.add(field, format!("{label} is required")),
            Some(v) if v < min || v > max => {
                self.add(field, format!("{label} must be between {min} and {max}"))
            }
            Some(_) => {}
        }
    }
}

/// Trims and drops blank optional text.
pub fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
