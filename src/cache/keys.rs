// ABOUTME: Deterministic cache keys for wellness data kinds
// ABOUTME: Renders templates from data kind, subject id, and ISO date
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::cache::{
    BODY_BATTERY_KEY_TEMPLATE, SLEEP_KEY_TEMPLATE, STRESS_KEY_TEMPLATE, TTL_BODY_BATTERY_SECS,
    TTL_SLEEP_SECS, TTL_STRESS_SECS,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Wellness data kinds served through the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Nightly sleep summary
    Sleep,
    /// Daily stress levels
    Stress,
    /// Body battery charge and drain
    BodyBattery,
}

impl DataKind {
    /// Every data kind
    pub const ALL: [Self; 3] = [Self::Sleep, Self::Stress, Self::BodyBattery];

    /// Stable name, used as rate limit key and metrics endpoint label
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Stress => "stress",
            Self::BodyBattery => "body_battery",
        }
    }

    /// Key template for this kind
    #[must_use]
    pub const fn template(self) -> CacheKeyTemplate {
        match self {
            Self::Sleep => CacheKeyTemplate(SLEEP_KEY_TEMPLATE),
            Self::Stress => CacheKeyTemplate(STRESS_KEY_TEMPLATE),
            Self::BodyBattery => CacheKeyTemplate(BODY_BATTERY_KEY_TEMPLATE),
        }
    }

    /// Built-in TTL, before configuration overrides
    #[must_use]
    pub const fn default_ttl(self) -> Duration {
        match self {
            Self::Sleep => Duration::from_secs(TTL_SLEEP_SECS),
            Self::Stress => Duration::from_secs(TTL_STRESS_SECS),
            Self::BodyBattery => Duration::from_secs(TTL_BODY_BATTERY_SECS),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key template with `{subject_id}` and `{date}` placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKeyTemplate(&'static str);

impl CacheKeyTemplate {
    /// Raw template text
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// Substitute the placeholders; dates render as `YYYY-MM-DD`
    ///
    /// Substitution is a single pass over the template, so placeholder text
    /// inside `subject_id` is copied verbatim.
    #[must_use]
    pub fn render(&self, subject_id: &str, date: NaiveDate) -> String {
        let date = date.format("%Y-%m-%d").to_string();
        let mut rendered = String::with_capacity(self.0.len() + subject_id.len() + date.len());
        let mut rest = self.0;

        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{subject_id}") {
                rendered.push_str(subject_id);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{date}") {
                rendered.push_str(&date);
                rest = after;
            } else {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
        rendered.push_str(rest);
        rendered
    }
}

/// Structured cache key; the only way callers address cached values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Data kind being cached
    pub kind: DataKind,
    /// Whose data it is
    pub subject_id: String,
    /// Calendar day the data covers
    pub date: NaiveDate,
}

impl CacheKey {
    /// Create new cache key
    #[must_use]
    pub fn new(kind: DataKind, subject_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            kind,
            subject_id: subject_id.into(),
            date,
        }
    }

    /// Sleep data key
    #[must_use]
    pub fn sleep(subject_id: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(DataKind::Sleep, subject_id, date)
    }

    /// Stress data key
    #[must_use]
    pub fn stress(subject_id: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(DataKind::Stress, subject_id, date)
    }

    /// Body battery data key
    #[must_use]
    pub fn body_battery(subject_id: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(DataKind::BodyBattery, subject_id, date)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind.template().render(&self.subject_id, self.date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_render_from_templates() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap_or_default();
        assert_eq!(CacheKey::sleep("42", date).to_string(), "sleep:42:2024-03-07");
        assert_eq!(CacheKey::stress("42", date).to_string(), "stress:42:2024-03-07");
        assert_eq!(
            CacheKey::body_battery("42", date).to_string(),
            "body_battery:42:2024-03-07"
        );
    }

    #[test]
    fn test_placeholder_text_in_subject_is_not_substituted() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        let literal = CacheKey::sleep("{date}", date).to_string();
        let real = CacheKey::sleep("2024-01-01", date).to_string();
        assert_eq!(literal, "sleep:{date}:2024-01-01");
        assert_ne!(literal, real);
        assert_eq!(
            CacheKey::stress("{subject_id}", date).to_string(),
            "stress:{subject_id}:2024-01-01"
        );
    }

    #[test]
    fn test_same_request_same_key() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default();
        let first = CacheKey::new(DataKind::Stress, "runner-1", date);
        let second = CacheKey::new(DataKind::Stress, String::from("runner-1"), date);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }
}
