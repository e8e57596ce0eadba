//! Typed journal document and its mutation operations.
//!
//! A journal is a title plus a map of `YYYY-MM-DD` dates to days; each day
//! holds a free-text summary and its entries in append order. Append order
//! is the only ordering the model guarantees and edits never disturb it.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

pub const DEFAULT_TITLE: &str = "Journal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub timestamp: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub summary: String,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub title: String,
    pub days: HashMap<String, Day>,
}

impl Journal {
    pub fn new() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            days: HashMap::new(),
        }
    }

    /// Append a new entry to `date`, creating the day (with an empty
    /// summary) if absent. The entry gets a fresh unique id and the current
    /// time; ids are never reused.
    pub fn append_entry(&mut self, date: &str, content: &str) -> Result<Entry, StoreError> {
        validate_content(content)?;
        validate_date(date)?;
        let entry = Entry {
            id: Uuid::new_v4().to_string(),
            timestamp: now_timestamp(),
            content: content.to_string(),
        };
        self.days
            .entry(date.to_string())
            .or_default()
            .entries
            .push(entry.clone());
        Ok(entry)
    }

    /// Replace the content (and optionally the timestamp) of the entry with
    /// `id`, wherever it lives, keeping its position in its day's list.
    pub fn edit_entry(
        &mut self,
        id: &str,
        content: &str,
        timestamp: Option<&str>,
    ) -> Result<Entry, StoreError> {
        validate_content(content)?;
        if let Some(ts) = timestamp {
            validate_timestamp(ts)?;
        }
        for day in self.days.values_mut() {
            if let Some(entry) = day.entries.iter_mut().find(|e| e.id == id) {
                entry.content = content.to_string();
                if let Some(ts) = timestamp {
                    entry.timestamp = ts.to_string();
                }
                return Ok(entry.clone());
            }
        }
        Err(StoreError::NotFound(format!("entry {id}")))
    }

    /// Replace the summary for `date`, creating the day if absent.
    pub fn set_summary(&mut self, date: &str, summary: &str) -> Result<Day, StoreError> {
        if summary.is_empty() {
            return Err(StoreError::Validation("summary must not be empty".into()));
        }
        validate_date(date)?;
        let day = self.days.entry(date.to_string()).or_default();
        day.summary = summary.to_string();
        Ok(day.clone())
    }

    /// Read-only projection of one day. An absent day is a valid empty
    /// state, not an error.
    pub fn day(&self, date: &str) -> Day {
        self.days.get(date).cloned().unwrap_or_default()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn validate_date(date: &str) -> Result<(), StoreError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| StoreError::Validation(format!("invalid date: {date}")))
}

pub fn validate_timestamp(ts: &str) -> Result<(), StoreError> {
    DateTime::parse_from_rfc3339(ts)
        .map(|_| ())
        .map_err(|_| StoreError::Validation(format!("invalid timestamp: {ts}")))
}

pub fn validate_content(content: &str) -> Result<(), StoreError> {
    if content.is_empty() {
        return Err(StoreError::Validation("content must not be empty".into()));
    }
    Ok(())
}
