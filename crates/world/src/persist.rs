//! Device persistence records.
//!
//! A [`DeviceRecord`] is a flat key/value map that a device writes on unload
//! and reads back on load. Loading is lenient: missing keys fall back to
//! defaults and out-of-range values are clamped.

use crate::slots::SlotArray;
use edautomation_core::ItemStack;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Errors emitted while encoding or decoding records.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Wrap serde encoding issues.
    #[error("failed to encode device record: {0}")]
    Encode(#[source] serde_json::Error),
    /// Wrap serde parsing issues.
    #[error("failed to parse device record: {0}")]
    Decode(#[source] serde_json::Error),
}

/// One stored slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    /// Slot index.
    pub slot: u16,
    /// Stack in that slot.
    pub stack: ItemStack,
}

/// A single record value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer field.
    Int(i64),
    /// Non-empty slots of a slot array.
    Items(Vec<SlotEntry>),
}

/// Flat persisted state of a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    entries: BTreeMap<String, RecordValue>,
}

impl DeviceRecord {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing was stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw access to a value.
    pub fn get(&self, key: &str) -> Option<&RecordValue> {
        self.entries.get(key)
    }

    /// Store a flag.
    pub fn put_bool(&mut self, key: &str, value: bool) {
        self.entries.insert(key.to_string(), RecordValue::Bool(value));
    }

    /// Store an integer.
    pub fn put_int(&mut self, key: &str, value: i64) {
        self.entries.insert(key.to_string(), RecordValue::Int(value));
    }

    /// Store the non-empty slots of `slots`.
    pub fn put_items(&mut self, key: &str, slots: &SlotArray) {
        let entries = slots
            .as_slice()
            .iter()
            .enumerate()
            .filter_map(|(slot, stack)| {
                stack.as_ref().map(|stack| SlotEntry {
                    slot: slot as u16,
                    stack: stack.clone(),
                })
            })
            .collect();
        self.entries.insert(key.to_string(), RecordValue::Items(entries));
    }

    /// Read a flag, defaulting to `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(RecordValue::Bool(value)) => *value,
            Some(RecordValue::Int(value)) => *value != 0,
            _ => false,
        }
    }

    /// Read an integer, defaulting to 0.
    pub fn get_int(&self, key: &str) -> i64 {
        match self.entries.get(key) {
            Some(RecordValue::Int(value)) => *value,
            Some(RecordValue::Bool(value)) => i64::from(*value),
            _ => 0,
        }
    }

    /// Read an integer clamped to `min..=max`.
    pub fn get_clamped(&self, key: &str, min: i64, max: i64) -> i64 {
        let raw = self.get_int(key);
        let value = raw.clamp(min, max);
        if value != raw {
            warn!(key, raw, value, "clamped out-of-range record value");
        }
        value
    }

    /// Read an integer clamped to `min..=max`, or `default` when absent.
    pub fn get_clamped_or(&self, key: &str, min: i64, max: i64, default: i64) -> i64 {
        if self.entries.contains_key(key) {
            self.get_clamped(key, min, max)
        } else {
            default
        }
    }

    /// Restore slots written by [`DeviceRecord::put_items`] into `slots`.
    /// Entries outside the array are skipped.
    pub fn load_items(&self, key: &str, slots: &mut SlotArray) {
        slots.clear();
        let Some(RecordValue::Items(entries)) = self.entries.get(key) else {
            return;
        };
        for entry in entries {
            let index = entry.slot as usize;
            if index >= slots.len() {
                warn!(key, slot = index, "dropping stored stack outside slot range");
                continue;
            }
            slots.set(index, Some(entry.stack.clone()));
        }
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string(self).map_err(PersistError::Encode)
    }

    /// Decode from JSON.
    pub fn from_json(input: &str) -> Result<Self, PersistError> {
        serde_json::from_str(input).map_err(PersistError::Decode)
    }
}

/// Save/load contract of a device.
pub trait Persist {
    /// Write the persistent state.
    fn save(&self) -> DeviceRecord;

    /// Replace the persistent state from `record`.
    fn load(&mut self, record: &DeviceRecord);
}
