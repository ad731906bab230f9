//! Shared control values
//!
//! Decks publish their state (play position, slip, loop and cue points)
//! as named controls. The audio side writes them, the waveform view reads
//! them once per frame.
//!
//! Each value is an `f64` stored bit-for-bit in an `AtomicU64`, so both
//! sides stay lock-free. Lookups by name go through the registry lock, but
//! only at construction time: renderers keep a [`ControlProxy`] and never
//! touch the registry while drawing.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Control identifier: deck group plus item name, e.g. `[Channel1]` / `playposition`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey {
    pub group: String,
    pub item: String,
}

impl ConfigKey {
    pub fn new(group: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            item: item.into(),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.group, self.item)
    }
}

/// Lock-free `f64` cell
///
/// Uses `Relaxed` ordering: each control is an independent value and
/// readers only need an eventually-consistent snapshot.
#[derive(Debug, Default)]
pub struct ControlValue {
    bits: AtomicU64,
}

impl ControlValue {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn to_bool(&self) -> bool {
        self.get() > 0.0
    }
}

/// Named collection of controls shared between the engine and the UI
#[derive(Debug, Default)]
pub struct ControlRegistry {
    controls: RwLock<HashMap<ConfigKey, Arc<ControlValue>>>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the control for `key`, creating it with `default` if missing
    pub fn get_or_create(&self, key: &ConfigKey, default: f64) -> Arc<ControlValue> {
        if let Some(value) = self.lookup(key) {
            return value;
        }
        let mut controls = self.controls.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            controls
                .entry(key.clone())
                .or_insert_with(|| Arc::new(ControlValue::new(default))),
        )
    }

    /// Existing control for `key`
    pub fn lookup(&self, key: &ConfigKey) -> Option<Arc<ControlValue>> {
        let controls = self.controls.read().unwrap_or_else(PoisonError::into_inner);
        controls.get(key).cloned()
    }

    /// Write a control value, creating the control if needed
    pub fn set(&self, key: &ConfigKey, value: f64) {
        self.get_or_create(key, value).set(value);
    }

    /// Read a control value; missing controls read as 0
    pub fn get(&self, key: &ConfigKey) -> f64 {
        self.lookup(key).map(|value| value.get()).unwrap_or(0.0)
    }

    /// Read-only proxy for `key`, which must already exist
    ///
    /// An unknown key yields an invalid proxy that always reads 0.
    pub fn proxy(&self, key: &ConfigKey) -> ControlProxy {
        match self.lookup(key) {
            Some(value) => ControlProxy {
                key: key.clone(),
                value: Some(value),
            },
            None => {
                log::debug!("ControlRegistry: no control {}, proxy is invalid", key);
                ControlProxy {
                    key: key.clone(),
                    value: None,
                }
            }
        }
    }

    /// Proxy for `key`, creating the control with `default` if missing
    pub fn proxy_or_create(&self, key: &ConfigKey, default: f64) -> ControlProxy {
        ControlProxy {
            key: key.clone(),
            value: Some(self.get_or_create(key, default)),
        }
    }
}

/// Cheap read handle to one control
#[derive(Debug, Clone)]
pub struct ControlProxy {
    key: ConfigKey,
    value: Option<Arc<ControlValue>>,
}

impl ControlProxy {
    pub fn key(&self) -> &ConfigKey {
        &self.key
    }

    /// Whether the control existed when the proxy was created
    pub fn valid(&self) -> bool {
        self.value.is_some()
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.value.as_ref().map(|value| value.get()).unwrap_or(0.0)
    }

    #[inline]
    pub fn to_bool(&self) -> bool {
        self.get() > 0.0
    }
}

/// Control item names published per deck
pub mod items {
    pub const PLAY_POSITION: &str = "playposition";
    pub const SLIP_POSITION: &str = "slip_position";
    pub const SLIP_ENABLED: &str = "slip_enabled";
    pub const END_OF_TRACK: &str = "end_of_track";
    pub const TIME_REMAINING: &str = "time_remaining";
    pub const LOOP_START: &str = "loop_start_position";
    pub const LOOP_END: &str = "loop_end_position";
    pub const LOOP_ENABLED: &str = "loop_enabled";
    pub const CUE_POINT: &str = "cue_point";
    pub const STEM_VOLUME: &str = "volume";
    pub const STEM_MUTE: &str = "mute";

    /// Position control of hot cue `index` (1-based)
    pub fn hotcue_position(index: usize) -> String {
        format!("hotcue_{index}_position")
    }

    /// Group of stem `index` (1-based) of deck `group`, e.g. `[Channel1_Stem2]`
    pub fn stem_group(group: &str, index: usize) -> String {
        let base = group.trim_end_matches(']');
        format!("{base}_Stem{index}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_roundtrip() {
        let value = ControlValue::new(0.25);
        assert_eq!(value.get(), 0.25);
        value.set(-1.5);
        assert_eq!(value.get(), -1.5);
        assert!(!value.to_bool());
        value.set(1.0);
        assert!(value.to_bool());
    }

    #[test]
    fn test_proxy_sees_writes() {
        let registry = ControlRegistry::new();
        let key = ConfigKey::new("[Channel1]", items::PLAY_POSITION);
        registry.set(&key, 0.1);

        let proxy = registry.proxy(&key);
        assert!(proxy.valid());
        assert_eq!(proxy.get(), 0.1);

        registry.set(&key, 0.6);
        assert_eq!(proxy.get(), 0.6, "proxy must read through to the shared value");
    }

    #[test]
    fn test_missing_control_proxy_reads_zero() {
        let registry = ControlRegistry::new();
        let proxy = registry.proxy(&ConfigKey::new("[Channel9]", "nope"));
        assert!(!proxy.valid());
        assert_eq!(proxy.get(), 0.0);
        assert!(!proxy.to_bool());
    }

    #[test]
    fn test_get_or_create_keeps_existing() {
        let registry = ControlRegistry::new();
        let key = ConfigKey::new("[Channel1]", items::SLIP_ENABLED);
        registry.set(&key, 1.0);
        let value = registry.get_or_create(&key, 0.0);
        assert_eq!(value.get(), 1.0);
    }

    #[test]
    fn test_stem_group_naming() {
        assert_eq!(items::stem_group("[Channel1]", 2), "[Channel1_Stem2]");
        assert_eq!(items::hotcue_position(3), "hotcue_3_position");
    }
}
