//! Skin configuration for the waveform view
//!
//! A skin is a YAML document with an optional `variables` map and a
//! `waveform` node holding the per-renderer keys:
//!
//! ```yaml
//! variables:
//!   Accent: "#ff8000"
//! waveform:
//!   BgColor: "#101010"
//!   SignalColor: $Accent
//!   SlipBorderTopOutlineSize: 6
//!   MarkRange:
//!     - StartControl: loop_start_position
//!       EndControl: loop_end_position
//!       EnabledControl: loop_enabled
//!       Color: "#30ff3040"
//! ```
//!
//! String values starting with `$` are looked up in `variables`. Selectors
//! never fail: missing or malformed values fall back to the caller's
//! default, with a warning for malformed ones.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use iced::Color;
use serde_yaml::Value;

use crate::error::WaveformError;

/// One node of the skin tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinNode {
    value: Value,
}

impl SkinNode {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Parse a node from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        let value = serde_yaml::from_str(text).context("Failed to parse skin YAML")?;
        Ok(Self { value })
    }

    /// Raw value stored under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// Child node under `key`
    pub fn child(&self, key: &str) -> Option<SkinNode> {
        self.get(key).map(|value| SkinNode::new(value.clone()))
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

/// Resolution context for skin lookups
#[derive(Debug, Clone, Default)]
pub struct SkinContext {
    variables: HashMap<String, String>,
}

impl SkinContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables(variables: HashMap<String, String>) -> Self {
        Self { variables }
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Expand a `$name` reference, leaving other text unchanged
    fn resolve(&self, text: &str) -> Option<String> {
        match text.strip_prefix('$') {
            Some(name) => match self.variables.get(name) {
                Some(value) => Some(value.clone()),
                None => {
                    log::warn!("Skin: undefined variable ${}", name);
                    None
                }
            },
            None => Some(text.to_string()),
        }
    }

    /// String value under `key`; numbers and booleans are stringified
    pub fn select_string(&self, node: &SkinNode, key: &str) -> Option<String> {
        let text = match node.get(key)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => return None,
            other => {
                log::warn!("Skin: {} is not a scalar: {:?}", key, other);
                return None;
            }
        };
        self.resolve(text.trim())
    }

    /// Numeric value under `key`, or `default` when missing or malformed
    pub fn select_float(&self, node: &SkinNode, key: &str, default: f64) -> f64 {
        let Some(text) = self.select_string(node, key) else {
            return default;
        };
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => {
                log::warn!("Skin: {} = '{}' is not a number, using {}", key, text, default);
                default
            }
        }
    }

    /// Color under `key` (`#rrggbb` or `#rrggbbaa`)
    pub fn select_color(&self, node: &SkinNode, key: &str) -> Option<Color> {
        let text = self.select_string(node, key)?;
        let color = text.parse::<Color>().ok();
        if color.is_none() {
            log::warn!("Skin: {} = '{}' is not a color", key, text);
        }
        color
    }

    /// Color under `key`, or `default`
    pub fn select_color_or(&self, node: &SkinNode, key: &str, default: Color) -> Color {
        self.select_color(node, key).unwrap_or(default)
    }

    /// Child nodes of the list under `key`
    ///
    /// A single mapping is treated as a one-element list.
    pub fn select_nodes(&self, node: &SkinNode, key: &str) -> Vec<SkinNode> {
        match node.get(key) {
            Some(Value::Sequence(items)) => items.iter().cloned().map(SkinNode::new).collect(),
            Some(value @ Value::Mapping(_)) => vec![SkinNode::new(value.clone())],
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                log::warn!("Skin: {} is not a list: {:?}", key, other);
                Vec::new()
            }
        }
    }
}

/// A loaded skin: variables plus the waveform node
#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub context: SkinContext,
    pub waveform: SkinNode,
}

impl Skin {
    /// Parse a skin document
    pub fn parse(text: &str) -> Result<Self> {
        let root = SkinNode::from_yaml(text)?;
        if !root.is_null() && !root.value.is_mapping() {
            return Err(WaveformError::Skin("top level must be a mapping".to_string()).into());
        }

        let mut variables = HashMap::new();
        if let Some(Value::Mapping(map)) = root.get("variables") {
            for (name, value) in map {
                let (Some(name), Some(value)) = (name.as_str(), scalar_text(value)) else {
                    log::warn!("Skin: ignoring non-scalar variable {:?}", name);
                    continue;
                };
                variables.insert(name.to_string(), value);
            }
        }

        Ok(Self {
            context: SkinContext::with_variables(variables),
            waveform: root.child("waveform").unwrap_or_default(),
        })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Load a skin file
///
/// Returns the default (empty) skin if the file doesn't exist or can't be
/// parsed, so every renderer falls back to its built-in colors.
pub fn load_skin(path: &Path) -> Skin {
    if !path.exists() {
        log::info!("Skin file not found at {:?}, using defaults", path);
        return Skin::default();
    }

    match read_skin(path) {
        Ok(skin) => {
            log::info!("Loaded skin from {:?}", path);
            skin
        }
        Err(e) => {
            log::warn!("Failed to load skin from {:?}: {:#}, using defaults", path, e);
            Skin::default()
        }
    }
}

fn read_skin(path: &Path) -> Result<Skin> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read skin file: {:?}", path))?;
    Skin::parse(&contents)
}
