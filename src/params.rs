// src/params.rs
//
// Persisted configuration store. A flat key → string map loaded from YAML;
// toggles read as bools, geometry widths as scaled-integer strings.
// Numeric values are expected to always be well-formed — a parse failure
// here would silently change rendered road geometry if defaulted, so it
// propagates as a fatal error instead.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone, Default)]
pub struct Params {
    map: HashMap<String, String>,
}

impl Params {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading params file {path}"))?;
        let map: HashMap<String, String> =
            serde_yaml::from_str(&contents).with_context(|| format!("parsing {path}"))?;
        Ok(Self { map })
    }

    /// Build a store from literal pairs. Used by tests and the demo feed.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            map: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Result<&str> {
        self.map
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing param {key}"))
    }

    /// Toggles default to off when absent.
    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.map.get(key).map(String::as_str), Some("1" | "true"))
    }

    pub fn get_f32(&self, key: &str) -> Result<f32> {
        self.get(key)?
            .parse::<f32>()
            .with_context(|| format!("param {key} is not a number"))
    }

    pub fn get_i32(&self, key: &str) -> Result<i32> {
        self.get(key)?
            .parse::<i32>()
            .with_context(|| format!("param {key} is not an integer"))
    }
}
