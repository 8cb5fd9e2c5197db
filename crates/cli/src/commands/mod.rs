//! CLI Commands

pub mod health;
pub mod run;
pub mod start;
pub mod templates;

use serde_json::Value;
use zypin_selenium_common::ConfigLayer;

/// Builds a per-call override layer from optional flags
#[derive(Default)]
pub(crate) struct Overrides(ConfigLayer);

impl Overrides {
    pub(crate) fn set(mut self, key: &str, value: Option<impl Into<Value>>) -> Self {
        if let Some(value) = value {
            self.0.insert(key.to_string(), value.into());
        }
        self
    }

    pub(crate) fn into_layer(self) -> ConfigLayer {
        self.0
    }
}
