//! Container configuration model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Root configuration for a Rivet container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RivetConfig {
    /// Parameters seeded into the container's parameter store.
    pub parameters: Map<String, Value>,
    /// Whether re-registering an existing service id logs a warning.
    pub warn_on_overwrite: bool,
}

impl RivetConfig {
    /// Parses a configuration from JSON text.
    ///
    /// Missing fields take their default value.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid configuration document.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

impl Default for RivetConfig {
    fn default() -> Self {
        Self {
            parameters: Map::new(),
            warn_on_overwrite: true,
        }
    }
}
