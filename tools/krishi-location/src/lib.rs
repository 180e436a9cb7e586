//! Location tool.
//!
//! There is no geolocation source yet, so the tool answers with a fixed
//! record for the service's home district.

use async_trait::async_trait;
use krishi_core::{NoArgTool, Tool, ToolError};
use serde_json::{json, Value};

/// City reported by [`Location`].
pub const DEFAULT_CITY: &str = "Baroda";

/// District reported by [`Location`].
pub const DEFAULT_DISTRICT: &str = "Jamjodhpur";

/// Returns the user's location. Takes no arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Location;

impl Tool for Location {
    fn name(&self) -> &str {
        "get_location"
    }

    fn description(&self) -> &str {
        "Get the user's current location (city, district, state, coordinates). Takes no input."
    }
}

#[async_trait]
impl NoArgTool for Location {
    async fn call(&self) -> Result<Value, ToolError> {
        log::debug!("Returning static location {}, {}", DEFAULT_CITY, DEFAULT_DISTRICT);
        Ok(json!({
            "city": DEFAULT_CITY,
            "district": DEFAULT_DISTRICT,
            "state": "Gujarat",
            "country": "India",
            "coordinates": {
                "latitude": 22.3072,
                "longitude": 73.1812
            },
            "timezone": "Asia/Kolkata",
            "climate": "Semi-arid"
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishi_core::{ToolBinding, ToolInput, ToolRegistry, UnsupportedToolError};

    #[tokio::test]
    async fn test_location_record() {
        let value = Location.call().await.unwrap();
        assert_eq!(value["city"], "Baroda");
        assert_eq!(value["district"], "Jamjodhpur");
        assert_eq!(value["country"], "India");
    }

    #[tokio::test]
    async fn test_blank_input_is_accepted() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolBinding::no_arg(Location));

        let result = registry.invoke("get_location", ToolInput::text("  ")).await.unwrap();
        assert!(!result.is_error());
        assert!(result.to_observation("get_location").contains("\"city\":\"Baroda\""));
    }

    #[tokio::test]
    async fn test_real_input_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolBinding::no_arg(Location));

        let result = registry.invoke("get_location", ToolInput::text("Pune")).await;
        assert!(matches!(
            result,
            Err(UnsupportedToolError::IncompatibleParameter { .. })
        ));
    }
}
