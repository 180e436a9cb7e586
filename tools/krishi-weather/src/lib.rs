//! Weather tool backed by deterministic mock data.
//!
//! Readings are derived from a hash of the location name, so the same
//! location always reports the same weather and tests can rely on it.

use async_trait::async_trait;
use krishi_core::{KeywordTool, Tool, ToolError};
use serde_json::{json, Map, Value};

/// Location used when none is given.
pub const DEFAULT_LOCATION: &str = "Baroda, Jamjodhpur";

const CONDITIONS: &[&str] = &["Sunny", "Partly Cloudy", "Cloudy", "Light Rain"];

/// Current conditions and a two-day forecast for a location.
///
/// Keyword parameters: `location` (optional).
#[derive(Debug, Clone, Copy, Default)]
pub struct Weather;

impl Tool for Weather {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get current weather and a short forecast. Input: {\"location\": \"<place>\"}; \
         defaults to the user's home district when omitted."
    }
}

#[async_trait]
impl KeywordTool for Weather {
    fn parameters(&self) -> &[&str] {
        &["location"]
    }

    async fn call(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let location = match args.get("location") {
            None | Some(Value::Null) => DEFAULT_LOCATION.to_string(),
            Some(Value::String(s)) if s.trim().is_empty() => DEFAULT_LOCATION.to_string(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => {
                return Err(ToolError::InvalidInput(format!(
                    "location must be a string, got {}",
                    other
                )))
            }
        };

        log::debug!("Mock weather for '{}'", location);
        Ok(report(&location))
    }
}

/// FNV-1a over the case-folded name.
fn seed(location: &str) -> u64 {
    location
        .to_lowercase()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        })
}

/// A value in `low..=high` picked by `seed` and `salt`.
fn pick(seed: u64, salt: u64, low: i64, high: i64) -> i64 {
    let mixed = seed.rotate_left((salt * 7) as u32) ^ salt.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    low + (mixed % (high - low + 1) as u64) as i64
}

fn report(location: &str) -> Value {
    let seed = seed(location);
    json!({
        "location": location,
        "temperature": {
            "current": pick(seed, 1, 25, 35),
            "feels_like": pick(seed, 2, 27, 38),
            "min": pick(seed, 3, 20, 25),
            "max": pick(seed, 4, 35, 42)
        },
        "humidity": pick(seed, 5, 40, 80),
        "wind_speed": pick(seed, 6, 5, 20),
        "conditions": CONDITIONS[pick(seed, 7, 0, CONDITIONS.len() as i64 - 1) as usize],
        "visibility": "10 km",
        "uv_index": pick(seed, 8, 3, 8),
        "forecast": [
            {
                "day": "Today",
                "high": pick(seed, 9, 35, 42),
                "low": pick(seed, 10, 20, 25),
                "condition": "Sunny"
            },
            {
                "day": "Tomorrow",
                "high": pick(seed, 11, 33, 40),
                "low": pick(seed, 12, 22, 27),
                "condition": "Partly Cloudy"
            }
        ]
    })
}
