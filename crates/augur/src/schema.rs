//! Response schemas sent with JSON-mode requests.
//!
//! Gemini accepts an OpenAPI subset with upper-case type names. Grounded
//! requests cannot carry a schema, so weather and briefings describe their
//! shape in the prompt instead.

use serde_json::{Value, json};

pub(crate) fn sentiment_map() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "region": {"type": "STRING"},
            "overall_score": {"type": "NUMBER"},
            "dominant_mood": {"type": "STRING"},
            "hotspots": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {"type": "STRING"},
                        "latitude": {"type": "NUMBER"},
                        "longitude": {"type": "NUMBER"},
                        "score": {"type": "NUMBER"},
                        "volume": {"type": "INTEGER"},
                        "keywords": {"type": "ARRAY", "items": {"type": "STRING"}}
                    },
                    "required": ["name", "latitude", "longitude", "score"]
                }
            }
        },
        "required": ["overall_score", "hotspots"]
    })
}

pub(crate) fn signal_feed() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "signals": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": {"type": "STRING"},
                        "headline": {"type": "STRING"},
                        "category": {"type": "STRING"},
                        "intensity": {"type": "NUMBER"},
                        "velocity": {"type": "NUMBER"},
                        "region": {"type": "STRING"}
                    },
                    "required": ["headline", "intensity"]
                }
            }
        },
        "required": ["signals"]
    })
}

pub(crate) fn satellite_feed() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "sector": {"type": "STRING"},
            "passes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "designation": {"type": "STRING"},
                        "orbit": {"type": "STRING"},
                        "latitude": {"type": "NUMBER"},
                        "longitude": {"type": "NUMBER"},
                        "altitude_km": {"type": "NUMBER"},
                        "status": {"type": "STRING"}
                    },
                    "required": ["designation", "orbit"]
                }
            },
            "anomalies": {"type": "ARRAY", "items": {"type": "STRING"}}
        },
        "required": ["passes"]
    })
}

pub(crate) fn translation() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "detected_language": {"type": "STRING"},
            "translated_text": {"type": "STRING"}
        },
        "required": ["translated_text"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemas_are_objects_with_required_fields() {
        for schema in [sentiment_map(), signal_feed(), satellite_feed(), translation()] {
            assert_eq!(schema["type"], "OBJECT");
            assert!(schema["required"].as_array().is_some_and(|r| !r.is_empty()));
        }
    }
}
