//! Raw static configuration rows as shipped in the asset JSON files.
//!
//! Rows are deliberately loose (`#[serde(default)]` everywhere) so a
//! half-filled spreadsheet export still parses; the catalog builder is
//! responsible for dropping rows that lack a usable primary key.

use serde::{Deserialize, Serialize};

/// A car row from `cars.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawCar {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub car_type: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub acc: i64,
    #[serde(default)]
    pub spd: i64,
    #[serde(default)]
    pub hnd: i64,
    #[serde(default, rename = "acc ups")]
    pub acc_ups: u32,
    #[serde(default, rename = "spd ups")]
    pub spd_ups: u32,
    #[serde(default, rename = "hnd ups")]
    pub hnd_ups: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default, rename = "total up")]
    pub total_up: u32,
    /// Bracket-wrapped comma list, e.g. `[blue,red]`.
    #[serde(default, rename = "default colors")]
    pub default_colors: String,
    /// Bracket-wrapped comma list of category tags.
    #[serde(default)]
    pub categories: String,
}

/// A track row from `tracks.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawTrack {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Seconds; the catalog converts to milliseconds.
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub price: i64,
    #[serde(default, rename = "prize 1")]
    pub prize_1: i64,
    #[serde(default, rename = "prize 2")]
    pub prize_2: i64,
    #[serde(default, rename = "prize 3")]
    pub prize_3: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub acc: f32,
    #[serde(default)]
    pub spd: f32,
    #[serde(default)]
    pub hnd: f32,
    /// Field size including the player slot.
    #[serde(default)]
    pub max: u32,
    /// Bracket-wrapped comma list of requirement strings.
    #[serde(default)]
    pub requirements: String,
}

/// A sponsor row from `sponsors.json`. `event == "all"` rows are
/// templates that the catalog clones once per race event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawSponsor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub event: String,
    #[serde(default, rename = "type")]
    pub sponsor_type: String,
    #[serde(default)]
    pub times: u32,
    #[serde(default)]
    pub reward: String,
}

/// A race-event row from `events.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawEvent {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub exp: i64,
    #[serde(default)]
    pub unlocked_tracks: u32,
    #[serde(default)]
    pub req_type: String,
    #[serde(default)]
    pub req_value: i64,
}

/// Container for all raw configuration rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CatalogData {
    #[serde(default)]
    pub cars: Vec<RawCar>,
    #[serde(default)]
    pub tracks: Vec<RawTrack>,
    #[serde(default)]
    pub sponsors: Vec<RawSponsor>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

impl CatalogData {
    /// Create empty catalog data (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load catalog data from JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into valid rows.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Parse a bracket-or-quote-wrapped comma list (`[a,b,c]`) into its
/// entries. Empty entries are dropped; whitespace inside entries is kept
/// (the sheets never contain any).
#[must_use]
pub fn parse_string_array(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix(['[', '"', '\''])
        .unwrap_or(trimmed)
        .strip_suffix([']', '"', '\''])
        .unwrap_or(trimmed);
    inner
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_array_strips_wrappers() {
        assert_eq!(parse_string_array("[retro,reward]"), vec!["retro", "reward"]);
        assert_eq!(parse_string_array("\"blue,red\""), vec!["blue", "red"]);
        assert!(parse_string_array("[]").is_empty());
        assert!(parse_string_array("").is_empty());
    }

    #[test]
    fn catalog_data_from_json_defaults_missing_fields() {
        let json = r#"{
            "cars": [
                { "id": "c1", "name": "Minnow", "type": "compact", "price": 1000,
                  "acc": 120, "spd": 110, "hnd": 90,
                  "acc ups": 4, "spd ups": 4, "hnd ups": 2,
                  "default colors": "[blue]", "categories": "[compact]" }
            ],
            "tracks": [
                { "id": "t1", "name": "Oval", "duration": 60, "price": 50,
                  "prize 1": 300, "prize 2": 150, "prize 3": 75,
                  "category": "local", "acc": 1, "spd": 1, "hnd": 0,
                  "max": 4, "requirements": "[type_compact]" }
            ]
        }"#;

        let data = CatalogData::from_json(json).unwrap();
        assert_eq!(data.cars.len(), 1);
        assert_eq!(data.cars[0].acc_ups, 4);
        assert_eq!(data.tracks[0].prize_1, 300);
        assert!(data.sponsors.is_empty());
        assert!(data.events.is_empty());
    }
}
