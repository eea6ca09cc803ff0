//! Normalized in-memory catalog built once from the raw configuration
//! rows. Catalog entities are immutable reference data shared by every
//! save; they are never persisted.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::attribute::{AttrKind, Attribute, compute_attribute};
use crate::data::{CatalogData, parse_string_array};
use crate::requirement::{Requirement, parse_requirements};

/// Attribute base prices are a tenth of the sticker price.
const ATTR_BASE_PRICE_DIVISOR: i64 = 10;

/// A dealer car as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCar {
    pub id: String,
    pub name: String,
    pub car_type: String,
    pub brand: String,
    pub price: i64,
    pub acceleration: Attribute,
    pub speed: Attribute,
    pub handling: Attribute,
    /// Reward cars are granted by sponsors and never occupy a paid slot.
    pub reward: bool,
    pub total: u32,
    pub total_up: u32,
    pub default_colors: Vec<String>,
    pub categories: Vec<String>,
}

impl CatalogCar {
    #[must_use]
    pub const fn attr(&self, kind: AttrKind) -> &Attribute {
        match kind {
            AttrKind::Acceleration => &self.acceleration,
            AttrKind::Speed => &self.speed,
            AttrKind::Handling => &self.handling,
        }
    }
}

/// A race track with entry conditions and payout table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    pub duration_ms: u64,
    pub price: i64,
    /// First to third place payouts; shorter lists pay fewer places.
    pub prizes: SmallVec<[i64; 3]>,
    pub category: String,
    pub acc_weight: f32,
    pub spd_weight: f32,
    pub hnd_weight: f32,
    /// Field size including the player slot.
    pub max_slots: u32,
    pub requirements: Vec<Requirement>,
}

impl CatalogTrack {
    #[must_use]
    pub const fn weight(&self, kind: AttrKind) -> f32 {
        match kind {
            AttrKind::Acceleration => self.acc_weight,
            AttrKind::Speed => self.spd_weight,
            AttrKind::Handling => self.hnd_weight,
        }
    }
}

/// Condition for unlocking a race event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UnlockRequirement {
    pub req_type: String,
    pub value: i64,
}

/// A race event grouping tracks of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEvent {
    pub name: String,
    pub event_type: String,
    pub exp: i64,
    pub unlocked_tracks: u32,
    pub unlock: UnlockRequirement,
}

/// A sponsor offer attached to an event, possibly to a single track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sponsor {
    pub id: String,
    pub event: String,
    pub sponsor_type: String,
    pub times: u32,
    pub reward: String,
    /// Set for synthesized win-once sponsors only.
    #[serde(default)]
    pub track: Option<String>,
}

/// The full immutable catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Catalog {
    pub cars: Vec<CatalogCar>,
    pub tracks: Vec<CatalogTrack>,
    pub events: Vec<RaceEvent>,
    pub sponsors: Vec<Sponsor>,
}

fn clamp_weight(raw: f32) -> f32 {
    raw.clamp(0.0, 1.0)
}

fn build_car(raw: &crate::data::RawCar) -> CatalogCar {
    let categories = parse_string_array(&raw.categories);
    let attr_base_price = raw.price / ATTR_BASE_PRICE_DIVISOR;
    CatalogCar {
        id: raw.id.clone(),
        name: raw.name.clone(),
        car_type: raw.car_type.clone(),
        brand: raw.brand.clone(),
        price: raw.price,
        acceleration: compute_attribute(raw.acc, 1, raw.acc_ups, attr_base_price, 0),
        speed: compute_attribute(raw.spd, 1, raw.spd_ups, attr_base_price, 0),
        handling: compute_attribute(raw.hnd, 1, raw.hnd_ups, attr_base_price, 0),
        reward: categories.iter().any(|tag| tag == "reward"),
        total: raw.total,
        total_up: raw.total_up,
        default_colors: parse_string_array(&raw.default_colors),
        categories,
    }
}

fn build_track(raw: &crate::data::RawTrack) -> CatalogTrack {
    let mut prizes = SmallVec::new();
    for prize in [raw.prize_1, raw.prize_2, raw.prize_3] {
        if prize > 0 {
            prizes.push(prize);
        }
    }
    let raw_requirements = parse_string_array(&raw.requirements);
    CatalogTrack {
        id: raw.id.clone(),
        name: raw.name.clone(),
        duration_ms: raw.duration * 1000,
        price: raw.price,
        prizes,
        category: raw.category.clone(),
        acc_weight: clamp_weight(raw.acc),
        spd_weight: clamp_weight(raw.spd),
        hnd_weight: clamp_weight(raw.hnd),
        max_slots: raw.max,
        requirements: parse_requirements(raw_requirements.iter().map(String::as_str)),
    }
}

/// Combine template sponsors, literal sponsors and synthesized win-once
/// sponsors into the final sponsor list.
fn build_sponsors(
    data: &CatalogData,
    events: &[RaceEvent],
    tracks: &[CatalogTrack],
) -> Vec<Sponsor> {
    let mut sponsors = Vec::new();

    // "applies to all events" templates, cloned per event with a suffixed id.
    for event in events {
        for raw in data.sponsors.iter().filter(|s| s.event == "all") {
            sponsors.push(Sponsor {
                id: format!("{}_{}", raw.id, event.event_type),
                event: event.event_type.clone(),
                sponsor_type: raw.sponsor_type.clone(),
                times: raw.times,
                reward: raw.reward.clone(),
                track: None,
            });
        }
    }

    // Literal per-event sponsors.
    for raw in &data.sponsors {
        if !raw.event.is_empty() && raw.event != "all" {
            sponsors.push(Sponsor {
                id: raw.id.clone(),
                event: raw.event.clone(),
                sponsor_type: raw.sponsor_type.clone(),
                times: raw.times,
                reward: raw.reward.clone(),
                track: None,
            });
        }
    }

    // One win-once money sponsor per (event, track in that category).
    for event in events {
        for track in tracks.iter().filter(|t| t.category == event.event_type) {
            sponsors.push(Sponsor {
                id: format!("{}_sponsor", track.id),
                event: event.event_type.clone(),
                sponsor_type: "win".to_string(),
                times: 1,
                reward: "money".to_string(),
                track: Some(track.id.clone()),
            });
        }
    }

    sponsors
}

impl Catalog {
    /// Build the catalog from raw rows. Rows without a usable primary
    /// key are dropped; tracks additionally need a first prize and a
    /// positive duration (a zero-duration race could never settle).
    #[must_use]
    pub fn build(data: &CatalogData) -> Self {
        let cars: Vec<CatalogCar> = data
            .cars
            .iter()
            .filter(|raw| {
                if raw.id.is_empty() {
                    log::debug!("dropping car row without id ({})", raw.name);
                    return false;
                }
                true
            })
            .map(build_car)
            .collect();

        let tracks: Vec<CatalogTrack> = data
            .tracks
            .iter()
            .filter(|raw| {
                if raw.id.is_empty() || raw.prize_1 <= 0 || raw.duration == 0 {
                    log::debug!(
                        "dropping track row {:?} (missing id, first prize or duration)",
                        raw.id
                    );
                    return false;
                }
                true
            })
            .map(build_track)
            .collect();

        let events: Vec<RaceEvent> = data
            .events
            .iter()
            .filter(|raw| !raw.event_type.is_empty())
            .map(|raw| RaceEvent {
                name: raw.name.clone(),
                event_type: raw.event_type.clone(),
                exp: raw.exp,
                unlocked_tracks: raw.unlocked_tracks,
                unlock: UnlockRequirement {
                    req_type: raw.req_type.clone(),
                    value: raw.req_value,
                },
            })
            .collect();

        let sponsors = build_sponsors(data, &events, &tracks);

        Self {
            cars,
            tracks,
            events,
            sponsors,
        }
    }

    /// Load and build in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into raw rows.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::build(&CatalogData::from_json(json)?))
    }

    #[must_use]
    pub fn car(&self, car_id: &str) -> Option<&CatalogCar> {
        self.cars.iter().find(|car| car.id == car_id)
    }

    #[must_use]
    pub fn track(&self, track_id: &str) -> Option<&CatalogTrack> {
        self.tracks.iter().find(|track| track.id == track_id)
    }

    #[must_use]
    pub fn event(&self, event_type: &str) -> Option<&RaceEvent> {
        self.events.iter().find(|event| event.event_type == event_type)
    }
}

/// Shared catalog fixture for unit and integration tests.
pub mod test_fixtures {
    use super::Catalog;

    pub const SAMPLE_CATALOG_JSON: &str = r#"{
        "cars": [
            { "id": "swift", "name": "Swift 90", "type": "compact", "brand": "compact",
              "price": 1000, "acc": 120, "spd": 110, "hnd": 90,
              "acc ups": 4, "spd ups": 4, "hnd ups": 2,
              "total": 10, "total up": 10,
              "default colors": "[blue,red]", "categories": "[compact,retro]" },
            { "id": "bullet", "name": "Bullet GT", "type": "supercar", "brand": "supercar",
              "price": 20000, "acc": 210, "spd": 240, "hnd": 180,
              "acc ups": 16, "spd ups": 16, "hnd ups": 8,
              "total": 4, "total up": 40,
              "default colors": "[yellow]", "categories": "[supercar]" },
            { "id": "trophy", "name": "Trophy Star", "type": "racer", "brand": "racer",
              "price": 0, "acc": 260, "spd": 280, "hnd": 220,
              "acc ups": 0, "spd ups": 0, "hnd ups": 0,
              "default colors": "[gray]", "categories": "[reward]" },
            { "id": "", "name": "ghost row" }
        ],
        "tracks": [
            { "id": "oval", "name": "Local Oval", "duration": 60, "price": 50,
              "prize 1": 300, "prize 2": 150, "prize 3": 75,
              "category": "local", "acc": 1, "spd": 1, "hnd": 0,
              "max": 4, "requirements": "[type_compact]" },
            { "id": "stock_ring", "name": "Stock Ring", "duration": 120, "price": 100,
              "prize 1": 900, "prize 2": 400, "prize 3": 200,
              "category": "local", "acc": 0, "spd": 2, "hnd": 1,
              "max": 6, "requirements": "[no_ups]" },
            { "id": "gp_loop", "name": "GP Loop", "duration": 300, "price": 2000,
              "prize 1": 9000, "prize 2": 4000, "prize 3": 2000,
              "category": "gp", "acc": 1, "spd": 1, "hnd": 1,
              "max": 8, "requirements": "[type_supercar,attr_spd_>=_240]" },
            { "id": "no_prize", "name": "Broken Row", "duration": 10, "price": 1,
              "category": "local", "max": 2 }
        ],
        "sponsors": [
            { "id": "oilco", "event": "all", "type": "participate", "times": 5, "reward": "money" },
            { "id": "gp_fuel", "event": "gp", "type": "win", "times": 3, "reward": "money" },
            { "id": "orphan", "event": "", "type": "win", "times": 1, "reward": "money" }
        ],
        "events": [
            { "name": "Local Races", "type": "local", "exp": 100, "unlocked_tracks": 2,
              "req_type": "none", "req_value": 0 },
            { "name": "Grand Prix", "type": "gp", "exp": 1000, "unlocked_tracks": 1,
              "req_type": "money", "req_value": 10000 },
            { "name": "", "type": "" }
        ]
    }"#;

    /// Catalog built from [`SAMPLE_CATALOG_JSON`].
    ///
    /// # Panics
    ///
    /// Panics when the embedded fixture JSON is invalid.
    #[must_use]
    pub fn sample_catalog() -> Catalog {
        Catalog::from_json(SAMPLE_CATALOG_JSON).expect("fixture catalog parses")
    }
}
