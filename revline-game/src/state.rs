//! Player save state: the aggregate root owned by the reducer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::attribute::{AttrKind, Attribute};
use crate::catalog::CatalogCar;
use crate::numbers::{digit_len, floor_f64_to_i64, i64_to_f64};
use crate::race::{PastRace, Race};
use crate::stars::Star;

/// Current snapshot schema. Bump together with an entry in
/// [`crate::save::MIGRATIONS`].
pub const SCHEMA_VERSION: u32 = 3;
/// Snapshots older than this are discarded rather than migrated.
pub const MIN_SUPPORTED_VERSION: u32 = 2;

/// Starting cash for a fresh save.
pub const STARTING_MONEY: i64 = 1_500;
/// Paid garage slots available before any expansion.
pub const STARTING_GARAGE_SLOTS: u32 = 2;
/// A purchased car immediately loses half its sticker price.
pub const CAR_DEVALUATION: f64 = 0.5;
/// Resale value gained per purchased attribute upgrade.
pub const RESALE_PER_UPGRADE: i64 = 200;
/// Allocation ceiling for every experience sub-skill.
pub const SKILL_CAP: u8 = 3;

/// Colors a purchased car may be painted in.
pub const AVAILABLE_COLORS: [&str; 11] = [
    "blue",
    "darkgray",
    "gray",
    "green",
    "lightblue",
    "lightgray",
    "orange",
    "pink",
    "purple",
    "red",
    "yellow",
];

/// Per-attribute tuning offsets. Always zero at purchase; reserved for
/// the tuning center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Tuning {
    pub acc: i64,
    pub spd: i64,
    pub hnd: i64,
}

/// A purchased car in the player's garage. Never deleted once owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarageCar {
    pub id: String,
    /// Catalog car this instance was bought from.
    pub dealer_car: String,
    pub name: String,
    pub car_type: String,
    pub brand: String,
    pub acceleration: Attribute,
    pub speed: Attribute,
    pub handling: Attribute,
    pub tuning: Tuning,
    /// Devalued purchase price, the base for resale valuation.
    pub price: i64,
    pub color: String,
    /// Acquisition wall-clock timestamp (ms).
    pub timestamp: u64,
    /// Id of the race this car is currently entered in, if any.
    #[serde(default)]
    pub race: Option<String>,
    pub reward: bool,
    pub categories: Vec<String>,
}

impl GarageCar {
    /// Derive a fresh garage instance from a catalog car. Attribute
    /// copies start at the catalog's upgrade level 0.
    #[must_use]
    pub fn from_catalog(car: &CatalogCar, id: String, color: Option<&str>, now_ms: u64) -> Self {
        let color = color
            .map(str::to_string)
            .or_else(|| car.default_colors.first().cloned())
            .unwrap_or_else(|| "gray".to_string());
        Self {
            id,
            dealer_car: car.id.clone(),
            name: car.name.clone(),
            car_type: car.car_type.clone(),
            brand: car.brand.clone(),
            acceleration: car.acceleration,
            speed: car.speed,
            handling: car.handling,
            tuning: Tuning::default(),
            price: floor_f64_to_i64(i64_to_f64(car.price) * CAR_DEVALUATION),
            color,
            timestamp: now_ms,
            race: None,
            reward: car.reward,
            categories: car.categories.clone(),
        }
    }

    #[must_use]
    pub const fn attr(&self, kind: AttrKind) -> &Attribute {
        match kind {
            AttrKind::Acceleration => &self.acceleration,
            AttrKind::Speed => &self.speed,
            AttrKind::Handling => &self.handling,
        }
    }

    pub const fn attr_mut(&mut self, kind: AttrKind) -> &mut Attribute {
        match kind {
            AttrKind::Acceleration => &mut self.acceleration,
            AttrKind::Speed => &mut self.speed,
            AttrKind::Handling => &mut self.handling,
        }
    }

    /// Purchased upgrades across all three attributes.
    #[must_use]
    pub fn upgrades_total(&self) -> u32 {
        AttrKind::ALL
            .iter()
            .map(|&kind| self.attr(kind).upgrade)
            .sum()
    }

    /// Current valuation: devalued purchase price plus a fixed amount
    /// per purchased upgrade.
    #[must_use]
    pub fn resale_value(&self) -> i64 {
        self.price + RESALE_PER_UPGRADE * i64::from(self.upgrades_total())
    }
}

/// Business experience: discounts on dealer purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BusinessExperience {
    pub exp: i64,
    #[serde(default)]
    pub new_cars: u8,
    #[serde(default)]
    pub used_cars: u8,
}

/// Race experience: entry fee and prize multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RaceExperience {
    pub exp: i64,
    #[serde(default)]
    pub price: u8,
    #[serde(default)]
    pub prizes: u8,
}

/// Mechanic experience: per-attribute upgrade perks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MechanicExperience {
    pub exp: i64,
    #[serde(default)]
    pub acc: u8,
    #[serde(default)]
    pub spd: u8,
    #[serde(default)]
    pub hnd: u8,
}

/// The three experience tracks. Points become available one per order
/// of magnitude of accumulated exp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Experience {
    #[serde(default)]
    pub business: BusinessExperience,
    #[serde(default)]
    pub race: RaceExperience,
    #[serde(default)]
    pub mechanic: MechanicExperience,
}

/// `digit_len(exp) - 1 - spent`, floored at zero.
#[must_use]
pub fn available_points(exp: i64, spent: u32) -> u32 {
    (digit_len(exp) - 1).saturating_sub(spent)
}

impl BusinessExperience {
    #[must_use]
    pub fn available_points(&self) -> u32 {
        available_points(self.exp, u32::from(self.new_cars) + u32::from(self.used_cars))
    }
}

impl RaceExperience {
    #[must_use]
    pub fn available_points(&self) -> u32 {
        available_points(self.exp, u32::from(self.price) + u32::from(self.prizes))
    }
}

impl MechanicExperience {
    #[must_use]
    pub fn available_points(&self) -> u32 {
        available_points(
            self.exp,
            u32::from(self.acc) + u32::from(self.spd) + u32::from(self.hnd),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Info,
    Warning,
    Reward,
    RaceResult,
}

/// Transient notification; removed explicitly by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toast {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub kind: ToastKind,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// Badge state for the garage page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageNotifications {
    #[serde(default)]
    pub garage_page: bool,
    /// Garage car ids the player has not inspected yet.
    #[serde(default)]
    pub garage: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tutorial {
    #[serde(default = "default_true")]
    pub win_chance: bool,
    #[serde(default = "default_true")]
    pub upgrade: bool,
}

impl Default for Tutorial {
    fn default() -> Self {
        Self {
            win_chance: true,
            upgrade: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locked {
    #[serde(default = "default_true")]
    pub tuning: bool,
    #[serde(default = "default_true")]
    pub sponsors: bool,
}

impl Default for Locked {
    fn default() -> Self {
        Self {
            tuning: true,
            sponsors: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Races finished and money earned while the process was away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OfflineEarnings {
    pub races: u32,
    pub money: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Warnings {
    /// Set once when a stale snapshot was discarded on load.
    #[serde(default)]
    pub store_reset: bool,
    #[serde(default)]
    pub offline_earnings: OfflineEarnings,
}

/// The aggregate root. Mutated only through dispatched actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub version: u32,
    pub money: i64,
    pub garage_slots: u32,
    #[serde(default)]
    pub garage_cars: Vec<GarageCar>,
    #[serde(default)]
    pub races: Vec<Race>,
    #[serde(default)]
    pub past_races: Vec<PastRace>,
    /// Catalog car id -> purchase count.
    #[serde(default)]
    pub bought_cars: BTreeMap<String, u32>,
    /// Cumulative attribute upgrades purchased across the garage.
    #[serde(default)]
    pub total_upgrades: u32,
    /// Cumulative paid garage slots, including the starting ones.
    #[serde(default)]
    pub slots_purchased: u32,
    #[serde(default)]
    pub experience: Experience,
    #[serde(default)]
    pub page_notifications: PageNotifications,
    #[serde(default)]
    pub tutorial: Tutorial,
    #[serde(default)]
    pub locked: Locked,
    #[serde(default)]
    pub warnings: Warnings,
    #[serde(default)]
    pub toasts: Vec<Toast>,
    #[serde(default)]
    pub stars: Vec<Star>,
    /// Sponsor id -> times the sponsor has paid out.
    #[serde(default)]
    pub sponsor_payouts: BTreeMap<String, u32>,
    /// Monotonic id source for garage cars, races and toasts.
    #[serde(default)]
    pub next_id: u64,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            money: STARTING_MONEY,
            garage_slots: STARTING_GARAGE_SLOTS,
            garage_cars: Vec::new(),
            races: Vec::new(),
            past_races: Vec::new(),
            bought_cars: BTreeMap::new(),
            total_upgrades: 0,
            slots_purchased: STARTING_GARAGE_SLOTS,
            experience: Experience::default(),
            page_notifications: PageNotifications::default(),
            tutorial: Tutorial::default(),
            locked: Locked::default(),
            warnings: Warnings::default(),
            toasts: Vec::new(),
            stars: Vec::new(),
            sponsor_payouts: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl GameState {
    /// Mint a unique id with a type prefix, e.g. `race-7`.
    pub fn mint_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    #[must_use]
    pub fn garage_car(&self, car_id: &str) -> Option<&GarageCar> {
        self.garage_cars.iter().find(|car| car.id == car_id)
    }

    pub fn garage_car_mut(&mut self, car_id: &str) -> Option<&mut GarageCar> {
        self.garage_cars.iter_mut().find(|car| car.id == car_id)
    }

    #[must_use]
    pub fn race(&self, race_id: &str) -> Option<&Race> {
        self.races.iter().find(|race| race.id == race_id)
    }

    #[must_use]
    pub fn race_for_car(&self, car_id: &str) -> Option<&Race> {
        self.races.iter().find(|race| race.car == car_id)
    }

    #[must_use]
    pub fn race_for_track(&self, track_id: &str) -> Option<&Race> {
        self.races.iter().find(|race| race.track == track_id)
    }

    /// Owned cars that occupy a paid slot (reward cars do not).
    #[must_use]
    pub fn occupied_slots(&self) -> u32 {
        let rewarded = self.garage_cars.iter().filter(|car| car.reward).count();
        u32::try_from(self.garage_cars.len() - rewarded).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn garage_full(&self) -> bool {
        self.occupied_slots() >= self.garage_slots
    }

    pub fn push_toast(&mut self, title: &str, subtitle: &str, kind: ToastKind) {
        let id = self.mint_id("toast");
        self.toasts.push(Toast {
            id,
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            kind,
            extra: BTreeMap::new(),
        });
    }
}
