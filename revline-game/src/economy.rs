//! Upgrade pricing, purchase flows and experience allocation.

use serde::{Deserialize, Serialize};

use crate::attribute::AttrKind;
use crate::catalog::Catalog;
use crate::numbers::{floor_f64_to_i64, i64_to_f64};
use crate::state::{GameState, GarageCar, SKILL_CAP, ToastKind};
use crate::stars::{new_attr_upgrade_stars, new_garage_slot_stars};

/// Discount per allocated skill point, multiplicative on the price.
const DISCOUNT_PER_POINT: f64 = 0.05;
/// Business exp granted per 1000 money spent on a car.
const BUSINESS_EXP_DIVISOR: i64 = 1_000;
/// Mechanic exp granted per 1000 money spent on an upgrade.
const MECHANIC_EXP_DIVISOR: i64 = 1_000;
/// Sticker price of one additional garage slot, per slot already owned.
const GARAGE_SLOT_UNIT_PRICE: i64 = 5_000;

/// Price after skill discount, floored. Monotonically decreasing in the
/// skill allocation; zero points means the full price.
#[must_use]
pub fn discount_value(price: i64, skill_points: u8) -> i64 {
    let factor = 1.0 - DISCOUNT_PER_POINT * f64::from(skill_points.min(SKILL_CAP));
    floor_f64_to_i64(i64_to_f64(price) * factor)
}

/// One garage facility tier unlocked by cumulative wrenching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacilityUpgrade {
    /// Cumulative attribute upgrades required before this tier opens.
    pub required_upgrades: u32,
    pub kind: &'static str,
    pub label: &'static str,
    /// Attribute upgrade levels `[from, to)` this tier covers, when the
    /// facility gates per-level progress.
    pub interval: Option<(u32, u32)>,
}

/// Fixed facility ladder: upgrade center tiers gate how far a single
/// attribute can be pushed, the tuning center mirrors it for tuning,
/// and the garage expanse rewards a free slot.
pub const FACILITY_UPGRADES: &[FacilityUpgrade] = &[
    FacilityUpgrade {
        required_upgrades: 1,
        kind: "upgrade_center",
        label: "Upgrade Center lvl 1",
        interval: Some((1, 2)),
    },
    FacilityUpgrade {
        required_upgrades: 2,
        kind: "upgrade_center",
        label: "Upgrade Center lvl 2",
        interval: Some((2, 4)),
    },
    FacilityUpgrade {
        required_upgrades: 4,
        kind: "garage_expanse",
        label: "Garage Expanse",
        interval: None,
    },
    FacilityUpgrade {
        required_upgrades: 8,
        kind: "upgrade_center",
        label: "Upgrade Center lvl 3",
        interval: Some((4, 8)),
    },
    FacilityUpgrade {
        required_upgrades: 12,
        kind: "tuning_center",
        label: "Tuning Center lvl 1",
        interval: Some((1, 2)),
    },
    FacilityUpgrade {
        required_upgrades: 16,
        kind: "upgrade_center",
        label: "Upgrade Center lvl 4",
        interval: Some((8, 16)),
    },
    FacilityUpgrade {
        required_upgrades: 20,
        kind: "tuning_center",
        label: "Tuning Center lvl 2",
        interval: Some((2, 3)),
    },
    FacilityUpgrade {
        required_upgrades: 24,
        kind: "upgrade_center",
        label: "Upgrade Center lvl 5",
        interval: Some((16, 1000)),
    },
    FacilityUpgrade {
        required_upgrades: 28,
        kind: "tuning_center",
        label: "Tuning Center lvl 3",
        interval: Some((3, 4)),
    },
];

/// The facility tier needed to push a counter from `from_value` one
/// step further, or `None` when no tier gates that step.
#[must_use]
pub fn required_upgrade(kind: &str, from_value: u32) -> Option<&'static FacilityUpgrade> {
    FACILITY_UPGRADES.iter().find(|upgrade| {
        upgrade.kind.starts_with(kind)
            && upgrade
                .interval
                .is_some_and(|(lo, hi)| from_value >= lo && from_value < hi)
    })
}

/// Whether an attribute upgrade from `from_level` is covered by the
/// facilities the garage has earned so far.
#[must_use]
pub fn attribute_upgrade_allowed(total_upgrades: u32, from_level: u32) -> bool {
    match required_upgrade("upgrade_center", from_level) {
        None => true,
        Some(facility) => total_upgrades >= facility.required_upgrades,
    }
}

/// Buy a catalog car. Silent no-op when the car is unknown, money is
/// short after the business discount, or the garage is full.
pub fn purchase_car(
    state: &mut GameState,
    catalog: &Catalog,
    car_id: &str,
    color: Option<&str>,
    now_ms: u64,
) {
    let Some(car) = catalog.car(car_id) else {
        return;
    };
    let price = discount_value(car.price, state.experience.business.new_cars);
    if state.money < price || state.garage_full() {
        return;
    }

    let id = state.mint_id("car");
    let garage_car = GarageCar::from_catalog(car, id.clone(), color, now_ms);

    state.money -= price;
    *state.bought_cars.entry(car.id.clone()).or_insert(0) += 1;
    state.garage_cars.push(garage_car);
    state.page_notifications.garage_page = true;
    state.page_notifications.garage.push(id);
    state.experience.business.exp += (price / BUSINESS_EXP_DIVISOR).max(1);
}

/// Buy the next tier of one attribute on a garage car. No-op when the
/// car is unknown, the attribute is maxed, the facility ladder does not
/// cover the step yet, or money is short.
pub fn purchase_attribute_upgrade(state: &mut GameState, car_id: &str, kind: AttrKind) {
    let Some(car) = state.garage_car(car_id) else {
        return;
    };
    let attr = *car.attr(kind);
    let Some(price) = attr.price else {
        return;
    };
    if state.money < price || !attribute_upgrade_allowed(state.total_upgrades, attr.upgrade) {
        return;
    }

    state.money -= price;
    if let Some(car) = state.garage_car_mut(car_id) {
        *car.attr_mut(kind) = attr.upgraded();
    }
    state.total_upgrades += 1;
    state.experience.mechanic.exp += (price / MECHANIC_EXP_DIVISOR).max(1);

    let unlocked = new_attr_upgrade_stars(state.total_upgrades, &state.stars);
    for star in unlocked {
        state.push_toast("New star", &star.id, ToastKind::Reward);
        state.stars.push(star);
    }
}

/// Buy one more garage slot. Price scales with the slots already owned.
pub fn purchase_garage_slot(state: &mut GameState) {
    let price = GARAGE_SLOT_UNIT_PRICE * i64::from(state.slots_purchased);
    if state.money < price {
        return;
    }
    state.money -= price;
    state.garage_slots += 1;
    state.slots_purchased += 1;

    let unlocked = new_garage_slot_stars(state.slots_purchased, &state.stars);
    for star in unlocked {
        state.push_toast("New star", &star.id, ToastKind::Reward);
        state.stars.push(star);
    }
}

/// Which experience track a skill point is spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceTrackId {
    Business,
    Race,
    Mechanic,
}

/// A single allocatable sub-skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubSkill {
    NewCars,
    UsedCars,
    Price,
    Prizes,
    Acc,
    Spd,
    Hnd,
}

fn bump(slot: &mut u8, available: u32) {
    if available > 0 && *slot < SKILL_CAP {
        *slot += 1;
    }
}

/// Spend one available experience point on a sub-skill. A mismatched
/// track/sub-skill pair, an exhausted point budget or a capped skill
/// all leave the state unchanged.
pub fn allocate_experience_point(state: &mut GameState, track: ExperienceTrackId, sub: SubSkill) {
    match (track, sub) {
        (ExperienceTrackId::Business, SubSkill::NewCars) => {
            let available = state.experience.business.available_points();
            bump(&mut state.experience.business.new_cars, available);
        }
        (ExperienceTrackId::Business, SubSkill::UsedCars) => {
            let available = state.experience.business.available_points();
            bump(&mut state.experience.business.used_cars, available);
        }
        (ExperienceTrackId::Race, SubSkill::Price) => {
            let available = state.experience.race.available_points();
            bump(&mut state.experience.race.price, available);
        }
        (ExperienceTrackId::Race, SubSkill::Prizes) => {
            let available = state.experience.race.available_points();
            bump(&mut state.experience.race.prizes, available);
        }
        (ExperienceTrackId::Mechanic, SubSkill::Acc) => {
            let available = state.experience.mechanic.available_points();
            bump(&mut state.experience.mechanic.acc, available);
        }
        (ExperienceTrackId::Mechanic, SubSkill::Spd) => {
            let available = state.experience.mechanic.available_points();
            bump(&mut state.experience.mechanic.spd, available);
        }
        (ExperienceTrackId::Mechanic, SubSkill::Hnd) => {
            let available = state.experience.mechanic.available_points();
            bump(&mut state.experience.mechanic.hnd, available);
        }
        // e.g. spending a business point on a mechanic skill
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_fixtures::sample_catalog;

    #[test]
    fn discount_is_monotone_in_skill() {
        assert_eq!(discount_value(1000, 0), 1000);
        assert_eq!(discount_value(1000, 1), 950);
        assert_eq!(discount_value(1000, 3), 850);
        // Skill beyond the cap discounts no further.
        assert_eq!(discount_value(1000, 9), 850);
    }

    #[test]
    fn purchase_records_car_and_grants_business_exp() {
        let catalog = sample_catalog();
        let mut state = GameState::default();
        purchase_car(&mut state, &catalog, "swift", Some("red"), 7);

        assert_eq!(state.money, 500);
        assert_eq!(state.garage_cars.len(), 1);
        assert_eq!(state.bought_cars.get("swift"), Some(&1));
        assert!(state.page_notifications.garage_page);
        assert_eq!(state.page_notifications.garage.len(), 1);
        assert_eq!(state.experience.business.exp, 1);
        assert_eq!(state.garage_cars[0].color, "red");
    }

    #[test]
    fn purchase_rejected_when_short_on_money() {
        let catalog = sample_catalog();
        let mut state = GameState {
            money: 500,
            ..GameState::default()
        };
        purchase_car(&mut state, &catalog, "swift", None, 0);
        assert_eq!(state.money, 500);
        assert!(state.garage_cars.is_empty());
        assert!(state.bought_cars.is_empty());
    }

    #[test]
    fn purchase_rejected_when_garage_full() {
        let catalog = sample_catalog();
        let mut state = GameState {
            money: 1_000_000,
            garage_slots: 1,
            ..GameState::default()
        };
        purchase_car(&mut state, &catalog, "swift", None, 0);
        purchase_car(&mut state, &catalog, "swift", None, 0);
        assert_eq!(state.garage_cars.len(), 1);
    }

    #[test]
    fn unknown_car_is_a_no_op() {
        let catalog = sample_catalog();
        let mut state = GameState::default();
        purchase_car(&mut state, &catalog, "vaporware", None, 0);
        assert_eq!(state.money, GameState::default().money);
    }

    #[test]
    fn business_discount_applies_to_purchase() {
        let catalog = sample_catalog();
        let mut state = GameState::default();
        state.experience.business.new_cars = 2;
        purchase_car(&mut state, &catalog, "swift", None, 0);
        assert_eq!(state.money, 1_500 - 900);
    }

    #[test]
    fn attribute_upgrade_spends_and_counts() {
        let catalog = sample_catalog();
        let mut state = GameState {
            money: 10_000,
            ..GameState::default()
        };
        purchase_car(&mut state, &catalog, "swift", None, 0);
        let car_id = state.garage_cars[0].id.clone();
        let price = state.garage_cars[0].speed.price.unwrap();

        let money_before = state.money;
        purchase_attribute_upgrade(&mut state, &car_id, AttrKind::Speed);
        assert_eq!(state.money, money_before - price);
        assert_eq!(state.garage_cars[0].speed.upgrade, 1);
        assert_eq!(state.total_upgrades, 1);
        assert!(state.experience.mechanic.exp >= 1);
    }

    #[test]
    fn maxed_attribute_upgrade_is_a_no_op() {
        let catalog = sample_catalog();
        let mut state = GameState {
            money: 10_000_000,
            ..GameState::default()
        };
        purchase_car(&mut state, &catalog, "swift", None, 0);
        let car_id = state.garage_cars[0].id.clone();
        // Handling maxes at 2; pushing past it must do nothing.
        for _ in 0..5 {
            purchase_attribute_upgrade(&mut state, &car_id, AttrKind::Handling);
        }
        assert_eq!(state.garage_cars[0].handling.upgrade, 2);
        assert_eq!(state.total_upgrades, 2);
    }

    #[test]
    fn facility_ladder_gates_deep_upgrades() {
        // Pushing an attribute from level 2 needs Upgrade Center lvl 2,
        // which opens after 2 cumulative upgrades.
        assert!(attribute_upgrade_allowed(0, 0));
        assert!(attribute_upgrade_allowed(1, 1));
        assert!(!attribute_upgrade_allowed(1, 2));
        assert!(attribute_upgrade_allowed(2, 2));
        assert!(!attribute_upgrade_allowed(7, 8));
        assert!(attribute_upgrade_allowed(16, 8));
        let facility = required_upgrade("upgrade_center", 16).unwrap();
        assert_eq!(facility.label, "Upgrade Center lvl 5");
        assert!(required_upgrade("upgrade_center", 0).is_none());
    }

    #[test]
    fn garage_slot_purchase_awards_stars() {
        let mut state = GameState {
            money: 1_000_000,
            ..GameState::default()
        };
        purchase_garage_slot(&mut state);
        assert_eq!(state.garage_slots, 3);
        assert_eq!(state.slots_purchased, 3);
        assert!(state.stars.iter().any(|s| s.threshold == 3));
        // Broke player: nothing changes.
        state.money = 0;
        purchase_garage_slot(&mut state);
        assert_eq!(state.garage_slots, 3);
    }

    #[test]
    fn experience_allocation_respects_budget_and_cap() {
        let mut state = GameState::default();
        state.experience.race.exp = 150; // 3 digits -> 2 points
        allocate_experience_point(&mut state, ExperienceTrackId::Race, SubSkill::Price);
        allocate_experience_point(&mut state, ExperienceTrackId::Race, SubSkill::Prizes);
        assert_eq!(state.experience.race.price, 1);
        assert_eq!(state.experience.race.prizes, 1);
        // Budget exhausted: no-op.
        allocate_experience_point(&mut state, ExperienceTrackId::Race, SubSkill::Price);
        assert_eq!(state.experience.race.price, 1);
    }

    #[test]
    fn experience_allocation_caps_per_skill() {
        let mut state = GameState::default();
        state.experience.business.exp = 99_999_999; // plenty of points
        for _ in 0..5 {
            allocate_experience_point(&mut state, ExperienceTrackId::Business, SubSkill::NewCars);
        }
        assert_eq!(state.experience.business.new_cars, SKILL_CAP);
    }

    #[test]
    fn mismatched_track_and_skill_is_a_no_op() {
        let mut state = GameState::default();
        state.experience.business.exp = 1_000;
        allocate_experience_point(&mut state, ExperienceTrackId::Business, SubSkill::Acc);
        assert_eq!(state.experience.business.new_cars, 0);
        assert_eq!(state.experience.business.used_cars, 0);
        assert_eq!(state.experience.mechanic.acc, 0);
    }
}
