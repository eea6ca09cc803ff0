//! Dispatched commands and the reduction pipeline.
//!
//! `reduce` is total: every branch returns with the state valid, and
//! every invalid command (missing id, short funds, unmet requirement)
//! is a silent no-op. The three sub-reducers are applied in a fixed
//! order and partition the action space, so no two of them ever touch
//! the same field for the same action.

use serde::{Deserialize, Serialize};

use crate::attribute::AttrKind;
use crate::catalog::Catalog;
use crate::economy::{
    ExperienceTrackId, SubSkill, allocate_experience_point, discount_value, purchase_attribute_upgrade,
    purchase_car, purchase_garage_slot,
};
use crate::race::{PastRace, Race, RaceOutcome, RaceScoring};
use crate::requirement::meets_requirements;
use crate::state::{GameState, ToastKind};

/// Every mutation of the save state enters through one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    BuyCar {
        car_id: String,
        #[serde(default)]
        color: Option<String>,
    },
    UpgradeAttribute {
        car_id: String,
        attr: AttrKind,
    },
    BuyGarageSlot,
    AllocateExperiencePoint {
        track: ExperienceTrackId,
        sub: SubSkill,
    },
    StartRace {
        car_id: String,
        track_id: String,
        #[serde(default)]
        auto: bool,
    },
    StopRace {
        race_id: String,
    },
    ResetRace {
        race_id: String,
        #[serde(default)]
        resets: Option<u32>,
    },
    /// Flip a finished race's results to acknowledged.
    AcknowledgeRace {
        past_race_id: String,
    },
    /// Settle every race whose duration has elapsed by `now`.
    Tick,
    DismissToast {
        toast_id: String,
    },
    ClearGarageNotifications,
    DisableTutorialWinChance,
    DisableTutorialUpgrade,
    ClearStoreResetWarning,
    ClearOfflineEarnings,
    /// Full reset to the default initial state.
    Reset,
    /// Replace the state with an externally loaded, already-migrated
    /// snapshot.
    LoadState {
        state: Box<GameState>,
    },
    /// Development-only partial overlay over the default state.
    ForceState {
        overlay: serde_json::Value,
    },
}

/// Apply one action. `now_ms` is the caller's wall clock; the reducer
/// itself never reads time.
pub fn reduce(
    state: &mut GameState,
    catalog: &Catalog,
    scorer: &dyn RaceScoring,
    action: &Action,
    now_ms: u64,
) {
    reduce_core(state, action);
    reduce_garage(state, catalog, action, now_ms);
    reduce_race(state, catalog, scorer, action, now_ms);
}

/// Economy-free bookkeeping: resets, toasts, flags, experience points.
fn reduce_core(state: &mut GameState, action: &Action) {
    match action {
        Action::Reset => {
            *state = GameState::default();
        }
        Action::LoadState { state: loaded } => {
            *state = (**loaded).clone();
        }
        Action::ForceState { overlay } => {
            if let Some(forced) = crate::save::overlay_default_state(overlay) {
                *state = forced;
            }
        }
        Action::AllocateExperiencePoint { track, sub } => {
            allocate_experience_point(state, *track, *sub);
        }
        Action::DismissToast { toast_id } => {
            state.toasts.retain(|toast| toast.id != *toast_id);
        }
        Action::ClearGarageNotifications => {
            state.page_notifications.garage_page = false;
            state.page_notifications.garage.clear();
        }
        Action::DisableTutorialWinChance => {
            state.tutorial.win_chance = false;
        }
        Action::DisableTutorialUpgrade => {
            state.tutorial.upgrade = false;
        }
        Action::ClearStoreResetWarning => {
            state.warnings.store_reset = false;
        }
        Action::ClearOfflineEarnings => {
            state.warnings.offline_earnings = Default::default();
        }
        _ => {}
    }
}

/// Dealer and workshop purchases.
fn reduce_garage(state: &mut GameState, catalog: &Catalog, action: &Action, now_ms: u64) {
    match action {
        Action::BuyCar { car_id, color } => {
            purchase_car(state, catalog, car_id, color.as_deref(), now_ms);
        }
        Action::UpgradeAttribute { car_id, attr } => {
            purchase_attribute_upgrade(state, car_id, *attr);
        }
        Action::BuyGarageSlot => {
            purchase_garage_slot(state);
        }
        _ => {}
    }
}

/// Race lifecycle transitions.
fn reduce_race(
    state: &mut GameState,
    catalog: &Catalog,
    scorer: &dyn RaceScoring,
    action: &Action,
    now_ms: u64,
) {
    match action {
        Action::StartRace {
            car_id,
            track_id,
            auto,
        } => start_race(state, catalog, car_id, track_id, *auto, now_ms),
        Action::StopRace { race_id } => stop_race(state, race_id),
        Action::ResetRace { race_id, resets } => {
            if let Some(race) = state.races.iter_mut().find(|race| race.id == *race_id) {
                race.reset(now_ms, *resets);
            }
        }
        Action::AcknowledgeRace { past_race_id } => {
            if let Some(past) = state
                .past_races
                .iter_mut()
                .find(|past| past.id == *past_race_id)
            {
                past.checked = true;
            }
        }
        Action::Tick => tick(state, catalog, scorer, now_ms),
        _ => {}
    }
}

fn start_race(
    state: &mut GameState,
    catalog: &Catalog,
    car_id: &str,
    track_id: &str,
    auto: bool,
    now_ms: u64,
) {
    let Some(track) = catalog.track(track_id) else {
        return;
    };
    if state.race_for_car(car_id).is_some() || state.race_for_track(track_id).is_some() {
        return;
    }
    let Some(car) = state.garage_car(car_id) else {
        return;
    };
    if !meets_requirements(car, &track.requirements) {
        return;
    }
    let entry_fee = discount_value(track.price, state.experience.race.price);
    if state.money < entry_fee {
        return;
    }

    state.money -= entry_fee;
    let race_id = state.mint_id("race");
    state.races.push(Race::new(race_id.clone(), car_id, track, now_ms, auto));
    if let Some(car) = state.garage_car_mut(car_id) {
        car.race = Some(race_id);
    }
}

fn stop_race(state: &mut GameState, race_id: &str) {
    let Some(index) = state.races.iter().position(|race| race.id == *race_id) else {
        return;
    };
    let race = state.races.remove(index);
    if let Some(car) = state.garage_car_mut(&race.car) {
        car.race = None;
    }
}

/// Record a finished lap: past race, prize money, race experience and
/// any win-once sponsor payout. Returns the money earned.
fn settle_outcome(
    state: &mut GameState,
    catalog: &Catalog,
    race: &Race,
    outcome: &RaceOutcome,
    checked: bool,
    now_ms: u64,
) -> i64 {
    let Some(car) = state.garage_car(&race.car) else {
        return 0;
    };
    let dealer_car = car.dealer_car.clone();
    let reward = car.reward;
    let Some(track) = catalog.track(&race.track) else {
        return 0;
    };

    let mut earned: i64 = outcome.prizes.iter().sum();

    // Win-once sponsor for this track, if any payouts remain.
    if outcome.position == 1 {
        let sponsor_id = format!("{}_sponsor", track.id);
        if let Some(sponsor) = catalog.sponsors.iter().find(|s| s.id == sponsor_id) {
            let paid = state.sponsor_payouts.get(&sponsor_id).copied().unwrap_or(0);
            if paid < sponsor.times {
                let bonus = track.prizes.first().copied().unwrap_or(0) / 2;
                earned += bonus;
                *state.sponsor_payouts.entry(sponsor_id).or_insert(0) += 1;
                state.push_toast("Sponsor payout", &sponsor.id, ToastKind::Reward);
            }
        }
    }

    let exp_gain = catalog
        .event(&track.category)
        .map_or(1, |event| (event.exp / i64::from(outcome.position) / 10).max(1));

    state.money += earned;
    state.experience.race.exp += exp_gain;

    let id = state.mint_id("pastrace");
    state.past_races.push(PastRace {
        id,
        race: race.id.clone(),
        car: race.car.clone(),
        dealer_car,
        track: race.track.clone(),
        timestamp: now_ms,
        checked,
        reward,
        position: outcome.position,
        results: outcome.results.clone(),
        prizes: outcome.prizes.clone(),
    });

    earned
}

/// Settle every due race. Auto races replay lap by lap (each lap gets
/// its own deterministic outcome); manual races wait for the player to
/// acknowledge their results. More than one settlement in a single tick
/// means the process was away, which feeds the offline-earnings
/// warning.
fn tick(state: &mut GameState, catalog: &Catalog, scorer: &dyn RaceScoring, now_ms: u64) {
    let due: Vec<String> = state
        .races
        .iter()
        .filter(|race| race.is_due(now_ms))
        .map(|race| race.id.clone())
        .collect();

    let mut settled: u32 = 0;
    let mut settled_money: i64 = 0;

    for race_id in due {
        loop {
            let Some(race) = state.race(&race_id).cloned() else {
                break;
            };
            if !race.is_due(now_ms) || race.duration_ms == 0 {
                break;
            }

            let requirements_hold = state.garage_car(&race.car).is_some_and(|car| {
                catalog
                    .track(&race.track)
                    .is_some_and(|track| meets_requirements(car, &track.requirements))
            });

            if race.auto && !requirements_hold {
                // A detuned or upgraded car must not loop silently.
                stop_race(state, &race_id);
                state.push_toast(
                    "Auto race stopped",
                    "car no longer meets the track requirements",
                    ToastKind::Warning,
                );
                break;
            }

            let outcome = match (state.garage_car(&race.car), catalog.track(&race.track)) {
                (Some(car), Some(track)) => {
                    scorer.score(car, track, &race, state.experience.race.prizes)
                }
                // Referenced ids vanished (imported save); drop the race.
                _ => {
                    stop_race(state, &race_id);
                    break;
                }
            };

            if race.auto {
                settled_money += settle_outcome(state, catalog, &race, &outcome, true, now_ms);
                settled += 1;
                if let Some(live) = state.races.iter_mut().find(|r| r.id == race_id) {
                    // Advance by exactly one lap so catch-up laps keep
                    // their original phase.
                    live.start += live.duration_ms;
                    live.resets += 1;
                }
            } else {
                settled_money += settle_outcome(state, catalog, &race, &outcome, false, now_ms);
                settled += 1;
                stop_race(state, &race_id);
                state.push_toast("Race finished", &race.track, ToastKind::RaceResult);
                break;
            }
        }
    }

    if settled > 1 {
        state.warnings.offline_earnings.races += settled - 1;
        state.warnings.offline_earnings.money += settled_money;
    }
}
