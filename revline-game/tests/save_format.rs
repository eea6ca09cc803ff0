//! Snapshot wire-format guarantees: field names, version stamping,
//! migration of historical shapes and the base64 interchange codes.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use revline_game::catalog::test_fixtures::sample_catalog;
use revline_game::save::{import_code, load_state, serialize_state, state_from_snapshot};
use revline_game::{Action, GameState, SCHEMA_VERSION, WeightedScoring, reduce};
use serde_json::{Value, json};

fn played_state() -> GameState {
    let catalog = sample_catalog();
    let scorer = WeightedScoring::new(42);
    let mut state = GameState::default();
    reduce(
        &mut state,
        &catalog,
        &scorer,
        &Action::BuyCar {
            car_id: "swift".to_string(),
            color: Some("red".to_string()),
        },
        0,
    );
    let car_id = state.garage_cars[0].id.clone();
    reduce(
        &mut state,
        &catalog,
        &scorer,
        &Action::StartRace {
            car_id,
            track_id: "oval".to_string(),
            auto: false,
        },
        1_000,
    );
    reduce(&mut state, &catalog, &scorer, &Action::Tick, 61_000);
    state
}

#[test]
fn snapshot_keys_are_stable() {
    let state = played_state();
    let raw = serialize_state(&state).unwrap();
    let doc: Value = serde_json::from_str(&raw).unwrap();
    let map = doc.as_object().unwrap();

    for key in [
        "version",
        "money",
        "garage_slots",
        "garage_cars",
        "races",
        "past_races",
        "experience",
        "stars",
        "warnings",
        "total_upgrades",
        "next_id",
    ] {
        assert!(map.contains_key(key), "missing snapshot key {key}");
    }
    assert_eq!(map["version"], json!(SCHEMA_VERSION));

    let car = map["garage_cars"][0].as_object().unwrap();
    for key in ["id", "dealer_car", "acceleration", "speed", "handling", "color"] {
        assert!(car.contains_key(key), "missing garage car key {key}");
    }

    let past = map["past_races"][0].as_object().unwrap();
    assert_eq!(past["position"], json!(1));
    assert_eq!(past["checked"], json!(false));
}

#[test]
fn snapshot_round_trips_after_play() {
    let state = played_state();
    let raw = serialize_state(&state).unwrap();
    let restored = load_state(&raw);
    assert_eq!(restored, state);
    assert!(!restored.warnings.store_reset);
}

#[test]
fn v2_snapshot_migrates_through_import() {
    let legacy = json!({
        "version": 2,
        "money": 8_000,
        "garage_slots": 5,
        "store_reset": true
    })
    .to_string();
    let code = STANDARD.encode(&legacy);
    let state = import_code(&code).unwrap();
    assert_eq!(state.version, SCHEMA_VERSION);
    assert_eq!(state.money, 8_000);
    assert_eq!(state.slots_purchased, 5);
    assert!(state.warnings.store_reset);
}

#[test]
fn pre_v2_snapshot_is_rejected() {
    let err = state_from_snapshot(json!({ "version": 1, "money": 1 })).unwrap_err();
    assert!(err.to_string().contains("version 1"));
}

#[test]
fn actions_deserialize_from_tagged_json() {
    let action: Action = serde_json::from_value(json!({
        "type": "buy_car",
        "car_id": "swift"
    }))
    .unwrap();
    assert_eq!(
        action,
        Action::BuyCar {
            car_id: "swift".to_string(),
            color: None
        }
    );

    let action: Action = serde_json::from_value(json!({
        "type": "start_race",
        "car_id": "car-1",
        "track_id": "oval"
    }))
    .unwrap();
    assert_eq!(
        action,
        Action::StartRace {
            car_id: "car-1".to_string(),
            track_id: "oval".to_string(),
            auto: false
        }
    );
}
