//! Race lifecycle: timing, completion, scoring and rewards.
//!
//! Nothing in here drives a timer. A race's completion state is derived
//! from `(now, start, duration)` whenever it is queried, so process
//! suspension never corrupts progress.

use hmac::{Hmac, Mac};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use smallvec::SmallVec;

use crate::attribute::AttrKind;
use crate::catalog::CatalogTrack;
use crate::numbers::round_f64_to_i64;
use crate::state::GarageCar;

/// Rival par score per second of track duration.
const PAR_PER_SECOND: f64 = 0.7;
/// Rival spread around par.
const RIVAL_JITTER: f64 = 0.15;
/// Player spread around the deterministic attribute score.
const PLAYER_JITTER: f64 = 0.05;
/// Prize bonus per race-experience "prizes" point.
const PRIZE_SKILL_BONUS: f64 = 0.10;

/// An active race instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub id: String,
    pub car: String,
    pub track: String,
    /// Start timestamp (ms); moves forward on every reset.
    pub start: u64,
    /// First start; never touched after creation.
    pub start_original: u64,
    pub duration_ms: u64,
    /// Restart immediately on completion instead of waiting for the
    /// player.
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub resets: u32,
}

impl Race {
    #[must_use]
    pub fn new(id: String, car_id: &str, track: &CatalogTrack, now_ms: u64, auto: bool) -> Self {
        Self {
            id,
            car: car_id.to_string(),
            track: track.id.clone(),
            start: now_ms,
            start_original: now_ms,
            duration_ms: track.duration_ms,
            auto,
            resets: 0,
        }
    }

    /// Completion ratio in `[0, 1]`, a pure function of `now`.
    #[must_use]
    pub fn progress(&self, now_ms: u64) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now_ms.saturating_sub(self.start);
        #[allow(clippy::cast_precision_loss)]
        let ratio = elapsed as f64 / self.duration_ms as f64;
        ratio.min(1.0)
    }

    #[must_use]
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.start) >= self.duration_ms
    }

    /// Restart the race clock. `start_original` is preserved; `resets`
    /// increments by one unless an explicit count is forced.
    pub fn reset(&mut self, now_ms: u64, explicit_resets: Option<u32>) {
        self.start = now_ms;
        self.resets = explicit_resets.unwrap_or(self.resets + 1);
    }
}

/// One entrant's line in the race results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResult {
    pub name: String,
    pub score: i64,
    pub position: u32,
    #[serde(default)]
    pub player: bool,
}

/// Outcome of a finished race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceOutcome {
    /// 1-based finishing position of the player.
    pub position: u32,
    pub results: Vec<RaceResult>,
    /// Money actually awarded (empty when out of the prize places).
    pub prizes: SmallVec<[i64; 3]>,
}

/// Immutable record of a completed race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastRace {
    pub id: String,
    pub race: String,
    pub car: String,
    pub dealer_car: String,
    pub track: String,
    pub timestamp: u64,
    /// False until the player acknowledges the results.
    pub checked: bool,
    pub reward: bool,
    pub position: u32,
    pub results: Vec<RaceResult>,
    pub prizes: SmallVec<[i64; 3]>,
}

/// Pluggable race-outcome scoring, consumed by the finish transition.
pub trait RaceScoring {
    /// Score a due race. `prize_skill` is the race-experience "prizes"
    /// allocation. Must be deterministic for a given `(race, resets)`.
    fn score(
        &self,
        car: &GarageCar,
        track: &CatalogTrack,
        race: &Race,
        prize_skill: u8,
    ) -> RaceOutcome;
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

/// Default scorer: weighted attribute sum against a field of synthetic
/// rivals drawn around the track's duration-derived par.
#[derive(Debug, Clone, Copy)]
pub struct WeightedScoring {
    seed: u64,
}

impl WeightedScoring {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn race_rng(&self, race: &Race) -> ChaCha20Rng {
        let mut tag = Vec::with_capacity(race.id.len() + 9);
        tag.extend_from_slice(b"race");
        tag.extend_from_slice(race.id.as_bytes());
        tag.push(b'#');
        tag.extend_from_slice(&race.resets.to_le_bytes());
        ChaCha20Rng::seed_from_u64(derive_stream_seed(self.seed, &tag))
    }

    /// Deterministic weighted attribute score before jitter.
    #[must_use]
    pub fn car_score(car: &GarageCar, track: &CatalogTrack) -> f64 {
        AttrKind::ALL
            .iter()
            .map(|&kind| {
                #[allow(clippy::cast_precision_loss)]
                let value = car.attr(kind).value as f64;
                f64::from(track.weight(kind)) * value
            })
            .sum()
    }

    /// Par score rivals are drawn around; longer and more demanding
    /// tracks field stronger rivals.
    #[must_use]
    pub fn track_par(track: &CatalogTrack) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let seconds = track.duration_ms as f64 / 1000.0;
        let weight_sum =
            f64::from(track.acc_weight) + f64::from(track.spd_weight) + f64::from(track.hnd_weight);
        seconds * weight_sum.max(1.0) * PAR_PER_SECOND
    }
}

impl RaceScoring for WeightedScoring {
    fn score(
        &self,
        car: &GarageCar,
        track: &CatalogTrack,
        race: &Race,
        prize_skill: u8,
    ) -> RaceOutcome {
        let mut rng = self.race_rng(race);

        let player_score =
            Self::car_score(car, track) * (1.0 + rng.gen_range(-PLAYER_JITTER..=PLAYER_JITTER));

        let par = Self::track_par(track);
        let rivals = track.max_slots.saturating_sub(1);
        let mut entries: Vec<(String, f64, bool)> = Vec::with_capacity(rivals as usize + 1);
        entries.push((car.name.clone(), player_score, true));
        for i in 0..rivals {
            let rival_score = par * (1.0 + rng.gen_range(-RIVAL_JITTER..=RIVAL_JITTER));
            entries.push((format!("Rival {}", i + 1), rival_score, false));
        }

        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut position = 1;
        let mut results = Vec::with_capacity(entries.len());
        for (rank, (name, score, player)) in entries.iter().enumerate() {
            let rank = u32::try_from(rank).unwrap_or(u32::MAX).saturating_add(1);
            if *player {
                position = rank;
            }
            results.push(RaceResult {
                name: name.clone(),
                score: round_f64_to_i64(*score),
                position: rank,
                player: *player,
            });
        }

        let mut prizes = SmallVec::new();
        if let Some(base) = track.prizes.get(position as usize - 1) {
            let bonus = 1.0 + PRIZE_SKILL_BONUS * f64::from(prize_skill);
            #[allow(clippy::cast_precision_loss)]
            let scaled = *base as f64 * bonus;
            prizes.push(crate::numbers::floor_f64_to_i64(scaled));
        }

        RaceOutcome {
            position,
            results,
            prizes,
        }
    }
}
