//! Star milestones: monotonic achievement counters.

use serde::{Deserialize, Serialize};

/// Ascending award thresholds per counter category.
const GARAGE_SLOT_THRESHOLDS: &[u32] = &[3, 5, 8, 12, 20];
const ATTR_UPGRADE_THRESHOLDS: &[u32] = &[10, 25, 50, 100, 200];

#[must_use]
pub fn thresholds_for(category: &str) -> &'static [u32] {
    match category {
        "garage_slot" => GARAGE_SLOT_THRESHOLDS,
        "attr_upgrades" => ATTR_UPGRADE_THRESHOLDS,
        _ => &[],
    }
}

/// One awarded star. Never revoked, even if the underlying counter
/// could somehow decrease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Star {
    pub id: String,
    pub category: String,
    pub subject: String,
    pub threshold: u32,
}

/// Stars newly unlocked by a counter reaching `new_value`. Pure in
/// `(new_value, existing)`; already-awarded thresholds are skipped.
#[must_use]
pub fn new_stars_for_counter(
    category: &str,
    subject: &str,
    new_value: u32,
    existing: &[Star],
) -> Vec<Star> {
    thresholds_for(category)
        .iter()
        .filter(|&&threshold| new_value >= threshold)
        .filter(|&&threshold| {
            !existing.iter().any(|star| {
                star.category == category && star.subject == subject && star.threshold == threshold
            })
        })
        .map(|&threshold| Star {
            id: format!("{category}_{subject}_{threshold}"),
            category: category.to_string(),
            subject: subject.to_string(),
            threshold,
        })
        .collect()
}

/// Garage-slot purchase milestones.
#[must_use]
pub fn new_garage_slot_stars(slots_purchased: u32, existing: &[Star]) -> Vec<Star> {
    new_stars_for_counter("garage_slot", "upgrades", slots_purchased, existing)
}

/// Cumulative attribute-upgrade milestones.
#[must_use]
pub fn new_attr_upgrade_stars(total_upgrades: u32, existing: &[Star]) -> Vec<Star> {
    new_stars_for_counter("attr_upgrades", "total", total_upgrades, existing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stars_awarded_once_per_threshold() {
        let first = new_attr_upgrade_stars(30, &[]);
        assert_eq!(first.len(), 2); // 10 and 25
        let again = new_attr_upgrade_stars(30, &first);
        assert!(again.is_empty());
    }

    #[test]
    fn crossing_multiple_thresholds_awards_all() {
        let stars = new_garage_slot_stars(12, &[]);
        let thresholds: Vec<u32> = stars.iter().map(|s| s.threshold).collect();
        assert_eq!(thresholds, vec![3, 5, 8, 12]);
    }

    #[test]
    fn awarded_stars_survive_counter_decrease() {
        let stars = new_garage_slot_stars(5, &[]);
        assert_eq!(stars.len(), 2);
        // A (hypothetical) decrease awards nothing new but the existing
        // set is untouched by construction; only additions are computed.
        let after = new_garage_slot_stars(1, &stars);
        assert!(after.is_empty());
    }

    #[test]
    fn unknown_category_has_no_thresholds() {
        assert!(new_stars_for_counter("podiums", "total", 999, &[]).is_empty());
    }
}
