//! Upgradeable car attributes and their price curve.

use serde::{Deserialize, Serialize};

use crate::numbers::{i64_to_f64, round_f64_to_i64};

/// The three attribute slots every car carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrKind {
    #[serde(rename = "acc")]
    Acceleration,
    #[serde(rename = "spd")]
    Speed,
    #[serde(rename = "hnd")]
    Handling,
}

impl AttrKind {
    pub const ALL: [Self; 3] = [Self::Acceleration, Self::Speed, Self::Handling];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Acceleration => "acc",
            Self::Speed => "spd",
            Self::Handling => "hnd",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "acc" => Some(Self::Acceleration),
            "spd" => Some(Self::Speed),
            "hnd" => Some(Self::Handling),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upgradeable numeric attribute (acceleration, speed or handling).
///
/// The derived fields (`value`, `upgrade_value`, `price`, `price_raw`) are
/// stored rather than recomputed so a serialized car is self-describing.
/// `price` is `Some` exactly while `upgrade < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Attribute {
    pub base: i64,
    pub unit: i64,
    pub max: u32,
    pub base_price: i64,
    pub upgrade: u32,
    pub value: i64,
    /// Value after the next upgrade, or the current value when maxed.
    pub upgrade_value: i64,
    /// Cost of the next upgrade tier; `None` once maxed.
    #[serde(default)]
    pub price: Option<i64>,
    pub price_raw: i64,
}

/// Build an attribute at a given upgrade level.
///
/// Next-tier cost follows a geometric curve:
/// `round(base_price + (base_price * 0.5)^(1 + upgrade/10) - 1)`.
#[must_use]
pub fn compute_attribute(base: i64, unit: i64, max: u32, base_price: i64, upgrade: u32) -> Attribute {
    let value = base + unit * i64::from(upgrade);
    let next_value = base + unit * (i64::from(upgrade) + 1);
    let exponent = 1.0 + f64::from(upgrade) / 10.0;
    let price_raw =
        round_f64_to_i64(i64_to_f64(base_price) + ((i64_to_f64(base_price) * 0.5).powf(exponent) - 1.0));

    Attribute {
        base,
        unit,
        max,
        base_price,
        upgrade,
        value,
        upgrade_value: if upgrade < max { next_value } else { value },
        price: if upgrade < max { Some(price_raw) } else { None },
        price_raw,
    }
}

impl Attribute {
    /// The attribute one tier up. Idempotent at the ceiling: a maxed
    /// attribute is returned unchanged, never an error.
    #[must_use]
    pub fn upgraded(&self) -> Self {
        if self.upgrade >= self.max {
            return *self;
        }
        compute_attribute(self.base, self.unit, self.max, self.base_price, self.upgrade + 1)
    }

    #[must_use]
    pub const fn is_maxed(&self) -> bool {
        self.upgrade >= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_tracks_upgrade_level() {
        let attr = compute_attribute(120, 1, 16, 100, 0);
        assert_eq!(attr.value, 120);
        assert_eq!(attr.upgrade_value, 121);
        let upped = attr.upgraded();
        assert_eq!(upped.upgrade, 1);
        assert_eq!(upped.value, 121);
        assert!(upped.value > attr.value);
    }

    #[test]
    fn price_curve_matches_reference_points() {
        // base_price=1000: level 0 -> 1000 + 500 - 1, level 10 -> 1000 + 500^2 - 1
        let attr = compute_attribute(100, 1, 16, 1000, 0);
        assert_eq!(attr.price, Some(1499));
        let attr = compute_attribute(100, 1, 16, 1000, 10);
        assert_eq!(attr.price, Some(250_999));
    }

    #[test]
    fn maxed_attribute_has_no_price_and_is_idempotent() {
        let attr = compute_attribute(100, 2, 3, 500, 3);
        assert_eq!(attr.price, None);
        assert_eq!(attr.upgrade_value, attr.value);
        assert!(attr.is_maxed());
        assert_eq!(attr.upgraded(), attr);
    }

    #[test]
    fn zero_max_is_never_upgradeable() {
        let attr = compute_attribute(80, 1, 0, 400, 0);
        assert_eq!(attr.price, None);
        assert_eq!(attr.upgraded(), attr);
    }

    #[test]
    fn attr_kind_round_trips() {
        for kind in AttrKind::ALL {
            assert_eq!(AttrKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AttrKind::parse("turbo"), None);
    }
}
