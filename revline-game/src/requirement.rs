//! Track and sponsor eligibility predicates.
//!
//! Requirement strings are prefix-tagged in the sheets (`no_ups`,
//! `car_<id>`, `cat_<tag>`, `type_<t>`, `attr_<attr>_<cmp>_<value>`).
//! They are parsed once at catalog-load time into a tagged enum;
//! evaluation never touches the string form again.

use serde::{Deserialize, Serialize};

use crate::attribute::AttrKind;
use crate::state::GarageCar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Gt,
    Lt,
    Eq,
    Ge,
    Le,
}

impl Comparator {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            "=" | "==" => Some(Self::Eq),
            ">=" => Some(Self::Ge),
            "<=" => Some(Self::Le),
            _ => None,
        }
    }

    #[must_use]
    pub fn holds(self, left: i64, right: i64) -> bool {
        match self {
            Self::Gt => left > right,
            Self::Lt => left < right,
            Self::Eq => left == right,
            Self::Ge => left >= right,
            Self::Le => left <= right,
        }
    }
}

/// One eligibility predicate for a car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    /// No attribute may be upgraded.
    NoUpgrades,
    /// The car must originate from a specific catalog car.
    Car { value: String },
    /// The car must carry a category tag.
    Category { value: String },
    /// The car's type field must match.
    CarType { value: String },
    /// Compare a named attribute's current value against a threshold.
    Attr {
        attr: AttrKind,
        cmp: Comparator,
        value: i64,
    },
}

/// Parse one requirement string. Unrecognized prefixes (or malformed
/// `attr_` bodies) yield `None` and are tolerated by callers.
#[must_use]
pub fn parse_requirement(raw: &str) -> Option<Requirement> {
    if raw.starts_with("no_ups") {
        return Some(Requirement::NoUpgrades);
    }
    if let Some(value) = raw.strip_prefix("car_") {
        return Some(Requirement::Car {
            value: value.to_string(),
        });
    }
    if let Some(value) = raw.strip_prefix("cat_") {
        return Some(Requirement::Category {
            value: value.to_string(),
        });
    }
    if let Some(value) = raw.strip_prefix("type_") {
        return Some(Requirement::CarType {
            value: value.to_string(),
        });
    }
    if let Some(body) = raw.strip_prefix("attr_") {
        let mut parts = body.split('_');
        let attr = AttrKind::parse(parts.next()?)?;
        let cmp = Comparator::parse(parts.next()?)?;
        let value = parts.next()?.parse().ok()?;
        return Some(Requirement::Attr { attr, cmp, value });
    }
    None
}

/// Parse a whole requirement list, silently dropping entries that do not
/// parse. Bad sheet data must never poison the track it belongs to.
#[must_use]
pub fn parse_requirements<'a, I>(raw: I) -> Vec<Requirement>
where
    I: IntoIterator<Item = &'a str>,
{
    raw.into_iter().filter_map(parse_requirement).collect()
}

impl Requirement {
    #[must_use]
    pub fn is_met_by(&self, car: &GarageCar) -> bool {
        match self {
            Self::NoUpgrades => AttrKind::ALL.iter().all(|&kind| car.attr(kind).upgrade == 0),
            Self::Car { value } => car.dealer_car == *value,
            Self::Category { value } => car.categories.iter().any(|tag| tag == value),
            Self::CarType { value } => car.car_type == *value,
            Self::Attr { attr, cmp, value } => cmp.holds(car.attr(*attr).value, *value),
        }
    }
}

/// True iff the car satisfies every requirement. The empty set is
/// trivially satisfied.
#[must_use]
pub fn meets_requirements(car: &GarageCar, requirements: &[Requirement]) -> bool {
    requirements.iter().all(|req| req.is_met_by(car))
}
