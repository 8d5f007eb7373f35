//! # Scaling Mechanics
//!
//! DC and damage values embedded in encounter text.
//!
//! Authored descriptions never contain raw numbers for checks or damage. They
//! carry `{{id}}` placeholders that point at a [`ScalingMechanic`], and the
//! scaler only ever rewrites the mechanic, never the text around it.

use log::debug;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// What a mechanic represents in the fiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MechanicKind {
    Skill,
    Save,
    Trap,
    Hazard,
}

/// A DC or damage value referenced from description text as `{{id}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingMechanic {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MechanicKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dc: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<String>,
}

impl ScalingMechanic {
    /// Returns a copy with DC and damage adjusted for `level_difference`.
    pub fn scaled(&self, level_difference: i32) -> Self {
        Self {
            dc: self.dc.map(|dc| scale_dc(dc, level_difference)),
            damage: self
                .damage
                .as_deref()
                .map(|damage| scale_damage(damage, level_difference)),
            ..self.clone()
        }
    }

    /// Text that replaces this mechanic's placeholder.
    ///
    /// DCs read as `DC 12 Athletics (STR)`, damage as `2d6 fire damage`.
    pub fn render(&self) -> String {
        let sub_type = self.sub_type.as_deref().unwrap_or("").trim();
        match (self.dc, self.damage.as_deref()) {
            (Some(dc), _) if sub_type.is_empty() => format!("DC {dc}"),
            (Some(dc), _) => format!("DC {dc} {sub_type}"),
            (None, Some(damage)) if sub_type.is_empty() => format!("{damage} damage"),
            (None, Some(damage)) => format!("{damage} {}", sub_type.to_lowercase()),
            (None, None) => sub_type.to_string(),
        }
    }
}

/// Extra DC points (or d6 dice) for a party `level_difference` levels above the encounter.
///
/// One step per two levels, rounding up, and never negative.
pub fn scaling_steps(level_difference: i32) -> u32 {
    if level_difference <= 0 {
        0
    } else {
        ((level_difference + 1) / 2) as u32
    }
}

/// Raises a DC for an over-leveled party. Under-leveled parties keep the authored DC.
///
/// # Examples
///
/// ```
/// use delve::scale_dc;
///
/// assert_eq!(scale_dc(10, 3), 12);
/// assert_eq!(scale_dc(10, 0), 10);
/// assert_eq!(scale_dc(10, -4), 10);
/// ```
pub fn scale_dc(dc: u32, level_difference: i32) -> u32 {
    dc + scaling_steps(level_difference)
}

fn damage_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\d+d\d+(?:\s*[+-]\s*\d+)?)(\s.*)?$").expect("damage pattern is valid")
    })
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_-]+)\}\}").expect("placeholder pattern is valid"))
}

/// Appends extra d6 dice to a damage expression for an over-leveled party.
///
/// Accepts `<N>d<M>` with an optional flat modifier, optionally followed by a
/// damage type. The extra dice are always d6 and go right after the dice
/// expression. Text that does not parse is returned unchanged.
///
/// # Examples
///
/// ```
/// use delve::scale_damage;
///
/// assert_eq!(scale_damage("2d6", 3), "2d6 + 2d6");
/// assert_eq!(scale_damage("1d10+2 fire", 1), "1d10+2 + 1d6 fire");
/// assert_eq!(scale_damage("2d6", -1), "2d6");
/// ```
pub fn scale_damage(damage: &str, level_difference: i32) -> String {
    let steps = scaling_steps(level_difference);
    if steps == 0 {
        return damage.to_string();
    }

    match damage_pattern().captures(damage) {
        Some(captures) => {
            let dice = &captures[1];
            let rest = captures.get(2).map_or("", |m| m.as_str());
            format!("{dice} + {steps}d6{rest}")
        }
        None => {
            debug!("Leaving unparseable damage text unscaled: {:?}", damage);
            damage.to_string()
        }
    }
}

/// Scales every mechanic in a list, preserving ids and order.
pub fn scale_mechanics(mechanics: &[ScalingMechanic], level_difference: i32) -> Vec<ScalingMechanic> {
    mechanics
        .iter()
        .map(|mechanic| mechanic.scaled(level_difference))
        .collect()
}

/// Replaces `{{id}}` tokens with rendered mechanics. Unknown ids stay verbatim.
pub fn render_placeholders(text: &str, mechanics: &[ScalingMechanic]) -> String {
    placeholder_pattern()
        .replace_all(text, |captures: &Captures| {
            mechanics
                .iter()
                .find(|mechanic| mechanic.id == captures[1])
                .map(ScalingMechanic::render)
                .unwrap_or_else(|| captures[0].to_string())
        })
        .into_owned()
}
