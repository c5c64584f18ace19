use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cavebot_engine::AbilityOffer;
use serde::{Deserialize, Serialize};

pub const TIER_LIST_FILE: &str = "tier_list.json";

/// Ability label to tier; lower is better.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierList(HashMap<String, u32>);

impl TierList {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse tier list")
    }

    /// `<data>/abilities/tier_list.json`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("abilities").join(TIER_LIST_FILE);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn tier(&self, ability: &str) -> Option<u32> {
        self.0.get(ability).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for TierList {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityPick {
    Left,
    Center,
    Right,
}

impl AbilityPick {
    pub fn button(self) -> &'static str {
        match self {
            Self::Left => "ability_left",
            Self::Center => "ability_center",
            Self::Right => "ability_right",
        }
    }
}

/// Best of the three offered abilities. `None` when any label is not ranked.
///
/// Ties go to the left-most slot.
pub fn pick(offer: &AbilityOffer, tiers: &TierList) -> Option<(AbilityPick, String)> {
    let left = tiers.tier(&offer.left)?;
    let center = tiers.tier(&offer.center)?;
    let right = tiers.tier(&offer.right)?;
    let choice = if left <= center && left <= right {
        (AbilityPick::Left, offer.left.clone())
    } else if center <= right {
        (AbilityPick::Center, offer.center.clone())
    } else {
        (AbilityPick::Right, offer.right.clone())
    };
    Some(choice)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(l: &str, c: &str, r: &str) -> AbilityOffer {
        AbilityOffer {
            left: l.into(),
            center: c.into(),
            right: r.into(),
        }
    }

    fn tiers() -> TierList {
        [("multishot", 1), ("ricochet", 1), ("front_arrow", 2), ("hp_boost", 5)]
            .into_iter()
            .collect()
    }

    #[test]
    fn lowest_tier_wins() {
        let (slot, name) = pick(&offer("hp_boost", "front_arrow", "multishot"), &tiers()).unwrap();
        assert_eq!(slot, AbilityPick::Right);
        assert_eq!(name, "multishot");
    }

    #[test]
    fn ties_prefer_left_then_center() {
        let (slot, _) = pick(&offer("ricochet", "multishot", "hp_boost"), &tiers()).unwrap();
        assert_eq!(slot, AbilityPick::Left);
        let (slot, _) = pick(&offer("hp_boost", "ricochet", "multishot"), &tiers()).unwrap();
        assert_eq!(slot, AbilityPick::Center);
    }

    #[test]
    fn unranked_labels_yield_none() {
        assert_eq!(pick(&offer("hp_boost", "mystery", "multishot"), &tiers()), None);
    }

    #[test]
    fn tier_list_reads_plain_json_object() {
        let list = TierList::from_json(r#"{"multishot":1,"bloodthirst":3}"#).unwrap();
        assert_eq!(list.tier("bloodthirst"), Some(3));
        assert_eq!(list.len(), 2);
    }
}
