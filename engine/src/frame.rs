use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle to one captured screen image.
///
/// Pixel data stays inside the classifier that produced it; the run loop only
/// passes the handle back so several checks can share one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    pub id: u64,
}

impl Frame {
    pub const fn new(id: u64) -> Self {
        Self { id }
    }
}

/// Discrete label a classifier assigns to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameState {
    InGame,
    Endgame,
    RepeatEndgameQuestion,
    AbilityRefresh,
    SelectAbility,
    FortuneWheel,
    DevilQuestion,
    #[serde(alias = "mistery_vendor")]
    MysteryVendor,
    SpecialGiftRespin,
    SpecialGiftRespinNoBackButton,
    AdAsk,
    AngelHeal,
    OnPause,
    TimePrize,
    MenuHome,
    MenuTalents,
    MenuEvents,
    MenuEquip,
    MenuShop,
    MenuExpedition,
    MonsterFarmHome,
    CrashDesktopOpen,
    CrashLoadScreen1,
    CrashLoadScreen2,
    GameNotResponding,
    Unknown,
}

impl FrameState {
    pub const ALL: [FrameState; 26] = [
        FrameState::InGame,
        FrameState::Endgame,
        FrameState::RepeatEndgameQuestion,
        FrameState::AbilityRefresh,
        FrameState::SelectAbility,
        FrameState::FortuneWheel,
        FrameState::DevilQuestion,
        FrameState::MysteryVendor,
        FrameState::SpecialGiftRespin,
        FrameState::SpecialGiftRespinNoBackButton,
        FrameState::AdAsk,
        FrameState::AngelHeal,
        FrameState::OnPause,
        FrameState::TimePrize,
        FrameState::MenuHome,
        FrameState::MenuTalents,
        FrameState::MenuEvents,
        FrameState::MenuEquip,
        FrameState::MenuShop,
        FrameState::MenuExpedition,
        FrameState::MonsterFarmHome,
        FrameState::CrashDesktopOpen,
        FrameState::CrashLoadScreen1,
        FrameState::CrashLoadScreen2,
        FrameState::GameNotResponding,
        FrameState::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::InGame => "in_game",
            Self::Endgame => "endgame",
            Self::RepeatEndgameQuestion => "repeat_endgame_question",
            Self::AbilityRefresh => "ability_refresh",
            Self::SelectAbility => "select_ability",
            Self::FortuneWheel => "fortune_wheel",
            Self::DevilQuestion => "devil_question",
            Self::MysteryVendor => "mystery_vendor",
            Self::SpecialGiftRespin => "special_gift_respin",
            Self::SpecialGiftRespinNoBackButton => "special_gift_respin_no_back_button",
            Self::AdAsk => "ad_ask",
            Self::AngelHeal => "angel_heal",
            Self::OnPause => "on_pause",
            Self::TimePrize => "time_prize",
            Self::MenuHome => "menu_home",
            Self::MenuTalents => "menu_talents",
            Self::MenuEvents => "menu_events",
            Self::MenuEquip => "menu_equip",
            Self::MenuShop => "menu_shop",
            Self::MenuExpedition => "menu_expedition",
            Self::MonsterFarmHome => "monster_farm_home",
            Self::CrashDesktopOpen => "crash_desktop_open",
            Self::CrashLoadScreen1 => "crash_load_screen_1",
            Self::CrashLoadScreen2 => "crash_load_screen_2",
            Self::GameNotResponding => "game_not_responding",
            Self::Unknown => "unknown",
        }
    }

    /// One of the five main-menu tabs.
    pub fn is_main_menu(self) -> bool {
        matches!(
            self,
            Self::MenuHome | Self::MenuTalents | Self::MenuEvents | Self::MenuEquip | Self::MenuShop
        )
    }

    /// Screens that appear between rooms once a level has been cleared.
    pub fn ends_level(self) -> bool {
        matches!(
            self,
            Self::SelectAbility
                | Self::FortuneWheel
                | Self::DevilQuestion
                | Self::MysteryVendor
                | Self::AdAsk
                | Self::AngelHeal
        )
    }
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown frame state label '{0}'")]
pub struct UnknownFrameLabel(pub String);

impl FromStr for FrameState {
    type Err = UnknownFrameLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        if needle == "mistery_vendor" {
            return Ok(Self::MysteryVendor);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.label() == needle)
            .ok_or(UnknownFrameLabel(s.to_string()))
    }
}

/// Pixel line sampled from the experience bar at the top of the screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpBar {
    pub samples: Vec<u8>,
}

/// Labels of the three abilities offered on a select-ability screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityOffer {
    pub left: String,
    pub center: String,
    pub right: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_back_to_the_same_state() {
        for state in FrameState::ALL {
            assert_eq!(state.label().parse::<FrameState>(), Ok(state));
        }
    }

    #[test]
    fn legacy_vendor_spelling_is_accepted() {
        assert_eq!(
            "mistery_vendor".parse::<FrameState>(),
            Ok(FrameState::MysteryVendor)
        );
        let parsed: FrameState = serde_json::from_str("\"mistery_vendor\"").unwrap();
        assert_eq!(parsed, FrameState::MysteryVendor);
    }

    #[test]
    fn unknown_labels_are_rejected() {
        let err = "boss_room".parse::<FrameState>().unwrap_err();
        assert_eq!(err.0, "boss_room");
    }

    #[test]
    fn menu_tabs_are_main_menu() {
        assert!(FrameState::MenuShop.is_main_menu());
        assert!(!FrameState::MenuExpedition.is_main_menu());
        assert!(!FrameState::InGame.is_main_menu());
    }
}
