use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RunError;

pub type ChapterId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelType {
    Intro,
    Normal,
    Heal,
    Boss,
    FinalBoss,
}

impl fmt::Display for LevelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Intro => "Intro",
            Self::Normal => "Normal",
            Self::Heal => "Heal",
            Self::Boss => "Boss",
            Self::FinalBoss => "FinalBoss",
        };
        f.write_str(name)
    }
}

/// Layout family of a chapter, named after its level count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChapterKind {
    T10,
    T20,
    T30,
    T50,
}

impl ChapterKind {
    pub fn max_level(self) -> u32 {
        match self {
            Self::T10 => 10,
            Self::T20 => 20,
            Self::T30 => 30,
            Self::T50 => 50,
        }
    }

    pub fn levels(self) -> Vec<LevelType> {
        match self {
            Self::T10 => T10_LEVELS.to_vec(),
            Self::T20 => T20_LEVELS.to_vec(),
            Self::T30 | Self::T50 => long_chapter(self.max_level()),
        }
    }
}

use LevelType::{Boss as B, FinalBoss as F, Heal as H, Intro as I, Normal as N};

const T10_LEVELS: [LevelType; 11] = [I, B, B, H, B, B, B, H, B, B, F];

const T20_LEVELS: [LevelType; 21] = [
    I, N, N, N, N, B, N, N, N, H, B, N, N, N, H, B, N, N, N, H, F,
];

/// Thirty and fifty level chapters: a boss every ten rooms, an angel halfway between.
fn long_chapter(max: u32) -> Vec<LevelType> {
    (0..=max)
        .map(|level| match level {
            0 => I,
            l if l == max => F,
            l if l % 10 == 0 => B,
            l if l % 10 == 5 => H,
            _ => N,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DungeonChapter {
    pub id: ChapterId,
    pub kind: ChapterKind,
    levels: Vec<LevelType>,
}

impl DungeonChapter {
    pub fn new(id: ChapterId, kind: ChapterKind) -> Self {
        Self {
            id,
            kind,
            levels: kind.levels(),
        }
    }

    /// A chapter with its own layout, e.g. a shortened one for a dry run.
    pub fn with_levels(id: ChapterId, kind: ChapterKind, levels: Vec<LevelType>) -> Self {
        Self { id, kind, levels }
    }

    pub fn max_level(&self) -> u32 {
        self.levels.len().saturating_sub(1) as u32
    }

    pub fn level_type(&self, level: u32) -> Option<LevelType> {
        self.levels.get(level as usize).copied()
    }

    pub fn levels(&self) -> &[LevelType] {
        &self.levels
    }
}

/// Every playable chapter, keyed by id.
#[derive(Debug, Clone)]
pub struct ChapterTable {
    chapters: BTreeMap<ChapterId, DungeonChapter>,
}

impl ChapterTable {
    pub fn builtin() -> Self {
        let chapters = (1..=20)
            .map(|id| {
                let kind = match id {
                    1 | 2 => ChapterKind::T50,
                    7 | 14 => ChapterKind::T10,
                    3 | 6 | 10 | 16 | 18 | 20 => ChapterKind::T20,
                    _ => ChapterKind::T30,
                };
                (id, DungeonChapter::new(id, kind))
            })
            .collect();
        Self { chapters }
    }

    pub fn get(&self, id: ChapterId) -> Result<&DungeonChapter, RunError> {
        self.chapters.get(&id).ok_or(RunError::UnknownChapter(id))
    }

    pub fn insert(&mut self, chapter: DungeonChapter) {
        self.chapters.insert(chapter.id, chapter);
    }

    pub fn contains(&self, id: ChapterId) -> bool {
        self.chapters.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ChapterId> + '_ {
        self.chapters.keys().copied()
    }
}

impl Default for ChapterTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_chapter_starts_with_intro_and_ends_with_final_boss() {
        let table = ChapterTable::builtin();
        for id in table.ids() {
            let chapter = table.get(id).unwrap();
            assert_eq!(chapter.level_type(0), Some(LevelType::Intro), "chapter {id}");
            assert_eq!(
                chapter.level_type(chapter.max_level()),
                Some(LevelType::FinalBoss),
                "chapter {id}"
            );
            assert_eq!(chapter.max_level(), chapter.kind.max_level());
        }
    }

    #[test]
    fn chapter_six_has_twenty_levels() {
        let table = ChapterTable::builtin();
        let six = table.get(6).unwrap();
        assert_eq!(six.max_level(), 20);
        assert_eq!(six.level_type(5), Some(LevelType::Boss));
        assert_eq!(six.level_type(9), Some(LevelType::Heal));
        assert_eq!(six.level_type(21), None);
    }

    #[test]
    fn long_chapters_alternate_heal_and_boss() {
        let one = ChapterTable::builtin().get(1).unwrap().clone();
        assert_eq!(one.level_type(15), Some(LevelType::Heal));
        assert_eq!(one.level_type(40), Some(LevelType::Boss));
        assert_eq!(one.level_type(41), Some(LevelType::Normal));
    }

    #[test]
    fn unknown_chapter_is_an_error() {
        let err = ChapterTable::builtin().get(42).unwrap_err();
        assert!(matches!(err, RunError::UnknownChapter(42)));
    }
}
