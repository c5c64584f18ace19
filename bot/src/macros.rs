//! Movement macros: fixed lists of compass swipes, grouped per chapter.

use std::collections::HashMap;

use cavebot_engine::Direction;
use cavebot_engine::Direction::{E, N, Ne, Nw, S, Se, Sw, W};

use crate::chapters::ChapterId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub direction: Direction,
    pub seconds: f32,
}

const fn s(direction: Direction, seconds: f32) -> Step {
    Step { direction, seconds }
}

/// Which levels a traversal segment applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelFilter {
    All,
    Only(&'static [u32]),
    Except(&'static [u32]),
}

impl LevelFilter {
    pub fn accepts(self, level: u32) -> bool {
        match self {
            Self::All => true,
            Self::Only(levels) => levels.contains(&level),
            Self::Except(levels) => !levels.contains(&level),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub steps: &'static [Step],
    pub levels: LevelFilter,
}

const fn all(steps: &'static [Step]) -> Segment {
    Segment {
        steps,
        levels: LevelFilter::All,
    }
}

const fn only(levels: &'static [u32], steps: &'static [Step]) -> Segment {
    Segment {
        steps,
        levels: LevelFilter::Only(levels),
    }
}

const fn except(levels: &'static [u32], steps: &'static [Step]) -> Segment {
    Segment {
        steps,
        levels: LevelFilter::Except(levels),
    }
}

/// Flattens the segments that apply on `level`.
pub fn resolve(segments: &[Segment], level: u32) -> Vec<Step> {
    segments
        .iter()
        .filter(|seg| seg.levels.accepts(level))
        .flat_map(|seg| seg.steps.iter().copied())
        .collect()
}

/// In-level movement run between survival polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatPattern {
    /// Circle away from a boss that shares the room with the mobs.
    BossAvoidance,
    Patrol,
    /// Time-fraction selected escape routes.
    EscapeRoutes,
}

impl CombatPattern {
    pub fn steps(self) -> &'static [Step] {
        match self {
            Self::BossAvoidance => BOSS_AVOIDANCE,
            Self::Patrol => PATROL,
            Self::EscapeRoutes => &[],
        }
    }

    /// Pause between steps when no dead check runs in between.
    pub fn delay(self) -> f32 {
        match self {
            Self::BossAvoidance => 1.0,
            Self::Patrol => 2.0,
            Self::EscapeRoutes => 0.1,
        }
    }

    /// Levels above this run the dead-check variant for battle-pass holders.
    pub fn dead_check_after_level(self) -> u32 {
        match self {
            Self::BossAvoidance => 3,
            _ => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossPlan {
    /// Popups are cleared before `approach_tweaks` on these levels.
    pub resolve_before_tweaks: &'static [u32],
    pub approach_tweaks: &'static [Segment],
    /// Sweep after the fight, followed by a popup pass.
    pub after_fight: Option<&'static [Step]>,
    /// Detour once at the door, followed by a popup pass and `after_detour`.
    pub door_detour: Option<&'static [Step]>,
    pub after_detour: &'static [Segment],
}

const PLAIN_BOSS: BossPlan = BossPlan {
    resolve_before_tweaks: &[],
    approach_tweaks: &[],
    after_fight: None,
    door_detour: None,
    after_detour: &[],
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FinalBossPlan {
    /// Wait by the wall and watch for the boss-died signals.
    DoorWatch,
    /// Dodge in the arena for a fixed number of rounds.
    Arena { door_detour: Option<&'static [Step]> },
}

/// Everything chapter specific the level handlers need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroSet {
    pub name: &'static str,
    pub traversal: &'static [Segment],
    pub exit: &'static [Step],
    pub exit_retry: &'static [Step],
    pub combat: CombatPattern,
    pub boss: BossPlan,
    pub final_boss: FinalBossPlan,
}

const OLD_TRAVERSAL: &[Step] = &[
    s(N, 3.0),
    s(Ne, 0.5),
    s(Nw, 3.0),
    s(Ne, 3.0),
    s(Nw, 3.0),
    s(Ne, 3.0),
    s(W, 0.7),
];

const EXIT_D6: &[Step] = &[s(W, 2.0), s(Ne, 3.0)];
const EXIT_D7: &[Step] = &[s(W, 0.7), s(Ne, 1.9)];
const EXIT_D10: &[Step] = &[s(E, 1.5), s(Nw, 3.0)];
const EXIT_D16: &[Step] = &[s(E, 1.2), s(Nw, 3.0)];
const EXIT_D18: &[Step] = &[s(E, 1.0), s(Nw, 3.0)];
const EXIT_D20: &[Step] = &[s(E, 1.5), s(Nw, 3.0)];

const D3_TRAVERSAL: &[Segment] = &[all(&[
    s(N, 1.5),
    s(W, 0.25),
    s(N, 0.5),
    s(E, 0.25),
    s(N, 2.0),
    s(W, 1.0),
    s(N, 0.5),
    s(E, 1.0),
    s(N, 1.5),
])];

const D6_TRAVERSAL: &[Segment] = &[all(&[
    s(N, 1.5),
    s(W, 0.3),
    s(N, 0.6),
    s(E, 0.6),
    s(N, 0.6),
    s(W, 0.6),
    s(N, 1.5),
    s(E, 0.3),
    s(N, 2.0),
])];

const D10_TRAVERSAL: &[Segment] = &[
    all(&[
        s(N, 0.5),
        s(Nw, 2.5),
        s(Ne, 2.5),
        s(Nw, 1.8),
        s(Ne, 1.0),
        s(W, 0.7),
        s(S, 0.6),
        s(E, 0.35),
        s(Ne, 0.4),
        s(N, 2.5),
        s(S, 0.3),
        s(W, 0.35),
        s(Nw, 0.4),
        s(N, 1.0),
    ]),
    only(&[18], &[s(W, 0.3), s(S, 0.35), s(Ne, 0.4), s(N, 0.4)]),
];

const D16_TRAVERSAL: &[Segment] = &[
    all(&[
        s(N, 0.5),
        s(Nw, 2.5),
        s(Ne, 2.5),
        s(Nw, 1.8),
        s(Ne, 1.0),
        s(W, 0.7),
    ]),
    only(&[11, 18], &[s(Sw, 0.6), s(Nw, 0.8)]),
    all(&[
        s(Se, 0.65),
        s(E, 0.7),
        s(Nw, 0.55),
        s(Ne, 0.7),
        s(W, 0.3),
        s(S, 0.6),
        s(Sw, 0.3),
        s(Nw, 0.7),
    ]),
    only(&[6], &[s(S, 0.4), s(E, 0.5), s(Nw, 0.6)]),
    only(&[11, 18], &[s(E, 0.3), s(N, 0.3), s(Nw, 0.4)]),
    all(&[s(Ne, 0.55), s(W, 0.3), s(N, 1.5)]),
];

const D18_TRAVERSAL: &[Segment] = &[
    all(&[s(N, 2.0), s(Nw, 2.0), s(Ne, 3.0), s(Nw, 2.0), s(E, 0.7)]),
    only(&[6], &[s(W, 0.4)]),
    only(&[11, 12, 13], &[s(N, 2.0), s(Nw, 0.5)]),
];

const D20_TRAVERSAL: &[Segment] = &[
    all(&[s(N, 2.0), s(Nw, 2.2)]),
    only(&[16], &[s(S, 0.5), s(E, 0.5), s(N, 0.5)]),
    except(&[16], &[s(S, 0.3), s(E, 0.5), s(N, 0.3)]),
    all(&[
        s(Ne, 1.8),
        s(S, 0.3),
        s(W, 0.5),
        s(N, 0.3),
        s(Nw, 1.5),
        s(Ne, 1.0),
    ]),
];

const D16_BOSS: BossPlan = BossPlan {
    resolve_before_tweaks: &[10],
    approach_tweaks: &[
        only(&[10], &[s(Nw, 1.5), s(Ne, 1.5)]),
        only(&[15], &[s(N, 0.4), s(W, 0.4)]),
    ],
    ..PLAIN_BOSS
};

const D7_BOSS: BossPlan = BossPlan {
    resolve_before_tweaks: &[],
    approach_tweaks: &[],
    after_fight: Some(&[s(W, 0.7), s(E, 0.8), s(W, 0.6)]),
    door_detour: Some(&[s(S, 0.5), s(E, 0.85), s(Ne, 0.75), s(Nw, 0.7), s(W, 0.55)]),
    after_detour: &[
        only(&[5, 6], &[s(S, 0.3), s(Ne, 0.6), s(Nw, 0.6)]),
        only(&[8, 9], &[s(S, 0.3), s(W, 0.3), s(Nw, 0.6)]),
    ],
};

pub const OLD: MacroSet = MacroSet {
    name: "old",
    traversal: &[all(OLD_TRAVERSAL)],
    exit: OLD_TRAVERSAL,
    exit_retry: OLD_TRAVERSAL,
    combat: CombatPattern::EscapeRoutes,
    boss: PLAIN_BOSS,
    final_boss: FinalBossPlan::Arena { door_detour: None },
};

const D3: MacroSet = MacroSet {
    name: "d3",
    traversal: D3_TRAVERSAL,
    exit: EXIT_D6,
    exit_retry: EXIT_D6,
    combat: CombatPattern::Patrol,
    boss: PLAIN_BOSS,
    final_boss: FinalBossPlan::DoorWatch,
};

const D6: MacroSet = MacroSet {
    name: "d6",
    traversal: D6_TRAVERSAL,
    ..D3
};

const D7: MacroSet = MacroSet {
    name: "d7",
    traversal: &[all(OLD_TRAVERSAL)],
    exit: EXIT_D7,
    exit_retry: EXIT_D7,
    combat: CombatPattern::BossAvoidance,
    boss: D7_BOSS,
    final_boss: FinalBossPlan::Arena {
        door_detour: Some(&[s(S, 0.5), s(E, 0.8), s(Ne, 0.5), s(Nw, 0.8)]),
    },
};

const D10: MacroSet = MacroSet {
    name: "d10",
    traversal: D10_TRAVERSAL,
    exit: EXIT_D10,
    exit_retry: EXIT_D10,
    combat: CombatPattern::Patrol,
    boss: PLAIN_BOSS,
    final_boss: FinalBossPlan::DoorWatch,
};

const D16: MacroSet = MacroSet {
    name: "d16",
    traversal: D16_TRAVERSAL,
    exit: EXIT_D16,
    exit_retry: EXIT_D10,
    combat: CombatPattern::Patrol,
    boss: D16_BOSS,
    final_boss: FinalBossPlan::Arena { door_detour: None },
};

const D18: MacroSet = MacroSet {
    name: "d18",
    traversal: D18_TRAVERSAL,
    exit: EXIT_D18,
    exit_retry: OLD_TRAVERSAL,
    combat: CombatPattern::Patrol,
    boss: PLAIN_BOSS,
    final_boss: FinalBossPlan::Arena { door_detour: None },
};

const D20: MacroSet = MacroSet {
    name: "d20",
    traversal: D20_TRAVERSAL,
    exit: EXIT_D20,
    exit_retry: EXIT_D20,
    combat: CombatPattern::Patrol,
    boss: PLAIN_BOSS,
    final_boss: FinalBossPlan::Arena { door_detour: None },
};

/// Chapter id to macro set, with the "old" family for everything unmapped.
#[derive(Debug, Clone)]
pub struct MacroTable {
    sets: HashMap<ChapterId, MacroSet>,
    default: MacroSet,
}

impl MacroTable {
    pub fn builtin() -> Self {
        let sets = [
            (3, D3),
            (6, D6),
            (7, D7),
            (10, D10),
            (14, MacroSet { name: "d14", ..D7 }),
            (16, D16),
            (18, D18),
            (20, D20),
        ]
        .into_iter()
        .collect();
        Self { sets, default: OLD }
    }

    pub fn get(&self, chapter: ChapterId) -> MacroSet {
        self.sets.get(&chapter).copied().unwrap_or(self.default)
    }

    pub fn insert(&mut self, chapter: ChapterId, set: MacroSet) {
        self.sets.insert(chapter, set);
    }

    pub fn is_mapped(&self, chapter: ChapterId) -> bool {
        self.sets.contains_key(&chapter)
    }
}

impl Default for MacroTable {
    fn default() -> Self {
        Self::builtin()
    }
}

pub const BOSS_AVOIDANCE: &[Step] = &[
    s(Sw, 1.5),
    s(Se, 1.0),
    s(E, 0.6),
    s(N, 0.5),
    s(Ne, 1.2),
    s(W, 0.4),
    s(Ne, 1.0),
    s(W, 0.7),
];

pub const PATROL: &[Step] = &[s(W, 0.35), s(E, 0.7), s(W, 0.7), s(W, 0.7), s(E, 0.37)];

pub const ESCAPE_ROUTES: [&[Step]; 5] = [
    &[
        s(S, 0.6),
        s(W, 0.4),
        s(Nw, 2.0),
        s(Ne, 3.0),
        s(S, 0.6),
        s(E, 0.4),
        s(Ne, 2.0),
        s(Nw, 3.0),
    ],
    &[
        s(S, 0.5),
        s(Sw, 2.0),
        s(N, 1.0),
        s(Nw, 2.0),
        s(Ne, 2.0),
        s(S, 0.5),
        s(Se, 2.0),
        s(N, 1.0),
        s(Ne, 2.0),
        s(Nw, 2.0),
    ],
    &[
        s(S, 0.3),
        s(Ne, 1.0),
        s(Nw, 2.0),
        s(S, 0.3),
        s(Nw, 1.0),
        s(Ne, 2.0),
    ],
    &[
        s(Sw, 2.0),
        s(N, 1.0),
        s(Ne, 2.0),
        s(Se, 2.0),
        s(W, 1.0),
        s(Ne, 2.0),
        s(Ne, 2.0),
    ],
    &[
        s(Se, 2.0),
        s(N, 1.0),
        s(Nw, 2.0),
        s(Sw, 2.0),
        s(N, 2.0),
        s(Ne, 2.0),
        s(Nw, 2.0),
    ],
];

/// Index into [`ESCAPE_ROUTES`] for `remaining` seconds out of `budget`.
///
/// Boundaries sit at 80/60/40/20% of the budget, inclusive on the upper edge.
pub fn escape_route_index(remaining: u32, budget: u32) -> usize {
    let (i, b) = (u64::from(remaining) * 5, u64::from(budget));
    if i > 4 * b {
        0
    } else if i > 3 * b {
        1
    } else if i > 2 * b {
        2
    } else if i > b {
        3
    } else {
        4
    }
}

/// True once a quarter of the budget has been spent.
pub fn should_nudge(remaining: u32, budget: u32) -> bool {
    u64::from(remaining) * 4 <= u64::from(budget) * 3
}

pub const NUDGE: Step = s(N, 0.1);
pub const CRASH_NUDGE: Step = s(N, 0.45);

pub const INTRO_FIRST: Step = s(N, 3.0);
pub const INTRO_SECOND: Step = s(N, 0.2);
pub const INTRO_LEAVE: Step = s(N, 2.0);

pub const HEAL_CENTER: &[Step] = &[s(E, 2.0), s(S, 2.0), s(W, 0.9)];
pub const HEAL_APPROACH: Step = s(N, 1.5);
pub const HEAL_REACH: Step = s(N, 0.65);
pub const HEAL_LEAVE: &[Step] = &[s(E, 1.0), s(N, 0.25), s(Nw, 2.5)];

pub const BOSS_APPROACH: &[Step] = &[s(N, 0.2), s(N, 0.7), s(E, 1.0), s(Nw, 2.0)];
pub const BOSS_ENGAGE: &[Step] = &[s(Ne, 2.0), s(Nw, 1.25)];
pub const BOSS_TO_DOOR: &[Step] = &[
    s(S, 0.5),
    s(W, 0.3),
    s(Nw, 2.5),
    s(E, 0.4),
    s(N, 1.5),
    s(E, 0.65),
];

pub const DOOR_WATCH_POST: Step = s(W, 2.0);
pub const DOOR_WATCH_EXIT: &[Step] = &[s(N, 5.0), s(Ne, 3.0)];

pub const ARENA_APPROACH: &[Step] = &[
    s(N, 0.2),
    s(N, 0.7),
    s(E, 1.0),
    s(Nw, 1.8),
    s(Ne, 1.8),
    s(Nw, 1.0),
];
pub const ARENA_DODGE: &[Step] = &[s(W, 0.5), s(E, 1.0), s(W, 0.5)];
pub const ARENA_TO_DOOR: &[Step] = &[s(S, 0.5), s(W, 0.5), s(Nw, 3.0), s(N, 2.0), s(E, 0.85)];
pub const ARENA_EXIT: &[Step] = &[s(E, 1.0), s(Nw, 2.5)];

/// Escape plans A to E for a final boss room that will not let go, with the
/// wait that follows each one.
pub const ESCAPE_PLANS: [(&str, &[Step], f32); 5] = [
    ("A", &[s(N, 1.5), s(S, 0.6), s(E, 0.3), s(Ne, 1.0)], 0.0),
    ("B", &[s(N, 1.5), s(S, 0.6), s(W, 0.3), s(Nw, 1.0)], 8.0),
    ("C", &[s(N, 1.5), s(S, 0.9), s(E, 0.6), s(Nw, 2.0)], 10.0),
    ("D", &[s(N, 1.5), s(S, 0.9), s(W, 0.6), s(Ne, 2.0)], 10.0),
    (
        "E",
        &[
            s(N, 1.66),
            s(S, 0.66),
            s(W, 0.66),
            s(N, 0.66),
            s(Ne, 0.66),
            s(S, 0.66),
            s(E, 0.66),
            s(N, 0.66),
            s(Nw, 0.66),
            s(Ne, 1.66),
            s(Nw, 1.66),
        ],
        10.0,
    ),
];

pub const ANGEL_LEAVE: &[Step] = &[s(N, 0.65), s(E, 0.9), s(N, 0.25), s(Nw, 1.8)];

pub const FINAL_SWEEP: &[Step] = &[
    s(N, 1.5),
    s(Nw, 1.5),
    s(S, 0.3),
    s(E, 0.5),
    s(N, 0.3),
    s(Ne, 1.5),
    s(S, 0.3),
    s(W, 0.5),
    s(N, 1.5),
];
