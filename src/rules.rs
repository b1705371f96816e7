//! Timing tables and the scoring/progression engine.

pub const MAX_LEVEL: u32 = 30;
pub const LINES_PER_LEVEL: u32 = 10;

/// Lock and clear delays, entry delay, and banner windows, in frames.
pub const LOCK_FRAMES: u64 = 30;
pub const ENTRY_FRAMES: u64 = 6;
pub const TECHNIQUE_FRAMES: u64 = 60;
pub const LEVELUP_FRAMES: u64 = 20;

/// Gravity events per frame for levels 1..=18 (index 0 unused: levels are
/// 1-based). Exponentially interpolated so level 1 has one gravity step per
/// second at 60 FPS. Levels above 18 run at a flat 20G.
const VELOCITY: [f64; 19] = [
    0.01, 0.016666, 0.024712, 0.036642, 0.054331, 0.080558, 0.119447, 0.177110, 0.262608,
    0.389380, 0.577350, 0.856061, 1.269319, 1.882072, 2.790628, 4.137781, 6.135262, 9.097012,
    13.48852,
];

/// Lock/clear delay in frames for levels 20..=30 (30 frames below that).
const DELAY_FRAMES: [u64; 12] = [29, 25, 22, 19, 17, 15, 13, 11, 9, 8, 7, 6];

/// Base points for plain clears, indexed by cleared-row count.
const CLEAR_SCORES: [u32; 5] = [0, 100, 300, 500, 800];

/// Base points for T-spin clears, indexed by cleared-row count.
const TSPIN_SCORES: [u32; 4] = [400, 800, 1200, 1600];

pub fn frame_micros(fps: u32) -> u64 {
    1_000_000 / u64::from(fps.max(1))
}

/// Microseconds between gravity steps at the given level.
pub fn gravity_micros(level: u32, frame: u64) -> u64 {
    let g = if level > 18 {
        20.0
    } else {
        VELOCITY[(level as usize).min(18)]
    };
    ((frame as f64) / g) as u64
}

/// Lock/clear delay in microseconds at the given level.
pub fn delay_micros(level: u32, frame: u64) -> u64 {
    let frames = if level < 20 {
        LOCK_FRAMES
    } else {
        DELAY_FRAMES[((level - 20) as usize).min(DELAY_FRAMES.len() - 1)]
    };
    frames * frame
}

/// Payload for the transient technique banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Technique {
    pub back_to_back: u32,
    pub tspin: bool,
    pub cleared: u32,
    pub perfect: bool,
    pub combo: u32,
}

/// What a resolved lock produced, for banner and timer bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolution {
    pub technique: Option<Technique>,
    pub promoted: Option<(u32, u32)>,
}

/// Score, level, lines, combo and back-to-back state.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    pub combo: u32,
    pub back_to_back: u32,
}

impl Progress {
    pub fn new(level: u32) -> Self {
        Self {
            score: 0,
            level: level.clamp(1, MAX_LEVEL),
            lines: 0,
            combo: 0,
            back_to_back: 0,
        }
    }

    /// Soft/hard drop points (1 or 2 per row).
    pub fn add_drop_points(&mut self, points: u64) {
        self.score += points;
    }

    /// Resolve a lock: score the executed clear and recompute progression.
    ///
    /// Order matters and matches the classic rules: base points, then the
    /// back-to-back 3/2 bonus (from the second consecutive difficult clear
    /// on), then the combo bonus, then the perfect-clear multiplier, then
    /// `points * level`, then lines and level promotion.
    pub fn resolve_lock(&mut self, cleared: u32, tspin: bool, perfect: bool) -> Resolution {
        let table_index = (cleared as usize).min(CLEAR_SCORES.len() - 1);
        let mut points = if tspin {
            TSPIN_SCORES[table_index.min(TSPIN_SCORES.len() - 1)]
        } else {
            CLEAR_SCORES[table_index]
        };

        let difficult = cleared >= 4 || (cleared > 0 && tspin);
        if difficult {
            if self.back_to_back > 0 {
                points = points * 3 / 2;
            }
            self.back_to_back += 1;
        } else if cleared > 0 {
            self.back_to_back = 0;
        }

        if cleared > 0 {
            self.score += u64::from(50 * self.combo);
            self.combo += 1;
        } else {
            self.combo = 0;
        }

        if perfect {
            self.score *= 5;
        }

        let technique = (tspin || cleared > 0).then_some(Technique {
            back_to_back: self.back_to_back,
            tspin,
            cleared,
            perfect,
            combo: self.combo,
        });

        self.score += u64::from(points) * u64::from(self.level);
        self.lines += cleared;

        let new_level = (self.lines / LINES_PER_LEVEL + 1).min(MAX_LEVEL);
        let promoted = (new_level > self.level).then(|| {
            let from = self.level;
            self.level = new_level;
            (from, new_level)
        });

        Resolution {
            technique,
            promoted,
        }
    }
}
