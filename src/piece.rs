//! Tetromino shapes, SRS rotation states and kick tables, seven-bag randomizer.

/// The seven tetrominoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tetromino {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl Tetromino {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// Cells occupied within the rotation box for the given rotation (0..4).
    /// JLSTZ use a 3x3 box, I a 4x4 box, O a fixed 2x2 inside a 4x2 box.
    /// Coordinates are (x right, y down) relative to the box origin.
    pub fn cells(&self, rotation: u8) -> [(i32, i32); 4] {
        match self {
            Self::O => [(1, 0), (2, 0), (1, 1), (2, 1)],
            Self::I => match rotation % 4 {
                0 => [(0, 1), (1, 1), (2, 1), (3, 1)],
                1 => [(2, 0), (2, 1), (2, 2), (2, 3)],
                2 => [(0, 2), (1, 2), (2, 2), (3, 2)],
                _ => [(1, 0), (1, 1), (1, 2), (1, 3)],
            },
            Self::T => match rotation % 4 {
                0 => [(1, 0), (0, 1), (1, 1), (2, 1)],
                1 => [(1, 0), (1, 1), (2, 1), (1, 2)],
                2 => [(0, 1), (1, 1), (2, 1), (1, 2)],
                _ => [(1, 0), (0, 1), (1, 1), (1, 2)],
            },
            Self::S => match rotation % 4 {
                0 => [(1, 0), (2, 0), (0, 1), (1, 1)],
                1 => [(1, 0), (1, 1), (2, 1), (2, 2)],
                2 => [(1, 1), (2, 1), (0, 2), (1, 2)],
                _ => [(0, 0), (0, 1), (1, 1), (1, 2)],
            },
            Self::Z => match rotation % 4 {
                0 => [(0, 0), (1, 0), (1, 1), (2, 1)],
                1 => [(2, 0), (1, 1), (2, 1), (1, 2)],
                2 => [(0, 1), (1, 1), (1, 2), (2, 2)],
                _ => [(1, 0), (0, 1), (1, 1), (0, 2)],
            },
            Self::J => match rotation % 4 {
                0 => [(0, 0), (0, 1), (1, 1), (2, 1)],
                1 => [(1, 0), (2, 0), (1, 1), (1, 2)],
                2 => [(0, 1), (1, 1), (2, 1), (2, 2)],
                _ => [(1, 0), (1, 1), (0, 2), (1, 2)],
            },
            Self::L => match rotation % 4 {
                0 => [(2, 0), (0, 1), (1, 1), (2, 1)],
                1 => [(1, 0), (1, 1), (1, 2), (2, 2)],
                2 => [(0, 1), (1, 1), (2, 1), (0, 2)],
                _ => [(0, 0), (1, 0), (1, 1), (1, 2)],
            },
        }
    }

    /// Colour index 0..7 into the theme's piece palette.
    pub fn color_index(&self) -> u8 {
        match self {
            Self::I => 0, // cyan
            Self::O => 1, // yellow
            Self::T => 2, // magenta
            Self::S => 3, // green
            Self::Z => 4, // red
            Self::J => 5, // blue
            Self::L => 6, // orange
        }
    }
}

/// SRS wall-kick offsets, (x right, y down). First candidate is always (0, 0).
/// A negative y moves the piece up: that candidate is a floor kick.
const JLSTZ_KICKS_CW: [[(i32, i32); 5]; 4] = [
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],  // 0 -> 1
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],    // 1 -> 2
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],     // 2 -> 3
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)], // 3 -> 0
];

const JLSTZ_KICKS_CCW: [[(i32, i32); 5]; 4] = [
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],     // 0 -> 3
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],    // 1 -> 0
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],  // 2 -> 1
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)], // 3 -> 2
];

const I_KICKS_CW: [[(i32, i32); 5]; 4] = [
    [(0, 0), (-2, 0), (1, 0), (-2, 1), (1, -2)], // 0 -> 1
    [(0, 0), (-1, 0), (2, 0), (-1, -2), (2, 1)], // 1 -> 2
    [(0, 0), (2, 0), (-1, 0), (2, -1), (-1, 2)], // 2 -> 3
    [(0, 0), (1, 0), (-2, 0), (1, 2), (-2, -1)], // 3 -> 0
];

const I_KICKS_CCW: [[(i32, i32); 5]; 4] = [
    [(0, 0), (-1, 0), (2, 0), (-1, -2), (2, 1)], // 0 -> 3
    [(0, 0), (2, 0), (-1, 0), (2, -1), (-1, 2)], // 1 -> 0
    [(0, 0), (1, 0), (-2, 0), (1, 2), (-2, -1)], // 2 -> 1
    [(0, 0), (-2, 0), (1, 0), (-2, 1), (1, -2)], // 3 -> 2
];

/// Kick candidates for rotating `kind` from `rotation` in the given direction.
/// O never needs a kick.
pub fn kicks(kind: Tetromino, rotation: u8, clockwise: bool) -> [(i32, i32); 5] {
    let r = (rotation % 4) as usize;
    match (kind, clockwise) {
        (Tetromino::O, _) => [(0, 0); 5],
        (Tetromino::I, true) => I_KICKS_CW[r],
        (Tetromino::I, false) => I_KICKS_CCW[r],
        (_, true) => JLSTZ_KICKS_CW[r],
        (_, false) => JLSTZ_KICKS_CCW[r],
    }
}

/// Bag of 7 tetrominoes (random order, then refill).
#[derive(Debug, Clone)]
pub struct Bag {
    queue: Vec<Tetromino>,
    rng: u32,
}

impl Bag {
    pub fn new() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_micros() ^ (d.as_secs() as u32))
            .unwrap_or(0x1234_5678);
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u32) -> Self {
        let mut b = Self {
            queue: Vec::with_capacity(14),
            rng: seed | 1,
        };
        b.refill();
        b
    }

    fn refill(&mut self) {
        let mut all = Tetromino::ALL.to_vec();
        // Fisher-Yates shuffle
        for i in (1..all.len()).rev() {
            let j = (self.next_rand() as usize) % (i + 1);
            all.swap(i, j);
        }
        self.queue.extend(all);
    }

    fn next_rand(&mut self) -> u32 {
        self.rng = self.rng.wrapping_mul(1103515245).wrapping_add(12345);
        self.rng >> 16
    }

    pub fn next(&mut self) -> Tetromino {
        if self.queue.len() < 2 {
            self.refill();
        }
        self.queue.remove(0)
    }
}

impl Default for Bag {
    fn default() -> Self {
        Self::new()
    }
}
