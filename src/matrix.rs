//! Playfield engine: collision, shifting, rotation with kicks, line clears,
//! T-spin and perfect-clear detection, hold, preview, spawning.

use crate::piece::{Bag, Tetromino, kicks};
use std::collections::VecDeque;

pub const MATRIX_WIDTH: usize = 10;
pub const MATRIX_HEIGHT: usize = 20;

/// The active piece: kind plus rotation-box position (x right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePiece {
    pub kind: Tetromino,
    pub x: i32,
    pub y: i32,
    pub rotation: u8,
}

impl ActivePiece {
    fn spawn(kind: Tetromino) -> Self {
        Self {
            kind,
            x: ((MATRIX_WIDTH as i32) - 4) / 2,
            y: 0,
            rotation: 0,
        }
    }

    /// Absolute board coordinates of the four cells.
    pub fn cells(&self) -> [(i32, i32); 4] {
        let mut out = self.kind.cells(self.rotation);
        for c in &mut out {
            c.0 += self.x;
            c.1 += self.y;
        }
        out
    }

    fn moved(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// Playfield plus the piece pipeline (hold slot, preview queue, bag).
#[derive(Debug, Clone)]
pub struct Matrix {
    /// rows[y][x]; rows[0] is the top.
    rows: Vec<[Option<Tetromino>; MATRIX_WIDTH]>,
    piece: Option<ActivePiece>,
    hold: Option<Tetromino>,
    preview: VecDeque<Tetromino>,
    bag: Bag,
    /// Last successful movement of the active piece was a rotation.
    rotation_was_last_move: bool,
    /// Most recent rotation used an upward kick; consumed on read.
    floorkick_used: bool,
    /// The most recently locked piece satisfied the T-spin test.
    tspin_locked: bool,
}

impl Matrix {
    pub fn new(preview_len: usize, mut bag: Bag) -> Self {
        let preview = (0..preview_len.max(1)).map(|_| bag.next()).collect();
        Self {
            rows: vec![[None; MATRIX_WIDTH]; MATRIX_HEIGHT],
            piece: None,
            hold: None,
            preview,
            bag,
            rotation_was_last_move: false,
            floorkick_used: false,
            tspin_locked: false,
        }
    }

    pub fn has_piece(&self) -> bool {
        self.piece.is_some()
    }

    pub fn piece(&self) -> Option<&ActivePiece> {
        self.piece.as_ref()
    }

    pub fn held(&self) -> Option<Tetromino> {
        self.hold
    }

    pub fn preview(&self) -> impl Iterator<Item = Tetromino> + '_ {
        self.preview.iter().copied()
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Tetromino> {
        self.rows.get(y).and_then(|row| row.get(x)).copied().flatten()
    }

    fn fits(&self, piece: &ActivePiece) -> bool {
        piece.cells().iter().all(|&(x, y)| {
            x >= 0
                && (x as usize) < MATRIX_WIDTH
                && y >= 0
                && (y as usize) < MATRIX_HEIGHT
                && self.rows[y as usize][x as usize].is_none()
        })
    }

    /// Take the next kind out of the preview queue, refilling from the bag.
    fn advance_queue(&mut self) -> Tetromino {
        let kind = self.preview.pop_front().unwrap_or_else(|| self.bag.next());
        self.preview.push_back(self.bag.next());
        kind
    }

    /// Spawn the next piece at the top of the playfield.
    /// Returns false on topout; the playfield is left without a piece.
    pub fn spawn_piece(&mut self) -> bool {
        let kind = self.advance_queue();
        self.tspin_locked = false;
        self.rotation_was_last_move = false;
        let fresh = ActivePiece::spawn(kind);
        if !self.fits(&fresh) {
            return false;
        }
        self.piece = Some(fresh);
        true
    }

    /// Non-mutating: could the active piece move down one row?
    pub fn can_drop(&self) -> bool {
        self.piece
            .as_ref()
            .is_some_and(|p| self.fits(&p.moved(0, 1)))
    }

    /// Move the active piece down one row. Returns true if motion occurred.
    /// When motion is impossible and `lock_on_failure` is set, the piece
    /// locks into the playfield instead.
    pub fn drop_one_row(&mut self, lock_on_failure: bool) -> bool {
        let Some(p) = self.piece else { return false };
        let down = p.moved(0, 1);
        if self.fits(&down) {
            self.piece = Some(down);
            self.rotation_was_last_move = false;
            true
        } else {
            if lock_on_failure {
                self.lock_piece();
            }
            false
        }
    }

    /// Shift the active piece one column. Returns true if motion occurred.
    pub fn shift(&mut self, dx: i32) -> bool {
        let Some(p) = self.piece else { return false };
        let over = p.moved(dx, 0);
        if self.fits(&over) {
            self.piece = Some(over);
            self.rotation_was_last_move = false;
            true
        } else {
            false
        }
    }

    /// Rotate the active piece, trying kick offsets in order. Upward kicks
    /// are floor kicks and are skipped once `floorkicks_remaining` is zero.
    pub fn rotate(&mut self, clockwise: bool, floorkicks_remaining: u32) -> bool {
        self.floorkick_used = false;
        let Some(p) = self.piece else { return false };
        let to = if clockwise {
            (p.rotation + 1) % 4
        } else {
            (p.rotation + 3) % 4
        };
        for (dx, dy) in kicks(p.kind, p.rotation, clockwise) {
            if dy < 0 && floorkicks_remaining == 0 {
                continue;
            }
            let cand = ActivePiece {
                rotation: to,
                ..p.moved(dx, dy)
            };
            if self.fits(&cand) {
                self.piece = Some(cand);
                self.rotation_was_last_move = true;
                self.floorkick_used = dy < 0;
                return true;
            }
        }
        false
    }

    /// Whether the most recent successful rotation consumed a floor kick.
    /// Consumed on read so a skipped rotation cannot be double-charged.
    pub fn floorkick_consumed(&mut self) -> bool {
        std::mem::take(&mut self.floorkick_used)
    }

    /// Swap the active piece with the hold slot (or the next queued kind on
    /// first use). Fails when there is no piece or the incoming piece does
    /// not fit at spawn.
    pub fn hold(&mut self) -> bool {
        let Some(p) = self.piece else { return false };
        let incoming = match self.hold {
            Some(k) => k,
            None => match self.preview.front() {
                Some(&k) => k,
                None => return false,
            },
        };
        let fresh = ActivePiece::spawn(incoming);
        if !self.fits(&fresh) {
            return false;
        }
        if self.hold.is_none() {
            self.advance_queue();
        }
        self.hold = Some(p.kind);
        self.piece = Some(fresh);
        self.rotation_was_last_move = false;
        true
    }

    fn lock_piece(&mut self) {
        let Some(p) = self.piece.take() else { return };
        self.tspin_locked = p.kind == Tetromino::T
            && self.rotation_was_last_move
            && self.filled_corners(&p) >= 3;
        for (x, y) in p.cells() {
            self.rows[y as usize][x as usize] = Some(p.kind);
        }
    }

    /// Filled (or out-of-bounds) diagonal corners of the piece's 3x3 box.
    fn filled_corners(&self, p: &ActivePiece) -> usize {
        [(0, 0), (2, 0), (0, 2), (2, 2)]
            .iter()
            .filter(|&&(dx, dy)| {
                let (x, y) = (p.x + dx, p.y + dy);
                x < 0
                    || x as usize >= MATRIX_WIDTH
                    || y < 0
                    || y as usize >= MATRIX_HEIGHT
                    || self.rows[y as usize][x as usize].is_some()
            })
            .count()
    }

    /// Whether the last locked piece was placed with a T-spin. Valid from
    /// lock until the next spawn.
    pub fn is_tspin(&self) -> bool {
        self.tspin_locked
    }

    /// Count full rows; when `execute` is set, remove them and let the
    /// stack above fall. Full rows stay on the playfield between a lock and
    /// the firing that executes the clear.
    pub fn resolve_clear(&mut self, execute: bool) -> u32 {
        let count = self.full_rows().len() as u32;
        if execute && count > 0 {
            self.rows.retain(|row| row.iter().any(Option::is_none));
            while self.rows.len() < MATRIX_HEIGHT {
                self.rows.insert(0, [None; MATRIX_WIDTH]);
            }
        }
        count
    }

    /// Indices of currently full rows (for the clear flash).
    pub fn full_rows(&self) -> Vec<usize> {
        (0..MATRIX_HEIGHT)
            .filter(|&y| self.rows[y].iter().all(Option::is_some))
            .collect()
    }

    pub fn is_perfect_clear(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(Option::is_none))
    }

    /// Test-only: place a cell directly.
    #[cfg(test)]
    pub(crate) fn set_cell(&mut self, x: usize, y: usize, kind: Tetromino) {
        self.rows[y][x] = Some(kind);
    }

    /// Where the active piece would land: the ghost position.
    pub fn ghost(&self) -> Option<ActivePiece> {
        let mut g = self.piece?;
        while self.fits(&g.moved(0, 1)) {
            g = g.moved(0, 1);
        }
        Some(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> Matrix {
        Matrix::new(5, Bag::with_seed(1))
    }

    /// Fill a row except the given columns.
    fn fill_row(m: &mut Matrix, y: usize, gaps: &[usize]) {
        for x in 0..MATRIX_WIDTH {
            if !gaps.contains(&x) {
                m.rows[y][x] = Some(Tetromino::J);
            }
        }
    }

    fn place(m: &mut Matrix, kind: Tetromino, x: i32, y: i32, rotation: u8) {
        m.piece = Some(ActivePiece {
            kind,
            x,
            y,
            rotation,
        });
    }

    #[test]
    fn test_spawned_piece_can_drop() {
        let mut m = matrix();
        assert!(m.spawn_piece());
        assert!(m.has_piece());
        assert!(m.can_drop());
    }

    #[test]
    fn test_shift_stops_at_walls() {
        let mut m = matrix();
        place(&mut m, Tetromino::O, 3, 0, 0);
        let mut shifts = 0;
        while m.shift(-1) {
            shifts += 1;
        }
        assert_eq!(shifts, 4); // O occupies box columns 1..=2
        assert!(!m.shift(-1));
    }

    #[test]
    fn test_drop_locks_on_failure_only_when_asked() {
        let mut m = matrix();
        place(&mut m, Tetromino::O, 3, MATRIX_HEIGHT as i32 - 2, 0);
        assert!(!m.drop_one_row(false));
        assert!(m.has_piece());
        assert!(!m.drop_one_row(true));
        assert!(!m.has_piece());
        assert_eq!(m.cell(4, MATRIX_HEIGHT - 1), Some(Tetromino::O));
    }

    #[test]
    fn test_hard_drop_distance_matches_ghost() {
        let mut m = matrix();
        place(&mut m, Tetromino::T, 3, 0, 0);
        let ghost = m.ghost().unwrap();
        let mut rows = 0;
        while m.drop_one_row(true) {
            rows += 1;
        }
        assert_eq!(rows, ghost.y - 0);
        assert!(!m.has_piece());
    }

    #[test]
    fn test_resolve_clear_counts_then_executes() {
        let mut m = matrix();
        fill_row(&mut m, MATRIX_HEIGHT - 1, &[]);
        fill_row(&mut m, MATRIX_HEIGHT - 2, &[]);
        fill_row(&mut m, MATRIX_HEIGHT - 3, &[0]);
        assert_eq!(m.resolve_clear(false), 2);
        // counting leaves the rows in place
        assert_eq!(m.resolve_clear(false), 2);
        assert_eq!(m.resolve_clear(true), 2);
        assert_eq!(m.resolve_clear(false), 0);
        // the partial row fell to the bottom
        assert_eq!(m.cell(1, MATRIX_HEIGHT - 1), Some(Tetromino::J));
        assert_eq!(m.cell(0, MATRIX_HEIGHT - 1), None);
    }

    #[test]
    fn test_perfect_clear_after_execution() {
        let mut m = matrix();
        fill_row(&mut m, MATRIX_HEIGHT - 1, &[]);
        assert!(!m.is_perfect_clear());
        m.resolve_clear(true);
        assert!(m.is_perfect_clear());
    }

    #[test]
    fn test_rotation_kicks_off_the_wall() {
        let mut m = matrix();
        // I piece vertical against the left wall: plain rotation to
        // horizontal would poke out; a kick must succeed.
        place(&mut m, Tetromino::I, -2, 5, 1);
        assert!(m.rotate(true, u32::MAX));
        let p = *m.piece().unwrap();
        assert_eq!(p.rotation, 2);
        assert!(p.cells().iter().all(|&(x, _)| x >= 0));
    }

    #[test]
    fn test_floorkick_budget_blocks_upward_kicks() {
        // T flat on the floor: rotating clockwise only succeeds via the
        // upward kick candidate.
        let mut m = matrix();
        place(&mut m, Tetromino::T, 3, MATRIX_HEIGHT as i32 - 2, 0);
        let mut with_budget = m.clone();
        assert!(with_budget.rotate(true, 1));
        assert!(with_budget.floorkick_consumed());
        assert!(!m.rotate(true, 0));
        assert!(!m.floorkick_consumed());
    }

    /// Notch at the bottom, overhang corner at the top: the canonical slot.
    fn tspin_slot(m: &mut Matrix) {
        fill_row(m, MATRIX_HEIGHT - 1, &[4]);
        fill_row(m, MATRIX_HEIGHT - 2, &[3, 4, 5]);
        m.rows[MATRIX_HEIGHT - 3][3] = Some(Tetromino::J);
    }

    #[test]
    fn test_tspin_requires_rotation_as_last_move() {
        let mut m = matrix();
        tspin_slot(&mut m);

        // twist into the slot: the final successful move is the rotation
        place(&mut m, Tetromino::T, 3, MATRIX_HEIGHT as i32 - 3, 1);
        assert!(m.rotate(true, u32::MAX));
        assert!(!m.drop_one_row(true));
        assert!(m.is_tspin());

        // same cell pattern, but the piece falls in pointing down: no T-spin
        let mut m2 = matrix();
        tspin_slot(&mut m2);
        place(&mut m2, Tetromino::T, 3, 0, 2);
        while m2.drop_one_row(true) {}
        assert!(!m2.is_tspin());
    }

    #[test]
    fn test_tspin_flag_cleared_by_next_spawn() {
        let mut m = matrix();
        tspin_slot(&mut m);
        place(&mut m, Tetromino::T, 3, MATRIX_HEIGHT as i32 - 3, 1);
        assert!(m.rotate(true, u32::MAX));
        assert!(!m.drop_one_row(true));
        assert!(m.is_tspin());
        assert!(m.spawn_piece());
        assert!(!m.is_tspin());
    }

    #[test]
    fn test_hold_swaps_and_respawns() {
        let mut m = matrix();
        assert!(!m.hold()); // no piece yet
        assert!(m.spawn_piece());
        let first = m.piece().unwrap().kind;
        let upcoming = m.preview().next().unwrap();
        assert!(m.hold());
        assert_eq!(m.held(), Some(first));
        assert_eq!(m.piece().unwrap().kind, upcoming);

        // second hold swaps back
        let second = m.piece().unwrap().kind;
        assert!(m.hold());
        assert_eq!(m.held(), Some(second));
        assert_eq!(m.piece().unwrap().kind, first);
    }

    #[test]
    fn test_topout_reports_spawn_failure() {
        let mut m = matrix();
        for y in 0..3 {
            fill_row(&mut m, y, &[]);
        }
        assert!(!m.spawn_piece());
        assert!(!m.has_piece());
    }

    #[test]
    fn test_preview_queue_keeps_its_length() {
        let mut m = matrix();
        assert_eq!(m.preview().count(), 5);
        m.spawn_piece();
        assert_eq!(m.preview().count(), 5);
        m.hold();
        assert_eq!(m.preview().count(), 5);
    }
}
