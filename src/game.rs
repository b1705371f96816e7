//! Piece lifecycle state machine, move/floor-kick budgets, gravity step.

use crate::clock::Timers;
use crate::matrix::Matrix;
use crate::rules::{self, Progress};

/// Move resets allowed while a piece sits on the ground before it is forced
/// to lock.
pub const MAX_MOVE_RESETS: u32 = 15;

/// Lifecycle of the current piece. `Grounded` means the piece failed to
/// drop at the last gravity evaluation and the lock timer is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceState {
    Empty,
    Spawning,
    Airborne,
    Grounded,
}

impl PieceState {
    pub fn is_grounded(self) -> bool {
        self == Self::Grounded
    }
}

/// Depleting counters for lock-delay resets and floor kicks. Never negative;
/// exhausted counters disable the action without faulting.
#[derive(Debug, Clone, Copy)]
pub struct Budgets {
    moves_left: u32,
    floorkicks_left: Option<u32>,
    floorkick_cap: Option<u32>,
}

impl Budgets {
    /// `floorkick_cap` of `None` means unlimited.
    pub fn new(floorkick_cap: Option<u32>) -> Self {
        Self {
            moves_left: MAX_MOVE_RESETS,
            floorkicks_left: floorkick_cap,
            floorkick_cap,
        }
    }

    pub fn can_move(&self) -> bool {
        self.moves_left > 0
    }

    pub fn moves_exhausted(&self) -> bool {
        self.moves_left == 0
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    pub fn charge_move(&mut self) {
        self.moves_left = self.moves_left.saturating_sub(1);
    }

    pub fn charge_floorkick(&mut self) {
        if let Some(n) = &mut self.floorkicks_left {
            *n = n.saturating_sub(1);
        }
    }

    pub fn floorkicks_remaining(&self) -> u32 {
        self.floorkicks_left.unwrap_or(u32::MAX)
    }

    pub fn refill_moves(&mut self) {
        self.moves_left = MAX_MOVE_RESETS;
    }

    pub fn refill_all(&mut self) {
        self.refill_moves();
        self.floorkicks_left = self.floorkick_cap;
    }
}

/// Session state threaded through the control loop: lifecycle, budgets,
/// progression, and the transient banner payloads.
#[derive(Debug, Clone)]
pub struct Game {
    pub state: PieceState,
    pub budgets: Budgets,
    pub progress: Progress,
    pub can_hold: bool,
    pub must_clear: bool,
    pub over: bool,
    pub technique: Option<rules::Technique>,
    pub levelup: Option<(u32, u32)>,
}

impl Game {
    pub fn new(start_level: u32, floorkick_cap: Option<u32>) -> Self {
        Self {
            state: PieceState::Empty,
            budgets: Budgets::new(floorkick_cap),
            progress: Progress::new(start_level),
            can_hold: true,
            must_clear: false,
            over: false,
            technique: None,
            levelup: None,
        }
    }

    /// One gravity-timer firing: resolve a pending clear, then run the
    /// lifecycle transition for the current piece.
    pub fn gravity_step(&mut self, matrix: &mut Matrix, timers: &mut Timers, now: u64) {
        if self.must_clear {
            self.resolve_pending_clear(matrix, timers, now);
        }

        match self.state {
            PieceState::Empty => {
                if matrix.spawn_piece() {
                    self.state = PieceState::Spawning;
                    // grace period before the fresh piece feels gravity
                    timers.gravity.reset_in(now, timers.entry_period);
                } else {
                    self.over = true;
                }
            }
            PieceState::Spawning | PieceState::Airborne | PieceState::Grounded => {
                if matrix.drop_one_row(false) {
                    self.state = PieceState::Airborne;
                    self.budgets.refill_moves();
                    timers.gravity.reset(now);
                } else if self.state.is_grounded() {
                    if timers.lock.fires(now) {
                        // input may have moved the piece since it grounded:
                        // the locking drop falls instead when it finds air
                        if matrix.drop_one_row(true) {
                            self.state = PieceState::Airborne;
                        } else {
                            self.note_locked();
                            if matrix.resolve_clear(false) > 0 {
                                timers.gravity.reset_in(now, timers.clear_period);
                            }
                        }
                    }
                } else {
                    self.state = PieceState::Grounded;
                    timers.lock.reset(now);
                }
            }
        }
    }

    /// Bookkeeping common to every lock that feeds the scoring engine.
    pub fn note_locked(&mut self) {
        self.state = PieceState::Empty;
        self.can_hold = true;
        self.budgets.refill_all();
        self.must_clear = true;
    }

    fn resolve_pending_clear(&mut self, matrix: &mut Matrix, timers: &mut Timers, now: u64) {
        let cleared = matrix.resolve_clear(true);
        let tspin = matrix.is_tspin();
        let perfect = matrix.is_perfect_clear();
        let resolution = self.progress.resolve_lock(cleared, tspin, perfect);

        if let Some(technique) = resolution.technique {
            self.technique = Some(technique);
            timers.technique.reset(now);
        }
        if let Some((from, to)) = resolution.promoted {
            self.levelup = Some((from, to));
            timers.levelup.reset(now);
            timers.apply_level(
                rules::gravity_micros(to, timers.frame),
                rules::delay_micros(to, timers.frame),
            );
        }

        self.must_clear = false;
        self.budgets.refill_moves();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{MATRIX_HEIGHT, MATRIX_WIDTH};
    use crate::piece::{Bag, Tetromino};

    const FRAME: u64 = 1_000_000 / 60;

    fn fixture() -> (Game, Matrix, Timers) {
        let game = Game::new(1, None);
        let matrix = Matrix::new(5, Bag::with_seed(3));
        let timers = Timers::new(
            0,
            FRAME,
            rules::gravity_micros(1, FRAME),
            rules::delay_micros(1, FRAME),
        );
        (game, matrix, timers)
    }

    /// Run gravity firings until the active piece reaches the ground.
    fn settle(game: &mut Game, matrix: &mut Matrix, timers: &mut Timers, now: &mut u64) {
        while game.state != PieceState::Grounded {
            *now += timers.gravity.period() + 1;
            game.gravity_step(matrix, timers, *now);
        }
    }

    #[test]
    fn test_spawn_uses_entry_delay() {
        let (mut game, mut matrix, mut timers) = fixture();
        let now = 1;
        game.gravity_step(&mut matrix, &mut timers, now);
        assert_eq!(game.state, PieceState::Spawning);
        assert!(matrix.has_piece());
        // gravity rescheduled with the entry delay, not the gravity period
        assert!(!timers.gravity.fires(now + timers.entry_period));
        assert!(timers.gravity.fires(now + timers.entry_period + 1));
    }

    #[test]
    fn test_drop_refills_moves_and_goes_airborne() {
        let (mut game, mut matrix, mut timers) = fixture();
        game.gravity_step(&mut matrix, &mut timers, 1);
        game.budgets.charge_move();
        let now = 2 + timers.entry_period;
        game.gravity_step(&mut matrix, &mut timers, now);
        assert_eq!(game.state, PieceState::Airborne);
        assert_eq!(game.budgets.moves_left(), MAX_MOVE_RESETS);
    }

    #[test]
    fn test_grounding_arms_the_lock_timer() {
        let (mut game, mut matrix, mut timers) = fixture();
        let mut now = 1;
        game.gravity_step(&mut matrix, &mut timers, now);
        settle(&mut game, &mut matrix, &mut timers, &mut now);
        assert!(game.state.is_grounded());
        // lock timer armed for a full lock period from the grounding
        assert!(!timers.lock.fires(now + rules::delay_micros(1, FRAME)));
        assert!(timers.lock.fires(now + rules::delay_micros(1, FRAME) + 1));
    }

    #[test]
    fn test_lock_fires_after_delay_and_flags_clear() {
        let (mut game, mut matrix, mut timers) = fixture();
        let mut now = 1;
        game.gravity_step(&mut matrix, &mut timers, now);
        settle(&mut game, &mut matrix, &mut timers, &mut now);
        game.can_hold = false;
        game.budgets.charge_move();

        // before the lock deadline nothing happens
        now += 1;
        game.gravity_step(&mut matrix, &mut timers, now);
        assert!(game.state.is_grounded());
        assert!(matrix.has_piece());

        now += rules::delay_micros(1, FRAME) + 1;
        game.gravity_step(&mut matrix, &mut timers, now);
        assert_eq!(game.state, PieceState::Empty);
        assert!(!matrix.has_piece());
        assert!(game.must_clear);
        assert!(game.can_hold);
        assert_eq!(game.budgets.moves_left(), MAX_MOVE_RESETS);
    }

    #[test]
    fn test_resolution_spawns_next_piece_in_same_firing() {
        let (mut game, mut matrix, mut timers) = fixture();
        let mut now = 1;
        game.gravity_step(&mut matrix, &mut timers, now);
        settle(&mut game, &mut matrix, &mut timers, &mut now);
        now += rules::delay_micros(1, FRAME) + 1;
        game.gravity_step(&mut matrix, &mut timers, now);
        assert!(game.must_clear);

        now += 1;
        game.gravity_step(&mut matrix, &mut timers, now);
        assert!(!game.must_clear);
        assert_eq!(game.state, PieceState::Spawning);
        assert!(matrix.has_piece());
    }

    #[test]
    fn test_budgets_never_go_negative() {
        let mut budgets = Budgets::new(Some(1));
        for _ in 0..20 {
            budgets.charge_move();
            budgets.charge_floorkick();
        }
        assert_eq!(budgets.moves_left(), 0);
        assert_eq!(budgets.floorkicks_remaining(), 0);
        budgets.refill_all();
        assert_eq!(budgets.moves_left(), MAX_MOVE_RESETS);
        assert_eq!(budgets.floorkicks_remaining(), 1);
    }

    #[test]
    fn test_unlimited_floorkicks_stay_available() {
        let mut budgets = Budgets::new(None);
        for _ in 0..1000 {
            budgets.charge_floorkick();
        }
        assert!(budgets.floorkicks_remaining() > 0);
    }

    #[test]
    fn test_promotion_retimes_gravity_and_lock() {
        let (mut game, mut matrix, mut timers) = fixture();
        game.progress.lines = 9;
        game.must_clear = true;
        for x in 0..MATRIX_WIDTH {
            matrix.set_cell(x, MATRIX_HEIGHT - 1, Tetromino::J);
        }
        let before = timers.gravity.period();
        game.gravity_step(&mut matrix, &mut timers, 1);
        assert_eq!(game.progress.level, 2);
        assert_eq!(game.levelup, Some((1, 2)));
        assert!(timers.gravity.period() < before);
    }

    #[test]
    fn test_topout_ends_the_session() {
        let (mut game, mut matrix, mut timers) = fixture();
        for y in 0..3 {
            for x in 0..MATRIX_WIDTH {
                matrix.set_cell(x, y, Tetromino::J);
            }
        }
        // no clear is pending, so the spawn attempt collides outright
        game.gravity_step(&mut matrix, &mut timers, 1);
        assert!(game.over);
        assert!(!matrix.has_piece());
    }
}
