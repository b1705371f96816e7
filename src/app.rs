//! App: terminal init, the deadline-scheduled main loop, input dispatch.

use crate::GameConfig;
use crate::clock::{Clock, PauseClock, Timers};
use crate::game::{Game, PieceState};
use crate::input::{Action, key_to_action, next_key};
use crate::matrix::Matrix;
use crate::piece::Bag;
use crate::rules;
use crate::theme::Theme;
use anyhow::Result;
use ratatui::DefaultTerminal;
use std::time::Duration;

/// Final statistics reported after the terminal is restored.
#[derive(Debug, Clone, Copy)]
pub struct Report {
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    pub play_micros: u64,
}

pub struct App {
    theme: Theme,
    clock: Clock,
    timers: Timers,
    pause: PauseClock,
    game: Game,
    matrix: Matrix,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let clock = Clock::start();
        let now = clock.now();
        let frame = rules::frame_micros(config.fps);
        let timers = Timers::new(
            now,
            frame,
            rules::gravity_micros(config.start_level, frame),
            rules::delay_micros(config.start_level, frame),
        );
        let game = Game::new(config.start_level, config.floorkick_limit);
        let matrix = Matrix::new(config.preview, Bag::new());
        Self {
            theme,
            clock,
            timers,
            pause: PauseClock::default(),
            game,
            matrix,
        }
    }

    pub fn run(&mut self) -> Result<Report> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result?;
        let now = self.clock.now();
        Ok(Report {
            score: self.game.progress.score,
            level: self.game.progress.level,
            lines: self.game.progress.lines,
            play_micros: self.pause.play_micros(now),
        })
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            std::thread::sleep(Duration::from_millis(1));
            let now = self.clock.now();

            // paused: only the control timer is serviced, and only the
            // pause toggle (or quit) is honoured; every other deadline is
            // left untouched and caught up after resume
            if self.pause.is_paused() {
                if self.timers.control.fires(now) {
                    while let Some(key) = next_key()? {
                        match key_to_action(key) {
                            Action::Pause => self.pause.toggle(now),
                            Action::Quit => return Ok(()),
                            _ => {}
                        }
                    }
                    self.timers.control.advance(now);
                }
                continue;
            }

            if self.timers.display.fires(now) {
                terminal.draw(|f| {
                    crate::ui::draw(
                        f,
                        &self.matrix,
                        &self.game,
                        &self.timers,
                        &self.pause,
                        &self.theme,
                        now,
                    )
                })?;
                self.timers.display.advance(now);
            }

            if self.timers.control.fires(now) {
                while let Some(key) = next_key()? {
                    let action = key_to_action(key);
                    if action == Action::Quit {
                        return Ok(());
                    }
                    self.dispatch(action, now);

                    // out of move resets: the piece is forced down and
                    // locks where it stands
                    if self.game.budgets.moves_exhausted() && self.matrix.has_piece() {
                        if !self.matrix.drop_one_row(true) {
                            self.game.state = PieceState::Empty;
                            self.game.budgets.refill_all();
                        }
                    }
                }
                self.timers.control.advance(now);
            }

            if self.timers.gravity.fires(now) {
                self.game
                    .gravity_step(&mut self.matrix, &mut self.timers, now);
                if self.game.over {
                    return Ok(());
                }
            }
        }
    }

    /// Translate one input event into matrix calls, timer resets and budget
    /// charges.
    fn dispatch(&mut self, action: Action, now: u64) {
        match action {
            Action::Pause => self.pause.toggle(now),
            Action::Hold => {
                if self.game.can_hold && self.matrix.hold() {
                    self.game.can_hold = false;
                }
            }
            Action::ShiftLeft | Action::ShiftRight => {
                let dx = if action == Action::ShiftLeft { -1 } else { 1 };
                if self.game.budgets.can_move() && self.matrix.shift(dx) {
                    self.timers.lock.reset(now);
                }
                // charged whenever the piece was grounded at the last
                // gravity evaluation, even if this shift just freed it
                if self.game.state.is_grounded() {
                    self.game.budgets.charge_move();
                }
            }
            Action::RotateCw | Action::RotateCcw => {
                let cw = action == Action::RotateCw;
                if self.game.budgets.can_move()
                    && self
                        .matrix
                        .rotate(cw, self.game.budgets.floorkicks_remaining())
                {
                    self.timers.lock.reset(now);
                }
                if self.matrix.floorkick_consumed() {
                    self.game.budgets.charge_floorkick();
                }
                if self.game.state.is_grounded() {
                    self.game.budgets.charge_move();
                }
            }
            Action::SoftDrop => {
                if self.matrix.drop_one_row(false) {
                    self.timers.gravity.reset(now);
                    self.game.progress.add_drop_points(1);
                }
            }
            Action::HardDrop => {
                while self.matrix.drop_one_row(true) {
                    self.game.progress.add_drop_points(2);
                }
                if !self.matrix.has_piece() {
                    self.game.state = PieceState::Empty;
                    self.game.budgets.refill_all();
                }
                if !self.game.must_clear {
                    self.timers.gravity.reset_in(now, self.timers.entry_period);
                    if self.matrix.resolve_clear(false) > 0 {
                        self.timers.gravity.push(self.timers.clear_period);
                    }
                    self.game.must_clear = true;
                }
                self.game.can_hold = true;
            }
            Action::Quit | Action::None => {}
        }
    }
}
