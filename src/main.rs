//! Minotui: modern-rules falling-block puzzle game in the terminal.

mod app;
mod clock;
mod game;
mod highscores;
mod input;
mod matrix;
mod piece;
mod rules;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from the CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub start_level: u32,
    pub fps: u32,
    pub preview: usize,
    /// Floor kicks allowed per piece cycle; None means unlimited.
    pub floorkick_limit: Option<u32>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        start_level: args.level,
        fps: args.fps,
        preview: args.preview,
        floorkick_limit: args.floorkick_limit,
    };
    let best = highscores::load_high_score();

    let mut app = App::new(config, theme);
    let report = app.run()?;

    println!("Your score: {}", report.score);
    println!("Ending level: {}", report.level);
    println!("Lines cleared: {}", report.lines);
    println!("Time: {:.2}s", report.play_micros as f64 / 1_000_000.0);
    if report.score > best {
        println!("New high score! (previous best: {best})");
        if let Err(err) = highscores::save_high_score(report.score) {
            eprintln!("could not save high score: {err}");
        }
    }
    Ok(())
}

/// Modern-rules falling-block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "minotui",
    version,
    about = "Modern-rules falling-block puzzle in the terminal: hold, preview, lock delay with budgeted move resets, T-spins, combos and back-to-back bonuses.",
    long_about = "Minotui is a terminal falling-block puzzle game.\n\n\
        Pieces drop under level-scaled gravity. Grounded pieces lock after a \
        short delay; moving or rotating restarts that delay, up to 15 times \
        per landing. Clear lines for points; tetrises and T-spin clears are \
        'difficult' and chain into back-to-back bonuses.\n\n\
        CONTROLS:\n  Left/Right or h/l  Move     Up or x/k  Rotate CW   z/u  Rotate CCW\n  Down or j          Soft drop  Space/Enter  Hard drop  c    Hold\n  p                  Pause      q / Esc      Quit"
)]
pub struct Args {
    /// Starting level (1-30); higher levels fall faster.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=30))]
    pub level: u32,

    /// Frame rate the display and timing grid derive from.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(10..=240))]
    pub fps: u32,

    /// Preview queue length.
    #[arg(long, default_value_t = 5)]
    pub preview: usize,

    /// Floor kicks allowed per piece cycle (unlimited when omitted).
    #[arg(long, value_name = "N")]
    pub floorkick_limit: Option<u32>,

    /// Path to theme file (btop-style theme[key]="value"). One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
