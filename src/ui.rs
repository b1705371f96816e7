//! Layout and drawing: playfield, ghost, hold box, preview queue, HUD.

use crate::clock::{PauseClock, Timers};
use crate::game::Game;
use crate::matrix::{MATRIX_HEIGHT, MATRIX_WIDTH, Matrix};
use crate::piece::Tetromino;
use crate::rules::Technique;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph};

/// Each playfield cell is two terminal columns wide, one row tall.
const CELL_WIDTH: u16 = 2;
const BOARD_W: u16 = MATRIX_WIDTH as u16 * CELL_WIDTH + 2;
const BOARD_H: u16 = MATRIX_HEIGHT as u16 + 2;
const SIDEBAR_W: u16 = 18;
const TOTAL_W: u16 = BOARD_W + 1 + SIDEBAR_W;

const BLOCK: &str = "██";
const GHOST: &str = "░░";

#[allow(clippy::too_many_arguments)]
pub fn draw(
    f: &mut Frame,
    matrix: &Matrix,
    game: &Game,
    timers: &Timers,
    pause: &PauseClock,
    theme: &Theme,
    now: u64,
) {
    let area = f.area();
    if area.width < TOTAL_W || area.height < BOARD_H {
        let msg = Paragraph::new(format!(
            "terminal too small: need {TOTAL_W}x{BOARD_H}, have {}x{}",
            area.width, area.height
        ))
        .alignment(Alignment::Center);
        f.render_widget(msg, area);
        return;
    }

    let x0 = area.x + (area.width - TOTAL_W) / 2;
    let y0 = area.y + (area.height - BOARD_H) / 2;
    let board = Rect::new(x0, y0, BOARD_W, BOARD_H);

    f.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border)),
        board,
    );

    draw_board(f, board, matrix, game, theme);
    draw_sidebar(
        f,
        Rect::new(x0 + BOARD_W + 1, y0, SIDEBAR_W, BOARD_H),
        matrix,
        game,
        timers,
        pause,
        theme,
        now,
    );
}

fn cell_origin(board: Rect, x: usize, y: usize) -> (u16, u16) {
    (
        board.x + 1 + (x as u16) * CELL_WIDTH,
        board.y + 1 + y as u16,
    )
}

fn draw_board(f: &mut Frame, board: Rect, matrix: &Matrix, game: &Game, theme: &Theme) {
    let flashing = if game.must_clear {
        matrix.full_rows()
    } else {
        Vec::new()
    };

    let buf = f.buffer_mut();
    for y in 0..MATRIX_HEIGHT {
        let flash = flashing.contains(&y);
        for x in 0..MATRIX_WIDTH {
            if let Some(kind) = matrix.cell(x, y) {
                let style = if flash {
                    Style::default()
                        .fg(theme.flash)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(theme.piece_color(kind.color_index()))
                };
                let (cx, cy) = cell_origin(board, x, y);
                buf.set_string(cx, cy, BLOCK, style);
            }
        }
    }

    // ghost under the active piece
    if let Some(ghost) = matrix.ghost() {
        let style = Style::default().fg(theme.inactive_fg);
        for (x, y) in ghost.cells() {
            let (cx, cy) = cell_origin(board, x as usize, y as usize);
            buf.set_string(cx, cy, GHOST, style);
        }
    }

    if let Some(piece) = matrix.piece() {
        let style = Style::default().fg(theme.piece_color(piece.kind.color_index()));
        for (x, y) in piece.cells() {
            let (cx, cy) = cell_origin(board, x as usize, y as usize);
            buf.set_string(cx, cy, BLOCK, style);
        }
    }
}

/// Two text rows showing the spawn-orientation silhouette of a kind.
fn shape_rows(kind: Tetromino) -> [String; 2] {
    let cells = kind.cells(0);
    let mut rows = [String::new(), String::new()];
    for (y, row) in rows.iter_mut().enumerate() {
        for x in 0..4 {
            if cells.contains(&(x, y as i32)) {
                row.push_str(BLOCK);
            } else {
                row.push_str("  ");
            }
        }
    }
    rows
}

#[allow(clippy::too_many_arguments)]
fn draw_sidebar(
    f: &mut Frame,
    side: Rect,
    matrix: &Matrix,
    game: &Game,
    timers: &Timers,
    pause: &PauseClock,
    theme: &Theme,
    now: u64,
) {
    let title = Style::default().fg(theme.title);
    let text = Style::default().fg(theme.main_fg);
    let dim = Style::default().fg(theme.inactive_fg);

    let buf = f.buffer_mut();
    let mut y = side.y;
    let put = |buf: &mut ratatui::buffer::Buffer, y: &mut u16, s: &str, style: Style| {
        if *y < side.y + side.height {
            buf.set_string(side.x, *y, s, style);
        }
        *y += 1;
    };

    put(buf, &mut y, "HOLD", title);
    match matrix.held() {
        Some(kind) => {
            let style = if game.can_hold {
                Style::default().fg(theme.piece_color(kind.color_index()))
            } else {
                dim
            };
            for row in shape_rows(kind) {
                put(buf, &mut y, &row, style);
            }
        }
        None => {
            put(buf, &mut y, "--", dim);
            y += 1;
        }
    }
    y += 1;

    put(buf, &mut y, "NEXT", title);
    for kind in matrix.preview() {
        let style = Style::default().fg(theme.piece_color(kind.color_index()));
        for row in shape_rows(kind) {
            put(buf, &mut y, &row, style);
        }
    }
    y += 1;

    let play = pause.play_micros(now);
    let secs = play / 1_000_000;
    put(
        buf,
        &mut y,
        &format!("TIME   {:02}:{:02}", secs / 60, secs % 60),
        text,
    );
    put(
        buf,
        &mut y,
        &format!("LINES  {}", game.progress.lines),
        text,
    );

    // the level-up banner borrows the level slot for its window
    match game.levelup {
        Some((from, to)) if timers.levelup.pending(now) => {
            put(buf, &mut y, &format!("LEVEL  {from} > {to}"), title);
        }
        _ => {
            put(
                buf,
                &mut y,
                &format!("LEVEL  {}", game.progress.level),
                text,
            );
        }
    }

    // the technique banner borrows the score slot for its window
    match game.technique {
        Some(t) if timers.technique.pending(now) => {
            put(buf, &mut y, &technique_text(&t), title);
        }
        _ => {
            put(
                buf,
                &mut y,
                &format!("SCORE  {}", game.progress.score),
                text,
            );
        }
    }
}

fn technique_text(t: &Technique) -> String {
    let mut parts: Vec<String> = Vec::new();
    if t.back_to_back > 1 {
        parts.push("B2B".into());
    }
    if t.tspin {
        parts.push("T-SPIN".into());
    }
    match t.cleared {
        0 => {}
        1 => parts.push("SINGLE".into()),
        2 => parts.push("DOUBLE".into()),
        3 => parts.push("TRIPLE".into()),
        4 => parts.push("TETRIS".into()),
        n => parts.push(format!("{n} LINES")),
    }
    if t.perfect {
        parts.push("PERFECT".into());
    }
    if t.combo > 1 {
        parts.push(format!("COMBO {}", t.combo));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_rows_cover_four_cells() {
        for kind in Tetromino::ALL {
            let rows = shape_rows(kind);
            let blocks: usize = rows
                .iter()
                .map(|r| r.matches(BLOCK.chars().next().unwrap()).count())
                .sum();
            assert_eq!(blocks, 8, "{kind:?}"); // 4 cells, 2 glyphs each
        }
    }

    #[test]
    fn test_technique_text_composition() {
        let t = Technique {
            back_to_back: 2,
            tspin: true,
            cleared: 2,
            perfect: false,
            combo: 3,
        };
        assert_eq!(technique_text(&t), "B2B T-SPIN DOUBLE COMBO 3");

        let plain = Technique {
            back_to_back: 0,
            tspin: false,
            cleared: 4,
            perfect: true,
            combo: 1,
        };
        assert_eq!(technique_text(&plain), "TETRIS PERFECT");
    }
}
