/// Terminal renderer for every screen.
///
/// Each frame is composed into `front`, compared cell by cell against
/// `back` (what the terminal currently shows), and only changed cells are
/// queued. One flush per frame, then the buffers swap.
///
/// The renderer also remembers where the tile grid was last drawn, so a
/// mouse click can be mapped back to a cell index (`tile_at`).

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::difficulty::Difficulty;
use crate::sim::event::{FailReason, Outcome};
use crate::sim::round::{RenderState, RoundPhase};
use crate::sim::save::Scoreboard;
use crate::sim::world::{Phase, WorldState};
use crate::ui::quotes;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, used for
    /// both `Clear(ClearType::All)` and every blank cell so VTE terminals
    /// show no seams between rows.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 20, b: 38 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Horizontally centered string.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let x = self.width.saturating_sub(len) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, Cell::from_char(' ', Color::White, bg));
            }
        }
    }
}

// ── Layout ──

/// Tile footprint in terminal cells.
const TILE_W: usize = 8;
const TILE_H: usize = 3;
const GAP_X: usize = 2;
const GAP_Y: usize = 1;

/// Vertical offsets
const HUD_ROW: usize = 0;
const LABEL_ROW: usize = 2;
const BAR_ROW: usize = 3;
const GRID_ROW: usize = 5;

// ── Palette ──

const ACCENT: Color = Color::Rgb { r: 255, g: 200, b: 60 };
const GOOD: Color = Color::Rgb { r: 80, g: 220, b: 120 };
const BAD: Color = Color::Rgb { r: 240, g: 70, b: 70 };
const DIM: Color = Color::DarkGrey;
const FACE_DOWN: Color = Color::Rgb { r: 58, g: 62, b: 120 };
const FACE_UP: Color = Color::Rgb { r: 230, g: 232, b: 245 };
const ACCEPTED: Color = Color::Rgb { r: 46, g: 150, b: 84 };
const REJECTED: Color = Color::Rgb { r: 190, g: 40, b: 40 };

fn difficulty_color(d: Difficulty) -> Color {
    match d {
        Difficulty::Easy => GOOD,
        Difficulty::Medium => ACCENT,
        Difficulty::Hard => Color::Rgb { r: 255, g: 130, b: 40 },
        Difficulty::Extreme => BAD,
    }
}

/// Where the tile grid was drawn (terminal cells).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct GridRect {
    x: usize,
    y: usize,
    cols: usize,
    rows: usize,
}

impl GridRect {
    /// Grid centered horizontally in a terminal of width `term_w`.
    fn centered(term_w: usize, cols: usize, rows: usize) -> Self {
        let w = grid_width(cols);
        GridRect { x: term_w.saturating_sub(w) / 2, y: GRID_ROW, cols, rows }
    }

    fn tile_origin(&self, cell: usize) -> (usize, usize) {
        let gx = cell % self.cols;
        let gy = cell / self.cols;
        (self.x + gx * (TILE_W + GAP_X), self.y + gy * (TILE_H + GAP_Y))
    }

    /// Cell index under terminal position (x, y). Gaps hit nothing.
    fn tile_at(&self, x: usize, y: usize) -> Option<usize> {
        if self.cols == 0 || x < self.x || y < self.y {
            return None;
        }
        let (dx, dy) = (x - self.x, y - self.y);
        let (gx, gy) = (dx / (TILE_W + GAP_X), dy / (TILE_H + GAP_Y));
        if gx >= self.cols || gy >= self.rows {
            return None;
        }
        if dx % (TILE_W + GAP_X) >= TILE_W || dy % (TILE_H + GAP_Y) >= TILE_H {
            return None;
        }
        Some(gy * self.cols + gx)
    }
}

fn grid_width(cols: usize) -> usize {
    cols * TILE_W + cols.saturating_sub(1) * GAP_X
}

fn grid_height(rows: usize) -> usize {
    rows * TILE_H + rows.saturating_sub(1) * GAP_Y
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    grid: Option<GridRect>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            grid: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Force a full repaint on the next frame.
    pub fn invalidate(&mut self) {
        self.back.cells.fill(Cell::INVALID);
    }

    /// Map a click to a tile index using the last drawn grid.
    pub fn tile_at(&self, x: u16, y: u16) -> Option<usize> {
        self.grid?.tile_at(x as usize, y as usize)
    }

    pub fn render(&mut self, world: &WorldState, board: &Scoreboard) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Detect phase change → clear for clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        self.grid = None;

        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Help => self.compose_help(),
            Phase::Scoreboard => self.compose_scoreboard(world, board),
            Phase::Playing => self.compose_game(world),
            Phase::GameOver => self.compose_game_over(world),
        }

        self.compose_message(world);

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors, not ResetColor: the terminal default may
        // differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &WorldState) {
        let rs = w.engine.render_state();
        let diff = w.engine.profile().difficulty;

        // ── HUD row ──
        let hud = format!(
            " NEMERY   Level {:<3} Score {:<6} Best {:<6}",
            rs.level, rs.score, w.best_score.max(rs.score),
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, Color::Reset);
        let tag = format!("[{}]", diff.name());
        let tx = self.front.width.saturating_sub(tag.len() + 1);
        self.front.put_str(tx, HUD_ROW, &tag, difficulty_color(diff), Color::Reset);

        // ── Phase label + countdown ──
        let (label, color) = phase_label(rs.phase);
        self.front.put_centered(LABEL_ROW, label, color, Color::Reset);

        let grid = GridRect::centered(self.front.width, rs.cols, rs.rows);
        self.compose_countdown(&rs, grid);

        // ── Tiles ──
        let culprit = match rs.phase {
            RoundPhase::Resolved(Outcome::Failed(FailReason::WrongOrder)) => rs.history.last().copied(),
            _ => None,
        };
        let show_cursor = rs.phase == RoundPhase::AwaitingInput;
        for (i, tile) in rs.tiles.iter().enumerate() {
            let (x0, y0) = grid.tile_origin(i);
            let (bg, fg) = if Some(i) == culprit {
                (REJECTED, Color::White)
            } else if tile.selected {
                (ACCEPTED, Color::White)
            } else if tile.revealed {
                (FACE_UP, Color::Black)
            } else {
                (FACE_DOWN, Color::Rgb { r: 120, g: 126, b: 200 })
            };
            self.front.fill_rect(x0, y0, TILE_W, TILE_H, bg);

            let text = if tile.revealed { tile.value.to_string() } else { "·".to_string() };
            let tx = x0 + (TILE_W.saturating_sub(text.chars().count())) / 2;
            self.front.put_str(tx, y0 + TILE_H / 2, &text, fg, bg);

            if show_cursor && i == w.cursor {
                let mid = y0 + TILE_H / 2;
                self.front.set(x0.saturating_sub(1), mid, Cell::from_char('▶', ACCENT, Color::Reset));
                self.front.set(x0 + TILE_W, mid, Cell::from_char('◀', ACCENT, Color::Reset));
            }
        }
        self.grid = Some(grid);

        // ── Level transition ──
        if rs.phase == RoundPhase::Resolved(Outcome::LevelComplete) {
            self.compose_level_banner(rs.level, grid);
        }

        // ── Footer ──
        let footer_row = grid.y + grid_height(grid.rows) + 2;
        self.front.put_centered(
            footer_row,
            "Click a tile · Arrows + Enter/Space · ESC quit",
            DIM,
            Color::Reset,
        );
    }

    fn compose_countdown(&mut self, rs: &RenderState<'_>, grid: GridRect) {
        let bar_w = grid_width(grid.cols).max(20).min(self.front.width);
        let x0 = self.front.width.saturating_sub(bar_w) / 2;
        let active = matches!(rs.phase, RoundPhase::Memorizing | RoundPhase::AwaitingInput);
        let frac = if active { rs.countdown_progress.clamp(0.0, 1.0) } else { 0.0 };
        let filled = (frac * bar_w as f32).round() as usize;

        let color = match rs.phase {
            RoundPhase::Memorizing => Color::Rgb { r: 100, g: 160, b: 255 },
            _ if frac > 0.5 => GOOD,
            _ if frac > 0.25 => ACCENT,
            _ => BAD,
        };
        for i in 0..bar_w {
            let (ch, fg) = if i < filled { ('█', color) } else { ('░', DIM) };
            self.front.set(x0 + i, BAR_ROW, Cell::from_char(ch, fg, Color::Reset));
        }
        if active {
            let secs = format!(
                " {:.1}s / {:.1}s",
                rs.countdown_remaining_ms as f32 / 1000.0,
                rs.countdown_total_ms as f32 / 1000.0,
            );
            self.front.put_str(x0 + bar_w, BAR_ROW, &secs, color, Color::Reset);
        }
    }

    fn compose_level_banner(&mut self, level: u32, grid: GridRect) {
        let text = format!("★  LEVEL {}  ★", level);
        let box_w = text.chars().count() + 6;
        let box_h = 3;
        let gw = grid_width(grid.cols);
        let gh = grid_height(grid.rows);
        let bx = grid.x + gw.saturating_sub(box_w) / 2;
        let by = grid.y + gh.saturating_sub(box_h) / 2;
        let bg = Color::Rgb { r: 30, g: 34, b: 70 };
        self.front.fill_rect(bx, by, box_w, box_h, bg);
        self.front.put_str(bx + 3, by + 1, &text, ACCENT, bg);
    }

    fn compose_title(&mut self, w: &WorldState) {
        let logo = [
            r" _  _  ___  __  __  ___  ___ __   __",
            r"| \| || __||  \/  || __|| _ \\ \ / /",
            r"| .` || _| | |\/| || _| |   / \ V / ",
            r"|_|\_||___||_|  |_||___||_|_\  |_|  ",
        ];
        for (i, line) in logo.iter().enumerate() {
            self.front.put_centered(2 + i, line, ACCENT, Color::Reset);
        }
        self.front.put_centered(7, "Memorize the numbers. Tap them back in order.", DIM, Color::Reset);

        let diff = format!("◀  {}  ▶", w.difficulty.name());
        self.front.put_centered(10, &diff, difficulty_color(w.difficulty), Color::Reset);
        let p = w.difficulty.profile();
        let info = format!(
            "{}x{} grid · {} pt/tile · bonus x{}",
            p.grid.0, p.grid.1, p.points_per_tile, p.bonus_multiplier,
        );
        self.front.put_centered(11, &info, DIM, Color::Reset);

        let menu = [
            "ENTER   Play",
            "  D     Change difficulty",
            "  S     Scoreboard",
            "  H     How to play",
            "  Q     Quit",
        ];
        let mx = self.front.width.saturating_sub(26) / 2;
        for (i, line) in menu.iter().enumerate() {
            let color = if i == 0 { GOOD } else { Color::White };
            self.front.put_str(mx, 14 + i, line, color, Color::Reset);
        }
        let (sound, color) = if w.sound_enabled { ("on", GOOD) } else { ("off", DIM) };
        self.front.put_str(mx, 19, &format!("  M     Sound: {sound}"), color, Color::Reset);

        let best = format!("Best score: {}   Player: {}", w.best_score, w.player_name);
        self.front.put_centered(21, &best, DIM, Color::Reset);
    }

    fn compose_help(&mut self) {
        let lines = [
            ("How to play", ACCENT),
            ("", Color::White),
            ("1. Numbers appear on the tiles for a few seconds.", Color::White),
            ("2. They flip over. The input timer starts.", Color::White),
            ("3. Tap the tiles from the smallest number upward.", Color::White),
            ("", Color::White),
            ("A smaller number than the last one ends the run.", BAD),
            ("So does letting the timer run out.", BAD),
            ("", Color::White),
            ("Each tile scores points; clearing a level multiplies", Color::White),
            ("your score by the difficulty's bonus. Every level", Color::White),
            ("has bigger numbers and less time.", Color::White),
            ("", Color::White),
            ("Controls", ACCENT),
            ("  Mouse click            tap a tile", Color::White),
            ("  Arrows / WASD          move the cursor", Color::White),
            ("  Enter / Space          tap the tile under the cursor", Color::White),
            ("  M (title screen)       sound on/off", Color::White),
            ("  ESC                    back", Color::White),
        ];
        let x = self.front.width.saturating_sub(56) / 2;
        for (i, (line, color)) in lines.iter().enumerate() {
            self.front.put_str(x, 2 + i, line, *color, Color::Reset);
        }
        self.front.put_str(x, 3 + lines.len(), "ESC / ENTER: back to title", DIM, Color::Reset);
    }

    fn compose_scoreboard(&mut self, w: &WorldState, board: &Scoreboard) {
        self.front.put_centered(2, "═══  SCOREBOARD  ═══", ACCENT, Color::Reset);
        let x = self.front.width.saturating_sub(40) / 2;
        self.front.put_str(x, 4, " #  Name                 Score  Difficulty", DIM, Color::Reset);

        if board.is_empty() {
            self.front.put_str(x, 6, "No scores yet. Go play!", Color::White, Color::Reset);
        }
        for (i, e) in board.entries().iter().enumerate() {
            let name: String = e.name.chars().take(20).collect();
            let row = format!("{:>2}  {:<20} {:>6}  {}", i + 1, name, e.score, e.difficulty.name());
            let color = if i == 0 { ACCENT } else { Color::White };
            self.front.put_str(x, 6 + i, &row, color, Color::Reset);
        }

        let best = format!("Your best: {}", w.best_score);
        self.front.put_str(x, 13, &best, GOOD, Color::Reset);
        self.front.put_str(x, 15, "ESC / ENTER: back to title", DIM, Color::Reset);
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        let box_art = [
            "╔══════════════════════════════╗",
            "║          GAME  OVER          ║",
            "╚══════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_centered(3 + i, l, BAD, Color::Reset);
        }

        let Some(run) = &w.last_run else { return };

        let reason = match run.reason {
            Some(FailReason::WrongOrder) => "Wrong order",
            Some(FailReason::Timeout) => "Out of time",
            None => "",
        };
        self.front.put_centered(7, reason, DIM, Color::Reset);

        let x = self.front.width.saturating_sub(32) / 2;
        self.front.put_str(x, 9, &format!("Final score   {}", run.score), Color::White, Color::Reset);
        self.front.put_str(x, 10, &format!("Level reached {}", run.level), Color::White, Color::Reset);
        self.front.put_str(x, 11, &format!("Difficulty    {}", run.difficulty.name()),
            difficulty_color(run.difficulty), Color::Reset);

        let quote = if run.new_best {
            let blink = (w.anim_tick / 8) % 2 == 0;
            let fg = if blink { ACCENT } else { GOOD };
            self.front.put_centered(13, "★ NEW BEST ★", fg, Color::Reset);
            quotes::pick(quotes::NEW_BEST, run.quote)
        } else {
            quotes::pick(quotes::GAME_OVER, run.quote)
        };
        self.front.put_centered(15, &format!("\"{}\"", quote), Color::Rgb { r: 170, g: 170, b: 200 }, Color::Reset);

        self.front.put_str(x, 18, "▸ ENTER: Play again", GOOD, Color::Reset);
        self.front.put_str(x, 19, "▸ ESC:   Back to title", DIM, Color::Reset);
    }

    /// Message bar on the last row.
    fn compose_message(&mut self, w: &WorldState) {
        if w.message.is_empty() || self.front.height == 0 {
            return;
        }
        let row = self.front.height - 1;
        let bg = Color::Rgb { r: 200, g: 180, b: 50 };
        self.front.fill_rect(0, row, self.front.width, 1, bg);
        self.front.put_str(0, row, &format!(" ◈ {} ", w.message), Color::Black, bg);
    }
}

fn phase_label(phase: RoundPhase) -> (&'static str, Color) {
    match phase {
        RoundPhase::Idle => ("", DIM),
        RoundPhase::Revealing => ("Get ready...", DIM),
        RoundPhase::Memorizing => ("Memorize the numbers", Color::Rgb { r: 100, g: 160, b: 255 }),
        RoundPhase::AwaitingInput => ("Tap the tiles in ascending order", GOOD),
        RoundPhase::Resolved(Outcome::LevelComplete) => ("Level cleared!", ACCENT),
        RoundPhase::Resolved(Outcome::Failed(FailReason::WrongOrder)) => ("Wrong order!", BAD),
        RoundPhase::Resolved(Outcome::Failed(FailReason::Timeout)) => ("Time's up!", BAD),
    }
}
