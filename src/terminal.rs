use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor,
        SetForegroundColor,
    },
    terminal::{
        disable_raw_mode, enable_raw_mode, size, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use std::env;
use std::ffi::OsString;
use std::io::{self, stdout, Write};

/// Colors and attributes of a cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub underline: bool,
    pub reverse: bool,
}

impl Style {
    pub fn reversed(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }
}

/// A single cell in the back buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            style: Style::default(),
        }
    }
}

/// Back buffer the renderer draws into
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u16,
    height: u16,
    rows: Vec<Vec<Cell>>,
    blank: Cell,
}

impl Canvas {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            rows: vec![vec![Cell::default(); width as usize]; height as usize],
            blank: Cell::default(),
        }
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.rows = vec![vec![self.blank; width as usize]; height as usize];
    }

    /// Background style used by `clear`.
    pub fn set_background(&mut self, style: Style) {
        self.blank = Cell { ch: ' ', style };
    }

    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.fill(self.blank);
        }
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, ch: char, style: Style) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.rows[y as usize][x as usize] = Cell { ch, style };
        }
    }

    pub fn set_str(&mut self, x: i32, y: i32, s: &str, style: Style) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i as i32, y, ch, style);
        }
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.rows.get(y as usize)?.get(x as usize)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }
}

/// Raw-mode alternate-screen session on stdout
pub struct Terminal {
    active: bool,
}

impl Terminal {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(stdout(), EnterAlternateScreen, Hide, Clear(ClearType::All)) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self { active: true })
    }

    pub fn size(&self) -> io::Result<(u16, u16)> {
        size()
    }

    /// Write the whole canvas, emitting attribute changes only where the
    /// style differs from the previous cell.
    pub fn render(&mut self, canvas: &Canvas) -> io::Result<()> {
        let mut out = stdout().lock();
        let mut current: Option<Style> = None;

        for (y, row) in canvas.rows().iter().enumerate() {
            queue!(out, MoveTo(0, y as u16))?;
            for cell in row {
                if current != Some(cell.style) {
                    apply_style(&mut out, cell.style)?;
                    current = Some(cell.style);
                }
                queue!(out, Print(cell.ch))?;
            }
        }

        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
        out.flush()
    }

    /// Restore the terminal. Safe to call more than once.
    pub fn close(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        execute!(stdout(), SetAttribute(Attribute::Reset), ResetColor, Show, LeaveAlternateScreen)?;
        disable_raw_mode()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn apply_style(out: &mut impl Write, style: Style) -> io::Result<()> {
    queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
    if let Some(fg) = style.fg {
        queue!(out, SetForegroundColor(fg))?;
    }
    if let Some(bg) = style.bg {
        queue!(out, SetBackgroundColor(bg))?;
    }
    if style.bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if style.underline {
        queue!(out, SetAttribute(Attribute::Underlined))?;
    }
    if style.reverse {
        queue!(out, SetAttribute(Attribute::Reverse))?;
    }
    Ok(())
}

/// Unsets `TERMINFO` under tmux for the lifetime of the guard and restores
/// the previous value on drop.
pub struct TerminfoGuard {
    saved: Option<Option<OsString>>,
}

impl TerminfoGuard {
    pub fn new() -> Self {
        let under_tmux = env::var("TERM")
            .map(|t| t.starts_with("tmux"))
            .unwrap_or(false);
        if !under_tmux {
            return Self { saved: None };
        }
        let previous = env::var_os("TERMINFO");
        env::remove_var("TERMINFO");
        Self {
            saved: Some(previous),
        }
    }
}

impl Default for TerminfoGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminfoGuard {
    fn drop(&mut self) {
        if let Some(Some(value)) = self.saved.take() {
            env::set_var("TERMINFO", value);
        }
    }
}
