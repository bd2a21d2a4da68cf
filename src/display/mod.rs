//! Terminal bar renderer
//!
//! The display is the processor's [`Output`]. Key presses arrive from the
//! input thread as [`Control`] messages and are applied at the start of the
//! next frame, so all drawing state lives on the processor thread.

pub mod draw;
pub mod input;

use crate::cancel::Cancel;
use crate::colors::{attr_color, attr_style, bar_style, scheme_color, scheme_name, TIERS};
use crate::error::{Error, Result};
use crate::help::{render_help_overlay, KEYS};
use crate::processor::{Frame, Output};
use crate::terminal::{Canvas, Style, Terminal, TerminfoGuard};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::thread::JoinHandle;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawType {
    #[default]
    Up = 1,
    UpDown = 2,
    Down = 3,
    LeftRight = 4,
}

impl DrawType {
    /// Wraps from `LeftRight` back to `Up`.
    pub fn next(self) -> Self {
        match self {
            DrawType::Up => DrawType::UpDown,
            DrawType::UpDown => DrawType::Down,
            DrawType::Down => DrawType::LeftRight,
            DrawType::LeftRight => DrawType::Up,
        }
    }
}

impl TryFrom<i32> for DrawType {
    type Error = String;

    fn try_from(v: i32) -> std::result::Result<Self, Self::Error> {
        match v {
            1 => Ok(DrawType::Up),
            2 => Ok(DrawType::UpDown),
            3 => Ok(DrawType::Down),
            4 => Ok(DrawType::LeftRight),
            _ => Err(format!("draw type must be 1-4, got {v}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayConfig {
    pub bar_width: i32,
    pub space_width: i32,
    pub base_size: i32,
    pub draw_type: DrawType,
    pub invert: bool,
    /// Color attributes, see [`crate::colors`].
    pub fg: u16,
    pub bg: u16,
    pub center: u16,
    pub scheme: Option<u8>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            bar_width: 2,
            space_width: 1,
            base_size: 1,
            draw_type: DrawType::Up,
            invert: false,
            fg: 0,
            bg: 0,
            center: 0,
            scheme: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayState {
    Uninitialized,
    Initialized,
    Running,
    Resized,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    BarWidth(i32),
    SpaceWidth(i32),
    BaseSize(i32),
    CycleDrawType,
    ToggleInvert,
    ToggleHelp,
    Scheme(u8),
    Resize(u16, u16),
}

pub struct Display {
    cfg: DisplayConfig,
    state: DisplayState,
    canvas: Canvas,
    styles: Vec<Style>,
    center: Style,
    show_help: bool,
    controls: Receiver<Control>,
    control_tx: Sender<Control>,
    terminal: Option<Terminal>,
    terminfo: Option<TerminfoGuard>,
    input: Option<JoinHandle<Result<()>>>,
    cancel: Option<Cancel>,
}

impl Display {
    pub fn new(cfg: DisplayConfig) -> Self {
        let (control_tx, controls) = unbounded();
        Self {
            cfg,
            state: DisplayState::Uninitialized,
            canvas: Canvas::new(0, 0),
            styles: Vec::new(),
            center: Style::default(),
            show_help: false,
            controls,
            control_tx,
            terminal: None,
            terminfo: None,
            input: None,
            cancel: None,
        }
    }

    /// A display drawing into an off-screen canvas of the given size.
    pub fn headless(cfg: DisplayConfig, width: u16, height: u16) -> Self {
        let mut d = Self::new(cfg);
        d.canvas.resize(width, height);
        d.restyle();
        d.state = DisplayState::Initialized;
        d
    }

    /// Take over the terminal.
    pub fn init(&mut self) -> Result<()> {
        if self.state != DisplayState::Uninitialized {
            return Ok(());
        }
        self.terminfo = Some(TerminfoGuard::new());
        let terminal = Terminal::new()?;
        let (w, h) = terminal.size()?;
        self.terminal = Some(terminal);
        self.canvas.resize(w, h);
        self.restyle();
        self.state = DisplayState::Initialized;
        tracing::debug!(width = w, height = h, "display initialized");
        Ok(())
    }

    /// Start the input thread. Quit keys cancel `cancel`.
    pub fn start(&mut self, cancel: &Cancel) -> Result<()> {
        if self.state != DisplayState::Initialized {
            return Err(Error::Config(format!("display cannot start from {:?}", self.state)));
        }
        if self.terminal.is_some() {
            self.input = Some(input::spawn(self.control_tx.clone(), cancel.clone())?);
        }
        self.cancel = Some(cancel.clone());
        self.state = DisplayState::Running;
        Ok(())
    }

    /// Stop input handling and restore the terminal. Surfaces a terminal
    /// event failure from the input thread.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == DisplayState::Stopped {
            return Ok(());
        }
        self.state = DisplayState::Stopped;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        let input = match self.input.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(Error::Processor("input thread panicked".into()))),
            None => Ok(()),
        };
        if let Some(mut terminal) = self.terminal.take() {
            terminal.close()?;
        }
        self.terminfo = None;
        input
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.cfg
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Queue a control as if it came from the keyboard.
    pub fn control(&self) -> Sender<Control> {
        self.control_tx.clone()
    }

    fn drain_controls(&mut self) {
        while let Ok(c) = self.controls.try_recv() {
            self.apply(c);
        }
    }

    pub fn apply(&mut self, control: Control) {
        match control {
            Control::BarWidth(d) => self.cfg.bar_width = (self.cfg.bar_width + d).max(1),
            Control::SpaceWidth(d) => self.cfg.space_width = (self.cfg.space_width + d).max(0),
            Control::BaseSize(d) => {
                self.cfg.base_size = (self.cfg.base_size + d).max(0);
                self.restyle();
            }
            Control::CycleDrawType => {
                self.cfg.draw_type = self.cfg.draw_type.next();
                self.restyle();
            }
            Control::ToggleInvert => self.cfg.invert = !self.cfg.invert,
            Control::ToggleHelp => self.show_help = !self.show_help,
            Control::Scheme(s) => {
                tracing::debug!(scheme = scheme_name(s), "color scheme");
                self.cfg.scheme = Some(s);
                self.restyle();
            }
            Control::Resize(w, h) => {
                tracing::debug!(width = w, height = h, "resize");
                self.canvas.resize(w, h);
                self.restyle();
                if self.state == DisplayState::Running {
                    self.state = DisplayState::Resized;
                }
            }
        }
    }

    /// Rebuild the per-distance style buffer and the background.
    fn restyle(&mut self) {
        let (w, h) = self.canvas.size();
        let span = draw::max_span(&self.cfg, w, h).max(1);
        let bg = attr_color(self.cfg.bg);
        let plain = bar_style(self.cfg.fg, self.cfg.bg);
        self.styles = (0..span)
            .map(|k| match self.cfg.scheme {
                Some(scheme) if self.cfg.fg == 0 => Style {
                    bg,
                    ..scheme_color(scheme, k * TIERS / span)
                },
                _ => plain,
            })
            .collect();
        self.center = Style {
            bg,
            ..attr_style(self.cfg.center)
        };
        self.canvas.set_background(Style {
            bg,
            ..Style::default()
        });
    }
}

impl Output for Display {
    fn bins(&mut self, channels: usize) -> usize {
        self.drain_controls();
        let (w, h) = self.canvas.size();
        draw::bins(&self.cfg, w, h, channels)
    }

    fn write(&mut self, frame: &Frame<'_>) -> Result<()> {
        if self.state == DisplayState::Stopped {
            return Ok(());
        }
        self.drain_controls();

        self.canvas.clear();
        draw::draw(&mut self.canvas, &self.cfg, frame, &self.styles, self.center);
        if self.show_help {
            render_help_overlay(&mut self.canvas, KEYS);
        }
        if let Some(terminal) = &mut self.terminal {
            terminal.render(&self.canvas)?;
        }

        if self.state == DisplayState::Resized {
            self.state = DisplayState::Running;
        }
        Ok(())
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
