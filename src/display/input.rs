//! Terminal event thread. Key presses become [`Control`] messages; quit
//! keys and event errors cancel the session.

use super::Control;
use crate::cancel::Cancel;
use crate::colors::scheme_for_key;
use crate::error::{Error, Result};
use crossbeam::channel::Sender;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, PartialEq)]
pub enum Action {
    Control(Control),
    Quit,
}

pub fn translate(ev: &Event) -> Option<Action> {
    match ev {
        Event::Key(key) => translate_key(key),
        Event::Resize(w, h) => Some(Action::Control(Control::Resize(*w, *h))),
        _ => None,
    }
}

fn translate_key(key: &KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let control = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Some(Action::Quit)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Some(Action::Quit),
        KeyCode::Right => Control::BarWidth(1),
        KeyCode::Left => Control::BarWidth(-1),
        KeyCode::Up => Control::SpaceWidth(1),
        KeyCode::Down => Control::SpaceWidth(-1),
        KeyCode::Char('+') | KeyCode::Char('=') => Control::BaseSize(1),
        KeyCode::Char('-') | KeyCode::Char('_') => Control::BaseSize(-1),
        KeyCode::Char(' ') => Control::CycleDrawType,
        KeyCode::Char('i') => Control::ToggleInvert,
        KeyCode::Char('?') => Control::ToggleHelp,
        code => Control::Scheme(scheme_for_key(code)?),
    };
    Some(Action::Control(control))
}

pub fn spawn(tx: Sender<Control>, cancel: Cancel) -> Result<JoinHandle<Result<()>>> {
    let handle = thread::Builder::new()
        .name("input".into())
        .spawn(move || run(tx, cancel))?;
    Ok(handle)
}

fn run(tx: Sender<Control>, cancel: Cancel) -> Result<()> {
    while !cancel.is_cancelled() {
        let ev = match event::poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => event::read(),
            Err(e) => Err(e),
        };
        let ev = match ev {
            Ok(ev) => ev,
            Err(e) => {
                tracing::error!(error = %e, "terminal event stream failed");
                cancel.cancel();
                return Err(Error::TerminalEvent(e));
            }
        };
        match translate(&ev) {
            Some(Action::Quit) => {
                tracing::debug!("quit requested");
                cancel.cancel();
            }
            Some(Action::Control(control)) => {
                if tx.send(control).is_err() {
                    return Ok(());
                }
            }
            None => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            assert_eq!(translate(&press(code)), Some(Action::Quit));
        }
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(translate(&ctrl_c), Some(Action::Quit));
        assert_eq!(translate(&press(KeyCode::Char('c'))), None);
    }

    #[test]
    fn width_and_base_keys() {
        assert_eq!(
            translate(&press(KeyCode::Right)),
            Some(Action::Control(Control::BarWidth(1)))
        );
        assert_eq!(
            translate(&press(KeyCode::Down)),
            Some(Action::Control(Control::SpaceWidth(-1)))
        );
        assert_eq!(
            translate(&press(KeyCode::Char('='))),
            Some(Action::Control(Control::BaseSize(1)))
        );
        assert_eq!(
            translate(&press(KeyCode::Char('-'))),
            Some(Action::Control(Control::BaseSize(-1)))
        );
    }

    #[test]
    fn mode_keys() {
        assert_eq!(
            translate(&press(KeyCode::Char(' '))),
            Some(Action::Control(Control::CycleDrawType))
        );
        assert_eq!(
            translate(&press(KeyCode::Char('#'))),
            Some(Action::Control(Control::Scheme(3)))
        );
        assert_eq!(translate(&press(KeyCode::Char('z'))), None);
    }

    #[test]
    fn releases_and_resizes() {
        let mut release = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(translate(&Event::Key(release)), None);
        assert_eq!(
            translate(&Event::Resize(120, 30)),
            Some(Action::Control(Control::Resize(120, 30)))
        );
    }
}
