//! Backend-neutral user commands and the pointer bookkeeping that produces them.
//!
//! The window layer translates raw key and mouse events into [`Command`]s;
//! everything after that point (the [`crate::flow::Gallery`] session) only
//! ever sees commands, which keeps it drivable from tests.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Forward,
    Strafe,
    Vertical,
}

/// Key state along one movement axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Positive,
    Negative,
    Stop,
}

impl Motion {
    pub fn factor(self) -> f32 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
            Self::Stop => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Move(Axis, Motion),
    /// Cursor travel in pixels since the last look event.
    Look { dx: f64, dy: f64 },
    /// A click at a window position, origin top left.
    Pick { x: f64, y: f64 },
    ToggleAnimation,
    ToggleShadows,
    ToggleWalkMode,
    ToggleHelp,
    BrightenLight,
    DimLight,
    Quit,
}

/// Turns a press/release pair into a click when the pointer barely moved in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickTracker {
    threshold: f64,
    pressed_at: Option<(f64, f64)>,
}

impl ClickTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            pressed_at: None,
        }
    }

    pub fn press(&mut self, x: f64, y: f64) {
        self.pressed_at = Some((x, y));
    }

    /// A [`Command::Pick`] at the release position if the Manhattan distance stayed within the threshold.
    pub fn release(&mut self, x: f64, y: f64) -> Option<Command> {
        let (px, py) = self.pressed_at.take()?;
        let distance = (x - px).abs() + (y - py).abs();
        (distance <= self.threshold).then_some(Command::Pick { x, y })
    }
}

/// Pointer state between window events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputState {
    look_held: bool,
    cursor: Option<(f64, f64)>,
    clicks: ClickTracker,
}

impl InputState {
    pub fn new(click_threshold: f64) -> Self {
        Self {
            look_held: false,
            cursor: None,
            clicks: ClickTracker::new(click_threshold),
        }
    }

    pub fn cursor(&self) -> Option<(f64, f64)> {
        self.cursor
    }

    pub fn look_held(&self) -> bool {
        self.look_held
    }

    /// Records the cursor; yields a look delta only while the look button is held.
    pub fn cursor_moved(&mut self, x: f64, y: f64) -> Option<Command> {
        let previous = self.cursor.replace((x, y));
        match previous {
            Some((px, py)) if self.look_held => Some(Command::Look { dx: x - px, dy: y - py }),
            _ => None,
        }
    }

    pub fn look_button(&mut self, pressed: bool) {
        self.look_held = pressed;
    }

    /// Feeds the select button. Returns a pick on a release close to the press.
    pub fn select_button(&mut self, pressed: bool) -> Option<Command> {
        let (x, y) = self.cursor?;
        if pressed {
            self.clicks.press(x, y);
            None
        } else {
            self.clicks.release(x, y)
        }
    }
}

/// Keyboard mapping for the winit backend.
#[cfg(feature = "window")]
pub fn key_command(key: winit::keyboard::KeyCode, pressed: bool) -> Option<Command> {
    use winit::keyboard::KeyCode;

    let held = |motion: Motion| if pressed { motion } else { Motion::Stop };
    let command = match key {
        KeyCode::KeyW => Command::Move(Axis::Forward, held(Motion::Positive)),
        KeyCode::KeyS => Command::Move(Axis::Forward, held(Motion::Negative)),
        KeyCode::KeyA => Command::Move(Axis::Strafe, held(Motion::Positive)),
        KeyCode::KeyD => Command::Move(Axis::Strafe, held(Motion::Negative)),
        KeyCode::KeyQ => Command::Move(Axis::Vertical, held(Motion::Positive)),
        KeyCode::KeyE => Command::Move(Axis::Vertical, held(Motion::Negative)),
        _ if !pressed => return None,
        KeyCode::Escape => Command::Quit,
        KeyCode::F1 => Command::ToggleHelp,
        KeyCode::KeyR => Command::ToggleAnimation,
        KeyCode::KeyH => Command::ToggleShadows,
        KeyCode::KeyB => Command::ToggleWalkMode,
        KeyCode::Equal | KeyCode::NumpadAdd => Command::BrightenLight,
        KeyCode::Minus | KeyCode::NumpadSubtract => Command::DimLight,
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_drags_still_click() {
        let mut clicks = ClickTracker::new(3.0);
        clicks.press(100.0, 100.0);
        assert_eq!(clicks.release(102.0, 101.0), Some(Command::Pick { x: 102.0, y: 101.0 }));
        clicks.press(100.0, 100.0);
        assert_eq!(clicks.release(102.0, 102.0), None);
        assert_eq!(clicks.release(100.0, 100.0), None);
    }

    #[test]
    fn look_needs_the_button() {
        let mut input = InputState::new(3.0);
        assert_eq!(input.cursor_moved(10.0, 10.0), None);
        assert_eq!(input.cursor_moved(15.0, 8.0), None);
        input.look_button(true);
        assert_eq!(input.cursor_moved(20.0, 10.0), Some(Command::Look { dx: 5.0, dy: 2.0 }));
        input.look_button(false);
        assert_eq!(input.cursor_moved(30.0, 10.0), None);
    }

    #[test]
    fn select_button_uses_the_last_cursor() {
        let mut input = InputState::new(3.0);
        assert_eq!(input.select_button(true), None);
        input.cursor_moved(50.0, 60.0);
        assert_eq!(input.select_button(true), None);
        input.cursor_moved(51.0, 60.0);
        assert_eq!(input.select_button(false), Some(Command::Pick { x: 51.0, y: 60.0 }));
    }

    #[test]
    fn motion_factors() {
        assert_eq!(Motion::Positive.factor(), 1.0);
        assert_eq!(Motion::Negative.factor(), -1.0);
        assert_eq!(Motion::Stop.factor(), 0.0);
    }
}
