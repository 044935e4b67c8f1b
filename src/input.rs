//! Keyboard and gamepad to action mapping
//!
//! The host collects raw key/button state; this module turns it into exactly
//! one [`Action`] per frame. Keys are level-triggered (held keys keep acting).

use crate::sim::Action;

/// Stick deflection needed before an axis counts as pressed
pub const AXIS_DEADZONE: f64 = 0.3;

/// Standard-mapping buttons that accelerate (A, RB, RT, Start, D-pad right)
const PAD_ACCELERATE: [usize; 5] = [0, 5, 7, 9, 15];
const PAD_UP: usize = 12;
const PAD_DOWN: usize = 13;
/// Left stick vertical axis
const PAD_AXIS_Y: usize = 1;

/// Held keyboard keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub accelerate: bool,
    /// One-shot; consumed by the session on the next frame
    pub restart: bool,
}

impl KeyState {
    /// Apply a DOM `KeyboardEvent.key` press/release.
    /// Returns true if the key is bound (so the host can suppress scrolling).
    pub fn set_key(&mut self, key: &str, pressed: bool) -> bool {
        match key {
            "ArrowUp" | "w" | "W" => self.up = pressed,
            "ArrowDown" | "s" | "S" => self.down = pressed,
            " " | "Spacebar" | "ArrowRight" => self.accelerate = pressed,
            "r" | "R" => {
                if pressed {
                    self.restart = true;
                }
            }
            _ => return false,
        }
        true
    }

    /// Action for the held keys. Accelerate wins, then up, then down.
    pub fn action(&self) -> Action {
        if self.accelerate {
            Action::Accelerate
        } else if self.up {
            Action::Up
        } else if self.down {
            Action::Down
        } else {
            Action::Noop
        }
    }

    /// Take the pending restart request
    pub fn take_restart(&mut self) -> bool {
        std::mem::take(&mut self.restart)
    }

    /// Release everything (e.g. when the window loses focus)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One poll of a standard-mapping gamepad
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadSnapshot {
    pub buttons: Vec<bool>,
    pub axes: Vec<f64>,
}

impl GamepadSnapshot {
    fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    fn axis(&self, index: usize) -> f64 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    /// Action for this pad, or `None` when nothing is pressed
    pub fn action(&self) -> Option<Action> {
        let stick = self.axis(PAD_AXIS_Y);
        if PAD_ACCELERATE.iter().any(|&b| self.button(b)) {
            Some(Action::Accelerate)
        } else if self.button(PAD_UP) || stick < -AXIS_DEADZONE {
            Some(Action::Up)
        } else if self.button(PAD_DOWN) || stick > AXIS_DEADZONE {
            Some(Action::Down)
        } else {
            None
        }
    }

    /// Poll the first connected gamepad (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn poll() -> Option<Self> {
        use wasm_bindgen::JsCast;

        let pads = web_sys::window()?.navigator().get_gamepads().ok()?;
        for entry in pads.iter() {
            let Ok(pad) = entry.dyn_into::<web_sys::Gamepad>() else {
                continue;
            };
            if !pad.connected() {
                continue;
            }
            let buttons = pad
                .buttons()
                .iter()
                .map(|b| {
                    b.dyn_into::<web_sys::GamepadButton>()
                        .map(|b| b.pressed())
                        .unwrap_or(false)
                })
                .collect();
            let axes = pad.axes().iter().map(|a| a.as_f64().unwrap_or(0.0)).collect();
            return Some(Self { buttons, axes });
        }
        None
    }
}

/// Combine keyboard and gamepad. An active gamepad overrides the keyboard.
pub fn resolve_action(keys: &KeyState, pad: Option<&GamepadSnapshot>) -> Action {
    pad.and_then(GamepadSnapshot::action)
        .unwrap_or_else(|| keys.action())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_priority() {
        let mut keys = KeyState::default();
        assert_eq!(keys.action(), Action::Noop);
        keys.set_key("ArrowDown", true);
        assert_eq!(keys.action(), Action::Down);
        keys.set_key("ArrowUp", true);
        assert_eq!(keys.action(), Action::Up);
        keys.set_key(" ", true);
        assert_eq!(keys.action(), Action::Accelerate);
        keys.set_key(" ", false);
        keys.set_key("ArrowUp", false);
        assert_eq!(keys.action(), Action::Down);
    }

    #[test]
    fn test_unbound_keys_ignored() {
        let mut keys = KeyState::default();
        assert!(!keys.set_key("q", true));
        assert_eq!(keys, KeyState::default());
        assert!(keys.set_key("ArrowRight", true));
        assert!(keys.accelerate);
    }

    #[test]
    fn test_restart_is_one_shot() {
        let mut keys = KeyState::default();
        keys.set_key("R", true);
        keys.set_key("R", false);
        assert!(keys.take_restart());
        assert!(!keys.take_restart());
    }

    #[test]
    fn test_gamepad_mapping() {
        let mut pad = GamepadSnapshot {
            buttons: vec![false; 16],
            axes: vec![0.0, 0.0],
        };
        assert_eq!(pad.action(), None);

        pad.axes[1] = -0.2;
        assert_eq!(pad.action(), None);
        pad.axes[1] = -0.8;
        assert_eq!(pad.action(), Some(Action::Up));
        pad.axes[1] = 0.5;
        assert_eq!(pad.action(), Some(Action::Down));

        pad.buttons[12] = true;
        assert_eq!(pad.action(), Some(Action::Up));
        pad.buttons[7] = true;
        assert_eq!(pad.action(), Some(Action::Accelerate));
    }

    #[test]
    fn test_short_gamepad_is_safe() {
        let pad = GamepadSnapshot::default();
        assert_eq!(pad.action(), None);
    }

    #[test]
    fn test_resolve_prefers_active_pad() {
        let mut keys = KeyState::default();
        keys.set_key("ArrowDown", true);

        let idle = GamepadSnapshot {
            buttons: vec![false; 16],
            axes: vec![0.0; 4],
        };
        assert_eq!(resolve_action(&keys, Some(&idle)), Action::Down);
        assert_eq!(resolve_action(&keys, None), Action::Down);

        let mut active = idle.clone();
        active.buttons[0] = true;
        assert_eq!(resolve_action(&keys, Some(&active)), Action::Accelerate);
    }
}
