/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Move the tile cursor
///   A / Start             →  Tap / Confirm
///   B / Select            →  Back
///   Y                     →  Cycle difficulty (title screen)
///   X                     →  Sound on/off (title screen)

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.5;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    Start,
    Select,
}

const BTN_COUNT: usize = 6;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South  => Some(Btn::A),
            Button::East   => Some(Btn::B),
            Button::West   => Some(Btn::X),
            Button::North  => Some(Btn::Y),
            Button::Start  => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
    cycle_difficulty: Vec<Btn>,
    toggle_sound: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            confirm: vec![Btn::A, Btn::Start],
            cancel: vec![Btn::B, Btn::Select],
            cycle_difficulty: vec![Btn::Y],
            toggle_sound: vec![Btn::X],
        }
    }
}

impl ActionMap {
    /// Empty or unrecognized lists keep the defaults.
    fn from_config(cfg: &GamepadConfig) -> Self {
        let mut map = ActionMap::default();
        let cf = parse_list(&cfg.confirm);
        if !cf.is_empty() { map.confirm = cf; }
        let ca = parse_list(&cfg.cancel);
        if !ca.is_empty() { map.cancel = ca; }
        let cy = parse_list(&cfg.cycle_difficulty);
        if !cy.is_empty() { map.cycle_difficulty = cy; }
        let ts = parse_list(&cfg.toggle_sound);
        if !ts.is_empty() { map.toggle_sound = ts; }
        map
    }
}

fn parse_list(names: &[String]) -> Vec<Btn> {
    names.iter().filter_map(|s| Btn::from_name(s)).collect()
}

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Edge presses this frame, indexed by `Btn`.
    just_pressed: [bool; BTN_COUNT],

    /// Cursor step requested this frame (d-pad or stick edge).
    nav: Option<(i32, i32)>,

    // Stick direction last frame, for edge detection
    stick_dir: (i32, i32),
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs_opt = match Gilrs::new() {
            Ok(g) => {
                if g.gamepads().next().is_some() {
                    log::info!("gamepad detected");
                }
                Some(g)
            }
            Err(e) => {
                log::warn!("gamepad support unavailable: {e}");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            just_pressed: [false; BTN_COUNT],
            nav: None,
            stick_dir: (0, 0),
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
        }
    }

    /// Load button mapping from config.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.action_map = ActionMap::from_config(cfg);
    }

    pub fn update(&mut self) {
        self.just_pressed = [false; BTN_COUNT];
        self.nav = None;

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.press(btn),
                EventType::AxisChanged(axis, value, _) => {
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => log::info!("gamepad connected"),
                EventType::Disconnected => {
                    log::info!("gamepad disconnected");
                    self.stick_x = 0.0;
                    self.stick_y = 0.0;
                }
                _ => {}
            }
        }

        // Stick acts like a d-pad: one step per push past the deadzone.
        let dir = stick_direction(self.stick_x, self.stick_y);
        if dir != (0, 0) && dir != self.stick_dir {
            self.nav = Some(dir);
        }
        self.stick_dir = dir;
    }

    #[cfg(feature = "gamepad")]
    fn press(&mut self, gilrs_btn: Button) {
        let step = match gilrs_btn {
            Button::DPadUp    => Some((0, -1)),
            Button::DPadDown  => Some((0, 1)),
            Button::DPadLeft  => Some((-1, 0)),
            Button::DPadRight => Some((1, 0)),
            _ => None,
        };
        if step.is_some() {
            self.nav = step;
            return;
        }
        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.just_pressed[btn as usize] = true;
        }
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.just_pressed[b as usize])
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.confirm)
    }
    pub fn cancel_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.cancel)
    }
    pub fn cycle_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.cycle_difficulty)
    }
    pub fn sound_toggle_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.toggle_sound)
    }

    /// Cursor step (dx, dy) requested this frame.
    pub fn nav(&self) -> Option<(i32, i32)> {
        self.nav
    }
}

/// Dominant stick axis as a unit step. Stick Y is up-positive.
#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
fn stick_direction(x: f32, y: f32) -> (i32, i32) {
    if x.abs() < STICK_DEADZONE && y.abs() < STICK_DEADZONE {
        (0, 0)
    } else if x.abs() >= y.abs() {
        (x.signum() as i32, 0)
    } else {
        (0, -(y.signum() as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_names_parse() {
        let names = vec!["a".to_string(), "Back".into(), "bogus".into(), "NORTH".into()];
        assert_eq!(parse_list(&names), vec![Btn::A, Btn::Select, Btn::Y]);
    }

    #[test]
    fn config_overrides_only_valid_lists() {
        let map = ActionMap::from_config(&GamepadConfig {
            confirm: vec!["X".into()],
            cancel: vec!["nope".into()],
            cycle_difficulty: vec![],
            toggle_sound: vec!["start".into()],
        });
        assert_eq!(map.confirm, vec![Btn::X]);
        assert_eq!(map.cancel, vec![Btn::B, Btn::Select]);
        assert_eq!(map.cycle_difficulty, vec![Btn::Y]);
        assert_eq!(map.toggle_sound, vec![Btn::Start]);
    }

    #[test]
    fn stick_maps_to_steps() {
        assert_eq!(stick_direction(0.1, -0.2), (0, 0));
        assert_eq!(stick_direction(0.9, 0.3), (1, 0));
        assert_eq!(stick_direction(-0.2, 0.8), (0, -1));
        assert_eq!(stick_direction(0.0, -0.7), (0, 1));
    }
}
