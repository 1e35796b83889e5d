use std::ops::Index;

use bevy::prelude::*;

/// The fixed button vocabulary, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
pub enum ButtonName {
    /// Thumbstick pushed away from the user.
    Forwards,
    /// Thumbstick pulled towards the user.
    Backwards,
    /// Thumbstick pushed left.
    Leftwards,
    /// Thumbstick pushed right.
    Rightwards,
    /// Index trigger.
    Trigger,
    /// Grip/squeeze button.
    Grip,
    /// Lower face button.
    Primary,
    /// Upper face button.
    Secondary,
}

impl ButtonName {
    /// Every button, in table order.
    pub const ALL: [ButtonName; 8] = [
        ButtonName::Forwards,
        ButtonName::Backwards,
        ButtonName::Leftwards,
        ButtonName::Rightwards,
        ButtonName::Trigger,
        ButtonName::Grip,
        ButtonName::Primary,
        ButtonName::Secondary,
    ];
}

/// One boolean per [`ButtonName`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub struct ButtonStates([bool; 8]);

impl ButtonStates {
    fn set(&mut self, button: ButtonName, value: bool) {
        self.0[button as usize] = value;
    }

    /// `true` if any button is set.
    pub fn any(&self) -> bool {
        self.0.iter().any(|&b| b)
    }
}

impl Index<ButtonName> for ButtonStates {
    type Output = bool;

    fn index(&self, button: ButtonName) -> &bool {
        &self.0[button as usize]
    }
}

/// Raw device state in the XR standard layout: `axes[2]`/`axes[3]` are the
/// thumbstick (negative `axes[3]` is forward), buttons 0, 1, 4 and 5 are
/// trigger, grip, primary and secondary.
#[derive(Clone, Debug, Default, PartialEq, Reflect)]
pub struct GamepadSample {
    /// Analog axes.
    pub axes: [f32; 4],
    /// Pressed flag per physical button index.
    pub buttons: Vec<bool>,
}

impl GamepadSample {
    /// Axis `i`, 0 when the device does not report it.
    pub fn axis(&self, i: usize) -> f32 {
        self.axes.get(i).copied().unwrap_or(0.0)
    }

    /// Button `i`, released when the device does not report it.
    pub fn button(&self, i: usize) -> bool {
        self.buttons.get(i).copied().unwrap_or(false)
    }
}

const AXIS_THRESHOLD: f32 = 0.5;

fn forwards(s: &GamepadSample) -> bool {
    s.axis(3) <= -AXIS_THRESHOLD
}

fn backwards(s: &GamepadSample) -> bool {
    s.axis(3) >= AXIS_THRESHOLD
}

fn leftwards(s: &GamepadSample) -> bool {
    s.axis(2) <= -AXIS_THRESHOLD
}

fn rightwards(s: &GamepadSample) -> bool {
    s.axis(2) >= AXIS_THRESHOLD
}

fn trigger(s: &GamepadSample) -> bool {
    s.button(0)
}

fn grip(s: &GamepadSample) -> bool {
    s.button(1)
}

fn primary(s: &GamepadSample) -> bool {
    s.button(4)
}

fn secondary(s: &GamepadSample) -> bool {
    s.button(5)
}

/// Predicate deriving each button's pressed state from a sample.
pub const BUTTON_TABLE: [(ButtonName, fn(&GamepadSample) -> bool); 8] = [
    (ButtonName::Forwards, forwards),
    (ButtonName::Backwards, backwards),
    (ButtonName::Leftwards, leftwards),
    (ButtonName::Rightwards, rightwards),
    (ButtonName::Trigger, trigger),
    (ButtonName::Grip, grip),
    (ButtonName::Primary, primary),
    (ButtonName::Secondary, secondary),
];

/// Edge-triggered button state of one controller.
///
/// `down[b]` holds only on the frame `pressed[b]` went from `false` to `true`,
/// `up[b]` only on the frame it went back.
#[derive(Clone, Debug, Default, PartialEq, Reflect)]
pub struct ControllerInput {
    /// Held this frame.
    pub pressed: ButtonStates,
    /// Went down this frame.
    pub down: ButtonStates,
    /// Went up this frame.
    pub up: ButtonStates,
}

impl ControllerInput {
    /// Advances one frame using `sample`.
    pub fn update(&mut self, sample: &GamepadSample) {
        for (button, predicate) in BUTTON_TABLE {
            let now = predicate(sample);
            let before = self.pressed[button];
            self.down.set(button, now && !before);
            self.up.set(button, before && !now);
            self.pressed.set(button, now);
        }
    }
}

/// Which device, if any, currently drives a controller slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum ControllerLink {
    /// No device bound.
    #[default]
    Disconnected,
    /// Bound to a gamepad entity.
    Connected(Entity),
}

/// One of the two handedness-agnostic controller slots.
#[derive(Component, Debug, Reflect)]
pub struct Controller {
    slot: usize,
    initialized: bool,
    link: ControllerLink,
    visuals: Option<Entity>,
    /// Latest device sample; `None` until a device connects, and again after
    /// it disconnects.
    pub gamepad: Option<GamepadSample>,
    /// Button state derived from `gamepad`.
    pub input: ControllerInput,
}

impl Controller {
    /// An unbound controller for `slot`.
    pub fn new(slot: usize) -> Self {
        Self {
            slot,
            initialized: false,
            link: ControllerLink::Disconnected,
            visuals: None,
            gamepad: None,
            input: ControllerInput::default(),
        }
    }

    /// Slot index, 0 or 1.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Set once the first device ever connected to this slot.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Current device binding.
    pub fn link(&self) -> ControllerLink {
        self.link
    }

    /// Visual attachment root while connected.
    pub fn visuals(&self) -> Option<Entity> {
        self.visuals
    }

    /// `Disconnected → Connected`. Returns `false` (and changes nothing) when
    /// the slot is already bound.
    pub fn connect(&mut self, gamepad: Entity) -> bool {
        if self.link != ControllerLink::Disconnected {
            return false;
        }
        self.link = ControllerLink::Connected(gamepad);
        self.initialized = true;
        true
    }

    /// Records the visual attachment spawned for the current connection.
    pub fn attach_visuals(&mut self, root: Entity) {
        self.visuals = Some(root);
    }

    /// `Connected → Disconnected`. Drops the sample but keeps the last button
    /// state. Returns the visuals to release.
    pub fn disconnect(&mut self) -> Option<Entity> {
        self.link = ControllerLink::Disconnected;
        self.gamepad = None;
        self.visuals.take()
    }

    /// Advances [`Self::input`] from the current sample. Without a sample the
    /// previous state stays frozen and `false` is returned.
    pub fn refresh_input(&mut self) -> bool {
        match &self.gamepad {
            Some(sample) => {
                self.input.update(sample);
                true
            }
            None => false,
        }
    }
}

/// Device lifecycle change, fed from gamepad connection events.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerLinkChanged {
    /// A device became available.
    Connected(Entity),
    /// A device went away.
    Disconnected(Entity),
}

/// Root of a controller's grip block and pointer ray.
#[derive(Component, Reflect)]
pub struct ControllerVisual;
