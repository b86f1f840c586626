use evdev_rs::enums::{EventCode, EV_ABS, EV_KEY};
use evdev_rs::InputEvent;
use log::warn;

use crate::config::Config;
use crate::devices::DeviceCaps;

/// evdev `MT_TOOL_PALM`
const MT_TOOL_PALM: i32 = 2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Point {
    pub(crate) x: i32,
    pub(crate) y: i32,
}

/// What the kernel told us about a slot this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawTouchState {
    None,
    Begin,
    Update,
    End,
    Hovering,
}

impl Default for RawTouchState {
    fn default() -> Self {
        Self::None
    }
}

/// Where a touch stands in the tap machine's eyes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TouchTapState {
    /// Not participating in a tap.
    Idle,
    /// Admitted and still a tap candidate.
    Touch,
    /// Disqualified; produces no further tap events beyond cleanup.
    Dead,
}

impl Default for TouchTapState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Tap bookkeeping attached to one touch. The `is_thumb`/`is_palm` latches
/// stay set for the lifetime of the touch.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TapTouch {
    pub(crate) state: TouchTapState,
    /// Position at admission; motion is measured from here.
    pub(crate) initial: Point,
    pub(crate) is_thumb: bool,
    pub(crate) is_palm: bool,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct Touch {
    pub(crate) raw_state: RawTouchState,
    /// Changed this frame.
    pub(crate) dirty: bool,
    /// Ever made contact during its lifetime (hovering doesn't count).
    pub(crate) was_down: bool,
    pub(crate) point: Point,
    pub(crate) pressure: i32,
    /// External palm detector verdict (kernel tool-type reports).
    pub(crate) palm: bool,
    pub(crate) tap: TapTouch,
}

impl Touch {
    /// Still occupying its slot, whether in contact or hovering.
    pub(crate) fn active(&self) -> bool {
        matches!(
            self.raw_state,
            RawTouchState::Begin | RawTouchState::Update | RawTouchState::Hovering
        )
    }
}

/// Per-slot decoder state for one touchpad, fed from raw evdev events and
/// consumed by the tap machine's frame driver.
#[derive(Debug)]
pub(crate) struct Touchpad {
    pub(crate) caps: DeviceCaps,
    pub(crate) touches: Vec<Touch>,
    /// Physical click seen this frame on a clickpad.
    pub(crate) queued_button: bool,
    /// Finger count from `BTN_TOOL_*`; may exceed the slot count.
    pub(crate) nfingers_real: usize,
    prev_nfingers_real: usize,
    current_slot: usize,
    pub(crate) thumb_pressure: Option<i32>,
    pub(crate) palm_edge_mm: f64,
}

impl Touchpad {
    pub(crate) fn new(caps: DeviceCaps, config: &Config) -> Self {
        let touches = vec![Touch::default(); caps.num_slots];
        Self {
            caps,
            touches,
            queued_button: false,
            nfingers_real: 0,
            prev_nfingers_real: 0,
            current_slot: 0,
            thumb_pressure: config.thumb_pressure(),
            palm_edge_mm: config.palm_edge_mm(),
        }
    }

    pub(crate) fn decode_event(&mut self, ev: &InputEvent) {
        match ev.event_code {
            EventCode::EV_ABS(EV_ABS::ABS_MT_SLOT) => {
                let slot = ev.value as usize;
                if slot < self.touches.len() {
                    self.current_slot = slot;
                } else {
                    warn!("{}: out of range slot {}", self.caps.name, ev.value);
                }
            }
            EventCode::EV_ABS(EV_ABS::ABS_MT_TRACKING_ID) => {
                let touch = &mut self.touches[self.current_slot];
                if ev.value >= 0 {
                    // new finger in this slot; forget everything about the
                    // previous occupant
                    *touch = Touch {
                        raw_state: RawTouchState::Begin,
                        dirty: true,
                        was_down: true,
                        point: touch.point,
                        ..Touch::default()
                    };
                } else if touch.active() {
                    touch.raw_state = RawTouchState::End;
                    touch.dirty = true;
                }
            }
            EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_X) => {
                let touch = &mut self.touches[self.current_slot];
                touch.point.x = ev.value;
                touch.dirty |= touch.active();
            }
            EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_Y) => {
                let touch = &mut self.touches[self.current_slot];
                touch.point.y = ev.value;
                touch.dirty |= touch.active();
            }
            EventCode::EV_ABS(EV_ABS::ABS_MT_PRESSURE) => {
                let touch = &mut self.touches[self.current_slot];
                touch.pressure = ev.value;
                touch.dirty |= touch.active();
            }
            EventCode::EV_ABS(EV_ABS::ABS_MT_DISTANCE) => {
                let touch = &mut self.touches[self.current_slot];
                if ev.value > 0 {
                    match touch.raw_state {
                        RawTouchState::Begin => {
                            // hovering from the start, never in contact
                            touch.raw_state = RawTouchState::Hovering;
                            touch.was_down = false;
                            touch.dirty = true;
                        }
                        RawTouchState::Update => {
                            touch.raw_state = RawTouchState::Hovering;
                            touch.dirty = true;
                        }
                        _ => {}
                    }
                } else if touch.raw_state == RawTouchState::Hovering {
                    // touched down out of the hover; a resumed contact must
                    // not look like a second landing
                    touch.raw_state = if touch.was_down {
                        RawTouchState::Update
                    } else {
                        RawTouchState::Begin
                    };
                    touch.was_down = true;
                    touch.dirty = true;
                }
            }
            EventCode::EV_ABS(EV_ABS::ABS_MT_TOOL_TYPE) => {
                let touch = &mut self.touches[self.current_slot];
                touch.palm = ev.value == MT_TOOL_PALM;
                touch.dirty |= touch.active();
            }
            EventCode::EV_KEY(EV_KEY::BTN_LEFT) => {
                if self.caps.is_clickpad && ev.value == 1 {
                    self.queued_button = true;
                }
            }
            EventCode::EV_KEY(EV_KEY::BTN_TOOL_FINGER) => self.set_finger_count(1, ev.value),
            EventCode::EV_KEY(EV_KEY::BTN_TOOL_DOUBLETAP) => self.set_finger_count(2, ev.value),
            EventCode::EV_KEY(EV_KEY::BTN_TOOL_TRIPLETAP) => self.set_finger_count(3, ev.value),
            EventCode::EV_KEY(EV_KEY::BTN_TOOL_QUADTAP) => self.set_finger_count(4, ev.value),
            EventCode::EV_KEY(EV_KEY::BTN_TOOL_QUINTTAP) => self.set_finger_count(5, ev.value),
            _ => (),
        }
    }

    // Only one BTN_TOOL_* is active at a time.
    fn set_finger_count(&mut self, nfingers: usize, value: i32) {
        if value == 1 {
            self.nfingers_real = nfingers;
        } else if self.nfingers_real == nfingers {
            self.nfingers_real = 0;
        }
    }

    /// Per-frame bookkeeping, run after the tap machine has seen the frame.
    pub(crate) fn end_frame(&mut self) {
        for touch in &mut self.touches {
            touch.dirty = false;
            match touch.raw_state {
                RawTouchState::Begin => touch.raw_state = RawTouchState::Update,
                RawTouchState::End => {
                    *touch = Touch {
                        point: touch.point,
                        ..Touch::default()
                    };
                }
                _ => {}
            }
        }
        self.queued_button = false;
        self.prev_nfingers_real = self.nfingers_real;
    }

    pub(crate) fn finger_count_changed(&self) -> bool {
        self.nfingers_real != self.prev_nfingers_real
    }

    /// Physical distance between two points in millimeters.
    pub(crate) fn mm_delta(&self, a: Point, b: Point) -> f64 {
        let dx = (a.x - b.x) as f64 / self.caps.units_per_mm_x;
        let dy = (a.y - b.y) as f64 / self.caps.units_per_mm_y;
        dx.hypot(dy)
    }

    /// Thumb pre-classifier, consulted when a touch begins.
    pub(crate) fn ignored_for_tap(&self, touch: &Touch) -> bool {
        matches!(self.thumb_pressure, Some(threshold) if touch.pressure > threshold)
    }

    /// Thumb classifier for touches already admitted.
    pub(crate) fn thumb_ignored(&self, touch: &Touch) -> bool {
        self.ignored_for_tap(touch)
    }

    /// Palm-tap pre-classifier: a touch beginning hard against the left or
    /// right edge is a resting palm.
    pub(crate) fn palm_tap_is_palm(&self, touch: &Touch) -> bool {
        if self.palm_edge_mm <= 0.0 {
            return false;
        }
        let edge = self.palm_edge_mm * self.caps.units_per_mm_x;
        (touch.point.x as f64) < self.caps.min_x as f64 + edge
            || (touch.point.x as f64) > self.caps.max_x as f64 - edge
    }
}
