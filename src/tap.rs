//! The tap-to-click state machine.
//!
//! Translates a stream of touch begin/move/end frames into synthetic button
//! events: one-, two- and three-finger taps, tap-and-drag and drag-lock.
//! The machine is deliberately dumb about *detecting* palms and thumbs; it
//! only reacts to the verdicts the touchpad model hands it.
//!
//! Two things make the bookkeeping delicate. Buttons are emitted with the
//! timestamp of the moment the finger actually landed or lifted, which is
//! usually in the past by the time the decision falls. And a single timer
//! serves both the tap timeout and the drag-lock timeout; which one it
//! means is implied by the state that armed it.

use evdev_rs::enums::EV_KEY;
use log::{debug, trace, warn};

use crate::config::{ButtonMap, Config};
use crate::mouse::ButtonSink;
use crate::timer::OneShotTimer;
use crate::touch::{RawTouchState, Touch, TouchTapState, Touchpad};

/// How long a finger may rest before the touch stops being a tap.
const TAP_TIMEOUT_US: u64 = 180_000;
/// Grace period for landing again after lifting the dragging finger.
const DRAG_TIMEOUT_US: u64 = 300_000;
/// Travel from the initial position that kills a tap.
const MOTION_THRESHOLD_MM: f64 = 1.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TapState {
    Idle,
    Touch,
    Hold,
    Tapped,
    Touch2,
    Touch2Hold,
    Touch2Release,
    Touch3,
    Touch3Hold,
    Dragging,
    DraggingWait,
    DraggingOrDoubletap,
    DraggingOrTap,
    Dragging2,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TapEvent {
    Touch,
    Motion,
    Release,
    Timeout,
    Button,
    Thumb,
    Palm,
    PalmUp,
}

/// One primitive step of a transition, interpreted by [`TapMachine::apply`]
/// in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    SavePress,
    SaveRelease,
    SetTapTimer,
    SetDragTimer,
    ClearTimer,
    /// press(n) at the saved press time
    PressSaved(u32),
    /// release(n) at the saved release time
    ReleaseSaved(u32),
    /// release(n) at the event time
    ReleaseNow(u32),
    /// latch the current touch as a thumb and drop it from the finger count
    MarkThumb,
    /// disqualify the current touch
    TouchDead,
}

/// Inputs for the conditional table cells.
struct Guards {
    drag: bool,
    drag_lock: bool,
    /// The event's touch is still a tap candidate.
    touch_is_candidate: bool,
    /// No admitted fingers remain on the pad.
    fingers_drained: bool,
}

enum Cell {
    /// Stay in state, no actions.
    Stay,
    /// An event sequence the frame driver should never produce.
    Bug,
    Go(TapState, &'static [Action]),
}

/// The transition table. Pure: `(state, event, guards)` to a successor and
/// the actions to run, in order. Timer hygiene for the quiescent states is
/// not encoded here; `handle_event` clears the timer whenever a step lands
/// in `Idle` or `Dead`.
fn transition(state: TapState, event: TapEvent, guards: &Guards) -> Cell {
    use Action::*;
    use Cell::{Bug, Go, Stay};
    use TapEvent as E;
    use TapState as S;

    match (state, event) {
        (S::Idle, E::Touch) => Go(S::Touch, &[SavePress, SetTapTimer]),
        (S::Idle, E::Button) => Go(S::Dead, &[]),
        (S::Idle, E::Motion | E::Thumb) => Bug,
        (S::Idle, _) => Stay,

        (S::Touch, E::Touch) => Go(S::Touch2, &[SavePress, SetTapTimer]),
        (S::Touch, E::Motion) => Go(S::Dead, &[TouchDead]),
        (S::Touch, E::Release) if guards.drag => {
            Go(S::Tapped, &[PressSaved(1), SaveRelease, SetTapTimer])
        }
        (S::Touch, E::Release) => Go(S::Idle, &[PressSaved(1), ReleaseNow(1)]),
        (S::Touch, E::Timeout) => Go(S::Hold, &[ClearTimer]),
        (S::Touch, E::Button) => Go(S::Dead, &[]),
        (S::Touch, E::Thumb) => Go(S::Idle, &[MarkThumb]),
        (S::Touch, E::Palm) => Go(S::Idle, &[]),
        (S::Touch, E::PalmUp) => Stay,

        (S::Hold, E::Touch) => Go(S::Touch2, &[SavePress, SetTapTimer]),
        (S::Hold, E::Motion) => Go(S::Dead, &[TouchDead]),
        (S::Hold, E::Release) => Go(S::Idle, &[]),
        (S::Hold, E::Button) => Go(S::Dead, &[]),
        (S::Hold, E::Thumb) => Go(S::Idle, &[MarkThumb]),
        (S::Hold, E::Palm) => Go(S::Idle, &[]),
        (S::Hold, _) => Stay,

        (S::Tapped, E::Touch) => Go(S::DraggingOrDoubletap, &[SavePress, SetTapTimer]),
        (S::Tapped, E::Timeout) => Go(S::Idle, &[ReleaseSaved(1)]),
        (S::Tapped, E::Button) => Go(S::Dead, &[ReleaseSaved(1)]),
        (S::Tapped, E::Motion | E::Release | E::Thumb) => Bug,
        (S::Tapped, _) => Stay,

        (S::Touch2, E::Touch) => Go(S::Touch3, &[SavePress, SetTapTimer]),
        (S::Touch2, E::Motion) => Go(S::Dead, &[TouchDead]),
        (S::Touch2, E::Release) => Go(S::Touch2Release, &[SaveRelease, SetTapTimer]),
        (S::Touch2, E::Timeout) => Go(S::Touch2Hold, &[]),
        (S::Touch2, E::Button) => Go(S::Dead, &[]),
        (S::Touch2, E::Palm) => Go(S::Touch, &[SetTapTimer]),
        (S::Touch2, _) => Stay,

        (S::Touch2Hold, E::Touch) => Go(S::Touch3, &[SavePress, SetTapTimer]),
        (S::Touch2Hold, E::Motion) => Go(S::Dead, &[TouchDead]),
        (S::Touch2Hold, E::Release) => Go(S::Hold, &[]),
        (S::Touch2Hold, E::Button) => Go(S::Dead, &[]),
        (S::Touch2Hold, E::Palm) => Go(S::Hold, &[]),
        (S::Touch2Hold, _) => Stay,

        (S::Touch2Release, E::Touch) => Go(S::Touch2Hold, &[TouchDead, ClearTimer]),
        (S::Touch2Release, E::Motion) => Go(S::Dead, &[TouchDead]),
        (S::Touch2Release, E::Release) => Go(S::Idle, &[PressSaved(2), ReleaseSaved(2)]),
        (S::Touch2Release, E::Timeout) => Go(S::Hold, &[]),
        (S::Touch2Release, E::Button) => Go(S::Dead, &[]),
        // the remaining finger inherits the saved press time, even though
        // that may be the palm's own landing
        (S::Touch2Release, E::Palm) if guards.drag => {
            Go(S::Tapped, &[PressSaved(1), SaveRelease, SetTapTimer])
        }
        (S::Touch2Release, E::Palm) => Go(S::Idle, &[PressSaved(1), ReleaseNow(1)]),
        (S::Touch2Release, _) => Stay,

        // a fourth finger is over the line
        (S::Touch3, E::Touch) => Go(S::Dead, &[ClearTimer]),
        (S::Touch3, E::Motion) => Go(S::Dead, &[TouchDead]),
        (S::Touch3, E::Release) if guards.touch_is_candidate => {
            Go(S::Touch2Hold, &[PressSaved(3), ReleaseNow(3)])
        }
        (S::Touch3, E::Release) => Go(S::Touch2Hold, &[]),
        (S::Touch3, E::Timeout) => Go(S::Touch3Hold, &[ClearTimer]),
        (S::Touch3, E::Button) => Go(S::Dead, &[]),
        (S::Touch3, E::Palm) => Go(S::Touch2, &[]),
        (S::Touch3, _) => Stay,

        (S::Touch3Hold, E::Touch) => Go(S::Dead, &[SetTapTimer]),
        (S::Touch3Hold, E::Motion) => Go(S::Dead, &[TouchDead]),
        (S::Touch3Hold, E::Release) => Go(S::Touch2Hold, &[]),
        (S::Touch3Hold, E::Button) => Go(S::Dead, &[]),
        (S::Touch3Hold, E::Palm) => Go(S::Touch2Hold, &[]),
        (S::Touch3Hold, _) => Stay,

        (S::DraggingOrDoubletap, E::Touch) => Go(S::Dragging2, &[]),
        (S::DraggingOrDoubletap, E::Motion) => Go(S::Dragging, &[]),
        (S::DraggingOrDoubletap, E::Release) => Go(
            S::Tapped,
            &[ReleaseSaved(1), PressSaved(1), SaveRelease, SetTapTimer],
        ),
        (S::DraggingOrDoubletap, E::Timeout) => Go(S::Dragging, &[]),
        (S::DraggingOrDoubletap, E::Button) => Go(S::Dead, &[ReleaseSaved(1)]),
        (S::DraggingOrDoubletap, E::Palm) => Go(S::Tapped, &[]),
        (S::DraggingOrDoubletap, _) => Stay,

        (S::Dragging, E::Touch) => Go(S::Dragging2, &[]),
        (S::Dragging, E::Release) if guards.drag_lock => Go(S::DraggingWait, &[SetDragTimer]),
        (S::Dragging, E::Release) => Go(S::Idle, &[ReleaseNow(1)]),
        (S::Dragging, E::Button) => Go(S::Dead, &[ReleaseNow(1)]),
        (S::Dragging, E::Palm) => Go(S::Idle, &[ReleaseSaved(1)]),
        (S::Dragging, _) => Stay,

        (S::DraggingWait, E::Touch) => Go(S::DraggingOrTap, &[SetTapTimer]),
        (S::DraggingWait, E::Timeout) => Go(S::Idle, &[ReleaseNow(1)]),
        (S::DraggingWait, E::Button) => Go(S::Dead, &[ReleaseNow(1)]),
        (S::DraggingWait, _) => Stay,

        (S::DraggingOrTap, E::Touch) => Go(S::Dragging2, &[ClearTimer]),
        (S::DraggingOrTap, E::Motion) => Go(S::Dragging, &[]),
        (S::DraggingOrTap, E::Release) => Go(S::Idle, &[ReleaseNow(1)]),
        (S::DraggingOrTap, E::Timeout) => Go(S::Dragging, &[]),
        (S::DraggingOrTap, E::Button) => Go(S::Dead, &[ReleaseNow(1)]),
        (S::DraggingOrTap, E::Palm) => Go(S::Idle, &[ReleaseSaved(1)]),
        (S::DraggingOrTap, _) => Stay,

        (S::Dragging2, E::Touch) => Go(S::Dead, &[ReleaseNow(1)]),
        (S::Dragging2, E::Release) => Go(S::Dragging, &[]),
        (S::Dragging2, E::Button) => Go(S::Dead, &[ReleaseNow(1)]),
        (S::Dragging2, E::Palm) => Go(S::DraggingOrDoubletap, &[]),
        (S::Dragging2, _) => Stay,

        (S::Dead, E::Release | E::Palm | E::PalmUp) if guards.fingers_drained => Go(S::Idle, &[]),
        (S::Dead, _) => Stay,
    }
}

#[derive(Debug)]
pub(crate) struct TapMachine {
    state: TapState,
    /// Admitted fingers currently down; palms and thumbs don't count.
    nfingers_down: u32,
    saved_press_time: u64,
    saved_release_time: u64,
    /// Bit n set while the n-finger button is held downstream.
    buttons_pressed: u8,
    map: ButtonMap,
    /// Applied once the machine is back in `Idle`, so a press and its
    /// matching release always route through the same map.
    want_map: ButtonMap,
    enabled: bool,
    suspended: bool,
    drag_enabled: bool,
    drag_lock_enabled: bool,
    /// Capped to the three fingers the machine knows gestures for.
    finger_count: usize,
    timer: OneShotTimer,
}

impl TapMachine {
    pub(crate) fn new(config: &Config, has_left_button: bool, num_slots: usize) -> Self {
        Self {
            state: TapState::Idle,
            nfingers_down: 0,
            saved_press_time: 0,
            saved_release_time: 0,
            buttons_pressed: 0,
            map: config.button_map(),
            want_map: config.button_map(),
            enabled: config.tap_enabled().unwrap_or(!has_left_button),
            suspended: false,
            drag_enabled: config.drag_enabled(),
            drag_lock_enabled: config.drag_lock_enabled(),
            finger_count: num_slots.min(3),
            timer: OneShotTimer::new(),
        }
    }

    pub(crate) fn state(&self) -> TapState {
        self.state
    }

    pub(crate) fn tap_enabled(&self) -> bool {
        self.enabled
    }

    /// How many simultaneous fingers can tap on this device.
    pub(crate) fn count(&self) -> usize {
        self.finger_count
    }

    pub(crate) fn active(&self) -> bool {
        self.enabled && !self.suspended
    }

    pub(crate) fn dragging(&self) -> bool {
        matches!(
            self.state,
            TapState::Dragging
                | TapState::Dragging2
                | TapState::DraggingWait
                | TapState::DraggingOrTap
        )
    }

    pub(crate) fn timer_deadline(&self) -> Option<u64> {
        self.timer.deadline()
    }

    pub(crate) fn poll_timeout_ms(&self, now: u64) -> i32 {
        self.timer.poll_timeout_ms(now).unwrap_or(-1)
    }

    fn handle_event(
        &mut self,
        event: TapEvent,
        mut touch: Option<&mut Touch>,
        time: u64,
        sink: &mut dyn ButtonSink,
    ) {
        let guards = Guards {
            drag: self.drag_enabled,
            drag_lock: self.drag_lock_enabled,
            touch_is_candidate: touch
                .as_deref()
                .map_or(false, |t| t.tap.state == TouchTapState::Touch),
            fingers_drained: self.nfingers_down == 0,
        };
        match transition(self.state, event, &guards) {
            Cell::Stay => {}
            Cell::Bug => warn!("Invalid tap event {:?} in state {:?}", event, self.state),
            Cell::Go(next, actions) => {
                trace!("Tap {:?} + {:?} -> {:?}", self.state, event, next);
                for &action in actions {
                    self.apply(action, touch.as_deref_mut(), time, sink);
                }
                self.state = next;
            }
        }
        // the machine never idles with a pending timer
        if matches!(self.state, TapState::Idle | TapState::Dead) {
            self.timer.cancel();
        }
    }

    fn apply(
        &mut self,
        action: Action,
        touch: Option<&mut Touch>,
        time: u64,
        sink: &mut dyn ButtonSink,
    ) {
        match action {
            Action::SavePress => self.saved_press_time = time,
            Action::SaveRelease => self.saved_release_time = time,
            Action::SetTapTimer => self.timer.set(time + TAP_TIMEOUT_US),
            Action::SetDragTimer => self.timer.set(time + DRAG_TIMEOUT_US),
            Action::ClearTimer => self.timer.cancel(),
            Action::PressSaved(n) => self.press(n, self.saved_press_time, sink),
            Action::ReleaseSaved(n) => self.release(n, self.saved_release_time, sink),
            Action::ReleaseNow(n) => self.release(n, time, sink),
            Action::MarkThumb => {
                if let Some(touch) = touch {
                    touch.tap.is_thumb = true;
                    touch.tap.state = TouchTapState::Idle;
                }
                debug_assert!(self.nfingers_down >= 1);
                self.nfingers_down = self.nfingers_down.saturating_sub(1);
            }
            Action::TouchDead => {
                if let Some(touch) = touch {
                    touch.tap.state = TouchTapState::Dead;
                }
            }
        }
    }

    fn press(&mut self, nfingers: u32, time: u64, sink: &mut dyn ButtonSink) {
        let bit = 1u8 << nfingers;
        debug_assert!(
            self.buttons_pressed & bit == 0,
            "{}-finger button pressed twice",
            nfingers
        );
        self.buttons_pressed |= bit;
        let button = self.map.button(nfingers);
        debug!("Tap press {:?} at {}", button, time);
        sink.notify_button(time, button, true);
    }

    fn release(&mut self, nfingers: u32, time: u64, sink: &mut dyn ButtonSink) {
        let bit = 1u8 << nfingers;
        debug_assert!(
            self.buttons_pressed & bit != 0,
            "{}-finger button released while not pressed",
            nfingers
        );
        self.buttons_pressed &= !bit;
        let button = self.map.button(nfingers);
        debug!("Tap release {:?} at {}", button, time);
        sink.notify_button(time, button, false);
    }

    fn exceeds_motion_threshold(&self, pad: &Touchpad, idx: usize) -> bool {
        let touch = &pad.touches[idx];
        // serial Synaptics pads jump when tracking more fingers than slots
        if pad.caps.synaptics_serial
            && pad.nfingers_real > pad.caps.num_slots
            && pad.nfingers_real > 2
        {
            return false;
        }
        // semi-mt coordinates are garbage while the finger count settles
        if pad.caps.semi_mt && pad.finger_count_changed() {
            return false;
        }
        pad.mm_delta(touch.point, touch.tap.initial) > MOTION_THRESHOLD_MM
    }

    /// A tap decision is pending; pointer motion should be held back.
    fn filter_motion(&self) -> bool {
        matches!(
            self.state,
            TapState::Touch
                | TapState::Tapped
                | TapState::DraggingOrDoubletap
                | TapState::DraggingOrTap
                | TapState::Touch2
                | TapState::Touch3
        )
    }

    /// Frame driver: turn one frame's worth of touch changes into machine
    /// events, in a fixed per-touch order. Returns whether pointer motion
    /// should be suppressed while a tap decision is pending.
    pub(crate) fn handle_state(
        &mut self,
        time: u64,
        pad: &mut Touchpad,
        sink: &mut dyn ButtonSink,
    ) -> bool {
        if !self.active() {
            return false;
        }
        if pad.caps.is_clickpad && pad.queued_button {
            self.handle_event(TapEvent::Button, None, time, sink);
        }
        for i in 0..pad.touches.len() {
            if !pad.touches[i].dirty || pad.touches[i].raw_state == RawTouchState::None {
                continue;
            }
            if pad.caps.is_clickpad && pad.queued_button {
                // the click takes over; nothing here taps anymore
                pad.touches[i].tap.state = TouchTapState::Dead;
            }
            if pad.touches[i].tap.is_thumb {
                continue;
            }
            if pad.touches[i].tap.is_palm {
                if pad.touches[i].raw_state == RawTouchState::End {
                    self.handle_event(TapEvent::PalmUp, Some(&mut pad.touches[i]), time, sink);
                }
                continue;
            }
            if pad.touches[i].raw_state == RawTouchState::Hovering {
                continue;
            }
            if pad.touches[i].palm {
                let began = pad.touches[i].raw_state == RawTouchState::Begin;
                self.handle_event(TapEvent::Palm, Some(&mut pad.touches[i]), time, sink);
                let touch = &mut pad.touches[i];
                touch.tap.is_palm = true;
                touch.tap.state = TouchTapState::Dead;
                if !began {
                    debug_assert!(self.nfingers_down >= 1);
                    self.nfingers_down = self.nfingers_down.saturating_sub(1);
                }
            } else if pad.touches[i].raw_state == RawTouchState::Begin {
                if pad.ignored_for_tap(&pad.touches[i]) {
                    pad.touches[i].tap.is_thumb = true;
                    continue;
                }
                {
                    let touch = &mut pad.touches[i];
                    touch.tap.state = TouchTapState::Touch;
                    touch.tap.initial = touch.point;
                }
                self.nfingers_down += 1;
                self.handle_event(TapEvent::Touch, Some(&mut pad.touches[i]), time, sink);
                // a palm-looking landing kills the tap without needing a
                // state of its own
                if pad.palm_tap_is_palm(&pad.touches[i]) {
                    self.handle_event(TapEvent::Motion, Some(&mut pad.touches[i]), time, sink);
                }
            } else if pad.touches[i].raw_state == RawTouchState::End {
                if pad.touches[i].was_down {
                    debug_assert!(self.nfingers_down >= 1);
                    self.nfingers_down = self.nfingers_down.saturating_sub(1);
                    self.handle_event(TapEvent::Release, Some(&mut pad.touches[i]), time, sink);
                }
                pad.touches[i].tap.state = TouchTapState::Idle;
            } else if self.state != TapState::Idle && pad.thumb_ignored(&pad.touches[i]) {
                self.handle_event(TapEvent::Thumb, Some(&mut pad.touches[i]), time, sink);
            } else if self.state != TapState::Idle && self.exceeds_motion_threshold(pad, i) {
                // any touch over the threshold takes every candidate with it
                for touch in pad.touches.iter_mut() {
                    if touch.tap.state == TouchTapState::Touch {
                        touch.tap.state = TouchTapState::Dead;
                    }
                }
                self.handle_event(TapEvent::Motion, Some(&mut pad.touches[i]), time, sink);
            }
        }
        debug_assert!(
            self.nfingers_down as usize <= pad.touches.iter().filter(|t| t.active()).count(),
            "more tap fingers than touches on the pad"
        );
        self.filter_motion()
    }

    /// The timer went off: one `TIMEOUT` event, and whatever was still a
    /// candidate cannot be rescued anymore.
    pub(crate) fn handle_timeout(&mut self, now: u64, pad: &mut Touchpad, sink: &mut dyn ButtonSink) {
        if !self.timer.expired(now) {
            return;
        }
        self.timer.cancel();
        self.handle_event(TapEvent::Timeout, None, now, sink);
        for touch in pad.touches.iter_mut() {
            if touch.tap.state == TouchTapState::Touch {
                touch.tap.state = TouchTapState::Dead;
            }
        }
    }

    /// Post-frame hook; the deferred map swap happens here.
    pub(crate) fn post_process_state(&mut self) {
        if self.state == TapState::Idle && self.map != self.want_map {
            debug!("Tap button map {:?} -> {:?}", self.map, self.want_map);
            self.map = self.want_map;
        }
    }

    /// The map a press emitted right now would route through.
    pub(crate) fn map(&self) -> ButtonMap {
        self.map
    }

    pub(crate) fn set_map(&mut self, map: ButtonMap) {
        self.want_map = map;
        if self.state == TapState::Idle {
            self.map = map;
        }
    }

    pub(crate) fn drag_enabled(&self) -> bool {
        self.drag_enabled
    }

    pub(crate) fn set_drag_enabled(&mut self, enabled: bool) {
        self.drag_enabled = enabled;
    }

    pub(crate) fn drag_lock_enabled(&self) -> bool {
        self.drag_lock_enabled
    }

    pub(crate) fn set_drag_lock_enabled(&mut self, enabled: bool) {
        self.drag_lock_enabled = enabled;
    }

    pub(crate) fn set_enabled(
        &mut self,
        enabled: bool,
        now: u64,
        pad: &mut Touchpad,
        sink: &mut dyn ButtonSink,
    ) {
        self.update_active(enabled, self.suspended, now, pad, sink);
    }

    pub(crate) fn suspend(&mut self, now: u64, pad: &mut Touchpad, sink: &mut dyn ButtonSink) {
        self.update_active(self.enabled, true, now, pad, sink);
    }

    pub(crate) fn resume(&mut self, now: u64, pad: &mut Touchpad, sink: &mut dyn ButtonSink) {
        self.update_active(self.enabled, false, now, pad, sink);
    }

    fn update_active(
        &mut self,
        enabled: bool,
        suspended: bool,
        now: u64,
        pad: &mut Touchpad,
        sink: &mut dyn ButtonSink,
    ) {
        let was_active = self.active();
        self.enabled = enabled;
        self.suspended = suspended;
        if self.active() == was_active {
            return;
        }
        if was_active {
            self.release_all(now, pad, sink);
        } else {
            // fresh start; no idea which of the live touches were in flight
            self.reset(pad);
        }
    }

    /// Balance any held synthetic button and put the machine back to rest.
    pub(crate) fn release_all(&mut self, now: u64, pad: &mut Touchpad, sink: &mut dyn ButtonSink) {
        for nfingers in 1..=3u32 {
            if self.buttons_pressed & (1 << nfingers) != 0 {
                self.release(nfingers, now, sink);
            }
        }
        debug_assert_eq!(self.buttons_pressed, 0);
        self.reset(pad);
    }

    fn reset(&mut self, pad: &mut Touchpad) {
        for touch in pad.touches.iter_mut().filter(|t| t.active()) {
            touch.tap.is_palm = true;
            touch.tap.state = TouchTapState::Dead;
        }
        self.state = TapState::Idle;
        self.nfingers_down = 0;
        self.timer.cancel();
    }

    #[cfg(test)]
    fn buttons_pressed(&self) -> u8 {
        self.buttons_pressed
    }

    #[cfg(test)]
    fn timer_armed(&self) -> bool {
        self.timer.deadline().is_some()
    }
}
