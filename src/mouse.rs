use evdev_rs::{
    enums::{EventCode, EV_KEY, EV_REL, EV_SYN},
    DeviceWrapper, InputEvent, UInputDevice, UninitDevice,
};

use crate::util::micros_to_timeval;

/// Downstream consumer of synthetic button events.
///
/// `time` is the instant the button logically changed, which for buffered
/// taps lies in the past relative to the frame being processed.
pub(crate) trait ButtonSink {
    fn notify_button(&mut self, time: u64, button: EV_KEY, pressed: bool);
}

pub(crate) struct VirtualMouse {
    udev: UInputDevice,
}

impl std::fmt::Debug for VirtualMouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMouse")
            .field("udev", &self.udev.devnode())
            .finish()
    }
}

impl VirtualMouse {
    const BUTTONS: [EV_KEY; 3] = [EV_KEY::BTN_LEFT, EV_KEY::BTN_RIGHT, EV_KEY::BTN_MIDDLE];

    pub(crate) fn new() -> Self {
        let dev = UninitDevice::new().expect("No libevdev");
        dev.set_name("tapclick virtual mouse");
        for button in Self::BUTTONS {
            dev.enable(&EventCode::EV_KEY(button))
                .expect("Unable to enable button");
        }
        // udev only classifies the device as a mouse if it has relative axes
        for axis in [EV_REL::REL_X, EV_REL::REL_Y] {
            dev.enable(&EventCode::EV_REL(axis))
                .expect("Unable to enable axis");
        }
        Self {
            udev: UInputDevice::create_from_device(&dev).expect("Unable to create UInput"),
        }
    }
}

impl ButtonSink for VirtualMouse {
    fn notify_button(&mut self, time: u64, button: EV_KEY, pressed: bool) {
        let time = micros_to_timeval(time);
        self.udev
            .write_event(&InputEvent::new(
                &time,
                &EventCode::EV_KEY(button),
                pressed as i32,
            ))
            .expect("Couldn't send button event");
        self.udev
            .write_event(&InputEvent::new(
                &time,
                &EventCode::EV_SYN(EV_SYN::SYN_REPORT),
                0,
            ))
            .expect("No syn");
    }
}
