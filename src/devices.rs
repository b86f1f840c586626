use anyhow::{anyhow, Context, Result};
use evdev_rs::{
    enums::{EventCode, EV_ABS, EV_KEY, InputProp},
    AbsInfo, Device, DeviceWrapper,
};
use log::warn;
use std::os::unix::io::AsRawFd;
use std::{fs::OpenOptions, os::unix::prelude::OpenOptionsExt};

/// Pull the numeric suffix of the `eventN` handler out of an `H:` line.
fn event_id(line: &str) -> Result<u32> {
    line.split_whitespace()
        .find_map(|token| token.strip_prefix("event"))
        .ok_or_else(|| anyhow!("No event handler in {:?}", line))?
        .parse()
        .with_context(|| format!("Bad event handler id in {:?}", line))
}

/// Scan the `/proc/bus/input/devices` dump for the first touchpad and
/// return its evdev id.
fn scan_devices(data: &str) -> Result<u32> {
    let mut in_touchpad = false;
    for line in data.lines() {
        if line.starts_with("N:") {
            in_touchpad = line.contains("Touchpad")
                || line.contains("TouchPad")
                || line.contains("touchpad");
        } else if line.is_empty() {
            // end of one device's info block
            in_touchpad = false;
        } else if in_touchpad && line.starts_with("H:") {
            return event_id(line);
        }
    }
    Err(anyhow!("Can't find touchpad evdev"))
}

pub(crate) fn find_touchpad() -> Result<u32> {
    let data = std::fs::read_to_string("/proc/bus/input/devices")
        .context("Could not read devices file")?;
    scan_devices(&data)
}

pub(crate) fn open_input_evdev(evdev_id: u32) -> Result<Device> {
    let path = format!("/dev/input/event{}", evdev_id);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(&path)
        .with_context(|| path.clone())
        .context("Couldn't open device event handle")?;
    Device::new_from_file(file)
        .with_context(|| path)
        .context("Unable to open evdev device")
}

/// Switch the device's event timestamps to `CLOCK_MONOTONIC` so they share
/// a domain with our timer deadlines.
pub(crate) fn set_monotonic_clock(device: &Device) -> Result<()> {
    const EVIOCSCLOCKID: libc::c_ulong = 0x4004_45a0;
    let clockid: libc::c_int = libc::CLOCK_MONOTONIC;
    let rc = unsafe { libc::ioctl(device.file().as_raw_fd(), EVIOCSCLOCKID, &clockid) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error()).context("Couldn't set monotonic clock");
    }
    Ok(())
}

/// Static facts about the touchpad the tap machine needs to consult.
#[derive(Debug, Clone)]
pub(crate) struct DeviceCaps {
    pub(crate) name: String,
    pub(crate) num_slots: usize,
    pub(crate) min_x: i32,
    pub(crate) max_x: i32,
    pub(crate) min_y: i32,
    pub(crate) max_y: i32,
    /// Device units per millimeter, per axis.
    pub(crate) units_per_mm_x: f64,
    pub(crate) units_per_mm_y: f64,
    /// The whole pad is a single physical button.
    pub(crate) is_clickpad: bool,
    /// Bounding-box device; coordinates jump while the finger count settles.
    pub(crate) semi_mt: bool,
    pub(crate) has_left_button: bool,
    /// Serial Synaptics pads report more fingers than they have slots and
    /// are known to jump when tracking them.
    pub(crate) synaptics_serial: bool,
}

fn axis_resolution(info: &AbsInfo, assumed_size_mm: f64, axis: &str, name: &str) -> f64 {
    if info.resolution > 0 {
        info.resolution as f64
    } else {
        warn!(
            "{}: no {} resolution reported, assuming a {}mm axis",
            name, axis, assumed_size_mm
        );
        (((info.maximum - info.minimum) as f64) / assumed_size_mm).max(1.0)
    }
}

impl DeviceCaps {
    pub(crate) fn from_device(device: &Device) -> Result<Self> {
        let name = device.name().unwrap_or("Unknown touchpad").to_owned();
        let slots = device
            .abs_info(&EventCode::EV_ABS(EV_ABS::ABS_MT_SLOT))
            .ok_or_else(|| anyhow!("{}: no multitouch slots, can't track taps", name))?;
        let absx = device
            .abs_info(&EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_X))
            .ok_or_else(|| anyhow!("{}: no touch x axis", name))?;
        let absy = device
            .abs_info(&EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_Y))
            .ok_or_else(|| anyhow!("{}: no touch y axis", name))?;

        Ok(Self {
            num_slots: (slots.maximum - slots.minimum + 1).max(1) as usize,
            min_x: absx.minimum,
            max_x: absx.maximum,
            min_y: absy.minimum,
            max_y: absy.maximum,
            // typical touchpad dimensions when the driver reports nothing
            units_per_mm_x: axis_resolution(&absx, 100.0, "x", &name),
            units_per_mm_y: axis_resolution(&absy, 60.0, "y", &name),
            is_clickpad: device.has(&InputProp::INPUT_PROP_BUTTONPAD),
            semi_mt: device.has(&InputProp::INPUT_PROP_SEMI_MT),
            has_left_button: device.has(&EventCode::EV_KEY(EV_KEY::BTN_LEFT)),
            synaptics_serial: name.contains("Synaptics"),
            name,
        })
    }
}
