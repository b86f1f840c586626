mod config;
mod devices;
mod mouse;
mod tap;
mod timer;
mod touch;
mod util;

use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Context, Result};
use evdev_rs::{
    enums::{EventCode, EV_SYN},
    Device, InputEvent, ReadFlag, ReadStatus,
};
use log::{debug, info, trace, warn};

use crate::config::Config;
use crate::devices::{find_touchpad, open_input_evdev, set_monotonic_clock, DeviceCaps};
use crate::mouse::VirtualMouse;
use crate::tap::TapMachine;
use crate::touch::Touchpad;
use crate::util::{now_micros, AsMicros};

// Follows XDG Base Dir Spec
const CONFIG_PATH: &str = "/etc/xdg/tapclick.toml";

static SUSPEND: AtomicBool = AtomicBool::new(false);
static RESUME: AtomicBool = AtomicBool::new(false);
static RELOAD: AtomicBool = AtomicBool::new(false);
static QUIT: AtomicBool = AtomicBool::new(false);

extern "C" fn on_suspend(_: libc::c_int) {
    SUSPEND.store(true, Ordering::Relaxed);
}

extern "C" fn on_resume(_: libc::c_int) {
    RESUME.store(true, Ordering::Relaxed);
}

extern "C" fn on_reload(_: libc::c_int) {
    RELOAD.store(true, Ordering::Relaxed);
}

extern "C" fn on_quit(_: libc::c_int) {
    QUIT.store(true, Ordering::Relaxed);
}

struct TapDaemon {
    evdev: Device,
    mouse: VirtualMouse,
    pad: Touchpad,
    machine: TapMachine,
}

impl std::fmt::Debug for TapDaemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapDaemon")
            .field("evdev", &self.evdev.file())
            .field("mouse", &self.mouse)
            .field("machine", &self.machine)
            .finish()
    }
}

impl TapDaemon {
    fn handle_event(&mut self, ev: InputEvent) {
        if let EventCode::EV_SYN(EV_SYN::SYN_REPORT) = ev.event_code {
            self.handle_frame(ev.time.as_micros());
        } else {
            self.pad.decode_event(&ev);
        }
    }

    fn handle_frame(&mut self, time: u64) {
        let filter_motion = self
            .machine
            .handle_state(time, &mut self.pad, &mut self.mouse);
        self.machine.post_process_state();
        self.pad.end_frame();
        trace!(
            "Frame at {}: state={:?} filter_motion={} dragging={} timer={:?}",
            time,
            self.machine.state(),
            filter_motion,
            self.machine.dragging(),
            self.machine.timer_deadline()
        );
    }

    /// Read everything the kernel has queued. A SYN_DROPPED switches us to
    /// sync reads until the device state is replayed.
    fn drain_events(&mut self) -> Result<()> {
        let mut read_flag = ReadFlag::NORMAL;
        loop {
            match self.evdev.next_event(read_flag) {
                Ok((ReadStatus::Success, ev)) => self.handle_event(ev),
                Ok((ReadStatus::Sync, ev)) => {
                    if let EventCode::EV_SYN(EV_SYN::SYN_DROPPED) = ev.event_code {
                        read_flag = ReadFlag::SYNC;
                    } else {
                        self.handle_event(ev);
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if read_flag == ReadFlag::SYNC {
                        read_flag = ReadFlag::NORMAL;
                        continue;
                    }
                    return Ok(());
                }
                Err(err) => return Err(err).context("Error reading touchpad events"),
            }
        }
    }

    fn handle_signals(&mut self) {
        if SUSPEND.swap(false, Ordering::Relaxed) {
            info!("Suspending tap processing");
            self.machine
                .suspend(now_micros(), &mut self.pad, &mut self.mouse);
        }
        if RESUME.swap(false, Ordering::Relaxed) {
            info!("Resuming tap processing");
            self.machine
                .resume(now_micros(), &mut self.pad, &mut self.mouse);
        }
        if RELOAD.swap(false, Ordering::Relaxed) {
            match Config::load(CONFIG_PATH) {
                Ok(config) => self.apply_config(&config),
                Err(err) => warn!("Couldn't reload config: {:#}", err),
            }
        }
    }

    fn apply_config(&mut self, config: &Config) {
        info!("Reloading config: {:?}", config);
        self.machine.set_map(config.button_map());
        self.machine.set_drag_enabled(config.drag_enabled());
        self.machine.set_drag_lock_enabled(config.drag_lock_enabled());
        if let Some(enabled) = config.tap_enabled() {
            self.machine
                .set_enabled(enabled, now_micros(), &mut self.pad, &mut self.mouse);
        }
        self.pad.thumb_pressure = config.thumb_pressure();
        self.pad.palm_edge_mm = config.palm_edge_mm();
        // the map getter reports the active map, which lags want_map until
        // the machine next idles
        debug!(
            "Tap settings now: enabled={} map={:?} drag={} drag_lock={} ({}-finger taps)",
            self.machine.tap_enabled(),
            self.machine.map(),
            self.machine.drag_enabled(),
            self.machine.drag_lock_enabled(),
            self.machine.count(),
        );
    }

    fn process(&mut self) -> Result<()> {
        loop {
            self.handle_signals();
            if QUIT.load(Ordering::Relaxed) {
                info!("Shutting down");
                self.machine
                    .release_all(now_micros(), &mut self.pad, &mut self.mouse);
                return Ok(());
            }

            let timeout = self.machine.poll_timeout_ms(now_micros());
            let mut fds = [libc::pollfd {
                fd: self.evdev.file().as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            }];
            match unsafe { libc::poll(fds.as_mut_ptr(), 1, timeout) } {
                0 => {
                    // the single tap/drag timer went off
                    self.machine
                        .handle_timeout(now_micros(), &mut self.pad, &mut self.mouse);
                }
                n if n > 0 => {
                    if fds[0].revents & (libc::POLLERR | libc::POLLHUP) != 0 {
                        return Err(anyhow!("Touchpad device went away"));
                    }
                    self.drain_events()?;
                }
                _ => {
                    let err = std::io::Error::last_os_error();
                    if err.kind() != std::io::ErrorKind::Interrupted {
                        return Err(err).context("poll failed");
                    }
                    // interrupted by a signal; the loop top picks it up
                }
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load(CONFIG_PATH).context("Couldn't load config")?;
    info!("Config: {:?}", config);

    let touchpad_ev_id = find_touchpad().context("Couldn't find a touchpad device")?;
    let evdev = open_input_evdev(touchpad_ev_id)?;
    set_monotonic_clock(&evdev)?;
    let caps = DeviceCaps::from_device(&evdev)?;

    let machine = TapMachine::new(&config, caps.has_left_button, caps.num_slots);
    let pad = Touchpad::new(caps, &config);
    info!(
        "Using {} ({} slots, up to {}-finger taps, clickpad: {}, tapping {})",
        pad.caps.name,
        pad.caps.num_slots,
        machine.count(),
        pad.caps.is_clickpad,
        if machine.tap_enabled() { "enabled" } else { "disabled" },
    );

    unsafe {
        libc::signal(libc::SIGUSR1, on_suspend as libc::sighandler_t);
        libc::signal(libc::SIGUSR2, on_resume as libc::sighandler_t);
        libc::signal(libc::SIGHUP, on_reload as libc::sighandler_t);
        libc::signal(libc::SIGINT, on_quit as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_quit as libc::sighandler_t);
    }

    let mut daemon = TapDaemon {
        evdev,
        mouse: VirtualMouse::new(),
        pad,
        machine,
    };
    daemon.process()
}
