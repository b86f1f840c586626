use evdev_rs::enums::EV_KEY;
use log::debug;
use serde::Deserialize;

/// Which pointer button an n-finger tap produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ButtonMap {
    /// 1 → left, 2 → right, 3 → middle
    Lrm,
    /// 1 → left, 2 → middle, 3 → right
    Lmr,
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self::Lrm
    }
}

impl ButtonMap {
    pub(crate) fn button(self, nfingers: u32) -> EV_KEY {
        match (self, nfingers) {
            (_, 1) => EV_KEY::BTN_LEFT,
            (Self::Lrm, 2) => EV_KEY::BTN_RIGHT,
            (Self::Lrm, 3) => EV_KEY::BTN_MIDDLE,
            (Self::Lmr, 2) => EV_KEY::BTN_MIDDLE,
            (Self::Lmr, 3) => EV_KEY::BTN_RIGHT,
            _ => {
                debug_assert!(false, "no button for a {}-finger tap", nfingers);
                EV_KEY::BTN_LEFT
            }
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
pub(crate) struct Config {
    /// Overrides the device-dependent default (tapping is on by default
    /// only for touchpads without a physical left button).
    tap_enabled: Option<bool>,

    #[serde(default)]
    button_map: ButtonMap,

    #[serde(default = "default_drag")]
    drag_enabled: bool,

    #[serde(default)]
    drag_lock_enabled: bool,

    /// Width of the left/right edge zones, in mm, where a beginning touch
    /// is treated as a resting palm. 0 disables the check.
    #[serde(default)]
    palm_edge_mm: f64,

    /// Pressure above which a touch is classified as a thumb. Device
    /// specific; unset disables thumb detection.
    thumb_pressure: Option<i32>,
}

fn default_drag() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tap_enabled: None,
            button_map: ButtonMap::default(),
            drag_enabled: true,
            drag_lock_enabled: false,
            palm_edge_mm: 0.0,
            thumb_pressure: None,
        }
    }
}

impl Config {
    pub(crate) fn load(path: &str) -> anyhow::Result<Self> {
        match std::fs::read(path) {
            Ok(raw) => Ok(toml::from_slice(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path);
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn tap_enabled(&self) -> Option<bool> {
        self.tap_enabled
    }

    pub(crate) fn button_map(&self) -> ButtonMap {
        self.button_map
    }

    pub(crate) fn drag_enabled(&self) -> bool {
        self.drag_enabled
    }

    pub(crate) fn drag_lock_enabled(&self) -> bool {
        self.drag_lock_enabled
    }

    pub(crate) fn palm_edge_mm(&self) -> f64 {
        self.palm_edge_mm
    }

    pub(crate) fn thumb_pressure(&self) -> Option<i32> {
        self.thumb_pressure
    }
}
