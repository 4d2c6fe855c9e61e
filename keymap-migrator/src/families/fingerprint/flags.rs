//! Fingerprint map flag bits by preference version. Action flags share the key map's version 5
//! layout.

use crate::families::keymap::flags::{v5, FlagMove};

/// Version 0.
pub mod v0 {
    /// Vibrate when the gesture is detected
    pub const VIBRATE: i64 = 1;
    /// Repeat the actions, moved onto each action by the 0 to 1 step
    pub const REPEAT_ACTIONS: i64 = 2;
}

/// Version 1.
pub mod v1 {
    /// Vibrate when the gesture is detected
    pub const VIBRATE: i64 = 1;
}

/// Version 2 and the `fingerprintmaps` table.
pub mod v2 {
    /// Vibrate when the gesture is detected
    pub const VIBRATE: i64 = 1;
    /// Show a toast when the gesture is detected
    pub const SHOW_TOAST: i64 = 2;
}

/// 0 to 1: map repeat becomes action repeat.
pub const V0_TO_V1_ACTION: &[FlagMove] = &[FlagMove {
    from: v0::REPEAT_ACTIONS,
    to: v5::ACTION_REPEAT,
}];

/// 1 to 2: action toast becomes map toast.
pub const V1_TO_V2_MAP: &[FlagMove] = &[FlagMove {
    from: v5::ACTION_SHOW_TOAST,
    to: v2::SHOW_TOAST,
}];
