//! Flag bits by schema version.
//!
//! Flags move between owners over time (key map, trigger, action) and a bit value may be
//! reused by a different flag after a move, so every constant is scoped to the version range
//! in which it is valid. A version module only lists what changed since the previous one.

/// A flag that moves from one bit field to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagMove {
    /// Bit in the source field
    pub from: i64,
    /// Bit in the destination field
    pub to: i64,
}

/// Whether every bit of `flag` is set.
#[must_use]
pub const fn has_flag(flags: i64, flag: i64) -> bool {
    flags & flag == flag
}

/// Collects the destination bits of every move whose source bit is set in `flags`.
#[must_use]
pub fn moved_bits(flags: i64, moves: &[FlagMove]) -> i64 {
    moves
        .iter()
        .filter(|m| has_flag(flags, m.from))
        .fold(0, |acc, m| acc | m.to)
}

/// Clears the source bit of every move.
#[must_use]
pub fn without_moved(flags: i64, moves: &[FlagMove]) -> i64 {
    moves.iter().fold(flags, |acc, m| acc & !m.from)
}

/// Version 1: a single flags column on the key map.
pub mod v1 {
    /// Trigger keys are long pressed
    pub const KEYMAP_LONG_PRESS: i64 = 1;
    /// Show the volume dialog when the action runs
    pub const KEYMAP_SHOW_VOLUME_UI: i64 = 2;
    /// Vibrate when triggered
    pub const KEYMAP_VIBRATE: i64 = 4;
}

/// Versions 2 and 3. Long press moved into each key's click type.
pub mod v2 {
    /// Vibrate when triggered
    pub const KEYMAP_VIBRATE: i64 = 1;
    /// Show a toast when triggered
    pub const KEYMAP_SHOW_TOAST: i64 = 2;
    /// Vibrate again when a long press is detected
    pub const KEYMAP_LONG_PRESS_DOUBLE_VIBRATION: i64 = 4;
    /// Detect the trigger while the screen is off
    pub const KEYMAP_SCREEN_OFF_TRIGGERS: i64 = 8;
    /// Repeat the actions while the trigger is held. Introduced by the 2 to 3 step.
    pub const KEYMAP_REPEAT: i64 = 16;

    /// Show the volume dialog when the action runs
    pub const ACTION_SHOW_VOLUME_UI: i64 = 1;
}

/// Versions 5 to 9. Repeat and toast moved onto the actions.
pub mod v5 {
    /// Show the volume dialog when the action runs
    pub const ACTION_SHOW_VOLUME_UI: i64 = 1;
    /// Show a toast when the action runs
    pub const ACTION_SHOW_TOAST: i64 = 2;
    /// Repeat the action while the trigger is held
    pub const ACTION_REPEAT: i64 = 4;
    /// Hold the key down until the trigger is released
    pub const ACTION_HOLD_DOWN: i64 = 8;
}

/// Versions 6 and later. Trigger options moved into the trigger.
pub mod v6 {
    /// Vibrate when triggered
    pub const TRIGGER_VIBRATE: i64 = 1;
    /// Vibrate again when a long press is detected
    pub const TRIGGER_LONG_PRESS_DOUBLE_VIBRATION: i64 = 4;
    /// Detect the trigger while the screen is off
    pub const TRIGGER_SCREEN_OFF_TRIGGERS: i64 = 8;
}

/// Versions 10 and later. The toast moved from the actions to the trigger.
pub mod v10 {
    /// Show a toast when triggered
    pub const TRIGGER_SHOW_TOAST: i64 = 16;
}

/// 1 to 2, key map flags that stay on the key map.
pub const V1_TO_V2_KEYMAP: &[FlagMove] = &[FlagMove {
    from: v1::KEYMAP_VIBRATE,
    to: v2::KEYMAP_VIBRATE,
}];

/// 1 to 2, key map flags that move onto the action.
pub const V1_TO_V2_ACTION: &[FlagMove] = &[FlagMove {
    from: v1::KEYMAP_SHOW_VOLUME_UI,
    to: v2::ACTION_SHOW_VOLUME_UI,
}];

/// 4 to 5, key map flags that move onto every action.
pub const V4_TO_V5_ACTION: &[FlagMove] = &[
    FlagMove {
        from: v2::KEYMAP_REPEAT,
        to: v5::ACTION_REPEAT,
    },
    FlagMove {
        from: v2::KEYMAP_SHOW_TOAST,
        to: v5::ACTION_SHOW_TOAST,
    },
];

/// 5 to 6, key map flags that move into the trigger.
pub const V5_TO_V6_TRIGGER: &[FlagMove] = &[
    FlagMove {
        from: v2::KEYMAP_VIBRATE,
        to: v6::TRIGGER_VIBRATE,
    },
    FlagMove {
        from: v2::KEYMAP_LONG_PRESS_DOUBLE_VIBRATION,
        to: v6::TRIGGER_LONG_PRESS_DOUBLE_VIBRATION,
    },
    FlagMove {
        from: v2::KEYMAP_SCREEN_OFF_TRIGGERS,
        to: v6::TRIGGER_SCREEN_OFF_TRIGGERS,
    },
];

/// 9 to 10, action flags folded into the trigger.
pub const V9_TO_V10_TRIGGER: &[FlagMove] = &[FlagMove {
    from: v5::ACTION_SHOW_TOAST,
    to: v10::TRIGGER_SHOW_TOAST,
}];
