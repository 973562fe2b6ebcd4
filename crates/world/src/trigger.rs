//! Redstone trigger evaluation shared by the devices.
//!
//! A device samples its raw neighbour signal once per active tick and folds
//! it through its logic flags. The latched level kept in [`TriggerState`] is
//! the logic-adjusted level, so edge detection honours inversion.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Trigger behaviour of hoppers and placers.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct LogicFlags: u32 {
        /// Act while the signal is absent instead of present.
        const INVERTED = 0x01;
        /// Act on every tick the signal is active, not just on edges.
        const CONTINUOUS = 0x02;
        /// Always act regardless of the signal.
        const IGNORE_EXTERNAL = 0x04;
    }
}

bitflags::bitflags! {
    /// Trigger and presentation behaviour of droppers.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DropLogic: u32 {
        /// All defined filters must match (otherwise any).
        const FILTER_AND_GATE = 0x01;
        /// Filter and external triggers are combined with AND (otherwise OR).
        const EXTERN_AND_GATE = 0x02;
        /// No sound when dropping.
        const SILENT_DROP = 0x04;
        /// No sound when the shutter opens or closes.
        const SILENT_OPEN = 0x08;
        /// Act on every tick the signal is active, not just on edges.
        const CONTINUOUS = 0x10;
        /// Always act regardless of the signal.
        const IGNORE_EXTERNAL = 0x20;
        /// Act while the signal is absent instead of present.
        const INVERTED = 0x40;
    }
}

/// Common view over the per-device flag sets.
pub trait TriggerFlags: Copy {
    /// Inverted signal polarity.
    fn inverted(self) -> bool;
    /// Level triggered rather than edge triggered.
    fn continuous(self) -> bool;
    /// External signal ignored entirely.
    fn ignores_external(self) -> bool;

    /// Neither continuous nor ignoring the signal: act on edges only.
    fn pulse_mode(self) -> bool {
        !self.continuous() && !self.ignores_external()
    }
}

impl TriggerFlags for LogicFlags {
    fn inverted(self) -> bool {
        self.contains(LogicFlags::INVERTED)
    }

    fn continuous(self) -> bool {
        self.contains(LogicFlags::CONTINUOUS)
    }

    fn ignores_external(self) -> bool {
        self.contains(LogicFlags::IGNORE_EXTERNAL)
    }
}

impl TriggerFlags for DropLogic {
    fn inverted(self) -> bool {
        self.contains(DropLogic::INVERTED)
    }

    fn continuous(self) -> bool {
        self.contains(DropLogic::CONTINUOUS)
    }

    fn ignores_external(self) -> bool {
        self.contains(DropLogic::IGNORE_EXTERNAL)
    }
}

/// Persistent trigger memory of one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    /// Logic-adjusted signal level seen on the previous evaluation.
    pub latched_signal: bool,
    /// Whether the latched level flipped on the last evaluation.
    pub signal_changed_this_tick: bool,
}

/// Result of one trigger evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// The device should perform its action.
    pub fire: bool,
    /// Logic-adjusted signal level.
    pub rs_active: bool,
    /// The adjusted level differs from the previous evaluation.
    pub changed: bool,
    /// State to persist for the next evaluation.
    pub state: TriggerState,
}

impl TriggerOutcome {
    /// Force the outcome to fire without touching edge bookkeeping.
    pub fn pulsed(self) -> Self {
        Self { fire: true, ..self }
    }
}

/// Logic-adjusted level for a raw signal.
pub fn active_level<F: TriggerFlags>(raw_signal: bool, flags: F) -> bool {
    flags.ignores_external() || (raw_signal != flags.inverted())
}

/// Evaluate the trigger for one active tick.
pub fn evaluate<F: TriggerFlags>(raw_signal: bool, flags: F, prior: TriggerState) -> TriggerOutcome {
    let rs_active = active_level(raw_signal, flags);
    let changed = rs_active != prior.latched_signal;
    let fire = flags.ignores_external()
        || (flags.continuous() && rs_active)
        || (!flags.continuous() && changed && rs_active);
    TriggerOutcome {
        fire,
        rs_active,
        changed,
        state: TriggerState {
            latched_signal: rs_active,
            signal_changed_this_tick: changed,
        },
    }
}

/// Per-filter match state as shown in the device UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMatch {
    /// No filter item in this control slot.
    #[default]
    Unset,
    /// Filter defined but the input does not hold enough items.
    Set,
    /// The input holds at least the filter quantity.
    Matched,
}

impl FilterMatch {
    /// UI encoding (0 unset, 1 set, 2 matched).
    pub fn as_field(self) -> i32 {
        match self {
            FilterMatch::Unset => 0,
            FilterMatch::Set => 1,
            FilterMatch::Matched => 2,
        }
    }

    /// Decode a UI value, masking to the two low bits.
    pub fn from_field(value: i32) -> Self {
        match value & 0x3 {
            2 | 3 => FilterMatch::Matched,
            1 => FilterMatch::Set,
            _ => FilterMatch::Unset,
        }
    }
}

/// Aggregate over all filter slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// At least one filter slot holds an item.
    pub defined: bool,
    /// The filters are satisfied.
    pub trigger: bool,
}

impl FilterOutcome {
    /// Combine per-slot matches with AND (`all`) or OR semantics.
    pub fn from_matches(matches: &[FilterMatch], all: bool) -> Self {
        let defined = matches.iter().any(|m| *m != FilterMatch::Unset);
        let any_matched = matches.iter().any(|m| *m == FilterMatch::Matched);
        let all_matched = matches
            .iter()
            .filter(|m| **m != FilterMatch::Unset)
            .all(|m| *m == FilterMatch::Matched);
        let trigger = if all {
            defined && all_matched
        } else {
            any_matched
        };
        Self { defined, trigger }
    }
}

/// Combine the external trigger with the filter trigger.
pub fn gate(external_fire: bool, filter: FilterOutcome, extern_and: bool) -> bool {
    if !filter.defined {
        return external_fire;
    }
    if extern_and {
        external_fire && filter.trigger
    } else {
        external_fire || filter.trigger
    }
}
