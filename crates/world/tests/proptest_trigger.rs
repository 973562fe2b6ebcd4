use edautomation_world::trigger::{evaluate, DropLogic, LogicFlags, TriggerState};
use proptest::prelude::*;

fn run<F: edautomation_world::trigger::TriggerFlags>(signals: &[bool], flags: F) -> Vec<bool> {
    let mut state = TriggerState::default();
    signals
        .iter()
        .map(|&raw| {
            let outcome = evaluate(raw, flags, state);
            state = outcome.state;
            outcome.fire
        })
        .collect()
}

proptest! {
    #[test]
    fn edge_mode_fires_on_adjusted_rising_edges(
        signals in prop::collection::vec(any::<bool>(), 1..64),
        inverted in any::<bool>(),
    ) {
        let flags = if inverted { LogicFlags::INVERTED } else { LogicFlags::empty() };
        let fired = run(&signals, flags);
        let mut previous = false;
        for (raw, fire) in signals.iter().zip(fired) {
            let level = *raw != inverted;
            prop_assert_eq!(fire, level && level != previous);
            previous = level;
        }
    }

    #[test]
    fn continuous_mode_follows_level(
        signals in prop::collection::vec(any::<bool>(), 1..64),
        inverted in any::<bool>(),
    ) {
        let mut flags = LogicFlags::CONTINUOUS;
        flags.set(LogicFlags::INVERTED, inverted);
        let fired = run(&signals, flags);
        for (raw, fire) in signals.iter().zip(fired) {
            prop_assert_eq!(fire, *raw != inverted);
        }
    }

    #[test]
    fn ignore_external_always_fires(
        signals in prop::collection::vec(any::<bool>(), 1..32),
        bits in 0u32..0x80,
    ) {
        let flags = DropLogic::from_bits_truncate(bits) | DropLogic::IGNORE_EXTERNAL;
        prop_assert!(run(&signals, flags).into_iter().all(|fire| fire));
    }

    #[test]
    fn pulse_keeps_edge_bookkeeping(raw in any::<bool>(), latched in any::<bool>()) {
        let prior = TriggerState { latched_signal: latched, signal_changed_this_tick: false };
        let plain = evaluate(raw, LogicFlags::empty(), prior);
        let pulsed = plain.pulsed();
        prop_assert!(pulsed.fire);
        prop_assert_eq!(pulsed.state, plain.state);
        prop_assert_eq!(pulsed.changed, plain.changed);
    }
}
