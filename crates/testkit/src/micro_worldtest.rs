//! Micro-worldtest harness for deterministic, tick-based tests.
//!
//! A micro-worldtest steps a tiny simulation for a fixed number of ticks and
//! records selected state after every step. Two runs from the same seed must
//! produce identical reports.

use anyhow::{ensure, Result};
use edautomation_core::SimTick;
use serde::Serialize;

/// Configuration for a micro-worldtest.
#[derive(Debug, Clone)]
pub struct MicroWorldtestConfig {
    /// Human-readable name (written into the report).
    pub name: String,
    /// Number of ticks to step (report includes the initial frame at tick 0).
    pub ticks: u64,
}

/// Single frame captured at a given tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicroWorldtestFrame<S> {
    /// Tick number.
    pub tick: u64,
    /// Captured state.
    pub snapshot: S,
}

/// All frames of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicroWorldtestReport<S> {
    /// Name from the configuration.
    pub name: String,
    /// Frames in tick order.
    pub frames: Vec<MicroWorldtestFrame<S>>,
}

impl<S: Serialize> MicroWorldtestReport<S> {
    /// Last frame, if any.
    pub fn last(&self) -> Option<&S> {
        self.frames.last().map(|frame| &frame.snapshot)
    }

    /// Report as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run a micro-worldtest and return its report.
///
/// Captures the initial frame at tick 0, then steps `config.ticks` times,
/// capturing a frame after each step (so the report holds `ticks + 1` frames).
pub fn run_micro_worldtest<State, Snapshot, StepFn, SnapFn>(
    config: MicroWorldtestConfig,
    mut state: State,
    mut step: StepFn,
    mut snapshot: SnapFn,
) -> MicroWorldtestReport<Snapshot>
where
    Snapshot: Serialize,
    StepFn: FnMut(SimTick, &mut State),
    SnapFn: FnMut(SimTick, &State) -> Snapshot,
{
    let mut frames = Vec::with_capacity(config.ticks as usize + 1);

    let mut tick = SimTick::ZERO;
    frames.push(MicroWorldtestFrame {
        tick: tick.0,
        snapshot: snapshot(tick, &state),
    });

    for _ in 0..config.ticks {
        step(tick, &mut state);
        tick = tick.advance(1);
        frames.push(MicroWorldtestFrame {
            tick: tick.0,
            snapshot: snapshot(tick, &state),
        });
    }

    MicroWorldtestReport {
        name: config.name,
        frames,
    }
}

/// Fail unless two reports serialize identically.
pub fn assert_reports_match<S: Serialize>(
    left: &MicroWorldtestReport<S>,
    right: &MicroWorldtestReport<S>,
) -> Result<()> {
    let left_json = left.to_json()?;
    let right_json = right.to_json()?;
    if let Some((index, (a, b))) = left_json
        .lines()
        .zip(right_json.lines())
        .enumerate()
        .find(|(_, (a, b))| a != b)
    {
        anyhow::bail!(
            "micro-worldtest '{}' diverged at line {}:\n  left:  {a}\n  right: {b}",
            left.name,
            index + 1
        );
    }
    ensure!(
        left.frames.len() == right.frames.len(),
        "micro-worldtest '{}' frame count differs: {} vs {}",
        left.name,
        left.frames.len(),
        right.frames.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(ticks: u64) -> MicroWorldtestReport<u32> {
        run_micro_worldtest(
            MicroWorldtestConfig {
                name: "counter".into(),
                ticks,
            },
            0u32,
            |_, state| *state += 2,
            |_, state| *state,
        )
    }

    #[test]
    fn records_initial_frame_plus_one_per_tick() {
        let report = counter(3);
        assert_eq!(report.frames.len(), 4);
        assert_eq!(report.last(), Some(&6));
        assert_eq!(report.frames[1].tick, 1);
    }

    #[test]
    fn matching_reports_pass_and_different_lengths_fail() {
        assert!(assert_reports_match(&counter(5), &counter(5)).is_ok());
        assert!(assert_reports_match(&counter(5), &counter(6)).is_err());
    }
}
