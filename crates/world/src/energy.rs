//! Stored energy for powered devices.

use serde::{Deserialize, Serialize};

/// Bounded energy buffer with a per-call receive limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battery {
    energy: u32,
    capacity: u32,
    max_receive: u32,
}

impl Battery {
    /// Empty battery.
    pub fn new(capacity: u32, max_receive: u32) -> Self {
        Self {
            energy: 0,
            capacity,
            max_receive,
        }
    }

    /// Stored energy.
    pub fn energy(&self) -> u32 {
        self.energy
    }

    /// Overwrite the stored energy (clamped to capacity).
    pub fn set_energy(&mut self, energy: u32) {
        self.energy = energy.min(self.capacity);
    }

    /// Accept up to `amount` (bounded by the receive limit and free room).
    /// Returns the energy accepted.
    pub fn receive(&mut self, amount: u32, simulate: bool) -> u32 {
        let accepted = amount
            .min(self.max_receive)
            .min(self.capacity - self.energy);
        if !simulate {
            self.energy += accepted;
        }
        accepted
    }

    /// Draw exactly `amount`, or nothing if not enough is stored.
    pub fn draw(&mut self, amount: u32) -> bool {
        if self.energy < amount {
            return false;
        }
        self.energy -= amount;
        true
    }

    /// Whether the battery holds no energy.
    pub fn is_empty(&self) -> bool {
        self.energy == 0
    }

    /// State of charge in percent.
    pub fn soc_percent(&self) -> u32 {
        if self.capacity == 0 {
            return 0;
        }
        ((self.energy as u64 * 100) / self.capacity as u64) as u32
    }

    /// Drop all stored energy.
    pub fn clear(&mut self) {
        self.energy = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_is_all_or_nothing() {
        let mut battery = Battery::new(100, 50);
        assert_eq!(battery.receive(80, false), 50);
        assert!(!battery.draw(60));
        assert!(battery.draw(50));
        assert!(battery.is_empty());
    }

    #[test]
    fn receive_respects_capacity() {
        let mut battery = Battery::new(100, 100);
        battery.set_energy(90);
        assert_eq!(battery.receive(50, true), 10);
        assert_eq!(battery.energy(), 90);
        assert_eq!(battery.soc_percent(), 90);
    }
}
