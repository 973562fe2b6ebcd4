//! Numeric UI fields and named actions exposed by each device.

/// Getter/setter surface used by device screens and remote tuning.
///
/// Field ids are device specific; setters clamp their input the same way a
/// record load does.
pub trait DeviceFields {
    /// Number of fields exposed.
    fn field_count(&self) -> usize;

    /// Read field `id` (0 for unknown ids).
    fn field(&self, id: usize) -> i32;

    /// Write field `id`. Unknown ids are ignored.
    fn set_field(&mut self, id: usize, value: i32);

    /// Apply a named action such as a tuning change or a manual trigger.
    /// Returns `false` for actions the device does not know.
    fn apply_action(&mut self, action: &str, value: i32) -> bool;

    /// All fields in id order.
    fn fields(&self) -> Vec<i32> {
        (0..self.field_count()).map(|id| self.field(id)).collect()
    }
}
