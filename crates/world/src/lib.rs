//! Periodic automation devices (hopper, dropper, placer, incinerator and
//! mineral smelter) and the host they tick against.

pub mod access;
pub mod config;
pub mod containers;
pub mod cooldown;
pub mod devices;
pub mod energy;
pub mod fields;
pub mod level;
pub mod persist;
pub mod round_robin;
pub mod slots;
pub mod storage;
pub mod transfer;
pub mod trigger;

pub use access::{Aabb, ItemEntityId, ItemEntityView, PlacementError, Sound, VisualField, WorldAccess};
pub use config::{AutomationConfig, DropperConfig, IncineratorConfig, SmelterConfig};
pub use containers::{Cabinet, Chest};
pub use cooldown::{Countdown, TickTimer};
pub use devices::{Automaton, Device, Dropper, Hopper, Incinerator, MineralSmelter, Placer};
pub use energy::Battery;
pub use fields::DeviceFields;
pub use level::{BlockEntity, ItemEntity, Level, LevelEvent, SavedDevice};
pub use persist::{DeviceRecord, Persist, PersistError};
pub use round_robin::RoundRobin;
pub use slots::SlotArray;
pub use storage::{ItemHandler, LegacyInventory, StorageEndpoint, StorageProvider};
pub use trigger::{DropLogic, LogicFlags, TriggerState};
