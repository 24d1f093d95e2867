pub mod enums;
pub mod inventory;
pub mod label;

pub use enums::{FoodClass, ItemStatus};
pub use inventory::{InventoryFilter, InventoryItem, ManualEntry, PhotoRef, StoredItem};
pub use label::Label;
