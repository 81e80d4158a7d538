pub mod picker_registry;

pub use picker_registry::{PickerRegistry, PickerRegistryArgs};
