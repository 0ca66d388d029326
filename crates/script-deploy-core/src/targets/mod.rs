//! In-process [`crate::DeployTarget`] implementations.

mod memory;

pub use memory::MemoryTarget;
