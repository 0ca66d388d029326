//! In-process [`crate::DeploySource`] implementations.

mod embedded;
mod filesystem;

pub use embedded::EmbeddedSource;
pub use filesystem::FileSystemSource;
