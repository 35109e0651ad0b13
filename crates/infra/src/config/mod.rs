//! Configuration loading.

pub mod loader;

pub use loader::{load, load_from_dir};
