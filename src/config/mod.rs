pub mod loader;
pub mod models;

pub use loader::{load_manifest, load_settings};
pub use models::*;
