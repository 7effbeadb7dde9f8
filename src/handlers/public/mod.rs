// handlers/public/mod.rs - Public handlers (no authentication required)
pub mod health;
pub mod root;

pub use health::get as health_get;
pub use root::get as root_get;
