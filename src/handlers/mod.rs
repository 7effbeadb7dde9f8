// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer auth, AuthUser extension)
pub mod public;
pub mod protected;
