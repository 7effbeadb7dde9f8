// handlers/protected/mod.rs - Protected handlers (bearer authentication required)
//
// Every route in this tier runs behind bearer_auth_middleware, which places
// an AuthUser in the request extensions. Handlers scope all reads and writes
// to auth_user.user_id.
pub mod auth;
pub mod enhance;
pub mod history;
pub mod prompts;
pub mod utils;
pub mod variables;

pub use enhance::post as enhance_post;
