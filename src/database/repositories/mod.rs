pub mod history;
pub mod prompts;

pub use history::HistoryRepository;
pub use prompts::PromptRepository;

use crate::database::models::Variable;
use crate::database::repository::TenantRepository;

/// `users/{uid}/variables`; plain CRUD with no extra queries.
pub type VariableRepository = TenantRepository<Variable>;
