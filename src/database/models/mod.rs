pub mod history;
pub mod prompt;
pub mod variable;

pub use history::HistoryEntry;
pub use prompt::{extract_variables, NewPrompt, Prompt, PromptPatch, PromptVariable};
pub use variable::{Variable, DEFAULT_VARIABLE_COLOR};
