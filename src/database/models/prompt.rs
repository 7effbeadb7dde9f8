use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::database::record::Record;
use crate::database::search::Searchable;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptVariable {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// A saved prompt. `variables` is derived from `prompt_text` on every write
/// and never taken from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prompt {
    pub prompt_name: String,
    pub prompt_description: String,
    pub prompt_text: String,
    pub color: String,
    #[serde(default)]
    pub variables: Vec<PromptVariable>,
}

impl Record for Prompt {
    const COLLECTION: &'static str = "prompts";
}

impl Searchable for Prompt {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.prompt_name.as_str(), self.prompt_description.as_str()]
    }
}

/// Create payload. Missing fields default to empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPrompt {
    #[serde(default)]
    pub prompt_name: String,
    #[serde(default)]
    pub prompt_description: String,
    #[serde(default)]
    pub prompt_text: String,
    #[serde(default)]
    pub color: String,
}

/// Update payload. Absent fields keep their current values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptPatch {
    pub prompt_name: Option<String>,
    pub prompt_description: Option<String>,
    pub prompt_text: Option<String>,
    pub color: Option<String>,
}

impl From<NewPrompt> for Prompt {
    fn from(input: NewPrompt) -> Self {
        let variables = variables_for(&input.prompt_text);
        Prompt {
            prompt_name: input.prompt_name,
            prompt_description: input.prompt_description,
            prompt_text: input.prompt_text,
            color: input.color,
            variables,
        }
    }
}

impl PromptPatch {
    /// Merges onto `existing` and re-derives the variables from the merged text.
    pub fn apply(self, existing: Prompt) -> Prompt {
        let prompt_text = self.prompt_text.unwrap_or(existing.prompt_text);
        let variables = variables_for(&prompt_text);
        Prompt {
            prompt_name: self.prompt_name.unwrap_or(existing.prompt_name),
            prompt_description: self.prompt_description.unwrap_or(existing.prompt_description),
            prompt_text,
            color: self.color.unwrap_or(existing.color),
            variables,
        }
    }
}

fn variables_for(text: &str) -> Vec<PromptVariable> {
    extract_variables(text)
        .into_iter()
        .map(|name| PromptVariable {
            name,
            value: String::new(),
        })
        .collect()
}

/// Placeholder names in `{{ name }}` syntax (`name` is `[A-Za-z0-9_]+`,
/// whitespace inside the braces allowed). Duplicates collapse.
pub fn extract_variables(text: &str) -> BTreeSet<String> {
    let bytes = text.as_bytes();
    let mut names = BTreeSet::new();
    let mut i = 0;

    while let Some(pos) = text[i..].find("{{") {
        let open = i + pos;
        let mut j = open + 2;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let name_start = j;
        while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
            j += 1;
        }
        let name_end = j;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        if name_end > name_start && bytes[j..].starts_with(b"}}") {
            names.insert(text[name_start..name_end].to_string());
            i = j + 2;
        } else {
            // "{{{name}}" still matches starting at the second brace
            i = open + 1;
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn duplicate_placeholders_collapse() {
        let text = "Hello {{name}}, your {{name}} is {{id}}";
        assert_eq!(extract_variables(text), set(&["name", "id"]));
        assert_eq!(extract_variables(text), extract_variables(text));
    }

    #[test]
    fn whitespace_and_malformed_placeholders() {
        assert_eq!(extract_variables("{{ user_1 }} {{}} {{bad-name}} {{ a b }}"), set(&["user_1"]));
        assert_eq!(extract_variables("{{{x}}}"), set(&["x"]));
        assert_eq!(extract_variables("{{ unterminated"), set(&[]));
        assert_eq!(extract_variables("héllo {{ wörld }} {{ok}}"), set(&["ok"]));
    }

    #[test]
    fn patch_keeps_absent_fields_and_rederives_variables() {
        let existing: Prompt = NewPrompt {
            prompt_name: "greet".into(),
            prompt_description: "d".into(),
            prompt_text: "Hi {{name}}".into(),
            color: "#fff".into(),
        }
        .into();
        assert_eq!(existing.variables.len(), 1);

        let renamed = PromptPatch {
            prompt_name: Some("hello".into()),
            ..Default::default()
        }
        .apply(existing.clone());
        assert_eq!(renamed.prompt_text, "Hi {{name}}");
        assert_eq!(renamed.variables, existing.variables);

        let retext = PromptPatch {
            prompt_text: Some("{{a}} {{b}}".into()),
            ..Default::default()
        }
        .apply(existing);
        assert_eq!(retext.prompt_name, "greet");
        let names: Vec<_> = retext.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
