use serde::{Deserialize, Serialize};

use crate::database::record::Record;

pub const DEFAULT_VARIABLE_COLOR: &str = "#666460";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variable {
    pub variable_name: String,
    pub variable_value: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_VARIABLE_COLOR.to_string()
}

impl Record for Variable {
    const COLLECTION: &'static str = "variables";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn color_defaults() {
        let v: Variable = serde_json::from_value(json!({"variable_name": "tone", "variable_value": "formal"})).unwrap();
        assert_eq!(v.color, DEFAULT_VARIABLE_COLOR);
    }

    #[test]
    fn rejects_system_fields_in_payload() {
        let res: Result<Variable, _> =
            serde_json::from_value(json!({"id": "x", "variable_name": "a", "variable_value": "b"}));
        assert!(res.is_err());
    }
}
