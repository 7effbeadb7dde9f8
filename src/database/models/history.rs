use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::record::Record;
use crate::database::search::Searchable;

/// One enhancement operation. Written by the enhance path; owners can read,
/// search and delete entries but not edit them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryEntry {
    pub original_prompt: String,
    pub enhanced_prompt: String,
    #[serde(with = "fixed_width_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(original_prompt: impl Into<String>, enhanced_prompt: impl Into<String>) -> Self {
        Self {
            original_prompt: original_prompt.into(),
            enhanced_prompt: enhanced_prompt.into(),
            timestamp: Utc::now(),
        }
    }
}

impl Record for HistoryEntry {
    const COLLECTION: &'static str = "history";
}

impl Searchable for HistoryEntry {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.original_prompt.as_str(), self.enhanced_prompt.as_str()]
    }
}

/// RFC 3339 with a fixed number of fractional digits, so that the stored
/// strings order the same way as the instants they encode.
mod fixed_width_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
