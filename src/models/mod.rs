pub mod incident;
pub mod iteration;
pub mod merge_request;
pub mod metric;
pub mod work_item;

pub use incident::*;
pub use iteration::*;
pub use merge_request::*;
pub use metric::*;
pub use work_item::*;

use serde::{Deserialize, Deserializer};

/// Accept identifiers materialized either as JSON strings or as integers.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}
