//! List pagination
//!
//! List responses wrap their items under a key named by `meta.key` and link
//! the next page through `meta.next_page_url`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
struct PageMeta {
    key: String,
    #[serde(default)]
    next_page_url: Option<String>,
}

/// One decoded page of a list response
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_url: Option<String>,
}

impl<T: DeserializeOwned> Page<T> {
    pub fn from_value(mut body: Value) -> Result<Self, ApiError> {
        let meta: PageMeta = body
            .get("meta")
            .cloned()
            .ok_or_else(|| ApiError::InvalidResponse("list response has no meta".to_string()))
            .and_then(|m| serde_json::from_value(m).map_err(|e| ApiError::Decode(e.to_string())))?;

        let items = match body.get_mut(&meta.key) {
            Some(list) => serde_json::from_value(list.take())
                .map_err(|e| ApiError::Decode(format!("{}: {}", meta.key, e)))?,
            None => {
                return Err(ApiError::InvalidResponse(format!(
                    "list response is missing \"{}\"",
                    meta.key
                )))
            }
        };

        Ok(Page {
            items,
            next_page_url: meta.next_page_url.filter(|url| !url.is_empty()),
        })
    }
}
