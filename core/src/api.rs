//! Stateless request builders and payload parsers for the content API.
//!
//! # Design
//! `ContentApi` holds only a `base_url`. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method that
//! consumes the decoded `Payload`. The dispatcher sits between the two, so the
//! wire shapes stay deterministic and are checked by the test vectors.

use serde::de::DeserializeOwned;
use serde_json::Value;
use urlencoding::encode;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, Payload};
use crate::types::{
    BulkCreateItems, BulkCreateResponse, DeleteLocales, Item, ItemPage, ItemUpdate, NewItem,
    PublishItems, PublishResponse,
};

#[derive(Debug, Clone)]
pub struct ContentApi {
    base_url: String,
}

impl ContentApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn items_url(&self, collection_id: &str) -> String {
        format!("{}/collections/{}/items", self.base_url, encode(collection_id))
    }

    fn item_url(&self, collection_id: &str, item_id: &str) -> String {
        format!("{}/{}", self.items_url(collection_id), encode(item_id))
    }

    pub fn build_list_items(
        &self,
        collection_id: &str,
        offset: u64,
        limit: u64,
        locale: Option<&str>,
    ) -> HttpRequest {
        let mut url = format!(
            "{}?limit={limit}&offset={offset}",
            self.items_url(collection_id)
        );
        if let Some(locale) = locale {
            url.push_str(&format!("&cmsLocaleId={}", encode(locale)));
        }
        HttpRequest::get(url)
    }

    pub fn build_get_item(
        &self,
        collection_id: &str,
        item_id: &str,
        locale: Option<&str>,
    ) -> HttpRequest {
        let mut url = self.item_url(collection_id, item_id);
        if let Some(locale) = locale {
            url.push_str(&format!("?cmsLocaleId={}", encode(locale)));
        }
        HttpRequest::get(url)
    }

    pub fn build_create_item(
        &self,
        collection_id: &str,
        input: &NewItem,
        live: bool,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = self.items_url(collection_id);
        if live {
            url.push_str("/live");
        }
        HttpRequest::with_json(HttpMethod::Post, url, input)
    }

    pub fn build_update_item(
        &self,
        collection_id: &str,
        item_id: &str,
        input: &ItemUpdate,
        live: bool,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = self.item_url(collection_id, item_id);
        if live {
            url.push_str("/live");
        }
        HttpRequest::with_json(HttpMethod::Patch, url, input)
    }

    /// Bulk creation has no live variant; items are always created unpublished.
    pub fn build_bulk_create(
        &self,
        collection_id: &str,
        input: &BulkCreateItems,
    ) -> Result<HttpRequest, ApiError> {
        let url = format!("{}/bulk", self.items_url(collection_id));
        HttpRequest::with_json(HttpMethod::Post, url, input)
    }

    pub fn build_publish_items(
        &self,
        collection_id: &str,
        item_ids: &[String],
    ) -> Result<HttpRequest, ApiError> {
        let url = format!("{}/publish", self.items_url(collection_id));
        let body = PublishItems {
            item_ids: item_ids.to_vec(),
        };
        HttpRequest::with_json(HttpMethod::Post, url, &body)
    }

    /// Delete one locale of an item.
    ///
    /// `live == false` targets the unpublish path and `live == true` the plain
    /// delete path. This mirrors the upstream API and must not be swapped.
    pub fn build_delete_item(
        &self,
        collection_id: &str,
        item_id: &str,
        locale: &str,
        live: bool,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = self.item_url(collection_id, item_id);
        if !live {
            url.push_str("/live");
        }
        let body = DeleteLocales {
            cms_locale_ids: vec![locale.to_string()],
        };
        HttpRequest::with_json(HttpMethod::Delete, url, &body)
    }

    pub fn parse_item_page(&self, payload: Payload) -> Result<ItemPage, ApiError> {
        from_payload(payload)
    }

    pub fn parse_item(&self, payload: Payload) -> Result<Item, ApiError> {
        from_payload(payload)
    }

    /// Parse a single-item fetch. Upstream answers a lookup for an unknown id
    /// with an empty body rather than an error; that becomes `None`.
    pub fn parse_optional_item(&self, payload: Payload) -> Result<Option<Item>, ApiError> {
        let value = match payload {
            Payload::Text(text) if text.trim().is_empty() => return Ok(None),
            other => other.into_json()?,
        };
        if is_structurally_empty(&value) {
            return Ok(None);
        }
        from_value(value).map(Some)
    }

    pub fn parse_bulk_create(&self, payload: Payload) -> Result<BulkCreateResponse, ApiError> {
        from_payload(payload)
    }

    pub fn parse_publish(&self, payload: Payload) -> Result<PublishResponse, ApiError> {
        match payload {
            Payload::Text(text) if text.trim().is_empty() => Ok(PublishResponse::default()),
            other => from_payload(other),
        }
    }

    /// Deletes answer with an empty body or a small acknowledgement; either
    /// way only the status matters.
    pub fn parse_delete(&self, _payload: Payload) -> Result<(), ApiError> {
        Ok(())
    }
}

fn is_structurally_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty() || !map.contains_key("id"),
        _ => false,
    }
}

fn from_payload<T: DeserializeOwned>(payload: Payload) -> Result<T, ApiError> {
    from_value(payload.into_json()?)
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::DeserializationError(e.to_string()))
}
