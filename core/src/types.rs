//! DTOs for the content API.
//!
//! # Design
//! Field data is an opaque JSON object: the client never interprets it, it only
//! moves it between the caller and the server. Wire names are camelCase. The
//! mock server defines its own copies of these shapes; integration tests catch
//! drift between the two.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque per-item field values, keyed by field slug.
pub type FieldData = Map<String, Value>;

/// A content record as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms_locale_id: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub field_data: FieldData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_published: Option<String>,
}

/// Offset pagination block of a list response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
}

/// One page of a collection listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub pagination: Pagination,
}

/// Request payload for creating a single item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms_locale_id: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_draft: bool,
    pub field_data: FieldData,
}

/// Request payload for updating an item. Omitted flags stay unchanged on the
/// server; `field_data` is merged into the existing fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms_locale_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_draft: Option<bool>,
    #[serde(default)]
    pub field_data: FieldData,
}

/// Request payload for creating one item in several locales at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateItems {
    pub cms_locale_ids: Vec<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_draft: bool,
    pub field_data: FieldData,
}

/// Response of a bulk create: one item per requested locale, sharing an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkCreateResponse {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishItems {
    pub item_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    #[serde(default)]
    pub published_item_ids: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Body of a delete or unpublish call. Upstream accepts exactly one locale per
/// request for these paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLocales {
    pub cms_locale_ids: Vec<String>,
}

/// Field data for one locale of a multi-locale item.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleFields {
    pub locale: String,
    pub field_data: FieldData,
}

impl LocaleFields {
    pub fn new(locale: impl Into<String>, field_data: FieldData) -> Self {
        Self {
            locale: locale.into(),
            field_data,
        }
    }
}

/// Input of the multi-locale creation saga.
///
/// `variants` is ordered; the saga result follows the same order with the
/// primary locale's item first.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLocaleItem {
    pub primary_locale: String,
    pub is_archived: bool,
    pub is_draft: bool,
    pub variants: Vec<LocaleFields>,
}

impl MultiLocaleItem {
    pub fn new(primary_locale: impl Into<String>, variants: Vec<LocaleFields>) -> Self {
        Self {
            primary_locale: primary_locale.into(),
            is_archived: false,
            is_draft: false,
            variants,
        }
    }

    pub fn primary(&self) -> Option<&LocaleFields> {
        self.variants.iter().find(|v| v.locale == self.primary_locale)
    }

    /// Every variant except the primary one, in request order.
    pub fn secondary(&self) -> impl Iterator<Item = &LocaleFields> {
        self.variants
            .iter()
            .filter(move |v| v.locale != self.primary_locale)
    }
}
