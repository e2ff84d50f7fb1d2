//! Public operation set over the dispatcher.
//!
//! # Design
//! Every operation builds its requests with `ContentApi`, submits them to the
//! shared `CallQueue` and composes the outcomes. Fan-out means submitting a
//! batch of calls before awaiting any of them; the dispatcher still runs them
//! one at a time in submission order. Fan-in is fail-fast: the first rejected
//! call fails the operation and the remaining outcomes are discarded.

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::api::ContentApi;
use crate::config::ClientConfig;
use crate::dispatcher::spawn_dispatcher;
use crate::error::ApiError;
use crate::queue::CallQueue;
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    BulkCreateItems, Item, ItemUpdate, MultiLocaleItem, NewItem, PublishResponse,
};

#[derive(Debug, Clone)]
pub struct ContentClient {
    api: ContentApi,
    queue: CallQueue,
    page_size: u64,
}

impl ContentClient {
    /// Validate `config` and start a dispatcher over `transport`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<T: Transport>(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        let queue = spawn_dispatcher(transport, &config);
        Ok(Self {
            api: ContentApi::new(&config.base_url),
            queue,
            page_size: config.page_size,
        })
    }

    /// Client over real HTTP.
    pub fn connect(config: ClientConfig) -> Result<Self, ApiError> {
        Self::new(config, UreqTransport::new())
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::connect(ClientConfig::from_env()?)
    }

    pub fn api(&self) -> &ContentApi {
        &self.api
    }

    /// The underlying queue, for raw calls that share the same pacing.
    pub fn queue(&self) -> &CallQueue {
        &self.queue
    }

    /// Every item of a collection, in offset order.
    pub async fn list_items(&self, collection_id: &str) -> Result<Vec<Item>, ApiError> {
        self.list_items_in_locale(collection_id, None).await
    }

    /// Every item of a collection, optionally restricted to one locale.
    ///
    /// The first page reports the total and the page size the server
    /// actually applied; the remaining pages are then submitted together at
    /// that stride and merged after the first page's items.
    pub async fn list_items_in_locale(
        &self,
        collection_id: &str,
        locale: Option<&str>,
    ) -> Result<Vec<Item>, ApiError> {
        let request = self
            .api
            .build_list_items(collection_id, 0, self.page_size, locale);
        let first = self.api.parse_item_page(self.queue.submit(request).await?)?;

        // The server may cap the requested limit.
        let limit = match first.pagination.limit {
            0 => self.page_size,
            applied => applied,
        };
        let total = first.pagination.total;
        let pages = total.div_ceil(limit);
        let handles: Vec<_> = (1..pages)
            .map(|page| {
                let request = self
                    .api
                    .build_list_items(collection_id, page * limit, limit, locale);
                self.queue.submit(request)
            })
            .collect();
        debug!(collection_id, total, limit, extra_pages = handles.len(), "listing items");

        let mut items = first.items;
        for payload in try_join_all(handles).await? {
            items.extend(self.api.parse_item_page(payload)?.items);
        }
        Ok(items)
    }

    /// Fetch one item. `Ok(None)` when the item does not exist.
    pub async fn get_item(
        &self,
        collection_id: &str,
        item_id: &str,
        locale: Option<&str>,
    ) -> Result<Option<Item>, ApiError> {
        let request = self.api.build_get_item(collection_id, item_id, locale);
        let payload = self.queue.submit(request).await?;
        self.api.parse_optional_item(payload)
    }

    pub async fn create_item(
        &self,
        collection_id: &str,
        input: &NewItem,
        live: bool,
    ) -> Result<Item, ApiError> {
        let request = self.api.build_create_item(collection_id, input, live)?;
        let payload = self.queue.submit(request).await?;
        self.api.parse_item(payload)
    }

    pub async fn update_item(
        &self,
        collection_id: &str,
        item_id: &str,
        input: &ItemUpdate,
        live: bool,
    ) -> Result<Item, ApiError> {
        let request = self
            .api
            .build_update_item(collection_id, item_id, input, live)?;
        let payload = self.queue.submit(request).await?;
        self.api.parse_item(payload)
    }

    pub async fn publish_items(
        &self,
        collection_id: &str,
        item_ids: &[String],
    ) -> Result<PublishResponse, ApiError> {
        let request = self.api.build_publish_items(collection_id, item_ids)?;
        let payload = self.queue.submit(request).await?;
        self.api.parse_publish(payload)
    }

    /// Create one item in every locale of `input`.
    ///
    /// A bulk create seeded with the primary locale's fields produces the
    /// anchor item; each other locale is then written with a non-live update
    /// against the anchor's id. The result is the anchor followed by one item
    /// per secondary locale, in request order.
    ///
    /// With `live`, a publish of the anchor is submitted after everything else
    /// has settled. Its outcome is only logged and never fails this call.
    pub async fn create_item_all_locales(
        &self,
        collection_id: &str,
        input: &MultiLocaleItem,
        live: bool,
    ) -> Result<Vec<Item>, ApiError> {
        check_locales(input)?;
        let primary = input.primary().ok_or_else(|| {
            ApiError::Precondition(format!(
                "primary locale {} is not among the requested locales",
                input.primary_locale
            ))
        })?;

        let bulk = BulkCreateItems {
            cms_locale_ids: input.variants.iter().map(|v| v.locale.clone()).collect(),
            is_archived: input.is_archived,
            is_draft: input.is_draft,
            field_data: primary.field_data.clone(),
        };
        let request = self.api.build_bulk_create(collection_id, &bulk)?;
        let created = self
            .api
            .parse_bulk_create(self.queue.submit(request).await?)?;

        let anchor = created
            .items
            .into_iter()
            .find(|item| item.cms_locale_id.as_deref() == Some(input.primary_locale.as_str()))
            .ok_or_else(|| {
                ApiError::DeserializationError(format!(
                    "bulk create response has no item for primary locale {}",
                    input.primary_locale
                ))
            })?;
        debug!(collection_id, item_id = %anchor.id, locales = input.variants.len(), "created anchor item");

        let requests = input
            .secondary()
            .map(|variant| {
                let update = ItemUpdate {
                    cms_locale_id: Some(variant.locale.clone()),
                    field_data: variant.field_data.clone(),
                    ..ItemUpdate::default()
                };
                self.api
                    .build_update_item(collection_id, &anchor.id, &update, false)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| self.queue.submit(request))
            .collect();

        let mut items = Vec::with_capacity(handles.len() + 1);
        let anchor_id = anchor.id.clone();
        items.push(anchor);
        for payload in try_join_all(handles).await? {
            items.push(self.api.parse_item(payload)?);
        }

        if live {
            self.publish_detached(collection_id, anchor_id);
        }
        Ok(items)
    }

    /// Remove an item from each of `locales`, one call per locale.
    ///
    /// `live == false` unpublishes the locale, `live == true` deletes it from
    /// the working copy. That mapping is the upstream contract.
    pub async fn delete_item<S: AsRef<str>>(
        &self,
        collection_id: &str,
        item_id: &str,
        locales: &[S],
        live: bool,
    ) -> Result<(), ApiError> {
        if locales.is_empty() {
            return Err(ApiError::Precondition(
                "delete needs at least one locale".to_string(),
            ));
        }
        let requests = locales
            .iter()
            .map(|locale| {
                self.api
                    .build_delete_item(collection_id, item_id, locale.as_ref(), live)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| self.queue.submit(request))
            .collect();

        for payload in try_join_all(handles).await? {
            self.api.parse_delete(payload)?;
        }
        debug!(collection_id, item_id, locales = locales.len(), live, "deleted item");
        Ok(())
    }

    fn publish_detached(&self, collection_id: &str, item_id: String) {
        let request = match self
            .api
            .build_publish_items(collection_id, std::slice::from_ref(&item_id))
        {
            Ok(request) => request,
            Err(err) => {
                warn!(collection_id, item_id = %item_id, error = %err, "could not build publish request");
                return;
            }
        };
        let handle = self.queue.submit(request);
        let collection_id = collection_id.to_string();
        tokio::spawn(async move {
            match handle.await {
                Ok(_) => info!(collection_id = %collection_id, item_id = %item_id, "published item"),
                Err(err) => warn!(
                    collection_id = %collection_id,
                    item_id = %item_id,
                    error = %err,
                    "publish after create failed"
                ),
            }
        });
    }
}

fn check_locales(input: &MultiLocaleItem) -> Result<(), ApiError> {
    if input.variants.is_empty() {
        return Err(ApiError::Precondition("no locales requested".to_string()));
    }
    for (i, variant) in input.variants.iter().enumerate() {
        if input.variants[..i].iter().any(|v| v.locale == variant.locale) {
            return Err(ApiError::Precondition(format!(
                "locale {} is requested twice",
                variant.locale
            )));
        }
    }
    Ok(())
}
