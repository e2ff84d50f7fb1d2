use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const DEFAULT_BUDGET: u64 = 60;
pub const DEFAULT_LOCALE: &str = "default";
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub cms_locale_id: String,
    pub is_archived: bool,
    pub is_draft: bool,
    pub field_data: Map<String, Value>,
    pub created_on: String,
    pub last_updated: String,
    pub last_published: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub pagination: Pagination,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItem {
    pub cms_locale_id: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_draft: bool,
    pub field_data: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreate {
    pub cms_locale_ids: Vec<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_draft: bool,
    pub field_data: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItem {
    pub cms_locale_id: Option<String>,
    pub is_archived: Option<bool>,
    pub is_draft: Option<bool>,
    #[serde(default)]
    pub field_data: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishItems {
    pub item_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLocales {
    pub cms_locale_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub cms_locale_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleQuery {
    pub cms_locale_id: Option<String>,
}

/// Items of one collection, one entry per (id, locale), in insertion order.
#[derive(Default, Debug)]
pub struct Store {
    entries: Vec<(String, Item)>,
}

impl Store {
    fn find_mut(&mut self, collection_id: &str, item_id: &str, locale: Option<&str>) -> Option<&mut Item> {
        self.entries
            .iter_mut()
            .filter(|(c, item)| c == collection_id && item.id == item_id)
            .map(|(_, item)| item)
            .find(|item| locale.map_or(true, |l| item.cms_locale_id == l))
    }

    fn find(&self, collection_id: &str, item_id: &str, locale: Option<&str>) -> Option<&Item> {
        self.entries
            .iter()
            .filter(|(c, item)| c == collection_id && item.id == item_id)
            .map(|(_, item)| item)
            .find(|item| locale.map_or(true, |l| item.cms_locale_id == l))
    }
}

/// Fixed-window call budget reported through `x-ratelimit-remaining`.
#[derive(Debug)]
pub struct Budget {
    limit: u64,
    window: Duration,
    state: Mutex<(Instant, u64)>,
}

impl Budget {
    pub fn new(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new((Instant::now(), 0)),
        }
    }

    /// Count one call and return what is left in the current window.
    fn take(&self) -> u64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.0.elapsed() >= self.window {
            *state = (Instant::now(), 0);
        }
        state.1 += 1;
        self.limit.saturating_sub(state.1)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub budget: Arc<Budget>,
}

/// Error body in the upstream shape: `{"code": ..., "message": ...}`.
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "validation_error",
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "resource_not_found",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"code": self.code, "message": self.message})),
        )
            .into_response()
    }
}

pub fn app() -> Router {
    app_with_budget(DEFAULT_BUDGET, Duration::from_secs(60))
}

pub fn app_with_budget(limit: u64, window: Duration) -> Router {
    let state = AppState {
        store: Arc::new(RwLock::new(Store::default())),
        budget: Arc::new(Budget::new(limit, window)),
    };
    Router::new()
        .route(
            "/collections/{collection_id}/items",
            get(list_items).post(create_item),
        )
        .route("/collections/{collection_id}/items/live", post(create_live_item))
        .route("/collections/{collection_id}/items/bulk", post(bulk_create_items))
        .route("/collections/{collection_id}/items/publish", post(publish_items))
        .route(
            "/collections/{collection_id}/items/{item_id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route(
            "/collections/{collection_id}/items/{item_id}/live",
            patch(update_live_item).delete(unpublish_item),
        )
        .layer(middleware::from_fn_with_state(state.clone(), report_budget))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

async fn report_budget(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let remaining = state.budget.take();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;
    debug!(%method, path = %path, status = response.status().as_u16(), remaining, "handled request");
    response
        .headers_mut()
        .insert(REMAINING_HEADER, HeaderValue::from(remaining));
    response
}

fn timestamp() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    millis.to_string()
}

fn new_item(
    id: &str,
    locale: &str,
    is_archived: bool,
    is_draft: bool,
    field_data: Map<String, Value>,
    live: bool,
) -> Item {
    let now = timestamp();
    Item {
        id: id.to_string(),
        cms_locale_id: locale.to_string(),
        is_archived,
        is_draft,
        field_data,
        created_on: now.clone(),
        last_updated: now.clone(),
        last_published: live.then_some(now),
    }
}

async fn list_items(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Json<ItemPage> {
    let limit = query.limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);
    let store = state.store.read().await;
    let matching: Vec<&Item> = store
        .entries
        .iter()
        .filter(|(c, _)| *c == collection_id)
        .map(|(_, item)| item)
        .filter(|item| {
            query
                .cms_locale_id
                .as_deref()
                .map_or(true, |l| item.cms_locale_id == l)
        })
        .collect();
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .cloned()
        .collect();
    Json(ItemPage {
        items,
        pagination: Pagination {
            limit,
            offset,
            total,
        },
    })
}

async fn insert_item(state: &AppState, collection_id: String, input: CreateItem, live: bool) -> Item {
    let id = Uuid::new_v4().simple().to_string();
    let locale = input.cms_locale_id.as_deref().unwrap_or(DEFAULT_LOCALE);
    let item = new_item(&id, locale, input.is_archived, input.is_draft, input.field_data, live);
    state
        .store
        .write()
        .await
        .entries
        .push((collection_id, item.clone()));
    item
}

async fn create_item(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Json(input): Json<CreateItem>,
) -> (StatusCode, Json<Item>) {
    let item = insert_item(&state, collection_id, input, false).await;
    (StatusCode::ACCEPTED, Json(item))
}

async fn create_live_item(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Json(input): Json<CreateItem>,
) -> (StatusCode, Json<Item>) {
    let item = insert_item(&state, collection_id, input, true).await;
    (StatusCode::ACCEPTED, Json(item))
}

async fn bulk_create_items(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Json(input): Json<BulkCreate>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if input.cms_locale_ids.is_empty() {
        return Err(ApiError::validation("cmsLocaleIds must not be empty"));
    }
    let id = Uuid::new_v4().simple().to_string();
    let items: Vec<Item> = input
        .cms_locale_ids
        .iter()
        .map(|locale| {
            new_item(
                &id,
                locale,
                input.is_archived,
                input.is_draft,
                input.field_data.clone(),
                false,
            )
        })
        .collect();
    let mut store = state.store.write().await;
    for item in &items {
        store.entries.push((collection_id.clone(), item.clone()));
    }
    Ok((StatusCode::ACCEPTED, Json(json!({ "items": items }))))
}

async fn publish_items(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Json(input): Json<PublishItems>,
) -> Result<Json<Value>, ApiError> {
    let mut store = state.store.write().await;
    for id in &input.item_ids {
        if store.find(&collection_id, id, None).is_none() {
            return Err(ApiError::validation(format!("unknown item id {id}")));
        }
    }
    let now = timestamp();
    for (c, item) in store.entries.iter_mut() {
        if *c == collection_id && input.item_ids.contains(&item.id) {
            item.last_published = Some(now.clone());
        }
    }
    Ok(Json(json!({ "publishedItemIds": input.item_ids })))
}

/// Unknown ids answer with an empty object, not a 404.
async fn get_item(
    State(state): State<AppState>,
    Path((collection_id, item_id)): Path<(String, String)>,
    Query(query): Query<LocaleQuery>,
) -> Json<Value> {
    let store = state.store.read().await;
    match store.find(&collection_id, &item_id, query.cms_locale_id.as_deref()) {
        Some(item) => Json(serde_json::to_value(item).unwrap_or_else(|_| json!({}))),
        None => Json(json!({})),
    }
}

async fn apply_update(
    state: &AppState,
    collection_id: &str,
    item_id: &str,
    input: UpdateItem,
    live: bool,
) -> Result<Json<Item>, ApiError> {
    let mut store = state.store.write().await;
    let item = store
        .find_mut(collection_id, item_id, input.cms_locale_id.as_deref())
        .ok_or_else(|| ApiError::not_found(format!("item {item_id} not found")))?;
    if let Some(is_archived) = input.is_archived {
        item.is_archived = is_archived;
    }
    if let Some(is_draft) = input.is_draft {
        item.is_draft = is_draft;
    }
    item.field_data.extend(input.field_data);
    item.last_updated = timestamp();
    if live {
        item.last_published = Some(item.last_updated.clone());
    }
    Ok(Json(item.clone()))
}

async fn update_item(
    State(state): State<AppState>,
    Path((collection_id, item_id)): Path<(String, String)>,
    Json(input): Json<UpdateItem>,
) -> Result<Json<Item>, ApiError> {
    apply_update(&state, &collection_id, &item_id, input, false).await
}

async fn update_live_item(
    State(state): State<AppState>,
    Path((collection_id, item_id)): Path<(String, String)>,
    Json(input): Json<UpdateItem>,
) -> Result<Json<Item>, ApiError> {
    apply_update(&state, &collection_id, &item_id, input, true).await
}

/// Deletes and unpublishes accept exactly one locale per request.
fn single_locale(input: &DeleteLocales) -> Result<&str, ApiError> {
    match input.cms_locale_ids.as_slice() {
        [locale] => Ok(locale.as_str()),
        [] => Err(ApiError::validation("cmsLocaleIds must name one locale")),
        _ => Err(ApiError::validation("only one locale per request is supported")),
    }
}

async fn delete_item(
    State(state): State<AppState>,
    Path((collection_id, item_id)): Path<(String, String)>,
    Json(input): Json<DeleteLocales>,
) -> Result<StatusCode, ApiError> {
    let locale = single_locale(&input)?;
    let mut store = state.store.write().await;
    let before = store.entries.len();
    store
        .entries
        .retain(|(c, item)| !(*c == collection_id && item.id == item_id && item.cms_locale_id == locale));
    if store.entries.len() == before {
        return Err(ApiError::not_found(format!("item {item_id} has no locale {locale}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn unpublish_item(
    State(state): State<AppState>,
    Path((collection_id, item_id)): Path<(String, String)>,
    Json(input): Json<DeleteLocales>,
) -> Result<StatusCode, ApiError> {
    let locale = single_locale(&input)?;
    let mut store = state.store.write().await;
    let item = store
        .find_mut(&collection_id, &item_id, Some(locale))
        .ok_or_else(|| ApiError::not_found(format!("item {item_id} has no locale {locale}")))?;
    item.last_published = None;
    Ok(StatusCode::NO_CONTENT)
}
