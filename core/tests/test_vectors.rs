//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, the expected request, a simulated
//! response and either the expected parse result or the expected upstream
//! error. Bodies are compared as parsed JSON so field order does not matter.

use cms_client::{
    decode_response, ApiError, BulkCreateItems, BulkCreateResponse, ContentApi, HttpMethod,
    HttpRequest, HttpResponse, Item, ItemPage, ItemUpdate, NewItem, Payload, PublishResponse,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:3000/v2";

fn api() -> ContentApi {
    ContentApi::new(BASE_URL)
}

fn load(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn str_of<'a>(case: &'a Value, key: &str) -> &'a str {
    case["input"][key].as_str().unwrap()
}

/// Compare a built request with the `expected_request` block of a case.
fn check_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    match expected.get("body") {
        Some(body) => {
            let req_body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&req_body, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: unexpected body"),
    }
}

/// Run the `simulated_response` block through the same status/body decoding
/// the dispatcher applies.
fn simulate(case: &Value) -> Result<Payload, ApiError> {
    let sim = &case["simulated_response"];
    let mut headers = Vec::new();
    if let Some(content_type) = sim["content_type"].as_str() {
        headers.push(("content-type".to_string(), content_type.to_string()));
    }
    decode_response(HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers,
        body: sim["body"].as_str().unwrap().to_string(),
    })
}

/// For cases with an `expected_error` block, assert the upstream rejection.
/// Returns `true` when the case was an error case.
fn check_error(name: &str, case: &Value, outcome: &Result<Payload, ApiError>) -> bool {
    let Some(expected) = case.get("expected_error") else {
        return false;
    };
    match outcome {
        Err(ApiError::Upstream { status, body }) => {
            assert_eq!(u64::from(*status), expected["status"].as_u64().unwrap(), "{name}: status");
            assert_eq!(body, &Payload::Json(expected["body"].clone()), "{name}: error body");
        }
        other => panic!("{name}: expected upstream error, got {other:?}"),
    }
    true
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[test]
fn list_test_vectors() {
    let c = api();
    for case in load(include_str!("../../test-vectors/list.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let req = c.build_list_items(
            str_of(&case, "collection_id"),
            input["offset"].as_u64().unwrap(),
            input["limit"].as_u64().unwrap(),
            input["locale"].as_str(),
        );
        check_request(name, &req, &case["expected_request"]);

        let outcome = simulate(&case);
        if check_error(name, &case, &outcome) {
            continue;
        }
        let page = c.parse_item_page(outcome.unwrap()).unwrap();
        let expected: ItemPage = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(page, expected, "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

#[test]
fn get_test_vectors() {
    let c = api();
    for case in load(include_str!("../../test-vectors/get.json")) {
        let name = case["name"].as_str().unwrap();
        let req = c.build_get_item(
            str_of(&case, "collection_id"),
            str_of(&case, "item_id"),
            case["input"]["locale"].as_str(),
        );
        check_request(name, &req, &case["expected_request"]);

        let outcome = simulate(&case);
        if check_error(name, &case, &outcome) {
            continue;
        }
        let item = c.parse_optional_item(outcome.unwrap()).unwrap();
        let expected: Option<Item> =
            serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(item, expected, "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn create_test_vectors() {
    let c = api();
    for case in load(include_str!("../../test-vectors/create.json")) {
        let name = case["name"].as_str().unwrap();
        let input: NewItem = serde_json::from_value(case["input"]["item"].clone()).unwrap();
        let live = case["input"]["live"].as_bool().unwrap();

        let req = c
            .build_create_item(str_of(&case, "collection_id"), &input, live)
            .unwrap();
        check_request(name, &req, &case["expected_request"]);

        let item = c.parse_item(simulate(&case).unwrap()).unwrap();
        let expected: Item = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(item, expected, "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[test]
fn update_test_vectors() {
    let c = api();
    for case in load(include_str!("../../test-vectors/update.json")) {
        let name = case["name"].as_str().unwrap();
        let input: ItemUpdate = serde_json::from_value(case["input"]["update"].clone()).unwrap();
        let live = case["input"]["live"].as_bool().unwrap();

        let req = c
            .build_update_item(
                str_of(&case, "collection_id"),
                str_of(&case, "item_id"),
                &input,
                live,
            )
            .unwrap();
        check_request(name, &req, &case["expected_request"]);

        let item = c.parse_item(simulate(&case).unwrap()).unwrap();
        let expected: Item = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(item, expected, "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// Bulk create
// ---------------------------------------------------------------------------

#[test]
fn bulk_create_test_vectors() {
    let c = api();
    for case in load(include_str!("../../test-vectors/bulk_create.json")) {
        let name = case["name"].as_str().unwrap();
        let input: BulkCreateItems =
            serde_json::from_value(case["input"]["bulk"].clone()).unwrap();

        let req = c
            .build_bulk_create(str_of(&case, "collection_id"), &input)
            .unwrap();
        check_request(name, &req, &case["expected_request"]);

        let created = c.parse_bulk_create(simulate(&case).unwrap()).unwrap();
        let expected: BulkCreateResponse =
            serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(created, expected, "{name}: parsed result");
        assert!(
            created.items.iter().all(|i| i.id == created.items[0].id),
            "{name}: locales share one id"
        );
    }
}

// ---------------------------------------------------------------------------
// Publish
// ---------------------------------------------------------------------------

#[test]
fn publish_test_vectors() {
    let c = api();
    for case in load(include_str!("../../test-vectors/publish.json")) {
        let name = case["name"].as_str().unwrap();
        let ids: Vec<String> =
            serde_json::from_value(case["input"]["item_ids"].clone()).unwrap();

        let req = c
            .build_publish_items(str_of(&case, "collection_id"), &ids)
            .unwrap();
        check_request(name, &req, &case["expected_request"]);

        let outcome = simulate(&case);
        if check_error(name, &case, &outcome) {
            continue;
        }
        let published = c.parse_publish(outcome.unwrap()).unwrap();
        let expected: PublishResponse =
            serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(published, expected, "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn delete_test_vectors() {
    let c = api();
    for case in load(include_str!("../../test-vectors/delete.json")) {
        let name = case["name"].as_str().unwrap();
        let req = c
            .build_delete_item(
                str_of(&case, "collection_id"),
                str_of(&case, "item_id"),
                str_of(&case, "locale"),
                case["input"]["live"].as_bool().unwrap(),
            )
            .unwrap();
        check_request(name, &req, &case["expected_request"]);

        let outcome = simulate(&case);
        if check_error(name, &case, &outcome) {
            continue;
        }
        c.parse_delete(outcome.unwrap()).unwrap();
    }
}
