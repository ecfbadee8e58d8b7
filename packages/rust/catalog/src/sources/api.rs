//! Remote dish API loader.
//!
//! The service answers `GET {base}/api/dish/list` with an envelope
//! `{code, message, data: {list, total, page, page_size}}`; `code == 200`
//! means success.

use std::collections::HashSet;

use campus_shared::http::{ensure_success, fetch_error};
use campus_shared::{
    API_SUCCESS_CODE, CampusError, Dish, DishPage, DishQuery, Envelope, Result, split_canteens,
};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::CatalogSource;

/// Path of the list endpoint, relative to the base URL.
const LIST_PATH: &str = "api/dish/list";

/// Message used when the server reports failure without one.
const GENERIC_FAILURE: &str = "Failed to fetch dish list";

/// Loads the catalog from the remote dish API.
#[derive(Debug, Clone)]
pub struct ApiSource {
    client: Client,
    list_url: Url,
    fetch_page_size: u32,
}

impl ApiSource {
    /// Create a source for the API rooted at `base_url`.
    pub fn new(client: Client, base_url: &str, fetch_page_size: u32) -> Result<Self> {
        let base = base_url.trim_end_matches('/');
        let list_url = Url::parse(&format!("{base}/{LIST_PATH}")).map_err(|e| {
            CampusError::validation(format!("invalid dish API base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            client,
            list_url,
            fetch_page_size: fetch_page_size.max(1),
        })
    }

    /// Full URL of the list endpoint (without query parameters).
    pub fn list_url(&self) -> &Url {
        &self.list_url
    }

    /// Fetch one server-side filtered page.
    ///
    /// Only the parameters present in `query` are sent. Canteen entries are
    /// trimmed, and dishes without a native id get `dish_<offset + index>`.
    #[instrument(skip_all, fields(url = %self.list_url))]
    pub async fn fetch_page(&self, query: &DishQuery) -> Result<DishPage> {
        let mut page = self.request(query).await?;
        let offset = page.page.saturating_sub(1).saturating_mul(page.page_size);
        page.list = page
            .list
            .into_iter()
            .enumerate()
            .map(|(i, dish)| normalize_remote(dish, offset + i))
            .collect();
        Ok(page)
    }

    async fn request(&self, query: &DishQuery) -> Result<DishPage> {
        let mut url = self.list_url.clone();
        let pairs = query.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        }

        debug!(%url, "requesting dish list");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(url.as_str(), e))?;
        let response = ensure_success(url.as_str(), response)?;
        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(url.as_str(), e))?;

        let envelope: Envelope<DishPage> = serde_json::from_slice(&body)
            .map_err(|e| CampusError::parse(format!("{url}: invalid dish list body: {e}")))?;

        if envelope.code != API_SUCCESS_CODE {
            return Err(CampusError::api(
                envelope.code,
                &envelope.message,
                GENERIC_FAILURE,
            ));
        }

        envelope
            .data
            .ok_or_else(|| CampusError::parse(format!("{url}: envelope carries no data")))
    }
}

fn normalize_remote(mut dish: Dish, index: usize) -> Dish {
    dish.id = dish.id.trim().to_string();
    if dish.id.is_empty() {
        dish.id = Dish::synthetic_id(index);
    }
    dish.canteen = dish
        .canteen
        .iter()
        .flat_map(|c| split_canteens(c))
        .collect();
    dish
}

impl CatalogSource for ApiSource {
    /// Walk the remote list page by page until `total` dishes have been seen.
    ///
    /// The result keeps server page order. A later dish repeating an id
    /// already loaded is dropped.
    #[instrument(skip_all, fields(url = %self.list_url))]
    async fn load(&self) -> Result<Vec<Dish>> {
        let mut dishes = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut received = 0usize;
        let mut page = 1i64;

        loop {
            let query = DishQuery {
                page: Some(page),
                page_size: Some(i64::from(self.fetch_page_size)),
                ..Default::default()
            };
            let batch = self.request(&query).await?;
            let count = batch.list.len();

            for dish in batch.list {
                let dish = normalize_remote(dish, received);
                received += 1;
                if seen_ids.insert(dish.id.clone()) {
                    dishes.push(dish);
                } else {
                    warn!(id = %dish.id, "duplicate dish id in remote list, dropping");
                }
            }

            debug!(page, count, total = batch.total, "dish list page received");

            if count == 0 || received >= batch.total {
                break;
            }
            page += 1;
        }

        info!(dishes = dishes.len(), pages = page, "remote catalog loaded");
        Ok(dishes)
    }

    fn describe(&self) -> String {
        format!("api:{}", self.list_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        campus_shared::http::build_client(&campus_shared::HttpConfig::default()).unwrap()
    }

    fn page_body(list: serde_json::Value, total: usize, page: usize, page_size: usize) -> serde_json::Value {
        serde_json::json!({
            "code": 200,
            "message": "success",
            "data": { "list": list, "total": total, "page": page, "page_size": page_size }
        })
    }

    #[test]
    fn list_url_joins_base() {
        let source = ApiSource::new(client(), "https://api.example.com/", 50).unwrap();
        assert_eq!(source.list_url().as_str(), "https://api.example.com/api/dish/list");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ApiSource::new(client(), "not a url", 50).unwrap_err();
        assert!(matches!(err, CampusError::Validation { .. }));
    }

    #[test]
    fn normalize_fills_missing_id_and_trims_canteens() {
        let dish = Dish {
            id: String::new(),
            name: "米饭".into(),
            tag: "主食".into(),
            canteen: vec![" 公一食堂 ".into(), "".into(), "公二食堂,东区食堂".into()],
        };
        let dish = normalize_remote(dish, 7);
        assert_eq!(dish.id, "dish_7");
        assert_eq!(dish.canteen, vec!["公一食堂", "公二食堂", "东区食堂"]);
    }

    #[tokio::test]
    async fn fetch_page_sends_only_supplied_params() {
        let server = MockServer::start().await;
        let fixture = std::fs::read_to_string("../../../fixtures/json/dish_list.json")
            .expect("read dish list fixture");

        Mock::given(method("GET"))
            .and(path("/api/dish/list"))
            .and(query_param("canteen", "公二食堂"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(&fixture))
            .mount(&server)
            .await;

        let source = ApiSource::new(client(), &server.uri(), 50).unwrap();
        let query = DishQuery {
            page: Some(1),
            canteen: Some("公二食堂".into()),
            tag: Some(String::new()),
            ..Default::default()
        };
        let page = source.fetch_page(&query).await.unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.list.len(), 3);
        assert_eq!(page.list[0].name, "米饭");

        let requests = server.received_requests().await.unwrap();
        let sent = requests[0].url.query().unwrap_or_default().to_string();
        assert!(!sent.contains("tag="));
        assert!(!sent.contains("page_size="));
        assert!(!sent.contains("search="));
    }

    #[tokio::test]
    async fn api_failure_code_carries_server_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dish/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"code": 500, "message": "db down"})),
            )
            .mount(&server)
            .await;

        let source = ApiSource::new(client(), &server.uri(), 50).unwrap();
        let err = source.load().await.unwrap_err();
        match err {
            CampusError::Api { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "db down");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn api_failure_without_message_uses_generic_text() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dish/list"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 401})),
            )
            .mount(&server)
            .await;

        let source = ApiSource::new(client(), &server.uri(), 50).unwrap();
        let err = source.fetch_page(&DishQuery::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "api error (code 401): Failed to fetch dish list");
    }

    #[tokio::test]
    async fn http_error_status_is_fetch_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dish/list"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let source = ApiSource::new(client(), &server.uri(), 50).unwrap();
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, CampusError::Fetch { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn garbage_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dish/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let source = ApiSource::new(client(), &server.uri(), 50).unwrap();
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, CampusError::Parse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn success_envelope_without_data_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dish/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"code": 200, "message": "success"})),
            )
            .mount(&server)
            .await;

        let source = ApiSource::new(client(), &server.uri(), 50).unwrap();
        let err = source.fetch_page(&DishQuery::default()).await.unwrap_err();
        match err {
            CampusError::Parse { message } => assert!(message.contains("no data")),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_walks_all_pages_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dish/list"))
            .and(query_param("page", "1"))
            .and(query_param("page_size", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
                serde_json::json!([
                    {"id": "a", "name": "米饭", "tag": "主食", "canteen": ["公一食堂"]},
                    {"id": "b", "name": "包子", "tag": "早餐", "canteen": ["公一食堂", "公二食堂"]}
                ]),
                3,
                1,
                2,
            )))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/dish/list"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
                serde_json::json!([
                    {"id": "", "name": "面条", "tag": "面食", "canteen": null}
                ]),
                3,
                2,
                2,
            )))
            .mount(&server)
            .await;

        let source = ApiSource::new(client(), &server.uri(), 2).unwrap();
        let dishes = source.load().await.unwrap();

        let ids: Vec<&str> = dishes.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "dish_2"]);
        assert!(dishes[2].canteen.is_empty());
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn load_stops_on_empty_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dish/list"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page_body(serde_json::json!([]), 40, 1, 100)),
            )
            .mount(&server)
            .await;

        let source = ApiSource::new(client(), &server.uri(), 100).unwrap();
        let dishes = source.load().await.unwrap();
        assert!(dishes.is_empty());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_ids_are_dropped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dish/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
                serde_json::json!([
                    {"id": "x", "name": "米饭", "tag": "主食", "canteen": ["公一食堂"]},
                    {"id": "x", "name": "米饭", "tag": "主食", "canteen": ["公一食堂"]}
                ]),
                2,
                1,
                100,
            )))
            .mount(&server)
            .await;

        let source = ApiSource::new(client(), &server.uri(), 100).unwrap();
        let dishes = source.load().await.unwrap();
        assert_eq!(dishes.len(), 1);
    }
}
