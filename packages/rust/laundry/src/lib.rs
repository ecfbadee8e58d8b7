//! Laundry machine availability client.
//!
//! Posts a device-page request to the building's device service and decodes
//! the `{code, message, data: {page, pageSize, total, items}}` envelope. The
//! service signals success with `message == "success"`.

use chrono::{DateTime, Local, NaiveDateTime};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use campus_shared::http::{ensure_success, fetch_error};
use campus_shared::{CampusError, Envelope, LaundryConfig, Result};

/// Envelope message the device service uses for success.
const SUCCESS_MESSAGE: &str = "success";

/// Message used for every failed device-page request.
const GENERIC_FAILURE: &str = "Failed to fetch laundry data";

/// Timestamp layout of `finishTime`.
const FINISH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Request body for one page of devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaundryRequest {
    pub position_id: u64,
    pub category_code: String,
    pub page: u32,
    pub floor_code: String,
    pub page_size: u32,
}

impl From<&LaundryConfig> for LaundryRequest {
    fn from(config: &LaundryConfig) -> Self {
        Self {
            position_id: config.position_id,
            category_code: config.category_code.clone(),
            page: 1,
            floor_code: config.floor_code.clone(),
            page_size: config.page_size,
        }
    }
}

/// One washer or dryer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub imei: String,
    #[serde(default)]
    pub floor_code: String,
    #[serde(default)]
    pub state: i64,
    #[serde(default)]
    pub enable_reserve: bool,
    /// When the current cycle ends; `None` when the machine is not running.
    #[serde(default)]
    pub finish_time: Option<String>,
    #[serde(default)]
    pub device_id: i64,
}

impl DeviceItem {
    /// Parsed `finishTime` as local wall-clock time.
    ///
    /// The service layout carries no offset and is taken as local time; an
    /// RFC 3339 value is converted from its own offset to the local zone.
    pub fn finish_at(&self) -> Option<NaiveDateTime> {
        let raw = self.finish_time.as_deref()?.trim();
        NaiveDateTime::parse_from_str(raw, FINISH_TIME_FORMAT)
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|t| t.with_timezone(&Local).naive_local())
            })
    }

    /// Whole minutes until the cycle ends, rounded up; 0 once it has ended.
    ///
    /// `None` when there is no (parseable) finish time.
    pub fn remaining_minutes(&self, now: NaiveDateTime) -> Option<i64> {
        let seconds = (self.finish_at()? - now).num_seconds();
        Some(if seconds <= 0 { 0 } else { (seconds + 59) / 60 })
    }

    /// Free to use: no cycle running, or the running cycle has ended.
    pub fn is_idle(&self, now: NaiveDateTime) -> bool {
        match self.remaining_minutes(now) {
            Some(minutes) => minutes == 0,
            None => self.finish_time.is_none(),
        }
    }
}

/// One page of devices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub items: Vec<DeviceItem>,
}

impl DevicePage {
    pub fn idle_count(&self, now: NaiveDateTime) -> usize {
        self.items.iter().filter(|d| d.is_idle(now)).count()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Device-page client sharing an injected HTTP client.
#[derive(Debug, Clone)]
pub struct LaundryClient {
    client: Client,
    endpoint: Url,
}

impl LaundryClient {
    pub fn new(client: Client, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            CampusError::validation(format!("invalid laundry endpoint '{endpoint}': {e}"))
        })?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch one page of devices.
    #[instrument(skip_all, fields(position_id = request.position_id, floor = %request.floor_code))]
    pub async fn fetch(&self, request: &LaundryRequest) -> Result<DevicePage> {
        let url = self.endpoint.as_str();

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| fetch_error(url, e))?;
        let response = ensure_success(url, response)?;
        let body = response.bytes().await.map_err(|e| fetch_error(url, e))?;

        let envelope: Envelope<DevicePage> = serde_json::from_slice(&body)
            .map_err(|e| CampusError::parse(format!("{url}: invalid device page body: {e}")))?;

        if envelope.message != SUCCESS_MESSAGE {
            debug!(code = envelope.code, message = %envelope.message, "device service refused");
            return Err(CampusError::Api {
                code: envelope.code,
                message: GENERIC_FAILURE.to_string(),
            });
        }

        let page = envelope.data.unwrap_or_default();
        debug!(devices = page.items.len(), total = page.total, "device page received");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        campus_shared::http::build_client(&campus_shared::HttpConfig::default()).unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, FINISH_TIME_FORMAT).unwrap()
    }

    fn device(finish_time: Option<&str>) -> DeviceItem {
        DeviceItem {
            id: 1,
            name: "8F-洗衣机-1".into(),
            imei: String::new(),
            floor_code: "08".into(),
            state: 1,
            enable_reserve: false,
            finish_time: finish_time.map(String::from),
            device_id: 1,
        }
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = LaundryRequest::from(&LaundryConfig::default());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "positionId": 27958,
                "categoryCode": "00",
                "page": 1,
                "floorCode": "08",
                "pageSize": 10
            })
        );
    }

    #[test]
    fn remaining_minutes_rounds_up_and_clamps() {
        let now = at("2026-10-17 12:00:00");
        assert_eq!(device(Some("2026-10-17 12:30:00")).remaining_minutes(now), Some(30));
        assert_eq!(device(Some("2026-10-17 12:00:01")).remaining_minutes(now), Some(1));
        assert_eq!(device(Some("2026-10-17 11:00:00")).remaining_minutes(now), Some(0));
        assert_eq!(device(None).remaining_minutes(now), None);
        assert_eq!(device(Some("soon")).remaining_minutes(now), None);
    }

    #[test]
    fn rfc3339_finish_time_is_converted_to_local_time() {
        let now = DateTime::parse_from_rfc3339("2026-10-17T04:00:00Z")
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        let d = device(Some("2026-10-17T12:10:00+08:00"));
        assert_eq!(d.remaining_minutes(now), Some(10));

        let d = device(Some("2026-10-17T06:30:00+02:00"));
        assert_eq!(d.remaining_minutes(now), Some(30));
    }

    #[test]
    fn idle_detection() {
        let now = at("2026-10-17 12:00:00");
        assert!(device(None).is_idle(now));
        assert!(device(Some("2026-10-17 11:59:00")).is_idle(now));
        assert!(!device(Some("2026-10-17 12:05:00")).is_idle(now));
        assert!(!device(Some("garbled")).is_idle(now));
    }

    #[tokio::test]
    async fn fetch_posts_payload_and_decodes_page() {
        let server = MockServer::start().await;
        let fixture = std::fs::read_to_string("../../../fixtures/json/laundry.json")
            .expect("read laundry fixture");
        let request = LaundryRequest::from(&LaundryConfig::default());

        Mock::given(method("POST"))
            .and(path("/position/deviceDetailPage"))
            .and(body_json(&request))
            .respond_with(ResponseTemplate::new(200).set_body_string(&fixture))
            .mount(&server)
            .await;

        let endpoint = format!("{}/position/deviceDetailPage", server.uri());
        let laundry = LaundryClient::new(client(), &endpoint).unwrap();
        let page = laundry.fetch(&request).await.unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].imei, "860000000000001");
        assert_eq!(page.idle_count(at("2026-10-17 12:00:00")), 2);
    }

    #[tokio::test]
    async fn non_success_message_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/position/deviceDetailPage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"code": 1, "message": "token expired"})),
            )
            .mount(&server)
            .await;

        let endpoint = format!("{}/position/deviceDetailPage", server.uri());
        let laundry = LaundryClient::new(client(), &endpoint).unwrap();
        let err = laundry
            .fetch(&LaundryRequest::from(&LaundryConfig::default()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "api error (code 1): Failed to fetch laundry data");
    }

    #[tokio::test]
    async fn http_error_is_fetch_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let laundry = LaundryClient::new(client(), &server.uri()).unwrap();
        let err = laundry
            .fetch(&LaundryRequest::from(&LaundryConfig::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, CampusError::Fetch { .. }));
    }
}
