//! CSV snapshot loader.
//!
//! The snapshot has a header row with localized column names. Rows with
//! missing fields are kept with empty values and reported as warnings; only
//! a document the reader cannot decode at all fails the load.

use std::path::PathBuf;

use campus_shared::http::{ensure_success, fetch_error};
use campus_shared::{CampusError, Dish, Result, split_canteens};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::CatalogSource;

/// Header names accepted for the dish name column.
const NAME_HEADERS: &[&str] = &["菜名", "菜品", "菜品名称", "名称", "name"];

/// Header names accepted for the canteen column.
const CANTEEN_HEADERS: &[&str] = &["食堂", "所在食堂", "canteen"];

/// Header names accepted for the tag column.
const TAG_HEADERS: &[&str] = &["分类", "类别", "标签", "tag"];

/// Column order of the bundled snapshot, used when no header is recognized.
const POSITIONAL_LAYOUT: ColumnMap = ColumnMap {
    name: Some(0),
    canteen: Some(1),
    tag: Some(2),
};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A non-fatal problem with one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWarning {
    /// Zero-based index of the data row (header excluded).
    pub row: usize,
    pub message: String,
}

/// Dishes parsed from a CSV document, plus the row-level warnings.
#[derive(Debug, Clone, Default)]
pub struct CsvParsed {
    pub dishes: Vec<Dish>,
    pub warnings: Vec<RowWarning>,
}

/// Column index of each canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    name: Option<usize>,
    canteen: Option<usize>,
    tag: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |aliases: &[&str]| {
            headers.iter().position(|h| {
                let h = normalize_header(h);
                aliases.iter().any(|a| a.eq_ignore_ascii_case(&h))
            })
        };

        let map = Self {
            name: find(NAME_HEADERS),
            canteen: find(CANTEEN_HEADERS),
            tag: find(TAG_HEADERS),
        };

        if map.name.is_none() && map.canteen.is_none() && map.tag.is_none() {
            debug!(?headers, "no known header names, using positional layout");
            return POSITIONAL_LAYOUT;
        }
        map
    }

    fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.canteen.is_none() {
            missing.push("canteen");
        }
        if self.tag.is_none() {
            missing.push("tag");
        }
        missing
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

fn field(record: &csv::StringRecord, column: Option<usize>) -> &str {
    column.and_then(|i| record.get(i)).unwrap_or("").trim()
}

/// Parse a CSV dish document into canonical dishes.
///
/// Ids are `dish_<n>` in row order, so parsing the same bytes twice yields
/// equal lists. Short rows become dishes with empty fields and a warning.
pub fn parse_dishes_csv(bytes: &[u8]) -> Result<CsvParsed> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| CampusError::parse(format!("failed to read CSV header row: {e}")))?
        .clone();

    if headers.is_empty() {
        debug!("CSV document has no header row");
        return Ok(CsvParsed::default());
    }

    let columns = ColumnMap::from_headers(&headers);
    let missing = columns.missing();
    if !missing.is_empty() {
        warn!(?missing, "CSV header lacks columns, those fields will be empty");
    }

    let mut parsed = CsvParsed::default();

    for result in reader.records() {
        let record = result.map_err(|e| CampusError::parse(format!("unreadable CSV: {e}")))?;

        let row = parsed.dishes.len();
        if record.len() < headers.len() {
            let message = format!(
                "expected {} fields, found {}; missing fields left empty",
                headers.len(),
                record.len()
            );
            warn!(row, %message, "malformed CSV row");
            parsed.warnings.push(RowWarning { row, message });
        } else if record.len() > headers.len() {
            let message = format!(
                "expected {} fields, found {}; extra fields ignored",
                headers.len(),
                record.len()
            );
            warn!(row, %message, "malformed CSV row");
            parsed.warnings.push(RowWarning { row, message });
        }

        parsed.dishes.push(Dish {
            id: Dish::synthetic_id(row),
            name: field(&record, columns.name).to_string(),
            tag: field(&record, columns.tag).to_string(),
            canteen: split_canteens(field(&record, columns.canteen)),
        });
    }

    Ok(parsed)
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// Where the CSV snapshot lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvLocation {
    /// Served over HTTP(S); fetched with the injected client.
    Url(Url),
    /// Read from the local filesystem.
    Path(PathBuf),
}

impl CsvLocation {
    /// Interpret `raw` as a URL when it has an http(s) scheme, otherwise as a path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            if let Ok(url) = Url::parse(raw) {
                return Self::Url(url);
            }
        }
        Self::Path(PathBuf::from(raw))
    }
}

impl std::fmt::Display for CsvLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Loads the catalog from a CSV snapshot.
#[derive(Debug, Clone)]
pub struct CsvSource {
    client: Client,
    location: CsvLocation,
}

impl CsvSource {
    pub fn new(client: Client, location: CsvLocation) -> Self {
        Self { client, location }
    }

    pub fn location(&self) -> &CsvLocation {
        &self.location
    }

    async fn read_document(&self) -> Result<Vec<u8>> {
        match &self.location {
            CsvLocation::Url(url) => {
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
                Ok(body.to_vec())
            }
            CsvLocation::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| CampusError::io(path, e)),
        }
    }
}

impl CatalogSource for CsvSource {
    #[instrument(skip_all, fields(location = %self.location))]
    async fn load(&self) -> Result<Vec<Dish>> {
        let bytes = self.read_document().await?;
        let parsed = parse_dishes_csv(&bytes)?;

        info!(
            dishes = parsed.dishes.len(),
            warnings = parsed.warnings.len(),
            "CSV catalog loaded"
        );
        Ok(parsed.dishes)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.location)
    }
}
