//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use campus_catalog::{AnySource, CatalogSource, DishCatalog};
use campus_laundry::{DevicePage, LaundryClient, LaundryRequest};
use campus_shared::http::build_client;
use campus_shared::{
    AppConfig, DishPage, DishQuery, Facets, SourceKind, init_config, load_config,
    load_config_from, render_config, validate_config,
};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// campus — canteen dishes and laundry machines from the terminal.
#[derive(Parser, Debug)]
#[command(
    name = "campus",
    version,
    about = "Query the canteen dish catalog and laundry machine availability.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.campus/campus.toml.
    #[arg(long, global = true, env = "CAMPUS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Catalog source selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum SourceArg {
    Api,
    Csv,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Api => SourceKind::Api,
            SourceArg::Csv => SourceKind::Csv,
        }
    }
}

/// Flags that override the `[catalog]` section.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct SourceOpts {
    /// Catalog source.
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// CSV snapshot location (URL or path); implies --source csv.
    #[arg(long)]
    pub csv: Option<String>,

    /// Dish API base URL.
    #[arg(long)]
    pub api_base_url: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// List one page of dishes, optionally filtered.
    Dishes {
        /// Exact category label.
        #[arg(short, long)]
        tag: Option<String>,

        /// Canteen the dish must be served at.
        #[arg(short, long)]
        canteen: Option<String>,

        /// Case-insensitive substring of the dish name.
        #[arg(short, long)]
        search: Option<String>,

        /// Page number (1-based).
        #[arg(long)]
        page: Option<i64>,

        /// Dishes per page.
        #[arg(long)]
        page_size: Option<i64>,

        #[command(flatten)]
        source: SourceOpts,

        /// Print the page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List every tag and canteen present in the catalog.
    Facets {
        #[command(flatten)]
        source: SourceOpts,

        /// Print the facets as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show laundry machine availability.
    Laundry {
        /// Building / position identifier.
        #[arg(long)]
        position_id: Option<u64>,

        /// Floor code, e.g. 08.
        #[arg(long)]
        floor_code: Option<String>,

        /// Device category code.
        #[arg(long)]
        category_code: Option<String>,

        /// Page number (1-based).
        #[arg(long, default_value = "1")]
        page: u32,

        /// Devices per page.
        #[arg(long)]
        page_size: Option<u32>,

        /// Poll again every N seconds until interrupted.
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,

        /// Print the device page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "campus=warn,campus_catalog=warn,campus_laundry=warn",
        1 => "campus=info,campus_catalog=info,campus_laundry=info,campus_shared=info",
        2 => "campus=debug,campus_catalog=debug,campus_laundry=debug,campus_shared=debug",
        _ => "campus=trace,campus_catalog=trace,campus_laundry=trace,campus_shared=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    match cli.command {
        Command::Dishes {
            tag,
            canteen,
            search,
            page,
            page_size,
            source,
            json,
        } => {
            let query = DishQuery {
                page,
                page_size,
                tag,
                canteen,
                search,
            };
            cmd_dishes(config_path, &source, &query, json).await
        }
        Command::Facets { source, json } => cmd_facets(config_path, &source, json).await,
        Command::Laundry {
            position_id,
            floor_code,
            category_code,
            page,
            page_size,
            watch,
            json,
        } => {
            let mut config = resolve_config(config_path)?;
            if let Some(id) = position_id {
                config.laundry.position_id = id;
            }
            if let Some(floor) = floor_code {
                config.laundry.floor_code = floor;
            }
            if let Some(code) = category_code {
                config.laundry.category_code = code;
            }
            if let Some(size) = page_size {
                config.laundry.page_size = size;
            }
            cmd_laundry(&config, page, watch, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

/// Load the config file (explicit path or default location).
fn resolve_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(&path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Apply `[catalog]` overrides from the command line.
fn apply_source_opts(config: &mut AppConfig, opts: &SourceOpts) {
    if let Some(url) = &opts.api_base_url {
        config.catalog.api_base_url = url.clone();
    }
    if let Some(location) = &opts.csv {
        config.catalog.csv_location = location.clone();
        config.catalog.source = SourceKind::Csv;
    }
    if let Some(source) = opts.source {
        config.catalog.source = source.into();
    }
}

fn build_catalog(config_path: Option<PathBuf>, opts: &SourceOpts) -> Result<DishCatalog<AnySource>> {
    let mut config = resolve_config(config_path)?;
    apply_source_opts(&mut config, opts);
    validate_config(&config)?;

    let client = build_client(&config.http)?;
    let source = AnySource::from_config(client, &config.catalog)?;
    info!(source = %source.describe(), "catalog source selected");
    Ok(DishCatalog::new(source))
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_dishes(
    config_path: Option<PathBuf>,
    opts: &SourceOpts,
    query: &DishQuery,
    json: bool,
) -> Result<()> {
    let mut catalog = build_catalog(config_path, opts)?;

    let progress = spinner("Loading dish catalog");
    let page = catalog.get_page(query).await;
    progress.finish_and_clear();
    let page = page.wrap_err("failed to load the dish catalog")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print!("{}", render_page(&page));
    }
    Ok(())
}

async fn cmd_facets(config_path: Option<PathBuf>, opts: &SourceOpts, json: bool) -> Result<()> {
    let mut catalog = build_catalog(config_path, opts)?;

    let progress = spinner("Loading dish catalog");
    let facets = catalog.facets().await;
    progress.finish_and_clear();
    let facets = facets.wrap_err("failed to load the dish catalog")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&facets)?);
    } else {
        print!("{}", render_facets(&facets));
    }
    Ok(())
}

async fn cmd_laundry(config: &AppConfig, page: u32, watch: Option<u64>, json: bool) -> Result<()> {
    validate_config(config)?;
    let client = build_client(&config.http)?;
    let laundry = LaundryClient::new(client, &config.laundry.endpoint)?;

    let mut request = LaundryRequest::from(&config.laundry);
    request.page = page.max(1);

    let Some(secs) = watch else {
        let devices = laundry.fetch(&request).await?;
        print_devices(&devices, json)?;
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match laundry.fetch(&request).await {
                    Ok(devices) => print_devices(&devices, json)?,
                    Err(e) => warn!(error = %e, "laundry poll failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("stopping laundry watch");
                return Ok(());
            }
        }
    }
}

fn print_devices(devices: &DevicePage, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(devices)?);
    } else {
        let now = chrono::Local::now().naive_local();
        print!("{}", render_devices(devices, now));
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(config_path)?;
    println!("{}", render_config(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_page(page: &DishPage) -> String {
    let mut out = String::new();
    if page.list.is_empty() {
        out.push_str("  No dishes on this page.\n");
    }
    for dish in &page.list {
        let canteens = if dish.canteen.is_empty() {
            "-".to_string()
        } else {
            dish.canteen.join("、")
        };
        out.push_str(&format!(
            "  {:<10} {} [{}] @ {}\n",
            dish.id, dish.name, dish.tag, canteens
        ));
    }
    out.push_str(&format!(
        "\n  Page {} ({} per page), {} shown of {} matching\n",
        page.page,
        page.page_size,
        page.list.len(),
        page.total
    ));
    out
}

fn render_facets(facets: &Facets) -> String {
    format!(
        "  Tags:     {}\n  Canteens: {}\n",
        facets.tags.join(", "),
        facets.canteens.join(", ")
    )
}

fn render_devices(devices: &DevicePage, now: chrono::NaiveDateTime) -> String {
    let mut out = String::new();
    for device in &devices.items {
        let status = match device.remaining_minutes(now) {
            _ if device.is_idle(now) => "idle".to_string(),
            Some(minutes) => format!("busy, {minutes} min left"),
            None => "busy".to_string(),
        };
        out.push_str(&format!("  {:<16} {}\n", device.name, status));
    }
    out.push_str(&format!(
        "\n  {} of {} machines idle (total {})\n",
        devices.idle_count(now),
        devices.items.len(),
        devices.total
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_shared::Dish;

    #[test]
    fn parses_dishes_filters() {
        let cli = Cli::try_parse_from([
            "campus", "dishes", "--tag", "早餐", "--canteen", "公一食堂", "--page", "2", "--csv",
            "fixtures/csv/dishes.csv",
        ])
        .unwrap();
        match cli.command {
            Command::Dishes {
                tag, page, source, ..
            } => {
                assert_eq!(tag.as_deref(), Some("早餐"));
                assert_eq!(page, Some(2));
                assert_eq!(source.csv.as_deref(), Some("fixtures/csv/dishes.csv"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn csv_flag_switches_source() {
        let mut config = AppConfig::default();
        let opts = SourceOpts {
            csv: Some("/tmp/d.csv".into()),
            ..Default::default()
        };
        apply_source_opts(&mut config, &opts);
        assert_eq!(config.catalog.source, SourceKind::Csv);
        assert_eq!(config.catalog.csv_location, "/tmp/d.csv");
    }

    #[test]
    fn explicit_source_wins_over_csv_flag() {
        let mut config = AppConfig::default();
        let opts = SourceOpts {
            source: Some(SourceArg::Api),
            csv: Some("/tmp/d.csv".into()),
            api_base_url: Some("http://localhost:9000".into()),
        };
        apply_source_opts(&mut config, &opts);
        assert_eq!(config.catalog.source, SourceKind::Api);
        assert_eq!(config.catalog.api_base_url, "http://localhost:9000");
    }

    #[test]
    fn render_page_shows_totals() {
        let page = DishPage {
            list: vec![Dish {
                id: "dish_0".into(),
                name: "米饭".into(),
                tag: "主食".into(),
                canteen: vec!["公一食堂".into(), "公二食堂".into()],
            }],
            total: 9,
            page: 1,
            page_size: 1,
        };
        let out = render_page(&page);
        assert!(out.contains("公一食堂、公二食堂"));
        assert!(out.contains("1 shown of 9 matching"));
    }

    #[test]
    fn render_empty_page() {
        let page = DishPage {
            list: vec![],
            total: 5,
            page: 1000,
            page_size: 20,
        };
        assert!(render_page(&page).contains("No dishes on this page."));
    }

    #[test]
    fn parses_laundry_watch() {
        let cli =
            Cli::try_parse_from(["campus", "laundry", "--floor-code", "03", "--watch", "30"]).unwrap();
        match cli.command {
            Command::Laundry {
                floor_code, watch, page, ..
            } => {
                assert_eq!(floor_code.as_deref(), Some("03"));
                assert_eq!(watch, Some(30));
                assert_eq!(page, 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
