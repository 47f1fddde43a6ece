use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Datelike;
use clap::{Parser, Subcommand, ValueEnum};
use krishi_client::{
    catalog, AdvisoryQuery, ApiClient, ClientConfig, ClientError, HttpTransport, Language,
    QueuedMessage, SoilType, Transport,
};
use secure_store::preference::{self, PreferenceKey};
use secure_store::{KeyValueStore, SqliteStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "krishi")]
#[command(about = "Ask the Krishi advisory backend, with offline queueing")]
struct Args {
    /// Local SQLite database holding the token, queue and preferences
    #[arg(long, default_value = "./data/krishi.db")]
    db: PathBuf,

    /// Backend base URL. Falls back to KRISHI_API_URL env.
    #[arg(long)]
    api_url: Option<String>,

    /// Treat the network as unavailable (advice questions are queued)
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in with a phone number and keep the session token
    Login { phone: String },
    /// Forget the session token
    Logout,
    /// Ask for crop advice (stored preferences fill missing fields)
    Ask {
        query: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        soil: Option<String>,
        /// Reference to a captured crop image
        #[arg(long)]
        image: Option<String>,
    },
    /// Send feedback about an advisory
    Feedback { user_id: String, text: String },
    /// Upload a crop image for pest detection
    Upload { path: PathBuf },
    /// Show market prices
    Prices,
    /// Show live mandi rates
    Mandi {
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        commodity: Option<String>,
    },
    /// Show weather for a pincode or a coordinate
    Weather {
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        pincode: Option<String>,
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
    /// Show a daily outlook for up to a week
    Forecast {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Show farming news and advice for a weather condition
    News {
        #[arg(long)]
        location: Option<String>,
        /// Current condition, e.g. Rain or Clear
        condition: String,
    },
    /// Show typical crops for a region this season
    Crops {
        #[arg(long)]
        location: Option<String>,
        /// Month 1-12; defaults to the current month
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// Show starter questions
    Questions {
        #[arg(long)]
        language: Option<String>,
    },
    /// Inspect or manage the offline queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// Manage stored preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Check backend health and summarize local state
    Status,
}

#[derive(Debug, Subcommand)]
enum QueueAction {
    /// List pending messages
    List,
    /// Replay pending messages now
    Drain,
    /// Drop every pending message
    Clear,
    /// List messages that exhausted their retries
    DeadLetters,
    /// Move dead-lettered messages back into the queue
    Requeue,
}

#[derive(Debug, Subcommand)]
enum PrefsAction {
    Set { slot: Slot, value: String },
    Get,
    Clear {
        /// Clear one slot; all slots when omitted
        slot: Option<Slot>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Slot {
    Language,
    Location,
    Soil,
}

impl From<Slot> for PreferenceKey {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Language => PreferenceKey::Language,
            Slot::Location => PreferenceKey::Location,
            Slot::Soil => PreferenceKey::SoilType,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let config = match args.api_url.as_deref() {
        Some(url) => ClientConfig::from_env()?.with_base_url(url),
        None => ClientConfig::from_env()?,
    };
    let store = open_store(&args.db).await?;
    let client = ApiClient::builder(config.clone(), Arc::new(store.clone()))
        .online(!args.offline)
        .build()?;
    client.load_token().await;
    debug!(?client, "Client ready");

    let result = run(args.command, &client, &store, config).await;
    store.close().await;
    result
}

async fn open_store(path: &Path) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let store = SqliteStore::connect(&format!("sqlite:{}?mode=rwc", path.display())).await?;
    store.migrate().await?;
    Ok(store)
}

async fn run(
    command: Command,
    client: &ApiClient,
    store: &SqliteStore,
    config: ClientConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Login { phone } => {
            let response = client.login(&phone).await?;
            println!("Logged in as {} ({})", response.user.name, response.user.phone);
        }
        Command::Logout => {
            client.logout().await;
            println!("Logged out");
        }
        Command::Ask {
            query,
            location,
            language,
            soil,
            image,
        } => {
            let query = resolve_query(store, query, location, language, soil, image).await?;
            let location = query.location.clone();
            let language = query.language.parse::<Language>().unwrap_or_default();
            match client.ask(query).await {
                Ok(advisory) => {
                    println!("Crop:       {}", advisory.recommended_crop);
                    println!("Season:     {}", advisory.season);
                    println!("Fertilizer: {}", advisory.fertilizer);
                    println!("{}", advisory.notes);
                    print_crop_calendar(&location, current_month(), language);
                }
                Err(ClientError::Queued { id }) => {
                    println!("Offline: question queued as {}", id);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Feedback { user_id, text } => {
            println!("{}", client.feedback(&user_id, &text).await?);
        }
        Command::Upload { path } => {
            let detection = client.upload_image(path).await?;
            println!(
                "{} ({:.0}% confidence)\nRemedy: {}",
                detection.disease,
                detection.confidence * 100.0,
                detection.remedy
            );
        }
        Command::Prices => {
            for (crop, price) in client.market_prices().await? {
                println!("{:<10} {}", crop, price);
            }
        }
        Command::Mandi { state, commodity } => {
            let records = client
                .mandi_rates(state.as_deref(), commodity.as_deref())
                .await?;
            if records.is_empty() {
                println!("(no records)");
            }
            for record in records {
                println!(
                    "{:<12} {:<14} {:<20} {:>6} ({}-{}) {}",
                    record.date,
                    record.market,
                    record.commodity,
                    record.modal_price,
                    record.min_price,
                    record.max_price,
                    record.state
                );
            }
        }
        Command::Forecast { lat, lon } => {
            for day in client.weather_outlook(lat, lon).await? {
                println!(
                    "{}  {} {:.1}°C {}",
                    day.date,
                    catalog::weather_emoji(&day.weather),
                    day.temp,
                    day.weather
                );
            }
        }
        Command::News {
            location,
            condition,
        } => {
            let location = stored_location(store, location).await?;
            let news = client.farm_news(&location, &condition).await?;
            println!("News:   {}", news.news);
            println!("Advice: {}", news.advice);
        }
        Command::Crops { location, month } => {
            let location = stored_location(store, location).await?;
            let language = stored_language(store).await?;
            if !catalog::is_known_region(&location) {
                println!(
                    "No crop calendar for {} (known: {})",
                    location,
                    catalog::KNOWN_REGIONS.join(", ")
                );
            } else {
                print_crop_calendar(&location, month.unwrap_or_else(current_month), language);
            }
        }
        Command::Weather { pincode, lat, lon } => match (pincode, lat, lon) {
            (Some(pincode), _, _) => {
                let forecast = client.weather(&pincode).await?;
                println!("Today: {}°C, {}", forecast.today.temp, forecast.today.condition);
                for day in forecast.next3 {
                    println!(
                        "{}: {}°C, {}",
                        day.day.as_deref().unwrap_or("-"),
                        day.temp,
                        day.condition
                    );
                }
            }
            (None, Some(lat), Some(lon)) => {
                let summary = client.current_weather(lat, lon).await?;
                println!(
                    "{}: {}°C, {}, humidity {}%, wind {} m/s",
                    summary.location,
                    summary.temperature,
                    summary.weather,
                    summary.humidity,
                    summary.wind_speed
                );
            }
            _ => return Err("pass --pincode or both --lat and --lon".into()),
        },
        Command::Questions { language } => {
            let language = match language {
                Some(code) => code.parse()?,
                None => stored_language(store).await?,
            };
            for question in client.default_questions(language).await {
                println!("- {}", question);
            }
        }
        Command::Queue { action } => queue(action, client).await?,
        Command::Prefs { action } => prefs(action, store).await?,
        Command::Status => {
            let transport = HttpTransport::new(config.clone())?;
            let reachable = transport.check_health().await;
            let reachability = if reachable { "reachable" } else { "unreachable" };
            let logged_in = if client.token().await.is_some() { "yes" } else { "no" };
            println!("Backend:      {} ({})", config.base_url, reachability);
            println!("Logged in:    {}", logged_in);
            println!("Queued:       {}", client.queue().len().await);
            println!("Dead letters: {}", client.queue().dead_letters().await.len());
        }
    }

    Ok(())
}

async fn queue(action: QueueAction, client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        QueueAction::List => print_messages(&client.queue().get_queue().await),
        QueueAction::Drain => {
            if !client.is_online() {
                return Err("cannot drain while --offline".into());
            }
            let report = client.process_queue().await;
            info!(?report, "Drain finished");
            println!(
                "Delivered {} of {} ({} failed, {} dead-lettered)",
                report.delivered, report.attempted, report.failed, report.dead_lettered
            );
        }
        QueueAction::Clear => {
            client.queue().clear_queue().await?;
            println!("Queue cleared");
        }
        QueueAction::DeadLetters => print_messages(&client.queue().dead_letters().await),
        QueueAction::Requeue => {
            let moved = client.queue().requeue_dead_letters().await?;
            println!("Requeued {} message(s)", moved);
        }
    }
    Ok(())
}

async fn prefs(action: PrefsAction, store: &SqliteStore) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PrefsAction::Set { slot, value } => {
            let value = canonical_preference(slot, &value)?;
            preference::upsert_preference(store, slot.into(), &value).await?;
            println!("{:?} = {}", slot, value);
        }
        PrefsAction::Get => {
            let language = stored_language(store).await?;
            for slot in [Slot::Language, Slot::Location, Slot::Soil] {
                let value = preference::get_preference(store, slot.into()).await?;
                let name = format!("{:?}", slot).to_lowercase();
                match value {
                    Some(value) => {
                        println!("{:<9} {}", name, describe_preference(slot, &value, language))
                    }
                    None => println!("{:<9} -", name),
                }
            }
        }
        PrefsAction::Clear { slot: Some(slot) } => {
            preference::clear_preference(store, slot.into()).await?;
        }
        PrefsAction::Clear { slot: None } => {
            preference::clear_all(store).await?;
        }
    }
    Ok(())
}

/// Normalize a preference value, rejecting unknown languages and soils.
fn canonical_preference(slot: Slot, value: &str) -> Result<String, Box<dyn std::error::Error>> {
    let value = value.trim();
    Ok(match slot {
        Slot::Language => value.parse::<Language>()?.code().to_string(),
        Slot::Soil => value.parse::<SoilType>()?.id().to_string(),
        Slot::Location => {
            if value.is_empty() {
                return Err("location must not be empty".into());
            }
            value.to_string()
        }
    })
}

/// Stored value with its localized name, where one exists.
fn describe_preference(slot: Slot, value: &str, language: Language) -> String {
    match (slot, value.parse::<SoilType>()) {
        (Slot::Soil, Ok(soil)) => format!("{} ({})", value, soil.name(language)),
        _ => value.to_string(),
    }
}

async fn stored_location(
    store: &dyn KeyValueStore,
    location: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    match location {
        Some(location) => Ok(location),
        None => Ok(preference::get_preference(store, PreferenceKey::Location)
            .await?
            .ok_or("no location: pass --location or run `prefs set location <name>`")?),
    }
}

fn current_month() -> u32 {
    chrono::Local::now().month()
}

fn print_crop_calendar(location: &str, month: u32, language: Language) {
    for (season, crops) in catalog::crop_calendar(location, month) {
        println!("{:<10} {}", season.name(language), crops.join(", "));
    }
}

async fn stored_language(store: &dyn KeyValueStore) -> Result<Language, Box<dyn std::error::Error>> {
    match preference::get_preference(store, PreferenceKey::Language).await? {
        Some(code) => Ok(code.parse()?),
        None => Ok(Language::English),
    }
}

/// Fill missing query fields from stored preferences.
async fn resolve_query(
    store: &dyn KeyValueStore,
    query: String,
    location: Option<String>,
    language: Option<String>,
    soil: Option<String>,
    image: Option<String>,
) -> Result<AdvisoryQuery, Box<dyn std::error::Error>> {
    let location = stored_location(store, location).await?;
    let language = match language {
        Some(language) => language,
        None => stored_language(store).await?.code().to_string(),
    };
    let soil = match soil {
        Some(soil) => soil,
        None => preference::get_preference(store, PreferenceKey::SoilType)
            .await?
            .ok_or("no soil type: pass --soil or run `prefs set soil <type>`")?,
    };

    let mut query = AdvisoryQuery::new(query, location, language, soil);
    if let Some(image) = image {
        query = query.with_image(image);
    }
    Ok(query)
}

fn print_messages(messages: &[QueuedMessage]) {
    if messages.is_empty() {
        println!("(empty)");
        return;
    }
    for message in messages {
        let queued_at = chrono::DateTime::from_timestamp_millis(message.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| message.timestamp.to_string());
        println!(
            "{}  {}  [{} attempt(s)]  {} ({}, {}, {})",
            message.id,
            queued_at,
            message.attempts,
            message.payload.query,
            message.payload.location,
            message.payload.language,
            message.payload.soil_type
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secure_store::MemoryStore;

    #[test]
    fn test_parse_ask_with_flags() {
        let args = Args::try_parse_from([
            "krishi", "--offline", "ask", "Which crop?", "--soil", "clay", "--location", "punjab",
        ])
        .unwrap();
        assert!(args.offline);
        match args.command {
            Command::Ask { query, soil, location, .. } => {
                assert_eq!(query, "Which crop?");
                assert_eq!(soil.as_deref(), Some("clay"));
                assert_eq!(location.as_deref(), Some("punjab"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_weather_rejects_lat_without_lon() {
        assert!(Args::try_parse_from(["krishi", "weather", "--lat", "30.9"]).is_err());
        assert!(Args::try_parse_from(["krishi", "weather", "--lat", "-3.1", "--lon", "75.8"]).is_ok());
    }

    #[test]
    fn test_canonical_preference() {
        assert_eq!(canonical_preference(Slot::Soil, " Clay ").unwrap(), "clay");
        assert_eq!(canonical_preference(Slot::Language, "pa").unwrap(), "pa");
        assert!(canonical_preference(Slot::Language, "de").is_err());
        assert!(canonical_preference(Slot::Location, "  ").is_err());
    }

    #[tokio::test]
    async fn test_resolve_query_uses_preferences() {
        let store = MemoryStore::new();
        preference::upsert_preference(&store, PreferenceKey::Location, "delhi").await.unwrap();
        preference::upsert_preference(&store, PreferenceKey::SoilType, "sandy").await.unwrap();
        preference::upsert_preference(&store, PreferenceKey::Language, "hi").await.unwrap();

        let soil = Some("clay".to_string());
        let query = resolve_query(&store, "Which crop?".to_string(), None, None, soil, None)
            .await
            .unwrap();
        assert_eq!(query.location, "delhi");
        assert_eq!(query.language, "hi");
        assert_eq!(query.soil_type, "clay");
    }

    #[test]
    fn test_describe_preference_localizes_soil() {
        assert_eq!(
            describe_preference(Slot::Soil, "clay", Language::Hindi),
            "clay (चिकनी मिट्टी)"
        );
        assert_eq!(describe_preference(Slot::Location, "delhi", Language::Hindi), "delhi");
    }

    #[test]
    fn test_parse_new_lookups() {
        let args = Args::try_parse_from(["krishi", "crops", "--location", "punjab", "--month", "7"])
            .unwrap();
        assert!(matches!(args.command, Command::Crops { month: Some(7), .. }));
        assert!(Args::try_parse_from(["krishi", "crops", "--month", "13"]).is_err());

        let args = Args::try_parse_from(["krishi", "mandi", "--commodity", "Wheat"]).unwrap();
        assert!(matches!(args.command, Command::Mandi { state: None, .. }));

        let args =
            Args::try_parse_from(["krishi", "forecast", "--lat", "-3.5", "--lon", "75.8"]).unwrap();
        assert!(matches!(args.command, Command::Forecast { .. }));
    }

    #[tokio::test]
    async fn test_resolve_query_needs_location() {
        let store = MemoryStore::new();
        let soil = Some("clay".to_string());
        let result = resolve_query(&store, "Which crop?".to_string(), None, None, soil, None).await;
        assert!(result.is_err());
    }
}
