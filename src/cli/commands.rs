use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use colored::*;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::{theme::ColorfulTheme, Input};
use etl_fetch::api::{ExchangeRateFetcher, ObservationFetcher};
use etl_fetch::config::Config;
use etl_fetch::credentials::{resolve_token, NOAA_SOURCE};
use etl_fetch::error::{AppError, Result};
use etl_fetch::models::{
    ApiToken, ExchangeRateQuery, ObservationQuery, ObservationRecord, RateDate,
    DEFAULT_BASE_CURRENCY,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

/// Rows printed before output is truncated.
const PREVIEW_ROWS: usize = 20;

/// CLI tool for pulling NOAA station observations and currency exchange rates
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Runs the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect every observation of one station over a date range
    Observations(ObservationArgs),

    /// Fetch exchange rates for one or more dates
    Rates(RateArgs),

    /// List the currency codes known to the exchange-rate API
    Currencies {
        /// Print the raw JSON catalog
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ObservationArgs {
    /// Station identifier, e.g. GHCND:USW00094728
    #[arg(short, long)]
    pub station: String,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start: NaiveDate,

    /// Last day of the range (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end: NaiveDate,

    /// Dataset id (defaults to NOAA_DATASET, then GHCND)
    #[arg(long)]
    pub dataset: Option<String>,

    /// Records per request, 1 to 1000 (defaults to NOAA_PAGE_SIZE)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Print every record as JSON instead of a preview table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RateArgs {
    /// Date as YYYY-MM-DD or `latest`; repeat for several dates
    #[arg(short, long = "date", value_parser = parse_rate_date, default_value = "latest")]
    pub dates: Vec<RateDate>,

    /// Base currency code
    #[arg(short, long, default_value = DEFAULT_BASE_CURRENCY)]
    pub base: String,

    /// Target currency code; all currencies when omitted
    #[arg(short, long)]
    pub target: Option<String>,

    /// Report each date's outcome instead of failing on the first error
    #[arg(long)]
    pub settled: bool,

    /// Print the raw JSON result
    #[arg(long)]
    pub json: bool,
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn parse_rate_date(s: &str) -> std::result::Result<RateDate, String> {
    s.parse::<RateDate>().map_err(|e| e.to_string())
}

/// CLI application
pub struct App {
    config: Config,
    observations: ObservationFetcher,
    rates: ExchangeRateFetcher,
}

impl App {
    /// Create a new CLI application
    pub fn new() -> Result<Self> {
        let config = Config::from_env()?;
        let client = config.http_client()?;

        Ok(Self {
            observations: ObservationFetcher::with_client(client.clone()),
            rates: ExchangeRateFetcher::with_client(client, &config.currency_api_root),
            config,
        })
    }

    /// Run a single command
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Observations(args) => self.show_observations(args).await,
            Commands::Rates(args) => self.show_rates(args).await,
            Commands::Currencies { json } => self.show_currencies(json).await,
        }
    }

    async fn show_observations(&self, args: ObservationArgs) -> Result<()> {
        // The token is only needed here, so a missing key file does not block other commands
        let token = resolve_token(
            self.config.noaa_token.as_deref(),
            &self.config.api_key_file,
            NOAA_SOURCE,
        )
        .map_err(|e| {
            error!("No NOAA token available: {}", e);
            e
        })?;

        let query = ObservationQuery::new(
            self.config.noaa_base_url.clone(),
            args.station,
            args.start,
            args.end,
            ApiToken::new(token),
        )
        .with_dataset(args.dataset.unwrap_or_else(|| self.config.noaa_dataset.clone()))
        .with_page_size(args.page_size.unwrap_or(self.config.noaa_page_size));

        let bar = spinner(format!("Collecting observations for {}", query.station_id))?;
        let result = self.observations.fetch_observations(&query).await;
        bar.finish_and_clear();
        let records = result?;

        info!("Fetched {} observations", records.len());
        if args.json {
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        println!(
            "{} {} observations for {} ({} to {})",
            "Fetched".green(),
            records.len(),
            query.station_id,
            query.start_date,
            query.end_date
        );
        if !records.is_empty() {
            println!("{}", observation_table(&records));
        }
        if records.len() > PREVIEW_ROWS {
            println!(
                "... and {} more (showing first {} only)",
                records.len() - PREVIEW_ROWS,
                PREVIEW_ROWS
            );
        }
        Ok(())
    }

    async fn show_rates(&self, args: RateArgs) -> Result<()> {
        let mut query = ExchangeRateQuery::new(args.dates, args.base)
            .with_version(self.config.currency_api_version.clone());
        if let Some(target) = args.target {
            query = query.with_target(target);
        }
        // Codes are echoed in the table, so normalize them up front
        let query = query.normalized()?;

        let bar = spinner(format!("Fetching rates for {} date(s)", query.dates.len()))?;

        if args.settled {
            let result = self.rates.fetch_rates_settled(&query).await;
            bar.finish_and_clear();
            let settled = result?;

            if args.json {
                let rendered: serde_json::Map<String, Value> = settled
                    .iter()
                    .map(|(date, outcome)| {
                        let value = match outcome {
                            Ok(payload) => payload.clone(),
                            Err(e) => serde_json::json!({ "error": e.to_string() }),
                        };
                        (date.to_string(), value)
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rendered)?);
                return Ok(());
            }

            let mut table = rate_table(&query);
            for (date, outcome) in &settled {
                let summary = match outcome {
                    Ok(payload) => summarize_payload(payload, &query),
                    Err(e) => format!("{} {}", "failed:".red(), e),
                };
                table.add_row(vec![date.to_string(), query.base.clone(), summary]);
            }
            println!("{table}");
            return Ok(());
        }

        let result = self.rates.fetch_rates(&query).await;
        bar.finish_and_clear();
        let rates = result?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&rates)?);
            return Ok(());
        }

        let mut table = rate_table(&query);
        for (date, payload) in &rates {
            table.add_row(vec![
                date.to_string(),
                query.base.clone(),
                summarize_payload(payload, &query),
            ]);
        }
        println!("{table}");
        Ok(())
    }

    async fn show_currencies(&self, json: bool) -> Result<()> {
        let bar = spinner("Fetching currency codes".to_string())?;
        let result = self.rates.fetch_currency_codes().await;
        bar.finish_and_clear();
        let codes = result?;

        if json {
            println!("{}", serde_json::to_string_pretty(&codes)?);
            return Ok(());
        }

        let catalog = codes.as_object().ok_or_else(|| {
            AppError::Cli("currency catalog is not a JSON object".to_string())
        })?;
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Code", "Name"]);
        for (code, name) in catalog {
            table.add_row(vec![code.clone(), display_value(name)]);
        }
        println!("{table}");
        println!("{} currencies", catalog.len());
        Ok(())
    }
}

fn spinner(message: String) -> Result<ProgressBar> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

fn observation_table(records: &[ObservationRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Date", "Datatype", "Value", "Attributes"]);
    for record in records.iter().take(PREVIEW_ROWS) {
        let field = |name: &str| record.get(name).map(display_value).unwrap_or_default();
        table.add_row(vec![
            field("date"),
            field("datatype"),
            field("value"),
            field("attributes"),
        ]);
    }
    table
}

fn rate_table(query: &ExchangeRateQuery) -> Table {
    let mut table = Table::new();
    let last = match &query.target {
        Some(target) => format!("Rate ({})", target),
        None => "Currencies".to_string(),
    };
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Date".to_string(), "Base".to_string(), last]);
    table
}

/// One-cell summary of a rate payload: the single rate when a target was given,
/// otherwise how many currencies the payload covers.
fn summarize_payload(payload: &Value, query: &ExchangeRateQuery) -> String {
    match &query.target {
        Some(target) => match payload.get(target) {
            Some(rate) => display_value(rate),
            None => display_value(payload),
        },
        None => match payload.get(&query.base).and_then(Value::as_object) {
            Some(rates) => format!("{} rates", rates.len()),
            None => display_value(payload),
        },
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Prompt for a station identifier
pub fn prompt_station() -> Result<String> {
    let station: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Station id")
        .default("GHCND:USW00094728".to_string())
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            if input.trim().is_empty() {
                Err("Station id must not be empty".to_string())
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(station.trim().to_string())
}

/// Prompt for one calendar date
pub fn prompt_date(prompt: &str, default: &str) -> Result<NaiveDate> {
    let raw: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default.to_string())
        .validate_with(|input: &String| parse_date(input).map(|_| ()))
        .interact_text()?;
    parse_date(&raw).map_err(AppError::Cli)
}

/// Prompt for a comma-separated list of dates (or `latest`)
pub fn prompt_rate_dates() -> Result<Vec<RateDate>> {
    let raw: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Dates (YYYY-MM-DD or latest, comma-separated)")
        .default("latest".to_string())
        .validate_with(|input: &String| split_rate_dates(input).map(|_| ()))
        .interact_text()?;
    split_rate_dates(&raw).map_err(AppError::Cli)
}

fn split_rate_dates(raw: &str) -> std::result::Result<Vec<RateDate>, String> {
    let dates = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_rate_date)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if dates.is_empty() {
        return Err("Enter at least one date".to_string());
    }
    Ok(dates)
}

/// Prompt for a currency code; an empty answer yields `None` when `optional` is set
pub fn prompt_currency(prompt: &str, default: &str, optional: bool) -> Result<Option<String>> {
    let raw: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default.to_string())
        .allow_empty(optional)
        .interact_text()?;
    let raw = raw.trim();
    Ok((!raw.is_empty()).then(|| raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(s: &str) -> RateDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_cli_parses_rates_command() {
        let cli = Cli::try_parse_from([
            "etl-fetch", "rates", "--date", "2024-01-01", "--date", "2024-01-02", "--base", "EUR",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Rates(args)) => {
                assert_eq!(args.dates, vec![day("2024-01-01"), day("2024-01-02")]);
                assert_eq!(args.base, "EUR");
                assert!(args.target.is_none());
                assert!(!args.settled);
            },
            other => panic!("Expected rates command, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_rates_defaults_to_latest() {
        let cli = Cli::try_parse_from(["etl-fetch", "rates"]).unwrap();
        match cli.command {
            Some(Commands::Rates(args)) => {
                assert_eq!(args.dates, vec![RateDate::Latest]);
                assert_eq!(args.base, DEFAULT_BASE_CURRENCY);
            },
            other => panic!("Expected rates command, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_bad_dates() {
        assert!(Cli::try_parse_from(["etl-fetch", "rates", "--date", "soon"]).is_err());
        assert!(Cli::try_parse_from([
            "etl-fetch",
            "observations",
            "--station",
            "GHCND:X",
            "--start",
            "2020-13-01",
            "--end",
            "2020-12-31",
        ])
        .is_err());
    }

    #[test]
    fn test_cli_without_subcommand_is_interactive() {
        let cli = Cli::try_parse_from(["etl-fetch"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_split_rate_dates() {
        assert_eq!(
            split_rate_dates("2024-01-01, latest").unwrap(),
            vec![day("2024-01-01"), RateDate::Latest]
        );
        assert!(split_rate_dates(" , ").is_err());
        assert!(split_rate_dates("2024-01-01,nope").is_err());
    }

    #[test]
    fn test_summarize_payload() {
        let all = ExchangeRateQuery::latest("usd");
        let payload = json!({ "date": "2024-01-01", "usd": { "eur": 0.9, "gbp": 0.8 } });
        assert_eq!(summarize_payload(&payload, &all), "2 rates");

        let one = ExchangeRateQuery::latest("usd").with_target("eur");
        let payload = json!({ "date": "2024-01-01", "eur": 0.9 });
        assert_eq!(summarize_payload(&payload, &one), "0.9");
        assert_eq!(summarize_payload(&json!(0.9), &one), "0.9");
    }
}
