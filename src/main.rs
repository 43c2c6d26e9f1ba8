mod cli;

use clap::Parser;
use cli::{App, Cli, Commands, ObservationArgs, RateArgs};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Select};
use etl_fetch::error::Result;
use etl_fetch::logging::{self, LogSettings};
use etl_fetch::models::DEFAULT_BASE_CURRENCY;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before logging so LOG_DIR / LOG_FORMAT can live there too
    dotenv::dotenv().ok();
    let _log_guard = logging::init(&LogSettings::from_env())?;

    let cli = Cli::parse();
    info!("Initializing etl-fetch...");

    let app = match App::new() {
        Ok(app) => {
            info!("Application initialized successfully.");
            app
        },
        Err(e) => {
            error!("Failed to initialize application: {:?}", e);
            println!(
                "{}",
                "Error: Failed to initialize application. Check logs.".red()
            );
            return Err(e);
        },
    };

    // Non-interactive: run the requested command and exit
    if let Some(command) = cli.command {
        if let Err(e) = app.run_command(command).await {
            error!("Command execution failed: {:?}", e);
            println!("{} {}", "Error:".red(), e.to_string().red());
            return Err(e);
        }
        return Ok(());
    }

    println!("{}", "Welcome to the etl-fetch CLI!".cyan().bold());

    // Main interactive loop
    loop {
        let options = &[
            "Fetch Station Observations",
            "Fetch Exchange Rates",
            "List Currency Codes",
            "Exit",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(options)
            .default(0)
            .interact_opt()?
            .unwrap_or(options.len() - 1); // Default to Exit if cancelled

        println!("\n---\n");

        let command_result = match selection {
            0 => {
                let args = match prompt_observation_args() {
                    Ok(args) => args,
                    Err(e) => {
                        println!("{} {}", "Failed to get input:".red(), e);
                        continue;
                    },
                };
                app.run_command(Commands::Observations(args)).await
            },
            1 => {
                let args = match prompt_rate_args() {
                    Ok(args) => args,
                    Err(e) => {
                        println!("{} {}", "Failed to get input:".red(), e);
                        continue;
                    },
                };
                app.run_command(Commands::Rates(args)).await
            },
            2 => app.run_command(Commands::Currencies { json: false }).await,
            3 => {
                println!("{}", "Exiting application. Goodbye!".green());
                break;
            },
            _ => unreachable!(),
        };

        if let Err(e) = command_result {
            error!("Command execution failed: {:?}", e);
            println!(
                "{} {}",
                "Error executing command:".red(),
                e.to_string().red()
            );
        }

        println!("\n---\n");
    }

    Ok(())
}

fn prompt_observation_args() -> Result<ObservationArgs> {
    Ok(ObservationArgs {
        station: cli::prompt_station()?,
        start: cli::prompt_date("Start date (YYYY-MM-DD)", "2020-01-31")?,
        end: cli::prompt_date("End date (YYYY-MM-DD)", "2020-03-31")?,
        dataset: None,
        page_size: None,
        json: false,
    })
}

fn prompt_rate_args() -> Result<RateArgs> {
    let dates = cli::prompt_rate_dates()?;
    let base = cli::prompt_currency("Base currency", DEFAULT_BASE_CURRENCY, false)?
        .unwrap_or_else(|| DEFAULT_BASE_CURRENCY.to_string());
    let target = cli::prompt_currency("Target currency (empty for all)", "", true)?;
    Ok(RateArgs {
        dates,
        base,
        target,
        // Interactive batches report every date rather than stopping at the first failure
        settled: true,
        json: false,
    })
}
