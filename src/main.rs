use std::process::ExitCode;
use std::sync::Arc;

use tracing::error;

use award_scout::{AwardScout, ScoutConfig, SearchQuery, SessionGate, UpgradeScout};

fn print_usage() {
    eprintln!(
        "usage:\n  \
         award-scout search <ORIGIN> <DEST> <DD.MM.YYYY> [--direct-only]\n  \
         award-scout upgrade <BOOKING_REF> <SURNAME>"
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = Arc::new(ScoutConfig::from_env());
    let gate = SessionGate::new(config.session_capacity);

    match args.first().map(String::as_str) {
        Some("search") => {
            let positional: Vec<&String> = args[1..]
                .iter()
                .filter(|a| !a.starts_with("--"))
                .collect();
            let direct_only = args.iter().any(|a| a == "--direct-only");
            let [origin, destination, date] = positional.as_slice() else {
                print_usage();
                return ExitCode::from(2);
            };

            let query = SearchQuery::new(
                origin.to_uppercase(),
                destination.to_uppercase(),
                date.as_str(),
                direct_only,
            );
            let scout = AwardScout::new(config, gate);
            match scout.search(&query).await {
                Ok(report) => print_json(&report),
                Err(e) => {
                    error!("{}", e);
                    ExitCode::from(2)
                }
            }
        }
        Some("upgrade") => {
            let [pnr, surname] = &args[1..] else {
                print_usage();
                return ExitCode::from(2);
            };
            let scout = UpgradeScout::new(config, gate);
            let report = scout.check(pnr, surname).await;
            print_json(&report)
        }
        _ => {
            print_usage();
            ExitCode::from(2)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("failed to serialize report: {}", e);
            ExitCode::FAILURE
        }
    }
}
