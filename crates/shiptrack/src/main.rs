// # shiptrack - tracking lookup CLI
//
// Thin integration layer over shiptrack-core. This binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing
// 3. Registering the carrier provider factories
// 4. Resolving tracking numbers and printing normalized JSON
//
// All tracking logic lives in shiptrack-core; nothing here retries,
// parses carrier payloads, or makes degradation decisions.
//
// ## Configuration
//
// Carrier credentials are read from the environment by the registry:
//
// - `UPS_CLIENT_ID` / `UPS_CLIENT_SECRET`: UPS OAuth client credentials
// - `FEDEX_CLIENT_ID` / `FEDEX_CLIENT_SECRET`: FedEx OAuth client credentials
// - `USPS_WEB_TOOLS_USER_ID`: USPS Web Tools user id
// - `SHIPTRACK_LOG_LEVEL`: trace | debug | info | warn | error (default info)
//
// Missing credentials are not an error: the affected carrier degrades to
// canned/synthetic data.
//
// ## Example
//
// ```bash
// export FEDEX_CLIENT_ID=...
// export FEDEX_CLIENT_SECRET=...
//
// shiptrack 1Z999AA1234567890 123456789012
// shiptrack --carriers
// ```

use anyhow::Result;
use chrono::Duration;
use shiptrack_core::error::Error;
use shiptrack_core::traits::HistoryStore;
use shiptrack_core::{CarrierRegistry, MemoryHistoryStore, TrackingResolver};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Records younger than this are served from history instead of
/// re-resolving when the same number is requested again
const FRESHNESS_WINDOW_HOURS: i64 = 2;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum ShiptrackExitCode {
    /// All requested numbers resolved
    Success = 0,
    /// Invalid invocation (no tracking numbers, unknown flag)
    UsageError = 1,
    /// One or more numbers could not be resolved
    RuntimeError = 2,
}

impl From<ShiptrackExitCode> for ExitCode {
    fn from(code: ShiptrackExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Parsed command line
#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    /// Tracking numbers to resolve, in argument order
    tracking_numbers: Vec<String>,
    /// List supported carriers and exit
    list_carriers: bool,
}

impl Invocation {
    /// Parse command-line arguments (exclusive of argv[0])
    fn parse(args: &[String]) -> Result<Self> {
        let mut tracking_numbers = Vec::new();
        let mut list_carriers = false;

        for arg in args {
            match arg.as_str() {
                "--carriers" => list_carriers = true,
                flag if flag.starts_with('-') => {
                    anyhow::bail!("unknown flag: {flag}");
                }
                number => tracking_numbers.push(number.to_string()),
            }
        }

        if tracking_numbers.is_empty() && !list_carriers {
            anyhow::bail!("no tracking numbers given");
        }

        Ok(Self {
            tracking_numbers,
            list_carriers,
        })
    }
}

fn init_tracing() {
    let level = match env::var("SHIPTRACK_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("WARNING: tracing subscriber already set");
    }
}

/// Register the compiled-in provider factories
fn register_providers(registry: &CarrierRegistry) {
    #[cfg(feature = "ups")]
    shiptrack_provider_ups::register(registry);

    #[cfg(feature = "fedex")]
    shiptrack_provider_fedex::register(registry);

    #[cfg(feature = "usps")]
    shiptrack_provider_usps::register(registry);
}

fn print_usage() {
    eprintln!("Usage: shiptrack [--carriers] <tracking-number>...");
    eprintln!();
    eprintln!("  --carriers   list supported carriers and exit");
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let invocation = match Invocation::parse(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            error!("{e}");
            print_usage();
            return ShiptrackExitCode::UsageError.into();
        }
    };

    let registry = Arc::new(CarrierRegistry::new());
    register_providers(&registry);
    registry.initialize().await;

    if invocation.list_carriers {
        let carriers: Vec<&str> = registry
            .supported_carriers()
            .into_iter()
            .map(|id| id.as_str())
            .collect();
        println!("{}", carriers.join(", "));

        if invocation.tracking_numbers.is_empty() {
            return ShiptrackExitCode::Success.into();
        }
    }

    let resolver = TrackingResolver::new(registry);
    let history = MemoryHistoryStore::new();
    let freshness = Duration::hours(FRESHNESS_WINDOW_HOURS);

    let mut failures = 0usize;
    for raw in &invocation.tracking_numbers {
        let normalized = raw.trim().to_uppercase();

        // Serve a fresh history entry instead of re-resolving the same
        // number within one invocation
        match history.latest(None, &normalized).await {
            Ok(Some(entry)) if entry.is_fresh(freshness) => {
                debug!("Serving {normalized} from history");
                print_record(&entry.info);
                continue;
            }
            Ok(_) => {}
            Err(e) => warn!("History lookup failed for {normalized}: {e}"),
        }

        match resolver.track(raw).await {
            Ok(record) => {
                info!(
                    "Resolved {} via {} ({})",
                    record.tracking_number, record.carrier, record.status
                );
                if let Err(e) = history.append(None, &record).await {
                    warn!("Failed to record history for {normalized}: {e}");
                }
                print_record(&record);
            }
            Err(e @ Error::UnsupportedCarrier(_)) => {
                error!("{raw}: {e}");
                failures += 1;
            }
            Err(e) => {
                error!("Failed to resolve {raw}: {e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        ShiptrackExitCode::RuntimeError.into()
    } else {
        ShiptrackExitCode::Success.into()
    }
}

fn print_record(record: &shiptrack_core::TrackingInfo) {
    match serde_json::to_string_pretty(record) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to serialize record: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_tracking_numbers() {
        let invocation =
            Invocation::parse(&args(&["1Z999AA1234567890", "123456789012"])).unwrap();
        assert_eq!(invocation.tracking_numbers.len(), 2);
        assert!(!invocation.list_carriers);
    }

    #[test]
    fn test_parse_carriers_flag() {
        let invocation = Invocation::parse(&args(&["--carriers"])).unwrap();
        assert!(invocation.list_carriers);
        assert!(invocation.tracking_numbers.is_empty());
    }

    #[test]
    fn test_parse_rejects_empty_invocation() {
        assert!(Invocation::parse(&[]).is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_flags() {
        assert!(Invocation::parse(&args(&["--frobnicate"])).is_err());
    }
}
