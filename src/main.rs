use astro_exporter::config::{Config, RawConfig, DEFAULT_ADDRESS, DEFAULT_PORT};
use astro_exporter::server::{self, AppState};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Astro Exporter: sun and moon metrics for Prometheus
///
/// Serves sun and moon position, seconds until the next rise, set and
/// twilight events, and lunar illumination for one location on /metrics.
///
/// Examples:
///   astro_exporter --latitude 51.5 --longitude -0.12
///   astro_exporter --latitude=-33.87 --longitude 151.21 -p 9418 --tz Australia/Sydney
///   astro_exporter --latitude 59.33 --longitude 18.07 --once
#[derive(Parser)]
#[command(name = "astro_exporter", version, about, long_about = None)]
struct Cli {
    /// Latitude to calculate sun and moon data for (-90 to 90).
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Longitude to calculate sun and moon data for (-180 to 180).
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Port to listen on.
    #[arg(long, short = 'p', default_value_t = DEFAULT_PORT)]
    listen_port: u16,

    /// Address to bind.
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    listen_address: String,

    /// IANA timezone deciding when "tomorrow" starts (e.g. Europe/Oslo).
    /// Defaults to the system timezone.
    #[arg(long)]
    tz: Option<String>,

    /// Print one snapshot as JSON and exit instead of serving.
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn raw_config(&self) -> RawConfig {
        RawConfig {
            latitude: self.latitude,
            longitude: self.longitude,
            listen_address: Some(self.listen_address.clone()),
            listen_port: Some(self.listen_port),
            timezone: self.tz.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_raw(&cli.raw_config()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let state = AppState::new(&config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    // ── One-shot mode ───────────────────────────────────────────

    if cli.once {
        let snapshot = state.builder.build(Utc::now());
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // ── Serve ───────────────────────────────────────────────────

    info!(
        coordinate = %config.coordinate,
        timezone = %config.zone,
        listen = %config.listen,
        "starting astro exporter"
    );

    if let Err(e) = server::start(config.listen, state).await {
        eprintln!("Error: Cannot serve on {}: {}", config.listen, e);
        std::process::exit(1);
    }
}
