use clap::Parser;
use geotag::location::{LocationResolver, ManualProvider, Runtime};
use geotag::renamer::{Renamer, RunError};
use std::path::PathBuf;
use std::time::Duration;

/// Geotag — append the device's GPS coordinates to filenames.
///
/// Acquires one location fix (SL4A bridge, termux-location, or IP
/// geolocation depending on the runtime) and renames every untagged file
/// in the directory by inserting `_Lat_<lat>_Lng_<lng>` before the
/// extension. Already-tagged files are skipped, so re-running is safe.
///
/// Examples:
///   geotag ~/DCIM/Camera
///   geotag ~/Documents --dry-run
///   geotag /sdcard/Pictures --timeout 60
///   geotag ./photos --lat 34.1234 --lon -118.9876
#[derive(Parser)]
#[command(name = "geotag", version, about, long_about = None)]
struct Cli {
    /// Directory containing the files to tag.
    directory: String,

    /// Compute and report renames without touching the filesystem.
    #[arg(long)]
    dry_run: bool,

    /// Seconds to wait for a location fix.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Latitude override (-90 to 90); skips acquisition. Requires --lon.
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude override (-180 to 180). Requires --lat.
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Emit the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let directory = expand_tilde(&cli.directory);
    let resolver = build_resolver(&cli);
    let renamer = Renamer::new(resolver, cli.dry_run, Duration::from_secs(cli.timeout));

    if cli.lat.is_none() {
        eprintln!("  Acquiring location (up to {}s)...", cli.timeout);
    }
    let report = match renamer.run(&directory) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            let code = match e {
                RunError::Location(_) => 2,
                RunError::InvalidTarget(_) | RunError::Io(_) => 1,
            };
            std::process::exit(code);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report).unwrap());
    } else {
        print!("{}", report.render());
    }
}

fn build_resolver(cli: &Cli) -> LocationResolver {
    match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                eprintln!("Error: Invalid coordinates. Lat: -90..90, Lon: -180..180");
                std::process::exit(1);
            }
            LocationResolver::with_providers(vec![Box::new(ManualProvider {
                latitude: lat,
                longitude: lon,
            })])
        }
        (None, None) => {
            let runtime = Runtime::detect();
            eprintln!("  Runtime: {}", runtime);
            LocationResolver::for_runtime(runtime)
        }
        _ => {
            eprintln!("Error: --lat and --lon must be given together.");
            std::process::exit(1);
        }
    }
}

/// `~` and `~/...` expand to the home directory, like the shell would.
fn expand_tilde(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
