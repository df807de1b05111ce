//! Location providers: SL4A bridge, termux-location, and IP geolocation.

use super::types::{LocationError, LocationFix, LocationSource};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// A backend that can produce a location fix. One implementation per
/// runtime variant; the resolver picks the chain once at startup.
pub trait LocationProvider {
    fn name(&self) -> &'static str;

    /// Block for up to `timeout` waiting for a fix. Never returns a stale
    /// or partial reading: past the deadline the attempt fails.
    fn acquire(&self, timeout: Duration) -> Result<LocationFix, LocationError>;
}

// ─── SL4A bridge (Pydroid 3) ────────────────────────────────────

/// Android's location service reached through the SL4A RPC bridge: a
/// newline-delimited JSON-RPC server on `AP_HOST:AP_PORT`, authenticated
/// with the `AP_HANDSHAKE` secret.
pub struct Sl4aProvider;

const SL4A_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Per-round-trip socket timeout: long budgets cap at 10s, short budgets
/// shrink it so one stalled read cannot overshoot the deadline.
fn sl4a_read_timeout(budget: Duration) -> Duration {
    budget.clamp(Duration::from_millis(100), Duration::from_secs(10))
}

struct Sl4aClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    next_id: u64,
}

impl Sl4aClient {
    fn connect(budget: Duration) -> Result<Self, LocationError> {
        let port = std::env::var("AP_PORT")
            .map_err(|_| LocationError::Unavailable("AP_PORT not set (no SL4A bridge)".into()))?;
        let host = std::env::var("AP_HOST").unwrap_or_else(|_| "127.0.0.1".into());

        let stream = TcpStream::connect(format!("{}:{}", host, port))
            .map_err(|e| LocationError::Unavailable(format!("SL4A bridge unreachable: {}", e)))?;
        stream
            .set_read_timeout(Some(sl4a_read_timeout(budget)))
            .map_err(|e| LocationError::Network(e.to_string()))?;

        let writer = stream
            .try_clone()
            .map_err(|e| LocationError::Network(e.to_string()))?;

        let mut client = Self {
            reader: BufReader::new(stream),
            writer,
            next_id: 0,
        };

        if let Ok(secret) = std::env::var("AP_HANDSHAKE") {
            client.call("_authenticate", json!([secret]))?;
        }

        Ok(client)
    }

    /// One JSON-RPC round trip: a request line out, a response line back.
    fn call(&mut self, method: &str, params: Value) -> Result<Value, LocationError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = json!({ "id": id, "method": method, "params": params });
        writeln!(self.writer, "{}", request)
            .map_err(|e| LocationError::Network(format!("SL4A write failed: {}", e)))?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| LocationError::Network(format!("SL4A read failed: {}", e)))?;

        let response: Value = serde_json::from_str(&line)
            .map_err(|e| LocationError::InvalidResponse(format!("SL4A: {}", e)))?;

        if let Some(err) = response.get("error").filter(|e| !e.is_null()) {
            let msg = err.as_str().unwrap_or("unknown SL4A error").to_string();
            return Err(classify_remote_error(&msg));
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}

/// SecurityException and friends mean the permission dialog was refused;
/// everything else is a malformed bridge response.
fn classify_remote_error(msg: &str) -> LocationError {
    let lower = msg.to_lowercase();
    if lower.contains("permission") || lower.contains("security") {
        LocationError::PermissionDenied(msg.to_string())
    } else {
        LocationError::InvalidResponse(msg.to_string())
    }
}

#[derive(Deserialize)]
struct Sl4aCoords {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    accuracy: Option<f64>,
}

#[derive(Deserialize, Default)]
struct Sl4aReading {
    #[serde(default)]
    gps: Option<Sl4aCoords>,
    #[serde(default)]
    network: Option<Sl4aCoords>,
}

/// GPS beats the network provider when both are present.
fn fix_from_sl4a(reading: Sl4aReading) -> Option<LocationFix> {
    if let Some(c) = reading.gps {
        return Some(LocationFix::new(
            c.latitude,
            c.longitude,
            c.accuracy,
            LocationSource::Gps,
        ));
    }
    reading.network.map(|c| {
        LocationFix::new(c.latitude, c.longitude, c.accuracy, LocationSource::Network)
    })
}

impl LocationProvider for Sl4aProvider {
    fn name(&self) -> &'static str {
        "SL4A location service"
    }

    fn acquire(&self, timeout: Duration) -> Result<LocationFix, LocationError> {
        let mut client = Sl4aClient::connect(timeout)?;
        client.call("startLocating", json!([]))?;

        let outcome = poll_sl4a(&mut client, timeout);

        // Leaving the radio on drains the battery; stop even on failure.
        let _ = client.call("stopLocating", json!([]));
        outcome
    }
}

fn poll_sl4a(client: &mut Sl4aClient, timeout: Duration) -> Result<LocationFix, LocationError> {
    let deadline = Instant::now() + timeout;
    loop {
        let raw = client.call("readLocation", json!([]))?;
        let reading: Sl4aReading = serde_json::from_value(raw).unwrap_or_default();
        if let Some(fix) = fix_from_sl4a(reading) {
            return Ok(fix);
        }
        if Instant::now() + SL4A_POLL_INTERVAL > deadline {
            return Err(LocationError::Unavailable(format!(
                "no GPS or network fix within {}s",
                timeout.as_secs()
            )));
        }
        std::thread::sleep(SL4A_POLL_INTERVAL);
    }
}

// ─── termux-location ────────────────────────────────────────────

/// The Termux:API location command, invoked as an external helper.
pub struct TermuxProvider {
    binary: PathBuf,
}

impl TermuxProvider {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("termux-location"),
        }
    }

    /// Point at a different helper binary (tests).
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for TermuxProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Budget for the cheap `-r last` probe before a fresh request.
const TERMUX_LAST_BUDGET: Duration = Duration::from_secs(3);

#[derive(Deserialize, Default)]
struct TermuxPayload {
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn parse_termux_payload(raw: &str) -> Result<LocationFix, LocationError> {
    let payload: TermuxPayload = serde_json::from_str(raw)
        .map_err(|e| LocationError::InvalidResponse(format!("termux-location: {}", e)))?;

    if let Some(err) = payload.error {
        return Err(classify_remote_error(&err));
    }

    match (payload.latitude, payload.longitude) {
        (Some(lat), Some(lng)) => {
            let source = match payload.provider.as_deref() {
                Some("gps") => LocationSource::Gps,
                _ => LocationSource::Network,
            };
            Ok(LocationFix::new(lat, lng, payload.accuracy, source))
        }
        _ => Err(LocationError::InvalidResponse(
            "termux-location: missing coordinates".into(),
        )),
    }
}

impl TermuxProvider {
    fn request(&self, mode: &str, limit: Duration) -> Result<LocationFix, LocationError> {
        let stdout = run_with_deadline(
            Command::new(&self.binary).args(["-p", "gps", "-r", mode]),
            limit,
        )?;
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Err(LocationError::Unavailable(format!(
                "termux-location -r {} produced no output",
                mode
            )));
        }
        parse_termux_payload(trimmed)
    }
}

impl LocationProvider for TermuxProvider {
    fn name(&self) -> &'static str {
        "termux-location"
    }

    fn acquire(&self, timeout: Duration) -> Result<LocationFix, LocationError> {
        let started = Instant::now();

        // The last known fix is nearly free; a fresh GPS request can take
        // 10-20s when the radio has been idle.
        match self.request("last", TERMUX_LAST_BUDGET.min(timeout)) {
            Ok(fix) => return Ok(fix),
            Err(e @ LocationError::PermissionDenied(_)) => return Err(e),
            Err(_) => {}
        }

        // The fresh request only gets what the probe left over; the whole
        // attempt stays within one `timeout`.
        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(LocationError::Unavailable(format!(
                "no fix within {}s",
                timeout.as_secs()
            )));
        }
        self.request("once", remaining)
    }
}

/// Run a helper command, collecting stdout, killing it at the deadline.
/// termux-location has no timeout flag of its own, so the child is reaped
/// with `try_wait` polling. Output is a few hundred bytes at most and fits
/// the pipe buffer.
fn run_with_deadline(cmd: &mut Command, limit: Duration) -> Result<String, LocationError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| LocationError::Unavailable(format!("failed to launch helper: {}", e)))?;

    let deadline = Instant::now() + limit;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let mut stdout = String::new();
                if let Some(mut pipe) = child.stdout.take() {
                    pipe.read_to_string(&mut stdout)
                        .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;
                }
                if !status.success() && stdout.trim().is_empty() {
                    return Err(LocationError::Unavailable(format!(
                        "helper exited with {}",
                        status
                    )));
                }
                return Ok(stdout);
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(LocationError::Unavailable(format!(
                        "helper did not finish within {}s",
                        limit.as_secs()
                    )));
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(e) => return Err(LocationError::Unavailable(e.to_string())),
        }
    }
}

// ─── IP-based geolocation ───────────────────────────────────────

/// City-level lookup of the public IP. No permission needed; this is what
/// the desktop test variant runs on.
pub struct IpApiProvider;

#[derive(Deserialize)]
struct IpApiPayload {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

fn fix_from_ip_api(payload: IpApiPayload) -> Result<(LocationFix, String), LocationError> {
    if payload.status != "success" {
        return Err(LocationError::Unavailable(format!(
            "IP lookup failed: {}",
            payload.message.unwrap_or_else(|| "unknown reason".into())
        )));
    }
    let lat = payload
        .lat
        .ok_or_else(|| LocationError::InvalidResponse("ip-api: no latitude".into()))?;
    let lon = payload
        .lon
        .ok_or_else(|| LocationError::InvalidResponse("ip-api: no longitude".into()))?;

    let place = match (payload.city, payload.country) {
        (Some(city), Some(country)) => format!("{}, {}", city, country),
        (Some(city), None) => city,
        (None, Some(country)) => country,
        (None, None) => "unknown place".into(),
    };

    Ok((LocationFix::new(lat, lon, None, LocationSource::Ip), place))
}

impl LocationProvider for IpApiProvider {
    fn name(&self) -> &'static str {
        "IP geolocation"
    }

    fn acquire(&self, timeout: Duration) -> Result<LocationFix, LocationError> {
        let response = ureq::get("http://ip-api.com/json/")
            .set("User-Agent", "geotag/0.3")
            .timeout(timeout)
            .call()
            .map_err(|e| LocationError::Network(e.to_string()))?;

        let payload: IpApiPayload = response
            .into_json()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

        let (fix, place) = fix_from_ip_api(payload)?;
        eprintln!("  IP location found: {}", place);
        Ok(fix)
    }
}

// ─── Manual override ────────────────────────────────────────────

/// Coordinates passed on the command line; acquisition is a no-op.
pub struct ManualProvider {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationProvider for ManualProvider {
    fn name(&self) -> &'static str {
        "manual coordinates"
    }

    fn acquire(&self, _timeout: Duration) -> Result<LocationFix, LocationError> {
        Ok(LocationFix::new(
            self.latitude,
            self.longitude,
            None,
            LocationSource::Manual,
        ))
    }
}
