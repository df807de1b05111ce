//! Core types for the location subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backend produced a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationSource {
    Gps,
    Network,
    Ip,
    Manual,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gps => write!(f, "GPS"),
            Self::Network => write!(f, "Network"),
            Self::Ip => write!(f, "IP"),
            Self::Manual => write!(f, "Manual"),
        }
    }
}

/// A single resolved latitude/longitude reading.
///
/// Immutable once obtained; one fix is acquired per invocation and shared
/// by every file in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the backend reports one.
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub source: LocationSource,
    pub acquired_at: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy: Option<f64>,
        source: LocationSource,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            source,
            acquired_at: Utc::now(),
        }
    }

    pub fn display_line(&self) -> String {
        let acc = match self.accuracy {
            Some(m) => format!(" \u{00B1}{:.0}m", m),
            None => String::new(),
        };
        format!(
            "{:.5}, {:.5}{} ({})",
            self.latitude, self.longitude, acc, self.source
        )
    }
}

/// Location acquisition errors.
#[derive(Debug)]
pub enum LocationError {
    /// The host refused access to the location service.
    PermissionDenied(String),
    /// No fix was obtained before the timeout elapsed.
    Unavailable(String),
    Network(String),
    InvalidResponse(String),
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied(msg) => write!(f, "Location permission denied: {}", msg),
            Self::Unavailable(msg) => write!(f, "Location unavailable: {}", msg),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid provider response: {}", msg),
        }
    }
}

impl std::error::Error for LocationError {}

impl LocationError {
    /// Permission problems are more actionable than timeouts; when several
    /// providers fail, the chain reports the most specific error.
    pub fn severity(&self) -> u8 {
        match self {
            Self::PermissionDenied(_) => 3,
            Self::InvalidResponse(_) => 2,
            Self::Network(_) => 1,
            Self::Unavailable(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_line_with_accuracy() {
        let fix = LocationFix::new(59.3293, 18.0686, Some(12.0), LocationSource::Gps);
        assert_eq!(fix.display_line(), "59.32930, 18.06860 \u{00B1}12m (GPS)");
    }

    #[test]
    fn test_display_line_without_accuracy() {
        let fix = LocationFix::new(-33.8688, 151.2093, None, LocationSource::Ip);
        assert_eq!(fix.display_line(), "-33.86880, 151.20930 (IP)");
    }

    #[test]
    fn test_error_severity_ordering() {
        let denied = LocationError::PermissionDenied("gps".into());
        let timeout = LocationError::Unavailable("timed out".into());
        assert!(denied.severity() > timeout.severity());
    }
}
