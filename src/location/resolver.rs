//! Location resolver — orchestrates the provider fallback chain.
//!
//! SL4A runtime:   SL4A bridge → termux-location → IP lookup → error
//! Termux runtime: termux-location → IP lookup → error
//! Desktop:        IP lookup → error

use super::providers::{IpApiProvider, LocationProvider, Sl4aProvider, TermuxProvider};
use super::runtime::Runtime;
use super::types::{LocationError, LocationFix};
use std::time::Duration;

/// Tries each provider for the detected runtime in priority order and
/// returns the first fix. Built once at startup and injected into the
/// renamer.
pub struct LocationResolver {
    providers: Vec<Box<dyn LocationProvider>>,
}

impl LocationResolver {
    /// Build the chain for a runtime resolved by [`Runtime::detect`].
    pub fn for_runtime(runtime: Runtime) -> Self {
        let providers: Vec<Box<dyn LocationProvider>> = match runtime {
            Runtime::Sl4a => vec![
                Box::new(Sl4aProvider),
                Box::new(TermuxProvider::new()),
                Box::new(IpApiProvider),
            ],
            Runtime::Termux => vec![Box::new(TermuxProvider::new()), Box::new(IpApiProvider)],
            Runtime::Desktop => vec![Box::new(IpApiProvider)],
        };
        Self { providers }
    }

    /// Create a resolver with an explicit chain (manual override, tests).
    pub fn with_providers(providers: Vec<Box<dyn LocationProvider>>) -> Self {
        Self { providers }
    }

    /// Acquire one fix, falling through the chain on failure. Each attempt
    /// gets the full `timeout` budget; when every provider fails, the most
    /// specific error wins (a permission refusal over a plain timeout).
    pub fn acquire(&self, timeout: Duration) -> Result<LocationFix, LocationError> {
        let mut worst: Option<LocationError> = None;

        for provider in &self.providers {
            eprintln!("  Trying {}...", provider.name());
            match provider.acquire(timeout) {
                Ok(fix) => return Ok(fix),
                Err(e) => {
                    eprintln!("  {} failed: {}", provider.name(), e);
                    worst = Some(match worst {
                        Some(prev) if prev.severity() >= e.severity() => prev,
                        _ => e,
                    });
                }
            }
        }

        Err(worst.unwrap_or_else(|| LocationError::Unavailable("no providers configured".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::types::LocationSource;

    struct FixedProvider(f64, f64);

    impl LocationProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn acquire(&self, _timeout: Duration) -> Result<LocationFix, LocationError> {
            Ok(LocationFix::new(self.0, self.1, None, LocationSource::Gps))
        }
    }

    struct FailingProvider(fn() -> LocationError);

    impl LocationProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn acquire(&self, _timeout: Duration) -> Result<LocationFix, LocationError> {
            Err((self.0)())
        }
    }

    #[test]
    fn test_first_provider_wins() {
        let resolver = LocationResolver::with_providers(vec![
            Box::new(FixedProvider(1.0, 2.0)),
            Box::new(FixedProvider(3.0, 4.0)),
        ]);
        let fix = resolver.acquire(Duration::from_secs(1)).unwrap();
        assert_eq!(fix.latitude, 1.0);
    }

    #[test]
    fn test_falls_through_to_second() {
        let resolver = LocationResolver::with_providers(vec![
            Box::new(FailingProvider(|| {
                LocationError::Unavailable("timed out".into())
            })),
            Box::new(FixedProvider(3.0, 4.0)),
        ]);
        let fix = resolver.acquire(Duration::from_secs(1)).unwrap();
        assert_eq!(fix.latitude, 3.0);
    }

    #[test]
    fn test_all_fail_reports_most_specific() {
        let resolver = LocationResolver::with_providers(vec![
            Box::new(FailingProvider(|| {
                LocationError::PermissionDenied("gps refused".into())
            })),
            Box::new(FailingProvider(|| {
                LocationError::Unavailable("timed out".into())
            })),
        ]);
        let err = resolver.acquire(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LocationError::PermissionDenied(_)));
    }

    #[test]
    fn test_empty_chain_is_unavailable() {
        let resolver = LocationResolver::with_providers(vec![]);
        let err = resolver.acquire(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LocationError::Unavailable(_)));
    }

    #[test]
    fn test_desktop_chain_is_ip_only() {
        let resolver = LocationResolver::for_runtime(Runtime::Desktop);
        assert_eq!(resolver.providers.len(), 1);
        assert_eq!(resolver.providers[0].name(), "IP geolocation");
    }

    #[test]
    fn test_sl4a_chain_order() {
        let resolver = LocationResolver::for_runtime(Runtime::Sl4a);
        let names: Vec<_> = resolver.providers.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec!["SL4A location service", "termux-location", "IP geolocation"]
        );
    }
}
