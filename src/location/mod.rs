//! Location subsystem: runtime detection, the provider backends, and the
//! fallback chain that picks between them.

pub mod providers;
pub mod resolver;
pub mod runtime;
pub mod types;

pub use providers::{LocationProvider, ManualProvider};
pub use resolver::LocationResolver;
pub use runtime::Runtime;
pub use types::{LocationError, LocationFix, LocationSource};
