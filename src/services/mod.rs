//! Dashboard data services
//!
//! Internet status acquisition plus device discovery and the metrics
//! catalog, kept free of HTTP concerns so the handlers stay thin.

pub mod devices;
pub mod internet_status;
pub mod metrics;

use std::pin::Pin;

/// Boxed future returned by the object-safe source traits
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
