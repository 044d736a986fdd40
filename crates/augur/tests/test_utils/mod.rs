//! Test utilities for service tests.

pub mod mock_driver;

#[allow(unused_imports)]
pub use mock_driver::{MockDriver, MockResponse};

use augur::{AugurConfig, IntelligenceService};
use std::sync::Arc;

/// Service over a shared mock with the given configuration.
#[allow(dead_code)]
pub fn service_with(driver: &Arc<MockDriver>, config: AugurConfig) -> IntelligenceService {
    IntelligenceService::builder()
        .shared_driver(driver.clone())
        .config(config)
        .build()
        .expect("valid test configuration")
}

/// Service over a shared mock with default configuration.
#[allow(dead_code)]
pub fn service(driver: &Arc<MockDriver>) -> IntelligenceService {
    service_with(driver, AugurConfig::default())
}
