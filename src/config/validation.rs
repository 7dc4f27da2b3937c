//! Configuration validation.
//!
//! Serde handles syntax; this checks values. All problems are reported at
//! once rather than stopping at the first.

use thiserror::Error;

use crate::config::schema::ServiceConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("observability.service_name must not be empty")]
    EmptyServiceName,

    #[error("observability.export_queue_capacity must be greater than zero")]
    ZeroQueueCapacity,

    #[error("observability.metrics_address is not a socket address: {0}")]
    InvalidMetricsAddress(String),

    #[error("observability.baggage key must not be empty")]
    EmptyBaggageKey,
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let obs = &config.observability;

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if obs.service_name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }
    if obs.export_queue_capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }
    if obs.metrics_enabled && obs.metrics_socket_addr().is_none() {
        errors.push(ValidationError::InvalidMetricsAddress(obs.metrics_address.clone()));
    }
    if obs.baggage.keys().any(|k| k.trim().is_empty()) {
        errors.push(ValidationError::EmptyBaggageKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
