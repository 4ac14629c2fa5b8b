//! Resilience around the live embedding backend: bounded retries and a circuit breaker.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::{execute_with_retry_async, RetryConfig, RetryResult};
