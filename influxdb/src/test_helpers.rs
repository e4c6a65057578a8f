use crate::api::{Client, RetryConfig};
use std::collections::HashMap;
use tfplug::{Config, Dynamic, State};

/// Client pointed at a mock server that never retries
pub fn test_client(server: &mockito::Server) -> Client {
    Client::with_config(
        &server.url(),
        "test-token",
        RetryConfig {
            max_retries: 0,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
            timeout_seconds: 5,
        },
    )
    .unwrap()
}

pub fn values(pairs: &[(&str, Dynamic)]) -> HashMap<String, Dynamic> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn state(pairs: &[(&str, Dynamic)]) -> State {
    State::from_values(values(pairs))
}

pub fn config(pairs: &[(&str, Dynamic)]) -> Config {
    Config::from_values(values(pairs))
}
