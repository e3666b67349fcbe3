//! Integration tests: the estimator, session, registry clients and HTTP
//! API exercised end to end against scripted or mocked registries.

mod mock_registry;
mod registry_http;
mod search;
