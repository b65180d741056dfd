//! Unit tests for configuration loading and precedence.
//!
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `field_resolution`: Token, PR URL, API base and user id resolution
//! - `loading`: Environment and CLI loading of numeric settings
//! - `derived`: Client settings, session and validation

mod helpers;
