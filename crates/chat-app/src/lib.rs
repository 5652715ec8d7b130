#![deny(unsafe_code)]

/// Terminal front end.
pub mod app;
/// Chat client, markup pipeline and surface contract.
pub mod chat;
pub mod error;
/// History export documents.
pub mod export;
/// Settings loading and theme preference.
pub mod settings;
