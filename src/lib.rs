pub mod activities;
pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod pagination;
pub mod seo;
pub mod state;
pub mod students;

#[cfg(test)]
pub(crate) mod test_support;
