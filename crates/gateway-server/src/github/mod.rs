//! GitHub App plumbing: app JWT → installation access token → scoped REST
//! client for the handful of endpoints the gateway proxies.

mod app;
mod cache;
mod client;

pub use app::{AppCredentials, GitHubApp, DEFAULT_API_URL};
pub use cache::TokenCache;
pub use client::{ContentEntry, InstallationClient, NewPull, PullRequest};
