//! Client for the EatWisely label-scanning service: uploads a food-label photo,
//! follows the analysis task to completion and renders the health report.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod feedback;
pub mod history;
pub mod poller;
pub mod presenter;
pub mod scan;

pub use api::{AuthApi, FeedbackApi, HttpApi, ScanApi};
pub use config::ClientConfig;
pub use scan::ScanTracker;
