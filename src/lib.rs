//! Workforce Tracker
//!
//! Time tracking against named work queues: team members start and complete
//! tasks, admins review and correct them, and a daily sweep closes tasks left
//! open past end of business.

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod queues;
pub mod referrals;
pub mod tracking;
pub mod types;
