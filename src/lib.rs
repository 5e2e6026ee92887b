//! Turnout bot — guided survey of drivers who did not report to work.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod survey;
