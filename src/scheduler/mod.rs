//! Reminder scheduling.
//!
//! `schedule` computes send times; `runner` polls for due users and delivers.

pub mod runner;
pub mod schedule;

pub use runner::{DeliveryOutcome, Scheduler, TickReport};
