//! Agent module for TownChat
//!
//! This module contains the assistant run orchestrator: thread acquisition,
//! run polling and reply extraction.

pub mod runner;

pub use runner::{extract_response, AssistantRunner, PollSettings, RunOutput, Sleeper, TokioSleeper};
