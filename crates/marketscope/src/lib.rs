//! Marketscope
//!
//! Terminal client for the market research backend. Submit a topic and a
//! research type, follow the analysis live as the backend writes it, and open
//! the finished PDF report.

pub mod channel;
pub mod client;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod form;
pub mod pages;
pub mod render;
pub mod types;
pub mod viewer;

pub use client::{AnalysisBackend, ResearchClient};
pub use error::ClientError;
pub use types::{AnalysisRecord, AnalysisStatus, ResearchType};
