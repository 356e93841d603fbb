//! Client side of Docr: the analyzer state machine, its quota bookkeeping,
//! and the Leptos components that drive it in the browser.

pub mod analyzer;
pub mod app;
pub mod commands;
pub mod components;
pub mod data_url;
pub mod export;
pub mod logging;
pub mod markdown;
pub mod pages;
pub mod quota;
pub mod store;

pub use analyzer::{AnalysisOutcome, AnalyzerView, Phase, SubmitRefused, SubmitTicket};
pub use data_url::{DataUrlError, ImagePayload};
pub use quota::{QuotaExceeded, QuotaPolicy, QuotaState};
pub use store::{LocalStorageStore, MemoryStore, StateStore, StoreError};
