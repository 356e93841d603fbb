//! Analyzer view state machine.
//!
//! Commands move the view between phases; the network call itself happens
//! outside, between [`AnalyzerView::begin_submit`] and
//! [`AnalyzerView::complete_submit`]. Nothing here depends on the UI toolkit.
//!
//! ```text
//! Idle --select_image--> Ready --begin_submit--> Analyzing --complete_submit--> Done
//!  ^                       ^                                                      |
//!  +--choose_different-----+---------------------select_image---------------------+
//! ```

use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use crate::data_url::ImagePayload;
use crate::export::{ExportDocument, ExportError, PdfExporter, DEFAULT_EXPORT_NAME};
use crate::markdown::render_markdown;
use crate::quota::{QuotaExceeded, QuotaPolicy, QuotaState};
use crate::store::{StateStore, LAST_IMAGE_KEY};

/// Prefix shown in the result panel when an analysis fails.
pub const ERROR_PREFIX: &str = "Error analyzing image: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No image chosen.
    Idle,
    /// Image chosen, not yet analyzed.
    Ready,
    /// Request in flight.
    Analyzing,
    /// Result (or error text) available.
    Done,
}

/// What the result panel shows after an analysis.
///
/// Failures share the success render path; the variant only records which
/// one it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Success(String),
    Failed(String),
}

impl AnalysisOutcome {
    pub fn text(&self) -> &str {
        match self {
            AnalysisOutcome::Success(text) | AnalysisOutcome::Failed(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed(_))
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRefused {
    #[error("No image selected")]
    NoImage,

    #[error("An analysis is already in progress")]
    InFlight,

    #[error(transparent)]
    QuotaExceeded(#[from] QuotaExceeded),
}

/// Permission to send one image. Must be handed back to
/// [`AnalyzerView::complete_submit`] with the outcome.
#[derive(Debug)]
pub struct SubmitTicket {
    attempt: u64,
    image: ImagePayload,
}

impl SubmitTicket {
    pub fn image(&self) -> &ImagePayload {
        &self.image
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }
}

pub struct AnalyzerView<S: StateStore> {
    store: S,
    policy: QuotaPolicy,
    quota: QuotaState,
    phase: Phase,
    image: Option<ImagePayload>,
    outcome: Option<AnalysisOutcome>,
    attempt: u64,
}

impl<S: StateStore> AnalyzerView<S> {
    /// Build the view from persisted state at `now`.
    pub fn mount(store: S, policy: QuotaPolicy, now: i64) -> Self {
        let quota = QuotaState::load(&store, &policy, now);
        info!(
            "Analyzer mounted: {} of {} analyses used",
            quota.count, policy.ceiling
        );
        Self {
            store,
            policy,
            quota,
            phase: Phase::Idle,
            image: None,
            outcome: None,
            attempt: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    /// Text of the result panel, empty until an analysis finishes.
    pub fn result_text(&self) -> &str {
        self.outcome.as_ref().map(|o| o.text()).unwrap_or("")
    }

    pub fn rendered_html(&self) -> String {
        render_markdown(self.result_text())
    }

    pub fn quota(&self) -> QuotaState {
        self.quota
    }

    pub fn policy(&self) -> QuotaPolicy {
        self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_analyzing(&self) -> bool {
        self.phase == Phase::Analyzing
    }

    /// Whether the analyze trigger should be enabled.
    pub fn can_submit(&self) -> bool {
        self.image.is_some() && !self.is_analyzing()
    }

    pub fn remaining_analyses(&self, now: i64) -> u32 {
        self.quota
            .rolled_over(&self.policy, now)
            .remaining(&self.policy)
    }

    pub fn limit_reached(&self, now: i64) -> bool {
        self.quota
            .rolled_over(&self.policy, now)
            .is_exhausted(&self.policy)
    }

    pub fn hours_until_reset(&self, now: i64) -> i64 {
        self.quota
            .rolled_over(&self.policy, now)
            .hours_until_reset(&self.policy, now)
    }

    /// Apply window rollover at `now` and persist it if anything changed.
    pub fn refresh_quota(&mut self, now: i64) {
        let rolled = self.quota.rolled_over(&self.policy, now);
        if rolled != self.quota {
            self.quota = rolled;
            self.persist_quota();
        }
    }

    /// The cached copy of the last upload, if it is still a valid image.
    pub fn cached_image(&self) -> Option<ImagePayload> {
        let raw = self.store.get(LAST_IMAGE_KEY)?;
        match ImagePayload::parse(&raw) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Ignoring cached image: {}", e);
                None
            }
        }
    }

    pub fn select_image(&mut self, image: ImagePayload) -> Result<(), SubmitRefused> {
        if self.is_analyzing() {
            return Err(SubmitRefused::InFlight);
        }
        info!("Selected {}", image);

        if let Err(e) = self.store.set(LAST_IMAGE_KEY, image.as_str()) {
            warn!("Could not cache uploaded image: {}", e);
        }
        self.image = Some(image);
        self.outcome = None;
        self.phase = Phase::Ready;
        Ok(())
    }

    /// Select the cached last upload. Returns `false` if there is none.
    pub fn restore_cached_image(&mut self) -> Result<bool, SubmitRefused> {
        match self.cached_image() {
            Some(image) => self.select_image(image).map(|_| true),
            None => Ok(false),
        }
    }

    /// Back to the upload prompt, dropping the image and result.
    pub fn choose_different_image(&mut self) -> Result<(), SubmitRefused> {
        if self.is_analyzing() {
            return Err(SubmitRefused::InFlight);
        }
        self.image = None;
        self.outcome = None;
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Check the quota and, if allowed, count this attempt and enter
    /// `Analyzing`.
    ///
    /// The counter is incremented here and only here; a failed analysis
    /// still uses up its slot.
    pub fn begin_submit(&mut self, now: i64) -> Result<SubmitTicket, SubmitRefused> {
        if self.is_analyzing() {
            return Err(SubmitRefused::InFlight);
        }
        let image = self.image.clone().ok_or(SubmitRefused::NoImage)?;

        let before = self.quota;
        let consumed = self.quota.try_consume(&self.policy, now);
        if self.quota != before {
            self.persist_quota();
        }
        if let Err(exceeded) = consumed {
            info!(
                "Analysis refused: limit of {} reached, {} h until reset",
                self.policy.ceiling,
                exceeded.hours()
            );
            return Err(exceeded.into());
        }

        self.attempt += 1;
        self.phase = Phase::Analyzing;
        info!(
            "Starting analysis #{} ({} of {} used)",
            self.attempt, self.quota.count, self.policy.ceiling
        );

        Ok(SubmitTicket {
            attempt: self.attempt,
            image,
        })
    }

    /// Record the outcome of the request started with `ticket`.
    ///
    /// Returns `false` for a ticket that no longer matches the request in
    /// flight; its outcome is dropped.
    pub fn complete_submit<E: fmt::Display>(
        &mut self,
        ticket: SubmitTicket,
        outcome: Result<String, E>,
    ) -> bool {
        if self.phase != Phase::Analyzing || ticket.attempt != self.attempt {
            warn!("Dropping outcome of stale analysis #{}", ticket.attempt);
            return false;
        }

        self.outcome = Some(match outcome {
            Ok(markdown) => {
                info!("Analysis #{} returned {} bytes", ticket.attempt, markdown.len());
                AnalysisOutcome::Success(markdown)
            }
            Err(e) => {
                warn!("Analysis #{} failed: {}", ticket.attempt, e);
                AnalysisOutcome::Failed(format!("{}{}", ERROR_PREFIX, e))
            }
        });
        self.phase = Phase::Done;
        true
    }

    /// The rendered result, packaged for export.
    pub fn export_document(&self, file_name: &str) -> Result<ExportDocument, ExportError> {
        if self.outcome.is_none() {
            return Err(ExportError::NothingToExport);
        }
        Ok(ExportDocument::new(file_name, self.rendered_html()))
    }

    pub fn export_pdf<E: PdfExporter + ?Sized>(&self, exporter: &E) -> Result<(), ExportError> {
        let document = self.export_document(DEFAULT_EXPORT_NAME)?;
        exporter.export(&document)
    }

    fn persist_quota(&self) {
        if let Err(e) = self.quota.persist(&self.store) {
            warn!("Failed to persist quota state: {}", e);
        }
    }
}
