use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{AccountFields, SubmissionId},
    error::AccountFailure,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    account::AccountActionModel,
    enrollment::{EnrollmentClient, EnrollmentOutcome},
    query::QueryContext,
    redirect::{RedirectDecision, RedirectResolver},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Failed,
    EnrollmentPending,
    Resolved,
    Navigated,
}

impl SubmissionState {
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Idle, Submitting)
                | (Submitting, Failed)
                | (Submitting, EnrollmentPending)
                | (Submitting, Resolved)
                | (EnrollmentPending, Resolved)
                | (Resolved, Navigated)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionState::Failed | SubmissionState::Navigated)
    }
}

/// Where the browser is sent once a submission is resolved.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, destination: &RedirectDecision) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Account(#[from] AccountFailure),
    #[error("navigation failed: {0}")]
    Navigation(#[source] anyhow::Error),
    #[error("invalid submission transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: SubmissionState,
        to: SubmissionState,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReport {
    pub submission_id: SubmissionId,
    pub enrollment: Option<EnrollmentOutcome>,
    pub destination: RedirectDecision,
}

struct SubmissionRun {
    state: SubmissionState,
    states: broadcast::Sender<SubmissionState>,
}

impl SubmissionRun {
    fn advance(&mut self, next: SubmissionState) -> Result<(), SubmissionError> {
        if !self.state.can_transition_to(next) {
            return Err(SubmissionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = ?self.state, to = ?next, "submission state changed");
        self.state = next;
        let _ = self.states.send(next);
        Ok(())
    }
}

/// Runs one account submission end to end: account mutation, optional
/// enrollment, redirect decision, navigation.
pub struct Orchestrator {
    account: AccountActionModel,
    enrollment: EnrollmentClient,
    resolver: RedirectResolver,
    navigator: Arc<dyn Navigator>,
    states: broadcast::Sender<SubmissionState>,
}

impl Orchestrator {
    pub fn new(
        account: AccountActionModel,
        enrollment: EnrollmentClient,
        resolver: RedirectResolver,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (states, _) = broadcast::channel(16);
        Self {
            account,
            enrollment,
            resolver,
            navigator,
            states,
        }
    }

    pub fn account(&self) -> &AccountActionModel {
        &self.account
    }

    pub fn subscribe_states(&self) -> broadcast::Receiver<SubmissionState> {
        self.states.subscribe()
    }

    /// Consumes the orchestrator: one orchestrator, one submission.
    pub async fn submit(
        self,
        fields: &AccountFields,
        query: QueryContext,
    ) -> Result<SubmissionReport, SubmissionError> {
        let submission_id = SubmissionId::random();
        let span = info_span!(
            "submission",
            %submission_id,
            kind = self.account.kind().as_str()
        );

        async move {
            let mut run = SubmissionRun {
                state: SubmissionState::Idle,
                states: self.states.clone(),
            };
            self.run(&mut run, submission_id, fields, &query).await
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        run: &mut SubmissionRun,
        submission_id: SubmissionId,
        fields: &AccountFields,
        query: &QueryContext,
    ) -> Result<SubmissionReport, SubmissionError> {
        run.advance(SubmissionState::Submitting)?;
        if let Err(failure) = self.account.submit(fields).await {
            run.advance(SubmissionState::Failed)?;
            return Err(failure.into());
        }

        let enrollment = match query.enrollment_request() {
            Ok(Some(request)) => {
                run.advance(SubmissionState::EnrollmentPending)?;
                Some(self.enrollment.enroll(&request.course_key).await)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "ignoring enrollment request");
                None
            }
        };
        if let Some(EnrollmentOutcome::OtherFailure) = &enrollment {
            warn!("enrollment failed, continuing without it");
        }

        run.advance(SubmissionState::Resolved)?;
        let destination = self.resolver.resolve(query, enrollment.as_ref());
        info!(%destination, "submission resolved");

        self.navigator
            .navigate(&destination)
            .await
            .map_err(SubmissionError::Navigation)?;
        run.advance(SubmissionState::Navigated)?;

        Ok(SubmissionReport {
            submission_id,
            enrollment,
            destination,
        })
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
