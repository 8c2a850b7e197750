//! The transaction request state machine shared by every money-movement
//! screen.
//!
//! ```text
//! Idle --submit--> Validating --invalid--> Failed(Validation)
//! Validating --valid--> Submitting                 (Skip, Advisory)
//! Validating --valid--> Checking --found--> Submitting      (Required)
//! Checking --not found / lookup error--> Idle      (shown inline)
//! Submitting --success--> Succeeded, --failure--> Failed
//! Succeeded | Failed --dismiss / new input--> Idle
//! Idle --check--> Checking --resolved--> Idle      (Advisory, Required)
//! Checking --id edited--> Idle                    (standalone check only)
//! ```
//!
//! All methods take `&self`. State sits behind a mutex that is never held
//! across an await, so a second `submit` issued while one is in flight sees
//! the in-flight state and is refused.
//! Dropping a `submit` future part way releases the form again.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    account::{AccountCode, AccountIdentifier, IdentifierKind, PhoneNumber, format_balance},
    client::{
        AccountLookupClient, ErrorKind, LookupOutcome, PROCESSING_ERROR, TransactionClient,
        TransactionOutcome, TransportError,
    },
    command::{IntentDraft, Operation, TransactionIntent, validate, validate_identifier},
    config::DEFAULT_REQUEST_TIMEOUT,
};

pub mod profile;

pub use profile::{EndpointFamily, OperationProfile, ProfileError, Verification};

const TRANSITION_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Validating,
    Checking,
    Submitting,
    Succeeded(TransactionOutcome),
    Failed { kind: ErrorKind, message: String },
}

impl OrchestratorState {
    pub fn phase(&self) -> Phase {
        match self {
            OrchestratorState::Idle => Phase::Idle,
            OrchestratorState::Validating => Phase::Validating,
            OrchestratorState::Checking => Phase::Checking,
            OrchestratorState::Submitting => Phase::Submitting,
            OrchestratorState::Succeeded(_) => Phase::Succeeded,
            OrchestratorState::Failed { .. } => Phase::Failed,
        }
    }

    /// The submit control is enabled only in these states.
    pub fn accepts_submit(&self) -> bool {
        matches!(
            self,
            OrchestratorState::Idle
                | OrchestratorState::Succeeded(_)
                | OrchestratorState::Failed { .. }
        )
    }

    fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        OrchestratorState::Failed {
            kind,
            message: message.into(),
        }
    }
}

/// Tag of an [`OrchestratorState`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Checking,
    Submitting,
    Succeeded,
    Failed,
}

/// Broadcast on every state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub operation: Operation,
    pub from: Phase,
    pub to: OrchestratorState,
}

/// What the inline area next to the account id field shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupDisplay {
    Found(String),
    NotFound(String),
    /// The lookup could not be completed; retrying may help.
    Unavailable(String),
    /// The id was malformed, so no lookup was sent.
    Invalid(String),
}

impl LookupDisplay {
    pub fn is_found(&self) -> bool {
        matches!(self, LookupDisplay::Found(_))
    }

    pub fn message(&self) -> &str {
        match self {
            LookupDisplay::Found(message)
            | LookupDisplay::NotFound(message)
            | LookupDisplay::Unavailable(message)
            | LookupDisplay::Invalid(message) => message,
        }
    }
}

impl From<Result<LookupOutcome, TransportError>> for LookupDisplay {
    fn from(result: Result<LookupOutcome, TransportError>) -> Self {
        match result {
            Ok(LookupOutcome::Found(message)) => LookupDisplay::Found(message),
            Ok(LookupOutcome::NotFound(message)) => LookupDisplay::NotFound(message),
            Err(error) => {
                warn!(%error, "account lookup failed");
                LookupDisplay::Unavailable(
                    "Could not verify the account id, please retry".to_owned(),
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResolution {
    Applied(LookupDisplay),
    /// A newer lookup was issued before this one resolved; its response was
    /// dropped.
    Superseded,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("a submission is already in progress")]
    Busy,
    #[error("{0} does not verify account ids")]
    LookupNotSupported(Operation),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub identifier: String,
    pub counterparty: String,
    pub amount: String,
}

struct Inner {
    state: OrchestratorState,
    fields: FormFields,
    lookup: Option<LookupDisplay>,
    lookup_seq: u64,
    /// Set while a Required-mode submission is in its Checking step.
    checking_for_submit: bool,
}

pub struct Orchestrator {
    profile: OperationProfile,
    transactions: Arc<dyn TransactionClient>,
    lookups: Arc<dyn AccountLookupClient>,
    timeout: Duration,
    inner: Mutex<Inner>,
    transitions: broadcast::Sender<Transition>,
}

impl Orchestrator {
    pub fn new(
        profile: OperationProfile,
        transactions: Arc<dyn TransactionClient>,
        lookups: Arc<dyn AccountLookupClient>,
    ) -> Self {
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            profile,
            transactions,
            lookups,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            inner: Mutex::new(Inner {
                state: OrchestratorState::Idle,
                fields: FormFields::default(),
                lookup: None,
                lookup_seq: 0,
                checking_for_submit: false,
            }),
            transitions,
        }
    }

    /// Uses one backend for both the money operation and the lookup.
    pub fn with_backend<B>(profile: OperationProfile, backend: Arc<B>) -> Self
    where
        B: TransactionClient + AccountLookupClient + 'static,
    {
        Self::new(profile, backend.clone(), backend)
    }

    /// Bounds every network call; an expired call resolves as a transport
    /// error.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn profile(&self) -> OperationProfile {
        self.profile
    }

    pub fn state(&self) -> OrchestratorState {
        self.inner().state.clone()
    }

    pub fn fields(&self) -> FormFields {
        self.inner().fields.clone()
    }

    pub fn lookup_display(&self) -> Option<LookupDisplay> {
        self.inner().lookup.clone()
    }

    pub fn can_submit(&self) -> bool {
        self.inner().state.accepts_submit()
    }

    /// Actor balance of the last success, as the server reported it.
    pub fn balance_display(&self) -> Option<String> {
        match &self.inner().state {
            OrchestratorState::Succeeded(outcome) => outcome.balances.account.map(format_balance),
            _ => None,
        }
    }

    /// Receiving member's balance after a successful transfer.
    pub fn member_balance_display(&self) -> Option<String> {
        match &self.inner().state {
            OrchestratorState::Succeeded(outcome) => {
                outcome.balances.counterparty.map(format_balance)
            }
            _ => None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }

    pub fn set_identifier(&self, raw: &str) {
        let value = match self.profile.identifier_kind() {
            IdentifierKind::Phone => PhoneNumber::filter_input(raw),
            IdentifierKind::Code => raw.to_owned(),
        };
        let mut inner = self.inner();
        if inner.fields.identifier != value && !inner.checking_for_submit {
            inner.lookup = None;
            if inner.state == OrchestratorState::Checking {
                // the running check is for the old id
                inner.lookup_seq += 1;
                self.transition(&mut inner, OrchestratorState::Idle);
            }
        }
        inner.fields.identifier = value;
        self.on_new_input(&mut inner);
    }

    pub fn set_counterparty(&self, raw: &str) {
        let mut inner = self.inner();
        inner.fields.counterparty = raw.to_owned();
        self.on_new_input(&mut inner);
    }

    pub fn set_amount(&self, raw: &str) {
        let mut inner = self.inner();
        inner.fields.amount = raw.to_owned();
        self.on_new_input(&mut inner);
    }

    /// Closes the success or failure display.
    pub fn dismiss(&self) {
        let mut inner = self.inner();
        if matches!(
            inner.state,
            OrchestratorState::Succeeded(_) | OrchestratorState::Failed { .. }
        ) {
            self.transition(&mut inner, OrchestratorState::Idle);
        }
    }

    /// Runs one submission to its end and returns the resulting state.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::Busy`] when the submit control is disabled, i.e.
    /// another submission or a lookup is still in flight.
    pub async fn submit(&self) -> Result<OrchestratorState, OrchestratorError> {
        let intent = match self.begin_submission()? {
            Ok(intent) => intent,
            Err(failed) => return Ok(failed),
        };
        let _release = SubmissionGuard { orchestrator: self };

        if self.profile.verification() == Verification::Required {
            if let AccountIdentifier::Code(code) = intent.actor() {
                if let Some(stopped) = self.verify_before_submit(code).await {
                    return Ok(stopped);
                }
            }
        }

        {
            let mut inner = self.inner();
            self.transition(&mut inner, OrchestratorState::Submitting);
        }

        let result = tokio::time::timeout(self.timeout, self.transactions.submit(&intent))
            .await
            .unwrap_or(Err(TransportError::Timeout));

        let mut inner = self.inner();
        let next = match result {
            Ok(outcome) if outcome.success => {
                info!(
                    operation = %intent.operation(),
                    account = %intent.actor(),
                    balance = ?outcome.balances.account,
                    "transaction succeeded"
                );
                inner.fields.amount.clear();
                if self.profile.verification() == Verification::Required {
                    inner.fields.identifier.clear();
                    inner.fields.counterparty.clear();
                    inner.lookup = None;
                }
                OrchestratorState::Succeeded(outcome)
            }
            Ok(outcome) => {
                let kind = outcome.error_kind.unwrap_or(ErrorKind::ServerRejected);
                OrchestratorState::failed(kind, outcome.message)
            }
            Err(error) => {
                warn!(operation = %intent.operation(), %error, "transaction did not complete");
                OrchestratorState::failed(ErrorKind::Transport, PROCESSING_ERROR)
            }
        };
        self.transition(&mut inner, next.clone());
        drop(inner);
        Ok(next)
    }

    /// User-initiated account id check. Reissuing while a previous check is
    /// in flight supersedes it: only the latest request's response is shown.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::Busy`] while a submission is in progress and
    /// [`OrchestratorError::LookupNotSupported`] for profiles without
    /// verification.
    pub async fn check_identifier(&self) -> Result<LookupResolution, OrchestratorError> {
        if self.profile.verification() == Verification::Skip {
            return Err(OrchestratorError::LookupNotSupported(self.profile.operation()));
        }

        let (seq, code) = {
            let mut inner = self.inner();
            let submitting = inner.checking_for_submit
                || matches!(
                    inner.state,
                    OrchestratorState::Validating | OrchestratorState::Submitting
                );
            if submitting {
                return Err(OrchestratorError::Busy);
            }
            let validated =
                validate_identifier(self.profile.identifier_kind(), &inner.fields.identifier);
            let code = match validated {
                Ok(AccountIdentifier::Code(code)) => code,
                Ok(AccountIdentifier::Phone(_)) => {
                    return Err(OrchestratorError::LookupNotSupported(
                        self.profile.operation(),
                    ));
                }
                Err(error) => {
                    let display = LookupDisplay::Invalid(error.to_string());
                    inner.lookup = Some(display.clone());
                    return Ok(LookupResolution::Applied(display));
                }
            };
            inner.lookup_seq += 1;
            self.transition(&mut inner, OrchestratorState::Checking);
            (inner.lookup_seq, code)
        };

        debug!(account = code.as_str(), seq, "checking account id");
        let result = self.lookup(&code).await;

        let mut inner = self.inner();
        if inner.lookup_seq != seq {
            debug!(account = code.as_str(), seq, "dropping superseded lookup response");
            return Ok(LookupResolution::Superseded);
        }
        let display = LookupDisplay::from(result);
        inner.lookup = Some(display.clone());
        self.transition(&mut inner, OrchestratorState::Idle);
        Ok(LookupResolution::Applied(display))
    }

    /// Moves to Validating and validates the form. The outer error refuses
    /// the submission, the inner one is the Failed state it ended in.
    fn begin_submission(
        &self,
    ) -> Result<Result<TransactionIntent, OrchestratorState>, OrchestratorError> {
        let mut inner = self.inner();
        if !inner.state.accepts_submit() {
            debug!(state = ?inner.state.phase(), "submit refused while busy");
            return Err(OrchestratorError::Busy);
        }
        self.transition(&mut inner, OrchestratorState::Validating);

        let operation = self.profile.operation();
        let validated = validate(&IntentDraft {
            operation,
            identifier_kind: self.profile.identifier_kind(),
            actor: &inner.fields.identifier,
            counterparty: (operation == Operation::TransferToMember)
                .then_some(inner.fields.counterparty.as_str()),
            amount: &inner.fields.amount,
        });

        match validated {
            Ok(intent) => {
                if intent.is_self_transfer() {
                    // not rejected, the backend decides
                    warn!(account = %intent.actor(), "transfer names the same account on both sides");
                }
                Ok(Ok(intent))
            }
            Err(error) => {
                debug!(%error, "submission failed validation");
                let failed = OrchestratorState::failed(ErrorKind::Validation, error.to_string());
                self.transition(&mut inner, failed.clone());
                Ok(Err(failed))
            }
        }
    }

    /// Required-mode lookup. Returns the state to stop in when the account
    /// could not be confirmed.
    async fn verify_before_submit(&self, code: &AccountCode) -> Option<OrchestratorState> {
        {
            let mut inner = self.inner();
            inner.lookup_seq += 1;
            inner.checking_for_submit = true;
            self.transition(&mut inner, OrchestratorState::Checking);
        }

        let result = self.lookup(code).await;

        let mut inner = self.inner();
        inner.checking_for_submit = false;
        let display = LookupDisplay::from(result);
        let found = display.is_found();
        inner.lookup = Some(display);
        if found {
            None
        } else {
            self.transition(&mut inner, OrchestratorState::Idle);
            Some(OrchestratorState::Idle)
        }
    }

    async fn lookup(&self, code: &AccountCode) -> Result<LookupOutcome, TransportError> {
        tokio::time::timeout(self.timeout, self.lookups.check_identifier(code))
            .await
            .unwrap_or(Err(TransportError::Timeout))
    }

    fn on_new_input(&self, inner: &mut Inner) {
        if matches!(
            inner.state,
            OrchestratorState::Succeeded(_) | OrchestratorState::Failed { .. }
        ) {
            self.transition(inner, OrchestratorState::Idle);
        }
    }

    fn transition(&self, inner: &mut Inner, to: OrchestratorState) {
        if inner.state == to {
            return;
        }
        let from = inner.state.phase();
        debug!(operation = %self.profile.operation(), ?from, to = ?to.phase(), "state transition");
        inner.state = to.clone();
        // no subscribers is fine
        let _ = self.transitions.send(Transition {
            operation: self.profile.operation(),
            from,
            to,
        });
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lives for the awaits of one `submit`. If the submit future is dropped
/// before it finishes, the form is released instead of staying in flight.
struct SubmissionGuard<'a> {
    orchestrator: &'a Orchestrator,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        let orchestrator = self.orchestrator;
        let mut inner = orchestrator.inner();
        inner.checking_for_submit = false;
        let released = match inner.state {
            // the request may have reached the backend, outcome unknown
            OrchestratorState::Submitting => {
                OrchestratorState::failed(ErrorKind::Transport, PROCESSING_ERROR)
            }
            OrchestratorState::Validating | OrchestratorState::Checking => OrchestratorState::Idle,
            OrchestratorState::Idle
            | OrchestratorState::Succeeded(_)
            | OrchestratorState::Failed { .. } => return,
        };
        warn!(
            operation = %orchestrator.profile.operation(),
            state = ?inner.state.phase(),
            "submission dropped before completion"
        );
        orchestrator.transition(&mut inner, released);
    }
}
