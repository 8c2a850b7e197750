//! Maps orchestrator transitions to toast/modal style notifications.
//!
//! The orchestrator only broadcasts [`Transition`]s; whatever shows
//! notifications subscribes and runs them through [`notification_for`].

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::warn;

use crate::{
    account::format_balance,
    client::ErrorKind,
    orchestrator::{OrchestratorState, Transition},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub description: Option<String>,
}

pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

impl NotificationSink for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}

pub fn notification_for(transition: &Transition) -> Option<Notification> {
    match &transition.to {
        OrchestratorState::Submitting => Some(Notification {
            level: Level::Info,
            title: "Processing transaction...".to_owned(),
            description: None,
        }),
        OrchestratorState::Succeeded(outcome) => {
            let description = match (outcome.balances.account, outcome.balances.counterparty) {
                (Some(account), Some(member)) => format!(
                    "Your Balance: {}, Member Balance: {}",
                    format_balance(account),
                    format_balance(member)
                ),
                (Some(account), None) => format!("New Balance: {}", format_balance(account)),
                (None, _) => outcome.message.clone(),
            };
            Some(Notification {
                level: Level::Success,
                title: transition.operation.success_title().to_owned(),
                description: Some(description),
            })
        }
        OrchestratorState::Failed { kind, message } => Some(Notification {
            level: Level::Error,
            title: match kind {
                ErrorKind::Validation => "Invalid Input",
                ErrorKind::Transport | ErrorKind::ServerRejected => "Transaction Failed",
            }
            .to_owned(),
            description: Some(message.clone()),
        }),
        OrchestratorState::Idle | OrchestratorState::Validating | OrchestratorState::Checking => {
            None
        }
    }
}

/// Forwards whatever transitions are already queued, without waiting.
pub fn drain_notifications(
    receiver: &mut broadcast::Receiver<Transition>,
    sink: &mut impl NotificationSink,
) {
    loop {
        match receiver.try_recv() {
            Ok(transition) => {
                if let Some(notification) = notification_for(&transition) {
                    sink.notify(notification);
                }
            }
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "notification receiver lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

/// Forwards transitions until the orchestrator is dropped.
pub async fn forward_notifications(
    mut receiver: broadcast::Receiver<Transition>,
    sink: &mut impl NotificationSink,
) {
    loop {
        match receiver.recv().await {
            Ok(transition) => {
                if let Some(notification) = notification_for(&transition) {
                    sink.notify(notification);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "notification receiver lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
