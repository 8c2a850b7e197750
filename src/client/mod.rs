use async_trait::async_trait;
use thiserror::Error;

use crate::{
    account::{AccountCode, Balance},
    command::TransactionIntent,
};

pub mod dto;
pub mod http;
pub mod in_memory;
pub mod members;

/// Fallback shown when a request failed without any reason from the server.
pub const PROCESSING_ERROR: &str = "There was an error processing your transaction";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    ServerRejected,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{operation} has no endpoint for {identifier} accounts")]
    UnsupportedRoute {
        operation: &'static str,
        identifier: &'static str,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_decode() {
            TransportError::Decode(error.to_string())
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

/// Balances reported by the server after an operation. Transfers report
/// both sides, credits and debits only the actor's account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultingBalances {
    pub account: Option<Balance>,
    pub counterparty: Option<Balance>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub success: bool,
    pub message: String,
    pub balances: ResultingBalances,
    pub error_kind: Option<ErrorKind>,
}

impl TransactionOutcome {
    pub fn succeeded(message: impl Into<String>, balances: ResultingBalances) -> Self {
        Self {
            success: true,
            message: message.into(),
            balances,
            error_kind: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            balances: ResultingBalances::default(),
            error_kind: Some(ErrorKind::ServerRejected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(String),
    NotFound(String),
}

/// Issues the money operation itself.
///
/// Implementations must not do balance arithmetic: balances in the outcome
/// are the server's.
#[async_trait]
pub trait TransactionClient: Send + Sync {
    async fn submit(&self, intent: &TransactionIntent)
    -> Result<TransactionOutcome, TransportError>;
}

/// Confirms that an account code exists. Safe to call repeatedly.
#[async_trait]
pub trait AccountLookupClient: Send + Sync {
    async fn check_identifier(&self, id: &AccountCode) -> Result<LookupOutcome, TransportError>;
}
