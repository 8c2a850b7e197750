use std::fmt;

use thiserror::Error;

use crate::account::{
    AccountCode, AccountIdentifier, AmountError, IdentifierError, IdentifierKind, MoneyAmount,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Credit,
    Debit,
    TransferToMember,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Credit => "credit",
            Operation::Debit => "debit",
            Operation::TransferToMember => "transfer-to-member",
        })
    }
}

impl Operation {
    /// Headline shown when the operation succeeds.
    pub fn success_title(self) -> &'static str {
        match self {
            Operation::Credit => "Money added successfully!",
            Operation::Debit => "Money withdrawn successfully!",
            Operation::TransferToMember => "Transfer completed successfully!",
        }
    }

    /// Failure reason used when the server rejects without saying why.
    pub fn failure_fallback(self) -> &'static str {
        match self {
            Operation::Credit => "Failed to add money",
            Operation::Debit => "Failed to withdraw money",
            Operation::TransferToMember => "Failed to transfer money",
        }
    }
}

/// Raw form input for one submission attempt, before validation.
#[derive(Debug, Clone)]
pub struct IntentDraft<'a> {
    pub operation: Operation,
    pub identifier_kind: IdentifierKind,
    pub actor: &'a str,
    pub counterparty: Option<&'a str>,
    pub amount: &'a str,
}

/// A validated money operation. Only [`validate`] builds one, so holding a
/// `TransactionIntent` means every precondition was checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    operation: Operation,
    actor: AccountIdentifier,
    counterparty: Option<AccountCode>,
    amount: MoneyAmount,
}

impl TransactionIntent {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn actor(&self) -> &AccountIdentifier {
        &self.actor
    }

    /// Receiving member, present for [`Operation::TransferToMember`] only.
    pub fn counterparty(&self) -> Option<&AccountCode> {
        self.counterparty.as_ref()
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn is_self_transfer(&self) -> bool {
        self.counterparty
            .as_ref()
            .is_some_and(|member| member.as_str() == self.actor.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("Please enter the member id to transfer to")]
    MissingCounterparty,
    #[error("Transfers to a member need an account id, not a phone number")]
    TransferNeedsCode,
}

/// Checks every precondition of a money operation. Pure, no I/O.
///
/// The identifier is checked first, then the counterparty, then the amount,
/// so the first problem in form order is the one reported.
pub fn validate(draft: &IntentDraft<'_>) -> Result<TransactionIntent, ValidationError> {
    let actor = AccountIdentifier::parse(draft.identifier_kind, draft.actor)?;

    let counterparty = match draft.operation {
        Operation::TransferToMember => {
            if draft.identifier_kind != IdentifierKind::Code {
                return Err(ValidationError::TransferNeedsCode);
            }
            let raw = draft.counterparty.unwrap_or_default();
            let member =
                AccountCode::parse(raw).map_err(|_| ValidationError::MissingCounterparty)?;
            Some(member)
        }
        Operation::Credit | Operation::Debit => None,
    };

    let amount = draft.amount.parse::<MoneyAmount>()?;

    Ok(TransactionIntent {
        operation: draft.operation,
        actor,
        counterparty,
        amount,
    })
}

/// Validates only the identifier, for a standalone lookup.
pub fn validate_identifier(
    kind: IdentifierKind,
    raw: &str,
) -> Result<AccountIdentifier, ValidationError> {
    Ok(AccountIdentifier::parse(kind, raw)?)
}
