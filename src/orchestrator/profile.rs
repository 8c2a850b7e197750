use thiserror::Error;

use crate::{account::IdentifierKind, command::Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointFamily {
    /// Remote host, accounts keyed by phone number. No lookup endpoint.
    PhoneKeyed,
    /// Local host, accounts keyed by account code.
    IdKeyed,
}

/// How account id verification relates to submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// No lookup step at all.
    Skip,
    /// Lookup is a separate user action; its result is shown but never
    /// blocks submission.
    Advisory,
    /// Every submission looks the account up first and stops if it is not
    /// found.
    Required,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("transfers to a member are only available for id-keyed accounts")]
    TransferNeedsIdKeyed,
    #[error("phone-keyed accounts have no lookup endpoint to verify against")]
    NoLookupEndpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationProfile {
    operation: Operation,
    family: EndpointFamily,
    verification: Verification,
}

impl OperationProfile {
    pub fn new(
        operation: Operation,
        family: EndpointFamily,
        verification: Verification,
    ) -> Result<Self, ProfileError> {
        if family == EndpointFamily::PhoneKeyed {
            if operation == Operation::TransferToMember {
                return Err(ProfileError::TransferNeedsIdKeyed);
            }
            if verification != Verification::Skip {
                return Err(ProfileError::NoLookupEndpoint);
            }
        }
        Ok(Self {
            operation,
            family,
            verification,
        })
    }

    pub fn phone_credit() -> Self {
        Self {
            operation: Operation::Credit,
            family: EndpointFamily::PhoneKeyed,
            verification: Verification::Skip,
        }
    }

    pub fn phone_debit() -> Self {
        Self {
            operation: Operation::Debit,
            family: EndpointFamily::PhoneKeyed,
            verification: Verification::Skip,
        }
    }

    pub fn member_credit() -> Self {
        Self {
            operation: Operation::Credit,
            family: EndpointFamily::IdKeyed,
            verification: Verification::Advisory,
        }
    }

    pub fn member_debit() -> Self {
        Self {
            operation: Operation::Debit,
            family: EndpointFamily::IdKeyed,
            verification: Verification::Advisory,
        }
    }

    pub fn member_transfer() -> Self {
        Self {
            operation: Operation::TransferToMember,
            family: EndpointFamily::IdKeyed,
            verification: Verification::Required,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn family(&self) -> EndpointFamily {
        self.family
    }

    pub fn verification(&self) -> Verification {
        self.verification
    }

    pub fn identifier_kind(&self) -> IdentifierKind {
        match self.family {
            EndpointFamily::PhoneKeyed => IdentifierKind::Phone,
            EndpointFamily::IdKeyed => IdentifierKind::Code,
        }
    }
}
