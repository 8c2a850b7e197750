use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, prelude::Zero};
use serde::Serialize;
use thiserror::Error;

/// Balance exactly as reported by the backend. It can legitimately be zero.
pub type Balance = Decimal;

/// Number of digits a phone-keyed account identifier must have.
pub const PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// 10-digit phone number, used by the remote endpoint family.
    Phone,
    /// Free-form account code such as `Abc123`, used by the local endpoint family.
    Code,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Please enter a valid 10-digit phone number")]
    InvalidPhone,
    #[error("Please enter an account id")]
    BlankCode,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Please enter a numeric amount")]
    NotNumeric,
    #[error("Please enter a positive amount")]
    NotPositive,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let raw = raw.trim();
        if raw.len() == PHONE_DIGITS && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(IdentifierError::InvalidPhone)
        }
    }

    /// Input filtering applied while typing: keep digits, cap the length.
    /// Advisory only, [`PhoneNumber::parse`] still checks the result.
    pub fn filter_input(raw: &str) -> String {
        raw.chars()
            .filter(char::is_ascii_digit)
            .take(PHONE_DIGITS)
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountCode(String);

impl AccountCode {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let raw = raw.trim();
        if raw.is_empty() {
            Err(IdentifierError::BlankCode)
        } else {
            Ok(Self(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccountIdentifier {
    Phone(PhoneNumber),
    Code(AccountCode),
}

impl AccountIdentifier {
    pub fn parse(kind: IdentifierKind, raw: &str) -> Result<Self, IdentifierError> {
        match kind {
            IdentifierKind::Phone => PhoneNumber::parse(raw).map(Self::Phone),
            IdentifierKind::Code => AccountCode::parse(raw).map(Self::Code),
        }
    }

    pub fn kind(&self) -> IdentifierKind {
        match self {
            Self::Phone(_) => IdentifierKind::Phone,
            Self::Code(_) => IdentifierKind::Code,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Phone(phone) => phone.as_str(),
            Self::Code(code) => code.as_str(),
        }
    }
}

impl fmt::Display for AccountIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strictly positive amount of money. Currency is implicit (rupees).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MoneyAmount(Decimal);

impl MoneyAmount {
    pub fn new(amount: Decimal) -> Result<Self, AmountError> {
        if amount > Decimal::zero() {
            Ok(Self(amount))
        } else {
            Err(AmountError::NotPositive)
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for MoneyAmount {
    type Err = AmountError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(raw.trim()).map_err(|_| AmountError::NotNumeric)?;
        Self::new(amount)
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Renders a balance the way the console shows it, without rounding or
/// recomputing the server value.
pub fn format_balance(balance: Balance) -> String {
    format!("₹{balance}")
}
