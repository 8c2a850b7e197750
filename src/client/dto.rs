//! Wire shapes of the console backend. Field names follow the backend's
//! camelCase JSON.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::{Balance, PhoneNumber};

#[derive(Debug, Serialize)]
pub struct PhoneAmountBody<'a> {
    pub phone: &'a PhoneNumber,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct AmountBody {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferBody<'a> {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub member_id: &'a str,
}

/// Every transaction endpoint answers with a subset of these fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub message: Option<String>,
    pub error: Option<String>,
    pub new_balance: Option<Balance>,
    pub updated_balance: Option<Balance>,
    pub user_balance: Option<Balance>,
    pub member_balance: Option<Balance>,
}

impl TransactionResponse {
    /// Server-supplied failure reason, `error` first.
    pub fn reason(self) -> Option<String> {
        [self.error, self.message]
            .into_iter()
            .flatten()
            .find(|reason| !reason.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageResponse {
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginBody<'a> {
    pub phone: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: String,
    pub phone: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}
