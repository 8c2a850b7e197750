//! Reqwest-backed implementation of the transaction and lookup seams.
//!
//! Owns transport details only: endpoint routing per family, body
//! serialisation, status mapping, and JSON decoding into outcomes.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::{
    AccountLookupClient, LookupOutcome, ResultingBalances, TransactionClient, TransactionOutcome,
    TransportError,
    dto::{AmountBody, MessageResponse, PhoneAmountBody, TransactionResponse, TransferBody},
};
use crate::{
    account::{AccountCode, AccountIdentifier},
    command::{Operation, TransactionIntent},
    config::BackendConfig,
};

pub const USER_NOT_FOUND: &str = "User not found";

/// Client for both endpoint families of the console backend.
pub struct HttpBackend {
    pub(super) client: Client,
    pub(super) remote: Url,
    pub(super) local: Url,
}

impl HttpBackend {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            remote: config.remote_base_url.clone(),
            local: config.local_base_url.clone(),
        })
    }

    fn transaction_request(
        &self,
        intent: &TransactionIntent,
    ) -> Result<RequestBuilder, TransportError> {
        let amount = intent.amount().value();
        let request = match (intent.operation(), intent.actor()) {
            (Operation::Credit, AccountIdentifier::Phone(phone)) => self
                .client
                .post(endpoint(&self.remote, &["api", "user", "add-money"])?)
                .json(&PhoneAmountBody { phone, amount }),
            (Operation::Debit, AccountIdentifier::Phone(phone)) => self
                .client
                .post(endpoint(&self.remote, &["api", "user", "withdraw-money"])?)
                .json(&PhoneAmountBody { phone, amount }),
            (Operation::Credit, AccountIdentifier::Code(code)) => self
                .client
                .post(endpoint(
                    &self.local,
                    &["api", "user", code.as_str(), "add-money"],
                )?)
                .json(&AmountBody { amount }),
            (Operation::Debit, AccountIdentifier::Code(code)) => self
                .client
                .post(endpoint(
                    &self.local,
                    &["api", "user", code.as_str(), "withdraw-money"],
                )?)
                .json(&AmountBody { amount }),
            (Operation::TransferToMember, AccountIdentifier::Code(code)) => {
                // validate() always sets the member for transfers
                let member = intent.counterparty().ok_or_else(|| {
                    TransportError::Request("transfer has no receiving member".to_owned())
                })?;
                self.client
                    .post(endpoint(
                        &self.local,
                        &["api", "user", code.as_str(), "transfer-to-member"],
                    )?)
                    .json(&TransferBody {
                        amount,
                        member_id: member.as_str(),
                    })
            }
            (Operation::TransferToMember, AccountIdentifier::Phone(_)) => {
                return Err(TransportError::UnsupportedRoute {
                    operation: "transfer-to-member",
                    identifier: "phone-keyed",
                });
            }
        };
        Ok(request)
    }
}

#[async_trait]
impl TransactionClient for HttpBackend {
    async fn submit(
        &self,
        intent: &TransactionIntent,
    ) -> Result<TransactionOutcome, TransportError> {
        let operation = intent.operation();
        debug!(%operation, account = %intent.actor(), amount = %intent.amount(), "submitting transaction");

        let response = self.transaction_request(intent)?.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let reason = serde_json::from_slice::<TransactionResponse>(&body)
                .ok()
                .and_then(TransactionResponse::reason)
                .unwrap_or_else(|| operation.failure_fallback().to_owned());
            warn!(%operation, status = status.as_u16(), %reason, "transaction rejected");
            return Ok(TransactionOutcome::rejected(reason));
        }

        let decoded: TransactionResponse = serde_json::from_slice(&body).map_err(|error| {
            TransportError::Decode(format!("invalid transaction payload: {error}"))
        })?;
        let balances = ResultingBalances {
            account: decoded
                .new_balance
                .or(decoded.updated_balance)
                .or(decoded.user_balance),
            counterparty: decoded.member_balance,
        };
        let message = decoded
            .message
            .unwrap_or_else(|| operation.success_title().to_owned());
        Ok(TransactionOutcome::succeeded(message, balances))
    }
}

#[async_trait]
impl AccountLookupClient for HttpBackend {
    async fn check_identifier(&self, id: &AccountCode) -> Result<LookupOutcome, TransportError> {
        let url = endpoint(&self.local, &["api", "user", "check-id", id.as_str()])?;
        debug!(account = %id.as_str(), "checking account id");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        lookup_outcome(status, &body)
    }
}

/// The check-id endpoint has no status field, so a 2xx whose message says
/// "not found" still counts as not found.
///
/// A 2xx only confirms the account when it carries a JSON message. Anything
/// else (a gateway page, an empty body) is a decode error, never `Found`.
fn lookup_outcome(status: StatusCode, body: &[u8]) -> Result<LookupOutcome, TransportError> {
    if status.is_success() {
        let decoded: MessageResponse = serde_json::from_slice(body).map_err(|error| {
            TransportError::Decode(format!("invalid check-id payload: {error}"))
        })?;
        let message = decoded
            .message
            .filter(|message| !message.trim().is_empty())
            .ok_or_else(|| {
                TransportError::Decode("check-id response carries no message".to_owned())
            })?;
        if message.to_ascii_lowercase().contains("not found") {
            Ok(LookupOutcome::NotFound(message))
        } else {
            Ok(LookupOutcome::Found(message))
        }
    } else if status.is_client_error() {
        let message = serde_json::from_slice::<MessageResponse>(body)
            .ok()
            .and_then(|decoded| decoded.message);
        Ok(LookupOutcome::NotFound(
            message.unwrap_or_else(|| USER_NOT_FOUND.to_owned()),
        ))
    } else {
        Err(TransportError::Request(format!(
            "check-id failed with status {}",
            status.as_u16()
        )))
    }
}

pub(super) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, TransportError> {
    let mut joined = base.clone();
    joined
        .path_segments_mut()
        .map_err(|()| TransportError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn endpoint_appends_and_encodes_segments() {
        let base = Url::parse("http://localhost:5000").unwrap();
        let url = endpoint(&base, &["api", "user", "Abc 1/2", "add-money"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/user/Abc%201%2F2/add-money"
        );

        let base = Url::parse("https://backend.example/prefix/").unwrap();
        let url = endpoint(&base, &["api", "user", "add-money"]).unwrap();
        assert_eq!(url.as_str(), "https://backend.example/prefix/api/user/add-money");
    }

    #[rstest]
    #[case::found(StatusCode::OK, r#"{"message":"User exists"}"#, LookupOutcome::Found("User exists".to_owned()))]
    #[case::message_says_missing(StatusCode::OK, r#"{"message":"User Not Found"}"#, LookupOutcome::NotFound("User Not Found".to_owned()))]
    #[case::not_found(StatusCode::NOT_FOUND, r#"{"message":"User not found"}"#, LookupOutcome::NotFound("User not found".to_owned()))]
    #[case::bad_request_without_body(StatusCode::BAD_REQUEST, "", LookupOutcome::NotFound(USER_NOT_FOUND.to_owned()))]
    fn maps_lookup_responses(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] expected: LookupOutcome,
    ) {
        let outcome = lookup_outcome(status, body.as_bytes()).unwrap();
        assert_eq!(outcome, expected);
    }

    #[rstest]
    #[case::html_page("<html>gateway</html>")]
    #[case::empty_body("")]
    #[case::no_message("{}")]
    #[case::blank_message(r#"{"message":"  "}"#)]
    fn unconfirmed_success_is_a_decode_error(#[case] body: &str) {
        let err = lookup_outcome(StatusCode::OK, body.as_bytes()).unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn lookup_server_errors_are_transport_errors() {
        let err = lookup_outcome(StatusCode::BAD_GATEWAY, br#"{"message":"down"}"#).unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }

    #[test]
    fn phone_credit_routes_to_remote_family() {
        let backend = HttpBackend::new(&BackendConfig::default()).unwrap();
        let intent = crate::command::validate(&crate::command::IntentDraft {
            operation: Operation::Credit,
            identifier_kind: crate::account::IdentifierKind::Phone,
            actor: "9876543210",
            counterparty: None,
            amount: "10",
        })
        .unwrap();
        let request = backend
            .transaction_request(&intent)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://backend.nurdcells.com/api/user/add-money"
        );
    }

    #[test]
    fn transfer_routes_to_sender_with_member_in_body() {
        let backend = HttpBackend::new(&BackendConfig::default()).unwrap();
        let intent = crate::command::validate(&crate::command::IntentDraft {
            operation: Operation::TransferToMember,
            identifier_kind: crate::account::IdentifierKind::Code,
            actor: "Abc123",
            counterparty: Some("Xyz789"),
            amount: "25",
        })
        .unwrap();
        let request = backend
            .transaction_request(&intent)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://localhost:5000/api/user/Abc123/transfer-to-member"
        );
        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "amount": 25.0, "memberId": "Xyz789" }));
    }
}
