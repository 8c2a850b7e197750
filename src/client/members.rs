//! Member login and player signup against the phone-keyed family.

use thiserror::Error;
use tracing::{info, warn};

use super::{
    TransportError,
    dto::{LoginBody, LoginResponse, MessageResponse, SignupRequest},
    http::{HttpBackend, endpoint},
};
use crate::session::SessionToken;

const LOGIN_REJECTED: &str = "Invalid phone or password";
const SIGNUP_REJECTED: &str = "Something went wrong";

#[derive(Debug, Error)]
pub enum MemberError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{0}")]
    Rejected(String),
    #[error("Something went wrong. Please try again.")]
    Transport(#[from] TransportError),
}

impl From<reqwest::Error> for MemberError {
    fn from(error: reqwest::Error) -> Self {
        MemberError::Transport(error.into())
    }
}

impl HttpBackend {
    pub async fn login(&self, phone: &str, password: &str) -> Result<SessionToken, MemberError> {
        require(phone, "Phone")?;
        require(password, "Password")?;

        let url = endpoint(&self.remote, &["api", "members", "login"])?;
        let response = self
            .client
            .post(url)
            .json(&LoginBody { phone, password })
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        let decoded = serde_json::from_slice::<LoginResponse>(&body).ok();

        if !status.is_success() {
            let reason = decoded
                .and_then(|decoded| decoded.message)
                .unwrap_or_else(|| LOGIN_REJECTED.to_owned());
            warn!(status = status.as_u16(), %reason, "login rejected");
            return Err(MemberError::Rejected(reason));
        }

        let token = decoded
            .and_then(|decoded| decoded.token)
            .and_then(SessionToken::new)
            .ok_or_else(|| {
                TransportError::Decode("login response carries no token".to_owned())
            })?;
        info!("member logged in");
        Ok(token)
    }

    /// Registers a player and returns the server's confirmation message.
    pub async fn signup(&self, request: &SignupRequest) -> Result<String, MemberError> {
        require(&request.full_name, "Full name")?;
        require(&request.phone, "Phone")?;
        require(&request.password, "Password")?;

        let url = endpoint(&self.remote, &["api", "user", "signup"])?;
        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        let message = serde_json::from_slice::<MessageResponse>(&body)
            .ok()
            .and_then(|decoded| decoded.message);

        if status.is_success() {
            info!("player added");
            Ok(message.unwrap_or_else(|| "Player added successfully!".to_owned()))
        } else {
            let reason = message.unwrap_or_else(|| SIGNUP_REJECTED.to_owned());
            warn!(status = status.as_u16(), %reason, "signup rejected");
            Err(MemberError::Rejected(reason))
        }
    }
}

fn require(value: &str, field: &'static str) -> Result<(), MemberError> {
    if value.trim().is_empty() {
        Err(MemberError::MissingField(field))
    } else {
        Ok(())
    }
}
