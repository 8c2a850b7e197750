//! Runs one console command end to end against [`HttpBackend`] and writes
//! what a screen would show to `output`. Kept in the library so the
//! integration tests drive exactly what the binary runs.

use std::{io::Write, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Subcommand;
use printer::{print_line, print_lookup, print_notifications};

use crate::{
    client::{dto::SignupRequest, http::HttpBackend},
    notify::drain_notifications,
    orchestrator::{LookupResolution, OperationProfile, Orchestrator, OrchestratorState},
    session::AUTH_COOKIE,
};

pub mod printer;

#[derive(Debug, Clone, Subcommand)]
pub enum ConsoleCommand {
    /// Add money to a phone-keyed account.
    AddMoney {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        amount: String,
    },
    /// Withdraw money from a phone-keyed account.
    Withdraw {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        amount: String,
    },
    /// Add money to a member account.
    Credit {
        #[arg(long)]
        member: String,
        #[arg(long)]
        amount: String,
    },
    /// Withdraw money from a member account.
    Debit {
        #[arg(long)]
        member: String,
        #[arg(long)]
        amount: String,
    },
    /// Move money from one member account to another. The sender is
    /// verified before anything is submitted.
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
    },
    /// Check that a member account id exists.
    CheckId {
        #[arg(long)]
        member: String,
    },
    Login {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
    },
    /// Register a new player.
    Signup {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        referral_code: Option<String>,
    },
}

pub struct Service<'w, W: 'w> {
    pub backend: Arc<HttpBackend>,
    pub output: &'w mut W,
    pub timeout: Duration,
}

impl<'w, W> Service<'w, W>
where
    W: Write + 'w,
{
    /// Returns whether the command succeeded. Rejections and validation
    /// failures are printed and reported as `false`; only output failures
    /// and a refused submission are errors.
    pub async fn run(self, command: ConsoleCommand) -> Result<bool> {
        match command {
            ConsoleCommand::AddMoney { phone, amount } => {
                self.transact(OperationProfile::phone_credit(), &phone, None, &amount)
                    .await
            }
            ConsoleCommand::Withdraw { phone, amount } => {
                self.transact(OperationProfile::phone_debit(), &phone, None, &amount)
                    .await
            }
            ConsoleCommand::Credit { member, amount } => {
                self.transact(OperationProfile::member_credit(), &member, None, &amount)
                    .await
            }
            ConsoleCommand::Debit { member, amount } => {
                self.transact(OperationProfile::member_debit(), &member, None, &amount)
                    .await
            }
            ConsoleCommand::Transfer { from, to, amount } => {
                self.transact(OperationProfile::member_transfer(), &from, Some(&to), &amount)
                    .await
            }
            ConsoleCommand::CheckId { member } => self.check_id(&member).await,
            ConsoleCommand::Login { phone, password } => {
                match self.backend.login(&phone, &password).await {
                    Ok(token) => {
                        print_line(self.output, &format!("{AUTH_COOKIE}={}", token.expose()))?;
                        Ok(true)
                    }
                    Err(err) => {
                        print_line(self.output, &format!("[error] Login Failed: {err}"))?;
                        Ok(false)
                    }
                }
            }
            ConsoleCommand::Signup {
                full_name,
                phone,
                password,
                referral_code,
            } => {
                let request = SignupRequest {
                    full_name,
                    phone,
                    password,
                    referral_code,
                };
                match self.backend.signup(&request).await {
                    Ok(message) => {
                        print_line(self.output, &format!("[success] {message}"))?;
                        Ok(true)
                    }
                    Err(err) => {
                        print_line(self.output, &format!("[error] Signup Failed: {err}"))?;
                        Ok(false)
                    }
                }
            }
        }
    }

    async fn transact(
        self,
        profile: OperationProfile,
        identifier: &str,
        counterparty: Option<&str>,
        amount: &str,
    ) -> Result<bool> {
        let orchestrator =
            Orchestrator::with_backend(profile, self.backend.clone()).with_timeout(self.timeout);
        let mut transitions = orchestrator.subscribe();

        orchestrator.set_identifier(identifier);
        if let Some(counterparty) = counterparty {
            orchestrator.set_counterparty(counterparty);
        }
        orchestrator.set_amount(amount);
        let state = orchestrator.submit().await?;

        // a Required-mode lookup runs before anything is submitted
        if let Some(display) = orchestrator.lookup_display() {
            if !display.is_found() {
                print_lookup(self.output, &display)?;
            }
        }
        let mut notifications = Vec::new();
        drain_notifications(&mut transitions, &mut notifications);
        print_notifications(self.output, &notifications)?;

        Ok(matches!(state, OrchestratorState::Succeeded(_)))
    }

    async fn check_id(self, member: &str) -> Result<bool> {
        let orchestrator =
            Orchestrator::with_backend(OperationProfile::member_credit(), self.backend.clone())
                .with_timeout(self.timeout);
        orchestrator.set_identifier(member);

        match orchestrator.check_identifier().await? {
            LookupResolution::Applied(display) => {
                print_lookup(self.output, &display)?;
                Ok(display.is_found())
            }
            LookupResolution::Superseded => Ok(false),
        }
    }
}
