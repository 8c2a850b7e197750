//! Backend stand-in that keeps balances in memory. Used for offline console
//! runs and as the collaborator in orchestrator tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{
    AccountLookupClient, LookupOutcome, ResultingBalances, TransactionClient, TransactionOutcome,
    TransportError, http::USER_NOT_FOUND,
};
use crate::{
    account::{AccountCode, Balance},
    command::{Operation, TransactionIntent},
};

#[derive(Debug, PartialEq, Eq)]
enum LedgerEvent {
    Credited { account: String, amount: Decimal },
    Debited { account: String, amount: Decimal },
    Transferred {
        from: String,
        to: String,
        amount: Decimal,
    },
}

#[derive(Default)]
pub struct InMemoryBackend {
    accounts: Mutex<HashMap<String, Balance>>,
    latency: HashMap<String, Duration>,
    unreachable: bool,
    submissions: AtomicUsize,
    lookups: AtomicUsize,
}

impl InMemoryBackend {
    pub fn with_account(self, id: &str, balance: Balance) -> Self {
        self.ledger().insert(id.to_owned(), balance);
        self
    }

    /// Delays every request that names `id` as its actor.
    pub fn with_latency(mut self, id: &str, latency: Duration) -> Self {
        self.latency.insert(id.to_owned(), latency);
        self
    }

    /// Every request fails as if the host could not be reached.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn balance(&self, id: &str) -> Option<Balance> {
        self.ledger().get(id).copied()
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn ledger(&self) -> MutexGuard<'_, HashMap<String, Balance>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self, id: &str) -> Result<(), TransportError> {
        if let Some(latency) = self.latency.get(id) {
            tokio::time::sleep(*latency).await;
        }
        if self.unreachable {
            return Err(TransportError::Request("connection refused".to_owned()));
        }
        Ok(())
    }

    fn handle(
        ledger: &HashMap<String, Balance>,
        intent: &TransactionIntent,
    ) -> Result<LedgerEvent, String> {
        let account = intent.actor().as_str().to_owned();
        let amount = intent.amount().value();
        let available = *ledger.get(&account).ok_or(USER_NOT_FOUND)?;
        match intent.operation() {
            Operation::Credit => Ok(LedgerEvent::Credited { account, amount }),
            Operation::Debit if available >= amount => {
                Ok(LedgerEvent::Debited { account, amount })
            }
            Operation::TransferToMember if available >= amount => {
                let to = intent
                    .counterparty()
                    .map(|member| member.as_str().to_owned())
                    .filter(|member| ledger.contains_key(member))
                    .ok_or("Member not found")?;
                Ok(LedgerEvent::Transferred {
                    from: account,
                    to,
                    amount,
                })
            }
            Operation::Debit | Operation::TransferToMember => Err("Insufficient balance".to_owned()),
        }
    }

    fn apply(ledger: &mut HashMap<String, Balance>, event: &LedgerEvent) -> ResultingBalances {
        let mut adjust = |id: &str, delta: Decimal| {
            let balance = ledger.entry(id.to_owned()).or_default();
            *balance += delta;
            *balance
        };
        match event {
            LedgerEvent::Credited { account, amount } => ResultingBalances {
                account: Some(adjust(account, *amount)),
                counterparty: None,
            },
            LedgerEvent::Debited { account, amount } => ResultingBalances {
                account: Some(adjust(account, -*amount)),
                counterparty: None,
            },
            LedgerEvent::Transferred { from, to, amount } => ResultingBalances {
                account: Some(adjust(from, -*amount)),
                counterparty: Some(adjust(to, *amount)),
            },
        }
    }
}

#[async_trait]
impl TransactionClient for InMemoryBackend {
    async fn submit(
        &self,
        intent: &TransactionIntent,
    ) -> Result<TransactionOutcome, TransportError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        self.delay(intent.actor().as_str()).await?;

        let mut ledger = self.ledger();
        match Self::handle(&ledger, intent) {
            Ok(event) => {
                let balances = Self::apply(&mut ledger, &event);
                Ok(TransactionOutcome::succeeded("ok", balances))
            }
            Err(reason) => Ok(TransactionOutcome::rejected(reason)),
        }
    }
}

#[async_trait]
impl AccountLookupClient for InMemoryBackend {
    async fn check_identifier(&self, id: &AccountCode) -> Result<LookupOutcome, TransportError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.delay(id.as_str()).await?;

        if self.ledger().contains_key(id.as_str()) {
            Ok(LookupOutcome::Found(format!("User {} found", id.as_str())))
        } else {
            Ok(LookupOutcome::NotFound(USER_NOT_FOUND.to_owned()))
        }
    }
}
