/// Account identifiers, money amounts and balances.
/// Parsing is the only way to build them, so a value in hand is well formed.
pub mod account;

/// Money operations and the pure validator that turns raw form input into a
/// [`command::TransactionIntent`].
pub mod command;

/// Backend seams (transaction submission, account lookup) and their HTTP and
/// in-memory implementations.
pub mod client;

/// Base URLs and request timeout for both endpoint families.
pub mod config;

/// Transaction request state machine. One [`orchestrator::Orchestrator`] per
/// screen, parameterized by an [`orchestrator::OperationProfile`].
pub mod orchestrator;

/// Turns orchestrator transitions into user-facing notifications.
pub mod notify;

/// Session token handling and the dashboard route guard.
pub mod session;

/// Console front end over [`orchestrator`], shared by the binary and the
/// integration tests.
pub mod bin_utils;
