use std::{
    str::from_utf8,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use exch_teller::{
    bin_utils::{ConsoleCommand, Service},
    client::http::HttpBackend,
    config::BackendConfig,
};
use rstest::rstest;
use serde_json::{Value, json};
use tokio::net::TcpListener;

const TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
struct Hit {
    path: String,
    body: Value,
}

type Hits = Arc<Mutex<Vec<Hit>>>;

fn record(hits: &Hits, path: String, body: Value) {
    hits.lock().unwrap().push(Hit { path, body });
}

/// Phone-keyed family.
fn remote_router(hits: Hits) -> Router {
    async fn add_money(State(hits): State<Hits>, Json(body): Json<Value>) -> Response {
        record(&hits, "/api/user/add-money".to_owned(), body.clone());
        if body["phone"] == "9876543210" {
            Json(json!({ "message": "Money added", "newBalance": 2500 })).into_response()
        } else {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "User not found" }))).into_response()
        }
    }

    async fn withdraw_money(State(hits): State<Hits>, Json(body): Json<Value>) -> Response {
        record(&hits, "/api/user/withdraw-money".to_owned(), body.clone());
        if body["amount"].as_f64().unwrap_or_default() > 1000.0 {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Insufficient balance" })),
            )
                .into_response()
        } else {
            Json(json!({ "updatedBalance": 500 })).into_response()
        }
    }

    async fn login(State(hits): State<Hits>, Json(body): Json<Value>) -> Response {
        record(&hits, "/api/members/login".to_owned(), body.clone());
        if body["password"] == "secret" {
            Json(json!({ "token": "tok-123" })).into_response()
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Invalid credentials" })),
            )
                .into_response()
        }
    }

    async fn signup(State(hits): State<Hits>, Json(body): Json<Value>) -> Response {
        record(&hits, "/api/user/signup".to_owned(), body);
        (
            StatusCode::CREATED,
            Json(json!({ "message": "Player added successfully!" })),
        )
            .into_response()
    }

    Router::new()
        .route("/api/user/add-money", post(add_money))
        .route("/api/user/withdraw-money", post(withdraw_money))
        .route("/api/user/signup", post(signup))
        .route("/api/members/login", post(login))
        .with_state(hits)
}

/// Id-keyed family. Both `check-id/{id}` and `{id}/{action}` share one
/// two-segment route.
fn local_router(hits: Hits) -> Router {
    async fn check_id(
        State(hits): State<Hits>,
        Path((first, id)): Path<(String, String)>,
    ) -> Response {
        record(&hits, format!("/api/user/{first}/{id}"), Value::Null);
        match id.as_str() {
            "Abc123" | "Xyz789" => {
                Json(json!({ "message": format!("User {id} found") })).into_response()
            }
            "Server500" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            "Gateway1" => (StatusCode::OK, "<html>gateway</html>").into_response(),
            _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "User not found" })))
                .into_response(),
        }
    }

    async fn transact(
        State(hits): State<Hits>,
        Path((user, action)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> Response {
        record(&hits, format!("/api/user/{user}/{action}"), body);
        match (user.as_str(), action.as_str()) {
            ("Broke1", _) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Insufficient balance", "message": "ignored" })),
            )
                .into_response(),
            ("Msg1", _) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Account frozen" })),
            )
                .into_response(),
            ("Quiet1", _) => StatusCode::BAD_REQUEST.into_response(),
            ("Slow1", _) => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "newBalance": 1 })).into_response()
            }
            (_, "add-money") => {
                Json(json!({ "message": "Money added", "newBalance": 2500 })).into_response()
            }
            (_, "withdraw-money") => {
                Json(json!({ "message": "Money withdrawn", "userBalance": 1500 })).into_response()
            }
            (_, "transfer-to-member") => Json(json!({
                "message": "Transfer completed",
                "userBalance": 750,
                "memberBalance": 300
            }))
            .into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    Router::new()
        .route("/api/user/:first/:second", get(check_id).post(transact))
        .with_state(hits)
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

struct Mock {
    remote: String,
    local: String,
    hits: Hits,
}

impl Mock {
    async fn start() -> Self {
        let hits = Hits::default();
        Self {
            remote: serve(remote_router(hits.clone())).await,
            local: serve(local_router(hits.clone())).await,
            hits,
        }
    }

    fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    async fn run(&self, command: ConsoleCommand) -> (bool, String) {
        run_against(&self.remote, &self.local, TIMEOUT, command).await
    }
}

async fn run_against(
    remote: &str,
    local: &str,
    timeout: Duration,
    command: ConsoleCommand,
) -> (bool, String) {
    let config = BackendConfig::new(remote, local, timeout).unwrap();
    let mut output = Vec::new();
    let service = Service {
        backend: Arc::new(HttpBackend::new(&config).unwrap()),
        output: &mut output,
        timeout,
    };
    let succeeded = service.run(command).await.unwrap();
    (succeeded, from_utf8(&output).unwrap().to_owned())
}

fn credit(member: &str, amount: &str) -> ConsoleCommand {
    ConsoleCommand::Credit {
        member: member.to_owned(),
        amount: amount.to_owned(),
    }
}

#[tokio::test]
async fn phone_add_money_shows_server_balance() {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::AddMoney {
            phone: "9876543210".to_owned(),
            amount: "500".to_owned(),
        })
        .await;

    assert!(succeeded);
    assert_eq!(
        output,
        "[info] Processing transaction...\n\
         [success] Money added successfully!: New Balance: ₹2500\n"
    );
    assert_eq!(
        mock.hits(),
        vec![Hit {
            path: "/api/user/add-money".to_owned(),
            body: json!({ "phone": "9876543210", "amount": 500.0 }),
        }]
    );
}

#[tokio::test]
async fn short_phone_never_reaches_the_network() {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::AddMoney {
            phone: "12345".to_owned(),
            amount: "500".to_owned(),
        })
        .await;

    assert!(!succeeded);
    assert_eq!(
        output,
        "[error] Invalid Input: Please enter a valid 10-digit phone number\n"
    );
    assert!(mock.hits().is_empty());
}

#[tokio::test]
async fn phone_withdraw_rejection_uses_server_message() {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::Withdraw {
            phone: "9876543210".to_owned(),
            amount: "5000".to_owned(),
        })
        .await;

    assert!(!succeeded);
    assert!(output.ends_with("[error] Transaction Failed: Insufficient balance\n"));
}

#[tokio::test]
async fn member_debit_uses_id_keyed_route() {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::Debit {
            member: "Abc123".to_owned(),
            amount: "100".to_owned(),
        })
        .await;

    assert!(succeeded);
    assert!(output.ends_with("[success] Money withdrawn successfully!: New Balance: ₹1500\n"));
    assert_eq!(
        mock.hits(),
        vec![Hit {
            path: "/api/user/Abc123/withdraw-money".to_owned(),
            body: json!({ "amount": 100.0 }),
        }]
    );
}

#[tokio::test]
async fn member_id_is_sent_as_one_path_segment() {
    let mock = Mock::start().await;
    let (succeeded, _) = mock.run(credit("a b/c", "10")).await;

    assert!(succeeded);
    assert_eq!(mock.hits()[0].path, "/api/user/a b/c/add-money");
}

#[rstest]
#[case::error_field_wins("Broke1", "Insufficient balance")]
#[case::message_field("Msg1", "Account frozen")]
#[case::empty_body("Quiet1", "Failed to add money")]
#[tokio::test]
async fn rejection_reason_comes_from_the_body(#[case] member: &str, #[case] reason: &str) {
    let mock = Mock::start().await;
    let (succeeded, output) = mock.run(credit(member, "10")).await;

    assert!(!succeeded);
    assert_eq!(
        output,
        format!("[info] Processing transaction...\n[error] Transaction Failed: {reason}\n")
    );
}

#[rstest]
#[case::found("Abc123", true, "[found] User Abc123 found\n")]
#[case::not_found("Ghost", false, "[not found] User not found\n")]
#[case::server_error(
    "Server500",
    false,
    "[unavailable] Could not verify the account id, please retry\n"
)]
#[case::html_success(
    "Gateway1",
    false,
    "[unavailable] Could not verify the account id, please retry\n"
)]
#[case::blank("  ", false, "[invalid] Please enter an account id\n")]
#[tokio::test]
async fn check_id_reports_inline(
    #[case] member: &str,
    #[case] found: bool,
    #[case] expected: &str,
) {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::CheckId {
            member: member.to_owned(),
        })
        .await;

    assert_eq!(succeeded, found);
    assert_eq!(output, expected);
}

#[tokio::test]
async fn transfer_verifies_sender_then_reports_both_balances() {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::Transfer {
            from: "Abc123".to_owned(),
            to: "Xyz789".to_owned(),
            amount: "250".to_owned(),
        })
        .await;

    assert!(succeeded);
    assert_eq!(
        output,
        "[info] Processing transaction...\n\
         [success] Transfer completed successfully!: Your Balance: ₹750, Member Balance: ₹300\n"
    );
    assert_eq!(
        mock.hits(),
        vec![
            Hit {
                path: "/api/user/check-id/Abc123".to_owned(),
                body: Value::Null,
            },
            Hit {
                path: "/api/user/Abc123/transfer-to-member".to_owned(),
                body: json!({ "amount": 250.0, "memberId": "Xyz789" }),
            },
        ]
    );
}

#[tokio::test]
async fn transfer_from_unknown_account_is_not_submitted() {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::Transfer {
            from: "Ghost".to_owned(),
            to: "Xyz789".to_owned(),
            amount: "250".to_owned(),
        })
        .await;

    assert!(!succeeded);
    assert_eq!(output, "[not found] User not found\n");
    assert_eq!(mock.hits().len(), 1);
}

#[tokio::test]
async fn transfer_is_not_submitted_when_check_id_answers_with_a_page() {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::Transfer {
            from: "Gateway1".to_owned(),
            to: "Xyz789".to_owned(),
            amount: "250".to_owned(),
        })
        .await;

    assert!(!succeeded);
    assert_eq!(
        output,
        "[unavailable] Could not verify the account id, please retry\n"
    );
    assert_eq!(
        mock.hits(),
        vec![Hit {
            path: "/api/user/check-id/Gateway1".to_owned(),
            body: Value::Null,
        }]
    );
}

#[tokio::test]
async fn unreachable_backend_shows_generic_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let (succeeded, output) = run_against(&closed, &closed, TIMEOUT, credit("Abc123", "10")).await;

    assert!(!succeeded);
    assert!(output.ends_with(
        "[error] Transaction Failed: There was an error processing your transaction\n"
    ));
}

#[tokio::test]
async fn hung_backend_times_out() {
    let mock = Mock::start().await;
    let (succeeded, output) = run_against(
        &mock.remote,
        &mock.local,
        Duration::from_millis(200),
        credit("Slow1", "10"),
    )
    .await;

    assert!(!succeeded);
    assert!(output.ends_with(
        "[error] Transaction Failed: There was an error processing your transaction\n"
    ));
}

#[tokio::test]
async fn login_prints_session_cookie() {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::Login {
            phone: "9876543210".to_owned(),
            password: "secret".to_owned(),
        })
        .await;

    assert!(succeeded);
    assert_eq!(output, "auth_token=tok-123\n");
    assert_eq!(
        mock.hits()[0].body,
        json!({ "phone": "9876543210", "password": "secret" })
    );
}

#[tokio::test]
async fn rejected_login_shows_server_message() {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::Login {
            phone: "9876543210".to_owned(),
            password: "wrong".to_owned(),
        })
        .await;

    assert!(!succeeded);
    assert_eq!(output, "[error] Login Failed: Invalid credentials\n");
}

#[tokio::test]
async fn signup_omits_missing_referral_code() {
    let mock = Mock::start().await;
    let (succeeded, output) = mock
        .run(ConsoleCommand::Signup {
            full_name: "Asha Rao".to_owned(),
            phone: "9876543210".to_owned(),
            password: "secret".to_owned(),
            referral_code: None,
        })
        .await;

    assert!(succeeded);
    assert_eq!(output, "[success] Player added successfully!\n");
    assert_eq!(
        mock.hits()[0].body,
        json!({ "fullName": "Asha Rao", "phone": "9876543210", "password": "secret" })
    );
}
