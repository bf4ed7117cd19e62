#![allow(missing_docs)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum_extra::extract::cookie::Cookie;
use axum_test::TestServer;
use reqwest::Url;
use rusqlite::Connection;
use time::macros::datetime;
use tokio::sync::Notify;

use crate::{
    AppState, Error,
    auth::{COOKIE_OAUTH_STATE, COOKIE_SESSION, Identity, IdentityProvider, UserId},
    client::{ClientError, ExpensesApi, Navigator, Notification, Notifier, Route},
    database_id::ExpenseId,
    endpoints,
    expense::{Amount, Expense, ExpenseDate, ExpenseTitle, NewExpense},
};

/// The code that [StubIdentityProvider] refuses to exchange.
pub(crate) const REJECTED_CODE: &str = "bad-code";

/// An identity provider that never leaves the process.
///
/// Any code other than [REJECTED_CODE] is accepted and becomes the user's ID.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StubIdentityProvider;

impl StubIdentityProvider {
    fn url(path: &str, query: &[(&str, &str)]) -> Result<Url, Error> {
        Url::parse_with_params(&format!("https://id.example.com{path}"), query)
            .map_err(|error| Error::IdentityProvider(error.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    fn login_url(&self, state: &str) -> Result<Url, Error> {
        Self::url("/oauth2/auth", &[("state", state)])
    }

    fn register_url(&self, state: &str) -> Result<Url, Error> {
        Self::url("/oauth2/auth", &[("state", state), ("prompt", "create")])
    }

    fn logout_url(&self) -> Result<Url, Error> {
        Self::url("/logout", &[("redirect", "http://localhost:3000")])
    }

    async fn exchange_code(&self, code: &str) -> Result<Identity, Error> {
        if code == REJECTED_CODE {
            return Err(Error::IdentityProvider("invalid_grant".to_owned()));
        }

        Ok(test_identity(code))
    }
}

pub(crate) fn test_identity(user_id: &str) -> Identity {
    Identity {
        id: UserId::new(user_id),
        given_name: "Test".to_owned(),
        family_name: "User".to_owned(),
        email: format!("{user_id}@example.com"),
        picture: None,
    }
}

/// App state with an empty in-memory database and [StubIdentityProvider].
pub(crate) fn test_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open database in memory.");

    AppState::new(connection, "test secret", Arc::new(StubIdentityProvider))
        .expect("Could not create app state.")
}

/// Start logging in and return the OAuth state cookie and the state sent to
/// the identity provider.
pub(crate) async fn start_log_in(server: &TestServer) -> (Cookie<'static>, String) {
    let response = server.get(endpoints::LOG_IN).await;
    let location = Url::parse(response.header("location").to_str().unwrap()).unwrap();
    let state = location
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("log in redirect should include the OAuth state");

    (response.cookie(COOKIE_OAUTH_STATE), state)
}

/// Log in as `user_id` through the callback and return the session cookie.
pub(crate) async fn log_in(server: &TestServer, user_id: &str) -> Cookie<'static> {
    let (oauth_state_cookie, state) = start_log_in(server).await;

    server
        .get(endpoints::AUTH_CALLBACK)
        .add_query_param("code", user_id)
        .add_query_param("state", &state)
        .add_cookie(oauth_state_cookie)
        .await
        .cookie(COOKIE_SESSION)
}

pub(crate) fn test_expense(id: ExpenseId, title: &str, amount: &str) -> Expense {
    Expense {
        id,
        title: ExpenseTitle::new_unchecked(title),
        amount: amount.parse().unwrap(),
        date: ExpenseDate::new(datetime!(2024-01-01 0:00 UTC)),
        created_at: datetime!(2024-01-01 12:00 UTC),
        user_id: UserId::new("kp_test"),
    }
}

// ============================================================================
// CLIENT FAKES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApiCall {
    ListExpenses,
    CreateExpense,
    GetExpense,
    DeleteExpense,
    TotalSpent,
    CurrentUser,
}

/// Something the client did, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Api(ApiCall),
    Navigate(Route),
}

/// A log of [Event]s that can be shared between fakes.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Debug, Default)]
struct FakeState {
    expenses: Vec<Expense>,
    fail_requests: bool,
    create_gate: Option<Arc<Notify>>,
}

/// Holds create requests open until released.
#[derive(Debug, Clone)]
pub(crate) struct CreateGate(Arc<Notify>);

impl CreateGate {
    /// Let one held create request finish.
    pub(crate) fn release(&self) {
        self.0.notify_one();
    }
}

/// An in-memory [ExpensesApi] that behaves like the server for a single user.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeExpensesApi {
    state: Arc<Mutex<FakeState>>,
    events: EventLog,
}

impl FakeExpensesApi {
    /// A fake whose user already has `expenses`, newest first.
    pub(crate) fn with_expenses(expenses: Vec<Expense>) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().expenses = expenses;
        fake
    }

    /// Record calls in `events` instead of a private log.
    pub(crate) fn with_event_log(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    /// Make every following request fail with a 500.
    pub(crate) fn fail_requests(&self) {
        self.state.lock().unwrap().fail_requests = true;
    }

    /// Make every following create request wait for the returned gate.
    pub(crate) fn hold_creates(&self) -> CreateGate {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().create_gate = Some(gate.clone());
        CreateGate(gate)
    }

    pub(crate) fn count_calls(&self, call: ApiCall) -> usize {
        self.events
            .events()
            .into_iter()
            .filter(|event| *event == Event::Api(call))
            .count()
    }

    fn call(&self, call: ApiCall) -> Result<MutexGuard<'_, FakeState>, ClientError> {
        self.events.push(Event::Api(call));
        self.respond()
    }

    fn respond(&self) -> Result<MutexGuard<'_, FakeState>, ClientError> {
        let state = self.state.lock().unwrap();

        if state.fail_requests {
            return Err(ClientError::Status {
                status: 500,
                message: "Internal server error".to_owned(),
            });
        }

        Ok(state)
    }
}

fn not_found() -> ClientError {
    ClientError::Status {
        status: 404,
        message: "Not found".to_owned(),
    }
}

#[async_trait]
impl ExpensesApi for FakeExpensesApi {
    async fn list_expenses(&self) -> Result<Vec<Expense>, ClientError> {
        Ok(self.call(ApiCall::ListExpenses)?.expenses.clone())
    }

    async fn create_expense(&self, new_expense: &NewExpense) -> Result<Expense, ClientError> {
        self.events.push(Event::Api(ApiCall::CreateExpense));
        let gate = self.state.lock().unwrap().create_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.respond()?;
        let id = state.expenses.iter().map(|expense| expense.id).max().unwrap_or(0) + 1;
        let expense = Expense {
            id,
            title: new_expense.title.clone(),
            amount: new_expense.amount,
            date: new_expense.date,
            created_at: datetime!(2024-01-02 12:00 UTC),
            user_id: UserId::new("kp_test"),
        };
        state.expenses.insert(0, expense.clone());

        Ok(expense)
    }

    async fn get_expense(&self, id: ExpenseId) -> Result<Expense, ClientError> {
        self.call(ApiCall::GetExpense)?
            .expenses
            .iter()
            .find(|expense| expense.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn delete_expense(&self, id: ExpenseId) -> Result<Expense, ClientError> {
        let mut state = self.call(ApiCall::DeleteExpense)?;
        let position = state
            .expenses
            .iter()
            .position(|expense| expense.id == id)
            .ok_or_else(not_found)?;

        Ok(state.expenses.remove(position))
    }

    async fn total_spent(&self) -> Result<Amount, ClientError> {
        let state = self.call(ApiCall::TotalSpent)?;
        let cents = state.expenses.iter().map(|expense| expense.amount.cents()).sum();

        Ok(Amount::from_cents(cents))
    }

    async fn current_user(&self) -> Result<Identity, ClientError> {
        let _state = self.call(ApiCall::CurrentUser)?;
        Ok(test_identity("kp_test"))
    }
}

/// A [Notifier] that keeps every notification.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    notifications: Vec<Notification>,
}

impl RecordingNotifier {
    pub(crate) fn notifications(&self) -> &[Notification] {
        &self.notifications
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

/// A [Navigator] that records navigation in an [EventLog].
#[derive(Debug, Clone)]
pub(crate) struct RecordingNavigator {
    events: EventLog,
}

impl RecordingNavigator {
    pub(crate) fn new(events: EventLog) -> Self {
        Self { events }
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, route: Route) {
        self.events.push(Event::Navigate(route));
    }
}
