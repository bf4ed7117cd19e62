//! Typed access to the expense API over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Response, Url,
    header::{COOKIE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    auth::{COOKIE_SESSION, Identity},
    client::ClientError,
    database_id::ExpenseId,
    endpoints::{self, format_endpoint},
    expense::{Amount, Expense, NewExpense},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The operations the client performs against the expense API.
///
/// Every call acts on behalf of the signed-in user.
#[async_trait]
pub trait ExpensesApi: Send + Sync {
    /// The user's most recent expenses, newest first.
    async fn list_expenses(&self) -> Result<Vec<Expense>, ClientError>;

    /// Store `new_expense` and return it as the server recorded it.
    async fn create_expense(&self, new_expense: &NewExpense) -> Result<Expense, ClientError>;

    /// A single expense owned by the user.
    async fn get_expense(&self, id: ExpenseId) -> Result<Expense, ClientError>;

    /// Delete an expense owned by the user and return it.
    async fn delete_expense(&self, id: ExpenseId) -> Result<Expense, ClientError>;

    /// The sum of all the user's expenses.
    async fn total_spent(&self) -> Result<Amount, ClientError>;

    /// The signed-in user.
    async fn current_user(&self) -> Result<Identity, ClientError>;
}

/// An [ExpensesApi] that sends requests to a running server.
#[derive(Debug, Clone)]
pub struct HttpExpensesApi {
    client: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct ExpensesBody {
    expenses: Vec<Expense>,
}

#[derive(Deserialize)]
struct ExpenseBody {
    expense: Expense,
}

#[derive(Deserialize)]
struct TotalBody {
    total: Amount,
}

#[derive(Deserialize)]
struct UserBody {
    user: Identity,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpExpensesApi {
    /// Create a client for the server at `base_url` that authenticates with
    /// the value of the session cookie.
    ///
    /// # Errors
    ///
    /// Returns [ClientError::Http] if `session_cookie` cannot be sent as a
    /// header or the HTTP client cannot be built.
    pub fn new(base_url: Url, session_cookie: &str) -> Result<Self, ClientError> {
        let mut cookie = HeaderValue::from_str(&format!("{COOKIE_SESSION}={session_cookie}"))
            .map_err(|error| ClientError::Http(error.to_string()))?;
        cookie.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ClientError::Http(error.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|error| ClientError::Http(error.to_string()))
    }

    fn expense_url(&self, id: ExpenseId) -> Result<Url, ClientError> {
        self.url(&format_endpoint(endpoints::EXPENSE, id))
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|error| ClientError::Http(error.to_string()))?;

        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|error| ClientError::Decode(error.to_string()))
    }
}

/// Turn an error response into a [ClientError::Status] carrying the
/// server's error message.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_owned(),
    };

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ExpensesApi for HttpExpensesApi {
    async fn list_expenses(&self) -> Result<Vec<Expense>, ClientError> {
        let body: ExpensesBody = Self::send(self.client.get(self.url(endpoints::EXPENSES)?)).await?;
        Ok(body.expenses)
    }

    async fn create_expense(&self, new_expense: &NewExpense) -> Result<Expense, ClientError> {
        Self::send(
            self.client
                .post(self.url(endpoints::EXPENSES)?)
                .json(new_expense),
        )
        .await
    }

    async fn get_expense(&self, id: ExpenseId) -> Result<Expense, ClientError> {
        let body: ExpenseBody = Self::send(self.client.get(self.expense_url(id)?)).await?;
        Ok(body.expense)
    }

    async fn delete_expense(&self, id: ExpenseId) -> Result<Expense, ClientError> {
        let body: ExpenseBody = Self::send(self.client.delete(self.expense_url(id)?)).await?;
        Ok(body.expense)
    }

    async fn total_spent(&self) -> Result<Amount, ClientError> {
        let body: TotalBody =
            Self::send(self.client.get(self.url(endpoints::EXPENSES_TOTAL)?)).await?;
        Ok(body.total)
    }

    async fn current_user(&self) -> Result<Identity, ClientError> {
        let body: UserBody = Self::send(self.client.get(self.url(endpoints::CURRENT_USER)?)).await?;
        Ok(body.user)
    }
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use reqwest::Url;

    use crate::{
        build_router,
        client::{ClientError, ExpensesApi, HttpExpensesApi},
        expense::{Amount, CreateExpense, ExpenseSchema, NewExpense},
        test_utils::{log_in, test_state},
    };

    /// Serve the API on a local port and return a client signed in as `user_id`.
    async fn signed_in_api(user_id: &str) -> HttpExpensesApi {
        let state = test_state();
        let test_server = TestServer::new(build_router(state.clone()));
        let session_cookie = log_in(&test_server, user_id).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let app = build_router(state);
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let base_url = Url::parse(&format!("http://{address}")).unwrap();
        HttpExpensesApi::new(base_url, session_cookie.value()).unwrap()
    }

    fn lunch() -> NewExpense {
        ExpenseSchema::validate(&CreateExpense {
            title: "Lunch".to_owned(),
            amount: "12.50".to_owned(),
            date: "2024-01-01".to_owned(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn create_list_total_and_delete() {
        let api = signed_in_api("kp_alice").await;

        let created = api.create_expense(&lunch()).await.unwrap();

        assert_eq!(created.title, lunch().title);
        assert_eq!(created.amount, Amount::from_cents(1250));
        assert_eq!(api.list_expenses().await.unwrap(), vec![created.clone()]);
        assert_eq!(api.get_expense(created.id).await.unwrap(), created);
        assert_eq!(api.total_spent().await.unwrap(), Amount::from_cents(1250));

        assert_eq!(api.delete_expense(created.id).await.unwrap(), created);
        assert_eq!(api.list_expenses().await.unwrap(), vec![]);
        assert_eq!(api.total_spent().await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn current_user_matches_session() {
        let api = signed_in_api("kp_alice").await;

        let user = api.current_user().await.unwrap();

        assert_eq!(user.id.as_str(), "kp_alice");
    }

    #[tokio::test]
    async fn missing_expense_is_status_error() {
        let api = signed_in_api("kp_alice").await;

        let error = api.get_expense(404).await.unwrap_err();

        assert_eq!(
            error,
            ClientError::Status {
                status: 404,
                message: "Not found".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn invalid_session_is_unauthorized() {
        let state = test_state();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let app = build_router(state);
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        let base_url = Url::parse(&format!("http://{address}")).unwrap();
        let api = HttpExpensesApi::new(base_url, "not-a-real-session").unwrap();

        let error = api.list_expenses().await.unwrap_err();

        assert!(error.is_unauthorized(), "got {error:?}, want 401");
    }
}
