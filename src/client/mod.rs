//! The client side of the expense tracker.
//!
//! A UI builds on three pieces:
//! - [QueryClient] reads expenses through an [ExpenseCache] and applies
//!   optimistic updates when expenses are created or deleted,
//! - [ExpenseForm] tracks the "new expense" form and submits it through the
//!   [QueryClient],
//! - [Notifier] and [Navigator] are how the UI shows toasts and changes page.
//!
//! [HttpExpensesApi] talks to a server built with
//! [build_router](crate::build_router). Tests can swap in any other
//! [ExpensesApi].

mod api;
mod cache;
mod error;
mod form;
mod navigation;
mod notify;
mod query_client;

pub use api::{ExpensesApi, HttpExpensesApi};
pub use cache::{CacheCommand, ExpenseCache, QueryKey};
pub use error::ClientError;
pub use form::{ExpenseForm, FieldStatus, SubmitOutcome};
pub use navigation::{Navigator, Route};
pub use notify::{LogNotifier, Notification, NotificationKind, Notifier};
pub use query_client::QueryClient;
