//! Reads through the cache and mutations that patch it.

use tokio::sync::watch;

use crate::{
    auth::Identity,
    client::{
        CacheCommand, ClientError, ExpenseCache, ExpensesApi, Notification, Notifier, QueryKey,
    },
    database_id::ExpenseId,
    expense::{Amount, Expense, NewExpense},
};

/// Owns the expense API and the cache of its results.
///
/// Queries serve fresh cache entries and fetch everything else. Mutations
/// update the cache from the server's response without refetching, and
/// report their outcome through the [Notifier].
#[derive(Debug)]
pub struct QueryClient<A, N> {
    api: A,
    cache: ExpenseCache,
    notifier: N,
    pending_create: watch::Sender<Option<NewExpense>>,
}

/// The placeholder for an expense being created.
///
/// Dropping it clears the placeholder, including when the creating future is
/// cancelled before the server responds.
struct PendingCreate<'a> {
    cache: &'a mut ExpenseCache,
    watchers: &'a watch::Sender<Option<NewExpense>>,
}

impl<'a> PendingCreate<'a> {
    fn begin(
        cache: &'a mut ExpenseCache,
        watchers: &'a watch::Sender<Option<NewExpense>>,
        new_expense: NewExpense,
    ) -> Self {
        apply_and_publish(cache, watchers, CacheCommand::BeginPendingCreate(new_expense));

        Self { cache, watchers }
    }

    fn finish(mut self, expense: Expense) {
        apply_and_publish(
            &mut *self.cache,
            self.watchers,
            CacheCommand::ApplyOptimisticCreate(expense),
        );
    }
}

impl Drop for PendingCreate<'_> {
    fn drop(&mut self) {
        if self.cache.pending_create().is_some() {
            apply_and_publish(
                self.cache,
                self.watchers,
                CacheCommand::RollbackOptimisticCreate,
            );
        }
    }
}

fn apply_and_publish(
    cache: &mut ExpenseCache,
    watchers: &watch::Sender<Option<NewExpense>>,
    command: CacheCommand,
) {
    cache.apply(command);
    watchers.send_replace(cache.pending_create().cloned());
}

impl<A, N> QueryClient<A, N>
where
    A: ExpensesApi,
    N: Notifier,
{
    /// Create a client with an empty cache.
    pub fn new(api: A, notifier: N) -> Self {
        let (pending_create, _) = watch::channel(None);

        Self {
            api,
            cache: ExpenseCache::new(),
            notifier,
            pending_create,
        }
    }

    /// The cached query results.
    pub fn cache(&self) -> &ExpenseCache {
        &self.cache
    }

    /// The API requests are sent to.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Where mutation outcomes are reported.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Follow the pending creation placeholder.
    ///
    /// The cache cannot be read while a mutation holds the client, so a list
    /// view watches this to show the placeholder as soon as it is set.
    pub fn watch_pending_create(&self) -> watch::Receiver<Option<NewExpense>> {
        self.pending_create.subscribe()
    }

    /// Change the cache directly, e.g. to invalidate a query.
    pub fn apply(&mut self, command: CacheCommand) {
        apply_and_publish(&mut self.cache, &self.pending_create, command);
    }

    /// The user's most recent expenses, newest first.
    ///
    /// # Errors
    ///
    /// Returns the [ClientError] from the API if the list had to be fetched
    /// and the request failed.
    pub async fn expenses(&mut self) -> Result<&[Expense], ClientError> {
        if !self.cache.is_fresh(QueryKey::Expenses) {
            let expenses = self
                .api
                .list_expenses()
                .await
                .inspect_err(|error| tracing::warn!("could not fetch expenses: {error}"))?;
            self.cache.store_expenses(expenses);
        }

        Ok(self.cache.expenses().unwrap_or_default())
    }

    /// A single expense.
    ///
    /// # Errors
    ///
    /// Returns the [ClientError] from the API if the expense had to be
    /// fetched and the request failed.
    pub async fn expense(&mut self, id: ExpenseId) -> Result<Expense, ClientError> {
        if self.cache.is_fresh(QueryKey::Expense(id))
            && let Some(expense) = self.cache.expense(id)
        {
            return Ok(expense.clone());
        }

        let expense = self
            .api
            .get_expense(id)
            .await
            .inspect_err(|error| tracing::warn!("could not fetch expense {id}: {error}"))?;
        self.cache.store_expense(expense.clone());

        Ok(expense)
    }

    /// The sum of all the user's expenses.
    ///
    /// # Errors
    ///
    /// Returns the [ClientError] from the API if the total had to be fetched
    /// and the request failed.
    pub async fn total_spent(&mut self) -> Result<Amount, ClientError> {
        if self.cache.is_fresh(QueryKey::TotalSpent)
            && let Some(total) = self.cache.total_spent()
        {
            return Ok(total);
        }

        let total = self
            .api
            .total_spent()
            .await
            .inspect_err(|error| tracing::warn!("could not fetch total spent: {error}"))?;
        self.cache.store_total_spent(total);

        Ok(total)
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns the [ClientError] from the API if the user had to be fetched
    /// and the request failed, e.g. [ClientError::is_unauthorized] when
    /// nobody is signed in.
    pub async fn current_user(&mut self) -> Result<Identity, ClientError> {
        if self.cache.is_fresh(QueryKey::CurrentUser)
            && let Some(identity) = self.cache.current_user()
        {
            return Ok(identity.clone());
        }

        let identity = self
            .api
            .current_user()
            .await
            .inspect_err(|error| tracing::warn!("could not fetch current user: {error}"))?;
        self.cache.store_current_user(identity.clone());

        Ok(identity)
    }

    /// Create an expense, showing a placeholder for it while the request is
    /// in flight.
    ///
    /// On success the new expense is added to the cached queries. On failure
    /// the cache is left as it was before the call. The placeholder is
    /// cleared and a notification is sent either way. If the returned future
    /// is dropped before the server responds, the placeholder is cleared and
    /// nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns the [ClientError] from the API if the request failed.
    pub async fn create_expense(&mut self, new_expense: NewExpense) -> Result<Expense, ClientError> {
        let pending =
            PendingCreate::begin(&mut self.cache, &self.pending_create, new_expense.clone());

        match self.api.create_expense(&new_expense).await {
            Ok(expense) => {
                pending.finish(expense.clone());
                self.notifier.notify(Notification::success(
                    "Expense created",
                    format!("Created expense \"{}\".", expense.title),
                ));

                Ok(expense)
            }
            Err(error) => {
                drop(pending);
                tracing::error!("could not create expense: {error}");
                self.notifier.notify(Notification::error(
                    "Error",
                    "Failed to create new expense.",
                ));

                Err(error)
            }
        }
    }

    /// Delete an expense and remove it from the cached queries.
    ///
    /// A notification is sent either way. The cache is not changed if the
    /// request fails.
    ///
    /// # Errors
    ///
    /// Returns the [ClientError] from the API if the request failed.
    pub async fn delete_expense(&mut self, id: ExpenseId) -> Result<Expense, ClientError> {
        match self.api.delete_expense(id).await {
            Ok(expense) => {
                self.cache
                    .apply(CacheCommand::ApplyDelete(expense.clone()));
                self.notifier.notify(Notification::success(
                    "Expense deleted",
                    format!("Deleted expense \"{}\".", expense.title),
                ));

                Ok(expense)
            }
            Err(error) => {
                tracing::error!("could not delete expense {id}: {error}");
                self.notifier
                    .notify(Notification::error("Error", "Failed to delete expense."));

                Err(error)
            }
        }
    }
}
