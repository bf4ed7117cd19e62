//! Cached query results and the commands that change them.
//!
//! Every change to the cache goes through [ExpenseCache::apply] with a
//! [CacheCommand], so optimistic updates and rollbacks can be tested without
//! a server.

use std::collections::HashMap;

use crate::{
    auth::Identity,
    database_id::ExpenseId,
    expense::{Amount, Expense, MAX_LIST_LIMIT, NewExpense},
};

/// Identifies one cached query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The list of the user's most recent expenses.
    Expenses,
    /// A single expense.
    Expense(ExpenseId),
    /// The total amount the user has spent.
    TotalSpent,
    /// The signed-in user.
    CurrentUser,
}

/// A change to the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheCommand {
    /// Remember an expense that is being created so that the list can show a
    /// placeholder for it.
    BeginPendingCreate(NewExpense),
    /// Add an expense the server just created to the cached queries without
    /// refetching them, and clear the placeholder.
    ApplyOptimisticCreate(Expense),
    /// Clear the placeholder after creating an expense failed.
    RollbackOptimisticCreate,
    /// Remove an expense the server just deleted from the cached queries and
    /// subtract its amount from the cached total.
    ApplyDelete(Expense),
    /// Mark a query as stale so that the next read fetches it again.
    Invalidate(QueryKey),
}

#[derive(Debug, Clone, PartialEq)]
struct Entry<T> {
    value: T,
    fresh: bool,
}

impl<T> Entry<T> {
    fn fresh(value: T) -> Self {
        Self { value, fresh: true }
    }
}

/// Query results from the expense API, each marked fresh or stale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseCache {
    expenses: Option<Entry<Vec<Expense>>>,
    expense_by_id: HashMap<ExpenseId, Entry<Expense>>,
    total_spent: Option<Entry<Amount>>,
    current_user: Option<Entry<Identity>>,
    pending_create: Option<NewExpense>,
}

impl ExpenseCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the result for `key` is cached and has not been invalidated.
    pub fn is_fresh(&self, key: QueryKey) -> bool {
        match key {
            QueryKey::Expenses => self.expenses.as_ref().is_some_and(|entry| entry.fresh),
            QueryKey::Expense(id) => self
                .expense_by_id
                .get(&id)
                .is_some_and(|entry| entry.fresh),
            QueryKey::TotalSpent => self.total_spent.as_ref().is_some_and(|entry| entry.fresh),
            QueryKey::CurrentUser => self.current_user.as_ref().is_some_and(|entry| entry.fresh),
        }
    }

    /// The cached list of expenses, fresh or stale.
    pub fn expenses(&self) -> Option<&[Expense]> {
        self.expenses.as_ref().map(|entry| entry.value.as_slice())
    }

    /// The cached expense `id`, fresh or stale.
    pub fn expense(&self, id: ExpenseId) -> Option<&Expense> {
        self.expense_by_id.get(&id).map(|entry| &entry.value)
    }

    /// The cached total, fresh or stale.
    pub fn total_spent(&self) -> Option<Amount> {
        self.total_spent.as_ref().map(|entry| entry.value)
    }

    /// The cached signed-in user, fresh or stale.
    pub fn current_user(&self) -> Option<&Identity> {
        self.current_user.as_ref().map(|entry| &entry.value)
    }

    /// The expense being created, if a create request is in flight.
    ///
    /// The expense list should show this alongside [ExpenseCache::expenses].
    pub fn pending_create(&self) -> Option<&NewExpense> {
        self.pending_create.as_ref()
    }

    /// Store a freshly fetched list of expenses.
    pub fn store_expenses(&mut self, expenses: Vec<Expense>) {
        self.expenses = Some(Entry::fresh(expenses));
    }

    /// Store a freshly fetched expense.
    pub fn store_expense(&mut self, expense: Expense) {
        self.expense_by_id.insert(expense.id, Entry::fresh(expense));
    }

    /// Store a freshly fetched total.
    pub fn store_total_spent(&mut self, total: Amount) {
        self.total_spent = Some(Entry::fresh(total));
    }

    /// Store the freshly fetched signed-in user.
    pub fn store_current_user(&mut self, identity: Identity) {
        self.current_user = Some(Entry::fresh(identity));
    }

    /// Change the cache according to `command`.
    pub fn apply(&mut self, command: CacheCommand) {
        match command {
            CacheCommand::BeginPendingCreate(new_expense) => {
                self.pending_create = Some(new_expense);
            }
            CacheCommand::ApplyOptimisticCreate(expense) => self.apply_create(expense),
            CacheCommand::RollbackOptimisticCreate => {
                self.pending_create = None;
            }
            CacheCommand::ApplyDelete(expense) => self.apply_delete(&expense),
            CacheCommand::Invalidate(key) => self.invalidate(key),
        }
    }

    fn apply_create(&mut self, expense: Expense) {
        self.pending_create = None;

        if let Some(entry) = &mut self.expenses
            && !entry.value.iter().any(|cached| cached.id == expense.id)
        {
            entry.value.insert(0, expense.clone());
            entry.value.truncate(MAX_LIST_LIMIT as usize);
        }

        self.adjust_total(|total| total.checked_add(expense.amount));
        self.store_expense(expense);
    }

    fn apply_delete(&mut self, deleted: &Expense) {
        if let Some(entry) = &mut self.expenses {
            entry.value.retain(|expense| expense.id != deleted.id);
        }
        self.expense_by_id.remove(&deleted.id);

        self.adjust_total(|total| total.checked_sub(deleted.amount));
    }

    /// Update a cached total in place, or mark it stale if `update` fails.
    fn adjust_total(&mut self, update: impl FnOnce(Amount) -> Option<Amount>) {
        if let Some(entry) = &mut self.total_spent {
            match update(entry.value) {
                Some(total) => entry.value = total,
                None => entry.fresh = false,
            }
        }
    }

    fn invalidate(&mut self, key: QueryKey) {
        match key {
            QueryKey::Expenses => {
                if let Some(entry) = &mut self.expenses {
                    entry.fresh = false;
                }
            }
            QueryKey::Expense(id) => {
                if let Some(entry) = self.expense_by_id.get_mut(&id) {
                    entry.fresh = false;
                }
            }
            QueryKey::TotalSpent => {
                if let Some(entry) = &mut self.total_spent {
                    entry.fresh = false;
                }
            }
            QueryKey::CurrentUser => {
                if let Some(entry) = &mut self.current_user {
                    entry.fresh = false;
                }
            }
        }
    }
}
