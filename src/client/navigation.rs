//! The client-side routes and the seam for moving between them.

/// A page in the client app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The landing page showing the total spent.
    Home,
    /// The list of expenses.
    Expenses,
    /// The form for creating an expense.
    CreateExpense,
    /// The signed-in user's profile.
    Profile,
}

impl Route {
    /// The path of the page.
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Expenses => "/expenses",
            Route::CreateExpense => "/create-expense",
            Route::Profile => "/profile",
        }
    }
}

/// Something that can move the user to another page.
pub trait Navigator {
    /// Show `route`.
    fn navigate(&mut self, route: Route);
}
