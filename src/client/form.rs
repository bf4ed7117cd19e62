//! The "new expense" form: per-field validation state and submission.

use std::collections::BTreeMap;

use crate::{
    client::{ClientError, ExpensesApi, Navigator, Notifier, QueryClient, Route},
    expense::{CreateExpense, Expense, ExpenseSchema, Field, FieldError, ValidationErrors},
};

/// Where a field is in its lifecycle.
///
/// A field starts [FieldStatus::Pristine], becomes [FieldStatus::Touched]
/// when the user leaves it, and is [FieldStatus::Valid] or
/// [FieldStatus::Invalid] once its value has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldStatus {
    /// Neither edited nor visited.
    Pristine,
    /// Visited but its value has not been checked.
    Touched,
    /// The value passed validation.
    Valid,
    /// The value failed validation.
    Invalid(FieldError),
}

/// The result of [ExpenseForm::submit].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A submission was already in flight, so nothing happened.
    AlreadySubmitting,
    /// Some fields are invalid. The user stays on the form.
    Invalid(ValidationErrors),
    /// The expense was created and the form was reset.
    Created(Expense),
    /// The server did not create the expense. The form keeps its values.
    Failed(ClientError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FieldState {
    value: String,
    touched: bool,
    checked: Option<Result<(), FieldError>>,
}

impl FieldState {
    fn new(field: Field, value: String) -> Self {
        let checked = (!value.is_empty()).then(|| ExpenseSchema::validate_field(field, &value));
        Self {
            value,
            touched: false,
            checked,
        }
    }

    fn status(&self) -> FieldStatus {
        match (&self.checked, self.touched) {
            (Some(Ok(())), _) => FieldStatus::Valid,
            (Some(Err(error)), _) => FieldStatus::Invalid(error.clone()),
            (None, true) => FieldStatus::Touched,
            (None, false) => FieldStatus::Pristine,
        }
    }
}

/// A controlled form for creating an expense.
///
/// Every change is checked against [ExpenseSchema], the same rules the
/// server applies, but errors are only shown for fields the user has left or
/// tried to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseForm {
    defaults: CreateExpense,
    fields: BTreeMap<Field, FieldState>,
    submitting: bool,
}

impl Default for ExpenseForm {
    fn default() -> Self {
        Self::new(CreateExpense::default())
    }
}

impl ExpenseForm {
    /// Create a form pre-filled with `defaults`, e.g. today's date.
    ///
    /// Non-empty defaults are checked straight away so that a complete set
    /// of defaults can be submitted without editing.
    pub fn new(defaults: CreateExpense) -> Self {
        let fields = Field::ALL
            .into_iter()
            .map(|field| {
                let value = field_value(&defaults, field).to_owned();
                (field, FieldState::new(field, value))
            })
            .collect();

        Self {
            defaults,
            fields,
            submitting: false,
        }
    }

    /// The current text of `field`.
    pub fn value(&self, field: Field) -> &str {
        self.fields
            .get(&field)
            .map(|state| state.value.as_str())
            .unwrap_or_default()
    }

    /// The current values of every field.
    pub fn values(&self) -> CreateExpense {
        CreateExpense {
            title: self.value(Field::Title).to_owned(),
            amount: self.value(Field::Amount).to_owned(),
            date: self.value(Field::Date).to_owned(),
        }
    }

    /// Where `field` is in its lifecycle.
    pub fn status(&self, field: Field) -> FieldStatus {
        self.fields
            .get(&field)
            .map(FieldState::status)
            .unwrap_or(FieldStatus::Pristine)
    }

    /// Replace the text of `field` and check it.
    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        let state = self.fields.entry(field).or_default();
        state.value = value.into();
        state.checked = Some(ExpenseSchema::validate_field(field, &state.value));
    }

    /// Mark `field` as visited, e.g. when it loses focus.
    pub fn blur(&mut self, field: Field) {
        self.fields.entry(field).or_default().touched = true;
    }

    /// The errors to show: those of fields that are both touched and invalid.
    pub fn touched_errors(&self) -> BTreeMap<Field, FieldError> {
        self.fields
            .iter()
            .filter(|(_, state)| state.touched)
            .filter_map(|(field, state)| match state.status() {
                FieldStatus::Invalid(error) => Some((*field, error)),
                _ => None,
            })
            .collect()
    }

    /// Whether every field is valid and no submission is in flight.
    pub fn can_submit(&self) -> bool {
        !self.submitting
            && Field::ALL
                .into_iter()
                .all(|field| self.status(field) == FieldStatus::Valid)
    }

    /// Whether a submission is in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Clear the form back to its defaults.
    pub fn reset(&mut self) {
        *self = Self::new(self.defaults.clone());
    }

    /// Validate the form and create the expense.
    ///
    /// Every field is touched and checked first. If any is invalid, nothing
    /// is sent and the user stays on the form. Otherwise the user is sent to
    /// the expense list before the request starts, where the new expense is
    /// shown as a placeholder until the server responds.
    ///
    /// Dropping the returned future before it completes leaves the form
    /// ready to be submitted again.
    pub async fn submit<A, N>(
        &mut self,
        client: &mut QueryClient<A, N>,
        navigator: &mut impl Navigator,
    ) -> SubmitOutcome
    where
        A: ExpensesApi,
        N: Notifier,
    {
        if self.submitting {
            tracing::debug!("ignoring submit while a submission is in flight");
            return SubmitOutcome::AlreadySubmitting;
        }

        let new_expense = match ExpenseSchema::validate(&self.values()) {
            Ok(new_expense) => {
                self.mark_checked(&ValidationErrors::default());
                new_expense
            }
            Err(errors) => {
                self.mark_checked(&errors);
                return SubmitOutcome::Invalid(errors);
            }
        };

        let submitting = Submitting::start(&mut self.submitting);
        navigator.navigate(Route::Expenses);
        let result = client.create_expense(new_expense).await;
        drop(submitting);

        match result {
            Ok(expense) => {
                self.reset();
                SubmitOutcome::Created(expense)
            }
            Err(error) => SubmitOutcome::Failed(error),
        }
    }

    /// Touch every field and record the outcome of a full validation.
    fn mark_checked(&mut self, errors: &ValidationErrors) {
        for field in Field::ALL {
            let state = self.fields.entry(field).or_default();
            state.touched = true;
            state.checked = Some(match errors.get(field).first() {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            });
        }
    }
}

/// Marks a form as submitting until dropped.
struct Submitting<'a>(&'a mut bool);

impl<'a> Submitting<'a> {
    fn start(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

fn field_value(expense: &CreateExpense, field: Field) -> &str {
    match field {
        Field::Title => &expense.title,
        Field::Amount => &expense.amount,
        Field::Date => &expense.date,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::{
        client::{ExpenseForm, FieldStatus, NotificationKind, QueryClient, Route, SubmitOutcome},
        expense::{CreateExpense, ExpenseSchema, Field, FieldError},
        test_utils::{
            ApiCall, Event, EventLog, FakeExpensesApi, RecordingNavigator, RecordingNotifier,
        },
    };

    fn filled_form() -> ExpenseForm {
        let mut form = ExpenseForm::default();
        form.set_value(Field::Title, "Lunch");
        form.set_value(Field::Amount, "12.50");
        form.set_value(Field::Date, "2024-01-01");
        form
    }

    /// Submit `form` with the create request held open, check that the
    /// placeholder is shown after navigating and while the request is in
    /// flight, then let the request finish.
    async fn submit_held_open(
        form: &mut ExpenseForm,
        client: &mut QueryClient<FakeExpensesApi, RecordingNotifier>,
        navigator: &mut RecordingNavigator,
        events: &EventLog,
    ) -> SubmitOutcome {
        let gate = client.api().hold_creates();
        let mut placeholder = client.watch_pending_create();
        let new_expense = ExpenseSchema::validate(&form.values()).unwrap();

        let submit = form.submit(client, navigator);
        tokio::pin!(submit);

        tokio::select! {
            biased;
            outcome = &mut submit => panic!("got {outcome:?} before the server responded"),
            changed = placeholder.changed() => changed.unwrap(),
        }
        assert_eq!(*placeholder.borrow_and_update(), Some(new_expense));
        assert_eq!(
            events.events(),
            vec![
                Event::Navigate(Route::Expenses),
                Event::Api(ApiCall::CreateExpense)
            ]
        );

        gate.release();
        let outcome = submit.await;

        assert_eq!(*placeholder.borrow(), None);
        outcome
    }

    fn client_and_navigator() -> (
        QueryClient<FakeExpensesApi, RecordingNotifier>,
        RecordingNavigator,
        EventLog,
    ) {
        let events = EventLog::default();
        let api = FakeExpensesApi::default().with_event_log(events.clone());
        let client = QueryClient::new(api, RecordingNotifier::default());
        let navigator = RecordingNavigator::new(events.clone());

        (client, navigator, events)
    }

    #[test]
    fn new_form_is_pristine() {
        let form = ExpenseForm::default();

        for field in Field::ALL {
            assert_eq!(form.status(field), FieldStatus::Pristine);
        }
        assert!(!form.can_submit());
        assert!(!form.is_submitting());
        assert!(form.touched_errors().is_empty());
    }

    #[test]
    fn blur_touches_field() {
        let mut form = ExpenseForm::default();

        form.blur(Field::Title);

        assert_eq!(form.status(Field::Title), FieldStatus::Touched);
        assert_eq!(form.status(Field::Amount), FieldStatus::Pristine);
    }

    #[test]
    fn changes_are_validated() {
        let mut form = ExpenseForm::default();

        form.set_value(Field::Title, "ab");
        assert_eq!(
            form.status(Field::Title),
            FieldStatus::Invalid(FieldError::TooShort { min: 3 })
        );

        form.set_value(Field::Title, "abc");
        assert_eq!(form.status(Field::Title), FieldStatus::Valid);
    }

    #[test]
    fn errors_are_only_shown_for_touched_fields() {
        let mut form = ExpenseForm::default();
        form.set_value(Field::Amount, "-1");

        assert!(form.touched_errors().is_empty());

        form.blur(Field::Amount);
        assert_eq!(
            form.touched_errors().get(&Field::Amount),
            Some(&FieldError::NotPositive)
        );
    }

    #[test]
    fn defaults_are_validated() {
        let form = ExpenseForm::new(CreateExpense {
            date: "2024-01-01".to_owned(),
            ..Default::default()
        });

        assert_eq!(form.status(Field::Date), FieldStatus::Valid);
        assert_eq!(form.status(Field::Title), FieldStatus::Pristine);
        assert_eq!(form.value(Field::Date), "2024-01-01");
    }

    #[test]
    fn can_submit_requires_every_field_valid() {
        let mut form = filled_form();
        assert!(form.can_submit());

        form.set_value(Field::Date, "yesterday");
        assert!(!form.can_submit());
    }

    #[test]
    fn cannot_submit_while_submitting() {
        let mut form = filled_form();

        form.submitting = true;

        assert!(!form.can_submit());
        assert!(form.is_submitting());
    }

    #[tokio::test]
    async fn submit_while_submitting_does_nothing() {
        let (mut client, mut navigator, events) = client_and_navigator();
        let mut form = filled_form();
        form.submitting = true;

        let outcome = form.submit(&mut client, &mut navigator).await;

        assert_eq!(outcome, SubmitOutcome::AlreadySubmitting);
        assert!(events.events().is_empty());
    }

    #[tokio::test]
    async fn invalid_submit_touches_fields_and_stays_on_form() {
        let (mut client, mut navigator, events) = client_and_navigator();
        let mut form = ExpenseForm::default();
        form.set_value(Field::Title, "Lunch");

        let outcome = form.submit(&mut client, &mut navigator).await;

        let SubmitOutcome::Invalid(errors) = outcome else {
            panic!("got {outcome:?}, want invalid");
        };
        assert_eq!(errors.get(Field::Amount), [FieldError::Required]);
        assert_eq!(errors.get(Field::Date), [FieldError::Required]);
        assert_eq!(form.status(Field::Title), FieldStatus::Valid);
        assert_eq!(
            form.touched_errors().keys().copied().collect::<Vec<_>>(),
            vec![Field::Amount, Field::Date]
        );
        assert!(events.events().is_empty(), "should not navigate or send");
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn submit_navigates_before_creating() {
        let (mut client, mut navigator, events) = client_and_navigator();
        let mut form = filled_form();

        let outcome = form.submit(&mut client, &mut navigator).await;

        assert!(matches!(outcome, SubmitOutcome::Created(_)));
        assert_eq!(
            events.events(),
            vec![
                Event::Navigate(Route::Expenses),
                Event::Api(ApiCall::CreateExpense)
            ]
        );
    }

    #[tokio::test]
    async fn successful_submit_resets_form() {
        let (mut client, mut navigator, _) = client_and_navigator();
        let mut form = filled_form();

        let outcome = form.submit(&mut client, &mut navigator).await;

        let SubmitOutcome::Created(expense) = outcome else {
            panic!("got {outcome:?}, want created");
        };
        assert_eq!(expense.title.to_string(), "Lunch");
        assert_eq!(form, ExpenseForm::default());
        assert_eq!(client.cache().pending_create(), None);
    }

    #[tokio::test]
    async fn failed_submit_keeps_values() {
        let (mut client, mut navigator, _) = client_and_navigator();
        client.api().fail_requests();
        let mut form = filled_form();

        let outcome = form.submit(&mut client, &mut navigator).await;

        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert_eq!(form.value(Field::Title), "Lunch");
        assert!(!form.is_submitting());
        assert!(form.can_submit());
        assert_eq!(client.cache().pending_create(), None);
    }

    #[tokio::test]
    async fn placeholder_is_shown_until_create_succeeds() {
        let (mut client, mut navigator, events) = client_and_navigator();
        let mut form = filled_form();

        let outcome = submit_held_open(&mut form, &mut client, &mut navigator, &events).await;

        assert!(matches!(outcome, SubmitOutcome::Created(_)));
        assert_eq!(client.cache().pending_create(), None);
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn placeholder_is_shown_until_create_fails() {
        let (mut client, mut navigator, events) = client_and_navigator();
        client.api().fail_requests();
        let mut form = filled_form();

        let outcome = submit_held_open(&mut form, &mut client, &mut navigator, &events).await;

        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert_eq!(client.cache().pending_create(), None);
        assert!(!form.is_submitting());
        assert_eq!(
            client.notifier().notifications()[0].kind,
            NotificationKind::Error
        );
    }

    #[tokio::test]
    async fn cancelled_submit_can_be_submitted_again() {
        let (mut client, mut navigator, _) = client_and_navigator();
        let gate = client.api().hold_creates();
        let mut form = filled_form();

        let result = timeout(
            Duration::from_millis(50),
            form.submit(&mut client, &mut navigator),
        )
        .await;

        assert!(result.is_err(), "submit should still be waiting for the server");
        assert!(!form.is_submitting());
        assert!(form.can_submit());
        assert_eq!(client.cache().pending_create(), None);

        gate.release();
        let outcome = form.submit(&mut client, &mut navigator).await;

        assert!(matches!(outcome, SubmitOutcome::Created(_)));
        assert_eq!(client.cache().pending_create(), None);
    }
}
