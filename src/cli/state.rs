// src/cli/state.rs
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::widgets::{ListState, TableState};

use crate::cli::api::Client;
use crate::cli::input::LineEdit;
use crate::cli::util::{self, ICONS, PALETTE};
use crate::database::models::{
    Category, Expense, NewCategory, NewExpense, Profile, UpdateCategory, UpdateExpense,
    MAX_AMOUNT, SUPPORTED_CURRENCIES,
};
use crate::error::AppError;
use crate::stats::{self, Summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Expenses,
    Categories,
    Help,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Dashboard, Tab::Expenses, Tab::Categories, Tab::Help];

    pub fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Expenses => "Expenses",
            Self::Categories => "Categories",
            Self::Help => "Help",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn step(self, delta: isize) -> Tab {
        let len = Self::ALL.len() as isize;
        let next = (self.index() as isize + delta).rem_euclid(len) as usize;
        Self::ALL[next]
    }
}

// ============= Expense form =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseField {
    Amount,
    Description,
    Date,
    Category,
}

impl ExpenseField {
    fn next(self) -> Self {
        match self {
            Self::Amount => Self::Description,
            Self::Description => Self::Date,
            Self::Date => Self::Category,
            Self::Category => Self::Amount,
        }
    }
    fn prev(self) -> Self {
        match self {
            Self::Amount => Self::Category,
            Self::Description => Self::Amount,
            Self::Date => Self::Description,
            Self::Category => Self::Date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpenseForm {
    pub editing: Option<i64>,
    pub amount: LineEdit,
    pub description: LineEdit,
    pub date: LineEdit,
    pub category: usize, // index into App::categories
    pub focus: ExpenseField,
    pub error: Option<String>,
}

impl ExpenseForm {
    pub fn create(categories: &[Category], today: chrono::NaiveDate) -> Self {
        Self {
            editing: None,
            amount: LineEdit::default(),
            description: LineEdit::default(),
            date: LineEdit::with(util::iso(&today)),
            category: categories.iter().position(|c| c.is_default).unwrap_or(0),
            focus: ExpenseField::Amount,
            error: None,
        }
    }

    pub fn edit(expense: &Expense, categories: &[Category]) -> Self {
        Self {
            editing: Some(expense.id),
            amount: LineEdit::with(expense.amount.to_string()),
            description: LineEdit::with(expense.description.clone()),
            date: LineEdit::with(util::iso(&expense.date)),
            category: categories
                .iter()
                .position(|c| c.id == expense.category_id)
                .unwrap_or(0),
            focus: ExpenseField::Amount,
            error: None,
        }
    }

    fn text_field(&mut self) -> Option<&mut LineEdit> {
        match self.focus {
            ExpenseField::Amount => Some(&mut self.amount),
            ExpenseField::Description => Some(&mut self.description),
            ExpenseField::Date => Some(&mut self.date),
            ExpenseField::Category => None,
        }
    }

    /// Local validation before anything is sent to storage.
    pub fn parse(&self, categories: &[Category]) -> Result<NewExpense, String> {
        let amount = match util::parse_money(self.amount.trimmed()) {
            None if self.amount.trimmed().is_empty() => return Err("Amount cannot be empty".into()),
            None => return Err("Invalid amount format".into()),
            Some(a) if a <= rust_decimal::Decimal::ZERO => {
                return Err("Amount must be greater than zero".into())
            }
            Some(a) if a > MAX_AMOUNT => return Err(format!("Amount cannot exceed {MAX_AMOUNT}")),
            Some(a) => a,
        };
        let date = util::parse_date(self.date.trimmed()).ok_or("Format: YYYY-MM-DD")?;
        let category = categories.get(self.category).ok_or("Category is required!")?;

        Ok(NewExpense {
            category_id: category.id,
            amount,
            description: self.description.trimmed().to_string(),
            date,
        })
    }
}

// ============= Category form =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    Name,
    Color,
    Icon,
}

impl CategoryField {
    fn next(self) -> Self {
        match self {
            Self::Name => Self::Color,
            Self::Color => Self::Icon,
            Self::Icon => Self::Name,
        }
    }
    fn prev(self) -> Self {
        match self {
            Self::Name => Self::Icon,
            Self::Color => Self::Name,
            Self::Icon => Self::Color,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryForm {
    pub editing: Option<i64>,
    pub name: LineEdit,
    pub color: String,
    pub icon: usize, // index into ICONS
    pub focus: CategoryField,
    pub error: Option<String>,
}

impl CategoryForm {
    pub fn create(categories: &[Category]) -> Self {
        let color = PALETTE
            .iter()
            .find(|c| !util::color_in_use(categories, c, None))
            .unwrap_or(&PALETTE[0]);
        Self {
            editing: None,
            name: LineEdit::default(),
            color: color.to_string(),
            icon: 0,
            focus: CategoryField::Name,
            error: None,
        }
    }

    pub fn edit(category: &Category) -> Self {
        Self {
            editing: Some(category.id),
            name: LineEdit::with(category.name.clone()),
            color: category.color.clone(),
            icon: ICONS.iter().position(|(id, _)| *id == category.icon).unwrap_or(0),
            focus: CategoryField::Name,
            error: None,
        }
    }

    fn cycle_color(&mut self, delta: isize) {
        let len = PALETTE.len() as isize;
        let current = PALETTE
            .iter()
            .position(|c| c.eq_ignore_ascii_case(&self.color))
            .map_or(-1, |i| i as isize);
        let next = (current + delta).rem_euclid(len) as usize;
        self.color = PALETTE[next].to_string();
    }

    fn cycle_icon(&mut self, delta: isize) {
        let len = ICONS.len() as isize;
        self.icon = (self.icon as isize + delta).rem_euclid(len) as usize;
    }

    pub fn icon_id(&self) -> &'static str {
        ICONS.get(self.icon).map_or("tag", |(id, _)| *id)
    }

    pub fn parse(&self, categories: &[Category]) -> Result<NewCategory, String> {
        let name = self.name.trimmed();
        if name.is_empty() {
            return Err("Name is required".into());
        }
        if util::color_in_use(categories, &self.color, self.editing) {
            return Err("Another category already uses this color".into());
        }
        Ok(NewCategory {
            name: name.to_string(),
            color: self.color.clone(),
            icon: self.icon_id().to_string(),
            is_default: false,
        })
    }
}

// ============= Other modals =============

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub selected: usize, // index into SUPPORTED_CURRENCIES
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Expense { id: i64, label: String },
    Category { id: i64, name: String, expenses: usize },
}

#[derive(Debug, Clone)]
pub enum Modal {
    Expense(ExpenseForm),
    Category(CategoryForm),
    Settings(SettingsForm),
    ConfirmDelete(DeleteTarget),
}

// ============= App =============

pub struct App {
    pub api: Client,
    pub tab: Tab,
    pub status: String,
    pub quit: bool,
    pub profile: Option<Profile>,
    pub categories: Vec<Category>,
    pub expenses: Vec<Expense>,
    pub summary: Option<Summary>,
    pub expense_sel: TableState,
    pub category_sel: ListState,
    pub modal: Option<Modal>,
}

impl App {
    pub fn new(api: Client) -> Self {
        Self {
            api,
            tab: Tab::Dashboard,
            status: "Press ? for help | q to quit".into(),
            quit: false,
            profile: None,
            categories: Vec::new(),
            expenses: Vec::new(),
            summary: None,
            expense_sel: TableState::default(),
            category_sel: ListState::default(),
            modal: None,
        }
    }

    pub fn currency_symbol(&self) -> &str {
        self.profile.as_ref().map_or("$", |p| p.currency_symbol.as_str())
    }

    pub fn category(&self, id: i64) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn expense_count(&self, category_id: i64) -> usize {
        self.expenses.iter().filter(|e| e.category_id == category_id).count()
    }

    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.profile = Some(self.api.profile().await?);
        self.categories = self.api.categories().await?;
        self.expenses = self.api.expenses().await?;
        self.summary = Some(stats::summarize(&self.expenses, &self.categories, util::today()));
        clamp(&mut self.expense_sel, self.expenses.len());
        clamp_list(&mut self.category_sel, self.categories.len());
        Ok(())
    }

    /// Refresh after a mutation and report failures in the status bar.
    async fn reload(&mut self) {
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "refresh failed");
            self.status = util::describe(&err);
        }
    }

    pub fn selected_expense(&self) -> Option<&Expense> {
        self.expenses.get(self.expense_sel.selected()?)
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.categories.get(self.category_sel.selected()?)
    }

    pub async fn handle_key(&mut self, k: KeyEvent) -> anyhow::Result<()> {
        if k.kind != KeyEventKind::Press {
            return Ok(());
        }
        if self.modal.is_some() {
            self.handle_modal_key(k).await;
            return Ok(());
        }

        match k.code {
            KeyCode::Char('q') => {
                self.quit = true;
                return Ok(());
            }
            KeyCode::Tab => {
                self.tab = self.tab.step(1);
                return Ok(());
            }
            KeyCode::BackTab => {
                self.tab = self.tab.step(-1);
                return Ok(());
            }
            KeyCode::Char(c @ '1'..='4') => {
                self.tab = Tab::ALL[(c as usize) - ('1' as usize)];
                return Ok(());
            }
            KeyCode::Char('?') => {
                self.tab = Tab::Help;
                return Ok(());
            }
            KeyCode::Char('s') => {
                self.open_settings();
                return Ok(());
            }
            KeyCode::Char('r') => {
                self.status = "Refreshed.".into();
                self.reload().await;
                return Ok(());
            }
            _ => {}
        }

        match self.tab {
            Tab::Dashboard => {
                if k.code == KeyCode::Char('a') {
                    self.open_new_expense();
                }
            }
            Tab::Expenses => match k.code {
                KeyCode::Up | KeyCode::Char('k') => move_table(&mut self.expense_sel, self.expenses.len(), -1),
                KeyCode::Down | KeyCode::Char('j') => move_table(&mut self.expense_sel, self.expenses.len(), 1),
                KeyCode::Char('a') => self.open_new_expense(),
                KeyCode::Char('e') | KeyCode::Enter => {
                    if let Some(expense) = self.selected_expense() {
                        self.modal = Some(Modal::Expense(ExpenseForm::edit(expense, &self.categories)));
                    }
                }
                KeyCode::Char('x') | KeyCode::Delete => {
                    if let Some(expense) = self.selected_expense() {
                        let label = format!(
                            "{} on {}",
                            util::fmt_money(self.currency_symbol(), &expense.amount),
                            util::iso(&expense.date)
                        );
                        self.modal = Some(Modal::ConfirmDelete(DeleteTarget::Expense { id: expense.id, label }));
                    }
                }
                KeyCode::Esc => self.tab = Tab::Dashboard,
                _ => {}
            },
            Tab::Categories => match k.code {
                KeyCode::Up | KeyCode::Char('k') => move_list(&mut self.category_sel, self.categories.len(), -1),
                KeyCode::Down | KeyCode::Char('j') => move_list(&mut self.category_sel, self.categories.len(), 1),
                KeyCode::Char('a') => self.modal = Some(Modal::Category(CategoryForm::create(&self.categories))),
                KeyCode::Char('e') | KeyCode::Enter => {
                    if let Some(category) = self.selected_category() {
                        self.modal = Some(Modal::Category(CategoryForm::edit(category)));
                    }
                }
                KeyCode::Char('x') | KeyCode::Delete => self.confirm_category_delete(),
                KeyCode::Esc => self.tab = Tab::Dashboard,
                _ => {}
            },
            Tab::Help => {
                if matches!(k.code, KeyCode::Esc | KeyCode::Char('b')) {
                    self.tab = Tab::Dashboard;
                }
            }
        }
        Ok(())
    }

    fn open_new_expense(&mut self) {
        if self.categories.is_empty() {
            self.status = "Create a category first.".into();
            return;
        }
        self.modal = Some(Modal::Expense(ExpenseForm::create(&self.categories, util::today())));
    }

    fn open_settings(&mut self) {
        let current = self.profile.as_ref().map(|p| p.currency.as_str()).unwrap_or("USD");
        let selected = SUPPORTED_CURRENCIES
            .iter()
            .position(|c| c.code == current)
            .unwrap_or(0);
        self.modal = Some(Modal::Settings(SettingsForm { selected }));
    }

    fn confirm_category_delete(&mut self) {
        let Some(category) = self.selected_category() else {
            return;
        };
        if category.is_default {
            self.status = format!("{} is the default category and can't be deleted.", category.name);
            return;
        }
        let target = DeleteTarget::Category {
            id: category.id,
            name: category.name.clone(),
            expenses: self.expense_count(category.id),
        };
        self.modal = Some(Modal::ConfirmDelete(target));
    }

    async fn handle_modal_key(&mut self, k: KeyEvent) {
        // Esc discards the pending form; nothing was sent yet.
        if k.code == KeyCode::Esc {
            self.modal = None;
            return;
        }
        let Some(modal) = self.modal.as_mut() else {
            return;
        };
        match modal {
            Modal::Expense(form) => match k.code {
                KeyCode::Enter => self.submit_expense().await,
                KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
                KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
                KeyCode::Left if form.focus == ExpenseField::Category => {
                    form.category = step_index(form.category, self.categories.len(), -1);
                }
                KeyCode::Right if form.focus == ExpenseField::Category => {
                    form.category = step_index(form.category, self.categories.len(), 1);
                }
                code => edit_text(form.text_field(), code),
            },
            Modal::Category(form) => match k.code {
                KeyCode::Enter => self.submit_category().await,
                KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
                KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
                KeyCode::Left if form.focus == CategoryField::Color => form.cycle_color(-1),
                KeyCode::Right if form.focus == CategoryField::Color => form.cycle_color(1),
                KeyCode::Left if form.focus == CategoryField::Icon => form.cycle_icon(-1),
                KeyCode::Right if form.focus == CategoryField::Icon => form.cycle_icon(1),
                code if form.focus == CategoryField::Name => edit_text(Some(&mut form.name), code),
                _ => {}
            },
            Modal::Settings(form) => match k.code {
                KeyCode::Up => form.selected = step_index(form.selected, SUPPORTED_CURRENCIES.len(), -1),
                KeyCode::Down => form.selected = step_index(form.selected, SUPPORTED_CURRENCIES.len(), 1),
                KeyCode::Enter => self.submit_settings().await,
                _ => {}
            },
            Modal::ConfirmDelete(_) => match k.code {
                KeyCode::Char('y') | KeyCode::Enter => self.submit_delete().await,
                KeyCode::Char('n') => self.modal = None,
                _ => {}
            },
        }
    }

    pub async fn submit_expense(&mut self) {
        let Some(Modal::Expense(form)) = self.modal.as_mut() else {
            return;
        };
        let new = match form.parse(&self.categories) {
            Ok(new) => new,
            Err(msg) => {
                form.error = Some(msg);
                return;
            }
        };

        let result = match form.editing {
            Some(id) => {
                let changes = UpdateExpense {
                    category_id: Some(new.category_id),
                    amount: Some(new.amount),
                    description: Some(new.description.clone()),
                    date: Some(new.date),
                };
                self.api.update_expense(id, &changes).await
            }
            None => self.api.create_expense(&new).await,
        };

        match result {
            Ok(saved) => {
                self.modal = None;
                self.status = format!(
                    "Saved {} ✓",
                    util::fmt_money(self.currency_symbol(), &saved.amount)
                );
                self.reload().await;
            }
            Err(err) => form.error = Some(util::describe(&err)),
        }
    }

    pub async fn submit_category(&mut self) {
        let Some(Modal::Category(form)) = self.modal.as_mut() else {
            return;
        };
        let new = match form.parse(&self.categories) {
            Ok(new) => new,
            Err(msg) => {
                form.error = Some(msg);
                return;
            }
        };

        let result = match form.editing {
            Some(id) => {
                let changes = UpdateCategory {
                    name: Some(new.name.clone()),
                    color: Some(new.color.clone()),
                    icon: Some(new.icon.clone()),
                };
                self.api.update_category(id, &changes).await
            }
            None => self.api.create_category(&new).await,
        };

        match result {
            Ok(saved) => {
                self.modal = None;
                self.status = format!("Saved category {}.", saved.name);
                self.reload().await;
            }
            Err(err) => form.error = Some(util::describe(&err)),
        }
    }

    async fn submit_settings(&mut self) {
        let Some(Modal::Settings(form)) = self.modal.as_ref() else {
            return;
        };
        let Some(currency) = SUPPORTED_CURRENCIES.get(form.selected) else {
            return;
        };
        self.modal = None;
        match self.api.set_currency(currency.code).await {
            Ok(profile) => {
                self.status = format!("Currency set to {} ({}).", profile.currency, profile.currency_symbol);
                self.profile = Some(profile);
            }
            Err(err) => self.status = util::describe(&err),
        }
    }

    pub async fn submit_delete(&mut self) {
        let Some(Modal::ConfirmDelete(target)) = self.modal.take() else {
            return;
        };
        match target {
            DeleteTarget::Expense { id, label } => match self.api.delete_expense(id).await {
                Ok(()) => self.status = format!("Deleted {label}."),
                Err(err) => self.status = util::describe(&err),
            },
            DeleteTarget::Category { id, name, .. } => match self.api.delete_category(id).await {
                Ok(outcome) => {
                    let fallback = self
                        .category(outcome.reassigned_to)
                        .map_or_else(|| "the default category".to_string(), |c| c.name.clone());
                    self.status = format!(
                        "Deleted {name}; moved {} expense(s) to {fallback}.",
                        outcome.reassigned_expenses
                    );
                }
                Err(err) => self.status = util::describe(&err),
            },
        }
        self.reload().await;
    }
}

fn edit_text(field: Option<&mut LineEdit>, code: KeyCode) {
    let Some(field) = field else {
        return;
    };
    match code {
        KeyCode::Char(c) => field.push(c),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Delete => field.delete(),
        KeyCode::Left => field.left(),
        KeyCode::Right => field.right(),
        KeyCode::Home => field.home(),
        KeyCode::End => field.end(),
        _ => {}
    }
}

fn step_index(current: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).rem_euclid(len as isize) as usize
}

fn move_table(sel: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        sel.select(None);
        return;
    }
    let cur = sel.selected().unwrap_or(0);
    sel.select(Some(step_index(cur, len, delta)));
}

fn move_list(sel: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        sel.select(None);
        return;
    }
    let cur = sel.selected().unwrap_or(0);
    sel.select(Some(step_index(cur, len, delta)));
}

fn clamp(sel: &mut TableState, len: usize) {
    match (len, sel.selected()) {
        (0, _) => sel.select(None),
        (n, Some(i)) if i >= n => sel.select(Some(n - 1)),
        (_, None) => sel.select(Some(0)),
        _ => {}
    }
}

fn clamp_list(sel: &mut ListState, len: usize) {
    match (len, sel.selected()) {
        (0, _) => sel.select(None),
        (n, Some(i)) if i >= n => sel.select(Some(n - 1)),
        (_, None) => sel.select(Some(0)),
        _ => {}
    }
}
