use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row,
        Table, Tabs, Wrap,
    },
    Frame,
};
use rust_decimal::prelude::ToPrimitive;

use crate::cli::input::LineEdit;
use crate::cli::state::{
    App, CategoryField, CategoryForm, DeleteTarget, ExpenseField, ExpenseForm, Modal,
    SettingsForm, Tab,
};
use crate::cli::util::{self, fmt_money, icon_glyph, to_color};
use crate::database::models::SUPPORTED_CURRENCIES;
use crate::stats;

const ACCENT: Color = Color::Cyan;

pub fn draw(f: &mut Frame, app: &mut App) {
    // top tabs | main content | bottom status bar
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(1)])
        .split(f.area());

    let titles = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| Line::from(format!("{} {}", i + 1, t.title())))
        .collect::<Vec<_>>();
    let currency = app.profile.as_ref().map_or("USD", |p| p.currency.as_str());
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Expense Tracker [{currency}]")),
        )
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, root[0]);

    match app.tab {
        Tab::Dashboard => draw_dashboard(f, root[1], app),
        Tab::Expenses => draw_expenses(f, root[1], app),
        Tab::Categories => draw_categories(f, root[1], app),
        Tab::Help => draw_help(f, root[1]),
    }

    let status = Paragraph::new(app.status.as_str()).style(Style::default().fg(Color::DarkGray));
    f.render_widget(status, root[2]);

    if let Some(modal) = &app.modal {
        match modal {
            Modal::Expense(form) => {
                let area = center_rect(root[1], 60, 13);
                f.render_widget(Clear, area);
                draw_expense_form(f, area, form, app);
            }
            Modal::Category(form) => {
                let area = center_rect(root[1], 56, 11);
                f.render_widget(Clear, area);
                draw_category_form(f, area, form);
            }
            Modal::Settings(form) => {
                let area = center_rect(root[1], 40, SUPPORTED_CURRENCIES.len() as u16 + 4);
                f.render_widget(Clear, area);
                draw_settings(f, area, form);
            }
            Modal::ConfirmDelete(target) => {
                let area = center_rect(root[1], 60, 7);
                f.render_widget(Clear, area);
                draw_confirm(f, area, target);
            }
        }
    }
}

// Dashboard

fn draw_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(8)])
        .split(area);

    let Some(summary) = &app.summary else {
        f.render_widget(
            Paragraph::new("Loading…").block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };
    let symbol = app.currency_symbol();

    // Cards
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(rows[0]);
    let change = summary.this_month - summary.last_month;
    let change_style = if change > rust_decimal::Decimal::ZERO {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Green)
    };
    draw_card(f, cards[0], "This month", fmt_money(symbol, &summary.this_month), Style::default());
    draw_card(f, cards[1], "Last month", fmt_money(symbol, &summary.last_month), Style::default());
    draw_card(f, cards[2], "Change", fmt_money(symbol, &change), change_style);
    draw_card(
        f,
        cards[3],
        "All time",
        format!("{} ({} items)", fmt_money(symbol, &summary.total), summary.expense_count),
        Style::default(),
    );

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(body[1]);

    // Trend
    let bars: Vec<Bar> = summary
        .trend
        .iter()
        .map(|m| {
            Bar::default()
                .value(m.total.round().to_u64().unwrap_or(0))
                .text_value(m.total.round_dp(0).to_string())
                .label(Line::from(m.label.clone()))
                .style(Style::default().fg(ACCENT))
        })
        .collect();
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Monthly spending"))
        .data(BarGroup::default().bars(&bars))
        .bar_width(6)
        .bar_gap(2);
    f.render_widget(chart, body[0]);

    // Category shares
    let shares: Vec<ListItem> = summary
        .by_category
        .iter()
        .map(|s| {
            ListItem::new(Line::from(vec![
                Span::styled("██ ", Style::default().fg(to_color(&s.color))),
                Span::raw(format!("{} {:<18}", icon_glyph(&s.icon), s.name)),
                Span::raw(format!("{:>12} {:>5.1}%", fmt_money(symbol, &s.total), s.percent)),
            ]))
        })
        .collect();
    let shares = if shares.is_empty() {
        List::new([ListItem::new("No expenses yet. Press a to add one.")])
    } else {
        List::new(shares)
    };
    f.render_widget(
        shares.block(Block::default().borders(Borders::ALL).title("By category")),
        right[0],
    );

    // Recent activity
    let recent: Vec<ListItem> = summary
        .recent
        .iter()
        .map(|e| {
            let category = app.category(e.category_id);
            ListItem::new(Line::from(vec![
                Span::raw(format!("{}  ", util::iso(&e.date))),
                Span::styled(
                    format!("{:<16}", category.map_or("?", |c| c.name.as_str())),
                    Style::default().fg(category.map_or(Color::Gray, |c| to_color(&c.color))),
                ),
                Span::raw(format!("{:>12}  ", fmt_money(symbol, &e.amount))),
                Span::raw(e.description.clone()),
            ]))
        })
        .collect();
    f.render_widget(
        List::new(recent).block(Block::default().borders(Borders::ALL).title("Recent")),
        right[1],
    );
}

fn draw_card(f: &mut Frame, area: Rect, title: &str, value: String, style: Style) {
    let p = Paragraph::new(Line::from(Span::styled(value, style.add_modifier(Modifier::BOLD))))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(p, area);
}

// Expenses Page

fn draw_expenses(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(vec!["Date", "Category", "Description", "Amount"])
        .style(Style::default().add_modifier(Modifier::BOLD))
        .height(1);

    let symbol = app.currency_symbol().to_string();
    let body: Vec<Row> = app
        .expenses
        .iter()
        .map(|e| {
            let category = app.category(e.category_id);
            Row::new(vec![
                Cell::from(util::iso(&e.date)),
                Cell::from(Span::styled(
                    category.map_or_else(|| format!("#{}", e.category_id), |c| {
                        format!("{} {}", icon_glyph(&c.icon), c.name)
                    }),
                    Style::default().fg(category.map_or(Color::Gray, |c| to_color(&c.color))),
                )),
                Cell::from(e.description.clone()),
                Cell::from(fmt_money(&symbol, &e.amount)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Length(22),
        Constraint::Min(20),
        Constraint::Length(14),
    ];

    let title = format!("Expenses ({})  a=add  e=edit  x=delete", app.expenses.len());
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    f.render_stateful_widget(table, area, &mut app.expense_sel);
}

// Categories Page

fn draw_categories(f: &mut Frame, area: Rect, app: &mut App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let items: Vec<ListItem> = app
        .categories
        .iter()
        .map(|c| {
            let mut spans = vec![
                Span::styled("██ ", Style::default().fg(to_color(&c.color))),
                Span::raw(format!("{} {}", icon_glyph(&c.icon), c.name)),
            ];
            if c.is_default {
                spans.push(Span::styled("  (default)", Style::default().fg(Color::DarkGray)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Categories  a=add  e=edit  x=delete"),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    // Details
    let details = match app.selected_category() {
        Some(c) => {
            let count = app.expense_count(c.id);
            let spent = stats::category_total(&app.expenses, c.id);
            let mut text = format!(
                "Name: {}\nColor: {}\nIcon: {} {}\nExpenses: {}\nSpent: {}\nCreated: {}",
                c.name,
                c.color,
                icon_glyph(&c.icon),
                c.icon,
                count,
                fmt_money(app.currency_symbol(), &spent),
                c.created_at.format("%Y-%m-%d"),
            );
            if c.is_default {
                text.push_str(
                    "\n\nThis is your default category. Expenses from deleted categories move here.",
                );
            }
            Paragraph::new(text)
        }
        None => Paragraph::new("No category selected"),
    }
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("Details"));
    f.render_widget(details, cols[1]);

    f.render_stateful_widget(list, cols[0], &mut app.category_sel);
}

// Modals

fn field_line(label: &str, value: String, active: bool) -> Line<'static> {
    let style = if active {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(format!("{label:<12}: "), style),
        Span::raw(value),
    ])
}

fn with_cursor(edit: &LineEdit, active: bool) -> String {
    if !active {
        return edit.value.clone();
    }
    let mut shown: String = edit.value.chars().take(edit.cursor).collect();
    shown.push('▏');
    shown.extend(edit.value.chars().skip(edit.cursor));
    shown
}

fn error_line(error: &Option<String>) -> Line<'static> {
    Line::from(Span::styled(
        error.clone().unwrap_or_default(),
        Style::default().fg(Color::Red),
    ))
}

fn draw_expense_form(f: &mut Frame, area: Rect, form: &ExpenseForm, app: &App) {
    let category = app
        .categories
        .get(form.category)
        .map_or_else(|| "<none>".to_string(), |c| format!("◀ {} {} ▶", icon_glyph(&c.icon), c.name));
    let lines = vec![
        field_line(
            &format!("Amount ({})", app.currency_symbol()),
            with_cursor(&form.amount, form.focus == ExpenseField::Amount),
            form.focus == ExpenseField::Amount,
        ),
        field_line(
            "Description",
            with_cursor(&form.description, form.focus == ExpenseField::Description),
            form.focus == ExpenseField::Description,
        ),
        field_line(
            "Date",
            with_cursor(&form.date, form.focus == ExpenseField::Date),
            form.focus == ExpenseField::Date,
        ),
        field_line("Category", category, form.focus == ExpenseField::Category),
        Line::default(),
        Line::from("Tab: next field | ←/→: category | Enter: save | Esc: cancel"),
        error_line(&form.error),
    ];
    let title = if form.editing.is_some() { "Edit Expense" } else { "New Expense" };
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_category_form(f: &mut Frame, area: Rect, form: &CategoryForm) {
    let color = Line::from(vec![
        Span::styled(
            format!("{:<12}: ", "Color"),
            if form.focus == CategoryField::Color {
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            },
        ),
        Span::styled("██ ", Style::default().fg(to_color(&form.color))),
        Span::raw(form.color.clone()),
    ]);
    let lines = vec![
        field_line(
            "Name",
            with_cursor(&form.name, form.focus == CategoryField::Name),
            form.focus == CategoryField::Name,
        ),
        color,
        field_line(
            "Icon",
            format!("◀ {} {} ▶", icon_glyph(form.icon_id()), form.icon_id()),
            form.focus == CategoryField::Icon,
        ),
        Line::default(),
        Line::from("Tab: next field | ←/→: change | Enter: save | Esc: cancel"),
        error_line(&form.error),
    ];
    let title = if form.editing.is_some() { "Edit Category" } else { "New Category" };
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_settings(f: &mut Frame, area: Rect, form: &SettingsForm) {
    let items: Vec<ListItem> = SUPPORTED_CURRENCIES
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let line = format!("{:<4} {:<3} {}", c.code, c.symbol, c.name);
            let style = if i == form.selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            ListItem::new(line).style(style)
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Currency  (↑/↓, Enter, Esc)"),
    );
    f.render_widget(list, area);
}

fn draw_confirm(f: &mut Frame, area: Rect, target: &DeleteTarget) {
    let text = match target {
        DeleteTarget::Expense { label, .. } => format!("Delete the expense of {label}?"),
        DeleteTarget::Category { name, expenses: 0, .. } => format!("Delete category {name}?"),
        DeleteTarget::Category { name, expenses, .. } => format!(
            "Delete category {name}?\n{expenses} expense(s) will move to your default category."
        ),
    };
    let p = Paragraph::new(format!("{text}\n\ny: delete   n/Esc: keep"))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title("Confirm"),
        );
    f.render_widget(p, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help_text = [
        "Global Keys:",
        "  q          : Quit",
        "  Tab / 1-4  : Switch tabs",
        "  ?          : This help",
        "  s          : Settings (currency)",
        "  r          : Refresh data",
        "",
        "Dashboard:",
        "  a          : Add expense",
        "",
        "Expenses Tab:",
        "  Up/Down    : Navigate list",
        "  a          : Add expense",
        "  e / Enter  : Edit selected expense",
        "  x / Del    : Delete selected expense",
        "",
        "Categories Tab:",
        "  Up/Down    : Navigate list",
        "  a          : Add category",
        "  e / Enter  : Edit selected category",
        "  x / Del    : Delete selected category (its expenses move to the default)",
        "",
        "Forms:",
        "  Tab        : Next field",
        "  Left/Right : Choose category, color or icon",
        "  Enter      : Save",
        "  Esc        : Discard changes",
    ]
    .join("\n");

    let p = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("Help & Keybindings"));

    f.render_widget(p, area);
}

fn center_rect(rect: Rect, w: u16, h: u16) -> Rect {
    let x = rect.x + rect.width.saturating_sub(w) / 2;
    let y = rect.y + rect.height.saturating_sub(h) / 2;
    Rect { x, y, width: w.min(rect.width), height: h.min(rect.height) }
}
