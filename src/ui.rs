use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Block, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, AppMode, HitRegions, Status};
use crate::config::Scope;
use crate::confirm::ConfirmChoice;
use crate::lsof::PortRecord;

/// Rows per list item: title, description, spacer.
pub const ITEM_HEIGHT: u16 = 3;
const HEADER_HEIGHT: u16 = 4;
const FOOTER_HEIGHT: u16 = 3;
const DIALOG_HEIGHT: u16 = 10;
/// Below this many rows the header is dropped to leave room for the list.
const COMPACT_HEIGHT: u16 = 18;

/// Styling built once at startup and passed to every draw.
#[derive(Debug, Clone)]
pub struct Theme {
    pub title: String,
    pub description: String,
    pub info: String,
    pub accent: Color,
    pub border: Color,
    pub button: Color,
    pub button_text: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: "🧀 Gruyere".to_string(),
            description: "A tiny program for viewing + killing ports".to_string(),
            info: "Here's what's running...".to_string(),
            accent: Color::Rgb(238, 111, 248),
            border: Color::Rgb(135, 75, 253),
            button: Color::Rgb(136, 139, 126),
            button_text: Color::Rgb(255, 247, 219),
        }
    }
}

pub fn render(frame: &mut Frame, app: &mut App, theme: &Theme) {
    let header_height = if app.viewport().height < COMPACT_HEIGHT {
        0
    } else {
        HEADER_HEIGHT
    };
    let filter_height = if app.list().is_filtering() || !app.list().filter_text().is_empty() {
        1
    } else {
        0
    };

    let [header, filter, list, footer] = Layout::vertical([
        Constraint::Length(header_height),
        Constraint::Length(filter_height),
        Constraint::Min(0),
        Constraint::Length(FOOTER_HEIGHT),
    ])
    .areas(frame.area());

    if header_height > 0 {
        render_header(frame, header, &app.config().scope, theme);
    }
    if filter_height > 0 {
        render_filter(frame, filter, app, theme);
    }

    let mut regions = HitRegions {
        list: render_list(frame, list, app, theme),
        ..HitRegions::default()
    };
    render_status_and_help(frame, footer, app);

    if let AppMode::ConfirmingKill { record, choice } = app.mode() {
        let (yes, no) = render_confirmation_dialog(frame, record, *choice, theme);
        regions.yes = Some(yes);
        regions.no = Some(no);
    }

    app.set_regions(regions);
}

fn render_header(frame: &mut Frame, area: Rect, scope: &Scope, theme: &Theme) {
    let [title, desc, info, scope_line] = Layout::vertical([Constraint::Length(1); 4]).areas(area);

    frame.render_widget(
        Paragraph::new(theme.title.as_str()).style(Style::default().fg(theme.accent).bold()),
        title,
    );
    frame.render_widget(
        Paragraph::new(theme.description.as_str()).style(Style::default().fg(Color::Gray)),
        desc,
    );
    frame.render_widget(
        Paragraph::new(theme.info.as_str()).style(Style::default().fg(Color::DarkGray)),
        info,
    );

    if !scope.is_empty() {
        let mut parts = Vec::new();
        if let Some(port) = scope.port {
            parts.push(format!("port {port}"));
        }
        if let Some(user) = &scope.user {
            parts.push(format!("user {user}"));
        }
        if let Some(command) = &scope.command {
            parts.push(format!("command ~ {command}"));
        }
        frame.render_widget(
            Paragraph::new(format!("Only showing {}", parts.join(", ")))
                .style(Style::default().fg(Color::DarkGray).italic()),
            scope_line,
        );
    }
}

fn render_filter(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let list = app.list();
    let cursor = if list.is_filtering() { "_" } else { "" };
    let line = Line::from(vec![
        "Filter: ".fg(theme.accent).bold(),
        format!("{}{cursor}", list.filter_text()).fg(Color::White),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Draws the list and returns the inner area rows are laid out in.
fn render_list(frame: &mut Frame, area: Rect, app: &mut App, theme: &Theme) -> Rect {
    let list = app.list();
    let count = list.visible_len();
    let noun = if count == 1 { "process" } else { "processes" };
    let block = Block::bordered()
        .border_style(Style::default().fg(theme.border))
        .title(format!(" {count} {noun} "))
        .title_style(Style::default().fg(theme.border));
    let inner = block.inner(area);

    if count == 0 {
        let message = if list.total_len() == 0 {
            "No processes listening"
        } else {
            "No matches"
        };
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(Color::DarkGray))
                .centered()
                .block(block),
            area,
        );
        return inner;
    }

    let items: Vec<ListItem> = list
        .visible_items()
        .map(|item| {
            ListItem::new(vec![
                Line::from(item.title().to_string()).style(Style::default().fg(Color::White)),
                Line::from(item.description().to_string()).style(Style::default().fg(Color::Gray)),
                Line::from(""),
            ])
        })
        .collect();

    let widget = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(theme.accent).fg(Color::White))
        .highlight_symbol(">> ");

    frame.render_stateful_widget(widget, area, app.list_mut().state_mut());
    inner
}

fn render_status_and_help(frame: &mut Frame, area: Rect, app: &App) {
    let [status, help, _] = Layout::vertical([Constraint::Length(1); 3]).areas(area);

    match app.status() {
        Some(Status::Success(message)) => frame.render_widget(
            Paragraph::new(format!("✓ {message}")).style(Style::default().fg(Color::Green)),
            status,
        ),
        Some(Status::Failure(message)) => frame.render_widget(
            Paragraph::new(format!("✗ {message}")).style(Style::default().fg(Color::Red)),
            status,
        ),
        None => {}
    }

    let help_text = match app.mode() {
        AppMode::Browsing if app.list().is_filtering() => {
            "Type to filter • Enter: Apply • Esc: Clear • Backspace: Delete"
        }
        AppMode::Browsing => {
            "↑/k ↓/j: Navigate • Enter: Kill • /: Filter • r: Refresh • q/Esc: Quit"
        }
        AppMode::ConfirmingKill { .. } => {
            "←/h →/l: Select button • Enter: Confirm • y: Yes • n/Esc: No"
        }
    };

    frame.render_widget(
        Paragraph::new(help_text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        help,
    );
}

/// Draws the Yes/No dialog and returns the button areas.
fn render_confirmation_dialog(
    frame: &mut Frame,
    record: &PortRecord,
    choice: ConfirmChoice,
    theme: &Theme,
) -> (Rect, Rect) {
    let [_, popup, _] = Layout::vertical([
        Constraint::Percentage(30),
        Constraint::Length(DIALOG_HEIGHT),
        Constraint::Min(0),
    ])
    .areas(frame.area());
    let [_, popup, _] = Layout::horizontal([
        Constraint::Percentage(20),
        Constraint::Percentage(60),
        Constraint::Percentage(20),
    ])
    .areas(popup);

    frame.render_widget(Clear, popup);

    let [question, _, buttons] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .margin(1)
    .areas(popup);

    frame.render_widget(
        Paragraph::new(vec![
            Line::from(format!(
                "Are you sure you want to kill port :{}?",
                record.port
            )),
            Line::from(format!("{} ({}) owned by {}", record.command, record.pid, record.user))
                .style(Style::default().fg(Color::Gray)),
        ])
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true }),
        question,
    );

    let [yes, no] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(buttons);

    render_button(frame, yes, "Yes", choice.is_yes(), theme.accent, theme);
    render_button(
        frame,
        no,
        "No, take me back",
        !choice.is_yes(),
        theme.button,
        theme,
    );

    frame.render_widget(
        Block::bordered()
            .border_style(Style::default().fg(theme.border))
            .title("Confirm Action")
            .title_style(Style::default().fg(theme.border)),
        popup,
    );

    (yes, no)
}

fn render_button(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    active: bool,
    active_bg: Color,
    theme: &Theme,
) {
    let (text, style, border) = if active {
        (
            format!("► {label} ◄"),
            Style::default().fg(theme.button_text).bg(active_bg).underlined(),
            Style::default().fg(Color::Yellow).bold(),
        )
    } else {
        (
            label.to_string(),
            Style::default().fg(Color::White).bg(Color::Rgb(60, 60, 60)),
            Style::default().fg(Color::Gray),
        )
    };

    frame.render_widget(
        Paragraph::new(text)
            .style(style)
            .alignment(Alignment::Center)
            .block(Block::bordered().border_style(border)),
        area,
    );
}
