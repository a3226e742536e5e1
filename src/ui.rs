use crate::app::{ActiveInput, App, AuthField, AuthMode, InputMode, Screen};
use crate::realtime::{self, ChannelStatus};
use crossterm::event::{self, Event as CEvent};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn get_legend(app: &App) -> Text<'static> {
    match app.screen {
        Screen::Auth => Text::from(Line::from(vec![
            Span::styled(" Tab ", Style::default().fg(Color::Red)),
            Span::raw(": Switch Field "),
            Span::styled(" Left/Right ", Style::default().fg(Color::Red)),
            Span::raw(": Sign In/Sign Up "),
            Span::styled(" Enter ", Style::default().fg(Color::Red)),
            Span::raw(": Submit "),
            Span::styled(" Esc ", Style::default().fg(Color::Red)),
            Span::raw(": Quit "),
        ])),
        Screen::Tasks => match app.input_mode {
            InputMode::Normal => Text::from(Line::from(vec![
                Span::styled(" q ", Style::default().fg(Color::Red)),
                Span::raw(": Quit "),
                Span::styled(" j/k ", Style::default().fg(Color::Red)),
                Span::raw(": Move "),
                Span::styled(" a ", Style::default().fg(Color::Red)),
                Span::raw(": Add "),
                Span::styled(" e ", Style::default().fg(Color::Red)),
                Span::raw(": Edit "),
                Span::styled(" d ", Style::default().fg(Color::Red)),
                Span::raw(": Delete "),
                Span::styled(" r ", Style::default().fg(Color::Red)),
                Span::raw(": Refresh "),
                Span::styled(" s ", Style::default().fg(Color::Red)),
                Span::raw(": Sign Out "),
            ])),
            InputMode::Editing => Text::from(Line::from(vec![
                Span::styled(" i ", Style::default().fg(Color::Red)),
                Span::raw(": Type "),
                Span::styled(" Tab ", Style::default().fg(Color::Red)),
                Span::raw(": Switch Field "),
                Span::styled(" Enter ", Style::default().fg(Color::Red)),
                Span::raw(": Submit "),
                Span::styled(" Esc ", Style::default().fg(Color::Red)),
                Span::raw(": Cancel "),
            ])),
            InputMode::Insert => Text::from(Line::from(vec![
                Span::styled(" Esc ", Style::default().fg(Color::Red)),
                Span::raw(": Stop Typing "),
            ])),
        },
    }
}

fn channel_label(status: Option<ChannelStatus>) -> &'static str {
    match status {
        Some(ChannelStatus::Joined) => "live",
        Some(ChannelStatus::Connected) => "connecting",
        Some(ChannelStatus::Closed) | None => "offline",
    }
}

fn draw_auth(f: &mut Frame, app: &App, area: Rect) {
    let box_area = centered_rect_absolute(50, 10, area);
    let title = match app.auth_mode {
        AuthMode::SignIn => "Sign In",
        AuthMode::SignUp => "Sign Up",
    };
    let outer = Block::default().borders(Borders::ALL).title(title);
    f.render_widget(Clear, box_area);
    f.render_widget(outer, box_area);

    let fields = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(box_area);

    let field_style = |active: bool| {
        if active {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        }
    };

    let email = Paragraph::new(app.auth_email.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Email")
            .style(field_style(app.auth_field == AuthField::Email)),
    );
    f.render_widget(email, fields[0]);

    let masked = "*".repeat(app.auth_password.chars().count());
    let password = Paragraph::new(masked).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Password")
            .style(field_style(app.auth_field == AuthField::Password)),
    );
    f.render_widget(password, fields[1]);
}

fn draw_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(area);

    let list_title = format!("Tasks ({})", channel_label(app.channel_status));

    // Left panel: task list
    let tasks_widget = if !app.tasks.is_empty() {
        let items: Vec<ListItem> = app
            .tasks
            .tasks()
            .iter()
            .map(|task| {
                let content = if task.image_url.is_some() {
                    vec![
                        Span::styled("IMG ", Style::default().fg(Color::Yellow)),
                        Span::raw(task.title.clone()),
                    ]
                } else {
                    vec![Span::raw(task.title.clone())]
                };
                ListItem::new(Line::from(content))
            })
            .collect();

        List::new(items)
            .block(Block::default().borders(Borders::ALL).title(list_title))
            .highlight_style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ")
    } else {
        List::new(vec![ListItem::new("No tasks yet")])
            .block(Block::default().borders(Borders::ALL).title(list_title))
    };

    f.render_stateful_widget(tasks_widget, chunks[0], &mut app.state);

    // Right panel: details for the selected task
    let detail_block = Block::default().borders(Borders::ALL).title("Task Details");

    if let Some(task) = app.selected_task() {
        let mut lines: Vec<Line<'static>> = Vec::new();

        lines.push(Line::from(vec![
            Span::styled("Created: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(task.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]));

        let owner = match &task.email {
            Some(email) => email.clone(),
            None => "Unknown".to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled("Owner: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(owner),
        ]));

        let image = match &task.image_url {
            Some(url) => url.clone(),
            None => "No image".to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled("Image: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(image),
        ]));

        lines.push(Line::from(vec![Span::styled(
            "Description: ",
            Style::default().add_modifier(Modifier::BOLD),
        )]));
        if task.description.trim().is_empty() {
            lines.push(Line::from(Span::raw("No description".to_string())));
        } else {
            for description_line in task.description.lines() {
                lines.push(Line::from(Span::raw(description_line.to_string())));
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(detail_block)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, chunks[1]);
    } else {
        let paragraph = Paragraph::new("Select a task to view details")
            .block(detail_block)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, chunks[1]);
    }
}

fn draw_form(f: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_absolute(area.width.saturating_sub(20).min(70), 11, area);

    let title = if app.edit_target.is_some() {
        "Update Task"
    } else {
        "New Task (add @path/to/image to attach a picture)"
    };
    let outer = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(Style::default().fg(Color::Green));
    f.render_widget(Clear, popup_area);
    f.render_widget(outer, popup_area);

    let fields = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(5),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(popup_area);

    let field_style = |active: bool| {
        if active {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::White)
        }
    };

    let title_input = Paragraph::new(app.form_title.as_str())
        .style(field_style(app.active_input == ActiveInput::Title))
        .block(Block::default().borders(Borders::ALL).title("Title"))
        .wrap(Wrap { trim: false });
    f.render_widget(title_input, fields[0]);

    let description_input = Paragraph::new(app.form_description.as_str())
        .style(field_style(app.active_input == ActiveInput::Description))
        .block(Block::default().borders(Borders::ALL).title("Description"))
        .wrap(Wrap { trim: false });
    f.render_widget(description_input, fields[1]);
}

fn draw_error(f: &mut Frame, message: &str, area: Rect) {
    let popup_area = centered_rect_absolute(area.width.saturating_sub(20).min(60), 5, area);
    let popup = Paragraph::new(vec![
        Line::from(Span::raw(message.to_string())),
        Line::from(Span::styled(
            "Press any key to dismiss",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Error")
            .style(Style::default().fg(Color::Red)),
    )
    .wrap(Wrap { trim: true });
    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    // Split the main layout into body and footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(size);

    let body_chunk = chunks[0];
    let footer_chunk = chunks[1];

    match app.screen {
        Screen::Auth => draw_auth(f, app, body_chunk),
        Screen::Tasks => {
            draw_tasks(f, app, body_chunk);
            match app.input_mode {
                InputMode::Normal => {}
                InputMode::Editing | InputMode::Insert => draw_form(f, app, body_chunk),
            }
        }
    }

    if let Some(message) = app.error.clone() {
        draw_error(f, &message, body_chunk);
    }

    let footer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)].as_ref())
        .split(footer_chunk);

    let legend = Paragraph::new(get_legend(app))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    f.render_widget(legend, footer[0]);

    if let Some(notice) = &app.notice {
        let notice = Paragraph::new(notice.as_str())
            .style(Style::default().fg(Color::Green))
            .alignment(Alignment::Left);
        f.render_widget(notice, footer[1]);
    }
}

// Main event loop: draw, drain the realtime channel, then poll the
// keyboard with a short timeout so pushed changes show up even when the
// user touches nothing.
pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut listener: Option<JoinHandle<()>> = None;

    loop {
        // Start or stop the change-notification listener as the session
        // gate flips.
        if app.is_authenticated() {
            if listener.is_none() {
                if let Some(session) = &app.session {
                    listener = Some(tokio::spawn(realtime::listen(
                        app.backend.realtime_url(),
                        session.access_token.clone(),
                        tx.clone(),
                    )));
                }
            }
        } else if let Some(handle) = listener.take() {
            handle.abort();
        }

        while let Ok(message) = rx.try_recv() {
            app.apply_realtime(message);
        }

        terminal.draw(|f| draw(f, &mut app))?;

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                let should_quit = app.handle_input(key).await?;
                if should_quit {
                    break;
                }
            }
        }
    }

    if let Some(handle) = listener.take() {
        handle.abort();
    }
    Ok(())
}
