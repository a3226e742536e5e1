use crate::api::Backend;
use crate::models::{NewTask, Session, Task, TaskPatch};
use crate::parser::parse_task_input;
use crate::realtime::{ChannelStatus, RealtimeMessage};
use crate::reconciler::TaskList;
use crate::session;
use crossterm::event::KeyCode;
use ratatui::widgets::ListState;
use std::fs;
use std::io;
use std::path::Path;

pub enum Screen {
    Auth,
    Tasks,
}

pub enum InputMode {
    Normal,
    Editing,
    Insert,
}

#[derive(PartialEq)]
pub enum ActiveInput {
    Title,
    Description,
}

#[derive(PartialEq)]
pub enum AuthField {
    Email,
    Password,
}

#[derive(PartialEq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

// Values the edit form opened with, kept to detect a no-change submit.
pub struct EditTarget {
    pub id: i64,
    pub opened_title: String,
    pub opened_description: String,
}

/// Checks the add-task form. A user-visible message comes back instead of
/// a network call when a required field is empty.
pub fn validate_new_task(title: &str, description: &str) -> Result<(), String> {
    if title.trim().is_empty() || description.trim().is_empty() {
        return Err("Fill in the title and description to create a task".to_string());
    }
    Ok(())
}

/// Decides whether an edit submit needs a round trip at all: None when
/// nothing changed from the values the form opened with.
pub fn edit_patch(target: &EditTarget, title: &str, description: &str) -> Option<TaskPatch> {
    if target.opened_title == title && target.opened_description == description {
        return None;
    }
    Some(TaskPatch {
        title: title.to_string(),
        description: description.to_string(),
    })
}

pub struct App {
    pub backend: Backend,
    pub image_bucket: String,
    pub session: Option<Session>,
    pub screen: Screen,
    // auth form
    pub auth_mode: AuthMode,
    pub auth_field: AuthField,
    pub auth_email: String,
    pub auth_password: String,
    // task list
    pub tasks: TaskList,
    pub state: ListState,
    pub channel_status: Option<ChannelStatus>,
    // add/edit form
    pub input_mode: InputMode,
    pub active_input: ActiveInput,
    pub form_title: String,
    pub form_description: String,
    pub edit_target: Option<EditTarget>,
    // one-line notice and blocking error popup
    pub notice: Option<String>,
    pub error: Option<String>,
}

impl App {
    pub fn new(backend: Backend, image_bucket: String, stored: Option<Session>) -> App {
        let screen = if session::is_authenticated(stored.as_ref()) {
            Screen::Tasks
        } else {
            Screen::Auth
        };
        App {
            backend,
            image_bucket,
            session: stored,
            screen,
            auth_mode: AuthMode::SignIn,
            auth_field: AuthField::Email,
            auth_email: String::new(),
            auth_password: String::new(),
            tasks: TaskList::new(),
            state: ListState::default(),
            channel_status: None,
            input_mode: InputMode::Normal,
            active_input: ActiveInput::Title,
            form_title: String::new(),
            form_description: String::new(),
            edit_target: None,
            notice: None,
            error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        session::is_authenticated(self.session.as_ref())
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.state
            .selected()
            .and_then(|index| self.tasks.get(index))
    }

    fn clamp_selection(&mut self) {
        if self.tasks.is_empty() {
            self.state.select(None);
        } else {
            match self.state.selected() {
                Some(index) if index < self.tasks.len() => {}
                _ => self.state.select(Some(0)),
            }
        }
    }

    pub fn next(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= self.tasks.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    self.tasks.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    /// Applies a full-refresh result: the fetched set replaces local state
    /// wholesale on success, while a failed fetch leaves the previous list
    /// untouched and surfaces the error.
    pub fn apply_refresh(&mut self, result: Result<Vec<Task>, crate::error::ApiError>) {
        match result {
            Ok(tasks) => {
                self.tasks.replace_all(tasks);
                self.clamp_selection();
            }
            Err(err) => self.error = Some(format!("Error fetching tasks: {}", err)),
        }
    }

    pub async fn refresh_tasks(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let result = self.backend.fetch_tasks(&session).await;
        self.apply_refresh(result);
    }

    pub fn apply_realtime(&mut self, message: RealtimeMessage) {
        match message {
            RealtimeMessage::Change(event) => {
                self.tasks.apply(event);
                self.clamp_selection();
            }
            RealtimeMessage::Status(status) => {
                // Observed only; no reconnect is attempted.
                self.channel_status = Some(status);
            }
        }
    }

    fn open_add_form(&mut self) {
        self.input_mode = InputMode::Editing;
        self.active_input = ActiveInput::Title;
        self.form_title.clear();
        self.form_description.clear();
        self.edit_target = None;
    }

    fn open_edit_form(&mut self) {
        let Some(task) = self.selected_task().cloned() else {
            return;
        };
        self.edit_target = Some(EditTarget {
            id: task.id,
            opened_title: task.title.clone(),
            opened_description: task.description.clone(),
        });
        self.form_title = task.title;
        self.form_description = task.description;
        self.input_mode = InputMode::Editing;
        self.active_input = ActiveInput::Title;
    }

    fn close_form(&mut self) {
        self.form_title.clear();
        self.form_description.clear();
        self.edit_target = None;
        self.input_mode = InputMode::Normal;
    }

    async fn submit_auth(&mut self) {
        let email = self.auth_email.trim().to_string();
        let password = self.auth_password.clone();
        if email.is_empty() || password.is_empty() {
            self.error = Some("Enter an email and a password".to_string());
            return;
        }
        match self.auth_mode {
            AuthMode::SignUp => match self.backend.sign_up(&email, &password).await {
                Ok(()) => {
                    self.notice = Some("Signed up. Confirm the email, then sign in".to_string());
                    self.auth_mode = AuthMode::SignIn;
                    self.auth_password.clear();
                }
                Err(err) => self.error = Some(format!("Error signing up: {}", err)),
            },
            AuthMode::SignIn => match self.backend.sign_in_with_password(&email, &password).await {
                Ok(new_session) => {
                    session::save(&new_session);
                    self.session = Some(new_session);
                    self.auth_password.clear();
                    self.screen = Screen::Tasks;
                    self.notice = None;
                    self.refresh_tasks().await;
                }
                Err(err) => self.error = Some(format!("Error signing in: {}", err)),
            },
        }
    }

    async fn sign_out(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(err) = self.backend.sign_out(&session).await {
                eprintln!("Error signing out: {}", err);
            }
        }
        session::clear();
        self.tasks.replace_all(Vec::new());
        self.state.select(None);
        self.channel_status = None;
        self.screen = Screen::Auth;
        self.auth_password.clear();
        self.notice = None;
    }

    // Reads and uploads the attachment named in the title input. Failure
    // degrades to "no image": the task is still created without one.
    async fn upload_attachment(&mut self, path: &Path) -> Option<String> {
        let session = self.session.clone()?;
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("Error reading image {}: {}", path.display(), err);
                return None;
            }
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let bucket = self.image_bucket.clone();
        match self
            .backend
            .upload_image(&session, &bucket, &file_name, bytes)
            .await
        {
            Ok(public_url) => Some(public_url),
            Err(err) => {
                eprintln!("Error uploading image: {}", err);
                None
            }
        }
    }

    async fn submit_form(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        match self.edit_target.take() {
            // Edit submit.
            Some(target) => {
                let patch = edit_patch(&target, &self.form_title, &self.form_description);
                self.close_form();
                let Some(patch) = patch else {
                    // Nothing changed; skip the round trip entirely.
                    return;
                };
                match self.backend.update_task(&session, target.id, &patch).await {
                    Ok(()) => {
                        self.notice = Some("Task updated".to_string());
                        self.refresh_tasks().await;
                    }
                    Err(err) => self.error = Some(format!("Error updating task: {}", err)),
                }
            }
            // Add submit.
            None => {
                let parsed = parse_task_input(&self.form_title);
                if let Err(message) = validate_new_task(&parsed.title, &self.form_description) {
                    self.error = Some(message);
                    return;
                }
                let image_url = match &parsed.attachment {
                    Some(path) => self.upload_attachment(path).await,
                    None => None,
                };
                let new_task = NewTask {
                    title: parsed.title,
                    description: self.form_description.trim().to_string(),
                    email: session.user.email.clone(),
                    image_url,
                };
                self.close_form();
                match self.backend.create_task(&session, &new_task).await {
                    Ok(()) => {
                        self.notice = Some("Task added".to_string());
                        self.refresh_tasks().await;
                    }
                    Err(err) => self.error = Some(format!("Error creating task: {}", err)),
                }
            }
        }
    }

    async fn delete_selected(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let Some(task) = self.selected_task() else {
            return;
        };
        let id = task.id;
        match self.backend.delete_task(&session, id).await {
            Ok(()) => {
                self.notice = Some("Task deleted".to_string());
                self.refresh_tasks().await;
            }
            Err(err) => self.error = Some(format!("Error deleting task: {}", err)),
        }
    }

    /// Handles one key. Returns Ok(true) when the app should quit.
    pub async fn handle_input(&mut self, key: crossterm::event::KeyEvent) -> io::Result<bool> {
        // A pending error is a blocking notification: any key dismisses it.
        if self.error.is_some() {
            self.error = None;
            return Ok(false);
        }

        match self.screen {
            Screen::Auth => match key.code {
                KeyCode::Esc => return Ok(true),
                KeyCode::Tab => {
                    self.auth_field = match self.auth_field {
                        AuthField::Email => AuthField::Password,
                        AuthField::Password => AuthField::Email,
                    };
                }
                KeyCode::Left | KeyCode::Right => {
                    self.auth_mode = match self.auth_mode {
                        AuthMode::SignIn => AuthMode::SignUp,
                        AuthMode::SignUp => AuthMode::SignIn,
                    };
                }
                KeyCode::Enter => {
                    self.submit_auth().await;
                }
                KeyCode::Char(c) => match self.auth_field {
                    AuthField::Email => self.auth_email.push(c),
                    AuthField::Password => self.auth_password.push(c),
                },
                KeyCode::Backspace => {
                    match self.auth_field {
                        AuthField::Email => self.auth_email.pop(),
                        AuthField::Password => self.auth_password.pop(),
                    };
                }
                _ => {}
            },

            Screen::Tasks => match self.input_mode {
                InputMode::Normal => match key.code {
                    KeyCode::Char('q') => return Ok(true),
                    KeyCode::Char('j') | KeyCode::Down => self.next(),
                    KeyCode::Char('k') | KeyCode::Up => self.previous(),
                    KeyCode::Char('r') => self.refresh_tasks().await,
                    KeyCode::Char('a') => self.open_add_form(),
                    KeyCode::Char('e') => self.open_edit_form(),
                    KeyCode::Char('d') => self.delete_selected().await,
                    KeyCode::Char('s') => self.sign_out().await,
                    _ => {}
                },

                InputMode::Editing => match key.code {
                    KeyCode::Char('i') => {
                        self.input_mode = InputMode::Insert;
                    }
                    KeyCode::Tab => {
                        self.active_input = match self.active_input {
                            ActiveInput::Title => ActiveInput::Description,
                            ActiveInput::Description => ActiveInput::Title,
                        };
                    }
                    KeyCode::Enter => {
                        self.submit_form().await;
                    }
                    KeyCode::Esc => self.close_form(),
                    _ => {}
                },

                InputMode::Insert => match key.code {
                    KeyCode::Char(c) => match self.active_input {
                        ActiveInput::Title => self.form_title.push(c),
                        ActiveInput::Description => self.form_description.push(c),
                    },
                    KeyCode::Backspace => {
                        match self.active_input {
                            ActiveInput::Title => self.form_title.pop(),
                            ActiveInput::Description => self.form_description.pop(),
                        };
                    }
                    KeyCode::Esc => {
                        self.input_mode = InputMode::Editing;
                    }
                    _ => {}
                },
            },
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::ChangeEvent;
    use chrono::{TimeZone, Utc};

    fn task(id: i64, minute: u32) -> Task {
        Task {
            id,
            title: format!("task {}", id),
            description: "desc".to_string(),
            image_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
            email: None,
        }
    }

    fn app() -> App {
        let backend = Backend::new("http://localhost:54321", "key");
        App::new(backend, "tasks-images".to_string(), None)
    }

    #[test]
    fn test_validate_rejects_empty_title() {
        assert!(validate_new_task("", "a description").is_err());
        assert!(validate_new_task("   ", "a description").is_err());
    }

    #[test]
    fn test_validate_rejects_empty_description() {
        assert!(validate_new_task("a title", "").is_err());
    }

    #[test]
    fn test_validate_accepts_filled_form() {
        assert!(validate_new_task("a title", "a description").is_ok());
    }

    #[test]
    fn test_edit_patch_short_circuits_when_unchanged() {
        let target = EditTarget {
            id: 1,
            opened_title: "title".to_string(),
            opened_description: "desc".to_string(),
        };
        assert_eq!(edit_patch(&target, "title", "desc"), None);
    }

    #[test]
    fn test_edit_patch_is_built_when_either_field_changed() {
        let target = EditTarget {
            id: 1,
            opened_title: "title".to_string(),
            opened_description: "desc".to_string(),
        };
        assert_eq!(
            edit_patch(&target, "title", "longer desc"),
            Some(TaskPatch {
                title: "title".to_string(),
                description: "longer desc".to_string(),
            })
        );
    }

    #[test]
    fn test_failed_refresh_keeps_state_and_surfaces_error() {
        let mut app = app();
        app.apply_refresh(Ok(vec![task(2, 20), task(1, 10)]));
        assert_eq!(app.tasks.len(), 2);

        // A delete may succeed server-side and then the follow-up refresh
        // dies: the list must not silently drop the row.
        app.apply_refresh(Err(ApiError::backend("connection reset")));
        assert_eq!(app.tasks.len(), 2);
        assert!(app.error.is_some());
    }

    #[test]
    fn test_successful_refresh_replaces_state_verbatim() {
        let mut app = app();
        app.apply_refresh(Ok(vec![task(1, 10)]));
        let refreshed = vec![task(2, 20), task(1, 10)];
        app.apply_refresh(Ok(refreshed.clone()));
        assert_eq!(app.tasks.tasks(), refreshed.as_slice());
    }

    #[test]
    fn test_refresh_clamps_selection_to_shrunk_list() {
        let mut app = app();
        app.apply_refresh(Ok(vec![task(3, 30), task(2, 20), task(1, 10)]));
        app.state.select(Some(2));
        app.apply_refresh(Ok(vec![task(3, 30)]));
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_realtime_insert_already_fetched_keeps_single_entry() {
        let mut app = app();
        app.apply_refresh(Ok(vec![task(3, 30)]));
        app.apply_realtime(RealtimeMessage::Change(ChangeEvent::Insert {
            new: task(3, 30),
        }));
        assert_eq!(app.tasks.len(), 1);
    }

    #[test]
    fn test_channel_status_is_recorded_but_nothing_else_changes() {
        let mut app = app();
        app.apply_refresh(Ok(vec![task(1, 10)]));
        app.apply_realtime(RealtimeMessage::Status(ChannelStatus::Closed));
        assert_eq!(app.channel_status, Some(ChannelStatus::Closed));
        assert_eq!(app.tasks.len(), 1);
    }
}
