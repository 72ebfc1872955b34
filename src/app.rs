/// Main TUI application

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{ActionResult, Controller, DescriptorState, Snapshot};
use crate::screens::{Dashboard, RenderState, TextEditor};

/// Skeleton offered when creating a new application
const NEW_APP_TEMPLATE: &str = "services:\n  app:\n    image: \n    restart: unless-stopped\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Overview,
    Compose,
    Ports,
    Resources,
    Images,
    Docs,
}

impl Screen {
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Overview => "Overview",
            Screen::Compose => "Compose",
            Screen::Ports => "Ports",
            Screen::Resources => "Resources",
            Screen::Images => "Images",
            Screen::Docs => "Docs",
        }
    }

    pub fn all() -> &'static [Screen] {
        &[
            Screen::Overview,
            Screen::Compose,
            Screen::Ports,
            Screen::Resources,
            Screen::Images,
            Screen::Docs,
        ]
    }
}

/// Work queued by a key press, executed after the next frame is drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOp {
    Refresh,
    Stop(Vec<String>),
    Remove(Vec<String>),
    RemoveImage(String),
    SaveDescriptor { app: String, content: String },
    CreateApp { app: String, content: String },
}

impl PendingOp {
    fn describe(&self) -> String {
        match self {
            PendingOp::Refresh => "Refreshing...".to_string(),
            PendingOp::Stop(names) => format!("Stopping {}...", names.join(", ")),
            PendingOp::Remove(names) => format!("Removing {}...", names.join(", ")),
            PendingOp::RemoveImage(id) => format!("Removing image {}...", id),
            PendingOp::SaveDescriptor { app, .. } => format!("Saving {} and recreating...", app),
            PendingOp::CreateApp { app, .. } => format!("Creating {}...", app),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// Editing the descriptor of `app`; `create` when the file does not exist yet
    Editing { app: String, create: bool },
    /// Typing the name of a new application
    NewAppName,
    /// Waiting for y/n before running a destructive operation
    Confirm(PendingOp),
}

pub struct App {
    controller: Arc<Controller>,
    dashboard: Dashboard,
    current_screen: Screen,
    mode: Mode,
    selected_index: usize,
    selected_containers: BTreeSet<String>,
    snapshot: Option<Snapshot>,
    apps: Vec<String>,
    editor: Option<TextEditor>,
    input_buffer: String,
    docs: Option<String>,
    scroll: usize,
    status_message: Option<String>,
    show_help: bool,
    pending: Option<PendingOp>,
    should_quit: bool,
}

impl App {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self {
            controller,
            dashboard: Dashboard::new(),
            current_screen: Screen::Overview,
            mode: Mode::Normal,
            selected_index: 0,
            selected_containers: BTreeSet::new(),
            snapshot: None,
            apps: Vec::new(),
            editor: None,
            input_buffer: String::new(),
            docs: None,
            scroll: 0,
            status_message: None,
            show_help: false,
            pending: Some(PendingOp::Refresh),
            should_quit: false,
        }
    }

    fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
    }

    fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn run_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<()> {
        loop {
            if let Some(message) = self.pending.as_ref().map(PendingOp::describe) {
                self.set_status(message);
            }
            terminal.draw(|f| self.render(f))?;

            if self.pending.is_some() {
                self.execute_pending().await;
                continue;
            }

            if self.should_quit {
                return Ok(());
            }

            // Nothing refreshes on its own; only keys trigger work
            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
    }

    /// Run the queued operation, then show its outcome
    pub async fn execute_pending(&mut self) {
        let Some(op) = self.pending.take() else {
            return;
        };

        match op {
            PendingOp::Refresh => self.refresh_data().await,
            PendingOp::Stop(names) => {
                let result = self.controller.stop_selected(&names).await;
                self.apply_action(result);
            }
            PendingOp::Remove(names) => {
                let result = self.controller.remove_selected(&names).await;
                self.apply_action(result);
            }
            PendingOp::RemoveImage(id) => {
                let result = self.controller.remove_image(&id).await;
                self.apply_action(result);
            }
            PendingOp::SaveDescriptor { app, content } => {
                let result = self.controller.save_descriptor(&app, &content).await;
                self.finish_descriptor_action(result);
            }
            PendingOp::CreateApp { app, content } => {
                let result = self.controller.create_app(&app, &content).await;
                self.finish_descriptor_action(result);
            }
        }
    }

    async fn refresh_data(&mut self) {
        match self.controller.inspect().await {
            Ok(snapshot) => {
                self.install_snapshot(snapshot);
                self.clear_status();
            }
            Err(e) => {
                tracing::warn!(error = %e, "inspection failed");
                self.set_status(format!("Refresh failed: {}", e));
            }
        }

        self.docs = Some(match self.controller.docs() {
            Ok(text) => text,
            Err(e) => format!("Documentation unavailable: {}", e),
        });
    }

    fn install_snapshot(&mut self, snapshot: Snapshot) {
        // Selections only survive for containers that still exist
        self.selected_containers
            .retain(|name| snapshot.container(name).is_some());

        match self.controller.app_candidates(Some(&snapshot)) {
            Ok(apps) => self.apps = apps,
            Err(e) => self.set_status(format!("Failed to list applications: {}", e)),
        }

        self.snapshot = Some(snapshot);
        self.selected_index = self.selected_index.min(self.max_selection().saturating_sub(1));
    }

    fn apply_action(&mut self, result: ActionResult) {
        let message = match &result.refresh_error {
            Some(error) if result.report.is_success() => {
                format!("{} (refresh failed: {})", result.report.summary(), error)
            }
            _ => result.report.summary(),
        };

        for name in &result.report.succeeded {
            self.selected_containers.remove(name);
        }
        if let Some(snapshot) = result.snapshot {
            self.install_snapshot(snapshot);
        }

        self.set_status(message);
    }

    fn finish_descriptor_action(&mut self, result: ActionResult) {
        if result.report.is_success() {
            // Reopen in normal edit mode so a second save overwrites
            if let Mode::Editing { create, .. } = &mut self.mode {
                *create = false;
            }
            if let Some(editor) = &self.editor {
                self.editor = Some(TextEditor::from_text(&editor.text()));
            }
        }
        self.apply_action(result);
    }

    fn max_selection(&self) -> usize {
        let Some(snapshot) = &self.snapshot else {
            return 0;
        };

        match self.current_screen {
            Screen::Overview => snapshot.containers.len(),
            Screen::Compose => self.apps.len(),
            Screen::Images => snapshot.dangling.len(),
            _ => 0,
        }
    }

    fn selected_container(&self) -> Option<String> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.containers.get(self.selected_index))
            .map(|c| c.name.clone())
    }

    /// Selected containers, or the highlighted row when nothing is selected
    fn action_targets(&self) -> Vec<String> {
        if self.selected_containers.is_empty() {
            self.selected_container().into_iter().collect()
        } else {
            self.selected_containers.iter().cloned().collect()
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self.mode.clone() {
            Mode::Editing { app, create } => self.handle_edit_key(key, app, create),
            Mode::NewAppName => self.handle_name_key(key.code),
            Mode::Confirm(op) => self.handle_confirm_key(key.code, op),
            Mode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        // Clear status message on any key
        self.clear_status();

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.show_help {
                    self.show_help = false;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char('?') | KeyCode::F(1) => self.show_help = !self.show_help,
            KeyCode::Char('r') => self.pending = Some(PendingOp::Refresh),
            KeyCode::Tab | KeyCode::Right => self.next_screen(),
            KeyCode::BackTab | KeyCode::Left => self.prev_screen(),
            KeyCode::Char(c @ '1'..='6') => {
                let index = c as usize - '1' as usize;
                self.switch_screen(Screen::all()[index]);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.uses_scroll() {
                    self.scroll = self.scroll.saturating_sub(1);
                } else {
                    self.selected_index = self.selected_index.saturating_sub(1);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.uses_scroll() {
                    self.scroll += 1;
                } else if self.selected_index + 1 < self.max_selection() {
                    self.selected_index += 1;
                }
            }
            _ => self.handle_screen_key(key.code),
        }
    }

    fn uses_scroll(&self) -> bool {
        matches!(
            self.current_screen,
            Screen::Ports | Screen::Resources | Screen::Docs
        )
    }

    fn handle_screen_key(&mut self, key: KeyCode) {
        match (self.current_screen, key) {
            (Screen::Overview, KeyCode::Char(' ')) => {
                if let Some(name) = self.selected_container() {
                    if !self.selected_containers.remove(&name) {
                        self.selected_containers.insert(name);
                    }
                }
            }
            (Screen::Overview, KeyCode::Char('a')) => {
                let all: BTreeSet<String> = self
                    .snapshot
                    .as_ref()
                    .map(|s| s.containers.iter().map(|c| c.name.clone()).collect())
                    .unwrap_or_default();
                if self.selected_containers == all {
                    self.selected_containers.clear();
                } else {
                    self.selected_containers = all;
                }
            }
            (Screen::Overview, KeyCode::Char('s')) => {
                let targets = self.action_targets();
                if targets.is_empty() {
                    self.set_status("No container selected".to_string());
                } else {
                    self.pending = Some(PendingOp::Stop(targets));
                }
            }
            (Screen::Overview, KeyCode::Char('x')) => {
                let targets = self.action_targets();
                if targets.is_empty() {
                    self.set_status("No container selected".to_string());
                } else {
                    self.set_status(format!("Force-remove {}? [y/n]", targets.join(", ")));
                    self.mode = Mode::Confirm(PendingOp::Remove(targets));
                }
            }
            (Screen::Compose, KeyCode::Enter) | (Screen::Compose, KeyCode::Char('e')) => {
                self.open_editor();
            }
            (Screen::Compose, KeyCode::Char('n')) => {
                self.input_buffer.clear();
                self.mode = Mode::NewAppName;
                self.set_status("New application name: [Enter] Continue | [Esc] Cancel".to_string());
            }
            (Screen::Images, KeyCode::Char('d')) => {
                let image = self
                    .snapshot
                    .as_ref()
                    .and_then(|s| s.dangling.get(self.selected_index))
                    .map(|i| (i.id.clone(), i.short_id.clone()));
                match image {
                    Some((id, short_id)) => {
                        self.set_status(format!("Remove dangling image {}? [y/n]", short_id));
                        self.mode = Mode::Confirm(PendingOp::RemoveImage(id));
                    }
                    None => self.set_status("No dangling image selected".to_string()),
                }
            }
            _ => {}
        }
    }

    fn open_editor(&mut self) {
        let Some(app) = self.apps.get(self.selected_index).cloned() else {
            self.set_status("No application selected".to_string());
            return;
        };

        match self.controller.read_descriptor(&app) {
            Ok(DescriptorState::Found { content, .. }) => {
                self.editor = Some(TextEditor::from_text(&content));
                self.mode = Mode::Editing { app, create: false };
                self.set_status("[Ctrl+S] Save & recreate | [Esc] Close".to_string());
            }
            Ok(DescriptorState::NotFound { path }) => {
                self.editor = Some(TextEditor::from_text(NEW_APP_TEMPLATE));
                self.mode = Mode::Editing { app, create: true };
                self.set_status(format!(
                    "No descriptor at {}; [Ctrl+S] creates it",
                    path.display()
                ));
            }
            Err(e) => self.set_status(format!("Failed to read descriptor: {}", e)),
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent, app: String, create: bool) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('s') if ctrl => {
                let Some(editor) = &self.editor else {
                    return;
                };
                let content = editor.text();
                self.pending = Some(if create {
                    PendingOp::CreateApp { app, content }
                } else {
                    PendingOp::SaveDescriptor { app, content }
                });
            }
            KeyCode::Esc => {
                let discarded = self.editor.as_ref().map(|e| e.is_modified()).unwrap_or(false);
                self.editor = None;
                self.mode = Mode::Normal;
                if discarded {
                    self.set_status("Unsaved changes discarded".to_string());
                } else {
                    self.clear_status();
                }
            }
            _ => {
                if let Some(editor) = &mut self.editor {
                    editor.handle_key(key);
                }
            }
        }
    }

    fn handle_name_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char(c) => self.input_buffer.push(c),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Enter => {
                let app = self.input_buffer.trim().to_string();
                match self.controller.compose().descriptor_path(&app) {
                    Ok(path) => {
                        self.editor = Some(TextEditor::from_text(NEW_APP_TEMPLATE));
                        self.mode = Mode::Editing { app, create: true };
                        self.set_status(format!(
                            "New descriptor {} - [Ctrl+S] Create & start | [Esc] Cancel",
                            path.display()
                        ));
                    }
                    Err(e) => self.set_status(e.to_string()),
                }
            }
            KeyCode::Esc => {
                self.input_buffer.clear();
                self.mode = Mode::Normal;
                self.set_status("Cancelled".to_string());
            }
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyCode, op: PendingOp) {
        self.mode = Mode::Normal;
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => self.pending = Some(op),
            _ => self.set_status("Cancelled".to_string()),
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        if self.current_screen != screen {
            self.current_screen = screen;
            self.selected_index = 0;
            self.scroll = 0;
        }
    }

    fn next_screen(&mut self) {
        let screens = Screen::all();
        let current_idx = screens.iter().position(|s| *s == self.current_screen).unwrap_or(0);
        self.switch_screen(screens[(current_idx + 1) % screens.len()]);
    }

    fn prev_screen(&mut self) {
        let screens = Screen::all();
        let current_idx = screens.iter().position(|s| *s == self.current_screen).unwrap_or(0);
        let prev_idx = if current_idx == 0 {
            screens.len() - 1
        } else {
            current_idx - 1
        };
        self.switch_screen(screens[prev_idx]);
    }

    fn render(&self, frame: &mut ratatui::Frame) {
        let editing_app = match &self.mode {
            Mode::Editing { app, .. } => Some(app.as_str()),
            _ => None,
        };

        self.dashboard.render(
            frame,
            &RenderState {
                screen: self.current_screen,
                snapshot: self.snapshot.as_ref(),
                selected_index: self.selected_index,
                selected_containers: &self.selected_containers,
                apps: &self.apps,
                editor: self.editor.as_ref(),
                editing_app,
                naming_app: matches!(self.mode, Mode::NewAppName).then_some(self.input_buffer.as_str()),
                docs: self.docs.as_deref(),
                scroll: self.scroll,
                status_message: self.status_message.as_deref(),
                show_help: self.show_help,
                busy: self.pending.is_some(),
            },
        );
    }
}
