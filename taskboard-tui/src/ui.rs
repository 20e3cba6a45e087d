use anyhow::Result;
use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    },
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;

use taskboard_core::view::{TaskItemView, TaskListView};
use taskboard_core::{Task, TaskUpdate};

use crate::api::TaskClient;
use crate::prompt::{Prompt, PromptOutcome};

pub enum InputMode {
    Normal,
    Prompt(Prompt),
    DeleteConfirm,
    Help,
    Alert(String),
}

pub struct App {
    pub client: TaskClient,
    pub view: TaskListView,
    pub task_state: ListState,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub delete_target: Option<(i64, String)>,
}

/// Strips control characters so task text cannot drive the terminal.
pub fn display_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

impl App {
    pub fn new(client: TaskClient) -> Self {
        Self {
            client,
            view: TaskListView::default(),
            task_state: ListState::default(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            delete_target: None,
        }
    }

    /// Refetches the whole collection and rebuilds the view from scratch.
    pub async fn load_tasks(&mut self) -> Result<()> {
        let tasks: Vec<Task> = self.client.list_tasks().await?;
        self.view = TaskListView::from_tasks(&tasks);

        let selection = match self.task_state.selected() {
            _ if self.view.is_empty() => None,
            Some(i) => Some(i.min(self.view.items.len() - 1)),
            None => Some(0),
        };
        self.task_state.select(selection);
        Ok(())
    }

    fn selected_item(&self) -> Option<&TaskItemView> {
        self.task_state
            .selected()
            .and_then(|i| self.view.items.get(i))
    }

    pub fn next_task(&mut self) {
        if self.view.is_empty() {
            return;
        }
        let i = match self.task_state.selected() {
            Some(i) if i + 1 < self.view.items.len() => i + 1,
            _ => 0,
        };
        self.task_state.select(Some(i));
    }

    pub fn previous_task(&mut self) {
        if self.view.is_empty() {
            return;
        }
        let i = match self.task_state.selected() {
            Some(0) | None => self.view.items.len() - 1,
            Some(i) => i - 1,
        };
        self.task_state.select(Some(i));
    }

    /// Shows `message` in a blocking popup and records it in the log.
    pub fn alert(&mut self, message: String) {
        tracing::error!("{message}");
        self.input_buffer.clear();
        self.input_mode = InputMode::Alert(message);
    }

    fn report(&mut self, context: &str, result: Result<()>) {
        if let Err(err) = result {
            self.alert(format!("{context}: {err:#}"));
        }
    }

    pub fn start_creating(&mut self) {
        self.input_buffer.clear();
        self.input_mode = InputMode::Prompt(Prompt::NewTitle);
    }

    pub async fn start_editing(&mut self) {
        let Some(id) = self.selected_item().map(|item| item.id) else {
            return;
        };
        match self.client.get_task(id).await {
            Ok(task) => {
                let (prompt, prefill) = Prompt::edit(task);
                self.input_buffer = prefill;
                self.input_mode = InputMode::Prompt(prompt);
            }
            Err(err) => self.alert(format!("Error editing task: {err:#}")),
        }
    }

    pub async fn submit_prompt(&mut self) {
        let InputMode::Prompt(prompt) = std::mem::replace(&mut self.input_mode, InputMode::Normal)
        else {
            return;
        };
        let input = std::mem::take(&mut self.input_buffer);

        match prompt.submit(&input) {
            PromptOutcome::Next(next, prefill) => {
                self.input_buffer = prefill;
                self.input_mode = InputMode::Prompt(next);
            }
            PromptOutcome::Rejected(message) => self.alert(message.to_string()),
            PromptOutcome::Create(new_task) => {
                let result = match self.client.create_task(&new_task).await {
                    Ok(_) => self.load_tasks().await,
                    Err(err) => Err(err),
                };
                self.report("Error adding task", result);
            }
            PromptOutcome::Update(id, update) => {
                let result = self.apply_update(id, &update).await;
                self.report("Error editing task", result);
            }
        }
    }

    pub fn cancel_prompt(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    async fn apply_update(&mut self, id: i64, update: &TaskUpdate) -> Result<()> {
        self.client.update_task(id, update).await?;
        self.load_tasks().await
    }

    /// Reads the task fresh from the server, then writes it back with the
    /// completion flag flipped.
    pub async fn toggle_selected(&mut self) {
        let Some(id) = self.selected_item().map(|item| item.id) else {
            return;
        };
        let result = match self.client.get_task(id).await {
            Ok(task) => self.apply_update(id, &TaskUpdate::toggled(&task)).await,
            Err(err) => Err(err),
        };
        self.report("Error updating task", result);
    }

    pub fn start_delete_confirm(&mut self) {
        if let Some(item) = self.selected_item() {
            self.delete_target = Some((item.id, item.title.clone()));
            self.input_mode = InputMode::DeleteConfirm;
        }
    }

    pub async fn confirm_delete(&mut self) {
        let target = self.delete_target.take();
        self.input_mode = InputMode::Normal;
        let Some((id, _)) = target else {
            return;
        };
        let result = match self.client.delete_task(id).await {
            Ok(()) => self.load_tasks().await,
            Err(err) => Err(err),
        };
        self.report("Error deleting task", result);
    }

    pub fn cancel_delete_confirm(&mut self) {
        self.input_mode = InputMode::Normal;
        self.delete_target = None;
    }

    pub async fn refresh(&mut self) {
        let result = self.load_tasks().await;
        self.report("Error connecting to server", result);
    }
}

pub async fn run_app(client: TaskClient) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(client);
    app.refresh().await;

    let res = run_app_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

async fn run_app_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match app.input_mode {
                InputMode::Normal => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next_task(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous_task(),
                    KeyCode::Char('a') => app.start_creating(),
                    KeyCode::Char('e') => app.start_editing().await,
                    KeyCode::Char('c') | KeyCode::Char(' ') => app.toggle_selected().await,
                    KeyCode::Char('D') => app.start_delete_confirm(),
                    KeyCode::Char('r') => app.refresh().await,
                    KeyCode::Char('?') => app.input_mode = InputMode::Help,
                    _ => {}
                },
                InputMode::Prompt(_) => match key.code {
                    KeyCode::Enter => app.submit_prompt().await,
                    KeyCode::Esc => app.cancel_prompt(),
                    KeyCode::Backspace => {
                        app.input_buffer.pop();
                    }
                    KeyCode::Char(c) => app.input_buffer.push(c),
                    _ => {}
                },
                InputMode::DeleteConfirm => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete().await,
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        app.cancel_delete_confirm()
                    }
                    _ => {}
                },
                InputMode::Help => match key.code {
                    KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => {
                        app.input_mode = InputMode::Normal;
                    }
                    _ => {}
                },
                InputMode::Alert(_) => match key.code {
                    KeyCode::Enter | KeyCode::Esc => app.input_mode = InputMode::Normal,
                    _ => {}
                },
            }
        }
    }
}

fn task_item(item: &TaskItemView) -> ListItem<'static> {
    let checkbox = if item.completed { "×" } else { " " };
    let heading = format!("[{}] {}", checkbox, display_text(&item.title));
    let date_span = Span::styled(
        format!(" ({})", item.created_on),
        Style::default().fg(Color::DarkGray),
    );

    let heading_span = if item.completed {
        Span::styled(
            heading,
            Style::default()
                .add_modifier(Modifier::CROSSED_OUT)
                .fg(Color::DarkGray),
        )
    } else {
        Span::raw(heading)
    };

    let mut lines = vec![Line::from(vec![heading_span, date_span])];
    if let Some(description) = &item.description {
        lines.push(Line::from(Span::styled(
            format!("    {}", display_text(description)),
            Style::default().fg(Color::Gray),
        )));
    }
    ListItem::new(Text::from(lines))
}

fn ui(f: &mut Frame, app: &mut App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let stats = app.view.stats;
    let stats_line = Paragraph::new(format!(
        "total: {} | completed: {} | pending: {}",
        stats.total, stats.completed, stats.pending
    ))
    .block(Block::default().title("taskboard").borders(Borders::ALL));
    f.render_widget(stats_line, main_chunks[0]);

    let task_block = Block::default()
        .title("tasks")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    if app.view.is_empty() {
        let empty = Paragraph::new("No tasks yet. Press 'a' to add one.")
            .block(task_block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, main_chunks[1]);
    } else {
        let task_items: Vec<ListItem> = app.view.items.iter().map(task_item).collect();
        let tasks = List::new(task_items)
            .block(task_block)
            .style(Style::default().fg(Color::White))
            .highlight_style(Style::default().add_modifier(Modifier::BOLD))
            .highlight_symbol(">> ");
        f.render_stateful_widget(tasks, main_chunks[1], &mut app.task_state);
    }

    match &app.input_mode {
        InputMode::Prompt(prompt) => {
            let popup_area = centered_rect(60, 20, f.area());
            f.render_widget(Clear, popup_area);

            let input = Paragraph::new(app.input_buffer.as_str())
                .block(
                    Block::default()
                        .title(prompt.label())
                        .borders(Borders::ALL),
                )
                .style(Style::default().fg(Color::Yellow));
            f.render_widget(input, popup_area);
        }
        InputMode::DeleteConfirm => {
            let popup_area = centered_rect(60, 20, f.area());
            f.render_widget(Clear, popup_area);

            let target_name = app
                .delete_target
                .as_ref()
                .map(|(_, title)| display_text(title))
                .unwrap_or_else(|| "task".to_string());
            let confirm_text = format!(
                "Are you sure you want to delete '{target_name}'?\n\ny: confirm | n/esc: cancel"
            );
            let confirm = Paragraph::new(confirm_text)
                .block(
                    Block::default()
                        .title("confirm delete")
                        .borders(Borders::ALL),
                )
                .style(Style::default().fg(Color::Red));
            f.render_widget(confirm, popup_area);
        }
        InputMode::Alert(message) => {
            let popup_area = centered_rect(60, 30, f.area());
            f.render_widget(Clear, popup_area);

            let alert = Paragraph::new(format!("{}\n\nenter/esc: dismiss", display_text(message)))
                .block(Block::default().title("error").borders(Borders::ALL))
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(Color::Red));
            f.render_widget(alert, popup_area);
        }
        InputMode::Help => {
            let popup_area = centered_rect(80, 60, f.area());
            f.render_widget(Clear, popup_area);

            let help_text = r#"Navigation:
  j/k: move up/down

Actions:
  a: add task (title, then description)
  e: edit selected task (title, then description)
  c/space: complete/uncomplete task
  D: delete selected task
  r: reload from server
  ?: show/hide this help
  q: quit

Enter submits a prompt, ESC cancels it.
Press ? or ESC to close"#;
            let help = Paragraph::new(help_text)
                .block(Block::default().title("help").borders(Borders::ALL))
                .style(Style::default().fg(Color::White));
            f.render_widget(help, popup_area);
        }
        InputMode::Normal => {}
    }

    let status_bar = Paragraph::new("q: quit | ?: help")
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    f.render_widget(status_bar, main_chunks[2]);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
