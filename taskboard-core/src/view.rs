//! Declarative view of a task collection.
//!
//! Both the terminal client and the server's HTML page render from
//! [`TaskListView`]; neither touches [`Task`] records directly when drawing.

use std::fmt::Write as _;

use crate::models::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItemView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_on: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskListView {
    pub items: Vec<TaskItemView>,
    pub stats: TaskStats,
}

impl TaskListView {
    /// Builds the view in the order the tasks were fetched. Counters are
    /// always derived from the collection, never carried over.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let items: Vec<TaskItemView> = tasks.iter().map(TaskItemView::from).collect();
        let completed = tasks.iter().filter(|t| t.completed).count();

        Self {
            stats: TaskStats {
                total: tasks.len(),
                completed,
                pending: tasks.len() - completed,
            },
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&Task> for TaskItemView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: Some(task.description.clone()).filter(|d| !d.is_empty()),
            completed: task.completed,
            created_on: task.created_at.format("%m/%d/%Y").to_string(),
        }
    }
}

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const EMPTY_STATE: &str = "No tasks yet. Add one to get started!";

/// Renders the task list markup. Items carry `data-task-id` so behavior can
/// be attached without inline handlers.
pub fn render_html(view: &TaskListView) -> String {
    let mut html = String::new();
    let stats = view.stats;

    let _ = write!(
        html,
        "<section class=\"stats\">\
         <span id=\"totalTasks\">{}</span>\
         <span id=\"completedTasks\">{}</span>\
         <span id=\"pendingTasks\">{}</span>\
         </section>",
        stats.total, stats.completed, stats.pending
    );

    if view.is_empty() {
        let _ = write!(html, "<p class=\"empty-state\">{EMPTY_STATE}</p>");
        return html;
    }

    html.push_str("<ul class=\"tasks\">");
    for item in &view.items {
        let (class, checked) = if item.completed {
            ("task-item completed", " checked")
        } else {
            ("task-item", "")
        };
        let _ = write!(
            html,
            "<li class=\"{class}\" data-task-id=\"{id}\">\
             <input type=\"checkbox\" class=\"task-checkbox\" disabled{checked}>\
             <span class=\"task-title\">{title}</span>",
            id = item.id,
            title = escape_html(&item.title),
        );
        if let Some(description) = &item.description {
            let _ = write!(
                html,
                "<div class=\"task-description\">{}</div>",
                escape_html(description)
            );
        }
        let _ = write!(
            html,
            "<div class=\"task-meta\">Created: {}</div></li>",
            item.created_on
        );
    }
    html.push_str("</ul>");

    html
}
