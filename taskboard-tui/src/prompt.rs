use taskboard_core::{NewTask, Task, TaskUpdate};

/// Multi-step text input. Each step is answered in turn; dropping the prompt
/// at any step abandons the whole action without touching the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    NewTitle,
    NewDescription { title: String },
    EditTitle { task: Task },
    EditDescription { task: Task, title: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Ask the next question, pre-filled with the given text.
    Next(Prompt, String),
    Create(NewTask),
    Update(i64, TaskUpdate),
    Rejected(&'static str),
}

impl Prompt {
    /// First step of an edit, pre-filled with the current title.
    pub fn edit(task: Task) -> (Self, String) {
        let prefill = task.title.clone();
        (Prompt::EditTitle { task }, prefill)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Prompt::NewTitle => "new task: title",
            Prompt::NewDescription { .. } => "new task: description (optional)",
            Prompt::EditTitle { .. } => "edit task title",
            Prompt::EditDescription { .. } => "edit task description",
        }
    }

    pub fn submit(self, input: &str) -> PromptOutcome {
        match self {
            Prompt::NewTitle => {
                let title = input.trim();
                if title.is_empty() {
                    PromptOutcome::Rejected("Please enter a task title")
                } else {
                    PromptOutcome::Next(
                        Prompt::NewDescription {
                            title: title.to_string(),
                        },
                        String::new(),
                    )
                }
            }
            Prompt::NewDescription { title } => PromptOutcome::Create(NewTask {
                title,
                description: input.trim().to_string(),
            }),
            Prompt::EditTitle { task } => {
                let prefill = task.description.clone();
                PromptOutcome::Next(
                    Prompt::EditDescription {
                        task,
                        title: input.to_string(),
                    },
                    prefill,
                )
            }
            Prompt::EditDescription { task, title } => {
                let title = match title.trim() {
                    "" => task.title.clone(),
                    trimmed => trimmed.to_string(),
                };
                PromptOutcome::Update(
                    task.id,
                    TaskUpdate {
                        title,
                        description: input.trim().to_string(),
                        completed: task.completed,
                    },
                )
            }
        }
    }
}
