mod db;
mod models;
pub mod view;

pub use db::{Database, default_database_url};
pub use models::{NewTask, Task, TaskUpdate, required_title};
