pub mod filter;
pub mod task;
pub mod user;

pub use filter::{Pagination, TaskFilter, TaskPage};
pub use task::{Task, TaskInput, TaskPriority, TaskQuery, TaskStatus, TaskUpdate, TaskView};
pub use user::{NewUser, Role, User, UserRecord, UserRef};
