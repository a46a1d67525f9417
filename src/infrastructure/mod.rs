pub mod scheduler;
pub mod store;

pub use scheduler::{TaskScheduler, TokioScheduler};
pub use store::{ExamStore, InMemoryExamStore};
