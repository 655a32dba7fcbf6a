#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ExamResultRepository, InMemoryRepository, QuestionRepository, ResultRow, Storage,
    StorageError,
};
