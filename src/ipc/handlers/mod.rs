pub mod auth;
pub mod core;
pub mod exam;
pub mod exams;
pub mod responses;
pub mod students;
