pub mod chat;
pub mod course;
pub mod profile;
