pub mod handlers;
pub mod ranking;
pub mod scorer;
pub mod terms;
