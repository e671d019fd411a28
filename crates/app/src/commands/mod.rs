pub mod history;
pub mod list;
pub mod progress;
pub mod take;
