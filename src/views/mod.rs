//! The two views of the application: the generation form and the history list

pub mod generate;
pub mod history;

pub use generate::GenerateView;
pub use history::{DeleteOutcome, HistoryView, LoadState};
