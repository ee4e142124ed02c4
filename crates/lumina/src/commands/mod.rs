pub mod ai;
pub mod completion;
pub mod config;
pub mod history;
pub mod lookup;
