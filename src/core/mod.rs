pub mod config;
pub mod lifecycle;
pub mod matcher;
pub mod scanner;
pub mod search;
pub mod state;
