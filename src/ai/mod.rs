pub mod openrouter;
pub mod prompt;
pub mod retry;
