// Core modules
pub mod ai;
pub mod cli;
pub mod infrastructure;
pub mod review;
