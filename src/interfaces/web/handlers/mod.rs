pub mod accounts;
pub mod jobs;
pub mod logs;
pub mod members;
pub mod tokens;
