pub mod accounts;
pub mod directory;
pub mod export;
pub mod ingest;
pub mod jobs;
pub mod lifecycle;
pub mod settings;
pub mod storage;
pub mod terminal;
pub mod vault;
