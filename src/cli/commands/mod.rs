pub mod clock;
pub mod config;
pub mod init;
pub mod list;
pub mod login;
pub mod report;
pub mod shell;
