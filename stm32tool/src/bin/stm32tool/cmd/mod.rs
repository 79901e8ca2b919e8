pub mod acquire;
pub mod build;
pub mod database;
pub mod download;
pub mod flash;
pub mod info;
pub mod new;
