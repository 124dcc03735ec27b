pub mod config;
pub mod db;
pub mod name;
pub mod serve;
pub mod time;
