pub mod app;
pub mod client;
pub mod config;
pub mod headless;
pub mod logger;
pub mod logs;
pub mod session;
pub mod store;
pub mod tui;
pub mod view;
