pub mod app;
pub mod assembler;
pub mod config;
pub mod error;
pub mod gateway;
pub mod persona;
pub mod session;
pub mod storage;
pub mod ui;
