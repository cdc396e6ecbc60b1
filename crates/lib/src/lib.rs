//! Parrot core library — callback parsing, dispatch, VK replies, and the HTTP gateway
//! used by the CLI.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod init;
pub mod retry;
