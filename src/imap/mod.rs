mod client;
mod command;
mod connection;
mod session;

pub use client::Client;
