pub mod connection;
pub mod registry;
pub mod scanner;
