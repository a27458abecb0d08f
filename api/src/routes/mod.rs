pub mod chat;
pub mod collections;
pub mod embed;
pub mod generate;
pub mod health;
pub mod tools;
