pub mod models;
pub mod parser;
