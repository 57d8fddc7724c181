pub mod colors;
pub mod curves;
pub mod tools;
