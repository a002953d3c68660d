pub mod extract;
pub mod time;
pub mod token;
