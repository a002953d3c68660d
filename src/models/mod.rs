pub mod api_key;
pub mod candidate;
pub mod company;
pub mod job;
pub mod matches;
pub mod notification;
pub mod status;
pub mod store;
pub mod user;
