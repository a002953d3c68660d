pub mod api_key_service;
pub mod export_service;
pub mod match_service;
pub mod notification_service;
pub mod slack_service;
