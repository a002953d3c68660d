pub mod api_key_dto;
pub mod match_dto;
pub mod public_dto;
