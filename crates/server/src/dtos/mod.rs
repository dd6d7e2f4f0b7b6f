pub mod commission_dto;
pub mod prize_dto;
pub mod user_dto;
