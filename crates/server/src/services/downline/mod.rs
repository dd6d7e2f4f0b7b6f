pub mod downline_service;
