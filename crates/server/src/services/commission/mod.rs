pub mod commission_service;
