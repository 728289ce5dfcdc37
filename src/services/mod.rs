pub mod availability_service;
pub mod interview_service;
pub mod notification_service;
pub mod repository;
