pub mod analytics_service;
pub mod auth;
pub mod branch_service;
pub mod feedback_service;
pub mod notifications;
pub mod profile_service;
pub mod qr_service;
pub mod settings_service;
pub mod subscription_service;
pub mod task_service;
pub mod team_service;
