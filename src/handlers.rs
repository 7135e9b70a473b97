pub mod analytics;
pub mod auth;
pub mod billing;
pub mod branches;
pub mod feedback;
pub mod profiles;
pub mod qr_codes;
pub mod settings;
pub mod tasks;
pub mod teams;
