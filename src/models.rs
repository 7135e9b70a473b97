pub mod analytics;
pub mod branch;
pub mod feedback;
pub mod profile;
pub mod qr;
pub mod settings;
pub mod subscription;
pub mod team;
