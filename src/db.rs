pub mod profile_repo;
pub use profile_repo::ProfileRepository;
pub mod branch_repo;
pub use branch_repo::BranchRepository;
pub mod feedback_repo;
pub use feedback_repo::{FeedbackRepository, FeedbackScope};
pub mod qr_repo;
pub use qr_repo::QrCodeRepository;
pub mod team_repo;
pub use team_repo::TeamRepository;
pub mod task_repo;
pub use task_repo::TaskRepository;
pub mod subscriber_repo;
pub use subscriber_repo::SubscriberRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod usage_repo;
pub use usage_repo::UsageRepository;
