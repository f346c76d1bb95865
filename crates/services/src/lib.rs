//! # services
//!
//! Use-case orchestration over the domain ports. Every operation takes
//! already-validated input (see [`forms`]) and returns
//! `Result<Outcome<T>, DomainError>`; the presentation layer decides how to
//! render either side.

pub mod admin_service;
pub mod auth_service;
pub mod comment_service;
pub mod forms;
pub mod maintenance;
pub mod post_service;
pub mod public_service;
pub mod settings_service;

mod media;
mod templates;

pub use admin_service::AdminService;
pub use auth_service::{AuthPolicy, AuthService};
pub use comment_service::CommentService;
pub use post_service::{PostService, MAX_IMAGES};
pub use public_service::PublicService;
pub use settings_service::SettingsService;
