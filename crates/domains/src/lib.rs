//! blogsite/crates/domains/src/lib.rs
//!
//! Entities, the error taxonomy, and the port traits every adapter implements.

pub mod error;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use chrono::{Duration, Utc};

    fn code(expires_in: Duration, is_valid: bool) -> VerificationCode {
        VerificationCode {
            id: 1,
            user_id: 7,
            code_hash: "$argon2id$stub".into(),
            token: "tok".into(),
            is_valid,
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn verification_code_states() {
        let now = Utc::now();
        assert_eq!(code(Duration::minutes(2), false).state_at(now), CodeState::Pending);
        assert_eq!(code(Duration::minutes(2), true).state_at(now), CodeState::Confirmed);
        assert_eq!(code(Duration::seconds(-1), true).state_at(now), CodeState::Expired);
        assert_eq!(code(Duration::seconds(-1), false).state_at(now), CodeState::Expired);
    }

    #[test]
    fn comment_root_resolution() {
        let now = Utc::now();
        let root = Comment {
            id: 10,
            content: "root".into(),
            author_id: 1,
            post_id: 3,
            thread_root_id: None,
            reply_to_id: None,
            created_at: now,
            updated_at: now,
        };
        let reply = Comment { id: 11, thread_root_id: Some(10), reply_to_id: Some(10), ..root.clone() };

        assert!(root.is_thread_root());
        assert_eq!(root.thread_root(), 10);
        assert!(!reply.is_thread_root());
        assert_eq!(reply.thread_root(), 10);
    }

    #[test]
    fn role_and_theme_parse_round_trip() {
        assert_eq!("admin".parse::<UserRole>().ok(), Some(UserRole::Admin));
        assert_eq!(UserRole::User.as_str(), "user");
        assert_eq!("dark".parse::<Theme>().ok(), Some(Theme::Dark));
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn admin_table_allow_list() {
        assert_eq!(AdminTable::ALL.len(), 7);
        assert!("post_images".parse::<AdminTable>().unwrap().is_association());
        assert!(!"users".parse::<AdminTable>().unwrap().is_association());
        assert!("sqlite_master".parse::<AdminTable>().is_err());
    }
}
