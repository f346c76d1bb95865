//! Background upkeep that runs beside the request path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::AuthService;

/// Removes expired verification codes once. Failures are logged, never raised.
pub async fn sweep_codes_once(auth: &AuthService) {
    match auth.sweep_expired_codes(Utc::now()).await {
        Ok(0) => tracing::debug!("no expired verification codes"),
        Ok(removed) => tracing::info!(removed, "expired verification codes swept"),
        Err(err) => tracing::warn!(error = %err, "verification code sweep failed"),
    }
}

/// Sweeps expired codes on a fixed period, starting immediately. A missed
/// tick only delays deletion: expired codes are already rejected on lookup.
pub fn spawn_code_sweeper(auth: Arc<AuthService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            sweep_codes_once(&auth).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthPolicy;
    use domains::{
        DomainError, MockCodeGenerator, MockMailer, MockPasswordHasher, MockUserRepository,
        MockVerificationCodeRepository,
    };

    fn auth(codes: MockVerificationCodeRepository) -> AuthService {
        AuthService::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(codes),
            Arc::new(MockPasswordHasher::new()),
            Arc::new(MockCodeGenerator::new()),
            Arc::new(MockMailer::new()),
            AuthPolicy {
                admin_email: "admin@gmail.com".into(),
                code_ttl: chrono::Duration::seconds(120),
                public_base_url: "http://localhost:8080".into(),
            },
        )
    }

    #[tokio::test]
    async fn sweep_failure_is_swallowed() {
        let mut codes = MockVerificationCodeRepository::new();
        codes.expect_delete_expired().times(1).returning(|_| Err(DomainError::internal("locked")));

        sweep_codes_once(&auth(codes)).await;
    }

    #[tokio::test]
    async fn sweeper_runs_on_the_first_tick() {
        let mut codes = MockVerificationCodeRepository::new();
        codes.expect_delete_expired().times(1..).returning(|_| Ok(2));

        let handle = spawn_code_sweeper(Arc::new(auth(codes)), Duration::from_secs(3600));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        let _ = handle.await;
    }
}
