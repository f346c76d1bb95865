//! # integration-tests
//!
//! Shared fixtures: a fresh in-memory `SqliteStore` per test, wired to every
//! service through deterministic fakes for the outbound ports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use domains::{
    CodeGenerator, FederatedIdentity, IdentityProvider, Mailer, MediaStorage, NewUser, OutgoingMail,
    PasswordHasher, Post, Result, StoredMedia, Upload, User, UserRepository, UserRole,
};
use services::{
    forms::PostForm, AdminService, AuthPolicy, AuthService, CommentService, PostService, PublicService,
    SettingsService,
};
use storage_adapters::SqliteStore;

pub const ADMIN_EMAIL: &str = "admin@gmail.com";
pub const ADMIN_TOKEN: &str = "admin-token-for-tests";
pub const PASSWORD: &str = "password123";
pub const RESET_CODE: &str = "4821";

/// Records what was stored and destroyed instead of touching disk.
#[derive(Default)]
pub struct FakeMedia {
    next: AtomicU64,
    pub uploaded: Mutex<Vec<String>>,
    pub destroyed: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStorage for FakeMedia {
    async fn upload(&self, upload: Upload) -> Result<StoredMedia> {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let public_id = format!("media{n}-{}", upload.file_name);
        self.uploaded.lock().unwrap().push(public_id.clone());
        Ok(StoredMedia { url: format!("/media/{public_id}"), public_id })
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    pub fn last(&self) -> Option<OutgoingMail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// Always issues [`RESET_CODE`] and sequential lookup tokens.
#[derive(Default)]
pub struct FixedCodes {
    next: AtomicU64,
}

impl CodeGenerator for FixedCodes {
    fn numeric_code(&self) -> String {
        RESET_CODE.to_string()
    }

    fn lookup_token(&self) -> String {
        format!("token-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Signs in `<code>@gmail.com` for any authorization `code`.
pub struct FakeGoogle;

#[async_trait]
impl IdentityProvider for FakeGoogle {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://accounts.test/authorize?state={state}")
    }

    async fn exchange(&self, code: &str) -> Result<FederatedIdentity> {
        Ok(FederatedIdentity {
            subject: format!("google-{code}"),
            email: format!("{code}@gmail.com"),
            avatar_url: None,
        })
    }
}

/// Reversible stand-in for Argon2; hashing cost is irrelevant here.
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, secret: &str) -> Result<String> {
        Ok(format!("plain${secret}"))
    }

    fn verify(&self, secret: &str, hash: &str) -> bool {
        hash.strip_prefix("plain$") == Some(secret)
    }
}

pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub media: Arc<FakeMedia>,
    pub mailer: Arc<RecordingMailer>,
    pub auth: Arc<AuthService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub settings: Arc<SettingsService>,
    pub admin: Arc<AdminService>,
    pub public: Arc<PublicService>,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(SqliteStore::in_memory().await.expect("in-memory database"));
        let media = Arc::new(FakeMedia::default());
        let mailer = Arc::new(RecordingMailer::default());
        let hasher = Arc::new(PlainHasher);

        let auth = Arc::new(AuthService::new(
            store.clone(),
            store.clone(),
            hasher.clone(),
            Arc::new(FixedCodes::default()),
            mailer.clone(),
            AuthPolicy {
                admin_email: ADMIN_EMAIL.into(),
                code_ttl: chrono::Duration::seconds(120),
                public_base_url: "http://blog.test".into(),
            },
        ));

        Self {
            posts: Arc::new(PostService::new(store.clone(), store.clone(), media.clone())),
            comments: Arc::new(CommentService::new(store.clone(), store.clone())),
            settings: Arc::new(SettingsService::new(store.clone(), media.clone(), hasher)),
            admin: Arc::new(AdminService::new(store.clone(), media.clone())),
            public: Arc::new(PublicService::new(store.clone(), mailer.clone(), ADMIN_EMAIL.into())),
            auth,
            store,
            media,
            mailer,
        }
    }

    async fn insert_user(&self, username: &str, email: &str, role: UserRole) -> User {
        UserRepository::create(
            self.store.as_ref(),
            NewUser {
                username: username.into(),
                email: email.into(),
                password_hash: PlainHasher.hash(PASSWORD).ok(),
                google_id: None,
                avatar_url: None,
                role,
            },
        )
        .await
        .expect("insert user")
    }

    /// A regular account `<name>@gmail.com` with password [`PASSWORD`].
    pub async fn user(&self, name: &str) -> User {
        self.insert_user(name, &format!("{name}@gmail.com"), UserRole::User).await
    }

    pub async fn admin(&self) -> User {
        self.insert_user("admin", ADMIN_EMAIL, UserRole::Admin).await
    }

    /// A post by `author` carrying `images` freshly uploaded images.
    pub async fn post(&self, author: &User, content: &str, images: usize) -> Post {
        let uploads = (0..images).map(|i| png(&format!("p{i}.png"))).collect();
        self.posts
            .create(author, PostForm { title: None, content: content.into() }, uploads)
            .await
            .expect("create post")
            .value
    }
}

pub fn png(file_name: &str) -> Upload {
    Upload {
        file_name: file_name.into(),
        content_type: mime::IMAGE_PNG,
        data: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
    }
}

#[cfg(feature = "web-axum")]
pub mod web {
    //! Router fixtures for the HTTP tests.

    use std::sync::Arc;

    use api_adapters::{router, AppState, MediaMount, RateLimiter};
    use auth_adapters::JwtSessions;
    use axum::{
        body::Body,
        http::{header, Method, Request, Response},
        Router,
    };
    use domains::{IdentityProvider, User};
    use secrecy::SecretString;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{FakeGoogle, Harness, ADMIN_TOKEN};

    pub const SECRET: &str = "integration-test-signing-secret";
    const BOUNDARY: &str = "----blogsite-test-boundary";

    pub struct TestApp {
        pub harness: Harness,
        pub sessions: Arc<JwtSessions>,
        pub router: Router,
    }

    impl TestApp {
        pub async fn new() -> Self {
            Self::with_rate_limit(1000).await
        }

        pub async fn with_rate_limit(per_minute: u32) -> Self {
            Self::build(per_minute, None).await
        }

        /// Google sign-in enabled through [`FakeGoogle`].
        pub async fn with_google() -> Self {
            Self::build(1000, Some(Arc::new(FakeGoogle))).await
        }

        async fn build(per_minute: u32, identity: Option<Arc<dyn IdentityProvider>>) -> Self {
            let harness = Harness::new().await;
            let sessions = Arc::new(JwtSessions::new(&SecretString::from(SECRET), chrono::Duration::hours(1)));

            let state = AppState {
                auth: harness.auth.clone(),
                posts: harness.posts.clone(),
                comments: harness.comments.clone(),
                settings: harness.settings.clone(),
                admin: harness.admin.clone(),
                public: harness.public.clone(),
                users: harness.store.clone(),
                sessions: sessions.clone(),
                identity,
                limiter: Arc::new(RateLimiter::per_minute(per_minute)),
                admin_token: Arc::new(SecretString::from(ADMIN_TOKEN)),
            };
            let media = MediaMount { url_prefix: "/media".into(), root: std::env::temp_dir() };

            Self { router: router(state, media), sessions, harness }
        }

        pub fn bearer(&self, user: &User) -> String {
            format!("Bearer {}", self.sessions.issue(user).expect("issue session"))
        }

        pub async fn raw(&self, request: Request<Body>) -> Response<Body> {
            self.router.clone().oneshot(request).await.expect("router call")
        }

        pub async fn send(&self, request: Request<Body>) -> (u16, Value) {
            let response = self.raw(request).await;
            let status = response.status().as_u16();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }

        pub async fn json(&self, method: Method, uri: &str, auth: Option<&str>, body: Value) -> (u16, Value) {
            let mut builder = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(auth) = auth {
                builder = builder.header(header::AUTHORIZATION, auth);
            }
            self.send(builder.body(Body::from(body.to_string())).expect("request")).await
        }

        pub async fn get(&self, uri: &str, auth: Option<&str>) -> (u16, Value) {
            let mut builder = Request::builder().uri(uri);
            if let Some(auth) = auth {
                builder = builder.header(header::AUTHORIZATION, auth);
            }
            self.send(builder.body(Body::empty()).expect("request")).await
        }

        pub async fn multipart(
            &self,
            method: Method,
            uri: &str,
            auth: &str,
            fields: &[(&str, &str)],
            files: &[(&str, &str, &[u8])],
        ) -> (u16, Value) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, auth)
                .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
                .body(Body::from(multipart_body(fields, files)))
                .expect("request");
            self.send(request).await
        }
    }

    pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        for (name, file_name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}
