//! Per-user settings: profile, avatar, password, theme and account removal.

use std::sync::Arc;

use domains::{
    DomainError, MediaStorage, Outcome, PasswordHasher, Result, Theme, Upload, User, UserRepository,
};

use crate::forms::{ChangePasswordForm, ProfileForm};
use crate::media::release;

pub struct SettingsService {
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaStorage>,
    hasher: Arc<dyn PasswordHasher>,
}

impl SettingsService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaStorage>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self { users, media, hasher }
    }

    pub async fn update_profile(
        &self,
        mut user: User,
        form: ProfileForm,
        avatar: Option<Upload>,
    ) -> Result<Outcome<User>> {
        let new_username = form.username.filter(|name| *name != user.username);
        if let Some(username) = &new_username {
            if self.users.find_by_username(username).await?.is_some() {
                return Err(DomainError::conflict("This username is already taken."));
            }
        }

        if new_username.is_none() && avatar.is_none() {
            return Err(DomainError::validation("No changes made."));
        }

        let mut uploaded = None;
        let replaced_avatar = match avatar {
            Some(upload) => {
                let stored = self.media.upload(upload).await?;
                uploaded = Some(stored.public_id.clone());
                user.avatar_url = Some(stored.url);
                user.avatar_public_id.replace(stored.public_id)
            }
            None => None,
        };
        if let Some(username) = new_username {
            user.username = username;
        }

        if let Err(err) = self.users.save(&user).await {
            release(self.media.as_ref(), uploaded.as_deref()).await;
            return Err(err);
        }
        release(self.media.as_ref(), replaced_avatar.as_deref()).await;

        Ok(Outcome::new(user, "Profile updated successfully."))
    }

    pub async fn delete_avatar(&self, mut user: User) -> Result<Outcome<User>> {
        if user.avatar_url.is_none() {
            return Err(DomainError::validation("No avatar to delete."));
        }

        user.avatar_url = None;
        let public_id = user.avatar_public_id.take();
        self.users.save(&user).await?;
        release(self.media.as_ref(), public_id.as_deref()).await;

        Ok(Outcome::new(user, "Avatar deleted successfully."))
    }

    pub async fn change_password(&self, mut user: User, form: ChangePasswordForm) -> Result<Outcome> {
        let Some(current_hash) = user.password_hash.as_deref() else {
            return Err(DomainError::forbidden("Password change is not available."));
        };
        if !self.hasher.verify(&form.current_password, current_hash) {
            return Err(DomainError::conflict("Current password is incorrect."));
        }

        user.password_hash = Some(self.hasher.hash(&form.new_password)?);
        self.users.save(&user).await?;

        Ok(Outcome::message("Password updated successfully."))
    }

    pub async fn set_theme(&self, mut user: User, theme: Theme) -> Result<Outcome<Theme>> {
        user.theme = theme;
        self.users.save(&user).await?;
        Ok(Outcome::new(theme, "Theme updated."))
    }

    /// Deletes the account and everything it owns. Hosted media goes last
    /// and best-effort.
    pub async fn delete_account(&self, user: &User) -> Result<Outcome> {
        if user.is_admin() {
            return Err(DomainError::forbidden("Cannot delete an admin user."));
        }

        let report = self.users.delete(user.id).await?;
        release(self.media.as_ref(), report.media_ids()).await;

        tracing::info!(user_id = user.id, "account deleted by owner");
        Ok(Outcome::message("Your account has been deleted."))
    }
}
