use crate::{
    config::admin::AdminConfig,
    error::{AppError, AppResult},
    models::{admin, user, Admin, AdminModel, User, UserModel},
    services::identity::VerifiedIdentity,
    utils::{encode_session_token, hash_key, verify_key},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

/// Uid prefix of accounts created by setup-admin before their first sign-in.
pub const PLACEHOLDER_UID_PREFIX: &str = "admin-";

const EMAIL_TAKEN: &str = "An account with this email already exists";

fn email_taken() -> AppError {
    AppError::Conflict(EMAIL_TAKEN.to_string())
}

/// Whether `identity` may take over the existing row with its email.
fn can_claim(existing: &UserModel, identity: &VerifiedIdentity) -> bool {
    identity.email_verified && existing.firebase_uid.starts_with(PLACEHOLDER_UID_PREFIX)
}

/// Name shown for accounts whose provider supplied none.
pub fn default_display_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default().trim();
    if local.is_empty() {
        "Student".to_string()
    } else {
        local.to_string()
    }
}

pub struct AuthService {
    db: DatabaseConnection,
    admin_config: AdminConfig,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            admin_config: AdminConfig::from_env(),
        }
    }

    /// Sign in with a verified identity: resolve the user, record the login
    /// and issue a session token.
    pub async fn sign_in(&self, identity: &VerifiedIdentity) -> AppResult<(UserModel, String)> {
        let user = self.find_or_create(identity).await?;

        let mut active: user::ActiveModel = user.into();
        active.last_login_at = Set(Some(chrono::Utc::now().naive_utc()));
        let user = active.update(&self.db).await?;

        let token = encode_session_token(user.id, &user.email)?;
        Ok((user, token))
    }

    /// Look the identity up by provider uid and create it otherwise. An
    /// email that already has an account only links when that account is an
    /// unclaimed setup-admin placeholder and the provider verified the email.
    pub async fn find_or_create(&self, identity: &VerifiedIdentity) -> AppResult<UserModel> {
        if let Some(user) = self.find_by_uid(&identity.uid).await? {
            return Ok(user);
        }

        let now = chrono::Utc::now().naive_utc();
        let email = identity.email.trim().to_lowercase();

        if let Some(existing) = self.find_by_email(&email).await? {
            if !can_claim(&existing, identity) {
                tracing::warn!(
                    user_id = existing.id,
                    "Refused to bind a new identity to an existing account"
                );
                return Err(email_taken());
            }

            let picture = existing.picture.clone().or_else(|| identity.picture.clone());
            let mut active: user::ActiveModel = existing.into();
            active.firebase_uid = Set(identity.uid.clone());
            active.picture = Set(picture);
            active.updated_at = Set(now);
            let linked = active.update(&self.db).await?;
            tracing::info!(user_id = linked.id, "Linked identity to admin placeholder");
            return Ok(linked);
        }

        let name = identity
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_display_name(&email));

        let new_user = user::ActiveModel {
            firebase_uid: Set(identity.uid.clone()),
            email: Set(email),
            name: Set(name),
            picture: Set(identity.picture.clone()),
            is_pro: Set(false),
            is_admin: Set(false),
            contribution_count: Set(0),
            contribution_points: Set(0),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match new_user.insert(&self.db).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Created user on first sign-in");
                Ok(user)
            }
            // A concurrent first request may have inserted the same user.
            Err(e) => match self.find_by_uid(&identity.uid).await? {
                Some(user) => Ok(user),
                None => Err(AppError::conflict_on_unique(e, EMAIL_TAKEN)),
            },
        }
    }

    pub async fn get_user(&self, id: i32) -> AppResult<UserModel> {
        User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFoundResource("User"))
    }

    pub async fn list_admins(&self) -> AppResult<Vec<AdminModel>> {
        let admins = Admin::find()
            .order_by_desc(admin::Column::CreatedAt)
            .order_by_desc(admin::Column::Id)
            .all(&self.db)
            .await?;
        Ok(admins)
    }

    /// Promote (or create) the user behind `email` and store the key used
    /// for admin login.
    pub async fn setup_admin(
        &self,
        email: &str,
        unique_key: &str,
        name: &str,
    ) -> AppResult<AdminModel> {
        if !self.admin_config.accepts(unique_key) {
            tracing::warn!("Rejected admin setup attempt for {}", email);
            return Err(AppError::Forbidden);
        }

        let email = email.trim().to_lowercase();
        let name = name.trim().to_string();
        let key_hash = hash_key(unique_key)?;
        let now = chrono::Utc::now().naive_utc();

        let txn = self.db.begin().await?;

        let existing_user = User::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&txn)
            .await?;
        match existing_user {
            Some(existing) => {
                let mut active: user::ActiveModel = existing.into();
                active.is_admin = Set(true);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                // Placeholder uid until the person signs in with their provider.
                let placeholder = user::ActiveModel {
                    firebase_uid: Set(format!("{}{}", PLACEHOLDER_UID_PREFIX, uuid::Uuid::new_v4())),
                    email: Set(email.clone()),
                    name: Set(name.clone()),
                    picture: Set(None),
                    is_pro: Set(false),
                    is_admin: Set(true),
                    contribution_count: Set(0),
                    contribution_points: Set(0),
                    last_login_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                placeholder.insert(&txn).await?;
            }
        }

        let existing_admin = Admin::find()
            .filter(admin::Column::Email.eq(email.as_str()))
            .one(&txn)
            .await?;
        let admin = match existing_admin {
            Some(existing) => {
                let mut active: admin::ActiveModel = existing.into();
                active.name = Set(name);
                active.key_hash = Set(key_hash);
                active.update(&txn).await?
            }
            None => {
                admin::ActiveModel {
                    email: Set(email),
                    name: Set(name),
                    key_hash: Set(key_hash),
                    created_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };

        txn.commit().await?;
        tracing::info!(admin_id = admin.id, "Admin account set up");
        Ok(admin)
    }

    /// Key login for admins. Returns the admin record, its user and a
    /// session token.
    pub async fn admin_login(
        &self,
        email: &str,
        unique_key: &str,
    ) -> AppResult<(AdminModel, UserModel, String)> {
        let email = email.trim().to_lowercase();

        let admin = Admin::find()
            .filter(admin::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_key(unique_key, &admin.key_hash)? {
            return Err(AppError::Unauthorized);
        }

        let user = self
            .find_by_email(&email)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if !user.is_admin {
            return Err(AppError::Forbidden);
        }

        let mut active: user::ActiveModel = user.into();
        active.last_login_at = Set(Some(chrono::Utc::now().naive_utc()));
        let user = active.update(&self.db).await?;

        let token = encode_session_token(user.id, &user.email)?;
        Ok((admin, user, token))
    }

    async fn find_by_uid(&self, uid: &str) -> AppResult<Option<UserModel>> {
        Ok(User::find()
            .filter(user::Column::FirebaseUid.eq(uid))
            .one(&self.db)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserModel>> {
        Ok(User::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }
}
