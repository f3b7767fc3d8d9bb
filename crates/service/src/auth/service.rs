use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::rngs::OsRng;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use models::user::NewUser;

use super::domain::{AuthSession, AuthUser, Claims, LoginInput};
use super::errors::AuthError;
use super::repository::UserRepository;

/// Token settings
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

/// Auth business service independent of web framework
pub struct AuthService {
    repo: Arc<dyn UserRepository>,
    cfg: AuthSettings,
}

impl AuthService {
    pub fn new(repo: Arc<dyn UserRepository>, cfg: AuthSettings) -> Self { Self { repo, cfg } }

    pub fn repository(&self) -> &dyn UserRepository { self.repo.as_ref() }

    /// Hash a password into an argon2 PHC string.
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string())
    }

    /// Check credentials and issue a token.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{AuthService, AuthSettings};
    /// use service::auth::domain::LoginInput;
    /// use service::auth::repository::mock::MockUserRepository;
    /// let repo = Arc::new(MockUserRepository::new());
    /// let svc = AuthService::new(repo, AuthSettings { jwt_secret: "secret".into(), token_ttl_hours: 1 });
    /// tokio_test::block_on(svc.ensure_staff_user("admin", "Passw0rd!", "")).unwrap();
    /// let session = tokio_test::block_on(svc.login(LoginInput { username: "admin".into(), password: "Passw0rd!".into() })).unwrap();
    /// assert!(session.user.is_staff);
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let stored = self.repo
            .find_by_username(input.username.trim())
            .await?
            .ok_or(AuthError::Unauthorized)?;
        if !stored.user.is_active {
            return Err(AuthError::Unauthorized);
        }

        // non-PHC hashes ("!" and friends) never verify
        let Ok(parsed) = PasswordHash::new(&stored.password_hash) else {
            debug!("stored hash is unusable");
            return Err(AuthError::Unauthorized);
        };
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }

        let token = self.issue_token(&stored.user)?;
        info!(user_id = %stored.user.id, "user_logged_in");
        Ok(AuthSession { user: stored.user, token })
    }

    pub fn issue_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(self.cfg.token_ttl_hours)).timestamp() as usize;
        let claims = Claims { sub: user.id.to_string(), username: user.username.clone(), exp };
        encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Signature and expiry check only.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.cfg.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| AuthError::TokenError(e.to_string()))?;
        Ok(data.claims)
    }

    /// Resolve a token to a currently active user.
    pub async fn authenticate_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.verify_token(token)?;
        let id = Uuid::parse_str(&claims.sub).map_err(|e| AuthError::TokenError(e.to_string()))?;
        let user = self.repo.find_by_id(id).await?.ok_or(AuthError::Unauthorized)?;
        if !user.is_active {
            return Err(AuthError::Inactive);
        }
        Ok(user)
    }

    /// Create a staff superuser unless the username already exists.
    #[instrument(skip(self, password, email))]
    pub async fn ensure_staff_user(&self, username: &str, password: &str, email: &str) -> Result<AuthUser, AuthError> {
        if let Some(existing) = self.repo.find_by_username(username.trim()).await? {
            debug!(user_id = %existing.user.id, "bootstrap user exists");
            return Ok(existing.user);
        }
        if password.len() < 8 {
            return Err(AuthError::Validation("password too short (>=8)".into()));
        }
        let user = self.repo
            .create_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: Self::hash_password(password)?,
                is_staff: true,
                is_superuser: true,
            })
            .await?;
        info!(user_id = %user.id, "bootstrap_staff_user_created");
        Ok(user)
    }
}
