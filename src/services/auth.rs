// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;

use crate::{
    common::{db_utils::retry_transient, error::AppError},
    db::{AccountRepository, CompanyRepository, EmployeeRepository},
    models::identity::{Account, Claims, Session, ADMIN_DISPLAY_NAME},
};

/// Assina e valida os tokens de sessão (HS256).
#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
    ttl: chrono::Duration,
}

impl TokenCodec {
    pub fn new(secret: impl Into<String>, ttl: chrono::Duration) -> Self {
        Self { secret: secret.into(), ttl }
    }

    pub fn issue(&self, session: &Session) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;

        let claims = Claims {
            sub: session.account_id,
            company_id: session.company_id,
            is_admin: session.is_admin,
            employee_id: session.employee_id,
            name: session.display_name.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )?)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
    }
}

#[derive(Clone)]
pub struct AuthService {
    account_repo: AccountRepository,
    company_repo: CompanyRepository,
    employee_repo: EmployeeRepository,
    tokens: TokenCodec,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        account_repo: AccountRepository,
        company_repo: CompanyRepository,
        employee_repo: EmployeeRepository,
        tokens: TokenCodec,
        pool: PgPool,
    ) -> Self {
        Self { account_repo, company_repo, employee_repo, tokens, pool }
    }

    /// Cria a empresa e a conta de administrador, ou nada.
    pub async fn register(
        &self,
        company_name: &str,
        phone: &str,
        password: &str,
    ) -> Result<Account, AppError> {
        // 1. Duplicidade antes de qualquer escrita
        if self.company_repo.name_exists(company_name).await? {
            return Err(AppError::DuplicateCompanyName);
        }
        if self.account_repo.login_exists(&self.pool, phone).await? {
            return Err(AppError::DuplicateLogin);
        }

        // 2. Hashing (fora da transação, não toca no banco)
        let password_hash = hash_password(password).await?;

        // 3. Empresa + admin na mesma transação; corridas caem nas constraints únicas
        let mut tx = self.pool.begin().await?;

        let company = self.company_repo.create_company(&mut *tx, company_name).await?;
        let account = self
            .account_repo
            .create_account(&mut *tx, phone, &password_hash, true, company.id)
            .await?;

        tx.commit().await?;

        tracing::info!(company_id = company.id, account_id = account.id, "Empresa registrada");
        Ok(account)
    }

    /// Autentica e devolve o token junto com a sessão que ele carrega.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<(String, Session), AppError> {
        let Some(account) = self.account_repo.find_by_login(login).await? else {
            tracing::info!("Falha de login: credenciais inválidas");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password, &account.password_hash).await? {
            tracing::info!(account_id = account.id, "Falha de login: credenciais inválidas");
            return Err(AppError::InvalidCredentials);
        }

        let session = self.session_for(&account).await?;
        let token = self.tokens.issue(&session)?;

        tracing::info!(
            account_id = account.id,
            company_id = account.company_id,
            is_admin = account.is_admin,
            "Login efetuado"
        );
        Ok((token, session))
    }

    /// Decodifica o token e confirma que a conta ainda existe.
    pub async fn validate_token(&self, token: &str) -> Result<Session, AppError> {
        let claims = self.tokens.decode(token)?;

        let account = retry_transient("find_account", || self.account_repo.find_by_id(claims.sub))
            .await?
            .ok_or(AppError::InvalidToken)?;

        if account.company_id != claims.company_id || account.is_admin != claims.is_admin {
            return Err(AppError::InvalidToken);
        }

        Ok(Session::from(&claims))
    }

    async fn session_for(&self, account: &Account) -> Result<Session, AppError> {
        if account.is_admin {
            return Ok(Session {
                account_id: account.id,
                company_id: account.company_id,
                is_admin: true,
                employee_id: None,
                display_name: ADMIN_DISPLAY_NAME.to_string(),
            });
        }

        let employee = self
            .employee_repo
            .find_by_phone(account.company_id, &account.login)
            .await?;

        Ok(Session {
            account_id: account.id,
            company_id: account.company_id,
            is_admin: false,
            employee_id: employee.as_ref().map(|e| e.id),
            display_name: employee.map(|e| e.display_name()).unwrap_or_else(|| account.login.clone()),
        })
    }
}

pub(crate) async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            account_id: 7,
            company_id: 3,
            is_admin: false,
            employee_id: Some(11),
            display_name: "Petrenko Ivan".into(),
        }
    }

    #[test]
    fn token_carries_the_whole_session() {
        let codec = TokenCodec::new("segredo", chrono::Duration::hours(1));
        let token = codec.issue(&session()).unwrap();
        let claims = codec.decode(&token).unwrap();
        assert_eq!(Session::from(&claims), session());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = TokenCodec::new("a", chrono::Duration::hours(1)).issue(&session()).unwrap();
        let result = TokenCodec::new("b", chrono::Duration::hours(1)).decode(&token);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = TokenCodec::new("segredo", chrono::Duration::hours(-2));
        let token = codec.issue(&session()).unwrap();
        assert!(matches!(codec.decode(&token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn password_hash_verifies_only_the_original() {
        let hashed = hash_password("pw").await.unwrap();
        assert!(verify_password("pw", &hashed).await.unwrap());
        assert!(!verify_password("wrong", &hashed).await.unwrap());
    }
}
