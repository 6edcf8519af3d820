// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    models::auth::{Caller, CallerRole, Claims},
};

/// Só valida tokens. A emissão fica com o serviço de login.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<Caller, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::InvalidToken
        })?;

        let claims = token_data.claims;
        Ok(Caller {
            role: CallerRole::from_claim(&claims.role),
            username: claims.sub,
        })
    }

    #[cfg(test)]
    pub fn issue_token(&self, username: &str, role: &str, ttl: chrono::Duration) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = chrono::Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            role: role.to_string(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn valid_token_yields_caller() {
        let svc = AuthService::new("segredo".into());
        let token = svc.issue_token("maria", "RFA", Duration::hours(1));
        let caller = svc.validate_token(&token).unwrap();
        assert_eq!(caller.username, "maria");
        assert_eq!(caller.role, CallerRole::Manager("RFA".into()));

        let token = svc.issue_token("root", "adm", Duration::hours(1));
        assert_eq!(svc.validate_token(&token).unwrap().role, CallerRole::Admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = AuthService::new("outro".into()).issue_token("maria", "RFA", Duration::hours(1));
        let err = AuthService::new("segredo".into()).validate_token(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = AuthService::new("segredo".into());
        let token = svc.issue_token("maria", "RFA", Duration::hours(-2));
        assert!(matches!(svc.validate_token(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn garbage_is_rejected() {
        let svc = AuthService::new("segredo".into());
        assert!(svc.validate_token("nao-e-um-jwt").is_err());
    }
}
