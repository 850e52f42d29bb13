// src/services/auth.rs

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::{
    common::error::AppError,
    models::auth::{Claims, CurrentUser},
};

// A autenticação em si (registro, login, emissão de tokens) vive no
// serviço hospedado. Aqui só validamos o token e lemos a identidade.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<CurrentUser, AppError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(CurrentUser::from(data.claims))
    }
}
