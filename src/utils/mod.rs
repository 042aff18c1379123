use actix_web::{web, FromRequest};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::error,
    constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
    modules::user::schema::UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TypeClaims {
    RefreshToken,
    AccessToken,
}

/// JWT claims issued by the auth service. Only access tokens are accepted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: uuid::Uuid,
    pub iat: u64,
    pub exp: u64,
    pub jti: Option<uuid::Uuid>,
    pub role: UserRole,
    pub _type: Option<TypeClaims>,
}

impl Claims {
    pub fn new(sub: &uuid::Uuid, role: &UserRole, exp: u64) -> Self {
        let now = chrono::Utc::now().timestamp() as u64;
        Claims { sub: *sub, iat: now, exp: now + exp, role: role.clone(), jti: None, _type: None }
    }

    pub fn with_type(mut self, _type: TypeClaims) -> Self {
        self._type = Some(_type);
        self
    }

    pub fn encode(&self, secret: &[u8]) -> Result<String, error::SystemError> {
        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, self, &EncodingKey::from_secret(secret))?;
        Ok(token)
    }

    pub fn decode(token: &str, secret: &[u8]) -> Result<Self, error::SystemError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        let token_data = decode::<Self>(token, &DecodingKey::from_secret(secret), &validation)?;
        Ok(token_data.claims)
    }

    /// Decodes a token and rejects anything that is not an access token.
    pub fn decode_access(token: &str, secret: &[u8]) -> Result<Self, error::SystemError> {
        let claims = Self::decode(token, secret)?;
        if claims._type.as_ref() != Some(&TypeClaims::AccessToken) {
            return Err(error::SystemError::unauthorized("Access token required"));
        }
        Ok(claims)
    }
}

/// Accepts both `Bearer <jwt>` and a bare token.
pub fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    value.strip_prefix("Bearer ").map(str::trim).unwrap_or(value)
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Position in a newest-first message listing: the last row already seen.
/// Older cursors carry only the timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub id: Option<uuid::Uuid>,
}

impl Cursor {
    pub fn after(created_at: chrono::DateTime<chrono::Utc>, id: uuid::Uuid) -> Self {
        Cursor { created_at, id: Some(id) }
    }

    /// `<rfc3339 with microseconds>_<uuid>`
    pub fn encode(&self) -> String {
        let at = self.created_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
        match self.id {
            Some(id) => format!("{at}_{id}"),
            None => at,
        }
    }
}

pub fn parse_cursor(cursor: Option<&str>) -> Result<Option<Cursor>, error::SystemError> {
    let invalid = || error::SystemError::bad_request("Invalid cursor format");

    let Some(raw) = cursor.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };

    let (at, id) = match raw.rsplit_once('_') {
        Some((at, id)) => (at, Some(uuid::Uuid::parse_str(id).map_err(|_| invalid())?)),
        None => (raw, None),
    };
    let created_at = chrono::DateTime::parse_from_rfc3339(at)
        .map_err(|_| invalid())?
        .with_timezone(&chrono::Utc);

    Ok(Some(Cursor { created_at, id }))
}

pub struct ValidatedJson<T>(pub T);

impl<T> FromRequest for ValidatedJson<T>
where
    T: Validate + serde::de::DeserializeOwned + 'static,
{
    type Error = error::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let fut = web::Json::<T>::from_request(req, payload);

        Box::pin(async move {
            let json = fut.await.map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            let model = json.into_inner();
            model.validate().map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            Ok(ValidatedJson(model))
        })
    }
}

pub struct ValidatedQuery<T>(pub T);

impl<T> FromRequest for ValidatedQuery<T>
where
    T: Validate + serde::de::DeserializeOwned + 'static,
{
    type Error = error::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let fut = web::Query::<T>::from_request(req, payload);

        Box::pin(async move {
            let query = fut.await.map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            query.validate().map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            Ok(ValidatedQuery(query.into_inner()))
        })
    }
}
