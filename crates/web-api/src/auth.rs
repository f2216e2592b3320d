//! 会话令牌
//!
//! 登录时为昵称签发 JWT，之后的请求凭 Bearer token 还原出聊天用户。

use axum::http::HeaderMap;
use config::SessionConfig;
use domain::{ChatUser, Nickname, UserId};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub nickname: String,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

/// 会话令牌服务
#[derive(Clone)]
pub struct SessionTokens {
    expiration_hours: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionTokens {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            expiration_hours: config.expiration_hours,
            encoding_key: EncodingKey::from_secret(config.secret.as_ref()),
            decoding_key: DecodingKey::from_secret(config.secret.as_ref()),
        }
    }

    /// 为用户签发 token
    pub fn issue(&self, user: &ChatUser) -> Result<String, ApiError> {
        let exp = chrono::Utc::now() + chrono::Duration::hours(self.expiration_hours);
        let claims = Claims {
            user_id: Uuid::from(user.id),
            nickname: user.nickname.as_str().to_owned(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|err| {
            ApiError::internal_server_error(format!("Token generation failed: {}", err))
        })
    }

    /// 验证 token 并还原用户
    pub fn verify(&self, token: &str) -> Result<ChatUser, ApiError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(|err| ApiError::unauthorized(format!("Invalid token: {}", err)))?;

        let nickname = Nickname::parse(claims.nickname)
            .map_err(|_| ApiError::unauthorized("Invalid token: malformed nickname"))?;
        Ok(ChatUser::new(UserId::from(claims.user_id), nickname))
    }

    /// 从 Authorization 头中提取用户
    pub fn user_from_headers(&self, headers: &HeaderMap) -> Result<ChatUser, ApiError> {
        let auth_header = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization header format"))?;

        self.verify(token)
    }
}

/// 登录响应结构
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: ChatUser,
}
