use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::error::{ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

/// MongoDB 唯一索引冲突的错误码
pub const DUPLICATE_KEY_CODE: i32 = 11000;

const GENERIC_FAILURE_MESSAGE: &str = "Internal server error, please retry later.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// 存储层返回了无法映射为领域模型的记录
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// 随机生成的会员ID与已有会员冲突，由服务层换一个ID重试
    #[error("User id {0} already exists")]
    UserIdTaken(String),

    #[error("unable to generate a unique id after {0} attempts")]
    IdGenerationExhausted(u32),

    #[error("mongodb error: {0}")]
    MongoError(mongodb::error::Error),

    #[error("{0}")]
    InternalServerErrorWithContext(String),

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::UserIdTaken(_) => StatusCode::CONFLICT,
            AppError::MalformedRecord(_)
            | AppError::IdGenerationExhausted(_)
            | AppError::MongoError(_)
            | AppError::InternalServerErrorWithContext(_)
            | AppError::AnyhowError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 事务因写冲突等原因被服务端中止，整笔事务可以重试
    pub fn is_transient_transaction_error(&self) -> bool {
        matches!(self, AppError::MongoError(err) if err.contains_label(TRANSIENT_TRANSACTION_ERROR))
    }

    /// 返回给调用方的信息，5xx 不暴露内部细节
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

/// 唯一索引冲突时返回服务端的错误信息，其中包含冲突的索引名
pub fn duplicate_key_message(err: &mongodb::error::Error) -> Option<&str> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE => {
            Some(write_error.message.as_str())
        }
        ErrorKind::Command(command_error) if command_error.code == DUPLICATE_KEY_CODE => {
            Some(command_error.message.as_str())
        }
        _ => None,
    }
}

/// 判断是否为唯一索引冲突
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    duplicate_key_message(err).is_some()
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            return AppError::Conflict("Record already exists".to_string());
        }

        match err.kind.as_ref() {
            ErrorKind::BsonDeserialization(e) => AppError::MalformedRecord(e.to_string()),
            _ => AppError::MongoError(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string().replace('\n', ", "))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("❌ request failed: {:?}", self);
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
