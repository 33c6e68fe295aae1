//! SDK error → [`RemoteError`] mapping.

use crate::provider::RemoteError;
use aws_sdk_apigateway::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::error::Error as StdError;
use std::fmt::Debug;

pub(super) fn classify<E, R>(err: SdkError<E, R>) -> RemoteError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    if matches!(err, SdkError::ConstructionFailure(_)) {
        return RemoteError::InvalidInput(message);
    }
    from_code(err.code(), message)
}

fn from_code(code: Option<&str>, message: String) -> RemoteError {
    match code {
        Some("NotFoundException") => RemoteError::NotFound(message),
        Some("TooManyRequestsException" | "LimitExceededException") => {
            RemoteError::Throttled(message)
        }
        Some("ConflictException") => RemoteError::Conflict {
            existing: None,
            message,
        },
        Some("UnauthorizedException" | "AccessDeniedException") => {
            RemoteError::Unauthorized(message)
        }
        Some("BadRequestException") => RemoteError::InvalidInput(message),
        _ => RemoteError::Unknown(message),
    }
}
