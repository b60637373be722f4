use aws_sdk_connect::error::{ProvideErrorMetadata, SdkError};
use reaper_core::{ProviderError, format_err_chain};
use thiserror::Error;

/// Failures outside the provider contract: setup, credentials, instance
/// listing.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("unsupported Amazon Connect region: {0}")]
    UnsupportedRegion(String),

    #[error("credential check failed: {0}")]
    Credentials(String),

    #[error("AWS error: {0}")]
    Aws(String),
}

/// Codes meaning the resource is already gone.
const NOT_FOUND_CODES: &[&str] = &["ResourceNotFoundException", "NotFoundException"];

/// Codes for throttling and rate limiting.
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
];

/// Server-side failures worth retrying.
const SERVICE_CODES: &[&str] = &["InternalServiceException", "ServiceUnavailableException"];

/// The resource is still referenced; usually clears once a dependent
/// deletion has propagated.
const IN_USE_CODES: &[&str] = &["ResourceInUseException", "ResourceConflictException"];

/// Classify an error code and message returned by Amazon Connect.
pub fn classify_code(operation: &str, code: Option<&str>, message: Option<&str>) -> ProviderError {
    let message = match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) => "unknown error".to_string(),
    };

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => ProviderError::not_found(operation, message),
        Some(c)
            if THROTTLING_CODES.contains(&c)
                || SERVICE_CODES.contains(&c)
                || IN_USE_CODES.contains(&c) =>
        {
            ProviderError::transient(operation, message)
        }
        _ => ProviderError::permanent(operation, message),
    }
}

/// Classify an SDK error. Transport-level failures (timeouts, dispatch,
/// unparseable responses) are transient; service errors go by code.
pub(crate) fn classify<E, R>(operation: &str, err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ProviderError::transient(operation, format_err_chain(&err))
        }
        _ => match err.code() {
            Some(code) => classify_code(operation, Some(code), err.message()),
            None => ProviderError::permanent(operation, format_err_chain(&err)),
        },
    }
}
