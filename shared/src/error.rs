use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::capabilities::InvalidUrl;
use crate::config::ConfigError;
use crate::image_processing::ImageProcessingError;
use crate::model::ValidationError;
use crate::MAX_IMAGE_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Transport,
    Timeout,
    NotFound,
    Conflict,
    Rejected,
    Server,
    Deserialization,
    ImageProcessing,
    ImageTooLarge,
    ImageFormatUnsupported,
    InvalidState,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Transport => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Rejected => "REJECTED",
            Self::Server => "SERVER_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::ImageProcessing => "IMAGE_PROCESSING_ERROR",
            Self::ImageTooLarge => "IMAGE_TOO_LARGE",
            Self::ImageFormatUnsupported => "IMAGE_FORMAT_UNSUPPORTED",
            Self::InvalidState => "INVALID_STATE",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Whether re-issuing the same request can reasonably succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Transport | Self::Timeout | Self::Server | Self::Conflict
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation | ErrorKind::Rejected => self.message.clone(),
            ErrorKind::Transport => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::Conflict => {
                "This action conflicts with a recent change. Please refresh and try again.".into()
            }
            ErrorKind::Server => "The server could not complete the request. Please try again.".into(),
            ErrorKind::Deserialization => {
                "The server sent a response that could not be read.".into()
            }
            ErrorKind::ImageProcessing => {
                "Unable to process the image. Please try a different picture.".into()
            }
            ErrorKind::ImageTooLarge => format!(
                "The image is too large. Please use an image smaller than {} MB.",
                MAX_IMAGE_BYTES / (1024 * 1024)
            ),
            ErrorKind::ImageFormatUnsupported => {
                "This file is not a supported image. Please use JPEG, PNG, GIF or WebP.".into()
            }
            ErrorKind::InvalidState => self.message.clone(),
            ErrorKind::Unknown => "An unexpected error occurred. Please try again.".into(),
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            409 => ErrorKind::Conflict,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        };

        let message = body
            .and_then(|b| serde_json::from_slice::<ApiErrorResponse>(b).ok())
            .and_then(ApiErrorResponse::into_text)
            .unwrap_or_else(|| format!("HTTP error: {status}"));

        Self::new(kind, message).with_context("http_status", status.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorResponse {
    fn into_text(self) -> Option<String> {
        self.error
            .or(self.message)
            .filter(|text| !text.trim().is_empty())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<crux_http::Error> for AppError {
    fn from(e: crux_http::Error) -> Self {
        let kind = match &e {
            crux_http::Error::Http(status) => {
                return Self::from_http_status(u16::from(status.code), status.body.as_deref())
                    .with_internal(status.message.clone());
            }
            crux_http::Error::Timeout => ErrorKind::Timeout,
            crux_http::Error::Json(_) => ErrorKind::Deserialization,
            crux_http::Error::Url(_) => ErrorKind::InvalidState,
            crux_http::Error::Io(_) => ErrorKind::Transport,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<InvalidUrl> for AppError {
    fn from(e: InvalidUrl) -> Self {
        Self::new(ErrorKind::InvalidState, e.to_string())
    }
}

impl From<ImageProcessingError> for AppError {
    fn from(e: ImageProcessingError) -> Self {
        let kind = match &e {
            ImageProcessingError::InputTooLarge { .. }
            | ImageProcessingError::ImageTooLarge { .. } => ErrorKind::ImageTooLarge,
            ImageProcessingError::NotAnImage { .. } | ImageProcessingError::UnsupportedFormat => {
                ErrorKind::ImageFormatUnsupported
            }
            _ => ErrorKind::ImageProcessing,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        Self::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::new(ErrorKind::Validation, e.to_string())
    }
}
