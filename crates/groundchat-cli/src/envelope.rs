use groundchat_core::Error;
use serde::Serialize;

pub(crate) const SCHEMA_VERSION: u64 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    InvalidUrl,
    NotConfigured,
    NotSupported,
    NotFound,
    FetchFailed,
    RenderFailed,
    NoVisibleText,
    PdfFailed,
    ModelFailed,
    Expired,
    IoError,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::InvalidUrl => "invalid_url",
            Self::NotConfigured => "not_configured",
            Self::NotSupported => "not_supported",
            Self::NotFound => "not_found",
            Self::FetchFailed => "fetch_failed",
            Self::RenderFailed => "render_failed",
            Self::NoVisibleText => "no_visible_text",
            Self::PdfFailed => "pdf_failed",
            Self::ModelFailed => "model_failed",
            Self::Expired => "expired",
            Self::IoError => "io_error",
        }
    }

    pub(crate) fn retryable(self) -> bool {
        match self {
            Self::FetchFailed | Self::RenderFailed | Self::ModelFailed => true,
            Self::InvalidParams
            | Self::InvalidUrl
            | Self::NotConfigured
            | Self::NotSupported
            | Self::NotFound
            | Self::NoVisibleText
            | Self::PdfFailed
            | Self::Expired
            | Self::IoError => false,
        }
    }

    pub(crate) fn hint(self) -> &'static str {
        match self {
            Self::InvalidUrl => "Pass an absolute http(s) URL.",
            Self::NotConfigured => {
                "Run `groundchat doctor`. Browser rendering needs Node.js with Playwright; set GROUNDCHAT_RENDER_DISABLE=1 to skip it."
            }
            Self::FetchFailed => "The page could not be fetched. Check the URL or raise GROUNDCHAT_FETCH_TIMEOUT_MS.",
            Self::RenderFailed => "The headless browser failed. Raise GROUNDCHAT_RENDER_TIMEOUT_MS or try --mode static.",
            Self::NoVisibleText => "The page rendered no visible text (JS/auth wall?). Try a different URL.",
            Self::PdfFailed => "The file is not a readable PDF.",
            Self::ModelFailed => "Check GROUNDCHAT_OPENAI_API_KEY and GROUNDCHAT_OPENAI_BASE_URL.",
            Self::Expired => "Start a new session, or use --tier paid.",
            Self::NotFound => "Use /links to see valid link numbers.",
            Self::InvalidParams | Self::NotSupported | Self::IoError => "",
        }
    }
}

impl From<&Error> for ErrorCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::InvalidUrl(_) => Self::InvalidUrl,
            Error::Fetch(_) => Self::FetchFailed,
            Error::Render(_) => Self::RenderFailed,
            Error::NoVisibleText(_) => Self::NoVisibleText,
            Error::Pdf(_) => Self::PdfFailed,
            Error::Llm(_) => Self::ModelFailed,
            Error::Validation(_) => Self::InvalidParams,
            Error::NotFound(_) => Self::NotFound,
            Error::Expired(_) => Self::Expired,
            Error::NotConfigured(_) => Self::NotConfigured,
            Error::NotSupported(_) => Self::NotSupported,
        }
    }
}

pub(crate) fn add_envelope_fields(payload: &mut serde_json::Value, kind: &str, elapsed_ms: u128) {
    payload["schema_version"] = serde_json::json!(SCHEMA_VERSION);
    payload["kind"] = serde_json::json!(kind);
    payload["elapsed_ms"] = serde_json::json!(elapsed_ms);
}

pub(crate) fn error_obj(
    code: ErrorCode,
    message: impl ToString,
    hint: impl ToString,
) -> serde_json::Value {
    #[derive(Serialize)]
    struct ErrorObject {
        code: &'static str,
        message: String,
        hint: String,
        retryable: bool,
    }

    let e = ErrorObject {
        code: code.as_str(),
        message: message.to_string(),
        hint: hint.to_string(),
        retryable: code.retryable(),
    };
    match serde_json::to_value(e) {
        Ok(v) => v,
        Err(_) => serde_json::json!({
            "code": code.as_str(),
            "message": message.to_string(),
            "hint": hint.to_string(),
            "retryable": code.retryable()
        }),
    }
}

/// `{schema_version, kind, ok: false, error}` for a failed command.
pub(crate) fn failure(kind: &str, code: ErrorCode, message: impl ToString, elapsed_ms: u128) -> serde_json::Value {
    let mut v = serde_json::json!({
        "ok": false,
        "error": error_obj(code, message, code.hint()),
    });
    add_envelope_fields(&mut v, kind, elapsed_ms);
    v
}

pub(crate) fn failure_from(kind: &str, e: &Error, elapsed_ms: u128) -> serde_json::Value {
    failure(kind, ErrorCode::from(e), e, elapsed_ms)
}
