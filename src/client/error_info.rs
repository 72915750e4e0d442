//! Translation of unexpected API responses into [`Error`] values.

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};

use super::response::ApiResponse;
use crate::error::ApiError;
use crate::{Error, Result};

/// Header carrying the two-factor challenge.
pub const OTP_HEADER: &str = "X-GitHub-OTP";

/// Action name of the current-user lookup; its errors get an extra hint.
pub const CURRENT_USER_ACTION: &str = "getting current user";

const INTEGRATION_DENIED: &str = "Resource not accessible by integration";
const GITHUB_USER_HINT: &str = "You must specify GITHUB_USER via environment variable.";

/// A single field-level validation problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    /// Resource the field belongs to, e.g. `PullRequest`
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource: String,
    /// Field name
    #[serde(default, deserialize_with = "null_as_default")]
    pub field: String,
    /// One of `custom`, `missing_field`, `already_exists`, `invalid`,
    /// `unauthorized`
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    /// Free-form message, used by `custom`
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

impl FieldError {
    /// Create a field error with the given code.
    pub fn new(code: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            field: field.into(),
            ..Default::default()
        }
    }

    /// Create a `custom` error carrying only a message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self {
            code: "custom".to_string(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Human-readable sentence for this error; `None` for unknown codes.
    pub fn sentence(&self) -> Option<String> {
        match self.code.as_str() {
            "custom" => Some(self.message.clone()),
            "missing_field" => Some(format!("Missing field: \"{}\"", self.field)),
            "already_exists" => Some(format!("Duplicate value for \"{}\"", self.field)),
            "invalid" => Some(format!("Invalid value for \"{}\"", self.field)),
            "unauthorized" => Some(format!("Not allowed to change field \"{}\"", self.field)),
            _ => None,
        }
    }
}

/// The two error body shapes the API produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPayload {
    /// `{"message": "...", "errors": [{"field": ..., "code": ...}]}`
    Structured {
        /// Top-level message
        message: String,
        /// Field errors
        errors: Vec<FieldError>,
    },
    /// `{"message": "...", "errors": ["..."]}`
    Flattened {
        /// Top-level message
        message: String,
        /// Plain error strings
        errors: Vec<String>,
    },
}

/// Decode `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Deserialize)]
struct StructuredBody {
    #[serde(default, deserialize_with = "null_as_default")]
    message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    errors: Vec<FieldError>,
}

#[derive(Deserialize)]
struct FlattenedBody {
    #[serde(default, deserialize_with = "null_as_default")]
    message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    errors: Vec<String>,
}

impl ErrorPayload {
    /// Parse an error body, trying the structured shape first.
    ///
    /// When neither shape matches, the structured parse error is returned.
    pub fn parse(body: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        match serde_json::from_slice::<StructuredBody>(body) {
            Ok(parsed) => Ok(Self::Structured {
                message: parsed.message,
                errors: parsed.errors,
            }),
            Err(structured_err) => match serde_json::from_slice::<FlattenedBody>(body) {
                Ok(parsed) => Ok(Self::Flattened {
                    message: parsed.message,
                    errors: parsed.errors,
                }),
                Err(_) => Err(structured_err),
            },
        }
    }

    /// Normalize into a message plus field errors. Flattened strings become
    /// `custom` errors.
    pub fn into_parts(self) -> (String, Vec<FieldError>) {
        match self {
            Self::Structured { message, errors } => (message, errors),
            Self::Flattened { message, errors } => {
                (message, errors.into_iter().map(FieldError::custom).collect())
            }
        }
    }
}

/// Parsed error body plus the response metadata needed to render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Top-level message
    pub message: String,
    /// Field errors
    pub errors: Vec<FieldError>,
    /// HTTP status code
    pub status: u16,
    /// HTTP reason phrase
    pub reason: String,
    /// Value of the `X-GitHub-OTP` response header, if any
    pub otp: Option<String>,
}

impl ErrorInfo {
    /// Render the user-facing message for a failed `action`.
    ///
    /// ```
    /// use hub_rs::client::{ErrorInfo, FieldError};
    ///
    /// let info = ErrorInfo {
    ///     message: "Validation Failed".into(),
    ///     errors: vec![FieldError::new("invalid", "base")],
    ///     status: 422,
    ///     reason: "Unprocessable Entity".into(),
    ///     otp: None,
    /// };
    /// assert_eq!(
    ///     info.render("creating pull request"),
    ///     "Error creating pull request: Unprocessable Entity (HTTP 422)\nInvalid value for \"base\""
    /// );
    /// ```
    pub fn render(&self, action: &str) -> String {
        let mut rendered = format!("Error {}: {} (HTTP {})", action, self.reason, self.status);

        let sentences: Vec<String> = self.errors.iter().filter_map(FieldError::sentence).collect();
        let detail = if !sentences.is_empty() {
            sentences.join("\n")
        } else if action == CURRENT_USER_ACTION && self.message == INTEGRATION_DENIED {
            format!("{}\n{}", self.message, GITHUB_USER_HINT)
        } else {
            self.message.clone()
        };

        if !detail.is_empty() {
            rendered.push('\n');
            rendered.push_str(&detail);
        }
        rendered
    }

    /// Returns `true` if the server asked for a one-time code.
    pub fn requires_two_factor(&self) -> bool {
        self.otp
            .as_deref()
            .is_some_and(|value| value.starts_with("required;"))
    }
}

/// Turn an unexpected response into an error for `action`.
///
/// Consumes the response body. A body matching neither error shape yields
/// [`Error::UnparsableError`].
pub async fn translate(action: &str, response: ApiResponse) -> Error {
    let status = response.status().as_u16();
    let reason = response.reason().to_string();
    let otp = response
        .headers()
        .get(OTP_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => return err,
    };

    match ErrorPayload::parse(&body) {
        Ok(payload) => {
            let (message, errors) = payload.into_parts();
            let info = ErrorInfo {
                message,
                errors,
                status,
                reason,
                otp,
            };
            ApiError {
                action: action.to_string(),
                message: info.render(action),
                info,
            }
            .into()
        }
        Err(source) => Error::UnparsableError {
            action: action.to_string(),
            status,
            source,
        },
    }
}

/// Pass through a response with the `expected` status; translate anything
/// else. Transport failures are tagged with `action`.
pub(crate) async fn check_status(
    expected: StatusCode,
    action: &str,
    result: Result<ApiResponse>,
) -> Result<ApiResponse> {
    let response = result.map_err(|err| err.in_action(action))?;

    if response.status() == expected {
        Ok(response)
    } else {
        Err(translate(action, response).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(message: &str, errors: Vec<FieldError>) -> ErrorInfo {
        ErrorInfo {
            message: message.into(),
            errors,
            status: 422,
            reason: "Unprocessable Entity".into(),
            otp: None,
        }
    }

    #[test]
    fn test_structured_payload() {
        let body = br#"{"message":"Validation Failed","errors":[{"resource":"PullRequest","field":"title","code":"missing_field"}]}"#;
        let (message, errors) = ErrorPayload::parse(body).unwrap().into_parts();
        assert_eq!(message, "Validation Failed");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].resource, "PullRequest");
        assert_eq!(errors[0].sentence().unwrap(), "Missing field: \"title\"");
    }

    #[test]
    fn test_flattened_payload_becomes_custom_errors() {
        let body = br#"{"message":"Validation Failed","errors":["No commits between main and main"]}"#;
        let payload = ErrorPayload::parse(body).unwrap();
        assert!(matches!(payload, ErrorPayload::Flattened { .. }));

        let (_, errors) = payload.into_parts();
        assert_eq!(errors, vec![FieldError::custom("No commits between main and main")]);
    }

    #[test]
    fn test_null_values_read_as_empty() {
        let body = br#"{"message":"Validation Failed","errors":[{"resource":"PullRequest","code":"custom","field":null,"message":"A pull request already exists for o:b."}]}"#;
        let (_, errors) = ErrorPayload::parse(body).unwrap().into_parts();
        assert_eq!(errors[0].field, "");
        assert_eq!(
            errors[0].sentence().unwrap(),
            "A pull request already exists for o:b."
        );

        let body = br#"{"message":null,"errors":[{"code":"missing_field","field":"title","resource":null}]}"#;
        let (message, errors) = ErrorPayload::parse(body).unwrap().into_parts();
        assert_eq!(message, "");
        let rendered = info(&message, errors).render("creating pull request");
        assert_eq!(
            rendered,
            "Error creating pull request: Unprocessable Entity (HTTP 422)\nMissing field: \"title\""
        );

        let body = br#"{"message":"Not Found","errors":null}"#;
        let (message, errors) = ErrorPayload::parse(body).unwrap().into_parts();
        assert_eq!(message, "Not Found");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_unparsable_payload() {
        assert!(ErrorPayload::parse(b"<html>oops</html>").is_err());
        assert!(ErrorPayload::parse(br#"{"errors":[1,2]}"#).is_err());
    }

    #[test]
    fn test_render_field_sentences() {
        let rendered = info(
            "Validation Failed",
            vec![
                FieldError::new("already_exists", "head"),
                FieldError::new("unauthorized", "base"),
                FieldError::new("something_new", "x"),
            ],
        )
        .render("creating pull request");

        assert_eq!(
            rendered,
            "Error creating pull request: Unprocessable Entity (HTTP 422)\n\
             Duplicate value for \"head\"\n\
             Not allowed to change field \"base\""
        );
    }

    #[test]
    fn test_render_falls_back_to_message() {
        let rendered = info("Validation Failed", vec![FieldError::new("weird", "x")])
            .render("creating pull request");
        assert_eq!(
            rendered,
            "Error creating pull request: Unprocessable Entity (HTTP 422)\nValidation Failed"
        );

        let bare = info("", vec![]).render("fetching pull requests");
        assert_eq!(bare, "Error fetching pull requests: Unprocessable Entity (HTTP 422)");
    }

    #[test]
    fn test_render_current_user_hint() {
        let mut denied = info(INTEGRATION_DENIED, vec![]);
        denied.status = 403;
        denied.reason = "Forbidden".into();

        assert_eq!(
            denied.render(CURRENT_USER_ACTION),
            "Error getting current user: Forbidden (HTTP 403)\n\
             Resource not accessible by integration\n\
             You must specify GITHUB_USER via environment variable."
        );
        assert!(!denied.render("fetching pull requests").contains("GITHUB_USER"));
    }

    #[test]
    fn test_two_factor_detection() {
        let mut challenge = info("Must specify two-factor authentication OTP code.", vec![]);
        challenge.otp = Some("required; sms".into());
        assert!(challenge.requires_two_factor());

        challenge.otp = Some("optional".into());
        assert!(!challenge.requires_two_factor());
    }
}
