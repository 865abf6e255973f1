use crate::models::content::SiteContent;
use garde::Validate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Display format for phones: `(DD) DDDD-DDDD` or `(DD) DDDDD-DDDD`.
pub static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\d{2}\) \d{4,5}-\d{4}$").expect("phone pattern"));

/// Social links must be absolute http(s) URLs.
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://.+").expect("url pattern"));

/// A single structural violation, addressed by field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// The result of whole-record validation.
///
/// Validation is total: every field is evaluated and every violation is
/// reported, so the editor can surface them all at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(Vec<FieldError>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The violations, empty when valid.
    pub fn errors(&self) -> &[FieldError] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }
}

/// Validates a candidate content record against the field rules.
///
/// Never mutates the input and never fails with anything other than the
/// error-list variant.
pub fn validate_site_content(record: &SiteContent) -> ValidationOutcome {
    match record.validate() {
        Ok(()) => ValidationOutcome::Valid,
        Err(report) => {
            let errors: Vec<FieldError> = report
                .iter()
                .map(|(path, error)| FieldError {
                    field: path.to_string(),
                    message: error.to_string(),
                })
                .collect();

            tracing::debug!("Content record rejected with {} violations", errors.len());
            ValidationOutcome::Invalid(errors)
        }
    }
}

/// Custom rule: a social link is either empty or an absolute http(s) URL.
pub fn social_url(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() {
        return Ok(());
    }

    if URL_RE.is_match(value) && url::Url::parse(value).is_ok() {
        Ok(())
    } else {
        Err(garde::Error::new("not an absolute http(s) URL"))
    }
}

/// Normalizes a raw digit string into the display phone format.
///
/// 11 digits become `(DD) DDDDD-DDDD`, 10 digits `(DD) DDDD-DDDD`; anything
/// else is returned unchanged for the validator to reject.
pub fn format_phone_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        11 => format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..]),
        10 => format!("({}) {}-{}", &digits[..2], &digits[2..6], &digits[6..]),
        _ => phone.to_string(),
    }
}
