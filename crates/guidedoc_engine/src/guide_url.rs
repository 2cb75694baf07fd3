use thiserror::Error;
use url::Url;

const VALID_HOSTS: &[&str] = &["steamcommunity.com", "www.steamcommunity.com"];
const GUIDE_PATH: &str = "/sharedfiles/filedetails/";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuideUrlError {
    #[error("url is empty")]
    Empty,
    #[error("invalid url format")]
    Invalid,
    #[error("host '{0}' is not steamcommunity.com")]
    WrongHost(String),
    #[error("url is not a steam guide link")]
    NotAGuide,
    #[error("guide id not found in url")]
    MissingId,
    #[error("invalid guide id '{0}'")]
    InvalidId(String),
}

/// Validates a user-supplied guide URL and returns its canonical form.
///
/// A missing scheme defaults to https, the host must be steamcommunity.com,
/// and the `id` query parameter must be numeric.
pub fn normalize_guide_url(input: &str) -> Result<String, GuideUrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(GuideUrlError::Empty);
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = Url::parse(&with_scheme).map_err(|_| GuideUrlError::Invalid)?;

    let host = parsed.host_str().ok_or(GuideUrlError::Invalid)?;
    if !VALID_HOSTS.contains(&host) {
        return Err(GuideUrlError::WrongHost(host.to_string()));
    }
    if !parsed.path().contains(GUIDE_PATH) {
        return Err(GuideUrlError::NotAGuide);
    }

    let id = parsed
        .query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .ok_or(GuideUrlError::MissingId)?;
    if !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(GuideUrlError::InvalidId(id));
    }

    Ok(format!(
        "https://steamcommunity.com/sharedfiles/filedetails/?id={id}"
    ))
}

/// Numeric guide id from an already-formed URL, if present.
pub fn extract_guide_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
}
