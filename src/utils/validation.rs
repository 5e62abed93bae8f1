use crate::utils::error::{HttpError, Result};
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 解析並檢查 URL，只接受 http / https
pub fn parse_http_url(url_str: &str) -> Result<Url> {
    if url_str.trim().is_empty() {
        return Err(HttpError::invalid_url(url_str, "URL cannot be empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| HttpError::invalid_url(url_str, format!("Invalid URL format: {}", e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(HttpError::invalid_url(
            url_str,
            format!("Unsupported URL scheme: {}", scheme),
        )),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HttpError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(HttpError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// 檢查 header 名稱與值是否合法，回傳解析後的結果
pub fn validate_header(
    field_name: &str,
    name: &str,
    value: &str,
) -> Result<(HeaderName, HeaderValue)> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| HttpError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: name.to_string(),
            reason: format!("Invalid header name: {}", e),
        })?;
    let header_value =
        HeaderValue::from_str(value).map_err(|e| HttpError::InvalidConfigValueError {
            field: format!("{}.{}", field_name, name),
            value: value.to_string(),
            reason: format!("Invalid header value: {}", e),
        })?;
    Ok((header_name, header_value))
}
