use crate::domain::HttpClient;
use crate::utils::error::{HttpError, Result};
use reqwest::{Response, StatusCode};

fn ensure_success(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::debug!("{} returned {}", url, status);
        Err(HttpError::Status {
            status,
            url: url.to_string(),
        })
    }
}

/// GET `url` and return the body as text. Non-2xx statuses are errors.
pub async fn fetch_text<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<String> {
    let response = ensure_success(client.get(url).await?, url)?;
    Ok(response.text().await?)
}

pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let response = ensure_success(client.get(url).await?, url)?;
    Ok(response.bytes().await?.to_vec())
}

/// HEAD `url` and report the status, whatever it is.
pub async fn probe<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<StatusCode> {
    Ok(client.head(url).await?.status())
}
