use std::time::Duration;

use reqwest::{
    header::{
        ACCEPT_ENCODING,
        USER_AGENT,
    },
    Client,
    Response,
};

use crate::core::VocadeckError;

const MAX_ATTEMPTS: usize = 3;

pub fn http_client() -> Result<Client, VocadeckError> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| VocadeckError::Custom(format!("HTTP client build failed: {e}")))
}

/// GET `url` with query parameters, retrying transport failures and empty
/// bodies with a linear back-off.
pub async fn get_bytes(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<Vec<u8>, VocadeckError> {
    let mut attempts: usize = 0;
    loop {
        attempts += 1;

        let resp = client
            .get(url)
            .query(query)
            .header(USER_AGENT, "vocadeck/0.1 (+reqwest)")
            .header(ACCEPT_ENCODING, "identity")
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                if attempts < MAX_ATTEMPTS {
                    tracing::debug!(attempt = attempts, error = %e, "retrying HTTP GET");
                    tokio::time::sleep(Duration::from_secs(2 * attempts as u64)).await;
                    continue;
                }
                return Err(VocadeckError::Custom(format!("Failed HTTP GET {}: {}", url, e)));
            }
        };

        ensure_success(&resp)?;

        match resp.bytes().await {
            Ok(body) if !body.is_empty() => return Ok(body.to_vec()),
            Ok(_) | Err(_) => {
                if attempts < MAX_ATTEMPTS {
                    tokio::time::sleep(Duration::from_secs(2 * attempts as u64)).await;
                    continue;
                }
                return Err(VocadeckError::Custom(format!("Empty response body from {}", url)));
            }
        }
    }
}

fn ensure_success(resp: &Response) -> Result<(), VocadeckError> {
    if !resp.status().is_success() {
        return Err(VocadeckError::Custom(format!(
            "HTTP error {} from {}",
            resp.status(),
            resp.url()
        )));
    }
    Ok(())
}
