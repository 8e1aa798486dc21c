//! Text-recognition backends.

use std::{future::Future, time::Duration};

use reqwest::{Client, header};
use tracing::debug;

use crate::{Error, Result, ocr::{OcrFragment, parse_fragments}};

/// Anything that turns image bytes into OCR fragments.
pub trait TextRecognizer: Send + Sync {
  fn recognize(
    &self,
    image: &[u8],
  ) -> impl Future<Output = Result<Vec<OcrFragment>>> + Send;
}

/// A recogniser behind an HTTP endpoint.
///
/// The image is POSTed as `application/octet-stream`; the response is either
/// a bare fragment array or `{"results": [...]}`. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RemoteRecognizer {
  client:   Client,
  endpoint: String,
}

impl RemoteRecognizer {
  pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
    let endpoint = endpoint.trim();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
      return Err(Error::InvalidEndpoint(endpoint.to_owned()));
    }
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, endpoint: endpoint.to_owned() })
  }

  pub fn endpoint(&self) -> &str { &self.endpoint }
}

impl TextRecognizer for RemoteRecognizer {
  async fn recognize(&self, image: &[u8]) -> Result<Vec<OcrFragment>> {
    let resp = self
      .client
      .post(&self.endpoint)
      .header(header::CONTENT_TYPE, "application/octet-stream")
      .body(image.to_vec())
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status(status.as_u16()));
    }

    let mut payload: serde_json::Value = resp.json().await?;
    if let Some(results) = payload.get_mut("results") {
      payload = results.take();
    }
    let fragments = parse_fragments(&payload)?;
    debug!(
      endpoint = %self.endpoint,
      bytes = image.len(),
      fragments = fragments.len(),
      "recognised image"
    );
    Ok(fragments)
  }
}
