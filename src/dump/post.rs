use crate::dump::DumpTarget;
use crate::error::Result;
use crate::http::{HttpTarget, Request, Url};
use crate::reactor::ReactorHandle;

/// Sends a POST to a fixed URL for every document.
///
/// Requests carry headers only; the document is not attached as a body.
pub struct PostTarget {
    url: Url,
    http: HttpTarget,
}

impl PostTarget {
    /// Opens a fresh connection per document.
    pub fn new(reactor: ReactorHandle, url: &str) -> Result<Self> {
        Self::with_keep_alive(reactor, url, false)
    }

    pub fn with_keep_alive(reactor: ReactorHandle, url: &str, keep_alive: bool) -> Result<Self> {
        let url = Url::parse(url)?;
        tracing::debug!(%url, keep_alive, "http target ready");
        Ok(Self {
            url,
            http: HttpTarget::new(reactor, keep_alive),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn http(&self) -> &HttpTarget {
        &self.http
    }
}

impl DumpTarget for PostTarget {
    fn write(&self, document: &[u8]) {
        let request = Request::post(self.url.clone());
        let bytes = document.len();
        self.http.submit(&request, move |result| match result {
            Ok(response) if response.is_success() => {
                tracing::debug!(status = response.code().as_u16(), bytes, "telemetry posted");
            }
            Ok(response) => {
                tracing::warn!(status = response.code().as_u16(), "collector rejected telemetry");
            }
            Err(e) => {
                tracing::error!(error = %e, "telemetry post failed");
            }
        });
    }
}
