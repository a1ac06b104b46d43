use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::transaction::HttpNetworkTransaction;
use crate::urlrequest::context::URLRequestContext;
use crate::urlrequest::resolver::resolve;
use bytes::Bytes;

/// Redirect loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// About to hand the current URL to the engine.
    Requesting,
    /// Inspecting the engine's response.
    Evaluating,
    Done,
    Failed,
}

/// Drives engine exchanges through redirects until a final body.
///
/// Mirrors Chromium's URLRequestHttpJob: one transaction per job, reused for
/// every hop, with the caller's headers resent on each hop.
pub struct URLRequestHttpJob {
    transaction: HttpNetworkTransaction,
    url: String,
    url_chain: Vec<String>,
    headers: OrderedHeaderMap,
    max_redirects: usize,
    hop: usize,
    state: JobState,
}

impl URLRequestHttpJob {
    pub fn new(
        context: &URLRequestContext,
        url: impl Into<String>,
        max_redirects: usize,
        headers: OrderedHeaderMap,
    ) -> Self {
        Self {
            transaction: context.transaction(),
            url: url.into(),
            url_chain: Vec::new(),
            headers,
            max_redirects,
            hop: 0,
            state: JobState::Requesting,
        }
    }

    /// Run the redirect loop to completion.
    pub async fn start(&mut self) -> Result<Bytes, NetError> {
        let result = self.run().await;
        self.state = match result {
            Ok(_) => JobState::Done,
            Err(_) => JobState::Failed,
        };
        result
    }

    async fn run(&mut self) -> Result<Bytes, NetError> {
        while self.hop <= self.max_redirects {
            self.state = JobState::Requesting;
            self.url_chain.push(self.url.clone());
            let response = self.transaction.execute(&self.url, &self.headers).await?;

            self.state = JobState::Evaluating;
            let status = response.status();

            if response.is_from_cache() {
                tracing::info!(url = %self.url, bytes = response.body().len(), "cache revalidation hit");
                return Ok(response.into_body());
            }
            if !status.is_redirection() {
                return Ok(response.into_body());
            }

            let target = response.redirect_target().ok_or(NetError::MissingLocationHeader)?;
            let next = resolve(&self.url, target)?;
            tracing::info!(
                hop = self.hop + 1,
                status = status.as_u16(),
                from = %self.url,
                to = %next,
                "following redirect"
            );
            self.url = next.into();
            self.hop += 1;
        }

        tracing::debug!(limit = self.max_redirects, chain = ?self.url_chain, "redirect limit exceeded");
        Err(NetError::TooManyRedirects)
    }

    /// Every URL requested so far, in order.
    pub fn url_chain(&self) -> &[String] {
        &self.url_chain
    }

    /// Redirects followed so far.
    pub fn hops(&self) -> usize {
        self.hop
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// The URL currently being (or last) requested.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn load_state(&self) -> LoadState {
        self.transaction.load_state()
    }
}

/// Fetch `start_url`, following up to `max_redirects` redirects, and return
/// the final body.
///
/// A 304 answer for any hop ends the fetch with that URL's cached body.
pub async fn fetch_with_redirects(
    context: &URLRequestContext,
    start_url: &str,
    max_redirects: usize,
    headers: &OrderedHeaderMap,
) -> Result<Bytes, NetError> {
    URLRequestHttpJob::new(context, start_url, max_redirects, headers.clone()).start().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_start_url_fails_job() {
        let context = URLRequestContext::new();
        let mut job = URLRequestHttpJob::new(&context, "::nope::", 3, OrderedHeaderMap::new());
        assert_eq!(job.state(), JobState::Requesting);

        assert_eq!(job.start().await.unwrap_err(), NetError::InvalidUrl);
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.url_chain(), ["::nope::".to_string()]);
        assert_eq!(job.hops(), 0);
        assert_eq!(job.load_state(), LoadState::Idle);
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_not_retried() {
        let context = URLRequestContext::new();
        let err = fetch_with_redirects(&context, "gopher://example.com/", 5, &OrderedHeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err, NetError::UnknownUrlScheme);
        assert_eq!(context.socket_pool().dial_count(), 0);
    }
}
