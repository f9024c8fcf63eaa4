use bytes::Bytes;
use http::{header::CONTENT_TYPE, Method, StatusCode};
use reqwest::{Response, Url};
use tracing::{debug, trace, warn};

use crate::{
    envelope::{self, RpcMessage},
    error::{ProxyError, Result},
    retry::RetryPolicy,
};

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Why a single attempt did not end the retry loop.
#[derive(Debug)]
enum AttemptError {
    /// Nothing came back from the server.
    Connection(reqwest::Error),

    /// A response came back, but not with the status the policy waits for.
    StatusMismatch(Response),
}

/// POSTs serialized objects to code running in a pod, through a proxy URL.
///
/// Holds no per-call state, the [`reqwest::Client`] is shared (and cheap to clone).
#[derive(Clone, Debug)]
pub struct RpcTransport {
    client: reqwest::Client,
}

impl RpcTransport {
    pub fn new(client: reqwest::Client) -> Self {
        RpcTransport { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Sends `request` (or an empty body) and decodes the answer.
    ///
    /// - `200` is decoded into a `Resp`, checking the envelope's type tag;
    /// - `204`, or the policy's desired status, is `None`;
    /// - anything else is [`ProxyError::UnexpectedStatus`].
    #[tracing::instrument(level = "debug", skip(self, request), err)]
    pub async fn call<Req, Resp>(
        &self,
        url: &str,
        request: Option<&Req>,
        policy: &RetryPolicy,
    ) -> Result<Option<Resp>>
    where
        Req: RpcMessage,
        Resp: RpcMessage,
    {
        let body = request.map(envelope::encode).transpose()?;
        let response = self.send(Method::POST, url, body, policy).await?;

        match response.status() {
            StatusCode::OK => {
                let body = read_body(url, response).await?;
                Ok(Some(envelope::decode(&body)?))
            }
            StatusCode::NO_CONTENT => Ok(None),
            status if policy.desired_status_code == Some(status) => Ok(None),
            _ => Err(unexpected_status(url, response).await),
        }
    }

    /// Same retry loop as [`RpcTransport::call`], without the envelope.
    ///
    /// `404` is `None` like `204`: the pod does not serve `url`.
    #[tracing::instrument(level = "debug", skip(self, body), err)]
    pub async fn post_raw(
        &self,
        url: &str,
        body: Option<Vec<u8>>,
        policy: &RetryPolicy,
    ) -> Result<Option<Bytes>> {
        let response = self.send(Method::POST, url, body, policy).await?;

        match response.status() {
            StatusCode::OK => Ok(Some(read_body(url, response).await?)),
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            _ => Err(unexpected_status(url, response).await),
        }
    }

    /// GETs `url` under `policy` and returns the final status.
    ///
    /// Connection failures are retried like for [`RpcTransport::call`], the body is dropped.
    #[tracing::instrument(level = "trace", skip(self), err)]
    pub async fn get_status(&self, url: &str, policy: &RetryPolicy) -> Result<StatusCode> {
        let response = self.send(Method::GET, url, None, policy).await?;
        Ok(response.status())
    }

    /// Runs the retry loop and hands back the last response.
    ///
    /// A status mismatch that survives every attempt still returns its response, so the caller
    /// maps it like any other. A `url` the client could never send to is a
    /// [`ProxyError::Configuration`], raised before the first attempt.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        policy: &RetryPolicy,
    ) -> Result<Response> {
        let target = parse_url(url)?;
        let body = body.map(Bytes::from);
        let desired_status = policy.desired_status_code;
        let mut attempts = 0u32;

        let outcome = policy
            .run(
                || {
                    attempts += 1;
                    let attempt = attempts;
                    let mut request = self.client.request(method.clone(), target.clone());
                    if method == Method::POST {
                        request = request
                            .header(CONTENT_TYPE, OCTET_STREAM)
                            .body(body.clone().unwrap_or_default());
                    }

                    async move {
                        trace!(attempt, "sending request");
                        let response = request.send().await.map_err(AttemptError::Connection)?;

                        match desired_status {
                            Some(desired) if response.status() != desired => {
                                Err(AttemptError::StatusMismatch(response))
                            }
                            _ => Ok(response),
                        }
                    }
                },
                |error: &AttemptError| match error {
                    AttemptError::Connection(fail) if fail.is_builder() => false,
                    AttemptError::Connection(fail) => {
                        debug!(%fail, "attempt failed to connect");
                        true
                    }
                    AttemptError::StatusMismatch(response) => {
                        debug!(status = %response.status(), "attempt got an unwanted status");
                        true
                    }
                },
            )
            .await;

        match outcome {
            Ok(response) => Ok(response),
            Err(AttemptError::StatusMismatch(response)) => {
                warn!(
                    attempts,
                    status = %response.status(),
                    "desired status never showed up"
                );
                Ok(response)
            }
            Err(AttemptError::Connection(fail)) if fail.is_builder() => Err(
                ProxyError::configuration(format!("cannot send a request to `{url}`: {fail}")),
            ),
            Err(AttemptError::Connection(source)) => Err(ProxyError::Transport {
                url: url.to_owned(),
                attempts,
                source,
            }),
        }
    }
}

/// Only absolute `http`/`https` URLs can be sent.
fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|fail| ProxyError::configuration(format!("invalid url `{url}`: {fail}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ProxyError::configuration(format!(
            "url `{url}` has unsupported scheme `{scheme}`"
        ))),
    }
}

async fn read_body(url: &str, response: Response) -> Result<Bytes> {
    response
        .bytes()
        .await
        .map_err(|source| ProxyError::ResponseBody {
            url: url.to_owned(),
            source,
        })
}

async fn unexpected_status(url: &str, response: Response) -> ProxyError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_else(|fail| {
        debug!(%url, %fail, "failed to read the error body");
        String::new()
    });

    ProxyError::UnexpectedStatus {
        url: url.to_owned(),
        status,
        message,
    }
}
