use crate::fetch::client::HttpClient;
use crate::records::ParentId;
use crate::server::PARENT_HEADER;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that identifies every request as coming from
/// one parent, through the `X-Parent-Id` header the API reads.
pub struct ParentHeader<C> {
    inner: C,
    value: HeaderValue,
}

impl<C> ParentHeader<C> {
    pub fn new(inner: C, parent_id: ParentId) -> Result<Self> {
        Ok(Self {
            inner,
            value: HeaderValue::from_str(&parent_id.to_string())?,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ParentHeader<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(HeaderName::from_static(PARENT_HEADER), self.value.clone());
        self.inner.execute(req).await
    }
}
