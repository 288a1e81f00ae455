//! Directory implementations supplying upstream base addresses.

use async_trait::async_trait;

use crate::ports::{DirectoryError, UpstreamDirectory};

/// Fixed list of upstream base addresses known at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    urls: Vec<String>,
}

impl StaticDirectory {
    /// Build a directory from the given base addresses, keeping their order.
    #[must_use]
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl UpstreamDirectory for StaticDirectory {
    async fn urls(&self) -> Result<Vec<String>, DirectoryError> {
        Ok(self.urls.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_addresses_in_order() {
        let directory = StaticDirectory::new(["http://b", "http://a"]);
        let urls = directory.urls().await.unwrap_or_default();
        assert_eq!(urls, vec!["http://b".to_owned(), "http://a".to_owned()], "order kept");
    }
}
