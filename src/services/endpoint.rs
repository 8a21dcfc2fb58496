use reqwest::Url;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Invalid service URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),

    #[error("Invalid file id {0:?}")]
    InvalidFileId(String),
}

/// Base address of the imputation service, resolved once at startup.
///
/// The base may carry a path prefix (e.g. `https://host/api`), which every
/// endpoint is appended to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEndpoint {
    base: Url,
}

impl ServiceEndpoint {
    pub fn parse(url: &str) -> Result<Self, EndpointError> {
        let base = Url::parse(url.trim()).map_err(|e| EndpointError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match base.scheme() {
            "http" | "https" => Ok(Self { base }),
            other => Err(EndpointError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `POST` target for submissions.
    pub fn upload_url(&self) -> Url {
        self.join(&["upload"])
    }

    /// `GET` target for a stored result. The id is encoded as one path segment.
    ///
    /// Empty and dot-only ids are refused: URL normalization would drop them
    /// (`%2E` included) and the request would land on another path.
    pub fn download_url(&self, file_id: &str) -> Result<Url, EndpointError> {
        if file_id.is_empty() || file_id == "." || file_id == ".." {
            return Err(EndpointError::InvalidFileId(file_id.to_string()));
        }
        Ok(self.join(&["download", file_id]))
    }

    pub fn health_url(&self) -> Url {
        self.join(&["health"])
    }

    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        // http(s) URLs always have a hierarchical path, so this cannot fail
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_endpoints() {
        let endpoint = ServiceEndpoint::parse("http://localhost:5000").unwrap();
        assert_eq!(endpoint.upload_url().as_str(), "http://localhost:5000/upload");
        assert_eq!(endpoint.health_url().as_str(), "http://localhost:5000/health");
        assert_eq!(
            endpoint.download_url("20240101_120000").unwrap().as_str(),
            "http://localhost:5000/download/20240101_120000"
        );
    }

    #[test]
    fn test_prefixed_base_keeps_prefix() {
        let endpoint = ServiceEndpoint::parse("https://impute.example.com/api/").unwrap();
        assert_eq!(
            endpoint.upload_url().as_str(),
            "https://impute.example.com/api/upload"
        );
    }

    #[test]
    fn test_file_id_is_single_segment() {
        let endpoint = ServiceEndpoint::parse("http://localhost:5000").unwrap();
        assert_eq!(
            endpoint.download_url("../secret").unwrap().as_str(),
            "http://localhost:5000/download/..%2Fsecret"
        );
        assert_eq!(
            endpoint.download_url("...").unwrap().as_str(),
            "http://localhost:5000/download/..."
        );

        for id in ["", ".", ".."] {
            assert_eq!(
                endpoint.download_url(id),
                Err(EndpointError::InvalidFileId(id.to_string()))
            );
        }
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            ServiceEndpoint::parse("not a url"),
            Err(EndpointError::InvalidUrl { .. })
        ));
        assert_eq!(
            ServiceEndpoint::parse("ftp://files.example.com"),
            Err(EndpointError::UnsupportedScheme("ftp".to_string()))
        );
    }
}
