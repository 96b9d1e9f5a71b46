//! Resolves a script spec (CLI `script` argument) into source bytes.
//!
//! A spec is one of: `-` (stdin), an `http(s)://` URL, or a local filesystem path.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    Stdin,
    Url(String),
    File(PathBuf),
}

impl ScriptSource {
    #[must_use]
    pub fn classify(spec: &str) -> Self {
        if spec == "-" {
            Self::Stdin
        } else if spec.starts_with("http://") || spec.starts_with("https://") {
            Self::Url(spec.to_string())
        } else {
            Self::File(PathBuf::from(spec))
        }
    }

    /// A label suitable as `script_path` for error messages and the Lua `require` search root.
    #[must_use]
    pub fn label(&self) -> PathBuf {
        match self {
            Self::Stdin => PathBuf::from("<stdin>"),
            Self::Url(url) => PathBuf::from(url),
            Self::File(path) => path.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("script not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read script from stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("script at `{url}` is not valid UTF-8")]
    NotUtf8 { url: String },

    #[cfg(feature = "http")]
    #[error("fetching `{url}` returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[cfg(feature = "http")]
    #[error("failed to fetch `{url}`: {source}")]
    Http {
        url: String,
        #[source]
        source: wrkr_http::Error,
    },

    #[cfg(not(feature = "http"))]
    #[error("remote script sources require the `http` feature (tried to fetch `{0}`)")]
    HttpDisabled(String),
}

/// Reads the script's raw bytes, resolving `-`/stdin, local paths, and (with the `http`
/// feature) `http(s)://` URLs. Returns the bytes and the path label the runtime should use.
/// Raw bytes (rather than text) let callers sniff an archive format before assuming UTF-8.
pub async fn load_bytes(source: &ScriptSource) -> Result<(Vec<u8>, PathBuf), SourceError> {
    match source {
        ScriptSource::Stdin => {
            use tokio::io::AsyncReadExt as _;
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .map_err(SourceError::Stdin)?;
            Ok((buf, source.label()))
        }
        ScriptSource::File(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SourceError::NotFound(path.clone())
                } else {
                    SourceError::Io {
                        path: path.clone(),
                        source: e,
                    }
                }
            })?;
            Ok((bytes, path.clone()))
        }
        ScriptSource::Url(url) => {
            #[cfg(feature = "http")]
            {
                let client = wrkr_http::HttpClient::default();
                let resp = client
                    .request(wrkr_http::HttpRequest::get(url))
                    .await
                    .map_err(|source| SourceError::Http {
                        url: url.clone(),
                        source,
                    })?;
                if resp.status >= 400 {
                    return Err(SourceError::HttpStatus {
                        url: url.clone(),
                        status: resp.status,
                    });
                }
                Ok((resp.body.to_vec(), source.label()))
            }
            #[cfg(not(feature = "http"))]
            {
                Err(SourceError::HttpDisabled(url.clone()))
            }
        }
    }
}

/// Reads the script's source as UTF-8 text. See [`load_bytes`] for source resolution rules.
pub async fn load_script(source: &ScriptSource) -> Result<(String, PathBuf), SourceError> {
    let (bytes, label) = load_bytes(source).await?;
    let text = String::from_utf8(bytes).map_err(|_| SourceError::NotUtf8 {
        url: label.display().to_string(),
    })?;
    Ok((text, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_stdin_url_and_file() {
        assert_eq!(ScriptSource::classify("-"), ScriptSource::Stdin);
        assert_eq!(
            ScriptSource::classify("https://example.com/script.lua"),
            ScriptSource::Url("https://example.com/script.lua".to_string())
        );
        assert_eq!(
            ScriptSource::classify("script.lua"),
            ScriptSource::File(PathBuf::from("script.lua"))
        );
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let source = ScriptSource::File(PathBuf::from("/no/such/script.lua"));
        match load_script(&source).await {
            Err(SourceError::NotFound(path)) => {
                assert_eq!(path, PathBuf::from("/no/such/script.lua"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
