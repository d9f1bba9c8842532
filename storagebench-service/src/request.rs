use std::path::{Component, Path};

use serde::Deserialize;

use crate::error::{Error, Result};

/// A single benchmark invocation, as received from the caller.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkRequest {
    /// Name of the object, used as the storage key and path segment.
    pub file_name: String,
    /// Size of the generated payload in bytes, before encoding.
    pub file_size: u64,
}

impl BenchmarkRequest {
    pub fn new(file_name: impl Into<String>, file_size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            file_size,
        }
    }

    /// Checks that the request can be used to address storage.
    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(Error::InvalidRequest("fileName must not be empty".into()));
        }

        // The name is placed below the mount path, so it must be a plain relative path.
        let escapes = Path::new(&self.file_name)
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::InvalidRequest(format!(
                "fileName `{}` must be a relative path without `..`",
                self.file_name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event() {
        let request: BenchmarkRequest =
            serde_json::from_str(r#"{"fileName": "a.bin", "fileSize": 1024}"#).unwrap();
        assert_eq!(request, BenchmarkRequest::new("a.bin", 1024));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn rejects_negative_sizes() {
        let result =
            serde_json::from_str::<BenchmarkRequest>(r#"{"fileName": "a.bin", "fileSize": -1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_names() {
        let err = BenchmarkRequest::new("", 10).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn rejects_names_outside_mount() {
        for name in ["/etc/x", "../x.bin", "nested/../../x.bin", ".."] {
            let err = BenchmarkRequest::new(name, 10).validate().unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(_)), "{name}");
        }
    }

    #[test]
    fn accepts_nested_names() {
        for name in ["nested/a.bin", "./a.bin", "a?1.bin", "a#b.bin"] {
            assert!(BenchmarkRequest::new(name, 10).validate().is_ok(), "{name}");
        }
    }
}
