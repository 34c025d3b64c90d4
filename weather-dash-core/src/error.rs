use reqwest::StatusCode;

/// Failures produced by the weather client.
///
/// The `Display` text is what ends up in the status banner; callers that need to
/// branch on the kind match on the variant instead.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("City '{city}' not found. Please try a different name.")]
    NotFound { city: String },

    #[error("Forecast for '{city}' is unavailable.")]
    Unavailable { city: String },

    #[error("HTTP Error: {status}")]
    Http { status: StatusCode },

    /// `resource` is `weather` or `forecast`, after the endpoint that failed.
    #[error("Failed to retrieve {resource} data: {source}")]
    Transport {
        resource: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode weather data: {0}")]
    Decode(#[from] serde_json::Error),
}

impl WeatherError {
    /// True for the provider's "no such city" answer on either endpoint.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Unavailable { .. })
    }

    /// HTTP status behind the failure, when the provider answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound { .. } | Self::Unavailable { .. } => Some(StatusCode::NOT_FOUND),
            Self::Http { status } => Some(*status),
            Self::Transport { source, .. } => source.status(),
            Self::Decode(_) => None,
        }
    }

    /// Short variant name for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Unavailable { .. } => "unavailable",
            Self::Http { .. } => "http",
            Self::Transport { .. } => "transport",
            Self::Decode(_) => "decode",
        }
    }
}

/// Failures of the durable key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stored value for key '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage rejected write for key '{key}': {reason}")]
    Rejected { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("City name cannot be empty.")]
    EmptyCity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_city() {
        let err = WeatherError::NotFound { city: "Atlantis".into() };
        assert_eq!(
            err.to_string(),
            "City 'Atlantis' not found. Please try a different name."
        );
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn forecast_unavailable_is_a_not_found_kind() {
        let err = WeatherError::Unavailable { city: "Atlantis".into() };
        assert!(err.to_string().contains("is unavailable"));
        assert!(err.is_not_found());
        assert_eq!(err.kind(), "unavailable");
    }

    #[test]
    fn http_error_keeps_status() {
        let err = WeatherError::Http { status: StatusCode::INTERNAL_SERVER_ERROR };
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!err.is_not_found());
        assert!(err.to_string().starts_with("HTTP Error: 500"));
    }

    #[test]
    fn decode_error_has_no_status() {
        let json_err = serde_json::from_str::<u8>("not json").unwrap_err();
        let err = WeatherError::from(json_err);
        assert_eq!(err.status(), None);
        assert_eq!(err.kind(), "decode");
    }
}
