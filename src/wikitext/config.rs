//! Parser configuration.

use core::{fmt, str::FromStr};

/// The environment variable which selects the tokenizer backend.
pub const TOKENIZER_ENV: &str = "WIKITREE_TOKENIZER";

/// The available tokenizer implementations.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TokenizerBackend {
    /// The tokenizer in this crate.
    #[default]
    Portable,
    /// The portable tokenizer, with its output verified to be balanced before
    /// it is given to the builder.
    Checked,
}

impl fmt::Display for TokenizerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Portable => "portable",
            Self::Checked => "checked",
        })
    }
}

/// An unrecognised tokenizer backend name.
#[derive(Debug, thiserror::Error)]
#[error("unknown tokenizer backend '{0}' (expected 'portable' or 'checked')")]
pub struct UnknownBackend(String);

impl FromStr for TokenizerBackend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("portable") {
            Ok(Self::Portable)
        } else if s.eq_ignore_ascii_case("checked") {
            Ok(Self::Checked)
        } else {
            Err(UnknownBackend(s.to_string()))
        }
    }
}

/// Configuration for a [`Parser`](super::Parser).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParserConfig {
    /// The tokenizer backend.
    pub backend: TokenizerBackend,
}

impl ParserConfig {
    /// Creates a configuration from the environment.
    ///
    /// An unset or unrecognised backend falls back to
    /// [`TokenizerBackend::Portable`].
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(TOKENIZER_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        let backend = match value.map(str::parse::<TokenizerBackend>) {
            None => TokenizerBackend::default(),
            Some(Ok(backend)) => backend,
            Some(Err(err)) => {
                log::warn!("{TOKENIZER_ENV}: {err}; using the portable tokenizer");
                TokenizerBackend::Portable
            }
        };
        Self { backend }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        assert_eq!(
            "Checked".parse::<TokenizerBackend>().unwrap(),
            TokenizerBackend::Checked
        );
        assert_eq!(TokenizerBackend::Portable.to_string(), "portable");
        assert!("fast".parse::<TokenizerBackend>().is_err());
    }

    #[test]
    fn env_fallback() {
        let _ = env_logger::try_init();
        assert_eq!(ParserConfig::from_env_value(None), ParserConfig::default());
        assert_eq!(
            ParserConfig::from_env_value(Some("checked")).backend,
            TokenizerBackend::Checked
        );
        assert_eq!(
            ParserConfig::from_env_value(Some("bogus")).backend,
            TokenizerBackend::Portable
        );
    }
}
