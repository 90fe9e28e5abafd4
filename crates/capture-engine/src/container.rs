//! Output container formats and negotiation.

use std::fmt;
use std::str::FromStr;

use scenereel_common::error::{ReelError, ReelResult};

/// Container the encoder muxes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    WebM,
    Matroska,
    Mp4,
}

impl ContainerFormat {
    /// Order tried after the preferred container is rejected.
    pub const FALLBACK_ORDER: [ContainerFormat; 3] =
        [ContainerFormat::WebM, ContainerFormat::Matroska, ContainerFormat::Mp4];

    pub fn extension(self) -> &'static str {
        match self {
            Self::WebM => "webm",
            Self::Matroska => "mkv",
            Self::Mp4 => "mp4",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebM => "video/webm",
            Self::Matroska => "video/x-matroska",
            Self::Mp4 => "video/mp4",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ContainerFormat {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webm" => Ok(Self::WebM),
            "mkv" | "matroska" => Ok(Self::Matroska),
            "mp4" => Ok(Self::Mp4),
            other => Err(ReelError::Config {
                message: format!("unknown container '{other}' (expected webm, mkv or mp4)"),
            }),
        }
    }
}

/// Outcome of container negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerChoice {
    /// The preferred container is supported.
    Preferred(ContainerFormat),
    /// The preferred container was rejected and another one was picked.
    Fallback {
        preferred: ContainerFormat,
        chosen: ContainerFormat,
    },
}

impl ContainerChoice {
    /// The container that will actually be written.
    pub fn format(self) -> ContainerFormat {
        match self {
            Self::Preferred(format) => format,
            Self::Fallback { chosen, .. } => chosen,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Pick the preferred container if `supports` accepts it, otherwise the
/// first supported one in [`ContainerFormat::FALLBACK_ORDER`].
pub fn negotiate<F>(preferred: ContainerFormat, supports: F) -> ReelResult<ContainerChoice>
where
    F: Fn(ContainerFormat) -> bool,
{
    if supports(preferred) {
        return Ok(ContainerChoice::Preferred(preferred));
    }

    ContainerFormat::FALLBACK_ORDER
        .into_iter()
        .filter(|c| *c != preferred)
        .find(|c| supports(*c))
        .map(|chosen| {
            tracing::warn!(%preferred, %chosen, "Preferred container unsupported; falling back");
            ContainerChoice::Fallback { preferred, chosen }
        })
        .ok_or_else(|| {
            ReelError::capture_unsupported(format!(
                "no supported container (tried {preferred}, then webm, mkv, mp4)"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_names() {
        assert_eq!("webm".parse::<ContainerFormat>().unwrap(), ContainerFormat::WebM);
        assert_eq!(" MKV ".parse::<ContainerFormat>().unwrap(), ContainerFormat::Matroska);
        assert_eq!("mp4".parse::<ContainerFormat>().unwrap(), ContainerFormat::Mp4);
        assert!("avi".parse::<ContainerFormat>().is_err());
    }

    #[test]
    fn test_negotiate_prefers_requested() {
        let choice = negotiate(ContainerFormat::Mp4, |_| true).unwrap();
        assert_eq!(choice, ContainerChoice::Preferred(ContainerFormat::Mp4));
        assert!(!choice.is_fallback());
    }

    #[test]
    fn test_negotiate_falls_back_in_order() {
        let choice = negotiate(ContainerFormat::WebM, |c| c != ContainerFormat::WebM).unwrap();
        assert_eq!(
            choice,
            ContainerChoice::Fallback {
                preferred: ContainerFormat::WebM,
                chosen: ContainerFormat::Matroska,
            }
        );
        assert_eq!(choice.format(), ContainerFormat::Matroska);

        let choice = negotiate(ContainerFormat::Matroska, |c| c == ContainerFormat::Mp4).unwrap();
        assert_eq!(choice.format(), ContainerFormat::Mp4);
    }

    #[test]
    fn test_negotiate_without_support_is_unsupported() {
        let err = negotiate(ContainerFormat::WebM, |_| false).unwrap_err();
        assert!(matches!(err, ReelError::CaptureUnsupported { .. }));
    }
}
