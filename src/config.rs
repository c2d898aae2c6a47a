use std::time::Duration;

use crate::zip::CompressionMethod;

/// Tunables of the workflow engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a finished workflow stays visible before settling to idle.
    /// `None` settles immediately.
    pub observation_delay: Option<Duration>,
    /// Extension of bundle archives, without the dot
    pub archive_extension: String,
    /// Output base name when the inputs did not come from a folder
    pub default_base_name: String,
    /// Member method for re-bundled archives (download all / selected)
    pub rebundle_method: CompressionMethod,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            observation_delay: None,
            archive_extension: "bnd".to_string(),
            default_base_name: "compressed".to_string(),
            rebundle_method: CompressionMethod::Deflate,
        }
    }
}

impl EngineConfig {
    /// Settings of the interactive application: results stay on screen for two seconds.
    pub fn interactive() -> Self {
        Self::default().with_observation_delay(Duration::from_secs(2))
    }

    pub fn with_observation_delay(mut self, delay: Duration) -> Self {
        self.observation_delay = (!delay.is_zero()).then_some(delay);
        self
    }

    pub fn with_archive_extension(mut self, extension: impl Into<String>) -> Self {
        self.archive_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_default_base_name(mut self, name: impl Into<String>) -> Self {
        self.default_base_name = name.into();
        self
    }

    pub fn with_rebundle_method(mut self, method: CompressionMethod) -> Self {
        self.rebundle_method = method;
        self
    }

    /// Archive file name for a base name: `<base>.<extension>`
    pub fn archive_name(&self, base: &str) -> String {
        format!("{base}.{}", self.archive_extension)
    }

    /// Base name of an archive file, or `None` if the extension does not match.
    pub fn strip_archive_extension<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        file_name
            .strip_suffix(self.archive_extension.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_means_none() {
        let config = EngineConfig::default().with_observation_delay(Duration::ZERO);
        assert_eq!(config.observation_delay, None);
        assert_eq!(
            EngineConfig::interactive().observation_delay,
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn extension_handling() {
        let config = EngineConfig::default();
        assert_eq!(config.archive_name("photos"), "photos.bnd");
        assert_eq!(config.strip_archive_extension("photos.bnd"), Some("photos"));
        assert_eq!(config.strip_archive_extension("photos.tar.bnd"), Some("photos.tar"));
        assert_eq!(config.strip_archive_extension("report.pdf"), None);
        assert_eq!(config.strip_archive_extension("xbnd"), None);

        let custom = EngineConfig::default().with_archive_extension(".pack");
        assert_eq!(custom.archive_name("a"), "a.pack");
    }
}
