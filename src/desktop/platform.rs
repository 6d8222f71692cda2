use std::path::PathBuf;

/// Host platform, fixed for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    /// Detect the platform the crate was built for
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Directory tag used in the asset tree (`.../osx/button.png`)
    pub fn asset_tag(&self) -> &'static str {
        match self {
            Platform::Windows => "win",
            Platform::Linux => "linux",
            Platform::MacOs => "osx",
        }
    }

    /// Name of the Cmd/Win modifier slot on this platform
    pub fn primary_modifier(&self) -> &'static str {
        match self {
            Platform::MacOs => "command",
            Platform::Windows | Platform::Linux => "win",
        }
    }

    /// Where tesseract is installed when `TESSERACT_CMD` is not set
    pub fn default_tesseract_cmd(&self) -> PathBuf {
        match self {
            Platform::Windows => PathBuf::from(r"C:\Program Files (x86)\Tesseract-OCR\tesseract"),
            Platform::Linux | Platform::MacOs => PathBuf::from("/usr/local/bin/tesseract"),
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.asset_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_modifier_per_platform() {
        assert_eq!(Platform::MacOs.primary_modifier(), "command");
        assert_eq!(Platform::Windows.primary_modifier(), "win");
        assert_eq!(Platform::Linux.primary_modifier(), "win");
    }

    #[test]
    fn test_asset_tags() {
        assert_eq!(Platform::Windows.to_string(), "win");
        assert_eq!(Platform::MacOs.asset_tag(), "osx");
    }
}
