use std::collections::HashMap;
use std::fs;

/// Ad hoc `[section]` / `key=value` configuration file. Global keys (outside
/// any `[section]`) act as a fallback for any section that doesn't override
/// them.
#[derive(Debug)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Error reading file {path}: {e}"))?;
        Ok(Self::parse(&content))
    }

    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut globals = HashMap::new();
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current_section: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = &line[1..line.len() - 1];
                current_section = Some(name.to_string());
                continue;
            }

            if let Some(pos) = line.find('=') {
                let key = line[..pos].trim().to_string();
                let value = line[pos + 1..].trim().trim_matches('"').to_string();

                match &current_section {
                    None => {
                        globals.insert(key, value);
                    }
                    Some(sec) => {
                        sections.entry(sec.clone()).or_default().insert(key, value);
                    }
                }
            }
        }
        Config { globals, sections }
    }

    pub fn empty() -> Self {
        Self {
            globals: HashMap::new(),
            sections: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_or_default<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.get(section, key)
            .or_else(|| self.get_global(key))
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_non_empty_or_default<'a>(
        &'a self,
        section: &str,
        key: &str,
        default: &'a str,
    ) -> &'a str {
        self.get_non_empty(section, key)
            .or_else(|| self.get_global(key).filter(|s| !s.is_empty()))
            .unwrap_or(default)
    }
}

/// How a retransmitted RTP packet is re-emitted after a NACK. The original
/// implementation picks this at compile time via
/// `RETRANSMISSION_ACCORDING_TO_RFC_XXXX`; here it's a runtime choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetransmitMode {
    /// No retransmission; NACKs are parsed but ignored.
    Off,
    /// Re-emit on the original RTP channel, seq number unchanged.
    #[default]
    SameChannel,
    /// Re-emit on a side channel, with a fresh seq and the original seq
    /// inlined into the payload.
    SideChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoResolution {
    P720,
    P1080,
}

/// Gathers the pipeline's knobs into one value passed at session
/// construction, rather than scattered compile-time flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub retransmit: RetransmitMode,
    pub video_resolution: VideoResolution,
    pub log_ts_to_file: Option<String>,
    pub enable_bandwidth_trace: bool,
    /// Default 0xDEAD_BEEF; sessions sharing a process may pick a
    /// different SSRC to avoid collisions.
    pub ssrc: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retransmit: RetransmitMode::SameChannel,
            video_resolution: VideoResolution::P720,
            log_ts_to_file: None,
            enable_bandwidth_trace: false,
            ssrc: 0xDEAD_BEEF,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn from_config(cfg: &Config) -> Self {
        let mut out = Self::default();

        out.retransmit = match cfg.get_or_default("wfd", "retransmit", "same_channel") {
            "off" => RetransmitMode::Off,
            "side_channel" => RetransmitMode::SideChannel,
            _ => RetransmitMode::SameChannel,
        };

        out.video_resolution = match cfg.get_or_default("wfd", "video_resolution", "720p") {
            "1080p" => VideoResolution::P1080,
            _ => VideoResolution::P720,
        };

        out.log_ts_to_file = cfg
            .get_non_empty("wfd", "log_ts_to_file")
            .map(str::to_string);

        out.enable_bandwidth_trace =
            cfg.get_or_default("wfd", "enable_bandwidth_trace", "false") == "true";

        if let Some(ssrc) = cfg
            .get_non_empty("wfd", "ssrc")
            .and_then(|s| u32::from_str_radix(s.trim_start_matches("0x"), 16).ok())
        {
            out.ssrc = ssrc;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_globals() {
        let cfg = Config::parse("top=1\n[wfd]\nretransmit=off\nvideo_resolution=1080p\n");
        assert_eq!(cfg.get_global("top"), Some("1"));
        assert_eq!(cfg.get("wfd", "retransmit"), Some("off"));
    }

    #[test]
    fn pipeline_config_defaults() {
        let cfg = Config::empty();
        let pc = PipelineConfig::from_config(&cfg);
        assert_eq!(pc.retransmit, RetransmitMode::SameChannel);
        assert_eq!(pc.video_resolution, VideoResolution::P720);
        assert_eq!(pc.ssrc, 0xDEAD_BEEF);
        assert!(pc.log_ts_to_file.is_none());
        assert!(!pc.enable_bandwidth_trace);
    }

    #[test]
    fn pipeline_config_reads_overrides() {
        let cfg = Config::parse(
            "[wfd]\nretransmit=side_channel\nvideo_resolution=1080p\nssrc=0xCAFEBABE\nenable_bandwidth_trace=true\n",
        );
        let pc = PipelineConfig::from_config(&cfg);
        assert_eq!(pc.retransmit, RetransmitMode::SideChannel);
        assert_eq!(pc.video_resolution, VideoResolution::P1080);
        assert_eq!(pc.ssrc, 0xCAFE_BABE);
        assert!(pc.enable_bandwidth_trace);
    }
}
