//! Fig file parser

use super::config::{parse_link, FigConfig};
use crate::error::{IchijikuError, Result};
use std::path::{Path, PathBuf};

/// Default fig file names
pub const DEFAULT_FIG_FILES: &[&str] = &["fig.yml", "fig.yaml"];

/// Fig file parser
pub struct FigParser;

impl FigParser {
    /// Find fig file in directory
    pub fn find_fig_file(dir: &Path) -> Option<PathBuf> {
        DEFAULT_FIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Parse fig file from path
    pub fn parse_file(path: &Path) -> Result<FigConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IchijikuError::FigParse(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse_str(&content)
    }

    /// Parse fig file from string
    pub fn parse_str(content: &str) -> Result<FigConfig> {
        serde_yaml::from_str(content)
            .map_err(|e| IchijikuError::FigParse(format!("Failed to parse YAML: {}", e)))
    }

    /// Validate fig configuration
    ///
    /// Broken links are errors; anything that can still run is a warning.
    pub fn validate(config: &FigConfig) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        let mut names: Vec<&String> = config.keys().collect();
        names.sort();

        for name in names {
            let service = &config[name];

            if service.image.is_none() && service.build.is_none() {
                warnings.push(format!(
                    "Service '{}' has neither 'image' nor 'build' specified",
                    name
                ));
            }

            if service.image.is_some() && service.build.is_some() {
                warnings.push(format!(
                    "Service '{}' has both 'image' and 'build'; 'build' is ignored",
                    name
                ));
            }

            if let Some(command) = &service.command {
                command.to_args()?;
            }
            if let Some(flags) = &service.run_flags {
                flags.to_args()?;
            }

            for link in &service.links {
                let (target, _) = parse_link(link);
                if !config.contains_key(target) {
                    return Err(IchijikuError::LinkNotFound {
                        service: name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        Ok(warnings)
    }
}
