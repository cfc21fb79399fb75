use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::sources::Platform;

const CONFIG_RELATIVE_PATH: &str = ".revq/config.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub platform: Option<String>,
    pub azure: Option<AzureConfig>,
    pub github: Option<GithubConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AzureConfig {
    pub organization: String,
    pub project: String,
    pub repository: String,
    /// Supported but deprecated; prefer the AZURE_DEVOPS_PAT env var.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
    /// Supported but deprecated; prefer the GITHUB_PAT env var.
    pub token: Option<String>,
}

/// Effective configuration: file merged with CLI overrides, CLI wins per
/// field. The platform tables stay optional so offline commands (`status`,
/// `token`) work without a config file.
#[derive(Debug)]
pub struct Config {
    pub platform: &'static Platform,
    pub azure: Option<AzureConfig>,
    pub github: Option<GithubConfig>,
    /// Token passed with `--token`, taken as-is.
    pub flag_token: Option<String>,
    pub working_dir: PathBuf,
}

impl Config {
    /// Load the config file (explicit `--config` path must exist; the
    /// default location may be absent) and merge CLI overrides into it.
    pub fn load(cli: &Cli) -> Result<Self> {
        let working_dir = PathBuf::from(&cli.dir);
        let file_config = match &cli.config {
            Some(path) => {
                let path = Path::new(path);
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path.to_path_buf()));
                }
                parse_config(&std::fs::read_to_string(path)?)?
            }
            None => {
                let path = working_dir.join(CONFIG_RELATIVE_PATH);
                if path.exists() {
                    parse_config(&std::fs::read_to_string(&path)?)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        merge(file_config, cli)
    }

    /// The active platform's Azure table, required for network commands.
    pub fn azure(&self) -> Result<&AzureConfig> {
        self.azure.as_ref().ok_or_else(|| {
            Error::ConfigValidation(
                "missing [azure] config: set organization, project and repository \
                 in .revq/config.toml or pass --org, --project and --repo"
                    .to_string(),
            )
        })
    }

    /// The active platform's GitHub table, required for network commands.
    pub fn github(&self) -> Result<&GithubConfig> {
        self.github.as_ref().ok_or_else(|| {
            Error::ConfigValidation(
                "missing [github] config: set owner and repo in .revq/config.toml \
                 or pass --owner and --repo"
                    .to_string(),
            )
        })
    }

    /// The `token` field of the active platform's table, if any.
    pub fn config_token(&self) -> Option<&str> {
        if self.platform.key == "github" {
            self.github.as_ref().and_then(|g| g.token.as_deref())
        } else {
            self.azure.as_ref().and_then(|a| a.token.as_deref())
        }
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref platform) = config.platform
        && Platform::from_key(platform).is_none()
    {
        return Err(Error::ConfigValidation(format!(
            "unknown platform: {platform} (expected: {})",
            Platform::keys().join(", ")
        )));
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Result<Config> {
    let platform_key = cli
        .platform
        .clone()
        .or(file.platform)
        .unwrap_or_else(|| "azure-devops".to_string());
    let platform = Platform::from_key(&platform_key).ok_or_else(|| {
        Error::ConfigValidation(format!(
            "unknown platform: {platform_key} (expected: {})",
            Platform::keys().join(", ")
        ))
    })?;

    // Per-field CLI overrides. A table can also be built from flags alone,
    // but only when every required field is present.
    let azure = match file.azure {
        Some(table) => Some(AzureConfig {
            organization: cli.org.clone().unwrap_or(table.organization),
            project: cli.project.clone().unwrap_or(table.project),
            repository: cli.repo.clone().unwrap_or(table.repository),
            token: table.token,
        }),
        None => match (&cli.org, &cli.project, &cli.repo) {
            (Some(org), Some(project), Some(repo)) => Some(AzureConfig {
                organization: org.clone(),
                project: project.clone(),
                repository: repo.clone(),
                token: None,
            }),
            _ => None,
        },
    };
    let github = match file.github {
        Some(table) => Some(GithubConfig {
            owner: cli.owner.clone().unwrap_or(table.owner),
            repo: cli.repo.clone().unwrap_or(table.repo),
            token: table.token,
        }),
        None => match (&cli.owner, &cli.repo) {
            (Some(owner), Some(repo)) => Some(GithubConfig {
                owner: owner.clone(),
                repo: repo.clone(),
                token: None,
            }),
            _ => None,
        },
    };

    Ok(Config {
        platform,
        azure,
        github,
        flag_token: cli.token.clone(),
        working_dir: PathBuf::from(&cli.dir),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
platform = "azure-devops"

[azure]
organization = "my-org"
project = "My Project"
repository = "my-repo"
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.platform.as_deref(), Some("azure-devops"));
        let azure = config.azure.unwrap();
        assert_eq!(azure.organization, "my-org");
        assert_eq!(azure.project, "My Project");
        assert!(azure.token.is_none());
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_invalid_platform() {
        let toml = r#"platform = "gitlab""#;
        let err = parse_config(toml).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown platform: gitlab"));
        assert!(msg.contains("azure-devops, github"));
    }

    #[test]
    fn test_parse_unknown_field() {
        let toml = r#"bogus = "value""#;
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_parse_incomplete_azure_table() {
        let toml = r#"
[azure]
organization = "my-org"
"#;
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let file = parse_config(
            r#"
platform = "azure-devops"

[azure]
organization = "file-org"
project = "file-project"
repository = "file-repo"
"#,
        )
        .unwrap();
        let cli = Cli::parse_from(["revq", "check", "--org", "cli-org", "--repo", "cli-repo"]);
        let config = merge(file, &cli).unwrap();

        let azure = config.azure().unwrap();
        assert_eq!(azure.organization, "cli-org"); // CLI wins
        assert_eq!(azure.repository, "cli-repo"); // CLI wins
        assert_eq!(azure.project, "file-project"); // file value kept
    }

    #[test]
    fn test_platform_flag_overrides_file() {
        let file = parse_config(r#"platform = "azure-devops""#).unwrap();
        let cli = Cli::parse_from(["revq", "check", "--platform", "github"]);
        let config = merge(file, &cli).unwrap();
        assert_eq!(config.platform.key, "github");
    }

    #[test]
    fn test_default_platform_is_azure() {
        let cli = Cli::parse_from(["revq", "check"]);
        let config = merge(ConfigFile::default(), &cli).unwrap();
        assert_eq!(config.platform.key, "azure-devops");
    }

    #[test]
    fn test_unknown_platform_flag_rejected() {
        let cli = Cli::parse_from(["revq", "check", "--platform", "bitbucket"]);
        let err = merge(ConfigFile::default(), &cli).unwrap_err();
        assert!(err.to_string().contains("unknown platform: bitbucket"));
    }

    #[test]
    fn test_table_from_flags_alone() {
        let cli = Cli::parse_from([
            "revq", "check", "--org", "o", "--project", "p", "--repo", "r",
        ]);
        let config = merge(ConfigFile::default(), &cli).unwrap();
        assert_eq!(config.azure().unwrap().organization, "o");
    }

    #[test]
    fn test_partial_flags_do_not_build_a_table() {
        let cli = Cli::parse_from(["revq", "check", "--org", "o"]);
        let config = merge(ConfigFile::default(), &cli).unwrap();
        let err = config.azure().unwrap_err();
        assert!(err.to_string().contains("missing [azure] config"));
    }

    #[test]
    fn test_config_token_follows_active_platform() {
        let file = parse_config(
            r#"
platform = "github"

[github]
owner = "octo"
repo = "widgets"
token = "config-token-0123456789"
"#,
        )
        .unwrap();
        let cli = Cli::parse_from(["revq", "token"]);
        let config = merge(file, &cli).unwrap();
        assert_eq!(config.config_token(), Some("config-token-0123456789"));
    }
}
