use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::sources::Platform;

/// Tokens shorter than this are assumed to be truncated or placeholder
/// values, never real PATs.
const MIN_TOKEN_LEN: usize = 20;

/// Values shipped in config templates that must never be sent as credentials.
const PLACEHOLDER_TOKENS: &[&str] = &[
    "YOUR_AZURE_DEVOPS_PAT_HERE",
    "PLACEHOLDER_TOKEN_NEEDS_TO_BE_SET",
    "your-token-here",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Flag,
    Env,
    Config,
}

#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub source: TokenSource,
}

impl Credential {
    pub fn describe_source(&self, platform: &Platform) -> String {
        match self.source {
            TokenSource::Flag => "command line (--token)".to_string(),
            TokenSource::Env => {
                format!("environment variable ({})", platform.token_env_var)
            }
            TokenSource::Config => "config file (deprecated)".to_string(),
        }
    }
}

/// Resolve a credential for the platform: explicit `--token` flag, then the
/// platform's environment variable, then the config file's `token` field.
/// Flag tokens are taken as-is; env and config tokens must look real
/// (length, not a placeholder). Config tokens log a deprecation warning.
pub fn resolve(
    platform: &Platform,
    flag_token: Option<&str>,
    config_token: Option<&str>,
) -> Result<Credential> {
    if let Some(token) = flag_token {
        return Ok(Credential {
            token: token.to_string(),
            source: TokenSource::Flag,
        });
    }

    if let Ok(token) = std::env::var(platform.token_env_var) {
        if usable(&token) {
            debug!(var = platform.token_env_var, "token resolved from environment");
            return Ok(Credential {
                token,
                source: TokenSource::Env,
            });
        }
        warn!(
            var = platform.token_env_var,
            "ignoring environment token: too short or a placeholder"
        );
    }

    if let Some(token) = config_token {
        if usable(token) {
            warn!(
                "token read from config file; storing tokens in plaintext config is insecure, prefer {}",
                platform.token_env_var
            );
            return Ok(Credential {
                token: token.to_string(),
                source: TokenSource::Config,
            });
        }
    }

    Err(Error::Token(format!(
        "no usable token found: set {} to a PAT of at least {MIN_TOKEN_LEN} characters",
        platform.token_env_var
    )))
}

fn usable(token: &str) -> bool {
    token.len() >= MIN_TOKEN_LEN && !PLACEHOLDER_TOKENS.contains(&token)
}

/// Short display form that never leaks the full token.
pub fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{AZURE_DEVOPS, GITHUB};
    use serial_test::serial;

    const REAL_LOOKING: &str = "abcdefghij0123456789xyz";

    fn set_env(key: &str, value: Option<&str>) {
        unsafe {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }

    #[test]
    #[serial]
    fn test_env_token_wins_over_config() {
        set_env("AZURE_DEVOPS_PAT", Some(REAL_LOOKING));
        let cred = resolve(&AZURE_DEVOPS, None, Some("configconfigconfig12345")).unwrap();
        assert_eq!(cred.token, REAL_LOOKING);
        assert_eq!(cred.source, TokenSource::Env);
        set_env("AZURE_DEVOPS_PAT", None);
    }

    #[test]
    #[serial]
    fn test_flag_token_wins_over_env() {
        set_env("AZURE_DEVOPS_PAT", Some(REAL_LOOKING));
        let cred = resolve(&AZURE_DEVOPS, Some("explicit"), None).unwrap();
        assert_eq!(cred.token, "explicit");
        assert_eq!(cred.source, TokenSource::Flag);
        set_env("AZURE_DEVOPS_PAT", None);
    }

    #[test]
    #[serial]
    fn test_short_env_token_falls_through_to_config() {
        set_env("AZURE_DEVOPS_PAT", Some("short"));
        let cred = resolve(&AZURE_DEVOPS, None, Some(REAL_LOOKING)).unwrap();
        assert_eq!(cred.source, TokenSource::Config);
        set_env("AZURE_DEVOPS_PAT", None);
    }

    #[test]
    #[serial]
    fn test_placeholder_config_token_rejected() {
        set_env("AZURE_DEVOPS_PAT", None);
        let err = resolve(&AZURE_DEVOPS, None, Some("YOUR_AZURE_DEVOPS_PAT_HERE")).unwrap_err();
        assert!(matches!(err, Error::Token(_)));
        assert!(err.to_string().contains("AZURE_DEVOPS_PAT"));
    }

    #[test]
    #[serial]
    fn test_github_uses_its_own_env_var() {
        set_env("GITHUB_PAT", Some(REAL_LOOKING));
        set_env("AZURE_DEVOPS_PAT", None);
        let cred = resolve(&GITHUB, None, None).unwrap();
        assert_eq!(cred.source, TokenSource::Env);
        assert!(cred.describe_source(&GITHUB).contains("GITHUB_PAT"));
        set_env("GITHUB_PAT", None);
    }

    #[test]
    #[serial]
    fn test_no_token_anywhere_is_an_error() {
        set_env("AZURE_DEVOPS_PAT", None);
        let err = resolve(&AZURE_DEVOPS, None, None).unwrap_err();
        assert!(err.to_string().contains("AZURE_DEVOPS_PAT"));
        assert!(err.to_string().contains("20"));
    }

    #[test]
    fn test_mask_hides_middle() {
        assert_eq!(mask("abcdefghij0123456789"), "abcd...6789");
        assert_eq!(mask("tiny"), "****");
        assert_eq!(mask("12345678"), "****");
    }
}
