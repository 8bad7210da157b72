use std::process::Command;

use derive_getters::Getters;
use serde::Deserialize;

use super::ConfigError;

#[derive(Debug, Deserialize, Getters)]
pub struct PlainAuthConfig {
    user: String,
    #[getter(skip)]
    password_cmd: String,
}

impl PlainAuthConfig {
    /// Runs `password_cmd` and returns what it printed, without trailing whitespace.
    pub fn password(&self) -> Result<String, ConfigError> {
        let failed = |reason: String| ConfigError::PasswordCmd {
            user: self.user.clone(),
            reason,
        };
        let mut cmd_parts = self.password_cmd.split_whitespace();
        let program = cmd_parts
            .next()
            .ok_or_else(|| failed("no program given".to_owned()))?;
        let output = Command::new(program)
            .args(cmd_parts)
            .output()
            .map_err(|e| failed(e.to_string()))?;
        if !output.status.success() {
            return Err(failed(format!("exited with {}", output.status)));
        }

        let password = String::from_utf8(output.stdout).map_err(|e| failed(e.to_string()))?;
        let password = password.trim_end();
        if password.is_empty() {
            return Err(failed("printed no password".to_owned()));
        }
        Ok(password.to_owned())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum AuthConfig {
    Plain(PlainAuthConfig),
}

impl AuthConfig {
    pub fn user(&self) -> &str {
        match self {
            Self::Plain(plain) => plain.user(),
        }
    }

    pub fn password(&self) -> Result<String, ConfigError> {
        match self {
            Self::Plain(plain) => plain.password(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    fn auth(password_cmd: &str) -> AuthConfig {
        assert_ok!(toml::from_str(&format!(
            "type = \"Plain\"\nuser = \"me@gmx.net\"\npassword_cmd = \"{password_cmd}\""
        )))
    }

    #[rstest]
    fn test_password_is_trimmed_output_of_command() {
        let auth = auth("echo hunter2");

        assert_eq!("me@gmx.net", auth.user());
        assert_eq!("hunter2", assert_ok!(auth.password()));
    }

    #[rstest]
    #[case("false")]
    #[case("true")]
    #[case("")]
    #[case("/nonexistent/password-helper")]
    fn test_failing_password_cmd(#[case] password_cmd: &str) {
        let error = assert_err!(auth(password_cmd).password());

        assert_matches!(error, ConfigError::PasswordCmd { user, .. } if user == "me@gmx.net");
    }
}
