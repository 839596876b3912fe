//! OAuth access tokens for the Google REST APIs.
//!
//! Either a token already exported in the environment, or the stdout of a
//! token command such as `gcloud auth print-access-token`. The command runs
//! once per process; tokens live about an hour, longer than a review session.

use crate::config::Auth;
use crate::error::ReviewError;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub trait TokenSource {
    fn access_token(&self) -> Result<String, ReviewError>;
}

pub struct AccessTokenProvider {
    cfg: Auth,
    cached: OnceLock<String>,
}

impl AccessTokenProvider {
    pub fn new(cfg: &Auth) -> Self {
        Self {
            cfg: cfg.clone(),
            cached: OnceLock::new(),
        }
    }

    fn fetch(&self) -> Result<String, ReviewError> {
        if let Ok(token) = std::env::var(&self.cfg.access_token_env) {
            if !token.trim().is_empty() {
                debug!("using access token from {}", self.cfg.access_token_env);
                return Ok(token.trim().to_string());
            }
        }

        let Some((program, args)) = self.cfg.token_command.split_first() else {
            return Err(self.missing());
        };
        let mut cmd = Command::new(program);
        cmd.args(args);
        debug!("running token command {program}");
        let stdout = run_with_timeout(
            cmd,
            Duration::from_secs(self.cfg.token_command_timeout_seconds.max(1)),
        )
        .map_err(|e| {
            warn!("token command failed: {e}");
            self.missing()
        })?;

        let token = stdout.trim().to_string();
        if token.is_empty() {
            return Err(self.missing());
        }
        Ok(token)
    }

    fn missing(&self) -> ReviewError {
        ReviewError::configuration(
            "no Google access token available",
            format!(
                "export {} with an OAuth token for the Drive/Sheets scopes, or configure [auth] token_command (e.g. gcloud auth print-access-token)",
                self.cfg.access_token_env
            ),
        )
    }
}

impl TokenSource for AccessTokenProvider {
    fn access_token(&self) -> Result<String, ReviewError> {
        if let Some(t) = self.cached.get() {
            return Ok(t.clone());
        }
        let token = self.fetch()?;
        Ok(self.cached.get_or_init(|| token).clone())
    }
}

fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<String, String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| format!("spawn: {e}"))?;

    let started = Instant::now();
    loop {
        match child.try_wait().map_err(|e| format!("try_wait: {e}"))? {
            Some(status) => {
                let mut out = String::new();
                let mut err = String::new();
                if let Some(mut s) = child.stdout.take() {
                    s.read_to_string(&mut out).map_err(|e| e.to_string())?;
                }
                if let Some(mut s) = child.stderr.take() {
                    s.read_to_string(&mut err).map_err(|e| e.to_string())?;
                }
                if !status.success() {
                    return Err(format!("exit {status}: {}", err.trim()));
                }
                return Ok(out);
            }
            None if started.elapsed() > timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("timed out after {timeout:?}"));
            }
            None => std::thread::sleep(Duration::from_millis(50)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_configuration_error() {
        let cfg = Auth {
            access_token_env: "COMPLIANCE_REVIEW_TEST_TOKEN_UNSET".into(),
            token_command: Vec::new(),
            token_command_timeout_seconds: 1,
        };
        let provider = AccessTokenProvider::new(&cfg);
        let err = provider.access_token().unwrap_err();
        assert!(matches!(err, ReviewError::Configuration { .. }));
    }
}
