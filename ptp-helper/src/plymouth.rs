//! Plymouth Driver
//!
//! Builds and runs the command sequences behind a preview and a default
//! theme switch. Commands go through [`CommandRunner`] so the sequences can
//! be exercised without a real plymouthd.

use crate::error::HelperError;
use ptp_common::config::PlymouthConfig;
use ptp_common::daemon_conf;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

/// How often to ping a freshly started daemon before giving up
const PING_ATTEMPTS: u32 = 50;
const PING_INTERVAL: Duration = Duration::from_millis(100);

/// One external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Shell-like rendering for logs and error messages
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<CommandOutput, HelperError>> + Send + 'a>>;

pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> RunFuture<'a>;
}

/// Runs commands for real with tokio::process
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> RunFuture<'a> {
        Box::pin(async move {
            tracing::debug!("Running {}", invocation.display());

            let output = tokio::process::Command::new(&invocation.program)
                .args(&invocation.args)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|source| HelperError::Spawn {
                    command: invocation.display(),
                    source,
                })?;

            Ok(CommandOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        })
    }
}

/// Run an invocation and turn a non-zero exit into an error
async fn run_checked(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
) -> Result<CommandOutput, HelperError> {
    let output = runner.run(invocation).await?;
    if output.success {
        Ok(output)
    } else {
        Err(HelperError::CommandFailed {
            command: invocation.display(),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// The full preview of one theme
#[derive(Debug, Clone)]
pub struct PreviewPlan {
    plymouthd: PathBuf,
    plymouth: PathBuf,
    pid_file: PathBuf,
    theme: String,
    duration: u32,
    tick: Duration,
    ping_attempts: u32,
    ping_interval: Duration,
}

impl PreviewPlan {
    /// `theme` must already be validated
    pub fn new(config: &PlymouthConfig, theme: &str, duration: u32) -> Self {
        Self {
            plymouthd: config.plymouthd.clone(),
            plymouth: config.plymouth.clone(),
            pid_file: config.pid_file.clone(),
            theme: theme.to_string(),
            duration,
            tick: Duration::from_secs(1),
            ping_attempts: PING_ATTEMPTS,
            ping_interval: PING_INTERVAL,
        }
    }

    /// Override the pacing, mostly for tests
    pub fn with_timing(mut self, tick: Duration, ping_interval: Duration) -> Self {
        self.tick = tick;
        self.ping_interval = ping_interval;
        self
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// plymouthd picks the theme from the faked kernel command line,
    /// so the system default stays untouched
    pub fn daemon(&self) -> Invocation {
        Invocation::new(
            &self.plymouthd,
            [
                "--mode=boot".to_string(),
                format!("--pid-file={}", self.pid_file.display()),
                format!("--kernel-command-line=splash plymouth.splash={}", self.theme),
            ],
        )
    }

    pub fn ping(&self) -> Invocation {
        Invocation::new(&self.plymouth, ["--ping"])
    }

    pub fn show_splash(&self) -> Invocation {
        Invocation::new(&self.plymouth, ["--show-splash"])
    }

    pub fn update(&self, step: u32) -> Invocation {
        Invocation::new(&self.plymouth, [format!("--update=preview-{}", step)])
    }

    pub fn message(&self, remaining: u32) -> Invocation {
        Invocation::new(
            &self.plymouth,
            [
                "display-message".to_string(),
                format!("--text={}: {}s", self.theme, remaining),
            ],
        )
    }

    pub fn quit(&self) -> Invocation {
        Invocation::new(&self.plymouth, ["quit"])
    }

    /// Run the preview; once the daemon is up it is always told to quit
    pub async fn run(&self, runner: &dyn CommandRunner) -> Result<(), HelperError> {
        tracing::info!("Starting preview of {} for {}s", self.theme, self.duration);
        run_checked(runner, &self.daemon()).await?;

        let shown = self.show(runner).await;
        let quit = run_checked(runner, &self.quit()).await;

        shown?;
        quit?;
        tracing::info!("Preview of {} finished", self.theme);
        Ok(())
    }

    async fn show(&self, runner: &dyn CommandRunner) -> Result<(), HelperError> {
        self.wait_ready(runner).await?;
        run_checked(runner, &self.show_splash()).await?;

        for step in 0..self.duration {
            run_checked(runner, &self.update(step)).await?;
            // Not every plugin draws messages; a failure here is harmless
            if let Err(e) = run_checked(runner, &self.message(self.duration - step)).await {
                tracing::debug!("display-message ignored: {}", e);
            }
            tokio::time::sleep(self.tick).await;
        }

        Ok(())
    }

    async fn wait_ready(&self, runner: &dyn CommandRunner) -> Result<(), HelperError> {
        let ping = self.ping();
        for _ in 0..self.ping_attempts {
            if runner.run(&ping).await?.success {
                return Ok(());
            }
            tokio::time::sleep(self.ping_interval).await;
        }
        Err(HelperError::DaemonNotReady(self.ping_attempts))
    }
}

/// `plymouth-set-default-theme [-R] <theme>`
pub fn set_default_invocation(
    config: &PlymouthConfig,
    theme: &str,
    rebuild_initrd: bool,
) -> Invocation {
    let mut args = Vec::new();
    if rebuild_initrd {
        args.push("-R".to_string());
    }
    args.push(theme.to_string());
    Invocation::new(&config.set_default_theme, args)
}

pub async fn set_default(
    config: &PlymouthConfig,
    runner: &dyn CommandRunner,
    theme: &str,
    rebuild_initrd: bool,
) -> Result<(), HelperError> {
    let invocation = set_default_invocation(config, theme, rebuild_initrd);
    tracing::info!("Setting default theme: {}", invocation.display());
    run_checked(runner, &invocation).await?;
    Ok(())
}

/// The configured default theme, asking the plymouth tool first and
/// falling back to reading plymouthd.conf
pub async fn query_default(config: &PlymouthConfig, runner: &dyn CommandRunner) -> Option<String> {
    let invocation = Invocation::new(&config.set_default_theme, Vec::<String>::new());
    match runner.run(&invocation).await {
        Ok(out) if out.success && !out.stdout.trim().is_empty() => {
            return Some(out.stdout.trim().to_string());
        }
        Ok(out) => tracing::debug!("{} gave no theme: {}", invocation.display(), out.stderr.trim()),
        Err(e) => tracing::debug!("{}", e),
    }

    daemon_conf::current_theme(&config.daemon_conf, &config.daemon_defaults)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every invocation; fails the ones whose rendering contains a
    /// configured needle
    #[derive(Default)]
    pub struct RecordingRunner {
        pub calls: Mutex<Vec<Invocation>>,
        pub fail_on: Vec<String>,
        pub stdout: String,
    }

    impl RecordingRunner {
        pub fn failing(needles: &[&str]) -> Self {
            Self {
                fail_on: needles.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn rendered(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(Invocation::display).collect()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run<'a>(&'a self, invocation: &'a Invocation) -> RunFuture<'a> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(invocation.clone());
                let rendered = invocation.display();
                let failed = self.fail_on.iter().any(|n| rendered.contains(n.as_str()));
                Ok(CommandOutput {
                    success: !failed,
                    stdout: self.stdout.clone(),
                    stderr: if failed { "boom".to_string() } else { String::new() },
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;

    fn plan(duration: u32) -> PreviewPlan {
        PreviewPlan::new(&PlymouthConfig::default(), "spinner", duration)
            .with_timing(Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_preview_sequence() {
        let runner = RecordingRunner::default();
        plan(2).run(&runner).await.unwrap();

        assert_eq!(
            runner.rendered(),
            [
                "/usr/sbin/plymouthd --mode=boot --pid-file=/run/plymouth-theme-preview.pid \
                 --kernel-command-line=splash plymouth.splash=spinner",
                "/usr/bin/plymouth --ping",
                "/usr/bin/plymouth --show-splash",
                "/usr/bin/plymouth --update=preview-0",
                "/usr/bin/plymouth display-message --text=spinner: 2s",
                "/usr/bin/plymouth --update=preview-1",
                "/usr/bin/plymouth display-message --text=spinner: 1s",
                "/usr/bin/plymouth quit",
            ]
        );
    }

    #[tokio::test]
    async fn test_quit_runs_after_failure() {
        let runner = RecordingRunner::failing(&["--show-splash"]);
        let err = plan(3).run(&runner).await.unwrap_err();

        assert!(matches!(err, HelperError::CommandFailed { .. }));
        assert_eq!(runner.rendered().last().unwrap(), "/usr/bin/plymouth quit");
    }

    #[tokio::test]
    async fn test_no_quit_when_daemon_fails() {
        let runner = RecordingRunner::failing(&["plymouthd"]);
        assert!(plan(1).run(&runner).await.is_err());
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_daemon_never_ready() {
        let runner = RecordingRunner::failing(&["--ping"]);
        let err = plan(1).run(&runner).await.unwrap_err();

        assert!(matches!(err, HelperError::DaemonNotReady(PING_ATTEMPTS)));
        assert_eq!(runner.rendered().last().unwrap(), "/usr/bin/plymouth quit");
    }

    #[tokio::test]
    async fn test_message_failure_is_tolerated() {
        let runner = RecordingRunner::failing(&["display-message"]);
        plan(1).run(&runner).await.unwrap();
    }

    #[test]
    fn test_set_default_invocation() {
        let config = PlymouthConfig::default();
        assert_eq!(
            set_default_invocation(&config, "bgrt", false).display(),
            "/usr/sbin/plymouth-set-default-theme bgrt"
        );
        assert_eq!(
            set_default_invocation(&config, "bgrt", true).display(),
            "/usr/sbin/plymouth-set-default-theme -R bgrt"
        );
    }

    #[tokio::test]
    async fn test_query_default_from_tool() {
        let runner = RecordingRunner {
            stdout: "tribar\n".to_string(),
            ..RecordingRunner::default()
        };
        let theme = query_default(&PlymouthConfig::default(), &runner).await;
        assert_eq!(theme.as_deref(), Some("tribar"));
    }

    #[tokio::test]
    async fn test_query_default_falls_back_to_conf() {
        let tmp = tempfile::tempdir().unwrap();
        let conf = tmp.path().join("plymouthd.conf");
        std::fs::write(&conf, "[Daemon]\nTheme=fade-in\n").unwrap();

        let config = PlymouthConfig {
            daemon_conf: conf,
            daemon_defaults: tmp.path().join("missing"),
            ..PlymouthConfig::default()
        };
        let runner = RecordingRunner::failing(&["plymouth-set-default-theme"]);
        assert_eq!(query_default(&config, &runner).await.as_deref(), Some("fade-in"));
    }
}
