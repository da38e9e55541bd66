//! Helper Client - talks to the privileged helper over the system bus
//!
//! The bus activates the helper on first use, and the helper's polkit checks
//! may pop up an authentication dialog through the user's agent.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio_stream::StreamExt;
use zbus::{fdo, proxy, Connection};

/// Extra time allowed on top of the preview length for startup and teardown
const PREVIEW_GRACE: Duration = Duration::from_secs(30);

#[proxy(
    interface = "ru.gentoo.plymouth_theme_preview_helper",
    default_service = "ru.gentoo.plymouth_theme_preview_helper",
    default_path = "/ru/gentoo/plymouth_theme_preview_helper"
)]
pub trait Helper {
    fn preview(&self, theme: &str, seconds: u32) -> zbus::Result<()>;

    fn set_default_theme(&self, theme: &str, rebuild_initrd: bool) -> zbus::Result<()>;

    fn get_default_theme(&self) -> zbus::Result<String>;

    fn list_themes(&self) -> zbus::Result<Vec<(String, String, String)>>;

    #[zbus(property)]
    fn busy(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn version(&self) -> zbus::Result<String>;

    #[zbus(signal)]
    fn preview_finished(&self, theme: String, success: bool, message: String) -> zbus::Result<()>;
}

/// How a preview ended, as reported by the helper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOutcome {
    pub theme: String,
    pub success: bool,
    pub message: String,
}

pub struct HelperClient {
    proxy: HelperProxy<'static>,
    grace: Duration,
}

impl HelperClient {
    pub async fn connect() -> Result<Self> {
        let connection = Connection::system()
            .await
            .context("Failed to connect to system D-Bus")?;

        Self::with_connection(&connection).await
    }

    /// Talk to the helper over an already established connection
    pub async fn with_connection(connection: &Connection) -> Result<Self> {
        let proxy = HelperProxy::new(connection)
            .await
            .context("Failed to create helper proxy")?;

        Ok(Self {
            proxy,
            grace: PREVIEW_GRACE,
        })
    }

    /// Change how long past the preview length to wait for its end
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Request a preview and wait for its `PreviewFinished` signal
    pub async fn preview_and_wait(&self, theme: &str, seconds: u32) -> Result<PreviewOutcome> {
        // Subscribe first so a short preview cannot finish unobserved
        let mut finished = self
            .proxy
            .receive_preview_finished()
            .await
            .context("Failed to subscribe to PreviewFinished")?;

        self.proxy
            .preview(theme, seconds)
            .await
            .map_err(describe_error)?;
        tracing::info!("Preview of {} started", theme);

        let deadline = Duration::from_secs(u64::from(seconds)) + self.grace;
        let wait = async {
            while let Some(signal) = finished.next().await {
                let args = signal.args().context("Malformed PreviewFinished signal")?;
                if args.theme() == theme {
                    return Ok(PreviewOutcome {
                        theme: args.theme().clone(),
                        success: *args.success(),
                        message: args.message().clone(),
                    });
                }
            }
            Err::<PreviewOutcome, _>(anyhow::anyhow!(
                "The helper left the bus before the preview finished"
            ))
        };

        tokio::time::timeout(deadline, wait)
            .await
            .with_context(|| format!("No answer from the helper after {:?}", deadline))?
    }

    pub async fn set_default_theme(&self, theme: &str, rebuild_initrd: bool) -> Result<()> {
        self.proxy
            .set_default_theme(theme, rebuild_initrd)
            .await
            .map_err(describe_error)
    }

    pub async fn default_theme(&self) -> Result<Option<String>> {
        let theme = self.proxy.get_default_theme().await.map_err(describe_error)?;
        Ok(Some(theme).filter(|t| !t.is_empty()))
    }

    pub async fn helper_version(&self) -> Result<String> {
        self.proxy.version().await.map_err(describe_error)
    }
}

/// Turn helper errors into messages fit for a user
pub fn describe_error(err: zbus::Error) -> anyhow::Error {
    match fdo::Error::from(err) {
        fdo::Error::AccessDenied(_) => {
            anyhow::anyhow!("Authorization denied. Administrator privileges are required.")
        }
        fdo::Error::InvalidArgs(msg) => anyhow::anyhow!("{}", msg),
        fdo::Error::ServiceUnknown(_) | fdo::Error::NameHasNoOwner(_) => anyhow::anyhow!(
            "The helper service is not available.\n\
             Is plymouth-theme-preview installed (see `plymouth-theme-preview install`)?"
        ),
        fdo::Error::Failed(msg) => anyhow::anyhow!("{}", msg),
        other => anyhow::Error::new(other).context("Helper call failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_access_denied() {
        let err = zbus::Error::from(fdo::Error::AccessDenied("nope".into()));
        assert!(describe_error(err).to_string().contains("Authorization denied"));
    }

    #[test]
    fn test_describe_failed_keeps_message() {
        let err = zbus::Error::from(fdo::Error::Failed("another plymouth operation is already running".into()));
        assert_eq!(describe_error(err).to_string(), "another plymouth operation is already running");
    }

    #[test]
    fn test_describe_missing_service() {
        let err = zbus::Error::from(fdo::Error::ServiceUnknown("gone".into()));
        assert!(describe_error(err).to_string().contains("not available"));
    }

    /// Stand-in helper that answers `Preview` with a fixed list of signals
    struct ScriptedHelper {
        finish_with: Vec<(&'static str, bool, &'static str)>,
    }

    #[zbus::interface(name = "ru.gentoo.plymouth_theme_preview_helper")]
    impl ScriptedHelper {
        async fn preview(
            &self,
            _theme: String,
            _seconds: u32,
            #[zbus(signal_emitter)] emitter: zbus::object_server::SignalEmitter<'_>,
        ) -> fdo::Result<()> {
            for (theme, success, message) in &self.finish_with {
                Self::preview_finished(&emitter, theme, *success, message).await?;
            }
            Ok(())
        }

        #[zbus(signal)]
        async fn preview_finished(
            emitter: &zbus::object_server::SignalEmitter<'_>,
            theme: &str,
            success: bool,
            message: &str,
        ) -> zbus::Result<()>;
    }

    async fn client_for(helper: ScriptedHelper) -> (Connection, HelperClient) {
        let (server_sock, client_sock) = tokio::net::UnixStream::pair().unwrap();
        let server = zbus::connection::Builder::unix_stream(server_sock)
            .server(zbus::Guid::generate())
            .unwrap()
            .p2p()
            .serve_at(crate::bus::OBJECT_PATH, helper)
            .unwrap()
            .build();
        let client = zbus::connection::Builder::unix_stream(client_sock).p2p().build();
        let (server, client) = tokio::try_join!(server, client).unwrap();

        let helper = HelperClient::with_connection(&client).await.unwrap();
        (server, helper)
    }

    #[tokio::test]
    async fn test_preview_waits_for_its_own_theme() {
        let (_server, client) = client_for(ScriptedHelper {
            finish_with: vec![("bgrt", false, "other preview"), ("spinner", true, "")],
        })
        .await;

        let outcome = client.preview_and_wait("spinner", 0).await.unwrap();
        assert_eq!(
            outcome,
            PreviewOutcome {
                theme: "spinner".into(),
                success: true,
                message: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_preview_reports_failure() {
        let (_server, client) = client_for(ScriptedHelper {
            finish_with: vec![("spinner", false, "plymouthd did not become ready")],
        })
        .await;

        let outcome = client.preview_and_wait("spinner", 0).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "plymouthd did not become ready");
    }

    #[tokio::test]
    async fn test_preview_times_out_without_signal() {
        let (_server, client) = client_for(ScriptedHelper {
            finish_with: vec![("bgrt", true, "")],
        })
        .await;
        let client = client.with_grace(Duration::from_millis(200));

        let err = client.preview_and_wait("spinner", 0).await.unwrap_err();
        assert!(err.to_string().contains("No answer from the helper"), "{}", err);
    }
}
