//! D-Bus interface served by the helper
//!
//! `Preview` returns as soon as the preview has started; the outcome arrives
//! later as exactly one `PreviewFinished` signal.

use crate::authority::Authorizer;
use crate::error::HelperError;
use crate::lifecycle::{Activity, OperationGuard, OperationKind, OperationSlot};
use crate::plymouth::{self, CommandRunner, PreviewPlan};
use ptp_common::bus::{ACTION_PREVIEW, ACTION_SET_DEFAULT_THEME, OBJECT_PATH};
use ptp_common::config::{clamp_duration, Config};
use ptp_common::theme::{self, discover_themes};
use std::sync::Arc;
use zbus::message::Header;
use zbus::object_server::SignalEmitter;
use zbus::{fdo, interface, Connection};

pub struct HelperService {
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    authorizer: Arc<dyn Authorizer>,
    slot: Arc<OperationSlot>,
    activity: Activity,
}

impl HelperService {
    pub fn new(
        config: Arc<Config>,
        runner: Arc<dyn CommandRunner>,
        authorizer: Arc<dyn Authorizer>,
        slot: Arc<OperationSlot>,
        activity: Activity,
    ) -> Self {
        Self {
            config,
            runner,
            authorizer,
            slot,
            activity,
        }
    }

    /// Validate the request and reserve the operation slot
    fn prepare(&self, theme: &str, kind: OperationKind) -> Result<OperationGuard, HelperError> {
        theme::find_theme(&self.config.plymouth.themes_dir, theme)?;
        self.slot.try_acquire(kind)
    }

    async fn notify_busy(&self, emitter: &SignalEmitter<'_>) {
        if let Err(e) = self.busy_changed(emitter).await {
            tracing::debug!("Could not emit Busy change: {}", e);
        }
    }

    /// Start a preview in the background; the guard is held until it ends
    fn spawn_preview(&self, conn: Connection, plan: PreviewPlan, guard: OperationGuard) {
        let runner = Arc::clone(&self.runner);
        let activity = self.activity.clone();

        tokio::spawn(async move {
            let result = plan.run(runner.as_ref()).await;
            drop(guard);
            activity.touch();

            let (success, message) = match &result {
                Ok(()) => (true, String::new()),
                Err(e) => {
                    tracing::warn!("Preview of {} failed: {}", plan.theme(), e);
                    (false, e.to_string())
                }
            };

            if let Err(e) = emit_finished(&conn, plan.theme(), success, &message).await {
                tracing::warn!("Could not emit PreviewFinished: {}", e);
            }
        });
    }
}

async fn emit_finished(
    conn: &Connection,
    theme: &str,
    success: bool,
    message: &str,
) -> zbus::Result<()> {
    let iface = conn
        .object_server()
        .interface::<_, HelperService>(OBJECT_PATH)
        .await?;
    let emitter = iface.signal_emitter();

    HelperService::preview_finished(emitter, theme, success, message).await?;
    // Bound to a local so the interface guard drops before `iface`
    let res = iface.get().await.busy_changed(emitter).await;
    res
}

#[interface(name = "ru.gentoo.plymouth_theme_preview_helper")]
impl HelperService {
    /// Show `theme` on the splash for `seconds` (clamped to 1..=120)
    async fn preview(
        &self,
        theme: String,
        seconds: u32,
        #[zbus(connection)] conn: &Connection,
        #[zbus(header)] header: Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> fdo::Result<()> {
        let _call = self.activity.begin_call();
        self.authorizer
            .authorize(conn, &header, ACTION_PREVIEW)
            .await?;

        let guard = self.prepare(&theme, OperationKind::Preview)?;
        let plan = PreviewPlan::new(&self.config.plymouth, &theme, clamp_duration(seconds));
        self.spawn_preview(conn.clone(), plan, guard);

        self.notify_busy(&emitter).await;
        Ok(())
    }

    /// Make `theme` the boot default, optionally rebuilding the initrd
    async fn set_default_theme(
        &self,
        theme: String,
        rebuild_initrd: bool,
        #[zbus(connection)] conn: &Connection,
        #[zbus(header)] header: Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> fdo::Result<()> {
        let _call = self.activity.begin_call();
        self.authorizer
            .authorize(conn, &header, ACTION_SET_DEFAULT_THEME)
            .await?;

        let guard = self.prepare(&theme, OperationKind::SetDefault)?;
        self.notify_busy(&emitter).await;

        let result = plymouth::set_default(
            &self.config.plymouth,
            self.runner.as_ref(),
            &theme,
            rebuild_initrd,
        )
        .await;

        drop(guard);
        self.notify_busy(&emitter).await;
        Ok(result?)
    }

    async fn get_default_theme(&self) -> fdo::Result<String> {
        let _call = self.activity.begin_call();
        Ok(plymouth::query_default(&self.config.plymouth, self.runner.as_ref())
            .await
            .unwrap_or_default())
    }

    /// `(name, display name, description)` for each installed theme
    async fn list_themes(&self) -> fdo::Result<Vec<(String, String, String)>> {
        let _call = self.activity.begin_call();
        let themes = discover_themes(&self.config.plymouth.themes_dir)
            .map_err(|e| fdo::Error::Failed(format!("{:#}", e)))?;

        Ok(themes
            .into_iter()
            .map(|t| (t.name, t.display_name, t.description))
            .collect())
    }

    #[zbus(property)]
    async fn busy(&self) -> bool {
        self.slot.is_busy()
    }

    #[zbus(property)]
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    #[zbus(signal)]
    async fn preview_finished(
        emitter: &SignalEmitter<'_>,
        theme: &str,
        success: bool,
        message: &str,
    ) -> zbus::Result<()>;
}
