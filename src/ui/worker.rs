//! Helper calls from the GUI
//!
//! ARCHITECTURE: each request runs on its own OS thread with a private Tokio
//! runtime, so the GTK main thread never blocks on D-Bus or on the polkit
//! dialog. Results come back over std::sync::mpsc and are polled from the
//! main loop with glib::timeout_add_local.

use crate::client::HelperClient;
use gtk::glib;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Something the window asks the helper to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperRequest {
    Preview { theme: String, seconds: u32 },
    SetDefault { theme: String, rebuild_initrd: bool },
}

impl HelperRequest {
    pub fn theme(&self) -> &str {
        match self {
            HelperRequest::Preview { theme, .. } | HelperRequest::SetDefault { theme, .. } => theme,
        }
    }

    /// Status line shown while the request runs
    pub fn progress_text(&self) -> String {
        match self {
            HelperRequest::Preview { theme, seconds } => {
                format!("Previewing {} for {}s…", theme, seconds)
            }
            HelperRequest::SetDefault { theme, rebuild_initrd: true } => {
                format!("Setting {} as default and rebuilding the initramfs…", theme)
            }
            HelperRequest::SetDefault { theme, .. } => format!("Setting {} as default…", theme),
        }
    }
}

/// Messages sent from worker thread to GTK main thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    /// The helper accepted the request
    Started,
    /// Finished; Ok carries a user-facing summary
    Finished(Result<String, String>),
}

async fn execute(request: &HelperRequest, sender: &mpsc::Sender<WorkerMessage>) -> anyhow::Result<String> {
    let client = HelperClient::connect().await?;
    let _ = sender.send(WorkerMessage::Started);

    match request {
        HelperRequest::Preview { theme, seconds } => {
            let outcome = client.preview_and_wait(theme, *seconds).await?;
            if outcome.success {
                Ok(format!("Preview of {} finished", theme))
            } else {
                anyhow::bail!("Preview of {} failed: {}", theme, outcome.message)
            }
        }
        HelperRequest::SetDefault { theme, rebuild_initrd } => {
            client.set_default_theme(theme, *rebuild_initrd).await?;
            Ok(format!("{} is now the default boot splash", theme))
        }
    }
}

/// Run `request` off the main thread and feed its messages to `on_message`
///
/// `on_message` is called on the GTK main thread; the last call always
/// carries `WorkerMessage::Finished`.
pub fn run_request<F>(request: HelperRequest, on_message: F)
where
    F: Fn(WorkerMessage) + 'static,
{
    let (sender, receiver) = mpsc::channel::<WorkerMessage>();

    thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                let _ = sender.send(WorkerMessage::Finished(Err(format!(
                    "Failed to initialize async runtime: {}",
                    e
                ))));
                return;
            }
        };

        let result = rt.block_on(execute(&request, &sender));
        let message = result.map_err(|e| {
            tracing::warn!("{} failed: {:#}", request.theme(), e);
            format!("{:#}", e)
        });
        let _ = sender.send(WorkerMessage::Finished(message));
    });

    let receiver = Rc::new(RefCell::new(Some(receiver)));
    glib::timeout_add_local(Duration::from_millis(50), move || {
        let mut done = false;

        if let Some(ref rx) = *receiver.borrow() {
            loop {
                match rx.try_recv() {
                    Ok(msg) => {
                        done = matches!(msg, WorkerMessage::Finished(_));
                        on_message(msg);
                        if done {
                            break;
                        }
                    }
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => {
                        on_message(WorkerMessage::Finished(Err(
                            "The worker stopped unexpectedly".to_string(),
                        )));
                        done = true;
                        break;
                    }
                }
            }
        }

        if done {
            *receiver.borrow_mut() = None;
            glib::ControlFlow::Break
        } else {
            glib::ControlFlow::Continue
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_text() {
        let preview = HelperRequest::Preview {
            theme: "spinner".into(),
            seconds: 5,
        };
        assert_eq!(preview.progress_text(), "Previewing spinner for 5s…");
        assert_eq!(preview.theme(), "spinner");

        let rebuild = HelperRequest::SetDefault {
            theme: "bgrt".into(),
            rebuild_initrd: true,
        };
        assert!(rebuild.progress_text().contains("initramfs"));
    }
}
