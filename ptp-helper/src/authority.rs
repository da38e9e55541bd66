//! Polkit Integration - Caller Authorization
//!
//! Every privileged method checks the *calling* bus peer, identified by the
//! sender in the message header, against a polkit action. Root callers skip
//! the check.

use crate::error::HelperError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use zbus::message::Header;
use zbus::names::BusName;
use zbus::Connection;
use zbus_polkit::policykit1::{AuthorityProxy, CheckAuthorizationFlags, Subject};

pub type AuthFuture<'a> = Pin<Box<dyn Future<Output = Result<(), HelperError>> + Send + 'a>>;

/// Decides whether the caller of a method may perform an action
pub trait Authorizer: Send + Sync {
    fn authorize<'a>(
        &'a self,
        conn: &'a Connection,
        header: &'a Header<'_>,
        action_id: &'a str,
    ) -> AuthFuture<'a>;
}

/// Asks the system polkit authority
#[derive(Debug, Default, Clone, Copy)]
pub struct Polkit;

impl Authorizer for Polkit {
    fn authorize<'a>(
        &'a self,
        conn: &'a Connection,
        header: &'a Header<'_>,
        action_id: &'a str,
    ) -> AuthFuture<'a> {
        Box::pin(check_polkit(conn, header, action_id))
    }
}

/// Authorize the sender of `header` for `action_id`
pub async fn check_polkit(
    conn: &Connection,
    header: &Header<'_>,
    action_id: &str,
) -> Result<(), HelperError> {
    let sender = header
        .sender()
        .ok_or_else(|| HelperError::NotAuthorized(action_id.to_string()))?;

    let dbus = zbus::fdo::DBusProxy::new(conn).await?;
    let uid = dbus
        .get_connection_unix_user(BusName::Unique(sender.clone()))
        .await
        .map_err(zbus::Error::from)?;

    if is_privileged_uid(uid) {
        tracing::debug!("Caller {} is root, skipping polkit for {}", sender, action_id);
        return Ok(());
    }

    let authority = AuthorityProxy::new(conn).await?;
    let subject = Subject::new_for_message_header(header).map_err(|e| {
        tracing::warn!("Could not build polkit subject for {}: {}", sender, e);
        HelperError::NotAuthorized(action_id.to_string())
    })?;

    // The caller's authentication agent shows the password dialog
    let result = authority
        .check_authorization(
            &subject,
            action_id,
            &HashMap::new(),
            CheckAuthorizationFlags::AllowUserInteraction.into(),
            "",
        )
        .await?;

    if result.is_authorized {
        tracing::info!("Polkit authorized {} (uid {}) for {}", sender, uid, action_id);
        Ok(())
    } else {
        tracing::info!("Polkit denied {} (uid {}) for {}", sender, uid, action_id);
        Err(HelperError::NotAuthorized(action_id.to_string()))
    }
}

pub fn is_privileged_uid(uid: u32) -> bool {
    uid == 0
}

/// Check if this process runs with an effective uid of root
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_uid_zero_is_privileged() {
        assert!(is_privileged_uid(0));
        assert!(!is_privileged_uid(1000));
        assert!(!is_privileged_uid(u32::MAX));
    }
}
