use std::collections::HashMap;

use zbus::zvariant::Value;

/// Proxy for the `org.freedesktop.Notifications` interface.
///
/// See `<https://specifications.freedesktop.org/notification-spec/latest/>`
/// for the protocol details.
#[zbus::proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications",
    gen_blocking = false
)]
pub trait Notifications {
    /// Display a notification, returning its server-assigned id.
    ///
    /// Passing a previously returned id as `replaces_id` atomically
    /// replaces that notification instead of stacking a new one.
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    /// Dismiss a previously displayed notification.
    fn close_notification(&self, id: u32) -> zbus::Result<()>;

    /// Name, vendor, version and spec version of the running daemon.
    fn get_server_information(&self) -> zbus::Result<(String, String, String, String)>;
}
