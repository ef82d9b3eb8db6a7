use std::collections::HashMap;

use anyhow::{Context as _, Result};
use zbus::Connection;

use crate::{
    dbus::notifications::NotificationsProxy,
    icon_cache::IconCache,
    player::{PlayerEvent, TrackInfo},
};

pub const APP_NAME: &str = "mpris-notify";
const STOPPED_SUMMARY: &str = "[stopped]";

/// Displays track notifications, keeping at most one alive at a time.
///
/// The handle of the last notification is remembered so it can be closed
/// (and its id reused via `replaces_id`) before the next one is shown,
/// preventing a backlog from building up while cycling through tracks.
pub struct Notifier {
    notifications: NotificationsProxy<'static>,
    icons: IconCache,
    last_id: u32,
    timeout_ms: i32,
}

impl Notifier {
    /// Connect to the notification daemon.
    ///
    /// An unreachable daemon is a fatal condition: nothing this program
    /// does is observable without one.
    pub async fn new(conn: &Connection, icons: IconCache, timeout_ms: i32) -> Result<Self> {
        let notifications = NotificationsProxy::new(conn)
            .await
            .context("Failed to create notifications proxy")?;
        let (name, vendor, version, _) = notifications
            .get_server_information()
            .await
            .context("No notification daemon is reachable on the session bus")?;
        tracing::info!(%name, %vendor, %version, "Connected to notification daemon");
        Ok(Self {
            notifications,
            icons,
            last_id: 0,
            timeout_ms,
        })
    }

    pub async fn announce(&mut self, event: &PlayerEvent) -> Result<()> {
        match event {
            PlayerEvent::TrackChanged(info) => self.on_track_changed(info).await,
            PlayerEvent::Stopped => self.on_stopped().await,
        }
    }

    async fn on_track_changed(&mut self, info: &TrackInfo) -> Result<()> {
        tracing::info!(
            artist = %info.artist,
            title = %info.title,
            playing = info.playing,
            "Track changed"
        );
        let icon = self.icons.icon_for(info).await;
        self.show(&info.artist, &track_body(info), &icon).await
    }

    async fn on_stopped(&mut self) -> Result<()> {
        tracing::info!("Playback stopped");
        let icon = self.icons.fallback_icon();
        self.show(STOPPED_SUMMARY, "", &icon).await
    }

    async fn show(&mut self, summary: &str, body: &str, icon: &str) -> Result<()> {
        if self.last_id != 0 {
            tracing::debug!(id = self.last_id, "Closing previous notification");
            if let Err(e) = self.notifications.close_notification(self.last_id).await {
                tracing::warn!(?e, "Failed to close previous notification");
            }
        }
        self.last_id = self
            .notifications
            .notify(
                APP_NAME,
                self.last_id,
                icon,
                summary,
                body,
                &[],
                HashMap::new(),
                self.timeout_ms,
            )
            .await
            .context("Failed to display notification")?;
        tracing::debug!(id = self.last_id, "Raised notification");
        Ok(())
    }
}

/// Notification body: title on the first line, album (with release year
/// when known) on the second.
fn track_body(info: &TrackInfo) -> String {
    match info.year.as_deref() {
        Some(year) => format!("{}\n{} ({year})", info.title, info.album),
        None => format!("{}\n{}", info.title, info.album),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(year: Option<&str>) -> TrackInfo {
        TrackInfo {
            artist: "Jefferson Airplane".to_string(),
            title: "Somebody to Love".to_string(),
            album: "Surrealistic Pillow".to_string(),
            year: year.map(ToString::to_string),
            art_url: None,
            playing: true,
        }
    }

    #[test]
    fn body_includes_release_year_when_known() {
        assert_eq!(
            track_body(&track(Some("1967"))),
            "Somebody to Love\nSurrealistic Pillow (1967)"
        );
    }

    #[test]
    fn body_without_year() {
        assert_eq!(
            track_body(&track(None)),
            "Somebody to Love\nSurrealistic Pillow"
        );
    }
}
