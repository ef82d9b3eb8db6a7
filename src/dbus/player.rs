use std::collections::HashMap;

use zbus::zvariant::OwnedValue;

/// Proxy for the `org.mpris.MediaPlayer2.Player` interface.
///
/// Only the members needed for track notifications and media key
/// forwarding are declared here; see
/// `<https://specifications.freedesktop.org/mpris-spec/latest/Player_Interface.html>`
/// for the full interface.
#[zbus::proxy(interface = "org.mpris.MediaPlayer2.Player", gen_blocking = false)]
pub trait Player {
    /// Skips to the next track in the tracklist.
    fn next(&self) -> zbus::Result<()>;

    /// Skips to the previous track in the tracklist.
    fn previous(&self) -> zbus::Result<()>;

    /// Toggles playback.
    fn play_pause(&self) -> zbus::Result<()>;

    /// Stops playback.
    fn stop(&self) -> zbus::Result<()>;

    /// Metadata of the current track, keyed by xesam/mpris field name.
    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;

    /// Current playback status ("Playing", "Paused" or "Stopped").
    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;
}
