/// Proxy for the GNOME settings daemon media key broadcaster.
///
/// Media keys are grabbed per application; the daemon then broadcasts
/// every press as a `MediaPlayerKeyPressed` signal. Desktops without
/// this service simply don't own the bus name, which is why the caller
/// treats its absence as non-fatal.
#[zbus::proxy(
    interface = "org.gnome.SettingsDaemon.MediaKeys",
    default_service = "org.gnome.SettingsDaemon.MediaKeys",
    default_path = "/org/gnome/SettingsDaemon/MediaKeys",
    gen_blocking = false
)]
pub trait MediaKeys {
    /// Register `application` as a media key consumer.
    fn grab_media_player_keys(&self, application: &str, time: u32) -> zbus::Result<()>;

    /// Unregister `application`.
    fn release_media_player_keys(&self, application: &str) -> zbus::Result<()>;

    /// Emitted on every media key press ("Play", "Stop", "Next", "Previous", ...).
    #[zbus(signal)]
    fn media_player_key_pressed(&self, application: String, key: String) -> zbus::Result<()>;
}
