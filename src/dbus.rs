use anyhow::{Context as _, Result};
use futures_lite::{stream::iter, Stream, StreamExt as _};
use zbus::{fdo::DBusProxy, names::OwnedBusName, Connection};

pub mod media_keys;
pub mod notifications;
pub mod player;

const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";

pub enum BusActivity {
    Created,
    Destroyed,
}

/// D-Bus's activity parsed from `NameOwnerChanged` signal
pub struct BusChange {
    pub name: OwnedBusName,
    pub activity: BusActivity,
}
impl BusChange {
    pub const fn new(name: OwnedBusName, activity: BusActivity) -> Self {
        Self { name, activity }
    }
    pub const fn new_existing(name: OwnedBusName) -> Self {
        Self {
            name,
            activity: BusActivity::Created,
        }
    }
    pub fn is_mpris(&self) -> bool {
        self.name.starts_with(MPRIS_PREFIX)
    }
    /// Whether this bus belongs to the watched player.
    ///
    /// `player` is the bus-name segment after the MPRIS prefix
    /// ("spotify" matches both `org.mpris.MediaPlayer2.spotify` and
    /// instance-suffixed names like
    /// `org.mpris.MediaPlayer2.spotify.instance123`); "all" matches
    /// every MPRIS player.
    pub fn matches_player(&self, player: &str) -> bool {
        let Some(suffix) = self.name.as_str().strip_prefix(MPRIS_PREFIX) else {
            return false;
        };
        if player == "all" {
            return true;
        }
        suffix
            .strip_prefix(player)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    }
}

/// Return a stream of all MPRIS players on the bus
pub async fn player_buses(conn: &Connection) -> Result<impl Stream<Item = BusChange>> {
    let proxy = DBusProxy::new(conn)
        .await
        .context("Failed to create DBusProxy")?;

    let existing_names = iter(
        proxy
            .list_names()
            .await
            .context("Failed to list currently-owned names on DBus")?
            .into_iter()
            .map(BusChange::new_existing),
    );
    let new_activities = proxy
        .receive_name_owner_changed()
        .await
        .context("Failed to listen for NameOwnerChanged signal on DBus")?
        .filter_map(|s| {
            let args = s
                .args()
                .inspect_err(|e| tracing::warn!(?e, "Failed to parse NameOwnerChanged argument"))
                .ok()?;
            let change = match (args.new_owner.is_some(), args.old_owner.is_some()) {
                (true, false) => BusActivity::Created,
                (false, true) => BusActivity::Destroyed,
                _ => return None,
            };
            Some(BusChange::new(args.name.into(), change))
        });

    Ok(existing_names
        .chain(new_activities)
        .filter(BusChange::is_mpris))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(name: &str) -> BusChange {
        BusChange::new_existing(OwnedBusName::try_from(name).unwrap())
    }

    #[test]
    fn matches_exact_player_name() {
        assert!(change("org.mpris.MediaPlayer2.spotify").matches_player("spotify"));
        assert!(!change("org.mpris.MediaPlayer2.vlc").matches_player("spotify"));
    }

    #[test]
    fn matches_instance_suffixed_name() {
        assert!(change("org.mpris.MediaPlayer2.spotify.instance123").matches_player("spotify"));
        // "spot" must not match on a partial segment
        assert!(!change("org.mpris.MediaPlayer2.spotify").matches_player("spot"));
    }

    #[test]
    fn all_matches_any_mpris_bus() {
        assert!(change("org.mpris.MediaPlayer2.vlc").matches_player("all"));
        assert!(!change("org.freedesktop.Notifications").matches_player("all"));
    }
}
