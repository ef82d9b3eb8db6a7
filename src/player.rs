use std::{collections::HashMap, ops::Deref, str::FromStr};

use anyhow::{anyhow, Context as _, Result};
use futures_lite::{stream::Fuse, StreamExt as _};
use tokio::select;
use zbus::{
    proxy::PropertyStream,
    zvariant::{OwnedValue, Str, Value},
};

use crate::dbus::player::PlayerProxy;

/// Current playback status of a MPRIS-compliant player
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}
impl FromStr for PlaybackStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "playing" => Ok(Self::Playing),
            "paused" => Ok(Self::Paused),
            "stopped" => Ok(Self::Stopped),
            _ => Err(anyhow!("Unknown PlaybackStatus {s}")),
        }
    }
}

/// The currently loaded track, normalized from MPRIS metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub artist: String,
    pub title: String,
    pub album: String,
    /// Release year, from the first four characters of `xesam:contentCreated`.
    pub year: Option<String>,
    /// Album art location from `mpris:artUrl`, if the player exposes one.
    pub art_url: Option<String>,
    pub playing: bool,
}
impl TrackInfo {
    /// Extract a track from a raw metadata map.
    ///
    /// Returns [`None`] when the payload carries neither an artist nor a
    /// title, which is how players without a loaded track (and malformed
    /// events) look on the wire.
    pub fn from_metadata(metadata: &HashMap<String, OwnedValue>) -> Option<Self> {
        let artist = metadata
            .get("xesam:artist")
            .map(Deref::deref)
            .map(extract_str_list)
            .unwrap_or_default()
            .join(", ");
        let title = metadata
            .get("xesam:title")
            .map(Deref::deref)
            .and_then(extract_str)
            .map(ToString::to_string)
            .unwrap_or_default();
        if artist.is_empty() && title.is_empty() {
            return None;
        }
        let album = metadata
            .get("xesam:album")
            .map(Deref::deref)
            .and_then(extract_str)
            .map(ToString::to_string)
            .unwrap_or_default();
        let year = metadata
            .get("xesam:contentCreated")
            .map(Deref::deref)
            .and_then(extract_str)
            .and_then(|s| s.as_str().get(..4))
            .map(ToString::to_string);
        let art_url = metadata
            .get("mpris:artUrl")
            .map(Deref::deref)
            .and_then(extract_str)
            .map(ToString::to_string);
        Some(Self {
            artist,
            title,
            album,
            year,
            art_url,
            playing: true,
        })
    }
}

/// A player state change worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    TrackChanged(TrackInfo),
    Stopped,
}

#[derive(Debug)]
pub struct PlayerState {
    pub metadata: HashMap<String, OwnedValue>,
    pub status: Option<PlaybackStatus>,
}
impl PlayerState {
    pub async fn new(player: &PlayerProxy<'_>) -> Result<Self> {
        Ok(Self {
            metadata: player
                .metadata()
                .await
                .inspect_err(|e| {
                    tracing::warn!(?e, "Failed to get player metadata");
                })
                .ok()
                .unwrap_or_default(),
            status: player
                .playback_status()
                .await
                .inspect_err(|e| {
                    tracing::warn!(?e, "Failed to get player playback status");
                })
                .ok()
                .as_deref()
                .map(str::parse)
                .transpose()
                .context("Failed to parse player playback status")?,
        })
    }

    pub fn apply_update(&mut self, update: PlayerUpdate) {
        match update {
            PlayerUpdate::Metadata(metadata) => {
                self.metadata = metadata;
            }
            PlayerUpdate::Status(status) => {
                self.status = Some(status);
            }
        }
    }

    /// The event this state currently calls for, if any.
    ///
    /// A stopped player always yields [`PlayerEvent::Stopped`]; a playing
    /// or paused player yields the current track, or nothing when no track
    /// can be extracted from the metadata.
    #[must_use]
    pub fn current_event(&self) -> Option<PlayerEvent> {
        match self.status {
            Some(PlaybackStatus::Stopped) => Some(PlayerEvent::Stopped),
            Some(status) => {
                let mut info = TrackInfo::from_metadata(&self.metadata)?;
                info.playing = status == PlaybackStatus::Playing;
                Some(PlayerEvent::TrackChanged(info))
            }
            None => None,
        }
    }
}

pub struct PlayerUpdateListener<'a> {
    metadata_stream: Fuse<PropertyStream<'a, HashMap<String, OwnedValue>>>,
    status_stream: Fuse<PropertyStream<'a, String>>,
}
#[derive(Debug)]
pub enum PlayerUpdate {
    Metadata(HashMap<String, OwnedValue>),
    Status(PlaybackStatus),
}

impl<'a> PlayerUpdateListener<'a> {
    pub async fn new(player: &PlayerProxy<'a>) -> Self {
        Self {
            metadata_stream: player.receive_metadata_changed().await.fuse(),
            status_stream: player.receive_playback_status_changed().await.fuse(),
        }
    }
    pub async fn update(&mut self) -> Result<PlayerUpdate> {
        select! {
            metadata = self.metadata_stream.next() => {
                metadata.context("Failed to receive metadata update event")?.get().await.context("Failed to get player metadata").map(PlayerUpdate::Metadata)
            },
            status = self.status_stream.next() => {
                status.context("Failed to receive status update event")?.get().await.context("Failed to get player playback status")?.parse().map(PlayerUpdate::Status)
            }
        }
    }
}

#[must_use]
/// Converts a [`Value`] into [`Str`], or return [`None`] if it's not `str`.
const fn extract_str<'a, 'b>(v: &'a Value<'b>) -> Option<&'a Str<'b>> {
    if let Value::Str(v) = v {
        Some(v)
    } else {
        None
    }
}

/// Flattens a string or array-of-strings [`Value`] into a list.
///
/// MPRIS declares `xesam:artist` as `as`, but some players send a plain
/// string instead.
fn extract_str_list(v: &Value<'_>) -> Vec<String> {
    match v {
        Value::Array(a) => a
            .iter()
            .filter_map(extract_str)
            .map(ToString::to_string)
            .collect(),
        Value::Str(s) => vec![s.to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(s: &str) -> OwnedValue {
        OwnedValue::try_from(Value::from(s)).unwrap()
    }

    fn metadata(artist: &[&str], title: &str, album: &str) -> HashMap<String, OwnedValue> {
        let mut m = HashMap::new();
        m.insert(
            "xesam:artist".to_string(),
            OwnedValue::try_from(Value::from(artist.to_vec())).unwrap(),
        );
        m.insert("xesam:title".to_string(), value(title));
        m.insert("xesam:album".to_string(), value(album));
        m
    }

    #[test]
    fn playback_status_parses_case_insensitively() {
        assert_eq!("Playing".parse::<PlaybackStatus>().unwrap(), PlaybackStatus::Playing);
        assert_eq!("paused".parse::<PlaybackStatus>().unwrap(), PlaybackStatus::Paused);
        assert_eq!("STOPPED".parse::<PlaybackStatus>().unwrap(), PlaybackStatus::Stopped);
        assert!("Buffering".parse::<PlaybackStatus>().is_err());
    }

    #[test]
    fn track_from_full_metadata() {
        let mut m = metadata(&["Jefferson Airplane"], "Somebody to Love", "Surrealistic Pillow");
        m.insert("xesam:contentCreated".to_string(), value("1967-02-01T00:00:00Z"));
        m.insert("mpris:artUrl".to_string(), value("https://example.com/art.jpg"));

        let info = TrackInfo::from_metadata(&m).unwrap();
        assert_eq!(info.artist, "Jefferson Airplane");
        assert_eq!(info.title, "Somebody to Love");
        assert_eq!(info.album, "Surrealistic Pillow");
        assert_eq!(info.year.as_deref(), Some("1967"));
        assert_eq!(info.art_url.as_deref(), Some("https://example.com/art.jpg"));
    }

    #[test]
    fn multiple_artists_are_joined() {
        let m = metadata(&["A", "B"], "T", "Alb");
        assert_eq!(TrackInfo::from_metadata(&m).unwrap().artist, "A, B");
    }

    #[test]
    fn empty_metadata_is_not_a_track() {
        assert_eq!(TrackInfo::from_metadata(&HashMap::new()), None);
    }

    #[test]
    fn stopped_state_yields_stop_event() {
        let state = PlayerState {
            metadata: metadata(&["A"], "T", "Alb"),
            status: Some(PlaybackStatus::Stopped),
        };
        assert_eq!(state.current_event(), Some(PlayerEvent::Stopped));
    }

    #[test]
    fn paused_state_yields_track_event() {
        let state = PlayerState {
            metadata: metadata(&["A"], "T", "Alb"),
            status: Some(PlaybackStatus::Paused),
        };
        let Some(PlayerEvent::TrackChanged(info)) = state.current_event() else {
            panic!("Expected a track event");
        };
        assert!(!info.playing);
    }

    #[test]
    fn unknown_status_yields_no_event() {
        let state = PlayerState {
            metadata: metadata(&["A"], "T", "Alb"),
            status: None,
        };
        assert_eq!(state.current_event(), None);
    }

    #[test]
    fn repeated_events_compare_equal() {
        let state = PlayerState {
            metadata: metadata(&["A"], "T1", "Alb1"),
            status: Some(PlaybackStatus::Playing),
        };
        assert_eq!(state.current_event(), state.current_event());
    }
}
