//! Static playlist catalog offered to every device.

use serde::Serialize;

/// A streamable playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: &'static str,
    pub name: &'static str,
    pub duration: &'static str,
    pub tracks: u32,
}

const CATALOG: &[Playlist] = &[
    Playlist { id: "summer-vibes", name: "Summer Vibes", duration: "2h 15m", tracks: 45 },
    Playlist { id: "chill-background", name: "Chill Background", duration: "3h 30m", tracks: 62 },
    Playlist { id: "corporate-ambient", name: "Corporate Ambient", duration: "1h 45m", tracks: 28 },
    Playlist { id: "upbeat-retail", name: "Upbeat Retail", duration: "2h 45m", tracks: 52 },
    Playlist { id: "jazz-lounge", name: "Jazz Lounge", duration: "4h 10m", tracks: 78 },
    Playlist { id: "morning-energy", name: "Morning Energy", duration: "1h 30m", tracks: 35 },
];

/// All playlists in catalog order
pub fn playlists() -> &'static [Playlist] {
    CATALOG
}

/// Look up a playlist by id
pub fn find_playlist(id: &str) -> Option<&'static Playlist> {
    CATALOG.iter().find(|p| p.id == id)
}
