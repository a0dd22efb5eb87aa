//! View-window JSON written by the map front end.
//!
//! Expected shape:
//! {"timestamp": 1700000000.5,
//!  "center": {"lat": -24.9, "lng": 151.8},
//!  "bounds": {"north": -24.0, "south": -25.8, "east": 152.8, "west": 150.8},
//!  "size_km": {"width": 200.0, "height": 200.0}}
//!
//! Other keys (the map's own `zoom`, for one) are ignored: the tile zoom is
//! chosen from the window's extent.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ViewCenter {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ViewBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ViewSizeKm {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ViewWindowFile {
    /// Unix seconds when the front end wrote the file
    #[serde(default)]
    pub timestamp: f64,
    pub center: ViewCenter,
    #[serde(default)]
    pub bounds: Option<ViewBounds>,
    /// Takes precedence over `bounds` when both are present.
    #[serde(default, alias = "view_size_km")]
    pub size_km: Option<ViewSizeKm>,
}

impl ViewWindowFile {
    pub fn validate(&self) -> eyre::Result<()> {
        if !(-90.0..=90.0).contains(&self.center.lat) || !(-180.0..=180.0).contains(&self.center.lng)
        {
            eyre::bail!("view center out of range");
        }
        if let Some(b) = self.bounds
            && !(b.north > b.south && b.east != b.west)
        {
            eyre::bail!("view bounds are degenerate (north must exceed south)");
        }
        if let Some(s) = self.size_km
            && !(s.width > 0.0 && s.height > 0.0)
        {
            eyre::bail!("view size_km must be positive");
        }
        if self.bounds.is_none() && self.size_km.is_none() {
            eyre::bail!("view window needs bounds or size_km");
        }
        Ok(())
    }

    /// True when the file was written more than `max_age_s` before `now_unix`.
    pub fn is_stale(&self, now_unix: f64, max_age_s: u64) -> bool {
        now_unix - self.timestamp > max_age_s as f64
    }
}

pub fn parse_view_window(s: &str) -> eyre::Result<ViewWindowFile> {
    let view: ViewWindowFile =
        serde_json::from_str(s).map_err(|e| eyre::eyre!("invalid view window JSON: {}", e))?;
    view.validate()?;
    Ok(view)
}

/// Load the view window if the file exists and is fresh.
///
/// Missing file and stale content both yield `Ok(None)`; unreadable or
/// malformed content is an error the caller may log and ignore.
pub fn load_view_window(
    path: &Path,
    max_age_s: u64,
    now_unix: f64,
) -> eyre::Result<Option<ViewWindowFile>> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => eyre::bail!("read view window {:?}: {}", path, e),
    };
    let view = parse_view_window(&text)?;
    if view.is_stale(now_unix, max_age_s) {
        return Ok(None);
    }
    Ok(Some(view))
}
