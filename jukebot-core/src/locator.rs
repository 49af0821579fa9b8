//! Inspection of track locators (YouTube style URLs).
//!
//! Everything here is pure string work; no lookups happen in this module.

use url::Url;

/// Prefix YouTube uses for auto-generated mix list ids
const MIX_PREFIX: &str = "RD";

const VIDEO_ID_LEN: usize = 11;

/// What a locator points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum LocatorKind {
    #[strum(serialize = "video")]
    Video,
    #[strum(serialize = "playlist")]
    Playlist,
    #[strum(serialize = "none")]
    None,
}

fn parse(locator: &str) -> Option<Url> {
    let url = Url::parse(locator.trim()).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

fn is_youtube_host(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("youtube.com" | "www.youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtu.be")
    )
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

pub fn is_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN && id.chars().all(is_id_char)
}

fn is_list_id(id: &str) -> bool {
    id.len() > 2 && id.chars().all(is_id_char)
}

/// Video id of a single-track locator
pub fn video_id(locator: &str) -> Option<String> {
    let url = parse(locator)?;
    if !is_youtube_host(&url) {
        return None;
    }

    let candidate = if url.host_str() == Some("youtu.be") {
        url.path_segments()?.next().map(str::to_string)
    } else {
        let mut segments = url.path_segments()?;
        match segments.next() {
            Some("watch") => query_param(&url, "v"),
            Some("shorts") | Some("live") | Some("embed") => segments.next().map(str::to_string),
            _ => None,
        }
    };

    candidate.filter(|id| is_video_id(id))
}

/// Raw `list` parameter, whatever kind of list it names
fn list_param(locator: &str) -> Option<String> {
    let url = parse(locator)?;
    if !is_youtube_host(&url) {
        return None;
    }
    query_param(&url, "list").filter(|id| is_list_id(id))
}

/// Playlist id carried by a locator. Auto-generated mix lists are excluded.
pub fn playlist_id(locator: &str) -> Option<String> {
    list_param(locator).filter(|id| !id.starts_with(MIX_PREFIX))
}

/// Seed id for a mix marker (`list=RD...`).
///
/// The `v` parameter wins when present; otherwise the list id without its
/// prefix is used.
pub fn mix_seed(locator: &str) -> Option<String> {
    let list = list_param(locator)?;
    let rest = list.strip_prefix(MIX_PREFIX)?;

    video_id(locator).or_else(|| {
        let seed = rest.strip_prefix("MM").unwrap_or(rest);
        (!seed.is_empty()).then(|| seed.to_string())
    })
}

/// Classify a locator, checking for a single track first
pub fn classify(locator: &str) -> LocatorKind {
    if video_id(locator).is_some() {
        LocatorKind::Video
    } else if playlist_id(locator).is_some() {
        LocatorKind::Playlist
    } else {
        LocatorKind::None
    }
}

/// Canonical watch URL for a video id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Two locators point at the same video
pub fn same_video(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (video_id(a), video_id(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_url_is_video() {
        let loc = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(classify(loc), LocatorKind::Video);
        assert_eq!(video_id(loc).as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(playlist_id(loc), None);
        assert_eq!(mix_seed(loc), None);
    }

    #[test]
    fn short_links_are_videos() {
        assert_eq!(video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(
            video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video_id("https://music.youtube.com/watch?v=dQw4w9WgXcQ&feature=share").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn video_with_playlist() {
        let loc = "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI";
        assert_eq!(classify(loc), LocatorKind::Video);
        assert_eq!(playlist_id(loc).as_deref(), Some("PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI"));
        assert_eq!(mix_seed(loc), None);
    }

    #[test]
    fn video_with_mix() {
        let loc = "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=RDdQw4w9WgXcQ&start_radio=1";
        assert_eq!(classify(loc), LocatorKind::Video);
        assert_eq!(playlist_id(loc), None);
        assert_eq!(mix_seed(loc).as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn bare_mix_uses_list_suffix() {
        let loc = "https://www.youtube.com/playlist?list=RDMMdQw4w9WgXcQ";
        assert_eq!(classify(loc), LocatorKind::None);
        assert_eq!(mix_seed(loc).as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn playlist_url() {
        let loc = "https://www.youtube.com/playlist?list=PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI";
        assert_eq!(classify(loc), LocatorKind::Playlist);
    }

    #[test]
    fn free_text_and_foreign_hosts() {
        assert_eq!(classify("never gonna give you up"), LocatorKind::None);
        assert_eq!(classify("https://example.com/watch?v=dQw4w9WgXcQ"), LocatorKind::None);
        assert_eq!(classify("ftp://youtube.com/watch?v=dQw4w9WgXcQ"), LocatorKind::None);
        assert_eq!(classify("https://www.youtube.com/watch?v=short"), LocatorKind::None);
    }

    #[test]
    fn same_video_ignores_extra_params() {
        assert!(same_video(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123",
            "https://youtu.be/dQw4w9WgXcQ"
        ));
        assert!(!same_video(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=aaaaaaaaaaa"
        ));
    }
}
