use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCDN_IMAGE: Regex =
        Regex::new(r"^https?://i\.scdn\.co/image/([A-Za-z0-9]+)/?$").unwrap();
    static ref SPOTIFYCDN_IMAGE: Regex =
        Regex::new(r"^https?://image-cdn-[a-z0-9-]+\.spotifycdn\.com/image/([A-Za-z0-9]+)/?$")
            .unwrap();
    static ref MOSAIC_IMAGE: Regex =
        Regex::new(r"^https?://mosaic\.scdn\.co/\d+/([A-Za-z0-9/]+?)/?$").unwrap();
}

/// Remove the query string (and fragment) from a URL.
pub fn strip_query(url: &str) -> &str {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    &url[..end]
}

/// Stable identifier of a cover image.
///
/// Spotify serves the same picture from several hosts and, for mosaics, at
/// several sizes; the id is the part of the path that names the picture.
/// Unrecognized URLs are their own id.
pub fn image_content_id(base_url: &str) -> String {
    if let Some(captures) = SCDN_IMAGE
        .captures(base_url)
        .or_else(|| SPOTIFYCDN_IMAGE.captures(base_url))
    {
        return captures[1].to_string();
    }
    if let Some(captures) = MOSAIC_IMAGE.captures(base_url) {
        return captures[1].replace('/', "");
    }
    base_url.to_string()
}
