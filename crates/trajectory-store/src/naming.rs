//! Episode naming from start URLs.

use url::Url;
use uuid::Uuid;

/// Known hosts that deserve a short, meaningful folder prefix.
const HOST_NAMES: &[(&str, &str)] = &[
    ("flights.google.com", "flights"),
    ("calendar.google.com", "calendar"),
    ("maps.google.com", "maps"),
    ("docs.google.com", "docs"),
    ("gmail.com", "gmail"),
    ("mail.google.com", "gmail"),
    ("scholar.google.com", "scholar"),
    ("drive.google.com", "drive"),
];

/// Extract a short site name from a URL for namespace naming.
pub fn site_name_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "website".to_string();
    };
    let Some(host) = parsed.host_str() else {
        return "website".to_string();
    };
    let host = host.to_ascii_lowercase();

    for (known, name) in HOST_NAMES {
        if host == *known {
            return (*name).to_string();
        }
    }

    let host = host.strip_prefix("www.").unwrap_or(&host);
    match host.split('.').next() {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => host.to_string(),
    }
}

/// `{site}_{uuid}` episode name.
pub fn episode_name(url: &str) -> String {
    format!("{}_{}", site_name_from_url(url), Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_hosts_map_to_short_names() {
        assert_eq!(site_name_from_url("https://calendar.google.com/r"), "calendar");
        assert_eq!(site_name_from_url("https://mail.google.com/mail"), "gmail");
    }

    #[test]
    fn unknown_hosts_use_first_label() {
        assert_eq!(site_name_from_url("https://www.wikipedia.org/wiki"), "wikipedia");
        assert_eq!(site_name_from_url("https://shop.example.com"), "shop");
    }

    #[test]
    fn garbage_urls_fall_back() {
        assert_eq!(site_name_from_url("not a url"), "website");
    }

    #[test]
    fn episode_names_are_unique() {
        let a = episode_name("https://maps.google.com");
        let b = episode_name("https://maps.google.com");
        assert!(a.starts_with("maps_"));
        assert_ne!(a, b);
    }
}
