//! Domain ID generation
//!
//! Record IDs use the format: `{6-char-hex}-{type}-{slug}`
//! Example: `019430-idea-neon-city-playlist`

/// Generate a domain ID from type and title
pub fn generate_id(domain_type: &str, title: &str) -> String {
    let uuid = uuid::Uuid::now_v7();
    let hex_prefix = &uuid.to_string()[..6];
    let slug = slugify(title);
    format!("{}-{}-{}", hex_prefix, domain_type, slug)
}

/// Generate an opaque continuation/thread id for a workflow run
pub fn new_thread_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Slugify a title for use in IDs
fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        // Strip apostrophes entirely, replace other non-alphanumeric with hyphens
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(50)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id() {
        let id = generate_id("idea", "Neon City Playlist");
        assert!(id.len() > 10);
        assert!(id.contains("-idea-"));
        assert!(id.contains("neon-city-playlist"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("it's working"), "its-working");
        assert_eq!(slugify("CamelCase"), "camelcase");
    }

    #[test]
    fn test_thread_ids_are_unique() {
        assert_ne!(new_thread_id(), new_thread_id());
    }
}
