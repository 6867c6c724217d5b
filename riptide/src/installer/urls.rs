//! Candidate URL construction for one manifest entry.
//!
//! Some mirrors serve assets at the plain joined URL, some require the
//! destination path to be percent-encoded, and some expose the file next to
//! the index rather than under it. Each entry therefore gets an ordered list
//! of candidate URLs; the fetch engine walks the list until one succeeds.

use url::Url;

/// Build the ordered candidate URLs for `dest` under `base`.
///
/// 1. `base` and `dest` joined verbatim.
/// 2. The joined URL re-interpreted as a directory, with the
///    percent-encoded `dest` appended.
/// 3. The parent directory of the joined URL's path, with the
///    percent-encoded `dest` appended.
///
/// Duplicates are removed while preserving order. Candidates 2 and 3 are
/// only produced when the joined URL parses as an absolute URL.
pub fn candidate_urls(base: &str, dest: &str) -> Vec<String> {
    let dest = dest.trim_start_matches('/');
    let primary = format!("{}/{}", base.trim_end_matches('/'), dest);

    let mut candidates = vec![primary.clone()];

    if let Ok(parsed) = Url::parse(&primary) {
        let encoded = encode_path(dest);
        let root = url_root(&parsed);
        let path = parsed.path();

        let as_directory = format!("{}{}/{}", root, path.trim_end_matches('/'), encoded);
        push_unique(&mut candidates, as_directory);

        let parent = match path.rfind('/') {
            Some(idx) => &path[..=idx],
            None => "/",
        };
        let sibling = format!("{}{}{}", root, parent, encoded);
        push_unique(&mut candidates, sibling);
    }

    candidates
}

/// Percent-encode each path segment of `dest`, preserving the separators.
fn encode_path(dest: &str) -> String {
    dest.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scheme and authority of a URL, without the path.
fn url_root(url: &Url) -> String {
    let mut root = format!("{}://", url.scheme());
    if let Some(host) = url.host_str() {
        root.push_str(host);
    }
    if let Some(port) = url.port() {
        root.push_str(&format!(":{}", port));
    }
    root
}

fn push_unique(candidates: &mut Vec<String>, candidate: String) {
    if !candidates.contains(&candidate) {
        candidates.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_dest_yields_three_candidates() {
        let urls = candidate_urls("https://cdn.example.com/game", "data/pak01.bin");
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/game/data/pak01.bin",
                "https://cdn.example.com/game/data/pak01.bin/data/pak01.bin",
                "https://cdn.example.com/game/data/data/pak01.bin",
            ]
        );
    }

    #[test]
    fn test_top_level_dest_sibling_collapses_into_primary() {
        let urls = candidate_urls("https://cdn.example.com/game", "pak01.bin");
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/game/pak01.bin",
                "https://cdn.example.com/game/pak01.bin/pak01.bin",
            ]
        );
    }

    #[test]
    fn test_dest_with_spaces_gets_encoded_fallbacks() {
        let urls = candidate_urls("https://cdn.example.com/game", "audio/voice pack.bin");
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/game/audio/voice pack.bin",
                "https://cdn.example.com/game/audio/voice%20pack.bin/audio/voice%20pack.bin",
                "https://cdn.example.com/game/audio/audio/voice%20pack.bin",
            ]
        );
    }

    #[test]
    fn test_base_trailing_slash_and_dest_leading_slash() {
        let urls = candidate_urls("https://cdn.example.com/game/", "/a.bin");
        assert_eq!(urls[0], "https://cdn.example.com/game/a.bin");
    }

    #[test]
    fn test_port_is_preserved() {
        let urls = candidate_urls("http://127.0.0.1:8080/pkg", "x y.bin");
        assert!(urls.iter().any(|u| u.starts_with("http://127.0.0.1:8080/")));
        assert!(urls.iter().any(|u| u.contains("x%20y.bin")));
    }

    #[test]
    fn test_unparseable_base_yields_single_candidate() {
        let urls = candidate_urls("not a url", "a.bin");
        assert_eq!(urls, vec!["not a url/a.bin"]);
    }
}
