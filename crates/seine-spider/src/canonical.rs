use std::collections::HashMap;
use url::form_urlencoded;
use url::Url;

/// Deterministic URL normalization. The canonical form is the identity
/// used for frontier deduplication and document keys, so the function
/// must be idempotent: `canonicalize(canonicalize(u)) == canonicalize(u)`.
///
/// Normalization: lowercase scheme and host (the parser handles both),
/// configured host aliasing (e.g. bare apex to `www.`), trailing-slash
/// stripping except on the root path, lexicographic query-parameter sort
/// with re-encoding, and fragment removal. Userinfo, port, and path
/// parameters pass through verbatim.
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    host_aliases: HashMap<String, String>,
}

impl Canonicalizer {
    pub fn new(host_aliases: HashMap<String, String>) -> Self {
        Self { host_aliases }
    }

    /// Returns the canonical form, or an empty string for anything that is
    /// not a parseable URL. Callers treat empty as "skip".
    pub fn canonicalize(&self, raw: &str) -> String {
        let Ok(mut url) = Url::parse(raw) else {
            return String::new();
        };

        if let Some(host) = url.host_str().map(str::to_ascii_lowercase) {
            if let Some(alias) = self.host_aliases.get(&host) {
                if url.set_host(Some(alias)).is_err() {
                    return String::new();
                }
            }
        }

        // Non-hierarchical URLs (mailto: and friends) have no path or
        // query to normalize; only the fragment goes.
        if url.cannot_be_a_base() {
            url.set_fragment(None);
            return url.to_string();
        }

        let path = url.path().to_string();
        if path.len() > 1 && path.ends_with('/') {
            let trimmed = path.trim_end_matches('/');
            url.set_path(if trimmed.is_empty() { "/" } else { trimmed });
        }

        if let Some(query) = url.query() {
            if query.is_empty() {
                url.set_query(None);
            } else {
                let mut pairs: Vec<(String, String)> = url
                    .query_pairs()
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect();
                pairs.sort_by(|a, b| a.0.cmp(&b.0));
                let encoded = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(&pairs)
                    .finish();
                url.set_query(Some(&encoded));
            }
        }

        url.set_fragment(None);
        url.to_string()
    }

    /// The domain used for allowed-domain membership: the lowercased host,
    /// with `:port` appended when the URL carries an explicit port.
    /// Empty string when the input has no parseable host.
    pub fn domain(raw: &str) -> String {
        let Ok(url) = Url::parse(raw) else {
            return String::new();
        };
        let Some(host) = url.host_str() else {
            return String::new();
        };
        match url.port() {
            Some(port) => format!("{}:{}", host.to_ascii_lowercase(), port),
            None => host.to_ascii_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plain() -> Canonicalizer {
        Canonicalizer::default()
    }

    #[test]
    fn test_case_and_fragment_normalization() {
        let canon = plain();
        assert_eq!(
            canon.canonicalize("HTTPS://Host.EX/a/?b=2&a=1#x"),
            "https://host.ex/a?a=1&b=2"
        );
        assert_eq!(
            canon.canonicalize("https://host.ex/a?a=1&b=2"),
            "https://host.ex/a?a=1&b=2"
        );
    }

    #[test]
    fn test_trailing_slash_stripped_except_root() {
        let canon = plain();
        assert_eq!(canon.canonicalize("https://host.ex/a/"), "https://host.ex/a");
        assert_eq!(canon.canonicalize("https://host.ex/"), "https://host.ex/");
        assert_eq!(canon.canonicalize("https://host.ex"), "https://host.ex/");
    }

    #[test]
    fn test_query_sorted_and_reencoded() {
        let canon = plain();
        assert_eq!(
            canon.canonicalize("https://host.ex/p?z=1&a=2&m=3"),
            "https://host.ex/p?a=2&m=3&z=1"
        );
        // An empty query disappears entirely.
        assert_eq!(canon.canonicalize("https://host.ex/p?"), "https://host.ex/p");
    }

    #[test]
    fn test_host_alias_applied() {
        let canon = Canonicalizer::new(HashMap::from([(
            "example.com".to_string(),
            "www.example.com".to_string(),
        )]));
        assert_eq!(
            canon.canonicalize("https://example.com/page"),
            "https://www.example.com/page"
        );
        // Already-aliased hosts pass through.
        assert_eq!(
            canon.canonicalize("https://www.example.com/page"),
            "https://www.example.com/page"
        );
    }

    #[test]
    fn test_port_and_userinfo_preserved() {
        let canon = plain();
        assert_eq!(
            canon.canonicalize("https://user:pw@host.ex:8443/a"),
            "https://user:pw@host.ex:8443/a"
        );
    }

    #[test]
    fn test_unparseable_returns_empty() {
        let canon = plain();
        assert_eq!(canon.canonicalize("not a url"), "");
        assert_eq!(canon.canonicalize(""), "");
        assert_eq!(canon.canonicalize("/relative/only"), "");
    }

    #[test]
    fn test_domain_extraction() {
        assert_eq!(Canonicalizer::domain("https://Host.EX/a"), "host.ex");
        assert_eq!(Canonicalizer::domain("http://127.0.0.1:8080/x"), "127.0.0.1:8080");
        assert_eq!(Canonicalizer::domain("garbage"), "");
    }

    proptest! {
        #[test]
        fn test_canonicalize_idempotent(
            host in "[a-z][a-z0-9]{0,10}\\.[a-z]{2,3}",
            segments in prop::collection::vec("[a-zA-Z0-9_-]{1,8}", 0..4),
            params in prop::collection::vec(("[a-z]{1,5}", "[a-zA-Z0-9]{0,8}"), 0..4),
            trailing_slash in any::<bool>(),
            fragment in prop::option::of("[a-z]{1,6}"),
        ) {
            let mut raw = format!("https://{}/{}", host, segments.join("/"));
            if trailing_slash {
                raw.push('/');
            }
            if !params.is_empty() {
                raw.push('?');
                let encoded: Vec<String> =
                    params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                raw.push_str(&encoded.join("&"));
            }
            if let Some(frag) = fragment {
                raw.push('#');
                raw.push_str(&frag);
            }

            let canon = plain();
            let once = canon.canonicalize(&raw);
            prop_assert!(!once.is_empty());
            let twice = canon.canonicalize(&once);
            prop_assert_eq!(&once, &twice);
            prop_assert!(!once.contains('#'));
        }
    }
}
