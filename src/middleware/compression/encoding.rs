//! `Accept-Encoding` parsing and algorithm selection.
//!
//! Entries are split on commas, each token optionally carrying a q-value
//! matching `[01](\.\d{1,3})?`, scaled to an integer 0–1000. Unknown or
//! disabled algorithms are dropped rather than rejected; a malformed
//! q-value drops its entry. Selection takes the highest quality above zero,
//! breaking ties in favor of the later entry (last-max-wins), and falls back
//! to `identity` when nothing qualifies.

use http::header::ACCEPT_ENCODING;
use http::HeaderMap;

/// A supported content coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `gzip`
    Gzip,
    /// `deflate` (zlib framing)
    Deflate,
    /// `br` (Brotli)
    Brotli,
    /// `zstd` (Zstandard)
    Zstd,
    /// `identity` — no transformation
    Identity,
}

impl Encoding {
    /// The exact header token for this coding.
    pub fn token(self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
            Encoding::Brotli => "br",
            Encoding::Zstd => "zstd",
            Encoding::Identity => "identity",
        }
    }

    /// Parse a header token against the enabled codings.
    ///
    /// Returns `None` for unknown or disabled tokens; those are dropped by
    /// the caller, never treated as parse errors.
    pub(crate) fn parse(token: &str, accepted: AcceptedEncodings) -> Option<Encoding> {
        match token {
            "gzip" if accepted.gzip => Some(Encoding::Gzip),
            "deflate" if accepted.deflate => Some(Encoding::Deflate),
            "br" if accepted.brotli => Some(Encoding::Brotli),
            "zstd" if accepted.zstd => Some(Encoding::Zstd),
            "identity" => Some(Encoding::Identity),
            _ => None,
        }
    }
}

/// Which codings a layer is configured to handle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AcceptedEncodings {
    pub(crate) gzip: bool,
    pub(crate) deflate: bool,
    pub(crate) brotli: bool,
    pub(crate) zstd: bool,
}

impl Default for AcceptedEncodings {
    fn default() -> Self {
        Self {
            gzip: true,
            deflate: true,
            brotli: true,
            zstd: true,
        }
    }
}

impl AcceptedEncodings {
    /// The enabled tokens, for the `Accept-Encoding` header of a `415`.
    pub(crate) fn tokens(self) -> Vec<&'static str> {
        let mut tokens = Vec::new();
        if self.gzip {
            tokens.push(Encoding::Gzip.token());
        }
        if self.deflate {
            tokens.push(Encoding::Deflate.token());
        }
        if self.brotli {
            tokens.push(Encoding::Brotli.token());
        }
        if self.zstd {
            tokens.push(Encoding::Zstd.token());
        }
        tokens
    }
}

/// Parse every `Accept-Encoding` header into (coding, quality) pairs with
/// quality scaled to 0–1000.
pub(crate) fn parse_accept_encoding(
    headers: &HeaderMap,
    accepted: AcceptedEncodings,
) -> Vec<(Encoding, u16)> {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|entry| {
            let mut parts = entry.trim().splitn(2, ';');
            let token = parts.next()?.trim();
            let quality = match parts.next() {
                Some(param) => parse_quality(param)?,
                None => 1000,
            };
            let encoding = Encoding::parse(token, accepted)?;
            Some((encoding, quality))
        })
        .collect()
}

/// Parse a `q=` parameter against `[01](\.\d{1,3})?`, scaled to 0–1000.
fn parse_quality(param: &str) -> Option<u16> {
    let param = param.trim();
    let value = param
        .strip_prefix("q=")
        .or_else(|| param.strip_prefix("Q="))?;

    let mut chars = value.chars();
    let integer: u16 = match chars.next()? {
        '0' => 0,
        '1' => 1000,
        _ => return None,
    };
    let rest = chars.as_str();
    if rest.is_empty() {
        return Some(integer);
    }

    let fraction = rest.strip_prefix('.')?;
    if fraction.is_empty() || fraction.len() > 3 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut scaled: u16 = 0;
    for digit in fraction.bytes() {
        scaled = scaled * 10 + u16::from(digit - b'0');
    }
    // Pad "0.5" to 500, "0.05" to 50.
    for _ in fraction.len()..3 {
        scaled *= 10;
    }

    let quality = integer + scaled;
    if quality > 1000 {
        // "1." followed by anything but zeros is out of range.
        None
    } else {
        Some(quality)
    }
}

/// Select the coding to compress with, or `None` for identity.
///
/// Entries with quality zero are excluded; equal qualities resolve to the
/// entry declared later. The last-max-wins tie-break is kept deliberately
/// for compatibility with peers that depend on it.
pub(crate) fn preferred_encoding(
    headers: &HeaderMap,
    accepted: AcceptedEncodings,
) -> Option<Encoding> {
    parse_accept_encoding(headers, accepted)
        .into_iter()
        .filter(|(_, quality)| *quality > 0)
        .fold(None, |best, (encoding, quality)| match best {
            Some((_, best_quality)) if best_quality > quality => best,
            _ => Some((encoding, quality)),
        })
        .map(|(encoding, _)| encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(ACCEPT_ENCODING, HeaderValue::from_static(value));
        map
    }

    fn preferred(value: &'static str) -> Option<Encoding> {
        preferred_encoding(&headers(value), AcceptedEncodings::default())
    }

    #[test]
    fn parses_quality_values() {
        assert_eq!(parse_quality("q=1"), Some(1000));
        assert_eq!(parse_quality("q=1.0"), Some(1000));
        assert_eq!(parse_quality("q=1.000"), Some(1000));
        assert_eq!(parse_quality("q=0"), Some(0));
        assert_eq!(parse_quality("q=0.5"), Some(500));
        assert_eq!(parse_quality("q=0.05"), Some(50));
        assert_eq!(parse_quality("q=0.005"), Some(5));
        assert_eq!(parse_quality(" q=0.8 "), Some(800));
    }

    #[test]
    fn rejects_malformed_quality_values() {
        assert_eq!(parse_quality("q=1.1"), None);
        assert_eq!(parse_quality("q=2"), None);
        assert_eq!(parse_quality("q=0.1234"), None);
        assert_eq!(parse_quality("q=.5"), None);
        assert_eq!(parse_quality("q=0."), None);
        assert_eq!(parse_quality("q=abc"), None);
        assert_eq!(parse_quality("level=1"), None);
    }

    #[test]
    fn picks_highest_quality() {
        assert_eq!(preferred("gzip;q=0.5, br;q=0.9"), Some(Encoding::Brotli));
        assert_eq!(preferred("gzip, br;q=0.9"), Some(Encoding::Gzip));
    }

    #[test]
    fn equal_qualities_resolve_to_the_later_entry() {
        assert_eq!(preferred("gzip, br"), Some(Encoding::Brotli));
        assert_eq!(preferred("br, gzip"), Some(Encoding::Gzip));
        assert_eq!(preferred("gzip;q=0.8, zstd;q=0.8"), Some(Encoding::Zstd));
    }

    #[test]
    fn zero_quality_entries_are_excluded() {
        assert_eq!(preferred("gzip;q=0"), None);
        assert_eq!(preferred("gzip;q=0, br;q=0.1"), Some(Encoding::Brotli));
    }

    #[test]
    fn unknown_tokens_are_dropped_not_errors() {
        assert_eq!(preferred("frobnicate, gzip"), Some(Encoding::Gzip));
        assert_eq!(preferred("frobnicate"), None);
    }

    #[test]
    fn malformed_quality_drops_only_its_entry() {
        assert_eq!(preferred("br;q=nope, gzip;q=0.5"), Some(Encoding::Gzip));
    }

    #[test]
    fn selection_is_idempotent() {
        let map = headers("gzip;q=0.8, br;q=0.8, deflate;q=0.1");
        let first = preferred_encoding(&map, AcceptedEncodings::default());
        let second = preferred_encoding(&map, AcceptedEncodings::default());
        assert_eq!(first, second);
        assert_eq!(first, Some(Encoding::Brotli));
    }

    #[test]
    fn disabled_codings_are_not_selected() {
        let accepted = AcceptedEncodings {
            brotli: false,
            ..AcceptedEncodings::default()
        };
        let map = headers("br, gzip;q=0.5");
        assert_eq!(preferred_encoding(&map, accepted), Some(Encoding::Gzip));
    }

    #[test]
    fn multiple_headers_are_combined() {
        let mut map = HeaderMap::new();
        map.append(ACCEPT_ENCODING, HeaderValue::from_static("gzip;q=0.5"));
        map.append(ACCEPT_ENCODING, HeaderValue::from_static("zstd;q=0.7"));
        assert_eq!(
            preferred_encoding(&map, AcceptedEncodings::default()),
            Some(Encoding::Zstd)
        );
    }
}
