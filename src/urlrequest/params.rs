//! Form encoding for query strings and POST bodies.

use url::form_urlencoded;

/// `k1=v1&k2=v2` in iteration order, `application/x-www-form-urlencoded`
/// with UTF-8 (space becomes `+`).
pub fn encode_params<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

/// Positional pairs from `[k0, v0, k1, v1, ...]`. Fewer than two elements
/// yield nothing; a trailing odd element is ignored.
pub fn pairs_to_params<S: AsRef<str>>(pairs: &[S]) -> Vec<(&str, &str)> {
    if pairs.len() < 2 {
        return Vec::new();
    }
    pairs
        .chunks_exact(2)
        .map(|kv| (kv[0].as_ref(), kv[1].as_ref()))
        .collect()
}

/// Append an encoded query to `url`, joining with `&` when it already has one.
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{query}")
}
