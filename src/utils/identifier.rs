use sha2::{Digest, Sha256};
use url::Url;

const ID_HEX_LEN: usize = 16;

/// Lowercased scheme and host, no fragment, query pairs sorted.
/// Unparsable input is only trimmed.
pub fn canonical_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.trim().to_string();
    };
    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        pairs.sort();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    url.to_string()
}

/// Deterministic listing identifier derived from the canonical URL.
pub fn listing_id(raw_url: &str) -> String {
    let digest = Sha256::digest(canonical_url(raw_url).as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ID_HEX_LEN);
    id
}
