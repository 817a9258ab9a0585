//! Preferred-mirror ordering

use url::Url;

/// Whether `candidate` lives at or below `base`.
///
/// Scheme, host and port must match; the candidate path must start with the
/// base path up to and including its last `/`.
pub fn is_base_of(base: &Url, candidate: &Url) -> bool {
    base.scheme() == candidate.scheme()
        && base.host_str() == candidate.host_str()
        && base.port_or_known_default() == candidate.port_or_known_default()
        && candidate.path().starts_with(directory_of(base.path()))
}

fn directory_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(end) => &path[..=end],
        None => "",
    }
}

/// Mirrors under `preferred` first, each group keeping its original order.
pub fn order_mirrors<'a>(mirrors: &'a [Url], preferred: Option<&Url>) -> Vec<&'a Url> {
    let Some(preferred) = preferred else {
        return mirrors.iter().collect();
    };

    let (mut ordered, rest): (Vec<&Url>, Vec<&Url>) =
        mirrors.iter().partition(|mirror| is_base_of(preferred, mirror));
    ordered.extend(rest);
    ordered
}
