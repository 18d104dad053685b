//! Tracking-parameter removal for URLs.

use url::Url;

/// Query parameters removed regardless of value.
pub const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
    "source",
    "campaign",
    "medium",
    "tracking",
    "affiliate",
    "clickId",
    "sessionId",
];

/// Any query parameter with this prefix is removed.
const UTM_PREFIX: &str = "utm_";

/// Strip tracking parameters and tracking fragments from `input`.
///
/// Never fails: input that does not parse as an absolute URL is returned
/// unchanged. Applying the function twice yields the same result as once.
pub fn clean_url(input: &str) -> String {
    let Ok(mut url) = Url::parse(input) else {
        return input.to_string();
    };

    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let kept: Vec<&(String, String)> =
            pairs.iter().filter(|(k, _)| !is_tracking_param(k)).collect();

        if kept.is_empty() {
            url.set_query(None);
        } else if kept.len() != pairs.len() {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    if url
        .fragment()
        .is_some_and(|f| f.contains(UTM_PREFIX) || f.contains("ref="))
    {
        url.set_fragment(None);
    }

    url.to_string()
}

/// `true` when `name` is a tracking query parameter.
pub fn is_tracking_param(name: &str) -> bool {
    name.starts_with(UTM_PREFIX) || TRACKING_PARAMS.contains(&name)
}
