use openfda_core::QueryWindow;
use url::form_urlencoded;

/// Build the count query for `drug` over the inclusive calendar-month `window`.
///
/// Produces e.g.
/// `…/drug/event.json?search=patient.drug.medicinalproduct:%22sildenafil+citrate%22+AND+receivedate:[20210201+TO+20210228]&count=receivedate`
pub fn query_url(base_url: &str, drug: &str, window: QueryWindow, count_field: &str) -> String {
    format!(
        "{}?search=patient.drug.medicinalproduct:%22{}%22+AND+{}:[{}+TO+{}]&count={}",
        base_url.trim_end_matches('?'),
        encode_term(drug),
        count_field,
        window.start_token(),
        window.end_token(),
        count_field,
    )
}

/// Form-encode a search term: spaces become `+`, everything outside
/// `[A-Za-z0-9*-._]` is percent-encoded.
fn encode_term(term: &str) -> String {
    form_urlencoded::byte_serialize(term.trim().as_bytes()).collect()
}
