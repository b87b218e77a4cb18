use zenoh::bytes::Encoding;

/// Content type to tag received bytes with. Matches `expected` only when
/// the peer encoded with the same codec; anything else keeps the peer's
/// encoding so the codec rejects it on decode.
pub(crate) fn content_type(expected: &str, received: Option<&Encoding>) -> String {
    match received {
        Some(encoding) if *encoding == Encoding::from(expected) => {
            expected.to_string()
        }
        Some(encoding) => encoding.to_string(),
        None => Encoding::default().to_string(),
    }
}
