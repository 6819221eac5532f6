//! TwiML document that forks a call's audio to the voice-agent provider.

/// Joins the provider's audio WebSocket base with a registered call id.
pub fn audio_stream_url(base: &str, call_id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), call_id)
}

/// Renders `<Response><Start><Stream url=…/></Start></Response>`.
pub fn stream_document(stream_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Start><Stream url="{}"/></Start></Response>"#,
        escape_attr(stream_url)
    )
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_stream_url() {
        assert_eq!(
            audio_stream_url("wss://api.re-tell.ai/audio-websocket", "abc"),
            "wss://api.re-tell.ai/audio-websocket/abc"
        );
        assert_eq!(audio_stream_url("wss://host/ws/", "abc"), "wss://host/ws/abc");
    }

    #[test]
    fn test_stream_document() {
        assert_eq!(
            stream_document("wss://host/ws/abc"),
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Start><Stream url="wss://host/ws/abc"/></Start></Response>"#
        );
    }

    #[test]
    fn test_stream_document_escapes_url() {
        let doc = stream_document(r#"wss://host/ws?a=1&b="2""#);
        assert!(doc.contains(r#"url="wss://host/ws?a=1&amp;b=&quot;2&quot;""#));
    }
}
