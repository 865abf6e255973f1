use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Inline tags that may survive rich-text sanitization.
const ALLOWED_TAGS: [&str; 6] = ["span", "br", "strong", "em", "b", "i"];

/// Elements whose entire content is dropped, not just the tags.
const DROP_CONTENT_TAGS: [&str; 2] = ["script", "style"];

/// Schemes a stored URL may use.
const ALLOWED_SCHEMES: [&str; 4] = ["http", "https", "tel", "mailto"];

/// Hosts a stored URL may point at, matched exactly or as a parent domain.
const ALLOWED_DOMAINS: [&str; 8] = [
    "wa.me",
    "api.whatsapp.com",
    "google.com",
    "maps.google.com",
    "resultados.com.br",
    "arantes.com.br",
    "aranteslaboratorio.com.br",
    "192.168.1.17",
];

/// Longest URL accepted before sanitization gives up.
const MAX_URL_LENGTH: usize = 500;

static CLASS_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)class\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("class attribute pattern")
});

/// Sanitizes a rich-text fragment down to the allowed inline subset.
///
/// Keeps `span`, `br`, `strong`, `em`, `b`, `i` with at most a `class`
/// attribute; strips every other tag and attribute, drops script/style
/// content entirely, and removes comments. Empty input yields an empty
/// string; never fails.
pub fn sanitize_rich_text(input: &str) -> String {
    scrub(input, true)
}

/// Strips all markup, returning text only.
pub fn sanitize_plain_text(input: &str) -> String {
    scrub(input, false)
}

/// Validates a URL against the scheme and domain allow-lists.
///
/// Both checks are conjunctive: the scheme must be allowed AND the host
/// must equal or be a subdomain of an allow-listed domain. Host-less URLs
/// (`tel:`, `mailto:`) match no domain and are rejected like everything
/// else that fails a check: malformed input, unknown schemes, unknown
/// hosts, oversized input all yield an empty string. Allow-list, not
/// blocklist: unknown is rejected.
pub fn sanitize_url(url: &str) -> String {
    if url.is_empty() || url.len() > MAX_URL_LENGTH {
        return String::new();
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return String::new(),
    };

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return String::new();
    }

    let allowed = parsed.host_str().is_some_and(|host| {
        ALLOWED_DOMAINS
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
    });
    if !allowed {
        return String::new();
    }

    url.to_string()
}

/// Truncates caller-supplied text to `max_length` characters, then strips
/// all markup. Bounds memory and display regardless of input size.
pub fn validate_input(text: &str, max_length: usize) -> String {
    let truncated: String = text.chars().take(max_length).collect();
    sanitize_plain_text(&truncated)
}

/// Shared tag scanner behind the rich-text and plain-text entry points.
fn scrub(input: &str, keep_allowed: bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos..];

        // Comments are dropped whole, including any tags inside them.
        if after.starts_with("<!--") {
            match after.find("-->") {
                Some(end) => rest = &after[end + 3..],
                None => rest = "",
            }
            continue;
        }

        // A '<' that cannot start a tag is text, not markup.
        let plausible_tag = matches!(
            after[1..].chars().next(),
            Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!'
        );
        if !plausible_tag {
            out.push('<');
            rest = &after[1..];
            continue;
        }

        let Some(end) = after.find('>') else {
            // Unterminated tag: drop the remainder rather than let a partial
            // tag survive into the output.
            rest = "";
            break;
        };

        let raw = &after[1..end];
        let (closing, body) = match raw.strip_prefix('/') {
            Some(stripped) => (true, stripped),
            None => (false, raw),
        };
        let name: String = body
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        if !closing && DROP_CONTENT_TAGS.contains(&name.as_str()) {
            rest = skip_element(after, &name);
            continue;
        }

        if keep_allowed && ALLOWED_TAGS.contains(&name.as_str()) {
            if closing {
                if name != "br" {
                    out.push_str("</");
                    out.push_str(&name);
                    out.push('>');
                }
            } else {
                out.push_str(&rebuild_tag(&name, body));
            }
        }

        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Skips past `</name ...>`, dropping the element's content. Without a
/// closing tag the rest of the input is dropped.
fn skip_element<'a>(after: &'a str, name: &str) -> &'a str {
    let close_marker = format!("</{}", name);
    let lowered = after.to_ascii_lowercase();

    match lowered.find(&close_marker) {
        Some(start) => {
            let tail = &after[start..];
            match tail.find('>') {
                Some(end) => &tail[end + 1..],
                None => "",
            }
        }
        None => "",
    }
}

/// Re-emits an allowed opening tag, keeping only a filtered `class` value.
fn rebuild_tag(name: &str, body: &str) -> String {
    let class = CLASS_ATTR_RE.captures(body).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| filter_class_value(m.as_str()))
    });

    match class {
        Some(value) if !value.is_empty() => format!("<{} class=\"{}\">", name, value),
        _ => format!("<{}>", name),
    }
}

/// Restricts a class attribute to characters that cannot break out of the
/// attribute or smuggle handlers.
fn filter_class_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-' | ':'))
        .collect()
}
