//! Document-order tag scanning for HTML sources.

/// One start tag discovered in an HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    /// Lowercased tag name.
    pub name: String,
    /// Attributes in source order, names lowercased.
    pub attributes: Vec<(String, String)>,
}

impl RawTag {
    /// First value of the named attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Scan an HTML source into its start tags in document order.
///
/// Document order of start tags is depth-first traversal order, which is all
/// the classification stage needs since it never inspects ancestry. Comments,
/// doctype declarations and processing instructions are skipped without
/// producing tags, and the raw text content of `<script>` and `<style>`
/// elements is never scanned, so embedded `<` characters cannot produce
/// phantom tags.
pub fn scan_tags(source: &str) -> Vec<RawTag> {
    let bytes = source.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }

        let rest = &source[i..];
        if rest.starts_with("<!--") {
            i = match source[i + 4..].find("-->") {
                Some(end) => i + 4 + end + 3,
                None => bytes.len(),
            };
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") || rest.starts_with("</") {
            i = skip_past_gt(source, i);
            continue;
        }

        match parse_tag(source, i) {
            Some(parsed) => {
                i = parsed.end;
                let raw_text = !parsed.self_closing
                    && (parsed.tag.name == "script" || parsed.tag.name == "style");
                let name = parsed.tag.name.clone();
                tags.push(parsed.tag);
                if raw_text {
                    i = skip_raw_text(source, i, &name);
                }
            }
            None => i += 1,
        }
    }

    tags
}

struct ParsedTag {
    tag: RawTag,
    end: usize,
    self_closing: bool,
}

/// Parse one tag starting at the `<` at `start`.
fn parse_tag(source: &str, start: usize) -> Option<ParsedTag> {
    let bytes = source.as_bytes();
    let mut i = start + 1;

    if i >= bytes.len() || !bytes[i].is_ascii_alphabetic() {
        return None;
    }

    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    let name = source[name_start..i].to_ascii_lowercase();
    let mut attributes = Vec::new();

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'>' {
            i += 1;
            return Some(ParsedTag {
                tag: RawTag { name, attributes },
                end: i,
                self_closing: false,
            });
        }
        if bytes[i] == b'/' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'>' {
                return Some(ParsedTag {
                    tag: RawTag { name, attributes },
                    end: i + 2,
                    self_closing: true,
                });
            }
            i += 1;
            continue;
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        if i == attr_start {
            i += 1;
            continue;
        }
        let attr_name = source[attr_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                value = source[value_start..i].to_string();
                if i < bytes.len() {
                    i += 1;
                }
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = source[value_start..i].to_string();
            }
        }

        attributes.push((attr_name, value));
    }

    // Unterminated tag at end of input; keep what was parsed.
    Some(ParsedTag {
        tag: RawTag { name, attributes },
        end: source.len(),
        self_closing: false,
    })
}

/// Skip the raw text content of a `<script>`/`<style>` element.
fn skip_raw_text(source: &str, from: usize, name: &str) -> usize {
    let closer = format!("</{name}");
    let bytes = source.as_bytes();
    let mut i = from;

    while i < bytes.len() {
        if bytes[i] == b'<' {
            let end = (i + closer.len()).min(source.len());
            if source.is_char_boundary(end) && source[i..end].eq_ignore_ascii_case(&closer) {
                return skip_past_gt(source, i);
            }
        }
        i += 1;
    }
    source.len()
}

fn skip_past_gt(source: &str, from: usize) -> usize {
    match source[from..].find('>') {
        Some(offset) => from + offset + 1,
        None => source.len(),
    }
}
