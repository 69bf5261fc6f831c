use pulldown_cmark::{Event, MetadataBlockKind, Options, Parser, Tag, TagEnd};
use sha2::{Digest, Sha256};

/// Hex SHA-256 of a note body, used to skip re-parsing unchanged files.
pub fn compute_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract raw tag strings from a note: the YAML frontmatter `tags:` field
/// plus inline `#tag` tokens in prose. Code blocks do not contribute tags.
///
/// The result is raw and may contain duplicates or mixed casing; the tag
/// index builder canonicalizes downstream.
pub fn extract_tags(content: &str) -> Vec<String> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);

    let mut tags = Vec::new();
    let mut in_frontmatter = false;
    let mut in_code = false;

    for event in Parser::new_ext(content, options) {
        match event {
            Event::Start(Tag::MetadataBlock(MetadataBlockKind::YamlStyle)) => {
                in_frontmatter = true;
            }
            Event::End(TagEnd::MetadataBlock(MetadataBlockKind::YamlStyle)) => {
                in_frontmatter = false;
            }
            Event::Start(Tag::CodeBlock(_)) => in_code = true,
            Event::End(TagEnd::CodeBlock) => in_code = false,
            Event::Text(text) if in_frontmatter => {
                frontmatter_tags(&text, &mut tags);
            }
            Event::Text(text) if !in_code => {
                inline_tags(&text, &mut tags);
            }
            _ => {}
        }
    }

    tags
}

/// `tags:` as a YAML sequence, or a single comma/space separated scalar.
fn frontmatter_tags(yaml: &str, tags: &mut Vec<String>) {
    let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(yaml) else {
        return;
    };
    match value.get("tags") {
        Some(serde_yaml::Value::Sequence(items)) => {
            tags.extend(
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(str::to_string),
            );
        }
        Some(serde_yaml::Value::String(scalar)) => {
            tags.extend(
                scalar
                    .split([',', ' '])
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string),
            );
        }
        _ => {}
    }
}

/// Scan prose for `#tag` tokens. A `#` opens a tag at the start of the text
/// or after whitespace; the token runs over alphanumerics, `-`, `_` and `/`,
/// and must contain at least one non-digit.
fn inline_tags(text: &str, tags: &mut Vec<String>) {
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        let Some(c) = rest.chars().next() else { break };
        if c == '#' && text[..i].chars().next_back().map_or(true, char::is_whitespace) {
            let body = &rest[1..];
            let end = body
                .find(|ch: char| !is_tag_char(ch))
                .unwrap_or(body.len());
            let token = &body[..end];
            if !token.is_empty() && token.chars().any(|ch| !ch.is_ascii_digit()) {
                tags.push(token.to_string());
            }
            i += 1 + end;
        } else {
            i += c.len_utf8();
        }
    }
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '/')
}
