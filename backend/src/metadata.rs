//! Metadata derived from article bodies: reading time and heading structure.
//!
//! Everything here is a pure function of its input text; no I/O, no state.

use std::collections::HashMap;

use billet_shared::Heading;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use scraper::{ElementRef, Html, Selector};

/// Default reading speed used for the estimate.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// Estimated reading time in minutes, never below 1.
///
/// The text is cleaned before counting: HTML tags, fenced and inline code,
/// and image syntax are dropped, links keep their visible text, and residual
/// markdown punctuation is removed. The remaining whitespace-separated
/// tokens are counted as words.
pub fn reading_time(text: &str, words_per_minute: u32) -> u32 {
    let words_per_minute = words_per_minute.max(1);

    let cleaned = strip_html_tags(text);
    let cleaned = strip_fenced_code(&cleaned);
    let cleaned = strip_inline_code(&cleaned);
    let cleaned = strip_images(&cleaned);
    let cleaned = collapse_links(&cleaned);
    let cleaned: String = cleaned
        .chars()
        .filter(|c| !matches!(c, '#' | '*' | '_' | '~' | '[' | ']'))
        .collect();

    let words = cleaned.split_whitespace().count() as u32;
    words.div_ceil(words_per_minute).max(1)
}

/// Render markdown to HTML, assigning a deterministic id to every heading
/// that does not already carry one. Ids are derived from the heading text
/// and de-duplicated with a numeric suffix so anchors never collide within
/// one render pass.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut events: Vec<Event> = Parser::new_ext(markdown, Options::empty()).collect();
    let mut used = HashMap::new();

    for index in 0..events.len() {
        let needs_id = matches!(
            &events[index],
            Event::Start(Tag::Heading { id: None, .. })
        );
        if !needs_id {
            continue;
        }
        let text = heading_text(&events[index..]);
        let slug = dedupe_slug(&slugify(&text), &mut used);
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[index] {
            *id = Some(CowStr::from(slug));
        }
    }

    let mut rendered = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut rendered, events.into_iter());
    rendered
}

/// Walk `h2`/`h3` elements of a rendered article body, in document order,
/// skipping headings nested inside a blockquote. Elements without an id get
/// one synthesized from their text.
pub fn extract_headings(html: &str) -> Vec<Heading> {
    let document = Html::parse_fragment(html);
    let selector = Selector::parse("h2, h3").expect("static selector");
    let mut used = HashMap::new();
    let mut headings = Vec::new();

    for element in document.select(&selector) {
        let quoted = element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| ancestor.value().name() == "blockquote");
        if quoted {
            continue;
        }

        let text = element.text().collect::<String>();
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let level = if element.value().name() == "h2" { 2 } else { 3 };
        let id = match element.value().attr("id") {
            Some(id) => id.to_string(),
            None => dedupe_slug(&slugify(&text), &mut used),
        };
        headings.push(Heading { id, text, level });
    }

    headings
}

/// Lowercased ASCII-alphanumeric form of `text`, with every other run of
/// characters collapsed into a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut previous_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            previous_dash = false;
        } else if !previous_dash && !slug.is_empty() {
            slug.push('-');
            previous_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn dedupe_slug(base: &str, used: &mut HashMap<String, usize>) -> String {
    let base = if base.is_empty() { "section" } else { base };
    let count = used.entry(base.to_string()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base.to_string()
    } else {
        format!("{base}-{count}")
    }
}

fn heading_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events.iter().skip(1) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::End(TagEnd::Heading(_)) => break,
            _ => {}
        }
    }
    text
}

fn strip_html_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn strip_fenced_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("```") {
        out.push_str(&rest[..start]);
        match rest[start + 3..].find("```") {
            Some(end) => rest = &rest[start + 3 + end + 3..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn strip_inline_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('`') {
        match rest[start + 1..].find('`') {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + 1 + end + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

fn strip_images(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("![") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(mid) = tail.find("](") {
            if let Some(end) = tail[mid + 2..].find(')') {
                rest = &tail[mid + 2 + end + 1..];
                continue;
            }
        }
        out.push('!');
        rest = &rest[start + 1..];
    }
    out.push_str(rest);
    out
}

/// Replace `[text](url)` with `text`, leaving stray brackets alone.
fn collapse_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let Some(offset) = rest[open..].find(']') else {
            break;
        };
        let close = open + offset;
        if let Some(after_paren) = rest[close + 1..].strip_prefix('(') {
            if let Some(end) = after_paren.find(')') {
                out.push_str(&rest[..open]);
                out.push_str(&rest[open + 1..close]);
                rest = &after_paren[end + 1..];
                continue;
            }
        }
        out.push_str(&rest[..=open]);
        rest = &rest[open + 1..];
    }
    out.push_str(rest);
    out
}
