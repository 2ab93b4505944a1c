//! Word of the day: the record type and the Merriam-Webster scraper.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::bot::Error;
use crate::bot::WORD_URL;

/// Today's word as shown on the reference page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordRecord {
    word: String,
    attribute: String,
    pronunciation: String,
    definitions: Vec<String>,
}

impl WordRecord {
    /// Rejects a blank word, an empty definition list or a blank definition.
    /// A page that yields any of these is unavailable, not a valid record.
    pub fn new(
        word: impl Into<String>,
        attribute: impl Into<String>,
        pronunciation: impl Into<String>,
        definitions: Vec<String>,
    ) -> Result<Self, Error> {
        let word = word.into();
        if word.trim().is_empty() {
            return Err(Error::SourceUnavailable("word is empty".into()));
        }
        if definitions.is_empty() {
            return Err(Error::SourceUnavailable(format!("no definitions for '{word}'")));
        }
        if definitions.iter().any(|d| d.trim().is_empty()) {
            return Err(Error::SourceUnavailable(format!("blank definition for '{word}'")));
        }
        Ok(Self {
            word,
            attribute: attribute.into(),
            pronunciation: pronunciation.into(),
            definitions,
        })
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn pronunciation(&self) -> &str {
        &self.pronunciation
    }

    pub fn definitions(&self) -> &[String] {
        &self.definitions
    }
}

/// Anything that can produce today's word.
#[allow(async_fn_in_trait)]
pub trait WordSource {
    async fn fetch(&self) -> Result<WordRecord, Error>;
}

/// Scrapes the Merriam-Webster word-of-the-day page.
pub struct MerriamWebster {
    http: reqwest::Client,
    url: String,
}

impl MerriamWebster {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_url(http, WORD_URL)
    }

    pub fn with_url(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }
}

impl WordSource for MerriamWebster {
    async fn fetch(&self) -> Result<WordRecord, Error> {
        debug!("Fetching word of the day from {}", self.url);

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("HTTP error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SourceUnavailable(format!("{} returned {status}", self.url)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("Failed to read page: {e}")))?;

        let record = parse_word_page(&body)?;
        info!("📖 Word of the day: {} ({} definition(s))", record.word(), record.definitions().len());
        Ok(record)
    }
}

/// Opening tag whose `class` attribute carries `name` as a whole token.
fn class_tag(name: &str) -> Regex {
    Regex::new(&format!(r#"class="(?:[^"]*\s)?{}(?:\s[^"]*)?"[^>]*>"#, regex::escape(name)))
        .expect("class tag regex")
}

static WORD_HEADER: LazyLock<Regex> = LazyLock::new(|| class_tag("word-header"));
static WORD_ATTRIBUTES: LazyLock<Regex> = LazyLock::new(|| class_tag("word-attributes"));
static MAIN_ATTR: LazyLock<Regex> = LazyLock::new(|| class_tag("main-attr"));
static SYLLABLES: LazyLock<Regex> = LazyLock::new(|| class_tag("word-syllables"));
static DEFINITION_CONTAINER: LazyLock<Regex> =
    LazyLock::new(|| class_tag("wod-definition-container"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<h1\b[^>]*>(.*?)</h1>").expect("heading regex"));
static ELEMENT_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</(?:span|div|p)>").expect("element end regex"));
static DIV_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?div\b").expect("div boundary regex"));
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<p\b[^>]*>(.*?)</p>").expect("paragraph regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity regex")
});
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Extract a [`WordRecord`] from the word-of-the-day page.
///
/// Each lookup is confined to its own `div` block: the `h1` inside the word
/// header, the main attribute and syllables inside the attributes block, and
/// the paragraphs sitting directly in the definition container (paragraphs
/// inside nested `div`s are not definitions).
pub fn parse_word_page(html: &str) -> Result<WordRecord, Error> {
    let header = block(html, &WORD_HEADER, "word header")?;
    let word = HEADING
        .captures(header)
        .map(|c| text_of(&c[1]))
        .ok_or_else(|| Error::SourceUnavailable("no h1 in word header".into()))?;

    let attributes = block(html, &WORD_ATTRIBUTES, "word attributes")?;
    let attribute = element_text(attributes, &MAIN_ATTR, "main attribute")?;
    let pronunciation = element_text(attributes, &SYLLABLES, "syllables")?;

    let container = block(html, &DEFINITION_CONTAINER, "definition container")?;
    let definitions: Vec<String> = top_level(container)
        .into_iter()
        .flat_map(|segment| PARAGRAPH.captures_iter(segment))
        .map(|c| text_of(&c[1]))
        .filter(|d| !d.is_empty())
        .collect();

    WordRecord::new(word, attribute, pronunciation, definitions)
}

/// Contents of the `div` opened by the first tag matching `open`, up to its
/// balancing `</div>` (or the end of input if the page is truncated).
fn block<'a>(html: &'a str, open: &Regex, what: &str) -> Result<&'a str, Error> {
    let start = open
        .find(html)
        .map(|m| m.end())
        .ok_or_else(|| Error::SourceUnavailable(format!("{what} not found")))?;
    let rest = &html[start..];

    let mut depth = 0usize;
    for m in DIV_BOUNDARY.find_iter(rest) {
        if m.as_str().starts_with("</") {
            if depth == 0 {
                return Ok(&rest[..m.start()]);
            }
            depth -= 1;
        } else {
            depth += 1;
        }
    }
    Ok(rest)
}

/// Text of the first element inside `scope` whose opening tag matches `open`.
fn element_text(scope: &str, open: &Regex, what: &str) -> Result<String, Error> {
    let start = open
        .find(scope)
        .map(|m| m.end())
        .ok_or_else(|| Error::SourceUnavailable(format!("{what} not found")))?;
    let rest = &scope[start..];
    let end = ELEMENT_END.find(rest).map(|m| m.start()).unwrap_or(rest.len());
    Ok(text_of(&rest[..end]))
}

/// Slices of `body` that are not inside any nested `div`.
fn top_level(body: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut segment_start = 0;
    for m in DIV_BOUNDARY.find_iter(body) {
        if m.as_str().starts_with("</") {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                segment_start = m.end();
            }
        } else {
            if depth == 0 {
                segments.push(&body[segment_start..m.start()]);
            }
            depth += 1;
        }
    }
    if depth == 0 {
        segments.push(&body[segment_start..]);
    }
    segments
}

/// Visible text of an HTML fragment: tags dropped, entities decoded,
/// whitespace collapsed.
fn text_of(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, "");
    let decoded = decode_entities(&stripped);
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "mdash" => Some('—'),
                    "ndash" => Some('–'),
                    "lsquo" => Some('‘'),
                    "rsquo" => Some('’'),
                    "ldquo" => Some('“'),
                    "rdquo" => Some('”'),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
