use std::sync::LazyLock;

use regex::Regex;

/// Pages with fewer characters than this (after trimming) are not worth a model call
pub const MIN_PAGE_CHARS: usize = 50;

/// OCR page boundary, e.g. `=== Page 3 ===` or `--- Page 3 ---`
static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*(?:={3,}|-{3,})[ \t]*Page[ \t]+(\d+)[ \t]*(?:={3,}|-{3,})[ \t]*$")
        .expect("page marker pattern is valid")
});

/// One page of extracted document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

impl PageText {
    pub fn is_substantial(&self) -> bool {
        self.text.trim().chars().count() >= MIN_PAGE_CHARS
    }
}

/// Split OCR output into pages using its page markers.
///
/// Text before the first marker is dropped. Text without any marker is one page.
/// Pages are numbered from 1, so a `Page 0` marker only ends the previous page.
pub fn split_pages(text: &str) -> Vec<PageText> {
    let markers: Vec<(usize, usize, u32)> = PAGE_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps[1].parse().ok()?;
            Some((whole.start(), whole.end(), number))
        })
        .collect();

    if markers.is_empty() {
        return vec![PageText {
            number: 1,
            text: text.trim().to_string(),
        }];
    }

    markers
        .iter()
        .enumerate()
        .filter(|(_, marker)| marker.2 >= 1)
        .map(|(i, &(_, body_start, number))| {
            let body_end = markers.get(i + 1).map_or(text.len(), |next| next.0);
            PageText {
                number,
                text: text[body_start..body_end].trim().to_string(),
            }
        })
        .collect()
}
