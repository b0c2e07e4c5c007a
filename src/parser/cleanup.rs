//! Deterministic text cleanup for extracted spans and table cells.

use lazy_static::lazy_static;
use regex::{Captures, Regex, RegexBuilder};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};

lazy_static! {
    static ref EMMC_VARIANT: Regex = Regex::new(r"(?i)\be\s*(2\s*)?[•∙*\-–—.]\s*MMC\b").unwrap();
    static ref DOWNLOAD_STAMP: Regex = Regex::new(r"(?im)Downloaded\s+by .*$").unwrap();
    static ref STANDARD_HEADER: Regex =
        Regex::new(r"(?i)JEDEC\s+Standard\s+No\.\s*\d+-[A-Z]\d+").unwrap();
    static ref PAGE_MARKER: Regex = Regex::new(r"(?im)^[ \t]*Page[ \t]+\d+[ \t]*$").unwrap();
    static ref HORIZONTAL_SPACE: Regex = Regex::new(r"[ \t]+").unwrap();
    static ref EXCESS_NEWLINES: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref EMPTY_BRACKETS: Regex = Regex::new(r"\(\s*\)|\[\s*\]|\(\s*\.\s*\)").unwrap();
}

const LIGATURES: &[(&str, &str)] = &[
    ("\u{FB00}", "ff"),
    ("\u{FB01}", "fi"),
    ("\u{FB02}", "fl"),
    ("\u{FB03}", "ffi"),
    ("\u{FB04}", "ffl"),
    ("\u{FB05}", "st"),
    ("\u{FB06}", "st"),
];

const SYMBOLS: &[(char, &str)] = &[
    ('\u{00A0}', " "),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{2212}', "-"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{00B5}', "u"),
    ('\u{03BC}', "u"),
    ('\u{00B1}', "+/-"),
    ('\u{00B0}', "deg"),
    ('\u{2264}', "<="),
    ('\u{2265}', ">="),
    ('\u{00D7}', "x"),
    ('\u{2022}', "*"),
    ('\u{2026}', "..."),
];

/// Which cleanup stages run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Normalize Unicode to NFC form
    pub normalize_unicode: bool,
    /// Expand ligatures (fi, fl, etc.)
    pub fix_ligatures: bool,
    /// Map typographic punctuation and symbols to ASCII
    pub normalize_symbols: bool,
    /// Unify glyph variants of the product name (e•MMC, e2•MMC)
    pub unify_product_name: bool,
    /// Strip download stamps, running standard headers and page markers
    pub strip_watermarks: bool,
    /// Collapse runs of spaces and blank lines
    pub normalize_whitespace: bool,
    /// Remove `()`, `[]` and `(.)` left behind by earlier stages
    pub remove_empty_brackets: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: true,
            normalize_symbols: true,
            unify_product_name: true,
            strip_watermarks: true,
            normalize_whitespace: true,
            remove_empty_brackets: true,
        }
    }
}

impl CleanupOptions {
    /// Only NFC normalization and whitespace collapsing.
    pub fn minimal() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: false,
            normalize_symbols: false,
            unify_product_name: false,
            strip_watermarks: false,
            normalize_whitespace: true,
            remove_empty_brackets: false,
        }
    }
}

/// Text cleanup pipeline.
#[derive(Debug, Clone)]
pub struct CleanupPipeline {
    options: CleanupOptions,
    extra_watermarks: Vec<Regex>,
}

impl Default for CleanupPipeline {
    fn default() -> Self {
        Self {
            options: CleanupOptions::default(),
            extra_watermarks: Vec::new(),
        }
    }
}

impl CleanupPipeline {
    /// Create a pipeline; `extra_watermarks` are case-insensitive patterns removed with the built-in ones.
    pub fn new(options: CleanupOptions, extra_watermarks: &[String]) -> Result<Self> {
        let extra_watermarks = extra_watermarks
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .multi_line(true)
                    .build()
                    .map_err(|e| Error::InvalidPattern(format!("{}: {}", pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            options,
            extra_watermarks,
        })
    }

    /// Run every enabled stage in order. An empty result means the text carried nothing.
    pub fn process(&self, text: &str) -> String {
        let mut result = if self.options.normalize_unicode {
            text.nfc().collect()
        } else {
            text.to_string()
        };

        if self.options.fix_ligatures {
            for (ligature, replacement) in LIGATURES {
                result = result.replace(ligature, replacement);
            }
        }

        // Before the symbol map, which turns the bullet into `*`
        if self.options.unify_product_name {
            result = unify_product_name(&result);
        }

        if self.options.normalize_symbols {
            result = map_symbols(&result);
        }

        if self.options.strip_watermarks {
            for re in [&*DOWNLOAD_STAMP, &*STANDARD_HEADER, &*PAGE_MARKER] {
                result = re.replace_all(&result, "").into_owned();
            }
        }
        for re in &self.extra_watermarks {
            result = re.replace_all(&result, "").into_owned();
        }

        if self.options.normalize_whitespace {
            result = HORIZONTAL_SPACE.replace_all(&result, " ").into_owned();
            result = EXCESS_NEWLINES.replace_all(&result, "\n\n").into_owned();
        }

        if self.options.remove_empty_brackets {
            result = EMPTY_BRACKETS.replace_all(&result, "").into_owned();
        }

        result.trim().to_string()
    }
}

/// `e•MMC` and its glyph variants become `eMMC`; `e2•MMC` becomes `e.MMC`.
fn unify_product_name(text: &str) -> String {
    EMMC_VARIANT
        .replace_all(text, |caps: &Captures| {
            if caps.get(1).is_some() {
                "e.MMC"
            } else {
                "eMMC"
            }
        })
        .replace('\u{2206}', "Delta")
}

fn map_symbols(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match SYMBOLS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}
