use std::collections::HashSet;

use super::{unsupported, Matcher, Predicate};
use crate::block::Block;
use crate::column::dictionary::Code;
use crate::column::{ColumnData, DictColumn, Dictionary, StringColumn};
use crate::errors::Result;
use crate::store::Store;

/// Row matches if its string equals one of the requested values. A requested
/// null matches stored nulls; on plain string columns, where nulls are stored
/// as the empty string, it matches `""`.
#[derive(Debug, Clone)]
pub struct StringIn {
    column: String,
    values: Vec<Option<String>>,
}

impl StringIn {
    pub fn new<S: Into<String>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            column: column.into(),
            values: values.into_iter().map(|v| Some(v.into())).collect(),
        }
    }

    /// Like `new`, but the requested values may include null.
    pub fn nullable(
        column: impl Into<String>,
        values: impl IntoIterator<Item = Option<String>>,
    ) -> Self {
        Self {
            column: column.into(),
            values: values.into_iter().collect(),
        }
    }

    fn codes_in(&self, dictionary: &Dictionary) -> Vec<u32> {
        self.values
            .iter()
            .filter_map(|v| dictionary.code_of(v.as_deref()))
            .collect()
    }
}

struct PlainStringIn<'s> {
    strings: &'s StringColumn,
    set: HashSet<String>,
}

impl Matcher for PlainStringIn<'_> {
    fn check_block(&self, _block: &Block) -> bool {
        true
    }

    fn check_value(&self, position: usize) -> bool {
        self.set.contains(self.strings.str_at(position))
    }
}

impl Predicate for StringIn {
    fn prepare<'s>(&self, store: &'s Store) -> Result<Box<dyn Matcher + 's>> {
        let (index, column) = store.resolve(&self.column)?;

        match column.data() {
            ColumnData::String(strings) => Ok(Box::new(PlainStringIn {
                strings,
                set: self
                    .values
                    .iter()
                    .map(|v| v.clone().unwrap_or_default())
                    .collect(),
            })),
            ColumnData::DictByte(c) => Ok(code_matcher(index, c, self.codes_in(c.dictionary()))),
            ColumnData::DictShort(c) => Ok(code_matcher(index, c, self.codes_in(c.dictionary()))),
            ColumnData::DictInt(c) => Ok(code_matcher(index, c, self.codes_in(c.dictionary()))),
            _ => Err(unsupported(column, "string equality")),
        }
    }
}

/// Case-insensitive substring match. Patterns made only of ASCII compare
/// bytes with ASCII case folding and can skip blocks by byte presence;
/// anything else lowercases both sides and scans every row.
///
/// On dictionary columns the pattern is tested once per dictionary entry and
/// the query reduces to code membership. A null entry reads as `""`, so only
/// the empty pattern matches it.
#[derive(Debug, Clone)]
pub struct StringLike {
    column: String,
    pattern: Pattern,
}

#[derive(Debug, Clone)]
enum Pattern {
    Ascii(Vec<u8>),
    Unicode(String),
}

impl Pattern {
    fn matches(&self, text: &str) -> bool {
        match self {
            Pattern::Ascii(needle) => contains_ignore_ascii_case(text.as_bytes(), needle),
            Pattern::Unicode(needle) => text.to_lowercase().contains(needle.as_str()),
        }
    }
}

impl StringLike {
    pub fn new(column: impl Into<String>, pattern: &str) -> Self {
        let pattern = if pattern.is_ascii() {
            Pattern::Ascii(pattern.to_ascii_lowercase().into_bytes())
        } else {
            Pattern::Unicode(pattern.to_lowercase())
        };
        Self {
            column: column.into(),
            pattern,
        }
    }

    fn codes_in(&self, dictionary: &Dictionary) -> Vec<u32> {
        dictionary
            .iter()
            .filter(|(_, value)| self.pattern.matches(value.unwrap_or("")))
            .map(|(code, _)| code)
            .collect()
    }
}

pub(crate) fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

struct AsciiLike<'s> {
    column: usize,
    strings: &'s StringColumn,
    needle: Vec<u8>,
}

impl Matcher for AsciiLike<'_> {
    fn check_block(&self, block: &Block) -> bool {
        block.stats(self.column).admits_ascii_pattern(&self.needle)
    }

    #[inline]
    fn check_value(&self, position: usize) -> bool {
        contains_ignore_ascii_case(self.strings.bytes_at(position), &self.needle)
    }
}

struct UnicodeLike<'s> {
    strings: &'s StringColumn,
    needle: String,
}

impl Matcher for UnicodeLike<'_> {
    fn check_block(&self, _block: &Block) -> bool {
        true
    }

    fn check_value(&self, position: usize) -> bool {
        self.strings
            .str_at(position)
            .to_lowercase()
            .contains(self.needle.as_str())
    }
}

impl Predicate for StringLike {
    fn prepare<'s>(&self, store: &'s Store) -> Result<Box<dyn Matcher + 's>> {
        let (index, column) = store.resolve(&self.column)?;

        match column.data() {
            ColumnData::String(strings) => match &self.pattern {
                Pattern::Ascii(needle) => Ok(Box::new(AsciiLike {
                    column: index,
                    strings,
                    needle: needle.clone(),
                })),
                Pattern::Unicode(needle) => Ok(Box::new(UnicodeLike {
                    strings,
                    needle: needle.clone(),
                })),
            },
            ColumnData::DictByte(c) => Ok(code_matcher(index, c, self.codes_in(c.dictionary()))),
            ColumnData::DictShort(c) => Ok(code_matcher(index, c, self.codes_in(c.dictionary()))),
            ColumnData::DictInt(c) => Ok(code_matcher(index, c, self.codes_in(c.dictionary()))),
            _ => Err(unsupported(column, "a substring match")),
        }
    }
}

/// Membership over dictionary codes. Block statistics on dictionary columns
/// track codes, so the sorted code list doubles as the skip gate.
struct CodeIn<'s, C> {
    column: usize,
    codes: &'s [C],
    present: Vec<bool>,
    gate: Vec<i64>,
}

impl<C: Code> Matcher for CodeIn<'_, C> {
    fn check_block(&self, block: &Block) -> bool {
        block.stats(self.column).admits_any(&self.gate)
    }

    #[inline]
    fn check_value(&self, position: usize) -> bool {
        let code = self.codes[position].code() as usize;
        self.present.get(code).copied().unwrap_or(false)
    }
}

fn code_matcher<'s, C: Code>(
    column: usize,
    data: &'s DictColumn<C>,
    mut codes: Vec<u32>,
) -> Box<dyn Matcher + 's> {
    codes.sort_unstable();
    codes.dedup();

    let mut present = vec![false; data.dictionary().len()];
    for code in &codes {
        present[*code as usize] = true;
    }

    Box::new(CodeIn {
        column,
        codes: data.codes(),
        present,
        gate: codes.into_iter().map(i64::from).collect(),
    })
}
