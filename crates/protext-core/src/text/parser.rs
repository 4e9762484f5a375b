//! Parsing the text form back into field entries.
//!
//! Parsing happens in two steps. [`split_entries`] groups lines into
//! top-level entries, keeping a nested block together with its header as
//! one multi-line entry. [`FieldEntry::from_str`] then splits an entry into
//! its field number, wire type, specifier and raw value.
//!
//! Nested blocks stay opaque here: their body is only parsed when the
//! encoder gets to them.

use super::{TypeSpecifier, VALUE_SEPARATOR};
use crate::decode::wire::{WireType, MAX_VALID_NUMBER};
use crate::error::{Error, Result};
use std::str::FromStr;

/// One parsed text entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    /// Protobuf field number
    pub number: u32,
    /// Wire type from the header
    pub wire_type: WireType,
    /// Optional interpretation suffix
    pub specifier: Option<TypeSpecifier>,
    /// Everything after `::`, trimmed. For nested entries this is the whole
    /// `{ ... }` block.
    pub value: String,
}

impl FieldEntry {
    /// Returns the text between the outer braces of a nested block value.
    pub fn nested_body(&self) -> Option<&str> {
        self.value.strip_prefix('{')?.strip_suffix('}')
    }
}

impl FromStr for FieldEntry {
    type Err = Error;

    fn from_str(entry: &str) -> Result<Self> {
        let (head, value) = entry
            .split_once(VALUE_SEPARATOR)
            .ok_or_else(|| Error::missing_separator(entry))?;
        let (number, kind) = head
            .split_once(':')
            .ok_or_else(|| Error::missing_separator(entry))?;

        let number: u64 = number
            .trim()
            .parse()
            .map_err(|_| Error::invalid_format(entry, "field number is not a decimal integer"))?;
        if number == 0 || number > u64::from(MAX_VALID_NUMBER) {
            return Err(Error::InvalidFieldNumber {
                number,
                max: MAX_VALID_NUMBER,
            });
        }

        let mut kind = kind.trim().chars();
        let wire_digit = kind.next().ok_or_else(|| Error::missing_separator(entry))?;
        let wire_type = wire_digit
            .to_digit(10)
            .ok_or_else(|| Error::invalid_format(entry, "wire type is not a digit"))
            .and_then(|digit| WireType::try_from(u64::from(digit)))?;

        let specifier = kind.next().map(TypeSpecifier::try_from).transpose()?;
        if kind.next().is_some() {
            return Err(Error::invalid_format(
                entry,
                "unexpected characters after the type specifier",
            ));
        }
        if let Some(spec) = specifier {
            if spec.wire_type() != wire_type {
                return Err(Error::invalid_format(
                    entry,
                    format!("type specifier {} cannot follow wire type {}", spec, wire_type),
                ));
            }
        }

        Ok(Self {
            // Range checked above
            number: number as u32,
            wire_type,
            specifier,
            value: value.trim().to_string(),
        })
    }
}

/// Groups the lines of `text` into top-level entries.
///
/// A line ending in `{` opens a nested block and a line starting with `}`
/// closes one; everything from the opening line to the matching close is a
/// single entry. Lines are trimmed, and blank lines outside blocks are
/// skipped. Unbalanced braces fail the whole call.
pub fn split_entries(text: &str) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut depth = 0usize;

    for line in text.lines().map(str::trim) {
        if depth == 0 {
            if line.is_empty() {
                continue;
            }
            if line.starts_with('}') {
                return Err(Error::UnbalancedBraces);
            }
            if line.ends_with('{') {
                depth = 1;
                block.push(line);
            } else {
                entries.push(line.to_string());
            }
            continue;
        }

        block.push(line);
        if line.starts_with('}') {
            depth -= 1;
            if depth == 0 {
                entries.push(block.join("\n"));
                block.clear();
            }
        } else if line.ends_with('{') {
            depth += 1;
        }
    }

    if depth != 0 {
        return Err(Error::UnbalancedBraces);
    }
    Ok(entries)
}

/// Parses text into field entries, in order.
///
/// Empty text yields no entries.
pub fn parse_entries(text: &str) -> Result<Vec<FieldEntry>> {
    split_entries(text)?
        .iter()
        .map(|entry| entry.parse())
        .collect()
}
