//! Walking and rendering decoded field trees.
//!
//! [`FieldVisitor`] is the extension point: implement it to consume a
//! decoded message in some other shape. [`TextWriter`] renders the text
//! grammar and [`StatsVisitor`] gathers counts.

use super::{Field, FieldValue, VALUE_SEPARATOR};
use std::fmt::{Result, Write as FmtWrite};

/// Callbacks invoked while walking a decoded message.
///
/// Every method defaults to doing nothing.
pub trait FieldVisitor {
    /// Called for every field that is not a nested message
    fn visit_scalar(&mut self, field: &Field, depth: usize) -> Result {
        let _ = (field, depth);
        Ok(())
    }

    /// Called before the fields of a nested message are visited
    fn enter_message(&mut self, field: &Field, depth: usize) -> Result {
        let _ = (field, depth);
        Ok(())
    }

    /// Called after the fields of a nested message were visited
    fn exit_message(&mut self, field: &Field, depth: usize) -> Result {
        let _ = (field, depth);
        Ok(())
    }
}

/// Walks `fields` in wire order, descending into nested messages.
pub fn walk<V: FieldVisitor + ?Sized>(fields: &[Field], visitor: &mut V) -> Result {
    walk_at(fields, 0, visitor)
}

fn walk_at<V: FieldVisitor + ?Sized>(fields: &[Field], depth: usize, visitor: &mut V) -> Result {
    for field in fields {
        match &field.value {
            FieldValue::Message(children) => {
                visitor.enter_message(field, depth)?;
                walk_at(children, depth + 1, visitor)?;
                visitor.exit_message(field, depth)?;
            }
            _ => visitor.visit_scalar(field, depth)?,
        }
    }
    Ok(())
}

/// Renders fields in the text grammar, one entry per line.
///
/// Lines are separated by `\n` with no trailing newline. Nested blocks are
/// indented by one `indent_str` per level.
pub struct TextWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    indent_str: &'a str,
    at_start: bool,
}

impl<'a, W: FmtWrite> TextWriter<'a, W> {
    /// Creates a writer appending to `writer`
    pub fn new(writer: &'a mut W, indent_str: &'a str) -> Self {
        Self {
            writer,
            indent_str,
            at_start: true,
        }
    }

    fn start_line(&mut self, depth: usize) -> Result {
        if !self.at_start {
            self.writer.write_char('\n')?;
        }
        self.at_start = false;
        for _ in 0..depth {
            self.writer.write_str(self.indent_str)?;
        }
        Ok(())
    }
}

impl<W: FmtWrite> FieldVisitor for TextWriter<'_, W> {
    fn visit_scalar(&mut self, field: &Field, depth: usize) -> Result {
        self.start_line(depth)?;
        write!(self.writer, "{}{}", field.header(), VALUE_SEPARATOR)?;
        write_value(&mut *self.writer, &field.value)
    }

    fn enter_message(&mut self, field: &Field, depth: usize) -> Result {
        self.start_line(depth)?;
        write!(self.writer, "{}{}{{", field.header(), VALUE_SEPARATOR)
    }

    fn exit_message(&mut self, _field: &Field, depth: usize) -> Result {
        self.start_line(depth)?;
        self.writer.write_char('}')
    }
}

fn write_value(w: &mut impl FmtWrite, value: &FieldValue) -> Result {
    match value {
        FieldValue::Varint(v) | FieldValue::Fixed64(v) => write!(w, "{}", v),
        FieldValue::Fixed32(v) => write!(w, "{}", v),
        // Debug formatting is the shortest representation that parses back
        // to the same bits
        FieldValue::Double(v) => write!(w, "{:?}", v),
        FieldValue::Float(v) => write!(w, "{:?}", v),
        FieldValue::String(s) => write!(w, "\"{}\"", s),
        FieldValue::Bytes(b) => w.write_str(&hex::encode(b)),
        FieldValue::Message(_) => Ok(()),
    }
}

/// Renders a single field, including any nested block, as text.
pub fn render_field(field: &Field, indent_str: &str) -> String {
    let mut output = String::new();
    let mut writer = TextWriter::new(&mut output, indent_str);
    // Writing into a String cannot fail
    let _ = walk(std::slice::from_ref(field), &mut writer);
    output
}

/// A visitor that collects statistics about a decoded message
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsVisitor {
    /// Varint fields
    pub varint_count: usize,
    /// I64 fields shown as integers
    pub fixed64_count: usize,
    /// I64 fields shown as doubles
    pub double_count: usize,
    /// I32 fields shown as integers
    pub fixed32_count: usize,
    /// I32 fields shown as floats
    pub float_count: usize,
    /// LEN fields shown as strings
    pub string_count: usize,
    /// LEN fields shown as hex
    pub bytes_count: usize,
    /// LEN fields shown as nested messages
    pub message_count: usize,
    /// Deepest nesting level seen (0 when there are no nested messages)
    pub max_depth: usize,
}

impl StatsVisitor {
    /// Total number of fields at every level
    pub fn total(&self) -> usize {
        self.varint_count
            + self.fixed64_count
            + self.double_count
            + self.fixed32_count
            + self.float_count
            + self.string_count
            + self.bytes_count
            + self.message_count
    }
}

impl FieldVisitor for StatsVisitor {
    fn visit_scalar(&mut self, field: &Field, _depth: usize) -> Result {
        match field.value {
            FieldValue::Varint(_) => self.varint_count += 1,
            FieldValue::Fixed64(_) => self.fixed64_count += 1,
            FieldValue::Double(_) => self.double_count += 1,
            FieldValue::Fixed32(_) => self.fixed32_count += 1,
            FieldValue::Float(_) => self.float_count += 1,
            FieldValue::String(_) => self.string_count += 1,
            FieldValue::Bytes(_) => self.bytes_count += 1,
            FieldValue::Message(_) => {}
        }
        Ok(())
    }

    fn enter_message(&mut self, _field: &Field, depth: usize) -> Result {
        self.message_count += 1;
        self.max_depth = self.max_depth.max(depth + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Field {
        Field::new(
            3,
            FieldValue::Message(vec![
                Field::new(1, FieldValue::Varint(-5)),
                Field::new(
                    2,
                    FieldValue::Message(vec![Field::new(1, FieldValue::Float(0.75))]),
                ),
                Field::new(4, FieldValue::Bytes(vec![0x00, 0xff, 0x10])),
            ]),
        )
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(render_field(&Field::new(1, FieldValue::Varint(42)), "  "), "1:0::42");
        assert_eq!(
            render_field(&Field::new(2, FieldValue::String("hi".into())), "  "),
            "2:2::\"hi\""
        );
        assert_eq!(render_field(&Field::new(5, FieldValue::Double(1e300)), "  "), "5:1D::1e300");
        assert_eq!(render_field(&Field::new(6, FieldValue::Float(1.0)), "  "), "6:5F::1.0");
        assert_eq!(render_field(&Field::new(7, FieldValue::Fixed32(-1)), "  "), "7:5::-1");
    }

    #[test]
    fn test_render_nested_block() {
        let expected = "3:2N::{\n  1:0::-5\n  2:2N::{\n    1:5F::0.75\n  }\n  4:2B::00ff10\n}";
        assert_eq!(render_field(&sample(), "  "), expected);
    }

    #[test]
    fn test_stats_visitor() {
        let mut stats = StatsVisitor::default();
        walk(&[sample(), Field::new(9, FieldValue::Varint(1))], &mut stats).unwrap();

        assert_eq!(stats.varint_count, 2);
        assert_eq!(stats.float_count, 1);
        assert_eq!(stats.bytes_count, 1);
        assert_eq!(stats.message_count, 2);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.total(), 6);
    }
}
