//! ISO 10303-21 clear-text reader
//!
//! Reads the DATA section of a STEP physical file into a map of entity
//! instances. Handles:
//! - `#id=TYPE(args);` simple instances (complex instances are skipped)
//! - strings with `''` escapes plus `\X\`, `\X2\`, `\X4\` and `\S\` encodings
//! - integers, reals, enumerations, binaries, `$` and `*`
//! - references, nested lists and typed parameters like `IFCLABEL('x')`
//! - `/* ... */` comments anywhere outside strings

use super::super::EntityId;
use anyhow::{anyhow, bail, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static INSTANCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(\d+)\s*=\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

/// Magic token on the first line of every physical file
pub const STEP_MAGIC: &str = "ISO-10303-21";

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    /// `$`
    Null,
    /// `*`
    Derived,
    Integer(i64),
    Real(f64),
    Text(String),
    /// `.T.`, `.ELEMENT.` (dots stripped)
    Enum(String),
    Binary(String),
    Ref(EntityId),
    List(Vec<StepValue>),
    /// `IFCLENGTHMEASURE(2.5)`
    Typed(String, Box<StepValue>),
}

impl StepValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StepValue::Text(s) => Some(s),
            StepValue::Typed(_, inner) => inner.as_text(),
            _ => None,
        }
    }

    /// References held by this value, whether a single `#id` or a list of them
    pub fn refs(&self) -> Vec<EntityId> {
        match self {
            StepValue::Ref(id) => vec![*id],
            StepValue::List(items) => items.iter().flat_map(StepValue::refs).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepEntity {
    /// Upper-case entity name, e.g. `IFCWALL`
    pub type_name: String,
    pub args: Vec<StepValue>,
}

impl StepEntity {
    pub fn arg(&self, index: usize) -> Option<&StepValue> {
        self.args.get(index)
    }

    pub fn text_arg(&self, index: usize) -> Option<String> {
        self.arg(index).and_then(StepValue::as_text).map(str::to_string)
    }
}

/// Parse a whole physical file into its DATA section instances
pub fn parse_physical_file(text: &str) -> Result<HashMap<EntityId, StepEntity>> {
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if !text.starts_with(STEP_MAGIC) {
        bail!("Not a STEP physical file (missing {STEP_MAGIC} header)");
    }

    let mut entities = HashMap::new();
    let mut in_data = false;

    for statement in split_statements(text)? {
        let statement = statement.trim();
        let keyword = statement.to_ascii_uppercase();
        if keyword == "DATA" || keyword.starts_with("DATA(") || keyword.starts_with("DATA (") {
            in_data = true;
            continue;
        }
        if keyword == "ENDSEC" {
            in_data = false;
            continue;
        }
        if !in_data || statement.is_empty() {
            continue;
        }

        match parse_instance(statement)? {
            Some((id, entity)) => {
                entities.insert(id, entity);
            }
            None => tracing::debug!("skipping unsupported instance: {:.60}", statement),
        }
    }

    Ok(entities)
}

/// Split on top-level `;`, dropping comments and keeping string contents intact
fn split_statements(text: &str) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                current.push(c);
                loop {
                    match chars.next() {
                        Some('\'') if chars.peek() == Some(&'\'') => {
                            chars.next();
                            current.push_str("''");
                        }
                        Some('\'') => {
                            current.push('\'');
                            break;
                        }
                        Some(other) => current.push(other),
                        None => bail!("Unterminated string literal"),
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                loop {
                    match chars.next() {
                        Some('/') if prev == '*' => break,
                        Some(other) => prev = other,
                        None => bail!("Unterminated comment"),
                    }
                }
            }
            ';' => statements.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if !current.trim().is_empty() {
        statements.push(current);
    }
    Ok(statements)
}

/// `#id=TYPE(args)`; `None` for complex `#id=(A()B())` instances
fn parse_instance(statement: &str) -> Result<Option<(EntityId, StepEntity)>> {
    let Some(caps) = INSTANCE_REGEX.captures(statement) else {
        if statement.starts_with('#') {
            return Ok(None);
        }
        bail!("Malformed instance: {:.60}", statement);
    };

    let id: EntityId = caps[1].parse()?;
    let type_name = caps[2].to_ascii_uppercase();
    let open = caps.get(0).map(|m| m.end()).unwrap_or_default() - 1;

    let mut cursor = Cursor::new(&statement[open..]);
    let args = cursor
        .parse_list()
        .map_err(|e| anyhow!("#{id}={type_name}: {e}"))?;
    cursor.skip_ws();
    if !cursor.at_end() {
        bail!("#{id}={type_name}: trailing input after arguments");
    }

    Ok(Some((id, StepEntity { type_name, args })))
}

/// Deepest list/typed-value nesting accepted inside one instance
const MAX_NESTING: usize = 256;

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            bail!("expected '{}' at offset {}", byte as char, self.pos)
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if pred(b)) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// `( value, value, ... )`
    fn parse_list(&mut self) -> Result<Vec<StepValue>> {
        self.expect(b'(')?;
        if self.depth >= MAX_NESTING {
            bail!("lists nested deeper than {} levels at offset {}", MAX_NESTING, self.pos);
        }
        self.depth += 1;
        let items = self.parse_list_items();
        self.depth -= 1;
        items
    }

    fn parse_list_items(&mut self) -> Result<Vec<StepValue>> {
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b')') {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => bail!("expected ',' or ')' at offset {}", self.pos),
            }
        }
    }

    fn parse_value(&mut self) -> Result<StepValue> {
        self.skip_ws();
        match self.peek() {
            Some(b'$') => {
                self.pos += 1;
                Ok(StepValue::Null)
            }
            Some(b'*') => {
                self.pos += 1;
                Ok(StepValue::Derived)
            }
            Some(b'#') => {
                self.pos += 1;
                let digits = self.take_while(|b| b.is_ascii_digit());
                Ok(StepValue::Ref(digits.parse()?))
            }
            Some(b'\'') => self.parse_string(),
            Some(b'.') => {
                self.pos += 1;
                let name = self.take_while(|b| b != b'.');
                self.expect(b'.')?;
                Ok(StepValue::Enum(name.to_string()))
            }
            Some(b'"') => {
                self.pos += 1;
                let hex = self.take_while(|b| b != b'"');
                self.expect(b'"')?;
                Ok(StepValue::Binary(hex.to_string()))
            }
            Some(b'(') => Ok(StepValue::List(self.parse_list()?)),
            Some(b) if b.is_ascii_digit() || b == b'-' || b == b'+' => self.parse_number(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                let keyword = self
                    .take_while(|b| b.is_ascii_alphanumeric() || b == b'_')
                    .to_ascii_uppercase();
                let mut inner = self.parse_list()?;
                let value = if inner.len() == 1 {
                    inner.remove(0)
                } else {
                    StepValue::List(inner)
                };
                Ok(StepValue::Typed(keyword, Box::new(value)))
            }
            Some(b) => bail!("unexpected '{}' at offset {}", b as char, self.pos),
            None => bail!("unexpected end of input"),
        }
    }

    fn parse_number(&mut self) -> Result<StepValue> {
        let token = self.take_while(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'E' | b'e'));
        if token.contains(['.', 'E', 'e']) {
            Ok(StepValue::Real(token.parse()?))
        } else {
            Ok(StepValue::Integer(token.parse()?))
        }
    }

    fn parse_string(&mut self) -> Result<StepValue> {
        self.pos += 1;
        let mut raw = String::new();
        loop {
            let rest = &self.src[self.pos..];
            let Some(quote) = rest.find('\'') else {
                bail!("unterminated string");
            };
            raw.push_str(&rest[..quote]);
            self.pos += quote + 1;
            if self.peek() == Some(b'\'') {
                raw.push('\'');
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(StepValue::Text(decode_string(&raw)))
    }
}

/// Decode the control directives allowed inside STEP strings
pub fn decode_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(idx) = rest.find('\\') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];

        if let Some(after) = rest.strip_prefix("\\X2\\") {
            let end = after.find("\\X0\\").unwrap_or(after.len());
            let units: Vec<u16> = after[..end]
                .as_bytes()
                .chunks(4)
                .filter_map(|c| std::str::from_utf8(c).ok())
                .filter_map(|h| u16::from_str_radix(h, 16).ok())
                .collect();
            out.push_str(&String::from_utf16_lossy(&units));
            rest = after.get(end + 4..).unwrap_or("");
        } else if let Some(after) = rest.strip_prefix("\\X4\\") {
            let end = after.find("\\X0\\").unwrap_or(after.len());
            after[..end]
                .as_bytes()
                .chunks(8)
                .filter_map(|c| std::str::from_utf8(c).ok())
                .filter_map(|h| u32::from_str_radix(h, 16).ok())
                .filter_map(char::from_u32)
                .for_each(|c| out.push(c));
            rest = after.get(end + 4..).unwrap_or("");
        } else if let Some(after) = rest.strip_prefix("\\X\\") {
            match after.get(..2).and_then(|h| u8::from_str_radix(h, 16).ok()) {
                Some(byte) => {
                    out.push(char::from(byte));
                    rest = &after[2..];
                }
                None => {
                    out.push('\\');
                    rest = &rest[1..];
                }
            }
        } else if let Some(after) = rest.strip_prefix("\\S\\") {
            match after.chars().next() {
                Some(c) if c.is_ascii() => {
                    out.push(char::from(c as u8 + 128));
                    rest = &after[1..];
                }
                _ => {
                    out.push('\\');
                    rest = &rest[1..];
                }
            }
        } else if rest.starts_with("\\P") && rest.get(3..4) == Some("\\") {
            // code page switch, irrelevant once decoded to UTF-8
            rest = &rest[4..];
        } else if let Some(after) = rest.strip_prefix("\\\\") {
            out.push('\\');
            rest = after;
        } else {
            out.push('\\');
            rest = &rest[1..];
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(data: &str) -> String {
        format!(
            "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');\nFILE_SCHEMA(('IFC2X3'));\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n"
        )
    }

    #[test]
    fn test_parses_simple_instances() {
        let text = wrap(
            "#1=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',#5,'Wall ''A''',$,$,#20,#30,$);\n\
             #2=IFCPROPERTYSINGLEVALUE('Width',$,IFCLENGTHMEASURE(0.25),$);",
        );
        let entities = parse_physical_file(&text).unwrap();
        assert_eq!(entities.len(), 2);

        let wall = &entities[&1];
        assert_eq!(wall.type_name, "IFCWALL");
        assert_eq!(wall.text_arg(0).as_deref(), Some("2O2Fr$t4X7Zf8NOew3FLOH"));
        assert_eq!(wall.arg(1), Some(&StepValue::Ref(5)));
        assert_eq!(wall.text_arg(2).as_deref(), Some("Wall 'A'"));
        assert_eq!(wall.arg(3), Some(&StepValue::Null));

        let prop = &entities[&2];
        assert_eq!(
            prop.arg(2),
            Some(&StepValue::Typed(
                "IFCLENGTHMEASURE".to_string(),
                Box::new(StepValue::Real(0.25))
            ))
        );
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let depth = 200_000;
        let text = wrap(&format!(
            "#1=IFCWALL('g',$,'n',$,$,$,$,{}1{});",
            "(".repeat(depth),
            ")".repeat(depth)
        ));
        let err = parse_physical_file(&text).unwrap_err();
        assert!(format!("{err:#}").contains("nested deeper"));
    }

    #[test]
    fn test_nesting_up_to_limit_is_accepted() {
        let depth = MAX_NESTING - 1;
        let text = wrap(&format!(
            "#1=IFCTHING({}1{});",
            "(".repeat(depth),
            ")".repeat(depth)
        ));
        let entities = parse_physical_file(&text).unwrap();
        assert!(matches!(entities[&1].arg(0), Some(StepValue::List(_))));
    }

    #[test]
    fn test_lists_enums_and_numbers() {
        let text = wrap("#7=IFCTHING((#1,#2,(3,-4.5E-1)),.T.,*,\"0FF\",12.);");
        let entities = parse_physical_file(&text).unwrap();
        let thing = &entities[&7];
        assert_eq!(
            thing.args[0],
            StepValue::List(vec![
                StepValue::Ref(1),
                StepValue::Ref(2),
                StepValue::List(vec![StepValue::Integer(3), StepValue::Real(-0.45)]),
            ])
        );
        assert_eq!(thing.args[1], StepValue::Enum("T".to_string()));
        assert_eq!(thing.args[2], StepValue::Derived);
        assert_eq!(thing.args[3], StepValue::Binary("0FF".to_string()));
        assert_eq!(thing.args[4], StepValue::Real(12.0));
        assert_eq!(thing.args[0].refs(), vec![1, 2]);
    }

    #[test]
    fn test_semicolons_and_comments() {
        let text = wrap(
            "/* a comment; with a semicolon */\n\
             #3=IFCDOOR('id',$,'Door; main',$);",
        );
        let entities = parse_physical_file(&text).unwrap();
        assert_eq!(entities[&3].text_arg(2).as_deref(), Some("Door; main"));
    }

    #[test]
    fn test_complex_instances_are_skipped() {
        let text = wrap("#4=(IFCA() IFCB(1));\n#5=IFCSLAB('s',$,$,$);");
        let entities = parse_physical_file(&text).unwrap();
        assert_eq!(entities.len(), 1);
        assert!(entities.contains_key(&5));
    }

    #[test]
    fn test_rejects_non_step_content() {
        assert!(parse_physical_file("PK\u{3}\u{4} not a model").is_err());
    }

    #[test]
    fn test_rejects_truncated_instance() {
        let text = wrap("#1=IFCWALL('a',$");
        assert!(parse_physical_file(&text).is_err());
    }

    #[test]
    fn test_decode_string_directives() {
        assert_eq!(decode_string("Mur \\X2\\00E9\\X0\\tage"), "Mur étage");
        assert_eq!(decode_string("Caf\\X\\E9"), "Café");
        assert_eq!(decode_string("\\X4\\0001F600\\X0\\"), "😀");
        assert_eq!(decode_string("a\\\\b"), "a\\b");
        assert_eq!(decode_string("\\PA\\plain"), "plain");
        assert_eq!(decode_string("\\S\\i"), "é");
    }
}
