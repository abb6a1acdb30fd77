//! Structured dictionary documents.
//!
//! Every configuration file in a case (field initial conditions, mesh recipe,
//! solver controls) is one [`ConfigDocument`]: a named, ordered key/value
//! mapping with a declared default-value set. Serialization follows the
//! OpenFOAM dictionary text format and is round-trip stable for recognized
//! keys: comments are stripped on parse and entry values are re-emitted with
//! whitespace collapsed to single spaces.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::fs;
use thiserror::Error;

/// Errors raised by document construction, parsing and persistence.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("invalid document name {0:?}: only letters, digits and underscores are allowed")]
    InvalidName(String),

    #[error("failed to parse dictionary: {0}")]
    Parse(String),

    #[error("entry {0:?} is not a sub-dictionary")]
    NotADict(String),

    #[error("failed to create directory {path}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Check a name against the shared identifier rule: non-empty, `[A-Za-z0-9_]` only.
///
/// Shared by document names, project names and geometry names.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Top-level subfolder a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// `0/` - initial and boundary field values.
    Zero,
    /// `constant/` - material properties and mesh description.
    Constant,
    /// `system/` - solver and meshing controls.
    System,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Zero => "0",
            Location::Constant => "constant",
            Location::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Location> {
        match s {
            "0" => Some(Location::Zero),
            "constant" => Some(Location::Constant),
            "system" => Some(Location::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value in a dictionary: either a raw entry (`key   value;`) or a nested
/// ordered sub-dictionary (`key { ... }`).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Entry(String),
    Dict(IndexMap<String, Value>),
}

impl Value {
    pub fn entry(s: impl Into<String>) -> Value {
        Value::Entry(s.into())
    }

    pub fn dict<I, K>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_entry(&self) -> Option<&str> {
        match self {
            Value::Entry(s) => Some(s),
            Value::Dict(_) => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Dict(d) => Some(d),
            Value::Entry(_) => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut IndexMap<String, Value>> {
        match self {
            Value::Dict(d) => Some(d),
            Value::Entry(_) => None,
        }
    }
}

/// Raw result of parsing an on-disk dictionary file.
///
/// The `FoamFile` header block, when present, is lifted out of the body and
/// exposed through the `name`/`class_tag`/`location` fields.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub name: Option<String>,
    pub class_tag: Option<String>,
    pub location: Option<Location>,
    pub values: IndexMap<String, Value>,
}

/// A named, ordered dictionary file with declared defaults.
///
/// `values` holds the working state: the defaults deep-merged with any
/// caller-supplied overrides. Overriding a key keeps its declared position;
/// keys unknown to the defaults are appended in insertion order, which is
/// exactly the order serialization reproduces.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    name: String,
    class_tag: String,
    location: Location,
    default_values: IndexMap<String, Value>,
    values: IndexMap<String, Value>,
}

impl ConfigDocument {
    /// Create a document from its default-value table, optionally overridden.
    pub fn from_defaults(
        name: impl Into<String>,
        class_tag: impl Into<String>,
        location: Location,
        default_values: IndexMap<String, Value>,
        values: Option<IndexMap<String, Value>>,
    ) -> Result<Self, DocumentError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(DocumentError::InvalidName(name));
        }

        let mut merged = default_values.clone();
        if let Some(overrides) = values {
            merge_into(&mut merged, overrides);
        }

        Ok(Self {
            name,
            class_tag: class_tag.into(),
            location,
            default_values,
            values: merged,
        })
    }

    /// Create a document with no default table (generic key/value blob).
    pub fn generic(
        name: impl Into<String>,
        class_tag: impl Into<String>,
        location: Location,
        values: IndexMap<String, Value>,
    ) -> Result<Self, DocumentError> {
        Self::from_defaults(name, class_tag, location, IndexMap::new(), Some(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_tag(&self) -> &str {
        &self.class_tag
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub fn default_values(&self) -> &IndexMap<String, Value> {
        &self.default_values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set or override a top-level entry. Overrides keep their declared position.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// True for keys carried by `values` that the default table never declared.
    pub fn is_extension_key(&self, key: &str) -> bool {
        !self.default_values.contains_key(key)
    }

    /// Look up a nested value by key path, e.g. `["castellatedMeshControls", "locationInMesh"]`.
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.values.get(*first)?;
        for key in rest {
            current = current.as_dict()?.get(*key)?;
        }
        Some(current)
    }

    /// Insert `key = value` into the sub-dictionary at `path`, creating
    /// intermediate dictionaries as needed. Fails when an intermediate key
    /// already holds a plain entry.
    pub fn insert_at(
        &mut self,
        path: &[&str],
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), DocumentError> {
        let mut current = &mut self.values;
        for step in path {
            current = current
                .entry(step.to_string())
                .or_insert_with(|| Value::Dict(IndexMap::new()))
                .as_dict_mut()
                .ok_or_else(|| DocumentError::NotADict(step.to_string()))?;
        }
        current.insert(key.into(), value);
        Ok(())
    }

    /// Parse a dictionary text into its header fields and body entries.
    pub fn parse(text: &str) -> Result<ParsedDocument, DocumentError> {
        let mut cursor = Cursor::new(text);
        let mut values = parse_entries(&mut cursor, false)?;

        let mut name = None;
        let mut class_tag = None;
        let mut location = None;
        if let Some(Value::Dict(header)) = values.shift_remove("FoamFile") {
            name = header
                .get("object")
                .and_then(Value::as_entry)
                .map(str::to_string);
            class_tag = header
                .get("class")
                .and_then(Value::as_entry)
                .map(str::to_string);
            location = header
                .get("location")
                .and_then(Value::as_entry)
                .and_then(|loc| Location::parse(loc.trim_matches('"')));
        }

        Ok(ParsedDocument {
            name,
            class_tag,
            location,
            values,
        })
    }

    /// Serialize the document, header included, in declared key order.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "FoamFile\n{{");
        let _ = writeln!(out, "    {:<15} {};", "version", "2.0");
        let _ = writeln!(out, "    {:<15} {};", "format", "ascii");
        let _ = writeln!(out, "    {:<15} {};", "class", self.class_tag);
        let _ = writeln!(out, "    {:<15} \"{}\";", "location", self.location);
        let _ = writeln!(out, "    {:<15} {};", "object", self.name);
        let _ = writeln!(out, "}}\n");
        write_entries(&mut out, &self.values, 0);
        out
    }

    /// Write the document to `root/<location>/<name>`, creating intermediate
    /// directories. A directory-creation or write failure is fatal.
    pub fn save(&self, root: &Utf8Path) -> Result<Utf8PathBuf, DocumentError> {
        let dir = root.join(self.location.as_str());
        fs::create_dir_all(&dir).map_err(|source| DocumentError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(&self.name);
        fs::write(&path, self.serialize()).map_err(|source| DocumentError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("saved document {}", path);
        Ok(path)
    }
}

/// Deep-merge `overrides` into `base`. Dict-over-dict merges recursively;
/// anything else replaces in place, keeping the existing key position.
fn merge_into(base: &mut IndexMap<String, Value>, overrides: IndexMap<String, Value>) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(Value::Dict(existing)), Value::Dict(incoming)) => {
                merge_into(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn write_entries(out: &mut String, entries: &IndexMap<String, Value>, depth: usize) {
    let indent = "    ".repeat(depth);
    for (key, value) in entries {
        match value {
            // directives like `#include "file"` carry no trailing semicolon
            Value::Entry(v) if key.starts_with('#') => {
                let _ = writeln!(out, "{indent}{key} {v}");
            }
            Value::Entry(v) if v.is_empty() => {
                let _ = writeln!(out, "{indent}{key};");
            }
            Value::Entry(v) => {
                let _ = writeln!(out, "{indent}{key:<15} {v};");
            }
            Value::Dict(dict) => {
                let _ = writeln!(out, "{indent}{key}");
                let _ = writeln!(out, "{indent}{{");
                write_entries(out, dict, depth + 1);
                let _ = writeln!(out, "{indent}}}");
            }
        }
    }
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn starts_with(&self, pat: &str) -> bool {
        pat.chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    /// Skip whitespace, `//` line comments and `/* */` block comments.
    fn skip_insignificant(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
            if self.starts_with("//") {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else if self.starts_with("/*") {
                self.pos += 2;
                while self.peek().is_some() && !self.starts_with("*/") {
                    self.pos += 1;
                }
                self.pos = (self.pos + 2).min(self.chars.len());
            } else {
                return;
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | ';') {
                break;
            }
            word.push(c);
            self.pos += 1;
        }
        word
    }

    fn read_line(&mut self) -> String {
        let mut line = String::new();
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
            line.push(c);
        }
        line
    }

    /// Read a raw entry value up to its terminating semicolon. Semicolons
    /// inside brackets or quotes belong to the value, so list entries that
    /// embed sub-dictionaries stay intact.
    fn read_until_semicolon(&mut self) -> Result<String, DocumentError> {
        let mut raw = String::new();
        let mut depth = 0usize;
        let mut quoted = false;
        loop {
            match self.bump() {
                Some(';') if depth == 0 && !quoted => return Ok(raw),
                Some(c) => {
                    match c {
                        '"' => quoted = !quoted,
                        '(' | '[' | '{' if !quoted => depth += 1,
                        ')' | ']' | '}' if !quoted => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    raw.push(c);
                }
                None => {
                    return Err(DocumentError::Parse(format!(
                        "unterminated entry near {:?}",
                        raw.trim().chars().take(32).collect::<String>()
                    )));
                }
            }
        }
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_entries(
    cursor: &mut Cursor,
    nested: bool,
) -> Result<IndexMap<String, Value>, DocumentError> {
    let mut entries = IndexMap::new();
    loop {
        cursor.skip_insignificant();
        match cursor.peek() {
            None => {
                if nested {
                    return Err(DocumentError::Parse(
                        "unexpected end of input inside a block".into(),
                    ));
                }
                break;
            }
            Some('}') => {
                if nested {
                    cursor.bump();
                    break;
                }
                return Err(DocumentError::Parse("unmatched '}'".into()));
            }
            _ => {}
        }

        let key = cursor.read_word();
        if key.is_empty() {
            return Err(DocumentError::Parse(format!(
                "expected a key, found {:?}",
                cursor.peek()
            )));
        }

        if key.starts_with('#') {
            let rest = cursor.read_line();
            entries.insert(key, Value::Entry(collapse_whitespace(&rest)));
            continue;
        }

        cursor.skip_insignificant();
        if cursor.peek() == Some('{') {
            cursor.bump();
            let dict = parse_entries(cursor, true)?;
            entries.insert(key, Value::Dict(dict));
        } else {
            let raw = cursor.read_until_semicolon()?;
            entries.insert(key, Value::Entry(collapse_whitespace(&raw)));
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn sample_defaults() -> IndexMap<String, Value> {
        let mut defaults = IndexMap::new();
        defaults.insert("dimensions".into(), Value::entry("[0 0 -1 0 0 0 0]"));
        defaults.insert("internalField".into(), Value::entry("uniform 0.01"));
        defaults
    }

    #[test]
    fn test_defaults_merge_keeps_declared_order() {
        let mut overrides = IndexMap::new();
        overrides.insert("internalField".to_string(), Value::entry("uniform 0.5"));
        overrides.insert("extra".to_string(), Value::entry("1"));

        let doc = ConfigDocument::from_defaults(
            "omega",
            "volScalarField",
            Location::Zero,
            sample_defaults(),
            Some(overrides),
        )
        .unwrap();

        let keys: Vec<&str> = doc.values().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["dimensions", "internalField", "extra"]);
        assert_eq!(
            doc.get("internalField").unwrap().as_entry(),
            Some("uniform 0.5")
        );
        assert!(doc.is_extension_key("extra"));
        assert!(!doc.is_extension_key("dimensions"));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let err = ConfigDocument::from_defaults(
            "bad name",
            "dictionary",
            Location::System,
            IndexMap::new(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidName(_)));
    }

    #[test]
    fn test_parse_nested_dicts_and_comments() {
        let text = r#"
            /* banner */
            FoamFile
            {
                version 2.0;
                format ascii;
                class volVectorField;
                location "0";
                object U;
            }
            // a comment
            dimensions      [0 1 -1 0 0 0 0];
            boundaryField
            {
                inlet
                {
                    type            fixedValue;
                    value           uniform (0 0 0);
                }
            }
        "#;

        let parsed = ConfigDocument::parse(text).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("U"));
        assert_eq!(parsed.class_tag.as_deref(), Some("volVectorField"));
        assert_eq!(parsed.location, Some(Location::Zero));

        let boundary = parsed.values.get("boundaryField").unwrap().as_dict().unwrap();
        let inlet = boundary.get("inlet").unwrap().as_dict().unwrap();
        assert_eq!(
            inlet.get("value").unwrap().as_entry(),
            Some("uniform (0 0 0)")
        );
    }

    #[test]
    fn test_parse_list_entry_with_embedded_dict() {
        // list entries may carry sub-dictionaries whose semicolons do not
        // terminate the outer entry
        let text = r#"
            boundary ( box { type wall; faces ( (0 3 2 1) ); } );
            mergePatchPairs ();
        "#;
        let parsed = ConfigDocument::parse(text).unwrap();
        assert_eq!(
            parsed.values.get("boundary").unwrap().as_entry(),
            Some("( box { type wall; faces ( (0 3 2 1) ); } )")
        );
        assert_eq!(
            parsed.values.get("mergePatchPairs").unwrap().as_entry(),
            Some("()")
        );
    }

    #[test]
    fn test_parse_unterminated_entry_fails() {
        let err = ConfigDocument::parse("key value").unwrap_err();
        assert!(matches!(err, DocumentError::Parse(_)));
    }

    #[test]
    fn test_serialize_parse_round_trip() {
        let mut overrides = IndexMap::new();
        overrides.insert(
            "boundaryField".to_string(),
            Value::dict([(
                "walls",
                Value::dict([("type", Value::entry("zeroGradient"))]),
            )]),
        );

        let doc = ConfigDocument::from_defaults(
            "omega",
            "volScalarField",
            Location::Zero,
            sample_defaults(),
            Some(overrides),
        )
        .unwrap();

        let first = doc.serialize();
        let parsed = ConfigDocument::parse(&first).unwrap();
        let reparsed = ConfigDocument::from_defaults(
            parsed.name.unwrap(),
            parsed.class_tag.unwrap(),
            parsed.location.unwrap(),
            sample_defaults(),
            Some(parsed.values),
        )
        .unwrap();

        assert_eq!(reparsed.serialize(), first);
    }

    #[test]
    fn test_insert_at_creates_intermediate_dicts() {
        let mut doc = ConfigDocument::generic(
            "snappyHexMeshDict",
            "dictionary",
            Location::System,
            IndexMap::new(),
        )
        .unwrap();

        doc.insert_at(
            &["castellatedMeshControls", "refinementRegions"],
            "zone",
            Value::dict([("mode", Value::entry("inside"))]),
        )
        .unwrap();

        let zone = doc
            .lookup(&["castellatedMeshControls", "refinementRegions", "zone"])
            .unwrap()
            .as_dict()
            .unwrap();
        assert_eq!(zone.get("mode").unwrap().as_entry(), Some("inside"));
    }

    #[test]
    fn test_insert_at_refuses_plain_entry() {
        let mut values = IndexMap::new();
        values.insert("snap".to_string(), Value::entry("true"));
        let mut doc =
            ConfigDocument::generic("dict", "dictionary", Location::System, values).unwrap();

        let err = doc
            .insert_at(&["snap"], "inner", Value::entry("1"))
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotADict(_)));
    }

    #[test]
    fn test_save_writes_to_location_subfolder() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let doc = ConfigDocument::from_defaults(
            "omega",
            "volScalarField",
            Location::Zero,
            sample_defaults(),
            None,
        )
        .unwrap();

        let path = doc.save(&root).unwrap();
        assert_eq!(path, root.join("0").join("omega"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("object          omega;"));
        assert!(text.contains("location        \"0\";"));
    }

    proptest! {
        #[test]
        fn prop_valid_names_accepted(name in "[A-Za-z0-9_]{1,16}") {
            prop_assert!(ConfigDocument::from_defaults(
                name, "dictionary", Location::System, IndexMap::new(), None).is_ok());
        }

        #[test]
        fn prop_invalid_names_rejected(name in "[ \t!@#$%^&*.\\-]{1,8}") {
            prop_assert!(ConfigDocument::from_defaults(
                name, "dictionary", Location::System, IndexMap::new(), None).is_err());
        }

        #[test]
        fn prop_round_trip_stable(
            entries in proptest::collection::vec(
                ("[a-z][a-zA-Z0-9_]{0,8}", "[a-zA-Z0-9().\\[\\]-]{1,12}( [a-zA-Z0-9().\\[\\]-]{1,12}){0,3}"),
                1..8,
            )
        ) {
            let values: IndexMap<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, Value::Entry(v)))
                .collect();
            let doc = ConfigDocument::generic("generated", "dictionary", Location::System, values)
                .unwrap();

            let first = doc.serialize();
            let parsed = ConfigDocument::parse(&first).unwrap();
            let doc2 = ConfigDocument::generic(
                parsed.name.unwrap(),
                parsed.class_tag.unwrap(),
                parsed.location.unwrap(),
                parsed.values,
            )
            .unwrap();
            prop_assert_eq!(doc2.serialize(), first);
        }
    }
}
