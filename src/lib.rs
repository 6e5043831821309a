// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

//! Retrieve values from JSON documents with a compact path syntax, in a
//! single forward scan and without building a document tree.
//!
//! ```
//! const JSON: &str = r#"{"name":{"first":"Tom","last":"Anderson"},"age":37}"#;
//! let last = sift::get(JSON, "name.last");
//! assert_eq!(last.string(), "Anderson");
//! ```

mod locate;
mod modifiers;
mod multipath;
mod path;
mod pretty;
mod scan;
#[cfg(test)]
mod test;
mod text;
mod valid;
mod walk;

use chrono::{DateTime, FixedOffset};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

pub use modifiers::{add_modifier, modifier_exists};
pub use text::escape;
pub use valid::{valid, valid_bytes};

static DISABLE_MODIFIERS: AtomicBool = AtomicBool::new(false);
static DISABLE_ESCAPE_HTML: AtomicBool = AtomicBool::new(false);

/// Turns the `@modifier` syntax off for every later query. Meant to be
/// flipped once at startup; mutations are not synchronized with queries
/// already in flight.
pub fn set_disable_modifiers(disabled: bool) {
    DISABLE_MODIFIERS.store(disabled, AtomicOrdering::Relaxed);
}

pub(crate) fn modifiers_disabled() -> bool {
    DISABLE_MODIFIERS.load(AtomicOrdering::Relaxed)
}

/// Stops '<', '>' and '&' from being escaped when the engine emits JSON
/// strings. Same startup-only caveat as [`set_disable_modifiers`].
pub fn set_disable_escape_html(disabled: bool) {
    DISABLE_ESCAPE_HTML.store(disabled, AtomicOrdering::Relaxed);
}

pub(crate) fn escape_html_disabled() -> bool {
    DISABLE_ESCAPE_HTML.load(AtomicOrdering::Relaxed)
}

/// The kind of a JSON [`Value`]. The declaration order carries the total
/// ordering used by comparisons: Null < False < Number < String < True <
/// Json.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Null,
    False,
    Number,
    String,
    True,
    Json,
}

/// A value extracted from a JSON document.
///
/// The raw fragment either borrows from the queried document or lives in an
/// owned buffer when the value was synthesized (counts, collected arrays,
/// modifier output). A `Value` never outlives the document it borrows from.
#[derive(Debug, Default)]
pub struct Value<'a> {
    pub(crate) kind: Kind,
    pub(crate) raw_ref: &'a str,
    pub(crate) raw_buf: String,
    pub(crate) str_buf: String,
    pub(crate) esc: bool,
    pub(crate) num: f64,
    pub(crate) index: Option<usize>,
    pub(crate) indexes: Option<Vec<usize>>,
}

impl Default for Kind {
    fn default() -> Self {
        Kind::Null
    }
}

impl<'a> Value<'a> {
    pub(crate) fn string_at(raw: &'a str, index: Option<usize>, esc: bool) -> Value<'a> {
        let mut v = Value {
            kind: Kind::String,
            raw_ref: raw,
            esc,
            index,
            ..Value::default()
        };
        if esc {
            if let Some(inner) = string_interior(raw) {
                v.str_buf = text::unescape(inner);
            }
        }
        v
    }

    pub(crate) fn number_at(raw: &'a str, index: Option<usize>) -> Value<'a> {
        Value {
            kind: Kind::Number,
            raw_ref: raw,
            num: raw.parse().unwrap_or(0.0),
            index,
            ..Value::default()
        }
    }

    pub(crate) fn literal_at(kind: Kind, raw: &'a str, index: Option<usize>) -> Value<'a> {
        Value {
            kind,
            raw_ref: raw,
            index,
            ..Value::default()
        }
    }

    pub(crate) fn json_at(raw: &'a str, index: Option<usize>) -> Value<'a> {
        Value {
            kind: Kind::Json,
            raw_ref: raw,
            index,
            ..Value::default()
        }
    }

    pub(crate) fn owned_json(raw: String, indexes: Option<Vec<usize>>) -> Value<'a> {
        Value {
            kind: Kind::Json,
            raw_buf: raw,
            indexes,
            ..Value::default()
        }
    }

    // A count has no place in the source text, so it carries no index.
    pub(crate) fn count(n: usize) -> Value<'a> {
        Value {
            kind: Kind::Number,
            raw_buf: n.to_string(),
            num: n as f64,
            ..Value::default()
        }
    }

    fn number_key(n: f64) -> Value<'a> {
        Value {
            kind: Kind::Number,
            num: n,
            ..Value::default()
        }
    }

    // A second borrowed view of this value, used where an iteration needs
    // to hand the value itself to a callback.
    pub(crate) fn reborrow<'b>(&'b self) -> Value<'b> {
        Value {
            kind: self.kind,
            raw_ref: self.raw(),
            raw_buf: String::new(),
            str_buf: self.str_buf.clone(),
            esc: self.esc,
            num: self.num,
            index: self.index,
            indexes: self.indexes.clone(),
        }
    }

    /// True when the path matched something. A JSON `null` exists; a missing
    /// key does not.
    pub fn exists(&self) -> bool {
        self.kind != Kind::Null || !self.raw().is_empty()
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The raw JSON fragment backing this value.
    pub fn raw(&self) -> &str {
        if self.raw_buf.is_empty() {
            self.raw_ref
        } else {
            &self.raw_buf
        }
    }

    /// Byte offset of [`raw`](Value::raw) in the original document, when
    /// known. Synthesized values have none.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Element offsets recorded by multi-match steps such as
    /// `friends.#.first` or `#(...)#`.
    pub fn indexes(&self) -> Option<&[usize]> {
        self.indexes.as_deref()
    }

    /// The unescaped content of a String value; empty for other kinds.
    pub fn str(&self) -> &str {
        if self.kind != Kind::String {
            return "";
        }
        if self.esc {
            return &self.str_buf;
        }
        string_interior(self.raw()).unwrap_or("")
    }

    /// A string form of any value. Numbers render from their raw text when
    /// it is a plain integer, otherwise from the shortest float round-trip.
    pub fn string(&self) -> Cow<'_, str> {
        match self.kind {
            Kind::Null => Cow::Borrowed(""),
            Kind::True => Cow::Borrowed("true"),
            Kind::False => Cow::Borrowed("false"),
            Kind::String => Cow::Borrowed(self.str()),
            Kind::Json => Cow::Borrowed(self.raw()),
            Kind::Number => {
                let raw = self.raw();
                let plain = !raw.is_empty()
                    && raw
                        .bytes()
                        .enumerate()
                        .all(|(i, c)| c.is_ascii_digit() || (i == 0 && c == b'-'));
                if plain {
                    Cow::Borrowed(raw)
                } else {
                    Cow::Owned(format!("{}", self.num))
                }
            }
        }
    }

    pub fn bool(&self) -> bool {
        match self.kind {
            Kind::True => true,
            Kind::String => text::parse_bool(self.str()).unwrap_or(false),
            Kind::Number => self.num != 0.0,
            _ => false,
        }
    }

    /// Integer form. Numbers inside the f64-exact window convert directly,
    /// others fall back to parsing the raw text, then to truncation.
    pub fn i64(&self) -> i64 {
        match self.kind {
            Kind::True => 1,
            Kind::String => text::parse_int(self.str()).unwrap_or(0),
            Kind::Number => {
                if let Some(n) = text::safe_int(self.num) {
                    return n;
                }
                if let Some(n) = text::parse_int(self.raw()) {
                    return n;
                }
                self.num as i64
            }
            _ => 0,
        }
    }

    pub fn u64(&self) -> u64 {
        match self.kind {
            Kind::True => 1,
            Kind::String => text::parse_uint(self.str()).unwrap_or(0),
            Kind::Number => {
                match text::safe_int(self.num) {
                    Some(n) if n >= 0 => return n as u64,
                    _ => {}
                }
                if let Some(n) = text::parse_uint(self.raw()) {
                    return n;
                }
                self.num as u64
            }
            _ => 0,
        }
    }

    pub fn f64(&self) -> f64 {
        match self.kind {
            Kind::True => 1.0,
            Kind::String => self.str().parse().unwrap_or(0.0),
            Kind::Number => self.num,
            _ => 0.0,
        }
    }

    /// Parses the stringified form as an RFC 3339 timestamp.
    pub fn time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.string().as_ref()).ok()
    }

    pub fn is_object(&self) -> bool {
        self.kind == Kind::Json && self.raw().as_bytes().first() == Some(&b'{')
    }

    pub fn is_array(&self) -> bool {
        self.kind == Kind::Json && self.raw().as_bytes().first() == Some(&b'[')
    }

    pub fn is_bool(&self) -> bool {
        self.kind == Kind::True || self.kind == Kind::False
    }

    /// Runs a path against this value. Offsets of the result are shifted so
    /// they keep pointing into the document this value came from.
    pub fn get<'b>(&'b self, path: &'b str) -> Value<'b> {
        let mut res = get(self.raw(), path);
        add_base(&mut res, self.index);
        res
    }

    /// Iterates the children. Object members pass String keys; array
    /// elements pass Number keys counting from zero. Returning false stops
    /// the iteration. A scalar value is passed once with an empty key.
    pub fn each<'b>(&'b self, mut iter: impl FnMut(Value<'b>, Value<'b>) -> bool) {
        if !self.exists() {
            return;
        }
        if self.kind != Kind::Json {
            iter(Value::default(), self.reborrow());
            return;
        }
        let json = self.raw().as_bytes();
        let base = self.index.unwrap_or(0);
        let mut i = 0;
        let mut obj = false;
        loop {
            if i >= json.len() {
                return;
            }
            if json[i] == b'{' {
                obj = true;
                i += 1;
                break;
            }
            if json[i] == b'[' {
                i += 1;
                break;
            }
            if json[i] > b' ' {
                return;
            }
            i += 1;
        }
        let mut keyn = -1.0;
        let mut idx = 0usize;
        while i < json.len() {
            let key;
            if obj {
                if json[i] != b'"' {
                    i += 1;
                    continue;
                }
                let s = i;
                let (ni, raw, esc, ok) = scan::scan_string(json, i);
                i = ni;
                if !ok {
                    return;
                }
                key = Value::string_at(scan::as_str(raw), Some(s + base), esc);
            } else {
                keyn += 1.0;
                key = Value::number_key(keyn);
            }
            while i < json.len() && (json[i] <= b' ' || json[i] == b',' || json[i] == b':') {
                i += 1;
            }
            let s = i;
            let (ni, val) = scan::parse_any(json, i, true);
            i = ni;
            let mut val = match val {
                Some(v) => v,
                None => return,
            };
            match &self.indexes {
                Some(ix) if idx < ix.len() => val.index = Some(ix[idx]),
                Some(_) => {}
                None => val.index = Some(s + base),
            }
            if !iter(key, val) {
                return;
            }
            idx += 1;
        }
    }

    /// The elements of an array value. Null yields an empty vector and a
    /// scalar yields itself as the only element.
    pub fn array<'b>(&'b self) -> Vec<Value<'b>> {
        if self.kind == Kind::Null {
            return Vec::new();
        }
        if !self.is_array() {
            return vec![self.reborrow()];
        }
        let mut out = Vec::new();
        self.each(|_, v| {
            out.push(v);
            true
        });
        if let Some(ix) = &self.indexes {
            if ix.len() != out.len() {
                for v in &mut out {
                    v.index = None;
                }
            }
        }
        out
    }

    /// The members of an object value keyed by name. The first occurrence
    /// of a duplicate key wins.
    pub fn map<'b>(&'b self) -> HashMap<String, Value<'b>> {
        let mut out = HashMap::new();
        if self.is_object() {
            self.each(|k, v| {
                out.entry(k.str().to_owned()).or_insert(v);
                true
            });
        }
        out
    }

    /// Projects the value into a dynamic [`serde_json::Value`] tree.
    pub fn value(&self) -> serde_json::Value {
        match self.kind {
            Kind::Null => serde_json::Value::Null,
            Kind::False => serde_json::Value::Bool(false),
            Kind::True => serde_json::Value::Bool(true),
            Kind::String => serde_json::Value::String(self.str().to_owned()),
            Kind::Number => {
                let raw = self.raw();
                if let Ok(n) = raw.parse::<i64>() {
                    return n.into();
                }
                if let Ok(n) = raw.parse::<u64>() {
                    return n.into();
                }
                serde_json::Number::from_f64(self.num)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
            Kind::Json => {
                if self.is_object() {
                    let mut m = serde_json::Map::new();
                    self.each(|k, v| {
                        let key = k.str().to_owned();
                        if !m.contains_key(&key) {
                            m.insert(key, v.value());
                        }
                        true
                    });
                    serde_json::Value::Object(m)
                } else if self.is_array() {
                    let mut a = Vec::new();
                    self.each(|_, v| {
                        a.push(v.value());
                        true
                    });
                    serde_json::Value::Array(a)
                } else {
                    serde_json::Value::Null
                }
            }
        }
    }

    /// Strict weak ordering across kinds: Null < False < Number < String <
    /// True < Json. Strings may compare case-insensitively.
    pub fn less(&self, other: &Value, case_sensitive: bool) -> bool {
        if self.kind != other.kind {
            return self.kind < other.kind;
        }
        match self.kind {
            Kind::String => {
                if case_sensitive {
                    self.str() < other.str()
                } else {
                    text::less_insensitive(self.str(), other.str())
                }
            }
            Kind::Number => self.num < other.num,
            _ => self.raw() < other.raw(),
        }
    }

    /// Reconstructs the plain path that selects this value inside `json`,
    /// which must be the document the value was extracted from. Returns an
    /// empty string when the origin cannot be determined.
    pub fn path(&self, json: &str) -> String {
        locate::path_of(self, json)
    }

    /// The per-element counterpart of [`path`](Value::path) for multi-match
    /// results. Empty when any element is ambiguous.
    pub fn paths(&self, json: &str) -> Vec<String> {
        locate::paths_of(self, json)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.string())
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value<'_> {}

impl PartialOrd for Value<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        let c = self.kind.cmp(&other.kind);
        if c != Ordering::Equal {
            return c;
        }
        match self.kind {
            Kind::String => self.str().cmp(other.str()),
            Kind::Number => self.num.partial_cmp(&other.num).unwrap_or(Ordering::Equal),
            _ => self.raw().cmp(other.raw()),
        }
    }
}

// The text between the quotes of a raw string token. An unterminated
// token keeps the whole remainder as its body.
fn string_interior(raw: &str) -> Option<&str> {
    let rb = raw.as_bytes();
    if rb.len() < 2 {
        return None;
    }
    let end = if rb[rb.len() - 1] == b'"' {
        rb.len() - 1
    } else {
        rb.len()
    };
    Some(&raw[1..end])
}

// Detaches a value from whatever buffer it borrowed, copying the raw
// fragment into the owned buffer.
pub(crate) fn into_owned<'b>(v: Value<'_>) -> Value<'b> {
    Value {
        kind: v.kind,
        raw_ref: "",
        raw_buf: if v.raw_buf.is_empty() {
            v.raw_ref.to_owned()
        } else {
            v.raw_buf
        },
        str_buf: v.str_buf,
        esc: v.esc,
        num: v.num,
        index: v.index,
        indexes: v.indexes,
    }
}

fn add_base(res: &mut Value, base: Option<usize>) {
    let base = match base {
        Some(b) => b,
        None => return,
    };
    if let Some(ix) = &mut res.indexes {
        for x in ix.iter_mut() {
            *x += base;
        }
    } else if let Some(i) = res.index {
        res.index = Some(i + base);
    }
}

// Runs a path against an element scanned out of a larger document. Unlike
// Value::get this keeps the document lifetime, which the walkers need when
// they return the result upward.
pub(crate) fn elem_get<'a>(elem: &Value<'a>, path: &'a str) -> Value<'a> {
    let mut res = get(elem.raw_ref, path);
    add_base(&mut res, elem.index);
    res
}

/// Searches `json` for the given path and returns the first match.
///
/// A path is a series of keys separated by dots; see the crate docs for the
/// full syntax. Keys may use the '*' and '?' wildcards, array elements are
/// addressed by index, and '#' queries arrays:
///
/// ```text
/// "name.last"                    >> "Anderson"
/// "children.#"                   >> 3
/// "children.1"                   >> "Alex"
/// "child*.2"                     >> "Jack"
/// "friends.#.first"              >> ["James","Roger"]
/// "friends.#(last=\"Murphy\").first" >> "James"
/// ```
///
/// The input is expected to be well-formed; the engine never validates and
/// never panics, but malformed documents produce unspecified results. Use
/// [`valid`] first when the source is untrusted.
pub fn get<'a>(json: &'a str, path: &'a str) -> Value<'a> {
    let pb = path.as_bytes();
    if pb.len() > 1 {
        if pb[0] == b'@' && !modifiers_disabled() {
            if let Some((npath, out)) = modifiers::exec_modifier(json, path) {
                let np = npath.as_bytes();
                if !np.is_empty() && (np[0] == b'|' || np[0] == b'.') {
                    let mut res = into_owned(get(&out, &npath[1..]));
                    res.index = None;
                    res.indexes = None;
                    return res;
                }
                return into_owned(parse(&out));
            }
        } else if pb[0] == b'!' {
            if let Some((npath, lit)) = modifiers::exec_static(path) {
                let np = npath.as_bytes();
                if !np.is_empty() && (np[0] == b'|' || np[0] == b'.') {
                    let mut res = get(lit, &npath[1..]);
                    res.index = None;
                    res.indexes = None;
                    return res;
                }
                return parse(lit);
            }
        }
        if pb[0] == b'[' || pb[0] == b'{' {
            if let Some(res) = multipath::exec(json, path) {
                return res;
            }
        }
    }
    let jb = json.as_bytes();
    let mut ctx = walk::Ctx::new(jb);
    if pb.len() >= 2 && pb[0] == b'.' && pb[1] == b'.' {
        // JSON Lines: treat the whole input as one bracketless array
        walk::walk_array(&mut ctx, 0, &pb[2..]);
    } else {
        let mut i = 0;
        while i < jb.len() {
            if jb[i] == b'{' {
                walk::walk_object(&mut ctx, i + 1, pb);
                break;
            }
            if jb[i] == b'[' {
                walk::walk_array(&mut ctx, i + 1, pb);
                break;
            }
            i += 1;
        }
    }
    if ctx.piped {
        let pipe = scan::as_str(ctx.pipe);
        let mut res = if ctx.value.raw_buf.is_empty() {
            elem_get(&ctx.value, pipe)
        } else {
            into_owned(ctx.value.get(pipe))
        };
        res.index = None;
        return res;
    }
    ctx.value
}

/// Runs several paths against the same document.
pub fn get_many<'a>(json: &'a str, paths: &[&'a str]) -> Vec<Value<'a>> {
    paths.iter().map(|p| get(json, p)).collect()
}

/// Wraps the first value of `json` without descending into it. Like
/// [`get`], this never validates.
pub fn parse<'a>(json: &'a str) -> Value<'a> {
    let jb = json.as_bytes();
    let mut i = 0;
    while i < jb.len() {
        match jb[i] {
            b'{' | b'[' => return Value::json_at(&json[i..], Some(i)),
            c if c <= b' ' => {
                i += 1;
                continue;
            }
            b'"' => {
                let (_, raw, esc, _) = scan::scan_string(jb, i);
                return Value::string_at(scan::as_str(raw), Some(i), esc);
            }
            b't' | b'f' => {
                let kind = if jb[i] == b't' { Kind::True } else { Kind::False };
                let (_, raw) = scan::scan_literal(jb, i);
                return Value::literal_at(kind, scan::as_str(raw), Some(i));
            }
            b'n' => {
                if i + 1 < jb.len() && jb[i + 1] != b'u' {
                    let (_, raw) = scan::scan_number(jb, i);
                    return Value::number_at(scan::as_str(raw), Some(i));
                }
                let (_, raw) = scan::scan_literal(jb, i);
                return Value::literal_at(Kind::Null, scan::as_str(raw), Some(i));
            }
            b'+' | b'-' | b'0'..=b'9' | b'i' | b'I' | b'N' => {
                let (_, raw) = scan::scan_number(jb, i);
                return Value::number_at(scan::as_str(raw), Some(i));
            }
            _ => return Value::default(),
        }
    }
    Value::default()
}

/// Iterates the values of a JSON Lines document
/// (<https://jsonlines.org>), one [`Value`] per line.
pub fn for_each_line<'a>(json: &'a str, mut iter: impl FnMut(Value<'a>) -> bool) {
    let jb = json.as_bytes();
    let mut i = 0;
    loop {
        let (ni, line) = scan::parse_any(jb, i, true);
        i = ni;
        match line {
            Some(v) if v.exists() => {
                if !iter(v) {
                    return;
                }
            }
            _ => return,
        }
    }
}
