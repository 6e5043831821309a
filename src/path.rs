// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

use super::scan::{as_str, scan_squash, trim};
use super::text::unescape;
use std::borrow::Cow;

// One object-level step of a path. `part` keeps its backslashes; the
// walkers run escaped parts through the wildcard matcher, which treats
// a backslashed byte as literal.
#[derive(Default)]
pub(crate) struct ObjStep<'a> {
    pub part: &'a [u8],
    pub path: &'a [u8],
    pub pipe: &'a [u8],
    pub piped: bool,
    pub wild: bool,
    pub esc: bool,
    pub more: bool,
}

pub(crate) struct Query<'a> {
    pub on: bool,
    pub all: bool,
    pub path: &'a [u8],
    pub op: &'a str,
    pub value: Cow<'a, str>,
}

impl<'a> Default for Query<'a> {
    fn default() -> Self {
        Query {
            on: false,
            all: false,
            path: b"",
            op: "",
            value: Cow::Borrowed(""),
        }
    }
}

// One array-level step. `arrch` marks a '#' step; `alogok`/`alogkey` carry
// the `#.key` collect-across form; `query` carries `#(...)` predicates.
#[derive(Default)]
pub(crate) struct ArrStep<'a> {
    pub part: &'a [u8],
    pub path: &'a [u8],
    pub pipe: &'a [u8],
    pub piped: bool,
    pub more: bool,
    pub arrch: bool,
    pub alogok: bool,
    pub alogkey: &'a [u8],
    pub query: Query<'a>,
}

// Peeks whether the path after a dot should behave as a pipe: a multipath
// opener always does, a '@' only when it names a registered modifier.
pub(crate) fn is_dot_pipe(s: &[u8]) -> bool {
    if crate::modifiers_disabled() {
        return false;
    }
    match s[0] {
        b'@' => {
            let mut i = 1;
            while i < s.len() && !matches!(s[i], b'.' | b'|' | b':') {
                i += 1;
            }
            crate::modifier_exists(as_str(&s[1..i]))
        }
        b'[' | b'{' => true,
        _ => false,
    }
}

pub(crate) fn obj_step(path: &[u8]) -> ObjStep<'_> {
    let mut r = ObjStep::default();
    let mut i = 0;
    while i < path.len() {
        match path[i] {
            b'|' => {
                r.part = &path[..i];
                r.pipe = &path[i + 1..];
                r.piped = true;
                return r;
            }
            b'.' => {
                r.part = &path[..i];
                if i + 1 < path.len() && is_dot_pipe(&path[i + 1..]) {
                    r.pipe = &path[i + 1..];
                    r.piped = true;
                } else {
                    r.path = &path[i + 1..];
                    r.more = true;
                }
                return r;
            }
            b'*' | b'?' => r.wild = true,
            b'\\' => {
                r.esc = true;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    r.part = path;
    r
}

pub(crate) fn arr_step(path: &[u8]) -> ArrStep<'_> {
    let mut r = ArrStep::default();
    let mut i = 0;
    while i < path.len() {
        match path[i] {
            b'|' => {
                r.part = &path[..i];
                r.pipe = &path[i + 1..];
                r.piped = true;
                return r;
            }
            b'.' => {
                r.part = &path[..i];
                if !r.arrch && i + 1 < path.len() && is_dot_pipe(&path[i + 1..]) {
                    r.pipe = &path[i + 1..];
                    r.piped = true;
                } else {
                    r.path = &path[i + 1..];
                    r.more = true;
                }
                return r;
            }
            b'#' => {
                r.arrch = true;
                if i == 0 && path.len() > 1 {
                    if path[1] == b'.' {
                        r.alogok = true;
                        r.alogkey = &path[2..];
                        r.path = &path[..1];
                    } else if path[1] == b'(' || path[1] == b'[' {
                        match parse_query(path) {
                            Some(q) => {
                                r.query.on = true;
                                r.query.path = q.path;
                                r.query.op = q.op;
                                r.query.value = q.value;
                                i = q.end - 1;
                                if i + 1 < path.len() && path[i + 1] == b'#' {
                                    r.query.all = true;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    r.part = path;
    r.path = b"";
    r
}

struct ParsedQuery<'a> {
    path: &'a [u8],
    op: &'a str,
    value: Cow<'a, str>,
    end: usize,
}

// Splits a `#(path op value)` predicate, balancing nested brackets and
// strings to find its end. `#[...]` is accepted as an alias. The value is
// unquoted and unescaped here so the evaluator sees plain text.
fn parse_query(q: &[u8]) -> Option<ParsedQuery<'_>> {
    if q.len() < 2 || q[0] != b'#' || (q[1] != b'(' && q[1] != b'[') {
        return None;
    }
    let mut i = 2;
    let mut j = 0;
    let mut depth = 1;
    let mut vesc = false;
    while i < q.len() {
        if depth == 1 && j == 0 {
            if let b'!' | b'=' | b'<' | b'>' | b'%' = q[i] {
                j = i;
                i += 1;
                continue;
            }
        }
        match q[i] {
            b'\\' => i += 1,
            b'[' | b'(' => depth += 1,
            b']' | b')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            b'"' => {
                i += 1;
                while i < q.len() {
                    if q[i] == b'\\' {
                        vesc = true;
                        i += 1;
                    } else if q[i] == b'"' {
                        break;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    if depth > 0 {
        return None;
    }
    if j == 0 {
        return Some(ParsedQuery {
            path: trim(&q[2..i]),
            op: "",
            value: Cow::Borrowed(""),
            end: i + 1,
        });
    }
    let path = trim(&q[2..j]);
    let mut value = trim(&q[j..i]);
    let mut opsz = 0;
    if value.len() == 1 {
        opsz = 1;
    } else if value[0] == b'!' && (value[1] == b'=' || value[1] == b'%') {
        opsz = 2;
    } else if (value[0] == b'<' || value[0] == b'>') && value[1] == b'=' {
        opsz = 2;
    } else if value[0] == b'=' && value[1] == b'=' {
        value = &value[1..];
        opsz = 1;
    } else if let b'<' | b'>' | b'=' | b'%' = value[0] {
        opsz = 1;
    }
    let op = as_str(&value[..opsz]);
    let value = trim(&value[opsz..]);
    let value = if value.len() >= 2 && value[0] == b'"' && value[value.len() - 1] == b'"' {
        let inner = &value[1..value.len() - 1];
        if vesc {
            Cow::Owned(unescape(as_str(inner)))
        } else {
            Cow::Borrowed(as_str(inner))
        }
    } else {
        Cow::Borrowed(as_str(value))
    };
    Some(ParsedQuery {
        path,
        op,
        value,
        end: i + 1,
    })
}

// Splits `left|right` when the path carries a pipe that must run against a
// collected result rather than inside the current step. Nested queries,
// selector strings, and escaped bytes are crossed, not split.
pub(crate) fn split_possible_pipe(path: &[u8]) -> Option<(&[u8], &[u8])> {
    if !path.contains(&b'|') {
        return None;
    }
    if !path.is_empty() && path[0] == b'{' {
        let (_, sq) = scan_squash(&path[1..], 0);
        if sq.len() < path.len() - 1 {
            let end = sq.len() + 1;
            if path[end] == b'|' {
                return Some((&path[..end], &path[end + 1..]));
            }
        }
        return None;
    }
    let mut i = 0;
    while i < path.len() {
        match path[i] {
            b'\\' => i += 1,
            b'|' => return Some((&path[..i], &path[i + 1..])),
            b'.' => {
                if i == path.len() - 1 {
                    return None;
                }
                if path[i + 1] == b'#' {
                    i += 2;
                    if i == path.len() {
                        return None;
                    }
                    if path[i] == b'[' || path[i] == b'(' {
                        let (open, close) = if path[i] == b'[' {
                            (b'[', b']')
                        } else {
                            (b'(', b')')
                        };
                        i += 1;
                        let mut depth = 1;
                        while i < path.len() {
                            if path[i] == b'\\' {
                                i += 1;
                            } else if path[i] == open {
                                depth += 1;
                            } else if path[i] == close {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            } else if path[i] == b'"' {
                                i += 1;
                                while i < path.len() {
                                    if path[i] == b'\\' {
                                        i += 1;
                                    } else if path[i] == b'"' {
                                        break;
                                    }
                                    i += 1;
                                }
                            }
                            i += 1;
                        }
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn object_steps() {
        let r = obj_step(b"name.last");
        assert_eq!((r.part, r.path, r.more), (&b"name"[..], &b"last"[..], true));
        assert!(!r.wild && !r.esc && !r.piped);

        let r = obj_step(b"child*.2");
        assert!(r.wild && r.more);
        assert_eq!(r.part, b"child*");

        let r = obj_step(br"fav\.movie");
        assert!(r.esc && !r.more);
        assert_eq!(r.part, &br"fav\.movie"[..]);

        let r = obj_step(b"name|last");
        assert!(r.piped);
        assert_eq!((r.part, r.pipe), (&b"name"[..], &b"last"[..]));
    }

    #[test]
    fn array_steps() {
        let r = arr_step(b"#");
        assert!(r.arrch && !r.alogok && !r.query.on);
        assert_eq!(r.part, &b"#"[..]);

        let r = arr_step(b"#.first");
        assert!(r.arrch && r.alogok && r.more);
        assert_eq!((r.part, r.alogkey), (&b"#"[..], &b"first"[..]));

        let r = arr_step(b"2.nested");
        assert!(!r.arrch && r.more);
        assert_eq!((r.part, r.path), (&b"2"[..], &b"nested"[..]));
    }

    #[test]
    fn queries() {
        let r = arr_step(br#"#(last=="Murphy").first"#);
        assert!(r.query.on && !r.query.all && r.more);
        assert_eq!(r.query.path, &b"last"[..]);
        assert_eq!(r.query.op, "=");
        assert_eq!(r.query.value.as_ref(), "Murphy");
        assert_eq!(r.path, &b"first"[..]);

        let r = arr_step(b"#(age>50)#.name");
        assert!(r.query.on && r.query.all);
        assert_eq!((r.query.op, r.query.value.as_ref()), (">", "50"));

        let r = arr_step(br#"#(first%"J*")#"#);
        assert_eq!((r.query.op, r.query.value.as_ref()), ("%", "J*"));

        // nested query predicates stay inside the outer step
        let r = arr_step(br#"#(nets.#(==fb))"#);
        assert!(r.query.on);
        assert_eq!(r.query.path, &b"nets.#(==fb)"[..]);
        assert_eq!(r.query.op, "");

        // existence form
        let r = arr_step(b"#(name)");
        assert!(r.query.on);
        assert_eq!((r.query.path, r.query.op), (&b"name"[..], ""));

        // coercion values pass through untouched
        let r = arr_step(b"#(ok==~true)");
        assert_eq!(r.query.value.as_ref(), "~true");
    }

    #[test]
    fn pipe_split() {
        assert_eq!(
            split_possible_pipe(b"first|0"),
            Some((&b"first"[..], &b"0"[..]))
        );
        assert_eq!(split_possible_pipe(b"first.last"), None);
        assert_eq!(split_possible_pipe(br"a\|b"), None);
        let (l, r) = split_possible_pipe(br#"sub.#(x=="a|b")#|0"#).unwrap();
        assert_eq!(l, &br#"sub.#(x=="a|b")#"#[..]);
        assert_eq!(r, &b"0"[..]);
    }
}
