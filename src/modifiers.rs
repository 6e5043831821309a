// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

use super::pretty;
use super::scan::scan_squash;
use super::text::{append_json_string, into_string};
use super::{get, parse, valid, Value};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type ModifierFn = dyn Fn(&str, &str) -> String + Send + Sync;

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<ModifierFn>>>> = Lazy::new(|| {
    let mut m: HashMap<String, Arc<ModifierFn>> = HashMap::new();
    let builtins: &[(&str, fn(&str, &str) -> String)] = &[
        ("pretty", mod_pretty),
        ("ugly", mod_ugly),
        ("reverse", mod_reverse),
        ("this", mod_this),
        ("flatten", mod_flatten),
        ("join", mod_join),
        ("valid", mod_valid),
        ("keys", mod_keys),
        ("values", mod_values),
        ("tostr", mod_tostr),
        ("fromstr", mod_fromstr),
        ("group", mod_group),
        ("dig", mod_dig),
    ];
    for (name, f) in builtins {
        m.insert(name.to_string(), Arc::new(*f));
    }
    RwLock::new(m)
});

/// Binds a custom modifier to the `@name` syntax. Registration is meant to
/// happen once at startup, before queries run concurrently.
pub fn add_modifier<F>(name: &str, f: F)
where
    F: Fn(&str, &str) -> String + Send + Sync + 'static,
{
    if let Ok(mut m) = REGISTRY.write() {
        m.insert(name.to_string(), Arc::new(f));
    }
}

/// True when `name` is a registered modifier.
pub fn modifier_exists(name: &str) -> bool {
    REGISTRY.read().map(|m| m.contains_key(name)).unwrap_or(false)
}

fn lookup(name: &str) -> Option<Arc<ModifierFn>> {
    REGISTRY.read().ok().and_then(|m| m.get(name).cloned())
}

// Runs the modifier a path starts with. Returns the unconsumed path and the
// replacement document, or None when the name is not registered (the path
// then reads as ordinary keys and misses).
pub(crate) fn exec_modifier<'a>(json: &'a str, path: &'a str) -> Option<(&'a str, String)> {
    let pb = path.as_bytes();
    let mut name = &path[1..];
    let mut path_out = "";
    let mut has_args = false;
    for i in 1..pb.len() {
        match pb[i] {
            b':' => {
                path_out = &path[i + 1..];
                name = &path[1..i];
                has_args = !path_out.is_empty();
                break;
            }
            b'|' | b'.' => {
                path_out = &path[i..];
                name = &path[1..i];
                break;
            }
            _ => {}
        }
    }
    let f = lookup(name)?;
    let mut args = "";
    if has_args {
        let ob = path_out.as_bytes();
        let mut parsed = false;
        if matches!(ob[0], b'{' | b'[' | b'"') && parse(path_out).exists() {
            let (_, raw) = scan_squash(ob, 0);
            args = &path_out[..raw.len()];
            path_out = &path_out[raw.len()..];
            parsed = true;
        }
        if !parsed {
            let mut i = 0;
            while i < ob.len() {
                if ob[i] == b'|' {
                    break;
                }
                if matches!(ob[i], b'{' | b'[' | b'"' | b'(') {
                    let (_, raw) = scan_squash(ob, i);
                    i += raw.len() - 1;
                }
                i += 1;
            }
            args = &path_out[..i];
            path_out = &path_out[i..];
        }
    }
    Some((path_out, f(json, args)))
}

// Resolves a `!literal` path prefix. Bracketed, quoted and numeric forms are
// squashed out of the path; bare words accept true/false/null/nan/inf in any
// case. The document is ignored entirely.
pub(crate) fn exec_static<'a>(path: &'a str) -> Option<(&'a str, &'a str)> {
    let pb = path.as_bytes();
    let name = &path[1..];
    if !name.is_empty() {
        if matches!(
            name.as_bytes()[0],
            b'{' | b'[' | b'"' | b'+' | b'-' | b'0'..=b'9'
        ) {
            let (_, raw) = scan_squash(name.as_bytes(), 0);
            return Some((&name[raw.len()..], &name[..raw.len()]));
        }
    }
    let mut word = name;
    let mut path_out = "";
    for i in 1..pb.len() {
        if pb[i] == b'|' || pb[i] == b'.' {
            path_out = &path[i..];
            word = &path[1..i];
            break;
        }
    }
    for lit in ["true", "false", "null", "nan", "inf"] {
        if word.eq_ignore_ascii_case(lit) {
            return Some((path_out, lit));
        }
    }
    None
}

fn mod_this(json: &str, _arg: &str) -> String {
    json.to_string()
}

fn mod_valid(json: &str, _arg: &str) -> String {
    if valid(json) {
        json.to_string()
    } else {
        String::new()
    }
}

fn mod_ugly(json: &str, _arg: &str) -> String {
    pretty::ugly(json)
}

// Indent and prefix arguments are reduced to their whitespace characters
// so a hostile argument cannot inject structure into the output.
fn clean_ws(s: &str) -> String {
    s.chars()
        .filter(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
        .collect()
}

fn mod_pretty(json: &str, arg: &str) -> String {
    if arg.is_empty() {
        return pretty::pretty(json);
    }
    let mut style = pretty::Style::default();
    let indent = get(arg, "indent");
    let prefix = get(arg, "prefix");
    let sort_keys = get(arg, "sortKeys");
    let width = get(arg, "width");
    if indent.exists() {
        style.indent = clean_ws(&indent.string());
    }
    if prefix.exists() {
        style.prefix = clean_ws(&prefix.string());
    }
    if sort_keys.exists() {
        style.sort_keys = sort_keys.bool();
    }
    if width.exists() {
        style.width = width.i64().max(0) as usize;
    }
    pretty::pretty_with(json, &style)
}

fn mod_reverse(json: &str, _arg: &str) -> String {
    let res = parse(json);
    if res.is_array() {
        let mut elems: Vec<Value> = Vec::new();
        res.each(|_, v| {
            elems.push(v);
            true
        });
        let mut out = String::with_capacity(json.len());
        out.push('[');
        for (j, v) in elems.iter().rev().enumerate() {
            if j > 0 {
                out.push(',');
            }
            out.push_str(v.raw());
        }
        out.push(']');
        return out;
    }
    if res.is_object() {
        let mut pairs: Vec<(Value, Value)> = Vec::new();
        res.each(|k, v| {
            pairs.push((k, v));
            true
        });
        let mut out = String::with_capacity(json.len());
        out.push('{');
        for (j, (k, v)) in pairs.iter().rev().enumerate() {
            if j > 0 {
                out.push(',');
            }
            out.push_str(k.raw());
            out.push(':');
            out.push_str(v.raw());
        }
        out.push('}');
        return out;
    }
    json.to_string()
}

// Strips the surrounding brackets from an array or object fragment.
fn unwrap_block(json: &str) -> &str {
    let t = json.trim();
    let tb = t.as_bytes();
    if t.len() >= 2 && (tb[0] == b'[' || tb[0] == b'{') {
        &t[1..t.len() - 1]
    } else {
        t
    }
}

// @flatten splices nested arrays into their parent:
//   [1,[2],[3,4],[5,[6,7]]] -> [1,2,3,4,5,[6,7]]
// and with {"deep":true} recurses:
//   [1,[2],[3,4],[5,[6,7]]] -> [1,2,3,4,5,6,7]
fn mod_flatten(json: &str, arg: &str) -> String {
    let res = parse(json);
    if !res.is_array() {
        return json.to_string();
    }
    let deep = !arg.is_empty() && get(arg, "deep").bool();
    let mut out = String::with_capacity(json.len());
    out.push('[');
    let mut idx = 0;
    res.each(|_, v| {
        let flat;
        let raw = if v.is_array() {
            if deep {
                flat = mod_flatten(v.raw(), arg);
                unwrap_block(&flat).trim().to_string()
            } else {
                unwrap_block(v.raw()).trim().to_string()
            }
        } else {
            v.raw().trim().to_string()
        };
        if !raw.is_empty() {
            if idx > 0 {
                out.push(',');
            }
            out.push_str(&raw);
            idx += 1;
        }
        true
    });
    out.push(']');
    out
}

// @join merges an array of objects into one object. By default duplicate
// keys collapse to the last value while keeping each key's first-appearance
// position; {"preserve":true} keeps every member verbatim.
fn mod_join(json: &str, arg: &str) -> String {
    let res = parse(json);
    if !res.is_array() {
        return json.to_string();
    }
    let preserve = !arg.is_empty() && get(arg, "preserve").bool();
    let mut out = String::with_capacity(json.len());
    out.push('{');
    if preserve {
        let mut idx = 0;
        res.each(|_, v| {
            if !v.is_object() {
                return true;
            }
            if idx > 0 {
                out.push(',');
            }
            out.push_str(unwrap_block(v.raw()));
            idx += 1;
            true
        });
    } else {
        let mut order: Vec<String> = Vec::new();
        let mut merged: HashMap<String, (String, String)> = HashMap::new();
        res.each(|_, v| {
            if !v.is_object() {
                return true;
            }
            v.each(|k, val| {
                let key = k.str().to_string();
                match merged.get_mut(&key) {
                    Some(slot) => slot.1 = val.raw().to_string(),
                    None => {
                        order.push(key.clone());
                        merged.insert(key, (k.raw().to_string(), val.raw().to_string()));
                    }
                }
                true
            });
            true
        });
        for (j, key) in order.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            if let Some((kraw, vraw)) = merged.get(key) {
                out.push_str(kraw);
                out.push(':');
                out.push_str(vraw);
            }
        }
    }
    out.push('}');
    out
}

// @keys of {"first":"Tom","last":"Smith"} -> ["first","last"]
fn mod_keys(json: &str, _arg: &str) -> String {
    let v = parse(json);
    if !v.exists() {
        return "[]".to_string();
    }
    let obj = v.is_object();
    let mut out = String::from("[");
    let mut i = 0;
    v.each(|key, _| {
        if i > 0 {
            out.push(',');
        }
        if obj {
            out.push_str(key.raw());
        } else {
            out.push_str("null");
        }
        i += 1;
        true
    });
    out.push(']');
    out
}

// @values of {"first":"Tom","last":"Smith"} -> ["Tom","Smith"]
fn mod_values(json: &str, _arg: &str) -> String {
    let v = parse(json);
    if !v.exists() {
        return "[]".to_string();
    }
    if v.is_array() {
        return json.to_string();
    }
    let mut out = String::from("[");
    let mut i = 0;
    v.each(|_, value| {
        if i > 0 {
            out.push(',');
        }
        out.push_str(value.raw());
        i += 1;
        true
    });
    out.push(']');
    out
}

// @tostr wraps the whole input in a JSON string literal.
fn mod_tostr(json: &str, _arg: &str) -> String {
    let mut out = Vec::with_capacity(json.len() + 2);
    append_json_string(&mut out, json);
    into_string(out)
}

// @fromstr reparses a JSON string whose content is itself JSON.
fn mod_fromstr(json: &str, _arg: &str) -> String {
    if !valid(json) {
        return String::new();
    }
    parse(json).string().into_owned()
}

// @group pivots {"k1":[a,b],"k2":[c,d]} into [{"k1":a,"k2":c},{"k1":b,"k2":d}].
fn mod_group(json: &str, _arg: &str) -> String {
    let res = parse(json);
    if !res.is_object() {
        return String::new();
    }
    let mut rows: Vec<String> = Vec::new();
    res.each(|key, value| {
        if !value.is_array() {
            return true;
        }
        let mut idx = 0;
        value.each(|_, v| {
            if idx == rows.len() {
                rows.push(String::new());
            }
            rows[idx].push(',');
            rows[idx].push_str(key.raw());
            rows[idx].push(':');
            rows[idx].push_str(v.raw());
            idx += 1;
            true
        });
        true
    });
    let mut out = String::from("[");
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('{');
        out.push_str(&row[1..]);
        out.push('}');
    }
    out.push(']');
    out
}

// @dig:path collects every value in the document whose sub-path exists,
// by recursive descent.
fn mod_dig(json: &str, arg: &str) -> String {
    let mut found: Vec<String> = Vec::new();
    dig_into(&parse(json), arg, &mut found);
    let mut out = String::from("[");
    for (i, raw) in found.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(raw);
    }
    out.push(']');
    out
}

fn dig_into(parent: &Value, path: &str, found: &mut Vec<String>) {
    let res = parent.get(path);
    if res.exists() {
        found.push(res.raw().to_string());
    }
    if parent.is_array() || parent.is_object() {
        parent.each(|_, v| {
            dig_into(&v, path, found);
            true
        });
    }
}
