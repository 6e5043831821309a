// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

use super::path::{arr_step, obj_step, split_possible_pipe, ArrStep, ObjStep};
use super::scan::{as_str, parse_any, scan_literal, scan_number, scan_squash, scan_string};
use super::text::{into_string, parse_bool, parse_uint, unescape, wild_match};
use super::{elem_get, Kind, Value};

// Shared state of one extraction. The walkers fill `value` on a hit and
// record a trailing pipe for the caller to apply against that value.
// JSON Lines input needs no flag here: entering walk_array at cursor 0
// without a bracket works because end-of-input doubles as ']'.
pub(crate) struct Ctx<'a> {
    pub json: &'a [u8],
    pub value: Value<'a>,
    pub pipe: &'a [u8],
    pub piped: bool,
}

impl<'a> Ctx<'a> {
    pub fn new(json: &'a [u8]) -> Ctx<'a> {
        Ctx {
            json,
            value: Value::default(),
            pipe: b"",
            piped: false,
        }
    }
}

fn key_match(key_raw: &[u8], kesc: bool, rp: &ObjStep) -> bool {
    let inner = &key_raw[1..key_raw.len() - 1];
    if kesc {
        let key = unescape(as_str(inner));
        if rp.wild || rp.esc {
            wild_match(rp.part, key.as_bytes())
        } else {
            key.as_bytes() == rp.part
        }
    } else if rp.wild || rp.esc {
        wild_match(rp.part, inner)
    } else {
        inner == rp.part
    }
}

// Walks the members of an object, entered with the cursor just past '{'.
// Scans key, then value; matching keys either terminate the walk (a hit)
// or recurse with the rest of the path. Everything else is squashed.
pub(crate) fn walk_object<'a>(ctx: &mut Ctx<'a>, mut i: usize, path: &'a [u8]) -> (usize, bool) {
    let json = ctx.json;
    let rp = obj_step(path);
    if !rp.more && rp.piped {
        ctx.pipe = rp.pipe;
        ctx.piped = true;
    }
    'members: while i < json.len() {
        let key;
        let kesc;
        loop {
            if i >= json.len() {
                break 'members;
            }
            if json[i] == b'"' {
                let (ni, raw, esc, ok) = scan_string(json, i);
                i = ni;
                if !ok {
                    return (i, false);
                }
                key = raw;
                kesc = esc;
                break;
            }
            if json[i] == b'}' {
                return (i + 1, false);
            }
            i += 1;
        }
        let pmatch = key_match(key, kesc, &rp);
        let hit = pmatch && !rp.more;
        loop {
            if i >= json.len() {
                break 'members;
            }
            let mut num = false;
            match json[i] {
                b'"' => {
                    let s = i;
                    let (ni, val, vesc, ok) = scan_string(json, i);
                    i = ni;
                    if !ok {
                        return (i, false);
                    }
                    if hit {
                        ctx.value = Value::string_at(as_str(val), Some(s), vesc);
                        return (i, true);
                    }
                }
                b'{' => {
                    if pmatch && !hit {
                        let (ni, found) = walk_object(ctx, i + 1, rp.path);
                        i = ni;
                        if found {
                            return (i, true);
                        }
                    } else {
                        let s = i;
                        let (ni, val) = scan_squash(json, i);
                        i = ni;
                        if hit {
                            ctx.value = Value::json_at(as_str(val), Some(s));
                            return (i, true);
                        }
                    }
                }
                b'[' => {
                    if pmatch && !hit {
                        let (ni, found) = walk_array(ctx, i + 1, rp.path);
                        i = ni;
                        if found {
                            return (i, true);
                        }
                    } else {
                        let s = i;
                        let (ni, val) = scan_squash(json, i);
                        i = ni;
                        if hit {
                            ctx.value = Value::json_at(as_str(val), Some(s));
                            return (i, true);
                        }
                    }
                }
                b'n' if i + 1 < json.len() && json[i + 1] != b'u' => num = true,
                b't' | b'f' | b'n' => {
                    let vc = json[i];
                    let s = i;
                    let (ni, val) = scan_literal(json, i);
                    i = ni;
                    if hit {
                        let kind = match vc {
                            b't' => Kind::True,
                            b'f' => Kind::False,
                            _ => Kind::Null,
                        };
                        ctx.value = Value::literal_at(kind, as_str(val), Some(s));
                        return (i, true);
                    }
                }
                b'+' | b'-' | b'0'..=b'9' | b'i' | b'I' | b'N' => num = true,
                _ => {
                    i += 1;
                    continue;
                }
            }
            if num {
                let s = i;
                let (ni, val) = scan_number(json, i);
                i = ni;
                if hit {
                    ctx.value = Value::number_at(as_str(val), Some(s));
                    return (i, true);
                }
            }
            break;
        }
    }
    (i, false)
}

// Evaluates one candidate element against the step's query. On a first-match
// query a hit moves the element (or its sub-path) into ctx.value and stops
// the walk; an all-match query accumulates raw fragments into `multires`.
fn proc_query<'a>(
    ctx: &mut Ctx<'a>,
    rp: &mut ArrStep<'a>,
    qval: Value<'a>,
    multires: &mut Vec<u8>,
    qidx: &mut Vec<usize>,
) -> bool {
    if rp.query.all && multires.is_empty() {
        multires.push(b'[');
    }
    let held;
    let test = if qval.kind() == Kind::Json {
        held = elem_get(&qval, as_str(rp.query.path));
        &held
    } else {
        if !rp.query.path.is_empty() {
            return false;
        }
        &qval
    };
    if !query_matches(rp, test) {
        return false;
    }
    let res = if rp.more {
        if let Some((left, right)) = split_possible_pipe(rp.path) {
            rp.path = left;
            ctx.pipe = right;
            ctx.piped = true;
        }
        elem_get(&qval, as_str(rp.path))
    } else {
        qval
    };
    if rp.query.all {
        let owned;
        let raw = if res.raw().is_empty() {
            owned = res.string().into_owned();
            owned.as_str()
        } else {
            res.raw()
        };
        if !raw.is_empty() {
            if multires.len() > 1 {
                multires.push(b',');
            }
            multires.extend_from_slice(raw.as_bytes());
            qidx.push(res.index().unwrap_or(0));
        }
        false
    } else {
        ctx.value = res;
        true
    }
}

// Walks the elements of an array, entered with the cursor just past '['.
// In `lines` mode there is no enclosing bracket: input ends act as ']' so
// JSON Lines documents walk the same way.
pub(crate) fn walk_array<'a>(ctx: &mut Ctx<'a>, mut i: usize, path: &'a [u8]) -> (usize, bool) {
    let json = ctx.json;
    let mut rp = arr_step(path);
    let mut partidx: i64 = -1;
    if !rp.arrch {
        partidx = parse_uint(as_str(rp.part)).map(|n| n as i64).unwrap_or(-1);
    }
    if !rp.more && rp.piped {
        ctx.pipe = rp.pipe;
        ctx.piped = true;
    }
    let mut h: i64 = 0;
    let mut pmatch = false;
    let mut hit = false;
    let mut alog: Vec<usize> = Vec::new();
    let mut multires: Vec<u8> = Vec::new();
    let mut qidx: Vec<usize> = Vec::new();
    while i <= json.len() {
        if !rp.arrch {
            pmatch = partidx == h;
            hit = pmatch && !rp.more;
        }
        h += 1;
        if rp.alogok {
            alog.push(i);
        }
        loop {
            let ch = if i > json.len() {
                break;
            } else if i == json.len() {
                b']'
            } else {
                json[i]
            };
            let mut num = false;
            match ch {
                b'"' => {
                    let s = i;
                    let (ni, val, vesc, ok) = scan_string(json, i);
                    i = ni;
                    if !ok {
                        return (i, false);
                    }
                    if rp.query.on {
                        let qval = Value::string_at(as_str(val), Some(s), vesc);
                        if proc_query(ctx, &mut rp, qval, &mut multires, &mut qidx) {
                            return (i, true);
                        }
                    } else if hit {
                        ctx.value = Value::string_at(as_str(val), Some(s), vesc);
                        return (i, true);
                    }
                }
                b'{' | b'[' => {
                    if pmatch && !hit {
                        let (ni, found) = if ch == b'{' {
                            walk_object(ctx, i + 1, rp.path)
                        } else {
                            walk_array(ctx, i + 1, rp.path)
                        };
                        i = ni;
                        if found {
                            return (i, true);
                        }
                    } else {
                        let s = i;
                        let (ni, val) = scan_squash(json, i);
                        i = ni;
                        if rp.query.on {
                            let qval = Value::json_at(as_str(val), Some(s));
                            if proc_query(ctx, &mut rp, qval, &mut multires, &mut qidx) {
                                return (i, true);
                            }
                        } else if hit {
                            ctx.value = Value::json_at(as_str(val), Some(s));
                            return (i, true);
                        }
                    }
                }
                b'n' if i + 1 < json.len() && json[i + 1] != b'u' => num = true,
                b't' | b'f' | b'n' => {
                    let vc = json[i];
                    let s = i;
                    let (ni, val) = scan_literal(json, i);
                    i = ni;
                    let kind = match vc {
                        b't' => Kind::True,
                        b'f' => Kind::False,
                        _ => Kind::Null,
                    };
                    if rp.query.on {
                        let qval = Value::literal_at(kind, as_str(val), Some(s));
                        if proc_query(ctx, &mut rp, qval, &mut multires, &mut qidx) {
                            return (i, true);
                        }
                    } else if hit {
                        ctx.value = Value::literal_at(kind, as_str(val), Some(s));
                        return (i, true);
                    }
                }
                b'+' | b'-' | b'0'..=b'9' | b'i' | b'I' | b'N' => num = true,
                b']' => {
                    if rp.arrch && rp.part == b"#" as &[u8] {
                        if rp.alogok {
                            return (i + 1, finish_collect(ctx, &mut rp, &alog));
                        }
                        ctx.value = Value::count((h - 1).max(0) as usize);
                        return (i + 1, true);
                    }
                    if !ctx.value.exists() {
                        if multires.len() > 1 {
                            multires.push(b']');
                            let indexes = if qidx.is_empty() {
                                None
                            } else {
                                Some(std::mem::take(&mut qidx))
                            };
                            ctx.value =
                                Value::owned_json(into_string(std::mem::take(&mut multires)), indexes);
                        } else if rp.query.all {
                            ctx.value = Value::owned_json("[]".to_string(), None);
                        }
                    }
                    return (i + 1, false);
                }
                _ => {
                    i += 1;
                    continue;
                }
            }
            if num {
                let s = i;
                let (ni, val) = scan_number(json, i);
                i = ni;
                if rp.query.on {
                    let qval = Value::number_at(as_str(val), Some(s));
                    if proc_query(ctx, &mut rp, qval, &mut multires, &mut qidx) {
                        return (i, true);
                    }
                } else if hit {
                    ctx.value = Value::number_at(as_str(val), Some(s));
                    return (i, true);
                }
            }
            break;
        }
    }
    (i, false)
}

// Replays a `#.key` walk: every logged element offset is re-tokenized and
// the collect key applied; existing results join a synthetic array whose
// element offsets land in `indexes`.
fn finish_collect<'a>(ctx: &mut Ctx<'a>, rp: &mut ArrStep<'a>, alog: &[usize]) -> bool {
    let json = ctx.json;
    if let Some((left, right)) = split_possible_pipe(rp.alogkey) {
        rp.alogkey = left;
        ctx.pipe = right;
        ctx.piped = true;
    }
    let mut indexes: Vec<usize> = Vec::new();
    let mut out: Vec<u8> = Vec::with_capacity(64);
    out.push(b'[');
    let mut k = 0;
    for &start in alog {
        let mut idx = start;
        while idx < json.len() && json[idx] <= b' ' {
            idx += 1;
        }
        if idx >= json.len() || json[idx] == b']' {
            continue;
        }
        let (_, elem) = parse_any(json, idx, true);
        let elem = match elem {
            Some(v) => v,
            None => continue,
        };
        let sub = elem_get(&elem, as_str(rp.alogkey));
        if !sub.exists() {
            continue;
        }
        if k > 0 {
            out.push(b',');
        }
        if sub.raw().is_empty() {
            out.extend_from_slice(sub.string().as_bytes());
        } else {
            out.extend_from_slice(sub.raw().as_bytes());
        }
        indexes.push(sub.index().unwrap_or(0));
        k += 1;
    }
    out.push(b']');
    ctx.value = Value::owned_json(into_string(out), Some(indexes));
    true
}

fn trueish(v: &Value) -> bool {
    match v.kind() {
        Kind::True => true,
        Kind::String => parse_bool(v.str()) == Some(true),
        Kind::Number => v.f64() != 0.0,
        _ => false,
    }
}

fn falseish(v: &Value) -> bool {
    match v.kind() {
        Kind::Null | Kind::False => true,
        Kind::String => parse_bool(v.str()) == Some(false),
        Kind::Number => v.f64() == 0.0,
        _ => false,
    }
}

fn nullish(v: &Value) -> bool {
    v.kind() == Kind::Null
}

// Decides whether a candidate satisfies the step's predicate. A leading '~'
// on the right-hand value coerces the candidate to a boolean first:
// ~* existence, ~null nullish, ~true truthy, ~false falsy.
pub(crate) fn query_matches(rp: &ArrStep, value: &Value) -> bool {
    let mut rpv: &str = rp.query.value.as_ref();
    let coerced;
    let mut value = value;
    if rpv.starts_with('~') {
        let (ish, known) = match &rpv[1..] {
            "*" => (value.exists(), true),
            "null" => (nullish(value), true),
            "true" => (trueish(value), true),
            "false" => (falseish(value), true),
            _ => (false, false),
        };
        if known {
            rpv = "true";
            coerced = if ish {
                Value::literal_at(Kind::True, "true", None)
            } else {
                Value::literal_at(Kind::False, "false", None)
            };
        } else {
            rpv = "";
            coerced = Value::default();
        }
        value = &coerced;
    }
    if !value.exists() {
        return false;
    }
    let op = rp.query.op;
    if op.is_empty() {
        // bare predicates test existence, e.g. friends.#(name)
        return true;
    }
    match value.kind() {
        Kind::String => {
            let s = value.str();
            match op {
                "=" => s == rpv,
                "!=" => s != rpv,
                "<" => s < rpv,
                "<=" => s <= rpv,
                ">" => s > rpv,
                ">=" => s >= rpv,
                "%" => wild_match(rpv.as_bytes(), s.as_bytes()),
                "!%" => !wild_match(rpv.as_bytes(), s.as_bytes()),
                _ => false,
            }
        }
        Kind::Number => {
            let rhs: f64 = rpv.parse().unwrap_or(0.0);
            let lhs = value.f64();
            match op {
                "=" => lhs == rhs,
                "!=" => lhs != rhs,
                "<" => lhs < rhs,
                "<=" => lhs <= rhs,
                ">" => lhs > rhs,
                ">=" => lhs >= rhs,
                _ => false,
            }
        }
        Kind::True => match op {
            "=" => rpv == "true",
            "!=" => rpv != "true",
            ">" => rpv == "false",
            ">=" => true,
            _ => false,
        },
        Kind::False => match op {
            "=" => rpv == "false",
            "!=" => rpv != "false",
            "<" => rpv == "true",
            "<=" => true,
            _ => false,
        },
        _ => false,
    }
}
