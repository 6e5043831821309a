// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

// A strict RFC 8259 recursive-descent check. This is the only place in the
// crate that cares about conformance; the extraction engine itself stays
// permissive.

/// Returns true if the input is valid JSON.
///
/// ```
/// assert!(sift::valid(r#"{"name":"Tom","age":37}"#));
/// assert!(!sift::valid(r#"{"name":"Tom",}"#));
/// ```
pub fn valid(json: &str) -> bool {
    valid_bytes(json.as_bytes())
}

/// Byte-slice form of [`valid`], for payloads not yet checked as UTF-8.
pub fn valid_bytes(data: &[u8]) -> bool {
    let (ok, i) = chk_value(data, 0);
    ok && data[i..].iter().all(|&c| is_ws(c))
}

fn is_ws(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r')
}

fn skip_ws(data: &[u8], mut i: usize) -> usize {
    while i < data.len() && is_ws(data[i]) {
        i += 1;
    }
    i
}

fn chk_value(data: &[u8], i: usize) -> (bool, usize) {
    let i = skip_ws(data, i);
    if i >= data.len() {
        return (false, i);
    }
    match data[i] {
        b'{' => chk_object(data, i),
        b'[' => chk_array(data, i),
        b'"' => chk_string(data, i),
        b't' => chk_word(data, i, b"true"),
        b'f' => chk_word(data, i, b"false"),
        b'n' => chk_word(data, i, b"null"),
        b'-' | b'0'..=b'9' => chk_number(data, i),
        _ => (false, i),
    }
}

fn chk_word(data: &[u8], i: usize, word: &[u8]) -> (bool, usize) {
    if data.len() - i >= word.len() && &data[i..i + word.len()] == word {
        (true, i + word.len())
    } else {
        (false, i)
    }
}

fn chk_object(data: &[u8], mut i: usize) -> (bool, usize) {
    i = skip_ws(data, i + 1);
    if i >= data.len() {
        return (false, i);
    }
    if data[i] == b'}' {
        return (true, i + 1);
    }
    loop {
        if data[i] != b'"' {
            return (false, i);
        }
        let (ok, ni) = chk_string(data, i);
        if !ok {
            return (false, i);
        }
        i = skip_ws(data, ni);
        if i >= data.len() || data[i] != b':' {
            return (false, i);
        }
        let (ok, ni) = chk_value(data, i + 1);
        if !ok {
            return (false, i);
        }
        i = skip_ws(data, ni);
        if i >= data.len() {
            return (false, i);
        }
        match data[i] {
            b'}' => return (true, i + 1),
            b',' => {}
            _ => return (false, i),
        }
        i = skip_ws(data, i + 1);
        if i >= data.len() {
            return (false, i);
        }
    }
}

fn chk_array(data: &[u8], mut i: usize) -> (bool, usize) {
    i = skip_ws(data, i + 1);
    if i >= data.len() {
        return (false, i);
    }
    if data[i] == b']' {
        return (true, i + 1);
    }
    loop {
        let (ok, ni) = chk_value(data, i);
        if !ok {
            return (false, i);
        }
        i = skip_ws(data, ni);
        if i >= data.len() {
            return (false, i);
        }
        match data[i] {
            b']' => return (true, i + 1),
            b',' => i += 1,
            _ => return (false, i),
        }
    }
}

fn chk_string(data: &[u8], mut i: usize) -> (bool, usize) {
    i += 1;
    while i < data.len() {
        match data[i] {
            c if c < 0x20 => return (false, i),
            b'"' => return (true, i + 1),
            b'\\' => {
                i += 1;
                if i >= data.len() {
                    return (false, i);
                }
                match data[i] {
                    b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => {}
                    b'u' => {
                        if data.len() - i < 5 {
                            return (false, i);
                        }
                        if !data[i + 1..i + 5].iter().all(|c| c.is_ascii_hexdigit()) {
                            return (false, i);
                        }
                        i += 4;
                    }
                    _ => return (false, i),
                }
            }
            _ => {}
        }
        i += 1;
    }
    (false, i)
}

fn chk_number(data: &[u8], mut i: usize) -> (bool, usize) {
    if data[i] == b'-' {
        i += 1;
    }
    // int: a single zero or a nonzero-led digit run
    if i >= data.len() || !data[i].is_ascii_digit() {
        return (false, i);
    }
    if data[i] == b'0' {
        i += 1;
    } else {
        while i < data.len() && data[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < data.len() && data[i] == b'.' {
        i += 1;
        if i >= data.len() || !data[i].is_ascii_digit() {
            return (false, i);
        }
        while i < data.len() && data[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < data.len() && (data[i] == b'e' || data[i] == b'E') {
        i += 1;
        if i < data.len() && (data[i] == b'+' || data[i] == b'-') {
            i += 1;
        }
        if i >= data.len() || !data[i].is_ascii_digit() {
            return (false, i);
        }
        while i < data.len() && data[i].is_ascii_digit() {
            i += 1;
        }
    }
    (true, i)
}
