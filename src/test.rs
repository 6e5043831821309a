// Copyright 2021 Joshua J Baker. All rights reserved.
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file.

use super::*;

const EXAMPLE: &str = r#"
{
  "name": {"first": "Tom", "last": "Anderson"},
  "age":37,
  "children": ["Sara","Alex","Jack"],
  "fav.movie": "Deer Hunter",
  "friends": [
    {"first": "James", "last": "Murphy", "age": 44, "nets": ["ig", "fb", "tw"]},
    {"first": "Roger", "last": "Craig", "age": 68, "nets": ["fb", "tw"]}
  ]
}
"#;

#[test]
fn scalars() {
    let res = get(EXAMPLE, "name.last");
    assert_eq!(res.kind(), Kind::String);
    assert_eq!(res.string(), "Anderson");

    let res = get(EXAMPLE, "age");
    assert_eq!(res.kind(), Kind::Number);
    assert_eq!(res.i64(), 37);
    assert_eq!(res.string(), "37");

    assert_eq!(get(EXAMPLE, "children.#").u64(), 3);
    assert_eq!(get(EXAMPLE, "children.1").string(), "Alex");
    assert_eq!(get(EXAMPLE, "child*.2").string(), "Jack");
    assert_eq!(get(EXAMPLE, "c?ildren.0").string(), "Sara");
    assert_eq!(get(EXAMPLE, r"fav\.movie").string(), "Deer Hunter");

    assert!(!get(EXAMPLE, "name.middle").exists());
    assert!(!get(EXAMPLE, "nope.nope.nope").exists());
    assert!(get(r#"{"v":null}"#, "v").exists());
    assert_eq!(get(r#"{"v":null}"#, "v").kind(), Kind::Null);
}

#[test]
fn raw_offsets() {
    for path in ["name", "age", "children", "name.last", "friends.1.first"] {
        let res = get(EXAMPLE, path);
        let ix = res.index().unwrap();
        assert!(EXAMPLE[ix..].starts_with(res.raw()), "offset broken for {}", path);
    }
}

#[test]
fn multi_match() {
    let res = get(EXAMPLE, "friends.#.first");
    assert_eq!(res.raw(), r#"["James","Roger"]"#);
    let ix = res.indexes().unwrap();
    assert_eq!(ix.len(), 2);
    for (i, elem) in res.array().iter().enumerate() {
        assert!(EXAMPLE[ix[i]..].starts_with(elem.raw()));
    }

    // a pipe applies to the collected array, a dot to each element
    assert_eq!(get(EXAMPLE, "friends.#.first|0").string(), "James");
    assert_eq!(get(EXAMPLE, "friends.#.first.0").raw(), "[]");
    assert_eq!(get(EXAMPLE, "friends.#.nets.1").raw(), r#"["fb","tw"]"#);

    // count law
    assert_eq!(
        get(EXAMPLE, "children.#").i64() as usize,
        get(EXAMPLE, "children").array().len()
    );
}

#[test]
fn queries() {
    assert_eq!(get(EXAMPLE, r#"friends.#(last=="Murphy").first"#).string(), "James");
    assert_eq!(get(EXAMPLE, r#"friends.#(last="Murphy").first"#).string(), "James");
    assert_eq!(get(EXAMPLE, "friends.#(age>50)#.first").raw(), r#"["Roger"]"#);
    assert_eq!(get(EXAMPLE, r#"friends.#(first%"J*")#.last"#).raw(), r#"["Murphy"]"#);
    assert_eq!(get(EXAMPLE, r#"friends.#(first!%"J*")#.last"#).raw(), r#"["Craig"]"#);
    assert_eq!(
        get(EXAMPLE, r#"friends.#(nets.#(=="ig"))#.first"#).raw(),
        r#"["James"]"#
    );
    assert_eq!(get(EXAMPLE, "friends.#(last)#.first").indexes().unwrap().len(), 2);

    assert!(!get(EXAMPLE, "friends.#(age>100)").exists());
    let none = get(EXAMPLE, "friends.#(age>100)#");
    assert!(none.exists());
    assert_eq!(none.raw(), "[]");

    assert_eq!(get(r#"["a","b","c"]"#, r#"#(!="a")"#).string(), "b");
    assert_eq!(get(r#"[1,2,3,4]"#, "#(>=3)#").raw(), "[3,4]");

    // piping off an all-query result
    assert_eq!(get(EXAMPLE, r#"friends.#(last="Murphy")#|#"#).i64(), 1);
}

#[test]
fn query_coercions() {
    let json = r#"{"vals":[
        {"a":1,"b":true},
        {"a":2,"b":"true"},
        {"a":3,"b":false},
        {"a":4,"b":"0"},
        {"a":5}
    ]}"#;
    assert_eq!(get(json, "vals.#(b==~true)#.a").raw(), "[1,2]");
    assert_eq!(get(json, "vals.#(b==~false)#.a").raw(), "[3,4,5]");
    assert_eq!(get(json, "vals.#(b==~null)#.a").raw(), "[5]");
    assert_eq!(get(json, "vals.#(b==~*)#.a").raw(), "[1,2,3,4]");
}

#[test]
fn modifiers() {
    assert_eq!(get(EXAMPLE, "@this").raw(), parse(EXAMPLE).raw());

    let u = get(EXAMPLE, "@ugly");
    assert!(!u.raw().contains('\n'));
    assert_eq!(get(u.raw(), "friends.#").i64(), 2);
    let p = get(EXAMPLE, "@pretty.@ugly");
    assert_eq!(p.raw(), u.raw());

    assert_eq!(get(EXAMPLE, "children.@reverse").raw(), r#"["Jack","Alex","Sara"]"#);
    assert_eq!(get(EXAMPLE, "children|@reverse|0").string(), "Jack");
    assert_eq!(get(EXAMPLE, "children.@reverse.0").string(), "Jack");
    // reversing the root object leaves lookups untouched
    assert_eq!(get(EXAMPLE, "@reverse|name.first").string(), "Tom");

    assert_eq!(get("[1,[2],[3,4],[5,[6,7]]]", "@flatten").raw(), "[1,2,3,4,5,[6,7]]");
    assert_eq!(
        get("[1,[2],[3,4],[5,[6,7]]]", r#"@flatten:{"deep":true}"#).raw(),
        "[1,2,3,4,5,6,7]"
    );

    let users = r#"[{"first":"Tom","age":37},{"age":41}]"#;
    assert_eq!(get(users, "@join").raw(), r#"{"first":"Tom","age":41}"#);
    assert_eq!(
        get(users, r#"@join:{"preserve":true}"#).raw(),
        r#"{"first":"Tom","age":37,"age":41}"#
    );

    let pair = r#"{"first":"Tom","last":"Smith"}"#;
    assert_eq!(get(pair, "@keys").raw(), r#"["first","last"]"#);
    assert_eq!(get(pair, "@values").raw(), r#"["Tom","Smith"]"#);
    assert_eq!(get("[1,2]", "@keys").raw(), "[null,null]");
    assert_eq!(get("[1,2]", "@values").raw(), "[1,2]");

    assert_eq!(
        get(r#"{"id":["123","456"],"val":[2,1]}"#, "@group").raw(),
        r#"[{"id":"123","val":2},{"id":"456","val":1}]"#
    );

    assert!(get(r#"{"ok":true}"#, "@valid.ok").bool());
    assert!(!get(r#"{"ok":true,}"#, "@valid.ok").exists());

    assert_eq!(
        get(EXAMPLE, "@dig:last").raw(),
        r#"["Anderson","Murphy","Craig"]"#
    );

    // unregistered names read as plain keys and miss
    assert!(!get(EXAMPLE, "@nope").exists());
}

#[test]
fn string_conversions() {
    let json = r#"{"id":1023,"name":"alert"}"#;
    let quoted = get(json, "@tostr");
    assert_eq!(quoted.kind(), Kind::String);
    assert_eq!(quoted.string(), json);
    assert_eq!(get(json, "@tostr|@fromstr").raw(), json);
    assert_eq!(get(json, "@tostr|@fromstr.name").string(), "alert");
}

#[test]
fn custom_modifiers() {
    add_modifier("shout", |json, _| json.to_ascii_uppercase());
    assert!(modifier_exists("shout"));
    assert!(!modifier_exists("whisper"));
    assert_eq!(
        get(r#"{"children":["sara"]}"#, "children.@shout").raw(),
        r#"["SARA"]"#
    );
}

#[test]
fn multipath() {
    assert_eq!(get(EXAMPLE, "[name.first,age]").raw(), r#"["Tom",37]"#);
    assert_eq!(
        get(EXAMPLE, r#"{"n":name.first,"a":age}"#).raw(),
        r#"{"n":"Tom","a":37}"#
    );
    assert_eq!(
        get(EXAMPLE, "{name.first,age}").raw(),
        r#"{"first":"Tom","age":37}"#
    );
    assert_eq!(get(EXAMPLE, "[name.first,nothere,age]").raw(), r#"["Tom",37]"#);
    assert_eq!(get(EXAMPLE, "[children.0,children.1]|1").string(), "Alex");
    assert_eq!(
        get(EXAMPLE, "{age,[friends.#.first]}").raw(),
        r#"{"age":37,"_":[["James","Roger"]]}"#
    );
}

#[test]
fn statics() {
    let res = get(EXAMPLE, r#"!"hello""#);
    assert_eq!(res.kind(), Kind::String);
    assert_eq!(res.string(), "hello");

    assert_eq!(get(EXAMPLE, "!true").kind(), Kind::True);
    assert_eq!(get(EXAMPLE, "!TRUE").kind(), Kind::True);
    let null = get(EXAMPLE, "!null");
    assert_eq!(null.kind(), Kind::Null);
    assert!(null.exists());
    assert!(get(EXAMPLE, "!nan").f64().is_nan());
    assert_eq!(get(EXAMPLE, r#"!{"a":1}.a"#).i64(), 1);
    assert_eq!(get(EXAMPLE, "!7").i64(), 7);
}

#[test]
fn json_lines() {
    let json = "\n{\"a\": 1 }\n{\"a\": 2 }\ntrue\nfalse\n4\n";
    assert_eq!(get(json, "..#").i64(), 5);
    assert_eq!(get(json, "..0.a").i64(), 1);
    assert_eq!(get(json, "..1.a").i64(), 2);
    assert_eq!(get(json, "..#.a").raw(), "[1,2]");

    let mut count = 0;
    let mut kinds = Vec::new();
    for_each_line(json, |line| {
        count += 1;
        kinds.push(line.kind());
        true
    });
    assert_eq!(count, 5);
    assert_eq!(
        kinds,
        vec![Kind::Json, Kind::Json, Kind::True, Kind::False, Kind::Number]
    );

    let mut first = None;
    for_each_line(json, |line| {
        first = Some(line.raw().to_string());
        false
    });
    assert_eq!(first.as_deref(), Some(r#"{"a": 1 }"#));
}

#[test]
fn values_and_maps() {
    let want: serde_json::Value = serde_json::from_str(EXAMPLE).unwrap();
    assert_eq!(parse(EXAMPLE).value(), want);

    let dup = r#"{"a":1,"a":2}"#;
    assert_eq!(get(dup, "a").i64(), 1);
    assert_eq!(parse(dup).map()["a"].i64(), 1);

    let children = get(EXAMPLE, "children");
    let arr = children.array();
    assert_eq!(arr.len(), 3);
    assert_eq!(arr[2].string(), "Jack");

    // scalars iterate as themselves, null as nothing
    assert_eq!(get(EXAMPLE, "age").array().len(), 1);
    assert_eq!(get(r#"{"v":null}"#, "v").array().len(), 0);

    let mut seen = Vec::new();
    parse(EXAMPLE).each(|key, _| {
        seen.push(key.string().into_owned());
        true
    });
    assert_eq!(seen, vec!["name", "age", "children", "fav.movie", "friends"]);

    let mut stops = 0;
    get(EXAMPLE, "children").each(|_, _| {
        stops += 1;
        false
    });
    assert_eq!(stops, 1);
}

#[test]
fn nested_get() {
    let friends = get(EXAMPLE, "friends");
    let res = friends.get("1.last");
    assert_eq!(res.string(), "Craig");
    let ix = res.index().unwrap();
    assert!(EXAMPLE[ix..].starts_with(res.raw()));

    // idempotence of parse over extracted raw
    let one = get(EXAMPLE, "friends.1");
    assert_eq!(parse(one.raw()).raw(), one.raw());
}

#[test]
fn conversions() {
    assert!(get(r#"{"v":true}"#, "v").bool());
    assert!(get(r#"{"v":"T"}"#, "v").bool());
    assert!(get(r#"{"v":"1"}"#, "v").bool());
    assert!(get(r#"{"v":1}"#, "v").bool());
    assert!(!get(r#"{"v":"false"}"#, "v").bool());
    assert!(!get(r#"{"v":0}"#, "v").bool());

    assert_eq!(get(r#"{"v":"42"}"#, "v").i64(), 42);
    assert_eq!(get(r#"{"v":-1}"#, "v").i64(), -1);
    assert_eq!(get(r#"{"v":-1}"#, "v").u64(), 0);
    assert_eq!(get(r#"{"v":9007199254740993}"#, "v").i64(), 9007199254740993);
    assert_eq!(get(r#"{"v":1e2}"#, "v").string(), "100");
    assert_eq!(get(r#"{"v":10.5}"#, "v").f64(), 10.5);
    assert_eq!(get(r#"{"v":true}"#, "v").i64(), 1);

    let t = get(r#"{"ts":"2014-05-16T08:28:06Z"}"#, "ts").time().unwrap();
    assert_eq!(t.timestamp(), 1400228886);
    assert!(get(r#"{"ts":"not a time"}"#, "ts").time().is_none());
}

#[test]
fn ordering() {
    let docs = [r#"null"#, r#"false"#, r#"3"#, r#""abc""#, r#"true"#, r#"{"a":1}"#];
    let vals: Vec<Value> = docs.iter().map(|d| parse(d)).collect();
    for i in 0..vals.len() {
        for j in 0..vals.len() {
            assert_eq!(vals[i].less(&vals[j], true), i < j, "{} vs {}", i, j);
        }
    }
    assert!(parse(r#""A""#).less(&parse(r#""b""#), false));
    assert!(parse(r#""B""#).less(&parse(r#""a""#), true));
    assert!(parse("2").less(&parse("10"), true));
}

#[test]
fn path_reconstruction() {
    assert_eq!(get(EXAMPLE, "name.last").path(EXAMPLE), "name.last");
    assert_eq!(get(EXAMPLE, "children.1").path(EXAMPLE), "children.1");
    assert_eq!(get(EXAMPLE, "friends.1.age").path(EXAMPLE), "friends.1.age");
    assert_eq!(
        get(EXAMPLE, r"fav\.movie").path(EXAMPLE),
        r"fav\.movie"
    );
    assert_eq!(parse(EXAMPLE).path(EXAMPLE), "@this");

    let res = get(EXAMPLE, "friends.#.first");
    assert_eq!(
        res.paths(EXAMPLE),
        vec!["friends.0.first", "friends.1.first"]
    );
    // synthesized values have no single origin
    assert_eq!(res.path(EXAMPLE), "");
    assert!(get(EXAMPLE, "[name.first,age]").paths(EXAMPLE).is_empty());
}

#[test]
fn escaped_keys() {
    let json = r#"{"fav.movie":"Deer Hunter","user*name":"dug","w?o":"yes"}"#;
    assert_eq!(get(json, &escape("fav.movie")).string(), "Deer Hunter");
    assert_eq!(get(json, &escape("user*name")).string(), "dug");
    assert_eq!(get(json, &escape("w?o")).string(), "yes");
    // unescaped wildcards still glob
    assert_eq!(get(json, "user*name").string(), "dug");
}

#[test]
fn many() {
    let res = get_many(EXAMPLE, &["name.first", "age", "missing"]);
    assert_eq!(res.len(), 3);
    assert_eq!(res[0].string(), "Tom");
    assert_eq!(res[1].i64(), 37);
    assert!(!res[2].exists());
}

#[test]
fn malformed_inputs() {
    // never panic, never lie about existence
    assert!(!get("", "a").exists());
    assert!(!get("{", "a").exists());
    assert!(!get(r#"{"a":"#, "a.b").exists());
    assert!(!get(r#"{"a":"unterminated"#, "a").exists());
    assert_eq!(get("[1,2,3", "#").i64(), 3);
    assert!(!get(r#"{"a":1}"#, "a.b.c.d").exists());
    assert!(!get(EXAMPLE, "friends.#(bad").exists());
    let _ = get("]", "0");
    let _ = get("{{{{", "a.b");
}
