use proptest::prelude::*;
use serde_json::Value as J;

// Recursive document generator: scalars at the leaves, arrays and objects
// with identifier-ish keys above them.
fn arb_json() -> impl Strategy<Value = J> {
    let leaf = prop_oneof![
        Just(J::Null),
        any::<bool>().prop_map(J::Bool),
        (-1_000_000i64..1_000_000).prop_map(J::from),
        (-1.0e9..1.0e9f64).prop_map(|f| serde_json::Number::from_f64(f)
            .map(J::Number)
            .unwrap_or(J::Null)),
        "[a-zA-Z0-9 _.-]{0,12}".prop_map(J::String),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(J::Array),
            prop::collection::btree_map("[a-zA-Z_][a-zA-Z0-9_]{0,8}", inner, 0..6)
                .prop_map(|m| J::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    // Every serialized document validates, projects back to itself, and
    // every direct child is reachable by path with a truthful offset.
    #[test]
    fn roundtrip_and_lookup(doc in arb_json()) {
        let s = serde_json::to_string(&doc).unwrap();
        prop_assert!(sift::valid(&s));
        prop_assert_eq!(sift::parse(&s).value(), doc.clone());
        match &doc {
            J::Object(members) => {
                for (key, want) in members {
                    let escaped = sift::escape(key);
                    let res = sift::get(&s, &escaped);
                    prop_assert!(res.exists());
                    prop_assert_eq!(res.value(), want.clone());
                    if let Some(ix) = res.index() {
                        prop_assert!(s[ix..].starts_with(res.raw()));
                    }
                }
            }
            J::Array(elems) => {
                prop_assert_eq!(sift::get(&s, "#").i64() as usize, elems.len());
                for (i, want) in elems.iter().enumerate() {
                    let key = i.to_string();
                    let res = sift::get(&s, &key);
                    prop_assert_eq!(res.value(), want.clone());
                }
            }
            _ => {}
        }
    }

    // Reformatting through the formatter modifiers never changes the value.
    #[test]
    fn format_identity(doc in arb_json()) {
        let s = serde_json::to_string(&doc).unwrap();
        let pretty = sift::get(&s, "@pretty");
        let ugly = sift::get(&s, "@ugly");
        prop_assert_eq!(pretty.value(), doc.clone());
        prop_assert_eq!(ugly.value(), doc.clone());
        prop_assert!(sift::valid(ugly.raw()));
        prop_assert_eq!(sift::get(&s, "@this").value(), doc);
    }

    // Exotic member names round-trip through escape().
    #[test]
    fn escaped_lookup(key in "[ -~]{1,12}", val in -1000i64..1000) {
        let doc = J::Object([(key.clone(), J::from(val))].into_iter().collect());
        let s = serde_json::to_string(&doc).unwrap();
        let escaped = sift::escape(&key);
        let res = sift::get(&s, &escaped);
        prop_assert!(res.exists());
        prop_assert_eq!(res.i64(), val);
    }

    // Anything the reference parser accepts, the strict validator accepts.
    #[test]
    fn validator_not_stricter(s in r#"[\{\}\[\],:0-9abcdefln "\\ .+eE-]{0,40}"#) {
        if serde_json::from_str::<serde::de::IgnoredAny>(&s).is_ok() {
            prop_assert!(sift::valid(&s));
        }
    }
}
