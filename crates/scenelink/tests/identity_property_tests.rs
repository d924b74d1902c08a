use proptest::prelude::*;
use scenelink::{ReferenceIdentity, Session};
use scenelink_host::{ReferenceRecord, SceneSnapshot, SimulatedHost};
use std::collections::BTreeSet;
use std::sync::Arc;

fn base_path() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9_./ -]{0,24}").unwrap()
}

fn namespace() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9]{0,5}").unwrap()
}

/// Reference trees with distinct sibling namespaces, up to three levels.
fn reference_tree() -> impl Strategy<Value = Vec<ReferenceRecord>> {
    let leaf = proptest::collection::btree_set(namespace(), 0..4)
        .prop_map(|names| names.iter().map(|ns| ReferenceRecord::new("", ns, "")).collect::<Vec<_>>());
    leaf.prop_recursive(3, 24, 4, |inner| {
        proptest::collection::btree_map(namespace(), inner, 0..4).prop_map(|children| {
            children
                .into_iter()
                .map(|(ns, kids)| ReferenceRecord::new("", &ns, "").with_children(kids))
                .collect::<Vec<_>>()
        })
    })
}

/// Give every record its own file and reference node.
fn number_files(list: &mut [ReferenceRecord], next: &mut usize) {
    for r in list {
        r.path = format!("r{next}.ma");
        r.node = format!("r{next}RN");
        *next += 1;
        number_files(&mut r.children, next);
    }
}

fn qualified(list: &[ReferenceRecord], prefix: Option<&str>, out: &mut BTreeSet<String>) {
    for r in list {
        let key = match prefix {
            Some(p) => format!("{p}:{}", r.namespace),
            None => r.namespace.clone(),
        };
        qualified(&r.children, Some(&key), out);
        out.insert(key);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn parse_is_total_and_compose_restores_the_input(raw in ".{0,32}") {
        let id = ReferenceIdentity::parse(&raw);
        prop_assert_eq!(ReferenceIdentity::compose(id.base().as_str(), id.copy_number()), raw);
    }

    #[test]
    fn compose_then_parse_recovers_parts(base in base_path(), n in proptest::option::of(any::<u32>())) {
        let raw = ReferenceIdentity::compose(&base, n);
        let id = ReferenceIdentity::parse(&raw);
        prop_assert_eq!(id.base().as_str(), base.as_str());
        prop_assert_eq!(id.copy_number(), n);
    }

    #[test]
    fn recursive_keys_are_qualified_namespaces(mut tree in reference_tree()) {
        number_files(&mut tree, &mut 0);
        let mut expected = BTreeSet::new();
        qualified(&tree, None, &mut expected);

        let host = Arc::new(SimulatedHost::new(SceneSnapshot {
            references: tree,
            ..Default::default()
        }));
        let session = Session::new(host);
        let graph = session.list_references(true);
        let keys: BTreeSet<String> = graph.keys().map(str::to_string).collect();
        prop_assert_eq!(keys, expected);
    }
}
