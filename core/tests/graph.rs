use chrono::{TimeZone, Utc};
use rd_core::{
  apply_value, detect_cycle, format_address, segment_ranges, serialize, value_size, CycleResult,
  ItemRange, PathCache, PathSegment, Value, ViewerError,
};

fn empty_object() -> Value {
  Value::object(Vec::<(String, Value)>::new())
}

fn key(k: &str) -> PathSegment {
  PathSegment::Key(k.to_string())
}

fn idx(i: u64) -> PathSegment {
  PathSegment::Index(i)
}

/// `{foo: 1, goo: "string", self: <itself>}`
fn loop_object() -> Value {
  let v = Value::object([("foo", Value::from(1)), ("goo", Value::from("string"))]);
  v.as_node().unwrap().insert("self", v.clone());
  v
}

// --- path resolution ---

#[test]
fn resolve_root_is_empty_path() {
  let root = Value::object([("a", Value::from(1))]);
  let mut cache = PathCache::new();
  let path = cache.resolve(&root, root.as_node().unwrap()).unwrap();
  assert!(path.is_empty());
}

#[test]
fn resolve_starts_with_own_key() {
  let a = Value::object([("x", Value::from(1))]);
  let inner = Value::object([("y", Value::from(2))]);
  let b = Value::array([inner.clone()]);
  let root = Value::object([("a", a.clone()), ("b", b.clone()), ("c", Value::from(3))]);

  let mut cache = PathCache::new();
  assert_eq!(cache.resolve(&root, a.as_node().unwrap()).unwrap(), vec![key("a")]);
  assert_eq!(cache.resolve(&root, b.as_node().unwrap()).unwrap(), vec![key("b")]);
  assert_eq!(
    cache.resolve(&root, inner.as_node().unwrap()).unwrap(),
    vec![key("b"), idx(0)]
  );
}

#[test]
fn resolve_is_idempotent_and_caches_the_chain() {
  let c = Value::object([("leaf", Value::from(true))]);
  let b = Value::object([("c", c.clone())]);
  let a = Value::object([("b", b.clone())]);
  let root = Value::object([("a", a.clone())]);

  let mut cache = PathCache::new();
  let first = cache.resolve(&root, c.as_node().unwrap()).unwrap();
  let second = cache.resolve(&root, c.as_node().unwrap()).unwrap();
  assert_eq!(first, vec![key("a"), key("b"), key("c")]);
  assert_eq!(first, second);

  // intermediates were cached on the way
  assert_eq!(cache.get(a.as_node().unwrap()).unwrap(), vec![key("a")]);
  assert_eq!(cache.get(b.as_node().unwrap()).unwrap(), vec![key("a"), key("b")]);
  assert_eq!(cache.len(), 3);
}

#[test]
fn resolve_does_not_reuse_entries_across_roots() {
  fn build() -> (Value, Value) {
    let inner = Value::object([("v", Value::from(1))]);
    let root = Value::object([("wrap", Value::array([inner.clone()]))]);
    (root, inner)
  }
  let (root_a, inner_a) = build();
  let (root_b, inner_b) = build();

  let mut cache = PathCache::new();
  let path_a = cache.resolve(&root_a, inner_a.as_node().unwrap()).unwrap();
  let generation = cache.generation();

  let path_b = cache.resolve(&root_b, inner_b.as_node().unwrap()).unwrap();
  assert_eq!(path_a, path_b);
  assert!(cache.generation() > generation);
  assert!(cache.is_bound_to(root_b.as_node().unwrap()));
  assert!(cache.get(inner_a.as_node().unwrap()).is_none());

  // A's node is not part of B, so a stale hit would have been wrong.
  let err = cache.resolve(&root_b, inner_a.as_node().unwrap()).unwrap_err();
  assert!(matches!(err, ViewerError::Unreachable));
}

#[test]
fn resolve_shared_reference_takes_first_in_enumeration_order() {
  let shared = Value::object([("v", Value::from(1))]);
  let root = Value::object([
    ("first", Value::object([("deep", shared.clone())])),
    ("second", shared.clone()),
  ]);
  let mut cache = PathCache::new();
  let path = cache.resolve(&root, shared.as_node().unwrap()).unwrap();
  assert_eq!(path, vec![key("first"), key("deep")]);
}

#[test]
fn resolve_terminates_on_cycles() {
  let lo = loop_object();
  let target = Value::array([Value::from(1)]);
  let root = Value::object([
    ("loopObject", lo.clone()),
    ("other", Value::object([("target", target.clone())])),
  ]);
  let mut cache = PathCache::new();
  let path = cache.resolve(&root, target.as_node().unwrap()).unwrap();
  assert_eq!(path, vec![key("other"), key("target")]);

  let path = cache.resolve(&root, lo.as_node().unwrap()).unwrap();
  assert_eq!(path, vec![key("loopObject")]);
}

#[test]
fn resolve_walks_deep_chains_without_recursion() {
  let leaf = Value::object([("end", Value::from(true))]);
  let mut current = leaf.clone();
  for _ in 0..10_000 {
    current = Value::array([current]);
  }
  let root = current;
  let mut cache = PathCache::new();
  let path = cache.resolve(&root, leaf.as_node().unwrap()).unwrap();
  assert_eq!(path.len(), 10_000);
  assert!(path.iter().all(|s| *s == idx(0)));

  // one entry per node below the root, each rebuilt from its parent link
  assert_eq!(cache.len(), 10_000);
  let mid = root.lookup(&vec![idx(0); 5_000]).unwrap();
  assert_eq!(cache.get(mid.as_node().unwrap()).unwrap().len(), 5_000);
  assert_eq!(cache.resolve(&root, leaf.as_node().unwrap()).unwrap(), path);
}

#[test]
fn resolve_reuses_cached_intermediates() {
  let c = Value::object([("leaf", Value::from(true))]);
  let b = Value::object([("c", c.clone())]);
  let root = Value::object([("a", Value::object([("b", b.clone())]))]);
  let mut cache = PathCache::new();
  cache.resolve(&root, c.as_node().unwrap()).unwrap();

  let d = Value::array(Vec::new());
  b.as_node().unwrap().insert("d", d.clone());
  assert_eq!(
    cache.resolve(&root, d.as_node().unwrap()).unwrap(),
    vec![key("a"), key("b"), key("d")]
  );
  assert_eq!(cache.len(), 4);
}

#[test]
fn prune_drops_entries_of_dead_nodes() {
  let gone = Value::object([("v", Value::from(1))]);
  let kept = Value::object([("v", Value::from(2))]);
  let root = Value::object([("gone", gone.clone()), ("kept", kept.clone())]);
  let mut cache = PathCache::new();
  cache.resolve(&root, gone.as_node().unwrap()).unwrap();
  cache.resolve(&root, kept.as_node().unwrap()).unwrap();
  assert_eq!(cache.len(), 2);

  apply_value(root.clone(), &[key("gone")], Value::Null).unwrap();
  drop(gone);
  assert_eq!(cache.prune(), 1);
  assert_eq!(cache.len(), 1);
  assert_eq!(cache.get(kept.as_node().unwrap()).unwrap(), vec![key("kept")]);
}

#[test]
fn resolve_rejects_scalar_root_and_unreachable_target() {
  let target = empty_object();
  let mut cache = PathCache::new();
  let err = cache.resolve(&Value::from(1), target.as_node().unwrap()).unwrap_err();
  assert!(matches!(err, ViewerError::InvalidRoot));

  let root = Value::object([("a", Value::from(1))]);
  let err = cache.resolve(&root, target.as_node().unwrap()).unwrap_err();
  assert!(matches!(err, ViewerError::Unreachable));
}

#[test]
fn resolve_descends_into_maps_and_sets() {
  let in_map = Value::object([("m", Value::from(1))]);
  let in_set = Value::array(Vec::new());
  let root = Value::object([
    ("map", Value::map([(Value::from("k"), in_map.clone())])),
    ("set", Value::set([Value::from(1), in_set.clone()])),
  ]);
  let mut cache = PathCache::new();
  assert_eq!(
    cache.resolve(&root, in_map.as_node().unwrap()).unwrap(),
    vec![key("map"), idx(0)]
  );
  assert_eq!(
    cache.resolve(&root, in_set.as_node().unwrap()).unwrap(),
    vec![key("set"), idx(1)]
  );
}

// --- cycle detection ---

#[test]
fn detect_direct_self_reference() {
  let value = Value::object([("a", Value::from(1))]);
  value.as_node().unwrap().insert("self", value.clone());
  assert_eq!(
    detect_cycle(&value, &[key("self")], &value),
    CycleResult::DirectSelfReference
  );
  // the root shown as itself is not a cycle
  assert_eq!(detect_cycle(&value, &[], &value), CycleResult::NotApplicable);
}

#[test]
fn detect_reports_first_ancestor_address() {
  let lo = loop_object();
  let root = Value::object([("loopObject", lo.clone())]);
  assert_eq!(
    detect_cycle(&root, &[key("loopObject"), key("self")], &lo),
    CycleResult::ReachableAt("loopObject".into())
  );

  let inner = Value::object([("x", Value::from(1))]);
  inner.as_node().unwrap().insert("back", inner.clone());
  let root = Value::object([("list", Value::array([inner.clone()]))]);
  let res = detect_cycle(&root, &[key("list"), idx(0), key("back")], &inner);
  assert_eq!(res, CycleResult::ReachableAt("list[0]".into()));
  assert_eq!(res.address(), Some("list[0]"));
}

#[test]
fn detect_shallowest_match_wins() {
  let a = empty_object();
  let b = Value::object([("child", a.clone())]);
  a.as_node().unwrap().insert("child", b.clone());
  let root = Value::object([("a", a.clone())]);
  assert_eq!(
    detect_cycle(&root, &[key("a"), key("child"), key("child")], &a),
    CycleResult::ReachableAt("a".into())
  );
}

#[test]
fn detect_not_applicable_cases() {
  let inner = Value::object([("x", Value::from(1))]);
  let root = Value::object([("list", Value::array([inner.clone()]))]);

  // value at its own location
  assert_eq!(
    detect_cycle(&root, &[key("list"), idx(0)], &inner),
    CycleResult::NotApplicable
  );
  // dead path
  assert_eq!(
    detect_cycle(&root, &[key("missing"), key("x")], &inner),
    CycleResult::NotApplicable
  );
  // scalars on either side
  assert_eq!(detect_cycle(&Value::Null, &[key("a")], &inner), CycleResult::NotApplicable);
  assert_eq!(detect_cycle(&root, &[key("a")], &Value::from(1)), CycleResult::NotApplicable);
  assert!(!CycleResult::NotApplicable.is_cycle());
}

#[test]
fn address_formatting() {
  assert_eq!(format_address(&[key("a"), idx(0), key("b")]), "a[0].b");
  assert_eq!(format_address(&[idx(0), key("x")]), "[0].x");
  assert_eq!(format_address(&[]), "");
}

// --- serializer ---

#[test]
fn serialize_replaces_cycles_with_marker() {
  let value = Value::object([("a", Value::from(1)), ("b", Value::Undefined)]);
  value.as_node().unwrap().insert("b", value.clone());
  assert_eq!(serialize(&value), r####"{"a":1,"b":"###_Circular_###"}"####);
}

#[test]
fn serialize_plain_object() {
  let value = Value::object([("a", Value::from(1))]);
  assert_eq!(serialize(&value), r#"{"a":1}"#);
}

#[test]
fn serialize_writes_shared_siblings_in_full() {
  let shared = Value::object([("v", Value::from(1))]);
  let value = Value::object([("x", shared.clone()), ("y", shared)]);
  assert_eq!(serialize(&value), r#"{"x":{"v":1},"y":{"v":1}}"#);
}

#[test]
fn serialize_marks_deep_back_references() {
  let root = empty_object();
  let child = Value::object([("up", root.clone())]);
  root.as_node().unwrap().insert("child", child);
  assert_eq!(serialize(&root), r####"{"child":{"up":"###_Circular_###"}}"####);
}

#[test]
fn serialize_drops_functions_and_undefined() {
  let f = Value::function(Some("aPlusB"), "function aPlusB (a, b) { return a + b }");
  let value = Value::object([
    ("a", Value::from(1)),
    ("fn", f.clone()),
    ("u", Value::Undefined),
    ("list", Value::array([Value::from(1), f, Value::Undefined])),
  ]);
  assert_eq!(serialize(&value), r#"{"a":1,"list":[1,null,null]}"#);
  assert_eq!(serialize(&Value::Undefined), "null");
}

#[test]
fn serialize_scalars() {
  let date = Utc.with_ymd_and_hms(2022, 9, 13, 19, 7, 44).unwrap();
  let value = Value::object([
    ("float", Value::from(114.514)),
    ("int", Value::from(42.0)),
    ("nan", Value::Number(f64::NAN)),
    ("inf", Value::Number(f64::INFINITY)),
    ("big", Value::BigInt(123_456_789_087_654_321)),
    ("date", Value::from(date)),
    ("null", Value::Null),
    ("s", Value::from("str")),
  ]);
  assert_eq!(
    serialize(&value),
    r#"{"float":114.514,"int":42,"nan":null,"inf":null,"big":"123456789087654321","date":"2022-09-13T19:07:44.000Z","null":null,"s":"str"}"#
  );
}

#[test]
fn serialize_maps_and_sets() {
  let value = Value::object([
    (
      "map",
      Value::map([
        (Value::from("foo"), Value::from(1)),
        (Value::from(1), Value::from("x")),
      ]),
    ),
    ("set", Value::set([Value::from(1), Value::from(2), Value::from(2), Value::from(3)])),
  ]);
  assert_eq!(serialize(&value), r#"{"map":{"foo":1,"1":"x"},"set":[1,2,3]}"#);
}

#[test]
fn serialize_deep_nesting_without_recursion() {
  let mut current = Value::from(1);
  for _ in 0..10_000 {
    current = Value::array([current]);
  }
  let text = serialize(&current);
  assert_eq!(text.len(), 20_001);
  assert!(text.starts_with("[[[") && text.ends_with("1]]]"));

  // a back-reference at the bottom of a deep chain
  let root = Value::array(Vec::new());
  let mut tail = root.clone();
  for _ in 0..10_000 {
    let next = Value::array(Vec::new());
    apply_value(tail, &[idx(0)], next.clone()).unwrap();
    tail = next;
  }
  apply_value(tail, &[idx(0)], root.clone()).unwrap();
  let expected = format!("{}\"###_Circular_###\"{}", "[".repeat(10_001), "]".repeat(10_001));
  assert_eq!(serialize(&root), expected);
}

#[test]
fn serialize_map_with_container_key() {
  let key_obj = Value::object([("id", Value::from(1))]);
  let value = Value::map([(key_obj, Value::from("x"))]);
  assert_eq!(serialize(&value), r#"{"{\"id\":1}":"x"}"#);
}

// --- mutation ---

#[test]
fn apply_rejects_proto_key() {
  let root = empty_object();
  let polluted = Value::object([("polluted", Value::from(true))]);
  let err = apply_value(root.clone(), &[key("__proto__")], polluted.clone()).unwrap_err();
  assert!(matches!(err, ViewerError::ForbiddenKey(_)));
  assert_eq!(value_size(&root), 0);

  let root = Value::object([("a", empty_object())]);
  let err = apply_value(root.clone(), &[key("a"), key("__proto__")], polluted).unwrap_err();
  assert!(matches!(err, ViewerError::ForbiddenKey(_)));
  assert_eq!(serialize(&root), r#"{"a":{}}"#);
}

#[test]
fn apply_empty_path_replaces_whole_value() {
  let out = apply_value(Value::object([("a", Value::from(1))]), &[], Value::from(42)).unwrap();
  assert_eq!(out, Value::from(42));
  let out = apply_value(Value::from("x"), &[], Value::from(42)).unwrap();
  assert_eq!(out, Value::from(42));
}

#[test]
fn apply_mutates_in_place_and_returns_same_root() {
  let root = Value::object([("a", Value::object([("b", Value::from(1))]))]);
  let out = apply_value(root.clone(), &[key("a"), key("b")], Value::from(2)).unwrap();
  assert!(out.is(&root));
  assert_eq!(root.lookup(&[key("a"), key("b")]), Some(Value::from(2)));
}

#[test]
fn apply_rejects_invalid_paths() {
  let err = apply_value(Value::from(1), &[key("a")], Value::from(2)).unwrap_err();
  assert!(matches!(err, ViewerError::InvalidPath(_)));

  let root = Value::object([("a", Value::from(1))]);
  let err = apply_value(root.clone(), &[key("a"), key("b")], Value::from(2)).unwrap_err();
  assert!(matches!(err, ViewerError::InvalidPath(_)));

  let list = Value::array([Value::from(1)]);
  let err = apply_value(list.clone(), &[key("x")], Value::from(2)).unwrap_err();
  assert!(matches!(err, ViewerError::InvalidPath(_)));
  assert_eq!(serialize(&list), "[1]");
}

#[test]
fn apply_appends_and_updates_maps() {
  let list = Value::array([Value::from(1)]);
  apply_value(list.clone(), &[idx(1)], Value::from(2)).unwrap();
  assert_eq!(serialize(&list), "[1,2]");

  let map = Value::map([(Value::from("foo"), Value::from(1))]);
  apply_value(map.clone(), &[key("foo")], Value::from(5)).unwrap();
  apply_value(map.clone(), &[key("bar")], Value::from(6)).unwrap();
  apply_value(map.clone(), &[idx(0)], Value::from(7)).unwrap();
  assert_eq!(serialize(&map), r#"{"foo":7,"bar":6}"#);
}

#[test]
fn apply_past_the_end_pads_with_undefined() {
  let list = Value::array([Value::from(1)]);
  apply_value(list.clone(), &[idx(3)], Value::from(9)).unwrap();
  assert_eq!(value_size(&list), 4);
  assert_eq!(list.lookup(&[idx(1)]), Some(Value::Undefined));
  assert_eq!(list.lookup(&[idx(2)]), Some(Value::Undefined));
  assert_eq!(list.lookup(&[idx(3)]), Some(Value::from(9)));
  assert_eq!(serialize(&list), "[1,null,null,9]");

  let err = apply_value(list.clone(), &[idx(u64::from(u32::MAX))], Value::from(1)).unwrap_err();
  assert!(matches!(err, ViewerError::InvalidPath(_)));
  assert_eq!(value_size(&list), 4);
}

#[test]
fn apply_through_a_cycle() {
  let lo = loop_object();
  apply_value(lo.clone(), &[key("self"), key("self"), key("foo")], Value::from(9)).unwrap();
  assert_eq!(lo.lookup(&[key("foo")]), Some(Value::from(9)));
}

// --- size ---

#[test]
fn size_estimates() {
  assert_eq!(value_size(&Value::array([Value::from(1), Value::from(2), Value::from(3)])), 3);
  assert_eq!(value_size(&empty_object()), 0);
  assert_eq!(value_size(&Value::map([(Value::from(1), Value::from(2))])), 1);
  assert_eq!(value_size(&Value::from("abc")), 3);
  assert_eq!(value_size(&Value::from("héllo")), 5);
  assert_eq!(value_size(&Value::Null), 0);
  assert_eq!(value_size(&Value::Undefined), 0);
  assert_eq!(value_size(&Value::from(Utc::now())), 1);
  assert_eq!(value_size(&Value::from(7)), 1);
  assert_eq!(value_size(&Value::function(None, "() => 1")), 1);
  assert_eq!(value_size(&Value::set([Value::from(1), Value::from(2)])), 2);
  // depth 1 only
  assert_eq!(value_size(&Value::array([Value::array([Value::from(1), Value::from(2)])])), 1);
}

#[test]
fn segment_long_arrays() {
  assert_eq!(
    segment_ranges(250, 100),
    vec![
      ItemRange { start: 0, end: 100 },
      ItemRange { start: 100, end: 200 },
      ItemRange { start: 200, end: 250 },
    ]
  );
  assert_eq!(segment_ranges(5, 100), vec![ItemRange { start: 0, end: 5 }]);
  assert!(segment_ranges(0, 100).is_empty());
}
