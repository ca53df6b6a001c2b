use std::sync::Arc;

use collection_literals::btree;
use structflex_engine::model::{
    ConversionError, Diagnostics, DomainObject, DomainStruct, DomainType, DomainValue, FieldTag,
    WireObject, WireStruct, WireType, WireValue,
};
use structflex_engine::{Engine, ErrorMode, Options};

fn externalize(
    engine: &Engine,
    source: &DomainObject,
    def: &Arc<WireStruct>,
    opts: &Options,
) -> (WireObject, Diagnostics) {
    let mut target = WireValue::pointer_to(WireObject::zero(def.clone()));
    let diags = engine.externalize(&DomainValue::object(source.clone()), &mut target, opts);
    (target.as_struct().unwrap().clone(), diags)
}

fn internalize(
    engine: &Engine,
    source: &WireObject,
    def: &Arc<DomainStruct>,
    opts: &Options,
) -> (DomainObject, Diagnostics) {
    let mut target = DomainValue::object(DomainObject::new(def.clone()));
    let diags = engine.internalize(&WireValue::pointer_to(source.clone()), &mut target, opts);
    (target.as_object().unwrap().clone(), diags)
}

fn wire(def: &Arc<WireStruct>, fields: Vec<(&str, WireValue)>) -> WireObject {
    let mut obj = WireObject::zero(def.clone());
    for (name, value) in fields {
        obj.set(name, value).unwrap();
    }
    obj
}

fn domain(def: &Arc<DomainStruct>, fields: Vec<(&str, DomainValue)>) -> DomainObject {
    let mut obj = DomainObject::new(def.clone());
    for (name, value) in fields {
        obj.set(name, value).unwrap();
    }
    obj
}

fn ptr_i32(v: i32) -> WireValue {
    WireValue::pointer(WireValue::Int32(v))
}

fn ptr_i64(v: i64) -> WireValue {
    WireValue::pointer(WireValue::Int64(v))
}

fn ptr_bool(v: bool) -> WireValue {
    WireValue::pointer(WireValue::Bool(v))
}

fn string_set<const N: usize>(items: [&str; N]) -> DomainValue {
    DomainValue::set(DomainValue::strings(items))
}

// Rule 1: a set carried by a wrapper with only a sequence and a count.

struct Firewall {
    domain: Arc<DomainStruct>,
    wire: Arc<WireStruct>,
    ports: Arc<WireStruct>,
}

fn firewall(tag: FieldTag) -> Firewall {
    let ports = WireStruct::new("PortList")
        .field("Items", WireType::slice(WireType::String))
        .field("Quantity", WireType::pointer(WireType::Int32))
        .build();
    let wire = WireStruct::new("Firewall")
        .field("Name", WireType::pointer(WireType::String))
        .field("Ports", WireType::pointer(WireType::Struct(ports.clone())))
        .build();
    let domain = DomainStruct::new("Firewall")
        .field("Name", DomainType::String)
        .tagged_field("Ports", DomainType::set(DomainType::String), tag)
        .build();
    Firewall {
        domain,
        wire,
        ports,
    }
}

#[test]
fn test_scenario_a_set_through_wrapper() {
    let engine = Engine::new();
    let opts = Options::default();
    let fw = firewall(FieldTag::default());
    let source = domain(&fw.domain, vec![("Ports", string_set(["item1", "item2"]))]);

    let (out, diags) = externalize(&engine, &source, &fw.wire, &opts);
    assert!(diags.is_empty(), "{}", diags);
    let expected = wire(
        &fw.ports,
        vec![
            ("Items", WireValue::strings(["item1", "item2"])),
            ("Quantity", ptr_i32(2)),
        ],
    );
    assert_eq!(out.get("Ports"), Some(&WireValue::pointer_to(expected)));
    assert_eq!(out.get("Name"), Some(&WireValue::Nil));

    let (back, diags) = internalize(&engine, &out, &fw.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(back, source);
}

#[test]
fn test_declared_wrapper_matches_sniffed() {
    let engine = Engine::new();
    let opts = Options::default();
    let sniffed = firewall(FieldTag::default());
    let declared = firewall(FieldTag::default().with_wrapper("Items"));

    let value = string_set(["a", "b", "c"]);
    let source = domain(&sniffed.domain, vec![("Ports", value.clone())]);
    let (a, _) = externalize(&engine, &source, &sniffed.wire, &opts);
    let source = domain(&declared.domain, vec![("Ports", value)]);
    let (b, diags) = externalize(&engine, &source, &declared.wire, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(a, b);

    let (back, diags) = internalize(&engine, &b, &declared.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(back, source);
}

#[test]
fn test_declared_wrapper_missing_field_is_fatal() {
    let engine = Engine::new();
    let fw = firewall(FieldTag::default().with_wrapper("Entries"));
    let source = domain(&fw.domain, vec![("Ports", string_set(["a"]))]);

    let (_, diags) = externalize(&engine, &source, &fw.wire, &Options::default());
    assert!(diags.has_fatal());
    assert!(matches!(
        diags.error_kinds()[0],
        ConversionError::MissingWrapperField { field, wrapper_type }
            if field == "Entries" && wrapper_type == "PortList"
    ));
}

#[test]
fn test_declared_wrapper_with_bad_count_is_fatal() {
    let engine = Engine::new();
    let list = WireStruct::new("BadList")
        .field("Items", WireType::slice(WireType::String))
        .field("Quantity", WireType::Int32)
        .build();
    let wire_def = WireStruct::new("Holder")
        .field("Values", WireType::pointer(WireType::Struct(list)))
        .build();
    let domain_def = DomainStruct::new("Holder")
        .tagged_field(
            "Values",
            DomainType::list(DomainType::String),
            FieldTag::default().with_wrapper("Items"),
        )
        .build();
    let source = domain(
        &domain_def,
        vec![("Values", DomainValue::list(DomainValue::strings(["x"])))],
    );

    let (_, diags) = externalize(&engine, &source, &wire_def, &Options::default());
    assert!(diags.has_fatal());
    assert!(matches!(
        diags.error_kinds()[0],
        ConversionError::IncompatibleTypes { .. }
    ));
}

#[test]
fn test_count_follows_sequence_not_input() {
    let engine = Engine::new();
    let opts = Options::default();
    let fw = firewall(FieldTag::default());
    let ports = wire(
        &fw.ports,
        vec![
            ("Items", WireValue::strings(["a", "b"])),
            ("Quantity", ptr_i32(99)),
        ],
    );
    let source = wire(&fw.wire, vec![("Ports", WireValue::pointer_to(ports))]);

    let (obj, diags) = internalize(&engine, &source, &fw.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(obj.get("Ports"), Some(&string_set(["a", "b"])));

    let (out, _) = externalize(&engine, &obj, &fw.wire, &opts);
    let count = out
        .get("Ports")
        .and_then(WireValue::as_struct)
        .and_then(|w| w.get("Quantity"))
        .cloned();
    assert_eq!(count, Some(ptr_i32(2)));
}

#[test]
fn test_null_collection_gives_zero_wrapper() {
    let engine = Engine::new();
    let fw = firewall(FieldTag::default());
    let source = DomainObject::new(fw.domain.clone());

    let (out, diags) = externalize(&engine, &source, &fw.wire, &Options::default());
    assert!(diags.is_empty(), "{}", diags);
    let expected = wire(
        &fw.ports,
        vec![
            ("Items", WireValue::Slice(Vec::new())),
            ("Quantity", ptr_i32(0)),
        ],
    );
    assert_eq!(out.get("Ports"), Some(&WireValue::pointer_to(expected)));
}

#[test]
fn test_null_collection_with_omitempty_stays_nil() {
    let engine = Engine::new();
    let fw = firewall(FieldTag::default().with_omitempty());
    let source = DomainObject::new(fw.domain.clone());

    let (out, diags) = externalize(&engine, &source, &fw.wire, &Options::default());
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(out.get("Ports"), Some(&WireValue::Nil));
}

#[test]
fn test_internalize_rule1_nil_and_empty() {
    let engine = Engine::new();
    let opts = Options::default();
    let fw = firewall(FieldTag::default());

    let nil = WireObject::zero(fw.wire.clone());
    let (obj, _) = internalize(&engine, &nil, &fw.domain, &opts);
    assert_eq!(obj.get("Ports"), Some(&DomainValue::Null));

    let empty = wire(
        &fw.wire,
        vec![("Ports", WireValue::pointer_to(WireObject::zero(fw.ports.clone())))],
    );
    let (obj, diags) = internalize(&engine, &empty, &fw.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(obj.get("Ports"), Some(&DomainValue::set(Vec::new())));
}

// Rule 2: a block whose fields feed the sequence and the siblings.

struct Feature {
    domain: Arc<DomainStruct>,
    block: Arc<DomainStruct>,
    wire: Arc<WireStruct>,
    toggle: Arc<WireStruct>,
}

fn toggle_set() -> Arc<WireStruct> {
    WireStruct::new("ToggleSet")
        .field("Items", WireType::slice(WireType::String))
        .field("Quantity", WireType::pointer(WireType::Int64))
        .field("Enabled", WireType::pointer(WireType::Bool))
        .build()
}

fn feature(tag: FieldTag) -> Feature {
    let toggle = toggle_set();
    let wire = WireStruct::new("Feature")
        .field("Toggle", WireType::pointer(WireType::Struct(toggle.clone())))
        .build();
    let block = DomainStruct::new("ToggleBlock")
        .field("Items", DomainType::set(DomainType::String))
        .field("Enabled", DomainType::Bool)
        .build();
    let domain = DomainStruct::new("Feature")
        .tagged_field("Toggle", DomainType::object(&block), tag)
        .build();
    Feature {
        domain,
        block,
        wire,
        toggle,
    }
}

#[test]
fn test_scenario_b_block_through_rule2_wrapper() {
    let engine = Engine::new();
    let opts = Options::default();
    let f = feature(FieldTag::default());
    let block = domain(
        &f.block,
        vec![
            ("Items", string_set(["item1"])),
            ("Enabled", DomainValue::bool(true)),
        ],
    );
    let source = domain(&f.domain, vec![("Toggle", DomainValue::object(block))]);

    let (out, diags) = externalize(&engine, &source, &f.wire, &opts);
    assert!(diags.is_empty(), "{}", diags);
    let expected = wire(
        &f.toggle,
        vec![
            ("Items", WireValue::strings(["item1"])),
            ("Quantity", ptr_i64(1)),
            ("Enabled", ptr_bool(true)),
        ],
    );
    assert_eq!(out.get("Toggle"), Some(&WireValue::pointer_to(expected)));

    let (back, diags) = internalize(&engine, &out, &f.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(back, source);
}

#[test]
fn test_rule2_all_zero_wrapper() {
    let engine = Engine::new();
    let opts = Options::default();
    let zero = |toggle: &Arc<WireStruct>| {
        WireValue::pointer_to(wire(
            toggle,
            vec![
                ("Items", WireValue::Slice(Vec::new())),
                ("Quantity", ptr_i64(0)),
                ("Enabled", ptr_bool(false)),
            ],
        ))
    };

    let omit = feature(FieldTag::default().with_omitempty());
    let source = wire(&omit.wire, vec![("Toggle", zero(&omit.toggle))]);
    let (obj, diags) = internalize(&engine, &source, &omit.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(obj.get("Toggle"), Some(&DomainValue::Null));

    let keep = feature(FieldTag::default());
    let source = wire(&keep.wire, vec![("Toggle", zero(&keep.toggle))]);
    let (obj, diags) = internalize(&engine, &source, &keep.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    let expected = domain(
        &keep.block,
        vec![
            ("Items", DomainValue::set(Vec::new())),
            ("Enabled", DomainValue::bool(false)),
        ],
    );
    assert_eq!(obj.get("Toggle"), Some(&DomainValue::object(expected)));
}

#[test]
fn test_rule2_collapse_ignores_count() {
    let engine = Engine::new();
    let opts = Options::default();
    let omit = feature(FieldTag::default().with_omitempty());

    let stale = wire(
        &omit.toggle,
        vec![
            ("Items", WireValue::Slice(Vec::new())),
            ("Quantity", ptr_i64(3)),
            ("Enabled", ptr_bool(false)),
        ],
    );
    let source = wire(&omit.wire, vec![("Toggle", WireValue::pointer_to(stale))]);
    let (obj, diags) = internalize(&engine, &source, &omit.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(obj.get("Toggle"), Some(&DomainValue::Null));

    let nil_count = wire(
        &omit.toggle,
        vec![("Items", WireValue::Nil), ("Quantity", WireValue::Nil)],
    );
    let source = wire(&omit.wire, vec![("Toggle", WireValue::pointer_to(nil_count))]);
    let (obj, diags) = internalize(&engine, &source, &omit.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(obj.get("Toggle"), Some(&DomainValue::Null));
}

#[test]
fn test_rule2_sibling_keeps_block_despite_zero_count() {
    let engine = Engine::new();
    let opts = Options::default();
    let omit = feature(FieldTag::default().with_omitempty());

    let enabled = wire(
        &omit.toggle,
        vec![
            ("Items", WireValue::Slice(Vec::new())),
            ("Quantity", ptr_i64(0)),
            ("Enabled", ptr_bool(true)),
        ],
    );
    let source = wire(&omit.wire, vec![("Toggle", WireValue::pointer_to(enabled))]);
    let (obj, diags) = internalize(&engine, &source, &omit.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    let expected = domain(
        &omit.block,
        vec![
            ("Items", DomainValue::set(Vec::new())),
            ("Enabled", DomainValue::bool(true)),
        ],
    );
    assert_eq!(obj.get("Toggle"), Some(&DomainValue::object(expected)));
}

#[test]
fn test_rule1_block_with_omitempty_stays_known() {
    let engine = Engine::new();
    let opts = Options::default();
    let fw = firewall(FieldTag::default());
    let block = DomainStruct::new("PortsBlock")
        .field("Items", DomainType::set(DomainType::String))
        .build();
    let domain_def = DomainStruct::new("Firewall")
        .tagged_field(
            "Ports",
            DomainType::object(&block),
            FieldTag::default().with_omitempty(),
        )
        .build();

    let empty = wire(
        &fw.ports,
        vec![("Items", WireValue::Slice(Vec::new())), ("Quantity", ptr_i32(0))],
    );
    let source = wire(&fw.wire, vec![("Ports", WireValue::pointer_to(empty))]);
    let (obj, diags) = internalize(&engine, &source, &domain_def, &opts);
    assert!(diags.is_empty(), "{}", diags);
    let expected = domain(&block, vec![("Items", DomainValue::set(Vec::new()))]);
    assert_eq!(obj.get("Ports"), Some(&DomainValue::object(expected)));

    let source = wire(&fw.wire, vec![("Ports", WireValue::Nil)]);
    let (obj, _) = internalize(&engine, &source, &domain_def, &opts);
    assert_eq!(obj.get("Ports"), Some(&DomainValue::Null));
}

#[test]
fn test_rule2_null_block() {
    let engine = Engine::new();
    let opts = Options::default();

    let keep = feature(FieldTag::default());
    let empty = DomainObject::new(keep.domain.clone());
    let (out, diags) = externalize(&engine, &empty, &keep.wire, &opts);
    assert!(diags.is_empty(), "{}", diags);
    let expected = wire(
        &keep.toggle,
        vec![
            ("Items", WireValue::Slice(Vec::new())),
            ("Quantity", ptr_i64(0)),
        ],
    );
    assert_eq!(out.get("Toggle"), Some(&WireValue::pointer_to(expected)));

    let omit = feature(FieldTag::default().with_omitempty());
    let (out, _) = externalize(&engine, &DomainObject::new(omit.domain.clone()), &omit.wire, &opts);
    assert_eq!(out.get("Toggle"), Some(&WireValue::Nil));

    let (back, _) = internalize(&engine, &out, &omit.domain, &opts);
    assert_eq!(back.get("Toggle"), Some(&DomainValue::Null));
}

#[test]
fn test_rule2_block_collection() {
    let engine = Engine::new();
    let opts = Options::default();
    let f = feature(FieldTag::default());
    let list_domain = DomainStruct::new("Feature")
        .field("Toggle", DomainType::list_of_objects(&f.block))
        .build();
    let block = |item: &str| {
        DomainValue::object(domain(
            &f.block,
            vec![
                ("Items", string_set([item])),
                ("Enabled", DomainValue::bool(true)),
            ],
        ))
    };

    let one = domain(&list_domain, vec![("Toggle", DomainValue::list([block("a")]))]);
    let (out, diags) = externalize(&engine, &one, &f.wire, &opts);
    assert!(diags.is_empty(), "{}", diags);
    let (back, diags) = internalize(&engine, &out, &list_domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(back, one);

    let empty = domain(&list_domain, vec![("Toggle", DomainValue::list(Vec::new()))]);
    let (out, _) = externalize(&engine, &empty, &f.wire, &opts);
    let count = out
        .get("Toggle")
        .and_then(WireValue::as_struct)
        .and_then(|w| w.get("Quantity"))
        .cloned();
    assert_eq!(count, Some(ptr_i64(0)));

    let two = domain(
        &list_domain,
        vec![("Toggle", DomainValue::list([block("a"), block("b")]))],
    );
    let (_, diags) = externalize(&engine, &two, &f.wire, &opts);
    assert!(diags.has_error());
    assert!(!diags.has_fatal());
    assert!(matches!(
        diags.error_kinds()[0],
        ConversionError::IncompatibleTypes { .. }
    ));
}

// Nesting: blocks in a collection, each holding a Rule 2 wrapper whose
// sibling is itself a Rule 1 wrapper.

#[test]
fn test_scenario_c_nested_wrappers_round_trip() {
    let engine = Engine::new();
    let opts = Options::default();

    let labels = WireStruct::new("LabelList")
        .field("Items", WireType::slice(WireType::String))
        .field("Quantity", WireType::pointer(WireType::Int32))
        .build();
    let toggle = WireStruct::new("ToggleSet")
        .field("Items", WireType::slice(WireType::String))
        .field("Quantity", WireType::pointer(WireType::Int64))
        .field("Enabled", WireType::pointer(WireType::Bool))
        .field("Labels", WireType::pointer(WireType::Struct(labels.clone())))
        .build();
    let rule_wire = WireStruct::new("Rule")
        .field("Name", WireType::pointer(WireType::String))
        .field("Toggle", WireType::pointer(WireType::Struct(toggle.clone())))
        .build();
    let policy_wire = WireStruct::new("Policy")
        .field("Rules", WireType::slice(WireType::pointer(WireType::Struct(rule_wire.clone()))))
        .build();

    let block = DomainStruct::new("ToggleBlock")
        .field("Items", DomainType::set(DomainType::String))
        .field("Enabled", DomainType::Bool)
        .field("Labels", DomainType::set(DomainType::String))
        .build();
    let rule = DomainStruct::new("Rule")
        .field("Name", DomainType::String)
        .field("Toggle", DomainType::object(&block))
        .build();
    let policy = DomainStruct::new("Policy")
        .field("Rules", DomainType::list_of_objects(&rule))
        .build();

    let make_rule = |name: &str, items: DomainValue, enabled: bool, labels: DomainValue| {
        let toggle = domain(
            &block,
            vec![
                ("Items", items),
                ("Enabled", DomainValue::bool(enabled)),
                ("Labels", labels),
            ],
        );
        DomainValue::object(domain(
            &rule,
            vec![
                ("Name", DomainValue::string(name)),
                ("Toggle", DomainValue::object(toggle)),
            ],
        ))
    };
    let source = domain(
        &policy,
        vec![(
            "Rules",
            DomainValue::list([
                make_rule("web", string_set(["a", "b"]), true, string_set(["prod"])),
                make_rule("db", string_set(["c"]), false, string_set(["x", "y", "z"])),
            ]),
        )],
    );

    let (out, diags) = externalize(&engine, &source, &policy_wire, &opts);
    assert!(diags.is_empty(), "{}", diags);

    let expected_db = wire(
        &rule_wire,
        vec![
            ("Name", WireValue::pointer(WireValue::string("db"))),
            (
                "Toggle",
                WireValue::pointer_to(wire(
                    &toggle,
                    vec![
                        ("Items", WireValue::strings(["c"])),
                        ("Quantity", ptr_i64(1)),
                        ("Enabled", ptr_bool(false)),
                        (
                            "Labels",
                            WireValue::pointer_to(wire(
                                &labels,
                                vec![
                                    ("Items", WireValue::strings(["x", "y", "z"])),
                                    ("Quantity", ptr_i32(3)),
                                ],
                            )),
                        ),
                    ],
                )),
            ),
        ],
    );
    match out.get("Rules") {
        Some(WireValue::Slice(rules)) => {
            assert_eq!(rules.len(), 2);
            assert_eq!(rules[1], WireValue::pointer_to(expected_db));
        }
        other => panic!("unexpected rules: {:?}", other),
    }

    let (back, diags) = internalize(&engine, &out, &policy, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(back, source);
}

// Collapse and split: a plain collection plus sibling fields of the
// enclosing struct share one Rule 2 wrapper.

fn collapsed() -> (Arc<DomainStruct>, Arc<WireStruct>, Arc<WireStruct>) {
    let toggle = toggle_set();
    let wire_def = WireStruct::new("Feature")
        .field("Toggle", WireType::pointer(WireType::Struct(toggle.clone())))
        .build();
    let domain_def = DomainStruct::new("Feature")
        .field("Toggle", DomainType::set(DomainType::String))
        .field("Enabled", DomainType::Bool)
        .build();
    (domain_def, wire_def, toggle)
}

#[test]
fn test_collapse_and_split_round_trip() {
    let engine = Engine::new();
    let opts = Options::default();
    let (domain_def, wire_def, toggle) = collapsed();
    let source = domain(
        &domain_def,
        vec![
            ("Toggle", string_set(["a", "b"])),
            ("Enabled", DomainValue::bool(true)),
        ],
    );

    let (out, diags) = externalize(&engine, &source, &wire_def, &opts);
    assert!(diags.is_empty(), "{}", diags);
    let expected = wire(
        &toggle,
        vec![
            ("Items", WireValue::strings(["a", "b"])),
            ("Quantity", ptr_i64(2)),
            ("Enabled", ptr_bool(true)),
        ],
    );
    assert_eq!(out.get("Toggle"), Some(&WireValue::pointer_to(expected)));

    let (back, diags) = internalize(&engine, &out, &domain_def, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(back, source);
}

#[test]
fn test_collapse_of_nulls_leaves_wrapper_nil() {
    let engine = Engine::new();
    let opts = Options::default();
    let (domain_def, wire_def, _) = collapsed();
    let source = DomainObject::new(domain_def.clone());

    let (out, diags) = externalize(&engine, &source, &wire_def, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(out.get("Toggle"), Some(&WireValue::Nil));

    let (back, _) = internalize(&engine, &out, &domain_def, &opts);
    assert_eq!(back, source);
}

#[test]
fn test_collapse_is_strict_clean() {
    let engine = Engine::new();
    let opts = Options::default().with_error_mode(ErrorMode::Strict);
    let (domain_def, wire_def, _) = collapsed();
    let source = domain(
        &domain_def,
        vec![
            ("Toggle", string_set(["a"])),
            ("Enabled", DomainValue::bool(false)),
        ],
    );
    let (_, diags) = externalize(&engine, &source, &wire_def, &opts);
    assert!(diags.is_empty(), "{}", diags);
}

// Block collections keyed by MapBlockKey.

struct Balancer {
    domain: Arc<DomainStruct>,
    listener: Arc<DomainStruct>,
    wire: Arc<WireStruct>,
    listener_wire: Arc<WireStruct>,
}

fn balancer() -> Balancer {
    let listener_wire = WireStruct::new("Listener")
        .field("Port", WireType::pointer(WireType::Int64))
        .field("Protocol", WireType::pointer(WireType::String))
        .build();
    let wire = WireStruct::new("Balancer")
        .field(
            "Listeners",
            WireType::map(WireType::pointer(WireType::Struct(listener_wire.clone()))),
        )
        .build();
    let listener = DomainStruct::new("Listener")
        .field("MapBlockKey", DomainType::String)
        .field("Port", DomainType::Int64)
        .field("Protocol", DomainType::String)
        .build();
    let domain = DomainStruct::new("Balancer")
        .field("Listeners", DomainType::list_of_objects(&listener))
        .build();
    Balancer {
        domain,
        listener,
        wire,
        listener_wire,
    }
}

#[test]
fn test_keyed_blocks_round_trip() {
    let engine = Engine::new();
    let opts = Options::default().with_error_mode(ErrorMode::Strict);
    let lb = balancer();
    let listener = |key: &str, port: i64, protocol: &str| {
        DomainValue::object(domain(
            &lb.listener,
            vec![
                ("MapBlockKey", DomainValue::string(key)),
                ("Port", DomainValue::int64(port)),
                ("Protocol", DomainValue::string(protocol)),
            ],
        ))
    };
    let source = domain(
        &lb.domain,
        vec![(
            "Listeners",
            DomainValue::list([listener("http", 80, "HTTP"), listener("https", 443, "HTTPS")]),
        )],
    );

    let (out, diags) = externalize(&engine, &source, &lb.wire, &opts);
    assert!(diags.is_empty(), "{}", diags);
    let wire_listener = |port: i64, protocol: &str| {
        WireValue::pointer_to(wire(
            &lb.listener_wire,
            vec![
                ("Port", ptr_i64(port)),
                ("Protocol", WireValue::pointer(WireValue::string(protocol))),
            ],
        ))
    };
    let expected = WireValue::Map(btree! {
        "http".to_string() => wire_listener(80, "HTTP"),
        "https".to_string() => wire_listener(443, "HTTPS"),
    });
    assert_eq!(out.get("Listeners"), Some(&expected));

    let (back, diags) = internalize(&engine, &out, &lb.domain, &opts);
    assert!(diags.is_empty(), "{}", diags);
    assert_eq!(back, source);
}

#[test]
fn test_keyed_block_without_key_is_fatal() {
    let engine = Engine::new();
    let lb = balancer();
    let unkeyed = domain(&lb.listener, vec![("Port", DomainValue::int64(80))]);
    let source = domain(
        &lb.domain,
        vec![("Listeners", DomainValue::list([DomainValue::object(unkeyed)]))],
    );

    let (_, diags) = externalize(&engine, &source, &lb.wire, &Options::default());
    assert!(diags.has_fatal());
    assert!(matches!(
        diags.error_kinds()[0],
        ConversionError::MissingMapBlockKey { type_name } if type_name == "Listener"
    ));
}

#[test]
fn test_keyed_blocks_need_key_field_to_internalize() {
    let engine = Engine::new();
    let lb = balancer();
    let keyless = DomainStruct::new("Listener")
        .field("Port", DomainType::Int64)
        .build();
    let domain_def = DomainStruct::new("Balancer")
        .field("Listeners", DomainType::list_of_objects(&keyless))
        .build();
    let source = wire(
        &lb.wire,
        vec![(
            "Listeners",
            WireValue::Map(btree! {
                "http".to_string() => WireValue::pointer_to(wire(
                    &lb.listener_wire,
                    vec![("Port", ptr_i64(80))],
                )),
            }),
        )],
    );

    let (_, diags) = internalize(&engine, &source, &domain_def, &Options::default());
    assert!(diags.has_fatal());
    assert!(matches!(
        diags.error_kinds()[0],
        ConversionError::MissingMapBlockKey { .. }
    ));
}
