//! The selector grammar as an external contract: the strings users write.

use pretty_assertions::assert_eq;
use chisel::tree::class::ClassName;
use chisel::tree::descriptor::Type;
use graft::selector::dynamic::{DescDeclaration, DynamicSelectorRegistry};
use graft::selector::query::{Candidate, MemberId, QueryResult};
use graft::selector::{parse, ParseContext, Selector};

fn context(registry: &DynamicSelectorRegistry) -> ParseContext<'_> {
	ParseContext::new(registry).with_site("test")
}

#[test]
fn by_name_round_trips() {
	let registry = DynamicSelectorRegistry::with_builtins();
	let context = context(&registry);

	for input in [
		"Lfoo/bar/Baz;func_1234_a(III)Z",
		"func_1234_a(III)Z",
		"Lfoo/Bar;member",
		"member*",
		"(III)Z",
		"Lfoo/Bar;*",
	] {
		let selector = parse(input, &context);
		selector.validate().unwrap_or_else(|e| panic!("{input:?} didn't parse: {e}"));
		assert_eq!(selector.to_string(), input);
	}
}

#[test]
fn malformed_inputs_become_invalid() {
	let registry = DynamicSelectorRegistry::with_builtins();
	let context = context(&registry);

	for input in [
		";name",            // empty owner
		"La/b;na/me",       // invalid member name
		"name(",            // broken descriptor
		"name*(III)Z",      // match-all with a descriptor
		"@",                // no id
		"@nope",            // unregistered id
		"name=/unclosed",   // not a regex selector, and `/` is no name char
		"owner=//name=//desc=// owner=/x/", // duplicate group
	] {
		let selector = parse(input, &context);
		assert!(
			matches!(selector, Selector::Invalid(_)) && selector.validate().is_err(),
			"{input:?} parsed as {selector:?}",
		);
	}
}

#[test]
fn ordinal_narrowing_is_a_copy() {
	let registry = DynamicSelectorRegistry::with_builtins();
	let context = context(&registry);

	let base = parse("member*", &context);
	let narrowed = base.with_ordinal(3);

	match (&base, &narrowed) {
		(Selector::ByName(base), Selector::ByName(narrowed)) => {
			assert_eq!(base.ordinal, None);
			assert_eq!(narrowed.ordinal, Some(3));
		},
		other => panic!("expected by-name selectors, got {other:?}"),
	}
}

#[test]
fn desc_selector_resolves_explicit_coordinate() {
	let registry = DynamicSelectorRegistry::with_builtins();
	let mut context = context(&registry);
	context.add_declaration("window", DescDeclaration {
		owner: None,
		name: Some(String::from("resize")),
		args: vec![Type::I, Type::I],
		ret: None,
	});

	let selector = parse("@desc(window)", &context);
	match selector {
		Selector::Dynamic(dynamic) => {
			assert_eq!(dynamic.name.as_deref(), Some("resize"));
			assert_eq!(dynamic.desc.map(|d| d.as_str().to_owned()), Some(String::from("(II)V")));
			assert_eq!((dynamic.min_matches, dynamic.max_matches), (1, 1));
		},
		other => panic!("expected a dynamic selector, got {other:?}"),
	}
}

#[test]
fn desc_selector_walks_coordinates_outward() {
	let registry = DynamicSelectorRegistry::with_builtins();
	let mut context = context(&registry);
	context.push_coordinate("method");
	context.push_coordinate("class");
	context.add_declaration("class", DescDeclaration {
		owner: None,
		name: Some(String::from("outer")),
		args: Vec::new(),
		ret: Some(Type::Z),
	});

	// nothing at `method`, so the `class` declaration wins
	let selector = parse("@desc", &context);
	match selector {
		Selector::Dynamic(dynamic) => assert_eq!(dynamic.name.as_deref(), Some("outer")),
		other => panic!("expected a dynamic selector, got {other:?}"),
	}

	// without any declaration, the selector is invalid but names the site
	let empty = ParseContext::new(&registry).with_site("foo/Mixin::handler");
	match parse("@desc", &empty) {
		Selector::Invalid(invalid) => assert!(invalid.cause.contains("foo/Mixin::handler")),
		other => panic!("expected an invalid selector, got {other:?}"),
	}
}

#[test]
fn bare_dynamic_id_finds_namespaced_parser() {
	let registry = DynamicSelectorRegistry::with_builtins();
	let mut context = context(&registry);
	context.add_declaration("w", DescDeclaration {
		owner: None,
		name: None,
		args: Vec::new(),
		ret: None,
	});

	// `desc` is registered as `graft:desc`
	assert!(matches!(parse("@desc(w)", &context), Selector::Dynamic(_)));
	assert!(matches!(parse("@graft:desc(w)", &context), Selector::Dynamic(_)));
	assert!(matches!(parse("@Desc(w)", &context), Selector::Dynamic(_)));
}

#[test]
fn query_selects_the_single_descriptor_match() {
	let registry = DynamicSelectorRegistry::with_builtins();
	let context = context(&registry);
	let owner = ClassName::from("net/example/Widget");

	// two overloads, only one with the selected descriptor
	let members = [
		("bar", "(III)Z"),
		("bar", "(III)I"),
	];
	let candidates: Vec<Candidate> = members.iter().enumerate()
		.map(|(index, (name, desc))| Candidate {
			id: MemberId::Method(index),
			owner: &owner,
			name,
			desc,
		})
		.collect();

	let selector = parse("bar(III)Z", &context);
	let result = QueryResult::run(&[&selector], &candidates);

	assert_eq!(result.len(), 1);
	assert_eq!(result.candidates()[0].id, MemberId::Method(0));
	assert_eq!(result.single_result(true).unwrap().desc, "(III)Z");
}

#[test]
fn query_prefers_the_exact_candidate() {
	let registry = DynamicSelectorRegistry::with_builtins();
	let context = context(&registry);
	let owner = ClassName::from("net/example/Widget");

	let members = [
		("BAR", "(III)Z"),
		("bar", "(III)Z"),
		("bar", "()V"),
	];
	let candidates: Vec<Candidate> = members.iter().enumerate()
		.map(|(index, (name, desc))| Candidate {
			id: MemberId::Method(index),
			owner: &owner,
			name,
			desc,
		})
		.collect();

	let selector = parse("bar(III)Z", &context);
	let result = QueryResult::run(&[&selector], &candidates);

	// the case-insensitive hit stays a candidate but never wins
	assert_eq!(result.len(), 2);
	assert_eq!(result.single_result(true).unwrap().id, MemberId::Method(1));
}
