use brzo_grammar::{Forest, Grammar, GrammarError, NodeId, Tree};
use brzo_parse::{Engine, EngineConfig, ParseError, ParseOutcome};
use brzo_stream::{SliceStream, StrStream};
use expect_test::expect;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn leaf(c: char) -> Tree<char> {
    Tree::leaf(c)
}

/// A handful of languages with different emptiness and nullability:
/// empty, eps, 'a', 'a'*, 'a' 'b', and X = 'a' X (uninhabited).
fn sample_languages(g: &mut Grammar<char>) -> Vec<NodeId> {
    let a = g.literal('a');
    let b = g.literal('b');
    let star = g.star(a);
    let ab = g.then(a, b);
    let x = g.delegate();
    let ax = g.then(a, x);
    g.set_target(x, ax).unwrap();
    vec![g.empty(), g.eps(), a, star, ab, x]
}

// E = E '+' 'n' | 'n'
fn sum_grammar(g: &mut Grammar<char>) -> NodeId {
    let n = g.literal('n');
    let plus = g.literal('+');
    let e = g.delegate();
    let e_plus = g.then(e, plus);
    let e_plus_n = g.then(e_plus, n);
    let body = g.or(e_plus_n, n);
    g.set_target(e, body).unwrap();
    e
}

// E = E E | 'a'
fn ambiguous_grammar(g: &mut Grammar<char>) -> NodeId {
    let a = g.literal('a');
    let e = g.delegate();
    let ee = g.then(e, e);
    let body = g.or(ee, a);
    g.set_target(e, body).unwrap();
    e
}

// S = '(' S ')' S | eps
fn parens_grammar(g: &mut Grammar<char>) -> NodeId {
    let open = g.literal('(');
    let close = g.literal(')');
    let s = g.delegate();
    let inner = g.then(open, s);
    let closed = g.then(inner, close);
    let nested = g.then(closed, s);
    let eps = g.eps();
    let body = g.or(nested, eps);
    g.set_target(s, body).unwrap();
    s
}

/// D0 = D1 | eps, Di = D(i+1) | D(i-1), Dn = D(n-1). Each Di accepts only
/// the empty string, and its forest needs about n fixed-point passes to
/// reach Dn. Returns (D0, Dn).
fn delegate_chain(g: &mut Grammar<char>, n: usize) -> (NodeId, NodeId) {
    let chain: Vec<NodeId> = (0..=n).map(|_| g.delegate()).collect();
    let eps = g.eps();
    let head = g.union(chain[1], eps);
    g.set_target(chain[0], head).unwrap();
    for i in 1..n {
        let link = g.union(chain[i + 1], chain[i - 1]);
        g.set_target(chain[i], link).unwrap();
    }
    g.set_target(chain[n], chain[n - 1]).unwrap();
    (chain[0], chain[n])
}

/// Feeds `input` through derive and compact one token at a time, checking
/// that compacting each intermediate node again changes nothing.
fn assert_steps_compact_idempotently(engine: &mut Engine<char>, root: NodeId, input: &str) {
    let mut node = root;
    for c in input.chars() {
        let derived = engine.derive(node, &c);
        let once = engine.compact(derived);
        let twice = engine.compact(once);
        assert!(
            engine.grammar().equal(once, twice),
            "{:?} after {:?}:\n{}\n{}",
            input,
            c,
            engine.grammar().render(once),
            engine.grammar().render(twice)
        );
        node = once;
    }
    assert!(engine.is_nullable(node), "{:?} rejected", input);
}

#[test]
fn test_derive_of_empty_and_eps_is_empty() {
    init_logging();
    let g: Grammar<char> = Grammar::new();
    let (empty, eps) = (g.empty(), g.eps());
    let mut engine = Engine::new(g);
    for c in ['a', 'z', '0'] {
        let d_empty = engine.derive(empty, &c);
        let d_eps = engine.derive(eps, &c);
        assert!(engine.grammar().equal(d_empty, empty));
        assert!(engine.grammar().equal(d_eps, empty));
    }
}

#[test]
fn test_derive_of_literal() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let k = g.literal('k');
    let mut engine = Engine::new(g);

    let matched = engine.derive(k, &'k');
    let eps = engine.grammar().eps();
    assert!(engine.grammar().equal(matched, eps));
    assert_eq!(engine.parse_forest(matched), Forest::from([leaf('k')]));

    let missed = engine.derive(k, &'j');
    let empty = engine.grammar().empty();
    assert!(engine.grammar().equal(missed, empty));
}

#[test]
fn test_nullability_laws() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let samples = sample_languages(&mut g);
    let mut pairs = Vec::new();
    for &left in &samples {
        for &right in &samples {
            let union = g.union(left, right);
            let seq = g.then(left, right);
            pairs.push((left, right, union, seq));
        }
    }
    let (eps, empty) = (g.eps(), g.empty());
    let mut engine = Engine::new(g);

    assert!(engine.is_nullable(eps));
    assert!(!engine.is_nullable(empty));
    for (left, right, union, seq) in pairs {
        let (l, r) = (engine.is_nullable(left), engine.is_nullable(right));
        assert_eq!(engine.is_nullable(union), l || r);
        assert_eq!(engine.is_nullable(seq), l && r);
    }
}

#[test]
fn test_emptiness_laws() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let samples = sample_languages(&mut g);
    let mut pairs = Vec::new();
    for &left in &samples {
        for &right in &samples {
            let union = g.union(left, right);
            let seq = g.then(left, right);
            pairs.push((left, right, union, seq));
        }
    }
    let x = samples[5];
    let empty = g.empty();
    let mut engine = Engine::new(g);

    assert!(engine.is_empty(empty));
    assert!(engine.is_empty(x));
    for (left, right, union, seq) in pairs {
        let (l, r) = (engine.is_empty(left), engine.is_empty(right));
        assert_eq!(engine.is_empty(union), l && r);
        assert_eq!(engine.is_empty(seq), l || r);
    }
}

#[test]
fn test_cyclic_union_with_eps_is_nullable() {
    init_logging();
    // X = X | eps
    let mut g: Grammar<char> = Grammar::new();
    let x = g.delegate();
    let eps = g.eps();
    let body = g.union(x, eps);
    g.set_target(x, body).unwrap();
    let mut engine = Engine::new(g);
    assert!(engine.is_nullable(x));
    assert!(!engine.is_empty(x));
}

#[test]
fn test_compaction_is_idempotent_and_drops_empty_branches() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let mut roots = sample_languages(&mut g);
    roots.push(sum_grammar(&mut g));
    let ab = roots[4];
    let empty = g.empty();
    let left_empty = g.union(empty, ab);
    let right_empty = g.union(ab, empty);
    // A nullable prefix in front of a reduction.
    let wrapped = g.reduce(ab, |tree| Tree::List(vec![tree]));
    let eps = g.eps();
    let eps_wrapped = g.then(eps, wrapped);
    roots.push(eps_wrapped);
    let wrapped_eps = g.then(wrapped, eps);
    roots.push(wrapped_eps);
    let mut engine = Engine::new(g);

    let derived = engine.derive(ab, &'a');
    roots.push(derived);
    for root in roots {
        let once = engine.compact(root);
        let twice = engine.compact(once);
        assert!(engine.grammar().equal(once, twice), "{}", engine.grammar().render(root));
    }

    let compact_ab = engine.compact(ab);
    let compact_left = engine.compact(left_empty);
    let compact_right = engine.compact(right_empty);
    assert!(engine.grammar().equal(compact_left, compact_ab));
    assert!(engine.grammar().equal(compact_right, compact_ab));

    let compact_eps_wrapped = engine.compact(eps_wrapped);
    expect![[r#"(red (compose (prepend {()}) map) (seq 'a' 'b'))"#]]
        .assert_eq(&engine.grammar().render(compact_eps_wrapped));
}

#[test]
fn test_compaction_is_idempotent_across_parse_steps() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let sum = sum_grammar(&mut g);
    let ambiguous = ambiguous_grammar(&mut g);
    let parens = parens_grammar(&mut g);
    let digit = g.token_matching(|c| c.is_ascii_digit());
    let digits = g.star(digit);
    let wrapped = g.reduce(digits, |tree| Tree::List(vec![tree]));
    let eps = g.eps();
    let number = g.then(eps, wrapped);
    let mut engine = Engine::new(g);

    assert_steps_compact_idempotently(&mut engine, sum, "n+n+n");
    assert_steps_compact_idempotently(&mut engine, ambiguous, "aaaa");
    assert_steps_compact_idempotently(&mut engine, parens, "(()())()");
    assert_steps_compact_idempotently(&mut engine, number, "4096");
}

#[test]
fn test_parse_agrees_with_recognise_on_cyclic_grammars() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let (head, tail) = delegate_chain(&mut g, 20);
    let empty_only = g.then(head, tail);
    let a = g.literal('a');
    let head_a = g.then(head, a);
    let single_a = g.then(head_a, tail);
    let sum = sum_grammar(&mut g);
    let ambiguous = ambiguous_grammar(&mut g);
    let parens = parens_grammar(&mut g);
    let mut engine = Engine::new(g);
    // The chain needs more passes than the configured minimum.
    assert!(engine.config().forest_pass_limit < 20);

    let cases = [
        (empty_only, vec!["", "a"]),
        (single_a, vec!["", "a", "aa"]),
        (sum, vec!["", "n", "n+n", "n+", "+n", "n+n+n+n"]),
        (ambiguous, vec!["", "a", "aa", "aaa", "ab"]),
        (parens, vec!["", "()", "(()", "(())()", ")("]),
    ];
    for (root, inputs) in cases {
        for input in inputs {
            let recognised = engine.recognises(root, StrStream::new(input)).unwrap();
            let forest = engine.parse(root, StrStream::new(input)).unwrap();
            assert_eq!(
                recognised,
                !forest.is_empty(),
                "{:?} on {}",
                input,
                engine.grammar().render(root)
            );
        }
    }

    assert_eq!(
        engine.parse(empty_only, StrStream::new("")).unwrap(),
        Forest::from([Tree::pair(Tree::Nil, Tree::Nil)])
    );
    assert_eq!(
        engine.parse(single_a, StrStream::new("a")).unwrap(),
        Forest::from([Tree::pair(Tree::pair(Tree::Nil, leaf('a')), Tree::Nil)])
    );
}

#[test]
fn test_compaction_folds_matched_prefix_into_reducer() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let a = g.literal('a');
    let b = g.literal('b');
    let ab = g.then(a, b);
    let mut engine = Engine::new(g);

    let derived = engine.derive(ab, &'a');
    expect![[r#"(seq (eps {'a'}) 'b')"#]].assert_eq(&engine.grammar().render(derived));
    let compacted = engine.compact(derived);
    expect![[r#"(red (prepend {'a'}) 'b')"#]].assert_eq(&engine.grammar().render(compacted));
}

#[test]
fn test_parse_sequence() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let a = g.literal('a');
    let b = g.literal('b');
    let ab = g.then(a, b);
    let mut engine = Engine::new(g);

    let forest = engine.parse(ab, StrStream::new("ab")).unwrap();
    assert_eq!(forest, Forest::from([Tree::pair(leaf('a'), leaf('b'))]));
    let texts: Vec<String> = forest.iter().map(|tree| tree.text()).collect();
    assert_eq!(texts, ["ab"]);

    assert!(engine.parse(ab, StrStream::new("ba")).unwrap().is_empty());
    assert!(engine.parse(ab, StrStream::new("a")).unwrap().is_empty());
}

#[test]
fn test_recognise_literal() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let f = g.literal('f');
    let mut engine = Engine::new(g);
    assert!(engine.recognises(f, StrStream::new("f")).unwrap());
    assert!(!engine.recognises(f, StrStream::new("g")).unwrap());
    assert!(!engine.recognises(f, StrStream::new("ff")).unwrap());
    assert!(!engine.recognises(f, StrStream::new("")).unwrap());
}

#[test]
fn test_recognise_union() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let a = g.literal('a');
    let b = g.literal('b');
    let ab = g.or(a, b);
    let mut engine = Engine::new(g);
    assert!(engine.recognises(ab, StrStream::new("a")).unwrap());
    assert!(engine.recognises(ab, StrStream::new("b")).unwrap());
    assert!(!engine.recognises(ab, StrStream::new("c")).unwrap());
}

#[test]
fn test_star_collects_iterations_in_a_list() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let c = g.literal('c');
    let star = g.star(c);
    let mut engine = Engine::new(g);

    assert_eq!(
        engine.parse(star, StrStream::new("cc")).unwrap(),
        Forest::from([Tree::List(vec![leaf('c'), leaf('c')])])
    );
    assert_eq!(
        engine.parse(star, StrStream::new("")).unwrap(),
        Forest::from([Tree::List(vec![])])
    );
    assert!(engine.recognises(star, StrStream::new("ccc")).unwrap());
    assert!(!engine.recognises(star, StrStream::new("cd")).unwrap());
}

#[test]
fn test_left_recursive_grammar() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let e = sum_grammar(&mut g);
    let mut engine = Engine::new(g);

    assert!(engine.recognises(e, StrStream::new("n")).unwrap());
    assert!(engine.recognises(e, StrStream::new("n+n+n")).unwrap());
    assert!(!engine.recognises(e, StrStream::new("n+")).unwrap());
    assert!(!engine.recognises(e, StrStream::new("+n")).unwrap());

    let forest = engine.parse(e, StrStream::new("n+n+n")).unwrap();
    assert_eq!(forest.len(), 1);
    let tree = forest.iter().next().unwrap();
    assert_eq!(tree.text(), "n+n+n");
    expect![[r#"(((('n' . '+') . 'n') . '+') . 'n')"#]].assert_eq(&tree.to_string());
}

#[test]
fn test_ambiguous_grammar_yields_every_tree() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let e = ambiguous_grammar(&mut g);
    let mut engine = Engine::new(g);

    let forest = engine.parse(e, StrStream::new("aaa")).unwrap();
    assert_eq!(
        forest,
        Forest::from([
            Tree::pair(Tree::pair(leaf('a'), leaf('a')), leaf('a')),
            Tree::pair(leaf('a'), Tree::pair(leaf('a'), leaf('a'))),
        ])
    );
}

#[test]
fn test_reduce_rewrites_trees() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let digit = g.token_matching(|c| c.is_ascii_digit());
    let digits = g.star(digit);
    let reversed = g.reduce(digits, |tree| match tree {
        Tree::List(items) => Tree::List(items.into_iter().rev().collect()),
        other => other,
    });
    let mut engine = Engine::new(g);

    let forest = engine.parse(reversed, StrStream::new("123")).unwrap();
    assert_eq!(forest, Forest::from([Tree::List(vec![leaf('3'), leaf('2'), leaf('1')])]));
}

#[test]
fn test_compaction_can_be_disabled() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let a = g.literal('a');
    let b = g.literal('b');
    let ab = g.then(a, b);
    let config = EngineConfig::from_toml_str("compact = false").unwrap();
    let mut engine = Engine::with_config(g, config);
    assert_eq!(
        engine.parse(ab, StrStream::new("ab")).unwrap(),
        Forest::from([Tree::pair(leaf('a'), leaf('b'))])
    );
}

#[test]
fn test_step_limit_returns_intermediate_node() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let a = g.literal('a');
    let b = g.literal('b');
    let ab = g.then(a, b);
    let mut engine = Engine::new(g);

    let outcome = engine.parse_with_limit(ab, StrStream::new("ab"), Some(1)).unwrap();
    let ParseOutcome::Halted { node, consumed } = outcome else {
        panic!("expected a halted parse");
    };
    assert_eq!(consumed, 1);
    expect![[r#"(red (prepend {'a'}) 'b')"#]].assert_eq(&engine.grammar().render(node));

    // The limit only halts when input is left over.
    let outcome = engine.parse_with_limit(ab, StrStream::new("ab"), Some(2)).unwrap();
    assert!(outcome.is_complete());
}

#[test]
fn test_unresolved_delegate_is_rejected_before_parsing() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let a = g.literal('a');
    let d = g.delegate();
    let root = g.then(a, d);
    let mut engine = Engine::new(g);
    assert_eq!(
        engine.parse(root, StrStream::new("a")),
        Err(ParseError::Grammar(GrammarError::UnresolvedDelegate(d)))
    );
    assert_eq!(
        engine.recognises(root, StrStream::new("a")),
        Err(ParseError::Grammar(GrammarError::UnresolvedDelegate(d)))
    );
}

#[test]
fn test_periodic_collection_bounds_the_arena() {
    init_logging();
    let input = "a".repeat(50);
    let expected = Forest::from([Tree::List(vec![leaf('a'); 50])]);

    let run = |collect_interval: usize| {
        let mut g: Grammar<char> = Grammar::new();
        let a = g.literal('a');
        let star = g.star(a);
        let config = EngineConfig::default().with_collect_interval(collect_interval);
        let mut engine = Engine::with_config(g, config);
        let forest = engine.parse(star, StrStream::new(&input)).unwrap();
        (forest, engine.grammar().len())
    };

    let (collected_forest, collected_len) = run(1);
    let (kept_forest, kept_len) = run(0);
    assert_eq!(collected_forest, expected);
    assert_eq!(kept_forest, expected);
    assert!(collected_len < 20, "{} nodes left after collection", collected_len);
    assert!(kept_len > collected_len);
}

#[test]
fn test_collection_evicts_memo_entries() {
    init_logging();
    let mut g: Grammar<char> = Grammar::new();
    let a = g.literal('a');
    let b = g.literal('b');
    let ab = g.then(a, b);
    let config = EngineConfig::default().with_collect_interval(0);
    let mut engine = Engine::with_config(g, config);

    assert!(engine.recognises(ab, StrStream::new("ab")).unwrap());
    let before = engine.memo_len();
    let freed = engine.collect_garbage(std::iter::empty());
    assert!(freed > 0);
    assert!(engine.memo_len() < before);
    assert!(engine.memo_stats().derive.evicted > 0);

    // Results are recomputed after eviction.
    assert!(engine.recognises(ab, StrStream::new("ab")).unwrap());
}

#[test]
fn test_slice_tokens() {
    init_logging();
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Tok {
        Open,
        Close,
    }

    // S = '(' S ')' S | eps
    let mut g: Grammar<Tok> = Grammar::new();
    let open = g.literal(Tok::Open);
    let close = g.literal(Tok::Close);
    let s = g.delegate();
    let inner = g.then(open, s);
    let closed = g.then(inner, close);
    let nested = g.then(closed, s);
    let eps = g.eps();
    let body = g.or(nested, eps);
    g.set_target(s, body).unwrap();
    let mut engine = Engine::new(g);

    let balanced = [Tok::Open, Tok::Open, Tok::Close, Tok::Close, Tok::Open, Tok::Close];
    let unbalanced = [Tok::Open, Tok::Close, Tok::Close];
    assert!(engine.recognises(s, SliceStream::new(&balanced)).unwrap());
    assert!(!engine.recognises(s, SliceStream::new(&unbalanced)).unwrap());
    assert_eq!(engine.parse(s, SliceStream::new(&balanced)).unwrap().len(), 1);
}
