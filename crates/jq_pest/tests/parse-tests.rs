use jq_pest::{errors::JQError, parser::Directive, JQParser};

macro_rules! parse_tests {
    ($($name:ident: $value:expr,)*) => {
    mod parse {
        use super::*;
        $(
            #[test]
            fn $name() -> Result<(), JQError> {
                let (input, expected) = $value;
                let program = JQParser::new().parse(input)?;
                assert_eq!(format!("{}", program.body), expected);
                Ok(())
            }
        )*
        }
    }
}

parse_tests! {
    empty_program: ("", "."),
    identity: (".", "."),
    recurse_default: ("..", ".."),
    shorthand_field: (".foo", ".[\"foo\"]"),
    quoted_field: (".\"foo bar\"", ".[\"foo bar\"]"),
    chained_fields: (".a.b", ".[\"a\"][\"b\"]"),
    bracketed_index: (".[0]", ".[0]"),
    bracketed_name: (".[\"a\"]", ".[\"a\"]"),
    iterate: (".[]", ".[]"),
    slice: (".[1:3]", ".[1:3]"),
    slice_without_start: (".[:2]", ".[:2]"),
    slice_without_end: (".[1:]", ".[1:]"),
    optional: (".a?", ".[\"a\"]?"),
    optional_iterate: (".[]?", ".[]?"),
    index_recurse_default: ("(..)[0]", "(..)[0]"),
    literals: ("null, true, false", "((null, true), false)"),
    integer: ("42", "42"),
    float: ("1.5", "1.5"),
    exponent: ("1e3", "1000"),
    negative_number: ("-1", "-1"),
    negated_field: ("-.a", "-.[\"a\"]"),
    string_escapes: ("\"a\\nb\"", "\"a\\nb\""),
    unicode_escape: ("\"\\u00e9\"", "\"é\""),
    surrogate_pair: ("\"\\ud83d\\ude00\"", "\"😀\""),
    precedence: ("1 + 2 * 3", "(1 + (2 * 3))"),
    left_associative: ("1 - 2 - 3", "((1 - 2) - 3)"),
    modulo: (". % 2 == 0", "((. % 2) == 0)"),
    division_is_not_alternative: (". / 2 // 1", "((. / 2) // 1)"),
    alternative_right_associative: (".a // .b // 1", "(.[\"a\"] // (.[\"b\"] // 1))"),
    comma_binds_tighter_than_pipe: ("1, 2 | 3", "((1, 2) | 3)"),
    pipe_right_associative: (". | . | .", "(. | (. | .))"),
    logical_precedence: (".a and .b or .c", "((.[\"a\"] and .[\"b\"]) or .[\"c\"])"),
    comparison: (".a >= 1", "(.[\"a\"] >= 1)"),
    array: ("[.[] | . * 2]", "[(.[] | (. * 2))]"),
    empty_array: ("[]", "[]"),
    object: ("{a: 1, \"b\": .c}", "{\"a\": 1, \"b\": .[\"c\"]}"),
    object_shorthand: ("{a, \"b\"}", "{\"a\": .[\"a\"], \"b\": .[\"b\"]}"),
    object_variable_shorthand: ("{$x}", "{\"x\": $x}"),
    object_variable_key: ("{$x: 1}", "{($x): 1}"),
    object_computed_key: ("{(.k): .v}", "{(.[\"k\"]): .[\"v\"]}"),
    object_value_pipe: ("{a: .b | length}", "{\"a\": (.[\"b\"] | length)}"),
    keyword_object_key: ("{if: 1}", "{\"if\": 1}"),
    if_else: ("if . then 1 else 2 end", "if . then 1 else 2 end"),
    if_without_else: ("if . then 1 end", "if . then 1 end"),
    elif: (
        "if . == 1 then \"a\" elif . == 2 then \"b\" else \"c\" end",
        "if (. == 1) then \"a\" else if (. == 2) then \"b\" else \"c\" end end"
    ),
    try_catch: ("try error(\"x\") catch .", "try error(\"x\") catch ."),
    try_without_catch: ("try .a", "try .[\"a\"]"),
    reduce: ("reduce .[] as $x (0; . + $x)", "reduce .[] as $x (0; (. + $x))"),
    bind: (". as $x | $x", "(. as $x | $x)"),
    bind_body_extends_right: (". as $x | $x, 1", "(. as $x | ($x, 1))"),
    nested_bind: (
        "1 as $x | 2 as $y | [$x, $y]",
        "(1 as $x | (2 as $y | [($x, $y)]))"
    ),
    definition: ("def f: . + 1; f", "(def f: (. + 1); f)"),
    definition_with_params: (
        "def f($a; $b): $a + $b; f(1; 2)",
        "(def f($a; $b): ($a + $b); f(1; 2))"
    ),
    nested_definitions: ("def f: 1; def g: 2; f", "(def f: 1; (def g: 2; f))"),
    qualified_call: ("m::f", "m::f"),
    call_with_args: ("limit(2; .[])", "limit(2; .[])"),
    keyword_prefixed_name: ("definitely", "definitely"),
    comment: ("1 # a comment", "1"),
}

mod directives {
    use super::*;

    #[test]
    fn include_and_import() -> Result<(), JQError> {
        let program = JQParser::new().parse("include \"a\"; import \"b/c\" as c; c::f")?;
        assert_eq!(
            program.directives,
            vec![
                Directive::Include {
                    path: String::from("a")
                },
                Directive::Import {
                    path: String::from("b/c"),
                    alias: String::from("c")
                },
            ]
        );
        assert_eq!(program.body.to_string(), "c::f");
        Ok(())
    }

    #[test]
    fn module_definitions() -> Result<(), JQError> {
        let module = JQParser::new().parse_module("include \"a\"; def f: 1; def g($x): $x;")?;
        assert_eq!(module.directives.len(), 1);
        assert_eq!(
            module
                .defs
                .iter()
                .map(|def| def.to_string())
                .collect::<Vec<String>>(),
            vec!["def f: 1;", "def g($x): $x;"]
        );
        Ok(())
    }
}

mod errors {
    use super::*;

    #[test]
    #[should_panic(expected = "SyntaxError")]
    fn unbalanced_brackets() {
        JQParser::new().parse(".[0").unwrap();
    }

    #[test]
    #[should_panic(expected = "SyntaxError")]
    fn dangling_operator() {
        JQParser::new().parse("1 +").unwrap();
    }

    #[test]
    #[should_panic(expected = "string interpolation is not supported")]
    fn string_interpolation() {
        JQParser::new().parse("\"\\(.a)\"").unwrap();
    }

    #[test]
    #[should_panic(expected = "must be followed by a value")]
    fn computed_key_without_value() {
        JQParser::new().parse("{(.a)}").unwrap();
    }

    #[test]
    #[should_panic(expected = "is too large")]
    fn number_out_of_range() {
        JQParser::new().parse("1e400").unwrap();
    }

    #[test]
    #[should_panic(expected = "duplicate parameter $a")]
    fn duplicate_parameter() {
        JQParser::new().parse("def f($a; $a): 1; .").unwrap();
    }

    #[test]
    #[should_panic(expected = "SyntaxError")]
    fn keyword_as_function_name() {
        JQParser::new().parse("def if: 1; .").unwrap();
    }

    #[test]
    #[should_panic(expected = "SyntaxError")]
    fn expression_in_module() {
        JQParser::new().parse_module("def f: 1; f").unwrap();
    }
}
