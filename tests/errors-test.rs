use rust_jq::{Options, Query};
use serde_json::json;

mod errors {
    use super::*;

    #[test]
    #[should_panic(expected = "syntax error:")]
    fn unbalanced_parens() {
        Query::standard("(.a").unwrap();
    }

    #[test]
    #[should_panic(expected = "nosuchthing/0 is not defined")]
    fn unknown_function() {
        Query::standard("nosuchthing").unwrap();
    }

    #[test]
    #[should_panic(expected = "map/2 is not defined")]
    fn wrong_arity() {
        Query::standard("map(.; .)").unwrap();
    }

    #[test]
    #[should_panic(expected = "$x is not defined")]
    fn unbound_variable() {
        Query::standard("$x + 1").unwrap();
    }

    #[test]
    #[should_panic(expected = "module path must be relative")]
    fn absolute_module_path() {
        Query::standard("include \"/etc/passwd\"; .").unwrap();
    }

    #[test]
    #[should_panic(expected = "module not found:")]
    fn missing_module() {
        Query::standard("import \"nowhere\" as n; .").unwrap();
    }

    #[test]
    #[should_panic(expected = "cannot be added")]
    fn add_number_and_string() {
        rust_jq::one(". + \"a\"", Options::from(json!(1))).unwrap();
    }

    #[test]
    #[should_panic(expected = "Cannot index number with")]
    fn index_number() {
        rust_jq::all(".a", Options::from(json!(1))).unwrap();
    }

    #[test]
    #[should_panic(expected = "expected exactly one result, got more than one")]
    fn one_of_many() {
        rust_jq::one(".[]", Options::from(json!([1, 2]))).unwrap();
    }

    #[test]
    #[should_panic(expected = "'value' and 'location' cannot both be specified")]
    fn value_and_location() {
        rust_jq::all(
            ".",
            Options::from(json!(1)).location("http://127.0.0.1:1/"),
        )
        .unwrap();
    }
}
