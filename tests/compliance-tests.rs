use std::{error::Error, fs::File, io::BufReader};

use rust_jq::{Options, QueryError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize)]
struct TestSuite {
    tests: Vec<Case>,
}

#[derive(Serialize, Deserialize, Default, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
enum Mode {
    #[default]
    All,
    First,
    One,
}

#[derive(Serialize, Deserialize)]
struct Case {
    name: String,
    script: String,

    #[serde(default)]
    input: Value,

    #[serde(default)]
    bindings: Map<String, Value>,

    #[serde(default)]
    mode: Mode,

    #[serde(default)]
    default: Value,

    #[serde(default)]
    result: Value,

    #[serde(default)]
    error: Option<String>,
}

fn run(case: &Case) -> Result<Value, QueryError> {
    let options = Options::from(case.input.clone()).bindings(case.bindings.clone());

    match case.mode {
        Mode::All => rust_jq::all(&case.script, options).map(Value::Array),
        Mode::First => rust_jq::first(&case.script, case.default.clone(), options),
        Mode::One => rust_jq::one(&case.script, options),
    }
}

#[test]
fn compliance() -> Result<(), Box<dyn Error>> {
    // Path is relative to the crate root.
    let file = File::open("tests/cases.json")?;
    let reader = BufReader::new(file);
    let test_suite: TestSuite = serde_json::from_reader(reader)?;

    for case in test_suite.tests {
        println!("{}", case.name);
        let rv = run(&case);

        match &case.error {
            Some(kind) => {
                let err = match rv {
                    Ok(value) => panic!("{} did not fail, got {}", case.name, value),
                    Err(err) => err,
                };
                assert_eq!(&format!("{:?}", err.kind), kind, "{}: {}", case.name, err);
            }
            None => {
                assert_eq!(rv?, case.result, "{}: {}", case.name, case.script);
            }
        }
    }

    Ok(())
}
