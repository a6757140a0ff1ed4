use std::{path::PathBuf, str};

use serde_json::{Map, Value};

use crate::{
    engine::Engine,
    errors::{QueryError, QueryErrorType},
    query::Query,
};

/// Compile `script` with `engine`.
///
/// The script must be UTF-8. Bindings and library paths are handed to the
/// engine as they are, and any error the engine reports becomes a
/// [`QueryErrorType::CompileError`].
pub fn compile<S: AsRef<[u8]>>(
    engine: &dyn Engine,
    script: S,
    bindings: Map<String, Value>,
    library_paths: &[PathBuf],
) -> Result<Query, QueryError> {
    let script = str::from_utf8(script.as_ref()).map_err(|err| {
        QueryError::encoding(format!(
            "script is not valid UTF-8 (invalid byte sequence at offset {})",
            err.valid_up_to()
        ))
    })?;

    tracing::debug!(
        "compiling script with {} binding(s) and {} library path(s)",
        bindings.len(),
        library_paths.len()
    );

    let compiled = engine
        .compile(script, bindings, library_paths)
        .map_err(|err| match err.kind {
            QueryErrorType::CompileError => err,
            _ => QueryError::compile(err.msg),
        })?;

    Ok(Query::new(compiled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PestEngine;

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let err = compile(&PestEngine, b".a \xff", Map::new(), &[]).unwrap_err();
        assert_eq!(err.kind, QueryErrorType::EncodingError);
        assert!(err.msg.contains("offset 3"), "{}", err.msg);
    }

    #[test]
    fn syntax_errors_are_compile_errors() {
        let err = compile(&PestEngine, ".a +", Map::new(), &[]).unwrap_err();
        assert_eq!(err.kind, QueryErrorType::CompileError);
        assert!(err.msg.starts_with("syntax error:"), "{}", err.msg);
    }

    #[test]
    fn byte_scripts_are_accepted() {
        assert!(compile(&PestEngine, b".a".to_vec(), Map::new(), &[]).is_ok());
    }
}
