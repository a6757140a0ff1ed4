//! Resolution of `include` and `import` directives against library paths.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    ast::{Expr, FuncDef},
    errors::JQError,
    parser::{Directive, JQParser},
};

/// Loads modules named by directives. A module `name` is the file
/// `<path>/<name>.jq` in the first library path that has one.
pub struct ModuleLoader<'p> {
    library_paths: &'p [PathBuf],
    parser: JQParser,
}

impl<'p> ModuleLoader<'p> {
    pub fn new(library_paths: &'p [PathBuf]) -> Self {
        ModuleLoader {
            library_paths,
            parser: JQParser::new(),
        }
    }

    pub fn resolve(&self, name: &str) -> Result<PathBuf, JQError> {
        if Path::new(name).is_absolute() {
            return Err(JQError::module(format!(
                "module path must be relative, found \"{name}\""
            )));
        }

        let file_name = if name.ends_with(".jq") {
            name.to_owned()
        } else {
            format!("{name}.jq")
        };

        self.library_paths
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                JQError::module(format!(
                    "module not found: \"{}\" (searched {})",
                    name,
                    if self.library_paths.is_empty() {
                        String::from("no library paths")
                    } else {
                        self.library_paths
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<String>>()
                            .join(", ")
                    }
                ))
            })
    }

    /// Load every module named by `directives`, returning their definitions
    /// in the order they come into scope.
    pub fn load(&self, directives: &[Directive]) -> Result<Vec<FuncDef>, JQError> {
        let mut stack = Vec::new();
        let mut defs = Vec::new();

        for directive in directives {
            defs.extend(self.load_directive(directive, &mut stack)?);
        }

        Ok(defs)
    }

    fn load_directive(
        &self,
        directive: &Directive,
        stack: &mut Vec<PathBuf>,
    ) -> Result<Vec<FuncDef>, JQError> {
        match directive {
            Directive::Include { path } => self.load_module(path, stack),
            Directive::Import { path, alias } => {
                Ok(qualify(self.load_module(path, stack)?, alias))
            }
        }
    }

    fn load_module(&self, name: &str, stack: &mut Vec<PathBuf>) -> Result<Vec<FuncDef>, JQError> {
        let path = self.resolve(name)?;
        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());

        if stack.contains(&canonical) {
            return Err(JQError::module(format!(
                "circular module dependency on \"{name}\""
            )));
        }

        tracing::debug!("loading module \"{}\" from {}", name, path.display());

        let source = fs::read_to_string(&path).map_err(|err| {
            JQError::module(format!("cannot read module {}: {}", path.display(), err))
        })?;

        let module = self
            .parser
            .parse_module(&source)
            .map_err(|err| JQError::new(err.kind, format!("in module \"{}\": {}", name, err.msg)))?;

        stack.push(canonical);

        let mut defs = Vec::new();
        for directive in &module.directives {
            match self.load_directive(directive, stack) {
                Ok(loaded) => defs.extend(loaded),
                Err(err) => {
                    stack.pop();
                    return Err(err);
                }
            }
        }

        stack.pop();
        defs.extend(module.defs);
        Ok(defs)
    }
}

/// Prefix every definition with `alias::`, along with the calls that refer
/// to them.
fn qualify(defs: Vec<FuncDef>, alias: &str) -> Vec<FuncDef> {
    let names: HashSet<(String, usize)> = defs
        .iter()
        .map(|def| (def.name.to_owned(), def.arity()))
        .collect();

    defs.into_iter()
        .map(|mut def| {
            qualify_calls(&mut def.body, alias, &names, &mut Vec::new());
            def.name = format!("{}::{}", alias, def.name);
            def
        })
        .collect()
}

fn qualify_calls(
    expr: &mut Expr,
    alias: &str,
    names: &HashSet<(String, usize)>,
    shadowed: &mut Vec<(String, usize)>,
) {
    match expr {
        Expr::Call { name, args } => {
            let signature = (name.to_owned(), args.len());
            if names.contains(&signature) && !shadowed.contains(&signature) {
                *name = format!("{alias}::{name}");
            }

            for arg in args {
                qualify_calls(arg, alias, names, shadowed);
            }
        }
        Expr::Def { def, rest } => {
            shadowed.push((def.name.to_owned(), def.arity()));
            qualify_calls(&mut def.body, alias, names, shadowed);
            qualify_calls(rest, alias, names, shadowed);
            shadowed.pop();
        }
        other => {
            for child in other.children_mut() {
                qualify_calls(child, alias, names, shadowed);
            }
        }
    }
}
