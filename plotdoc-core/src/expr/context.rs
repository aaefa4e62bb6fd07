use std::collections::BTreeMap;

use super::{parser, Env, Expr, ExprValue};
use crate::state::custom::{Custom, CustomKind};
use crate::state::dataset::Dataset;

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub params: Vec<String>,
    pub body: Expr,
}

/// Custom constants and functions, as seen by expressions.
///
/// Rebuilt from the document's customs whenever they change. Definitions that fail to
/// parse or evaluate are logged and left out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvalContext {
    constants: hashbrown::HashMap<String, ExprValue>,
    functions: hashbrown::HashMap<String, Function>,
}
impl EvalContext {
    /// Functions are all defined first so any constant may call them. Constants are evaluated
    /// in order, each seeing the ones before it.
    #[must_use]
    pub fn build(customs: &[Custom], data: &BTreeMap<String, Dataset>) -> Self {
        let mut context = Self::default();
        for custom in customs.iter().filter(|c| c.kind == CustomKind::Function) {
            let Some((name, params)) = custom.signature() else {
                log::warn!("Ignoring custom function with bad signature {:?}", custom.name);
                continue;
            };
            match parser::parse(&custom.value) {
                Ok(body) => {
                    context.functions.insert(
                        name.to_owned(),
                        Function {
                            params: params.into_iter().map(str::to_owned).collect(),
                            body,
                        },
                    );
                }
                Err(e) => log::warn!("Ignoring custom function {name}: {e}"),
            }
        }
        for custom in customs.iter().filter(|c| c.kind == CustomKind::Constant) {
            let value = Env::new(&context, data).evaluate(&custom.value);
            match value {
                Ok(value) => {
                    context.constants.insert(custom.name.clone(), value);
                }
                Err(e) => log::warn!("Ignoring custom constant {}: {e}", custom.name),
            }
        }
        context
    }
    #[must_use]
    pub fn constant(&self, name: &str) -> Option<&ExprValue> {
        self.constants.get(name)
    }
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn constants_in_order() {
        let data = BTreeMap::new();
        let customs = [
            Custom::constant("a", "2"),
            Custom::constant("b", "a * 3"),
            // Sees nothing defined after it.
            Custom::constant("c", "d"),
            Custom::constant("d", "1"),
        ];
        let context = EvalContext::build(&customs, &data);
        assert_eq!(context.constant("b"), Some(&ExprValue::Scalar(6.0)));
        assert_eq!(context.constant("c"), None);
        assert_eq!(context.constant("d"), Some(&ExprValue::Scalar(1.0)));
    }
    #[test]
    fn bad_functions_skipped() {
        let data = BTreeMap::new();
        let customs = [
            Custom::function("f(x", "x"),
            Custom::function("g(x)", "x +"),
            Custom::function("h(x)", "x + 1"),
        ];
        let context = EvalContext::build(&customs, &data);
        assert!(context.function("f").is_none());
        assert!(context.function("g").is_none());
        assert_eq!(context.function("h").map(|f| f.params.len()), Some(1));
    }
}
