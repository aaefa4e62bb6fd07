//! User-defined constants and functions available to expressions.

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CustomKind {
    /// `name = expression`
    Constant,
    /// `name(a, b) = expression of a and b`
    Function,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Custom {
    pub kind: CustomKind,
    /// For functions, the full signature such as `f(x, y)`.
    pub name: String,
    pub value: String,
}
impl Custom {
    #[must_use]
    pub fn constant(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: CustomKind::Constant,
            name: name.into(),
            value: value.into(),
        }
    }
    #[must_use]
    pub fn function(signature: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: CustomKind::Function,
            name: signature.into(),
            value: value.into(),
        }
    }
    /// Split a function signature into its name and parameter names.
    /// `None` if malformed, or if this is not a function.
    #[must_use]
    pub fn signature(&self) -> Option<(&str, Vec<&str>)> {
        if self.kind != CustomKind::Function {
            return None;
        }
        let (name, rest) = self.name.split_once('(')?;
        let params = rest.trim_end().strip_suffix(')')?;
        let name = name.trim();
        let is_ident =
            |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !is_ident(name) {
            return None;
        }
        let params: Vec<&str> = if params.trim().is_empty() {
            Vec::new()
        } else {
            params.split(',').map(str::trim).collect()
        };
        params.iter().all(|p| is_ident(p)).then_some((name, params))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn signatures() {
        let f = Custom::function("f(x, y)", "x*y");
        assert_eq!(f.signature(), Some(("f", vec!["x", "y"])));
        assert_eq!(Custom::function("g()", "1").signature(), Some(("g", vec![])));
        assert_eq!(Custom::function("bad(x", "1").signature(), None);
        assert_eq!(Custom::function("h(x, 2y z)", "1").signature(), None);
        assert_eq!(Custom::constant("k", "1").signature(), None);
    }
    #[test]
    fn kind_strings() {
        assert_eq!("function".parse::<CustomKind>().unwrap(), CustomKind::Function);
        assert_eq!(CustomKind::Constant.to_string(), "constant");
    }
}
