//! # Settings
//!
//! Each widget carries a tree of named groups holding typed settings. A setting is either
//! bound to a literal [`Value`] or is a reference to another setting's path, in which case
//! its effective value is whatever that setting resolves to.

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SettingError {
    #[error("expected a {expected} value, got {found}")]
    WrongType { expected: ValueKind, found: ValueKind },
    #[error("reference chain starting at {0} does not resolve to a value")]
    Unresolved(String),
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    List,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<f64>),
}
impl Value {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::List(_) => ValueKind::List,
        }
    }
    /// Convert into a value of the given kind, if that can be done losslessly.
    /// Only ints widen (to floats), everything else must match exactly.
    pub fn coerce(self, kind: ValueKind) -> Result<Self, SettingError> {
        match (self, kind) {
            (Self::Int(i), ValueKind::Float) => Ok(Self::Float(i as f64)),
            (value, kind) if value.kind() == kind => Ok(value),
            (value, kind) => Err(SettingError::WrongType {
                expected: kind,
                found: value.kind(),
            }),
        }
    }
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::List(values) => {
                write!(f, "[")?;
                for (idx, v) in values.iter().enumerate() {
                    if idx != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// What a setting is bound to.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingValue {
    Literal(Value),
    /// Path to another setting, absolute or relative to the group holding this one.
    Reference(String),
}
impl From<Value> for SettingValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}
impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(v) => v.fmt(f),
            Self::Reference(path) => write!(f, "<ref {path}>"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Setting {
    name: String,
    kind: ValueKind,
    value: SettingValue,
}
impl Setting {
    #[must_use]
    pub fn new(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            kind: default.kind(),
            value: SettingValue::Literal(default),
        }
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }
    #[must_use]
    pub fn value(&self) -> &SettingValue {
        &self.value
    }
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self.value, SettingValue::Reference(_))
    }
    /// Check a prospective binding, converting literals to this setting's kind.
    pub fn accepts(&self, value: SettingValue) -> Result<SettingValue, SettingError> {
        match value {
            SettingValue::Literal(v) => Ok(SettingValue::Literal(v.coerce(self.kind)?)),
            reference @ SettingValue::Reference(_) => Ok(reference),
        }
    }
    /// Rebind, returning the previous binding. On error nothing changes.
    pub fn set(&mut self, value: SettingValue) -> Result<SettingValue, SettingError> {
        let value = self.accepts(value)?;
        Ok(std::mem::replace(&mut self.value, value))
    }
}

/// A named collection of settings and nested groups.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SettingGroup {
    name: String,
    settings: Vec<Setting>,
    groups: Vec<SettingGroup>,
}
impl SettingGroup {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    #[must_use]
    pub fn with(mut self, name: &str, default: Value) -> Self {
        self.settings.push(Setting::new(name, default));
        self
    }
    #[must_use]
    pub fn with_group(mut self, group: SettingGroup) -> Self {
        self.groups.push(group);
        self
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }
    pub fn groups(&self) -> &[SettingGroup] {
        &self.groups
    }
    #[must_use]
    pub fn setting(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.name == name)
    }
    pub fn setting_mut(&mut self, name: &str) -> Option<&mut Setting> {
        self.settings.iter_mut().find(|s| s.name == name)
    }
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&SettingGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
    pub fn group_mut(&mut self, name: &str) -> Option<&mut SettingGroup> {
        self.groups.iter_mut().find(|g| g.name == name)
    }
    /// Find a setting by its group names followed by the setting name.
    #[must_use]
    pub fn lookup(&self, segments: &[&str]) -> Option<&Setting> {
        match segments {
            [] => None,
            [name] => self.setting(name),
            [group, rest @ ..] => self.group(group)?.lookup(rest),
        }
    }
    pub fn lookup_mut(&mut self, segments: &[&str]) -> Option<&mut Setting> {
        match segments {
            [] => None,
            [name] => self.setting_mut(name),
            [group, rest @ ..] => self.group_mut(group)?.lookup_mut(rest),
        }
    }
}
