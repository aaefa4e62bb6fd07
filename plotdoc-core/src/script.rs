//! # Style sheets
//!
//! Line-oriented scripts of calls such as
//!
//! ```text
//! To('/page1/graph1')
//! Set('x/label', 'Time (s)')
//! Add('xy', name='points', markerSize=2.5, Line__color='red')
//! SetDataRange('t', 11, [0, 1], linked=True)  # comment
//! ```
//!
//! A whole script is parsed before any of it runs, so a syntax error changes nothing. Each call
//! is then issued through a [`CommandInterface`].

use crate::commands::CommandError;
use crate::interface::CommandInterface;
use crate::state::custom::CustomKind;
use crate::state::dataset::generate::{Parametric, Parts};
use crate::state::dataset::Column;
use crate::state::setting::{SettingValue, Value};
use crate::state::tree::WidgetKind;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Equals,
}

/// Tokens up to the end of the line or a `#` comment.
fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        let token = match c {
            '#' => break,
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '=' => Token::Equals,
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some('\\') => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(c) => text.push(c),
                            None => return Err("unterminated string".into()),
                        },
                        Some(c) => text.push(c),
                        None => return Err("unterminated string".into()),
                    }
                }
                tokens.push(Token::Str(text));
                continue;
            }
            c if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                let mut text = String::new();
                while let Some(c) =
                    chars.next_if(|c| c.is_ascii_alphanumeric() || matches!(*c, '-' | '+' | '.'))
                {
                    text.push(c);
                }
                tokens.push(Token::Number(text));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                    name.push(c);
                }
                tokens.push(Token::Ident(name));
                continue;
            }
            other => return Err(format!("unexpected character {other:?}")),
        };
        chars.next();
        tokens.push(token);
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    Numbers(Vec<f64>),
    Strings(Vec<String>),
}
impl Literal {
    fn number(text: &str) -> Result<Self, String> {
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Self::Int(int));
        }
        text.parse::<f64>()
            .map(Self::Float)
            .map_err(|_| format!("bad number {text:?}"))
    }
    fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Float(_) => "number",
            Self::Bool(_) => "boolean",
            Self::None => "None",
            Self::Numbers(_) => "list of numbers",
            Self::Strings(_) => "list of strings",
        }
    }
    fn string(self) -> Result<String, String> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(format!("expected a string, found {}", other.kind())),
        }
    }
    fn float(self) -> Result<f64, String> {
        match self {
            Self::Float(v) => Ok(v),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(v) => Ok(v as f64),
            other => Err(format!("expected a number, found {}", other.kind())),
        }
    }
    fn count(self) -> Result<usize, String> {
        match self {
            Self::Int(v) => usize::try_from(v).map_err(|_| format!("expected a count, found {v}")),
            other => Err(format!("expected an integer, found {}", other.kind())),
        }
    }
    fn bool(self) -> Result<bool, String> {
        match self {
            Self::Bool(b) => Ok(b),
            other => Err(format!("expected True or False, found {}", other.kind())),
        }
    }
    fn numbers(self) -> Result<Vec<f64>, String> {
        match self {
            Self::Numbers(v) => Ok(v),
            // `[]` reads as an empty list of numbers.
            Self::Strings(v) if v.is_empty() => Ok(Vec::new()),
            other => Err(format!("expected a list of numbers, found {}", other.kind())),
        }
    }
    fn strings(self) -> Result<Vec<String>, String> {
        match self {
            Self::Strings(v) => Ok(v),
            Self::Numbers(v) if v.is_empty() => Ok(Vec::new()),
            other => Err(format!("expected a list of strings, found {}", other.kind())),
        }
    }
    fn pair(self) -> Result<(f64, f64), String> {
        match self.numbers()?.as_slice() {
            &[a, b] => Ok((a, b)),
            other => Err(format!("expected [start, stop], found {} values", other.len())),
        }
    }
    fn value(self) -> Result<Value, String> {
        match self {
            Self::Str(s) => Ok(Value::Text(s)),
            Self::Int(v) => Ok(Value::Int(v)),
            Self::Float(v) => Ok(Value::Float(v)),
            Self::Bool(b) => Ok(Value::Bool(b)),
            Self::Numbers(v) => Ok(Value::List(v)),
            other => Err(format!("{} is not a setting value", other.kind())),
        }
    }
}

/// One call, with its arguments not yet interpreted.
#[derive(Debug)]
struct Call {
    name: String,
    args: Vec<Option<Literal>>,
    keywords: Vec<(String, Literal)>,
}
impl Call {
    fn parse(tokens: &[Token]) -> Result<Self, String> {
        let mut tokens = tokens.iter().peekable();
        let Some(Token::Ident(name)) = tokens.next() else {
            return Err("expected a command name".into());
        };
        if tokens.next() != Some(&Token::LParen) {
            return Err(format!("expected '(' after {name}"));
        }
        let mut call = Self {
            name: name.clone(),
            args: Vec::new(),
            keywords: Vec::new(),
        };
        loop {
            if tokens.next_if_eq(&&Token::RParen).is_some() {
                break;
            }
            let mut ahead = tokens.clone();
            let keyword = match (ahead.next(), ahead.next()) {
                (Some(Token::Ident(key)), Some(Token::Equals)) => {
                    tokens.next();
                    tokens.next();
                    Some(key.clone())
                }
                _ => None,
            };
            let literal = parse_literal(&mut tokens)?;
            match keyword {
                Some(key) => call.keywords.push((key, literal)),
                None if !call.keywords.is_empty() => {
                    return Err("positional argument after keyword argument".into());
                }
                None => call.args.push(Some(literal)),
            }
            match tokens.next() {
                Some(Token::Comma) => (),
                Some(Token::RParen) => break,
                _ => return Err("expected ',' or ')'".into()),
            }
        }
        if tokens.next().is_some() {
            return Err("unexpected text after call".into());
        }
        Ok(call)
    }
    /// Take an argument by position or keyword.
    fn take(&mut self, position: usize, keyword: &str) -> Option<Literal> {
        if let Some(arg) = self.args.get_mut(position).and_then(Option::take) {
            return Some(arg);
        }
        let index = self.keywords.iter().position(|(k, _)| k == keyword)?;
        Some(self.keywords.remove(index).1)
    }
    fn required(&mut self, position: usize, keyword: &str) -> Result<Literal, String> {
        self.take(position, keyword)
            .ok_or_else(|| format!("{} needs argument {keyword:?}", self.name))
    }
    /// An optional argument, where `None` also means absent.
    fn optional(&mut self, position: usize, keyword: &str) -> Option<Literal> {
        self.take(position, keyword)
            .filter(|literal| *literal != Literal::None)
    }
    /// Value and error columns, starting at `position`, in the order value, symmetric, negative,
    /// positive. Error columns may also be named by their column names.
    fn parts<T>(
        &mut self,
        position: usize,
        convert: impl Fn(Literal) -> Result<T, String>,
    ) -> Result<Parts<T>, String> {
        let mut parts = Parts::new(convert(self.required(position, "val")?)?);
        for (offset, keyword, column) in [
            (1, "symerr", Column::Serr),
            (2, "negerr", Column::Nerr),
            (3, "poserr", Column::Perr),
        ] {
            let value = match self.optional(position + offset, keyword) {
                Some(value) => Some(value),
                None => self.optional(usize::MAX, &column.to_string()),
            };
            if let Some(value) = value {
                parts = parts.with(column, convert(value)?);
            }
        }
        Ok(parts)
    }
    /// Everything must have been used.
    fn finish(self) -> Result<(), String> {
        if self.args.iter().any(Option::is_some) {
            return Err(format!("too many arguments to {}", self.name));
        }
        match self.keywords.first() {
            Some((key, _)) => Err(format!("unexpected keyword {key:?} for {}", self.name)),
            None => Ok(()),
        }
    }
}

fn parse_literal(tokens: &mut std::iter::Peekable<std::slice::Iter<'_, Token>>) -> Result<Literal, String> {
    match tokens.next() {
        Some(Token::Str(s)) => Ok(Literal::Str(s.clone())),
        Some(Token::Number(text)) => Literal::number(text),
        Some(Token::Ident(name)) => match name.as_str() {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            other => Err(format!("unknown name {other:?}")),
        },
        Some(open @ (Token::LBracket | Token::LParen)) => {
            let close = if *open == Token::LBracket {
                Token::RBracket
            } else {
                Token::RParen
            };
            let mut items = Vec::new();
            loop {
                if tokens.next_if(|t| **t == close).is_some() {
                    break;
                }
                items.push(parse_literal(tokens)?);
                match tokens.next() {
                    Some(Token::Comma) => (),
                    Some(t) if *t == close => break,
                    _ => return Err("expected ',' or end of list".into()),
                }
            }
            list(items)
        }
        Some(other) => Err(format!("unexpected {other:?}")),
        None => Err("unexpected end of line".into()),
    }
}

/// Lists are all numbers or all strings.
fn list(items: Vec<Literal>) -> Result<Literal, String> {
    if items.iter().all(|i| matches!(i, Literal::Str(_))) && !items.is_empty() {
        return items
            .into_iter()
            .map(Literal::string)
            .collect::<Result<_, _>>()
            .map(Literal::Strings);
    }
    items
        .into_iter()
        .map(Literal::float)
        .collect::<Result<_, _>>()
        .map(Literal::Numbers)
        .map_err(|_| "lists must be all numbers or all strings".into())
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    To(String),
    Set(String, Value),
    SetToReference(String, String),
    Add {
        kind: WidgetKind,
        name: Option<String>,
        autoadd: bool,
        values: Vec<(String, SettingValue)>,
    },
    Remove(String),
    Rename(String, String),
    SetData {
        name: String,
        parts: Parts<Vec<f64>>,
    },
    SetDataExpression {
        name: String,
        parts: Parts<String>,
        linked: bool,
        parametric: Option<Parametric>,
    },
    SetDataRange {
        name: String,
        numsteps: usize,
        parts: Parts<(f64, f64)>,
        linked: bool,
    },
    TagDatasets {
        tag: String,
        names: Vec<String>,
    },
    AddCustom {
        kind: CustomKind,
        name: String,
        value: String,
    },
}
impl Statement {
    fn from_call(mut call: Call) -> Result<Self, String> {
        let linked = |call: &mut Call, position| {
            call.optional(position, "linked")
                .map_or(Ok(false), Literal::bool)
        };
        let name = call.name.clone();
        let statement = match name.as_str() {
            "To" => Self::To(call.required(0, "path")?.string()?),
            "Set" => Self::Set(
                call.required(0, "path")?.string()?,
                call.required(1, "val")?.value()?,
            ),
            "SetToReference" => Self::SetToReference(
                call.required(0, "path")?.string()?,
                call.required(1, "val")?.string()?,
            ),
            "Add" => {
                let kind = call.required(0, "widgettype")?.string()?;
                let kind = WidgetKind::parse(&kind).map_err(|e| e.to_string())?;
                let name = call.optional(usize::MAX, "name").map(Literal::string).transpose()?;
                let autoadd = call
                    .optional(usize::MAX, "autoadd")
                    .map_or(Ok(true), Literal::bool)?;
                // The rest are initial settings, `__` separating groups.
                let values = std::mem::take(&mut call.keywords)
                    .into_iter()
                    .map(|(key, literal)| -> Result<(String, SettingValue), String> {
                        Ok((key.replace("__", "/"), SettingValue::Literal(literal.value()?)))
                    })
                    .collect::<Result<_, String>>()?;
                Self::Add {
                    kind,
                    name,
                    autoadd,
                    values,
                }
            }
            "Remove" => Self::Remove(call.required(0, "path")?.string()?),
            "Rename" => Self::Rename(
                call.required(0, "path")?.string()?,
                call.required(1, "newname")?.string()?,
            ),
            "SetData" => Self::SetData {
                name: call.required(0, "name")?.string()?,
                parts: call.parts(1, Literal::numbers)?,
            },
            "SetDataExpression" => {
                let name = call.required(0, "name")?.string()?;
                let parts = call.parts(1, Literal::string)?;
                let linked = linked(&mut call, 5)?;
                let parametric = call
                    .optional(6, "parametric")
                    .map(|literal| -> Result<Parametric, String> {
                        match literal.numbers()?.as_slice() {
                        &[t0, t1, numsteps] if numsteps >= 1.0 && numsteps.fract() == 0.0 => {
                            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                            let numsteps = numsteps as usize;
                            Ok(Parametric { t0, t1, numsteps })
                        }
                        _ => Err("parametric must be [t0, t1, numsteps]".to_owned()),
                        }
                    })
                    .transpose()?;
                Self::SetDataExpression {
                    name,
                    parts,
                    linked,
                    parametric,
                }
            }
            "SetDataRange" => {
                let name = call.required(0, "name")?.string()?;
                let numsteps = call.required(1, "numsteps")?.count()?;
                let parts = call.parts(2, Literal::pair)?;
                let linked = linked(&mut call, 6)?;
                Self::SetDataRange {
                    name,
                    numsteps,
                    parts,
                    linked,
                }
            }
            "TagDatasets" => Self::TagDatasets {
                tag: call.required(0, "tag")?.string()?,
                names: call.required(1, "datasets")?.strings()?,
            },
            "AddCustom" => {
                let kind = call.required(0, "ctype")?.string()?;
                let kind = kind
                    .parse::<CustomKind>()
                    .map_err(|_| format!("unknown custom type {kind:?}"))?;
                Self::AddCustom {
                    kind,
                    name: call.required(1, "name")?.string()?,
                    value: call.required(2, "val")?.string()?,
                }
            }
            other => return Err(format!("unknown command {other:?}")),
        };
        call.finish()?;
        Ok(statement)
    }
    fn run(self, interface: &mut CommandInterface) -> Result<(), CommandError> {
        match self {
            Self::To(path) => interface.to(&path),
            Self::Set(path, value) => interface.set(&path, value),
            Self::SetToReference(path, reference) => interface.set_to_reference(&path, &reference),
            Self::Add {
                kind,
                name,
                autoadd,
                values,
            } => interface
                .add(kind, name.as_deref(), autoadd, values)
                .map(|_| ()),
            Self::Remove(path) => interface.remove(&path),
            Self::Rename(path, new_name) => interface.rename(&path, &new_name),
            Self::SetData { name, parts } => interface.set_data(&name, parts),
            Self::SetDataExpression {
                name,
                parts,
                linked,
                parametric,
            } => interface.set_data_expression(&name, parts, linked, parametric),
            Self::SetDataRange {
                name,
                numsteps,
                parts,
                linked,
            } => interface.set_data_range(&name, numsteps, parts, linked),
            Self::TagDatasets { tag, names } => interface.tag_datasets(&tag, names),
            Self::AddCustom { kind, name, value } => interface.add_custom(kind, &name, &value),
        }
    }
}

/// A parsed script, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    /// Statements with their 1-based line numbers.
    statements: Vec<(usize, Statement)>,
}
impl Script {
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let mut statements = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let syntax = |message| CommandError::Script {
                line: line_number,
                message,
            };
            let tokens = tokenize(line).map_err(syntax)?;
            if tokens.is_empty() {
                continue;
            }
            let statement = Call::parse(&tokens)
                .and_then(Statement::from_call)
                .map_err(syntax)?;
            statements.push((line_number, statement));
        }
        log::trace!("Parsed {} statements", statements.len());
        Ok(Self { statements })
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
    /// Whether every statement defines a custom.
    #[must_use]
    pub fn only_customs(&self) -> bool {
        self.statements
            .iter()
            .all(|(_, s)| matches!(s, Statement::AddCustom { .. }))
    }
    /// Run every statement in order, stopping at the first failure.
    pub fn run(self, interface: &mut CommandInterface) -> Result<(), CommandError> {
        for (line, statement) in self.statements {
            statement
                .run(interface)
                .map_err(|source| CommandError::ScriptLine {
                    line,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Document;

    fn line(text: &str) -> Statement {
        let mut script = Script::parse(text).unwrap();
        assert_eq!(script.len(), 1);
        script.statements.remove(0).1
    }

    #[test]
    fn literals() {
        assert_eq!(
            line("Set('a/b', -1.5e3)"),
            Statement::Set("a/b".into(), Value::Float(-1500.0))
        );
        assert_eq!(
            line(r#"Set("it\"s", [1, 2.5])  # trailing"#),
            Statement::Set("it\"s".into(), Value::List(vec![1.0, 2.5]))
        );
        assert_eq!(
            line("TagDatasets('t', ['a', 'b'],)"),
            Statement::TagDatasets {
                tag: "t".into(),
                names: vec!["a".into(), "b".into()],
            }
        );
        assert_eq!(
            line("SetDataRange('r', 3, (0, 1), symerr=[0.1, 0.1], linked=True)"),
            Statement::SetDataRange {
                name: "r".into(),
                numsteps: 3,
                parts: Parts::new((0.0, 1.0)).with(Column::Serr, (0.1, 0.1)),
                linked: true,
            }
        );
    }
    #[test]
    fn add_keywords() {
        assert_eq!(
            line("Add('xy', name='pts', autoadd=False, markerSize=2, Line__color='red')"),
            Statement::Add {
                kind: WidgetKind::Xy,
                name: Some("pts".into()),
                autoadd: false,
                values: vec![
                    ("markerSize".into(), SettingValue::Literal(Value::Int(2))),
                    ("Line/color".into(), SettingValue::Literal(Value::Text("red".into()))),
                ],
            }
        );
    }
    #[test]
    fn syntax_errors_have_lines() {
        for (text, bad_line) in [
            ("To('/')\n\nSet('x' 1)", 3),
            ("# only a comment\nFrobnicate()", 2),
            ("Set('x', 1", 1),
            ("To('/', 'extra')", 1),
            ("Set('x', 'unterminated)", 1),
            ("SetDataRange('r', -1, [0, 1])", 1),
            ("Add('teapot')", 1),
            ("To(path='/', bogus=1)", 1),
        ] {
            match Script::parse(text) {
                Err(CommandError::Script { line, .. }) => assert_eq!(line, bad_line, "{text}"),
                other => panic!("{text}: {other:?}"),
            }
        }
    }
    #[test]
    fn runs_through_interface() {
        let script = Script::parse(
            "Add('page')\n\
             To('page1')\n\
             Add('graph', name='g')\n\
             To('g')\n\
             Set('x/label', 'time')\n\
             SetToReference('y/label', '../x/label')\n\
             SetData('a', [1, 2, 3], symerr=[0.5, 0.5, 0.5])\n\
             SetDataExpression('b', 'a * 2', linked=True)\n\
             AddCustom('constant', 'k', '4')\n\
             TagDatasets('mine', ['a'])\n\
             Rename('/page1/g', 'main')",
        )
        .unwrap();
        let mut doc = Document::new();
        script.run(&mut CommandInterface::new(&mut doc)).unwrap();
        assert_eq!(
            doc.setting_val("/page1/main/y/label").unwrap(),
            Value::Text("time".into())
        );
        assert_eq!(doc.data().len(), 2);
        assert_eq!(doc.customs().len(), 1);
        assert_eq!(doc.history().undo_len(), 9);
    }
    #[test]
    fn runtime_errors_have_lines() {
        let script = Script::parse("Add('page')\nRemove('/nope')\nAdd('page')").unwrap();
        let mut doc = Document::new();
        let err = script.run(&mut CommandInterface::new(&mut doc)).unwrap_err();
        assert!(matches!(err, CommandError::ScriptLine { line: 2, .. }));
        assert_eq!(doc.root().children().len(), 1);
    }
}
