// Expression parser - turns source text into an AST
// Supports: numbers, names, `quoted names`, calls, + - * / and ^ (or **), unary minus, parentheses

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Variable, custom constant or dataset, resolved at evaluation time.
    Name(String),
    Neg(Box<Expr>),
    Binary {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Parse an expression. The whole input must be consumed.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(syntax(0, "empty expression"));
    }
    let (expr, pos, _) = parse_add_sub(&tokens, 0, 0)?;
    match tokens.get(pos) {
        None => Ok(expr),
        Some((at, token)) => Err(syntax(*at, format!("unexpected {token:?}"))),
    }
}

fn syntax(position: usize, message: impl Into<String>) -> ExprError {
    ExprError::Syntax {
        position,
        message: message.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

/// Tokens paired with their byte offset in the source, for error reporting.
fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(at, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '*' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '*').is_some() {
                    tokens.push((at, Token::Caret));
                } else {
                    tokens.push((at, Token::Star));
                }
                continue;
            }
            '`' => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '`')) => break,
                        Some((_, c)) => name.push(c),
                        None => return Err(syntax(at, "unterminated quoted name")),
                    }
                }
                tokens.push((at, Token::Ident(name)));
                continue;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut text = String::new();
                while let Some((_, c)) = chars.next_if(|&(_, c)| c.is_ascii_digit() || c == '.') {
                    text.push(c);
                }
                // Exponent, only if followed by a digit or sign.
                if let Some((_, e)) = chars.next_if(|&(_, c)| c == 'e' || c == 'E') {
                    text.push(e);
                    if let Some((_, sign)) = chars.next_if(|&(_, c)| c == '+' || c == '-') {
                        text.push(sign);
                    }
                    while let Some((_, c)) = chars.next_if(|&(_, c)| c.is_ascii_digit()) {
                        text.push(c);
                    }
                }
                let value = text
                    .parse::<f64>()
                    .map_err(|_| syntax(at, format!("bad number {text:?}")))?;
                tokens.push((at, Token::Number(value)));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some((_, c)) = chars.next_if(|&(_, c)| c.is_alphanumeric() || c == '_') {
                    name.push(c);
                }
                tokens.push((at, Token::Ident(name)));
                continue;
            }
            other => return Err(syntax(at, format!("unexpected character {other:?}"))),
        };
        chars.next();
        tokens.push((at, token));
    }
    Ok(tokens)
}

/// Limit on both parser recursion and the height of the resulting tree.
pub const MAX_NESTING: usize = 256;

/// Expression, next token, and height of the expression's tree.
type Parsed = Result<(Expr, usize, usize), ExprError>;

fn end_position(tokens: &[(usize, Token)]) -> usize {
    tokens.last().map_or(0, |(at, _)| at + 1)
}

fn position_of(tokens: &[(usize, Token)], pos: usize) -> usize {
    tokens
        .get(pos)
        .map_or_else(|| end_position(tokens), |(at, _)| *at)
}

fn too_deep(position: usize) -> ExprError {
    syntax(position, "expression nested too deeply")
}

fn check_depth(tokens: &[(usize, Token)], pos: usize, depth: usize) -> Result<(), ExprError> {
    if depth > MAX_NESTING {
        Err(too_deep(position_of(tokens, pos)))
    } else {
        Ok(())
    }
}

/// Height of a new node over children of the given height.
fn parent_height(tokens: &[(usize, Token)], pos: usize, height: usize) -> Result<usize, ExprError> {
    if height >= MAX_NESTING {
        Err(too_deep(position_of(tokens, pos)))
    } else {
        Ok(height + 1)
    }
}

fn parse_add_sub(tokens: &[(usize, Token)], pos: usize, depth: usize) -> Parsed {
    check_depth(tokens, pos, depth)?;
    let (mut left, mut pos, mut height) = parse_mul_div(tokens, pos, depth)?;
    loop {
        let op = match tokens.get(pos) {
            Some((_, Token::Plus)) => Op::Add,
            Some((_, Token::Minus)) => Op::Sub,
            _ => return Ok((left, pos, height)),
        };
        let (right, next, right_height) = parse_mul_div(tokens, pos + 1, depth)?;
        height = parent_height(tokens, pos, height.max(right_height))?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = next;
    }
}

fn parse_mul_div(tokens: &[(usize, Token)], pos: usize, depth: usize) -> Parsed {
    let (mut left, mut pos, mut height) = parse_unary(tokens, pos, depth)?;
    loop {
        let op = match tokens.get(pos) {
            Some((_, Token::Star)) => Op::Mul,
            Some((_, Token::Slash)) => Op::Div,
            _ => return Ok((left, pos, height)),
        };
        let (right, next, right_height) = parse_unary(tokens, pos + 1, depth)?;
        height = parent_height(tokens, pos, height.max(right_height))?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = next;
    }
}

// Unary minus binds looser than ^, so -2^2 is -(2^2).
fn parse_unary(tokens: &[(usize, Token)], pos: usize, depth: usize) -> Parsed {
    check_depth(tokens, pos, depth)?;
    match tokens.get(pos) {
        Some((_, Token::Minus)) => {
            let (inner, next, height) = parse_unary(tokens, pos + 1, depth + 1)?;
            let height = parent_height(tokens, pos, height)?;
            Ok((Expr::Neg(Box::new(inner)), next, height))
        }
        Some((_, Token::Plus)) => parse_unary(tokens, pos + 1, depth + 1),
        _ => parse_power(tokens, pos, depth),
    }
}

// Right associative: 2^3^2 is 2^(3^2).
fn parse_power(tokens: &[(usize, Token)], pos: usize, depth: usize) -> Parsed {
    let (base, pos, base_height) = parse_primary(tokens, pos, depth)?;
    if let Some((_, Token::Caret)) = tokens.get(pos) {
        let (exponent, next, exponent_height) = parse_unary(tokens, pos + 1, depth + 1)?;
        let height = parent_height(tokens, pos, base_height.max(exponent_height))?;
        Ok((
            Expr::Binary {
                op: Op::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            },
            next,
            height,
        ))
    } else {
        Ok((base, pos, base_height))
    }
}

fn parse_primary(tokens: &[(usize, Token)], pos: usize, depth: usize) -> Parsed {
    let Some((at, token)) = tokens.get(pos) else {
        return Err(syntax(end_position(tokens), "unexpected end of expression"));
    };
    match token {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1, 1)),
        Token::Ident(name) => {
            if let Some((_, Token::LParen)) = tokens.get(pos + 1) {
                let (args, next, height) = parse_args(tokens, pos + 2, depth + 1)?;
                let height = parent_height(tokens, pos, height)?;
                Ok((
                    Expr::Call {
                        name: name.clone(),
                        args,
                    },
                    next,
                    height,
                ))
            } else {
                Ok((Expr::Name(name.clone()), pos + 1, 1))
            }
        }
        Token::LParen => {
            let (inner, pos, height) = parse_add_sub(tokens, pos + 1, depth + 1)?;
            match tokens.get(pos) {
                Some((_, Token::RParen)) => Ok((inner, pos + 1, height)),
                Some((at, _)) => Err(syntax(*at, "expected `)`")),
                None => Err(syntax(end_position(tokens), "expected `)`")),
            }
        }
        other => Err(syntax(*at, format!("unexpected {other:?}"))),
    }
}

/// Arguments after the opening parenthesis, consuming the closing one.
/// The height returned is that of the tallest argument.
fn parse_args(
    tokens: &[(usize, Token)],
    mut pos: usize,
    depth: usize,
) -> Result<(Vec<Expr>, usize, usize), ExprError> {
    let mut args = Vec::new();
    let mut height = 0;
    if let Some((_, Token::RParen)) = tokens.get(pos) {
        return Ok((args, pos + 1, height));
    }
    loop {
        let (arg, next, arg_height) = parse_add_sub(tokens, pos, depth)?;
        args.push(arg);
        height = height.max(arg_height);
        match tokens.get(next) {
            Some((_, Token::Comma)) => pos = next + 1,
            Some((_, Token::RParen)) => return Ok((args, next + 1, height)),
            Some((at, _)) => return Err(syntax(*at, "expected `,` or `)`")),
            None => return Err(syntax(end_position(tokens), "unclosed call")),
        }
    }
}
