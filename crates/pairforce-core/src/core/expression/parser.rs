use super::ExpressionError;
use super::program::{self, BinaryOp, Function, Node};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Identifier(String),
    Operator(char),
    LeftParen,
    RightParen,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn parse_error(position: usize, message: impl Into<String>) -> ExpressionError {
    ExpressionError::Parse {
        position,
        message: message.into(),
    }
}

fn tokenize(source: &str, offset: usize) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        let position = offset + start;
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '+' | '-' | '*' | '/' | '^' => {
                tokens.push(Token {
                    kind: TokenKind::Operator(c),
                    position,
                });
                i += 1;
            }
            '(' | ')' | ',' => {
                let kind = match c {
                    '(' => TokenKind::LeftParen,
                    ')' => TokenKind::RightParen,
                    _ => TokenKind::Comma,
                };
                tokens.push(Token { kind, position });
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = i;
                while end < chars.len() && (chars[end].1.is_ascii_digit() || chars[end].1 == '.') {
                    end += 1;
                }
                // Exponent part, e.g. 1.5e-3.
                if end < chars.len() && matches!(chars[end].1, 'e' | 'E') {
                    let mut exp_end = end + 1;
                    if exp_end < chars.len() && matches!(chars[exp_end].1, '+' | '-') {
                        exp_end += 1;
                    }
                    if exp_end < chars.len() && chars[exp_end].1.is_ascii_digit() {
                        while exp_end < chars.len() && chars[exp_end].1.is_ascii_digit() {
                            exp_end += 1;
                        }
                        end = exp_end;
                    }
                }
                let byte_end = chars.get(end).map_or(source.len(), |(b, _)| *b);
                let text = &source[start..byte_end];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| parse_error(position, format!("Invalid number '{text}'")))?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    position,
                });
                i = end;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = i;
                while end < chars.len() && (chars[end].1.is_ascii_alphanumeric() || chars[end].1 == '_')
                {
                    end += 1;
                }
                let byte_end = chars.get(end).map_or(source.len(), |(b, _)| *b);
                tokens.push(Token {
                    kind: TokenKind::Identifier(source[start..byte_end].to_string()),
                    position,
                });
                i = end;
            }
            other => {
                return Err(parse_error(position, format!("Unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    end_position: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, end_position: usize) -> Self {
        Self {
            tokens,
            cursor: 0,
            end_position,
        }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.cursor).map(|t| &t.kind)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map_or(self.end_position, |t| t.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat_operator(&mut self, op: char) -> bool {
        if self.peek() == Some(&TokenKind::Operator(op)) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ExpressionError> {
        if self.peek() == Some(&kind) {
            self.cursor += 1;
            Ok(())
        } else {
            Err(parse_error(self.position(), format!("Expected {what}")))
        }
    }

    fn parse_complete(mut self) -> Result<Node, ExpressionError> {
        if self.tokens.is_empty() {
            return Err(parse_error(self.end_position, "Empty expression"));
        }
        let node = self.parse_sum()?;
        if self.cursor < self.tokens.len() {
            return Err(parse_error(self.position(), "Unexpected trailing input"));
        }
        Ok(node)
    }

    fn parse_sum(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.parse_product()?;
        loop {
            if self.eat_operator('+') {
                node = program::add(node, self.parse_product()?);
            } else if self.eat_operator('-') {
                node = program::subtract(node, self.parse_product()?);
            } else {
                return Ok(node);
            }
        }
    }

    fn parse_product(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.parse_unary()?;
        loop {
            if self.eat_operator('*') {
                node = program::multiply(node, self.parse_unary()?);
            } else if self.eat_operator('/') {
                node = program::divide(node, self.parse_unary()?);
            } else {
                return Ok(node);
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Node, ExpressionError> {
        if self.eat_operator('-') {
            return Ok(program::negate(self.parse_unary()?));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Node, ExpressionError> {
        let base = self.parse_primary()?;
        if self.eat_operator('^') {
            let exponent = self.parse_unary()?;
            return Ok(program::power(base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Node, ExpressionError> {
        let position = self.position();
        match self.next().map(|t| t.kind) {
            Some(TokenKind::Number(value)) => Ok(Node::Constant(value)),
            Some(TokenKind::Identifier(name)) => {
                if self.peek() != Some(&TokenKind::LeftParen) {
                    return Ok(Node::Variable(name));
                }
                let function = Function::from_name(&name)
                    .ok_or_else(|| parse_error(position, format!("Unknown function '{name}'")))?;
                self.cursor += 1;
                let mut args = vec![self.parse_sum()?];
                while self.peek() == Some(&TokenKind::Comma) {
                    self.cursor += 1;
                    args.push(self.parse_sum()?);
                }
                self.expect(TokenKind::RightParen, "')' to close function call")?;
                if args.len() != function.arity() {
                    return Err(parse_error(
                        position,
                        format!(
                            "Function '{name}' expects {} argument(s), found {}",
                            function.arity(),
                            args.len()
                        ),
                    ));
                }
                Ok(program::call(function, args))
            }
            Some(TokenKind::LeftParen) => {
                let node = self.parse_sum()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(node)
            }
            Some(_) => Err(parse_error(position, "Expected a number, name or '('")),
            None => Err(parse_error(position, "Unexpected end of expression")),
        }
    }
}

fn parse_segment(source: &str, offset: usize) -> Result<Node, ExpressionError> {
    let tokens = tokenize(source, offset)?;
    Parser::new(tokens, offset + source.len()).parse_complete()
}

fn substitute(
    node: &Node,
    definitions: &HashMap<String, Node>,
    active: &mut Vec<String>,
) -> Result<Node, ExpressionError> {
    Ok(match node {
        Node::Constant(_) => node.clone(),
        Node::Variable(name) => match definitions.get(name) {
            Some(definition) => {
                if active.contains(name) {
                    return Err(ExpressionError::CyclicDefinition(name.clone()));
                }
                active.push(name.clone());
                let expanded = substitute(definition, definitions, active)?;
                active.pop();
                expanded
            }
            None => node.clone(),
        },
        Node::Negate(inner) => program::negate(substitute(inner, definitions, active)?),
        Node::Binary { op, lhs, rhs } => {
            let lhs = substitute(lhs, definitions, active)?;
            let rhs = substitute(rhs, definitions, active)?;
            match op {
                BinaryOp::Add => program::add(lhs, rhs),
                BinaryOp::Subtract => program::subtract(lhs, rhs),
                BinaryOp::Multiply => program::multiply(lhs, rhs),
                BinaryOp::Divide => program::divide(lhs, rhs),
                BinaryOp::Power => program::power(lhs, rhs),
            }
        }
        Node::Call { function, args } => {
            let args = args
                .iter()
                .map(|a| substitute(a, definitions, active))
                .collect::<Result<Vec<_>, _>>()?;
            program::call(*function, args)
        }
    })
}

pub(crate) fn parse_with_definitions(source: &str) -> Result<Node, ExpressionError> {
    let mut segments = Vec::new();
    let mut offset = 0;
    for segment in source.split(';') {
        segments.push((offset, segment));
        offset += segment.len() + 1;
    }

    let (main_offset, main_source) = segments[0];
    let main = parse_segment(main_source, main_offset)?;

    let mut definitions = HashMap::new();
    for &(offset, segment) in &segments[1..] {
        if segment.trim().is_empty() {
            continue;
        }
        let Some((name, body)) = segment.split_once('=') else {
            return Err(parse_error(offset, "Expected a definition of the form 'name = expression'"));
        };
        let name = name.trim();
        let valid_name = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(parse_error(offset, format!("Invalid definition name '{name}'")));
        }
        let body_offset = offset + segment.find('=').map_or(0, |i| i + 1);
        definitions.insert(name.to_string(), parse_segment(body, body_offset)?);
    }

    substitute(&main, &definitions, &mut Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_scientific_notation() {
        let tokens = tokenize("1.5e-3*r", 0).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number(1.5e-3));
        assert_eq!(tokens[1].kind, TokenKind::Operator('*'));
        assert_eq!(tokens[2].kind, TokenKind::Identifier("r".to_string()));
    }

    #[test]
    fn rejects_unknown_character_with_position() {
        let result = parse_with_definitions("q1 $ q2");
        assert!(matches!(result, Err(ExpressionError::Parse { position: 3, .. })));
    }

    #[test]
    fn rejects_unknown_function() {
        let result = parse_with_definitions("erfc(r)");
        assert!(matches!(result, Err(ExpressionError::Parse { position: 0, .. })));
    }

    #[test]
    fn rejects_wrong_argument_count() {
        assert!(parse_with_definitions("min(r)").is_err());
        assert!(parse_with_definitions("sqrt(r, 2)").is_err());
    }

    #[test]
    fn rejects_unbalanced_parentheses_and_trailing_input() {
        assert!(parse_with_definitions("(r+1").is_err());
        assert!(parse_with_definitions("r+1)").is_err());
        assert!(parse_with_definitions("").is_err());
    }

    #[test]
    fn reports_error_position_inside_definition_segment() {
        let result = parse_with_definitions("a*b; b=c+");
        assert!(matches!(result, Err(ExpressionError::Parse { position: 9, .. })));
    }

    #[test]
    fn rejects_malformed_definition() {
        assert!(parse_with_definitions("a; 2b=1").is_err());
        assert!(parse_with_definitions("a; b").is_err());
    }

    #[test]
    fn detects_cyclic_definitions() {
        let result = parse_with_definitions("a; a=b; b=a+1");
        assert!(matches!(result, Err(ExpressionError::CyclicDefinition(_))));
    }

    #[test]
    fn folds_constant_subtrees() {
        let node = parse_with_definitions("2*3+x*1").unwrap();
        assert_eq!(
            node,
            Node::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Node::Constant(6.0)),
                rhs: Box::new(Node::Variable("x".to_string())),
            }
        );
    }
}
