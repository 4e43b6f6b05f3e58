#![deny(missing_docs)]

//! # Condition Interpretation
//!
//! Flows guard themselves with condition expressions such as
//! `(proxy.pathsuffix MatchesPath "/orders/{id}") and (request.verb = "GET")`.
//! This module tokenizes and parses that grammar, then walks the tree for
//! the two constraints routing cares about: an equality pin on
//! `request.verb` and a path pin on `proxy.pathsuffix`.
//!
//! Parsing is total. Fragments that do not fit the grammar degrade to
//! opaque leaves instead of failing, so a condition full of runtime checks
//! still surfaces whatever routing constraints it carries.

use std::sync::OnceLock;

use regex::Regex;

const REQUEST_VERB: &str = "request.verb";
const PROXY_PATHSUFFIX: &str = "proxy.pathsuffix";

/// Routing constraints recognized in one flow condition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowCondition {
    /// Pinned HTTP method, lowercased, when the condition pins one.
    pub method: Option<String>,
    /// Pinned path-suffix pattern with `{name}` placeholders, when present.
    pub path_suffix: Option<String>,
}

impl FlowCondition {
    /// Parses a condition expression, keeping whatever constraints are
    /// recognizable. The first pin of each kind wins.
    pub fn parse(input: &str) -> Self {
        let tokens = tokenize(input);
        let expr = Parser::new(tokens).parse();
        let mut condition = FlowCondition::default();
        collect(&expr, &mut condition);
        condition
    }

    /// True when the condition pins neither a method nor a path suffix.
    pub fn is_empty(&self) -> bool {
        self.method.is_none() && self.path_suffix.is_none()
    }
}

/// Lists the `{name}` placeholders of a path pattern, left to right.
/// Empty braces are not placeholders. Duplicates are kept.
pub fn path_placeholders(pattern: &str) -> Vec<&str> {
    static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex =
        PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"\{([^}]+)}").expect("Invalid regex"));
    regex
        .captures_iter(pattern)
        .filter_map(|capture| capture.get(1).map(|group| group.as_str()))
        .collect()
}

/// Comparison operators of the condition grammar. Only equality and the
/// path-match family steer routing; the rest parse but carry no routing
/// meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Equals,
    NotEquals,
    MatchesPath,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Cmp(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn keyword(word: &str) -> Option<Token> {
    // Keyword operators are matched without case, symbol aliases included
    // below in the tokenizer.
    let folded = word.to_ascii_lowercase();
    let token = match folded.as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "equals" | "is" => Token::Cmp(CmpOp::Equals),
        "notequals" | "isnot" => Token::Cmp(CmpOp::NotEquals),
        "matchespath" | "likepath" => Token::Cmp(CmpOp::MatchesPath),
        "matches" | "like" | "javaregex" | "startswith" | "greaterthan" | "lesserthan"
        | "greaterthanorequals" | "lesserthanorequals" => Token::Cmp(CmpOp::Other),
        _ => return None,
    };
    Some(token)
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '"' => {
                // Scan to the closing quote; an unterminated literal drops
                // the fragment rather than the whole condition.
                let start = index + 1;
                let mut end = None;
                for (quote_index, quote_char) in chars.by_ref() {
                    if quote_char == '"' {
                        end = Some(quote_index);
                        break;
                    }
                }
                if let Some(end) = end {
                    tokens.push(Token::Str(input[start..end].to_string()));
                }
            }
            '=' => match chars.peek() {
                Some((_, '=')) => {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Equals));
                }
                Some((_, '|')) => {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Other));
                }
                _ => tokens.push(Token::Cmp(CmpOp::Equals)),
            },
            '!' => {
                if let Some((_, '=')) = chars.peek() {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::NotEquals));
                } else {
                    tokens.push(Token::Not);
                }
            }
            '~' => match chars.peek() {
                Some((_, '/')) => {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::MatchesPath));
                }
                Some((_, '~')) => {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Other));
                }
                _ => tokens.push(Token::Cmp(CmpOp::Other)),
            },
            '<' | '>' => {
                if let Some((_, '=')) = chars.peek() {
                    chars.next();
                }
                tokens.push(Token::Cmp(CmpOp::Other));
            }
            '&' => {
                if let Some((_, '&')) = chars.peek() {
                    chars.next();
                }
                tokens.push(Token::And);
            }
            '|' => {
                if let Some((_, '|')) = chars.peek() {
                    chars.next();
                }
                tokens.push(Token::Or);
            }
            c if is_ident_char(c) => {
                let mut end = index + c.len_utf8();
                while let Some((next_index, next_char)) = chars.peek().copied() {
                    if !is_ident_char(next_char) {
                        break;
                    }
                    end = next_index + next_char.len_utf8();
                    chars.next();
                }
                let word = &input[index..end];
                tokens.push(keyword(word).unwrap_or_else(|| Token::Ident(word.to_string())));
            }
            // Anything else is noise the grammar never produces.
            _ => {}
        }
    }
    tokens
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Variable(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        variable: String,
        op: CmpOp,
        value: Operand,
    },
    Atom(Operand),
    Opaque,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn parse(mut self) -> Expr {
        let mut expr = self.or_expr();
        // Leftover fragments (stray parens, doubled operators) fold in so
        // their recognizable comparisons still surface.
        while !self.at_end() {
            let rest = self.or_expr();
            expr = Expr::And(Box::new(expr), Box::new(rest));
        }
        expr
    }

    fn or_expr(&mut self) -> Expr {
        let mut left = self.and_expr();
        while self.eat(&Token::Or) {
            let right = self.and_expr();
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        left
    }

    fn and_expr(&mut self) -> Expr {
        let mut left = self.primary();
        while self.eat(&Token::And) {
            let right = self.primary();
            left = Expr::And(Box::new(left), Box::new(right));
        }
        left
    }

    // Each call consumes at least one token unless the input is exhausted,
    // which keeps the outer loops finite.
    fn primary(&mut self) -> Expr {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.or_expr();
                self.eat(&Token::RParen);
                inner
            }
            Some(Token::Not) => Expr::Not(Box::new(self.primary())),
            Some(Token::Ident(variable)) => {
                if let Some(Token::Cmp(op)) = self.peek() {
                    let op = *op;
                    self.pos += 1;
                    match self.operand() {
                        Some(value) => Expr::Compare {
                            variable,
                            op,
                            value,
                        },
                        None => Expr::Opaque,
                    }
                } else {
                    Expr::Atom(Operand::Variable(variable))
                }
            }
            Some(Token::Str(value)) => Expr::Atom(Operand::Literal(value)),
            Some(_) => Expr::Opaque,
            None => Expr::Opaque,
        }
    }

    fn operand(&mut self) -> Option<Operand> {
        match self.peek() {
            Some(Token::Ident(_)) => match self.next() {
                Some(Token::Ident(name)) => Some(Operand::Variable(name)),
                _ => None,
            },
            Some(Token::Str(_)) => match self.next() {
                Some(Token::Str(value)) => Some(Operand::Literal(value)),
                _ => None,
            },
            _ => None,
        }
    }
}

fn collect(expr: &Expr, condition: &mut FlowCondition) {
    match expr {
        Expr::And(left, right) | Expr::Or(left, right) => {
            collect(left, condition);
            collect(right, condition);
        }
        // A negated pin still names the route; it surfaces like the plain form.
        Expr::Not(inner) => collect(inner, condition),
        Expr::Compare {
            variable,
            op,
            value: Operand::Literal(value),
        } => match (variable.as_str(), op) {
            (REQUEST_VERB, CmpOp::Equals) => {
                if condition.method.is_none() {
                    condition.method = Some(value.to_ascii_lowercase());
                }
            }
            (PROXY_PATHSUFFIX, CmpOp::MatchesPath) => {
                if condition.path_suffix.is_none() {
                    condition.path_suffix = Some(value.clone());
                }
            }
            _ => {}
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parsed(input: &str) -> FlowCondition {
        FlowCondition::parse(input)
    }

    #[test]
    fn test_verb_operator_form() {
        let condition = parsed("request.verb = \"GET\"");
        assert_eq!(condition.method.as_deref(), Some("get"));
        assert_eq!(condition.path_suffix, None);
    }

    #[test]
    fn test_verb_double_equals() {
        assert_eq!(parsed("request.verb == \"POST\"").method.as_deref(), Some("post"));
    }

    #[test]
    fn test_verb_keyword_form() {
        assert_eq!(parsed("request.verb equals \"DELETE\"").method.as_deref(), Some("delete"));
        assert_eq!(parsed("request.verb Equals \"PUT\"").method.as_deref(), Some("put"));
    }

    #[test]
    fn test_pathsuffix_keyword_and_symbol() {
        assert_eq!(
            parsed("proxy.pathsuffix MatchesPath \"/orders/{id}\"").path_suffix.as_deref(),
            Some("/orders/{id}")
        );
        assert_eq!(
            parsed("proxy.pathsuffix ~/ \"/orders\"").path_suffix.as_deref(),
            Some("/orders")
        );
    }

    #[test]
    fn test_conjunction_both_orders() {
        let forward = parsed("(proxy.pathsuffix MatchesPath \"/{id}\") and (request.verb = \"GET\")");
        assert_eq!(forward.method.as_deref(), Some("get"));
        assert_eq!(forward.path_suffix.as_deref(), Some("/{id}"));

        let reverse = parsed("request.verb = \"GET\" && proxy.pathsuffix MatchesPath \"/{id}\"");
        assert_eq!(reverse.method.as_deref(), Some("get"));
        assert_eq!(reverse.path_suffix.as_deref(), Some("/{id}"));
    }

    #[test]
    fn test_uppercase_connectives() {
        let condition = parsed("proxy.pathsuffix MatchesPath \"/a\" AND request.verb = \"HEAD\"");
        assert_eq!(condition.method.as_deref(), Some("head"));
        assert_eq!(condition.path_suffix.as_deref(), Some("/a"));
    }

    #[test]
    fn test_first_pin_wins() {
        let condition = parsed("request.verb = \"GET\" or request.verb = \"POST\"");
        assert_eq!(condition.method.as_deref(), Some("get"));

        let suffixes =
            parsed("proxy.pathsuffix MatchesPath \"/a\" or proxy.pathsuffix MatchesPath \"/b\"");
        assert_eq!(suffixes.path_suffix.as_deref(), Some("/a"));
    }

    #[test]
    fn test_unrelated_clauses_are_ignored() {
        let condition =
            parsed("flag.enabled = true and response.status.code = 200 and request.verb = \"PATCH\"");
        assert_eq!(condition.method.as_deref(), Some("patch"));
        assert_eq!(condition.path_suffix, None);
    }

    #[test]
    fn test_inequality_does_not_pin() {
        assert!(parsed("request.verb != \"DELETE\"").is_empty());
        assert!(parsed("proxy.pathsuffix Matches \"/orders*\"").is_empty());
    }

    #[test]
    fn test_negated_group_still_surfaces() {
        let condition = parsed("!(request.verb = \"GET\")");
        assert_eq!(condition.method.as_deref(), Some("get"));
    }

    #[test]
    fn test_garbage_degrades_to_empty() {
        assert!(parsed("").is_empty());
        assert!(parsed("   ").is_empty());
        assert!(parsed("))) @@@ (((").is_empty());
        assert!(parsed("request.verb = ").is_empty());
        assert!(parsed("request.verb = \"GET").is_empty());
    }

    #[test]
    fn test_pin_survives_surrounding_garbage() {
        let condition = parsed(")( request.verb = \"GET\" ~~ extra");
        assert_eq!(condition.method.as_deref(), Some("get"));
    }

    #[test]
    fn test_multiline_condition() {
        let condition = parsed("proxy.pathsuffix MatchesPath \"/orders/{id}\"\n  and request.verb = \"PUT\"");
        assert_eq!(condition.method.as_deref(), Some("put"));
        assert_eq!(condition.path_suffix.as_deref(), Some("/orders/{id}"));
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(path_placeholders("/orders/{id}"), vec!["id"]);
        assert_eq!(path_placeholders("/{tenant}/items/{item}"), vec!["tenant", "item"]);
        assert!(path_placeholders("/plain/path").is_empty());
        assert!(path_placeholders("/{}").is_empty());
        assert_eq!(path_placeholders("/{id}/x/{id}"), vec!["id", "id"]);
    }
}
