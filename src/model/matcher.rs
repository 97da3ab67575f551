// Logic for checking if tasks match filter queries.
//
// A small lexer and recursive-descent parser for boolean filter expressions
// with implicit AND, explicit OR (|), NOT (!) and grouping with parentheses.
//
// Syntax:
//   A B       -> A AND B
//   A | B     -> A OR B
//   !A        -> NOT A
//   (A | B) C -> (A OR B) AND C
//   "foo bar" -> phrase match against the title
//
// Terms:
//   #tag +project @context   exact membership (case-sensitive)
//   DUE OVERDUE NOTDUE       due state
//   INVALID                  unparsable due attribute
//   DONE                     completed tasks
//   $A                       explicit priority
//   anything else            case-insensitive title substring

use crate::model::due::DueState;
use crate::model::item::{Priority, Task, flatten};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Title(String),
    Tag(String),
    Project(String),
    Context(String),
    State(DueState),
    Done,
    Priority(Priority),
}

impl Term {
    fn from_text(raw: &str) -> Self {
        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            return Term::Title(raw[1..raw.len() - 1].to_lowercase());
        }
        match raw {
            "DUE" => return Term::State(DueState::Due),
            "OVERDUE" => return Term::State(DueState::Overdue),
            "NOTDUE" => return Term::State(DueState::NotDue),
            "INVALID" => return Term::State(DueState::Invalid),
            "DONE" => return Term::Done,
            _ => {}
        }
        let mut chars = raw.chars();
        let sigil = chars.next();
        let rest = chars.as_str();
        if !rest.is_empty() {
            match sigil {
                Some('#') => return Term::Tag(rest.to_string()),
                Some('+') => return Term::Project(rest.to_string()),
                Some('@') => return Term::Context(rest.to_string()),
                Some('$') => {
                    if let Some(p) = rest.chars().next().and_then(Priority::new)
                        && rest.len() == 1
                    {
                        return Term::Priority(p);
                    }
                }
                _ => {}
            }
        }
        Term::Title(raw.to_lowercase())
    }

    fn matches(&self, task: &Task, now: NaiveDateTime) -> bool {
        match self {
            Term::Title(needle) => task.title.to_lowercase().contains(needle.as_str()),
            Term::Tag(name) => task.has_tag(name),
            Term::Project(name) => task.has_project(name),
            Term::Context(name) => task.has_context(name),
            Term::State(state) => task.due_state(now) == Some(*state),
            Term::Done => task.done,
            Term::Priority(p) => task.explicit_priority() == Some(*p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchExpr {
    Term(Term),
    And(Box<SearchExpr>, Box<SearchExpr>),
    Or(Box<SearchExpr>, Box<SearchExpr>),
    Not(Box<SearchExpr>),
}

impl SearchExpr {
    /// `&&` and `||` short-circuit, so an AND chain stops at its first failing term.
    fn matches(&self, task: &Task, now: NaiveDateTime) -> bool {
        match self {
            SearchExpr::Term(t) => t.matches(task, now),
            SearchExpr::And(a, b) => a.matches(task, now) && b.matches(task, now),
            SearchExpr::Or(a, b) => a.matches(task, now) || b.matches(task, now),
            SearchExpr::Not(a) => !a.matches(task, now),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
enum Token {
    Text(String),
    Or,
    LParen,
    RParen,
    NotPrefix,
}

fn tokenize_query(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '|' => {
                tokens.push(Token::Or);
                chars.next();
            }
            '!' => {
                chars.next();
                // A detached '!' is just text.
                match chars.peek() {
                    Some(&next) if !next.is_whitespace() && next != '|' && next != ')' => {
                        tokens.push(Token::NotPrefix)
                    }
                    _ => tokens.push(Token::Text("!".to_string())),
                }
            }
            _ => {
                let mut term = String::new();
                let mut in_quote = false;

                while let Some(&c) = chars.peek() {
                    if c == '"' {
                        in_quote = !in_quote;
                        term.push(c);
                        chars.next();
                    } else if !in_quote && (c.is_whitespace() || matches!(c, '(' | ')' | '|')) {
                        break;
                    } else {
                        term.push(c);
                        chars.next();
                    }
                }

                if !term.is_empty() {
                    tokens.push(Token::Text(term));
                }
            }
        }
    }

    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(&mut self) -> Option<SearchExpr> {
        if self.tokens.is_empty() {
            return None;
        }
        let mut expr = self.parse_or();
        // An unmatched ')' stops parse_or early. Skip it and AND in the rest.
        while self.pos < self.tokens.len() {
            if let Some(Token::RParen) = self.peek() {
                self.advance();
                continue;
            }
            let rest = self.parse_or();
            expr = match (expr, rest) {
                (Some(l), Some(r)) => Some(SearchExpr::And(Box::new(l), Box::new(r))),
                (l, r) => l.or(r),
            };
        }
        expr
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    // OR has lowest precedence
    fn parse_or(&mut self) -> Option<SearchExpr> {
        let mut left = self.parse_and();

        while let Some(Token::Or) = self.peek() {
            self.advance();
            let right = self.parse_and();
            left = match (left, right) {
                (Some(l), Some(r)) => Some(SearchExpr::Or(Box::new(l), Box::new(r))),
                (l, r) => l.or(r),
            };
        }
        left
    }

    fn parse_and(&mut self) -> Option<SearchExpr> {
        let mut left = self.parse_unary();

        while let Some(token) = self.peek() {
            if matches!(token, Token::Or | Token::RParen) {
                break;
            }
            let right = self.parse_unary();
            left = match (left, right) {
                (Some(l), Some(r)) => Some(SearchExpr::And(Box::new(l), Box::new(r))),
                (l, r) => l.or(r),
            };
        }
        left
    }

    fn parse_unary(&mut self) -> Option<SearchExpr> {
        if let Some(Token::NotPrefix) = self.peek() {
            self.advance();
            return self
                .parse_primary()
                .map(|expr| SearchExpr::Not(Box::new(expr)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Option<SearchExpr> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_or();
                if let Some(Token::RParen) = self.peek() {
                    self.advance();
                }
                expr
            }
            Some(Token::Text(t)) => {
                let term = Term::from_text(t);
                self.advance();
                Some(SearchExpr::Term(term))
            }
            Some(_) => {
                // Stray ')' or '|': skip it.
                self.advance();
                None
            }
            None => None,
        }
    }
}

/// A parsed filter. The empty query matches every task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    expr: Option<SearchExpr>,
}

impl Query {
    pub fn parse(input: &str) -> Self {
        let mut parser = Parser::new(tokenize_query(input));
        Self {
            expr: parser.parse(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.expr.is_none()
    }

    pub fn matches(&self, task: &Task, now: NaiveDateTime) -> bool {
        self.expr.as_ref().is_none_or(|e| e.matches(task, now))
    }
}

pub fn evaluate(task: &Task, query: &str, now: NaiveDateTime) -> bool {
    Query::parse(query).matches(task, now)
}

/// Every task in the forest, children included, that matches `query`.
pub fn filter_tasks<'a>(tasks: &'a [Task], query: &Query, now: NaiveDateTime) -> Vec<&'a Task> {
    flatten(tasks)
        .into_iter()
        .filter(|t| query.matches(t, now))
        .collect()
}
