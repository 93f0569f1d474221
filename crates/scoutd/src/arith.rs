//! Arithmetic evaluator for spoken math ("2 plus 2", "9 divided by 3").
//!
//! Operator words are mapped to symbols, other text is dropped, and what
//! remains must be numeric literals joined by `+ - * /` with optional unary
//! minus. Anything else (parentheses, adjacent numbers, division by zero) is
//! a non-match, so the query falls through to the next classification.

/// Words that mark a query as an arithmetic question
pub const ARITHMETIC_KEYWORDS: &[&str] = &["times", "plus", "minus", "divided by"];

const OPERATOR_WORDS: &[(&str, &str)] = &[
    ("divided by", " / "),
    ("times", " * "),
    ("plus", " + "),
    ("minus", " - "),
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
}

/// True if the query uses one of the operator words
pub fn looks_like_arithmetic(query: &str) -> bool {
    ARITHMETIC_KEYWORDS.iter().any(|k| query.contains(k))
}

/// Evaluate a spoken arithmetic expression, `None` when it is not one
pub fn evaluate(query: &str) -> Option<f64> {
    let mut expr = query.to_lowercase();
    for (word, symbol) in OPERATOR_WORDS {
        expr = expr.replace(word, symbol);
    }
    let tokens = tokenize(&expr)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() || !value.is_finite() {
        return None;
    }
    Some(value)
}

/// Render a result the way people write numbers: `4`, `2.5`
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

fn tokenize(expr: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Sentence punctuation like "ok." is not a number
                if !literal.chars().any(|d| d.is_ascii_digit()) {
                    continue;
                }
                // "2 2" would otherwise read as one number
                if matches!(tokens.last(), Some(Token::Number(_))) {
                    return None;
                }
                tokens.push(Token::Number(literal.parse().ok()?));
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' | ')' => return None,
            _ => {
                chars.next();
            }
        }
    }

    if tokens.is_empty() {
        None
    } else {
        Some(tokens)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek_op(&self) -> Option<char> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn expression(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek_op() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek_op() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == '*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return None;
                }
                value /= rhs;
            }
        }
        Some(value)
    }

    /// Number with any run of leading unary minuses, folded iteratively
    fn factor(&mut self) -> Option<f64> {
        let mut negative = false;
        while self.peek_op() == Some('-') {
            negative = !negative;
            self.pos += 1;
        }
        match self.tokens.get(self.pos).copied()? {
            Token::Number(n) => {
                self.pos += 1;
                Some(if negative { -n } else { n })
            }
            Token::Op(_) => None,
        }
    }
}
