mod cursor;
mod lexer_error;
mod token;

use cursor::Cursor;
pub use lexer_error::{InnerLexError, LexError};
pub use token::{LinedToken, Token};

pub type Tokens = Vec<LinedToken>;

fn lex_operator(cursor: &mut Cursor) -> Result<Token, InnerLexError> {
    let first = cursor.take().expect("caller saw a character");

    match first {
        '=' if cursor.bump_if('=') => Ok(Token::Equal),
        '=' => Ok(Token::Assign),
        '!' if cursor.bump_if('=') => Ok(Token::NotEqual),
        '!' => Ok(Token::Not),
        '<' if cursor.bump_if('=') => Ok(Token::LessEqual),
        '<' => Ok(Token::Less),
        '>' if cursor.bump_if('=') => Ok(Token::GreaterEqual),
        '>' => Ok(Token::Greater),
        '&' if cursor.bump_if('&') => Ok(Token::And),
        '&' => Ok(Token::Ampersand),
        '|' if cursor.bump_if('|') => Ok(Token::Or),
        '.' if cursor.peek() == Some('.') && cursor.peek_2nd() == Some('.') => {
            cursor.take();
            cursor.take();
            Ok(Token::Ellipsis)
        }
        _ => Err(InnerLexError::UnexpectedChar(first)),
    }
}

fn lex_number(cursor: &mut Cursor) -> Result<Token, InnerLexError> {
    let start = cursor.as_str();
    let mut count = 0;

    while cursor.skip_if(|c| c.is_ascii_digit()) {
        count += 1;
    }

    let is_bad = |c: &char| c.is_alphabetic() || *c == '_';
    if let Some(bad_suffix) = cursor.peek().filter(is_bad) {
        return Err(InnerLexError::BadConstantSuffix(bad_suffix));
    }

    let digits = &start[..count];
    digits
        .parse::<i64>()
        .map(Token::Number)
        .map_err(|_| InnerLexError::BadNumericConstant(digits.to_owned()))
}

fn lex_identifier(cursor: &mut Cursor) -> Token {
    let start = cursor.as_str();
    let mut len = 0;

    let predicate = |c: char| c.is_ascii_alphanumeric() || c == '_';
    while cursor.skip_if(predicate) {
        len += 1;
    }

    Token::from(&start[..len])
}

/// Scan a quoted literal, leaving escape sequences for the parser to
/// process but honoring them so an escaped quote does not end the literal.
fn lex_quoted(cursor: &mut Cursor, quote: char, err: InnerLexError) -> Result<Token, InnerLexError> {
    cursor.take();
    let mut text = String::new();

    loop {
        let Some(c) = cursor.take() else {
            return Err(err);
        };

        if c == quote {
            break;
        }

        text.push(c);

        if c == '\\' {
            let Some(escaped) = cursor.take() else {
                return Err(err);
            };
            text.push(escaped);
        }
    }

    if quote == '"' {
        Ok(Token::StringLiteral(text))
    } else {
        Ok(Token::CharacterLiteral(text))
    }
}

/// Skip whitespace and both comment forms.
fn skip_blanks(cursor: &mut Cursor) -> Result<(), InnerLexError> {
    loop {
        while cursor.skip_if(char::is_whitespace) {}

        if cursor.peek() != Some('/') {
            return Ok(());
        }

        match cursor.peek_2nd() {
            Some('/') => {
                while cursor.peek().is_some() && !cursor.bump_if('\n') {
                    cursor.take();
                }
            }
            Some('*') => {
                cursor.take();
                cursor.take();
                loop {
                    match cursor.take() {
                        None => return Err(InnerLexError::UnterminatedComment),
                        Some('*') if cursor.peek() == Some('/') => {
                            cursor.take();
                            break;
                        }
                        Some(_) => {}
                    }
                }
            }
            _ => return Ok(()),
        }
    }
}

pub fn lex(input: &str) -> Result<Tokens, LexError> {
    let mut tokens = Tokens::new();
    let mut cursor = Cursor::new(input);

    loop {
        let ln = cursor.get_ln();
        skip_blanks(&mut cursor).map_err(|err| err.set_line(ln))?;

        let Some(peek) = cursor.peek() else {
            break;
        };

        let ln = cursor.get_ln();
        let set_line = |t: Token| LinedToken::new(t, ln);
        let set_err_line = |err: InnerLexError| err.set_line(ln);
        let token = match peek {
            ';' | '{' | '}' | '(' | ')' | '[' | ']' | ',' | '+' | '-' | '*' | '/' | '%' => {
                cursor.take();
                Token::try_from(peek)
            }
            '=' | '!' | '<' | '>' | '&' | '|' | '.' => lex_operator(&mut cursor),
            '"' => lex_quoted(&mut cursor, '"', InnerLexError::UnterminatedString),
            '\'' => lex_quoted(&mut cursor, '\'', InnerLexError::UnterminatedCharacter),
            '_' | 'a'..='z' | 'A'..='Z' => Ok(lex_identifier(&mut cursor)),
            '0'..='9' => lex_number(&mut cursor),
            _ => Err(InnerLexError::UnexpectedChar(peek)),
        }
        .map(set_line)
        .map_err(set_err_line)?;
        tokens.push(token);
    }

    Ok(tokens)
}
