use std::str::Chars;

#[derive(Clone)]
pub struct Cursor<'a> {
    chars: Chars<'a>,
    ln: u64,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        let chars = s.chars();
        Self { chars, ln: 1 }
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    pub fn peek_2nd(&self) -> Option<char> {
        // cheap to clone
        let mut chars = self.chars.clone();
        chars.next();
        chars.next()
    }

    pub fn take(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.ln += 1;
        }
        c
    }

    pub fn skip_if(&mut self, predicate: impl Fn(char) -> bool) -> bool {
        let hit = self.peek().filter(|c| predicate(*c)).is_some();
        if hit {
            self.take();
        }
        hit
    }

    pub fn bump_if(&mut self, expected: char) -> bool {
        self.skip_if(|c| c == expected)
    }

    pub fn as_str(&self) -> &'a str {
        self.chars.as_str()
    }

    pub fn get_ln(&self) -> u64 {
        self.ln
    }
}
