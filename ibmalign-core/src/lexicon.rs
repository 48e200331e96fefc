//! Word interning and the source vocabulary used for uniform initialization.

use hashbrown::{HashMap, HashSet};

use crate::text::Corpus;
use crate::types::{Token, UNKNOWN_TOKEN};

/// Bidirectional word <-> token map for one language side.
#[derive(Clone, Debug, Default)]
pub struct Vocab {
    ids: HashMap<String, Token>,
    words: Vec<String>, // index 0 reserved for UNKNOWN_TOKEN
}

impl Vocab {
    pub fn new() -> Self {
        Vocab { ids: HashMap::new(), words: vec![String::new()] }
    }

    pub fn intern(&mut self, word: &str) -> Token {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = self.words.len() as Token;
        self.words.push(word.to_string());
        self.ids.insert(word.to_string(), id);
        id
    }

    /// Token of `word`, or `UNKNOWN_TOKEN` if it was never interned.
    #[inline]
    pub fn get(&self, word: &str) -> Token {
        self.ids.get(word).copied().unwrap_or(UNKNOWN_TOKEN)
    }

    pub fn word(&self, token: Token) -> Option<&str> {
        if token == UNKNOWN_TOKEN {
            return None;
        }
        self.words.get(token as usize).map(String::as_str)
    }

    /// Interned words in token order, starting at token 1.
    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.words.iter().skip(1).map(String::as_str)
    }

    /// Printable name for diagnostics.
    pub fn display(&self, token: Token) -> String {
        match self.word(token) {
            Some(w) => format!("{w:?}"),
            None => format!("<unknown:{token}>"),
        }
    }

    /// Number of interned words, not counting the reserved slot.
    pub fn len(&self) -> usize {
        self.words.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Distinct source tokens observed across a corpus.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    tokens: HashSet<Token>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: Token) -> bool {
        self.tokens.contains(&token)
    }

    pub fn iter(&self) -> impl Iterator<Item = Token> + '_ {
        self.tokens.iter().copied()
    }
}

pub struct LexiconCounter;

impl LexiconCounter {
    pub fn count(corpus: &Corpus) -> Vocabulary {
        let mut tokens = HashSet::new();
        for pair in corpus.pairs() {
            tokens.extend(pair.source.iter().copied());
        }
        Vocabulary { tokens }
    }
}
