//! Sparse probability tables with lazily materialized defaults.

use hashbrown::HashMap;

use crate::numeric::DecimalContext;
use crate::types::*;

/// t(e | f), keyed by (target token, source token).
#[derive(Clone, Debug, PartialEq)]
pub struct TranslationTable {
    probs: HashMap<(Token, Token), Prob>,
    uniform: Prob,
}

impl TranslationTable {
    pub fn new(uniform: Prob) -> Self {
        TranslationTable { probs: HashMap::new(), uniform }
    }

    /// Stored value, or the uniform initialization for pairs never observed.
    #[inline]
    pub fn get(&self, e: Token, f: Token) -> Prob {
        self.probs.get(&(e, f)).copied().unwrap_or(self.uniform)
    }

    #[inline]
    pub fn get_or_init(&mut self, e: Token, f: Token) -> Prob {
        *self.probs.entry((e, f)).or_insert(self.uniform)
    }

    #[inline]
    pub fn set(&mut self, e: Token, f: Token, p: Prob) {
        self.probs.insert((e, f), p);
    }

    pub fn contains(&self, e: Token, f: Token) -> bool {
        self.probs.contains_key(&(e, f))
    }

    pub fn uniform(&self) -> Prob {
        self.uniform
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((Token, Token), Prob)> + '_ {
        self.probs.iter().map(|(&k, &p)| (k, p))
    }
}

/// a(i | j, l_e, l_f). A missing key defaults to 1/(l_f + 1) of that key.
#[derive(Clone, Debug, PartialEq)]
pub struct DistortionTable {
    probs: HashMap<DistortionKey, Prob>,
    ctx: DecimalContext,
}

impl DistortionTable {
    pub fn new(ctx: DecimalContext) -> Self {
        DistortionTable { probs: HashMap::new(), ctx }
    }

    #[inline]
    fn default_for(&self, key: &DistortionKey) -> Prob {
        // l_f + 1 >= 1, so the reciprocal always exists
        self.ctx.reciprocal(key.source_len as usize + 1).unwrap_or_default()
    }

    #[inline]
    pub fn get(&self, key: &DistortionKey) -> Prob {
        match self.probs.get(key) {
            Some(&p) => p,
            None => self.default_for(key),
        }
    }

    #[inline]
    pub fn get_or_init(&mut self, key: DistortionKey) -> Prob {
        if let Some(&p) = self.probs.get(&key) {
            return p;
        }
        let p = self.default_for(&key);
        self.probs.insert(key, p);
        p
    }

    #[inline]
    pub fn set(&mut self, key: DistortionKey, p: Prob) {
        self.probs.insert(key, p);
    }

    pub fn contains(&self, key: &DistortionKey) -> bool {
        self.probs.contains_key(key)
    }

    pub fn context(&self) -> DecimalContext {
        self.ctx
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DistortionKey, Prob)> + '_ {
        self.probs.iter().map(|(&k, &p)| (k, p))
    }
}
