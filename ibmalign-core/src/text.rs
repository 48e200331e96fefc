use log::warn;

use crate::error::{AlignError, Result};
use crate::lexicon::Vocab;
use crate::symmetrize::AlignmentPairSet;
use crate::types::*;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SentencePair {
    pub target: Vec<Token>,
    pub source: Vec<Token>,
}

impl SentencePair {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.target.is_empty() || self.source.is_empty()
    }

    pub fn swapped(&self) -> SentencePair {
        SentencePair { target: self.source.clone(), source: self.target.clone() }
    }
}

/// Tokenized parallel corpus. Immutable once built.
#[derive(Clone, Debug, Default)]
pub struct Corpus {
    pairs: Vec<SentencePair>,
    target_vocab: Vocab,
    source_vocab: Vocab,
}

fn tokenize(line: &str, vocab: &mut Vocab, side: &str, n: usize) -> Result<Vec<Token>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() > MAX_SENT_LEN {
        return Err(AlignError::InputMismatch(format!(
            "sentence {n}: {side} too long: {} > {}",
            words.len(),
            MAX_SENT_LEN
        )));
    }
    Ok(words.into_iter().map(|w| vocab.intern(w)).collect())
}

impl Corpus {
    /// Builds a corpus from `(target, source)` sentence pairs.
    pub fn from_pairs<I, T, S>(pairs: I) -> Result<Corpus>
    where
        I: IntoIterator<Item = (T, S)>,
        T: AsRef<str>,
        S: AsRef<str>,
    {
        let mut corpus = Corpus {
            pairs: Vec::new(),
            target_vocab: Vocab::new(),
            source_vocab: Vocab::new(),
        };
        for (n, (target, source)) in pairs.into_iter().enumerate() {
            corpus.push(n + 1, target.as_ref(), source.as_ref())?;
        }
        Ok(corpus)
    }

    /// One sentence per line on each side.
    pub fn from_parallel(target_text: &str, source_text: &str) -> Result<Corpus> {
        let target: Vec<&str> = target_text.lines().collect();
        let source: Vec<&str> = source_text.lines().collect();
        if target.len() != source.len() {
            return Err(AlignError::InputMismatch(format!(
                "target has {} sentences but source has {}",
                target.len(),
                source.len()
            )));
        }
        Corpus::from_pairs(target.into_iter().zip(source))
    }

    /// One `target<TAB>source` pair per line.
    pub fn from_tsv(text: &str) -> Result<Corpus> {
        let mut pairs = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let mut fields = line.split('\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(t), Some(s), None) => pairs.push((t, s)),
                _ => {
                    return Err(AlignError::InputMismatch(format!(
                        "line {}: expected exactly one tab between target and source",
                        n + 1
                    )))
                }
            }
        }
        Corpus::from_pairs(pairs)
    }

    fn push(&mut self, n: usize, target: &str, source: &str) -> Result<()> {
        let target = tokenize(target, &mut self.target_vocab, "target", n)?;
        let source = tokenize(source, &mut self.source_vocab, "source", n)?;
        if target.is_empty() || source.is_empty() {
            warn!(
                "sentence {n}: empty {} side, pair contributes no counts",
                if target.is_empty() { "target" } else { "source" }
            );
        }
        self.pairs.push(SentencePair { target, source });
        Ok(())
    }

    /// Same corpus with the target and source roles swapped. Token ids are kept.
    pub fn reversed(&self) -> Corpus {
        Corpus {
            pairs: self.pairs.iter().map(SentencePair::swapped).collect(),
            target_vocab: self.source_vocab.clone(),
            source_vocab: self.target_vocab.clone(),
        }
    }

    /// Tokenizes a pair against the existing vocabularies without growing them.
    pub fn encode(&self, target: &str, source: &str) -> Result<SentencePair> {
        encode_with(&self.target_vocab, &self.source_vocab, target, source)
    }

    #[inline]
    pub fn pairs(&self) -> &[SentencePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs with at least one empty side.
    pub fn empty_pairs(&self) -> usize {
        self.pairs.iter().filter(|p| p.is_empty()).count()
    }

    pub fn target_vocab(&self) -> &Vocab {
        &self.target_vocab
    }

    pub fn source_vocab(&self) -> &Vocab {
        &self.source_vocab
    }
}

pub(crate) fn encode_with(
    target_vocab: &Vocab,
    source_vocab: &Vocab,
    target: &str,
    source: &str,
) -> Result<SentencePair> {
    let lookup = |line: &str, vocab: &Vocab, side: &str| -> Result<Vec<Token>> {
        let tokens: Vec<Token> = line.split_whitespace().map(|w| vocab.get(w)).collect();
        if tokens.len() > MAX_SENT_LEN {
            return Err(AlignError::InputMismatch(format!(
                "{side} too long: {} > {}",
                tokens.len(),
                MAX_SENT_LEN
            )));
        }
        Ok(tokens)
    };
    Ok(SentencePair {
        target: lookup(target, target_vocab, "target")?,
        source: lookup(source, source_vocab, "source")?,
    })
}

// Moses alignment writer: "i-j" with 0-based source and target indices.
pub fn write_moses(sentences: &[AlignmentPairSet]) -> String {
    let mut out = String::new();
    for pairs in sentences {
        let mut first = true;
        for &(i, j) in pairs.iter() {
            if i == NULL_POSITION || j == NULL_POSITION {
                continue;
            }
            if !first {
                out.push(' ');
            }
            out.push_str(&format!("{}-{}", i - 1, j - 1));
            first = false;
        }
        out.push('\n');
    }
    out
}

/// Debug matrix: one row per target word, one column per source word.
pub fn render_matrix(target: &[&str], source: &[&str], pairs: &AlignmentPairSet) -> String {
    let label_width = target.iter().map(|w| w.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    out.push_str(&" ".repeat(label_width));
    out.push_str(" |");
    for (i, w) in source.iter().enumerate() {
        out.push_str(&format!(" {}:{}", i + 1, w));
    }
    out.push('\n');
    for (j, e) in target.iter().enumerate() {
        out.push_str(&format!("{e:<label_width$} |"));
        for (i, w) in source.iter().enumerate() {
            let cell = if pairs.contains(&((i + 1) as Position, (j + 1) as Position)) { "x" } else { "." };
            let width = format!("{}:{}", i + 1, w).chars().count();
            out.push_str(&format!(" {cell:^width$}"));
        }
        out.push('\n');
    }
    out
}
