//! IBM Model 1: EM over lexical translation probabilities only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use log::{debug, info};
use rust_decimal::Decimal;

use crate::error::{AlignError, Result};
use crate::lexicon::{LexiconCounter, Vocabulary};
use crate::numeric::DecimalContext;
use crate::table::TranslationTable;
use crate::text::Corpus;
use crate::types::*;

#[derive(Clone, Debug, Default)]
pub struct Model1Trainer {
    ctx: DecimalContext,
    cancel: Option<Arc<AtomicBool>>,
}

impl Model1Trainer {
    pub fn new(ctx: DecimalContext) -> Self {
        Model1Trainer { ctx, cancel: None }
    }

    /// Training stops with `Cancelled` at the next iteration boundary once
    /// `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn train(&self, corpus: &Corpus, iterations: usize) -> Result<TranslationTable> {
        check_preconditions(corpus, iterations)?;
        let ctx = self.ctx;
        let vocab = LexiconCounter::count(corpus);
        let uniform = ctx.reciprocal(vocab.len()).ok_or_else(|| {
            AlignError::InvalidArgument("corpus has no source tokens".into())
        })?;
        let mut t = TranslationTable::new(uniform);
        let mut s_total: HashMap<Token, Prob> = HashMap::new();

        for it in 0..iterations {
            check_cancel(self.cancel.as_deref(), it)?;
            let mut count: HashMap<(Token, Token), Prob> = HashMap::new();
            let mut total: HashMap<Token, Prob> = HashMap::new();

            for pair in corpus.pairs() {
                if pair.is_empty() {
                    continue;
                }
                s_total.clear();
                for &e in &pair.target {
                    let mut s = Decimal::ZERO;
                    for &f in &pair.source {
                        s = ctx.add(s, t.get_or_init(e, f))?;
                    }
                    s_total.insert(e, s);
                }
                for &e in &pair.target {
                    let norm = s_total[&e];
                    for &f in &pair.source {
                        let c = ctx.div(t.get_or_init(e, f), norm).ok_or_else(|| {
                            AlignError::degenerate("s_total(e)", corpus.target_vocab().display(e))
                        })?;
                        accumulate(&ctx, &mut count, (e, f), c)?;
                        accumulate(&ctx, &mut total, f, c)?;
                    }
                }
            }

            check_coverage(&vocab, &total, corpus)?;

            for (&(e, f), &c) in &count {
                let tot = total.get(&f).copied().unwrap_or_default();
                let p = ctx.div(c, tot).ok_or_else(|| {
                    AlignError::degenerate("total(f)", corpus.source_vocab().display(f))
                })?;
                t.set(e, f, p);
            }
            debug!("model1 iteration {}/{}: {} parameters", it + 1, iterations, t.len());
        }

        info!(
            "model1 trained: {} iterations, {} sentence pairs, {} source types, {} parameters",
            iterations,
            corpus.len(),
            vocab.len(),
            t.len()
        );
        Ok(t)
    }
}

#[inline]
pub(crate) fn accumulate<K: Eq + core::hash::Hash>(
    ctx: &DecimalContext,
    map: &mut HashMap<K, Prob>,
    key: K,
    c: Prob,
) -> Result<()> {
    let slot = map.entry(key).or_insert(Decimal::ZERO);
    *slot = ctx.add(*slot, c)?;
    Ok(())
}

pub(crate) fn check_preconditions(corpus: &Corpus, iterations: usize) -> Result<()> {
    if corpus.is_empty() {
        return Err(AlignError::InvalidArgument("corpus is empty".into()));
    }
    if iterations == 0 {
        return Err(AlignError::InvalidArgument("iterations must be at least 1".into()));
    }
    Ok(())
}

pub(crate) fn check_cancel(flag: Option<&AtomicBool>, completed: usize) -> Result<()> {
    match flag {
        Some(f) if f.load(Ordering::Relaxed) => Err(AlignError::Cancelled { completed }),
        _ => Ok(()),
    }
}

/// Every source type must have received some mass this iteration.
pub(crate) fn check_coverage(
    vocab: &Vocabulary,
    total: &HashMap<Token, Prob>,
    corpus: &Corpus,
) -> Result<()> {
    let mut missing: Vec<Token> = vocab
        .iter()
        .filter(|f| total.get(f).map_or(true, |p| p.is_zero()))
        .collect();
    missing.sort_unstable();
    match missing.first() {
        Some(&f) => Err(AlignError::degenerate("total(f)", corpus.source_vocab().display(f))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_corpus() -> Corpus {
        Corpus::from_pairs([("I am a man", "Je suis un homme"), ("I am a girl", "Je suis une fille")])
            .unwrap()
    }

    fn t_of(t: &TranslationTable, corpus: &Corpus, e: &str, f: &str) -> Prob {
        t.get(corpus.target_vocab().get(e), corpus.source_vocab().get(f))
    }

    #[test]
    fn cooccurring_pair_beats_unrelated_pair() {
        let corpus = small_corpus();
        let t = Model1Trainer::default().train(&corpus, 1000).unwrap();
        let good = t_of(&t, &corpus, "I", "Je");
        let bad = t_of(&t, &corpus, "I", "fille");
        assert!(good > bad + Decimal::new(1, 1), "t(I|Je)={good} t(I|fille)={bad}");
    }

    #[test]
    fn uniform_comes_from_source_vocabulary() {
        let corpus = Corpus::from_pairs([("a", "x y z w")]).unwrap();
        let t = Model1Trainer::default().train(&corpus, 1).unwrap();
        assert_eq!(t.uniform(), Decimal::new(25, 2));
    }

    #[test]
    fn translation_probabilities_sum_to_one_per_source_word() {
        let corpus = Corpus::from_pairs([
            ("the house", "das Haus"),
            ("the book", "das Buch"),
            ("a book", "ein Buch"),
        ])
        .unwrap();
        let t = Model1Trainer::default().train(&corpus, 50).unwrap();
        for f in ["das", "Haus", "Buch", "ein"] {
            let f = corpus.source_vocab().get(f);
            let sum = t
                .iter()
                .filter(|&((_, ff), _)| ff == f)
                .fold(Decimal::ZERO, |acc, (_, p)| acc + p);
            assert!((sum - Decimal::ONE).abs() < Decimal::new(1, 2), "sum={sum}");
        }
        let the = corpus.target_vocab().get("the");
        let das = corpus.source_vocab().get("das");
        let haus = corpus.source_vocab().get("Haus");
        assert!(t.get(the, das) > t.get(the, haus));
    }

    #[test]
    fn training_is_deterministic() {
        let corpus = small_corpus();
        let a = Model1Trainer::default().train(&corpus, 20).unwrap();
        let b = Model1Trainer::default().train(&corpus, 20).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn source_word_without_partner_is_degenerate() {
        let corpus = Corpus::from_pairs([("I am", "Je suis"), ("", "orphelin")]).unwrap();
        let err = Model1Trainer::default().train(&corpus, 3).unwrap_err();
        assert_eq!(err, AlignError::degenerate("total(f)", "\"orphelin\""));
    }

    #[test]
    fn empty_target_side_alone_is_not_an_error() {
        let corpus = Corpus::from_pairs([("I am", "Je suis"), ("", "Je")]).unwrap();
        assert!(Model1Trainer::default().train(&corpus, 3).is_ok());
    }

    #[test]
    fn empty_sentence_contributes_no_counts() {
        let with_empty = Corpus::from_pairs([
            ("I am a man", "Je suis un homme"),
            ("I am a girl", "Je suis une fille"),
            ("I am", ""),
        ])
        .unwrap();
        assert_eq!(with_empty.empty_pairs(), 1);

        let base = Model1Trainer::default().train(&small_corpus(), 5).unwrap();
        let padded = Model1Trainer::default().train(&with_empty, 5).unwrap();
        assert_eq!(padded, base);
    }

    #[test]
    fn rejects_empty_corpus_and_zero_iterations() {
        let empty = Corpus::from_pairs(Vec::<(&str, &str)>::new()).unwrap();
        assert!(matches!(
            Model1Trainer::default().train(&empty, 1),
            Err(AlignError::InvalidArgument(_))
        ));
        assert!(matches!(
            Model1Trainer::default().train(&small_corpus(), 0),
            Err(AlignError::InvalidArgument(_))
        ));
    }

    #[test]
    fn cancellation_is_checked_between_iterations() {
        let flag = Arc::new(AtomicBool::new(true));
        let err = Model1Trainer::default()
            .with_cancel(flag)
            .train(&small_corpus(), 5)
            .unwrap_err();
        assert_eq!(err, AlignError::Cancelled { completed: 0 });
    }
}
