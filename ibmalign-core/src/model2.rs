//! IBM Model 2: joint EM over t(e | f) and the distortion table a(i | j, l_e, l_f),
//! seeded with a Model 1 run.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use hashbrown::HashMap;
use log::{debug, info};
use rust_decimal::Decimal;

use crate::error::{AlignError, Result};
use crate::lexicon::LexiconCounter;
use crate::model1::{accumulate, check_cancel, check_coverage, check_preconditions, Model1Trainer};
use crate::numeric::DecimalContext;
use crate::table::{DistortionTable, TranslationTable};
use crate::text::Corpus;
use crate::types::*;
use crate::viterbi::{Alignment, ViterbiAligner};

/// Parameters of one trained direction.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainedModel {
    pub t: TranslationTable,
    pub a: DistortionTable,
}

impl TrainedModel {
    #[inline]
    pub fn align(&self, target: &[Token], source: &[Token]) -> Alignment {
        ViterbiAligner::align(target, source, &self.t, &self.a)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Model2Trainer {
    ctx: DecimalContext,
    cancel: Option<Arc<AtomicBool>>,
}

impl Model2Trainer {
    pub fn new(ctx: DecimalContext) -> Self {
        Model2Trainer { ctx, cancel: None }
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Runs `iterations` rounds of Model 1, then `iterations` rounds of Model 2.
    pub fn train(&self, corpus: &Corpus, iterations: usize) -> Result<TrainedModel> {
        check_preconditions(corpus, iterations)?;
        let ctx = self.ctx;
        let mut model1 = Model1Trainer::new(ctx);
        if let Some(flag) = &self.cancel {
            model1 = model1.with_cancel(flag.clone());
        }
        let mut t = model1.train(corpus, iterations)?;
        let mut a = DistortionTable::new(ctx);
        let vocab = LexiconCounter::count(corpus);
        let mut s_total: HashMap<Token, Prob> = HashMap::new();

        for it in 0..iterations {
            check_cancel(self.cancel.as_deref(), iterations + it)?;
            let mut count: HashMap<(Token, Token), Prob> = HashMap::new();
            let mut total: HashMap<Token, Prob> = HashMap::new();
            let mut count_a: HashMap<DistortionKey, Prob> = HashMap::new();
            let mut total_a: HashMap<DistortionContext, Prob> = HashMap::new();

            for pair in corpus.pairs() {
                if pair.is_empty() {
                    continue;
                }
                let l_e = pair.target.len();
                let l_f = pair.source.len();

                // keyed by token: a repeated target word keeps the normalizer
                // of its last position
                s_total.clear();
                for (j, &e) in pair.target.iter().enumerate() {
                    let mut s = Decimal::ZERO;
                    for (i, &f) in pair.source.iter().enumerate() {
                        let key = DistortionKey::new(i + 1, j + 1, l_e, l_f);
                        s = ctx.add(s, ctx.mul(t.get_or_init(e, f), a.get_or_init(key))?)?;
                    }
                    s_total.insert(e, s);
                }

                for (j, &e) in pair.target.iter().enumerate() {
                    let norm = s_total[&e];
                    for (i, &f) in pair.source.iter().enumerate() {
                        let key = DistortionKey::new(i + 1, j + 1, l_e, l_f);
                        let joint = ctx.mul(t.get_or_init(e, f), a.get_or_init(key))?;
                        let c = ctx.div(joint, norm).ok_or_else(|| {
                            AlignError::degenerate("s_total(e)", corpus.target_vocab().display(e))
                        })?;
                        accumulate(&ctx, &mut count, (e, f), c)?;
                        accumulate(&ctx, &mut total, f, c)?;
                        accumulate(&ctx, &mut count_a, key, c)?;
                        accumulate(&ctx, &mut total_a, key.context(), c)?;
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
            for (&key, &c) in &count_a {
                let tot = total_a.get(&key.context()).copied().unwrap_or_default();
                let p = ctx.div(c, tot).ok_or_else(|| {
                    AlignError::degenerate(
                        "total_a(j, l_e, l_f)",
                        format!("({}, {}, {})", key.target_pos, key.target_len, key.source_len),
                    )
                })?;
                a.set(key, p);
            }
            debug!(
                "model2 iteration {}/{}: {} lexical, {} distortion parameters",
                it + 1,
                iterations,
                t.len(),
                a.len()
            );
        }

        info!(
            "model2 trained: {} iterations, {} lexical, {} distortion parameters",
            iterations,
            t.len(),
            a.len()
        );
        Ok(TrainedModel { t, a })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_corpus() -> Corpus {
        Corpus::from_pairs([("I am a man", "Je suis un homme"), ("I am a girl", "Je suis une fille")])
            .unwrap()
    }

    #[test]
    fn distortion_is_normalized_per_context() {
        let corpus = Corpus::from_pairs([
            ("I am a man", "Je suis un homme"),
            ("you are a man", "tu es un homme"),
            ("I sing", "Je chante"),
        ])
        .unwrap();
        let model = Model2Trainer::default().train(&corpus, 10).unwrap();

        let mut sums: HashMap<DistortionContext, Prob> = HashMap::new();
        for (key, p) in model.a.iter() {
            *sums.entry(key.context()).or_insert(Decimal::ZERO) += p;
        }
        // 4 target positions of the 4x4 pairs plus 2 of the 2x2 pair
        assert_eq!(sums.len(), 6);
        for (ctx, sum) in sums {
            assert!((sum - Decimal::ONE).abs() < Decimal::new(1, 2), "{ctx:?}: {sum}");
        }
    }

    #[test]
    fn distortion_keys_exist_for_every_observed_position() {
        let model = Model2Trainer::default().train(&small_corpus(), 2).unwrap();
        assert_eq!(model.a.len(), 16);
        assert!(model.a.contains(&DistortionKey::new(4, 4, 4, 4)));
        assert!(!model.a.contains(&DistortionKey::new(1, 1, 3, 4)));
    }

    #[test]
    fn training_is_deterministic() {
        let a = Model2Trainer::default().train(&small_corpus(), 15).unwrap();
        let b = Model2Trainer::default().train(&small_corpus(), 15).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_corpus_fails_in_model1_phase() {
        let corpus = Corpus::from_pairs([("I am", "Je suis"), ("", "seul")]).unwrap();
        let err = Model2Trainer::default().train(&corpus, 2).unwrap_err();
        assert!(err.is_degenerate());
        assert!(err.to_string().contains("seul"));
    }

    #[test]
    fn cancellation_reports_completed_iterations() {
        let flag = Arc::new(AtomicBool::new(true));
        let err = Model2Trainer::default()
            .with_cancel(flag)
            .train(&small_corpus(), 3)
            .unwrap_err();
        assert_eq!(err, AlignError::Cancelled { completed: 0 });
    }
}
