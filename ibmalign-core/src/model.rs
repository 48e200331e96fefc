use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::info;
use rayon::prelude::*;

use crate::error::Result;
use crate::lexicon::Vocab;
use crate::model2::{Model2Trainer, TrainedModel};
use crate::numeric::DecimalContext;
use crate::symmetrize::{symmetrize, AlignmentPairSet};
use crate::text::{encode_with, Corpus, SentencePair};
use crate::types::*;
use crate::viterbi::Alignment;

#[derive(Clone, Debug)]
pub struct TrainOptions {
    /// EM rounds for Model 1, and again for Model 2.
    pub iterations: usize,
    /// Significant digits kept by probability arithmetic.
    pub precision: u32,
    /// Train the two directions on separate threads.
    pub parallel: bool,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions {
            iterations: 10,
            precision: DEFAULT_PRECISION,
            parallel: true,
            cancel: None,
        }
    }
}

/// Forward (target <- source) and backward (source <- target) Model 2
/// parameters together with the vocabularies they are keyed by.
#[derive(Clone, Debug)]
pub struct BidirectionalModel {
    pub forward: TrainedModel,
    pub backward: TrainedModel,
    target_vocab: Vocab,
    source_vocab: Vocab,
}

impl BidirectionalModel {
    pub fn train(corpus: &Corpus, opts: &TrainOptions) -> Result<Self> {
        let ctx = DecimalContext::new(opts.precision)?;
        let mut trainer = Model2Trainer::new(ctx);
        if let Some(flag) = &opts.cancel {
            trainer = trainer.with_cancel(flag.clone());
        }
        let reversed = corpus.reversed();
        let iterations = opts.iterations;

        let (forward, backward) = if opts.parallel {
            rayon::join(
                || trainer.train(corpus, iterations),
                || trainer.train(&reversed, iterations),
            )
        } else {
            (trainer.train(corpus, iterations), trainer.train(&reversed, iterations))
        };
        let model = BidirectionalModel {
            forward: forward?,
            backward: backward?,
            target_vocab: corpus.target_vocab().clone(),
            source_vocab: corpus.source_vocab().clone(),
        };
        info!(
            "trained both directions: {} target types, {} source types",
            model.target_vocab.len(),
            model.source_vocab.len()
        );
        Ok(model)
    }

    pub fn from_parts(
        forward: TrainedModel,
        backward: TrainedModel,
        target_vocab: Vocab,
        source_vocab: Vocab,
    ) -> Self {
        BidirectionalModel { forward, backward, target_vocab, source_vocab }
    }

    pub fn target_vocab(&self) -> &Vocab {
        &self.target_vocab
    }

    pub fn source_vocab(&self) -> &Vocab {
        &self.source_vocab
    }

    pub fn encode(&self, target: &str, source: &str) -> Result<SentencePair> {
        encode_with(&self.target_vocab, &self.source_vocab, target, source)
    }

    /// Symmetrized links for one whitespace-tokenized sentence pair.
    pub fn align_pair(&self, target: &str, source: &str) -> Result<AlignmentPairSet> {
        let pair = self.encode(target, source)?;
        Ok(self.align_tokens(&pair))
    }

    pub fn align_tokens(&self, pair: &SentencePair) -> AlignmentPairSet {
        symmetrize(&pair.target, &pair.source, &self.forward, &self.backward)
    }

    /// Best source position for each target word.
    pub fn forward_alignment(&self, target: &str, source: &str) -> Result<Alignment> {
        let pair = self.encode(target, source)?;
        Ok(self.forward.align(&pair.target, &pair.source))
    }

    /// Best target position for each source word.
    pub fn backward_alignment(&self, target: &str, source: &str) -> Result<Alignment> {
        let pair = self.encode(target, source)?;
        Ok(self.backward.align(&pair.source, &pair.target))
    }

    /// Symmetrized links for every pair of `corpus`, decoded in parallel.
    /// Words are matched by spelling, so any corpus can be used.
    pub fn align_corpus(&self, corpus: &Corpus) -> Vec<AlignmentPairSet> {
        corpus
            .pairs()
            .par_iter()
            .map(|pair| self.align_tokens(&self.remap(corpus, pair)))
            .collect()
    }

    fn remap(&self, corpus: &Corpus, pair: &SentencePair) -> SentencePair {
        let map = |tokens: &[Token], from: &Vocab, to: &Vocab| -> Vec<Token> {
            tokens
                .iter()
                .map(|&tok| from.word(tok).map_or(UNKNOWN_TOKEN, |w| to.get(w)))
                .collect()
        };
        SentencePair {
            target: map(&pair.target, corpus.target_vocab(), &self.target_vocab),
            source: map(&pair.source, corpus.source_vocab(), &self.source_vocab),
        }
    }

    /// Forward t(target_word | source_word).
    pub fn translation_prob(&self, target_word: &str, source_word: &str) -> Prob {
        self.forward
            .t
            .get(self.target_vocab.get(target_word), self.source_vocab.get(source_word))
    }
}
