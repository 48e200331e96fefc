use ibmalign_core::{write_moses, AlignmentPairSet, BidirectionalModel, Corpus, TrainOptions};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct AlignOutput {
    links_moses: String,
    forward_moses: String,
    reverse_moses: String,
}

#[wasm_bindgen]
impl AlignOutput {
    #[wasm_bindgen(getter)]
    pub fn links_moses(&self) -> String {
        self.links_moses.clone()
    }
    #[wasm_bindgen(getter)]
    pub fn forward_moses(&self) -> String {
        self.forward_moses.clone()
    }
    #[wasm_bindgen(getter)]
    pub fn reverse_moses(&self) -> String {
        self.reverse_moses.clone()
    }
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Trains both directions on whitespace-tokenized text (one sentence per
/// line) and returns symmetrized, forward and reverse links in Moses format.
#[wasm_bindgen]
pub fn align_plaintext(
    source_text: &str,
    target_text: &str,
    iterations: usize,
    precision: u32,
) -> Result<AlignOutput, JsValue> {
    let corpus = Corpus::from_parallel(target_text, source_text).map_err(js_err)?;
    let opts = TrainOptions { iterations, precision, parallel: false, cancel: None };
    let model = BidirectionalModel::train(&corpus, &opts).map_err(js_err)?;

    let mut merged = Vec::with_capacity(corpus.len());
    let mut forward = Vec::with_capacity(corpus.len());
    let mut reverse = Vec::with_capacity(corpus.len());
    for pair in corpus.pairs() {
        merged.push(model.align_tokens(pair));
        forward.push(
            model.forward.align(&pair.target, &pair.source).pairs().collect::<AlignmentPairSet>(),
        );
        reverse.push(
            model
                .backward
                .align(&pair.source, &pair.target)
                .pairs()
                .map(|(j, i)| (i, j))
                .collect::<AlignmentPairSet>(),
        );
    }

    Ok(AlignOutput {
        links_moses: write_moses(&merged),
        forward_moses: write_moses(&forward),
        reverse_moses: write_moses(&reverse),
    })
}
