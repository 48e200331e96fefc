pub mod types;
pub mod error;
pub mod numeric;
pub mod lexicon;
pub mod text;
pub mod table;
pub mod model1;
pub mod model2;
pub mod viterbi;
pub mod symmetrize;
pub mod model;
pub mod export;

pub use error::{AlignError, Result};
pub use export::{read_jsonl, write_jsonl, Direction, Side, TableRecord};
pub use lexicon::{LexiconCounter, Vocab, Vocabulary};
pub use model::{BidirectionalModel, TrainOptions};
pub use model1::Model1Trainer;
pub use model2::{Model2Trainer, TrainedModel};
pub use numeric::DecimalContext;
pub use symmetrize::{merge, symmetrize, AlignmentPairSet};
pub use table::{DistortionTable, TranslationTable};
pub use text::{render_matrix, write_moses, Corpus, SentencePair};
pub use viterbi::{Alignment, ViterbiAligner};
