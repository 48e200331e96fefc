//! Flat `(table, key, probability)` records for persisting trained models.
//!
//! Probabilities are written as decimal strings so a reloaded model decodes
//! exactly like the one that was saved.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};
use crate::lexicon::Vocab;
use crate::model::BidirectionalModel;
use crate::model2::TrainedModel;
use crate::numeric::DecimalContext;
use crate::table::{DistortionTable, TranslationTable};
use crate::types::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Backward => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Target,
    Source,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum TableRecord {
    Meta {
        precision: u32,
    },
    /// Words of one side in token id order, so ids survive a reload.
    Vocab {
        side: Side,
        words: Vec<String>,
    },
    /// Value read for translation pairs that were never observed.
    TranslationDefault {
        direction: Direction,
        probability: Prob,
    },
    Translation {
        direction: Direction,
        target: String,
        source: String,
        probability: Prob,
    },
    Distortion {
        direction: Direction,
        source_pos: Position,
        target_pos: Position,
        target_len: Position,
        source_len: Position,
        probability: Prob,
    },
}

fn word(vocab: &Vocab, token: Token) -> Result<String> {
    vocab
        .word(token)
        .map(str::to_string)
        .ok_or_else(|| AlignError::Format(format!("token {token} has no vocabulary entry")))
}

fn direction_records(
    direction: Direction,
    model: &TrainedModel,
    target_vocab: &Vocab,
    source_vocab: &Vocab,
    out: &mut Vec<TableRecord>,
) -> Result<()> {
    out.push(TableRecord::TranslationDefault { direction, probability: model.t.uniform() });

    let mut lexical = Vec::with_capacity(model.t.len());
    for ((e, f), p) in model.t.iter() {
        lexical.push((word(target_vocab, e)?, word(source_vocab, f)?, p));
    }
    lexical.sort();
    out.extend(lexical.into_iter().map(|(target, source, probability)| {
        TableRecord::Translation { direction, target, source, probability }
    }));

    let mut distortion: Vec<(DistortionKey, Prob)> = model.a.iter().collect();
    distortion.sort_by_key(|&(k, _)| k);
    out.extend(distortion.into_iter().map(|(k, probability)| TableRecord::Distortion {
        direction,
        source_pos: k.source_pos,
        target_pos: k.target_pos,
        target_len: k.target_len,
        source_len: k.source_len,
        probability,
    }));
    Ok(())
}

impl BidirectionalModel {
    /// Records in a stable order: meta, both vocabularies, then forward and
    /// backward tables.
    pub fn to_records(&self) -> Result<Vec<TableRecord>> {
        let (tv, sv) = (self.target_vocab(), self.source_vocab());
        let mut out = vec![
            TableRecord::Meta { precision: self.forward.a.context().digits() },
            TableRecord::Vocab { side: Side::Target, words: tv.words().map(str::to_string).collect() },
            TableRecord::Vocab { side: Side::Source, words: sv.words().map(str::to_string).collect() },
        ];
        direction_records(Direction::Forward, &self.forward, tv, sv, &mut out)?;
        // backward tables are keyed the other way round
        direction_records(Direction::Backward, &self.backward, sv, tv, &mut out)?;
        Ok(out)
    }

    /// Vocab records are interned first, whatever their position in
    /// `records`; words seen only in table records are appended after them.
    pub fn from_records<I: IntoIterator<Item = TableRecord>>(records: I) -> Result<Self> {
        let mut digits = DEFAULT_PRECISION;
        let mut uniform: [Option<Prob>; 2] = [None, None];
        let mut lexical: [Vec<(String, String, Prob)>; 2] = Default::default();
        let mut distortion: [Vec<(DistortionKey, Prob)>; 2] = Default::default();
        let mut target_vocab = Vocab::new();
        let mut source_vocab = Vocab::new();

        for record in records {
            match record {
                TableRecord::Meta { precision } => digits = precision,
                TableRecord::Vocab { side, words } => {
                    let vocab = match side {
                        Side::Target => &mut target_vocab,
                        Side::Source => &mut source_vocab,
                    };
                    for w in &words {
                        vocab.intern(w);
                    }
                }
                TableRecord::TranslationDefault { direction, probability } => {
                    uniform[direction.index()] = Some(check_probability(probability)?);
                }
                TableRecord::Translation { direction, target, source, probability } => {
                    let p = check_probability(probability)?;
                    lexical[direction.index()].push((target, source, p));
                }
                TableRecord::Distortion {
                    direction,
                    source_pos,
                    target_pos,
                    target_len,
                    source_len,
                    probability,
                } => {
                    let key = DistortionKey { source_pos, target_pos, target_len, source_len };
                    distortion[direction.index()].push((key, check_probability(probability)?));
                }
            }
        }

        let ctx = DecimalContext::new(digits)?;
        let mut build = |d: Direction| -> Result<TrainedModel> {
            let i = d.index();
            let u = uniform[i].ok_or_else(|| {
                AlignError::Format(format!("missing translation_default record for {d:?}"))
            })?;
            let mut t = TranslationTable::new(u);
            for (target, source, p) in lexical[i].drain(..) {
                let (e, f) = match d {
                    Direction::Forward => (target_vocab.intern(&target), source_vocab.intern(&source)),
                    Direction::Backward => (source_vocab.intern(&target), target_vocab.intern(&source)),
                };
                t.set(e, f, p);
            }
            let mut a = DistortionTable::new(ctx);
            for (k, p) in distortion[i].drain(..) {
                a.set(k, p);
            }
            Ok(TrainedModel { t, a })
        };
        let forward = build(Direction::Forward)?;
        let backward = build(Direction::Backward)?;
        Ok(BidirectionalModel::from_parts(forward, backward, target_vocab, source_vocab))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        write_jsonl(&self.to_records()?, &mut w)?;
        w.flush()?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let records = read_jsonl(BufReader::new(File::open(path)?))?;
        BidirectionalModel::from_records(records)
    }
}

fn check_probability(p: Prob) -> Result<Prob> {
    if p.is_sign_negative() || p > Decimal::ONE {
        return Err(AlignError::Format(format!("probability {p} outside [0, 1]")));
    }
    Ok(p)
}

/// One JSON object per line.
pub fn write_jsonl<W: Write>(records: &[TableRecord], mut w: W) -> Result<()> {
    for r in records {
        serde_json::to_writer(&mut w, r)?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

pub fn read_jsonl<R: BufRead>(r: R) -> Result<Vec<TableRecord>> {
    let mut out = Vec::new();
    for (n, line) in r.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| AlignError::Format(format!("line {}: {e}", n + 1)))?;
        out.push(record);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrainOptions;
    use crate::text::Corpus;

    fn model() -> BidirectionalModel {
        let corpus = Corpus::from_pairs([
            ("the house", "das Haus"),
            ("the book", "das Buch"),
            ("a book", "ein Buch"),
        ])
        .unwrap();
        BidirectionalModel::train(&corpus, &TrainOptions { iterations: 4, ..Default::default() })
            .unwrap()
    }

    #[test]
    fn records_reload_to_an_equivalent_model() {
        let m = model();
        let records = m.to_records().unwrap();
        assert!(matches!(records[0], TableRecord::Meta { precision: 4 }));

        assert_eq!(
            records[1],
            TableRecord::Vocab {
                side: Side::Target,
                words: vec!["the".into(), "house".into(), "book".into(), "a".into()],
            }
        );

        let back = BidirectionalModel::from_records(records).unwrap();
        for w in ["the", "house", "book", "a"] {
            assert_eq!(back.target_vocab().get(w), m.target_vocab().get(w));
        }
        assert_eq!(back.forward, m.forward);
        assert_eq!(back.backward, m.backward);
        assert_eq!(back.translation_prob("the", "das"), m.translation_prob("the", "das"));
        assert_eq!(back.translation_prob("book", "Haus"), m.translation_prob("book", "Haus"));
        assert_eq!(back.forward.a, m.forward.a);
        assert_eq!(back.backward.t.len(), m.backward.t.len());
        assert_eq!(
            back.align_pair("the book", "das Buch").unwrap(),
            m.align_pair("the book", "das Buch").unwrap()
        );
    }

    #[test]
    fn jsonl_lines_carry_table_name_and_string_probability() {
        let records = vec![TableRecord::Translation {
            direction: Direction::Forward,
            target: "house".into(),
            source: "Haus".into(),
            probability: "0.9132".parse().unwrap(),
        }];
        let mut buf = Vec::new();
        write_jsonl(&records, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "{\"table\":\"translation\",\"direction\":\"forward\",\"target\":\"house\",\"source\":\"Haus\",\"probability\":\"0.9132\"}\n"
        );
        assert_eq!(read_jsonl(text.as_bytes()).unwrap(), records);
    }

    #[test]
    fn bad_line_is_a_format_error() {
        let err = read_jsonl("{\"table\":\"meta\",\"precision\":4}\n{\"table\":\"nope\"}\n".as_bytes())
            .unwrap_err();
        match err {
            AlignError::Format(msg) => assert!(msg.starts_with("line 2:"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        let records = vec![
            TableRecord::Meta { precision: 4 },
            TableRecord::TranslationDefault {
                direction: Direction::Forward,
                probability: Decimal::new(15, 1),
            },
        ];
        let err = BidirectionalModel::from_records(records).unwrap_err();
        assert!(matches!(err, AlignError::Format(msg) if msg.contains("1.5")));
    }

    #[test]
    fn missing_default_record_is_rejected() {
        let err = BidirectionalModel::from_records(vec![TableRecord::Meta { precision: 4 }]).unwrap_err();
        assert!(matches!(err, AlignError::Format(_)));
    }
}
