use crate::table::{DistortionTable, TranslationTable};
use crate::types::*;

/// Best source position for every target position. `links[j - 1]` is the
/// 1-based source position chosen for target position `j`, or
/// `NULL_POSITION` when the source sentence was empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Alignment {
    links: Vec<Position>,
}

impl Alignment {
    pub fn from_links(links: Vec<Position>) -> Self {
        Alignment { links }
    }

    #[inline]
    pub fn links(&self) -> &[Position] {
        &self.links
    }

    /// Source position for 1-based target position `j`.
    pub fn source_for(&self, j: usize) -> Option<Position> {
        j.checked_sub(1).and_then(|k| self.links.get(k)).copied()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// `(source_pos, target_pos)` pairs, sentinel links left out.
    pub fn pairs(&self) -> impl Iterator<Item = (Position, Position)> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter(|&(_, &i)| i != NULL_POSITION)
            .map(|(j, &i)| (i, (j + 1) as Position))
    }
}

pub struct ViterbiAligner;

impl ViterbiAligner {
    /// Picks `argmax_i t(e_j | f_i) * a(i | j, l_e, l_f)` for every target
    /// position. Only a strictly greater score replaces the current best, so
    /// ties go to the leftmost source position. The tables are not modified.
    pub fn align(
        target: &[Token],
        source: &[Token],
        t: &TranslationTable,
        a: &DistortionTable,
    ) -> Alignment {
        let ctx = a.context();
        let l_e = target.len();
        let l_f = source.len();
        let mut links = Vec::with_capacity(l_e);
        for (j, &e) in target.iter().enumerate() {
            let mut best_i = NULL_POSITION;
            let mut best: Option<Prob> = None;
            for (i, &f) in source.iter().enumerate() {
                let key = DistortionKey::new(i + 1, j + 1, l_e, l_f);
                let score = ctx.mul_prob(t.get(e, f), a.get(&key));
                if best.map_or(true, |b| score > b) {
                    best = Some(score);
                    best_i = (i + 1) as Position;
                }
            }
            links.push(best_i);
        }
        Alignment { links }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::DecimalContext;
    use rust_decimal::Decimal;

    fn tables() -> (TranslationTable, DistortionTable) {
        (
            TranslationTable::new(Decimal::new(5, 1)),
            DistortionTable::new(DecimalContext::default()),
        )
    }

    #[test]
    fn equal_scores_pick_the_lower_source_position() {
        let (mut t, a) = tables();
        t.set(1, 10, Decimal::new(4, 1));
        t.set(1, 20, Decimal::new(4, 1));
        let al = ViterbiAligner::align(&[1], &[10, 20], &t, &a);
        assert_eq!(al.links(), &[1]);

        t.set(1, 20, Decimal::new(41, 2));
        let al = ViterbiAligner::align(&[1], &[10, 20], &t, &a);
        assert_eq!(al.links(), &[2]);
    }

    #[test]
    fn distortion_breaks_lexical_ties() {
        let (t, mut a) = tables();
        a.set(DistortionKey::new(2, 1, 1, 2), Decimal::new(9, 1));
        let al = ViterbiAligner::align(&[7], &[3, 4], &t, &a);
        assert_eq!(al.source_for(1), Some(2));
    }

    #[test]
    fn zero_scores_still_choose_first_position() {
        let (mut t, a) = tables();
        t.set(1, 10, Decimal::ZERO);
        t.set(1, 20, Decimal::ZERO);
        let al = ViterbiAligner::align(&[1], &[10, 20], &t, &a);
        assert_eq!(al.links(), &[1]);
    }

    #[test]
    fn empty_source_yields_sentinel() {
        let (t, a) = tables();
        let al = ViterbiAligner::align(&[1, 2], &[], &t, &a);
        assert_eq!(al.links(), &[NULL_POSITION, NULL_POSITION]);
        assert_eq!(al.pairs().count(), 0);
        assert!(ViterbiAligner::align(&[], &[1], &t, &a).is_empty());
    }

    #[test]
    fn tables_are_left_untouched() {
        let (t, a) = tables();
        let before = (t.clone(), a.clone());
        ViterbiAligner::align(&[1, 2, 3], &[4, 5], &t, &a);
        assert_eq!((t, a), before);
        assert!(before.0.is_empty() && before.1.is_empty());
    }

    #[test]
    fn pairs_are_source_target_ordered() {
        let al = Alignment::from_links(vec![2, 0, 1]);
        let pairs: Vec<_> = al.pairs().collect();
        assert_eq!(pairs, vec![(2, 1), (1, 3)]);
    }
}
