use rust_decimal::Decimal;

/// 1-based sentence position. 0 is the "no match" sentinel.
pub type Position = u16;
pub type Token = u32;
pub type Prob = Decimal;

pub const NULL_POSITION: Position = 0;
/// Token id handed out for words the vocabulary has never seen.
pub const UNKNOWN_TOKEN: Token = 0;

pub const MAX_SENT_LEN: usize = 0x400;

/// Significant digits kept by every probability operation.
pub const DEFAULT_PRECISION: u32 = 4;

/// Key of the distortion table: a(i | j, l_e, l_f).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DistortionKey {
    pub source_pos: Position,
    pub target_pos: Position,
    pub target_len: Position,
    pub source_len: Position,
}

impl DistortionKey {
    #[inline]
    pub fn new(source_pos: usize, target_pos: usize, target_len: usize, source_len: usize) -> Self {
        DistortionKey {
            source_pos: source_pos as Position,
            target_pos: target_pos as Position,
            target_len: target_len as Position,
            source_len: source_len as Position,
        }
    }

    /// The (j, l_e, l_f) context this key is normalized over.
    #[inline]
    pub fn context(&self) -> DistortionContext {
        DistortionContext {
            target_pos: self.target_pos,
            target_len: self.target_len,
            source_len: self.source_len,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DistortionContext {
    pub target_pos: Position,
    pub target_len: Position,
    pub source_len: Position,
}
