use serde::Serialize;

/// One load-history sample as seen by the counter.
///
/// `pos` is 1-based and strictly increasing over the whole session, across
/// all `feed` calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Sample {
    pub value: f64,
    pub class: u32,
    pub pos: u64,
}

impl Sample {
    pub fn new(value: f64, class: u32, pos: u64) -> Self {
        Sample { value, class, pos }
    }
}
