pub mod compare;
pub mod complex;
pub mod fft;

use complex::Complex;

/// Frequency-domain representation of one decoded sample sequence.
///
/// Its length is always a power of two.
#[derive(Clone, Debug, PartialEq)]
pub struct Fingerprint(Vec<Complex>);

impl Fingerprint {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Complex] {
        &self.0
    }
}
