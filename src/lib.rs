pub mod buffer;
pub mod eigen;
pub mod felsenstein;
pub mod kernel;
pub mod mixture;
pub mod tree;
pub mod versioned;

/// dimensional analysis types
#[cfg(not(feature = "single"))]
pub type Real = f64;
#[cfg(feature = "single")]
pub type Real = f32;
pub type LogLik = Real;
pub type BranchLength = Real;
pub type Rate = Real;
pub type Probability = Real;

/// tip observations. values >= the alphabet size mean unknown/gap.
pub type StateIndex = u8;

// transition probability floor. calibrated drivers depend on this exact value.
pub const MIN_PROB: Real = 1e-10;

// largest alphabet the StateIndex sentinel can express
pub const MAX_STATES: usize = 64;

// arena alignment for vector loads in the tuned kernels
pub const PARTIALS_ALIGN: usize = 32;

/// trait for random generation of fixtures, for tests and benches
pub trait Arbitrary {
    fn random() -> Self;
}

/// construction-time failures. everything after construction either
/// succeeds or is a caller bug surfaced by debug assertions.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("dimension {name} must be nonzero")]
    Dimension { name: &'static str },
    #[error("alphabet size {0} outside supported range 2..={MAX_STATES}")]
    Alphabet(usize),
    #[error("shape mismatch: {name} wants {expected} values, got {got}")]
    Shape {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("arena allocation of {bytes} bytes failed")]
    Alloc { bytes: usize },
}
