use thiserror::Error;

/// Errors raised while building or using an NTRU trapdoor.
///
/// Some variants are recoverable by drawing fresh `(f, g)` polynomials (the key generator does
/// this on its own); the rest abort the current operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrapdoorError {
    /// Polynomial length is not a power of two, or two operands have different lengths.
    #[error("polynomial length {0} is not a supported ring degree")]
    InvalidDegree(usize),

    /// The integer Bézout identity at the bottom of the solver has no unit solution.
    #[error("gcd of the field norms of f and g is not 1")]
    GcdNotOne,

    /// Babai reduction of (F, G) did not terminate within the round budget.
    #[error("coefficient reduction of (F, G) did not converge after {0} rounds")]
    ReductionDivergence(usize),

    /// The NTRU solver recursed deeper than allowed.
    #[error("NTRU solver exceeded the maximum recursion depth of {0}")]
    MaxDepthExceeded(usize),

    /// A polynomial has no inverse modulo (q, x^n + 1).
    #[error("polynomial is not invertible modulo q")]
    NotInvertible,

    /// No candidate basis passed all checks within the attempt budget.
    #[error("key generation gave up after {0} attempts")]
    KeyGenExhausted(usize),

    /// A leaf of the LDL tree holds a variance that is not a positive finite real.
    #[error("LDL tree leaf has a non-positive or non-finite variance {0}")]
    NonPositiveVariance(f64),

    /// The target standard deviation is not a positive finite real.
    #[error("sigma {0} is not a positive finite number")]
    BadSigma(f64),

    /// Rescaling the LDL tree produced a non-positive or non-finite leaf.
    #[error("LDL tree leaf became invalid ({0}) after rescaling")]
    InvalidLeafAfterScale(f64),

    /// The shape of a sampling tree does not match the length of the target vector.
    #[error("sampling tree does not match a target of length {0}")]
    StructuralMismatch(usize),

    /// The fixed-point exponential was evaluated outside its domain.
    #[error("approx_exp called with x = {x}, ccs = {ccs}")]
    InvalidExpInput { x: f64, ccs: f64 },
}

impl TrapdoorError {
    /// Returns true if the error only means the current `(f, g)` candidate is unusable and a
    /// fresh candidate may succeed.
    pub fn is_resampling_condition(&self) -> bool {
        matches!(self, Self::GcdNotOne | Self::ReductionDivergence(_))
    }
}
