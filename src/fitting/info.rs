/// Estimator selecting the objective of the fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorID {
    /// weighted least squares
    LSE,
    /// Poisson maximum likelihood
    MLE,
}

/// Identifier of a fit model. The registry in [`crate::fitting::models`]
/// maps every identifier to its evaluate/derivatives implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelID {
    Gauss1D,
    Gauss2D,
    Gauss2DElliptic,
    Gauss2DRotated,
    Cauchy2DElliptic,
    Linear1D,
    FletcherPowellHelix,
    BrownDennis,
    RamseyVarP,
}

/// Terminal state of a fit, materialized on the state output when the
/// solver exits. The integer codes are stable across the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FitState {
    Converged = 0,
    MaxIteration = 1,
    SingularHessian = 2,
    NegCurvatureMLE = 3,
}

impl FitState {
    pub fn as_code(self) -> i32 {
        self as i32
    }

    /// Whether the fit reached the convergence criterion.
    pub fn was_successful(self) -> bool {
        matches!(self, FitState::Converged)
    }
}

/// Failure raised by an inner numerical operation. The iteration driver
/// propagates it with `?` and maps it to a [`FitState`] on exit, so no
/// intermediate "still running" sentinel ever reaches the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitFailure {
    SingularHessian,
    NegCurvatureMLE,
}

impl From<FitFailure> for FitState {
    fn from(failure: FitFailure) -> Self {
        match failure {
            FitFailure::SingularHessian => FitState::SingularHessian,
            FitFailure::NegCurvatureMLE => FitState::NegCurvatureMLE,
        }
    }
}

/// Immutable dimensions and selectors of one fit.
#[derive(Debug, Clone, Copy)]
pub struct FitInfo {
    /// number of data samples
    pub n_points: usize,
    /// total number of model parameters
    pub n_parameters: usize,
    /// number of free parameters, popcount of the fit mask
    pub n_parameters_to_fit: usize,
    /// iteration cap of the solver loop
    pub max_iterations: usize,
    pub model_id: ModelID,
    pub estimator_id: EstimatorID,
    /// size of the opaque model payload in bytes
    pub user_info_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes_are_stable() {
        assert_eq!(FitState::Converged.as_code(), 0);
        assert_eq!(FitState::MaxIteration.as_code(), 1);
        assert_eq!(FitState::SingularHessian.as_code(), 2);
        assert_eq!(FitState::NegCurvatureMLE.as_code(), 3);
    }

    #[test]
    fn test_was_successful() {
        assert!(FitState::Converged.was_successful());
        assert!(!FitState::MaxIteration.was_successful());
        assert!(!FitState::from(FitFailure::SingularHessian).was_successful());
    }
}
