use crate::component::ComponentId;
use crate::FloatValue;
use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum DecompError {
    #[error("Pool array and component registry out of sync: {pools} pools for {components} components")]
    PoolsOutOfSync { pools: usize, components: usize },
    #[error("Invalid component id {id}, the registry holds {size} components")]
    InvalidComponentId { id: ComponentId, size: usize },
    #[error("Fraction is a number in [0..1], got {0}")]
    InvalidFraction(FloatValue),
    #[error("Tried to assign component {found} to component {expected}. Component ids never change once issued")]
    IdentityMismatch {
        expected: ComponentId,
        found: ComponentId,
    },
    #[error("Time step must be positive and finite, got {0}")]
    InvalidTimeStep(FloatValue),
    #[error("Unknown component '{0}'")]
    UnknownComponent(String),
    #[error("Invalid component configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Convenience type for `Result<T, DecompError>`.
pub type DecompResult<T> = Result<T, DecompError>;
