use thiserror::Error;

#[derive(Debug, Error)]
pub enum MathError {
    #[error("Math error - overflow")]
    Overflow,
    #[error("Math error - underflow")]
    Underflow,
    #[error("Math error - division by zero")]
    DivisionByZero,
    #[error("BitMath error - zero input value")]
    ZeroValue,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("State error - sqrtPrice out of bounds")]
    SqrtPriceOutOfBounds,
    #[error("State error - sqrtPrice is 0")]
    SqrtPriceIsZero,
    #[error("State error - sqrtRatio is 0")]
    SqrtRatioIsZero,

    #[error("State error - tick out of bounds")]
    TickOutOfBounds,
    #[error("State error - tick {tick} is not a multiple of tick spacing {tick_spacing}")]
    TickNotAligned { tick: i32, tick_spacing: i32 },
    #[error("State error - tick spacing {0} must be in 1..=i32::MAX")]
    InvalidTickSpacing(u32),

    #[error("State error - liquidity is 0")]
    LiquidityIsZero,

    #[error("State error - requested amount exceeds pool reserves")]
    InsufficientReserves,

    #[error("State error - net price impact {0} leaves no zero-impact price")]
    InvalidNetPriceImpact(i64),
}

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("Swap error - amount specified is 0")]
    AmountSpecifiedIsZero,
    #[error("Swap error - sqrtPriceLimitX96 too low")]
    SqrtPriceLimitTooLow,
    #[error("Swap error - sqrtPriceLimitX96 too high")]
    SqrtPriceLimitTooHigh,
    #[error("Swap error - next initialized tick {0} outside the global tick range")]
    TickOutOfBounds(i32),
    #[error("Swap error - step amount exceeds int256")]
    AmountExceedsInt256,
    #[error("Swap error - exact output is not supported with the dynamic fee")]
    ExactOutputWithDynamicFee,
    #[error("Swap error - initialized tick {0} has no liquidity data")]
    MissingTick(i32),
}

/// Reasons a pool cannot be quoted in its current state.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Pool error - pools with a controller are not supported")]
    UnsupportedController,
    #[error("Pool error - token {0} is not part of the pool")]
    InvalidToken(alloy_primitives::Address),
    #[error("Pool error - amount out of limits")]
    AmountOutOfLimits,
    #[error("Pool error - adjusted amount out of limits")]
    AdjustedAmountOutOfLimits,
    #[error("Pool error - liquidity calcs: zero exchange price")]
    LiquidityCalcs,
    #[error("Pool error - supply exchange price adjustment is not supported")]
    SupplyExchangePriceAdjustmentUnsupported,
    #[error("Pool error - insufficient liquidity, {0} input left unfilled")]
    InsufficientLiquidity(alloy_primitives::U256),
    #[error("Pool error - tick {0} out of range after swap")]
    TickOutOfBounds(i32),
    #[error("Pool error - amount out is 0")]
    AmountOutZero,
    #[error("Pool error - no initialized ticks")]
    TicksEmpty,
    #[error("Pool error - no simulator registered for exchange {0:?}")]
    UnknownExchange(String),
    #[error("Pool error - invalid pool address {0:?}")]
    InvalidAddress(String),
    #[error("Pool error - malformed pool data: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failures of a remote state read.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Read error - state pruned at block {block_number}: {message}")]
    MissingState { block_number: u64, message: String },
    #[error("Read error - transport: {0}")]
    Transport(String),
    #[error("Read error - decode: {0}")]
    Decode(String),
    #[error("Read error - expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl ReadError {
    /// Whether the node answered that the requested historical state is gone.
    pub fn is_missing_state(&self) -> bool {
        matches!(self, ReadError::MissingState { .. })
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("Tracker error - subgraph: {0}")]
    Subgraph(String),
    #[error("Tracker error - invalid tick data after full refetch at block {0}")]
    InvalidTicks(u64),
    #[error("Tracker error - event decode: {0}")]
    EventDecode(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    MathError(#[from] crate::error::MathError),

    #[error(transparent)]
    StateError(#[from] crate::error::StateError),

    #[error(transparent)]
    SwapError(#[from] crate::error::SwapError),

    #[error(transparent)]
    PoolError(#[from] crate::error::PoolError),

    #[error(transparent)]
    TrackerError(#[from] crate::error::TrackerError),

    #[error("Config error - {0}")]
    Config(#[from] envy::Error),
}

impl From<ReadError> for Error {
    fn from(err: ReadError) -> Self {
        Error::TrackerError(TrackerError::Read(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::PoolError(PoolError::Serde(err))
    }
}
