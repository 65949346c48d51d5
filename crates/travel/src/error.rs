use thiserror::Error;

use crate::flight::CabinClass;

#[derive(Debug, Error)]
pub enum TravelError {
    #[error("Flight not found")]
    FlightNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Flight not available for {passengers} passengers in {class} class")]
    Unavailable { passengers: usize, class: CabinClass },

    #[error("This booking cannot be cancelled")]
    NotCancellable,

    #[error("Cannot update this booking")]
    NotModifiable,

    #[error("{0}")]
    CheckIn(&'static str),

    #[error("Upstream flight provider failed: {0}")]
    Upstream(String),
}

pub type TravelResult<T> = Result<T, TravelError>;
