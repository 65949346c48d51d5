//! Flights, airports, bookings and payments for the flight assistant.
//!
//! Flight search reads the in-memory store first, then an optional upstream
//! provider, and finally falls back to generated flights so a route always has
//! something bookable.

pub mod booking;
pub mod catalog;
pub mod error;
pub mod flight;
pub mod generator;
pub mod payment;
pub mod reference;
pub mod search;
pub mod store;

pub use booking::{
    Booking, BookingPage, BookingQuery, BookingService, BookingStats, BookingStatus, BookingUpdate,
    ContactInfo, FlightLeg, NewBooking, Passenger, PaymentMethod,
};
pub use error::{TravelError, TravelResult};
pub use flight::{CabinClass, Flight};
pub use payment::{MockPaymentProcessor, PaymentProcessor};
pub use search::{FlightProvider, FlightService, HttpFlightProvider, SearchQuery, SearchResults, SortBy};
pub use store::TravelStore;
