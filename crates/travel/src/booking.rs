use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{TravelError, TravelResult};
use crate::flight::{CabinClass, Flight};
use crate::payment::PaymentProcessor;
use crate::reference::{random_reference, unique_reference};
use crate::store::TravelStore;

pub const BOOKING_FEE: u32 = 25;
const TAX_RATE: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Title {
    Mr,
    Mrs,
    Ms,
    Dr,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealPreference {
    Vegetarian,
    Vegan,
    Halal,
    Kosher,
    #[default]
    Regular,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub title: Title,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_number: Option<String>,
    #[serde(default)]
    pub meal_preference: MealPreference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    BankTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub amount: u32,
    pub currency: String,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Confirmed,
    Pending,
    Cancelled,
    Completed,
    NoShow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TripType {
    #[default]
    OneWay,
    RoundTrip,
    MultiCity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightLeg {
    #[default]
    Outbound,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub base: u32,
    pub taxes: u32,
    pub fees: u32,
    pub total: u32,
}

/// Per-passenger base and taxes, one booking fee.
pub fn calculate_pricing(flight: &Flight, class: CabinClass, passengers: u32) -> Pricing {
    let base = flight.price.get(class);
    let taxes = (base as f64 * TAX_RATE).round() as u32;
    Pricing {
        base,
        taxes,
        fees: BOOKING_FEE,
        total: base * passengers + taxes * passengers + BOOKING_FEE,
    }
}

pub fn seat_number<R: Rng + ?Sized>(rng: &mut R, class: CabinClass) -> String {
    let (rows, letters): (std::ops::RangeInclusive<u32>, &[u8]) = match class {
        CabinClass::First => (1..=4, b"ABEF"),
        CabinClass::Business => (5..=12, b"ABCDEF"),
        CabinClass::Premium => (13..=20, b"ABCDEF"),
        CabinClass::Economy => (21..=50, b"ABCDEF"),
    };
    let row = rng.gen_range(rows);
    let letter = letters.choose(rng).copied().unwrap_or(b'A') as char;
    format!("{}{}", row, letter)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightBooking {
    pub flight: Flight,
    pub class_type: CabinClass,
    pub passengers: Vec<Passenger>,
    pub price: Pricing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInStatus {
    pub outbound: bool,
    #[serde(rename = "return")]
    pub return_leg: bool,
}

impl CheckInStatus {
    fn get_mut(&mut self, leg: FlightLeg) -> &mut bool {
        match leg {
            FlightLeg::Outbound => &mut self.outbound,
            FlightLeg::Return => &mut self.return_leg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationKind {
    DateChange,
    PassengerInfo,
    SeatChange,
    MealChange,
    Cancellation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modification {
    #[serde(rename = "type")]
    pub kind: ModificationKind,
    pub description: String,
    pub fee: f64,
    pub modified_at: DateTime<Utc>,
    pub modified_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Processed,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
    pub refund_amount: f64,
    pub refund_status: RefundStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub booking_reference: String,
    pub user: String,
    pub flights: Vec<FlightBooking>,
    pub contact_info: ContactInfo,
    pub payment_info: PaymentInfo,
    pub booking_status: BookingStatus,
    pub trip_type: TripType,
    pub total_amount: u32,
    pub booking_date: DateTime<Utc>,
    pub check_in_status: CheckInStatus,
    pub modifications: Vec<Modification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<Cancellation>,
}

impl Booking {
    pub fn total_passengers(&self) -> usize {
        self.flights.iter().map(|f| f.passengers.len()).sum()
    }

    /// Departures of every booked flight.
    fn departures(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.flights.iter().map(|f| f.flight.departure_at())
    }

    fn is_closed(&self) -> bool {
        matches!(self.booking_status, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Open bookings whose flights all leave at least 24 hours after `now`.
    pub fn can_cancel(&self, now: DateTime<Utc>) -> bool {
        !self.is_closed() && self.departures().all(|d| (d - now).num_seconds() >= 24 * 3600)
    }

    /// Full refund 30 days out, 80% inside 30 days, 50% inside a week.
    pub fn refund_amount(&self, now: DateTime<Utc>) -> f64 {
        if !self.can_cancel(now) {
            return 0.0;
        }

        let share = self
            .departures()
            .map(|d| {
                let days = (d - now).num_seconds() as f64 / 86_400.0;
                if days < 7.0 {
                    0.5
                } else if days < 30.0 {
                    0.8
                } else {
                    1.0
                }
            })
            .fold(1.0_f64, f64::min);

        self.total_amount as f64 * share
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardingPassenger {
    pub name: String,
    #[serde(rename = "seatNumber")]
    pub seat_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardingDeparture {
    pub airport: String,
    pub date: NaiveDate,
    pub time: String,
    pub gate: Option<String>,
    pub terminal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardingArrival {
    pub airport: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardingPass {
    pub booking_reference: String,
    pub flight_number: String,
    pub passenger: BoardingPassenger,
    pub departure: BoardingDeparture,
    pub arrival: BoardingArrival,
    pub barcode: String,
    pub qr_code: String,
}

fn boarding_pass(booking: &Booking, now: DateTime<Utc>) -> Option<BoardingPass> {
    let segment = booking.flights.first()?;
    let passenger = segment.passengers.first()?;
    let flight = &segment.flight;
    let mut rng = rand::thread_rng();

    Some(BoardingPass {
        booking_reference: booking.booking_reference.clone(),
        flight_number: flight.flight_number.clone(),
        passenger: BoardingPassenger {
            name: format!("{} {}", passenger.first_name, passenger.last_name),
            seat_number: passenger.seat_number.clone(),
        },
        departure: BoardingDeparture {
            airport: format!("{} ({})", flight.origin.name, flight.origin.code),
            date: flight.departure.date,
            time: flight.departure.time.clone(),
            gate: flight.origin.gate.clone(),
            terminal: flight.origin.terminal.clone(),
        },
        arrival: BoardingArrival {
            airport: format!("{} ({})", flight.destination.name, flight.destination.code),
            time: flight.arrival.time.clone(),
        },
        barcode: (0..12).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect(),
        qr_code: format!("BOOKING:{}:{}", booking.booking_reference, now.timestamp_millis()),
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub flight_id: String,
    #[serde(default)]
    pub class_type: CabinClass,
    pub passengers: Vec<Passenger>,
    pub contact_info: ContactInfo,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub trip_type: TripType,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    pub contact_info: Option<ContactInfo>,
    pub passengers: Option<Vec<Passenger>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingPage {
    pub bookings: Vec<Booking>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledBooking {
    pub booking: Booking,
    pub refund_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckedIn {
    pub booking: Booking,
    pub boarding_pass: BoardingPass,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationCount {
    pub destination: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStats {
    pub total_bookings: usize,
    pub confirmed_bookings: usize,
    pub cancelled_bookings: usize,
    pub total_spent: u64,
    pub upcoming_trips: usize,
    pub past_trips: usize,
    pub frequent_destinations: Vec<DestinationCount>,
    pub average_booking_value: u32,
}

pub fn booking_stats(bookings: &[Booking], now: DateTime<Utc>) -> BookingStats {
    let confirmed: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.booking_status == BookingStatus::Confirmed)
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for segment in bookings.iter().flat_map(|b| &b.flights) {
        *counts.entry(segment.flight.destination.code.as_str()).or_default() += 1;
    }
    let mut frequent: Vec<DestinationCount> = counts
        .into_iter()
        .map(|(destination, count)| DestinationCount { destination: destination.to_string(), count })
        .collect();
    frequent.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.destination.cmp(&b.destination)));
    frequent.truncate(5);

    let total_value: u64 = bookings.iter().map(|b| b.total_amount as u64).sum();

    BookingStats {
        total_bookings: bookings.len(),
        confirmed_bookings: confirmed.len(),
        cancelled_bookings: bookings
            .iter()
            .filter(|b| b.booking_status == BookingStatus::Cancelled)
            .count(),
        total_spent: confirmed.iter().map(|b| b.total_amount as u64).sum(),
        upcoming_trips: confirmed
            .iter()
            .filter(|b| b.departures().any(|d| d > now))
            .count(),
        past_trips: confirmed
            .iter()
            .filter(|b| b.departures().all(|d| d < now))
            .count(),
        frequent_destinations: frequent,
        average_booking_value: if bookings.is_empty() {
            0
        } else {
            (total_value as f64 / bookings.len() as f64).round() as u32
        },
    }
}

pub struct BookingService {
    store: Arc<TravelStore>,
    payments: Arc<dyn PaymentProcessor>,
}

impl BookingService {
    pub fn new(store: Arc<TravelStore>, payments: Arc<dyn PaymentProcessor>) -> Self {
        Self { store, payments }
    }

    pub async fn create(&self, user_id: &str, request: NewBooking) -> TravelResult<Booking> {
        let count = request.passengers.len();
        let flight = self
            .store
            .reserve_seats(&request.flight_id, request.class_type, count)
            .await?;

        let pricing = calculate_pricing(&flight, request.class_type, count as u32);
        let passengers = {
            let mut rng = rand::thread_rng();
            request
                .passengers
                .into_iter()
                .map(|p| Passenger { seat_number: Some(seat_number(&mut rng, request.class_type)), ..p })
                .collect()
        };

        let mut booking = Booking {
            id: Uuid::new_v4().to_string(),
            booking_reference: String::new(),
            user: user_id.to_string(),
            flights: vec![FlightBooking {
                flight,
                class_type: request.class_type,
                passengers,
                price: pricing,
            }],
            contact_info: ContactInfo {
                email: request.contact_info.email.to_lowercase(),
                ..request.contact_info
            },
            payment_info: PaymentInfo {
                method: request.payment_method,
                transaction_id: Uuid::new_v4().to_string(),
                amount: pricing.total,
                currency: "USD".to_string(),
                status: PaymentStatus::Pending,
                paid_at: None,
            },
            booking_status: BookingStatus::Pending,
            trip_type: request.trip_type,
            total_amount: pricing.total,
            booking_date: Utc::now(),
            check_in_status: CheckInStatus::default(),
            modifications: Vec::new(),
            cancellation: None,
        };

        {
            let mut bookings = self.store.bookings.write().await;
            let mut rng = rand::thread_rng();
            booking.booking_reference = unique_reference(
                || random_reference(&mut rng),
                |candidate| bookings.values().any(|b| b.booking_reference == candidate),
            );
            bookings.insert(booking.id.clone(), booking.clone());
        }

        match self.payments.charge(&booking.payment_info.transaction_id, pricing.total).await {
            Ok(outcome) if outcome.success => {
                booking.payment_info.status = PaymentStatus::Completed;
                booking.payment_info.paid_at = Some(Utc::now());
                booking.booking_status = BookingStatus::Confirmed;
                self.store.put_booking(booking.clone()).await;
            }
            Ok(outcome) => {
                tracing::warn!(reference = %booking.booking_reference, "{}", outcome.message);
            }
            Err(e) => {
                tracing::warn!(reference = %booking.booking_reference, "payment processor error: {:#}", e);
            }
        }

        tracing::info!(
            reference = %booking.booking_reference,
            status = ?booking.booking_status,
            total = booking.total_amount,
            "booking created"
        );
        Ok(booking)
    }

    pub async fn list(&self, user_id: &str, query: &BookingQuery) -> BookingPage {
        let limit = query.limit.unwrap_or(10).max(1);
        let page = query.page.unwrap_or(1).max(1);

        let mut bookings = self
            .store
            .bookings_where(|b| b.user == user_id && query.status.map_or(true, |s| b.booking_status == s))
            .await;
        bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));

        let total = bookings.len();
        let bookings = bookings.into_iter().skip((page - 1) * limit).take(limit).collect();

        BookingPage { bookings, total, page, pages: total.div_ceil(limit) }
    }

    /// The booking, when it belongs to `user_id`.
    pub async fn get_for_user(&self, id: &str, user_id: &str) -> TravelResult<Booking> {
        self.store
            .booking(id)
            .await
            .filter(|b| b.user == user_id)
            .ok_or(TravelError::BookingNotFound)
    }

    pub async fn find_by_reference(&self, reference: &str, email: &str) -> Option<Booking> {
        let reference = reference.to_uppercase();
        let email = email.to_lowercase();
        self.store
            .bookings_where(|b| b.booking_reference == reference && b.contact_info.email.to_lowercase() == email)
            .await
            .into_iter()
            .next()
    }

    pub async fn update(&self, id: &str, user_id: &str, update: BookingUpdate) -> TravelResult<Booking> {
        let mut booking = self.get_for_user(id, user_id).await?;
        if booking.is_closed() {
            return Err(TravelError::NotModifiable);
        }

        if let Some(contact) = update.contact_info {
            booking.contact_info = ContactInfo { email: contact.email.to_lowercase(), ..contact };
        }
        if let Some(passengers) = update.passengers {
            if let Some(segment) = booking.flights.first_mut() {
                if passengers.len() != segment.passengers.len() {
                    return Err(TravelError::NotModifiable);
                }
                // seats stay with the slot they were assigned to
                segment.passengers = passengers
                    .into_iter()
                    .zip(segment.passengers.iter())
                    .map(|(p, old)| Passenger { seat_number: old.seat_number.clone(), ..p })
                    .collect();
            }
        }

        booking.modifications.push(Modification {
            kind: ModificationKind::PassengerInfo,
            description: "Booking information updated".to_string(),
            fee: 0.0,
            modified_at: Utc::now(),
            modified_by: "user".to_string(),
        });

        self.store.put_booking(booking.clone()).await;
        Ok(booking)
    }

    pub async fn cancel(&self, id: &str, user_id: &str, reason: Option<String>) -> TravelResult<CancelledBooking> {
        let mut booking = self.get_for_user(id, user_id).await?;
        let now = Utc::now();
        if !booking.can_cancel(now) {
            return Err(TravelError::NotCancellable);
        }

        let refund = booking.refund_amount(now);
        let reason = reason.unwrap_or_else(|| "Cancelled by user".to_string());

        booking.booking_status = BookingStatus::Cancelled;
        booking.cancellation = Some(Cancellation {
            reason: reason.clone(),
            cancelled_at: now,
            refund_amount: refund,
            refund_status: RefundStatus::Pending,
        });
        booking.modifications.push(Modification {
            kind: ModificationKind::Cancellation,
            description: format!("Booking cancelled: {}", reason),
            fee: booking.total_amount as f64 - refund,
            modified_at: now,
            modified_by: "user".to_string(),
        });

        for segment in &booking.flights {
            self.store
                .adjust_seats(&segment.flight.id, segment.class_type, segment.passengers.len() as i64)
                .await;
        }

        match self.payments.refund(&booking.payment_info.transaction_id, refund).await {
            Ok(_) => {
                if let Some(c) = booking.cancellation.as_mut() {
                    c.refund_status = RefundStatus::Processed;
                }
            }
            Err(e) => tracing::warn!(reference = %booking.booking_reference, "refund failed: {:#}", e),
        }

        self.store.put_booking(booking.clone()).await;
        tracing::info!(reference = %booking.booking_reference, refund, "booking cancelled");

        Ok(CancelledBooking { booking, refund_amount: refund })
    }

    pub async fn check_in(&self, id: &str, user_id: &str, leg: FlightLeg) -> TravelResult<CheckedIn> {
        let booking = self.get_for_user(id, user_id).await?;
        let checked_in = check_in_booking(booking, leg, Utc::now())?;
        self.store.put_booking(checked_in.booking.clone()).await;
        Ok(checked_in)
    }

    pub async fn stats(&self, user_id: &str) -> BookingStats {
        let bookings = self.store.bookings_where(|b| b.user == user_id).await;
        booking_stats(&bookings, Utc::now())
    }
}

/// Opens 24 hours before departure and closes at departure.
pub fn check_in_booking(mut booking: Booking, leg: FlightLeg, now: DateTime<Utc>) -> TravelResult<CheckedIn> {
    if booking.booking_status != BookingStatus::Confirmed {
        return Err(TravelError::CheckIn("Check-in not available for this booking"));
    }
    if *booking.check_in_status.get_mut(leg) {
        return Err(TravelError::CheckIn("Already checked in for this flight"));
    }

    let departure = booking
        .departures()
        .next()
        .ok_or(TravelError::CheckIn("Check-in not available for this booking"))?;
    let seconds = (departure - now).num_seconds();
    if seconds > 24 * 3600 {
        return Err(TravelError::CheckIn("Check-in not yet available"));
    }
    if seconds < 0 {
        return Err(TravelError::CheckIn("Flight has already departed"));
    }

    *booking.check_in_status.get_mut(leg) = true;
    let boarding_pass = boarding_pass(&booking, now)
        .ok_or(TravelError::CheckIn("Check-in not available for this booking"))?;

    Ok(CheckedIn { booking, boarding_pass })
}
