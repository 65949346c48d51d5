use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use nlu::{calculate_confidence, classify_intent, extract_entities, normalize, resolve_date, Entities, Intent};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use travel::{catalog, CabinClass, SearchQuery};

use crate::ports::FlightSearchPort;
use crate::reply::{self, BotReply, ClientAction, ResponseKind, DATE_QUICK_REPLIES, ERROR_APOLOGY};
use crate::session::{DialogueState, Session, SessionStore};
use crate::transcript::{ChatLog, ChatRecord};

static FLIGHT_CHOICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bflight\s+(\d{1,2})\b").expect("flight choice pattern must compile"));

// Search turns that carry one of these verbs are routed to booking or status.
static BOOKING_VERB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(book|reserve|purchase|buy|confirm)\b").expect("booking verb pattern must compile"));
static STATUS_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(status|delay|delayed|on time)\b").expect("status word pattern must compile"));
static BARE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{3}$").expect("bare token pattern must compile"));

const SUMMARY_LIMIT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnMetadata {
    pub processing_time_ms: u64,
    pub confidence: f32,
    pub fallback: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error_handled: bool,
}

/// Everything the front-end needs to render one bot turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub session_id: String,
    pub message: String,
    pub intent: Intent,
    pub entities: Entities,
    pub state: DialogueState,
    pub response_type: ResponseKind,
    pub quick_replies: Vec<String>,
    pub data: Option<Value>,
    pub action: Option<ClientAction>,
    pub metadata: TurnMetadata,
}

/// Rule-based flight assistant: classifies each message, threads the
/// per-session search state and answers with canned or data-backed replies.
pub struct Assistant<F: FlightSearchPort> {
    flights: F,
    sessions: Arc<RwLock<SessionStore>>,
    transcript: Arc<ChatLog>,
}

impl<F: FlightSearchPort> Assistant<F> {
    pub fn new(flights: F, transcript: Arc<ChatLog>) -> Self {
        Self {
            flights,
            sessions: Arc::new(RwLock::new(SessionStore::new())),
            transcript,
        }
    }

    pub fn sessions(&self) -> &Arc<RwLock<SessionStore>> {
        &self.sessions
    }

    pub fn transcript(&self) -> &Arc<ChatLog> {
        &self.transcript
    }

    /// Handles one user message for `session_id`. Failures never escape:
    /// they become an apology turn with `intent = error`.
    pub async fn process(&self, session_id: &str, user_id: Option<&str>, text: &str) -> ChatTurn {
        let started = Instant::now();

        let mut session = {
            let sessions = self.sessions.read().await;
            sessions.get(session_id).cloned()
        }
        .unwrap_or_else(|| Session::new(session_id, user_id.map(str::to_string)));

        let normalized = normalize(text);
        let intent = classify_intent(&normalized);
        let entities = extract_entities(&normalized);
        let today = Utc::now().date_naive();

        let outcome = self.respond(intent, &entities, &mut session, &normalized, today).await;

        session.previous_intent = Some(intent);
        session.last_message = Some(text.to_string());
        session.updated_at = Utc::now();
        let state = session.state;
        self.sessions.write().await.put(session);

        let elapsed = started.elapsed().as_millis() as u64;
        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(session_id, "chat turn failed: {:#}", e);
                return ChatTurn {
                    session_id: session_id.to_string(),
                    message: ERROR_APOLOGY.to_string(),
                    intent: Intent::Error,
                    entities: Entities::default(),
                    state,
                    response_type: ResponseKind::Text,
                    quick_replies: Vec::new(),
                    data: None,
                    action: None,
                    metadata: TurnMetadata {
                        processing_time_ms: elapsed,
                        confidence: 0.0,
                        fallback: false,
                        error_handled: true,
                    },
                };
            }
        };

        let metadata = TurnMetadata {
            processing_time_ms: elapsed,
            confidence: calculate_confidence(intent, &entities),
            fallback: reply.fallback,
            error_handled: false,
        };
        tracing::debug!(session_id, %intent, %state, confidence = metadata.confidence, "chat turn");

        self.transcript
            .append([
                ChatRecord::user(session_id, user_id, text, intent, entities.clone()),
                ChatRecord::bot(
                    session_id,
                    user_id,
                    &reply.text,
                    reply.kind,
                    reply.quick_replies.clone(),
                    serde_json::to_value(&metadata).unwrap_or(Value::Null),
                ),
            ])
            .await;

        ChatTurn {
            session_id: session_id.to_string(),
            message: reply.text,
            intent,
            entities,
            state,
            response_type: reply.kind,
            quick_replies: reply.quick_replies,
            data: reply.data,
            action: reply.action,
            metadata,
        }
    }

    pub async fn clear_conversation(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn context(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn respond(
        &self,
        intent: Intent,
        entities: &Entities,
        session: &mut Session,
        text: &str,
        today: NaiveDate,
    ) -> Result<BotReply> {
        let in_flow = session.state.in_search_flow();
        let mut entities = entities.clone();

        // A lone word only names an airport the catalog knows.
        if BARE_TOKEN.is_match(text) && entities.origin.as_deref().is_some_and(|c| catalog::airport(c).is_none()) {
            entities.origin = None;
        }

        // A lone code after the origin is known names the destination.
        if in_flow {
            let stored = session.data.search_params.as_ref();
            let origin_only = stored.is_some_and(|p| p.origin.is_some() && p.destination.is_none());
            if origin_only && entities.origin.is_some() && entities.destination.is_none() {
                entities.destination = entities.origin.take();
            }
        }

        let continues_search = in_flow
            && intent == Intent::Unknown
            && (entities.origin.is_some()
                || entities.destination.is_some()
                || entities.departure_date.is_some()
                || entities.requested_other_dates);

        let names_route = entities.origin.is_some() || entities.destination.is_some();
        let wants_booking =
            intent == Intent::BookFlight || (intent == Intent::SearchFlights && BOOKING_VERB.is_match(text));
        let wants_status = intent == Intent::CheckFlightStatus
            || (intent == Intent::SearchFlights && STATUS_WORD.is_match(text) && !names_route);

        if wants_booking {
            if session.data.has_results() && !names_route {
                return Ok(self.book(session, text));
            }
            if names_route {
                return self.search(entities, session, today).await;
            }
            return Ok(reply::booking_needs_search());
        }
        if wants_status {
            session.state = DialogueState::Initial;
            return self.flight_status(&entities, today).await;
        }
        if continues_search || intent == Intent::SearchFlights {
            return self.search(entities, session, today).await;
        }
        if intent == Intent::Unknown {
            return Ok(reply::unknown());
        }

        session.state = DialogueState::Initial;
        let reply = match intent {
            Intent::Greeting => reply::greeting(),
            Intent::ViewBookings => reply::view_bookings(entities.booking_reference.as_deref()),
            Intent::CancelBooking => reply::cancel_booking(),
            Intent::ModifyBooking => reply::modify_booking(),
            Intent::PriceInquiry => self.price_inquiry(&entities, session, today).await?,
            Intent::DestinationInfo => reply::destination_info(),
            Intent::Help => reply::help(),
            Intent::Goodbye => {
                session.data = Default::default();
                reply::goodbye()
            }
            Intent::Complaint => reply::complaint(),
            Intent::SearchFlights
            | Intent::BookFlight
            | Intent::CheckFlightStatus
            | Intent::Unknown
            | Intent::Error => reply::unknown(),
        };
        Ok(reply)
    }

    async fn search(&self, entities: Entities, session: &mut Session, today: NaiveDate) -> Result<BotReply> {
        let mut params = match &session.data.search_params {
            Some(previous) => entities.merge_over(previous),
            None => entities,
        };

        let (origin, destination) = match (params.origin.clone(), params.destination.clone()) {
            (Some(o), Some(d)) => (o, d),
            _ => {
                let mut text = String::from(
                    "I'd be happy to help you search for flights! I need some information first. ",
                );
                match &params.origin {
                    Some(o) => text.push_str(&format!("I see you want to fly from {}.", o)),
                    None => text.push_str("Where would you like to fly from?"),
                }
                match &params.destination {
                    Some(d) => text.push_str(&format!(" And to {}.", d)),
                    None => text.push_str(" Where would you like to go?"),
                }
                if params.departure_date.is_none() {
                    text.push_str(" When would you like to travel?");
                }

                session.state = DialogueState::CollectingSearchInfo;
                session.data.search_params = Some(params);
                return Ok(BotReply::text(text).with_quick_replies(&["Popular destinations", "Help with airport codes"]));
            }
        };

        if params.requested_other_dates {
            params.requested_other_dates = false;
            params.departure_date = None;
            session.state = DialogueState::CollectingDate;
            session.data.search_params = Some(params);
            return Ok(BotReply::text(format!(
                "Sure! Please tell me the new date you want to travel from {} to {}.",
                origin, destination
            ))
            .with_quick_replies(DATE_QUICK_REPLIES));
        }

        let departure = match params.departure_date.clone() {
            Some(phrase) => match resolve_date(&phrase, today) {
                Some(date) => date,
                None => {
                    params.departure_date = None;
                    session.state = DialogueState::CollectingDate;
                    session.data.search_params = Some(params);
                    return Ok(BotReply::text(format!(
                        "I couldn't work out the date '{}'. When would you like to fly from {} to {}?",
                        phrase, origin, destination
                    ))
                    .with_quick_replies(DATE_QUICK_REPLIES));
                }
            },
            None => {
                session.state = DialogueState::CollectingDate;
                session.data.search_params = Some(params);
                return Ok(BotReply::text(format!(
                    "Great! I'll search for flights from {} to {}. When would you like to travel?",
                    origin, destination
                ))
                .with_quick_replies(DATE_QUICK_REPLIES));
            }
        };

        let mut query = SearchQuery::new(origin.as_str(), destination.as_str(), departure);
        query.passengers = params.passengers.unwrap_or(1).max(1);
        query.class_type = params
            .class_type
            .as_deref()
            .and_then(|c| c.parse::<CabinClass>().ok())
            .unwrap_or_default();
        query.max_price = params.max_price.or(params.price_range.map(|r| r.max));
        query.return_date = params.return_date.as_deref().and_then(|r| resolve_date(r, today));

        let results = match self.flights.search(&query).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("flight search failed: {:#}", e);
                return Ok(reply::search_failed());
            }
        };

        params.departure_date = Some(departure.to_string());
        session.state = DialogueState::ShowingResults;
        session.data.search_params = Some(params);
        session.data.search_results = Some(results.flights.clone());

        if results.flights.is_empty() {
            return Ok(BotReply::text(format!(
                "I couldn't find any flights from {} to {} on {}. Would you like to try different dates or destinations?",
                origin, destination, departure
            ))
            .with_quick_replies(&["Try different dates", "Change destination", "Popular routes"]));
        }

        let summary = results
            .flights
            .iter()
            .take(SUMMARY_LIMIT)
            .enumerate()
            .map(|(i, f)| {
                format!(
                    "{}. {} {} - ${} ({} - {}, {})",
                    i + 1,
                    f.airline.name,
                    f.flight_number,
                    f.price.get(query.class_type),
                    f.departure.time,
                    f.arrival.time,
                    f.duration.formatted
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut text = format!(
            "Great! I found {} flights from {} to {}:\n\n{}",
            results.total, origin, destination, summary
        );
        if results.total > SUMMARY_LIMIT {
            text.push_str(&format!("\n\n... and {} more options.", results.total - SUMMARY_LIMIT));
        }
        text.push_str("\n\nWould you like to book one of these flights or see more details?");

        Ok(BotReply::text(text)
            .with_kind(ResponseKind::List)
            .with_data(serde_json::to_value(&results.flights)?)
            .with_quick_replies(&["Book flight 1", "See all options", "Filter by price", "New search"]))
    }

    fn book(&self, session: &mut Session, text: &str) -> BotReply {
        session.state = DialogueState::BookingProcess;

        let results = session.data.search_results.as_deref().unwrap_or_default();
        let choice = FLIGHT_CHOICE
            .captures(text)
            .and_then(|c| c[1].parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))
            .unwrap_or(0);

        let reply = BotReply::text(reply::booking_details())
            .with_quick_replies(&["Yes, prepare booking", "More flight options", "Help with booking"]);
        match results.get(choice) {
            Some(flight) => reply.with_data(json!({ "selectedFlight": flight })),
            None => reply,
        }
    }

    async fn flight_status(&self, entities: &Entities, today: NaiveDate) -> Result<BotReply> {
        let Some(number) = entities.flight_number.as_deref() else {
            return Ok(reply::flight_status_prompt());
        };

        let status = self.flights.flight_status(number, today).await?;
        Ok(BotReply::text(format!(
            "Flight {} Status:\n\nStatus: {}\nDeparture: {} (Gate {})\nArrival: {}\nAircraft: {}",
            status.flight_number,
            status.status,
            status.departure.scheduled,
            status.departure.gate.as_deref().unwrap_or("TBA"),
            status.arrival.scheduled,
            status.aircraft
        ))
        .with_kind(ResponseKind::Card)
        .with_data(serde_json::to_value(&status)?)
        .with_quick_replies(&["Check another flight", "Search flights", "Help"]))
    }

    async fn price_inquiry(&self, entities: &Entities, session: &Session, today: NaiveDate) -> Result<BotReply> {
        let route = match &session.data.search_params {
            Some(previous) => entities.merge_over(previous),
            None => entities.clone(),
        };
        let (Some(origin), Some(destination)) = (route.origin.as_deref(), route.destination.as_deref()) else {
            return Ok(reply::price_route_prompt());
        };

        let alert = match self.flights.price_alerts(origin, destination, today).await {
            Ok(Some(alert)) => alert,
            Ok(None) => return Ok(reply::price_unavailable()),
            Err(e) => {
                tracing::warn!("price lookup failed: {:#}", e);
                return Ok(reply::price_unavailable());
            }
        };

        Ok(BotReply::text(format!(
            "Price information for {} to {}:\n\nCurrent average price: ${}\nLowest price (last 30 days): ${}\n\
             Recommendation: {}\n\nWould you like me to search for current flights?",
            origin, destination, alert.average_price, alert.lowest_price, alert.recommendation
        ))
        .with_data(serde_json::to_value(&alert)?)
        .with_quick_replies(&["Search flights", "Price alerts", "Try different route"]))
    }
}
