use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    #[default]
    Text,
    Card,
    List,
    QuickReply,
    Form,
    Confirmation,
}

/// Something the chat client should do alongside showing the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAction {
    OpenViewBookingModal,
}

impl ClientAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientAction::OpenViewBookingModal => "open_view_booking_modal",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotReply {
    pub text: String,
    pub kind: ResponseKind,
    pub quick_replies: Vec<String>,
    pub data: Option<Value>,
    pub action: Option<ClientAction>,
    pub fallback: bool,
}

impl BotReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_quick_replies(mut self, replies: &[&str]) -> Self {
        self.quick_replies = replies.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_action(mut self, action: ClientAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn as_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }
}

pub const ERROR_APOLOGY: &str =
    "I'm sorry, I encountered an error. Please try again or contact support if the problem persists.";

fn pick(options: &[&'static str]) -> &'static str {
    options.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}

pub(crate) fn greeting() -> BotReply {
    BotReply::text(pick(&[
        "Hello! I'm your flight booking assistant. How can I help you today?",
        "Hi there! I can help you search for flights, manage bookings, and answer travel questions. What would you like to do?",
        "Welcome! I'm here to make your flight booking experience smooth and easy. How may I assist you?",
    ]))
    .with_quick_replies(&["Search flights", "View my bookings", "Flight status", "Help"])
}

pub(crate) fn booking_needs_search() -> BotReply {
    BotReply::text("To book a flight, I need you to search for flights first. What route would you like to search?")
        .with_quick_replies(&["Search flights", "Popular destinations"])
}

pub(crate) fn booking_details() -> &'static str {
    "To complete your booking, I'll need some additional information:\n\n\
     • Passenger details (name, date of birth)\n\
     • Contact information\n\
     • Payment details\n\n\
     For security reasons, I recommend completing the booking through our secure booking page. \
     Would you like me to prepare your booking details?"
}

pub(crate) fn view_bookings(reference: Option<&str>) -> BotReply {
    let reply = match reference {
        Some(reference) => BotReply::text(format!(
            "I can help you check your booking {}. For security, I'll need to verify your email address. \
             Please click the 'View Booking' button at the top of the page or use the button below to enter \
             your booking reference and email.",
            reference
        ))
        .with_data(serde_json::json!({ "reference": reference }))
        .with_quick_replies(&["View My Booking", "Search new flights", "Help"]),
        None => BotReply::text(
            "To view your bookings, please click the 'View Booking' button at the top of the page or use the \
             button below. You'll need your booking reference number (a 6-character code like 'ABC123') and the \
             email you used for booking.",
        )
        .with_quick_replies(&["View My Booking", "Help finding reference", "Contact support"]),
    };
    reply.with_action(ClientAction::OpenViewBookingModal)
}

pub(crate) fn cancel_booking() -> BotReply {
    BotReply::text(
        "I understand you want to cancel a booking. For security and to ensure proper processing, \
         booking cancellations must be done through:\n\n\
         • Our website's 'Manage Booking' section\n\
         • Customer service at 1-800-FLIGHTS\n\n\
         You'll need your booking reference and email address. \
         Please note that cancellation fees may apply depending on your ticket type.",
    )
    .with_quick_replies(&["Check cancellation policy", "Contact support", "Search new flights"])
}

pub(crate) fn modify_booking() -> BotReply {
    BotReply::text(
        "To modify your booking (change dates, passenger details, etc.), please visit our website's \
         'Manage Booking' section or call customer service.\n\n\
         You'll need:\n\
         • Your booking reference\n\
         • Email address used for booking\n\n\
         Note: Change fees may apply depending on your ticket type and fare rules.",
    )
    .with_quick_replies(&["Check change policy", "Contact support", "Search new flights"])
}

pub(crate) fn flight_status_prompt() -> BotReply {
    BotReply::text("I can check flight status for you. Please provide the flight number (e.g., AA1234, DL567).")
        .with_quick_replies(&["I have flight number", "Check by route", "Help"])
}

pub(crate) fn price_route_prompt() -> BotReply {
    BotReply::text(
        "I can help you with pricing information. Which route are you interested in? \
         Please tell me your departure and destination cities or airport codes.",
    )
    .with_quick_replies(&["Popular routes", "Airport codes", "Help"])
}

pub(crate) fn price_unavailable() -> BotReply {
    BotReply::text(
        "I'm sorry, I couldn't retrieve price information right now. \
         Would you like me to search for current flights instead?",
    )
    .with_quick_replies(&["Search flights", "Try again", "Help"])
}

pub(crate) fn destination_info() -> BotReply {
    BotReply::text(
        "I'd love to help with destination information! However, I specialize in flight booking. \
         For detailed destination guides, weather, and attractions, I recommend checking travel websites like:\n\n\
         • TripAdvisor\n• Lonely Planet\n• Local tourism boards\n\n\
         I can help you find flights to your destination though!",
    )
    .with_quick_replies(&["Search flights", "Popular destinations", "Help"])
}

pub(crate) fn help() -> BotReply {
    BotReply::text(
        "I'm your flight booking assistant! Here's what I can help you with:\n\n\
         ✈️ **Flight Search**: Find flights by saying 'Search flights from NYC to LAX'\n\
         📋 **Bookings**: View or manage your existing bookings\n\
         📊 **Flight Status**: Check if flights are on time or delayed\n\
         💰 **Prices**: Get pricing information for routes\n\
         🎯 **Popular Destinations**: Discover trending travel spots\n\n\
         Just tell me what you need in natural language, and I'll help you out!",
    )
    .with_quick_replies(&["Search flights", "Flight status", "View bookings", "Popular destinations"])
}

pub(crate) fn goodbye() -> BotReply {
    BotReply::text(pick(&[
        "Thank you for using our flight booking service! Have a wonderful trip! ✈️",
        "Safe travels! Feel free to come back anytime you need help with flights.",
        "Goodbye! Wishing you smooth flights and great adventures!",
    ]))
}

pub(crate) fn complaint() -> BotReply {
    BotReply::text(
        "I'm sorry to hear you're having a problem. Your feedback is important to us. \
         For immediate assistance with issues, please:\n\n\
         • Contact our customer service at 1-800-FLIGHTS\n\
         • Use the 'Contact Us' form on our website\n\
         • Email support@flightbot.com\n\n\
         Is there anything specific I can help you with regarding flights or bookings?",
    )
    .with_quick_replies(&["Contact support", "Search flights", "Check booking", "Help"])
}

pub(crate) fn unknown() -> BotReply {
    BotReply::text(pick(&[
        "I'm not sure I understood that. Could you try asking about:",
        "I didn't quite catch that. Here are some things I can help with:",
        "Let me help you with that. I can assist with:",
    ]))
    .with_quick_replies(&["Search flights", "Check flight status", "View bookings", "Help"])
    .as_fallback()
}

pub(crate) fn search_failed() -> BotReply {
    BotReply::text("I'm sorry, I encountered an error while searching for flights. Please try again.").as_fallback()
}

pub(crate) const DATE_QUICK_REPLIES: &[&str] = &["Today", "Tomorrow", "Next week", "Choose date"];
