#[cfg(test)]
mod tests {
    use nlu::{classify_intent, extract_entities, normalize, Intent};

    fn assert_all(inputs: &[&str], expected: Intent) {
        for input in inputs {
            let intent = classify_intent(&normalize(input));
            assert_eq!(intent, expected, "Failed for input: '{}'", input);
        }
    }

    #[test]
    fn test_greeting_patterns() {
        assert_all(
            &["hi", "Hello there", "hey!", "Good morning", "greetings, bot"],
            Intent::Greeting,
        );
    }

    #[test]
    fn test_search_patterns() {
        assert_all(
            &[
                "search flights from JFK to LAX",
                "find me something to Paris",
                "I want to fly tomorrow",
                "look for tickets",
                "travel to london",
                "JFK",
                "lax",
            ],
            Intent::SearchFlights,
        );
    }

    #[test]
    fn test_booking_words_fall_to_search() {
        // every booking or status phrase names a flight or ticket, which the
        // search pattern claims first
        assert_all(
            &[
                "book flight 1",
                "reserve a flight",
                "buy the ticket",
                "confirm my flight please",
                "update my flight",
                "status of flight DL567",
                "is there a delay on my flight",
            ],
            Intent::SearchFlights,
        );
    }

    #[test]
    fn test_booking_management_patterns() {
        assert_all(
            &["show my bookings", "view reservations", "check my trip", "ABC123", "cancel my booking", "change my booking"],
            Intent::ViewBookings,
        );
        assert_all(
            &["cancel booking", "please delete the reservation", "remove trip"],
            Intent::CancelBooking,
        );
        assert_all(&["modify the reservation", "edit booking"], Intent::ModifyBooking);
    }

    #[test]
    fn test_price_and_info_patterns() {
        assert_all(&["how much is it", "any cheap deals?", "price to tokyo"], Intent::PriceInquiry);
        assert_all(&["tell me about dubai", "what's the weather like", "popular destinations"], Intent::DestinationInfo);
    }

    #[test]
    fn test_help_goodbye_complaint_patterns() {
        assert_all(&["help", "what can you do", "I need support"], Intent::Help);
        assert_all(&["bye", "thanks", "thank you so much", "quit"], Intent::Goodbye);
        assert_all(&["this is terrible", "I have a problem", "worst service"], Intent::Complaint);
    }

    #[test]
    fn test_unknown_inputs() {
        assert_all(&["", "purple banana", "asdfgh", "123456", "maybe later"], Intent::Unknown);
    }

    #[test]
    fn test_extraction_is_idempotent_on_normalized_input() {
        let inputs = [
            "  Find   flights from JFK to   LAX tomorrow for 2 passengers ",
            "book business class from paris to london on March 3rd under $900",
            "my reference is ab12cd",
            "   ",
        ];
        for input in inputs {
            let once = normalize(input);
            let twice = normalize(&once);
            assert_eq!(extract_entities(&once), extract_entities(&twice), "input: '{}'", input);
            assert_eq!(extract_entities(&once), extract_entities(&once));
        }
    }
}
