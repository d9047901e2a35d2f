//! Fixed lines spoken by the phone, per language

use super::state::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phrase {
    /// Keyed by the language switched to, but worded in the one being left
    LanguageSwitched,
    OperatorGreeting,
    OperatorConnecting,
    OperatorNoSpeech,
    OperatorUnavailable,
    TimerPrompt,
    TimerNoDuration,
    TimerUnparsed,
    ComingRightUp,
    RequestNotFound,
    SignalLost,
}

pub fn phrase(language: Language, phrase: Phrase) -> &'static str {
    use Language::*;
    use Phrase::*;

    match (phrase, language) {
        (LanguageSwitched, Cz) => "Switching to Czech Mode.",
        (LanguageSwitched, En) => "Přepínám do angličtiny.",
        (OperatorGreeting, En) => "Operator here. How may I help?",
        (OperatorGreeting, Cz) => "Tady centrála. Jak vám mohu pomoci?",
        (OperatorConnecting, En) => "Connecting you to that station now.",
        (OperatorConnecting, Cz) => "Přepojuji vás.",
        (OperatorNoSpeech, En) => "I didn't hear anything. Disconnecting.",
        (OperatorNoSpeech, Cz) => "Nemohu vás momentálně spojit.",
        (OperatorUnavailable, En) => "I am unable to connect you at this time.",
        (OperatorUnavailable, Cz) => "Nemohu vás momentálně spojit.",
        (TimerPrompt, En) => "Timer mode. How long should I set it for?",
        (TimerPrompt, Cz) => "Časovač. Na jak dlouho ho mám nastavit?",
        (TimerNoDuration, En) => "I didn't hear a duration. Timer cancelled.",
        (TimerNoDuration, Cz) => "Neslyšela jsem žádný čas. Časovač zrušen.",
        (TimerUnparsed, En) => "I couldn't understand the time. Please try again.",
        (TimerUnparsed, Cz) => "Tomu času jsem nerozuměla. Zkuste to prosím znovu.",
        (ComingRightUp, En) => "Coming right up!",
        (ComingRightUp, Cz) => "Už to hraje!",
        (RequestNotFound, En) => {
            "I couldn't find that specific record, so here is the radio instead."
        }
        (RequestNotFound, Cz) => "Tu skladbu nemohu najít, ale pustím vám rádio.",
        (SignalLost, En) => "Signal lost...",
        (SignalLost, Cz) => "Signál se ztratil...",
    }
}

pub fn timer_set(language: Language, seconds: u64) -> String {
    match language {
        Language::En => format!("Setting timer for {} seconds.", seconds),
        Language::Cz => format!("Nastavuji časovač na {} sekund.", seconds),
    }
}

pub fn era_welcome(language: Language, year: u16) -> String {
    match language {
        Language::En => format!("Welcome to {}.", year),
        Language::Cz => format!("Vítejte v roce {}.", year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_line_is_worded_in_the_previous_language() {
        assert!(phrase(Language::Cz, Phrase::LanguageSwitched).contains("Czech"));
        assert!(phrase(Language::En, Phrase::LanguageSwitched).contains("angličtiny"));
    }

    #[test]
    fn test_czech_silence_line_matches_unavailable() {
        assert_eq!(
            phrase(Language::Cz, Phrase::OperatorNoSpeech),
            phrase(Language::Cz, Phrase::OperatorUnavailable)
        );
    }

    #[test]
    fn test_formatted_lines() {
        assert_eq!(timer_set(Language::En, 300), "Setting timer for 300 seconds.");
        assert_eq!(era_welcome(Language::Cz, 1966), "Vítejte v roce 1966.");
    }
}
