//! Outcome Classifier - Did a person pick up?
//!
//! Layered evidence, evaluated as an ordered list of named rules:
//! 1. the provider's own voicemail flag
//! 2. disconnection reasons that mean the dial never reached a person
//! 3. canonical voicemail phrases in the transcript (only when 1-2 are silent)
//!
//! A final override rule looks for strong evidence of a real conversation
//! (long duration, alternating two-party turns) and forces "human reached"
//! regardless of what the layers above decided. Every rule is recorded in the
//! trail so the decision can be audited afterwards.

use serde::Serialize;

use crate::domain::entities::{CallEvent, Speaker, TranscriptTurn};
use crate::domain::services::transcript::parse_text_turns;
use crate::domain::value_objects::FailureReason;

/// Phrases voicemail greetings use; matched case-insensitively
pub const VOICEMAIL_PHRASES: &[&str] = &[
    "record your message",
    "at the tone",
    "after the tone",
    "after the beep",
    "leave a message",
    "leave your message",
    "not available",
    "voicemail",
    "mailbox is full",
];

/// Thresholds for classification (configurable)
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Calls longer than this are treated as real conversations
    pub human_min_duration_ms: u64,
    /// Minimum total content for a raw-text transcript to count as a conversation
    pub min_conversation_chars: usize,
    pub voicemail_phrases: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            human_min_duration_ms: 5_000,
            min_conversation_chars: 80,
            voicemail_phrases: VOICEMAIL_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Classification rules, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    ProviderVoicemailFlag,
    DisconnectionReason,
    VoicemailPhrases,
    /// Override: strong evidence of a real conversation
    ConversationEvidence,
}

impl Rule {
    /// Layers that may decide; the first non-silent one wins
    pub const LAYERS: [Rule; 3] = [
        Rule::ProviderVoicemailFlag,
        Rule::DisconnectionReason,
        Rule::VoicemailPhrases,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rule::ProviderVoicemailFlag => "provider_voicemail_flag",
            Rule::DisconnectionReason => "disconnection_reason",
            Rule::VoicemailPhrases => "voicemail_phrases",
            Rule::ConversationEvidence => "conversation_evidence",
        }
    }
}

/// What a single rule concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    NoHumanReached(FailureReason),
    HumanReached,
    Silent,
}

/// One entry of the diagnostic trail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    pub rule: Rule,
    pub verdict: Verdict,
    pub detail: String,
}

impl Evidence {
    fn new(rule: Rule, verdict: Verdict, detail: impl Into<String>) -> Self {
        Self {
            rule,
            verdict,
            detail: detail.into(),
        }
    }

    fn silent(rule: Rule, detail: impl Into<String>) -> Self {
        Self::new(rule, Verdict::Silent, detail)
    }
}

/// Final decision with its audit trail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub no_human_reached: bool,
    /// Failure category when nobody was reached
    pub reason: Option<FailureReason>,
    /// Rule that produced the final decision; `None` means the default applied
    pub decided_by: Option<Rule>,
    /// Whether conversation evidence overrode a no-human verdict
    pub overridden: bool,
    pub trail: Vec<Evidence>,
}

impl Classification {
    pub fn human_reached(&self) -> bool {
        !self.no_human_reached
    }

    /// One-line summary suitable for `failure_details`
    pub fn summary(&self) -> String {
        let decided_by = self.decided_by.map(Rule::name).unwrap_or("default");
        let findings: Vec<String> = self
            .trail
            .iter()
            .filter(|e| e.verdict != Verdict::Silent)
            .map(|e| format!("{}: {}", e.rule.name(), e.detail))
            .collect();
        if findings.is_empty() {
            format!("decided by {decided_by}")
        } else {
            format!("decided by {decided_by} ({})", findings.join("; "))
        }
    }
}

/// Map a provider disconnection reason to a no-human category.
pub fn disconnection_category(reason: &str) -> Option<FailureReason> {
    match reason.trim().to_lowercase().as_str() {
        "voicemail_reached" | "machine_detected" => Some(FailureReason::Voicemail),
        "dial_no_answer" | "no_answer" => Some(FailureReason::NoAnswer),
        "dial_busy" | "busy" => Some(FailureReason::Busy),
        "dial_failed" | "invalid_destination" => Some(FailureReason::DialFailed),
        _ => None,
    }
}

/// Rule-based human/voicemail classifier
#[derive(Debug, Clone, Default)]
pub struct OutcomeClassifier {
    config: ClassifierConfig,
}

impl OutcomeClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a completion event. Pure: never touches call state.
    pub fn classify(&self, event: &CallEvent) -> Classification {
        let mut trail = Vec::with_capacity(Rule::LAYERS.len() + 1);
        let mut decision = None;

        for rule in Rule::LAYERS {
            let evidence = self.evaluate(rule, event);
            let verdict = evidence.verdict;
            trail.push(evidence);
            if verdict != Verdict::Silent {
                decision = Some((rule, verdict));
                break;
            }
        }

        let (mut no_human_reached, mut reason, mut decided_by) = match decision {
            Some((rule, Verdict::NoHumanReached(reason))) => (true, Some(reason), Some(rule)),
            Some((rule, _)) => (false, None, Some(rule)),
            None => (false, None, None),
        };

        let conversation = self.evaluate(Rule::ConversationEvidence, event);
        let overridden = no_human_reached && conversation.verdict == Verdict::HumanReached;
        if overridden {
            no_human_reached = false;
            reason = None;
            decided_by = Some(Rule::ConversationEvidence);
        }
        trail.push(conversation);

        let classification = Classification {
            no_human_reached,
            reason,
            decided_by,
            overridden,
            trail,
        };

        tracing::debug!(
            provider_call_id = %event.provider_call_id,
            no_human_reached,
            overridden,
            summary = %classification.summary(),
            "Classified call outcome"
        );

        classification
    }

    /// Evaluate a single rule; exposed so each rule can be checked on its own.
    pub fn evaluate(&self, rule: Rule, event: &CallEvent) -> Evidence {
        match rule {
            Rule::ProviderVoicemailFlag => {
                // Recorded for audit only; it says nothing about who answered.
                let success = match event.call_successful {
                    Some(true) => ", call_successful",
                    Some(false) => ", call not successful",
                    None => "",
                };
                match event.in_voicemail {
                    Some(true) => Evidence::new(
                        rule,
                        Verdict::NoHumanReached(FailureReason::Voicemail),
                        format!("provider flagged voicemail{success}"),
                    ),
                    Some(false) => Evidence::new(
                        rule,
                        Verdict::HumanReached,
                        format!("provider reported no voicemail{success}"),
                    ),
                    None => Evidence::silent(rule, format!("no provider analysis{success}")),
                }
            }
            Rule::DisconnectionReason => match event.disconnection_reason.as_deref() {
                Some(code) => match disconnection_category(code) {
                    Some(reason) => Evidence::new(
                        rule,
                        Verdict::NoHumanReached(reason),
                        format!("disconnected with {code}"),
                    ),
                    None => Evidence::silent(rule, format!("{code} says nothing about who answered")),
                },
                None => Evidence::silent(rule, "no disconnection reason"),
            },
            Rule::VoicemailPhrases => self.match_voicemail_phrase(event),
            Rule::ConversationEvidence => self.conversation_evidence(event),
        }
    }

    fn match_voicemail_phrase(&self, event: &CallEvent) -> Evidence {
        let rule = Rule::VoicemailPhrases;
        let text = match event.transcript_text() {
            Some(text) => text.to_lowercase(),
            None => event
                .turns
                .iter()
                .map(|t| t.content.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        };
        if text.trim().is_empty() {
            return Evidence::silent(rule, "no transcript");
        }

        match self
            .config
            .voicemail_phrases
            .iter()
            .find(|phrase| text.contains(&phrase.to_lowercase()))
        {
            Some(phrase) => Evidence::new(
                rule,
                Verdict::NoHumanReached(FailureReason::Voicemail),
                format!("transcript contains \"{phrase}\""),
            ),
            None => Evidence::silent(rule, "no voicemail phrase"),
        }
    }

    fn conversation_evidence(&self, event: &CallEvent) -> Evidence {
        let rule = Rule::ConversationEvidence;

        if let Some(duration) = event.duration_ms {
            if duration > self.config.human_min_duration_ms {
                return Evidence::new(
                    rule,
                    Verdict::HumanReached,
                    format!(
                        "lasted {duration} ms (> {} ms)",
                        self.config.human_min_duration_ms
                    ),
                );
            }
        }

        if has_structured_conversation(&event.turns) {
            return Evidence::new(
                rule,
                Verdict::HumanReached,
                "structured transcript has several callee turns",
            );
        }

        if let Some(text) = event.transcript_text() {
            let turns = parse_text_turns(text);
            let content: usize = turns.iter().map(|t| t.content.trim().len()).sum();
            if count_speaker_switches(&turns) >= 2 && content >= self.config.min_conversation_chars
            {
                return Evidence::new(
                    rule,
                    Verdict::HumanReached,
                    format!("alternating two-party transcript ({content} chars)"),
                );
            }
        }

        Evidence::silent(rule, "no strong conversation evidence")
    }
}

/// More than one non-empty callee turn, answered by the agent at least once.
fn has_structured_conversation(turns: &[TranscriptTurn]) -> bool {
    let substantive = |speaker: Speaker| {
        turns
            .iter()
            .filter(|t| t.speaker == speaker && t.is_substantive())
            .count()
    };
    substantive(Speaker::Callee) > 1 && substantive(Speaker::Agent) >= 1
}

fn count_speaker_switches(turns: &[TranscriptTurn]) -> usize {
    turns
        .iter()
        .filter(|t| t.is_substantive())
        .map(|t| t.speaker)
        .collect::<Vec<_>>()
        .windows(2)
        .filter(|pair| pair[0] != pair[1])
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::CallEventKind;

    fn ended() -> CallEvent {
        CallEvent::new(CallEventKind::Ended, "call_abc")
    }

    fn conversation_turns() -> Vec<TranscriptTurn> {
        vec![
            TranscriptTurn::new(Speaker::Agent, "Hi, I'd like to book a table for four.").at(0.5),
            TranscriptTurn::new(Speaker::Callee, "Sure, what time were you thinking?").at(3.1),
            TranscriptTurn::new(Speaker::Agent, "Seven tonight, under Alex.").at(6.0),
            TranscriptTurn::new(Speaker::Callee, "Great, you're booked for seven.").at(9.4),
        ]
    }

    #[test]
    fn test_short_voicemail_disconnection_is_no_human() {
        let classifier = OutcomeClassifier::default();
        let event = ended()
            .with_duration_ms(2_000)
            .with_disconnection_reason("voicemail_reached");

        let result = classifier.classify(&event);
        assert!(result.no_human_reached);
        assert_eq!(result.reason, Some(FailureReason::Voicemail));
        assert_eq!(result.decided_by, Some(Rule::DisconnectionReason));
        assert!(!result.overridden);
    }

    #[test]
    fn test_long_conversation_overrides_voicemail_flag() {
        let classifier = OutcomeClassifier::default();
        let event = CallEvent::new(CallEventKind::Analyzed, "call_abc")
            .with_voicemail_flag(true)
            .with_duration_ms(120_000)
            .with_turns(conversation_turns());

        let result = classifier.classify(&event);
        assert!(!result.no_human_reached);
        assert!(result.overridden);
        assert_eq!(result.decided_by, Some(Rule::ConversationEvidence));
        assert_eq!(result.reason, None);
        assert_eq!(result.trail.len(), 2);
    }

    #[test]
    fn test_primary_flag_wins_over_disconnection_reason() {
        let classifier = OutcomeClassifier::default();
        let event = ended()
            .with_voicemail_flag(false)
            .with_disconnection_reason("dial_no_answer")
            .with_duration_ms(1_000);

        let result = classifier.classify(&event);
        assert!(!result.no_human_reached);
        assert_eq!(result.decided_by, Some(Rule::ProviderVoicemailFlag));
    }

    #[test]
    fn test_call_successful_is_kept_in_trail_without_deciding() {
        let classifier = OutcomeClassifier::default();
        let mut event = CallEvent::new(CallEventKind::Analyzed, "call_abc").with_voicemail_flag(true);
        event.call_successful = Some(false);

        let result = classifier.classify(&event);
        assert!(result.no_human_reached);
        assert_eq!(result.trail[0].detail, "provider flagged voicemail, call not successful");
        assert!(result.summary().contains("call not successful"));

        event.in_voicemail = None;
        event.call_successful = Some(true);
        let evidence = classifier.evaluate(Rule::ProviderVoicemailFlag, &event);
        assert_eq!(evidence.verdict, Verdict::Silent);
        assert_eq!(evidence.detail, "no provider analysis, call_successful");
    }

    #[test]
    fn test_disconnection_categories() {
        assert_eq!(disconnection_category("dial_busy"), Some(FailureReason::Busy));
        assert_eq!(disconnection_category("DIAL_NO_ANSWER"), Some(FailureReason::NoAnswer));
        assert_eq!(disconnection_category("dial_failed"), Some(FailureReason::DialFailed));
        assert_eq!(disconnection_category("user_hangup"), None);
    }

    #[test]
    fn test_phrases_only_used_when_other_layers_are_silent() {
        let classifier = OutcomeClassifier::default();
        let event = ended()
            .with_duration_ms(3_000)
            .with_transcript("User: You've reached Luigi's, please leave a message after the beep.");

        let result = classifier.classify(&event);
        assert!(result.no_human_reached);
        assert_eq!(result.decided_by, Some(Rule::VoicemailPhrases));

        let event = event.with_disconnection_reason("user_hangup").with_voicemail_flag(false);
        let result = classifier.classify(&event);
        assert!(!result.no_human_reached);
        assert_eq!(result.decided_by, Some(Rule::ProviderVoicemailFlag));
    }

    #[test]
    fn test_stray_phrase_in_real_conversation_is_overridden() {
        let classifier = OutcomeClassifier::default();
        let transcript = "Agent: Hi, is the chef's table available Friday?\n\
                          User: Sorry, the chef's table is not available Friday, but Saturday works.\n\
                          Agent: Saturday at eight for two then, please.\n\
                          User: Done, see you Saturday.";
        let event = ended().with_transcript(transcript);

        let result = classifier.classify(&event);
        assert!(!result.no_human_reached);
        assert!(result.overridden);
    }

    #[test]
    fn test_single_voicemail_greeting_turn_is_not_a_conversation() {
        let classifier = OutcomeClassifier::default();
        let event = ended().with_turns(vec![
            TranscriptTurn::new(Speaker::Callee, "Hi, you've reached Luigi's. Leave a message at the tone."),
            TranscriptTurn::new(Speaker::Agent, "Hi, this is a message for Luigi's."),
        ]);

        let evidence = classifier.evaluate(Rule::ConversationEvidence, &event);
        assert_eq!(evidence.verdict, Verdict::Silent);
        assert!(classifier.classify(&event).no_human_reached);
    }

    #[test]
    fn test_no_signals_defaults_to_human() {
        let result = OutcomeClassifier::default().classify(&ended());
        assert!(!result.no_human_reached);
        assert_eq!(result.decided_by, None);
        assert_eq!(result.summary(), "decided by default");
    }

    #[test]
    fn test_duration_threshold_is_configurable() {
        let classifier = OutcomeClassifier::new(ClassifierConfig {
            human_min_duration_ms: 30_000,
            ..ClassifierConfig::default()
        });
        let event = ended()
            .with_duration_ms(20_000)
            .with_disconnection_reason("voicemail_reached");
        assert!(classifier.classify(&event).no_human_reached);
    }
}
