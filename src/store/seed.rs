use chrono::{DateTime, Duration, Utc};

use crate::models::{Amount, LocalFeedback, LocalPoll};

pub const MOCK_POLL_IDS: [&str; 3] = ["mock_poll_1", "mock_poll_2", "mock_poll_3"];

fn wei(v: u64) -> Amount {
    Amount::from(v)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Demonstration polls, timestamped relative to `now`. None carries a chain
/// identifier: ledger indices are assigned from 1 by whichever ledger is
/// attached, so a seeded identifier would claim someone else's poll.
pub fn mock_polls(now: DateTime<Utc>) -> Vec<LocalPoll> {
    vec![
        LocalPoll {
            id: MOCK_POLL_IDS[0].to_string(),
            contract_id: None,
            title: "AI-Powered Task Management App Feedback".to_string(),
            description: "We're building an AI-powered task management application that learns \
                from your work patterns and automatically prioritizes your tasks. We need your \
                feedback on the core features and user experience to make it better."
                .to_string(),
            questions: strings(&[
                "What features would you find most valuable in an AI task management app?",
                "How important is privacy when an AI system learns from your work patterns?",
                "What would make you switch from your current task management tool?",
                "How much would you be willing to pay monthly for an AI-powered productivity tool?",
            ]),
            category: "technology".to_string(),
            duration: 14,
            reward_pool: wei(50_000_000_000_000_000),
            reward_per_feedback: wei(10_000_000_000_000_000),
            max_feedbacks: 5,
            creator: "0x1234567890123456789012345678901234567890".to_string(),
            created_at: now - Duration::days(2),
            is_active: true,
            tx_hash: Some(
                "0xabcdef1234567890abcdef1234567890abcdef1234567890abcdef1234567890".to_string(),
            ),
            ipfs_hash: Some("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG".to_string()),
            feedbacks: vec![LocalFeedback {
                id: "feedback_1".to_string(),
                poll_id: MOCK_POLL_IDS[0].to_string(),
                poll_contract_id: None,
                respondent: "0x9876543210987654321098765432109876543210".to_string(),
                responses: strings(&[
                    "Smart scheduling, automatic task prioritization, and integration with calendar apps would be most valuable.",
                    "Privacy is extremely important. I would need full control over what data is shared and stored.",
                    "Better AI insights, seamless integrations, and a cleaner interface than current tools.",
                    "Around $15-20 per month if it significantly improves my productivity.",
                ]),
                created_at: now - Duration::days(1),
                tx_hash: None,
                reward_amount: wei(10_000_000_000_000_000),
            }],
        },
        LocalPoll {
            id: MOCK_POLL_IDS[1].to_string(),
            contract_id: None,
            title: "Sustainable Fashion Brand Concept".to_string(),
            description: "We're launching a sustainable fashion brand focused on eco-friendly \
                materials and ethical manufacturing. Help us understand what consumers really \
                want from sustainable fashion."
                .to_string(),
            questions: strings(&[
                "What factors are most important when buying sustainable clothing?",
                "How much extra would you pay for truly sustainable fashion items?",
                "What sustainable materials or practices do you care about most?",
            ]),
            category: "business".to_string(),
            duration: 10,
            reward_pool: wei(30_000_000_000_000_000),
            reward_per_feedback: wei(5_000_000_000_000_000),
            max_feedbacks: 6,
            creator: "0x2345678901234567890123456789012345678901".to_string(),
            created_at: now - Duration::days(3),
            is_active: true,
            tx_hash: None,
            ipfs_hash: None,
            feedbacks: Vec::new(),
        },
        LocalPoll {
            id: MOCK_POLL_IDS[2].to_string(),
            contract_id: None,
            title: "Mobile App UI/UX Design Review".to_string(),
            description: "We've designed a new mobile banking app interface and need feedback on \
                the user experience, visual design, and overall usability before launch."
                .to_string(),
            questions: strings(&[
                "What do you think about the overall visual design and color scheme?",
                "How intuitive do you find the navigation and menu structure?",
                "What features would you want to see prioritized on the main dashboard?",
                "Any concerns about security or trust with this interface design?",
            ]),
            category: "design".to_string(),
            duration: 7,
            reward_pool: wei(40_000_000_000_000_000),
            reward_per_feedback: wei(8_000_000_000_000_000),
            max_feedbacks: 5,
            creator: "0x3456789012345678901234567890123456789012".to_string(),
            created_at: now - Duration::days(5),
            is_active: true,
            tx_hash: None,
            ipfs_hash: None,
            feedbacks: vec![LocalFeedback {
                id: "feedback_2".to_string(),
                poll_id: MOCK_POLL_IDS[2].to_string(),
                poll_contract_id: None,
                respondent: "0x4567890123456789012345678901234567890123".to_string(),
                responses: strings(&[
                    "The color scheme is modern and professional. I like the blue and white combination.",
                    "Navigation is quite intuitive, though the settings menu could be more prominent.",
                    "Account balance, recent transactions, and quick transfer options should be on main dashboard.",
                    "The interface looks trustworthy, but I'd want to see more security indicators.",
                ]),
                created_at: now - Duration::days(2),
                tx_hash: None,
                reward_amount: wei(8_000_000_000_000_000),
            }],
        },
    ]
}
