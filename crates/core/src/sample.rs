//! The demo campaign the worker runs when no campaign file is configured.

use crate::campaign::{Campaign, Language, SubStage};
use crate::status::SubStageStatus;

pub const SAMPLE_CAMPAIGN_ID: &str = "81675815";
pub const SAMPLE_CAMPAIGN_NAME: &str = "Hell's Paradise: Jigokuraku: Season 2";

const SAMPLE_LANGUAGES: &[(&str, &str)] = &[
    ("zh-TW", "CHINESE (TRADITIONAL)"),
    ("en", "ENGLISH"),
    ("ja", "JAPANESE"),
    ("th", "THAI"),
];

fn sample_sub_stages() -> Vec<SubStage> {
    vec![
        SubStage::new("Origination", SubStageStatus::Completed),
        SubStage::new("Pre-QC Assembly", SubStageStatus::Completed),
        SubStage::new("QC", SubStageStatus::Completed),
        SubStage::new("Versioning & Encoding", SubStageStatus::InProgress),
    ]
}

/// Four languages, all `not_started`, with the localization pipeline three
/// steps in.
pub fn sample_campaign() -> Campaign {
    Campaign {
        id: SAMPLE_CAMPAIGN_ID.to_string(),
        name: SAMPLE_CAMPAIGN_NAME.to_string(),
        languages: SAMPLE_LANGUAGES
            .iter()
            .map(|(code, name)| Language::new(*code, *name).with_sub_stages(sample_sub_stages()))
            .collect(),
    }
}
