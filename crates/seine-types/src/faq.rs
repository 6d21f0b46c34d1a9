use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::status::StatusParseError;

/// Categorical label describing the nature of a FAQ answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerMode {
    /// The answer is self-contained text.
    DirectText,
    /// The answer defers to a linked page.
    LinkOut,
    /// The answer escalates to a phone number.
    PhoneEscalation,
    /// The answer points at a PDF download.
    PdfAttachment,
    /// The answer embeds or references a video.
    Video,
    /// The answer sends the user into a login/account portal.
    PortalRedirect,
}

impl AnswerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerMode::DirectText => "DIRECT_TEXT",
            AnswerMode::LinkOut => "LINK_OUT",
            AnswerMode::PhoneEscalation => "PHONE_ESCALATION",
            AnswerMode::PdfAttachment => "PDF_ATTACHMENT",
            AnswerMode::Video => "VIDEO",
            AnswerMode::PortalRedirect => "PORTAL_REDIRECT",
        }
    }
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerMode {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DIRECT_TEXT" => Ok(AnswerMode::DirectText),
            "LINK_OUT" => Ok(AnswerMode::LinkOut),
            "PHONE_ESCALATION" => Ok(AnswerMode::PhoneEscalation),
            "PDF_ATTACHMENT" => Ok(AnswerMode::PdfAttachment),
            "VIDEO" => Ok(AnswerMode::Video),
            "PORTAL_REDIRECT" => Ok(AnswerMode::PortalRedirect),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// One question/answer pair extracted from a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqItem {
    pub document_url: String,
    pub question_text: String,
    pub answer_text: String,
    pub answer_raw_html: String,
    pub answer_mode: AnswerMode,
    pub link_depth_to_answer: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_mode_round_trip() {
        for mode in [
            AnswerMode::DirectText,
            AnswerMode::LinkOut,
            AnswerMode::PhoneEscalation,
            AnswerMode::PdfAttachment,
            AnswerMode::Video,
            AnswerMode::PortalRedirect,
        ] {
            assert_eq!(mode.as_str().parse::<AnswerMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_answer_mode_serde_form() {
        let json = serde_json::to_string(&AnswerMode::PortalRedirect).unwrap();
        assert_eq!(json, "\"PORTAL_REDIRECT\"");
    }
}
