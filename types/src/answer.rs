//! Answer codes and the submission wire payload.

use serde::{Deserialize, Serialize};

use crate::{CeremonyError, FlipHash};

/// A participant's judgment on a flip. Encoded on the wire as its numeric code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AnswerType {
    None = 0,
    Left = 1,
    Right = 2,
    Inappropriate = 3,
}

impl AnswerType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<AnswerType> for u8 {
    fn from(answer: AnswerType) -> Self {
        answer.code()
    }
}

impl TryFrom<u8> for AnswerType {
    type Error = CeremonyError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Left),
            2 => Ok(Self::Right),
            3 => Ok(Self::Inappropriate),
            other => Err(CeremonyError::InvalidAnswer(other)),
        }
    }
}

/// One entry of a submitted answer batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub hash: FlipHash,
    pub answer: AnswerType,
    pub easy: bool,
}

/// Params object of `flip_submitShortAnswers` / `flip_submitLongAnswers`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<AnswerPayload>,
    pub nonce: u64,
    pub epoch: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_serializes_as_code() {
        let payload = AnswerPayload {
            hash: FlipHash::new("0x1"),
            answer: AnswerType::Right,
            easy: false,
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"hash":"0x1","answer":2,"easy":false}"#
        );
    }

    #[test]
    fn unknown_answer_code_is_rejected() {
        assert_eq!(AnswerType::try_from(3), Ok(AnswerType::Inappropriate));
        assert_eq!(AnswerType::try_from(4), Err(CeremonyError::InvalidAnswer(4)));
        assert!(serde_json::from_str::<AnswerType>("7").is_err());
    }
}
