use ceremony_types::{
    AnswerType, CeremonyError, EpochInfo, EpochPeriod, SessionType,
};
use chrono::{DateTime, TimeDelta};
use proptest::prelude::*;

fn period() -> impl Strategy<Value = EpochPeriod> {
    prop_oneof![
        Just(EpochPeriod::None),
        Just(EpochPeriod::FlipLottery),
        Just(EpochPeriod::ShortSession),
        Just(EpochPeriod::LongSession),
        Just(EpochPeriod::AfterLongSession),
    ]
}

proptest! {
    #[test]
    fn only_known_answer_codes_are_accepted(code in any::<u8>()) {
        match AnswerType::try_from(code) {
            Ok(answer) => {
                prop_assert!(code <= 3);
                prop_assert_eq!(answer.code(), code);
            }
            Err(err) => {
                prop_assert!(code > 3);
                prop_assert_eq!(err, CeremonyError::InvalidAnswer(code));
            }
        }
    }

    #[test]
    fn answer_codes_outside_range_fail_to_deserialize(code in 4u8..) {
        prop_assert!(serde_json::from_str::<AnswerType>(&code.to_string()).is_err());
    }

    #[test]
    fn session_type_parsing_ignores_case(upper in proptest::collection::vec(any::<bool>(), 5)) {
        let word: String = "short"
            .chars()
            .zip(&upper)
            .map(|(c, &up)| if up { c.to_ascii_uppercase() } else { c })
            .collect();
        prop_assert_eq!(word.parse::<SessionType>().unwrap(), SessionType::Short);
    }

    #[test]
    fn countdown_reference_is_start_only_while_a_ceremony_runs(
        period in period(),
        has_start in any::<bool>(),
        offset in -86_400i64..86_400,
    ) {
        let next = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let start = next + TimeDelta::seconds(offset);
        let epoch = EpochInfo {
            current_period: period,
            epoch: 1,
            next_validation: next,
            current_validation_start: has_start.then_some(start),
        };
        let expected = if has_start && period != EpochPeriod::None { start } else { next };
        prop_assert_eq!(epoch.validation_start(), expected);
    }
}
