use chrono::Utc;

/// Wall clock in epoch milliseconds, the unit every persisted timestamp uses.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod primitives_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_return_a_timestamp_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
