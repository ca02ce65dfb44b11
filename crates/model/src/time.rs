use chrono::Utc;

/// Current unix timestamp in seconds, the unit of Permit2 deadlines.
pub fn now_in_epoch_seconds() -> u64 {
    Utc::now().timestamp().try_into().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_after_2023() {
        assert!(now_in_epoch_seconds() > 1_700_000_000);
    }
}
