use std::time::Duration;

pub fn to_millis(duration: Duration) -> u64 {
    (duration.as_secs() * 1_000) + (duration.subsec_nanos() / 1_000_000) as u64
}


#[cfg(test)]
mod tests {

    use std::time::Duration;
    use utils::to_millis;

    #[test]
    fn millis_combine_seconds_and_nanos() {
        assert_eq!(to_millis(Duration::new(2, 250_000_000)), 2_250);
    }
}
