use std::time::Duration;

/// RFC 3261 §17.1.1.2's base retransmit interval.
pub const T1: Duration = Duration::from_millis(500);
/// The maximum retransmit interval for non-INVITE requests/responses
/// and INVITE responses.
pub const T2: Duration = Duration::from_secs(4);
/// The expected maximum duration a message can remain in the network.
pub const T4: Duration = Duration::from_secs(5);

/// Timer A: INVITE request retransmit, starts at T1 and doubles each
/// firing until Timer B fires (§17.1.1.2).
pub fn timer_a_initial() -> Duration {
    T1
}

pub fn timer_a_next(previous: Duration) -> Duration {
    previous * 2
}

/// Timer B: INVITE transaction timeout, 64*T1 (§17.1.1.2).
pub fn timer_b() -> Duration {
    T1 * 64
}

/// Timer D: wait time in Completed for response retransmits to die out
/// on an unreliable transport, >= 32s (§17.1.1.2); 0 on a reliable one.
pub fn timer_d(reliable_transport: bool) -> Duration {
    if reliable_transport { Duration::ZERO } else { Duration::from_secs(32) }
}

/// Timer E: non-INVITE request retransmit, starts at T1 and doubles,
/// capped at T2 (§17.1.2.2).
pub fn timer_e_initial() -> Duration {
    T1
}

pub fn timer_e_next(previous: Duration) -> Duration {
    std::cmp::min(previous * 2, T2)
}

/// Timer F: non-INVITE transaction timeout, 64*T1 (§17.1.2.2).
pub fn timer_f() -> Duration {
    T1 * 64
}

/// Timer G: INVITE server transaction response retransmit, starts at T1
/// and doubles, capped at T2 (§17.2.1).
pub fn timer_g_initial() -> Duration {
    T1
}

pub fn timer_g_next(previous: Duration) -> Duration {
    std::cmp::min(previous * 2, T2)
}

/// Timer H: wait time for ACK receipt in Completed, 64*T1 (§17.2.1).
pub fn timer_h() -> Duration {
    T1 * 64
}

/// Timer I: wait time in Confirmed to absorb ACK retransmits, T4 on an
/// unreliable transport, 0 on a reliable one (§17.2.1).
pub fn timer_i(reliable_transport: bool) -> Duration {
    if reliable_transport { Duration::ZERO } else { T4 }
}

/// Timer J: wait time in Completed to absorb request retransmits for a
/// non-INVITE server transaction, 64*T1 on an unreliable transport, 0
/// on a reliable one (§17.2.2).
pub fn timer_j(reliable_transport: bool) -> Duration {
    if reliable_transport { Duration::ZERO } else { T1 * 64 }
}

/// Timer K: wait time in Completed for a non-INVITE client transaction
/// to absorb response retransmits, T4 on an unreliable transport, 0 on
/// a reliable one (§17.1.2.2).
pub fn timer_k(reliable_transport: bool) -> Duration {
    if reliable_transport { Duration::ZERO } else { T4 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_a_doubles_until_capped_by_timer_b() {
        let mut interval = timer_a_initial();
        let mut total = Duration::ZERO;
        let mut firings = 0;
        while total < timer_b() && firings < 10 {
            total += interval;
            interval = timer_a_next(interval);
            firings += 1;
        }
        assert!(firings >= 6, "expected several retransmits before Timer B, got {}", firings);
    }

    #[test]
    fn timer_e_caps_at_t2() {
        let mut interval = timer_e_initial();
        for _ in 0..10 {
            interval = timer_e_next(interval);
        }
        assert_eq!(interval, T2);
    }

    #[test]
    fn reliable_transport_skips_unreliable_only_timers() {
        assert_eq!(timer_d(true), Duration::ZERO);
        assert_eq!(timer_i(true), Duration::ZERO);
        assert_eq!(timer_j(true), Duration::ZERO);
        assert_eq!(timer_k(true), Duration::ZERO);
    }
}
