//! Keyer timing on a virtual clock.

mod common;

use common::{ms, station, trace_tone};
use cwkey_core::{Element, KeyerMode, KeyerState, Paddle};

fn alternating(times_ms: &[u64], first: bool) -> Vec<(std::time::Duration, bool)> {
    times_ms
        .iter()
        .enumerate()
        .map(|(i, &t)| (ms(t), if i % 2 == 0 { first } else { !first }))
        .collect()
}

#[test]
fn held_dit_repeats_60_on_60_off() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);
    st.on_key_change(Paddle::Dit, true);
    assert!(st.gate().tone_request());

    let edges = trace_tone(&mut st, ms(600));
    let times: Vec<u64> = (1..=10).map(|i| i * 60).collect();
    assert_eq!(edges, alternating(&times, false));
}

#[test]
fn held_dah_repeats_180_on_60_off() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);
    st.on_key_change(Paddle::Dah, true);
    assert!(st.gate().tone_request());

    let edges = trace_tone(&mut st, ms(720));
    assert_eq!(edges, alternating(&[180, 240, 420, 480, 660, 720], false));
}

#[test]
fn squeeze_alternates_dit_dah() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);
    assert_eq!(st.keyer().last_element(), Element::Dah);

    st.on_key_change(Paddle::Dit, true);
    st.on_key_change(Paddle::Dah, true);

    let mut sent = vec![];
    if let KeyerState::Sending(e) = st.keyer().state() {
        sent.push(e);
    }
    while sent.len() < 6 {
        let deadline = st.next_deadline().expect("keyer keeps running");
        st.advance(deadline);
        if let KeyerState::Sending(e) = st.keyer().state() {
            sent.push(e);
        }
    }
    assert_eq!(
        sent,
        vec![
            Element::Dit,
            Element::Dah,
            Element::Dit,
            Element::Dah,
            Element::Dit,
            Element::Dah
        ]
    );
}

#[test]
fn squeeze_timing_includes_gap_after_each_element() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);
    st.on_key_change(Paddle::Dit, true);
    st.on_key_change(Paddle::Dah, true);

    // Dit 0-60, gap, Dah 120-300, gap, Dit 360-420, gap, Dah 480-660.
    let edges = trace_tone(&mut st, ms(660));
    assert_eq!(
        edges,
        alternating(&[60, 120, 300, 360, 420, 480, 660], false)
    );
}

#[test]
fn single_paddle_updates_alternation_memory() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);

    // A lone dit (initial memory says Dah), then squeeze: the squeeze
    // alternates from the dit, so the next element is a dah.
    st.on_key_change(Paddle::Dit, true);
    st.run_until(ms(30));
    st.on_key_change(Paddle::Dah, true);
    st.run_until(ms(120));
    assert_eq!(st.keyer().state(), KeyerState::Sending(Element::Dah));
}

#[test]
fn releasing_during_gap_settles_idle() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);
    st.on_key_change(Paddle::Dit, true);
    st.on_key_change(Paddle::Dah, true);

    st.run_until(ms(70));
    assert_eq!(st.keyer().state(), KeyerState::Gap);
    st.on_key_change(Paddle::Dit, false);
    st.on_key_change(Paddle::Dah, false);

    let edges = trace_tone(&mut st, ms(2_000));
    assert!(edges.is_empty());
    assert_eq!(st.keyer().state(), KeyerState::Idle);
    assert!(!st.gate().tone_request());
    assert_eq!(st.next_deadline(), None);

    st.on_key_change(Paddle::Dah, true);
    assert_eq!(st.keyer().state(), KeyerState::Sending(Element::Dah));
}

#[test]
fn release_mid_element_does_not_shorten_it() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);
    st.on_key_change(Paddle::Dah, true);
    st.run_until(ms(10));
    st.on_key_change(Paddle::Dah, false);

    let edges = trace_tone(&mut st, ms(1_000));
    assert_eq!(edges, vec![(ms(180), false)]);
}

#[test]
fn speed_change_applies_from_next_element() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);
    st.on_key_change(Paddle::Dah, true);
    st.run_until(ms(90));

    st.set_wpm(40.0).expect("valid speed");

    // Dah in flight keeps its 180ms and its 60ms gap; the next dah is 3 x 30ms.
    let edges = trace_tone(&mut st, ms(360));
    assert_eq!(edges, alternating(&[180, 240, 330, 360], false));
}

#[test]
fn invalid_speed_keeps_previous_value() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);
    assert!(st.set_wpm(0.0).is_err());
    assert!(st.set_wpm(f64::NAN).is_err());
    assert_eq!(st.keyer().config().wpm, 20.0);
}

#[test]
fn speed_with_zero_length_dit_is_rejected() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);
    assert!(st.set_wpm(5_000_000.0).is_err());
    assert_eq!(st.keyer().config().wpm, 20.0);

    st.on_key_change(Paddle::Dit, true);
    st.advance(ms(1));
    assert_eq!(st.next_deadline(), Some(ms(60)));
}

#[test]
fn straight_key_tracks_edges_without_timers() {
    let (mut st, _, _) = station(KeyerMode::Straight, 20.0);

    st.run_until(ms(100));
    st.on_key_change(Paddle::Dit, true);
    assert!(st.gate().tone_request());
    assert_eq!(st.next_deadline(), None);

    st.run_until(ms(347));
    assert!(st.gate().tone_request());
    st.on_key_change(Paddle::Dit, false);
    assert!(!st.gate().tone_request());
    assert_eq!(st.next_deadline(), None);
}

#[test]
fn switching_to_straight_mid_element_silences_keyer() {
    let (mut st, _, _) = station(KeyerMode::Iambic, 20.0);
    st.on_key_change(Paddle::Dah, true);
    st.run_until(ms(50));

    st.set_mode(KeyerMode::Straight);
    assert!(!st.gate().tone_request());

    // Stale element/gap timers fire as no-ops.
    let edges = trace_tone(&mut st, ms(1_000));
    assert!(edges.is_empty());
    assert_eq!(st.keyer().state(), KeyerState::Idle);
}
